//! AniDB record types.
//!
//! A record is either a [`StubAnime`] built from the title index or a fully
//! fetched [`Anime`]; [`AnimeRecord`] holds one of the two.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Base URL for anime pictures
pub const PICTURE_URL: &str = "http://img7.anidb.net/pics/anime/";

/// Title type used when no type is requested
pub const DEFAULT_TITLE_TYPE: &str = "main";

/// Title type marking synonyms
pub const SYNONYM_TITLE_TYPE: &str = "synonym";

/// A localized title
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Title {
    /// Language tag from `xml:lang` (`en`, `ja`, `x-jat`, ...)
    pub lang: String,
    /// Title type (`main`, `official`, `synonym`, `short`); episode titles have none
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    pub text: String,
}

impl fmt::Display for Title {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Resolve a title from a list.
///
/// Returns the first title of type `kind` (`"main"` when `None`), then the
/// first title in `lang`, otherwise `None`.
pub fn resolve_title<'a>(titles: &'a [Title], kind: Option<&str>, lang: &str) -> Option<&'a Title> {
    let kind = kind.unwrap_or(DEFAULT_TITLE_TYPE);
    titles
        .iter()
        .find(|t| t.kind.as_deref() == Some(kind))
        .or_else(|| titles.iter().find(|t| t.lang == lang))
}

/// Episode number: an integer for regular episodes, the raw text otherwise
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(untagged)]
pub enum EpisodeNumber {
    Regular(u32),
    Special(String),
}

impl fmt::Display for EpisodeNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EpisodeNumber::Regular(n) => write!(f, "{}", n),
            EpisodeNumber::Special(s) => f.write_str(s),
        }
    }
}

/// Episode of an anime
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Episode {
    pub id: u32,
    /// Owning anime
    pub anime_id: u32,
    pub titles: Vec<Title>,
    pub airdate: Option<NaiveDate>,
    /// Episode type: 1 = regular, 2 = special, 3 = credit, 4 = trailer, 5 = parody, 6 = other
    #[serde(rename = "type")]
    pub kind: u32,
    pub number: EpisodeNumber,
    /// Length in minutes, as reported
    pub length: Option<String>,
    #[serde(skip)]
    pub(crate) default_lang: String,
}

impl Episode {
    /// Regular, numbered episode
    pub const REGULAR: u32 = 1;

    /// Sort key: type first, then number
    pub fn order_key(&self) -> (u32, &EpisodeNumber) {
        (self.kind, &self.number)
    }

    pub fn is_regular(&self) -> bool {
        self.kind == Self::REGULAR
    }

    /// Title in `lang`, or in the client language when `None`
    pub fn title(&self, lang: Option<&str>) -> Option<&Title> {
        let lang = lang.unwrap_or(&self.default_lang);
        self.titles.iter().find(|t| t.lang == lang)
    }
}

impl fmt::Display for Episode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.title(None).or_else(|| self.titles.first()) {
            Some(title) => write!(f, "{}: {}", self.number, title),
            None => write!(f, "{}", self.number),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Category {
    pub id: String,
    pub hentai: bool,
    pub weight: String,
    pub name: String,
    pub description: String,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tag {
    pub id: String,
    pub spoiler: bool,
    pub local_spoiler: bool,
    pub global_spoiler: bool,
    pub updated: NaiveDate,
    pub name: String,
    pub description: Option<String>,
    pub count: u32,
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Cover picture
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Picture {
    pub filename: String,
}

impl Picture {
    pub fn url(&self) -> String {
        format!("{}{}", PICTURE_URL, self.filename)
    }
}

impl fmt::Display for Picture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Ratings {
    pub permanent: Option<String>,
    pub temporary: Option<String>,
    pub review: Option<String>,
}

/// Anime known only from the title index
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StubAnime {
    pub id: u32,
    pub titles: Vec<Title>,
    #[serde(skip)]
    pub(crate) default_lang: String,
}

impl StubAnime {
    pub fn new(id: u32, titles: Vec<Title>, default_lang: impl Into<String>) -> Self {
        Self {
            id,
            titles,
            default_lang: default_lang.into(),
        }
    }

    /// See [`resolve_title`]; `lang` defaults to the client language.
    pub fn title(&self, kind: Option<&str>, lang: Option<&str>) -> Option<&Title> {
        resolve_title(&self.titles, kind, lang.unwrap_or(&self.default_lang))
    }
}

/// Fully fetched anime
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Anime {
    pub id: u32,
    pub titles: Vec<Title>,
    /// All episodes, ordered by type then number
    pub all_episodes: Vec<Episode>,
    pub picture: Option<Picture>,
    pub ratings: Ratings,
    pub categories: Vec<Category>,
    /// Tags, ordered by count ascending
    pub tags: Vec<Tag>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub description: Option<String>,
    /// Series type (`TV Series`, `Movie`, `OVA`, ...)
    #[serde(rename = "type")]
    pub anime_type: Option<String>,
    pub episode_count: Option<u32>,
    pub url: Option<String>,
    pub restricted: bool,
    #[serde(skip)]
    pub(crate) default_lang: String,
}

impl Anime {
    /// See [`resolve_title`]; `lang` defaults to the client language.
    pub fn title(&self, kind: Option<&str>, lang: Option<&str>) -> Option<&Title> {
        resolve_title(&self.titles, kind, lang.unwrap_or(&self.default_lang))
    }

    pub fn synonyms(&self) -> impl Iterator<Item = &Title> {
        self.titles
            .iter()
            .filter(|t| t.kind.as_deref() == Some(SYNONYM_TITLE_TYPE))
    }

    /// Regular episodes keyed by number
    pub fn episodes(&self) -> BTreeMap<u32, &Episode> {
        self.all_episodes
            .iter()
            .filter_map(|e| match e.number {
                EpisodeNumber::Regular(n) if e.is_regular() => Some((n, e)),
                _ => None,
            })
            .collect()
    }

    pub fn episode(&self, number: u32) -> Option<&Episode> {
        self.all_episodes
            .iter()
            .find(|e| e.is_regular() && e.number == EpisodeNumber::Regular(number))
    }

    /// Language used when a title lookup gives none
    pub fn default_lang(&self) -> &str {
        &self.default_lang
    }
}

/// A record that is either a stub or fully loaded
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AnimeRecord {
    Stub(StubAnime),
    Full(Anime),
}

impl AnimeRecord {
    pub fn id(&self) -> u32 {
        match self {
            AnimeRecord::Stub(stub) => stub.id,
            AnimeRecord::Full(anime) => anime.id,
        }
    }

    pub fn titles(&self) -> &[Title] {
        match self {
            AnimeRecord::Stub(stub) => &stub.titles,
            AnimeRecord::Full(anime) => &anime.titles,
        }
    }

    pub fn title(&self, kind: Option<&str>, lang: Option<&str>) -> Option<&Title> {
        match self {
            AnimeRecord::Stub(stub) => stub.title(kind, lang),
            AnimeRecord::Full(anime) => anime.title(kind, lang),
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, AnimeRecord::Full(_))
    }

    pub fn as_full(&self) -> Option<&Anime> {
        match self {
            AnimeRecord::Full(anime) => Some(anime),
            AnimeRecord::Stub(_) => None,
        }
    }
}

impl fmt::Display for AnimeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.title(None, None) {
            Some(title) => write!(f, "{} ({})", title, self.id()),
            None => write!(f, "{}", self.id()),
        }
    }
}
