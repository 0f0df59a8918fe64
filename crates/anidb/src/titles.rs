//! Cached AniDB title index.
//!
//! The bulk `anime-titles.xml.gz` dump is kept in the cache directory and
//! replaced wholesale once it is older than a day.

use chrono::{DateTime, Duration, Utc};
use flate2::read::GzDecoder;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::api::Downloader;
use crate::decode::XML_LANG;
use crate::error::AnidbError;
use crate::models::Title;
use crate::search;
use crate::Result;

/// File name of the cached index inside the cache directory
pub const TITLES_FILE: &str = "anime-titles.xml.gz";

/// How long a downloaded index stays fresh
pub const MAX_AGE_HOURS: i64 = 24;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

const ROOT: &[u8] = b"animetitles";

/// One anime of the title index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleIndexEntry {
    pub aid: u32,
    pub titles: Vec<Title>,
}

/// Parsed title index, in file order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TitleIndex {
    entries: Vec<TitleIndexEntry>,
}

impl TitleIndex {
    pub fn new(entries: Vec<TitleIndexEntry>) -> Self {
        Self { entries }
    }

    /// Read an index document, gzip-compressed or plain.
    pub fn from_reader(reader: impl Read) -> Result<Self> {
        let mut reader = BufReader::new(reader);
        let compressed = reader.fill_buf()?.starts_with(&GZIP_MAGIC);
        if compressed {
            Self::parse(BufReader::new(GzDecoder::new(reader)))
        } else {
            Self::parse(reader)
        }
    }

    fn parse(input: impl BufRead) -> Result<Self> {
        let mut reader = Reader::from_reader(input);
        reader.config_mut().trim_text(true);

        let mut entries = Vec::new();
        let mut buf = Vec::new();
        let mut current: Option<TitleIndexEntry> = None;
        let mut title: Option<TitleBuilder> = None;
        let (mut opened, mut closed) = (false, false);

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) => match e.name().as_ref() {
                    ROOT => opened = true,
                    b"anime" => current = Some(start_entry(&e)?),
                    b"title" if current.is_some() => title = Some(TitleBuilder::from_start(&e)?),
                    _ => {}
                },
                Event::Empty(e) => match e.name().as_ref() {
                    ROOT => (opened, closed) = (true, true),
                    b"anime" => entries.push(start_entry(&e)?),
                    _ => {}
                },
                Event::Text(e) => {
                    if let Some(ref mut title) = title {
                        let text = e.unescape().map_err(|e| AnidbError::decode(e.to_string()))?;
                        title.text.push_str(&text);
                    }
                }
                Event::End(e) => match e.name().as_ref() {
                    ROOT => closed = true,
                    b"title" => {
                        if let (Some(entry), Some(builder)) = (current.as_mut(), title.take()) {
                            entry.titles.push(builder.build());
                        }
                    }
                    b"anime" => {
                        if let Some(entry) = current.take() {
                            entries.push(entry);
                        }
                    }
                    _ => {}
                },
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        if current.is_some() || title.is_some() {
            return Err(AnidbError::decode("title index ends inside an entry"));
        }
        if !(opened && closed) {
            return Err(AnidbError::decode("title index has no complete <animetitles> root"));
        }

        debug!(entries = entries.len(), "Parsed title index");
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[TitleIndexEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, aid: u32) -> Option<&TitleIndexEntry> {
        self.entries.iter().find(|e| e.aid == aid)
    }

    /// Entries with a title containing `term`, see [`search::search`].
    pub fn search(&self, term: &str) -> Vec<&TitleIndexEntry> {
        search::search(&self.entries, term)
    }
}

fn start_entry(start: &BytesStart<'_>) -> Result<TitleIndexEntry> {
    let aid = attribute(start, "aid")?
        .ok_or_else(|| AnidbError::decode("anime entry without aid"))?;
    let aid = aid
        .parse()
        .map_err(|_| AnidbError::decode(format!("invalid aid '{}'", aid)))?;
    Ok(TitleIndexEntry {
        aid,
        titles: Vec::new(),
    })
}

fn attribute(start: &BytesStart<'_>, name: &str) -> Result<Option<String>> {
    for attr in start.attributes() {
        let attr = attr?;
        if attr.key.as_ref() == name.as_bytes() {
            let value = attr
                .unescape_value()
                .map_err(|e| AnidbError::decode(e.to_string()))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

struct TitleBuilder {
    lang: String,
    kind: Option<String>,
    text: String,
}

impl TitleBuilder {
    fn from_start(start: &BytesStart<'_>) -> Result<Self> {
        let lang = attribute(start, XML_LANG)?
            .ok_or_else(|| AnidbError::decode("index title without language"))?;
        Ok(Self {
            lang,
            kind: attribute(start, "type")?,
            text: String::new(),
        })
    }

    fn build(self) -> Title {
        Title {
            lang: self.lang,
            kind: self.kind,
            text: self.text,
        }
    }
}

/// Title index file in a cache directory
pub struct TitleIndexCache {
    /// Cached index file
    path: PathBuf,
    /// Remote bulk index
    url: String,
    downloader: Box<dyn Downloader>,
}

impl TitleIndexCache {
    /// Create a cache in an existing, writable directory
    pub fn new(
        cache_dir: impl AsRef<Path>,
        url: impl Into<String>,
        downloader: Box<dyn Downloader>,
    ) -> Result<Self> {
        let cache_dir = cache_dir.as_ref();
        validate_cache_dir(cache_dir)?;

        debug!(cache_dir = %cache_dir.display(), "Title index cache initialized");

        Ok(Self {
            path: cache_dir.join(TITLES_FILE),
            url: url.into(),
            downloader,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the cached file exists and is younger than [`MAX_AGE_HOURS`]
    pub fn is_fresh(&self) -> Result<bool> {
        let modified = match std::fs::metadata(&self.path) {
            Ok(metadata) => metadata.modified()?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e.into()),
        };
        let modified: DateTime<Utc> = modified.into();
        Ok(modified + Duration::hours(MAX_AGE_HOURS) > Utc::now())
    }

    /// Download the index unless a fresh copy exists.
    ///
    /// Returns whether a download was performed.
    pub fn ensure_fresh(&self, force: bool) -> Result<bool> {
        if !force && self.is_fresh()? {
            debug!(path = %self.path.display(), "Title index is fresh");
            return Ok(false);
        }

        info!(url = %self.url, force = force, "Refreshing title index");
        self.downloader.download(&self.path, &self.url)?;
        Ok(true)
    }

    /// Read and parse the cached index
    pub fn load(&self) -> Result<TitleIndex> {
        let file = match std::fs::File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "Title index missing");
                return Err(AnidbError::NotFound(self.path.clone()));
            }
            Err(e) => return Err(e.into()),
        };

        let index = TitleIndex::from_reader(file)?;
        info!(entries = index.len(), "Title index loaded");
        Ok(index)
    }
}

fn validate_cache_dir(dir: &Path) -> Result<()> {
    if !dir.is_dir() {
        return Err(AnidbError::Configuration(format!(
            "'{}' does not exist",
            dir.display()
        )));
    }
    tempfile::Builder::new()
        .prefix(".write-test")
        .tempfile_in(dir)
        .map_err(|_| AnidbError::Configuration(format!("'{}' is not writable", dir.display())))?;
    Ok(())
}
