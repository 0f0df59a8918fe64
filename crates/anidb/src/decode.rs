//! Decoding of AniDB anime payloads into records.
//!
//! Two payload shapes exist: the full detail record (`<titles>` container,
//! episodes, ratings, tags, ...) and a reduced shape with bare `<title>`
//! children, which only yields titles.

use chrono::NaiveDate;

use crate::error::AnidbError;
use crate::models::{Anime, Category, Episode, EpisodeNumber, Picture, Ratings, Tag, Title};
use crate::xml::Element;
use crate::Result;

/// Qualified name of the language attribute on titles
pub const XML_LANG: &str = "xml:lang";

/// Parse an HTTP API response body into a record.
///
/// AniDB reports failures (bans, unknown client) as an `<error>` document
/// with a successful HTTP status; those become decode errors.
pub fn parse_anime(xml: &str, default_lang: &str) -> Result<Anime> {
    let root = Element::parse(xml)?;
    match root.name.as_str() {
        "anime" => decode_anime(&root, default_lang),
        "error" => Err(AnidbError::decode(format!("remote error: {}", root.text()))),
        other => Err(AnidbError::decode(format!(
            "unexpected root element <{}>",
            other
        ))),
    }
}

/// Decode an `<anime>` element.
pub fn decode_anime(node: &Element, default_lang: &str) -> Result<Anime> {
    let id_text = node
        .attr("id")
        .or_else(|| node.attr("aid"))
        .ok_or_else(|| AnidbError::decode("anime without id"))?;
    let id = parse_number(id_text, "anime id")?;

    let mut anime = Anime {
        id,
        default_lang: default_lang.to_string(),
        ..Anime::default()
    };

    let Some(titles) = node.child("titles") else {
        // Reduced shape: titles only
        anime.titles = decode_titles(node)?;
        require_titles(&anime)?;
        return Ok(anime);
    };
    anime.titles = decode_titles(titles)?;
    require_titles(&anime)?;

    if let Some(episodes) = node.child("episodes") {
        let mut all = episodes
            .children_named("episode")
            .map(|e| decode_episode(e, id, default_lang))
            .collect::<Result<Vec<_>>>()?;
        all.sort_by(|a, b| a.order_key().cmp(&b.order_key()));
        anime.all_episodes = all;
    }

    anime.picture = node.child_text("picture").map(|filename| Picture {
        filename: filename.to_string(),
    });
    anime.ratings = decode_ratings(node.child("ratings"));

    if let Some(categories) = node.child("categories") {
        anime.categories = categories
            .children_named("category")
            .map(decode_category)
            .collect::<Result<Vec<_>>>()?;
    }

    if let Some(tags) = node.child("tags") {
        let mut all = tags
            .children_named("tag")
            .map(decode_tag)
            .collect::<Result<Vec<_>>>()?;
        all.sort_by_key(|t| t.count);
        anime.tags = all;
    }

    anime.start_date = optional_date(node, "startdate")?;
    anime.end_date = optional_date(node, "enddate")?;
    anime.description = node.child_text("description").map(str::to_string);
    anime.anime_type = node.child_text("type").map(str::to_string);
    anime.episode_count = node
        .child_text("episodecount")
        .map(|n| parse_number(n, "episodecount"))
        .transpose()?;
    anime.url = node.child_text("url").map(str::to_string);
    anime.restricted = parse_flag(node.attr("restricted"));

    Ok(anime)
}

fn require_titles(anime: &Anime) -> Result<()> {
    if anime.titles.is_empty() {
        return Err(AnidbError::decode(format!("anime {} has no titles", anime.id)));
    }
    Ok(())
}

/// Decode every `<title>` child of `parent`.
pub fn decode_titles(parent: &Element) -> Result<Vec<Title>> {
    parent.children_named("title").map(decode_title).collect()
}

pub fn decode_title(node: &Element) -> Result<Title> {
    let lang = node
        .attr(XML_LANG)
        .ok_or_else(|| AnidbError::decode(format!("title '{}' has no language", node.text())))?;
    Ok(Title {
        lang: lang.to_string(),
        kind: node.attr("type").map(str::to_string),
        text: node.text().to_string(),
    })
}

pub fn decode_episode(node: &Element, anime_id: u32, default_lang: &str) -> Result<Episode> {
    let id = node
        .attr("id")
        .ok_or_else(|| AnidbError::decode("episode without id"))
        .and_then(|id| parse_number(id, "episode id"))?;

    let epno = node
        .child("epno")
        .ok_or_else(|| AnidbError::decode(format!("episode {} has no epno", id)))?;
    let kind = epno
        .attr("type")
        .ok_or_else(|| AnidbError::decode(format!("episode {} has no type", id)))
        .and_then(|t| parse_number(t, "episode type"))?;
    let number = if kind == Episode::REGULAR {
        EpisodeNumber::Regular(parse_number(epno.text(), "episode number")?)
    } else {
        EpisodeNumber::Special(epno.text().to_string())
    };

    Ok(Episode {
        id,
        anime_id,
        titles: decode_titles(node)?,
        airdate: optional_date(node, "airdate")?,
        kind,
        number,
        length: node.child_text("length").map(str::to_string),
        default_lang: default_lang.to_string(),
    })
}

pub fn decode_category(node: &Element) -> Result<Category> {
    let id = node
        .attr("id")
        .ok_or_else(|| AnidbError::decode("category without id"))?;
    let name = node
        .child_text("name")
        .ok_or_else(|| AnidbError::decode(format!("category {} has no name", id)))?;

    Ok(Category {
        id: id.to_string(),
        hentai: parse_flag(node.attr("hentai")),
        weight: node.attr("weight").unwrap_or_default().to_string(),
        name: name.to_string(),
        description: node.child_text("description").unwrap_or_default().to_string(),
    })
}

pub fn decode_tag(node: &Element) -> Result<Tag> {
    let id = node
        .attr("id")
        .ok_or_else(|| AnidbError::decode("tag without id"))?;
    let name = node
        .child_text("name")
        .ok_or_else(|| AnidbError::decode(format!("tag {} has no name", id)))?;
    let updated = node
        .attr("update")
        .ok_or_else(|| AnidbError::decode(format!("tag {} has no update date", id)))
        .and_then(parse_date)?;
    // Older payloads carry <count>, current ones a weight attribute
    let count = node
        .child_text("count")
        .or_else(|| node.attr("weight"))
        .ok_or_else(|| AnidbError::decode(format!("tag {} has no count", id)))
        .and_then(|c| parse_number(c, "tag count"))?;

    Ok(Tag {
        id: id.to_string(),
        spoiler: parse_flag(node.attr("spoiler")),
        local_spoiler: parse_flag(node.attr("localspoiler")),
        global_spoiler: parse_flag(node.attr("globalspoiler")),
        updated,
        name: name.to_string(),
        description: node.child_text("description").map(str::to_string),
        count,
    })
}

/// An empty rating element counts as absent.
pub fn decode_ratings(node: Option<&Element>) -> Ratings {
    let Some(node) = node else {
        return Ratings::default();
    };
    let rating = |name: &str| node.child_text(name).map(str::to_string);
    Ratings {
        permanent: rating("permanent"),
        temporary: rating("temporary"),
        review: rating("review"),
    }
}

/// Parse a strict `YYYY-MM-DD` date.
pub fn parse_date(text: &str) -> Result<NaiveDate> {
    let bytes = text.as_bytes();
    let shaped = bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        });
    if !shaped {
        return Err(AnidbError::decode(format!("invalid date '{}'", text)));
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .map_err(|e| AnidbError::decode(format!("invalid date '{}': {}", text, e)))
}

fn optional_date(node: &Element, name: &str) -> Result<Option<NaiveDate>> {
    node.child_text(name).map(parse_date).transpose()
}

fn parse_number(text: &str, field: &str) -> Result<u32> {
    text.trim()
        .parse()
        .map_err(|_| AnidbError::decode(format!("invalid {} '{}'", field, text)))
}

fn parse_flag(value: Option<&str>) -> bool {
    matches!(value, Some(v) if v.eq_ignore_ascii_case("true"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = include_str!("../testdata/anime_full.xml");
    const REDUCED: &str = include_str!("../testdata/anime_search.xml");

    #[test]
    fn test_full_record() -> Result<()> {
        let anime = parse_anime(FULL, "en")?;

        assert_eq!(anime.id, 1);
        assert_eq!(anime.titles.len(), 5);
        assert_eq!(anime.title(None, None).map(|t| t.lang.as_str()), Some("x-jat"));
        assert_eq!(
            anime.synonyms().map(|t| t.text.as_str()).collect::<Vec<_>>(),
            vec!["Space Cowboy"]
        );
        assert_eq!(
            anime.picture.as_ref().map(Picture::url).as_deref(),
            Some("http://img7.anidb.net/pics/anime/4903.jpg")
        );
        assert_eq!(anime.start_date, NaiveDate::from_ymd_opt(1998, 4, 3));
        assert_eq!(anime.end_date, NaiveDate::from_ymd_opt(1999, 4, 24));
        assert!(anime.description.as_deref().unwrap().contains("planets & moons"));
        assert_eq!(anime.anime_type.as_deref(), Some("TV Series"));
        assert_eq!(anime.episode_count, Some(26));
        assert!(!anime.restricted);
        assert_eq!(anime.categories.len(), 2);
        assert_eq!(anime.categories[1].name, "Bounty Hunting");
        assert_eq!(anime.categories[1].weight, "300");
        Ok(())
    }

    #[test]
    fn test_episodes_sorted_by_type_then_number() -> Result<()> {
        let anime = parse_anime(FULL, "en")?;

        let order: Vec<(u32, String)> = anime
            .all_episodes
            .iter()
            .map(|e| (e.kind, e.number.to_string()))
            .collect();
        assert_eq!(
            order,
            vec![
                (1, "1".to_string()),
                (1, "2".to_string()),
                (2, "S1".to_string()),
                (3, "C1".to_string()),
            ]
        );

        let episodes = anime.episodes();
        assert_eq!(episodes.keys().copied().collect::<Vec<_>>(), vec![1, 2]);
        let first = episodes[&1];
        assert_eq!(first.anime_id, 1);
        assert_eq!(first.airdate, NaiveDate::from_ymd_opt(1998, 10, 24));
        assert_eq!(first.length.as_deref(), Some("25"));
        assert_eq!(first.title(None).unwrap().text, "Asteroid Blues");
        assert_eq!(anime.all_episodes[3].airdate, None);
        Ok(())
    }

    #[test]
    fn test_episode_ordering_from_mixed_types() -> Result<()> {
        let root = Element::parse(
            r#"<anime id="9"><titles><title xml:lang="en" type="main">X</title></titles>
            <episodes>
              <episode id="1"><epno type="1">2</epno></episode>
              <episode id="2"><epno type="1">1</epno></episode>
              <episode id="3"><epno type="2">1</epno></episode>
            </episodes></anime>"#,
        )?;
        let anime = decode_anime(&root, "en")?;
        let ids: Vec<u32> = anime.all_episodes.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![2, 1, 3]);
        Ok(())
    }

    #[test]
    fn test_tags_sorted_by_count() -> Result<()> {
        let anime = parse_anime(FULL, "en")?;

        let names: Vec<&str> = anime.tags.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["military", "space travel", "science fiction"]);

        let military = &anime.tags[0];
        assert!(military.spoiler && military.global_spoiler && !military.local_spoiler);
        assert_eq!(military.description, None);
        assert_eq!(military.updated, NaiveDate::from_ymd_opt(2017, 6, 2).unwrap());
        Ok(())
    }

    #[test]
    fn test_equal_episode_keys_keep_document_order() -> Result<()> {
        let root = Element::parse(
            r#"<anime id="9"><titles><title xml:lang="en" type="main">X</title></titles>
            <episodes>
              <episode id="5"><epno type="1">1</epno></episode>
              <episode id="6"><epno type="2">S1</epno></episode>
              <episode id="4"><epno type="1">1</epno></episode>
              <episode id="7"><epno type="2">S1</epno></episode>
            </episodes></anime>"#,
        )?;
        let anime = decode_anime(&root, "en")?;
        let ids: Vec<u32> = anime.all_episodes.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![5, 4, 6, 7]);
        Ok(())
    }

    #[test]
    fn test_equal_tag_weights_keep_document_order() -> Result<()> {
        let root = Element::parse(
            r#"<anime id="9"><titles><title xml:lang="en" type="main">X</title></titles>
            <tags>
              <tag id="3" weight="300" update="2020-01-01"><name>drama</name></tag>
              <tag id="1" weight="100" update="2020-01-01"><name>comedy</name></tag>
              <tag id="2" weight="300" update="2020-01-01"><name>action</name></tag>
            </tags></anime>"#,
        )?;
        let anime = decode_anime(&root, "en")?;
        let ids: Vec<&str> = anime.tags.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "3", "2"]);
        Ok(())
    }

    #[test]
    fn test_empty_rating_is_unset() -> Result<()> {
        let anime = parse_anime(FULL, "en")?;
        assert_eq!(anime.ratings.permanent.as_deref(), Some("8.77"));
        assert_eq!(anime.ratings.temporary.as_deref(), Some("8.80"));
        assert_eq!(anime.ratings.review, None);

        let root = Element::parse("<ratings><permanent></permanent><review/></ratings>")?;
        assert_eq!(decode_ratings(Some(&root)), Ratings::default());
        assert_eq!(decode_ratings(None), Ratings::default());
        Ok(())
    }

    #[test]
    fn test_reduced_record() -> Result<()> {
        let anime = parse_anime(REDUCED, "en")?;

        assert_eq!(anime.id, 1);
        assert_eq!(anime.titles.len(), 2);
        assert!(anime.all_episodes.is_empty());
        assert!(anime.tags.is_empty() && anime.categories.is_empty());
        assert_eq!(anime.picture, None);
        assert_eq!(anime.ratings, Ratings::default());
        assert_eq!(anime.start_date, None);
        assert_eq!(anime.description, None);
        Ok(())
    }

    #[test]
    fn test_title_without_language() {
        let result = parse_anime(
            r#"<anime id="3"><titles><title type="main">Nameless</title></titles></anime>"#,
            "en",
        );
        assert!(matches!(result, Err(AnidbError::Decode(_))));
    }

    #[test]
    fn test_missing_id_or_titles() {
        assert!(matches!(
            parse_anime(r#"<anime><title xml:lang="en">X</title></anime>"#, "en"),
            Err(AnidbError::Decode(_))
        ));
        assert!(matches!(
            parse_anime(r#"<anime id="4"><titles/></anime>"#, "en"),
            Err(AnidbError::Decode(_))
        ));
    }

    #[test]
    fn test_remote_error_document() {
        let result = parse_anime(r#"<error code="500">Banned</error>"#, "en");
        match result {
            Err(AnidbError::Decode(message)) => assert!(message.contains("Banned")),
            other => panic!("expected decode error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date("2001-09-01").ok(), NaiveDate::from_ymd_opt(2001, 9, 1));
        assert!(parse_date("2001").is_err());
        assert!(parse_date("2001-09").is_err());
        assert!(parse_date("2001-13-01").is_err());
        assert!(parse_date("01-09-2001").is_err());
    }

    #[test]
    fn test_partial_start_date_rejected() {
        let result = parse_anime(
            r#"<anime id="5"><titles><title xml:lang="en" type="main">X</title></titles>
            <startdate>2015-04</startdate></anime>"#,
            "en",
        );
        assert!(matches!(result, Err(AnidbError::Decode(_))));
    }

    #[test]
    fn test_special_episode_keeps_raw_number() -> Result<()> {
        let root = Element::parse(r#"<episode id="7"><epno type="2">S2</epno></episode>"#)?;
        let episode = decode_episode(&root, 1, "en")?;
        assert_eq!(episode.number, EpisodeNumber::Special("S2".to_string()));

        let root = Element::parse(r#"<episode id="8"><epno type="1">S2</epno></episode>"#)?;
        assert!(decode_episode(&root, 1, "en").is_err());
        Ok(())
    }
}
