//! Substring search over the title index.

use crate::titles::TitleIndexEntry;

/// Case-insensitive substring search.
///
/// An entry matches when any of its titles contains `term`. Each entry is
/// returned at most once, in index order; an empty term matches everything.
pub fn search<'a>(entries: &'a [TitleIndexEntry], term: &str) -> Vec<&'a TitleIndexEntry> {
    let term = term.to_lowercase();
    entries
        .iter()
        .filter(|entry| {
            entry
                .titles
                .iter()
                .any(|title| title.text.to_lowercase().contains(&term))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Title;

    fn entry(aid: u32, titles: &[(&str, &str)]) -> TitleIndexEntry {
        TitleIndexEntry {
            aid,
            titles: titles
                .iter()
                .map(|(lang, text)| Title {
                    lang: lang.to_string(),
                    kind: None,
                    text: text.to_string(),
                })
                .collect(),
        }
    }

    fn index() -> Vec<TitleIndexEntry> {
        vec![
            entry(1, &[("en", "Cowboy Bebop")]),
            entry(2, &[("ja", "Naruto")]),
            entry(3, &[("en", "Naruto Shippuuden"), ("x-jat", "Naruto: Shippuuden")]),
        ]
    }

    fn aids(results: &[&TitleIndexEntry]) -> Vec<u32> {
        results.iter().map(|e| e.aid).collect()
    }

    #[test]
    fn test_search_single_match() {
        let entries = index();
        assert_eq!(aids(&search(&entries, "bebop")), vec![1]);
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let entries = index();
        assert_eq!(aids(&search(&entries, "NARUTO")), vec![2, 3]);
        assert_eq!(aids(&search(&entries, "cOwBoY")), vec![1]);
    }

    #[test]
    fn test_entry_matches_once() {
        let entries = index();
        // both titles of aid 3 contain the term
        assert_eq!(aids(&search(&entries, "shippuuden")), vec![3]);
    }

    #[test]
    fn test_empty_term_matches_all() {
        let entries = index();
        assert_eq!(aids(&search(&entries, "")), vec![1, 2, 3]);
    }

    #[test]
    fn test_no_match() {
        let entries = index();
        assert!(search(&entries, "evangelion").is_empty());
    }
}
