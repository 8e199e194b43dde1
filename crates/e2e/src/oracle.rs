//! Expected outcomes computed without asking the page
//!
//! Each function here restates what the table *should* do from first
//! principles, so a bug in the page's own filtering or sorting cannot leak
//! into the expectation.

use crate::snapshot::Snapshot;

/// Case-insensitive key used for ordering and matching
pub fn canonical(text: &str) -> String {
    text.to_lowercase()
}

/// Titles in ascending order by canonical key; ties keep their input order
pub fn sort_ascending(titles: &[String]) -> Vec<String> {
    let mut sorted = titles.to_vec();
    sorted.sort_by_cached_key(|t| canonical(t));
    sorted
}

/// Exactly the reverse of [`sort_ascending`]
pub fn sort_descending(titles: &[String]) -> Vec<String> {
    let mut sorted = sort_ascending(titles);
    sorted.reverse();
    sorted
}

/// Upper, lower and alternating-case forms of `term`
///
/// The alternating form starts lowercase: `Git` becomes `gIt`.
pub fn case_variants(term: &str) -> [String; 3] {
    let mixed = term
        .chars()
        .enumerate()
        .flat_map(|(i, c)| {
            if i % 2 == 0 {
                c.to_lowercase().collect::<Vec<_>>()
            } else {
                c.to_uppercase().collect::<Vec<_>>()
            }
        })
        .collect();
    [term.to_uppercase(), term.to_lowercase(), mixed]
}

/// Titles in the unfiltered listing that a search for `term` must return
pub fn expected_matches(listing: &Snapshot, term: &str) -> usize {
    let needle = canonical(term);
    listing
        .rows()
        .iter()
        .filter(|r| canonical(&r.title).contains(&needle))
        .count()
}

/// Pick the title the cover check should follow
pub fn cover_target<'a>(
    sample: &'a Snapshot,
    wanted: &str,
    fall_back: bool,
) -> Option<&'a str> {
    let with_cover = |title: &str| sample.cover_of(title).is_some();
    if with_cover(wanted) {
        return sample.find(wanted).map(|r| r.title.as_str());
    }
    if fall_back {
        return sample
            .rows()
            .iter()
            .find(|r| r.cover.is_some())
            .map(|r| r.title.as_str());
    }
    None
}

/// Cover consistency: the same title must render the same cover everywhere
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoverCheck {
    Consistent,
    Mismatch { unfiltered: String, filtered: String },
    MissingInFiltered,
    MissingInUnfiltered,
}

pub fn check_cover(unfiltered: &Snapshot, filtered: &Snapshot, title: &str) -> CoverCheck {
    let Some(before) = unfiltered.cover_of(title) else {
        return CoverCheck::MissingInUnfiltered;
    };
    match filtered.cover_of(title) {
        Some(after) if after == before => CoverCheck::Consistent,
        Some(after) => CoverCheck::Mismatch {
            unfiltered: before.to_string(),
            filtered: after.to_string(),
        },
        None => CoverCheck::MissingInFiltered,
    }
}

/// Navigation: the URL must carry the item marker AND a landmark must render
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationCheck {
    Reached,
    WrongLocation,
    NoLandmarks,
}

pub fn check_navigation(location: &str, marker: &str, landmarks_found: usize) -> NavigationCheck {
    if !location.contains(marker) {
        NavigationCheck::WrongLocation
    } else if landmarks_found == 0 {
        NavigationCheck::NoLandmarks
    } else {
        NavigationCheck::Reached
    }
}

/// First backend-error fingerprint present in the page markup, if any
pub fn find_fingerprint<'a>(markup: &str, fingerprints: &'a [String]) -> Option<&'a str> {
    let markup = markup.to_lowercase();
    fingerprints
        .iter()
        .map(String::as_str)
        .find(|f| markup.contains(&f.to_lowercase()))
}
