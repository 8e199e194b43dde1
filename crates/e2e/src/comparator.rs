//! Observed vs expected, as verdicts
//!
//! Pure functions only. Sequences compare positionally, counts by value, and
//! every mismatch message names both sides.

use crate::oracle::{CoverCheck, NavigationCheck};
use crate::recorder::Verdict;
use crate::scenario::ScenarioId;

/// Describe how two sequences differ, or `None` if they are equal
pub fn sequence_mismatch(observed: &[String], expected: &[String]) -> Option<String> {
    if let Some(index) = observed.iter().zip(expected).position(|(o, e)| o != e) {
        return Some(format!(
            "position {}: observed {:?}, expected {:?}",
            index, observed[index], expected[index]
        ));
    }
    if observed.len() != expected.len() {
        return Some(format!(
            "observed {} title(s), expected {}",
            observed.len(),
            expected.len()
        ));
    }
    None
}

pub fn cover_verdict(title: &str, check: &CoverCheck) -> Verdict {
    let id = ScenarioId::CoverConsistency;
    match check {
        CoverCheck::Consistent => Verdict::pass(id, format!("Cover is consistent for '{}'", title)),
        CoverCheck::Mismatch { unfiltered, filtered } => Verdict::fail(
            id,
            format!(
                "Cover differs for '{}': listing shows {}, search result shows {}",
                title, unfiltered, filtered
            ),
        ),
        CoverCheck::MissingInFiltered => Verdict::fail(
            id,
            format!("'{}' or its cover is missing from the search results", title),
        ),
        CoverCheck::MissingInUnfiltered => {
            Verdict::fail(id, format!("'{}' has no cover in the initial listing", title))
        }
    }
}

/// `counts` holds each searched variant with the number of rows it returned;
/// `expected_min` is how many listed titles contain the term.
pub fn case_verdict(counts: &[(String, usize)], expected_min: usize) -> Verdict {
    let id = ScenarioId::CaseInsensitiveSearch;
    let summary = counts
        .iter()
        .map(|(variant, n)| format!("'{}'={}", variant, n))
        .collect::<Vec<_>>()
        .join(", ");

    let Some(&(_, first)) = counts.first() else {
        return Verdict::fail(id, "No search variants were run");
    };
    if counts.iter().any(|&(_, n)| n != first) {
        return Verdict::fail(id, format!("Results differ by case: {}", summary));
    }
    if first == 0 {
        return Verdict::fail(id, format!("No results for any case: {}", summary));
    }
    if first < expected_min {
        return Verdict::fail(
            id,
            format!(
                "All variants returned {} result(s) but {} listed title(s) contain the term",
                first, expected_min
            ),
        );
    }
    Verdict::pass(id, format!("All variants returned {} result(s)", first))
}

pub fn navigation_verdict(title: &str, location: &str, check: &NavigationCheck) -> Verdict {
    let id = ScenarioId::DetailNavigation;
    match check {
        NavigationCheck::Reached => {
            Verdict::pass(id, format!("Navigated to the details of '{}'", title))
        }
        NavigationCheck::WrongLocation => Verdict::fail(
            id,
            format!("URL did not change to a book page after clicking '{}': {}", title, location),
        ),
        NavigationCheck::NoLandmarks => Verdict::fail(
            id,
            format!("Reached {} but no detail elements rendered", location),
        ),
    }
}

/// `leak` is the pattern and fingerprint that exposed a backend error, if any
pub fn injection_verdict(attempted: usize, leak: Option<(&str, &str)>) -> Verdict {
    let id = ScenarioId::InjectionSafety;
    match leak {
        Some((pattern, fingerprint)) => Verdict::fail(
            id,
            format!(
                "Backend error '{}' exposed by pattern {:?} (attempt {})",
                fingerprint, pattern, attempted
            ),
        ),
        None => Verdict::pass(id, format!("All {} injection patterns handled safely", attempted)),
    }
}

pub fn sort_verdict(
    ascending: &[String],
    descending: &[String],
    expected_ascending: &[String],
    expected_descending: &[String],
) -> Verdict {
    let id = ScenarioId::TitleSort;
    let asc = sequence_mismatch(ascending, expected_ascending);
    let desc = sequence_mismatch(descending, expected_descending);

    match (asc, desc) {
        (None, None) => Verdict::pass(id, "Ascending and descending sort are correct"),
        (None, Some(d)) => Verdict::fail(id, format!("Ascending sort correct, descending wrong at {}", d)),
        (Some(a), None) => Verdict::fail(id, format!("Descending sort correct, ascending wrong at {}", a)),
        (Some(a), Some(d)) => Verdict::fail(
            id,
            format!("Both sorts wrong; ascending at {}; descending at {}", a, d),
        ),
    }
}
