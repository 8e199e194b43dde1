//! The five fixed scenario checks
//!
//! Every scenario follows the same shape: drive the page through the
//! [`Sequencer`], read snapshots, ask the [`oracle`] what should have
//! happened, and let the [`comparator`] turn the two into a [`Verdict`].
//! Errors are returned, not handled; the orchestrator turns them into
//! failing verdicts.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

use crate::comparator;
use crate::config::MissingTitlePolicy;
use crate::error::E2eResult;
use crate::oracle;
use crate::recorder::Verdict;
use crate::sequencer::{Effect, Sequencer};
use crate::snapshot::Covers;
use crate::surface::Surface;

/// Stable identifier of a scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScenarioId {
    #[serde(rename = "TC-001")]
    CoverConsistency,
    #[serde(rename = "TC-002")]
    CaseInsensitiveSearch,
    #[serde(rename = "TC-003")]
    DetailNavigation,
    #[serde(rename = "TC-004")]
    InjectionSafety,
    #[serde(rename = "TC-005")]
    TitleSort,
}

impl ScenarioId {
    /// Run order
    pub const ALL: [ScenarioId; 5] = [
        ScenarioId::CoverConsistency,
        ScenarioId::CaseInsensitiveSearch,
        ScenarioId::DetailNavigation,
        ScenarioId::InjectionSafety,
        ScenarioId::TitleSort,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ScenarioId::CoverConsistency => "TC-001",
            ScenarioId::CaseInsensitiveSearch => "TC-002",
            ScenarioId::DetailNavigation => "TC-003",
            ScenarioId::InjectionSafety => "TC-004",
            ScenarioId::TitleSort => "TC-005",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::CoverConsistency => "Search a book and check cover consistency",
            ScenarioId::CaseInsensitiveSearch => "Case-insensitive search",
            ScenarioId::DetailNavigation => "Navigate to a book's detail page",
            ScenarioId::InjectionSafety => "Search input resists SQL injection",
            ScenarioId::TitleSort => "Sort by the Title column",
        }
    }
}

impl fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Run one scenario body
pub async fn execute<S>(id: ScenarioId, seq: &mut Sequencer<'_, S>) -> E2eResult<Verdict>
where
    S: Surface + ?Sized,
{
    debug!("Running {} ({})", id, id.name());
    match id {
        ScenarioId::CoverConsistency => {
            let verdict = cover_consistency(seq).await;
            reset_search(seq).await;
            verdict
        }
        ScenarioId::CaseInsensitiveSearch => {
            let verdict = case_insensitive_search(seq).await;
            reset_search(seq).await;
            verdict
        }
        ScenarioId::DetailNavigation => detail_navigation(seq).await,
        ScenarioId::InjectionSafety => injection_safety(seq).await,
        ScenarioId::TitleSort => title_sort(seq).await,
    }
}

async fn reset_search<S: Surface + ?Sized>(seq: &mut Sequencer<'_, S>) {
    if let Err(e) = seq.clear_search().await {
        warn!("Could not reset search: {}", e);
    }
}

async fn cover_consistency<S: Surface + ?Sized>(seq: &mut Sequencer<'_, S>) -> E2eResult<Verdict> {
    let id = ScenarioId::CoverConsistency;
    let data = &seq.config().scenarios;

    seq.open_origin().await?;
    let listing = seq.settled_snapshot(Effect::Populated, Covers::Read).await?;
    let sample = listing.first(data.cover_sample);
    if sample.rows().iter().all(|r| r.cover.is_none()) {
        return Ok(Verdict::fail(id, "No book with a cover in the initial listing"));
    }

    let fall_back = data.missing_title == MissingTitlePolicy::FirstAvailable;
    let Some(title) = oracle::cover_target(&sample, &data.cover_title, fall_back) else {
        return Ok(Verdict::fail(
            id,
            format!(
                "'{}' is not among the first {} listed books",
                data.cover_title, data.cover_sample
            ),
        ));
    };
    let title = title.to_string();
    if title != data.cover_title {
        warn!("'{}' not listed, checking '{}' instead", data.cover_title, title);
    }

    seq.search(&title).await?;
    let filtered = seq
        .settled_snapshot(
            Effect::Filtered {
                before: &listing,
                term: &title,
            },
            Covers::Read,
        )
        .await?;

    Ok(comparator::cover_verdict(
        &title,
        &oracle::check_cover(&sample, &filtered, &title),
    ))
}

async fn case_insensitive_search<S: Surface + ?Sized>(
    seq: &mut Sequencer<'_, S>,
) -> E2eResult<Verdict> {
    let term = &seq.config().scenarios.case_term;

    seq.open_origin().await?;
    let listing = seq.settled_snapshot(Effect::Populated, Covers::Skip).await?;
    let expected = oracle::expected_matches(&listing, term);

    let mut counts = Vec::with_capacity(3);
    for variant in oracle::case_variants(term) {
        seq.search(&variant).await?;
        let results = seq
            .settled_snapshot(
                Effect::Filtered {
                    before: &listing,
                    term: &variant,
                },
                Covers::Skip,
            )
            .await?;
        debug!("'{}' matched {} row(s)", variant, results.len());
        counts.push((variant, results.len()));

        seq.clear_search().await?;
        seq.settled_snapshot(Effect::Restored(&listing), Covers::Skip).await?;
    }

    Ok(comparator::case_verdict(&counts, expected))
}

async fn detail_navigation<S: Surface + ?Sized>(seq: &mut Sequencer<'_, S>) -> E2eResult<Verdict> {
    let id = ScenarioId::DetailNavigation;
    let marker = &seq.config().scenarios.detail_url_marker;

    seq.open_origin().await?;
    seq.settled_snapshot(Effect::Populated, Covers::Skip).await?;
    let Some((title, link)) = seq.first_title_link().await? else {
        return Ok(Verdict::fail(id, "No clickable book title found"));
    };

    seq.click(&link).await?;
    let location = seq.settle_location(marker).await?;
    let landmarks = if location.contains(marker.as_str()) {
        seq.settle_landmarks().await?
    } else {
        0
    };

    Ok(comparator::navigation_verdict(
        &title,
        &location,
        &oracle::check_navigation(&location, marker, landmarks),
    ))
}

async fn injection_safety<S: Surface + ?Sized>(seq: &mut Sequencer<'_, S>) -> E2eResult<Verdict> {
    let id = ScenarioId::InjectionSafety;
    let data = &seq.config().scenarios;

    for (tried, pattern) in data.injection_patterns.iter().enumerate() {
        // Fresh page per pattern so one pattern cannot taint the next.
        match seq.open_origin().await {
            Ok(()) => {}
            Err(e) if e.is_timeout() => {
                return Ok(Verdict::fail(id, format!("Search box not found: {}", e)));
            }
            Err(e) => return Err(e),
        }

        let listing = seq.settled_snapshot(Effect::Populated, Covers::Skip).await?;
        seq.search(pattern).await?;
        seq.settled_snapshot(Effect::Changed(&listing), Covers::Skip).await?;
        let markup = seq.page_source().await?;

        if let Some(fingerprint) = oracle::find_fingerprint(&markup, &data.error_fingerprints) {
            return Ok(comparator::injection_verdict(
                tried + 1,
                Some((pattern.as_str(), fingerprint)),
            ));
        }
    }

    Ok(comparator::injection_verdict(data.injection_patterns.len(), None))
}

async fn title_sort<S: Surface + ?Sized>(seq: &mut Sequencer<'_, S>) -> E2eResult<Verdict> {
    let id = ScenarioId::TitleSort;

    seq.open_origin().await?;
    let listing = seq.settled_snapshot(Effect::Populated, Covers::Skip).await?;
    let initial = listing.titles();
    if initial.len() < 2 {
        return Ok(Verdict::fail(
            id,
            format!("Not enough books to check sorting ({} listed)", initial.len()),
        ));
    }

    match seq.toggle_title_sort().await {
        Ok(()) => {}
        Err(e) if e.is_timeout() => {
            return Ok(Verdict::fail(
                id,
                format!("Title column header not found or not clickable: {}", e),
            ));
        }
        Err(e) => return Err(e),
    }
    let expected_ascending = oracle::sort_ascending(&initial);
    let expected_descending = oracle::sort_descending(&initial);

    let ascending = seq
        .settled_snapshot(
            Effect::Reordered {
                before: &listing,
                target: &expected_ascending,
            },
            Covers::Skip,
        )
        .await?;

    seq.toggle_title_sort().await?;
    let descending = seq
        .settled_snapshot(
            Effect::Reordered {
                before: &ascending,
                target: &expected_descending,
            },
            Covers::Skip,
        )
        .await?;

    Ok(comparator::sort_verdict(
        &ascending.titles(),
        &descending.titles(),
        &expected_ascending,
        &expected_descending,
    ))
}
