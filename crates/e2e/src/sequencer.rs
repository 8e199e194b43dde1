//! Ordered page interactions, each followed by a settle wait

use std::fmt;
use std::time::Instant;
use tracing::{debug, warn};

use crate::config::HarnessConfig;
use crate::error::{E2eError, E2eResult};
use crate::oracle;
use crate::snapshot::{self, Covers, Snapshot};
use crate::surface::{Condition, ElementRef, Surface, Timing};

/// What a settled table must show before it is trusted
#[derive(Debug, Clone, Copy)]
pub enum Effect<'a> {
    /// At least one row rendered
    Populated,
    /// A search for `term` was applied to the `before` listing
    Filtered { before: &'a Snapshot, term: &'a str },
    /// The table is back to an earlier listing
    Restored(&'a Snapshot),
    /// The row order moved away from `before`, or already matches `target`
    Reordered { before: &'a Snapshot, target: &'a [String] },
    /// Anything differs from `before`
    Changed(&'a Snapshot),
}

impl Effect<'_> {
    pub fn observed(&self, current: &Snapshot) -> bool {
        match self {
            Effect::Populated => !current.is_empty(),
            Effect::Filtered { before, term } => {
                let term = oracle::canonical(term);
                current != *before
                    || current
                        .rows()
                        .iter()
                        .all(|r| oracle::canonical(&r.title).contains(&term))
            }
            Effect::Restored(listing) => current == *listing,
            Effect::Reordered { before, target } => {
                let titles = current.titles();
                titles != before.titles() || titles.as_slice() == *target
            }
            Effect::Changed(before) => current != *before,
        }
    }

    /// Whether the table is meaningless until the effect shows
    pub fn required(&self) -> bool {
        matches!(
            self,
            Effect::Populated | Effect::Filtered { .. } | Effect::Restored(_)
        )
    }
}

impl fmt::Display for Effect<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Effect::Populated => f.write_str("table rows to render"),
            Effect::Filtered { term, .. } => write!(f, "search results for {:?}", term),
            Effect::Restored(_) => f.write_str("the unfiltered listing to return"),
            Effect::Reordered { .. } => f.write_str("the row order to change"),
            Effect::Changed(_) => f.write_str("the table to react"),
        }
    }
}

/// Drives one surface on behalf of a scenario
pub struct Sequencer<'a, S: Surface + ?Sized> {
    surface: &'a mut S,
    config: &'a HarnessConfig,
    timing: Timing,
}

impl<'a, S: Surface + ?Sized> Sequencer<'a, S> {
    pub fn new(surface: &'a mut S, config: &'a HarnessConfig) -> Self {
        Self {
            surface,
            config,
            timing: config.settle.timing(),
        }
    }

    pub fn config(&self) -> &'a HarnessConfig {
        self.config
    }

    /// Load the books page and wait for the search box
    pub async fn open_origin(&mut self) -> E2eResult<()> {
        debug!("Opening {}", self.config.target_url);
        self.surface.navigate(&self.config.target_url).await?;
        self.search_input().await?;
        Ok(())
    }

    async fn search_input(&mut self) -> E2eResult<ElementRef> {
        self.surface
            .wait_until(&self.config.selectors.search_input, Condition::Present, self.timing)
            .await
    }

    /// Type `term` into the search box
    pub async fn search(&mut self, term: &str) -> E2eResult<()> {
        let input = self.search_input().await?;
        debug!("Searching for {:?}", term);
        self.surface.set_text(&input, term).await
    }

    /// Empty the search box, reloading the page if that fails
    pub async fn clear_search(&mut self) -> E2eResult<()> {
        let cleared = match self.search_input().await {
            Ok(input) => self.surface.clear(&input).await,
            Err(e) => Err(e),
        };
        if let Err(e) = cleared {
            warn!("Clearing search failed ({}), reloading page", e);
            self.open_origin().await?;
        }
        Ok(())
    }

    /// Read the table once `effect` shows on it and it stops changing.
    ///
    /// The table is polled until the effect is observed, then until two
    /// consecutive reads agree. Each phase is bounded by the settle timeout.
    /// A required effect that never shows is a timeout; an optional one only
    /// logs a warning and the table is read as it is.
    pub async fn settled_snapshot(&mut self, effect: Effect<'_>, covers: Covers) -> E2eResult<Snapshot> {
        let selectors = &self.config.selectors;

        let start = Instant::now();
        let mut current = snapshot::extract(&mut *self.surface, selectors, covers).await?;
        while !effect.observed(&current) {
            if start.elapsed() >= self.timing.timeout {
                if effect.required() {
                    return Err(E2eError::timeout(effect.to_string(), self.timing.timeout));
                }
                warn!("No sign of {}, reading the table as it is", effect);
                break;
            }
            tokio::time::sleep(self.timing.poll_interval).await;
            current = snapshot::extract(&mut *self.surface, selectors, covers).await?;
        }

        let start = Instant::now();
        loop {
            tokio::time::sleep(self.timing.poll_interval).await;
            let next = snapshot::extract(&mut *self.surface, selectors, covers).await?;
            if next == current {
                return Ok(next);
            }
            if start.elapsed() >= self.timing.timeout {
                return Err(E2eError::timeout("table rows to settle", self.timing.timeout));
            }
            current = next;
        }
    }

    /// First row whose title link has text, with that link
    pub async fn first_title_link(&mut self) -> E2eResult<Option<(String, ElementRef)>> {
        let selectors = &self.config.selectors;
        let rows = self.surface.find_all(&selectors.rows).await?;
        for row in &rows {
            let link = match self.surface.find_in(row, &selectors.row_title_link).await {
                Ok(Some(link)) => link,
                Ok(None) => continue,
                Err(e) => {
                    debug!("Skipping row without link: {}", e);
                    continue;
                }
            };
            let title = match self.surface.text(&link).await {
                Ok(text) => text.trim().to_string(),
                Err(e) => {
                    debug!("Skipping unreadable link: {}", e);
                    continue;
                }
            };
            if !title.is_empty() {
                return Ok(Some((title, link)));
            }
        }
        Ok(None)
    }

    pub async fn click(&mut self, element: &ElementRef) -> E2eResult<()> {
        self.surface.click(element).await
    }

    /// Wait for the title header to become clickable, then click it
    pub async fn toggle_title_sort(&mut self) -> E2eResult<()> {
        let header = self
            .surface
            .wait_until(&self.config.selectors.title_header, Condition::Clickable, self.timing)
            .await?;
        debug!("Toggling title sort");
        self.surface.click(&header).await
    }

    /// Poll the location until it contains `marker`; returns the last
    /// location seen either way
    pub async fn settle_location(&mut self, marker: &str) -> E2eResult<String> {
        let start = Instant::now();
        loop {
            let location = self.surface.current_url().await?;
            if location.contains(marker) || start.elapsed() >= self.timing.timeout {
                return Ok(location);
            }
            tokio::time::sleep(self.timing.poll_interval).await;
        }
    }

    /// Poll until at least one detail landmark renders; returns how many
    /// distinct landmarks are present at the end of the wait
    pub async fn settle_landmarks(&mut self) -> E2eResult<usize> {
        let start = Instant::now();
        loop {
            let mut found = 0;
            for landmark in &self.config.selectors.detail_landmarks {
                match self.surface.find_all(landmark).await {
                    Ok(matches) if !matches.is_empty() => found += 1,
                    Ok(_) => {}
                    Err(e) if e.is_not_found() => {}
                    Err(e) => return Err(e),
                }
            }
            if found > 0 || start.elapsed() >= self.timing.timeout {
                return Ok(found);
            }
            tokio::time::sleep(self.timing.poll_interval).await;
        }
    }

    pub async fn page_source(&mut self) -> E2eResult<String> {
        self.surface.page_source().await
    }
}
