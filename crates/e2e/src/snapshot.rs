//! Reading the rendered book table into values

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::Selectors;
use crate::error::E2eResult;
use crate::surface::{ElementRef, Surface};

/// One visible table row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    /// Never empty
    pub title: String,

    /// Cover image `src`, when covers were requested and present
    pub cover: Option<String>,
}

/// Rows in visual order at one instant
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    rows: Vec<Row>,
}

impl Snapshot {
    pub fn new(rows: Vec<Row>) -> Self {
        Self {
            rows: rows
                .into_iter()
                .filter(|r| !r.title.trim().is_empty())
                .collect(),
        }
    }

    /// Snapshot of titles only; handy for oracles and tests
    pub fn from_titles<I, T>(titles: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self::new(
            titles
                .into_iter()
                .map(|t| Row {
                    title: t.into(),
                    cover: None,
                })
                .collect(),
        )
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn titles(&self) -> Vec<String> {
        self.rows.iter().map(|r| r.title.clone()).collect()
    }

    pub fn find(&self, title: &str) -> Option<&Row> {
        self.rows.iter().find(|r| r.title == title)
    }

    pub fn cover_of(&self, title: &str) -> Option<&str> {
        self.find(title).and_then(|r| r.cover.as_deref())
    }

    /// The first `n` rows as a new snapshot
    pub fn first(&self, n: usize) -> Snapshot {
        Snapshot {
            rows: self.rows.iter().take(n).cloned().collect(),
        }
    }
}

/// Whether the extractor should also resolve cover images
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Covers {
    Skip,
    Read,
}

/// Read every table row currently rendered.
///
/// Only a failure to list the rows propagates; a row that cannot be read is
/// left out.
pub async fn extract<S>(surface: &mut S, selectors: &Selectors, covers: Covers) -> E2eResult<Snapshot>
where
    S: Surface + ?Sized,
{
    let elements = surface.find_all(&selectors.rows).await?;
    let mut rows = Vec::with_capacity(elements.len());

    for (index, element) in elements.iter().enumerate() {
        match read_row(surface, element, selectors, covers).await {
            Ok(Some(row)) => rows.push(row),
            Ok(None) => {}
            Err(e) => debug!("Skipping row {}: {}", index, e),
        }
    }

    Ok(Snapshot { rows })
}

async fn read_row<S>(
    surface: &mut S,
    row: &ElementRef,
    selectors: &Selectors,
    covers: Covers,
) -> E2eResult<Option<Row>>
where
    S: Surface + ?Sized,
{
    let Some(title_element) = surface.find_in(row, &selectors.row_title).await? else {
        return Ok(None);
    };
    let title = surface.text(&title_element).await?.trim().to_string();
    if title.is_empty() {
        return Ok(None);
    }

    let cover = match covers {
        Covers::Skip => None,
        Covers::Read => match surface.find_in(row, &selectors.row_cover).await? {
            Some(img) => surface
                .attribute(&img, "src")
                .await?
                .map(|src| src.trim().to_string())
                .filter(|src| !src.is_empty()),
            None => None,
        },
    };

    Ok(Some(Row { title, cover }))
}
