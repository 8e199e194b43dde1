//! The browser capability surface consumed by the verification engine
//!
//! Everything the scenarios need from a browser goes through [`Surface`]. The
//! Chrome surface in [`crate::browser`] is the production implementation;
//! tests drive the same engine through an in-memory page.

use std::fmt;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{E2eError, E2eResult};

/// How to find an element on the page
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Locator {
    Css(String),
    #[serde(rename = "xpath")]
    XPath(String),
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Locator::Css(selector.into())
    }

    pub fn xpath(expr: impl Into<String>) -> Self {
        Locator::XPath(expr.into())
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Css(s) => write!(f, "css:{}", s),
            Locator::XPath(s) => write!(f, "xpath:{}", s),
        }
    }
}

/// Opaque handle to an element owned by the surface
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementRef(pub String);

impl ElementRef {
    pub fn id(&self) -> &str {
        &self.0
    }
}

/// Handle to a captured diagnostic (a screenshot on a real browser)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub name: String,

    /// Where the capture was written; `None` if the capture itself failed
    pub path: Option<PathBuf>,
}

impl Artifact {
    pub fn missing(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: None,
        }
    }
}

/// State an element must reach before a settle wait returns it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    Present,
    Clickable,
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Present => f.write_str("present"),
            Condition::Clickable => f.write_str("clickable"),
        }
    }
}

/// Bound and cadence of a polling wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            poll_interval: Duration::from_millis(100),
        }
    }
}

#[async_trait]
pub trait Surface: Send {
    async fn navigate(&mut self, url: &str) -> E2eResult<()>;

    /// All matches in document order.
    async fn find_all(&mut self, locator: &Locator) -> E2eResult<Vec<ElementRef>>;

    /// First match below `parent`, `None` when nothing matches. Only CSS
    /// locators are guaranteed to resolve below an element.
    async fn find_in(&mut self, parent: &ElementRef, locator: &Locator) -> E2eResult<Option<ElementRef>>;

    async fn text(&mut self, element: &ElementRef) -> E2eResult<String>;

    async fn attribute(&mut self, element: &ElementRef, name: &str) -> E2eResult<Option<String>>;

    async fn set_text(&mut self, element: &ElementRef, text: &str) -> E2eResult<()>;

    async fn clear(&mut self, element: &ElementRef) -> E2eResult<()>;

    async fn click(&mut self, element: &ElementRef) -> E2eResult<()>;

    /// Displayed and enabled.
    async fn is_clickable(&mut self, element: &ElementRef) -> E2eResult<bool>;

    async fn current_url(&mut self) -> E2eResult<String>;

    /// Freeze the current visual state under `name`.
    async fn capture(&mut self, name: &str) -> E2eResult<Artifact>;

    async fn page_source(&mut self) -> E2eResult<String>;

    async fn shutdown(&mut self) -> E2eResult<()>;

    /// Poll until the first match of `locator` satisfies `condition`.
    ///
    /// A missing element is treated as "not yet"; any other surface error
    /// ends the wait immediately.
    async fn wait_until(
        &mut self,
        locator: &Locator,
        condition: Condition,
        timing: Timing,
    ) -> E2eResult<ElementRef> {
        let start = Instant::now();
        loop {
            let first = match self.find_all(locator).await {
                Ok(found) => found.into_iter().next(),
                Err(e) if e.is_not_found() => None,
                Err(e) => return Err(e),
            };

            if let Some(element) = first {
                let ready = match condition {
                    Condition::Present => true,
                    Condition::Clickable => match self.is_clickable(&element).await {
                        Ok(clickable) => clickable,
                        Err(e) if e.is_not_found() => false,
                        Err(e) => return Err(e),
                    },
                };
                if ready {
                    return Ok(element);
                }
            }

            if start.elapsed() >= timing.timeout {
                return Err(E2eError::timeout(
                    format!("{} to be {}", locator, condition),
                    timing.timeout,
                ));
            }
            debug!("Waiting for {} to be {}", locator, condition);
            tokio::time::sleep(timing.poll_interval).await;
        }
    }
}
