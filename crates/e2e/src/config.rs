//! Harness configuration
//!
//! Everything has a default, so the harness runs with no file and no
//! environment at all. A TOML file can override any subset of fields, and a
//! handful of `SHELFCHECK_*` variables override the file.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{E2eError, E2eResult};
use crate::surface::{Locator, Timing};

pub const ENV_TARGET_URL: &str = "SHELFCHECK_TARGET_URL";
pub const ENV_DEVTOOLS_URL: &str = "SHELFCHECK_DEVTOOLS_URL";
pub const ENV_CHROME: &str = "SHELFCHECK_CHROME";
pub const ENV_HEADLESS: &str = "SHELFCHECK_HEADLESS";

/// Top-level harness configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Page under test
    pub target_url: String,

    /// How the browser is launched or attached to
    pub browser: BrowserConfig,

    /// Settle-wait bounds
    pub settle: SettleConfig,

    /// Where failure captures are written
    pub artifacts_dir: PathBuf,

    /// Where the JSON results file is written
    pub output_dir: PathBuf,

    pub selectors: Selectors,

    pub scenarios: ScenarioData,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            target_url: "https://demoqa.com/books".to_string(),
            browser: BrowserConfig::default(),
            settle: SettleConfig::default(),
            artifacts_dir: PathBuf::from("test_screenshots"),
            output_dir: PathBuf::from("test-results"),
            selectors: Selectors::default(),
            scenarios: ScenarioData::default(),
        }
    }
}

impl HarnessConfig {
    /// Load from a TOML file, or defaults when no path is given
    pub fn load(path: Option<&Path>) -> E2eResult<Self> {
        match path {
            Some(path) => {
                let content = std::fs::read_to_string(path)?;
                Self::from_toml(&content)
            }
            None => Ok(Self::default()),
        }
    }

    pub fn from_toml(content: &str) -> E2eResult<Self> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }

    /// Apply `SHELFCHECK_*` overrides from the process environment
    pub fn with_env_overrides(self) -> E2eResult<Self> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup
    pub fn with_overrides<F>(mut self, lookup: F) -> E2eResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_TARGET_URL) {
            self.target_url = url;
        }
        if let Some(url) = lookup(ENV_DEVTOOLS_URL) {
            self.browser.devtools_url = Some(url).filter(|u| !u.trim().is_empty());
        }
        if let Some(path) = lookup(ENV_CHROME) {
            self.browser.executable = Some(PathBuf::from(path));
        }
        if let Some(raw) = lookup(ENV_HEADLESS) {
            let headless = parse_flag(&raw).ok_or_else(|| {
                E2eError::Config(format!("{} must be a boolean, got '{}'", ENV_HEADLESS, raw))
            })?;
            self.browser.launch = if headless {
                LaunchProfile::headless()
            } else {
                LaunchProfile::visible()
            };
        }
        Ok(self)
    }

    /// Reject configurations no scenario could run against
    pub fn validate(&self) -> E2eResult<()> {
        if self.target_url.trim().is_empty() {
            return Err(E2eError::Config("target_url is empty".to_string()));
        }
        if self.settle.timeout_ms == 0 {
            return Err(E2eError::Config("settle.timeout_ms must be positive".to_string()));
        }
        if self.settle.poll_interval_ms == 0 {
            return Err(E2eError::Config("settle.poll_interval_ms must be positive".to_string()));
        }
        if self.scenarios.case_term.trim().is_empty() {
            return Err(E2eError::Config("scenarios.case_term is empty".to_string()));
        }
        if self.scenarios.injection_patterns.is_empty() {
            return Err(E2eError::Config("scenarios.injection_patterns is empty".to_string()));
        }
        if self.scenarios.error_fingerprints.is_empty() {
            return Err(E2eError::Config("scenarios.error_fingerprints is empty".to_string()));
        }
        if self.selectors.detail_landmarks.is_empty() {
            return Err(E2eError::Config("selectors.detail_landmarks is empty".to_string()));
        }
        Ok(())
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Chrome launch or attach configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// DevTools endpoint of an already running Chrome
    /// (e.g. `http://127.0.0.1:9222`); a fresh browser is launched when unset
    pub devtools_url: Option<String>,

    /// Chrome binary; auto-detected when unset
    pub executable: Option<PathBuf>,

    /// How long to wait for the browser to come up
    pub startup_timeout_ms: u64,

    pub launch: LaunchProfile,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            devtools_url: None,
            executable: None,
            startup_timeout_ms: 30_000,
            launch: LaunchProfile::visible(),
        }
    }
}

impl BrowserConfig {
    pub fn startup_timeout(&self) -> Duration {
        Duration::from_millis(self.startup_timeout_ms)
    }
}

/// Browser launch options; the only thing that differs between a visible
/// and a headless run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LaunchProfile {
    pub headless: bool,
    pub window: WindowMode,

    /// Extra browser command-line switches
    pub args: Vec<String>,
}

impl Default for LaunchProfile {
    fn default() -> Self {
        Self::visible()
    }
}

impl LaunchProfile {
    pub fn visible() -> Self {
        Self {
            headless: false,
            window: WindowMode::Maximized,
            args: Vec::new(),
        }
    }

    pub fn headless() -> Self {
        Self {
            headless: true,
            window: WindowMode::Fixed {
                width: 1920,
                height: 1080,
            },
            args: vec![
                "--no-sandbox".to_string(),
                "--disable-dev-shm-usage".to_string(),
                "--disable-gpu".to_string(),
                "--disable-blink-features=AutomationControlled".to_string(),
            ],
        }
    }

    /// Command-line switches handed to the browser
    pub fn browser_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if self.headless {
            args.push("--headless=new".to_string());
        }
        match self.window {
            WindowMode::Maximized => args.push("--start-maximized".to_string()),
            WindowMode::Fixed { width, height } => {
                args.push(format!("--window-size={},{}", width, height))
            }
        }
        args.extend(self.args.iter().cloned());
        args
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum WindowMode {
    Maximized,
    Fixed { width: u32, height: u32 },
}

/// Settle-wait bounds shared by every interaction
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SettleConfig {
    pub timeout_ms: u64,
    pub poll_interval_ms: u64,
}

impl Default for SettleConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            poll_interval_ms: 100,
        }
    }
}

impl SettleConfig {
    pub fn timing(&self) -> Timing {
        Timing {
            timeout: Duration::from_millis(self.timeout_ms),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
        }
    }
}

/// Where things live on the books page
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Selectors {
    /// One match per table row, padding rows included
    pub rows: Locator,

    /// Title text, relative to a row
    pub row_title: Locator,

    /// Clickable title link, relative to a row
    pub row_title_link: Locator,

    /// Cover image, relative to a row
    pub row_cover: Locator,

    pub search_input: Locator,

    /// Header cell that toggles title sorting
    pub title_header: Locator,

    /// Any one of these marks a rendered detail page
    pub detail_landmarks: Vec<Locator>,
}

impl Default for Selectors {
    fn default() -> Self {
        Self {
            rows: Locator::css(".rt-tr-group"),
            row_title: Locator::css(".rt-td:nth-child(2) span"),
            row_title_link: Locator::css(".rt-td:nth-child(2) span a"),
            row_cover: Locator::css("img"),
            search_input: Locator::css("#searchBox"),
            title_header: Locator::xpath(
                "//div[contains(@class, 'rt-resizable-header') and contains(., 'Title')]",
            ),
            detail_landmarks: vec![
                Locator::xpath("//*[contains(text(), 'ISBN')]"),
                Locator::xpath("//*[contains(text(), 'Publisher')]"),
                Locator::css("#userName-value"),
                Locator::css(".text-right.fullButton"),
                Locator::xpath("//label[@id='userName-label']"),
                Locator::css("#title-wrapper"),
            ],
        }
    }
}

/// What to do when the configured cover title is not in the listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingTitlePolicy {
    /// Fail the scenario; the dataset no longer matches the check's intent
    #[default]
    Fail,
    /// Check the first listed title instead
    FirstAvailable,
}

/// Fixed inputs for the five scenarios
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioData {
    /// Title searched for in the cover consistency check
    pub cover_title: String,

    pub missing_title: MissingTitlePolicy,

    /// Rows sampled from the unfiltered listing for cover lookup
    pub cover_sample: usize,

    /// Term searched in three letter cases
    pub case_term: String,

    /// URL fragment identifying a detail page
    pub detail_url_marker: String,

    pub injection_patterns: Vec<String>,

    /// Lowercase phrases that betray a backend error in page markup
    pub error_fingerprints: Vec<String>,
}

impl Default for ScenarioData {
    fn default() -> Self {
        Self {
            cover_title: "Learning JavaScript Design Patterns".to_string(),
            missing_title: MissingTitlePolicy::Fail,
            cover_sample: 5,
            case_term: "Git".to_string(),
            detail_url_marker: "book=".to_string(),
            injection_patterns: vec![
                "' OR '1'='1".to_string(),
                "'; DROP TABLE books; --".to_string(),
                "\" OR 1=1 --".to_string(),
                "' UNION SELECT * FROM users --".to_string(),
            ],
            error_fingerprints: vec![
                "sql syntax".to_string(),
                "mysql".to_string(),
                "database error".to_string(),
                "query failed".to_string(),
                "ora-".to_string(),
                "pg_".to_string(),
            ],
        }
    }
}
