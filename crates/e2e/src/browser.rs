//! Chrome surface over the DevTools protocol
//!
//! Either launches a fresh Chrome or attaches to one that is already running
//! with remote debugging enabled. One page per run; element handles map to
//! DevTools elements resolved on that page.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chromiumoxide::browser::Browser;
use chromiumoxide::element::Element;
use chromiumoxide::error::CdpError;
use chromiumoxide::page::{Page, ScreenshotParams};
use futures::StreamExt;
use serde_json::Value;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::BrowserConfig;
use crate::error::{E2eError, E2eResult};
use crate::surface::{Artifact, ElementRef, Locator, Surface};

/// Empties a controlled input so the page's own listeners see the change
const CLEAR_INPUT_JS: &str = r#"function() {
    const setter = Object.getOwnPropertyDescriptor(HTMLInputElement.prototype, 'value').set;
    setter.call(this, '');
    this.dispatchEvent(new Event('input', { bubbles: true }));
}"#;

/// Rendered with a box, not hidden, not disabled
const CLICKABLE_JS: &str = r#"function() {
    const rect = this.getBoundingClientRect();
    const style = window.getComputedStyle(this);
    return rect.width > 0 && rect.height > 0
        && style.visibility !== 'hidden' && style.pointerEvents !== 'none'
        && !this.disabled;
}"#;

/// A Chrome page driven over DevTools
pub struct ChromeSurface {
    browser: Browser,
    handler: JoinHandle<()>,
    page: Page,
    owns_browser: bool,
    elements: HashMap<String, Element>,
    next_element: u64,
    artifacts_dir: PathBuf,
    closed: bool,
}

impl ChromeSurface {
    /// Launch or attach to Chrome and open a blank page.
    ///
    /// Every failure here is a setup failure: no scenario can run without a
    /// page.
    pub async fn connect(config: &BrowserConfig, artifacts_dir: &Path) -> E2eResult<Self> {
        std::fs::create_dir_all(artifacts_dir).map_err(|e| {
            E2eError::Setup(format!("Cannot create {}: {}", artifacts_dir.display(), e))
        })?;

        let (browser, mut handler, owns_browser) = match &config.devtools_url {
            Some(url) => {
                let ws_url = wait_for_devtools(url, config.startup_timeout()).await?;
                let (browser, handler) = Browser::connect(ws_url).await.map_err(|e| {
                    E2eError::Setup(format!("Cannot attach to Chrome at {}: {}", url, e))
                })?;
                (browser, handler, false)
            }
            None => {
                let launch = launch_config(config).map_err(E2eError::Setup)?;
                let (browser, handler) = Browser::launch(launch)
                    .await
                    .map_err(|e| E2eError::Setup(format!("Cannot launch Chrome: {}", e)))?;
                (browser, handler, true)
            }
        };

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("DevTools handler stopped: {}", e);
                    break;
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                handler.abort();
                return Err(E2eError::Setup(format!("Cannot open a page: {}", e)));
            }
        };

        info!(
            "Chrome page ready ({}, headless: {})",
            if owns_browser { "launched" } else { "attached" },
            config.launch.headless
        );

        Ok(Self {
            browser,
            handler,
            page,
            owns_browser,
            elements: HashMap::new(),
            next_element: 0,
            artifacts_dir: artifacts_dir.to_path_buf(),
            closed: false,
        })
    }

    fn register(&mut self, element: Element) -> ElementRef {
        self.next_element += 1;
        let id = format!("e{}", self.next_element);
        self.elements.insert(id.clone(), element);
        ElementRef(id)
    }

    fn element(&self, handle: &ElementRef) -> E2eResult<&Element> {
        self.elements
            .get(handle.id())
            .ok_or_else(|| E2eError::ElementNotFound(format!("stale handle {}", handle.id())))
    }
}

#[async_trait]
impl Surface for ChromeSurface {
    async fn navigate(&mut self, url: &str) -> E2eResult<()> {
        debug!("navigate: {}", url);
        self.elements.clear();
        self.page.goto(url).await.map_err(cdp_error)?;
        Ok(())
    }

    async fn find_all(&mut self, locator: &Locator) -> E2eResult<Vec<ElementRef>> {
        let found = match locator {
            Locator::Css(selector) => self.page.find_elements(selector.as_str()).await,
            Locator::XPath(expr) => self.page.find_xpaths(expr.as_str()).await,
        }
        .map_err(cdp_error)?;
        Ok(found.into_iter().map(|e| self.register(e)).collect())
    }

    async fn find_in(&mut self, parent: &ElementRef, locator: &Locator) -> E2eResult<Option<ElementRef>> {
        let Locator::Css(selector) = locator else {
            return Err(E2eError::Surface(format!(
                "{} cannot be resolved below an element",
                locator
            )));
        };
        let found = self
            .element(parent)?
            .find_elements(selector.as_str())
            .await
            .map_err(cdp_error)?;
        Ok(found.into_iter().next().map(|e| self.register(e)))
    }

    async fn text(&mut self, element: &ElementRef) -> E2eResult<String> {
        let text = self.element(element)?.inner_text().await.map_err(cdp_error)?;
        Ok(text.unwrap_or_default())
    }

    async fn attribute(&mut self, element: &ElementRef, name: &str) -> E2eResult<Option<String>> {
        self.element(element)?.attribute(name).await.map_err(cdp_error)
    }

    async fn set_text(&mut self, element: &ElementRef, text: &str) -> E2eResult<()> {
        let element = self.element(element)?;
        element.focus().await.map_err(cdp_error)?;
        element.type_str(text).await.map_err(cdp_error)?;
        Ok(())
    }

    async fn clear(&mut self, element: &ElementRef) -> E2eResult<()> {
        self.element(element)?
            .call_js_fn(CLEAR_INPUT_JS, false)
            .await
            .map_err(cdp_error)?;
        Ok(())
    }

    async fn click(&mut self, element: &ElementRef) -> E2eResult<()> {
        self.element(element)?.click().await.map_err(cdp_error)?;
        Ok(())
    }

    async fn is_clickable(&mut self, element: &ElementRef) -> E2eResult<bool> {
        let returns = self
            .element(element)?
            .call_js_fn(CLICKABLE_JS, false)
            .await
            .map_err(cdp_error)?;
        Ok(returns.result.value.as_ref().and_then(Value::as_bool).unwrap_or(false))
    }

    async fn current_url(&mut self) -> E2eResult<String> {
        let url = self.page.url().await.map_err(cdp_error)?;
        Ok(url.unwrap_or_default())
    }

    async fn capture(&mut self, name: &str) -> E2eResult<Artifact> {
        let png = self
            .page
            .screenshot(ScreenshotParams::builder().full_page(true).build())
            .await
            .map_err(cdp_error)?;

        let path = self.artifacts_dir.join(format!("{}.png", name));
        std::fs::write(&path, png)?;
        info!("Screenshot saved: {}", path.display());

        Ok(Artifact {
            name: name.to_string(),
            path: Some(path),
        })
    }

    async fn page_source(&mut self) -> E2eResult<String> {
        self.page.content().await.map_err(cdp_error)
    }

    async fn shutdown(&mut self) -> E2eResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.elements.clear();

        let result = if self.owns_browser {
            info!("Closing Chrome");
            let closed = self.browser.close().await.map(|_| ());
            if let Err(e) = self.browser.wait().await {
                warn!("Chrome did not exit cleanly: {}", e);
            }
            closed
        } else {
            info!("Closing page on attached Chrome");
            self.page.clone().close().await
        };
        self.handler.abort();
        result.map_err(cdp_error)
    }
}

impl Drop for ChromeSurface {
    fn drop(&mut self) {
        if !self.closed {
            warn!("Chrome surface dropped without shutdown");
            self.handler.abort();
        }
    }
}

/// chromiumoxide launch options built from a launch profile
fn launch_config(config: &BrowserConfig) -> Result<chromiumoxide::BrowserConfig, String> {
    // Headless mode comes from the profile's own switches.
    let mut builder = chromiumoxide::BrowserConfig::builder()
        .with_head()
        .viewport(None)
        .launch_timeout(config.startup_timeout())
        .request_timeout(config.startup_timeout())
        .args(config.launch.browser_args());
    if let Some(path) = &config.executable {
        builder = builder.chrome_executable(path);
    }
    builder.build()
}

/// Poll `/json/version` until Chrome answers, returning its WebSocket URL
async fn wait_for_devtools(base_url: &str, timeout: Duration) -> E2eResult<String> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .map_err(|e| E2eError::Setup(format!("HTTP client: {}", e)))?;
    let version_url = format!("{}/json/version", base_url.trim_end_matches('/'));
    let start = Instant::now();
    let mut attempts = 0;

    while start.elapsed() < timeout {
        attempts += 1;

        match client.get(&version_url).send().await {
            Ok(resp) if resp.status().is_success() => {
                let body: Value = resp.json().await?;
                if let Some(ws) = body.get("webSocketDebuggerUrl").and_then(Value::as_str) {
                    return Ok(ws.to_string());
                }
                debug!("DevTools answered without a WebSocket URL");
            }
            Ok(resp) => {
                warn!("DevTools version endpoint returned {}", resp.status());
            }
            Err(e) => {
                if attempts == 1 {
                    info!("Waiting for Chrome DevTools at {}...", base_url);
                }
                // Connection refused is expected while Chrome starts
                if !e.is_connect() {
                    warn!("DevTools status error: {}", e);
                }
            }
        }

        sleep(Duration::from_millis(250)).await;
    }

    Err(E2eError::Setup(format!(
        "Chrome DevTools at {} not ready after {} attempts",
        base_url, attempts
    )))
}

/// Map a DevTools failure onto the harness taxonomy
fn cdp_error(e: CdpError) -> E2eError {
    match e {
        CdpError::NotFound => E2eError::ElementNotFound("node not found".to_string()),
        CdpError::Timeout => E2eError::timeout("a DevTools response", Duration::ZERO),
        other => classify_message(&other.to_string()),
    }
}

/// Nodes that vanished between lookup and use count as missing elements
fn classify_message(message: &str) -> E2eError {
    let lower = message.to_lowercase();
    let vanished = [
        "could not find node",
        "no node with given id",
        "node is detached",
        "cannot find context with specified id",
    ];
    if vanished.iter().any(|phrase| lower.contains(phrase)) {
        E2eError::ElementNotFound(message.to_string())
    } else {
        E2eError::Surface(message.to_string())
    }
}
