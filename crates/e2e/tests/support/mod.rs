//! In-memory books page implementing `Surface`
//!
//! Models just enough of the real page for the scenarios: a paginated table
//! with padding rows, a search box, a sortable Title header and a detail
//! page. Knobs inject the faults the harness must detect or survive.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use shelfcheck_e2e::config::{HarnessConfig, Selectors};
use shelfcheck_e2e::surface::{Artifact, ElementRef, Locator, Surface};
use shelfcheck_e2e::{E2eError, E2eResult};

pub const ORIGIN: &str = "https://books.test/books";

#[derive(Debug, Clone)]
pub struct Book {
    pub title: String,
    pub isbn: String,
    pub cover: String,
}

impl Book {
    pub fn new(title: &str, isbn: &str) -> Self {
        Self {
            title: title.to_string(),
            isbn: isbn.to_string(),
            cover: format!("https://books.test/images/{}.jpg", isbn),
        }
    }
}

/// The bookstore listing the real page ships with
pub fn bookstore() -> Vec<Book> {
    vec![
        Book::new("Git Pocket Guide", "9781449325862"),
        Book::new("Learning JavaScript Design Patterns", "9781449331818"),
        Book::new("Designing Evolvable Web APIs with ASP.NET", "9781449337711"),
        Book::new("Speaking JavaScript", "9781449365035"),
        Book::new("You Don't Know JS", "9781491904244"),
        Book::new("Programming JavaScript Applications", "9781491950296"),
        Book::new("Eloquent JavaScript, Second Edition", "9781593275846"),
        Book::new("Understanding ECMAScript 6", "9781593277574"),
    ]
}

pub fn titled(titles: &[&str]) -> Vec<Book> {
    titles
        .iter()
        .enumerate()
        .map(|(i, t)| Book::new(t, &format!("97800000000{:02}", i)))
        .collect()
}

/// Default config with settle waits short enough for tests
pub fn fast_config() -> HarnessConfig {
    let mut config = HarnessConfig::default();
    config.target_url = ORIGIN.to_string();
    config.settle.timeout_ms = 200;
    config.settle.poll_interval_ms = 5;
    config
}

/// Fault injection switches
#[derive(Debug, Clone)]
pub struct Knobs {
    /// Polls the search box stays absent after each navigation
    pub search_ready_after: usize,
    /// The search box never renders
    pub search_missing: bool,
    pub case_sensitive_search: bool,
    /// Filtered rows render a placeholder cover
    pub swap_covers_when_filtered: bool,
    /// Clicking a title link fails with a surface error
    pub fail_title_click: bool,
    /// The page leaks a SQL error when this exact query is typed
    pub leak_on_query: Option<String>,
    /// Second header click keeps ascending order
    pub broken_descending: bool,
    pub panic_on_source: bool,
    pub detail_landmarks: bool,
    /// Reading this title's text fails as if the row went stale
    pub unreadable_title: Option<String>,
    pub capture_fails: bool,
    pub panic_on_capture: bool,
    pub page_size: usize,
    /// Only rows with a book render; an empty result is an empty table
    pub no_padding: bool,
    /// Row listings that still show the old table after a search, clear or
    /// sort click
    pub render_lag: usize,
}

impl Default for Knobs {
    fn default() -> Self {
        Self {
            search_ready_after: 0,
            search_missing: false,
            case_sensitive_search: false,
            swap_covers_when_filtered: false,
            fail_title_click: false,
            leak_on_query: None,
            broken_descending: false,
            panic_on_source: false,
            detail_landmarks: true,
            unreadable_title: None,
            capture_fails: false,
            panic_on_capture: false,
            page_size: 10,
            no_padding: false,
            render_lag: 0,
        }
    }
}

/// What the fake saw; survives the surface being moved into the orchestrator
#[derive(Debug, Default)]
pub struct Observations {
    pub navigations: usize,
    pub typed: Vec<String>,
    pub captures: Vec<String>,
    pub shutdowns: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Page {
    Blank,
    Listing,
    Detail(usize),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Sort {
    None,
    Ascending,
    Descending,
}

pub struct FakeSurface {
    books: Vec<Book>,
    selectors: Selectors,
    knobs: Knobs,
    page: Page,
    location: String,
    /// What the search box holds
    query: String,
    /// What the header was last toggled to
    sort: Sort,
    /// Query and sort the table currently renders
    shown: (String, Sort),
    lag_left: usize,
    search_polls_left: usize,
    observations: Arc<Mutex<Observations>>,
}

impl FakeSurface {
    pub fn new(books: Vec<Book>) -> Self {
        Self::with_knobs(books, Knobs::default())
    }

    pub fn with_knobs(books: Vec<Book>, knobs: Knobs) -> Self {
        Self {
            books,
            selectors: Selectors::default(),
            knobs,
            page: Page::Blank,
            location: "about:blank".to_string(),
            query: String::new(),
            sort: Sort::None,
            shown: (String::new(), Sort::None),
            lag_left: 0,
            search_polls_left: 0,
            observations: Arc::new(Mutex::new(Observations::default())),
        }
    }

    pub fn observations(&self) -> Arc<Mutex<Observations>> {
        Arc::clone(&self.observations)
    }

    /// Indexes into `books` of the rows currently shown, in display order
    fn visible(&self) -> Vec<usize> {
        let (query, sort) = &self.shown;
        let mut shown: Vec<usize> = (0..self.books.len())
            .filter(|&i| {
                let title = &self.books[i].title;
                if self.knobs.case_sensitive_search {
                    title.contains(query.as_str())
                } else {
                    title.to_lowercase().contains(&query.to_lowercase())
                }
            })
            .collect();

        match sort {
            Sort::None => {}
            Sort::Ascending => shown.sort_by_key(|&i| self.books[i].title.to_lowercase()),
            Sort::Descending => {
                shown.sort_by_key(|&i| self.books[i].title.to_lowercase());
                if !self.knobs.broken_descending {
                    shown.reverse();
                }
            }
        }
        shown.truncate(self.knobs.page_size);
        shown
    }

    /// Book shown in display row `row`, `None` for a padding row
    fn book_at(&self, row: usize) -> Option<&Book> {
        self.visible().get(row).map(|&i| &self.books[i])
    }

    fn parse(element: &ElementRef) -> E2eResult<(&str, usize)> {
        let (kind, index) = element
            .id()
            .split_once(':')
            .unwrap_or((element.id(), "0"));
        let index = index
            .parse()
            .map_err(|_| E2eError::Surface(format!("bad handle {}", element.id())))?;
        Ok((kind, index))
    }

    /// The page reacted to input; the table catches up after `render_lag`
    /// row listings
    fn input_changed(&mut self) {
        self.lag_left = self.knobs.render_lag;
        if self.lag_left == 0 {
            self.shown = (self.query.clone(), self.sort);
        }
    }

    fn render_tick(&mut self) {
        if self.lag_left > 0 {
            self.lag_left -= 1;
            if self.lag_left == 0 {
                self.shown = (self.query.clone(), self.sort);
            }
        }
    }

    fn row_count(&self) -> usize {
        if self.knobs.no_padding {
            self.visible().len()
        } else {
            self.knobs.page_size
        }
    }

    fn landmark_present(&self, index: usize) -> bool {
        // ISBN label and title wrapper
        self.knobs.detail_landmarks && (index == 0 || index == 5)
    }
}

#[async_trait]
impl Surface for FakeSurface {
    async fn navigate(&mut self, url: &str) -> E2eResult<()> {
        self.observations.lock().unwrap().navigations += 1;
        self.page = Page::Listing;
        self.location = url.to_string();
        self.query.clear();
        self.sort = Sort::None;
        self.shown = (String::new(), Sort::None);
        self.lag_left = 0;
        self.search_polls_left = self.knobs.search_ready_after;
        Ok(())
    }

    async fn find_all(&mut self, locator: &Locator) -> E2eResult<Vec<ElementRef>> {
        let listing = self.page == Page::Listing;

        if *locator == self.selectors.search_input {
            if !listing || self.knobs.search_missing {
                return Ok(vec![]);
            }
            if self.search_polls_left > 0 {
                self.search_polls_left -= 1;
                return Ok(vec![]);
            }
            return Ok(vec![ElementRef("search".to_string())]);
        }
        if *locator == self.selectors.rows {
            if !listing {
                return Ok(vec![]);
            }
            self.render_tick();
            return Ok((0..self.row_count())
                .map(|k| ElementRef(format!("row:{}", k)))
                .collect());
        }
        if *locator == self.selectors.title_header {
            return Ok(if listing {
                vec![ElementRef("header".to_string())]
            } else {
                vec![]
            });
        }
        if let Some(index) = self.selectors.detail_landmarks.iter().position(|l| l == locator) {
            let present = matches!(self.page, Page::Detail(_)) && self.landmark_present(index);
            return Ok(if present {
                vec![ElementRef(format!("landmark:{}", index))]
            } else {
                vec![]
            });
        }
        Err(E2eError::Surface(format!("unsupported locator {}", locator)))
    }

    async fn find_in(&mut self, parent: &ElementRef, locator: &Locator) -> E2eResult<Option<ElementRef>> {
        let (kind, row) = Self::parse(parent)?;
        if kind != "row" {
            return Err(E2eError::Surface(format!("{} has no children", parent.id())));
        }
        let Some(book) = self.book_at(row) else {
            return Ok(None);
        };

        let child = if *locator == self.selectors.row_title {
            "title"
        } else if *locator == self.selectors.row_title_link {
            "link"
        } else if *locator == self.selectors.row_cover {
            if book.cover.is_empty() {
                return Ok(None);
            }
            "cover"
        } else {
            return Ok(None);
        };
        Ok(Some(ElementRef(format!("{}:{}", child, row))))
    }

    async fn text(&mut self, element: &ElementRef) -> E2eResult<String> {
        let (kind, row) = Self::parse(element)?;
        match kind {
            "title" | "link" => {
                let book = self
                    .book_at(row)
                    .ok_or_else(|| E2eError::ElementNotFound(element.id().to_string()))?;
                if self.knobs.unreadable_title.as_deref() == Some(book.title.as_str()) {
                    return Err(E2eError::Surface("stale element reference".to_string()));
                }
                Ok(book.title.clone())
            }
            _ => Ok(String::new()),
        }
    }

    async fn attribute(&mut self, element: &ElementRef, name: &str) -> E2eResult<Option<String>> {
        let (kind, row) = Self::parse(element)?;
        if kind != "cover" || name != "src" {
            return Ok(None);
        }
        if self.knobs.swap_covers_when_filtered && !self.shown.0.is_empty() {
            return Ok(Some("https://books.test/images/placeholder.jpg".to_string()));
        }
        Ok(self.book_at(row).map(|b| b.cover.clone()))
    }

    async fn set_text(&mut self, element: &ElementRef, text: &str) -> E2eResult<()> {
        if element.id() != "search" {
            return Err(E2eError::Surface(format!("{} is not editable", element.id())));
        }
        self.observations.lock().unwrap().typed.push(text.to_string());
        self.query.push_str(text);
        self.input_changed();
        Ok(())
    }

    async fn clear(&mut self, element: &ElementRef) -> E2eResult<()> {
        if element.id() != "search" {
            return Err(E2eError::Surface(format!("{} is not editable", element.id())));
        }
        self.query.clear();
        self.input_changed();
        Ok(())
    }

    async fn click(&mut self, element: &ElementRef) -> E2eResult<()> {
        let (kind, row) = Self::parse(element)?;
        match kind {
            "header" => {
                self.sort = match self.sort {
                    Sort::None | Sort::Descending => Sort::Ascending,
                    Sort::Ascending => Sort::Descending,
                };
                self.input_changed();
                Ok(())
            }
            "link" => {
                if self.knobs.fail_title_click {
                    return Err(E2eError::Surface(
                        "element click intercepted by overlay".to_string(),
                    ));
                }
                let index = self.visible().get(row).copied().ok_or_else(|| {
                    E2eError::ElementNotFound(element.id().to_string())
                })?;
                self.location = format!("{}?book={}", ORIGIN, self.books[index].isbn);
                self.page = Page::Detail(index);
                Ok(())
            }
            _ => Ok(()),
        }
    }

    async fn is_clickable(&mut self, element: &ElementRef) -> E2eResult<bool> {
        Ok(element.id() == "header" || element.id().starts_with("link:"))
    }

    async fn current_url(&mut self) -> E2eResult<String> {
        Ok(self.location.clone())
    }

    async fn capture(&mut self, name: &str) -> E2eResult<Artifact> {
        if self.knobs.panic_on_capture {
            panic!("screenshot backend crashed");
        }
        if self.knobs.capture_fails {
            return Err(E2eError::Surface("screenshot unavailable".to_string()));
        }
        self.observations.lock().unwrap().captures.push(name.to_string());
        Ok(Artifact {
            name: name.to_string(),
            path: Some(PathBuf::from(format!("{}.png", name))),
        })
    }

    async fn page_source(&mut self) -> E2eResult<String> {
        if self.knobs.panic_on_source {
            panic!("renderer crashed");
        }
        let mut html = String::from("<html><body><div class=\"rt-table\">");
        for row in 0..self.row_count() {
            match self.book_at(row) {
                Some(book) => html.push_str(&format!(
                    "<div class=\"rt-tr-group\"><img src=\"{}\"><span><a>{}</a></span></div>",
                    book.cover, book.title
                )),
                None => html.push_str("<div class=\"rt-tr-group -padRow\"></div>"),
            }
        }
        html.push_str("</div>");
        if self.knobs.leak_on_query.as_deref() == Some(self.shown.0.as_str()) {
            html.push_str(
                "<pre>You have an error in your SQL syntax; check the manual that \
                 corresponds to your MySQL server version</pre>",
            );
        }
        html.push_str("</body></html>");
        Ok(html)
    }

    async fn shutdown(&mut self) -> E2eResult<()> {
        self.observations.lock().unwrap().shutdowns += 1;
        Ok(())
    }
}
