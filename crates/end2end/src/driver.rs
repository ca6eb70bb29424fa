//! PageDriver: the seam between scenarios and the browser-automation backend.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  PageSession (locators, auto-waiting expectations)           │
//! ├──────────────────────────────────────────────────────────────┤
//! │  PageDriver (trait)                                          │
//! │  ┌────────────────────────┐   ┌───────────────────────────┐  │
//! │  │  CdpPage               │   │  MockDriver               │  │
//! │  │  chromiumoxide, one    │   │  in-memory documents,     │  │
//! │  │  browser context each  │   │  counter buttons          │  │
//! │  └────────────────────────┘   └───────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```

use crate::locator::{ElementSnapshot, Selector};
use crate::result::{E2eError, E2eResult};
use crate::wait::LoadState;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Browser-automation backend for one page.
///
/// Drivers perform single, non-waiting operations. Polling and
/// actionability checks live in [`crate::PageSession`].
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Load `url` and wait for `wait_until`, failing after `timeout`
    async fn navigate(&mut self, url: &str, wait_until: LoadState, timeout: Duration)
        -> E2eResult<()>;

    /// Current `document.title`
    async fn title(&self) -> E2eResult<String>;

    /// Snapshot every element matching `selector`, in document order
    async fn query(&self, selector: &Selector) -> E2eResult<Vec<ElementSnapshot>>;

    /// Dispatch a user click on the `index`-th match of `selector`
    async fn click(&mut self, selector: &Selector, index: usize) -> E2eResult<()>;

    /// URL of the loaded document
    async fn current_url(&self) -> E2eResult<String>;

    /// Release the page
    async fn close(&mut self) -> E2eResult<()>;
}

/// Opens one isolated driver per scenario.
#[async_trait]
pub trait SessionFactory: Send + Sync {
    /// Driver type handed to each session
    type Driver: PageDriver + 'static;

    /// Open a fresh, isolated page
    async fn open(&self) -> E2eResult<Self::Driver>;
}

// ============================================================================
// Mock documents
// ============================================================================

/// What a mock element does when clicked
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ClickBehavior {
    /// Nothing happens
    #[default]
    Inert,
    /// Re-render as `"{label}{count}"` with `count + 1`
    Counter {
        /// Text before the number
        label: String,
        /// Current count
        count: u64,
    },
}

/// One element of a [`MockDocument`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockElement {
    /// Tag name, lower case
    pub tag: String,
    /// `id` attribute
    pub id: Option<String>,
    /// `data-testid` attribute
    pub test_id: Option<String>,
    /// Static text (ignored for counters)
    pub text: String,
    /// Rendered with a box
    pub visible: bool,
    /// Not `disabled`
    pub enabled: bool,
    /// Click behaviour
    pub behavior: ClickBehavior,
}

impl MockElement {
    /// Create a visible, enabled element
    #[must_use]
    pub fn new(tag: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            tag: tag.into().to_ascii_lowercase(),
            id: None,
            test_id: None,
            text: text.into(),
            visible: true,
            enabled: true,
            behavior: ClickBehavior::Inert,
        }
    }

    /// Create a counter button rendering `"{label}{start}"`
    #[must_use]
    pub fn counter(tag: impl Into<String>, label: impl Into<String>, start: u64) -> Self {
        Self {
            behavior: ClickBehavior::Counter {
                label: label.into(),
                count: start,
            },
            ..Self::new(tag, "")
        }
    }

    /// Set the `id` attribute
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set the `data-testid` attribute
    #[must_use]
    pub fn with_test_id(mut self, id: impl Into<String>) -> Self {
        self.test_id = Some(id.into());
        self
    }

    /// Set visibility
    #[must_use]
    pub const fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    /// Set enabled state
    #[must_use]
    pub const fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Rendered text content
    #[must_use]
    pub fn text_content(&self) -> String {
        match &self.behavior {
            ClickBehavior::Inert => self.text.clone(),
            ClickBehavior::Counter { label, count } => format!("{label}{count}"),
        }
    }

    /// Supports `*`, `tag`, `#id`, `tag#id`.
    fn matches_css(&self, css: &str) -> bool {
        let css = css.trim();
        if css == "*" {
            return true;
        }
        match css.split_once('#') {
            Some((tag, id)) => {
                (tag.is_empty() || tag.eq_ignore_ascii_case(&self.tag))
                    && self.id.as_deref() == Some(id)
            }
            None => css.eq_ignore_ascii_case(&self.tag),
        }
    }

    fn matches(&self, selector: &Selector) -> bool {
        match selector {
            Selector::Css(css) => self.matches_css(css),
            Selector::Text(text) => self.text_content().contains(text.as_str()),
            Selector::TestId(id) => self.test_id.as_deref() == Some(id.as_str()),
            Selector::CssWithText { css, text } => {
                self.matches_css(css) && self.text_content().contains(text.as_str())
            }
        }
    }

    fn snapshot(&self) -> ElementSnapshot {
        ElementSnapshot {
            text_content: self.text_content(),
            visible: self.visible,
            enabled: self.enabled,
        }
    }

    fn click(&mut self) {
        if let ClickBehavior::Counter { count, .. } = &mut self.behavior {
            *count += 1;
        }
    }
}

/// An in-memory document
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MockDocument {
    /// `document.title`
    pub title: String,
    /// Elements in document order
    pub elements: Vec<MockElement>,
    /// Element queries return nothing until this many queries happened
    pub render_after_polls: usize,
}

impl MockDocument {
    /// Create an empty document with a title
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Append an element
    #[must_use]
    pub fn with_element(mut self, element: MockElement) -> Self {
        self.elements.push(element);
        self
    }

    /// Delay rendering by `polls` element queries
    #[must_use]
    pub const fn with_render_delay(mut self, polls: usize) -> Self {
        self.render_after_polls = polls;
        self
    }

    /// The Leptos starter page: title, heading, and a counter button.
    #[must_use]
    pub fn leptos_starter() -> Self {
        Self::new(crate::suite::EXPECTED_TITLE)
            .with_element(MockElement::new("h1", crate::suite::EXPECTED_HEADING))
            .with_element(MockElement::counter("button", crate::suite::COUNTER_LABEL, 0))
    }
}

/// Documents served by URL
#[derive(Debug, Clone, Default)]
pub struct MockSite {
    documents: HashMap<String, MockDocument>,
}

/// Normalize so that `http://host:3000` and `http://host:3000/` agree.
fn normalize_url(url: &str) -> String {
    url::Url::parse(url).map_or_else(|_| url.to_string(), |u| u.to_string())
}

impl MockSite {
    /// Create an empty site
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `document` at `url`
    #[must_use]
    pub fn with_page(mut self, url: &str, document: MockDocument) -> Self {
        self.documents.insert(normalize_url(url), document);
        self
    }

    /// Look up the document served at `url`
    #[must_use]
    pub fn get(&self, url: &str) -> Option<&MockDocument> {
        self.documents.get(&normalize_url(url))
    }
}

/// Mock driver for unit testing
#[derive(Debug, Default)]
pub struct MockDriver {
    site: MockSite,
    current_url: String,
    document: Option<MockDocument>,
    polls: AtomicUsize,
    call_history: Vec<String>,
}

impl MockDriver {
    /// Create a driver serving `site`
    #[must_use]
    pub fn new(site: MockSite) -> Self {
        Self {
            site,
            current_url: String::from("about:blank"),
            ..Self::default()
        }
    }

    /// Get call history
    #[must_use]
    pub fn history(&self) -> &[String] {
        &self.call_history
    }

    /// Check if method was called
    #[must_use]
    pub fn was_called(&self, method: &str) -> bool {
        self.call_history.iter().any(|c| c.starts_with(method))
    }

    /// The loaded document, if any
    #[must_use]
    pub const fn document(&self) -> Option<&MockDocument> {
        self.document.as_ref()
    }

    fn loaded(&self) -> E2eResult<&MockDocument> {
        self.document.as_ref().ok_or_else(|| E2eError::Evaluation {
            message: "no document loaded".to_string(),
        })
    }
}

#[async_trait]
impl PageDriver for MockDriver {
    async fn navigate(
        &mut self,
        url: &str,
        _wait_until: LoadState,
        _timeout: Duration,
    ) -> E2eResult<()> {
        self.call_history.push(format!("navigate:{url}"));
        let document = self
            .site
            .get(url)
            .cloned()
            .ok_or_else(|| E2eError::Navigation {
                url: url.to_string(),
                message: "net::ERR_CONNECTION_REFUSED".to_string(),
            })?;
        self.document = Some(document);
        self.current_url = normalize_url(url);
        self.polls.store(0, Ordering::SeqCst);
        Ok(())
    }

    async fn title(&self) -> E2eResult<String> {
        Ok(self.loaded()?.title.clone())
    }

    async fn query(&self, selector: &Selector) -> E2eResult<Vec<ElementSnapshot>> {
        let document = self.loaded()?;
        let seen = self.polls.fetch_add(1, Ordering::SeqCst);
        if seen < document.render_after_polls {
            return Ok(Vec::new());
        }
        Ok(document
            .elements
            .iter()
            .filter(|e| e.matches(selector))
            .map(MockElement::snapshot)
            .collect())
    }

    async fn click(&mut self, selector: &Selector, index: usize) -> E2eResult<()> {
        self.call_history.push(format!("click:{selector}[{index}]"));
        let document = self.document.as_mut().ok_or_else(|| E2eError::Evaluation {
            message: "no document loaded".to_string(),
        })?;
        let element = document
            .elements
            .iter_mut()
            .filter(|e| e.matches(selector))
            .nth(index)
            .ok_or_else(|| E2eError::Evaluation {
                message: format!("element {selector}[{index}] is detached"),
            })?;
        element.click();
        Ok(())
    }

    async fn current_url(&self) -> E2eResult<String> {
        Ok(self.current_url.clone())
    }

    async fn close(&mut self) -> E2eResult<()> {
        self.call_history.push("close".to_string());
        self.document = None;
        Ok(())
    }
}

/// Opens [`MockDriver`]s that each get their own copy of the site.
#[derive(Debug, Clone, Default)]
pub struct MockFactory {
    site: MockSite,
    opened: std::sync::Arc<AtomicUsize>,
}

impl MockFactory {
    /// Create a factory serving `site`
    #[must_use]
    pub fn new(site: MockSite) -> Self {
        Self {
            site,
            opened: std::sync::Arc::default(),
        }
    }

    /// Number of sessions opened so far
    #[must_use]
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionFactory for MockFactory {
    type Driver = MockDriver;

    async fn open(&self) -> E2eResult<MockDriver> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(MockDriver::new(self.site.clone()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    const ROOT: &str = "http://localhost:3000/";

    fn starter_site() -> MockSite {
        MockSite::new().with_page(ROOT, MockDocument::leptos_starter())
    }

    fn budget() -> Duration {
        Duration::from_millis(100)
    }

    mod element_tests {
        use super::*;

        #[test]
        fn test_css_matching() {
            let el = MockElement::new("BUTTON", "Go").with_id("go");
            assert!(el.matches(&Selector::css("button")));
            assert!(el.matches(&Selector::css("#go")));
            assert!(el.matches(&Selector::css("button#go")));
            assert!(el.matches(&Selector::css("*")));
            assert!(!el.matches(&Selector::css("h1")));
            assert!(!el.matches(&Selector::css("button#stop")));
        }

        #[test]
        fn test_text_and_test_id_matching() {
            let el = MockElement::new("span", "Click Me: 0").with_test_id("count");
            assert!(el.matches(&Selector::text("Click Me")));
            assert!(el.matches(&Selector::test_id("count")));
            assert!(el.matches(&Selector::CssWithText {
                css: "span".to_string(),
                text: "Me".to_string()
            }));
        }

        #[test]
        fn test_counter_renders_and_increments() {
            let mut el = MockElement::counter("button", "Click Me: ", 0);
            assert_eq!(el.text_content(), "Click Me: 0");
            el.click();
            el.click();
            assert_eq!(el.text_content(), "Click Me: 2");
        }

        #[test]
        fn test_inert_click_keeps_text() {
            let mut el = MockElement::new("h1", "Welcome to Leptos!");
            el.click();
            assert_eq!(el.text_content(), "Welcome to Leptos!");
        }
    }

    mod site_tests {
        use super::*;

        #[test]
        fn test_trailing_slash_is_normalized() {
            let site = starter_site();
            assert!(site.get("http://localhost:3000").is_some());
            assert!(site.get(ROOT).is_some());
            assert!(site.get("http://localhost:3001/").is_none());
        }

        #[test]
        fn test_leptos_starter_document() {
            let doc = MockDocument::leptos_starter();
            assert_eq!(doc.title, "Welcome to Leptos");
            assert_eq!(doc.elements.len(), 2);
            assert_eq!(doc.elements[1].text_content(), "Click Me: 0");
        }
    }

    mod driver_tests {
        use super::*;

        #[tokio::test]
        async fn test_navigate_and_query() {
            let mut driver = MockDriver::new(starter_site());
            driver.navigate(ROOT, LoadState::Load, budget()).await.unwrap();
            assert_eq!(driver.title().await.unwrap(), "Welcome to Leptos");
            let headings = driver.query(&Selector::css("h1")).await.unwrap();
            assert_eq!(headings, vec![ElementSnapshot::new("Welcome to Leptos!")]);
            assert!(driver.was_called("navigate"));
        }

        #[tokio::test]
        async fn test_unknown_url_is_navigation_error() {
            let mut driver = MockDriver::new(starter_site());
            let err = driver
                .navigate("http://localhost:4000/", LoadState::Load, budget())
                .await
                .unwrap_err();
            assert!(matches!(err, E2eError::Navigation { .. }));
            assert!(err.to_string().contains("ERR_CONNECTION_REFUSED"));
        }

        #[tokio::test]
        async fn test_query_before_navigation_fails() {
            let driver = MockDriver::new(starter_site());
            assert!(driver.query(&Selector::css("h1")).await.is_err());
        }

        #[tokio::test]
        async fn test_click_counter() {
            let mut driver = MockDriver::new(starter_site());
            driver.navigate(ROOT, LoadState::Load, budget()).await.unwrap();
            let button = Selector::css("button");
            driver.click(&button, 0).await.unwrap();
            let snap = driver.query(&button).await.unwrap();
            assert_eq!(snap[0].text_content, "Click Me: 1");
        }

        #[tokio::test]
        async fn test_click_detached_element() {
            let mut driver = MockDriver::new(starter_site());
            driver.navigate(ROOT, LoadState::Load, budget()).await.unwrap();
            let err = driver.click(&Selector::css("button"), 3).await.unwrap_err();
            assert!(err.to_string().contains("detached"));
        }

        #[tokio::test]
        async fn test_render_delay() {
            let site = MockSite::new().with_page(
                ROOT,
                MockDocument::leptos_starter().with_render_delay(2),
            );
            let mut driver = MockDriver::new(site);
            driver.navigate(ROOT, LoadState::Load, budget()).await.unwrap();
            let h1 = Selector::css("h1");
            assert!(driver.query(&h1).await.unwrap().is_empty());
            assert!(driver.query(&h1).await.unwrap().is_empty());
            assert_eq!(driver.query(&h1).await.unwrap().len(), 1);
        }

        #[tokio::test]
        async fn test_close_unloads_document() {
            let mut driver = MockDriver::new(starter_site());
            driver.navigate(ROOT, LoadState::Load, budget()).await.unwrap();
            driver.close().await.unwrap();
            assert!(driver.document().is_none());
            assert!(driver.was_called("close"));
        }
    }

    mod factory_tests {
        use super::*;

        #[tokio::test]
        async fn test_sessions_are_isolated() {
            let factory = MockFactory::new(starter_site());
            let mut first = factory.open().await.unwrap();
            let mut second = factory.open().await.unwrap();
            first.navigate(ROOT, LoadState::Load, budget()).await.unwrap();
            second.navigate(ROOT, LoadState::Load, budget()).await.unwrap();

            let button = Selector::css("button");
            first.click(&button, 0).await.unwrap();

            assert_eq!(
                first.query(&button).await.unwrap()[0].text_content,
                "Click Me: 1"
            );
            assert_eq!(
                second.query(&button).await.unwrap()[0].text_content,
                "Click Me: 0"
            );
            assert_eq!(factory.opened(), 2);
        }
    }
}
