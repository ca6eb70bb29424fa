//! Locator abstraction for element selection.
//!
//! A [`Locator`] never caches an element. Every query re-evaluates its
//! [`Selector`] against the current document, so a locator taken before a
//! click observes the re-rendered element after it.
//!
//! - **Strict by default**: resolving fails when several elements match
//! - **Indexed**: `.first()` / `.nth(i)` pick one match and drop strictness
//! - **Serializable**: locators can be written in YAML scenario files

use serde::{Deserialize, Serialize};
use std::fmt;

/// Selector type for locating elements
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Selector {
    /// CSS selector (e.g., "button.primary")
    Css(String),
    /// Smallest elements whose text content contains the string
    Text(String),
    /// Test ID selector (data-testid attribute)
    TestId(String),
    /// CSS selector filtered by text content
    CssWithText {
        /// Base CSS selector
        css: String,
        /// Text content to match
        text: String,
    },
}

/// Quote a string as a JavaScript string literal.
fn js_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| String::from("\"\""))
}

impl Selector {
    /// Create a CSS selector
    #[must_use]
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    /// Create a test ID selector
    #[must_use]
    pub fn test_id(id: impl Into<String>) -> Self {
        Self::TestId(id.into())
    }

    /// Create a text selector
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// JavaScript expression evaluating to an `Array` of matching elements,
    /// in document order.
    #[must_use]
    pub fn to_elements_query(&self) -> String {
        match self {
            Self::Css(s) => format!("Array.from(document.querySelectorAll({}))", js_string(s)),
            Self::Text(t) => {
                let t = js_string(t);
                format!(
                    "Array.from(document.body ? document.body.querySelectorAll('*') : []).filter(el => \
                     (el.textContent || '').includes({t}) && \
                     !Array.from(el.children).some(c => (c.textContent || '').includes({t})))"
                )
            }
            Self::TestId(id) => {
                let css = format!("[data-testid=\"{}\"]", id.replace('"', "\\\""));
                format!("Array.from(document.querySelectorAll({}))", js_string(&css))
            }
            Self::CssWithText { css, text } => format!(
                "Array.from(document.querySelectorAll({})).filter(el => (el.textContent || '').includes({}))",
                js_string(css),
                js_string(text)
            ),
        }
    }

    /// JavaScript expression returning one [`ElementSnapshot`]-shaped object
    /// per match.
    #[must_use]
    pub fn to_snapshot_query(&self) -> String {
        format!(
            "({}).map(el => {{ \
               const r = el.getBoundingClientRect(); \
               const s = window.getComputedStyle(el); \
               return {{ \
                 text_content: el.textContent || '', \
                 visible: r.width > 0 && r.height > 0 && s.visibility !== 'hidden' && s.display !== 'none', \
                 enabled: !el.disabled \
               }}; \
             }})",
            self.to_elements_query()
        )
    }

    /// JavaScript expression that scrolls the `index`-th match into view and
    /// returns its centre point in viewport coordinates, or `null`.
    #[must_use]
    pub fn to_click_point_query(&self, index: usize) -> String {
        format!(
            "(() => {{ \
               const el = ({})[{index}]; \
               if (!el) return null; \
               el.scrollIntoView({{ block: 'center', inline: 'center' }}); \
               const r = el.getBoundingClientRect(); \
               return {{ x: r.left + r.width / 2, y: r.top + r.height / 2 }}; \
             }})()",
            self.to_elements_query()
        )
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Css(s) => write!(f, "locator({s:?})"),
            Self::Text(t) => write!(f, "get_by_text({t:?})"),
            Self::TestId(id) => write!(f, "get_by_test_id({id:?})"),
            Self::CssWithText { css, text } => {
                write!(f, "locator({css:?}).with_text({text:?})")
            }
        }
    }
}

/// One element as observed at a single poll instant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementSnapshot {
    /// `textContent` of the element
    pub text_content: String,
    /// Element has a non-empty box and is not hidden
    pub visible: bool,
    /// Element is not `disabled`
    pub enabled: bool,
}

impl ElementSnapshot {
    /// Create a visible, enabled snapshot
    #[must_use]
    pub fn new(text_content: impl Into<String>) -> Self {
        Self {
            text_content: text_content.into(),
            visible: true,
            enabled: true,
        }
    }

    /// Whether a click may be dispatched to this element
    #[must_use]
    pub const fn is_actionable(&self) -> bool {
        self.visible && self.enabled
    }
}

/// Locator options for customizing behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocatorOptions {
    /// Fail if more than one element matches (ignored when `nth` is set)
    #[serde(default = "default_strict")]
    pub strict: bool,
    /// Pick the n-th match
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nth: Option<usize>,
    /// Override the session's wait budget for this locator
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

const fn default_strict() -> bool {
    true
}

impl Default for LocatorOptions {
    fn default() -> Self {
        Self {
            strict: true,
            nth: None,
            timeout_ms: None,
        }
    }
}

/// Outcome of resolving a locator against one query result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution<'a> {
    /// Exactly one element selected
    Found {
        /// Index into the query result
        index: usize,
        /// The selected element
        element: &'a ElementSnapshot,
    },
    /// Nothing matched (or `nth` is out of range)
    NotFound {
        /// Number of elements that did match
        count: usize,
    },
    /// Strict locator matched several elements
    StrictViolation {
        /// Number of matches
        count: usize,
    },
}

impl Resolution<'_> {
    /// Human-readable observation for error reports
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Found { element, .. } => format!("{:?}", element.text_content),
            Self::NotFound { count: 0 } => String::from("no matching element"),
            Self::NotFound { count } => format!("index out of range ({count} matches)"),
            Self::StrictViolation { count } => {
                format!("strict mode violation: {count} elements matched")
            }
        }
    }
}

/// A re-evaluatable reference to a page element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locator {
    /// The selector for finding elements
    #[serde(flatten)]
    selector: Selector,
    /// Options for locator behavior
    #[serde(flatten)]
    options: LocatorOptions,
}

impl Locator {
    /// Create a new locator with a CSS selector
    #[must_use]
    pub fn new(selector: impl Into<String>) -> Self {
        Self::from_selector(Selector::Css(selector.into()))
    }

    /// Create a locator from a selector
    #[must_use]
    pub fn from_selector(selector: Selector) -> Self {
        Self {
            selector,
            options: LocatorOptions::default(),
        }
    }

    /// Locate by visible text
    #[must_use]
    pub fn by_text(text: impl Into<String>) -> Self {
        Self::from_selector(Selector::text(text))
    }

    /// Locate by `data-testid`
    #[must_use]
    pub fn by_test_id(id: impl Into<String>) -> Self {
        Self::from_selector(Selector::test_id(id))
    }

    /// Filter by text content
    ///
    /// Only CSS selectors can be narrowed; other selectors are returned as-is.
    #[must_use]
    pub fn with_text(self, text: impl Into<String>) -> Self {
        let selector = match self.selector {
            Selector::Css(css) => Selector::CssWithText {
                css,
                text: text.into(),
            },
            other => other,
        };
        Self {
            selector,
            options: self.options,
        }
    }

    /// Select the first match
    #[must_use]
    pub const fn first(self) -> Self {
        self.nth(0)
    }

    /// Select the n-th match (zero-based)
    #[must_use]
    pub const fn nth(mut self, index: usize) -> Self {
        self.options.nth = Some(index);
        self.options.strict = false;
        self
    }

    /// Enable or disable strict single-element matching
    #[must_use]
    pub const fn with_strict(mut self, strict: bool) -> Self {
        self.options.strict = strict;
        self
    }

    /// Override the wait budget for operations on this locator
    #[must_use]
    pub const fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.options.timeout_ms = Some(timeout_ms);
        self
    }

    /// Get the selector
    #[must_use]
    pub const fn selector(&self) -> &Selector {
        &self.selector
    }

    /// Get the options
    #[must_use]
    pub const fn options(&self) -> &LocatorOptions {
        &self.options
    }

    /// Pick this locator's element out of a query result.
    #[must_use]
    pub fn resolve<'a>(&self, matches: &'a [ElementSnapshot]) -> Resolution<'a> {
        let count = matches.len();
        match self.options.nth {
            Some(index) => match matches.get(index) {
                Some(element) => Resolution::Found { index, element },
                None => Resolution::NotFound { count },
            },
            None if count == 0 => Resolution::NotFound { count },
            None if count > 1 && self.options.strict => Resolution::StrictViolation { count },
            None => Resolution::Found {
                index: 0,
                element: &matches[0],
            },
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.selector)?;
        match self.options.nth {
            Some(0) => write!(f, ".first()"),
            Some(n) => write!(f, ".nth({n})"),
            None => Ok(()),
        }
    }
}
