//! Text expectations: literal strings or regular expressions.

use crate::result::{E2eError, E2eResult};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Expected text of a title or element.
///
/// `Exact` compares whitespace-normalized strings for full equality.
/// `Pattern` searches the raw text, so `Click Me: \s*1` also accepts
/// `"Click Me: 10"`; anchor the pattern when that matters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "MatcherRepr", into = "MatcherRepr")]
pub enum TextMatcher {
    /// Literal text
    Exact(String),
    /// Regular expression
    Pattern(Regex),
}

/// On-disk form: a bare string, or `{ pattern: "..." }`.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum MatcherRepr {
    Exact(String),
    Pattern { pattern: String },
}

impl TryFrom<MatcherRepr> for TextMatcher {
    type Error = E2eError;

    fn try_from(repr: MatcherRepr) -> Result<Self, Self::Error> {
        match repr {
            MatcherRepr::Exact(text) => Ok(Self::Exact(text)),
            MatcherRepr::Pattern { pattern } => Self::pattern(&pattern),
        }
    }
}

impl From<TextMatcher> for MatcherRepr {
    fn from(matcher: TextMatcher) -> Self {
        match matcher {
            TextMatcher::Exact(text) => Self::Exact(text),
            TextMatcher::Pattern(re) => Self::Pattern {
                pattern: re.as_str().to_string(),
            },
        }
    }
}

impl TextMatcher {
    /// Literal text matcher
    #[must_use]
    pub fn exact(text: impl Into<String>) -> Self {
        Self::Exact(text.into())
    }

    /// Regular expression matcher
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the pattern does not compile
    pub fn pattern(pattern: &str) -> E2eResult<Self> {
        Regex::new(pattern)
            .map(Self::Pattern)
            .map_err(|e| E2eError::config(format!("invalid pattern /{pattern}/: {e}")))
    }

    /// Whether `actual` satisfies this expectation
    #[must_use]
    pub fn matches(&self, actual: &str) -> bool {
        match self {
            Self::Exact(expected) => normalize_whitespace(expected) == normalize_whitespace(actual),
            Self::Pattern(re) => re.is_match(actual),
        }
    }
}

impl PartialEq for TextMatcher {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Exact(a), Self::Exact(b)) => a == b,
            (Self::Pattern(a), Self::Pattern(b)) => a.as_str() == b.as_str(),
            _ => false,
        }
    }
}

impl Eq for TextMatcher {}

impl fmt::Display for TextMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(text) => write!(f, "{text:?}"),
            Self::Pattern(re) => write!(f, "/{}/", re.as_str()),
        }
    }
}

impl From<&str> for TextMatcher {
    fn from(text: &str) -> Self {
        Self::exact(text)
    }
}

impl From<String> for TextMatcher {
    fn from(text: String) -> Self {
        Self::Exact(text)
    }
}

impl From<Regex> for TextMatcher {
    fn from(re: Regex) -> Self {
        Self::Pattern(re)
    }
}

/// Trim and collapse runs of whitespace (including zero-width spaces) to a
/// single space.
#[must_use]
pub fn normalize_whitespace(text: &str) -> String {
    text.replace('\u{200b}', "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
