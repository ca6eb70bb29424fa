//! The built-in Leptos starter scenarios.

use crate::locator::Locator;
use crate::matcher::TextMatcher;
use crate::result::E2eResult;
use crate::scenario::Scenario;

/// Title the starter page sets
pub const EXPECTED_TITLE: &str = "Welcome to Leptos";

/// Text of the starter page's first heading
pub const EXPECTED_HEADING: &str = "Welcome to Leptos!";

/// Counter button label preceding the count
pub const COUNTER_LABEL: &str = "Click Me: ";

/// Counter pattern up to the count itself
pub const COUNTER_PATTERN_PREFIX: &str = r"Click Me: \s*";

/// Name of the title/heading scenario
pub const HOMEPAGE_SCENARIO: &str = "homepage has title and heading";

/// Name of the counter scenario
pub const COUNTER_SCENARIO: &str = "button increments count when clicked";

/// Matcher for the counter button showing `count`
///
/// # Errors
///
/// Never fails for the built-in prefix; kept fallible like [`TextMatcher::pattern`]
pub fn counter_text(count: u64) -> E2eResult<TextMatcher> {
    TextMatcher::pattern(&format!("{COUNTER_PATTERN_PREFIX}{count}"))
}

/// Open `/`, expect the title, then the first heading's text.
#[must_use]
pub fn homepage_scenario() -> Scenario {
    Scenario::new(HOMEPAGE_SCENARIO)
        .navigate("/")
        .expect_title(EXPECTED_TITLE)
        .expect_text(Locator::new("h1").first(), EXPECTED_HEADING)
}

/// Open `/`, then click the first button twice, checking the count each time.
///
/// # Errors
///
/// Returns error if a counter pattern fails to compile
pub fn counter_scenario() -> E2eResult<Scenario> {
    let button = Locator::new("button").first();
    Ok(Scenario::new(COUNTER_SCENARIO)
        .navigate("/")
        .expect_text(button.clone(), counter_text(0)?)
        .click(button.clone())
        .expect_text(button.clone(), counter_text(1)?)
        .click(button.clone())
        .expect_text(button, counter_text(2)?))
}

/// Both starter scenarios
///
/// # Errors
///
/// Returns error if a scenario cannot be built
pub fn default_suite() -> E2eResult<Vec<Scenario>> {
    Ok(vec![homepage_scenario(), counter_scenario()?])
}
