//! end2end: browser scenarios for the Leptos starter page
//!
//! Drives a page the way a user would (navigate, read, click) and checks
//! the rendered result with auto-waiting expectations.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │   ┌────────────┐    ┌────────────┐    ┌────────────┐            │
//! │   │ Scenario   │    │ Page       │    │ PageDriver │            │
//! │   │ (steps,    │───►│ Session    │───►│ CDP or     │            │
//! │   │  YAML)     │    │ (waiting)  │    │ mock       │            │
//! │   └────────────┘    └────────────┘    └────────────┘            │
//! │         ▲                                                       │
//! │   ┌─────┴──────┐  one session per scenario, run concurrently    │
//! │   │ SuiteRunner│                                                │
//! │   └────────────┘                                                │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use end2end::{default_suite, MockDocument, MockFactory, MockSite, SuiteConfig, SuiteRunner};
//!
//! # async fn demo() -> end2end::E2eResult<()> {
//! let site = MockSite::new().with_page("http://localhost:3000/", MockDocument::leptos_starter());
//! let runner = SuiteRunner::new(MockFactory::new(site), SuiteConfig::default());
//! let report = runner.run(&default_suite()?).await?;
//! assert!(report.all_passed());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
// Lints are configured in workspace Cargo.toml [workspace.lints.clippy]

mod browser;
mod config;
mod driver;
mod locator;
pub mod logging;
mod matcher;
mod result;
mod runner;
mod scenario;
mod session;
pub mod suite;
mod wait;

pub use browser::BrowserConfig;
#[cfg(feature = "browser")]
pub use browser::{Browser, CdpPage, ChromiumFactory};
pub use config::{
    SuiteConfig, DEFAULT_BASE_URL, ENV_BASE_URL, ENV_CHROMIUM_PATH, ENV_HEADLESS,
    ENV_POLL_INTERVAL_MS, ENV_TIMEOUT_MS,
};
pub use driver::{
    ClickBehavior, MockDocument, MockDriver, MockElement, MockFactory, MockSite, PageDriver,
    SessionFactory,
};
pub use locator::{ElementSnapshot, Locator, LocatorOptions, Resolution, Selector};
pub use logging::{init_tracing, LogFormat};
pub use matcher::{normalize_whitespace, TextMatcher};
pub use result::{E2eError, E2eResult};
pub use runner::{FailureDetail, ScenarioOutcome, SuiteReport, SuiteRunner};
pub use scenario::{load_scenarios, Scenario, ScenarioReport, Step, StepFailure, StepRecord};
pub use session::{PageSession, SessionOptions, SessionState};
pub use suite::{counter_scenario, default_suite, homepage_scenario};
pub use wait::{
    poll_until, LoadState, Poll, PollOutcome, WaitOptions, WaitTimeout, DEFAULT_NAVIGATION_TIMEOUT_MS,
    DEFAULT_POLL_INTERVAL_MS, DEFAULT_WAIT_TIMEOUT_MS,
};

/// Prelude for convenient imports
pub mod prelude {
    pub use super::{
        default_suite, E2eError, E2eResult, Locator, LoadState, PageDriver, PageSession,
        Scenario, SessionFactory, SuiteConfig, SuiteReport, SuiteRunner, TextMatcher,
    };
    #[cfg(feature = "browser")]
    pub use super::ChromiumFactory;
}
