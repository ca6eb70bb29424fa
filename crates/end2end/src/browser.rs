//! Browser control for headless testing.
//!
//! With the `browser` feature this module drives Chromium over the Chrome
//! `DevTools` Protocol via chromiumoxide. Every page is opened in its own
//! browser context, so sessions share no cookies, storage or cache.

use serde::{Deserialize, Serialize};

/// Browser configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Run in headless mode
    pub headless: bool,
    /// Viewport width
    pub viewport_width: u32,
    /// Viewport height
    pub viewport_height: u32,
    /// Path to chromium binary (None = auto-detect)
    pub chromium_path: Option<String>,
    /// Sandbox mode (disable for containers)
    pub sandbox: bool,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            viewport_width: 1280,
            viewport_height: 720,
            chromium_path: None,
            sandbox: true,
        }
    }
}

impl BrowserConfig {
    /// Set viewport dimensions
    #[must_use]
    pub const fn with_viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport_width = width;
        self.viewport_height = height;
        self
    }

    /// Set headless mode
    #[must_use]
    pub const fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Set chromium path
    #[must_use]
    pub fn with_chromium_path(mut self, path: impl Into<String>) -> Self {
        self.chromium_path = Some(path.into());
        self
    }

    /// Disable sandbox (for containers/CI)
    #[must_use]
    pub const fn with_no_sandbox(mut self) -> Self {
        self.sandbox = false;
        self
    }
}

// ============================================================================
// Real CDP Implementation (when `browser` feature is enabled)
// ============================================================================

#[cfg(feature = "browser")]
mod cdp {
    use super::BrowserConfig;
    use crate::driver::{PageDriver, SessionFactory};
    use crate::locator::{ElementSnapshot, Selector};
    use crate::result::{E2eError, E2eResult};
    use crate::wait::{LoadState, NETWORK_IDLE_THRESHOLD_MS};
    use async_trait::async_trait;
    use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig as CdpConfig};
    use chromiumoxide::cdp::browser_protocol::browser::BrowserContextId;
    use chromiumoxide::cdp::browser_protocol::target::{
        CreateBrowserContextParams, CreateTargetParams, DisposeBrowserContextParams,
    };
    use chromiumoxide::layout::Point;
    use chromiumoxide::page::Page as RawPage;
    use futures::StreamExt;
    use serde::de::DeserializeOwned;
    use serde::Deserialize;
    use std::sync::Arc;
    use std::time::{Duration, Instant};
    use tokio::sync::Mutex;

    const READY_POLL_MS: u64 = 50;

    fn page_error(e: impl ToString) -> E2eError {
        E2eError::Page {
            message: e.to_string(),
        }
    }

    fn eval_error(e: impl ToString) -> E2eError {
        E2eError::Evaluation {
            message: e.to_string(),
        }
    }

    /// Browser instance with real CDP connection
    #[derive(Debug)]
    pub struct Browser {
        config: BrowserConfig,
        inner: Arc<Mutex<CdpBrowser>>,
        handle: tokio::task::JoinHandle<()>,
    }

    impl Browser {
        /// Launch a new browser instance with real CDP
        ///
        /// # Errors
        ///
        /// Returns error if browser cannot be found or launched
        pub async fn launch(config: BrowserConfig) -> E2eResult<Self> {
            let mut builder = CdpConfig::builder()
                .window_size(config.viewport_width, config.viewport_height);

            if !config.headless {
                builder = builder.with_head();
            }

            if !config.sandbox {
                builder = builder.no_sandbox();
            }

            if let Some(ref path) = config.chromium_path {
                builder = builder.chrome_executable(path);
            }

            let cdp_config = builder.build().map_err(|message| {
                if message.contains("detect") {
                    E2eError::BrowserNotFound
                } else {
                    E2eError::BrowserLaunch { message }
                }
            })?;

            let (browser, mut handler) =
                CdpBrowser::launch(cdp_config)
                    .await
                    .map_err(|e| E2eError::BrowserLaunch {
                        message: e.to_string(),
                    })?;

            let handle = tokio::spawn(async move {
                while let Some(event) = handler.next().await {
                    if event.is_err() {
                        break;
                    }
                }
            });

            tracing::info!(
                headless = config.headless,
                width = config.viewport_width,
                height = config.viewport_height,
                "browser launched"
            );

            Ok(Self {
                config,
                inner: Arc::new(Mutex::new(browser)),
                handle,
            })
        }

        /// Create a page in a fresh browser context
        ///
        /// # Errors
        ///
        /// Returns error if the context or page cannot be created
        pub async fn new_page(&self) -> E2eResult<CdpPage> {
            let browser = self.inner.lock().await;
            let context_id = browser
                .execute(CreateBrowserContextParams::default())
                .await
                .map_err(page_error)?
                .result
                .browser_context_id;

            let target = CreateTargetParams::builder()
                .url("about:blank")
                .browser_context_id(context_id.clone())
                .build()
                .map_err(page_error)?;

            let page = browser.new_page(target).await.map_err(page_error)?;

            Ok(CdpPage {
                page,
                context_id: Some(context_id),
                browser: Arc::clone(&self.inner),
            })
        }

        /// Get the browser configuration
        #[must_use]
        pub const fn config(&self) -> &BrowserConfig {
            &self.config
        }

        /// Close the browser
        ///
        /// # Errors
        ///
        /// Returns error if the browser process does not shut down cleanly
        pub async fn close(self) -> E2eResult<()> {
            let mut browser = self.inner.lock().await;
            browser
                .close()
                .await
                .map_err(|e| E2eError::BrowserLaunch {
                    message: e.to_string(),
                })?;
            if let Err(error) = browser.wait().await {
                tracing::warn!(%error, "failed to reap the browser process");
            }
            drop(browser);
            self.handle.abort();
            tracing::info!("browser closed");
            Ok(())
        }
    }

    #[derive(Debug, Deserialize)]
    struct ClickPoint {
        found: bool,
        #[serde(default)]
        x: f64,
        #[serde(default)]
        y: f64,
    }

    /// A browser page with real CDP connection
    #[derive(Debug)]
    pub struct CdpPage {
        page: RawPage,
        context_id: Option<BrowserContextId>,
        browser: Arc<Mutex<CdpBrowser>>,
    }

    impl CdpPage {
        async fn eval<T: DeserializeOwned>(&self, expr: String) -> E2eResult<T> {
            self.page
                .evaluate(expr)
                .await
                .map_err(eval_error)?
                .into_value()
                .map_err(eval_error)
        }

        async fn wait_ready(&self, wait_until: LoadState) -> E2eResult<()> {
            let ready = format!("({})", wait_until.ready_script());
            while !self.eval::<bool>(ready.clone()).await? {
                tokio::time::sleep(Duration::from_millis(READY_POLL_MS)).await;
            }

            if wait_until == LoadState::NetworkIdle {
                let count = "performance.getEntriesByType('resource').length".to_string();
                let mut seen = self.eval::<u64>(count.clone()).await?;
                let mut quiet_since = Instant::now();
                while quiet_since.elapsed() < Duration::from_millis(NETWORK_IDLE_THRESHOLD_MS) {
                    tokio::time::sleep(Duration::from_millis(READY_POLL_MS)).await;
                    let now = self.eval::<u64>(count.clone()).await?;
                    if now != seen {
                        seen = now;
                        quiet_since = Instant::now();
                    }
                }
            }
            Ok(())
        }
    }

    #[async_trait]
    impl PageDriver for CdpPage {
        async fn navigate(
            &mut self,
            url: &str,
            wait_until: LoadState,
            timeout: Duration,
        ) -> E2eResult<()> {
            let navigation = async {
                self.page
                    .goto(url)
                    .await
                    .map_err(|e| E2eError::Navigation {
                        url: url.to_string(),
                        message: e.to_string(),
                    })?;
                self.wait_ready(wait_until).await
            };

            match tokio::time::timeout(timeout, navigation).await {
                Ok(result) => result,
                Err(_) => Err(E2eError::Navigation {
                    url: url.to_string(),
                    message: format!(
                        "timeout {}ms exceeded waiting for '{wait_until}'",
                        timeout.as_millis()
                    ),
                }),
            }
        }

        async fn title(&self) -> E2eResult<String> {
            self.eval("document.title".to_string()).await
        }

        async fn query(&self, selector: &Selector) -> E2eResult<Vec<ElementSnapshot>> {
            self.eval(selector.to_snapshot_query()).await
        }

        async fn click(&mut self, selector: &Selector, index: usize) -> E2eResult<()> {
            let expr = format!(
                "(() => {{ const p = {}; return p ? {{ found: true, x: p.x, y: p.y }} : {{ found: false }}; }})()",
                selector.to_click_point_query(index)
            );
            let point: ClickPoint = self.eval(expr).await?;
            if !point.found {
                return Err(eval_error(format!("element {selector}[{index}] is detached")));
            }
            self.page
                .click(Point::new(point.x, point.y))
                .await
                .map_err(eval_error)?;
            Ok(())
        }

        async fn current_url(&self) -> E2eResult<String> {
            Ok(self
                .page
                .url()
                .await
                .map_err(page_error)?
                .unwrap_or_default())
        }

        async fn close(&mut self) -> E2eResult<()> {
            self.page.clone().close().await.map_err(page_error)?;
            if let Some(context_id) = self.context_id.take() {
                let browser = self.browser.lock().await;
                browser
                    .execute(DisposeBrowserContextParams::new(context_id))
                    .await
                    .map_err(page_error)?;
            }
            Ok(())
        }
    }

    /// Opens one CDP page per scenario from a shared browser.
    #[derive(Debug, Clone)]
    pub struct ChromiumFactory {
        browser: Arc<Browser>,
    }

    impl ChromiumFactory {
        /// Wrap a launched browser
        #[must_use]
        pub fn new(browser: Browser) -> Self {
            Self {
                browser: Arc::new(browser),
            }
        }

        /// Launch a browser and wrap it
        ///
        /// # Errors
        ///
        /// Returns error if the browser cannot be launched
        pub async fn launch(config: BrowserConfig) -> E2eResult<Self> {
            Ok(Self::new(Browser::launch(config).await?))
        }

        /// Shut the browser down once no session holds it any more
        ///
        /// # Errors
        ///
        /// Returns error if sessions are still open or shutdown fails
        pub async fn shutdown(self) -> E2eResult<()> {
            let browser = Arc::try_unwrap(self.browser).map_err(|_| {
                E2eError::invalid_state("browser still shared by open sessions")
            })?;
            browser.close().await
        }
    }

    #[async_trait]
    impl SessionFactory for ChromiumFactory {
        type Driver = CdpPage;

        async fn open(&self) -> E2eResult<CdpPage> {
            self.browser.new_page().await
        }
    }
}

#[cfg(feature = "browser")]
pub use cdp::{Browser, CdpPage, ChromiumFactory};
