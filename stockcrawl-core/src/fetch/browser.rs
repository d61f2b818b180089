//! Script-rendered fetch through a headless Chromium session.
//!
//! Some pages are filled in by client-side script after load, so a plain GET
//! returns an empty shell. For those the renderer launches a browser, navigates,
//! waits for load plus a settle interval, captures the rendered HTML and shuts
//! the browser down again. One browser process per attempt, released on every
//! path.

use super::transport::{Transport, TransportError};
use chromiumoxide::browser::{Browser, BrowserConfig};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, warn};

/// Browser launch options, passed explicitly to every renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserOptions {
    /// Run without a visible window.
    pub headless: bool,
    /// Chromium binary. `None` lets chromiumoxide search the usual locations.
    pub executable: Option<PathBuf>,
    /// Extra wait after the load event for script-populated content.
    pub settle_ms: u64,
    /// How long to wait for the browser process to come up.
    pub launch_timeout_secs: u64,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            headless: true,
            executable: None,
            settle_ms: 1_000,
            launch_timeout_secs: 20,
        }
    }
}

impl BrowserOptions {
    fn to_config(&self) -> Result<BrowserConfig, TransportError> {
        let mut builder = BrowserConfig::builder()
            .launch_timeout(Duration::from_secs(self.launch_timeout_secs))
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions");
        if !self.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &self.executable {
            builder = builder.chrome_executable(path);
        }
        builder
            .build()
            .map_err(|e| TransportError::Browser(format!("invalid browser config: {e}")))
    }
}

/// Transport that renders pages in a fresh browser session per attempt.
pub struct ScriptRenderer {
    options: BrowserOptions,
    runtime: tokio::runtime::Runtime,
}

impl ScriptRenderer {
    pub fn new(options: BrowserOptions) -> Result<Self, TransportError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| TransportError::Browser(format!("failed to start runtime: {e}")))?;
        Ok(Self { options, runtime })
    }

    pub fn options(&self) -> &BrowserOptions {
        &self.options
    }
}

impl Transport for ScriptRenderer {
    fn name(&self) -> &str {
        "browser"
    }

    fn get(&self, url: &str) -> Result<String, TransportError> {
        self.runtime.block_on(render(&self.options, url))
    }
}

/// A launched browser, reduced to what one render needs.
pub(crate) trait BrowserSession {
    async fn capture(&mut self, url: &str, settle: Duration) -> Result<String, TransportError>;

    /// Ask the browser to shut down.
    async fn close(&mut self) -> Result<(), TransportError>;

    /// Kill the browser process outright.
    async fn kill(&mut self) -> Result<(), TransportError>;

    /// Wait for the browser process to exit.
    async fn wait(&mut self) -> Result<(), TransportError>;
}

async fn render(options: &BrowserOptions, url: &str) -> Result<String, TransportError> {
    let session = ChromiumSession::launch(options).await?;
    run_session(
        session,
        url,
        Duration::from_millis(options.settle_ms),
        Duration::from_secs(options.launch_timeout_secs),
    )
    .await
}

/// Capture `url`, then release the session whatever the capture returned.
pub(crate) async fn run_session<S: BrowserSession>(
    mut session: S,
    url: &str,
    settle: Duration,
    exit_limit: Duration,
) -> Result<String, TransportError> {
    let captured = session.capture(url, settle).await;
    release(&mut session, url, exit_limit).await;
    debug!(url, ok = captured.is_ok(), "browser session released");
    captured
}

async fn release<S: BrowserSession>(session: &mut S, url: &str, exit_limit: Duration) {
    if let Err(e) = session.close().await {
        // A closed command channel leaves the process running; close cannot reach it.
        warn!(url, error = %e, "browser close failed, killing process");
        if let Err(e) = session.kill().await {
            warn!(url, error = %e, "browser kill failed");
        }
    }
    match tokio::time::timeout(exit_limit, session.wait()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(url, error = %e, "browser process did not exit cleanly"),
        Err(_) => warn!(url, ?exit_limit, "browser process still running, abandoning it"),
    }
}

struct ChromiumSession {
    browser: Browser,
    driver: tokio::task::JoinHandle<()>,
}

impl ChromiumSession {
    async fn launch(options: &BrowserOptions) -> Result<Self, TransportError> {
        let config = options.to_config()?;
        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| TransportError::Browser(format!("failed to launch browser: {e}")))?;

        let driver = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });
        Ok(Self { browser, driver })
    }
}

impl BrowserSession for ChromiumSession {
    async fn capture(&mut self, url: &str, settle: Duration) -> Result<String, TransportError> {
        let page = self
            .browser
            .new_page(url)
            .await
            .map_err(|e| TransportError::Browser(format!("navigation failed: {e}")))?;
        page.wait_for_navigation()
            .await
            .map_err(|e| TransportError::Browser(format!("page load failed: {e}")))?;
        tokio::time::sleep(settle).await;
        page.content()
            .await
            .map_err(|e| TransportError::Browser(format!("failed to read rendered HTML: {e}")))
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.browser
            .close()
            .await
            .map(|_| ())
            .map_err(|e| TransportError::Browser(format!("close failed: {e}")))
    }

    async fn kill(&mut self) -> Result<(), TransportError> {
        match self.browser.kill().await {
            Some(Err(e)) => Err(TransportError::Browser(format!("kill failed: {e}"))),
            Some(Ok(())) | None => Ok(()),
        }
    }

    async fn wait(&mut self) -> Result<(), TransportError> {
        self.browser
            .wait()
            .await
            .map(|_| ())
            .map_err(|e| TransportError::Browser(format!("wait failed: {e}")))
    }
}

impl Drop for ChromiumSession {
    fn drop(&mut self) {
        self.driver.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn default_options_are_headless() {
        let opts = BrowserOptions::default();
        assert!(opts.headless);
        assert!(opts.executable.is_none());
    }

    #[test]
    fn options_deserialize_with_defaults() {
        let opts: BrowserOptions = toml::from_str("headless = false").unwrap();
        assert!(!opts.headless);
        assert_eq!(opts.settle_ms, 1_000);
    }

    #[test]
    fn renderer_keeps_its_options() {
        let opts = BrowserOptions {
            settle_ms: 50,
            ..BrowserOptions::default()
        };
        let renderer = ScriptRenderer::new(opts.clone()).unwrap();
        assert_eq!(renderer.options(), &opts);
        assert_eq!(renderer.name(), "browser");
    }

    /// Session double that records every lifecycle call.
    struct Recorded {
        events: Rc<RefCell<Vec<&'static str>>>,
        capture_ok: bool,
        close_ok: bool,
        kill_ok: bool,
        exits: bool,
    }

    impl Recorded {
        fn new(events: &Rc<RefCell<Vec<&'static str>>>) -> Self {
            Self {
                events: Rc::clone(events),
                capture_ok: true,
                close_ok: true,
                kill_ok: true,
                exits: true,
            }
        }

        fn fail(ok: bool, what: &str) -> Result<(), TransportError> {
            if ok {
                Ok(())
            } else {
                Err(TransportError::Browser(format!("{what} failed")))
            }
        }
    }

    impl BrowserSession for Recorded {
        async fn capture(&mut self, _url: &str, _settle: Duration) -> Result<String, TransportError> {
            self.events.borrow_mut().push("capture");
            Self::fail(self.capture_ok, "navigation").map(|_| "<html>rendered</html>".to_string())
        }

        async fn close(&mut self) -> Result<(), TransportError> {
            self.events.borrow_mut().push("close");
            Self::fail(self.close_ok, "close")
        }

        async fn kill(&mut self) -> Result<(), TransportError> {
            self.events.borrow_mut().push("kill");
            Self::fail(self.kill_ok, "kill")
        }

        async fn wait(&mut self) -> Result<(), TransportError> {
            self.events.borrow_mut().push("wait");
            if !self.exits {
                std::future::pending::<()>().await;
            }
            Ok(())
        }
    }

    fn run(session: Recorded, exit_limit: Duration) -> Result<String, TransportError> {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
            .block_on(run_session(session, "http://x", Duration::ZERO, exit_limit))
    }

    #[test]
    fn clean_session_closes_and_waits() {
        let events = Rc::new(RefCell::new(Vec::new()));
        let html = run(Recorded::new(&events), Duration::from_secs(1)).unwrap();
        assert_eq!(html, "<html>rendered</html>");
        assert_eq!(*events.borrow(), vec!["capture", "close", "wait"]);
    }

    #[test]
    fn failed_capture_still_releases_the_browser() {
        let events = Rc::new(RefCell::new(Vec::new()));
        let session = Recorded {
            capture_ok: false,
            ..Recorded::new(&events)
        };
        let err = run(session, Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, TransportError::Browser(_)));
        assert_eq!(*events.borrow(), vec!["capture", "close", "wait"]);
    }

    #[test]
    fn failed_close_kills_the_process() {
        let events = Rc::new(RefCell::new(Vec::new()));
        let session = Recorded {
            close_ok: false,
            ..Recorded::new(&events)
        };
        assert!(run(session, Duration::from_secs(1)).is_ok());
        assert_eq!(*events.borrow(), vec!["capture", "close", "kill", "wait"]);
    }

    #[test]
    fn process_that_never_exits_does_not_block_the_renderer() {
        let events = Rc::new(RefCell::new(Vec::new()));
        let session = Recorded {
            capture_ok: false,
            close_ok: false,
            kill_ok: false,
            exits: false,
            ..Recorded::new(&events)
        };
        let started = std::time::Instant::now();
        assert!(run(session, Duration::from_millis(50)).is_err());
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(*events.borrow(), vec!["capture", "close", "kill", "wait"]);
    }
}
