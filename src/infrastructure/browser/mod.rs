//! WebDriver-backed browser session for the registration flow.
//!
//! The session fills forms by position rather than by field name, because
//! the registration page markup is not under our control, and reads the
//! outcome through the ordered extraction strategies in
//! [`crate::domain::registration`].

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thirtyfour::prelude::*;
use thirtyfour::ChromiumLikeCapabilities;

use crate::domain::registration::{
    classify, ExtractionStrategy, RegistrationOutcome, RenderedPage,
};
use crate::error::{HarnessError, HarnessResult};
use crate::infrastructure::config::{BrowserKind, Config, Diagnostics};

const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// One input element of the page's form
#[async_trait]
pub trait FormInput: Send + Sync {
    async fn type_text(&self, text: &str) -> HarnessResult<()>;

    /// The `type` attribute, if any
    async fn input_type(&self) -> HarnessResult<Option<String>>;

    async fn click_element(&self) -> HarnessResult<()>;

    async fn press_enter(&self) -> HarnessResult<()>;
}

/// Browser operations the registration flow drives, on top of reading the page
#[async_trait]
pub trait BrowserDriver: RenderedPage + Sized {
    type Input: FormInput;

    async fn navigate(&self, url: &str) -> HarnessResult<()>;

    /// Wait up to `timeout` for an element with tag `tag`
    async fn wait_for_tag(&self, tag: &str, timeout: Duration) -> HarnessResult<()>;

    /// Every `input` element, in document order
    async fn inputs(&self) -> HarnessResult<Vec<Self::Input>>;

    async fn save_screenshot(&self, path: &Path) -> HarnessResult<()>;

    async fn shut_down(self) -> HarnessResult<()>;
}

/// A browser behind a WebDriver server
pub struct RemoteBrowser(WebDriver);

pub struct BrowserSession<D = RemoteBrowser> {
    driver: D,
    base_url: String,
    screenshot_dir: PathBuf,
    element_timeout: Duration,
    diagnostics: Diagnostics,
}

impl BrowserSession<RemoteBrowser> {
    /// Start a headless browser through the configured WebDriver server
    pub async fn open(config: &Config) -> HarnessResult<Self> {
        tracing::info!(
            webdriver = %config.webdriver_url,
            browser = ?config.browser,
            "Starting browser session"
        );

        let driver = match config.browser {
            BrowserKind::Firefox => {
                let mut caps = DesiredCapabilities::firefox();
                caps.set_headless()?;
                for arg in &config.browser_args {
                    caps.add_arg(arg)?;
                }
                WebDriver::new(config.webdriver_url.as_str(), caps).await?
            }
            BrowserKind::Chrome => {
                let mut caps = DesiredCapabilities::chrome();
                caps.set_headless()?;
                for arg in &config.browser_args {
                    caps.add_arg(arg)?;
                }
                WebDriver::new(config.webdriver_url.as_str(), caps).await?
            }
        };

        if let Err(e) = std::fs::create_dir_all(&config.screenshot_dir) {
            tracing::warn!(
                dir = %config.screenshot_dir.display(),
                error = %e,
                "Cannot create screenshot directory"
            );
        }

        Ok(Self::with_driver(RemoteBrowser(driver), config))
    }
}

impl<D: BrowserDriver> BrowserSession<D> {
    pub fn with_driver(driver: D, config: &Config) -> Self {
        Self {
            driver,
            base_url: config.base_url(),
            screenshot_dir: config.screenshot_dir.clone(),
            element_timeout: config.element_timeout,
            diagnostics: config.diagnostics,
        }
    }

    /// Fill the registration form with `values` in input order, submit it and classify the result
    pub async fn register_via_form(&self, values: &[String]) -> HarnessResult<RegistrationOutcome> {
        let register_url = format!("{}/register", self.base_url);

        self.goto_with_fallback(&register_url).await?;
        self.screenshot("registration_page_accessed").await;

        match self.fill_and_submit(values).await {
            Ok(outcome) => {
                self.note(&format!(
                    "Registration outcome via {:?}: {:?}",
                    outcome.source, outcome.messages
                ));
                Ok(outcome)
            }
            Err(e) => {
                tracing::error!(error = %e, "Error during registration");
                self.screenshot("registration_error").await;
                Err(e)
            }
        }
    }

    /// Navigate to `url`; if that fails, warm up through the alternate pages and retry once each
    pub async fn goto_with_fallback(&self, url: &str) -> HarnessResult<()> {
        let first_error = match self.driver.navigate(url).await {
            Ok(()) => return Ok(()),
            Err(e) => e,
        };
        tracing::warn!(url, error = %first_error, "Navigation failed, trying alternate URLs");

        for alternate in self.alternate_urls() {
            if let Err(e) = self.driver.navigate(&alternate).await {
                tracing::debug!(url = %alternate, error = %e, "Alternate URL failed");
                continue;
            }
            self.screenshot(&format!("alt_url_{}", url_label(&alternate))).await;

            match self.driver.navigate(url).await {
                Ok(()) => {
                    self.note(&format!("Reached {} after visiting {}", url, alternate));
                    return Ok(());
                }
                Err(e) => tracing::debug!(url, error = %e, "Retry after alternate failed"),
            }
        }

        Err(HarnessError::Navigation(format!(
            "Could not access {} or any alternate URLs",
            url
        )))
    }

    /// Root, login page and public timeline, in that order
    pub fn alternate_urls(&self) -> Vec<String> {
        vec![
            self.base_url.clone(),
            format!("{}/login", self.base_url),
            format!("{}/public", self.base_url),
        ]
    }

    /// Save a screenshot; failures are logged and otherwise ignored
    pub async fn screenshot(&self, name: &str) -> Option<PathBuf> {
        let path = self.screenshot_dir.join(format!("{}.png", name));
        match self.driver.save_screenshot(&path).await {
            Ok(()) => {
                self.note(&format!("Screenshot saved to {}", path.display()));
                Some(path)
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Screenshot failed");
                None
            }
        }
    }

    /// End the browser session, then hand back `result` unchanged.
    ///
    /// A failure to quit is logged rather than masking the scenario result.
    pub async fn finish<T>(self, result: HarnessResult<T>) -> HarnessResult<T> {
        if let Err(e) = self.driver.shut_down().await {
            tracing::warn!(error = %e, "Failed to quit browser session");
        }
        result
    }

    async fn fill_and_submit(&self, values: &[String]) -> HarnessResult<RegistrationOutcome> {
        self.driver
            .wait_for_tag("form", self.element_timeout)
            .await
            .map_err(|_| HarnessError::Timeout("registration form".to_string()))?;

        let inputs = self.driver.inputs().await?;
        self.note(&format!("Found {} input fields", inputs.len()));

        for (input, value) in inputs.iter().zip(values) {
            input.type_text(value).await?;
        }

        if let Some(last) = inputs.last() {
            if last.input_type().await?.as_deref() == Some("submit") {
                last.click_element().await?;
            } else {
                last.press_enter().await?;
            }
        }

        self.screenshot("after_registration").await;

        classify(&self.driver, &ExtractionStrategy::DEFAULT_ORDER, self.element_timeout).await
    }

    fn note(&self, message: &str) {
        match self.diagnostics {
            Diagnostics::Verbose => tracing::info!("{}", message),
            Diagnostics::Terse => tracing::debug!("{}", message),
        }
    }
}

async fn element_texts(elements: Vec<WebElement>) -> HarnessResult<Vec<String>> {
    let mut texts = Vec::with_capacity(elements.len());
    for element in elements {
        texts.push(element.text().await?);
    }
    Ok(texts)
}

#[async_trait]
impl RenderedPage for RemoteBrowser {
    async fn current_url(&self) -> HarnessResult<String> {
        Ok(self.0.current_url().await?.to_string())
    }

    async fn title(&self) -> HarnessResult<String> {
        Ok(self.0.title().await?)
    }

    async fn wait_for_class_texts(
        &self,
        class: &str,
        timeout: Duration,
    ) -> HarnessResult<Vec<String>> {
        self.0
            .query(By::ClassName(class))
            .wait(timeout, POLL_INTERVAL)
            .first()
            .await
            .map_err(|_| HarnessError::Timeout(format!("elements with class '{}'", class)))?;

        element_texts(self.0.find_all(By::ClassName(class)).await?).await
    }

    async fn tag_texts(&self, tag: &str) -> HarnessResult<Vec<String>> {
        element_texts(self.0.find_all(By::Tag(tag)).await?).await
    }
}

#[async_trait]
impl BrowserDriver for RemoteBrowser {
    type Input = WebElement;

    async fn navigate(&self, url: &str) -> HarnessResult<()> {
        Ok(self.0.goto(url).await?)
    }

    async fn wait_for_tag(&self, tag: &str, timeout: Duration) -> HarnessResult<()> {
        self.0
            .query(By::Tag(tag))
            .wait(timeout, POLL_INTERVAL)
            .first()
            .await?;
        Ok(())
    }

    async fn inputs(&self) -> HarnessResult<Vec<WebElement>> {
        Ok(self.0.find_all(By::Tag("input")).await?)
    }

    async fn save_screenshot(&self, path: &Path) -> HarnessResult<()> {
        Ok(self.0.screenshot(path).await?)
    }

    async fn shut_down(self) -> HarnessResult<()> {
        Ok(self.0.quit().await?)
    }
}

#[async_trait]
impl FormInput for WebElement {
    async fn type_text(&self, text: &str) -> HarnessResult<()> {
        Ok(self.send_keys(text).await?)
    }

    async fn input_type(&self) -> HarnessResult<Option<String>> {
        Ok(self.attr("type").await?)
    }

    async fn click_element(&self) -> HarnessResult<()> {
        Ok(self.click().await?)
    }

    async fn press_enter(&self) -> HarnessResult<()> {
        Ok(self.send_keys(Key::Enter).await?)
    }
}

/// Last path segment of `url`, or `root` for the bare host
fn url_label(url: &str) -> String {
    let path = url
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(url)
        .split_once('/')
        .map(|(_, path)| path)
        .unwrap_or("");

    match path.trim_end_matches('/').rsplit('/').next() {
        Some(segment) if !segment.is_empty() => segment.to_string(),
        _ => "root".to_string(),
    }
}
