use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::HarnessResult;

/// Read-only view of the page a browser currently shows.
///
/// Implemented by the WebDriver session; tests substitute a scripted page.
#[async_trait]
pub trait RenderedPage: Send + Sync {
    async fn current_url(&self) -> HarnessResult<String>;

    async fn title(&self) -> HarnessResult<String>;

    /// Texts of elements carrying `class`, waiting up to `timeout` for the first one.
    ///
    /// # Errors
    /// Returns `HarnessError::Timeout` when no such element shows up in time
    async fn wait_for_class_texts(&self, class: &str, timeout: Duration)
        -> HarnessResult<Vec<String>>;

    /// Texts of every element with tag `tag`, without waiting
    async fn tag_texts(&self, tag: &str) -> HarnessResult<Vec<String>>;
}

/// One way of reading the outcome of a form submission off the page.
///
/// Strategies are tried in the order given; the first one producing a
/// non-empty result decides the outcome. `TitlePlaceholder` always produces
/// a result, so a list ending with it never comes up empty.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionStrategy {
    /// The app redirected to its login page
    LoginRedirect,
    /// The conventional `flashes` message region
    FlashRegion,
    /// `h2` headings
    Headings,
    /// `p` paragraphs
    Paragraphs,
    /// Synthesized from the page title
    TitlePlaceholder,
}

pub const LOGIN_REDIRECT_MESSAGE: &str = "Registration successful - redirected to login";
pub const FLASH_CLASS: &str = "flashes";

impl ExtractionStrategy {
    /// The documented lookup order
    pub const DEFAULT_ORDER: [ExtractionStrategy; 5] = [
        ExtractionStrategy::LoginRedirect,
        ExtractionStrategy::FlashRegion,
        ExtractionStrategy::Headings,
        ExtractionStrategy::Paragraphs,
        ExtractionStrategy::TitlePlaceholder,
    ];

    /// Run this strategy against `page`.
    ///
    /// `Ok(None)` means "nothing here, try the next one".
    pub async fn extract(
        &self,
        page: &dyn RenderedPage,
        wait: Duration,
    ) -> HarnessResult<Option<Vec<String>>> {
        match self {
            Self::LoginRedirect => {
                let url = page.current_url().await?;
                let title = page.title().await?;
                if url.contains("/login") || title.to_lowercase().contains("sign in") {
                    Ok(Some(vec![LOGIN_REDIRECT_MESSAGE.to_string()]))
                } else {
                    Ok(None)
                }
            }
            Self::FlashRegion => non_empty(page.wait_for_class_texts(FLASH_CLASS, wait).await?),
            Self::Headings => non_empty(page.tag_texts("h2").await?),
            Self::Paragraphs => non_empty(page.tag_texts("p").await?),
            Self::TitlePlaceholder => {
                let title = page.title().await.unwrap_or_default();
                Ok(Some(vec![format!("Registered - {}", title)]))
            }
        }
    }
}

fn non_empty(texts: Vec<String>) -> HarnessResult<Option<Vec<String>>> {
    Ok(if texts.is_empty() { None } else { Some(texts) })
}
