use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::strategy::{ExtractionStrategy, RenderedPage};
use crate::error::HarnessResult;

/// What the page said after the registration form was submitted
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegistrationOutcome {
    pub messages: Vec<String>,
    pub source: ExtractionStrategy,
    pub url: String,
    pub title: String,
}

impl RegistrationOutcome {
    /// The text the success check reads: the first message, lowercased
    pub fn headline(&self) -> String {
        self.messages
            .first()
            .map(|m| m.to_lowercase())
            .unwrap_or_default()
    }

    /// Names of the success signals present in this outcome
    pub fn success_signals(&self, register_url: &str) -> Vec<&'static str> {
        let text = self.headline();
        let title = self.title.to_lowercase();
        let mut signals = Vec::new();

        if text.contains("register") {
            signals.push("mentions_register");
        }
        if text.contains("success") {
            signals.push("mentions_success");
        }
        if text.contains("login") {
            signals.push("mentions_login");
        }
        if text.contains("sign in") || title == "sign in" {
            signals.push("sign_in_page");
        }
        if text.contains("redirected to login") {
            signals.push("redirected_to_login");
        }
        if !self.url.is_empty() && self.url.to_lowercase() != register_url.to_lowercase() {
            signals.push("left_register_page");
        }

        signals
    }

    /// At least one success signal is present
    pub fn looks_successful(&self, register_url: &str) -> bool {
        !self.success_signals(register_url).is_empty()
    }
}

/// Classify the current page by trying `strategies` in order.
///
/// A strategy that errors (a lookup timeout, a stale element) is logged and
/// skipped. If every strategy comes up empty the outcome carries a title
/// placeholder; a missing message container never fails the call.
pub async fn classify(
    page: &dyn RenderedPage,
    strategies: &[ExtractionStrategy],
    wait: Duration,
) -> HarnessResult<RegistrationOutcome> {
    let mut found = None;

    for strategy in strategies {
        match strategy.extract(page, wait).await {
            Ok(Some(messages)) => {
                tracing::debug!(strategy = ?strategy, count = messages.len(), "Outcome extracted");
                found = Some((*strategy, messages));
                break;
            }
            Ok(None) => {
                tracing::debug!(strategy = ?strategy, "Nothing found, trying next strategy");
            }
            Err(e) => {
                tracing::debug!(strategy = ?strategy, error = %e, "Strategy failed, trying next");
            }
        }
    }

    let (source, messages) = match found {
        Some(hit) => hit,
        None => {
            let placeholder = ExtractionStrategy::TitlePlaceholder;
            let messages = placeholder.extract(page, wait).await?.unwrap_or_default();
            (placeholder, messages)
        }
    };

    let url = page.current_url().await.unwrap_or_default();
    let title = page.title().await.unwrap_or_default();

    Ok(RegistrationOutcome {
        messages,
        source,
        url,
        title,
    })
}
