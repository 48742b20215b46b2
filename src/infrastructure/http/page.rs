use once_cell::sync::Lazy;
use reqwest::StatusCode;
use scraper::{ElementRef, Html, Selector};

use crate::domain::phrases::PhraseSet;
use crate::error::{HarnessError, HarnessResult};

static TITLE: Lazy<Selector> = Lazy::new(|| selector("title"));
static FLASH_REGION: Lazy<Selector> = Lazy::new(|| selector(".flashes"));
static FLASH_ITEM: Lazy<Selector> = Lazy::new(|| selector(".flashes li"));

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("valid css selector")
}

const EXCERPT_LEN: usize = 300;

/// Final response of a request, after redirects
#[derive(Debug, Clone)]
pub struct PageResponse {
    pub status: StatusCode,
    pub url: reqwest::Url,
    pub body: String,
}

impl PageResponse {
    pub(crate) async fn from_response(response: reqwest::Response) -> HarnessResult<Self> {
        let status = response.status();
        let url = response.url().clone();
        let body = response.text().await?;

        tracing::debug!(status = %status, url = %url, bytes = body.len(), "Response received");

        Ok(Self { status, url, body })
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.body.contains(needle)
    }

    pub fn mentions_any(&self, phrases: &PhraseSet) -> bool {
        phrases.matches(&self.body)
    }

    /// Path of the final URL, e.g. `/login` after a redirect
    pub fn path(&self) -> &str {
        self.url.path()
    }

    pub fn title(&self) -> Option<String> {
        let document = Html::parse_document(&self.body);
        let title = document.select(&TITLE).next().map(element_text)?;
        Some(title).filter(|t| !t.is_empty())
    }

    /// Texts inside the conventional `flashes` region.
    ///
    /// Parsed as HTML, so unquoted `class=flashes` and unclosed `<li>` items
    /// read the same as their well-formed counterparts.
    pub fn flash_messages(&self) -> Vec<String> {
        let document = Html::parse_document(&self.body);
        let mut items: Vec<String> = document.select(&FLASH_ITEM).map(element_text).collect();
        if items.is_empty() {
            items = document.select(&FLASH_REGION).map(element_text).collect();
        }
        items.retain(|text| !text.is_empty());
        items
    }

    /// Whitespace-collapsed start of the body for failure messages
    pub fn excerpt(&self) -> String {
        let collapsed = self.body.split_whitespace().collect::<Vec<_>>().join(" ");
        match collapsed.char_indices().nth(EXCERPT_LEN) {
            Some((idx, _)) => format!("{}...", &collapsed[..idx]),
            None => collapsed,
        }
    }

    /// Fail unless one of `phrases` appears on the page
    pub fn expect_any(&self, phrases: &PhraseSet, what: &str) -> HarnessResult<&Self> {
        if self.mentions_any(phrases) {
            Ok(self)
        } else {
            Err(self.failure(&format!("expected {} ({})", what, phrases.describe())))
        }
    }

    pub fn expect_contains(&self, needle: &str, what: &str) -> HarnessResult<&Self> {
        if self.contains(needle) {
            Ok(self)
        } else {
            Err(self.failure(&format!("expected {} to contain '{}'", what, needle)))
        }
    }

    pub fn expect_absent(&self, needle: &str, what: &str) -> HarnessResult<&Self> {
        if self.contains(needle) {
            Err(self.failure(&format!("expected {} not to contain '{}'", what, needle)))
        } else {
            Ok(self)
        }
    }

    fn failure(&self, reason: &str) -> HarnessError {
        HarnessError::Assertion(format!(
            "{} [{} {}] page: {}",
            reason,
            self.status.as_u16(),
            self.url,
            self.excerpt()
        ))
    }
}

/// Text content of `element` with whitespace collapsed
fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}
