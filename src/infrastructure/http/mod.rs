//! HTTP helpers for driving MiniTwit through its HTML endpoints.
//!
//! Each helper knows one endpoint path and its form field names. Redirects
//! are followed, so callers always see the page a browser would land on.

pub mod page;

use reqwest::redirect::Policy;
use std::sync::Arc;
use std::time::Duration;

use crate::domain::phrases::Phrasebook;
use crate::domain::user::{Credentials, RegistrationForm};
use crate::error::HarnessResult;

pub use page::PageResponse;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_REDIRECTS: usize = 10;

#[derive(Clone)]
pub struct MiniTwitClient {
    base_url: String,
    phrasebook: Arc<Phrasebook>,
    anonymous: reqwest::Client,
}

impl MiniTwitClient {
    pub fn new(base_url: &str, phrasebook: Phrasebook) -> HarnessResult<Self> {
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            phrasebook: Arc::new(phrasebook),
            anonymous: build_client(false)?,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn phrasebook(&self) -> &Phrasebook {
        &self.phrasebook
    }

    /// Register a user; the cookie jar lives only for this call and its redirects
    pub async fn register(&self, form: &RegistrationForm) -> HarnessResult<PageResponse> {
        tracing::debug!(username = %form.username, "Registering user");

        let client = build_client(true)?;
        let response = client
            .post(self.url("/register"))
            .form(form)
            .send()
            .await?;

        PageResponse::from_response(response).await
    }

    /// Log in with a fresh session; the session keeps the authentication cookie
    pub async fn login(&self, credentials: &Credentials) -> HarnessResult<(PageResponse, Session)> {
        tracing::debug!(username = %credentials.username, "Logging in");

        let session = Session {
            client: build_client(true)?,
            base_url: self.base_url.clone(),
            phrasebook: self.phrasebook.clone(),
            username: credentials.username.clone(),
        };

        let response = session
            .client
            .post(session.url("/login"))
            .form(credentials)
            .send()
            .await?;
        let page = PageResponse::from_response(response).await?;

        Ok((page, session))
    }

    /// Registers and logs in in one go
    pub async fn register_and_login(
        &self,
        username: &str,
        password: &str,
    ) -> HarnessResult<(PageResponse, Session)> {
        let form = RegistrationForm::new(username, password);
        self.register(&form).await?;
        self.login(&Credentials::from(&form)).await
    }

    /// Public timeline as an anonymous visitor
    pub async fn public_timeline(&self) -> HarnessResult<PageResponse> {
        let response = self.anonymous.get(self.url("/public")).send().await?;
        PageResponse::from_response(response).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// An HTTP session carrying MiniTwit's authentication cookie
#[derive(Clone)]
pub struct Session {
    client: reqwest::Client,
    base_url: String,
    phrasebook: Arc<Phrasebook>,
    username: String,
}

impl Session {
    pub fn username(&self) -> &str {
        &self.username
    }

    pub async fn logout(&self) -> HarnessResult<PageResponse> {
        tracing::debug!(username = %self.username, "Logging out");
        self.get("/logout").await
    }

    /// Records a message; non-empty text must be confirmed by the application
    pub async fn add_message(&self, text: &str) -> HarnessResult<PageResponse> {
        let page = self.post_message(text).await?;
        if !text.is_empty() {
            page.expect_any(&self.phrasebook.message_recorded, "message recorded confirmation")?;
        }
        Ok(page)
    }

    /// Posts a message without checking the confirmation
    pub async fn post_message(&self, text: &str) -> HarnessResult<PageResponse> {
        tracing::debug!(username = %self.username, length = text.len(), "Posting message");

        let response = self
            .client
            .post(self.url("/add_message"))
            .form(&[("text", text)])
            .send()
            .await?;

        PageResponse::from_response(response).await
    }

    pub async fn follow(&self, username: &str) -> HarnessResult<PageResponse> {
        tracing::debug!(follower = %self.username, followed = %username, "Following user");
        self.get(&format!("/{}/follow", urlencoding::encode(username)))
            .await
    }

    pub async fn unfollow(&self, username: &str) -> HarnessResult<PageResponse> {
        tracing::debug!(follower = %self.username, followed = %username, "Unfollowing user");
        self.get(&format!("/{}/unfollow", urlencoding::encode(username)))
            .await
    }

    /// The logged-in user's own timeline (`/`)
    pub async fn timeline(&self) -> HarnessResult<PageResponse> {
        self.get("/").await
    }

    pub async fn public_timeline(&self) -> HarnessResult<PageResponse> {
        self.get("/public").await
    }

    /// A user's profile page (`/<username>`)
    pub async fn user_timeline(&self, username: &str) -> HarnessResult<PageResponse> {
        self.get(&format!("/{}", urlencoding::encode(username))).await
    }

    pub async fn get(&self, path: &str) -> HarnessResult<PageResponse> {
        let response = self.client.get(self.url(path)).send().await?;
        PageResponse::from_response(response).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

fn build_client(cookies: bool) -> HarnessResult<reqwest::Client> {
    let client = reqwest::Client::builder()
        .cookie_store(cookies)
        .redirect(Policy::limited(MAX_REDIRECTS))
        .timeout(REQUEST_TIMEOUT)
        .build()?;

    Ok(client)
}
