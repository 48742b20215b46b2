//! HTTP-level functional scenarios.
//!
//! Each scenario does its own setup through the public endpoints and fails
//! with [`HarnessError::Assertion`] carrying the page that disappointed it.

use super::{ScenarioUsers, DEFAULT_PASSWORD};
use crate::domain::phrases::{PhraseSet, Phrasebook};
use crate::domain::user::{Credentials, RegistrationForm};
use crate::error::{HarnessError, HarnessResult};
use crate::infrastructure::http::{MiniTwitClient, PageResponse};

const STALE_SESSION_PROBE: &str = "posted after logout";

/// Successful registration and each way registration must be refused
pub async fn registration(client: &MiniTwitClient, users: &ScenarioUsers) -> HarnessResult<()> {
    let phrases = client.phrasebook();

    let page = client
        .register(&RegistrationForm::new(&users.user1, DEFAULT_PASSWORD))
        .await?;
    page.expect_any(&phrases.registered, "registration confirmation")?;

    let page = client
        .register(&RegistrationForm::new(&users.user1, DEFAULT_PASSWORD))
        .await?;
    page.expect_any(&phrases.username_taken, "duplicate username rejection")?;
    expect_refused(&page, phrases, "duplicate registration")?;

    let page = client
        .register(&RegistrationForm::new("", DEFAULT_PASSWORD))
        .await?;
    page.expect_any(&phrases.username_missing, "missing username rejection")?;
    expect_refused(&page, phrases, "registration without username")?;

    let page = client.register(&RegistrationForm::new(&users.meh, "")).await?;
    page.expect_any(&phrases.password_missing, "missing password rejection")?;
    expect_refused(&page, phrases, "registration without password")?;

    let page = client
        .register(&RegistrationForm::new(&users.meh, "x").with_password2("y"))
        .await?;
    page.expect_any(&phrases.passwords_mismatch, "password mismatch rejection")?;
    expect_refused(&page, phrases, "registration with mismatched passwords")?;

    let page = client
        .register(&RegistrationForm::new(&users.meh, "foo").with_email("broken"))
        .await?;
    page.expect_any(&phrases.email_invalid, "invalid email rejection")?;
    expect_refused(&page, phrases, "registration with invalid email")?;

    Ok(())
}

/// Login, logout, stale session, wrong password and unknown user
pub async fn login_logout(client: &MiniTwitClient, users: &ScenarioUsers) -> HarnessResult<()> {
    let phrases = client.phrasebook();

    let (page, session) = client
        .register_and_login(&users.user2, DEFAULT_PASSWORD)
        .await?;
    page.expect_any(&phrases.logged_in, "login confirmation")?;

    let page = session.logout().await?;
    page.expect_any(&phrases.logged_out, "logout confirmation")?;

    let page = session.post_message(STALE_SESSION_PROBE).await?;
    expect_stale_session_rejected(&page, phrases)?;

    let (page, _) = client
        .login(&Credentials::new(&users.user2, "wrongpassword"))
        .await?;
    page.expect_any(&phrases.wrong_password, "wrong password rejection")?;

    let (page, _) = client
        .login(&Credentials::new(&users.nonexistent, "wrongpassword"))
        .await?;
    page.expect_any(&phrases.unknown_user, "unknown user rejection")?;

    Ok(())
}

/// Posted messages reach the public timeline, markup escaped or verbatim
pub async fn message_recording(
    client: &MiniTwitClient,
    users: &ScenarioUsers,
) -> HarnessResult<()> {
    let (_, session) = client.register_and_login(&users.foo, DEFAULT_PASSWORD).await?;
    session.add_message("test message 1").await?;
    session.add_message("<test message 2>").await?;

    let page = client.public_timeline().await?;
    page.expect_contains("test message 1", "public timeline")?;
    expect_markup_safe(&page, "<test message 2>")?;

    Ok(())
}

/// Follow and unfollow change what the follower's timeline shows
pub async fn timelines(client: &MiniTwitClient, users: &ScenarioUsers) -> HarnessResult<()> {
    let phrases = client.phrasebook();
    let foo = users.timeline_foo.as_str();
    let bar = users.timeline_bar.as_str();
    let foo_message = format!("the message by {}", foo);
    let bar_message = format!("the message by {}", bar);

    let (_, foo_session) = client.register_and_login(foo, DEFAULT_PASSWORD).await?;
    foo_session.add_message(&foo_message).await?;
    foo_session.logout().await?;

    let (_, bar_session) = client.register_and_login(bar, DEFAULT_PASSWORD).await?;
    bar_session.add_message(&bar_message).await?;

    let page = bar_session.public_timeline().await?;
    page.expect_contains(&foo_message, "public timeline")?;
    page.expect_contains(&bar_message, "public timeline")?;

    let page = bar_session.timeline().await?;
    page.expect_absent(&foo_message, "timeline before following")?;
    page.expect_contains(&bar_message, "timeline before following")?;

    let page = bar_session.follow(foo).await?;
    page.expect_any(&phrases.following(foo), "follow confirmation")?;

    let page = bar_session.timeline().await?;
    page.expect_contains(&foo_message, "timeline after following")?;
    page.expect_contains(&bar_message, "timeline after following")?;

    let page = bar_session.user_timeline(bar).await?;
    page.expect_absent(&foo_message, "follower's profile page")?;
    page.expect_contains(&bar_message, "follower's profile page")?;

    let page = bar_session.user_timeline(foo).await?;
    page.expect_contains(&foo_message, "followed user's profile page")?;
    page.expect_absent(&bar_message, "followed user's profile page")?;

    let page = bar_session.unfollow(foo).await?;
    page.expect_any(&phrases.unfollowing(foo), "unfollow confirmation")?;

    let page = bar_session.timeline().await?;
    page.expect_absent(&foo_message, "timeline after unfollowing")?;
    page.expect_contains(&bar_message, "timeline after unfollowing")?;

    Ok(())
}

/// A refused registration must not also flash the success message
fn expect_refused(page: &PageResponse, phrases: &Phrasebook, what: &str) -> HarnessResult<()> {
    expect_no_flash(page, &phrases.registered, what)
}

fn expect_no_flash(page: &PageResponse, phrases: &PhraseSet, what: &str) -> HarnessResult<()> {
    match page.flash_messages().iter().find(|m| phrases.matches(m)) {
        Some(flash) => Err(HarnessError::Assertion(format!(
            "{} unexpectedly reported '{}' [{}]",
            what, flash, page.url
        ))),
        None => Ok(()),
    }
}

/// The request must have been refused or bounced to login, and nothing recorded
pub fn expect_stale_session_rejected(
    page: &PageResponse,
    phrases: &Phrasebook,
) -> HarnessResult<()> {
    if page.mentions_any(&phrases.message_recorded) {
        return Err(HarnessError::Assertion(format!(
            "stale session was still able to post a message [{} {}]",
            page.status.as_u16(),
            page.url
        )));
    }

    let rejected = page.status.is_client_error()
        || page.path().starts_with("/login")
        || page.mentions_any(&phrases.not_logged_in);

    if rejected {
        Ok(())
    } else {
        Err(HarnessError::Assertion(format!(
            "stale session was neither rejected nor redirected to login [{} {}] page: {}",
            page.status.as_u16(),
            page.url,
            page.excerpt()
        )))
    }
}

/// `text` must appear HTML-escaped or verbatim
pub fn expect_markup_safe(page: &PageResponse, text: &str) -> HarnessResult<()> {
    let escaped = text.replace('<', "&lt;").replace('>', "&gt;");
    if page.contains(&escaped) || page.contains(text) {
        Ok(())
    } else {
        Err(HarnessError::Assertion(format!(
            "expected '{}' or '{}' on {} page: {}",
            escaped,
            text,
            page.url,
            page.excerpt()
        )))
    }
}
