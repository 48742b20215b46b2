//! Browser end-to-end scenarios: register through the rendered form and
//! cross-check the result in PostgreSQL.

use super::ScenarioUsers;
use crate::domain::registration::RegistrationOutcome;
use crate::domain::user::{RegistrationForm, UserRecord};
use crate::error::{HarnessError, HarnessResult};
use crate::infrastructure::browser::BrowserSession;
use crate::infrastructure::config::Config;
use crate::infrastructure::db::DbSession;
use crate::infrastructure::net::await_startup;
use crate::infrastructure::repositories::UserRepository;

/// Register through the UI and check what the user sees; the user is deleted afterwards
pub async fn register_user_via_gui(
    config: &Config,
    users: &ScenarioUsers,
) -> HarnessResult<RegistrationOutcome> {
    await_startup(&config.gui_host, config.gui_port, config.startup_delay).await;

    let browser = BrowserSession::open(config).await?;
    let result = register_and_check(&browser, config, &users.gui).await;
    let outcome = browser.finish(result).await?;

    let mut db = DbSession::from_config(config).await?;
    UserRepository::new(&mut db)
        .delete_by_username(&users.gui.username)
        .await;
    db.close().await?;

    Ok(outcome)
}

/// Register through the UI, then find the new row in the database.
///
/// Any leftover row from an earlier run is removed first and the new row is
/// removed at the end. The connection is closed whether or not a check failed.
pub async fn register_user_via_gui_and_check_db_entry(
    config: &Config,
    users: &ScenarioUsers,
) -> HarnessResult<UserRecord> {
    await_startup(&config.gui_host, config.gui_port, config.startup_delay).await;

    let mut db = DbSession::from_config(config).await?;
    let result = registration_persists(&mut db, config, &users.gui_db).await;

    if let Err(e) = db.close().await {
        tracing::warn!(error = %e, "Failed to close database connection");
    }
    result
}

async fn registration_persists(
    db: &mut DbSession,
    config: &Config,
    form: &RegistrationForm,
) -> HarnessResult<UserRecord> {
    let mut repository = UserRepository::new(db);

    if repository.exists(&form.username).await {
        tracing::info!(username = %form.username, "Removing leftover user before registering");
        repository.delete_by_username(&form.username).await;
    }

    let browser = BrowserSession::open(config).await?;
    let result = register_and_check(&browser, config, form).await;
    browser.finish(result).await?;

    let user = repository
        .find_by_username(&form.username)
        .await
        .ok_or_else(|| {
            HarnessError::Assertion(format!(
                "User '{}' was not found in the database after registration",
                form.username
            ))
        })?;
    tracing::info!(id = user.id, username = %user.username, "User created in database");

    repository.delete_by_username(&form.username).await;

    Ok(user)
}

async fn register_and_check(
    browser: &BrowserSession,
    config: &Config,
    form: &RegistrationForm,
) -> HarnessResult<RegistrationOutcome> {
    let outcome = browser.register_via_form(&form.browser_values()).await?;
    expect_registration_success(&outcome, &config.register_url())?;
    Ok(outcome)
}

/// Fail unless the outcome carries at least one success signal
pub fn expect_registration_success(
    outcome: &RegistrationOutcome,
    register_url: &str,
) -> HarnessResult<()> {
    let signals = outcome.success_signals(register_url);
    if signals.is_empty() {
        return Err(HarnessError::Assertion(format!(
            "Registration was not successful. Got message: {}",
            outcome.headline()
        )));
    }

    tracing::debug!(?signals, "Registration looks successful");
    Ok(())
}
