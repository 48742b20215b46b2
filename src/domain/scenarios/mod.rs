pub mod browser;
pub mod functional;
pub mod report;

use crate::domain::user::RegistrationForm;
use crate::infrastructure::config::Config;
use crate::infrastructure::http::MiniTwitClient;

pub use report::{run_scenario, ScenarioReport, Suite, SuiteReport};

/// Password used by every HTTP scenario user
pub const DEFAULT_PASSWORD: &str = "default";
const GUI_PASSWORD: &str = "secure123";

/// Usernames the scenarios register.
///
/// Defaults match the names the MiniTwit course suite has always used; a
/// suffix makes repeated runs against one database independent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioUsers {
    pub user1: String,
    pub user2: String,
    pub foo: String,
    pub timeline_foo: String,
    pub timeline_bar: String,
    pub meh: String,
    pub nonexistent: String,
    pub gui: RegistrationForm,
    pub gui_db: RegistrationForm,
}

impl Default for ScenarioUsers {
    fn default() -> Self {
        Self {
            user1: "user1".to_string(),
            user2: "user2".to_string(),
            foo: "foo".to_string(),
            timeline_foo: "timeline_foo".to_string(),
            timeline_bar: "timeline_bar".to_string(),
            meh: "meh".to_string(),
            nonexistent: "user_nonexistent".to_string(),
            gui: RegistrationForm::new("TestUser", GUI_PASSWORD).with_email("test@example.com"),
            gui_db: RegistrationForm::new("TestUser2", GUI_PASSWORD)
                .with_email("test2@example.com"),
        }
    }
}

impl ScenarioUsers {
    /// Default users with `suffix` appended to every username
    pub fn suffixed(suffix: &str) -> Self {
        let base = Self::default();
        let name = |n: &str| format!("{}{}", n, suffix);
        let form = |f: &RegistrationForm| {
            RegistrationForm::new(&name(&f.username), &f.password).with_email(&f.email)
        };

        Self {
            user1: name(&base.user1),
            user2: name(&base.user2),
            foo: name(&base.foo),
            timeline_foo: name(&base.timeline_foo),
            timeline_bar: name(&base.timeline_bar),
            meh: name(&base.meh),
            nonexistent: name(&base.nonexistent),
            gui: form(&base.gui),
            gui_db: form(&base.gui_db),
        }
    }
}

/// Run the four HTTP scenarios in order
pub async fn run_http_suite(client: &MiniTwitClient, users: &ScenarioUsers) -> Vec<ScenarioReport> {
    tracing::info!(base_url = %client.base_url(), "Running HTTP scenarios");

    vec![
        run_scenario("registration", Suite::Http, functional::registration(client, users)).await,
        run_scenario("login_logout", Suite::Http, functional::login_logout(client, users)).await,
        run_scenario(
            "message_recording",
            Suite::Http,
            functional::message_recording(client, users),
        )
        .await,
        run_scenario("timelines", Suite::Http, functional::timelines(client, users)).await,
    ]
}

/// Run both browser scenarios in order
pub async fn run_browser_suite(config: &Config, users: &ScenarioUsers) -> Vec<ScenarioReport> {
    tracing::info!(webdriver = %config.webdriver_url, "Running browser scenarios");

    vec![
        run_scenario(
            "register_user_via_gui",
            Suite::Browser,
            browser::register_user_via_gui(config, users),
        )
        .await,
        run_scenario(
            "register_user_via_gui_and_check_db_entry",
            Suite::Browser,
            browser::register_user_via_gui_and_check_db_entry(config, users),
        )
        .await,
    ]
}
