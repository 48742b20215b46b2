use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::domain::phrases::Phrasebook;
use crate::error::{HarnessError, HarnessResult};

#[derive(Debug, Clone)]
pub struct Config {
    pub gui_host: String,
    pub gui_port: u16,
    pub db_host: String,
    pub db_port: u16,
    pub db_user: String,
    pub db_password: String,
    pub db_name: String,
    pub startup_delay: Duration,
    pub log_format: LogFormat,
    // Browser
    pub webdriver_url: String,
    pub browser: BrowserKind,
    pub browser_args: Vec<String>,
    pub screenshot_dir: PathBuf,
    pub diagnostics: Diagnostics,
    pub element_timeout: Duration,
    // Expected wording of the application under test
    pub phrasebook: Phrasebook,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum BrowserKind {
    #[default]
    Firefox,
    Chrome,
}

/// How loudly the browser flow narrates its steps
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum Diagnostics {
    #[default]
    Terse,
    Verbose,
}

impl LogFormat {
    /// Case-insensitive; anything but `json` is pretty
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Pretty,
        }
    }
}

impl BrowserKind {
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "chrome" | "chromium" => Self::Chrome,
            _ => Self::Firefox,
        }
    }
}

impl Diagnostics {
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "verbose" => Self::Verbose,
            _ => Self::Terse,
        }
    }
}

impl Config {
    pub fn from_env() -> HarnessResult<Self> {
        dotenvy::dotenv().ok();

        let phrasebook = match env::var("PHRASEBOOK_PATH") {
            Ok(path) => Phrasebook::from_file(&path)?,
            Err(_) => Phrasebook::default(),
        };

        let config = Config {
            gui_host: env::var("GUI_HOST").unwrap_or_else(|_| "minitwit".to_string()),
            gui_port: parse_var("GUI_PORT", "8080")?,
            db_host: env::var("DB_HOST").unwrap_or_else(|_| "postgres".to_string()),
            db_port: parse_var("DB_PORT", "5432")?,
            db_user: env::var("DB_USER").unwrap_or_else(|_| "myuser".to_string()),
            db_password: env::var("DB_PASSWORD").unwrap_or_else(|_| "mypassword".to_string()),
            db_name: env::var("DB_NAME").unwrap_or_else(|_| "postgres".to_string()),
            startup_delay: Duration::from_secs(parse_var("STARTUP_DELAY", "5")?),
            log_format: env::var("LOG_FORMAT")
                .map(|s| LogFormat::from_name(&s))
                .unwrap_or_default(),
            webdriver_url: env::var("WEBDRIVER_URL")
                .unwrap_or_else(|_| "http://localhost:4444".to_string()),
            browser: env::var("BROWSER")
                .map(|s| BrowserKind::from_name(&s))
                .unwrap_or_default(),
            browser_args: default_browser_args(),
            screenshot_dir: env::var("SCREENSHOT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| env::temp_dir()),
            diagnostics: env::var("DIAGNOSTICS")
                .map(|s| Diagnostics::from_name(&s))
                .unwrap_or_default(),
            element_timeout: Duration::from_secs(10),
            phrasebook,
        };

        Ok(config)
    }

    /// Configuration pointing at an application on the given base address, with defaults elsewhere
    pub fn for_gui(host: &str, port: u16) -> Self {
        Self {
            gui_host: host.to_string(),
            gui_port: port,
            db_host: "postgres".to_string(),
            db_port: 5432,
            db_user: "myuser".to_string(),
            db_password: "mypassword".to_string(),
            db_name: "postgres".to_string(),
            startup_delay: Duration::from_secs(5),
            log_format: LogFormat::Pretty,
            webdriver_url: "http://localhost:4444".to_string(),
            browser: BrowserKind::Firefox,
            browser_args: default_browser_args(),
            screenshot_dir: env::temp_dir(),
            diagnostics: Diagnostics::Terse,
            element_timeout: Duration::from_secs(10),
            phrasebook: Phrasebook::default(),
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.gui_host, self.gui_port)
    }

    pub fn register_url(&self) -> String {
        format!("{}/register", self.base_url())
    }

    pub fn database_url(&self) -> String {
        format!(
            "postgresql://{}:{}@{}:{}/{}",
            self.db_user, self.db_password, self.db_host, self.db_port, self.db_name
        )
    }

    pub fn is_verbose(&self) -> bool {
        self.diagnostics == Diagnostics::Verbose
    }
}

fn default_browser_args() -> Vec<String> {
    vec![
        "--no-sandbox".to_string(),
        "--disable-dev-shm-usage".to_string(),
    ]
}

fn parse_var<T: std::str::FromStr>(name: &str, default: &str) -> HarnessResult<T> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    raw.trim()
        .parse()
        .map_err(|_| HarnessError::Config(format!("{} must be a number, got '{}'", name, raw)))
}
