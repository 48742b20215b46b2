use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A user row as seen through the schema adapter.
///
/// The id is widened to `i64` so `serial` and `bigserial` keys compare equal.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq, Eq)]
pub struct UserRecord {
    pub id: i64,
    pub username: String,
    pub email: Option<String>,
}

/// The fields posted to `/register`
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RegistrationForm {
    pub username: String,
    pub password: String,
    pub password2: String,
    pub email: String,
}

impl RegistrationForm {
    /// Form with the repeated password equal to `password` and an `@example.com` email
    pub fn new(username: &str, password: &str) -> Self {
        Self {
            username: username.to_string(),
            password: password.to_string(),
            password2: password.to_string(),
            email: format!("{}@example.com", username),
        }
    }

    pub fn with_password2(mut self, password2: &str) -> Self {
        self.password2 = password2.to_string();
        self
    }

    pub fn with_email(mut self, email: &str) -> Self {
        self.email = email.to_string();
        self
    }

    /// Values in the order the registration page lays out its inputs
    pub fn browser_values(&self) -> Vec<String> {
        vec![
            self.username.clone(),
            self.email.clone(),
            self.password.clone(),
            self.password2.clone(),
        ]
    }
}

/// Username/password pair used for `/login`
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: &str, password: &str) -> Self {
        Self {
            username: username.to_string(),
            password: password.to_string(),
        }
    }
}

impl From<&RegistrationForm> for Credentials {
    fn from(form: &RegistrationForm) -> Self {
        Self::new(&form.username, &form.password)
    }
}
