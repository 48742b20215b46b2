//! Acceptable wordings of the application's status messages.
//!
//! MiniTwit deployments differ in the exact copy they render ("User already
//! exists" vs "The username is already taken"), so every check matches against
//! a set of phrasings instead of a single literal. The built-in sets cover the
//! wordings seen in the wild; a JSON file can replace any of them.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::HarnessResult;

/// A set of acceptable phrasings for one outcome.
///
/// `exact` entries must appear verbatim; `folded` entries are compared
/// against the lowercased page text and must themselves be lowercase.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PhraseSet {
    #[serde(default)]
    pub exact: Vec<String>,
    #[serde(default)]
    pub folded: Vec<String>,
}

impl PhraseSet {
    pub fn new(exact: &[&str], folded: &[&str]) -> Self {
        Self {
            exact: exact.iter().map(|s| s.to_string()).collect(),
            folded: folded.iter().map(|s| s.to_lowercase()).collect(),
        }
    }

    /// True when any phrasing occurs in `text`
    pub fn matches(&self, text: &str) -> bool {
        self.first_match(text).is_some()
    }

    /// The first phrasing found in `text`, if any
    pub fn first_match(&self, text: &str) -> Option<&str> {
        if let Some(hit) = self.exact.iter().find(|p| text.contains(p.as_str())) {
            return Some(hit);
        }
        let lowered = text.to_lowercase();
        self.folded
            .iter()
            .find(|p| lowered.contains(p.as_str()))
            .map(String::as_str)
    }

    /// Every phrasing, for error messages
    pub fn describe(&self) -> String {
        self.exact
            .iter()
            .map(|p| format!("'{}'", p))
            .chain(self.folded.iter().map(|p| format!("'{}' (any case)", p)))
            .collect::<Vec<_>>()
            .join(" or ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Phrasebook {
    pub registered: PhraseSet,
    pub username_taken: PhraseSet,
    pub username_missing: PhraseSet,
    pub password_missing: PhraseSet,
    pub passwords_mismatch: PhraseSet,
    pub email_invalid: PhraseSet,
    pub logged_in: PhraseSet,
    pub logged_out: PhraseSet,
    pub not_logged_in: PhraseSet,
    pub wrong_password: PhraseSet,
    pub unknown_user: PhraseSet,
    pub message_recorded: PhraseSet,
    pub now_following: PhraseSet,
    pub unfollowed: PhraseSet,
}

impl Default for Phrasebook {
    fn default() -> Self {
        Self {
            registered: PhraseSet::new(&["You were successfully registered", "Sign In"], &[]),
            username_taken: PhraseSet::new(
                &["The username is already taken", "User already exists"],
                &["username is taken"],
            ),
            username_missing: PhraseSet::new(
                &["You have to enter a username", "You must fill out all fields"],
                &["username is required"],
            ),
            password_missing: PhraseSet::new(
                &["You have to enter a password", "You must fill out all fields"],
                &["password is required"],
            ),
            passwords_mismatch: PhraseSet::new(
                &["The two passwords do not match", "Passwords do not match"],
                &["passwords do not match"],
            ),
            email_invalid: PhraseSet::new(
                &["You have to enter a valid email address", "Invalid email"],
                &["valid email"],
            ),
            logged_in: PhraseSet::new(&["You were logged in"], &["logged in"]),
            logged_out: PhraseSet::new(
                &["You were logged out", "You have been logged out"],
                &["logged out"],
            ),
            not_logged_in: PhraseSet::new(
                &["You are not logged in", "You must be logged in"],
                &["not logged in", "sign in"],
            ),
            wrong_password: PhraseSet::new(&["Invalid password"], &["wrong password"]),
            unknown_user: PhraseSet::new(
                &["Invalid username", "Error getting user from db"],
                &["wrong username", "no user"],
            ),
            message_recorded: PhraseSet::new(&["Your message was recorded"], &[]),
            now_following: PhraseSet::new(&["You are now following"], &[]),
            unfollowed: PhraseSet::new(&["You are no longer following"], &["unfollowed"]),
        }
    }
}

impl Phrasebook {
    /// Load a phrasebook from JSON; sections missing from the file keep their defaults
    pub fn from_file(path: impl AsRef<Path>) -> HarnessResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> HarnessResult<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Follow confirmation, including the username-specific wording
    pub fn following(&self, username: &str) -> PhraseSet {
        let mut set = self.now_following.clone();
        set.folded.push(format!("following {}", username.to_lowercase()));
        set
    }

    /// Unfollow confirmation, including the username-specific wording
    pub fn unfollowing(&self, username: &str) -> PhraseSet {
        let mut set = self.unfollowed.clone();
        set.exact.push(format!("You have unfollowed {}", username));
        set
    }
}
