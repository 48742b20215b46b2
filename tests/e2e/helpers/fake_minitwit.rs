//! In-process MiniTwit stand-in served by axum.
//!
//! Two dialects are modelled: the Go port (plain-text 400 errors, flashes
//! carried in the session cookie) and the original Flask app (errors rendered
//! on the form page). Faults switch off one behavior at a time so the
//! scenarios can be shown to catch it.

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Router,
};
use parking_lot::Mutex;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

const SESSION_COOKIE: &str = "minitwit-session";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Go,
    Flask,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fault {
    /// Registering an existing username succeeds again
    DuplicateRegistration,
    /// Logging out leaves the session authenticated
    LogoutKeepsSession,
    /// Own timeline shows every message, followed or not
    TimelineIgnoresFollows,
    /// Messages are rendered without HTML escaping
    UnescapedMessages,
    /// Registration without a username succeeds
    AcceptEmptyUsername,
    /// Registration with differing passwords succeeds
    AcceptMismatchedPasswords,
    /// Registration with a malformed email succeeds
    AcceptInvalidEmail,
}

#[derive(Clone)]
pub struct FakeMiniTwit {
    dialect: Dialect,
    faults: Arc<HashSet<Fault>>,
    store: Arc<Mutex<Store>>,
}

#[derive(Default)]
struct Store {
    users: Vec<FakeUser>,
    messages: Vec<(i64, String)>,
    follows: HashSet<(i64, i64)>,
    sessions: HashMap<String, SessionState>,
}

struct FakeUser {
    id: i64,
    username: String,
    password: String,
}

#[derive(Default)]
struct SessionState {
    user_id: Option<i64>,
    flashes: Vec<String>,
}

#[derive(Deserialize)]
struct RegisterForm {
    #[serde(default)]
    username: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
    #[serde(default)]
    password2: String,
}

#[derive(Deserialize)]
struct LoginForm {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

#[derive(Deserialize)]
struct MessageForm {
    #[serde(default)]
    text: String,
}

impl FakeMiniTwit {
    pub fn new(dialect: Dialect) -> Self {
        Self::with_faults(dialect, &[])
    }

    pub fn with_faults(dialect: Dialect, faults: &[Fault]) -> Self {
        Self {
            dialect,
            faults: Arc::new(faults.iter().copied().collect()),
            store: Arc::new(Mutex::new(Store::default())),
        }
    }

    /// Bind an ephemeral port, serve in the background and return the base URL
    pub async fn spawn(self) -> anyhow::Result<String> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let app = self.router();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Ok(format!("http://{}", addr))
    }

    pub fn router(self) -> Router {
        Router::new()
            .route("/", get(timeline))
            .route("/public", get(public_timeline))
            .route("/register", get(register_page).post(register))
            .route("/login", get(login_page).post(login))
            .route("/logout", get(logout))
            .route("/add_message", post(add_message))
            .route("/:username", get(user_timeline))
            .route("/:username/follow", get(follow))
            .route("/:username/unfollow", get(unfollow))
            .layer(TraceLayer::new_for_http())
            .with_state(self)
    }

    pub fn user_count(&self) -> usize {
        self.store.lock().users.len()
    }

    pub fn is_following(&self, who: &str, whom: &str) -> bool {
        let store = self.store.lock();
        match (store.user_id(who), store.user_id(whom)) {
            (Some(a), Some(b)) => store.follows.contains(&(a, b)),
            _ => false,
        }
    }

    fn has(&self, fault: Fault) -> bool {
        self.faults.contains(&fault)
    }

    fn phrase(&self, go: &'static str, flask: &'static str) -> &'static str {
        match self.dialect {
            Dialect::Go => go,
            Dialect::Flask => flask,
        }
    }

    fn validate(&self, store: &Store, form: &RegisterForm) -> Result<(), &'static str> {
        let username_missing =
            form.username.is_empty() && !self.has(Fault::AcceptEmptyUsername);
        let passwords_differ =
            form.password != form.password2 && !self.has(Fault::AcceptMismatchedPasswords);
        let email_checked = !self.has(Fault::AcceptInvalidEmail);

        match self.dialect {
            Dialect::Go => {
                if username_missing || form.email.is_empty() || form.password.is_empty() {
                    return Err("You must fill out all fields");
                }
                if passwords_differ {
                    return Err("Passwords do not match");
                }
                if email_checked && !go_email_is_valid(&form.email) {
                    return Err("You have to enter a valid email address");
                }
            }
            Dialect::Flask => {
                if username_missing {
                    return Err("You have to enter a username");
                }
                if email_checked && !form.email.contains('@') {
                    return Err("You have to enter a valid email address");
                }
                if form.password.is_empty() {
                    return Err("You have to enter a password");
                }
                if passwords_differ {
                    return Err("The two passwords do not match");
                }
            }
        }

        if store.user_id(&form.username).is_some() && !self.has(Fault::DuplicateRegistration) {
            return Err(self.phrase("User already exists", "The username is already taken"));
        }
        Ok(())
    }

    /// Plain-text 400 for Go, error box on the form page for Flask
    fn reject(&self, title: &str, form: &str, error: &str) -> Response {
        match self.dialect {
            Dialect::Go => (StatusCode::BAD_REQUEST, format!("{}\n", error)).into_response(),
            Dialect::Flask => {
                let body = format!(
                    "<div class=\"error\"><strong>Error:</strong> {}</div>{}",
                    escape(error),
                    form
                );
                Html(layout(title, &[], &body)).into_response()
            }
        }
    }

    fn render_messages(&self, messages: &[(String, String)]) -> String {
        let items: String = messages
            .iter()
            .map(|(author, text)| {
                let text = if self.has(Fault::UnescapedMessages) {
                    text.clone()
                } else {
                    escape(text)
                };
                format!(
                    "<li><strong><a href=\"/{0}\">{0}</a></strong> {1}</li>",
                    escape(author),
                    text
                )
            })
            .collect();
        format!("<ul class=\"messages\">{}</ul>", items)
    }
}

impl Store {
    fn user_id(&self, username: &str) -> Option<i64> {
        self.users
            .iter()
            .find(|u| u.username == username)
            .map(|u| u.id)
    }

    fn username(&self, id: i64) -> String {
        self.users
            .iter()
            .find(|u| u.id == id)
            .map(|u| u.username.clone())
            .unwrap_or_default()
    }

    fn session(&mut self, sid: &str) -> &mut SessionState {
        self.sessions.entry(sid.to_string()).or_default()
    }

    fn current_user(&mut self, sid: &str) -> Option<i64> {
        self.session(sid).user_id
    }

    fn flash(&mut self, sid: &str, message: String) {
        self.session(sid).flashes.push(message);
    }

    fn take_flashes(&mut self, sid: &str) -> Vec<String> {
        std::mem::take(&mut self.session(sid).flashes)
    }

    fn messages_where(&self, keep: impl Fn(i64) -> bool) -> Vec<(String, String)> {
        self.messages
            .iter()
            .rev()
            .filter(|(author, _)| keep(*author))
            .map(|(author, text)| (self.username(*author), text.clone()))
            .collect()
    }
}

/// Session id from the request cookie, or a fresh one
fn session_id(headers: &HeaderMap) -> String {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
        .unwrap_or_else(|| Uuid::new_v4().simple().to_string())
}

fn with_session(sid: &str, response: impl IntoResponse) -> Response {
    (
        [(
            header::SET_COOKIE,
            format!("{}={}; Path=/; HttpOnly", SESSION_COOKIE, sid),
        )],
        response,
    )
        .into_response()
}

fn go_email_is_valid(email: &str) -> bool {
    let Some(at) = email.find('@') else {
        return false;
    };
    match email.rfind('.') {
        Some(dot) => at >= 1 && dot > at && dot < email.len() - 1,
        None => false,
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&#34;")
        .replace('\'', "&#39;")
}

fn layout(title: &str, flashes: &[String], body: &str) -> String {
    let flashes = if flashes.is_empty() {
        String::new()
    } else {
        let items: String = flashes
            .iter()
            .map(|f| format!("\n  <li>{}", escape(f)))
            .collect();
        format!("<ul class=flashes>{}\n</ul>", items)
    };

    format!(
        "<!doctype html><html><head><title>{title}</title></head>\
         <body><h1>MiniTwit</h1>{flashes}<div class=\"body\">{body}</div></body></html>",
    )
}

const REGISTER_FORM: &str = "<h2>Sign Up</h2><form action=\"/register\" method=\"post\">\
    <input type=\"text\" name=\"username\">\
    <input type=\"text\" name=\"email\">\
    <input type=\"password\" name=\"password\">\
    <input type=\"password\" name=\"password2\">\
    <input type=\"submit\" value=\"Sign Up\"></form>";

const LOGIN_FORM: &str = "<h2>Sign In</h2><form action=\"/login\" method=\"post\">\
    <input type=\"text\" name=\"username\">\
    <input type=\"password\" name=\"password\">\
    <input type=\"submit\" value=\"Sign In\"></form>";

async fn register_page(State(app): State<FakeMiniTwit>, headers: HeaderMap) -> Response {
    let sid = session_id(&headers);
    let flashes = app.store.lock().take_flashes(&sid);
    with_session(&sid, Html(layout("Sign Up | MiniTwit", &flashes, REGISTER_FORM)))
}

async fn register(
    State(app): State<FakeMiniTwit>,
    headers: HeaderMap,
    Form(form): Form<RegisterForm>,
) -> Response {
    let sid = session_id(&headers);
    let mut store = app.store.lock();

    if let Err(error) = app.validate(&store, &form) {
        return with_session(&sid, app.reject("Sign Up | MiniTwit", REGISTER_FORM, error));
    }

    let id = store.users.len() as i64 + 1;
    store.users.push(FakeUser {
        id,
        username: form.username,
        password: form.password,
    });
    store.flash(
        &sid,
        "You were successfully registered and can login now".to_string(),
    );

    with_session(&sid, Redirect::to("/login"))
}

async fn login_page(State(app): State<FakeMiniTwit>, headers: HeaderMap) -> Response {
    let sid = session_id(&headers);
    let mut store = app.store.lock();
    if store.current_user(&sid).is_some() {
        return with_session(&sid, Redirect::to("/"));
    }
    let flashes = store.take_flashes(&sid);
    with_session(&sid, Html(layout("Sign In | MiniTwit", &flashes, LOGIN_FORM)))
}

async fn login(
    State(app): State<FakeMiniTwit>,
    headers: HeaderMap,
    Form(form): Form<LoginForm>,
) -> Response {
    let sid = session_id(&headers);
    let mut store = app.store.lock();

    let Some(user) = store.users.iter().find(|u| u.username == form.username) else {
        let response = match app.dialect {
            Dialect::Go => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Error getting user from db\n").into_response()
            }
            Dialect::Flask => app.reject("Sign In | MiniTwit", LOGIN_FORM, "Invalid username"),
        };
        return with_session(&sid, response);
    };

    if user.password != form.password {
        let response = app.reject("Sign In | MiniTwit", LOGIN_FORM, "Invalid password");
        return with_session(&sid, response);
    }

    let id = user.id;
    store.session(&sid).user_id = Some(id);
    store.flash(&sid, "You were logged in".to_string());
    with_session(&sid, Redirect::to("/"))
}

async fn logout(State(app): State<FakeMiniTwit>, headers: HeaderMap) -> Response {
    let sid = session_id(&headers);
    let mut store = app.store.lock();

    if store.current_user(&sid).is_none() {
        return with_session(&sid, (StatusCode::BAD_REQUEST, "You are not logged in\n"));
    }

    if !app.has(Fault::LogoutKeepsSession) {
        store.session(&sid).user_id = None;
    }
    store.flash(
        &sid,
        app.phrase("You have been logged out", "You were logged out")
            .to_string(),
    );
    with_session(&sid, Redirect::to("/public"))
}

async fn add_message(
    State(app): State<FakeMiniTwit>,
    headers: HeaderMap,
    Form(form): Form<MessageForm>,
) -> Response {
    let sid = session_id(&headers);
    let mut store = app.store.lock();

    let Some(user_id) = store.current_user(&sid) else {
        let response = match app.dialect {
            Dialect::Go => (StatusCode::BAD_REQUEST, "You are not logged in\n").into_response(),
            Dialect::Flask => StatusCode::UNAUTHORIZED.into_response(),
        };
        return with_session(&sid, response);
    };

    if !form.text.is_empty() {
        store.messages.push((user_id, form.text));
        store.flash(&sid, "Your message was recorded".to_string());
    }
    with_session(&sid, Redirect::to("/"))
}

async fn timeline(State(app): State<FakeMiniTwit>, headers: HeaderMap) -> Response {
    let sid = session_id(&headers);
    let mut store = app.store.lock();

    let Some(user_id) = store.current_user(&sid) else {
        return with_session(&sid, Redirect::to("/public"));
    };

    let ignore_follows = app.has(Fault::TimelineIgnoresFollows);
    let follows = store.follows.clone();
    let messages = store.messages_where(|author| {
        ignore_follows || author == user_id || follows.contains(&(user_id, author))
    });
    let flashes = store.take_flashes(&sid);

    let body = format!("<h2>My Timeline</h2>{}", app.render_messages(&messages));
    with_session(&sid, Html(layout("Timeline | MiniTwit", &flashes, &body)))
}

async fn public_timeline(State(app): State<FakeMiniTwit>, headers: HeaderMap) -> Response {
    let sid = session_id(&headers);
    let mut store = app.store.lock();

    let messages = store.messages_where(|_| true);
    let flashes = store.take_flashes(&sid);

    let body = format!("<h2>Public Timeline</h2>{}", app.render_messages(&messages));
    with_session(&sid, Html(layout("Public Timeline | MiniTwit", &flashes, &body)))
}

async fn user_timeline(
    State(app): State<FakeMiniTwit>,
    headers: HeaderMap,
    Path(username): Path<String>,
) -> Response {
    let sid = session_id(&headers);
    let mut store = app.store.lock();

    let Some(profile_id) = store.user_id(&username) else {
        return with_session(&sid, (StatusCode::BAD_REQUEST, "User does not exist\n"));
    };

    let messages = store.messages_where(|author| author == profile_id);
    let flashes = store.take_flashes(&sid);

    let body = format!(
        "<h2>{}'s Timeline</h2>{}",
        escape(&username),
        app.render_messages(&messages)
    );
    with_session(&sid, Html(layout("Timeline | MiniTwit", &flashes, &body)))
}

async fn follow(
    State(app): State<FakeMiniTwit>,
    headers: HeaderMap,
    Path(username): Path<String>,
) -> Response {
    change_follow(app, headers, username, true)
}

async fn unfollow(
    State(app): State<FakeMiniTwit>,
    headers: HeaderMap,
    Path(username): Path<String>,
) -> Response {
    change_follow(app, headers, username, false)
}

fn change_follow(
    app: FakeMiniTwit,
    headers: HeaderMap,
    username: String,
    follow: bool,
) -> Response {
    let sid = session_id(&headers);
    let mut store = app.store.lock();

    let Some(user_id) = store.current_user(&sid) else {
        store.flash(&sid, "You are not logged in".to_string());
        return with_session(&sid, Redirect::to("/login"));
    };
    let Some(target) = store.user_id(&username) else {
        return with_session(&sid, (StatusCode::BAD_REQUEST, "User does not exist\n"));
    };

    let flash = if follow {
        store.follows.insert((user_id, target));
        match app.dialect {
            Dialect::Go => format!("You are now following {}", username),
            Dialect::Flask => format!("You are now following \"{}\"", username),
        }
    } else {
        store.follows.remove(&(user_id, target));
        match app.dialect {
            Dialect::Go => format!("You have unfollowed {}", username),
            Dialect::Flask => format!("You are no longer following \"{}\"", username),
        }
    };
    store.flash(&sid, flash);

    with_session(&sid, Redirect::to(&format!("/{}", username)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn go_email_rules() {
        assert!(go_email_is_valid("a@b.io"));
        assert!(!go_email_is_valid("broken"));
        assert!(!go_email_is_valid("@b.io"));
        assert!(!go_email_is_valid("a@b."));
        assert!(!go_email_is_valid("a.b@c"));
    }
}
