//! Blocking HTTP fetching with optional authentication.
//!
//! Requests go through a [`Session`] that owns its own client and cookie jar,
//! so credentials established for one fetch never leak into another. Form
//! login follows the CMS convention: the login page sets a `csrftoken`
//! cookie, and the login form wants it echoed back as
//! `csrfmiddlewaretoken`.

use crate::error::{Error, Result};
use reqwest::blocking::Client;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::Url;
use std::sync::Arc;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Cookie set by the login page; its value is replayed in the login form.
const CSRF_COOKIE: &str = "csrftoken";

/// Result of running the form-login flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginOutcome {
    Accepted,
    /// The login page set no `csrftoken` cookie. Recoverable: the caller
    /// decides whether to treat this as fatal.
    TokenMissing,
}

/// Result of a [`fetch_page`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Raw response body of the target URL.
    Page(Vec<u8>),
    /// Form login could not be attempted; no request was made to the target.
    LoginRejected { reason: String },
}

/// Optional authentication for [`fetch_page`].
///
/// With `login_url` set, the form-login flow runs first (using `username`
/// and `password`). With only `username` set, HTTP basic auth is used.
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    pub username: Option<String>,
    pub password: Option<String>,
    pub login_url: Option<String>,
}

/// An HTTP session with its own cookie jar.
///
/// Basic-auth credentials, when present, are applied to every request the
/// session makes. Dropping the session discards all of its state.
pub struct Session {
    client: Client,
    jar: Arc<Jar>,
    basic_auth: Option<(String, String)>,
}

impl Session {
    pub fn new() -> Result<Self> {
        let jar = Arc::new(Jar::default());
        let client = Client::builder()
            .user_agent(format!("geotestkit/{}", VERSION))
            .cookie_provider(jar.clone())
            .build()?;

        Ok(Self {
            client,
            jar,
            basic_auth: None,
        })
    }

    /// Creates a session that sends HTTP basic auth with every request.
    pub fn with_basic_auth(username: &str, password: &str) -> Result<Self> {
        let mut session = Self::new()?;
        session.basic_auth = Some((username.to_string(), password.to_string()));
        Ok(session)
    }

    /// Runs the form-login flow against `login_url`.
    ///
    /// Fetches the login page to populate the cookie jar, then posts the
    /// login form with the CSRF token echoed back. The response body is the
    /// post-login redirect page and is discarded; the session keeps the
    /// authenticated cookies.
    pub fn login(&self, login_url: &str, username: &str, password: &str) -> Result<LoginOutcome> {
        log_status!("login", "Requesting login form from {}", login_url);
        let response = self
            .client
            .get(login_url)
            .send()
            .map_err(|e| Error::unreachable(login_url, e))?;

        let token = match self.cookie_value(response.url(), CSRF_COOKIE) {
            Some(token) => token,
            None => return Ok(LoginOutcome::TokenMissing),
        };

        let params = [
            ("username", username),
            ("password", password),
            ("this_is_the_login_form", "true"),
            ("csrfmiddlewaretoken", token.as_str()),
        ];

        self.client
            .post(login_url)
            .form(&params)
            .send()
            .map_err(|e| Error::unreachable(login_url, e))?;

        Ok(LoginOutcome::Accepted)
    }

    /// Fetches `url` and returns the raw response body.
    ///
    /// A non-success HTTP status fails with [`Error::RemoteFetch`]; a
    /// transport or name-resolution failure fails with
    /// [`Error::RemoteUnreachable`].
    pub fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let mut request = self.client.get(url);
        if let Some((username, password)) = &self.basic_auth {
            request = request.basic_auth(username, Some(password));
        }

        let response = request.send().map_err(|e| Error::unreachable(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::RemoteFetch {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.bytes().map_err(|e| Error::unreachable(url, e))?;
        Ok(body.to_vec())
    }

    /// Reads a cookie value for `url` out of the session jar.
    fn cookie_value(&self, url: &Url, name: &str) -> Option<String> {
        let header = self.jar.cookies(url)?;
        let header = header.to_str().ok()?;
        header.split("; ").find_map(|pair| {
            let (key, value) = pair.split_once('=')?;
            (key == name).then(|| value.to_string())
        })
    }
}

/// Fetches `url`, optionally authenticating first.
///
/// The one-call convenience over [`Session`]: form login when
/// `options.login_url` is set, basic auth when only `options.username` is
/// set, anonymous otherwise. A login page that sets no `csrftoken` cookie
/// yields [`FetchOutcome::LoginRejected`] instead of an error.
pub fn fetch_page(url: &str, options: &FetchOptions) -> Result<FetchOutcome> {
    if let Some(login_url) = &options.login_url {
        let session = Session::new()?;
        let username = options.username.as_deref().unwrap_or("");
        let password = options.password.as_deref().unwrap_or("");

        match session.login(login_url, username, password)? {
            LoginOutcome::Accepted => {}
            LoginOutcome::TokenMissing => {
                return Ok(FetchOutcome::LoginRejected {
                    reason: "no csrftoken".to_string(),
                });
            }
        }

        return Ok(FetchOutcome::Page(session.fetch(url)?));
    }

    let session = match &options.username {
        Some(username) => {
            Session::with_basic_auth(username, options.password.as_deref().unwrap_or(""))?
        }
        None => Session::new()?,
    };

    Ok(FetchOutcome::Page(session.fetch(url)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_options_default_is_anonymous() {
        let options = FetchOptions::default();
        assert!(options.username.is_none());
        assert!(options.password.is_none());
        assert!(options.login_url.is_none());
    }

    #[test]
    fn cookie_value_finds_named_cookie() {
        let session = Session::new().unwrap();
        let url = Url::parse("http://localhost/accounts/login/").unwrap();
        session
            .jar
            .add_cookie_str("sessionid=deadbeef; Path=/", &url);
        session
            .jar
            .add_cookie_str("csrftoken=abc123; Path=/", &url);

        assert_eq!(
            session.cookie_value(&url, "csrftoken").as_deref(),
            Some("abc123")
        );
        assert_eq!(session.cookie_value(&url, "missing"), None);
    }
}
