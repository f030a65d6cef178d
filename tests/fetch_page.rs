use geotestkit::{fetch_page, FetchOptions, FetchOutcome, Session};
use mockito::Matcher;

#[test]
fn anonymous_fetch_returns_body_bytes() {
    let mut server = mockito::Server::new();
    server
        .mock("GET", "/data/page")
        .with_status(200)
        .with_body("page contents")
        .create();

    let url = format!("{}/data/page", server.url());
    let outcome = fetch_page(&url, &FetchOptions::default()).unwrap();

    assert_eq!(outcome, FetchOutcome::Page(b"page contents".to_vec()));
}

#[test]
fn http_error_status_carries_the_code() {
    let mut server = mockito::Server::new();
    server.mock("GET", "/missing").with_status(404).create();

    let url = format!("{}/missing", server.url());
    let err = fetch_page(&url, &FetchOptions::default()).unwrap_err();

    assert_eq!(err.code(), "remote.fetch_failed");
    assert!(err.to_string().contains("404"));
}

#[test]
fn unreachable_server_names_the_url() {
    let url = "http://127.0.0.1:1/unreachable";
    let err = fetch_page(url, &FetchOptions::default()).unwrap_err();

    assert_eq!(err.code(), "remote.unreachable");
    assert!(err.to_string().contains(url));
}

#[test]
fn basic_auth_sends_authorization_header() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("GET", "/protected")
        .match_header("authorization", "Basic amlsbDpzZWNyZXQ=")
        .with_status(200)
        .with_body("protected contents")
        .create();

    let url = format!("{}/protected", server.url());
    let options = FetchOptions {
        username: Some("jill".to_string()),
        password: Some("secret".to_string()),
        login_url: None,
    };
    let outcome = fetch_page(&url, &options).unwrap();

    assert_eq!(outcome, FetchOutcome::Page(b"protected contents".to_vec()));
    mock.assert();
}

#[test]
fn form_login_posts_token_then_fetches_target() {
    let mut server = mockito::Server::new();
    server
        .mock("GET", "/accounts/login/")
        .with_status(200)
        .with_header("set-cookie", "csrftoken=abc123; Path=/")
        .with_body("<form></form>")
        .create();

    let login_post = server
        .mock("POST", "/accounts/login/")
        .match_body(Matcher::AllOf(vec![
            Matcher::UrlEncoded("username".to_string(), "jill".to_string()),
            Matcher::UrlEncoded("password".to_string(), "secret".to_string()),
            Matcher::UrlEncoded("this_is_the_login_form".to_string(), "true".to_string()),
            Matcher::UrlEncoded("csrfmiddlewaretoken".to_string(), "abc123".to_string()),
        ]))
        .with_status(200)
        .with_body("welcome")
        .create();

    let target = server
        .mock("GET", "/private/page")
        .match_header("cookie", Matcher::Regex("csrftoken=abc123".to_string()))
        .with_status(200)
        .with_body("secret contents")
        .create();

    let url = format!("{}/private/page", server.url());
    let options = FetchOptions {
        username: Some("jill".to_string()),
        password: Some("secret".to_string()),
        login_url: Some(format!("{}/accounts/login/", server.url())),
    };
    let outcome = fetch_page(&url, &options).unwrap();

    assert_eq!(outcome, FetchOutcome::Page(b"secret contents".to_vec()));
    login_post.assert();
    target.assert();
}

#[test]
fn login_without_csrf_cookie_is_rejected_not_raised() {
    let mut server = mockito::Server::new();
    server
        .mock("GET", "/accounts/login/")
        .with_status(200)
        .with_body("<form></form>")
        .create();

    let url = format!("{}/private/page", server.url());
    let options = FetchOptions {
        username: Some("jill".to_string()),
        password: Some("secret".to_string()),
        login_url: Some(format!("{}/accounts/login/", server.url())),
    };
    let outcome = fetch_page(&url, &options).unwrap();

    assert_eq!(
        outcome,
        FetchOutcome::LoginRejected {
            reason: "no csrftoken".to_string()
        }
    );
}

#[test]
fn sessions_do_not_share_cookies() {
    let mut server = mockito::Server::new();
    server
        .mock("GET", "/accounts/login/")
        .with_status(200)
        .with_header("set-cookie", "csrftoken=abc123; Path=/")
        .create();

    let first = Session::new().unwrap();
    first
        .login(
            &format!("{}/accounts/login/", server.url()),
            "jill",
            "secret",
        )
        .unwrap();

    // A fresh session starts with an empty jar, so the same login page
    // without a set-cookie response yields a missing token.
    let bare = server
        .mock("GET", "/accounts/bare-login/")
        .with_status(200)
        .create();
    let second = Session::new().unwrap();
    let outcome = second
        .login(
            &format!("{}/accounts/bare-login/", server.url()),
            "jill",
            "secret",
        )
        .unwrap();

    assert_eq!(outcome, geotestkit::LoginOutcome::TokenMissing);
    bare.assert();
}
