mod support;

use chrono::Utc;
use pretty_assertions::assert_eq;
use serde_json::json;
use support::make_token;
use taskdeck::app::{AppState, Screen};
use taskdeck::config::Config;
use taskdeck::error::TokenError;
use taskdeck::session::AuthStatus;
use taskdeck::settings::Theme;
use tempfile::tempdir;

fn config(dir: &std::path::Path, remote: bool) -> Config {
    Config {
        data_dir: dir.to_path_buf(),
        remote_enabled: remote,
        ..Config::default()
    }
}

#[test]
fn checklist_and_theme_survive_a_restart() {
    let dir = tempdir().unwrap();

    let mut app = AppState::open(config(dir.path(), false)).unwrap();
    let added = app.meeting.checklist.add("Share the slides").unwrap();
    app.meeting.checklist.toggle(1).unwrap();
    app.preferences.set_theme(Theme::Dark).unwrap();
    let expected = app.meeting.checklist.items().to_vec();
    app.shutdown();
    drop(app);

    let app = AppState::open(config(dir.path(), false)).unwrap();
    assert_eq!(app.meeting.checklist.items(), expected.as_slice());
    assert_eq!(app.meeting.checklist.items().last().unwrap().id, added);
    assert!(app.meeting.checklist.items()[0].completed);
    assert_eq!(app.preferences.theme(), Theme::Dark);
}

#[test]
fn login_redirect_persists_the_session() {
    let dir = tempdir().unwrap();
    let token = make_token(&json!({
        "id": "user-9",
        "email": "mina@example.com",
        "tenant": {"slug": "globex"},
        "exp": Utc::now().timestamp() + 600,
    }));
    let redirect = format!("http://localhost:5173/login/success?token={token}");

    let mut app = AppState::open(config(dir.path(), true)).unwrap();
    assert_eq!(app.screen, Screen::Login);
    let claims = app.complete_login(&redirect).unwrap();
    assert_eq!(claims.display_name(), "mina@example.com");
    assert_eq!(app.screen, Screen::Board);
    drop(app);

    let app = AppState::open(config(dir.path(), true)).unwrap();
    assert_eq!(app.screen, Screen::Board);
    assert_eq!(app.session.tenant_slug(), "globex");
    assert!(matches!(
        app.session.status(Utc::now().timestamp()),
        AuthStatus::Authenticated(_)
    ));
}

#[test]
fn expired_or_missing_tokens_keep_the_login_screen() {
    let dir = tempdir().unwrap();
    let mut app = AppState::open(config(dir.path(), true)).unwrap();

    let stale = make_token(&json!({"id": "user-9", "exp": 1_000}));
    let err = app
        .complete_login(&format!("http://localhost/login/success?token={stale}"))
        .unwrap_err();
    assert_eq!(err, TokenError::Expired(1_000));
    assert_eq!(
        app.complete_login("http://localhost/login/success").unwrap_err(),
        TokenError::Missing
    );
    assert_eq!(app.screen, Screen::Login);

    app.logout();
    assert_eq!(app.session.token(), None);
}

#[test]
fn login_that_cannot_be_saved_stays_on_the_login_screen() {
    let dir = tempdir().unwrap();
    let mut app = AppState::open(config(dir.path(), true)).unwrap();
    std::fs::create_dir(dir.path().join("token.json")).unwrap();
    let token = make_token(&json!({"id": "user-9", "exp": Utc::now().timestamp() + 600}));

    let err = app
        .complete_login(&format!("http://localhost/login/success?token={token}"))
        .unwrap_err();
    assert!(matches!(err, TokenError::Persist(_)));
    assert_eq!(app.screen, Screen::Login);
    assert_eq!(app.session.token(), None);
}
