//! Unit tests for session configuration validation.

use super::*;
use rstest::rstest;
use std::io::Write as _;

fn key_file(len: usize) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("create temp key file");
    file.write_all(&vec![b'a'; len]).expect("write key bytes");
    file
}

fn release_toggles(path: &std::path::Path) -> SessionToggles {
    SessionToggles {
        key_file: Some(path.to_path_buf()),
        cookie_secure: Some(true),
        same_site: Some("Strict".to_owned()),
        allow_ephemeral: Some(false),
    }
}

fn expect_error(
    result: Result<SessionSettings, SessionConfigError>,
    label: &str,
) -> SessionConfigError {
    match result {
        Ok(_) => panic!("{label}"),
        Err(error) => error,
    }
}

#[rstest]
fn release_accepts_explicit_settings() {
    let file = key_file(64);
    let settings = session_settings(&release_toggles(file.path()), BuildMode::Release)
        .expect("release settings");
    assert!(settings.cookie_secure);
    assert_eq!(settings.same_site, SameSite::Strict);
}

#[rstest]
fn release_rejects_short_key() {
    let file = key_file(16);
    let error = expect_error(
        session_settings(&release_toggles(file.path()), BuildMode::Release),
        "short key must fail",
    );
    assert!(matches!(
        error,
        SessionConfigError::KeyTooShort { length: 16, .. }
    ));
}

#[rstest]
#[case(SessionToggles { cookie_secure: None, ..SessionToggles::default() }, "session_cookie_secure")]
#[case(SessionToggles { cookie_secure: Some(true), same_site: None, ..SessionToggles::default() }, "session_same_site")]
fn release_requires_explicit_toggles(#[case] toggles: SessionToggles, #[case] expected: &str) {
    let error = expect_error(
        session_settings(&toggles, BuildMode::Release),
        "missing toggle must fail",
    );
    match error {
        SessionConfigError::Missing { name } => assert_eq!(name, expected),
        other => panic!("unexpected error: {other}"),
    }
}

#[rstest]
fn release_rejects_same_site_none_without_secure_cookie() {
    let file = key_file(64);
    let toggles = SessionToggles {
        cookie_secure: Some(false),
        same_site: Some("None".to_owned()),
        ..release_toggles(file.path())
    };
    let error = expect_error(
        session_settings(&toggles, BuildMode::Release),
        "insecure SameSite=None must fail",
    );
    assert!(matches!(error, SessionConfigError::InsecureSameSiteNone));
}

#[rstest]
fn release_rejects_ephemeral_keys() {
    let file = key_file(64);
    let toggles = SessionToggles {
        allow_ephemeral: Some(true),
        ..release_toggles(file.path())
    };
    let error = expect_error(
        session_settings(&toggles, BuildMode::Release),
        "ephemeral keys must fail",
    );
    assert!(matches!(error, SessionConfigError::EphemeralNotAllowed));
}

#[rstest]
fn release_rejects_unknown_same_site() {
    let file = key_file(64);
    let toggles = SessionToggles {
        same_site: Some("sometimes".to_owned()),
        ..release_toggles(file.path())
    };
    let error = expect_error(
        session_settings(&toggles, BuildMode::Release),
        "unknown SameSite must fail",
    );
    assert!(matches!(error, SessionConfigError::Invalid { .. }));
}

#[rstest]
fn release_requires_readable_key() {
    let dir = tempfile::tempdir().expect("temp dir");
    let toggles = release_toggles(&dir.path().join("absent"));
    let error = expect_error(
        session_settings(&toggles, BuildMode::Release),
        "missing key must fail",
    );
    assert!(matches!(error, SessionConfigError::KeyRead { .. }));
}

#[rstest]
fn debug_falls_back_to_defaults_and_ephemeral_key() {
    let dir = tempfile::tempdir().expect("temp dir");
    let toggles = SessionToggles {
        key_file: Some(dir.path().join("absent")),
        same_site: Some("bogus".to_owned()),
        ..SessionToggles::default()
    };
    let settings = session_settings(&toggles, BuildMode::Debug).expect("debug settings");
    assert!(settings.cookie_secure);
    assert_eq!(settings.same_site, SameSite::Lax);
}
