//! Session cookie settings.
//!
//! `AppSettings` hands the raw cookie toggles over as [`SessionToggles`].
//! [`session_settings`] turns them into the key and cookie attributes the
//! session middleware needs. Release builds insist on explicit, safe values;
//! debug builds fill gaps with defaults and log what they filled.

pub mod fingerprint;

use std::path::{Path, PathBuf};

use actix_web::cookie::{Key, SameSite};
use tracing::warn;
use zeroize::Zeroizing;

/// Where the signing key is read from when no path is configured.
pub const DEFAULT_KEY_PATH: &str = "/var/run/secrets/crm_session_key";
/// Shortest key file accepted in release builds.
pub const MIN_KEY_BYTES: usize = 64;

/// Whether the binary was compiled with debug assertions.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BuildMode {
    Debug,
    Release,
}

impl BuildMode {
    /// Mode of the running binary.
    ///
    /// ```rust
    /// use crm_backend::inbound::http::session_config::BuildMode;
    ///
    /// let expected = if cfg!(debug_assertions) { BuildMode::Debug } else { BuildMode::Release };
    /// assert_eq!(BuildMode::from_debug_assertions(), expected);
    /// ```
    #[must_use]
    pub fn from_debug_assertions() -> Self {
        if cfg!(debug_assertions) {
            Self::Debug
        } else {
            Self::Release
        }
    }

    const fn lenient(self) -> bool {
        matches!(self, Self::Debug)
    }
}

/// Cookie toggles exactly as configured. `None` means the operator left the
/// setting out.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionToggles {
    pub key_file: Option<PathBuf>,
    pub cookie_secure: Option<bool>,
    pub same_site: Option<String>,
    pub allow_ephemeral: Option<bool>,
}

/// Key and cookie attributes for the session middleware.
pub struct SessionSettings {
    pub key: Key,
    pub cookie_secure: bool,
    pub same_site: SameSite,
}

#[derive(thiserror::Error, Debug)]
pub enum SessionConfigError {
    #[error("{name} must be set in release builds")]
    Missing { name: &'static str },
    #[error("{name} has unsupported value '{value}' (use one of {expected})")]
    Invalid {
        name: &'static str,
        value: String,
        expected: &'static str,
    },
    #[error("cannot read session key file {path}: {source}")]
    KeyRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("session key file {path} holds {length} bytes; at least {min_len} are required")]
    KeyTooShort {
        path: PathBuf,
        length: usize,
        min_len: usize,
    },
    #[error("SameSite=None cookies must also be Secure")]
    InsecureSameSiteNone,
    #[error("ephemeral session keys are only allowed in debug builds")]
    EphemeralNotAllowed,
}

/// Resolve `toggles` into usable session settings.
///
/// # Examples
///
/// ```rust
/// use crm_backend::inbound::http::session_config::{
///     session_settings, BuildMode, SessionToggles,
/// };
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let key_path = std::env::temp_dir().join("crm_session_key_doctest");
/// std::fs::write(&key_path, [b'z'; 64])?;
///
/// let toggles = SessionToggles {
///     key_file: Some(key_path.clone()),
///     cookie_secure: Some(true),
///     same_site: Some("lax".to_owned()),
///     allow_ephemeral: None,
/// };
/// let settings = session_settings(&toggles, BuildMode::Release)?;
/// assert!(settings.cookie_secure);
///
/// std::fs::remove_file(&key_path)?;
/// # Ok(())
/// # }
/// ```
pub fn session_settings(
    toggles: &SessionToggles,
    mode: BuildMode,
) -> Result<SessionSettings, SessionConfigError> {
    let cookie_secure = match toggles.cookie_secure {
        Some(secure) => secure,
        None if mode.lenient() => {
            warn!("session_cookie_secure unset, marking cookies Secure");
            true
        }
        None => return Err(SessionConfigError::Missing { name: "session_cookie_secure" }),
    };

    let same_site = resolve_same_site(toggles.same_site.as_deref(), mode)?;
    if same_site == SameSite::None && !cookie_secure {
        if !mode.lenient() {
            return Err(SessionConfigError::InsecureSameSiteNone);
        }
        warn!("SameSite=None without Secure; browsers will drop the session cookie");
    }

    let allow_ephemeral = toggles.allow_ephemeral.unwrap_or(false);
    if allow_ephemeral && !mode.lenient() {
        return Err(SessionConfigError::EphemeralNotAllowed);
    }

    let path = toggles
        .key_file
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_KEY_PATH));
    let key = load_key(&path, mode, allow_ephemeral)?;

    Ok(SessionSettings {
        key,
        cookie_secure,
        same_site,
    })
}

fn parse_same_site(value: &str) -> Option<SameSite> {
    if value.eq_ignore_ascii_case("strict") {
        Some(SameSite::Strict)
    } else if value.eq_ignore_ascii_case("lax") {
        Some(SameSite::Lax)
    } else if value.eq_ignore_ascii_case("none") {
        Some(SameSite::None)
    } else {
        None
    }
}

fn resolve_same_site(raw: Option<&str>, mode: BuildMode) -> Result<SameSite, SessionConfigError> {
    let fallback = if mode.lenient() { SameSite::Lax } else { SameSite::Strict };
    match (raw, mode.lenient()) {
        (None, true) => {
            warn!("session_same_site unset, using Lax");
            Ok(fallback)
        }
        (None, false) => Err(SessionConfigError::Missing { name: "session_same_site" }),
        (Some(value), lenient) => match parse_same_site(value) {
            Some(policy) => Ok(policy),
            None if lenient => {
                warn!(value, "unrecognised session_same_site, using Lax");
                Ok(fallback)
            }
            None => Err(SessionConfigError::Invalid {
                name: "session_same_site",
                value: value.to_owned(),
                expected: "Strict, Lax, None",
            }),
        },
    }
}

fn load_key(path: &Path, mode: BuildMode, allow_ephemeral: bool) -> Result<Key, SessionConfigError> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => Zeroizing::new(bytes),
        Err(source) if mode.lenient() || allow_ephemeral => {
            warn!(path = %path.display(), error = %source, "no session key file, generating a throwaway key");
            return Ok(Key::generate());
        }
        Err(source) => {
            return Err(SessionConfigError::KeyRead {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    if bytes.len() < MIN_KEY_BYTES {
        if mode.lenient() {
            warn!(path = %path.display(), length = bytes.len(), "session key file too short, generating a throwaway key");
            return Ok(Key::generate());
        }
        return Err(SessionConfigError::KeyTooShort {
            path: path.to_path_buf(),
            length: bytes.len(),
            min_len: MIN_KEY_BYTES,
        });
    }
    Ok(Key::derive_from(&bytes))
}

#[cfg(test)]
mod tests;
