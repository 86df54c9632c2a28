//! The signed-in principal, as carried by the session cookie.
//!
//! Handlers take a [`SessionContext`] instead of a raw Actix `Session` so the
//! cookie key and payload shape live in one place.

use actix_session::{Session, SessionExt};
use actix_web::{dev::Payload, FromRequest, HttpRequest};
use futures_util::future::{ready, Ready};
use tracing::warn;

use crate::domain::{Error, Principal};

pub(crate) const PRINCIPAL_KEY: &str = "principal";

#[derive(Clone)]
pub struct SessionContext(Session);

impl SessionContext {
    /// Session attached to `req` by the session middleware.
    pub fn from_http_request(req: &HttpRequest) -> Self {
        Self(req.get_session())
    }

    /// Store `principal` under a fresh session id.
    pub fn persist_principal(&self, principal: &Principal) -> Result<(), Error> {
        self.0.renew();
        self.0
            .insert(PRINCIPAL_KEY, principal)
            .map_err(|err| Error::internal(format!("session cookie rejected principal: {err}")))
    }

    /// Principal stored by a previous login. A payload that no longer
    /// decodes counts as anonymous.
    pub fn principal(&self) -> Option<Principal> {
        self.0
            .get::<Principal>(PRINCIPAL_KEY)
            .unwrap_or_else(|err| {
                warn!(error = %err, "discarding undecodable session principal");
                None
            })
    }

    /// The principal, or `401 unauthorized` for anonymous callers.
    pub fn require_principal(&self) -> Result<Principal, Error> {
        self.principal()
            .ok_or_else(|| Error::unauthorized("authentication required"))
    }

    /// Forget the principal and expire the cookie.
    pub fn purge(&self) {
        self.0.purge();
    }
}

impl FromRequest for SessionContext {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(Ok(Self::from_http_request(req)))
    }
}
