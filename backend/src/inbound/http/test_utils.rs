//! Test helpers for inbound HTTP components.

use std::sync::Arc;

use actix_session::{SessionMiddleware, storage::CookieSessionStore};
use actix_web::cookie::{Cookie, Key};
use actix_web::dev::ServiceResponse;
use chrono::{DateTime, Local, Utc};
use mockable::Clock;

use crate::domain::ports::FixtureLoginService;
use crate::domain::{DealService, MetricsService};
use crate::outbound::memory::InMemoryDealRepository;

use super::state::HttpState;

/// Build a session middleware configured for tests.
///
/// - Generates a fresh signing/encryption key per invocation.
/// - Sets the cookie name to `session` and disables the `Secure` flag for
///   local HTTP tests.
pub fn test_session_middleware() -> SessionMiddleware<CookieSessionStore> {
    SessionMiddleware::builder(CookieSessionStore::default(), Key::generate())
        .cookie_name("session".to_owned())
        .cookie_secure(false)
        .build()
}

/// Session cookie set by `res`, owned so it outlives the response.
pub fn session_cookie<B>(res: &ServiceResponse<B>) -> Cookie<'static> {
    res.response()
        .cookies()
        .find(|cookie| cookie.name() == "session")
        .expect("session cookie set")
        .into_owned()
}

/// Clock pinned to one instant.
pub struct FixtureClock(pub DateTime<Utc>);

impl Clock for FixtureClock {
    fn local(&self) -> DateTime<Local> {
        self.0.with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Handler state backed by real services over an empty in-memory store.
pub fn memory_state(now: DateTime<Utc>) -> HttpState {
    let repo = Arc::new(InMemoryDealRepository::new());
    let clock: Arc<dyn Clock> = Arc::new(FixtureClock(now));
    let deals = Arc::new(DealService::new(repo.clone(), clock.clone()));
    HttpState::new(
        Arc::new(FixtureLoginService),
        deals.clone(),
        deals,
        Arc::new(MetricsService::new(repo, clock.clone())),
    )
    .with_clock(clock)
}
