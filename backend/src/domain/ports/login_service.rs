//! Driving port for authentication.
//!
//! Inbound adapters call this port to turn credentials into a [`Principal`]
//! whose role and module grants are then stored in the session.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{Error, LoginCredentials, Module, Principal, Role, UserId};

/// Domain use-case port for authentication.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LoginService: Send + Sync {
    /// Validate credentials and return the authenticated principal.
    async fn authenticate(&self, credentials: &LoginCredentials) -> Result<Principal, Error>;
}

struct FixtureAccount {
    username: &'static str,
    password: &'static str,
    user_id: Uuid,
    display_name: &'static str,
    role: &'static str,
    modules: &'static [Module],
}

const FIXTURE_ACCOUNTS: [FixtureAccount; 2] = [
    FixtureAccount {
        username: "admin",
        password: "password",
        user_id: Uuid::from_u128(0x123e4567_e89b_12d3_a456_426614174000),
        display_name: "Administrador",
        role: "admin",
        modules: &[],
    },
    FixtureAccount {
        username: "ventas",
        password: "password",
        user_id: Uuid::from_u128(0x11111111_1111_1111_1111_111111111111),
        display_name: "Equipo Comercial",
        role: "ventas",
        modules: &[Module::Dashboard, Module::Crm],
    },
];

/// In-memory authenticator with a fixed roster: an administrator
/// (`admin`/`password`) and a sales member (`ventas`/`password`) holding the
/// `dashboard` and `crm` modules.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureLoginService;

#[async_trait]
impl LoginService for FixtureLoginService {
    async fn authenticate(&self, credentials: &LoginCredentials) -> Result<Principal, Error> {
        FIXTURE_ACCOUNTS
            .iter()
            .find(|account| {
                account.username == credentials.username()
                    && account.password == credentials.password()
            })
            .map(|account| {
                Principal::new(
                    UserId::from_uuid(account.user_id),
                    account.display_name,
                    Role::from(account.role.to_owned()),
                    account.modules.iter().copied(),
                )
            })
            .ok_or_else(|| Error::unauthorized("invalid credentials"))
    }
}
