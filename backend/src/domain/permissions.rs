//! Module-permission evaluation.
//!
//! Every route in the application belongs to one functional [`Module`]. A
//! [`Principal`] is granted a flat set of modules; administrators bypass the
//! set entirely. Evaluation is pure: the functions here never touch storage
//! or the session.
//!
//! An absent principal and a principal without the module are different
//! failures. [`authorize`] reports the first as
//! [`ErrorCode::Unauthorized`](super::ErrorCode::Unauthorized) and the second
//! as [`ErrorCode::Forbidden`](super::ErrorCode::Forbidden).

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{Error, UserId};

/// Functional area used as the unit of permission granting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Module {
    Dashboard,
    Crm,
    Terceros,
    Clientes,
    Servicios,
    Tareas,
    Equipo,
    Finanzas,
    CuentasCobro,
}

impl Module {
    /// The fixed module registry in menu order.
    pub const ALL: [Module; 9] = [
        Module::Dashboard,
        Module::Crm,
        Module::Terceros,
        Module::Clientes,
        Module::Servicios,
        Module::Tareas,
        Module::Equipo,
        Module::Finanzas,
        Module::CuentasCobro,
    ];

    /// Wire name of the module.
    pub const fn as_str(self) -> &'static str {
        match self {
            Module::Dashboard => "dashboard",
            Module::Crm => "crm",
            Module::Terceros => "terceros",
            Module::Clientes => "clientes",
            Module::Servicios => "servicios",
            Module::Tareas => "tareas",
            Module::Equipo => "equipo",
            Module::Finanzas => "finanzas",
            Module::CuentasCobro => "cuentas-cobro",
        }
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised when a module name is not in the registry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown module: {0}")]
pub struct UnknownModule(pub String);

impl FromStr for Module {
    type Err = UnknownModule;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Module::ALL
            .into_iter()
            .find(|module| module.as_str() == trimmed)
            .ok_or_else(|| UnknownModule(trimmed.to_owned()))
    }
}

/// Role attached to a principal.
///
/// Only `admin` carries behaviour; every other role is an opaque label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    Admin,
    Member(String),
}

impl Role {
    /// Whether this role bypasses module checks.
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }

    /// Wire name of the role.
    pub fn as_str(&self) -> &str {
        match self {
            Role::Admin => "admin",
            Role::Member(name) => name,
        }
    }
}

/// Only the exact `admin` wire value grants the bypass.
impl From<String> for Role {
    fn from(value: String) -> Self {
        if value == "admin" {
            Role::Admin
        } else {
            Role::Member(value)
        }
    }
}

impl From<Role> for String {
    fn from(value: Role) -> Self {
        match value {
            Role::Admin => "admin".to_owned(),
            Role::Member(name) => name,
        }
    }
}

/// Authenticated identity evaluated by the permission gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub user_id: UserId,
    pub display_name: String,
    pub role: Role,
    #[serde(default)]
    pub permissions: BTreeSet<Module>,
}

impl Principal {
    /// Build a principal from its parts.
    pub fn new(
        user_id: UserId,
        display_name: impl Into<String>,
        role: Role,
        permissions: impl IntoIterator<Item = Module>,
    ) -> Self {
        Self {
            user_id,
            display_name: display_name.into(),
            role,
            permissions: permissions.into_iter().collect(),
        }
    }

    /// Modules this principal may open, with the admin bypass applied.
    pub fn effective_modules(&self) -> Vec<Module> {
        Module::ALL
            .into_iter()
            .filter(|module| can_access(self, *module))
            .collect()
    }
}

/// Whether `principal` may access `module`.
///
/// # Examples
/// ```
/// use crm_backend::domain::{can_access, Module, Principal, Role, UserId};
///
/// let admin = Principal::new(UserId::random(), "Ana", Role::Admin, []);
/// assert!(can_access(&admin, Module::Finanzas));
///
/// let sales = Principal::new(UserId::random(), "Luis", Role::from("ventas".to_owned()), [Module::Crm]);
/// assert!(can_access(&sales, Module::Crm));
/// assert!(!can_access(&sales, Module::Finanzas));
/// ```
pub fn can_access(principal: &Principal, module: Module) -> bool {
    if principal.role.is_admin() {
        return true;
    }
    principal.permissions.contains(&module)
}

/// Whether `principal` may access at least one of `modules`.
pub fn can_access_any(principal: &Principal, modules: &[Module]) -> bool {
    if principal.role.is_admin() {
        return true;
    }
    modules.iter().any(|module| principal.permissions.contains(module))
}

/// Resolve a module requirement for a possibly absent principal.
pub fn authorize(principal: Option<&Principal>, module: Module) -> Result<&Principal, Error> {
    authorize_any(principal, &[module])
}

/// Resolve an any-of module requirement for a possibly absent principal.
pub fn authorize_any<'a>(
    principal: Option<&'a Principal>,
    modules: &[Module],
) -> Result<&'a Principal, Error> {
    let principal = principal.ok_or_else(unauthenticated)?;
    if can_access_any(principal, modules) {
        return Ok(principal);
    }
    let required: Vec<&str> = modules.iter().map(|module| module.as_str()).collect();
    Err(Error::forbidden("missing module permission").with_details(json!({
        "requiredPermission": required,
        "code": "missing_permission",
    })))
}

/// Require an administrator.
pub fn require_admin(principal: Option<&Principal>) -> Result<&Principal, Error> {
    let principal = principal.ok_or_else(unauthenticated)?;
    if principal.role.is_admin() {
        Ok(principal)
    } else {
        Err(Error::forbidden("administrator role required").with_details(json!({
            "requiredRole": "admin",
            "code": "missing_role",
        })))
    }
}

fn unauthenticated() -> Error {
    Error::unauthorized("authentication required")
}
