//! Domain primitives, aggregates and services.
//!
//! Purpose: hold the CRM rules independent of HTTP and storage. Inbound
//! adapters call the driving ports in [`ports`]; outbound adapters implement
//! the driven [`ports::DealRepository`].
//!
//! Public surface:
//! - Error / ErrorCode: the error payload shared by every adapter.
//! - Principal, Module, Role and the `can_access`/`authorize` family: the
//!   permission evaluator.
//! - [`crm`]: deals, their stage machine, activities, reminders and metrics.
//! - DealService / MetricsService: the lifecycle manager and the metrics
//!   aggregator behind the driving ports.

pub mod crm;
pub mod deal_service;
pub mod error;
pub mod identity;
pub mod metrics_service;
pub mod permissions;
pub mod ports;
pub mod trace_id;

pub use self::deal_service::DealService;
pub use self::error::{Error, ErrorCode, ErrorValidationError};
pub use self::identity::{LoginCredentials, LoginValidationError, UserId, UserIdError};
pub use self::metrics_service::MetricsService;
pub use self::permissions::{
    authorize, authorize_any, can_access, can_access_any, require_admin, Module, Principal, Role,
    UnknownModule,
};
pub use self::trace_id::{TraceId, TRACE_ID_HEADER};

/// Convenient API result alias.
///
/// # Examples
/// ```
/// use crm_backend::domain::{ApiResult, Error};
///
/// fn handler() -> ApiResult<()> {
///     Err(Error::forbidden("nope"))
/// }
/// ```
pub type ApiResult<T> = Result<T, Error>;
