//! CRM backend library: permission evaluation, the deal lifecycle, and
//! pipeline metrics behind an actix-web HTTP adapter.
//!
//! Layout follows a hexagonal split. [`domain`] holds the rules and ports,
//! [`inbound`] adapts HTTP requests onto the driving ports, and [`outbound`]
//! implements the driven `DealRepository` port.

pub mod doc;
pub mod domain;
pub mod inbound;
pub mod middleware;
pub mod outbound;

/// Public OpenAPI surface used by Swagger UI and tooling.
pub use doc::ApiDoc;
pub use middleware::Trace;
