//! Domain ports and supporting types for the hexagonal boundary.
//!
//! Driving ports (`DealCommand`, `DealQuery`, `CrmMetricsQuery`,
//! `LoginService`) are called by inbound adapters. The driven
//! `DealRepository` port is implemented by the outbound adapters.

mod macros;
pub(crate) use macros::define_port_error;

mod crm_metrics_query;
mod deal_command;
mod deal_query;
mod deal_repository;
mod login_service;

#[cfg(test)]
pub use crm_metrics_query::MockCrmMetricsQuery;
pub use crm_metrics_query::CrmMetricsQuery;
#[cfg(test)]
pub use deal_command::MockDealCommand;
pub use deal_command::{
    AddActivityRequest, AddReminderRequest, ChangeStageRequest, CreateDealRequest, DealActionRequest,
    DealCommand, MarkLostRequest, MarkWonRequest, ReminderActionRequest, StageChangeResponse,
    UpdateDealRequest,
};
#[cfg(test)]
pub use deal_query::MockDealQuery;
pub use deal_query::{DealQuery, DealView};
#[cfg(test)]
pub use deal_repository::MockDealRepository;
pub use deal_repository::{DealFilter, DealRepository, DealRepositoryError};
#[cfg(test)]
pub use login_service::MockLoginService;
pub use login_service::{FixtureLoginService, LoginService};
