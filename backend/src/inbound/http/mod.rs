//! HTTP inbound adapter exposing REST endpoints.

use actix_web::web;

use crate::domain::Module;

pub mod deals;
mod deals_dto;
pub mod error;
pub mod health;
pub mod leads;
pub mod metrics;
pub mod module_gate;
pub mod reminders;
pub mod schemas;
pub mod session;
pub mod session_config;
pub mod state;
#[cfg(test)]
pub mod test_utils;
pub mod users;
pub mod validation;

pub use error::ApiResult;

use module_gate::ModuleGate;

/// Register every `/api/v1` route with its module gate.
///
/// Only `/public` is left ungated.
///
/// Mount inside a scope that already carries the session middleware.
///
/// # Examples
/// ```no_run
/// use actix_web::{web, App};
/// use crm_backend::inbound::http::api_services;
///
/// let app = App::new().service(web::scope("/api/v1").configure(api_services));
/// ```
pub fn api_services(cfg: &mut web::ServiceConfig) {
    cfg.service(users::login)
        .service(users::logout)
        .service(users::current_principal)
        .service(
            web::scope("/deals")
                .wrap(ModuleGate::require(Module::Crm))
                .service(deals::list_deals)
                .service(deals::create_deal)
                .service(deals::get_deal)
                .service(deals::update_deal)
                .service(deals::empty_trash)
                .service(deals::purge_deal)
                .service(deals::archive_deal)
                .service(deals::restore_deal)
                .service(deals::change_stage)
                .service(deals::win_deal)
                .service(deals::lose_deal)
                .service(deals::list_activities)
                .service(deals::add_activity)
                .service(deals::add_reminder),
        )
        .service(
            web::scope("/reminders")
                .wrap(ModuleGate::require(Module::Crm))
                .service(reminders::pending_reminders)
                .service(reminders::complete_reminder)
                .service(reminders::cancel_reminder),
        )
        .service(
            web::scope("/stages")
                .wrap(ModuleGate::require(Module::Crm))
                .service(deals::list_stages),
        )
        .service(
            web::scope("/metrics")
                .wrap(ModuleGate::any_of(&[Module::Crm, Module::Dashboard]))
                .service(metrics::pipeline_metrics)
                .service(metrics::performance_metrics),
        )
        .service(web::scope("/public").service(leads::capture_lead));
}
