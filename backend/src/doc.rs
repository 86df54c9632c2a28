//! OpenAPI documentation configuration.
//!
//! [`ApiDoc`] registers every REST endpoint, the error schema wrappers from
//! [`crate::inbound::http::schemas`], and the session cookie security scheme.
//! The document backs Swagger UI in debug builds and is printed by the
//! `openapi-dump` binary.

use crate::inbound::http::schemas::{ErrorCodeSchema, ErrorSchema};
use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

/// Enrich the generated document with the session cookie security scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        components.add_security_scheme(
            "SessionCookie",
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                "session",
                "Session cookie issued by POST /api/v1/login.",
            ))),
        );
    }
}

/// OpenAPI document for the REST API.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "CRM backend API",
        description = "Deal pipeline, reminders and sales metrics behind module permissions."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    security(("SessionCookie" = [])),
    paths(
        crate::inbound::http::users::login,
        crate::inbound::http::users::logout,
        crate::inbound::http::users::current_principal,
        crate::inbound::http::deals::list_deals,
        crate::inbound::http::deals::create_deal,
        crate::inbound::http::deals::get_deal,
        crate::inbound::http::deals::update_deal,
        crate::inbound::http::deals::archive_deal,
        crate::inbound::http::deals::purge_deal,
        crate::inbound::http::deals::empty_trash,
        crate::inbound::http::deals::restore_deal,
        crate::inbound::http::deals::change_stage,
        crate::inbound::http::deals::win_deal,
        crate::inbound::http::deals::lose_deal,
        crate::inbound::http::deals::list_activities,
        crate::inbound::http::deals::add_activity,
        crate::inbound::http::deals::add_reminder,
        crate::inbound::http::deals::list_stages,
        crate::inbound::http::reminders::pending_reminders,
        crate::inbound::http::reminders::complete_reminder,
        crate::inbound::http::reminders::cancel_reminder,
        crate::inbound::http::metrics::pipeline_metrics,
        crate::inbound::http::metrics::performance_metrics,
        crate::inbound::http::leads::capture_lead,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(ErrorSchema, ErrorCodeSchema)),
    tags(
        (name = "session", description = "Login and the current principal"),
        (name = "deals", description = "Deal lifecycle, activities and stages"),
        (name = "reminders", description = "Follow-up reminders"),
        (name = "metrics", description = "Pipeline and performance metrics"),
        (name = "leads", description = "Anonymous lead intake"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;
