//! Server construction and middleware wiring.

mod config;
mod settings;
mod state_builders;

pub use config::{ServerConfig, Storage};
pub use settings::AppSettings;

use state_builders::build_http_state;

use actix_session::{
    SessionMiddleware,
    config::{CookieContentSecurity, PersistentSession},
    storage::CookieSessionStore,
};
use actix_web::cookie::time::Duration;
use actix_web::cookie::{Key, SameSite};
use actix_web::dev::{Server, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, HttpServer, web};

use crm_backend::Trace;
#[cfg(debug_assertions)]
use crm_backend::doc::ApiDoc;
use crm_backend::inbound::http::api_services;
use crm_backend::inbound::http::error::configure_extractors;
use crm_backend::inbound::http::health::{HealthState, live, ready};
use crm_backend::inbound::http::state::HttpState;
#[cfg(debug_assertions)]
use utoipa::OpenApi;
#[cfg(debug_assertions)]
use utoipa_swagger_ui::SwaggerUi;

/// Everything one worker's `App` needs. Cloned once per worker thread.
#[derive(Clone)]
struct AppDependencies {
    health_state: web::Data<HealthState>,
    http_state: web::Data<HttpState>,
    cookies: CookiePolicy,
}

/// Signing key and attributes of the session cookie.
#[derive(Clone)]
struct CookiePolicy {
    key: Key,
    secure: bool,
    same_site: SameSite,
}

const SESSION_COOKIE: &str = "session";
const SESSION_TTL_HOURS: i64 = 8;

fn session_layer(cookies: CookiePolicy) -> SessionMiddleware<CookieSessionStore> {
    SessionMiddleware::builder(CookieSessionStore::default(), cookies.key)
        .cookie_name(SESSION_COOKIE.to_owned())
        .cookie_secure(cookies.secure)
        .cookie_http_only(true)
        .cookie_same_site(cookies.same_site)
        .cookie_content_security(CookieContentSecurity::Private)
        .session_lifecycle(
            PersistentSession::default().session_ttl(Duration::hours(SESSION_TTL_HOURS)),
        )
        .build()
}

fn build_app(
    deps: AppDependencies,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let api = web::scope("/api/v1")
        .wrap(session_layer(deps.cookies))
        .configure(api_services);

    let app = App::new()
        .wrap(Trace)
        .app_data(deps.health_state)
        .app_data(deps.http_state)
        .configure(configure_extractors)
        .service(ready)
        .service(live)
        .service(api);

    #[cfg(debug_assertions)]
    let app = app.service(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()));

    app
}

/// Bind the HTTP server described by `config`.
///
/// Health probes report ready as soon as the socket is bound.
///
/// # Errors
/// Propagates [`std::io::Error`] when binding the socket fails.
pub fn create_server(
    health_state: web::Data<HealthState>,
    config: ServerConfig,
) -> std::io::Result<Server> {
    let deps = AppDependencies {
        health_state: health_state.clone(),
        http_state: build_http_state(&config),
        cookies: CookiePolicy {
            key: config.key,
            secure: config.cookie_secure,
            same_site: config.same_site,
        },
    };

    let server = HttpServer::new(move || build_app(deps.clone()))
        .bind(config.bind_addr)?
        .run();

    health_state.mark_ready();
    Ok(server)
}
