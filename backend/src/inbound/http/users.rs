//! Session API handlers.
//!
//! ```text
//! POST /api/v1/login {"username":"ventas","password":"password"}
//! POST /api/v1/logout
//! GET  /api/v1/me
//! ```

use actix_web::{get, post, web, HttpResponse};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

use crate::domain::{Error, LoginCredentials, LoginValidationError, Principal};
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::ApiResult;

/// Login request body for `POST /api/v1/login`.
#[derive(Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[schema(example = "ventas")]
    pub username: String,
    pub password: String,
}

impl TryFrom<LoginRequest> for LoginCredentials {
    type Error = LoginValidationError;

    fn try_from(value: LoginRequest) -> Result<Self, Self::Error> {
        Self::try_from_parts(&value.username, &value.password)
    }
}

/// The signed-in user and the modules they may open.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PrincipalResponse {
    pub user_id: String,
    pub display_name: String,
    #[schema(example = "ventas")]
    pub role: String,
    /// Modules granted explicitly.
    pub permissions: Vec<String>,
    /// Modules reachable after the admin bypass.
    pub modules: Vec<String>,
}

impl From<&Principal> for PrincipalResponse {
    fn from(principal: &Principal) -> Self {
        Self {
            user_id: principal.user_id.to_string(),
            display_name: principal.display_name.clone(),
            role: principal.role.as_str().to_owned(),
            permissions: principal
                .permissions
                .iter()
                .map(|module| module.as_str().to_owned())
                .collect(),
            modules: principal
                .effective_modules()
                .into_iter()
                .map(|module| module.as_str().to_owned())
                .collect(),
        }
    }
}

fn map_login_validation_error(err: LoginValidationError) -> Error {
    match err {
        LoginValidationError::EmptyUsername => Error::invalid_request("username must not be empty")
            .with_details(json!({ "field": "username", "code": "empty_username" })),
        LoginValidationError::EmptyPassword => Error::invalid_request("password must not be empty")
            .with_details(json!({ "field": "password", "code": "empty_password" })),
    }
}

/// Authenticate and store the principal in a fresh session.
#[utoipa::path(
    post,
    path = "/api/v1/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login success", body = PrincipalResponse,
            headers(("Set-Cookie" = String, description = "Session cookie"))),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Invalid credentials", body = ErrorSchema)
    ),
    tags = ["session"],
    operation_id = "login",
    security([])
)]
#[post("/login")]
pub async fn login(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<LoginRequest>,
) -> ApiResult<web::Json<PrincipalResponse>> {
    let credentials =
        LoginCredentials::try_from(payload.into_inner()).map_err(map_login_validation_error)?;
    let principal = state.login.authenticate(&credentials).await?;
    session.persist_principal(&principal)?;
    Ok(web::Json(PrincipalResponse::from(&principal)))
}

/// Drop the session.
#[utoipa::path(
    post,
    path = "/api/v1/logout",
    responses((status = 204, description = "Session cleared")),
    tags = ["session"],
    operation_id = "logout"
)]
#[post("/logout")]
pub async fn logout(session: SessionContext) -> HttpResponse {
    session.purge();
    HttpResponse::NoContent().finish()
}

/// Describe the signed-in principal.
#[utoipa::path(
    get,
    path = "/api/v1/me",
    responses(
        (status = 200, description = "Current principal", body = PrincipalResponse),
        (status = 401, description = "Unauthorised", body = ErrorSchema)
    ),
    tags = ["session"],
    operation_id = "currentPrincipal"
)]
#[get("/me")]
pub async fn current_principal(session: SessionContext) -> ApiResult<web::Json<PrincipalResponse>> {
    let principal = session.require_principal()?;
    Ok(web::Json(PrincipalResponse::from(&principal)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inbound::http::test_utils::{memory_state, session_cookie, test_session_middleware};
    use actix_web::http::StatusCode;
    use actix_web::{test as actix_test, App};
    use chrono::{TimeZone, Utc};
    use rstest::rstest;
    use serde_json::Value;

    fn test_app() -> App<
        impl actix_web::dev::ServiceFactory<
            actix_web::dev::ServiceRequest,
            Config = (),
            Response = actix_web::dev::ServiceResponse,
            Error = actix_web::Error,
            InitError = (),
        >,
    > {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).single().expect("valid instant");
        App::new()
            .app_data(web::Data::new(memory_state(now)))
            .wrap(test_session_middleware())
            .service(
                web::scope("/api/v1")
                    .service(login)
                    .service(logout)
                    .service(current_principal),
            )
    }

    fn login_request(username: &str, password: &str) -> actix_http::Request {
        actix_test::TestRequest::post()
            .uri("/api/v1/login")
            .set_json(&LoginRequest {
                username: username.into(),
                password: password.into(),
            })
            .to_request()
    }

    #[rstest]
    #[case("   ", "password", "username", "empty_username")]
    #[case("ventas", "", "password", "empty_password")]
    #[actix_web::test]
    async fn login_rejects_blank_credentials(
        #[case] username: &str,
        #[case] password: &str,
        #[case] field: &str,
        #[case] code: &str,
    ) {
        let app = actix_test::init_service(test_app()).await;
        let response = actix_test::call_service(&app, login_request(username, password)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let value: Value = actix_test::read_body_json(response).await;
        assert_eq!(value["code"], "invalid_request");
        assert_eq!(value["details"]["field"], field);
        assert_eq!(value["details"]["code"], code);
    }

    #[actix_web::test]
    async fn wrong_password_is_unauthorised() {
        let app = actix_test::init_service(test_app()).await;
        let response = actix_test::call_service(&app, login_request("ventas", "nope")).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let value: Value = actix_test::read_body_json(response).await;
        assert_eq!(value["message"], "invalid credentials");
    }

    #[actix_web::test]
    async fn login_then_me_describes_the_principal() {
        let app = actix_test::init_service(test_app()).await;
        let login_res = actix_test::call_service(&app, login_request("Ventas", "password")).await;
        assert_eq!(login_res.status(), StatusCode::OK);
        let cookie = session_cookie(&login_res);

        let me_res = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri("/api/v1/me")
                .cookie(cookie)
                .to_request(),
        )
        .await;
        assert_eq!(me_res.status(), StatusCode::OK);
        let body: PrincipalResponse = actix_test::read_body_json(me_res).await;
        assert_eq!(body.role, "ventas");
        assert_eq!(body.permissions, vec!["dashboard", "crm"]);
        assert_eq!(body.modules, vec!["dashboard", "crm"]);
    }

    #[actix_web::test]
    async fn admin_sees_every_module() {
        let app = actix_test::init_service(test_app()).await;
        let login_res = actix_test::call_service(&app, login_request("admin", "password")).await;
        let body: PrincipalResponse = actix_test::read_body_json(login_res).await;
        assert!(body.permissions.is_empty());
        assert_eq!(body.modules.len(), 9);
    }

    #[actix_web::test]
    async fn me_without_session_is_unauthorised() {
        let app = actix_test::init_service(test_app()).await;
        let response = actix_test::call_service(
            &app,
            actix_test::TestRequest::get().uri("/api/v1/me").to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn logout_clears_the_session() {
        let app = actix_test::init_service(test_app()).await;
        let login_res = actix_test::call_service(&app, login_request("ventas", "password")).await;
        let cookie = session_cookie(&login_res);

        let logout_res = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri("/api/v1/logout")
                .cookie(cookie)
                .to_request(),
        )
        .await;
        assert_eq!(logout_res.status(), StatusCode::NO_CONTENT);
        let removal = session_cookie(&logout_res);
        assert_eq!(removal.value(), "");
    }
}
