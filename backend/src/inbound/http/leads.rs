//! Public lead intake.
//!
//! ```text
//! POST /api/v1/public/leads
//! ```
//!
//! Mounted outside every module gate and open to anonymous visitors. The
//! submitted contact opens a deal in the entry stage owned by the system user.

use actix_web::{post, web, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::crm::PublicLead;
use crate::domain::Error;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{require, FieldName};
use crate::inbound::http::ApiResult;

/// Contact form submission.
#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PublicLeadBody {
    #[schema(example = "Marta")]
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[schema(example = "marta@example.co")]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub message: Option<String>,
    #[schema(example = "web")]
    pub source: Option<String>,
    pub source_detail: Option<String>,
}

impl TryFrom<PublicLeadBody> for PublicLead {
    type Error = Error;

    fn try_from(body: PublicLeadBody) -> Result<Self, Self::Error> {
        Ok(PublicLead {
            first_name: require(body.first_name, FieldName::new("firstName"))?,
            last_name: body.last_name.unwrap_or_default(),
            email: require(body.email, FieldName::new("email"))?,
            phone: body.phone,
            company: body.company,
            message: body.message,
            source: body.source,
            source_detail: body.source_detail,
        })
    }
}

/// Acknowledgement returned to the visitor. Carries no deal data.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeadReceivedResponse {
    pub id: String,
    #[schema(example = "lead")]
    pub stage: String,
    pub received_at: String,
}

/// Open a deal from an anonymous contact form.
#[utoipa::path(
    post,
    path = "/api/v1/public/leads",
    request_body = PublicLeadBody,
    responses(
        (status = 201, description = "Lead captured", body = LeadReceivedResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["leads"],
    operation_id = "capturePublicLead",
    security(())
)]
#[post("/leads")]
pub async fn capture_lead(
    state: web::Data<HttpState>,
    payload: web::Json<PublicLeadBody>,
) -> ApiResult<HttpResponse> {
    let lead = PublicLead::try_from(payload.into_inner())?;
    let deal = state.deals.capture_lead(lead).await?;
    Ok(HttpResponse::Created().json(LeadReceivedResponse {
        id: deal.id().to_string(),
        stage: deal.stage().to_string(),
        received_at: deal.created_at().to_rfc3339(),
    }))
}

#[cfg(test)]
mod tests {
    use actix_web::http::StatusCode;
    use actix_web::{test as actix_test, web, App};
    use chrono::{DateTime, TimeZone, Utc};
    use rstest::{fixture, rstest};
    use serde_json::{json, Value};

    use crate::domain::ports::DealFilter;
    use crate::inbound::http::api_services;
    use crate::inbound::http::error::configure_extractors;
    use crate::inbound::http::test_utils::{memory_state, test_session_middleware};

    #[fixture]
    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 9, 30, 0)
            .single()
            .expect("valid instant")
    }

    async fn submit(now: DateTime<Utc>, body: Value) -> (StatusCode, Value, Vec<String>) {
        let state = memory_state(now);
        let query = state.deals_query.clone();
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(configure_extractors)
                .wrap(test_session_middleware())
                .service(web::scope("/api/v1").configure(api_services)),
        )
        .await;
        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri("/api/v1/public/leads")
                .set_json(body)
                .to_request(),
        )
        .await;
        let status = res.status();
        let value: Value = actix_test::read_body_json(res).await;
        let names = query
            .list_deals(DealFilter::default())
            .await
            .expect("list deals")
            .into_iter()
            .map(|view| view.deal.name().to_owned())
            .collect();
        (status, value, names)
    }

    #[rstest]
    #[actix_web::test]
    async fn anonymous_visitor_opens_a_lead(now: DateTime<Utc>) {
        let (status, body, names) = submit(
            now,
            json!({
                "firstName": "Marta",
                "lastName": "Gómez",
                "email": "marta@panaderia.co",
                "company": "Panadería La Espiga",
                "sourceDetail": "landing navidad"
            }),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        assert_eq!(body["stage"], "lead");
        assert_eq!(body["receivedAt"], now.to_rfc3339());
        assert!(body.get("value").is_none());
        assert_eq!(names, ["Marta Gómez"]);
    }

    #[rstest]
    #[case::missing_email(json!({ "firstName": "Marta" }), "email", "missing_field")]
    #[case::blank_name(json!({ "firstName": "  ", "email": "m@x.co" }), "firstName", "empty")]
    #[case::bad_email(json!({ "firstName": "Marta", "email": "marta" }), "email", "invalid_email")]
    #[actix_web::test]
    async fn invalid_submission_stores_nothing(
        now: DateTime<Utc>,
        #[case] body: Value,
        #[case] field: &str,
        #[case] code: &str,
    ) {
        let (status, error, names) = submit(now, body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{error}");
        assert_eq!(error["details"]["field"], field);
        assert_eq!(error["details"]["code"], code);
        assert!(names.is_empty());
    }
}
