use actix_web::{HttpResponse, web};
use serde::Deserialize;
use serde_json::json;
use sqlx::MySqlPool;
use tracing::info;
use utoipa::IntoParams;

use crate::auth::auth::AuthUser;
use crate::error::{ApiError, is_duplicate_key};
use crate::model::nap_report::{CreateNapReport, NapReport};
use crate::utils::nap_totals::monthly_totals;

#[derive(Debug, Deserialize, IntoParams)]
pub struct NapTotalsQuery {
    /// Agent to summarize, defaults to the caller
    pub agent_id: Option<u64>,
    /// Calendar year
    pub year: i32,
}

/// Store one extracted NAP report
#[utoipa::path(
    post,
    path = "/api/nap",
    request_body = CreateNapReport,
    responses(
        (status = 201, description = "Report stored"),
        (status = 400, description = "Negative premium"),
        (status = 403, description = "Supervisor/Admin only"),
        (status = 409, description = "A report for this agent and date already exists")
    ),
    security(("bearer_auth" = [])),
    tag = "NAP"
)]
pub async fn create_report(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateNapReport>,
) -> Result<HttpResponse, ApiError> {
    auth.require_supervisor_or_admin()?;

    if !payload.premium.is_finite() || payload.premium < 0.0 {
        return Err(ApiError::BadRequest("premium must be a non-negative number".into()));
    }

    let result = sqlx::query(
        r#"
        INSERT INTO nap_reports (agent_id, report_date, calls, contacts, sales, lapses, premium)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(payload.agent_id)
    .bind(payload.report_date)
    .bind(payload.calls)
    .bind(payload.contacts)
    .bind(payload.sales)
    .bind(payload.lapses)
    .bind(payload.premium)
    .execute(pool.get_ref())
    .await;

    match result {
        Ok(done) => {
            info!(agent_id = payload.agent_id, report_date = %payload.report_date, "NAP report stored");
            Ok(HttpResponse::Created().json(json!({ "id": done.last_insert_id() })))
        }
        Err(e) if is_duplicate_key(&e) => Err(ApiError::Conflict(
            "A report for this agent and date already exists".into(),
        )),
        Err(e) => Err(e.into()),
    }
}

/// Monthly NAP totals for one agent and year
#[utoipa::path(
    get,
    path = "/api/nap/totals",
    params(NapTotalsQuery),
    responses(
        (status = 200, description = "Totals per month, oldest first", body = [crate::utils::nap_totals::MonthlyTotals]),
        (status = 403, description = "Agents can only see their own totals")
    ),
    security(("bearer_auth" = [])),
    tag = "NAP"
)]
pub async fn totals(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<NapTotalsQuery>,
) -> Result<HttpResponse, ApiError> {
    let agent_id = auth.subject(query.agent_id)?;

    let reports = sqlx::query_as::<_, NapReport>(
        r#"
        SELECT id, agent_id, report_date, calls, contacts, sales, lapses, premium
        FROM nap_reports
        WHERE agent_id = ? AND YEAR(report_date) = ?
        ORDER BY report_date
        "#,
    )
    .bind(agent_id)
    .bind(query.year)
    .fetch_all(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(monthly_totals(&reports)))
}
