use actix_web::{HttpResponse, web};
use chrono::{Local, NaiveDate};
use serde::Deserialize;
use sqlx::MySqlPool;
use utoipa::IntoParams;

use crate::auth::auth::AuthUser;
use crate::dtr::store;
use crate::error::ApiError;
use crate::model::team_status::summarize_team;

#[derive(Debug, Deserialize, IntoParams)]
pub struct TeamQuery {
    /// Day to inspect, defaults to today
    #[param(value_type = Option<String>, format = "date")]
    pub date: Option<NaiveDate>,
}

/// Shift state of every active agent for one day
#[utoipa::path(
    get,
    path = "/api/team/status",
    params(TeamQuery),
    responses(
        (status = 200, description = "One entry per agent", body = [crate::model::team_status::AgentStatus]),
        (status = 403, description = "Supervisor/Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Team"
)]
pub async fn team_status(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<TeamQuery>,
) -> Result<HttpResponse, ApiError> {
    auth.require_supervisor_or_admin()?;

    let date = query.date.unwrap_or_else(|| Local::now().date_naive());
    let rows = store::team_rows(pool.get_ref(), date).await?;

    Ok(HttpResponse::Ok().json(summarize_team(&rows)))
}
