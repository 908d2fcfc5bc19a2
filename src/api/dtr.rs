use actix_web::{HttpMessage, HttpRequest, HttpResponse, web};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{debug, info, instrument};
use utoipa::{IntoParams, ToSchema};

use crate::auth::auth::AuthUser;
use crate::config::Config;
use crate::dtr::import::{ImportSummary, import_payload};
use crate::dtr::normalizer::ImportFormat;
use crate::dtr::record::DtrSubmission;
use crate::dtr::store::{self, MySqlDtrStore};
use crate::dtr::time::{hours_between, round_hours};
use crate::error::{ApiError, is_duplicate_key};
use crate::model::dtr::DtrRecord;

#[derive(Debug, Deserialize, IntoParams)]
pub struct DtrQuery {
    /// Page number, from 1
    pub page: Option<u32>,
    /// Items per page (max 100)
    pub per_page: Option<u32>,
    /// Earliest date, inclusive
    #[param(value_type = Option<String>, format = "date")]
    pub from: Option<NaiveDate>,
    /// Latest date, inclusive
    #[param(value_type = Option<String>, format = "date")]
    pub to: Option<NaiveDate>,
    /// Another user's records (supervisor/admin only)
    pub user_id: Option<u64>,
}

#[derive(Serialize, ToSchema)]
pub struct DtrListResponse {
    pub data: Vec<DtrRecord>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 20)]
    pub per_page: u32,
    #[schema(example = 42)]
    pub total: i64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ShiftNote {
    #[schema(example = "Closed three renewals")]
    pub accomplishment: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ImportQuery {
    /// `csv` or `json`; detected from Content-Type or the payload when absent
    pub format: Option<ImportFormat>,
}

/// Create one time record
#[utoipa::path(
    post,
    path = "/api/dtr",
    request_body = DtrSubmission,
    responses(
        (status = 201, description = "Record created", body = Object, example = json!({
            "id": 12, "message": "Record created"
        })),
        (status = 400, description = "timeIn or timeOut not on date"),
        (status = 409, description = "Record already exists for this date and time in")
    ),
    security(("bearer_auth" = [])),
    tag = "DTR"
)]
pub async fn create_record(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<DtrSubmission>,
) -> Result<HttpResponse, ApiError> {
    let record = payload
        .into_inner()
        .validated()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    match store::insert_record(pool.get_ref(), auth.user_id, &record).await {
        Ok(id) => Ok(HttpResponse::Created().json(json!({ "id": id, "message": "Record created" }))),
        Err(e) if is_duplicate_key(&e) => Err(ApiError::Conflict(
            "Record already exists for this date and time in".into(),
        )),
        Err(e) => Err(e.into()),
    }
}

/// List time records, newest first
#[utoipa::path(
    get,
    path = "/api/dtr",
    params(DtrQuery),
    responses(
        (status = 200, description = "Paginated records", body = DtrListResponse),
        (status = 403, description = "Agents can only list their own records")
    ),
    security(("bearer_auth" = [])),
    tag = "DTR"
)]
pub async fn list_records(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<DtrQuery>,
) -> Result<HttpResponse, ApiError> {
    let user_id = auth.subject(query.user_id)?;

    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
    let offset = (page - 1) * per_page;

    debug!(user_id, page, per_page, from = ?query.from, to = ?query.to, "Listing DTR records");

    let total = store::count_records(pool.get_ref(), user_id, query.from, query.to).await?;
    let data = store::list_records(
        pool.get_ref(),
        user_id,
        query.from,
        query.to,
        per_page,
        offset,
    )
    .await?;

    Ok(HttpResponse::Ok().json(DtrListResponse {
        data,
        page,
        per_page,
        total,
    }))
}

/// Start a shift now
#[utoipa::path(
    post,
    path = "/api/dtr/time-in",
    request_body(content = ShiftNote, description = "Optional note"),
    responses(
        (status = 201, description = "Shift started"),
        (status = 409, description = "A shift is already open")
    ),
    security(("bearer_auth" = [])),
    tag = "DTR"
)]
pub async fn time_in(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    note: Option<web::Json<ShiftNote>>,
) -> Result<HttpResponse, ApiError> {
    let now = Local::now().naive_local();
    let record = DtrSubmission {
        date: now.date(),
        time_in: now,
        time_out: None,
        hours_worked: 0.0,
        accomplishment: note
            .and_then(|n| n.into_inner().accomplishment)
            .unwrap_or_default(),
    };

    let id = match store::open_shift(pool.get_ref(), auth.user_id, &record).await {
        Ok(Some(id)) => id,
        Ok(None) => return Err(ApiError::Conflict("A shift is already open".into())),
        Err(e) if is_duplicate_key(&e) => {
            return Err(ApiError::Conflict("A shift is already open".into()));
        }
        Err(e) => return Err(e.into()),
    };

    info!(user_id = auth.user_id, id, "Shift started");
    Ok(HttpResponse::Created().json(json!({ "id": id, "timeIn": now })))
}

/// Close the open shift
#[utoipa::path(
    put,
    path = "/api/dtr/time-out",
    request_body(content = ShiftNote, description = "Optional accomplishment for the shift"),
    responses(
        (status = 200, description = "Shift closed"),
        (status = 400, description = "No open shift")
    ),
    security(("bearer_auth" = [])),
    tag = "DTR"
)]
pub async fn time_out(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    note: Option<web::Json<ShiftNote>>,
) -> Result<HttpResponse, ApiError> {
    let open = store::find_open_record(pool.get_ref(), auth.user_id)
        .await?
        .ok_or_else(|| ApiError::BadRequest("No open shift found".into()))?;

    let now = Local::now().naive_local();
    let hours_worked = round_hours(hours_between(open.time_in, now));
    let accomplishment = note.and_then(|n| n.into_inner().accomplishment);

    let closed = store::close_record(
        pool.get_ref(),
        open.id,
        now,
        hours_worked,
        accomplishment.as_deref(),
    )
    .await?;
    if !closed {
        return Err(ApiError::BadRequest("No open shift found".into()));
    }

    info!(user_id = auth.user_id, id = open.id, hours_worked, "Shift closed");
    Ok(HttpResponse::Ok().json(json!({
        "id": open.id,
        "timeOut": now,
        "hoursWorked": hours_worked,
    })))
}

/// Import a CSV or JSON time-record file
#[utoipa::path(
    post,
    path = "/api/dtr/import",
    params(ImportQuery),
    request_body(content = String, description = "Raw CSV or JSON file contents", content_type = "text/csv"),
    responses(
        (status = 200, description = "Per-row outcome", body = ImportSummary),
        (status = 400, description = "File shape rejected (missing columns, non-array JSON)"),
        (status = 413, description = "File too large")
    ),
    security(("bearer_auth" = [])),
    tag = "DTR"
)]
#[instrument(name = "dtr_import", skip_all, fields(user_id = auth.user_id, bytes = body.len()))]
pub async fn import_records(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    req: HttpRequest,
    query: web::Query<ImportQuery>,
    body: String,
) -> Result<HttpResponse, ApiError> {
    let format = query
        .format
        .or_else(|| ImportFormat::from_content_type(req.content_type()))
        .unwrap_or_else(|| ImportFormat::sniff(&body));

    let sink = MySqlDtrStore::new(pool.get_ref(), auth.user_id);
    let summary = import_payload(&sink, &body, format, &config.dtr_aliases).await?;

    Ok(HttpResponse::Ok().json(summary))
}
