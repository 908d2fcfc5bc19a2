use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DtrRecord {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = 7)]
    pub user_id: u64,

    #[schema(example = "2024-08-06", value_type = String, format = "date")]
    pub date: NaiveDate,

    #[schema(example = "2024-08-06T09:00:00", value_type = String, format = "date-time")]
    pub time_in: NaiveDateTime,

    #[schema(example = "2024-08-06T17:30:00", value_type = Option<String>, format = "date-time")]
    pub time_out: Option<NaiveDateTime>,

    #[schema(example = 8.5)]
    pub hours_worked: f64,

    #[schema(example = "Completed project documentation")]
    pub accomplishment: String,
}

