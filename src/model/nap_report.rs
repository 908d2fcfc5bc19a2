use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Per-agent performance figures for one reporting day, already extracted
/// from the source PDF.
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
pub struct NapReport {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = 7)]
    pub agent_id: u64,

    #[schema(example = "2024-08-06", value_type = String, format = "date")]
    pub report_date: NaiveDate,

    #[schema(example = 120)]
    pub calls: u32,

    #[schema(example = 45)]
    pub contacts: u32,

    #[schema(example = 6)]
    pub sales: u32,

    #[schema(example = 1)]
    pub lapses: u32,

    #[schema(example = 1520.5)]
    pub premium: f64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateNapReport {
    #[schema(example = 7)]
    pub agent_id: u64,

    #[schema(example = "2024-08-06", value_type = String, format = "date")]
    pub report_date: NaiveDate,

    #[schema(example = 120)]
    pub calls: u32,

    #[serde(default)]
    #[schema(example = 45)]
    pub contacts: u32,

    #[schema(example = 6)]
    pub sales: u32,

    #[serde(default)]
    #[schema(example = 1)]
    pub lapses: u32,

    #[serde(default)]
    #[schema(example = 1520.5)]
    pub premium: f64,
}
