use chrono::NaiveDateTime;
use serde::Serialize;
use strum_macros::Display;
use utoipa::ToSchema;

use crate::dtr::time::round_hours;

/// One `users LEFT JOIN dtr_records` row for the day being inspected.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TeamStatusRow {
    pub user_id: u64,
    pub username: String,
    pub time_in: Option<NaiveDateTime>,
    pub time_out: Option<NaiveDateTime>,
    pub hours_worked: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, ToSchema)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ShiftState {
    NotStarted,
    OnShift,
    OffShift,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AgentStatus {
    #[schema(example = 7)]
    pub user_id: u64,

    #[schema(example = "maria")]
    pub username: String,

    pub state: ShiftState,

    #[schema(example = "2024-08-06T09:00:00", value_type = Option<String>, format = "date-time")]
    pub first_time_in: Option<NaiveDateTime>,

    #[schema(example = 7.25)]
    pub hours_worked: f64,
}

/// Fold joined rows (ordered by user) into one status per agent.
/// Any open record puts the agent on shift.
pub fn summarize_team(rows: &[TeamStatusRow]) -> Vec<AgentStatus> {
    let mut statuses: Vec<AgentStatus> = Vec::new();

    for row in rows {
        let needs_new = statuses.last().is_none_or(|s| s.user_id != row.user_id);
        if needs_new {
            statuses.push(AgentStatus {
                user_id: row.user_id,
                username: row.username.clone(),
                state: ShiftState::NotStarted,
                first_time_in: None,
                hours_worked: 0.0,
            });
        }
        let Some(status) = statuses.last_mut() else {
            continue;
        };

        let Some(time_in) = row.time_in else {
            continue;
        };

        status.first_time_in = Some(status.first_time_in.map_or(time_in, |t| t.min(time_in)));
        status.hours_worked = round_hours(status.hours_worked + row.hours_worked.unwrap_or(0.0));
        status.state = match (status.state, row.time_out) {
            (ShiftState::OnShift, _) | (_, None) => ShiftState::OnShift,
            _ => ShiftState::OffShift,
        };
    }

    statuses
}
