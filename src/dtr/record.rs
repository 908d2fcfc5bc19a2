use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use super::aliases::Field;
use super::time::{hours_between, round_hours};

/// A data row from either source, keyed by logical field, before validation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRow {
    /// 1-based position in the source file.
    pub row: usize,
    pub date: String,
    pub time_in: String,
    pub time_out: String,
    pub accomplishment: String,
}

impl RawRow {
    pub fn new(row: usize) -> Self {
        Self {
            row,
            ..Self::default()
        }
    }

    /// Store a cell. When two columns map to the same field the first
    /// non-empty value is kept.
    pub fn set(&mut self, field: Field, value: String) {
        let slot = match field {
            Field::Date => &mut self.date,
            Field::TimeIn => &mut self.time_in,
            Field::TimeOut => &mut self.time_out,
            Field::Accomplishment => &mut self.accomplishment,
        };
        if slot.is_empty() {
            *slot = value;
        }
    }

    pub fn lacks_date_and_time_in(&self) -> bool {
        self.date.is_empty() && self.time_in.is_empty()
    }
}

/// Canonical attendance record produced by the normalizer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub date: NaiveDate,
    pub time_in: NaiveDateTime,
    pub time_out: Option<NaiveDateTime>,
    pub hours_worked: f64,
    pub accomplishment: String,
}

impl AttendanceRecord {
    pub fn to_submission(&self) -> DtrSubmission {
        DtrSubmission {
            date: self.date,
            time_in: self.time_in,
            time_out: self.time_out,
            hours_worked: round_hours(self.hours_worked),
            accomplishment: self.accomplishment.clone(),
        }
    }
}

/// Wire shape accepted by the record-creation endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DtrSubmission {
    #[schema(example = "2024-08-06", value_type = String, format = "date")]
    pub date: NaiveDate,

    #[schema(example = "2024-08-06T09:00:00", value_type = String, format = "date-time")]
    pub time_in: NaiveDateTime,

    #[schema(example = "2024-08-06T17:30:00", value_type = Option<String>, format = "date-time")]
    pub time_out: Option<NaiveDateTime>,

    /// Recomputed from the two times on create; any client value is ignored.
    #[serde(default)]
    #[schema(example = 8.5)]
    pub hours_worked: f64,

    #[serde(default)]
    #[schema(example = "Completed project documentation")]
    pub accomplishment: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("timeIn {time_in} is not on date {date}")]
    TimeInOffDate { date: NaiveDate, time_in: NaiveDateTime },

    #[error("timeOut {time_out} is not on date {date}")]
    TimeOutOffDate { date: NaiveDate, time_out: NaiveDateTime },
}

impl DtrSubmission {
    /// Apply the import rules to a record sent directly: both times must fall
    /// on `date`, and `hours_worked` is derived from them, floored at zero.
    pub fn validated(mut self) -> Result<Self, RecordError> {
        if self.time_in.date() != self.date {
            return Err(RecordError::TimeInOffDate {
                date: self.date,
                time_in: self.time_in,
            });
        }

        if let Some(time_out) = self.time_out {
            if time_out.date() != self.date {
                return Err(RecordError::TimeOutOffDate {
                    date: self.date,
                    time_out,
                });
            }
        }

        self.hours_worked = match self.time_out {
            Some(time_out) => round_hours(hours_between(self.time_in, time_out)),
            None => 0.0,
        };

        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn at(day: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 8, day)
            .unwrap()
            .and_time(NaiveTime::from_hms_opt(h, m, 0).unwrap())
    }

    fn submission(time_in: NaiveDateTime, time_out: Option<NaiveDateTime>, hours: f64) -> DtrSubmission {
        DtrSubmission {
            date: NaiveDate::from_ymd_opt(2024, 8, 6).unwrap(),
            time_in,
            time_out,
            hours_worked: hours,
            accomplishment: String::new(),
        }
    }

    #[test]
    fn validated_recomputes_client_hours() {
        let record = submission(at(6, 9, 0), Some(at(6, 17, 30)), 99.0).validated().unwrap();
        assert_eq!(record.hours_worked, 8.5);

        let open = submission(at(6, 9, 0), None, 4.0).validated().unwrap();
        assert_eq!(open.hours_worked, 0.0);
    }

    #[test]
    fn validated_clamps_reversed_times() {
        let record = submission(at(6, 17, 0), Some(at(6, 8, 0)), 99.0).validated().unwrap();
        assert_eq!(record.hours_worked, 0.0);
    }

    #[test]
    fn validated_rejects_times_off_the_date() {
        let err = submission(at(9, 9, 0), Some(at(6, 8, 0)), 99.0).validated().unwrap_err();
        assert_eq!(
            err,
            RecordError::TimeInOffDate {
                date: NaiveDate::from_ymd_opt(2024, 8, 6).unwrap(),
                time_in: at(9, 9, 0),
            }
        );

        let err = submission(at(6, 22, 0), Some(at(7, 6, 0)), 8.0).validated().unwrap_err();
        assert_eq!(err.to_string(), "timeOut 2024-08-07 06:00:00 is not on date 2024-08-06");
    }

    #[test]
    fn first_non_empty_value_wins() {
        let mut row = RawRow::new(1);
        row.set(Field::Accomplishment, String::new());
        row.set(Field::Accomplishment, "Calls".into());
        row.set(Field::Accomplishment, "Emails".into());
        assert_eq!(row.accomplishment, "Calls");
    }

    #[test]
    fn submission_rounds_hours_and_uses_camel_case() {
        let date = NaiveDate::from_ymd_opt(2024, 8, 6).unwrap();
        let record = AttendanceRecord {
            date,
            time_in: date.and_time(NaiveTime::from_hms_opt(9, 0, 0).unwrap()),
            time_out: Some(date.and_time(NaiveTime::from_hms_opt(9, 20, 0).unwrap())),
            hours_worked: 20.0 / 60.0,
            accomplishment: "Standup".into(),
        };

        let json = serde_json::to_value(record.to_submission()).unwrap();
        assert_eq!(json["date"], "2024-08-06");
        assert_eq!(json["timeIn"], "2024-08-06T09:00:00");
        assert_eq!(json["timeOut"], "2024-08-06T09:20:00");
        assert_eq!(json["hoursWorked"], 0.33);
        assert_eq!(json["accomplishment"], "Standup");
    }
}
