//! Turns a CSV or JSON time-record file into validated attendance records.
//!
//! Both sources are first collapsed into [`RawRow`]s so validation is the
//! same whatever the file looked like. Row problems are collected and never
//! stop the batch; only a malformed file shape does.

use serde::Deserialize;
use serde_json::Value;
use strum_macros::{Display, EnumString};
use thiserror::Error;
use tracing::debug;
use utoipa::ToSchema;

use super::aliases::{Field, HeaderAliases};
use super::csv::split_line;
use super::record::{AttendanceRecord, RawRow};
use super::time::{TimeParseError, hours_between, parse_date, parse_time_on};
use crate::error::ImportError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Deserialize, ToSchema)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum ImportFormat {
    Csv,
    Json,
}

impl ImportFormat {
    /// Guess from the payload: a leading `[` or `{` means JSON.
    pub fn sniff(payload: &str) -> Self {
        match payload.trim_start_matches('\u{feff}').trim_start().chars().next() {
            Some('[') | Some('{') => ImportFormat::Json,
            _ => ImportFormat::Csv,
        }
    }

    pub fn from_content_type(mime: &str) -> Option<Self> {
        let mime = mime.to_ascii_lowercase();
        if mime.contains("json") {
            Some(ImportFormat::Json)
        } else if mime.contains("csv") {
            Some(ImportFormat::Csv)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowIssue {
    #[error("Missing date or timeIn")]
    MissingRequired,

    #[error("Expected an object")]
    NotAnObject,

    #[error("Invalid date '{0}'")]
    InvalidDate(String),

    #[error("Invalid {field} '{value}'")]
    InvalidTime { field: &'static str, value: String },

    #[error("timeOut is earlier than timeIn, hoursWorked set to 0")]
    NegativeDuration,

    #[error("{0}")]
    Rejected(String),
}

/// A row-numbered error or warning, rendered as `Row N: reason`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Row {row}: {issue}")]
pub struct RowDiagnostic {
    pub row: usize,
    pub issue: RowIssue,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NumberedRecord {
    pub row: usize,
    pub record: AttendanceRecord,
}

#[derive(Debug, Default)]
pub struct Normalized {
    pub records: Vec<NumberedRecord>,
    pub errors: Vec<RowDiagnostic>,
    pub warnings: Vec<RowDiagnostic>,
}

pub fn normalize(
    payload: &str,
    format: ImportFormat,
    aliases: &HeaderAliases,
) -> Result<Normalized, ImportError> {
    let rows = match format {
        ImportFormat::Csv => csv_rows(payload, aliases)?,
        ImportFormat::Json => json_rows(payload, aliases)?,
    };

    let mut out = Normalized::default();
    for row in rows {
        let raw = match row {
            Ok(raw) => raw,
            Err(diagnostic) => {
                out.errors.push(diagnostic);
                continue;
            }
        };

        match normalize_row(&raw) {
            Ok((record, warning)) => {
                if let Some(issue) = warning {
                    out.warnings.push(RowDiagnostic { row: raw.row, issue });
                }
                out.records.push(NumberedRecord { row: raw.row, record });
            }
            Err(issue) => out.errors.push(RowDiagnostic { row: raw.row, issue }),
        }
    }

    debug!(
        accepted = out.records.len(),
        errors = out.errors.len(),
        warnings = out.warnings.len(),
        %format,
        "Normalized DTR payload"
    );

    Ok(out)
}

/// Validate a single collapsed row. A clamped negative duration comes back
/// as a warning alongside the record.
pub fn normalize_row(raw: &RawRow) -> Result<(AttendanceRecord, Option<RowIssue>), RowIssue> {
    if raw.date.is_empty() || raw.time_in.is_empty() {
        return Err(RowIssue::MissingRequired);
    }

    let date = parse_date(&raw.date).map_err(|e| match e {
        TimeParseError::InvalidDate(value) | TimeParseError::InvalidTime(value) => {
            RowIssue::InvalidDate(value)
        }
    })?;

    let time_in = parse_time_on(date, &raw.time_in).map_err(|_| RowIssue::InvalidTime {
        field: "timeIn",
        value: raw.time_in.clone(),
    })?;

    let time_out = if raw.time_out.is_empty() {
        None
    } else {
        Some(
            parse_time_on(date, &raw.time_out).map_err(|_| RowIssue::InvalidTime {
                field: "timeOut",
                value: raw.time_out.clone(),
            })?,
        )
    };

    let (hours_worked, warning) = match time_out {
        Some(out) if out < time_in => (0.0, Some(RowIssue::NegativeDuration)),
        Some(out) => (hours_between(time_in, out), None),
        None => (0.0, None),
    };

    let record = AttendanceRecord {
        date,
        time_in,
        time_out,
        hours_worked,
        accomplishment: raw.accomplishment.clone(),
    };

    Ok((record, warning))
}

type RowSlot = Result<RawRow, RowDiagnostic>;

fn csv_rows(payload: &str, aliases: &HeaderAliases) -> Result<Vec<RowSlot>, ImportError> {
    let mut lines = payload
        .trim_start_matches('\u{feff}')
        .lines()
        .filter(|line| !line.trim().is_empty());

    let columns: Vec<Option<Field>> = lines
        .next()
        .map(split_line)
        .unwrap_or_default()
        .iter()
        .map(|name| aliases.resolve(name))
        .collect();

    let missing: Vec<String> = Field::REQUIRED
        .iter()
        .filter(|field| !columns.contains(&Some(**field)))
        .map(ToString::to_string)
        .collect();
    if !missing.is_empty() {
        return Err(ImportError::MissingColumns(missing));
    }

    let mut rows = Vec::new();
    for (index, line) in lines.enumerate() {
        let mut raw = RawRow::new(index + 1);
        for (column, value) in columns.iter().zip(split_line(line)) {
            if let Some(field) = column {
                raw.set(*field, value);
            }
        }

        if raw.lacks_date_and_time_in() {
            debug!(row = raw.row, "Skipping CSV row without date and timeIn");
            continue;
        }
        rows.push(Ok(raw));
    }

    Ok(rows)
}

fn json_rows(payload: &str, aliases: &HeaderAliases) -> Result<Vec<RowSlot>, ImportError> {
    let root: Value = serde_json::from_str(payload.trim_start_matches('\u{feff}'))
        .map_err(|e| ImportError::InvalidJson(e.to_string()))?;

    let Value::Array(items) = root else {
        return Err(ImportError::NotAnArray);
    };

    let rows = items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            let row = index + 1;
            let Value::Object(object) = item else {
                return Err(RowDiagnostic {
                    row,
                    issue: RowIssue::NotAnObject,
                });
            };

            let mut raw = RawRow::new(row);
            for (key, value) in object {
                if let Some(field) = aliases.resolve(&key) {
                    raw.set(field, cell_text(value));
                }
            }
            Ok(raw)
        })
        .collect();

    Ok(rows)
}

fn cell_text(value: Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.trim().to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};

    fn run(payload: &str, format: ImportFormat) -> Normalized {
        normalize(payload, format, &HeaderAliases::default()).unwrap()
    }

    fn messages(diagnostics: &[RowDiagnostic]) -> Vec<String> {
        diagnostics.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn csv_sample_file() {
        let csv = "date,timeIn,timeOut,accomplishment\n\
                   2024-08-06,09:00 AM,05:30 PM,Completed project documentation\n\
                   2024-08-07,08:30 AM,,Started new feature development\n";
        let out = run(csv, ImportFormat::Csv);

        assert!(out.errors.is_empty());
        assert_eq!(out.records.len(), 2);

        let first = &out.records[0].record;
        assert_eq!(out.records[0].row, 1);
        assert!((first.hours_worked - 8.5).abs() < 1e-9);
        assert_eq!(first.accomplishment, "Completed project documentation");

        let second = &out.records[1].record;
        assert_eq!(out.records[1].row, 2);
        assert_eq!(second.hours_worked, 0.0);
        assert_eq!(second.time_out, None);
    }

    #[test]
    fn time_in_stays_on_the_row_date() {
        let csv = "Date,Time In,Time Out,Notes\n2024-03-10,12:30 AM,11:45 PM,late night\n";
        let out = run(csv, ImportFormat::Csv);
        let record = &out.records[0].record;

        let day = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        assert_eq!(record.date, day);
        assert_eq!(record.time_in, day.and_time(NaiveTime::from_hms_opt(0, 30, 0).unwrap()));
        assert_eq!(record.time_out.unwrap().date(), day);
        assert_eq!(record.accomplishment, "late night");
    }

    #[test]
    fn reversed_times_clamp_with_warning() {
        let csv = "date,timein,timeout\n2024-08-06,17:00,09:00\n";
        let out = run(csv, ImportFormat::Csv);

        assert_eq!(out.records.len(), 1);
        assert_eq!(out.records[0].record.hours_worked, 0.0);
        assert!(out.errors.is_empty());
        assert_eq!(
            messages(&out.warnings),
            vec!["Row 1: timeOut is earlier than timeIn, hoursWorked set to 0"]
        );
    }

    #[test]
    fn bad_rows_do_not_stop_the_batch() {
        let csv = "date,timein,timeout,accomplishment\n\
                   2024-08-05,09:00 AM,05:00 PM,ok\n\
                   2024-08-06,,05:00 PM,no start\n\
                   2024-02-30,09:00 AM,,bad day\n\
                   2024-08-07,9 o'clock,,bad time\n\
                   2024-08-08,09:00 AM,25:00,bad end\n\
                   2024-08-09,10:00,18:00,ok again\n";
        let out = run(csv, ImportFormat::Csv);

        assert_eq!(
            out.records.iter().map(|r| r.row).collect::<Vec<_>>(),
            vec![1, 6]
        );
        assert_eq!(
            messages(&out.errors),
            vec![
                "Row 2: Missing date or timeIn",
                "Row 3: Invalid date '2024-02-30'",
                "Row 4: Invalid timeIn '9 o'clock'",
                "Row 5: Invalid timeOut '25:00'",
            ]
        );
    }

    #[test]
    fn rows_without_date_and_time_in_are_dropped_silently() {
        let csv = "date,timein,timeout,notes\n\n,,,stray note\n2024-08-06,09:00,,\n  \n";
        let out = run(csv, ImportFormat::Csv);

        assert!(out.errors.is_empty());
        assert_eq!(out.records.len(), 1);
        assert_eq!(out.records[0].row, 2);
    }

    #[test]
    fn quoted_accomplishments_keep_commas() {
        let csv = "date,timein,timeout,accomplishment\r\n\
                   08/06/2024,9:00 am,5:00 pm,\"Calls, emails, follow-ups\"\r\n";
        let out = run(csv, ImportFormat::Csv);
        assert_eq!(out.records[0].record.accomplishment, "Calls, emails, follow-ups");
    }

    #[test]
    fn missing_required_headers_abort() {
        let err = normalize("date,notes\n2024-08-06,hi\n", ImportFormat::Csv, &HeaderAliases::default())
            .unwrap_err();
        assert_eq!(err, ImportError::MissingColumns(vec!["timein".into()]));

        let err = normalize("notes\nhi\n", ImportFormat::Csv, &HeaderAliases::default()).unwrap_err();
        assert_eq!(
            err,
            ImportError::MissingColumns(vec!["date".into(), "timein".into()])
        );

        let err = normalize("", ImportFormat::Csv, &HeaderAliases::default()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Missing required columns: date, timein"
        );
    }

    #[test]
    fn json_invalid_month() {
        let out = run(r#"[{"date":"2024-13-01","timeIn":"09:00 AM"}]"#, ImportFormat::Json);
        assert!(out.records.is_empty());
        assert_eq!(messages(&out.errors), vec!["Row 1: Invalid date '2024-13-01'"]);
    }

    #[test]
    fn json_rows_use_aliases_and_reject_empties() {
        let json = r#"[
            {"Date": "08/06/2024", "Time In": "9:15 AM", "Time Out": "6:00 PM", "notes": "demo"},
            {"date": "2024-08-07", "timeIn": ""},
            "not a row",
            {"date": "2024-08-08T08:00:00", "timein": "08:00", "timeout": null, "accomplishment": 42}
        ]"#;
        let out = run(json, ImportFormat::Json);

        assert_eq!(
            messages(&out.errors),
            vec!["Row 2: Missing date or timeIn", "Row 3: Expected an object"]
        );
        assert_eq!(out.records.len(), 2);
        assert!((out.records[0].record.hours_worked - 8.75).abs() < 1e-9);
        assert_eq!(out.records[0].record.accomplishment, "demo");
        assert_eq!(out.records[1].row, 4);
        assert_eq!(
            out.records[1].record.date,
            NaiveDate::from_ymd_opt(2024, 8, 8).unwrap()
        );
        assert_eq!(out.records[1].record.accomplishment, "42");
    }

    #[test]
    fn json_root_must_be_an_array() {
        let aliases = HeaderAliases::default();
        assert_eq!(
            normalize(r#"{"date":"2024-08-06"}"#, ImportFormat::Json, &aliases).unwrap_err(),
            ImportError::NotAnArray
        );
        assert!(matches!(
            normalize("[{", ImportFormat::Json, &aliases).unwrap_err(),
            ImportError::InvalidJson(_)
        ));
    }

    #[test]
    fn extra_aliases_are_honoured() {
        let aliases = HeaderAliases::default().with_alias("Clock In", Field::TimeIn);
        let out = normalize("date,clock in\n2024-08-06,08:00\n", ImportFormat::Csv, &aliases).unwrap();
        assert_eq!(out.records.len(), 1);
    }

    #[test]
    fn format_detection() {
        assert_eq!(ImportFormat::sniff("  [ {} ]"), ImportFormat::Json);
        assert_eq!(ImportFormat::sniff("date,timein"), ImportFormat::Csv);
        assert_eq!(
            ImportFormat::from_content_type("application/json; charset=utf-8"),
            Some(ImportFormat::Json)
        );
        assert_eq!(ImportFormat::from_content_type("text/csv"), Some(ImportFormat::Csv));
        assert_eq!(ImportFormat::from_content_type("text/plain"), None);
    }
}
