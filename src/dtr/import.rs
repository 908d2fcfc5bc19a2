use serde::Serialize;
use tracing::{info, warn};
use utoipa::ToSchema;

use super::aliases::HeaderAliases;
use super::normalizer::{ImportFormat, Normalized, NumberedRecord, RowDiagnostic, RowIssue, normalize};
use super::record::DtrSubmission;
use crate::error::ImportError;

/// Where accepted records go. `Err` carries the reason the record was refused.
pub trait DtrSink {
    async fn submit(&self, record: &DtrSubmission) -> Result<(), String>;
}

#[derive(Debug, Default, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    #[schema(example = 2)]
    pub accepted_count: usize,

    #[schema(example = json!(["Row 3: Invalid date '2024-13-01'"]))]
    pub errors: Vec<String>,

    #[schema(example = json!(["Row 4: timeOut is earlier than timeIn, hoursWorked set to 0"]))]
    pub warnings: Vec<String>,
}

/// Submit every normalized record in file order, one at a time.
///
/// Parse errors come first in the summary; submission failures are appended
/// after them as they happen.
pub async fn submit_all<S: DtrSink>(sink: &S, normalized: Normalized) -> ImportSummary {
    let Normalized {
        records,
        errors,
        warnings,
    } = normalized;

    let mut summary = ImportSummary {
        accepted_count: 0,
        errors: errors.iter().map(ToString::to_string).collect(),
        warnings: warnings.iter().map(ToString::to_string).collect(),
    };

    for NumberedRecord { row, record } in records {
        match sink.submit(&record.to_submission()).await {
            Ok(()) => summary.accepted_count += 1,
            Err(reason) => {
                warn!(row, reason = %reason, "DTR row rejected on submit");
                let diagnostic = RowDiagnostic {
                    row,
                    issue: RowIssue::Rejected(reason),
                };
                summary.errors.push(diagnostic.to_string());
            }
        }
    }

    summary
}

/// Normalize `payload` and submit the result to `sink`.
pub async fn import_payload<S: DtrSink>(
    sink: &S,
    payload: &str,
    format: ImportFormat,
    aliases: &HeaderAliases,
) -> Result<ImportSummary, ImportError> {
    let normalized = normalize(payload, format, aliases)?;
    let summary = submit_all(sink, normalized).await;

    info!(
        %format,
        accepted = summary.accepted_count,
        errors = summary.errors.len(),
        warnings = summary.warnings.len(),
        "DTR import finished"
    );

    Ok(summary)
}
