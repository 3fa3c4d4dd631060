//! Batch result export: one row per processed item, stable and
//! diffable, for observability and replaying failures.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::delivery::DeliveryOutcome;

const HEADER: &str = "payment_id,user_id,content_id,content_name,status,error";

/// Write a timestamped results file under `dir`, returning its path.
pub fn write_report(dir: &Path, outcomes: &[DeliveryOutcome]) -> io::Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let filename = format!(
        "delivery_results_{}.csv",
        Utc::now().format("%Y%m%d_%H%M%S")
    );
    let path = dir.join(filename);
    fs::write(&path, render_rows(outcomes))?;
    Ok(path)
}

/// Render header + rows. Pure so the format can be pinned by tests.
pub fn render_rows(outcomes: &[DeliveryOutcome]) -> String {
    let mut out = String::from(HEADER);
    out.push('\n');

    for outcome in outcomes {
        let fields = [
            escape(&outcome.payment_id),
            outcome.user_id.to_string(),
            outcome
                .content_id
                .map(|id| id.to_string())
                .unwrap_or_default(),
            escape(outcome.content_name.as_deref().unwrap_or("")),
            outcome.status.as_str().to_string(),
            escape(outcome.error.as_deref().unwrap_or("")),
        ];
        out.push_str(&fields.join(","));
        out.push('\n');
    }

    out
}

fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
