// src/campaign/template.rs
use anyhow::{Context, Result};
use std::path::Path;
use tokio::fs;
use tracing::info;

use super::{Layout, EXCLUDED_PH_REGION, INTERESTS_LIST, START_DATE, START_TIME};

pub const DEFAULT_TEMPLATE_NAME: &str = "template.csv";

/// Leading apostrophe keeps spreadsheets from reformatting the cell.
const PLACEHOLDER: &str = "'";

const EXAMPLE_INTERESTS: &str =
    "\"[] / Interest1, Interest2, Interest3 / Interest4, Interest5, Interest6\"";

const EXAMPLE_REGIONS: &str = "\"Zamboanga Peninsula,Northern Mindanao,Davao Region,Soccsksargen,Caraga,Autonomous Region in Muslim Mindanao\"";

fn example_cell(column: &str) -> &'static str {
    match column {
        INTERESTS_LIST => EXAMPLE_INTERESTS,
        EXCLUDED_PH_REGION => EXAMPLE_REGIONS,
        START_DATE => "YYYY-MM-DD",
        START_TIME => "HH-MM-SS",
        _ => PLACEHOLDER,
    }
}

/// Header row of the current sheet plus one example row.
pub fn template_csv() -> String {
    let columns = Layout::Current.columns();
    let example: Vec<&str> = columns.iter().map(|c| example_cell(c)).collect();
    [columns.join(","), example.join(",")].join("\n")
}

pub async fn write_template(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    fs::write(path, template_csv())
        .await
        .with_context(|| format!("writing template to {}", path.display()))?;
    info!(path = %path.display(), "wrote template");
    Ok(())
}
