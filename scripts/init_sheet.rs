//! Writes the column header into the configured worksheet.
//!
//! Run once per new worksheet: cargo run --bin init_sheet
//! Rows appended afterwards line up under Timestamp .. JUSTIFICATIVA.

use fractal_form::config::Config;
use fractal_form::models::SHEET_COLUMNS;
use fractal_form::storage::{GoogleSheetsStore, SheetStore};
use fractal_form::telemetry::init_tracing;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _log_guard = init_tracing(None);
    let config = Config::load()?;

    let store = GoogleSheetsStore::connect(&config).await?;
    store.write_header().await?;

    info!(
        "✅ Header ({} columns) written to '{}' / '{}'",
        SHEET_COLUMNS.len(),
        config.spreadsheet_name,
        config.worksheet_name
    );
    Ok(())
}
