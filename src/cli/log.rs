use super::ui;
use crate::core::rate::TIMESTAMP_FORMAT;
use crate::store::ObservationLog;
use anyhow::{Context, Result};

/// Prints every logged observation, oldest first.
pub fn run(log: &ObservationLog) -> Result<()> {
    let observations = log
        .read_all()
        .with_context(|| format!("Failed to read {}", log.path().display()))?;

    if observations.is_empty() {
        println!("No log data yet.");
        return Ok(());
    }

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Timestamp"),
        ui::header_cell("Currency"),
        ui::header_cell("Name"),
        ui::header_cell("Visa"),
        ui::header_cell("Benchmark"),
        ui::header_cell("Markup %"),
    ]);
    for obs in &observations {
        table.add_row(vec![
            comfy_table::Cell::new(obs.timestamp.format(TIMESTAMP_FORMAT)),
            comfy_table::Cell::new(obs.currency),
            comfy_table::Cell::new(&obs.currency_name),
            ui::number_cell(&obs.visa_rate.to_string()),
            ui::number_cell(&obs.benchmark_rate.to_string()),
            ui::markup_cell(&format!("{:.4}", obs.markup_percent), obs.markup_percent),
        ]);
    }

    println!("{table}");
    println!(
        "{}",
        ui::style_text(
            &format!("{} observations in {}", observations.len(), log.path().display()),
            ui::StyleType::Subtle
        )
    );
    Ok(())
}
