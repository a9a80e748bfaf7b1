use super::ui;
use crate::core::cache::RateCacheService;
use crate::core::currency::CurrencyCode;
use crate::view::{self, RatesView};
use chrono::Utc;

/// Refreshes stale rates once and prints them as a table.
pub async fn run(
    cache: &RateCacheService,
    currencies: &[CurrencyCode],
    trend_window: usize,
) -> anyhow::Result<()> {
    let pb = ui::new_progress_bar(currencies.len() as u64);
    pb.set_message("Fetching rates");
    let view = view::rates_view(cache, currencies, trend_window, Utc::now(), &|_| pb.inc(1)).await;
    pb.finish_and_clear();

    display(&view);
    Ok(())
}

fn display(view: &RatesView) {
    println!(
        "\n{}",
        ui::style_text("Visa FX Rate Tracker", ui::StyleType::Title)
    );

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Currency"),
        ui::header_cell("Currency Name"),
        ui::header_cell("Visa Rate"),
        ui::header_cell("Benchmark Rate"),
        ui::header_cell("Markup"),
        ui::header_cell("Trend"),
    ]);

    for row in &view.rows {
        match row.markup_value {
            Some(markup) => table.add_row(vec![
                comfy_table::Cell::new(&row.currency),
                comfy_table::Cell::new(&row.name),
                ui::number_cell(&row.visa_rate),
                ui::number_cell(&row.benchmark_rate),
                ui::markup_cell(&row.markup, markup),
                comfy_table::Cell::new(&row.trend),
            ]),
            None => table.add_row(vec![
                comfy_table::Cell::new(&row.currency),
                ui::na_cell(),
                ui::na_cell(),
                ui::na_cell(),
                ui::na_cell(),
                comfy_table::Cell::new(""),
            ]),
        };
    }

    println!("{table}");
    let failed = view.rows.iter().filter(|r| r.is_placeholder()).count();
    if failed > 0 {
        println!(
            "{}",
            ui::style_text(
                &format!("{failed} currencies could not be fetched"),
                ui::StyleType::Error
            )
        );
    }
    println!(
        "{}",
        ui::style_text(
            &format!("Last updated: {}", view.last_updated),
            ui::StyleType::Subtle
        )
    );
}
