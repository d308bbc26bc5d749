use super::ui;
use crate::core::{DateRange, QuoteSeries, QuoteService};
use comfy_table::{Cell, Table};
use tracing::info;

/// Prints the resolved daily series for one symbol.
pub async fn run(
    service: &QuoteService<'_>,
    symbol: &str,
    range: &DateRange,
    native: bool,
) -> anyhow::Result<()> {
    info!(symbol, native, "Resolving quotes");
    let series = service.resolve(symbol, range, native).await?;

    println!(
        "\n{} ({})",
        ui::style_text(symbol, ui::StyleType::Title),
        range
    );
    if series.is_empty() {
        println!("No quotes found for {symbol} in the selected period.");
        return Ok(());
    }

    println!("{}", quotes_table(&series));
    if let Some(change) = period_change(&series) {
        println!(
            "{} {} samples, {}",
            ui::style_text("Period:", ui::StyleType::TotalLabel),
            series.len(),
            ui::style_text(&format!("{change:.2}%"), ui::StyleType::TotalValue)
        );
    }
    Ok(())
}

fn quotes_table(series: &QuoteSeries) -> Table {
    let mut table = ui::new_styled_table();
    table.set_header(vec![ui::header_cell("Date"), ui::header_cell("Close")]);
    for quote in series {
        table.add_row(vec![
            Cell::new(quote.date.format("%Y-%m-%d").to_string()),
            ui::amount_cell(quote.close),
        ]);
    }
    table
}

fn period_change(series: &QuoteSeries) -> Option<f64> {
    let first = series.first()?.close;
    let last = series.last()?.close;
    Some((last - first) / first * 100.0)
}
