use super::ui;
use crate::core::QuoteService;
use crate::core::comparison::{Comparison, ComparisonRequest, run_comparison};
use comfy_table::{Attribute, Cell, Table};
use tracing::info;

pub async fn run(service: &QuoteService<'_>, request: &ComparisonRequest) -> anyhow::Result<()> {
    info!(
        frequency = %request.frequency,
        native = request.native,
        "Comparing strategies"
    );

    let pb = ui::new_progress_bar(request.symbols().len() as u64);
    let result = run_comparison(service, request, &|| pb.inc(1)).await;
    pb.finish_and_clear();
    let comparison = result?;

    println!(
        "\n{} {} to {}",
        ui::style_text("Strategy comparison", ui::StyleType::Title),
        request.range.start(),
        request.range.end()
    );
    if comparison.results.is_empty() {
        println!("No strategy had data for the selected period.");
    } else {
        println!("{}", results_table(&comparison));
    }

    if let Some(best) = comparison.best().filter(|b| !b.is_no_data()) {
        println!(
            "{} {} ({:.2}%)",
            ui::style_text("Best strategy:", ui::StyleType::TotalLabel),
            ui::style_text(&best.name, ui::StyleType::TotalValue),
            best.return_percent
        );
    }
    println!(
        "{}",
        ui::style_text(
            &format!("One-off budget: {:.2}", comparison.budget),
            ui::StyleType::Subtle
        )
    );

    for failure in &comparison.failures {
        println!(
            "{}",
            ui::style_text(
                &format!("Skipped {}: {}", failure.symbol, failure.error),
                ui::StyleType::Error
            )
        );
    }
    Ok(())
}

fn results_table(comparison: &Comparison) -> Table {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Strategy"),
        ui::header_cell("Invested"),
        ui::header_cell("Final Value"),
        ui::header_cell("Return %"),
        ui::header_cell("Units"),
    ]);

    for (rank, result) in comparison.results.iter().enumerate() {
        let name = if rank == 0 && !result.is_no_data() {
            Cell::new(&result.name).add_attribute(Attribute::Bold)
        } else {
            Cell::new(&result.name)
        };
        let units = if result.total_accumulated > 0.0 {
            Cell::new(format!("{:.6}", result.total_accumulated))
        } else {
            ui::na_cell(false)
        };

        if result.is_no_data() {
            table.add_row(vec![
                name,
                ui::na_cell(true),
                ui::na_cell(true),
                ui::na_cell(true),
                units,
            ]);
        } else {
            table.add_row(vec![
                name,
                ui::amount_cell(result.total_invested),
                ui::amount_cell(result.final_value),
                ui::change_cell(result.return_percent),
                units,
            ]);
        }
    }
    table
}
