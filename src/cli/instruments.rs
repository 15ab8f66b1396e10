use super::ui;
use crate::core::instrument::InstrumentRecord;
use crate::core::service::{FilteredListing, FundService, InstrumentView};
use anyhow::Result;
use comfy_table::Cell;
use tokio_util::sync::CancellationToken;

pub async fn list(service: &FundService, ctx: &CancellationToken, top: usize) -> Result<()> {
    let pb = ui::new_spinner("Fetching fund listing...");
    let views = service.list(ctx, top).await;
    pb.finish_and_clear();

    println!("{}", views_table(&views?));
    Ok(())
}

pub async fn show(service: &FundService, ctx: &CancellationToken, identifier: &str) -> Result<()> {
    let pb = ui::new_spinner(&format!("Fetching {identifier}..."));
    let view = service.get(ctx, identifier).await;
    pb.finish_and_clear();

    match view? {
        Some(view) => println!("{}", view.display_as_table()),
        None => anyhow::bail!("Fund {} not found", identifier.trim().to_uppercase()),
    }
    Ok(())
}

pub async fn filtered(service: &FundService, ctx: &CancellationToken, top: usize) -> Result<()> {
    let pb = ui::new_spinner("Fetching benchmark rate and listing...");
    let listing = service.filtered(ctx, top).await;
    pb.finish_and_clear();

    println!("{}", listing?.display_as_table());
    Ok(())
}

pub async fn anchoring(service: &FundService, ctx: &CancellationToken) -> Result<()> {
    let pb = ui::new_spinner("Fetching fund listing...");
    let records = service.anchoring(ctx).await;
    pb.finish_and_clear();

    println!("{}", records_table(&records?));
    Ok(())
}

impl InstrumentView {
    pub fn display_as_table(&self) -> String {
        let f = &self.record;
        let e = &self.explanation;
        let income = &self.income;

        let mut table = ui::new_styled_table();
        table.set_header(vec![ui::header_cell("Field"), ui::header_cell("Value")]);

        let rows: Vec<(&str, Cell)> = vec![
            ("Category", Cell::new(&f.category)),
            ("Class", Cell::new(e.class.to_string())),
            ("Profile", ui::profile_cell(e.profile)),
            ("Score", ui::score_cell(e.score)),
            ("Risk", ui::risk_cell(e.risk)),
            ("Price", ui::number_cell(format!("{:.2}", f.price))),
            ("Dividend yield", ui::number_cell(format!("{:.2}%", f.dividend_yield))),
            ("FFO yield", ui::number_cell(format!("{:.2}%", f.ffo_yield))),
            ("P/VP", ui::number_cell(format!("{:.2}", f.price_to_book))),
            ("Market value", ui::number_cell(ui::format_compact(f.market_value))),
            ("Liquidity", ui::number_cell(ui::format_compact(f.liquidity))),
            ("Properties", ui::number_cell(f.property_count.to_string())),
            ("Cap rate", ui::number_cell(format!("{:.2}%", f.cap_rate))),
            ("Vacancy", ui::number_cell(format!("{:.2}%", f.vacancy))),
            (
                "Distribution (12m)",
                ui::format_optional_cell(f.distribution_12m, |d| format!("{d:.2}")),
            ),
            (
                "Monthly distribution",
                ui::number_cell(format!("{:.2}", income.monthly_distribution)),
            ),
            (
                "Monthly yield",
                ui::number_cell(format!("{:.2}%", income.monthly_yield)),
            ),
            (
                "Daily distribution",
                ui::number_cell(format!("{:.6}", income.daily_distribution)),
            ),
            (
                "Magic number",
                ui::number_cell(format!(
                    "{} units ({:.2})",
                    income.magic_number_units, income.magic_number_value
                )),
            ),
        ];
        for (label, value) in rows {
            table.add_row(vec![Cell::new(label), value]);
        }

        let mut output = format!(
            "Fund: {}\n\n",
            ui::style_text(&f.identifier, ui::StyleType::Title)
        );
        output.push_str(&table.to_string());
        output.push_str("\n\nReasons:\n");
        for reason in &e.reasons {
            output.push_str(&format!("  - {reason}\n"));
        }
        output
    }
}

impl FilteredListing {
    pub fn display_as_table(&self) -> String {
        let band = &self.band;
        let mut output = format!(
            "{}\n{}\n\n",
            ui::style_text("Benchmark-filtered funds", ui::StyleType::Title),
            ui::style_text(
                &format!(
                    "Benchmark {:.2}% | DY {:.2}%..{:.2}% | P/VP {:.2}..{:.2} | liquidity >= {}",
                    band.benchmark_rate,
                    band.min_yield,
                    band.max_yield,
                    band.min_price_to_book,
                    band.max_price_to_book,
                    ui::format_compact(band.min_liquidity),
                ),
                ui::StyleType::Subtle
            )
        );

        if self.items.is_empty() {
            output.push_str("No fund matches the current band.");
            return output;
        }

        let mut table = ui::new_styled_table();
        table.set_header(vec![
            ui::header_cell("#"),
            ui::header_cell("Fund"),
            ui::header_cell("Category"),
            ui::header_cell("Price"),
            ui::header_cell("DY (%)"),
            ui::header_cell("P/VP"),
            ui::header_cell("P/VP rank"),
            ui::header_cell("DY rank"),
            ui::header_cell("Combined"),
            ui::header_cell("Monthly yield"),
            ui::header_cell("Magic number"),
        ]);

        for (position, item) in self.items.iter().enumerate() {
            let f = &item.view.record;
            let income = &item.view.income;
            table.add_row(vec![
                ui::number_cell((position + 1).to_string()),
                Cell::new(&f.identifier),
                Cell::new(&f.category),
                ui::number_cell(format!("{:.2}", f.price)),
                ui::number_cell(format!("{:.2}", f.dividend_yield)),
                ui::number_cell(format!("{:.2}", f.price_to_book)),
                ui::number_cell(item.valuation_rank.to_string()),
                ui::number_cell(item.yield_rank.to_string()),
                ui::number_cell(format!("{:.1}", item.combined_rank)),
                ui::number_cell(format!("{:.2}%", income.monthly_yield)),
                ui::number_cell(income.magic_number_units.to_string()),
            ]);
        }
        output.push_str(&table.to_string());
        output
    }
}

fn views_table(views: &[InstrumentView]) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Fund"),
        ui::header_cell("Category"),
        ui::header_cell("Price"),
        ui::header_cell("DY (%)"),
        ui::header_cell("P/VP"),
        ui::header_cell("Liquidity"),
        ui::header_cell("Profile"),
        ui::header_cell("Score"),
        ui::header_cell("Monthly dist."),
        ui::header_cell("Magic number"),
    ]);

    for v in views {
        let f = &v.record;
        table.add_row(vec![
            Cell::new(&f.identifier),
            Cell::new(&f.category),
            ui::number_cell(format!("{:.2}", f.price)),
            ui::number_cell(format!("{:.2}", f.dividend_yield)),
            ui::number_cell(format!("{:.2}", f.price_to_book)),
            ui::number_cell(ui::format_compact(f.liquidity)),
            ui::profile_cell(v.explanation.profile),
            ui::score_cell(v.explanation.score),
            ui::number_cell(format!("{:.2}", v.income.monthly_distribution)),
            ui::number_cell(v.income.magic_number_units.to_string()),
        ]);
    }
    table.to_string()
}

fn records_table(records: &[InstrumentRecord]) -> String {
    if records.is_empty() {
        return "No fund passes the anchoring screen.".to_string();
    }

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Fund"),
        ui::header_cell("Category"),
        ui::header_cell("Price"),
        ui::header_cell("DY (%)"),
        ui::header_cell("P/VP"),
        ui::header_cell("Market value"),
        ui::header_cell("Liquidity"),
        ui::header_cell("Vacancy (%)"),
    ]);
    for f in records {
        table.add_row(vec![
            Cell::new(&f.identifier),
            Cell::new(&f.category),
            ui::number_cell(format!("{:.2}", f.price)),
            ui::number_cell(format!("{:.2}", f.dividend_yield)),
            ui::number_cell(format!("{:.2}", f.price_to_book)),
            ui::number_cell(ui::format_compact(f.market_value)),
            ui::number_cell(ui::format_compact(f.liquidity)),
            ui::number_cell(format!("{:.2}", f.vacancy)),
        ]);
    }
    table.to_string()
}
