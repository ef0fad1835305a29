use std::path::Path;

use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::classifier::SheetOutcome;
use crate::cli::{ModelArgs, ReportCommands};
use crate::error::Result;
use crate::fmt::{grams, kg, money, number, percent};
use crate::ingest::{load_file, SheetReport};
use crate::models::ModelParameters;
use crate::session::{build_report, unrecognized_message, Report, NO_WEIGHT_MESSAGE};
use crate::settings::Settings;
use crate::views::{ManagerCategoryTotal, TrendMonth, WeightBucket};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Kpi,
    Trend,
    Weights,
    Managers,
}

const ALL_SECTIONS: &[Section] = &[
    Section::Kpi,
    Section::Trend,
    Section::Weights,
    Section::Managers,
];

pub fn dispatch(cmd: ReportCommands, settings: &Settings) -> Result<()> {
    let out = match cmd {
        ReportCommands::Kpi { file, model } => render(&file, &model, settings, &[Section::Kpi])?,
        ReportCommands::Trend { file, model } => {
            render(&file, &model, settings, &[Section::Trend])?
        }
        ReportCommands::Weights { file, model } => {
            render(&file, &model, settings, &[Section::Weights])?
        }
        ReportCommands::Managers { file, model } => {
            render(&file, &model, settings, &[Section::Managers])?
        }
        ReportCommands::All { file, model } => render(&file, &model, settings, ALL_SECTIONS)?,
        ReportCommands::Sheets { file } => {
            let ingestion = load_file(&file)?;
            format_sheets(&ingestion.sheets)
        }
    };
    println!("{out}");
    Ok(())
}

fn render(
    file: &Path,
    model: &ModelArgs,
    settings: &Settings,
    sections: &[Section],
) -> Result<String> {
    let params = model.parameters(settings)?;
    let ingestion = load_file(file)?;
    if ingestion.dataset.is_empty() {
        return Ok(unrecognized_message().yellow().to_string());
    }
    let report = build_report(&ingestion.dataset, &params);
    tracing::debug!(
        expenses = report.expense_rows,
        calls = report.call_rows,
        "report built"
    );

    let parts: Vec<String> = sections
        .iter()
        .map(|section| match section {
            Section::Kpi => format_kpi(&report, &params),
            Section::Trend => format_trend(&report.trend),
            Section::Weights => format_weights(report.weights.as_deref()),
            Section::Managers => format_managers(&report.breakdown),
        })
        .collect();
    Ok(parts.join("\n\n"))
}

fn signed_money(val: f64) -> String {
    if val < 0.0 {
        money(val).red().to_string()
    } else {
        money(val).green().to_string()
    }
}

// ---------------------------------------------------------------------------
// Pure formatting functions (report data → String)
// ---------------------------------------------------------------------------

pub fn format_kpi(report: &Report, params: &ModelParameters) -> String {
    let kpi = &report.kpi;

    let mut headline = Table::new();
    headline.set_header(vec!["Metric", "Value"]);
    headline.add_row(vec![
        Cell::new("Revenue (model)"),
        Cell::new(money(kpi.modeled_revenue)),
    ]);
    headline.add_row(vec![
        Cell::new("Expenses (actual)"),
        Cell::new(money(kpi.total_expenses)),
    ]);
    headline.add_row(vec![
        Cell::new("Profit (estimate)".bold()),
        Cell::new(signed_money(kpi.modeled_profit)),
    ]);
    headline.add_row(vec![Cell::new("Sales volume"), Cell::new(kg(kpi.modeled_kg))]);

    let mut scenario = Table::new();
    scenario.set_header(vec!["", "Actual", "Model"]);
    scenario.add_row(vec![
        Cell::new("Incoming calls"),
        Cell::new(number(kpi.actual_calls.round() as u64)),
        Cell::new(format!("{:.0}", kpi.modeled_calls)),
    ]);
    scenario.add_row(vec![
        Cell::new("Conversion"),
        Cell::new(percent(kpi.base_conversion_pct)),
        Cell::new(percent(kpi.modeled_conversion_pct)),
    ]);
    scenario.add_row(vec![
        Cell::new("Orders"),
        Cell::new(number(kpi.actual_orders.round() as u64)),
        Cell::new(format!("{:.1}", kpi.modeled_orders)),
    ]);
    scenario.add_row(vec![
        Cell::new("Sales volume"),
        Cell::new(kg(kpi.actual_kg)),
        Cell::new(kg(kpi.modeled_kg)),
    ]);
    scenario.add_row(vec![
        Cell::new("Kg per order"),
        Cell::new(format!("{:.2}", kpi.kg_per_order)),
        Cell::new(""),
    ]);

    format!(
        "Key Figures\n{headline}\n\n\
         Scenario: price {} / kg, traffic x{:.1}, conversion {:+.1} pp, managers: {}\n{scenario}",
        money(params.avg_price),
        params.traffic_mult,
        params.conv_boost,
        params.managers.label()
    )
}

pub fn format_trend(months: &[TrendMonth]) -> String {
    if months.is_empty() {
        return "Monthly Trend\nNo dated data.".to_string();
    }
    let mut table = Table::new();
    table.set_header(vec!["Month", "Revenue (model)", "Expenses (actual)"]);
    for m in months {
        table.add_row(vec![
            Cell::new(&m.month),
            Cell::new(m.revenue.map(|v| money(v).green().to_string()).unwrap_or_default()),
            Cell::new(m.expenses.map(|v| money(v).red().to_string()).unwrap_or_default()),
        ]);
    }
    format!("Monthly Trend\n{table}")
}

pub fn format_weights(buckets: Option<&[WeightBucket]>) -> String {
    let Some(buckets) = buckets else {
        return format!("Write-offs by Weight\n{}", NO_WEIGHT_MESSAGE.cyan());
    };
    let mut table = Table::new();
    table.set_header(vec!["Weight", "Qty", "Share"]);
    for b in buckets {
        table.add_row(vec![
            Cell::new(grams(b.weight_g)),
            Cell::new(number(b.qty)),
            Cell::new(percent(b.share_pct)),
        ]);
    }
    let total: u64 = buckets.iter().map(|b| b.qty).sum();
    table.add_row(vec![
        Cell::new("Total".bold()),
        Cell::new(number(total)),
        Cell::new(""),
    ]);
    format!("Write-offs by Weight\n{table}")
}

pub fn format_managers(rows: &[ManagerCategoryTotal]) -> String {
    if rows.is_empty() {
        return "Expenses by Manager\nNo expenses with a manager.".to_string();
    }
    let mut table = Table::new();
    table.set_header(vec!["Manager", "Category", "Amount"]);
    for r in rows {
        table.add_row(vec![
            Cell::new(&r.manager),
            Cell::new(&r.category),
            Cell::new(money(r.amount)),
        ]);
    }
    let total: f64 = rows.iter().map(|r| r.amount).sum();
    table.add_row(vec![
        Cell::new("Total".bold()),
        Cell::new(""),
        Cell::new(money(total)),
    ]);
    format!("Expenses by Manager\n{table}")
}

fn outcome_cell(outcome: &Option<SheetOutcome>) -> String {
    match outcome {
        None => String::new(),
        Some(SheetOutcome::Parsed {
            header_offset,
            rows,
        }) => format!("{rows} rows (header row {})", header_offset + 1),
        Some(SheetOutcome::Failed { reason }) => format!("skipped: {reason}").red().to_string(),
    }
}

pub fn format_sheets(sheets: &[SheetReport]) -> String {
    if sheets.is_empty() {
        return "Sheets\nThe file has no sheets.".to_string();
    }
    let mut table = Table::new();
    table.set_header(vec!["Sheet", "Kind", "Expenses", "Calls"]);
    for s in sheets {
        table.add_row(vec![
            Cell::new(&s.name),
            Cell::new(s.kind.label()),
            Cell::new(outcome_cell(&s.expense)),
            Cell::new(outcome_cell(&s.calls)),
        ]);
    }
    format!("Sheets ({})\n{table}", sheets.len())
}
