use std::collections::BTreeSet;

use crate::coerce::{to_count, to_date, to_number};
use crate::error::{DashError, Result};
use crate::models::{CallRecord, ExpenseField, ExpenseRecord};
use crate::normalizer::normalize_columns;
use crate::workbook::{Cell, Sheet, Table};

pub const PROMO_KEYWORDS: &[&str] = &["промо", "promo", "маркетинг"];
pub const COST_KEYWORDS: &[&str] = &["себестоим", "cost", "затраты"];
pub const CALLS_KEYWORDS: &[&str] = &["звонки", "calls", "продажи"];

/// Positions of date, incoming, orders and sales-kg in a calls sheet.
pub const CALL_COLUMNS: [usize; 4] = [0, 1, 2, 4];

/// Case-insensitive substring match of `label` against any keyword.
pub fn matches_any(label: &str, keywords: &[&str]) -> bool {
    let lower = label.to_lowercase();
    keywords.iter().any(|k| lower.contains(&k.to_lowercase()))
}

pub fn is_expense_sheet(name: &str) -> bool {
    matches_any(name, PROMO_KEYWORDS) || matches_any(name, COST_KEYWORDS)
}

pub fn is_calls_sheet(name: &str) -> bool {
    matches_any(name, CALLS_KEYWORDS)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetKind {
    Expense,
    Calls,
    Both,
    Ignored,
}

impl SheetKind {
    pub fn of(name: &str) -> Self {
        match (is_expense_sheet(name), is_calls_sheet(name)) {
            (true, true) => Self::Both,
            (true, false) => Self::Expense,
            (false, true) => Self::Calls,
            (false, false) => Self::Ignored,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Expense => "expenses",
            Self::Calls => "calls",
            Self::Both => "expenses + calls",
            Self::Ignored => "ignored",
        }
    }
}

/// Result of running one branch over one sheet.
#[derive(Debug, Clone, PartialEq)]
pub enum SheetOutcome {
    /// Rows read from the sheet, before rows without a date are dropped.
    Parsed { header_offset: usize, rows: usize },
    Failed { reason: String },
}

/// Expense rows as read from one sheet; dates are still raw cells.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpenseSheet {
    pub category: String,
    pub header_offset: usize,
    pub fields: BTreeSet<ExpenseField>,
    pub rows: Vec<RawExpense>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawExpense {
    pub date: Option<Cell>,
    pub manager: Option<Cell>,
    pub amount: Option<Cell>,
    pub qty: Option<Cell>,
    pub weight_g: Option<Cell>,
}

/// Where the header row of an expense sheet sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderRow {
    /// Offset 1 (a title row above the headers) unless that leaves fewer
    /// than two columns, then offset 0.
    Detect,
    /// Offset 0, used for CSV files.
    First,
}

pub fn expense_table(sheet: &Sheet, header: HeaderRow) -> Result<(usize, Table)> {
    if header == HeaderRow::First {
        return Ok((0, sheet.table(0)?));
    }
    match sheet.table(1) {
        Ok(table) if table.width() >= 2 => Ok((1, table)),
        _ => Ok((0, sheet.table(0)?)),
    }
}

pub fn parse_expense_sheet(sheet: &Sheet, header: HeaderRow) -> Result<ExpenseSheet> {
    let (header_offset, table) = expense_table(sheet, header)?;
    let mapping = normalize_columns(&table.headers);
    if mapping.is_empty() {
        return Err(DashError::Other(format!(
            "no recognizable columns in {:?}",
            table.headers
        )));
    }

    let pick = |row: usize, field: ExpenseField| -> Option<Cell> {
        mapping.get(&field).map(|&col| table.cell(row, col).clone())
    };
    let rows = (0..table.rows.len())
        .map(|i| RawExpense {
            date: pick(i, ExpenseField::Date),
            manager: pick(i, ExpenseField::Manager),
            amount: pick(i, ExpenseField::Amount),
            qty: pick(i, ExpenseField::Qty),
            weight_g: pick(i, ExpenseField::WeightG),
        })
        .collect();

    Ok(ExpenseSheet {
        category: sheet.name.clone(),
        header_offset,
        fields: mapping.keys().copied().collect(),
        rows,
    })
}

/// Coerce raw expense rows. Rows without a recognizable date are dropped;
/// unconvertible numbers become zero.
pub fn coerce_expenses(sheet: &ExpenseSheet) -> Vec<ExpenseRecord> {
    sheet
        .rows
        .iter()
        .filter_map(|raw| {
            let date = raw.date.as_ref().and_then(to_date)?;
            Some(ExpenseRecord {
                date,
                manager: raw.manager.as_ref().and_then(Cell::as_label),
                amount: raw.amount.as_ref().map_or(0.0, to_number),
                qty: raw.qty.as_ref().map_or(0, to_count),
                weight_g: raw.weight_g.as_ref().map_or(0.0, to_number),
                category: sheet.category.clone(),
            })
        })
        .collect()
}

/// Read a calls sheet by column position, ignoring header text.
pub fn parse_call_sheet(sheet: &Sheet) -> Result<Vec<CallRecord>> {
    let table = sheet.table(0)?;
    let needed = CALL_COLUMNS[3] + 1;
    if table.width() < needed {
        return Err(DashError::Other(format!(
            "calls sheet needs at least {needed} columns, found {}",
            table.width()
        )));
    }
    let [date_col, incoming_col, orders_col, kg_col] = CALL_COLUMNS;
    Ok((0..table.rows.len())
        .filter_map(|i| {
            let date = to_date(table.cell(i, date_col))?;
            Some(CallRecord {
                date,
                incoming: to_count(table.cell(i, incoming_col)),
                orders: to_count(table.cell(i, orders_col)),
                sales_kg: to_number(table.cell(i, kg_col)),
            })
        })
        .collect())
}
