use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::models::{CallRecord, ExpenseRecord};

fn month_key(date: NaiveDate) -> String {
    date.format("%Y-%m").to_string()
}

// ---------------------------------------------------------------------------
// Monthly trend
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct TrendMonth {
    /// `YYYY-MM`
    pub month: String,
    /// Modeled revenue from the month's sales volume; `None` if no call data.
    pub revenue: Option<f64>,
    /// Actual expenses booked in the month; `None` if no expense data.
    pub expenses: Option<f64>,
}

fn trend_slot(months: &mut BTreeMap<String, TrendMonth>, date: NaiveDate) -> &mut TrendMonth {
    let key = month_key(date);
    months.entry(key.clone()).or_insert_with(|| TrendMonth {
        month: key,
        revenue: None,
        expenses: None,
    })
}

pub fn monthly_trend(
    calls: &[CallRecord],
    expenses: &[&ExpenseRecord],
    avg_price: f64,
) -> Vec<TrendMonth> {
    let mut months: BTreeMap<String, TrendMonth> = BTreeMap::new();
    for call in calls {
        let slot = trend_slot(&mut months, call.date);
        *slot.revenue.get_or_insert(0.0) += call.sales_kg * avg_price;
    }
    for expense in expenses {
        let slot = trend_slot(&mut months, expense.date);
        *slot.expenses.get_or_insert(0.0) += expense.amount;
    }
    months.into_values().collect()
}

// ---------------------------------------------------------------------------
// Weight distribution
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct WeightBucket {
    pub weight_g: f64,
    pub qty: u64,
    /// Share of total quantity, 0–100.
    pub share_pct: f64,
}

pub fn weight_distribution(expenses: &[&ExpenseRecord]) -> Vec<WeightBucket> {
    let mut weights: Vec<(f64, u64)> = expenses.iter().map(|e| (e.weight_g, e.qty)).collect();
    weights.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut buckets: Vec<WeightBucket> = Vec::new();
    for (weight_g, qty) in weights {
        match buckets.last_mut() {
            Some(last) if last.weight_g == weight_g => last.qty += qty,
            _ => buckets.push(WeightBucket {
                weight_g,
                qty,
                share_pct: 0.0,
            }),
        }
    }

    let total: u64 = buckets.iter().map(|b| b.qty).sum();
    for bucket in &mut buckets {
        bucket.share_pct = if total > 0 {
            bucket.qty as f64 / total as f64 * 100.0
        } else {
            0.0
        };
    }
    buckets
}

// ---------------------------------------------------------------------------
// Manager × category
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct ManagerCategoryTotal {
    pub manager: String,
    pub category: String,
    pub amount: f64,
}

/// Expense totals per (manager, category), largest first. Records without a
/// manager are left out.
pub fn manager_breakdown(expenses: &[&ExpenseRecord]) -> Vec<ManagerCategoryTotal> {
    let mut totals: BTreeMap<(String, String), f64> = BTreeMap::new();
    for e in expenses {
        if let Some(manager) = &e.manager {
            *totals
                .entry((manager.clone(), e.category.clone()))
                .or_default() += e.amount;
        }
    }
    let mut rows: Vec<ManagerCategoryTotal> = totals
        .into_iter()
        .map(|((manager, category), amount)| ManagerCategoryTotal {
            manager,
            category,
            amount,
        })
        .collect();
    // Stable sort keeps (manager, category) order among equal amounts.
    rows.sort_by(|a, b| b.amount.total_cmp(&a.amount));
    rows
}
