use std::collections::BTreeSet;

use chrono::NaiveDate;

use crate::error::{DashError, Result};

/// One normalized promo/cost write-off row.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpenseRecord {
    pub date: NaiveDate,
    pub manager: Option<String>,
    pub amount: f64,
    pub qty: u64,
    pub weight_g: f64,
    /// Name of the sheet the row came from.
    pub category: String,
}

/// One day of inbound call activity.
#[derive(Debug, Clone, PartialEq)]
pub struct CallRecord {
    pub date: NaiveDate,
    pub incoming: u64,
    pub orders: u64,
    pub sales_kg: f64,
}

/// Canonical expense columns recognized by the column normalizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ExpenseField {
    Date,
    Manager,
    Amount,
    Qty,
    WeightG,
}

impl ExpenseField {
    pub fn key(&self) -> &'static str {
        match self {
            Self::Date => "date",
            Self::Manager => "manager",
            Self::Amount => "amount",
            Self::Qty => "qty",
            Self::WeightG => "weight_g",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub expenses: Vec<ExpenseRecord>,
    pub calls: Vec<CallRecord>,
    /// Union of canonical columns supplied by any expense sheet.
    pub expense_fields: BTreeSet<ExpenseField>,
}

impl Dataset {
    pub fn is_empty(&self) -> bool {
        self.expenses.is_empty() && self.calls.is_empty()
    }

    /// Sorted unique manager labels, missing labels excluded.
    pub fn managers(&self) -> Vec<String> {
        self.expenses
            .iter()
            .filter_map(|e| e.manager.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ManagerSelection {
    #[default]
    All,
    Only(BTreeSet<String>),
}

impl ManagerSelection {
    /// An empty list of names means every manager.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let set: BTreeSet<String> = names.into_iter().map(Into::into).collect();
        if set.is_empty() {
            Self::All
        } else {
            Self::Only(set)
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }

    pub fn contains(&self, manager: &str) -> bool {
        match self {
            Self::All => true,
            Self::Only(set) => set.contains(manager),
        }
    }

    /// Flip one manager in or out. Picking from `All` starts a selection of
    /// one; removing the last name goes back to `All`.
    pub fn toggle(&self, manager: &str) -> Self {
        let mut set = match self {
            Self::All => BTreeSet::new(),
            Self::Only(set) => set.clone(),
        };
        if !set.remove(manager) {
            set.insert(manager.to_string());
        }
        Self::from_names(set)
    }

    pub fn label(&self) -> String {
        match self {
            Self::All => "all".to_string(),
            Self::Only(set) => set.iter().cloned().collect::<Vec<_>>().join(", "),
        }
    }
}

/// A slider: inclusive range, step and default.
#[derive(Debug, Clone, Copy)]
pub struct Slider {
    pub name: &'static str,
    pub min: f64,
    pub max: f64,
    pub step: f64,
    pub default: f64,
}

impl Slider {
    pub fn validate(&self, value: f64) -> Result<f64> {
        if !value.is_finite() || value < self.min || value > self.max {
            return Err(DashError::InvalidParameter(format!(
                "{} must be between {} and {} (got {value})",
                self.name, self.min, self.max
            )));
        }
        Ok(value)
    }

    /// Move `steps` notches from `value`, staying within range and on the step grid.
    pub fn nudge(&self, value: f64, steps: i32) -> f64 {
        let notches = ((value - self.min) / self.step).round() + steps as f64;
        let max_notches = ((self.max - self.min) / self.step).round();
        let notches = notches.clamp(0.0, max_notches);
        // Round away float noise from repeated 0.1 steps.
        ((self.min + notches * self.step) * 1000.0).round() / 1000.0
    }
}

pub const PRICE: Slider = Slider {
    name: "avg_price",
    min: 20000.0,
    max: 60000.0,
    step: 1000.0,
    default: 35000.0,
};

pub const TRAFFIC: Slider = Slider {
    name: "traffic_mult",
    min: 0.5,
    max: 3.0,
    step: 0.1,
    default: 1.0,
};

pub const CONVERSION: Slider = Slider {
    name: "conv_boost",
    min: -5.0,
    max: 10.0,
    step: 0.5,
    default: 0.0,
};

#[derive(Debug, Clone, PartialEq)]
pub struct ModelParameters {
    /// Average price per kilogram, rubles.
    pub avg_price: f64,
    pub traffic_mult: f64,
    /// Percentage points added to the observed conversion rate.
    pub conv_boost: f64,
    pub managers: ManagerSelection,
}

impl Default for ModelParameters {
    fn default() -> Self {
        Self {
            avg_price: PRICE.default,
            traffic_mult: TRAFFIC.default,
            conv_boost: CONVERSION.default,
            managers: ManagerSelection::All,
        }
    }
}

impl ModelParameters {
    pub fn new(
        avg_price: f64,
        traffic_mult: f64,
        conv_boost: f64,
        managers: ManagerSelection,
    ) -> Result<Self> {
        Ok(Self {
            avg_price: PRICE.validate(avg_price)?,
            traffic_mult: TRAFFIC.validate(traffic_mult)?,
            conv_boost: CONVERSION.validate(conv_boost)?,
            managers,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct KpiSnapshot {
    pub total_expenses: f64,
    pub actual_calls: f64,
    pub actual_orders: f64,
    pub actual_kg: f64,
    pub modeled_calls: f64,
    pub base_conversion_pct: f64,
    pub modeled_conversion_pct: f64,
    pub modeled_orders: f64,
    pub kg_per_order: f64,
    pub modeled_kg: f64,
    pub modeled_revenue: f64,
    pub modeled_profit: f64,
}
