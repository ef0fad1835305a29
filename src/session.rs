use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::classifier::{CALLS_KEYWORDS, COST_KEYWORDS, PROMO_KEYWORDS};
use crate::error::{DashError, Result};
use crate::ingest::{DatasetCache, Ingestion};
use crate::models::{Dataset, ExpenseField, KpiSnapshot, ManagerSelection, ModelParameters};
use crate::modeler::{compute_kpis, filter_by_manager};
use crate::views::{
    manager_breakdown, monthly_trend, weight_distribution, ManagerCategoryTotal, TrendMonth,
    WeightBucket,
};

pub const NO_FILE_MESSAGE: &str = "Open a report file (.xlsx or .csv) to get started.";
pub const NO_WEIGHT_MESSAGE: &str = "No product weight data.";

pub fn unrecognized_message() -> String {
    let mut names: Vec<&str> = Vec::new();
    names.extend(PROMO_KEYWORDS);
    names.extend(CALLS_KEYWORDS);
    names.extend(COST_KEYWORDS);
    format!(
        "The file was read but no data was recognized. Check the sheet names: \
         they should contain one of {}.",
        names.join(", ")
    )
}

/// Everything the dashboard shows for one (dataset, parameters) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub kpi: KpiSnapshot,
    pub trend: Vec<TrendMonth>,
    /// `None` when no expense sheet carried a weight column.
    pub weights: Option<Vec<WeightBucket>>,
    pub breakdown: Vec<ManagerCategoryTotal>,
    pub managers: Vec<String>,
    pub expense_rows: usize,
    pub call_rows: usize,
}

/// Run the modeling stage. Pure: same inputs, same report.
pub fn build_report(dataset: &Dataset, params: &ModelParameters) -> Report {
    let expenses = filter_by_manager(&dataset.expenses, &params.managers);
    let kpi = compute_kpis(&expenses, &dataset.calls, params);
    let weights = dataset
        .expense_fields
        .contains(&ExpenseField::WeightG)
        .then(|| weight_distribution(&expenses));
    Report {
        kpi,
        trend: monthly_trend(&dataset.calls, &expenses, params.avg_price),
        weights,
        breakdown: manager_breakdown(&expenses),
        managers: dataset.managers(),
        expense_rows: expenses.len(),
        call_rows: dataset.calls.len(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Evaluation {
    NoFile,
    LoadFailed(String),
    Unrecognized,
    Ready(Box<Report>),
}

/// The dashboard's state between interactions: the chosen file, the model
/// parameters and the ingestion cache. Everything else is recomputed.
#[derive(Debug, Default)]
pub struct Session {
    file: Option<PathBuf>,
    cache: DatasetCache,
    pub params: ModelParameters,
}

impl Session {
    pub fn new(params: ModelParameters) -> Self {
        Self {
            file: None,
            cache: DatasetCache::new(),
            params,
        }
    }

    pub fn file(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    /// Switch to another file. Manager names that no longer exist are dropped
    /// from the selection.
    pub fn open(&mut self, path: impl Into<PathBuf>) {
        self.file = Some(path.into());
        if let ManagerSelection::Only(selected) = self.params.managers.clone() {
            let available: BTreeSet<String> = match self.ingestion() {
                Ok(ingestion) => ingestion.dataset.managers().into_iter().collect(),
                Err(_) => BTreeSet::new(),
            };
            let kept: Vec<String> = selected.intersection(&available).cloned().collect();
            self.params.managers = ManagerSelection::from_names(kept);
        }
    }

    /// Force the next evaluation to re-read the file from scratch.
    pub fn reload(&mut self) {
        self.cache.invalidate();
    }

    pub fn ingestion(&mut self) -> Result<&Ingestion> {
        match &self.file {
            Some(path) => self.cache.load(path),
            None => Err(DashError::Other(NO_FILE_MESSAGE.to_string())),
        }
    }

    pub fn evaluate(&mut self) -> Evaluation {
        let Some(path) = self.file.clone() else {
            return Evaluation::NoFile;
        };
        let params = self.params.clone();
        match self.cache.load(&path) {
            Err(e) => {
                tracing::warn!(file = %path.display(), error = %e, "report could not be processed");
                Evaluation::LoadFailed(format!("Error processing file: {e}"))
            }
            Ok(ingestion) if ingestion.dataset.is_empty() => Evaluation::Unrecognized,
            Ok(ingestion) => Evaluation::Ready(Box::new(build_report(&ingestion.dataset, &params))),
        }
    }

    pub fn cache_stats(&self) -> (usize, usize) {
        (self.cache.hits(), self.cache.misses())
    }
}
