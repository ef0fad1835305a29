use crate::models::{CallRecord, ExpenseRecord, KpiSnapshot, ManagerSelection, ModelParameters};

/// Restrict expenses to the selected managers. Records without a manager
/// only survive the `All` selection.
pub fn filter_by_manager<'a>(
    expenses: &'a [ExpenseRecord],
    selection: &ManagerSelection,
) -> Vec<&'a ExpenseRecord> {
    expenses
        .iter()
        .filter(|e| match selection {
            ManagerSelection::All => true,
            ManagerSelection::Only(_) => e
                .manager
                .as_deref()
                .is_some_and(|m| selection.contains(m)),
        })
        .collect()
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

/// Project revenue and profit from observed activity. Linear, with every
/// division guarded by substituting zero.
pub fn compute_kpis(
    expenses: &[&ExpenseRecord],
    calls: &[CallRecord],
    params: &ModelParameters,
) -> KpiSnapshot {
    let total_expenses: f64 = expenses.iter().map(|e| e.amount).sum();
    let actual_calls: f64 = calls.iter().map(|c| c.incoming as f64).sum();
    let actual_orders: f64 = calls.iter().map(|c| c.orders as f64).sum();
    let actual_kg: f64 = calls.iter().map(|c| c.sales_kg).sum();

    let modeled_calls = actual_calls * params.traffic_mult;
    let base_conversion_pct = ratio(actual_orders, actual_calls) * 100.0;
    let modeled_conversion_pct = (base_conversion_pct + params.conv_boost).max(0.0);
    let modeled_orders = modeled_calls * modeled_conversion_pct / 100.0;
    let kg_per_order = ratio(actual_kg, actual_orders);
    let modeled_kg = modeled_orders * kg_per_order;
    let modeled_revenue = modeled_kg * params.avg_price;
    let modeled_profit = modeled_revenue - total_expenses;

    KpiSnapshot {
        total_expenses,
        actual_calls,
        actual_orders,
        actual_kg,
        modeled_calls,
        base_conversion_pct,
        modeled_conversion_pct,
        modeled_orders,
        kg_per_order,
        modeled_kg,
        modeled_revenue,
        modeled_profit,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()
    }

    fn expense(manager: Option<&str>, amount: f64) -> ExpenseRecord {
        ExpenseRecord {
            date: date(),
            manager: manager.map(str::to_string),
            amount,
            qty: 1,
            weight_g: 250.0,
            category: "Промо".into(),
        }
    }

    fn call(incoming: u64, orders: u64, sales_kg: f64) -> CallRecord {
        CallRecord {
            date: date(),
            incoming,
            orders,
            sales_kg,
        }
    }

    fn params(traffic: f64, conv: f64, price: f64) -> ModelParameters {
        ModelParameters::new(price, traffic, conv, ManagerSelection::All).unwrap()
    }

    #[test]
    fn test_reference_projection() {
        let expenses = [expense(Some("Анна"), 1_500_000.0)];
        let refs: Vec<&ExpenseRecord> = expenses.iter().collect();
        let calls = [call(600, 30, 300.0), call(400, 20, 200.0)];
        let kpi = compute_kpis(&refs, &calls, &params(2.0, 0.0, 35000.0));
        assert_eq!(kpi.actual_calls, 1000.0);
        assert_eq!(kpi.actual_orders, 50.0);
        assert_eq!(kpi.actual_kg, 500.0);
        assert_eq!(kpi.base_conversion_pct, 5.0);
        assert_eq!(kpi.modeled_calls, 2000.0);
        assert_eq!(kpi.modeled_orders, 100.0);
        assert_eq!(kpi.kg_per_order, 10.0);
        assert_eq!(kpi.modeled_kg, 1000.0);
        assert_eq!(kpi.modeled_revenue, 35_000_000.0);
        assert_eq!(kpi.modeled_profit, 35_000_000.0 - 1_500_000.0);
    }

    #[test]
    fn test_zero_calls_uses_boost_alone() {
        let kpi = compute_kpis(&[], &[], &params(1.0, 2.5, 35000.0));
        assert_eq!(kpi.base_conversion_pct, 0.0);
        assert_eq!(kpi.modeled_conversion_pct, 2.5);
        assert_eq!(kpi.modeled_orders, 0.0);
        assert_eq!(kpi.kg_per_order, 0.0);
        assert_eq!(kpi.modeled_revenue, 0.0);

        let kpi = compute_kpis(&[], &[], &params(1.0, -5.0, 35000.0));
        assert_eq!(kpi.modeled_conversion_pct, 0.0);
    }

    #[test]
    fn test_conversion_floor_at_zero() {
        let calls = [call(1000, 20, 100.0)];
        let kpi = compute_kpis(&[], &calls, &params(1.0, -5.0, 35000.0));
        assert_eq!(kpi.base_conversion_pct, 2.0);
        assert_eq!(kpi.modeled_conversion_pct, 0.0);
        assert_eq!(kpi.modeled_revenue, 0.0);
    }

    #[test]
    fn test_zero_orders_guards_kg_per_order() {
        let calls = [call(100, 0, 50.0)];
        let kpi = compute_kpis(&[], &calls, &params(1.0, 1.0, 35000.0));
        assert_eq!(kpi.kg_per_order, 0.0);
        assert_eq!(kpi.modeled_kg, 0.0);
    }

    #[test]
    fn test_manager_filter_subset_never_increases_total() {
        let expenses = vec![
            expense(Some("Анна"), 100.0),
            expense(Some("Олег"), 250.0),
            expense(None, 40.0),
        ];
        let all = filter_by_manager(&expenses, &ManagerSelection::All);
        let total_all: f64 = all.iter().map(|e| e.amount).sum();
        assert_eq!(total_all, 390.0);

        let anna = filter_by_manager(&expenses, &ManagerSelection::from_names(["Анна"]));
        let total_anna: f64 = anna.iter().map(|e| e.amount).sum();
        assert_eq!(total_anna, 100.0);
        assert!(total_anna <= total_all);

        let both = filter_by_manager(&expenses, &ManagerSelection::from_names(["Анна", "Олег"]));
        assert_eq!(both.len(), 2);
    }

    #[test]
    fn test_filter_leaves_source_untouched() {
        let expenses = vec![expense(Some("Анна"), 100.0), expense(Some("Олег"), 250.0)];
        let _ = filter_by_manager(&expenses, &ManagerSelection::from_names(["Олег"]));
        assert_eq!(expenses.len(), 2);
    }
}
