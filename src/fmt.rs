/// Group the integer digits of a non-negative whole number with commas.
fn group_thousands(whole: u64) -> String {
    let digits = whole.to_string();
    let mut with_commas = String::new();
    for (i, c) in digits.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            with_commas.push(',');
        }
        with_commas.push(c);
    }
    with_commas.chars().rev().collect()
}

/// Format a float as whole rubles with thousands separators: 1,234,568 ₽
pub fn money(val: f64) -> String {
    let rounded = val.round();
    let grouped = group_thousands(rounded.abs() as u64);
    if rounded < 0.0 {
        format!("-{grouped} ₽")
    } else {
        format!("{grouped} ₽")
    }
}

/// Format an integer count with thousands separators.
pub fn number(val: u64) -> String {
    group_thousands(val)
}

/// Format a weight in kilograms with one decimal place.
pub fn kg(val: f64) -> String {
    format!("{val:.1} кг")
}

pub fn percent(val: f64) -> String {
    format!("{val:.1}%")
}

/// Label for a weight bucket: integral weights drop the fraction.
pub fn grams(val: f64) -> String {
    if val.fract() == 0.0 {
        format!("{} г", val as i64)
    } else {
        format!("{val} г")
    }
}

/// Compact axis label: 1.5M, 250k, 900.
pub fn compact(val: f64) -> String {
    if val >= 1_000_000.0 {
        let m = val / 1_000_000.0;
        if m == m.floor() {
            format!("{}M", m as u64)
        } else {
            format!("{:.1}M", m)
        }
    } else if val >= 1000.0 {
        let k = val / 1000.0;
        if k == k.floor() {
            format!("{}k", k as u64)
        } else {
            format!("{:.1}k", k)
        }
    } else {
        format!("{}", val as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_formatting() {
        assert_eq!(money(1234.56), "1,235 ₽");
        assert_eq!(money(-500.0), "-500 ₽");
        assert_eq!(money(0.0), "0 ₽");
        assert_eq!(money(35_000_000.0), "35,000,000 ₽");
    }

    #[test]
    fn test_number_and_kg() {
        assert_eq!(number(1_000), "1,000");
        assert_eq!(number(12), "12");
        assert_eq!(kg(1000.0), "1000.0 кг");
        assert_eq!(percent(5.0), "5.0%");
    }

    #[test]
    fn test_grams_label() {
        assert_eq!(grams(250.0), "250 г");
        assert_eq!(grams(12.5), "12.5 г");
    }

    #[test]
    fn test_compact() {
        assert_eq!(compact(2_500_000.0), "2.5M");
        assert_eq!(compact(3_000_000.0), "3M");
        assert_eq!(compact(250_000.0), "250k");
        assert_eq!(compact(900.0), "900");
    }
}
