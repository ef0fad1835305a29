use std::collections::BTreeMap;

use crate::models::ExpenseField;

/// Header keywords per canonical field, in resolution order: a header that
/// matches several fields maps to the last one listed here.
pub const COLUMN_KEYWORDS: &[(ExpenseField, &[&str])] = &[
    (ExpenseField::Date, &["дата", "date"]),
    (ExpenseField::Manager, &["кто", "manager"]),
    (ExpenseField::Amount, &["сумма", "amount"]),
    (ExpenseField::Qty, &["кол-во"]),
    (ExpenseField::WeightG, &["грам"]),
];

/// Which canonical field, if any, a lowercased header maps to.
pub fn field_for_header(header: &str) -> Option<ExpenseField> {
    let lower = header.to_lowercase();
    COLUMN_KEYWORDS
        .iter()
        .filter(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(field, _)| *field)
        .last()
}

/// Map canonical fields to source column indices. When several headers map
/// to the same field the rightmost one wins; unmatched headers are dropped.
pub fn normalize_columns(headers: &[String]) -> BTreeMap<ExpenseField, usize> {
    let mut mapping = BTreeMap::new();
    for (idx, header) in headers.iter().enumerate() {
        if let Some(field) = field_for_header(header) {
            mapping.insert(field, idx);
        }
    }
    mapping
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_russian_and_english_headers() {
        let map = normalize_columns(&headers(&[
            "Дата списания",
            "Кто списал",
            "Сумма, руб",
            "Кол-во, шт",
            "Граммовка",
            "Комментарий",
        ]));
        assert_eq!(map.get(&ExpenseField::Date), Some(&0));
        assert_eq!(map.get(&ExpenseField::Manager), Some(&1));
        assert_eq!(map.get(&ExpenseField::Amount), Some(&2));
        assert_eq!(map.get(&ExpenseField::Qty), Some(&3));
        assert_eq!(map.get(&ExpenseField::WeightG), Some(&4));
        assert_eq!(map.len(), 5);
    }

    #[test]
    fn test_english_headers_case_insensitive() {
        let map = normalize_columns(&headers(&["DATE", "Manager", "Amount"]));
        assert_eq!(map.len(), 3);
        assert_eq!(map.get(&ExpenseField::Amount), Some(&2));
    }

    #[test]
    fn test_rightmost_duplicate_wins() {
        let map = normalize_columns(&headers(&["Сумма план", "Сумма факт"]));
        assert_eq!(map.get(&ExpenseField::Amount), Some(&1));
    }

    #[test]
    fn test_header_matching_two_fields_takes_later_one() {
        assert_eq!(field_for_header("дата суммы"), Some(ExpenseField::Amount));
        assert_eq!(field_for_header("примечание"), None);
    }
}
