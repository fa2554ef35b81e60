//! Raw field values and the total order used by sort comparators.
//!
//! Adapters hand the engine loosely-typed values: numbers, text, booleans,
//! nested sequences and maps, or nothing at all. [`RawValue`] is the common
//! currency for all of them. [`compare_values`] defines one total order over
//! that space so field comparators never panic on mixed-type columns.

use ordered_float::OrderedFloat;
use std::cmp::Ordering;

/// A loosely-typed field value as produced or consumed by a format adapter.
pub type RawValue = serde_json::Value;

/// Whether a value counts as absent for defaulting and `Required` checks.
///
/// A field that is missing from the record entirely and a field that is
/// present with an explicit null are treated the same way.
#[must_use]
pub fn is_absent(value: Option<&RawValue>) -> bool {
    matches!(value, None | Some(RawValue::Null))
}

/// Short lowercase label for a value's runtime type, used in error messages.
#[must_use]
pub fn type_label(value: &RawValue) -> &'static str {
    match value {
        RawValue::Null => "null",
        RawValue::Bool(_) => "bool",
        RawValue::Number(_) => "number",
        RawValue::String(_) => "text",
        RawValue::Array(_) => "sequence",
        RawValue::Object(_) => "nested",
    }
}

/// Total order over raw values.
///
/// Values of the same type compare naturally: numbers numerically (exact when
/// both sides are integers), text lexicographically, booleans with `false`
/// first, sequences element-wise, maps as ordered key/value pairs. Values of
/// different types order by type rank: null, then booleans, numbers, text,
/// sequences, maps. The order is total, so comparator-driven sorts never fail
/// on heterogeneous input.
#[must_use]
pub fn compare_values(a: &RawValue, b: &RawValue) -> Ordering {
    match (a, b) {
        (RawValue::Null, RawValue::Null) => Ordering::Equal,
        (RawValue::Bool(x), RawValue::Bool(y)) => x.cmp(y),
        (RawValue::Number(x), RawValue::Number(y)) => compare_numbers(x, y),
        (RawValue::String(x), RawValue::String(y)) => x.cmp(y),
        (RawValue::Array(x), RawValue::Array(y)) => {
            for (ax, bx) in x.iter().zip(y.iter()) {
                let ord = compare_values(ax, bx);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            x.len().cmp(&y.len())
        }
        (RawValue::Object(x), RawValue::Object(y)) => {
            for ((ak, av), (bk, bv)) in x.iter().zip(y.iter()) {
                let ord = ak.cmp(bk).then_with(|| compare_values(av, bv));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            x.len().cmp(&y.len())
        }
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

fn compare_numbers(a: &serde_json::Number, b: &serde_json::Number) -> Ordering {
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        return x.cmp(&y);
    }
    let x = OrderedFloat(a.as_f64().unwrap_or(f64::NAN));
    let y = OrderedFloat(b.as_f64().unwrap_or(f64::NAN));
    x.cmp(&y)
}

fn type_rank(value: &RawValue) -> u8 {
    match value {
        RawValue::Null => 0,
        RawValue::Bool(_) => 1,
        RawValue::Number(_) => 2,
        RawValue::String(_) => 3,
        RawValue::Array(_) => 4,
        RawValue::Object(_) => 5,
    }
}

/// Rough in-memory footprint of a value in bytes.
///
/// Used by the external sorter to decide when a byte-capped run buffer is
/// full. The estimate favors cheap computation over accuracy.
#[must_use]
pub fn estimated_size(value: &RawValue) -> usize {
    match value {
        RawValue::Null | RawValue::Bool(_) => 8,
        RawValue::Number(_) => 16,
        RawValue::String(s) => 24 + s.len(),
        RawValue::Array(items) => 24 + items.iter().map(estimated_size).sum::<usize>(),
        RawValue::Object(map) => {
            24 + map
                .iter()
                .map(|(k, v)| 24 + k.len() + estimated_size(v))
                .sum::<usize>()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn absent_covers_missing_and_null() {
        assert!(is_absent(None));
        assert!(is_absent(Some(&RawValue::Null)));
        assert!(!is_absent(Some(&json!(0))));
        assert!(!is_absent(Some(&json!(""))));
    }

    #[test]
    fn integers_compare_exactly() {
        let big = json!(9_007_199_254_740_993_i64);
        let bigger = json!(9_007_199_254_740_994_i64);
        assert_eq!(compare_values(&big, &bigger), Ordering::Less);
    }

    #[test]
    fn mixed_numbers_compare_numerically() {
        assert_eq!(compare_values(&json!(2), &json!(10.5)), Ordering::Less);
        assert_eq!(compare_values(&json!(10.5), &json!(2)), Ordering::Greater);
    }

    #[test]
    fn cross_type_order_is_stable() {
        let ordered = [json!(null), json!(false), json!(1), json!("a"), json!([1]), json!({"k": 1})];
        for pair in ordered.windows(2) {
            assert_eq!(compare_values(&pair[0], &pair[1]), Ordering::Less);
        }
    }

    #[test]
    fn sequences_compare_elementwise_then_by_length() {
        assert_eq!(compare_values(&json!([1, 2]), &json!([1, 3])), Ordering::Less);
        assert_eq!(compare_values(&json!([1, 2]), &json!([1, 2, 0])), Ordering::Less);
    }
}
