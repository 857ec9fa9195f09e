//! Constraint evaluation for in-process backends.
//!
//! Comparison follows a total order across JSON types:
//! `null < bool < number < string < array < object`. Range filters only
//! match values of the same type as the operand, and an `order by` field
//! excludes documents that lack it.

use std::cmp::Ordering;

use serde_json::Value;

use docbase_types::{Constraint, Direction, Document, FilterOp, ID_FIELD};

/// Apply `constraints` to the documents of one collection.
///
/// Input order is the default result order; sort keys are applied in the
/// order given; the smallest limit wins.
pub fn run_query(mut docs: Vec<Document>, constraints: &[Constraint]) -> Vec<Document> {
    let mut sort_keys: Vec<(&str, Direction)> = Vec::new();
    let mut cap: Option<usize> = None;

    for constraint in constraints {
        match constraint {
            Constraint::Where { field, op, value } => {
                docs.retain(|doc| matches_filter(doc, field, *op, value));
            }
            Constraint::OrderBy { field, direction } => {
                docs.retain(|doc| lookup(doc, field).is_some());
                sort_keys.push((field.as_str(), *direction));
            }
            Constraint::Limit { count } => {
                cap = Some(cap.map_or(*count, |c| c.min(*count)));
            }
        }
    }

    if !sort_keys.is_empty() {
        docs.sort_by(|a, b| {
            for (field, direction) in &sort_keys {
                let ord = match (lookup(a, field), lookup(b, field)) {
                    (Some(x), Some(y)) => compare_values(&x, &y),
                    _ => Ordering::Equal,
                };
                let ord = match direction {
                    Direction::Asc => ord,
                    Direction::Desc => ord.reverse(),
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            Ordering::Equal
        });
    }

    if let Some(cap) = cap {
        docs.truncate(cap);
    }
    docs
}

/// Resolve a possibly dotted field path. `id` resolves to the document id.
pub fn lookup(doc: &Document, field: &str) -> Option<Value> {
    if field == ID_FIELD {
        return Some(Value::String(doc.id().to_string()));
    }
    let mut parts = field.split('.');
    let mut current = doc.fields().get(parts.next()?)?;
    for part in parts {
        current = current.as_object()?.get(part)?;
    }
    Some(current.clone())
}

fn matches_filter(doc: &Document, field: &str, op: FilterOp, operand: &Value) -> bool {
    let Some(value) = lookup(doc, field) else {
        return false;
    };
    match op {
        FilterOp::Eq => values_equal(&value, operand),
        FilterOp::NotEq => !values_equal(&value, operand),
        FilterOp::Lt => same_rank(&value, operand) && compare_values(&value, operand).is_lt(),
        FilterOp::Lte => same_rank(&value, operand) && compare_values(&value, operand).is_le(),
        FilterOp::Gt => same_rank(&value, operand) && compare_values(&value, operand).is_gt(),
        FilterOp::Gte => same_rank(&value, operand) && compare_values(&value, operand).is_ge(),
        FilterOp::ArrayContains => value
            .as_array()
            .is_some_and(|items| items.iter().any(|item| values_equal(item, operand))),
        FilterOp::In => operand
            .as_array()
            .is_some_and(|options| options.iter().any(|opt| values_equal(&value, opt))),
    }
}

fn type_rank(v: &Value) -> u8 {
    match v {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

fn same_rank(a: &Value, b: &Value) -> bool {
    type_rank(a) == type_rank(b)
}

/// Equality that treats `1` and `1.0` as the same number.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    same_rank(a, b) && compare_values(a, b) == Ordering::Equal
}

/// Total order over JSON values.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let (x, y) = (x.as_f64().unwrap_or(f64::NAN), y.as_f64().unwrap_or(f64::NAN));
            x.total_cmp(&y)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => {
            for (l, r) in x.iter().zip(y.iter()) {
                let ord = compare_values(l, r);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            x.len().cmp(&y.len())
        }
        (Value::Object(x), Value::Object(y)) => {
            for ((lk, lv), (rk, rv)) in x.iter().zip(y.iter()) {
                let ord = lk.cmp(rk).then_with(|| compare_values(lv, rv));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            x.len().cmp(&y.len())
        }
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}
