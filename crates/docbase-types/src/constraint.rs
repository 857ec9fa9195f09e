//! Query constraint vocabulary.
//!
//! Constraints are carried through the facades and the adapter untouched;
//! only a store implementation gives them meaning.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Comparison operator of a field filter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FilterOp {
    Eq,
    NotEq,
    Lt,
    Lte,
    Gt,
    Gte,
    /// Field is an array containing the value.
    ArrayContains,
    /// Field equals one of the values in an array operand.
    In,
}

impl fmt::Display for FilterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Eq => "==",
            Self::NotEq => "!=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::ArrayContains => "array-contains",
            Self::In => "in",
        };
        f.write_str(s)
    }
}

/// Sort direction of an ordering key.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

/// One term of a collection query.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Constraint {
    Where {
        field: String,
        op: FilterOp,
        value: Value,
    },
    OrderBy {
        field: String,
        direction: Direction,
    },
    Limit {
        count: usize,
    },
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Where { field, op, value } => write!(f, "where {field} {op} {value}"),
            Self::OrderBy { field, direction } => write!(f, "order by {field} {direction:?}"),
            Self::Limit { count } => write!(f, "limit {count}"),
        }
    }
}

/// Field filter, e.g. `where_field("status", FilterOp::Eq, "open")`.
pub fn where_field(field: impl Into<String>, op: FilterOp, value: impl Into<Value>) -> Constraint {
    Constraint::Where {
        field: field.into(),
        op,
        value: value.into(),
    }
}

/// Sort key.
pub fn order_by(field: impl Into<String>, direction: Direction) -> Constraint {
    Constraint::OrderBy {
        field: field.into(),
        direction,
    }
}

/// Cap on the number of documents in a result set.
pub fn limit(count: usize) -> Constraint {
    Constraint::Limit { count }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builders_produce_expected_terms() {
        assert_eq!(
            where_field("age", FilterOp::Gte, 18),
            Constraint::Where {
                field: "age".into(),
                op: FilterOp::Gte,
                value: json!(18),
            }
        );
        assert_eq!(
            order_by("name", Direction::Desc),
            Constraint::OrderBy {
                field: "name".into(),
                direction: Direction::Desc,
            }
        );
        assert_eq!(limit(3), Constraint::Limit { count: 3 });
    }

    #[test]
    fn display() {
        assert_eq!(
            where_field("tags", FilterOp::ArrayContains, "a").to_string(),
            "where tags array-contains \"a\""
        );
        assert_eq!(limit(5).to_string(), "limit 5");
    }

    #[test]
    fn json_shape() {
        let c = where_field("status", FilterOp::NotEq, "done");
        let v = serde_json::to_value(&c).unwrap();
        assert_eq!(
            v,
            json!({"kind": "where", "field": "status", "op": "not-eq", "value": "done"})
        );
        let back: Constraint = serde_json::from_value(v).unwrap();
        assert_eq!(back, c);
    }
}
