//! Filter predicates for computation parameters
//!
//! Builds boolean predicate trees and keeps them minimal: nested applications
//! of the same combinator collapse into one n-ary node, everything else is
//! left as written.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitAnd, BitOr, Not};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Filter {
    Condition(Condition),
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub field: String,
    pub op: Operator,
    pub value: FilterValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    Contains,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    String(String),
    Integer(i64),
    Number(f64),
    Boolean(bool),
    Null,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    And,
    Or,
}

impl Filter {
    fn condition(field: impl Into<String>, op: Operator, value: impl Into<FilterValue>) -> Self {
        Self::Condition(Condition {
            field: field.into(),
            op,
            value: value.into(),
        })
    }

    // Comparison operators
    pub fn eq(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::condition(field, Operator::Eq, value)
    }

    pub fn ne(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::condition(field, Operator::Ne, value)
    }

    pub fn gt(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::condition(field, Operator::Gt, value)
    }

    pub fn ge(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::condition(field, Operator::Ge, value)
    }

    pub fn lt(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::condition(field, Operator::Lt, value)
    }

    pub fn le(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::condition(field, Operator::Le, value)
    }

    pub fn contains(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::condition(field, Operator::Contains, FilterValue::String(value.into()))
    }

    // Logical operators
    pub fn and(left: Filter, right: Filter) -> Self {
        Self::And(vec![left, right])
    }

    pub fn or(left: Filter, right: Filter) -> Self {
        Self::Or(vec![left, right])
    }

    pub fn all(filters: Vec<Filter>) -> Self {
        Self::And(filters)
    }

    pub fn any(filters: Vec<Filter>) -> Self {
        Self::Or(filters)
    }

    pub fn negate(filter: Filter) -> Self {
        Self::Not(Box::new(filter))
    }

    /// Flatten nested applications of the same combinator into a single
    /// n-ary node. `AND(AND(a, b), OR(c, d))` becomes `AND(a, b, OR(c, d))`.
    /// No other rewriting is done.
    pub fn normalize(&self) -> Filter {
        match self {
            Filter::Condition(condition) => Filter::Condition(condition.clone()),
            Filter::And(children) => Filter::And(flatten(children, Combinator::And)),
            Filter::Or(children) => Filter::Or(flatten(children, Combinator::Or)),
            Filter::Not(inner) => Filter::Not(Box::new(inner.normalize())),
        }
    }

    /// Infix rendering, e.g. `(status = 'done' AND size > 10)`
    pub fn to_expression(&self) -> String {
        match self {
            Filter::Condition(condition) => condition.to_string(),
            Filter::And(children) => join(children, " AND "),
            Filter::Or(children) => join(children, " OR "),
            Filter::Not(inner) => format!("NOT {}", inner.to_expression()),
        }
    }
}

fn flatten(children: &[Filter], combinator: Combinator) -> Vec<Filter> {
    let mut flat = Vec::with_capacity(children.len());
    for child in children {
        // children come back already flat, one level of splicing is enough
        match (combinator, child.normalize()) {
            (Combinator::And, Filter::And(nested)) | (Combinator::Or, Filter::Or(nested)) => {
                flat.extend(nested)
            }
            (_, other) => flat.push(other),
        }
    }
    flat
}

fn join(children: &[Filter], separator: &str) -> String {
    let parts: Vec<String> = children.iter().map(Filter::to_expression).collect();
    format!("({})", parts.join(separator))
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_expression())
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self.op {
            Operator::Eq => "=",
            Operator::Ne => "!=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Contains => "CONTAINS",
        };
        write!(f, "{} {} {}", self.field, op, self.value)
    }
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterValue::String(s) => write!(f, "'{}'", s.replace('\'', "''")),
            FilterValue::Integer(i) => write!(f, "{}", i),
            FilterValue::Number(n) => write!(f, "{}", n),
            FilterValue::Boolean(b) => write!(f, "{}", b),
            FilterValue::Null => f.write_str("null"),
        }
    }
}

impl BitAnd for Filter {
    type Output = Filter;

    fn bitand(self, rhs: Filter) -> Filter {
        Filter::and(self, rhs)
    }
}

impl BitOr for Filter {
    type Output = Filter;

    fn bitor(self, rhs: Filter) -> Filter {
        Filter::or(self, rhs)
    }
}

impl Not for Filter {
    type Output = Filter;

    fn not(self) -> Filter {
        Filter::negate(self)
    }
}

// Convenient From implementations for FilterValue
impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        FilterValue::String(value)
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        FilterValue::String(value.to_string())
    }
}

impl From<f64> for FilterValue {
    fn from(value: f64) -> Self {
        FilterValue::Number(value)
    }
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        FilterValue::Integer(value)
    }
}

impl From<i32> for FilterValue {
    fn from(value: i32) -> Self {
        FilterValue::Integer(value as i64)
    }
}

impl From<bool> for FilterValue {
    fn from(value: bool) -> Self {
        FilterValue::Boolean(value)
    }
}
