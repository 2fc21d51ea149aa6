//! Typed filter tree built from validated filter descriptors.
//!
//! Lowering here is pure: a `FilterPlan` carries no storage syntax. Each
//! backend walks the plan through a [`FilterSink`] and emits its own
//! predicate language (PostgREST query parameters, SQLite `WHERE` clauses).

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::entities::filter::{
    FilterDescriptor, FilterOperator, FilterValue, JoinOperator, SortDescriptor,
};
use crate::domain::entities::institution::{is_date_column, DEFAULT_SORT_COLUMN};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Comparison {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Condition {
    Compare(Comparison, String),
    /// Case-insensitive pattern, already wrapped in `%` on both sides.
    ILike(String),
    In(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Predicate {
    pub column: String,
    pub condition: Condition,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterPlan {
    #[default]
    Unfiltered,
    /// Independent constraints, implicitly conjoined.
    All(Vec<Predicate>),
    /// One compound disjunction.
    Any(Vec<Predicate>),
}

pub trait FilterSink {
    fn constrain(&mut self, predicate: &Predicate);
    fn constrain_any(&mut self, predicates: &[Predicate]);
}

impl FilterPlan {
    pub fn apply(&self, sink: &mut dyn FilterSink) {
        match self {
            FilterPlan::Unfiltered => {}
            FilterPlan::All(predicates) => {
                for predicate in predicates {
                    sink.constrain(predicate);
                }
            }
            FilterPlan::Any(predicates) => sink.constrain_any(predicates),
        }
    }

    pub fn predicates(&self) -> &[Predicate] {
        match self {
            FilterPlan::Unfiltered => &[],
            FilterPlan::All(predicates) | FilterPlan::Any(predicates) => predicates,
        }
    }

    /// Drops predicates on columns the backend cannot address.
    pub fn retain_columns(self, mut keep: impl FnMut(&str) -> bool) -> FilterPlan {
        match self {
            FilterPlan::Unfiltered => FilterPlan::Unfiltered,
            FilterPlan::All(predicates) => from_parts(retain(predicates, &mut keep), false),
            FilterPlan::Any(predicates) => from_parts(retain(predicates, &mut keep), true),
        }
    }
}

fn retain(predicates: Vec<Predicate>, keep: &mut dyn FnMut(&str) -> bool) -> Vec<Predicate> {
    predicates
        .into_iter()
        .filter(|predicate| {
            let known = keep(&predicate.column);
            if !known {
                warn!(column = %predicate.column, "dropping filter on unknown column");
            }
            known
        })
        .collect()
}

fn from_parts(predicates: Vec<Predicate>, disjunctive: bool) -> FilterPlan {
    if predicates.is_empty() {
        FilterPlan::Unfiltered
    } else if disjunctive {
        FilterPlan::Any(predicates)
    } else {
        FilterPlan::All(predicates)
    }
}

pub fn lower_filters(filters: &[FilterDescriptor], join_operator: JoinOperator) -> FilterPlan {
    let predicates = filters.iter().filter_map(lower_filter).collect::<Vec<_>>();
    from_parts(predicates, join_operator == JoinOperator::Or)
}

fn lower_filter(filter: &FilterDescriptor) -> Option<Predicate> {
    if filter.value.is_empty() {
        return None;
    }

    let column = filter.column_id.clone();
    let date_column = is_date_column(&column);
    let scalar = |value: &FilterValue| match value {
        FilterValue::Scalar(value) => {
            let value = value.trim();
            if date_column {
                let normalized = normalize_date_value(value);
                if normalized.is_none() {
                    warn!(column = %column, value, "dropping date filter with invalid timestamp");
                }
                normalized
            } else {
                Some(value.to_string())
            }
        }
        FilterValue::List(_) => {
            warn!(
                column = %column,
                operator = filter.operator.as_str(),
                "operator requires a single value"
            );
            None
        }
    };

    let condition = match filter.operator {
        FilterOperator::Eq => Condition::Compare(Comparison::Eq, scalar(&filter.value)?),
        FilterOperator::Ne => Condition::Compare(Comparison::Ne, scalar(&filter.value)?),
        FilterOperator::Gt => Condition::Compare(Comparison::Gt, scalar(&filter.value)?),
        FilterOperator::Gte => Condition::Compare(Comparison::Gte, scalar(&filter.value)?),
        FilterOperator::Lt => Condition::Compare(Comparison::Lt, scalar(&filter.value)?),
        FilterOperator::Lte => Condition::Compare(Comparison::Lte, scalar(&filter.value)?),
        FilterOperator::ILike => Condition::ILike(format!("%{}%", scalar(&filter.value)?)),
        FilterOperator::InArray => match &filter.value {
            FilterValue::List(values) => {
                let mut members = Vec::with_capacity(values.len());
                for value in values.iter().map(|value| value.trim()) {
                    if value.is_empty() {
                        continue;
                    }
                    if date_column {
                        match normalize_date_value(value) {
                            Some(normalized) => members.push(normalized),
                            None => {
                                warn!(column = %column, value, "dropping date filter with invalid timestamp");
                                return None;
                            }
                        }
                    } else {
                        members.push(value.to_string());
                    }
                }
                Condition::In(members)
            }
            FilterValue::Scalar(_) => {
                warn!(column = %column, "'inArray' operator requires an array value");
                return None;
            }
        },
    };

    Some(Predicate { column, condition })
}

/// Millisecond timestamps and calendar dates become ISO-8601 instants, the
/// form the mirror stores. Anything else passes through unchanged.
pub fn normalize_date_value(value: &str) -> Option<String> {
    let trimmed = value.trim();
    let digits = trimmed.strip_prefix('-').unwrap_or(trimmed);
    let is_integer = !digits.is_empty() && digits.bytes().all(|byte| byte.is_ascii_digit());
    if !is_integer {
        return Some(calendar_date_instant(trimmed).unwrap_or_else(|| trimmed.to_string()));
    }

    let millis: i64 = trimmed.parse().ok()?;
    let instant = DateTime::<Utc>::from_timestamp_millis(millis)?;
    Some(instant.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Midnight UTC of a `MM/DD/YYYY` or `YYYY-MM-DD` date.
pub fn calendar_date_instant(raw: &str) -> Option<String> {
    let date = NaiveDate::parse_from_str(raw, "%m/%d/%Y")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y-%m-%d"))
        .ok()?;
    Some(format!("{}T00:00:00.000Z", date.format("%Y-%m-%d")))
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortTerm {
    pub column: String,
    pub descending: bool,
    pub nulls_first: bool,
}

impl SortTerm {
    /// Nulls behave as the smallest value: first when ascending, last when descending.
    pub fn new(column: impl Into<String>, descending: bool) -> Self {
        Self {
            column: column.into(),
            descending,
            nulls_first: !descending,
        }
    }
}

pub fn lower_sort(sort: &[SortDescriptor]) -> Vec<SortTerm> {
    if sort.is_empty() {
        return vec![SortTerm::new(DEFAULT_SORT_COLUMN, true)];
    }
    sort.iter()
        .map(|item| SortTerm::new(item.column_id.clone(), item.descending))
        .collect()
}
