use crate::domain::entities::predicate::{Comparison, Condition, FilterSink, Predicate, SortTerm};
use crate::usecase::ports::data_service::TableQuery;

/// Query-string pairs for a PostgREST table read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryPairs(pub Vec<(String, String)>);

impl FilterSink for QueryPairs {
    fn constrain(&mut self, predicate: &Predicate) {
        self.0.push((
            predicate.column.clone(),
            condition_expr(&predicate.condition, false),
        ));
    }

    fn constrain_any(&mut self, predicates: &[Predicate]) {
        let inner = predicates
            .iter()
            .map(|predicate| {
                format!(
                    "{}.{}",
                    predicate.column,
                    condition_expr(&predicate.condition, true)
                )
            })
            .collect::<Vec<_>>()
            .join(",");
        self.0.push(("or".to_string(), format!("({inner})")));
    }
}

pub fn query_pairs(query: &TableQuery) -> Vec<(String, String)> {
    let mut pairs = QueryPairs(vec![("select".to_string(), query.columns.join(","))]);
    query.filter.apply(&mut pairs);

    if !query.order.is_empty() {
        pairs.0.push(("order".to_string(), order_expr(&query.order)));
    }
    pairs.0.push(("offset".to_string(), query.offset.to_string()));
    pairs.0.push(("limit".to_string(), query.limit.to_string()));
    pairs.0
}

pub fn order_expr(terms: &[SortTerm]) -> String {
    terms
        .iter()
        .map(|term| {
            format!(
                "{}.{}.{}",
                term.column,
                if term.descending { "desc" } else { "asc" },
                if term.nulls_first { "nullsfirst" } else { "nullslast" }
            )
        })
        .collect::<Vec<_>>()
        .join(",")
}

fn comparison_op(comparison: Comparison) -> &'static str {
    match comparison {
        Comparison::Eq => "eq",
        Comparison::Ne => "neq",
        Comparison::Gt => "gt",
        Comparison::Gte => "gte",
        Comparison::Lt => "lt",
        Comparison::Lte => "lte",
    }
}

/// `nested` marks operands inside an `or=(...)` group, where reserved
/// characters must be quoted.
fn condition_expr(condition: &Condition, nested: bool) -> String {
    let operand = |value: &str| {
        if nested {
            quote_reserved(value)
        } else {
            value.to_string()
        }
    };
    match condition {
        Condition::Compare(comparison, value) => {
            format!("{}.{}", comparison_op(*comparison), operand(value))
        }
        Condition::ILike(pattern) => format!("ilike.{}", operand(pattern)),
        Condition::In(values) => {
            let members = values
                .iter()
                .map(|value| quote_reserved(value))
                .collect::<Vec<_>>()
                .join(",");
            format!("in.({members})")
        }
    }
}

pub fn quote_reserved(value: &str) -> String {
    if value.contains([',', '(', ')', '"', '\\', ':']) {
        let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
        format!("\"{escaped}\"")
    } else {
        value.to_string()
    }
}

/// Total from a `Content-Range` header such as `0-9/1234` or `*/0`.
pub fn parse_content_range(header: &str) -> Option<u64> {
    header.rsplit_once('/')?.1.trim().parse().ok()
}
