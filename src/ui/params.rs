//! Query-string state for the pages.
//!
//! Every page is driven by its URL: parsing never fails, malformed pieces fall
//! back to their defaults, and every link a page renders is produced by the
//! `*_href` builders here so the round trip stays consistent.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;
use url::form_urlencoded;

use crate::domain::entities::filter::{
    FilterDescriptor, FilterOperator, FilterValue, JoinOperator, PageRequest, SortDescriptor,
};
use crate::domain::entities::institution::DEFAULT_COLUMNS;
use crate::usecase::services::comparison_service::ComparisonRequest;

pub const DEFAULT_PER_PAGE: u32 = 10;
pub const PER_PAGE_OPTIONS: [u32; 5] = [10, 20, 30, 40, 50];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchParams(Vec<(String, String)>);

impl SearchParams {
    pub fn parse(query: &str) -> Self {
        Self(form_urlencoded::parse(query.as_bytes()).into_owned().collect())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }

    pub fn get_all(&self, key: &str) -> Vec<&str> {
        self.0
            .iter()
            .filter(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
            .collect()
    }

    /// Repeated keys and comma lists both count, blanks are dropped.
    pub fn list(&self, key: &str) -> Vec<String> {
        self.get_all(key)
            .into_iter()
            .flat_map(|value| value.split(','))
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(String::from)
            .collect()
    }
}

fn positive(raw: Option<&str>, default: u32) -> u32 {
    raw.and_then(|value| value.trim().parse::<u32>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(default)
}

#[derive(Debug, Deserialize, Serialize)]
struct WireFilter {
    id: String,
    #[serde(default)]
    value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    operator: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
struct WireSort {
    id: String,
    #[serde(default)]
    desc: bool,
}

fn filter_value(value: Value) -> Option<FilterValue> {
    let scalar = |value: Value| match value {
        Value::String(text) => Some(text),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    };
    match value {
        Value::Array(items) => Some(FilterValue::List(
            items.into_iter().filter_map(scalar).collect(),
        )),
        other => scalar(other).map(FilterValue::Scalar),
    }
}

fn descriptor(column_id: &str, operator: Option<&str>, value: Value) -> Option<FilterDescriptor> {
    let operator = match operator.map(str::trim).filter(|raw| !raw.is_empty()) {
        None => FilterOperator::ILike,
        Some(raw) => match FilterOperator::parse(raw) {
            Some(operator) => operator,
            None => {
                warn!(column = column_id, operator = raw, "skipping filter with unknown operator");
                return None;
            }
        },
    };
    Some(FilterDescriptor {
        column_id: column_id.to_string(),
        operator,
        value: filter_value(value)?,
    })
}

fn parse_filters(raw: Option<&str>) -> Vec<FilterDescriptor> {
    let Some(raw) = raw.filter(|raw| !raw.trim().is_empty()) else {
        return Vec::new();
    };
    match serde_json::from_str::<Vec<WireFilter>>(raw) {
        Ok(filters) => filters
            .into_iter()
            .filter_map(|filter| descriptor(&filter.id, filter.operator.as_deref(), filter.value))
            .collect(),
        Err(err) => {
            warn!(error = %err, "ignoring malformed filters parameter");
            Vec::new()
        }
    }
}

fn parse_sort(raw: Option<&str>) -> Vec<SortDescriptor> {
    let Some(raw) = raw.filter(|raw| !raw.trim().is_empty()) else {
        return Vec::new();
    };
    match serde_json::from_str::<Vec<WireSort>>(raw) {
        Ok(sort) => sort
            .into_iter()
            .map(|item| SortDescriptor {
                column_id: item.id,
                descending: item.desc,
            })
            .collect(),
        Err(err) => {
            warn!(error = %err, "ignoring malformed sort parameter");
            Vec::new()
        }
    }
}

/// The single filter submitted by the "add filter" form, if any.
fn form_filter(params: &SearchParams) -> Option<FilterDescriptor> {
    let column_id = params.get("filterId")?.trim();
    let raw_value = params.get("filterValue")?.trim();
    if column_id.is_empty() || raw_value.is_empty() {
        return None;
    }
    let operator = params.get("filterOperator");
    let value = if operator == Some(FilterOperator::InArray.as_str()) {
        Value::Array(
            raw_value
                .split(',')
                .map(|item| Value::String(item.trim().to_string()))
                .collect(),
        )
    } else {
        Value::String(raw_value.to_string())
    };
    descriptor(column_id, operator, value)
}

pub fn parse_table_request(params: &SearchParams) -> PageRequest {
    let mut columns = params.list("columns");
    if columns.is_empty() {
        columns = DEFAULT_COLUMNS.iter().map(|column| column.to_string()).collect();
    }

    let mut filters = parse_filters(params.get("filters"));
    filters.extend(form_filter(params));

    let join_operator = match params.get("joinOperator").map(str::trim) {
        Some("or") => JoinOperator::Or,
        _ => JoinOperator::And,
    };

    PageRequest {
        page: positive(params.get("page"), 1),
        per_page: positive(params.get("perPage"), DEFAULT_PER_PAGE),
        filters,
        sort: parse_sort(params.get("sort")),
        join_operator,
        columns,
    }
}

fn filters_json(filters: &[FilterDescriptor]) -> String {
    let wire = filters
        .iter()
        .map(|filter| WireFilter {
            id: filter.column_id.clone(),
            value: match &filter.value {
                FilterValue::Scalar(value) => Value::String(value.clone()),
                FilterValue::List(values) => {
                    Value::Array(values.iter().cloned().map(Value::String).collect())
                }
            },
            operator: Some(filter.operator.as_str().to_string()),
        })
        .collect::<Vec<_>>();
    serde_json::to_string(&wire).unwrap_or_default()
}

fn sort_json(sort: &[SortDescriptor]) -> String {
    let wire = sort
        .iter()
        .map(|item| WireSort {
            id: item.column_id.clone(),
            desc: item.descending,
        })
        .collect::<Vec<_>>();
    serde_json::to_string(&wire).unwrap_or_default()
}

/// Canonical query pairs for a table request; defaults are left out.
pub fn table_pairs(request: &PageRequest) -> Vec<(String, String)> {
    let mut pairs = vec![
        ("page".to_string(), request.page.to_string()),
        ("perPage".to_string(), request.per_page.to_string()),
        ("columns".to_string(), request.columns.join(",")),
    ];
    if !request.filters.is_empty() {
        pairs.push(("filters".to_string(), filters_json(&request.filters)));
    }
    if !request.sort.is_empty() {
        pairs.push(("sort".to_string(), sort_json(&request.sort)));
    }
    if request.join_operator == JoinOperator::Or {
        pairs.push(("joinOperator".to_string(), "or".to_string()));
    }
    pairs
}

pub fn encode_pairs(pairs: &[(String, String)]) -> String {
    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish()
}

pub fn table_href(request: &PageRequest) -> String {
    format!("/institutions/table?{}", encode_pairs(&table_pairs(request)))
}

pub fn with_page(request: &PageRequest, page: u32) -> PageRequest {
    PageRequest {
        page: page.max(1),
        ..request.clone()
    }
}

/// Clicking a header sorts by it descending, then ascending, replacing any
/// other sort and returning to the first page.
pub fn with_sort_toggled(request: &PageRequest, column_id: &str) -> PageRequest {
    let descending = match request.sort.first() {
        Some(current) if current.column_id == column_id => !current.descending,
        _ => true,
    };
    PageRequest {
        page: 1,
        sort: vec![SortDescriptor {
            column_id: column_id.to_string(),
            descending,
        }],
        ..request.clone()
    }
}

pub fn without_filter(request: &PageRequest, index: usize) -> PageRequest {
    let mut next = request.clone();
    if index < next.filters.len() {
        next.filters.remove(index);
    }
    next.page = 1;
    next
}

pub fn with_join_operator(request: &PageRequest, join_operator: JoinOperator) -> PageRequest {
    PageRequest {
        page: 1,
        join_operator,
        ..request.clone()
    }
}

pub fn parse_comparison_request(params: &SearchParams, field_groups: &[String]) -> ComparisonRequest {
    let ids = |key: &str| {
        params
            .list(key)
            .into_iter()
            .filter_map(|raw| match raw.parse::<i64>() {
                Ok(id) => Some(id),
                Err(_) => {
                    warn!(key, value = %raw, "ignoring non-numeric id");
                    None
                }
            })
            .collect::<Vec<_>>()
    };

    // An unknown group is kept as is and renders no rows.
    let field_group = match params.get("fieldGroup").map(str::trim) {
        Some(group) if !group.is_empty() => {
            if !field_groups.iter().any(|known| known == group) {
                warn!(field_group = group, "unknown field group");
            }
            group.to_string()
        }
        _ => field_groups.first().cloned().unwrap_or_default(),
    };

    ComparisonRequest {
        field_group,
        institution_ids: ids("institutionId"),
        report_period_ids: ids("reportPeriodId"),
    }
}

pub fn parse_expanded(params: &SearchParams) -> BTreeSet<String> {
    params.list("expanded").into_iter().collect()
}

pub fn toggle_expanded(expanded: &BTreeSet<String>, code: &str) -> BTreeSet<String> {
    let mut next = expanded.clone();
    if !next.remove(code) {
        next.insert(code.to_string());
    }
    next
}

pub fn comparison_pairs(request: &ComparisonRequest, expanded: &BTreeSet<String>) -> Vec<(String, String)> {
    let mut pairs = vec![("fieldGroup".to_string(), request.field_group.clone())];
    pairs.extend(
        request
            .institution_ids
            .iter()
            .map(|id| ("institutionId".to_string(), id.to_string())),
    );
    pairs.extend(
        request
            .report_period_ids
            .iter()
            .map(|id| ("reportPeriodId".to_string(), id.to_string())),
    );
    if !expanded.is_empty() {
        let codes = expanded.iter().cloned().collect::<Vec<_>>().join(",");
        pairs.push(("expanded".to_string(), codes));
    }
    pairs
}

pub fn comparison_href(request: &ComparisonRequest, expanded: &BTreeSet<String>) -> String {
    format!(
        "/comparison/new?{}",
        encode_pairs(&comparison_pairs(request, expanded))
    )
}

/// One submitted pair selector: slot `slot` now holds these ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairEdit {
    pub slot: usize,
    pub institution_id: Option<i64>,
    pub report_period_id: Option<i64>,
}

pub fn parse_pair_edit(params: &SearchParams) -> Option<PairEdit> {
    let slot = params.get("slot")?.trim().parse::<usize>().ok()?;
    let id = |key: &str| params.get(key).and_then(|raw| raw.trim().parse::<i64>().ok());
    Some(PairEdit {
        slot,
        institution_id: id("slotInstitution"),
        report_period_id: id("slotPeriod"),
    })
}

/// Applies a selector edit. A slot left without either id removes the whole
/// pair; a slot one past the end appends a pair.
pub fn apply_pair_edit(request: &ComparisonRequest, edit: PairEdit) -> ComparisonRequest {
    let count = request
        .institution_ids
        .len()
        .max(request.report_period_ids.len());
    let mut pairs = (0..count)
        .map(|idx| {
            (
                request.institution_ids.get(idx).copied(),
                request.report_period_ids.get(idx).copied(),
            )
        })
        .collect::<Vec<_>>();

    let complete = edit.institution_id.is_some() && edit.report_period_id.is_some();
    if edit.slot < pairs.len() {
        if complete {
            pairs[edit.slot] = (edit.institution_id, edit.report_period_id);
        } else {
            pairs.remove(edit.slot);
        }
    } else if complete {
        pairs.push((edit.institution_id, edit.report_period_id));
    }

    ComparisonRequest {
        field_group: request.field_group.clone(),
        institution_ids: pairs.iter().filter_map(|(institution, _)| *institution).collect(),
        report_period_ids: pairs.iter().filter_map(|(_, period)| *period).collect(),
    }
}
