use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Column every institutions query selects, whatever the user picked.
pub const ID_COLUMN: &str = "id";

pub type Row = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterOperator {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    ILike,
    InArray,
}

impl FilterOperator {
    pub const ALL: [FilterOperator; 8] = [
        FilterOperator::ILike,
        FilterOperator::Eq,
        FilterOperator::Ne,
        FilterOperator::Gt,
        FilterOperator::Gte,
        FilterOperator::Lt,
        FilterOperator::Lte,
        FilterOperator::InArray,
    ];

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "eq" => Some(FilterOperator::Eq),
            "ne" => Some(FilterOperator::Ne),
            "gt" => Some(FilterOperator::Gt),
            "gte" => Some(FilterOperator::Gte),
            "lt" => Some(FilterOperator::Lt),
            "lte" => Some(FilterOperator::Lte),
            "iLike" => Some(FilterOperator::ILike),
            "inArray" => Some(FilterOperator::InArray),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FilterOperator::Eq => "eq",
            FilterOperator::Ne => "ne",
            FilterOperator::Gt => "gt",
            FilterOperator::Gte => "gte",
            FilterOperator::Lt => "lt",
            FilterOperator::Lte => "lte",
            FilterOperator::ILike => "iLike",
            FilterOperator::InArray => "inArray",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            FilterOperator::Eq => "is",
            FilterOperator::Ne => "is not",
            FilterOperator::Gt => "greater than",
            FilterOperator::Gte => "at least",
            FilterOperator::Lt => "less than",
            FilterOperator::Lte => "at most",
            FilterOperator::ILike => "contains",
            FilterOperator::InArray => "is any of",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Scalar(String),
    List(Vec<String>),
}

impl FilterValue {
    /// Blank scalars and lists without a single non-blank entry count as "no filter".
    pub fn is_empty(&self) -> bool {
        match self {
            FilterValue::Scalar(value) => value.trim().is_empty(),
            FilterValue::List(values) => values.iter().all(|value| value.trim().is_empty()),
        }
    }

    pub fn display(&self) -> String {
        match self {
            FilterValue::Scalar(value) => value.clone(),
            FilterValue::List(values) => values.join(", "),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FilterDescriptor {
    pub column_id: String,
    pub operator: FilterOperator,
    pub value: FilterValue,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinOperator {
    #[default]
    And,
    Or,
}

impl JoinOperator {
    pub fn as_str(self) -> &'static str {
        match self {
            JoinOperator::And => "and",
            JoinOperator::Or => "or",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortDescriptor {
    pub column_id: String,
    pub descending: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: u32,
    pub per_page: u32,
    pub filters: Vec<FilterDescriptor>,
    pub sort: Vec<SortDescriptor>,
    pub join_operator: JoinOperator,
    pub columns: Vec<String>,
}

impl PageRequest {
    /// The identifier column followed by the requested columns, without repeats.
    pub fn selected_columns(&self) -> Vec<String> {
        let mut selected = vec![ID_COLUMN.to_string()];
        for column in &self.columns {
            if !selected.iter().any(|existing| existing == column) {
                selected.push(column.clone());
            }
        }
        selected
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page.max(1) - 1) * u64::from(self.per_page)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageResult {
    pub rows: Vec<Row>,
    pub page_count: u64,
}

impl PageResult {
    pub fn empty() -> Self {
        Self::default()
    }
}

pub fn page_count(total_rows: u64, per_page: u32) -> u64 {
    if per_page == 0 {
        return 0;
    }
    total_rows.div_ceil(u64::from(per_page))
}
