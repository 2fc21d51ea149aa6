use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::domain::entities::taxonomy::FlattenedFieldRow;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedPair {
    pub institution_id: Option<i64>,
    pub report_period_id: Option<i64>,
    pub institution_name: Option<String>,
    pub report_date: Option<String>,
}

impl SelectedPair {
    /// Both ids, or nothing: half-filled pairs never hit the data service.
    pub fn ids(&self) -> Option<(i64, i64)> {
        Some((self.institution_id?, self.report_period_id?))
    }
}

/// Pairs up the two id lists up to the longer one.
pub fn zip_pairs(institution_ids: &[i64], report_period_ids: &[i64]) -> Vec<SelectedPair> {
    let count = institution_ids.len().max(report_period_ids.len());
    (0..count)
        .map(|idx| SelectedPair {
            institution_id: institution_ids.get(idx).copied(),
            report_period_id: report_period_ids.get(idx).copied(),
            ..SelectedPair::default()
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstitutionOption {
    pub id: i64,
    pub name: String,
    #[serde(default, deserialize_with = "text_or_number")]
    pub cert: Option<String>,
    #[serde(default)]
    pub dep: Option<f64>,
}

fn text_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(text) => Some(text),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportPeriod {
    pub report_period_id: i64,
    pub report_date: String,
}

pub fn resolve_pair_labels(
    pairs: &mut [SelectedPair],
    institutions: &[InstitutionOption],
    report_periods: &[ReportPeriod],
) {
    for pair in pairs.iter_mut() {
        pair.institution_name = pair.institution_id.and_then(|id| {
            institutions
                .iter()
                .find(|institution| institution.id == id)
                .map(|institution| institution.name.clone())
        });
        pair.report_date = pair.report_period_id.and_then(|id| {
            report_periods
                .iter()
                .find(|period| period.report_period_id == id)
                .map(|period| period.report_date.clone())
        });
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMeta {
    pub field_id: i64,
    pub field_name: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub title_alt: Option<String>,
    #[serde(default)]
    pub description_alt: Option<String>,
}

impl FieldMeta {
    pub fn label(&self) -> &str {
        self.title_alt
            .as_deref()
            .or(self.title.as_deref())
            .unwrap_or(&self.field_name)
    }

    pub fn tooltip(&self) -> &str {
        self.description_alt
            .as_deref()
            .or(self.description.as_deref())
            .unwrap_or("No description available.")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComparisonRow {
    pub field: FieldMeta,
    pub position: FlattenedFieldRow,
}

/// Index of the first row for every distinct field id, in row order.
pub fn first_occurrence_indices(rows: &[ComparisonRow]) -> Vec<usize> {
    let mut seen = HashSet::new();
    rows.iter()
        .enumerate()
        .filter(|(_, row)| seen.insert(row.field.field_id))
        .map(|(idx, _)| idx)
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComparisonTable {
    pub pairs: Vec<SelectedPair>,
    pub rows: Vec<ComparisonRow>,
    /// `values[row][pair]`, aligned with `rows` and `pairs`.
    pub values: Vec<Vec<Option<f64>>>,
}

impl ComparisonTable {
    /// Takes rows and values computed for every enriched row, then keeps only
    /// the first occurrence of each field, filtering both with the same index set.
    pub fn assemble(
        enriched: Vec<ComparisonRow>,
        mut values: Vec<Vec<Option<f64>>>,
        pairs: Vec<SelectedPair>,
    ) -> Self {
        values.resize_with(enriched.len(), || vec![None; pairs.len()]);
        let keep = first_occurrence_indices(&enriched).into_iter().collect::<BTreeSet<_>>();

        let (rows, values): (Vec<_>, Vec<_>) = enriched
            .into_iter()
            .zip(values)
            .enumerate()
            .filter(|(idx, _)| keep.contains(idx))
            .map(|(_, (row, mut cells))| {
                cells.resize(pairs.len(), None);
                (row, cells)
            })
            .unzip();

        Self {
            pairs,
            rows,
            values,
        }
    }

    pub fn visible_rows<'a>(
        &'a self,
        expanded: &'a BTreeSet<String>,
    ) -> impl Iterator<Item = (&'a ComparisonRow, &'a [Option<f64>])> + 'a {
        self.rows
            .iter()
            .zip(self.values.iter())
            .filter(move |(row, _)| row.position.is_visible(expanded))
            .map(|(row, cells)| (row, cells.as_slice()))
    }
}
