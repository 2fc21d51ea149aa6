use std::sync::Arc;

use futures_util::future::join_all;
use tracing::{debug, warn};

use crate::domain::entities::comparison::{
    resolve_pair_labels, zip_pairs, ComparisonRow, ComparisonTable, InstitutionOption,
    ReportPeriod, SelectedPair,
};
use crate::domain::entities::taxonomy::{FlattenedFieldRow, Taxonomy};
use crate::usecase::ports::data_service::DataService;

const INSTITUTION_OPTION_LIMIT: u64 = 10;
const REPORT_PERIOD_LIMIT: u64 = 10;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComparisonRequest {
    pub field_group: String,
    pub institution_ids: Vec<i64>,
    pub report_period_ids: Vec<i64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComparisonPage {
    pub field_groups: Vec<String>,
    pub institutions: Vec<InstitutionOption>,
    pub report_periods: Vec<ReportPeriod>,
    pub table: ComparisonTable,
}

pub struct ComparisonService {
    data: Arc<dyn DataService>,
    taxonomy: Arc<Taxonomy>,
}

impl ComparisonService {
    pub fn new(data: Arc<dyn DataService>, taxonomy: Arc<Taxonomy>) -> Self {
        Self { data, taxonomy }
    }

    pub fn field_groups(&self) -> Vec<String> {
        self.taxonomy.section_names()
    }

    pub async fn load(&self, request: &ComparisonRequest) -> ComparisonPage {
        let (institutions, report_periods) =
            tokio::join!(self.institution_options(), self.report_periods());

        let mut pairs = zip_pairs(&request.institution_ids, &request.report_period_ids);
        resolve_pair_labels(&mut pairs, &institutions, &report_periods);

        let table = self.build_table(&request.field_group, pairs).await;

        ComparisonPage {
            field_groups: self.field_groups(),
            institutions,
            report_periods,
            table,
        }
    }

    pub async fn build_table(&self, field_group: &str, pairs: Vec<SelectedPair>) -> ComparisonTable {
        let flattened = self.taxonomy.flatten(field_group);
        let enriched = self.enrich(flattened).await;
        let values = self.fetch_values(&enriched, &pairs).await;
        ComparisonTable::assemble(enriched, values, pairs)
    }

    async fn enrich(&self, flattened: Vec<FlattenedFieldRow>) -> Vec<ComparisonRow> {
        let lookups = join_all(
            flattened
                .iter()
                .map(|position| self.data.field_by_name(&position.code)),
        )
        .await;

        flattened
            .into_iter()
            .zip(lookups)
            .filter_map(|(position, lookup)| match lookup {
                Ok(Some(field)) => Some(ComparisonRow { field, position }),
                Ok(None) => {
                    debug!(code = %position.code, "no metadata for field");
                    None
                }
                Err(err) => {
                    warn!(code = %position.code, error = %err, "field metadata lookup failed");
                    None
                }
            })
            .collect()
    }

    async fn fetch_values(
        &self,
        rows: &[ComparisonRow],
        pairs: &[SelectedPair],
    ) -> Vec<Vec<Option<f64>>> {
        join_all(rows.iter().map(|row| async move {
            join_all(
                pairs
                    .iter()
                    .map(|pair| self.cell_value(row.field.field_id, pair)),
            )
            .await
        }))
        .await
    }

    async fn cell_value(&self, field_id: i64, pair: &SelectedPair) -> Option<f64> {
        let (institution_id, report_period_id) = pair.ids()?;
        match self
            .data
            .reported_value(report_period_id, field_id, institution_id)
            .await
        {
            Ok(value) => value,
            Err(err) => {
                warn!(field_id, institution_id, report_period_id, error = %err, "reported value lookup failed");
                None
            }
        }
    }

    async fn institution_options(&self) -> Vec<InstitutionOption> {
        self.data
            .institution_options(INSTITUTION_OPTION_LIMIT)
            .await
            .unwrap_or_else(|err| {
                warn!(error = %err, "failed to load institution options");
                Vec::new()
            })
    }

    async fn report_periods(&self) -> Vec<ReportPeriod> {
        self.data
            .report_periods(REPORT_PERIOD_LIMIT)
            .await
            .unwrap_or_else(|err| {
                warn!(error = %err, "failed to load report periods");
                Vec::new()
            })
    }
}
