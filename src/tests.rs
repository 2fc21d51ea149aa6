use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use clap::Parser;
use rusqlite::{params, Connection};
use serde_json::{json, Value};
use tracing::Level;

use crate::config::{default_db_path, Cli, Command};
use crate::domain::entities::comparison::{
    zip_pairs, ComparisonRow, ComparisonTable, FieldMeta, InstitutionOption, ReportPeriod,
};
use crate::domain::entities::filter::{
    page_count, FilterDescriptor, FilterOperator, FilterValue, JoinOperator, PageRequest,
    PageResult, SortDescriptor,
};
use crate::domain::entities::institution::ColumnKind;
use crate::domain::entities::predicate::{
    lower_filters, lower_sort, normalize_date_value, Comparison, Condition, FilterPlan, SortTerm,
};
use crate::domain::entities::statistics::{
    group_by_decade, market_share_items, BucketCount, CategoryChart, KeyStatistics,
    MarketShareKind,
};
use crate::domain::entities::taxonomy::{FlattenedFieldRow, Taxonomy};
use crate::infra::cache::memory::{MemoryCache, NoopCache};
use crate::infra::import::csv::import_csv_to_sqlite;
use crate::infra::postgrest::params::{parse_content_range, query_pairs, quote_reserved};
use crate::infra::sqlite::queries::{age_distribution, call_rpc, market_share, query_table};
use crate::infra::sqlite::repo::SqliteRepo;
use crate::infra::sqlite::schema::{init_db, open_connection};
use crate::logging::{default_directives, LogConfig, LogFormat};
use crate::ui::format::{
    format_cell, format_date, format_millions_currency, format_number, format_reported,
    format_thousands_currency,
};
use crate::ui::pages::table::{is_out_of_range, render_table_page};
use crate::ui::params::{
    apply_pair_edit, encode_pairs, parse_comparison_request, parse_pair_edit, parse_table_request,
    with_sort_toggled, PairEdit, SearchParams, DEFAULT_PER_PAGE,
};
use crate::usecase::ports::cache::{cache_key, cached, CachePolicy, QueryCache};
use crate::usecase::ports::data_service::{DataService, RawPage, ServiceError, TableQuery};
use crate::usecase::services::comparison_service::{ComparisonRequest, ComparisonService};
use crate::usecase::services::dashboard_service::DashboardService;
use crate::usecase::services::query_service::{build_table_query, QueryService};

fn unique_test_dir(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock should be after epoch")
        .as_nanos();
    std::env::temp_dir().join(format!("fdic-{prefix}-{nanos}"))
}

fn filter(column: &str, operator: FilterOperator, value: &str) -> FilterDescriptor {
    FilterDescriptor {
        column_id: column.to_string(),
        operator,
        value: FilterValue::Scalar(value.to_string()),
    }
}

fn list_filter(column: &str, values: &[&str]) -> FilterDescriptor {
    FilterDescriptor {
        column_id: column.to_string(),
        operator: FilterOperator::InArray,
        value: FilterValue::List(values.iter().map(|value| value.to_string()).collect()),
    }
}

fn page_request(filters: Vec<FilterDescriptor>, join_operator: JoinOperator) -> PageRequest {
    PageRequest {
        page: 1,
        per_page: 10,
        filters,
        sort: Vec::new(),
        join_operator,
        columns: vec!["name".to_string(), "stalp".to_string(), "asset".to_string()],
    }
}

fn row_ids(page: &RawPage) -> Vec<i64> {
    page.rows
        .iter()
        .filter_map(|row| row.get("id").and_then(Value::as_i64))
        .collect()
}

/// Four institutions: three in CA (one without assets) and one in NY.
fn seed_institutions(db_path: &Path) {
    init_db(db_path).expect("init_db should succeed");
    let conn = open_connection(db_path).expect("should open sqlite db");
    let rows: [(i64, &str, &str, Option<f64>); 4] = [
        (1, "Alpha Bank", "CA", Some(100.0)),
        (2, "Beta Savings", "CA", None),
        (3, "Gamma Trust", "NY", Some(500.0)),
        (4, "Delta Bank", "CA", Some(300.0)),
    ];
    for (id, name, state, asset) in rows {
        conn.execute(
            "INSERT INTO institutions (id, name, stalp, asset) VALUES (?1, ?2, ?3, ?4)",
            params![id, name, state, asset],
        )
        .expect("should insert institution");
    }
}

const SMALL_TAXONOMY: &str = r#"{
  "sections": [
    {
      "name": "Balance",
      "children": [
        { "code": "ASSET", "children": [{ "code": "LNLS" }, { "code": "MISSING" }] },
        { "code": "DEP" },
        { "code": "ASSET", "children": [{ "code": "LNLS" }, { "code": "MISSING" }] }
      ]
    },
    { "name": "Income", "children": [{ "code": "NETINC" }] }
  ]
}"#;

fn field(field_id: i64, field_name: &str) -> FieldMeta {
    FieldMeta {
        field_id,
        field_name: field_name.to_string(),
        title: Some(format!("{field_name} title")),
        description: None,
        title_alt: None,
        description_alt: None,
    }
}

#[derive(Default)]
struct FakeData {
    fail: bool,
    fields: Vec<FieldMeta>,
    values: HashMap<(i64, i64, i64), f64>,
    value_calls: AtomicUsize,
}

impl FakeData {
    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    fn check(&self) -> Result<(), ServiceError> {
        if self.fail {
            Err(ServiceError::Transport("connection refused".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl DataService for FakeData {
    async fn fetch_rows(&self, _query: TableQuery) -> Result<RawPage, ServiceError> {
        self.check()?;
        Ok(RawPage::default())
    }

    async fn call_rpc(&self, _name: &str) -> Result<Value, ServiceError> {
        self.check()?;
        Ok(json!([]))
    }

    async fn field_by_name(&self, field_name: &str) -> Result<Option<FieldMeta>, ServiceError> {
        self.check()?;
        Ok(self
            .fields
            .iter()
            .find(|field| field.field_name == field_name)
            .cloned())
    }

    async fn reported_value(
        &self,
        report_period_id: i64,
        field_id: i64,
        institution_id: i64,
    ) -> Result<Option<f64>, ServiceError> {
        self.check()?;
        self.value_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .values
            .get(&(report_period_id, field_id, institution_id))
            .copied())
    }

    async fn institution_options(
        &self,
        _limit: u64,
    ) -> Result<Vec<InstitutionOption>, ServiceError> {
        self.check()?;
        Ok(vec![InstitutionOption {
            id: 10,
            name: "First Bank".to_string(),
            cert: Some("1234".to_string()),
            dep: Some(5000.0),
        }])
    }

    async fn report_periods(&self, _limit: u64) -> Result<Vec<ReportPeriod>, ServiceError> {
        self.check()?;
        Ok(vec![ReportPeriod {
            report_period_id: 100,
            report_date: "2024-12-31".to_string(),
        }])
    }
}

#[test]
fn init_db_creates_required_tables() {
    let temp_dir = unique_test_dir("init-db");
    let db_path = temp_dir.join("nested").join("mirror.sqlite");

    let result = init_db(&db_path);

    assert!(result.is_ok(), "init_db should succeed: {result:?}");

    let conn = Connection::open(&db_path).expect("should open sqlite db");
    let table_count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN ('institutions','fields','report_periods','reported_values')",
            [],
            |row| row.get(0),
        )
        .expect("table count query should succeed");

    assert_eq!(table_count, 4, "mirror tables should exist");
    assert!(init_db(&db_path).is_ok(), "init_db should be idempotent");

    fs::remove_dir_all(&temp_dir).expect("should cleanup temp dir");
}

#[test]
fn flatten_walks_codes_depth_first() {
    let taxonomy = Taxonomy::from_json(SMALL_TAXONOMY).expect("taxonomy should parse");

    let rows = taxonomy.flatten("Balance");
    let codes = rows.iter().map(|row| row.code.as_str()).collect::<Vec<_>>();

    assert_eq!(
        codes,
        vec!["ASSET", "LNLS", "MISSING", "DEP", "ASSET", "LNLS", "MISSING"]
    );
    assert_eq!(
        rows[1],
        FlattenedFieldRow {
            code: "LNLS".to_string(),
            depth: 1,
            has_children: false,
            ancestor_path: vec!["ASSET".to_string(), "LNLS".to_string()],
        }
    );
    assert!(rows[0].has_children);
    assert_eq!(rows[3].depth, 0);
    assert!(taxonomy.flatten("No Such Section").is_empty());
}

#[test]
fn nested_rows_need_expanded_ancestors() {
    let taxonomy = Taxonomy::from_json(SMALL_TAXONOMY).expect("taxonomy should parse");
    let rows = taxonomy.flatten("Balance");
    let mut expanded = BTreeSet::new();

    assert!(rows[0].is_visible(&expanded));
    assert!(!rows[1].is_visible(&expanded));

    expanded.insert("ASSET".to_string());
    assert!(rows[1].is_visible(&expanded));

    let deep = FlattenedFieldRow {
        code: "LNRE".to_string(),
        depth: 2,
        has_children: false,
        ancestor_path: vec!["ASSET".to_string(), "LNLSGR".to_string(), "LNRE".to_string()],
    };
    assert!(!deep.is_visible(&expanded), "every ancestor must be expanded");
    expanded.insert("LNLSGR".to_string());
    assert!(deep.is_visible(&expanded));
}

#[test]
fn bundled_taxonomy_has_four_field_groups() {
    let taxonomy = crate::infra::taxonomy::bundled().expect("bundled taxonomy should parse");

    let names = taxonomy.section_names();

    assert_eq!(names.len(), 4);
    assert_eq!(names[0], "Assets, Liabilities, and Capital");
    let liab_rows = taxonomy
        .flatten(&names[0])
        .into_iter()
        .filter(|row| row.code == "LIAB")
        .count();
    assert!(liab_rows >= 2, "balance section repeats LIAB under LIABEQ");
}

#[test]
fn assemble_keeps_first_occurrence_of_each_field() {
    let taxonomy = Taxonomy::from_json(SMALL_TAXONOMY).expect("taxonomy should parse");
    let positions = taxonomy.flatten("Balance");
    let enriched = vec![
        ComparisonRow { field: field(1, "ASSET"), position: positions[0].clone() },
        ComparisonRow { field: field(3, "DEP"), position: positions[3].clone() },
        ComparisonRow { field: field(1, "ASSET"), position: positions[4].clone() },
    ];
    let values = vec![
        vec![Some(1.0), Some(2.0)],
        vec![Some(3.0), None],
        vec![Some(9.0), Some(9.0)],
    ];
    let pairs = zip_pairs(&[10, 11], &[100, 101]);

    let table = ComparisonTable::assemble(enriched, values, pairs);

    assert_eq!(table.rows.len(), 2);
    assert_eq!(table.values.len(), table.rows.len());
    assert!(table.values.iter().all(|cells| cells.len() == table.pairs.len()));
    assert_eq!(table.rows[0].position.depth, 0);
    assert_eq!(table.values[0], vec![Some(1.0), Some(2.0)]);
    assert_eq!(table.values[1], vec![Some(3.0), None]);
}

#[test]
fn assemble_shapes_matrix_for_empty_inputs() {
    let taxonomy = Taxonomy::from_json(SMALL_TAXONOMY).expect("taxonomy should parse");
    let positions = taxonomy.flatten("Balance");
    let enriched = vec![
        ComparisonRow { field: field(1, "ASSET"), position: positions[0].clone() },
        ComparisonRow { field: field(3, "DEP"), position: positions[3].clone() },
    ];

    let no_pairs = ComparisonTable::assemble(enriched, vec![Vec::new(), Vec::new()], Vec::new());
    assert_eq!(no_pairs.rows.len(), 2);
    assert_eq!(no_pairs.values.len(), 2);
    assert!(no_pairs.values.iter().all(|cells| cells.is_empty()));

    let no_rows = ComparisonTable::assemble(Vec::new(), Vec::new(), zip_pairs(&[1, 2], &[7]));
    assert!(no_rows.rows.is_empty());
    assert!(no_rows.values.is_empty());
    assert_eq!(no_rows.pairs.len(), 2);

    let short_values = ComparisonTable::assemble(
        vec![ComparisonRow { field: field(1, "ASSET"), position: positions[0].clone() }],
        Vec::new(),
        zip_pairs(&[1], &[7]),
    );
    assert_eq!(short_values.values, vec![vec![None]]);
}

#[test]
fn collapsing_an_ancestor_only_hides_rows() {
    let taxonomy = Taxonomy::from_json(SMALL_TAXONOMY).expect("taxonomy should parse");
    let rows = taxonomy.flatten("Balance");
    let visible = |expanded: &BTreeSet<String>| {
        rows.iter()
            .enumerate()
            .filter(|(_, row)| row.is_visible(expanded))
            .map(|(idx, _)| idx)
            .collect::<BTreeSet<_>>()
    };

    let expanded = BTreeSet::from(["ASSET".to_string(), "LNLSGR".to_string()]);
    let collapsed = BTreeSet::from(["LNLSGR".to_string()]);
    let wide = visible(&expanded);
    let narrow = visible(&collapsed);

    assert!(narrow.is_subset(&wide));
    assert!(narrow.len() < wide.len());
    assert_eq!(narrow, visible(&BTreeSet::new()));
}

#[test]
fn zip_pairs_pads_to_longer_list() {
    let pairs = zip_pairs(&[1, 2, 3], &[7]);

    assert_eq!(pairs.len(), 3);
    assert_eq!(pairs[0].ids(), Some((1, 7)));
    assert_eq!(pairs[1].institution_id, Some(2));
    assert_eq!(pairs[1].report_period_id, None);
    assert_eq!(pairs[2].ids(), None);
}

#[test]
fn lower_filters_skips_blank_values_and_wraps_ilike() {
    let filters = vec![
        filter("stalp", FilterOperator::Eq, "CA"),
        filter("name", FilterOperator::ILike, "bank"),
        filter("city", FilterOperator::Eq, "   "),
        list_filter("bkclass", &["", " "]),
    ];

    let plan = lower_filters(&filters, JoinOperator::And);

    let FilterPlan::All(predicates) = plan else {
        panic!("and-joined filters should lower to independent constraints");
    };
    assert_eq!(predicates.len(), 2);
    assert_eq!(
        predicates[0].condition,
        Condition::Compare(Comparison::Eq, "CA".to_string())
    );
    assert_eq!(predicates[1].condition, Condition::ILike("%bank%".to_string()));
}

#[test]
fn lower_filters_or_join_builds_single_disjunction() {
    let filters = vec![
        filter("stalp", FilterOperator::Eq, "NY"),
        filter("name", FilterOperator::ILike, "alpha"),
    ];

    let plan = lower_filters(&filters, JoinOperator::Or);

    assert!(matches!(&plan, FilterPlan::Any(predicates) if predicates.len() == 2));
    assert_eq!(lower_filters(&[], JoinOperator::Or), FilterPlan::Unfiltered);
}

#[test]
fn lower_filters_enforces_value_shapes() {
    let scalar_in = FilterDescriptor {
        column_id: "stalp".to_string(),
        operator: FilterOperator::InArray,
        value: FilterValue::Scalar("CA".to_string()),
    };
    let list_eq = FilterDescriptor {
        column_id: "stalp".to_string(),
        operator: FilterOperator::Eq,
        value: FilterValue::List(vec!["CA".to_string()]),
    };

    assert_eq!(lower_filters(&[scalar_in], JoinOperator::And), FilterPlan::Unfiltered);
    assert_eq!(lower_filters(&[list_eq], JoinOperator::And), FilterPlan::Unfiltered);

    let plan = lower_filters(&[list_filter("stalp", &["CA", " NY "])], JoinOperator::And);
    assert_eq!(
        plan.predicates()[0].condition,
        Condition::In(vec!["CA".to_string(), "NY".to_string()])
    );
}

#[test]
fn date_filters_convert_millisecond_timestamps() {
    assert_eq!(
        normalize_date_value("946684800000"),
        Some("2000-01-01T00:00:00.000Z".to_string())
    );
    assert_eq!(
        normalize_date_value("2020-01-01"),
        Some("2020-01-01T00:00:00.000Z".to_string())
    );
    assert_eq!(
        normalize_date_value("01/31/1990"),
        Some("1990-01-31T00:00:00.000Z".to_string())
    );
    assert_eq!(normalize_date_value("Q4 2024"), Some("Q4 2024".to_string()));
    assert_eq!(normalize_date_value("99999999999999999999"), None);

    let plan = lower_filters(
        &[filter("estymd", FilterOperator::Gte, "0")],
        JoinOperator::And,
    );
    assert_eq!(
        plan.predicates()[0].condition,
        Condition::Compare(Comparison::Gte, "1970-01-01T00:00:00.000Z".to_string())
    );

    let typed_date = lower_filters(
        &[filter("estymd", FilterOperator::Eq, "1990-01-01")],
        JoinOperator::And,
    );
    assert_eq!(
        typed_date.predicates()[0].condition,
        Condition::Compare(Comparison::Eq, "1990-01-01T00:00:00.000Z".to_string())
    );

    let invalid_member = lower_filters(
        &[list_filter("estymd", &["0", "99999999999999999999"])],
        JoinOperator::And,
    );
    assert_eq!(invalid_member, FilterPlan::Unfiltered);
}

#[test]
fn lower_sort_defaults_to_assets_descending_nulls_last() {
    assert_eq!(lower_sort(&[]), vec![SortTerm::new("asset", true)]);
    assert!(!lower_sort(&[])[0].nulls_first);

    let ascending = lower_sort(&[SortDescriptor {
        column_id: "name".to_string(),
        descending: false,
    }]);
    assert_eq!(ascending[0].column, "name");
    assert!(ascending[0].nulls_first);
}

#[test]
fn postgrest_pairs_for_and_filters() {
    let request = page_request(
        vec![
            filter("stalp", FilterOperator::Eq, "CA"),
            filter("name", FilterOperator::ILike, "bank"),
        ],
        JoinOperator::And,
    );

    let pairs = query_pairs(&build_table_query(&request));

    let expected = [
        ("select", "id,name,stalp,asset"),
        ("stalp", "eq.CA"),
        ("name", "ilike.%bank%"),
        ("order", "asset.desc.nullslast"),
        ("offset", "0"),
        ("limit", "10"),
    ]
    .iter()
    .map(|(key, value)| (key.to_string(), value.to_string()))
    .collect::<Vec<_>>();
    assert_eq!(pairs, expected);
}

#[test]
fn postgrest_pairs_for_or_filters_quote_reserved_values() {
    let mut request = page_request(
        vec![
            list_filter("stalp", &["CA", "NY"]),
            filter("name", FilterOperator::ILike, "First, Inc"),
            filter("asset", FilterOperator::Ne, "0"),
        ],
        JoinOperator::Or,
    );
    request.page = 3;

    let pairs = query_pairs(&build_table_query(&request));

    assert!(pairs.contains(&(
        "or".to_string(),
        "(stalp.in.(CA,NY),name.ilike.\"%First, Inc%\",asset.neq.0)".to_string()
    )));
    assert!(pairs.contains(&("offset".to_string(), "20".to_string())));
    assert_eq!(quote_reserved("a(b)"), "\"a(b)\"");
    assert_eq!(quote_reserved("plain"), "plain");
}

#[test]
fn content_range_total_is_parsed() {
    assert_eq!(parse_content_range("0-9/1234"), Some(1234));
    assert_eq!(parse_content_range("*/0"), Some(0));
    assert_eq!(parse_content_range("0-9/*"), None);
}

#[test]
fn sqlite_filter_eq_sorts_assets_descending_nulls_last() {
    let temp_dir = unique_test_dir("sqlite-and");
    let db_path = temp_dir.join("mirror.sqlite");
    seed_institutions(&db_path);
    let conn = open_connection(&db_path).expect("should open sqlite db");

    let request = page_request(
        vec![filter("stalp", FilterOperator::Eq, "CA")],
        JoinOperator::And,
    );
    let page = query_table(&conn, &build_table_query(&request)).expect("query should succeed");

    assert_eq!(page.total, 3);
    assert_eq!(row_ids(&page), vec![4, 1, 2]);
    assert_eq!(page.rows[2].get("asset"), Some(&Value::Null));

    let mut ascending = request.clone();
    ascending.sort = vec![SortDescriptor {
        column_id: "asset".to_string(),
        descending: false,
    }];
    let page = query_table(&conn, &build_table_query(&ascending)).expect("query should succeed");
    assert_eq!(row_ids(&page), vec![2, 1, 4]);

    drop(conn);
    fs::remove_dir_all(&temp_dir).expect("should cleanup temp dir");
}

#[test]
fn sqlite_and_intersects_or_unions() {
    let temp_dir = unique_test_dir("sqlite-join");
    let db_path = temp_dir.join("mirror.sqlite");
    seed_institutions(&db_path);
    let conn = open_connection(&db_path).expect("should open sqlite db");

    let and_request = page_request(
        vec![
            filter("stalp", FilterOperator::Eq, "CA"),
            filter("asset", FilterOperator::Gte, "150"),
        ],
        JoinOperator::And,
    );
    let page = query_table(&conn, &build_table_query(&and_request)).expect("query should succeed");
    assert_eq!(row_ids(&page), vec![4]);

    let or_request = page_request(
        vec![
            filter("stalp", FilterOperator::Eq, "NY"),
            filter("name", FilterOperator::ILike, "alpha"),
        ],
        JoinOperator::Or,
    );
    let page = query_table(&conn, &build_table_query(&or_request)).expect("query should succeed");
    assert_eq!(page.total, 2);
    assert_eq!(row_ids(&page), vec![3, 1]);

    let unknown_column = page_request(
        vec![filter("bogus", FilterOperator::Eq, "x")],
        JoinOperator::And,
    );
    let page =
        query_table(&conn, &build_table_query(&unknown_column)).expect("query should succeed");
    assert_eq!(page.total, 4, "filters on unknown columns are dropped");

    drop(conn);
    fs::remove_dir_all(&temp_dir).expect("should cleanup temp dir");
}

#[tokio::test]
async fn page_past_the_end_is_empty_with_page_count() {
    let temp_dir = unique_test_dir("out-of-range");
    let db_path = temp_dir.join("mirror.sqlite");
    seed_institutions(&db_path);
    let service = QueryService::new(
        Arc::new(SqliteRepo::new(db_path.clone())),
        Arc::new(NoopCache),
    );

    let mut request = page_request(Vec::new(), JoinOperator::And);
    request.per_page = 2;
    request.page = 5;
    let result = service.fetch_page(&request).await;

    assert!(result.rows.is_empty());
    assert_eq!(result.page_count, 2);
    assert!(is_out_of_range(&request, &result));

    request.page = 2;
    let result = service.fetch_page(&request).await;
    assert_eq!(result.rows.len(), 2);
    assert!(!is_out_of_range(&request, &result));

    fs::remove_dir_all(&temp_dir).expect("should cleanup temp dir");
}

#[test]
fn page_count_rounds_up() {
    assert_eq!(page_count(0, 10), 0);
    assert_eq!(page_count(20, 10), 2);
    assert_eq!(page_count(21, 10), 3);
    assert_eq!(page_count(5, 0), 0);
}

#[test]
fn memory_cache_expires_and_invalidates_by_tag() {
    let cache = MemoryCache::new();

    cache.set("a", json!(1), &["institutions"], Duration::from_secs(60));
    cache.set("b", json!(2), &["statistics", "institutions"], Duration::from_secs(60));
    cache.set("c", json!(3), &["statistics"], Duration::from_secs(60));
    cache.set("gone", json!(4), &["statistics"], Duration::ZERO);

    assert_eq!(cache.get("a"), Some(json!(1)));
    assert_eq!(cache.get("gone"), None, "zero ttl entries are already stale");

    assert_eq!(cache.invalidate_tag("institutions"), 2);
    assert_eq!(cache.get("b"), None);
    assert_eq!(cache.get("c"), Some(json!(3)));
    assert_eq!(cache.len(), 1);
}

#[test]
fn memory_cache_drops_expired_entries_on_insert() {
    let cache = MemoryCache::new();

    for idx in 0..1000 {
        cache.set(&format!("page-{idx}"), json!(idx), &["institutions"], Duration::ZERO);
    }
    cache.set("fresh", json!("kept"), &["institutions"], Duration::from_secs(60));

    assert_eq!(cache.len(), 1);
    assert_eq!(
        cache.invalidate_tag("institutions"),
        1,
        "stale entries should not linger in the map"
    );
}

#[tokio::test]
async fn cached_fetches_once_per_key() {
    let cache = MemoryCache::new();
    let calls = AtomicUsize::new(0);
    let policy = CachePolicy::new(Duration::from_secs(60), &["institutions"]);
    let key = cache_key("getInstitutions", &json!({ "page": 1 }));
    assert_eq!(key, "getInstitutions-{\"page\":1}");

    for _ in 0..3 {
        let value: u32 = cached(&cache, &key, policy.clone(), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            42
        })
        .await;
        assert_eq!(value, 42);
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    cache.invalidate_tag("institutions");
    let _: u32 = cached(&cache, &key, policy, || async {
        calls.fetch_add(1, Ordering::SeqCst);
        7
    })
    .await;
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn table_params_fall_back_to_defaults() {
    let request = parse_table_request(&SearchParams::parse(
        "page=abc&perPage=0&filters=not-json&sort=%7B&joinOperator=xor",
    ));

    assert_eq!(request.page, 1);
    assert_eq!(request.per_page, DEFAULT_PER_PAGE);
    assert!(request.filters.is_empty());
    assert!(request.sort.is_empty());
    assert_eq!(request.join_operator, JoinOperator::And);
    assert_eq!(request.columns, vec!["cert", "estymd", "name", "stalp", "dep"]);
}

#[test]
fn table_params_parse_filters_and_sort() {
    let filters = r#"[{"id":"name","value":"bank"},{"id":"stalp","value":"CA","operator":"eq"},{"id":"dep","value":"1","operator":"between"},{"id":"bkclass","value":["N","SM"],"operator":"inArray"}]"#;
    let sort = r#"[{"id":"dep","desc":true}]"#;
    let params = SearchParams::parse(&encode_pairs(&[
        ("page".to_string(), "2".to_string()),
        ("perPage".to_string(), "20".to_string()),
        ("columns".to_string(), "name,dep".to_string()),
        ("filters".to_string(), filters.to_string()),
        ("sort".to_string(), sort.to_string()),
        ("joinOperator".to_string(), "or".to_string()),
    ]));

    let request = parse_table_request(&params);

    assert_eq!(request.page, 2);
    assert_eq!(request.per_page, 20);
    assert_eq!(request.columns, vec!["name", "dep"]);
    assert_eq!(request.join_operator, JoinOperator::Or);
    assert_eq!(request.filters.len(), 3, "unknown operators are skipped");
    assert_eq!(request.filters[0].operator, FilterOperator::ILike);
    assert_eq!(
        request.filters[2].value,
        FilterValue::List(vec!["N".to_string(), "SM".to_string()])
    );
    assert_eq!(
        request.sort,
        vec![SortDescriptor {
            column_id: "dep".to_string(),
            descending: true,
        }]
    );
}

#[test]
fn header_click_sorts_descending_then_ascending() {
    let mut request = page_request(Vec::new(), JoinOperator::And);
    request.page = 4;

    let first = with_sort_toggled(&request, "dep");
    assert_eq!(first.page, 1);
    assert!(first.sort[0].descending);

    let second = with_sort_toggled(&first, "dep");
    assert!(!second.sort[0].descending);
}

#[test]
fn comparison_params_fall_back_to_first_group() {
    let groups = vec!["Balance".to_string(), "Income".to_string()];
    let params = SearchParams::parse("institutionId=1&institutionId=2&reportPeriodId=5,x");

    let request = parse_comparison_request(&params, &groups);

    assert_eq!(request.field_group, "Balance");
    assert_eq!(request.institution_ids, vec![1, 2]);
    assert_eq!(request.report_period_ids, vec![5]);

    let blank = parse_comparison_request(&SearchParams::parse("fieldGroup="), &groups);
    assert_eq!(blank.field_group, "Balance");
}

#[test]
fn comparison_params_keep_unknown_group() {
    let groups = vec!["Balance".to_string(), "Income".to_string()];
    let params = SearchParams::parse("fieldGroup=No+Such+Section&institutionId=1");

    let request = parse_comparison_request(&params, &groups);

    assert_eq!(request.field_group, "No Such Section");
    let taxonomy = Taxonomy::from_json(SMALL_TAXONOMY).expect("taxonomy should parse");
    assert!(taxonomy.flatten(&request.field_group).is_empty());
}

#[tokio::test]
async fn unknown_field_group_renders_no_rows() {
    let data = Arc::new(FakeData {
        fields: vec![field(1, "ASSET"), field(3, "DEP")],
        ..FakeData::default()
    });
    let taxonomy = Arc::new(Taxonomy::from_json(SMALL_TAXONOMY).expect("taxonomy should parse"));
    let service = ComparisonService::new(data.clone(), taxonomy);
    let groups = service.field_groups();
    let request = parse_comparison_request(
        &SearchParams::parse("fieldGroup=No+Such+Section&institutionId=10&reportPeriodId=100"),
        &groups,
    );

    let page = service.load(&request).await;

    assert!(page.table.rows.is_empty());
    assert!(page.table.values.is_empty());
    assert_eq!(page.table.pairs.len(), 1);
    assert_eq!(data.value_calls.load(Ordering::SeqCst), 0);
}

#[test]
fn pair_edits_append_replace_and_remove() {
    let request = ComparisonRequest {
        field_group: "Balance".to_string(),
        institution_ids: vec![1, 2],
        report_period_ids: vec![10, 20],
    };

    let appended = apply_pair_edit(
        &request,
        PairEdit { slot: 2, institution_id: Some(3), report_period_id: Some(30) },
    );
    assert_eq!(appended.institution_ids, vec![1, 2, 3]);
    assert_eq!(appended.report_period_ids, vec![10, 20, 30]);

    let replaced = apply_pair_edit(
        &request,
        PairEdit { slot: 0, institution_id: Some(9), report_period_id: Some(90) },
    );
    assert_eq!(replaced.institution_ids, vec![9, 2]);

    let edit = parse_pair_edit(&SearchParams::parse("slot=0&slotInstitution=1&slotPeriod="))
        .expect("slot edit should parse");
    let removed = apply_pair_edit(&request, edit);
    assert_eq!(removed.institution_ids, vec![2]);
    assert_eq!(removed.report_period_ids, vec![20]);

    let ignored = apply_pair_edit(
        &request,
        PairEdit { slot: 2, institution_id: Some(3), report_period_id: None },
    );
    assert_eq!(ignored, request);
}

#[test]
fn establishment_years_group_into_decades() {
    let yearly = vec![
        BucketCount { label: "1985".to_string(), count: 2.0 },
        BucketCount { label: "1989".to_string(), count: 3.0 },
        BucketCount { label: "2001".to_string(), count: 1.0 },
        BucketCount { label: "n/a".to_string(), count: 5.0 },
    ];

    let decades = group_by_decade(&yearly);

    assert_eq!(
        decades,
        vec![
            BucketCount { label: "1980-1989".to_string(), count: 5.0 },
            BucketCount { label: "2000-2009".to_string(), count: 1.0 },
        ]
    );
}

#[test]
fn market_share_groups_are_ranked() {
    let payload = json!([
        { "group_name": "All Others", "percentage_of_total": 20.0, "bank_count": 900 },
        { "group_name": "Top 10%", "percentage_of_total": 30.0, "bank_count": 100 },
        { "group_name": "Top 0.1%", "percentage_of_total": 40.0, "bank_count": 1 },
        { "group_name": "Top 1%", "percentage_of_total": 10.0, "bank_count": 10 },
    ]);

    let names = market_share_items(&payload)
        .into_iter()
        .map(|item| item.group_name)
        .collect::<Vec<_>>();

    assert_eq!(names, vec!["Top 0.1%", "Top 1%", "Top 10%", "All Others"]);
    assert!(market_share_items(&Value::Null).is_empty());
}

#[test]
fn formatting_matches_dashboard_conventions() {
    assert_eq!(format_millions_currency(0.0), "$0 Million");
    assert_eq!(format_millions_currency(2_500_000.0), "$2,500 Million");
    assert_eq!(format_thousands_currency(1234.0), "$1,234,000");
    assert_eq!(format_number(1_234_567.891, 2), "1,234,567.89");
    assert_eq!(format_number(-1500.0, 0), "-1,500");
    assert_eq!(format_date("2024-12-31T00:00:00.000Z"), "12/31/2024");
    assert_eq!(format_date("not a date"), "not a date");
    assert_eq!(format_reported(None), "-");
    assert_eq!(format_cell(ColumnKind::Currency, None), "-");
    assert_eq!(format_cell(ColumnKind::Percent, Some(&json!(12.5))), "12.50%");
}

#[tokio::test]
async fn comparison_builds_deduplicated_matrix() {
    let mut values = HashMap::new();
    values.insert((100, 1, 10), 500.0);
    values.insert((100, 3, 10), 250.0);
    let data = Arc::new(FakeData {
        fields: vec![field(1, "ASSET"), field(2, "LNLS"), field(3, "DEP")],
        values,
        ..FakeData::default()
    });
    let taxonomy = Arc::new(Taxonomy::from_json(SMALL_TAXONOMY).expect("taxonomy should parse"));
    let service = ComparisonService::new(data.clone(), taxonomy);

    let page = service
        .load(&ComparisonRequest {
            field_group: "Balance".to_string(),
            institution_ids: vec![10, 11],
            report_period_ids: vec![100],
        })
        .await;

    let codes = page
        .table
        .rows
        .iter()
        .map(|row| row.field.field_name.as_str())
        .collect::<Vec<_>>();
    assert_eq!(codes, vec!["ASSET", "LNLS", "DEP"]);
    assert_eq!(
        page.table.values,
        vec![
            vec![Some(500.0), None],
            vec![None, None],
            vec![Some(250.0), None],
        ]
    );
    assert_eq!(
        data.value_calls.load(Ordering::SeqCst),
        5,
        "half-filled pairs are never queried"
    );
    assert_eq!(page.table.pairs[0].institution_name.as_deref(), Some("First Bank"));
    assert_eq!(page.table.pairs[0].report_date.as_deref(), Some("2024-12-31"));
    assert_eq!(page.field_groups, vec!["Balance", "Income"]);

    let collapsed = BTreeSet::new();
    assert_eq!(page.table.visible_rows(&collapsed).count(), 2);
    let expanded = BTreeSet::from(["ASSET".to_string()]);
    assert_eq!(page.table.visible_rows(&expanded).count(), 3);
}

#[tokio::test]
async fn failing_backend_degrades_to_empty_results() {
    let data: Arc<dyn DataService> = Arc::new(FakeData::failing());
    let cache = Arc::new(MemoryCache::new());

    let queries = QueryService::new(data.clone(), cache.clone());
    let result = queries
        .fetch_page(&page_request(Vec::new(), JoinOperator::And))
        .await;
    assert_eq!(result, PageResult::empty());
    assert_eq!(cache.len(), 1, "degraded pages are cached like any other");

    let dashboard = DashboardService::new(data.clone(), Arc::new(NoopCache));
    assert_eq!(dashboard.key_statistics().await, KeyStatistics::default());
    assert!(dashboard.market_share(MarketShareKind::Assets).await.is_empty());
    assert!(dashboard.category(CategoryChart::CommunityBank).await.is_empty());
    assert!(dashboard
        .charter_types()
        .await
        .iter()
        .all(|bar| bar.count == 0.0));

    let taxonomy = Arc::new(Taxonomy::from_json(SMALL_TAXONOMY).expect("taxonomy should parse"));
    let comparison = ComparisonService::new(data, taxonomy);
    let page = comparison
        .load(&ComparisonRequest {
            field_group: "Balance".to_string(),
            institution_ids: vec![1],
            report_period_ids: vec![2],
        })
        .await;
    assert!(page.institutions.is_empty());
    assert!(page.table.rows.is_empty());
    assert_eq!(page.table.values.len(), page.table.rows.len());
    assert_eq!(page.table.pairs.len(), 1);
}

#[tokio::test]
async fn sqlite_dashboard_tallies_categories_and_charters() {
    let temp_dir = unique_test_dir("dashboard");
    let db_path = temp_dir.join("mirror.sqlite");
    init_db(&db_path).expect("init_db should succeed");
    let conn = open_connection(&db_path).expect("should open sqlite db");
    let rows: [(i64, Option<&str>, &str, &str); 4] = [
        (1, Some("N"), "1", "0"),
        (2, Some("N"), "1", "0"),
        (3, Some("SM"), "1", "0"),
        (4, None, "0", "1"),
    ];
    for (id, class, federal, state) in rows {
        conn.execute(
            "INSERT INTO institutions (id, bkclass, fedchrtr, stchrtr) VALUES (?1, ?2, ?3, ?4)",
            params![id, class, federal, state],
        )
        .expect("should insert institution");
    }
    drop(conn);

    let dashboard = DashboardService::new(
        Arc::new(SqliteRepo::new(db_path.clone())),
        Arc::new(MemoryCache::new()),
    );

    let classes = dashboard.category(CategoryChart::BankClass).await;
    assert_eq!(classes.len(), 3);
    assert_eq!(classes[0].label, "National Charter, Fed Member (OCC)");
    assert_eq!(classes[0].count, 2.0);
    assert!(classes
        .iter()
        .any(|bar| bar.label == "Unknown Classification"));

    let charters = dashboard.charter_types().await;
    assert_eq!(charters[0].label, "Federal Charter");
    assert_eq!(charters[0].count, 3.0);
    assert_eq!(charters[1].count, 1.0);

    let stats = dashboard.key_statistics().await;
    assert_eq!(stats.total_institutions, 4.0);

    fs::remove_dir_all(&temp_dir).expect("should cleanup temp dir");
}

#[test]
fn sqlite_procedures_bucket_ages_and_top_groups() {
    let temp_dir = unique_test_dir("procedures");
    let db_path = temp_dir.join("mirror.sqlite");
    init_db(&db_path).expect("init_db should succeed");
    let conn = open_connection(&db_path).expect("should open sqlite db");
    for id in 1..=10_i64 {
        let established = (id <= 3).then_some("2000-06-30T00:00:00.000Z");
        conn.execute(
            "INSERT INTO institutions (id, asset, estymd) VALUES (?1, ?2, ?3)",
            params![id, (id * 100) as f64, established],
        )
        .expect("should insert institution");
    }

    let ages = age_distribution(&conn, 2024).expect("age distribution should succeed");
    assert_eq!(
        ages,
        json!([
            { "age_range": "20-29", "count": 3 },
            { "age_range": "Unknown", "count": 7 },
        ])
    );

    let shares = market_share(&conn, "asset").expect("market share should succeed");
    let groups = shares
        .as_array()
        .expect("market share should be an array")
        .iter()
        .map(|group| (group["group_name"].clone(), group["bank_count"].clone()))
        .collect::<Vec<_>>();
    assert_eq!(
        groups,
        vec![
            (json!("Top 0.1%"), json!(1)),
            (json!("Top 1%"), json!(1)),
            (json!("Top 10%"), json!(1)),
            (json!("All Others"), json!(9)),
        ]
    );

    assert!(call_rpc(&conn, "get_unknown_procedure")
        .expect("unknown procedures are not errors")
        .is_none());

    drop(conn);
    fs::remove_dir_all(&temp_dir).expect("should cleanup temp dir");
}

#[test]
fn csv_import_normalizes_dates_and_skips_unknown_columns() {
    let temp_dir = unique_test_dir("csv-import");
    fs::create_dir_all(&temp_dir).expect("should create temp dir");
    let db_path = temp_dir.join("mirror.sqlite");
    let csv_path = temp_dir.join("institutions.csv");
    fs::write(
        &csv_path,
        "ID,Name,StAlp,Asset,EstYmd,Bogus\n1,Alpha Bank,CA,1000,01/31/2000,x\n2,Beta Bank,NY,,2010-05-01,y\n",
    )
    .expect("should write csv");

    let result =
        import_csv_to_sqlite(&db_path, "institutions", &csv_path).expect("import should succeed");

    assert_eq!(result.row_count, 2);
    assert_eq!(result.skipped_columns, vec!["bogus"]);

    let conn = open_connection(&db_path).expect("should open sqlite db");
    let (established, asset): (String, Option<f64>) = conn
        .query_row(
            "SELECT estymd, asset FROM institutions WHERE id = 1",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .expect("imported row should exist");
    assert_eq!(established, "2000-01-31T00:00:00.000Z");
    assert_eq!(asset, Some(1000.0));

    let missing_asset: Option<f64> = conn
        .query_row("SELECT asset FROM institutions WHERE id = 2", [], |row| row.get(0))
        .expect("imported row should exist");
    assert_eq!(missing_asset, None);

    assert!(import_csv_to_sqlite(&db_path, "no_such_table", &csv_path).is_err());

    drop(conn);
    fs::remove_dir_all(&temp_dir).expect("should cleanup temp dir");
}

#[test]
fn table_page_renders_recovery_link_past_the_end() {
    let mut request = page_request(Vec::new(), JoinOperator::And);
    request.page = 9;

    let html = render_table_page(
        request,
        PageResult {
            rows: Vec::new(),
            page_count: 2,
        },
    );

    assert!(html.starts_with("<!DOCTYPE html>"));
    assert!(html.contains("No results on page 9."));
    assert!(html.contains("Go to last page"));

    let html = render_table_page(page_request(Vec::new(), JoinOperator::And), PageResult::empty());
    assert!(html.contains("No results."));
    assert!(!html.contains("Go to last page"));
}

#[test]
fn cli_parses_import_with_global_log_flags() {
    let cli = Cli::try_parse_from([
        "fdic-dashboard",
        "-vv",
        "--log-format",
        "json",
        "import",
        "data.csv",
        "--table",
        "fields",
    ])
    .expect("cli should parse");

    assert_eq!(cli.verbose, 2);
    let config = cli.log_config();
    assert_eq!(config.level, Level::TRACE);
    assert_eq!(config.format, LogFormat::Json);
    let Command::Import(args) = cli.command else {
        panic!("import subcommand expected");
    };
    assert_eq!(args.table, "fields");
    assert_eq!(args.csv_path, PathBuf::from("data.csv"));
}

#[test]
fn log_filter_defaults_scope_our_crate() {
    assert_eq!(LogConfig::from_verbosity(0).level, Level::INFO);
    assert_eq!(LogConfig::from_verbosity(1).level, Level::DEBUG);
    assert!(default_directives(Level::DEBUG).contains("fdic_dashboard=debug"));
}

#[test]
fn default_db_path_uses_app_data_directory() {
    let db_path = default_db_path().expect("default db path should resolve");

    assert_eq!(
        db_path.file_name().and_then(|name| name.to_str()),
        Some("institutions.sqlite")
    );
}
