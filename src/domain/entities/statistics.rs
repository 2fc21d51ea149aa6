use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct KeyStatistics {
    pub total_institutions: f64,
    pub total_assets: f64,
    pub total_deposits: f64,
    pub total_branches: f64,
}

impl KeyStatistics {
    /// Accepts either the single-row array an RPC returns or the row itself.
    pub fn from_rpc(payload: &Value) -> Self {
        let row = match payload {
            Value::Array(rows) => rows.first(),
            other => Some(other),
        };
        let Some(row) = row else {
            return Self::default();
        };
        Self {
            total_institutions: number_field(row, "total_institutions"),
            total_assets: number_field(row, "total_assets"),
            total_deposits: number_field(row, "total_deposits"),
            total_branches: number_field(row, "total_branches"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketCount {
    pub label: String,
    pub count: f64,
}

/// Reads `[{<label_key>: .., count: ..}]`; missing labels become "Unknown".
pub fn bucket_counts(payload: &Value, label_key: &str) -> Vec<BucketCount> {
    let Value::Array(rows) = payload else {
        return Vec::new();
    };
    rows.iter()
        .map(|row| BucketCount {
            label: text_field(row, label_key),
            count: number_field(row, "count"),
        })
        .collect()
}

/// Collapses yearly counts into decades such as `1980-1989`, ordered by decade.
pub fn group_by_decade(yearly: &[BucketCount]) -> Vec<BucketCount> {
    let mut decades = BTreeMap::<i64, f64>::new();
    for item in yearly {
        let Ok(year) = item.label.trim().parse::<i64>() else {
            continue;
        };
        let start = year.div_euclid(10) * 10;
        *decades.entry(start).or_insert(0.0) += item.count;
    }
    decades
        .into_iter()
        .map(|(start, count)| BucketCount {
            label: format!("{start}-{}", start + 9),
            count,
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MarketShareKind {
    Assets,
    Deposits,
    Equity,
    NetIncome,
}

impl MarketShareKind {
    pub const ALL: [MarketShareKind; 4] = [
        MarketShareKind::Assets,
        MarketShareKind::Deposits,
        MarketShareKind::Equity,
        MarketShareKind::NetIncome,
    ];

    pub fn rpc_name(self) -> &'static str {
        match self {
            MarketShareKind::Assets => "get_market_share_of_top_assets",
            MarketShareKind::Deposits => "get_market_share_of_top_deposits",
            MarketShareKind::Equity => "get_market_share_of_top_eq",
            MarketShareKind::NetIncome => "get_market_share_of_top_netinc",
        }
    }

    /// Institution column the share is measured on.
    pub fn column(self) -> &'static str {
        match self {
            MarketShareKind::Assets => "asset",
            MarketShareKind::Deposits => "dep",
            MarketShareKind::Equity => "eq",
            MarketShareKind::NetIncome => "netinc",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            MarketShareKind::Assets => "Asset Concentration",
            MarketShareKind::Deposits => "Deposit Concentration",
            MarketShareKind::Equity => "Equity Concentration",
            MarketShareKind::NetIncome => "Net Income Concentration",
        }
    }

    pub fn cache_tag(self) -> &'static str {
        match self {
            MarketShareKind::Assets => "marketShareAssets",
            MarketShareKind::Deposits => "marketShareDeposits",
            MarketShareKind::Equity => "marketShareEquity",
            MarketShareKind::NetIncome => "marketShareNetIncome",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketShareItem {
    pub group_name: String,
    pub percentage_of_total: f64,
    pub bank_count: f64,
}

pub fn market_share_items(payload: &Value) -> Vec<MarketShareItem> {
    let Value::Array(rows) = payload else {
        return Vec::new();
    };
    let mut items = rows
        .iter()
        .map(|row| MarketShareItem {
            group_name: text_field(row, "group_name"),
            percentage_of_total: number_field(row, "percentage_of_total"),
            bank_count: number_field(row, "bank_count"),
        })
        .collect::<Vec<_>>();
    items.sort_by_key(|item| market_share_rank(&item.group_name));
    items
}

pub fn market_share_rank(group_name: &str) -> u8 {
    if group_name.contains("Top 0.1%") {
        1
    } else if group_name.contains("Top 1%") {
        2
    } else if group_name.contains("Top 10%") {
        3
    } else {
        4
    }
}

/// Bank class codes with their regulator-facing descriptions.
pub const BANK_CLASS_DESCRIPTIONS: [(&str, &str); 7] = [
    ("N", "National Charter, Fed Member (OCC)"),
    ("NM", "State Charter, Fed Non-Member (FDIC)"),
    ("SM", "State Charter, Fed Member (FRB)"),
    ("SB", "Federal Savings Banks"),
    ("SA", "Savings Associations"),
    ("OI", "Insured U.S. Branch of Foreign Institution"),
    ("unknown", "Unknown Classification"),
];

pub fn bank_class_description(code: &str) -> &str {
    BANK_CLASS_DESCRIPTIONS
        .iter()
        .find(|(known, _)| *known == code)
        .map(|(_, description)| *description)
        .unwrap_or(code)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CategoryChart {
    BankClass,
    CommunityBank,
    RegulatorAgent,
    CharteringAgency,
    Specialization,
}

impl CategoryChart {
    pub const ALL: [CategoryChart; 5] = [
        CategoryChart::BankClass,
        CategoryChart::CommunityBank,
        CategoryChart::RegulatorAgent,
        CategoryChart::CharteringAgency,
        CategoryChart::Specialization,
    ];

    pub fn column(self) -> &'static str {
        match self {
            CategoryChart::BankClass => "bkclass",
            CategoryChart::CommunityBank => "cb",
            CategoryChart::RegulatorAgent => "regagnt",
            CategoryChart::CharteringAgency => "chrtagnt",
            CategoryChart::Specialization => "specgrpn",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            CategoryChart::BankClass => "Institution Classification",
            CategoryChart::CommunityBank => "Community Banks",
            CategoryChart::RegulatorAgent => "Primary Regulators",
            CategoryChart::CharteringAgency => "Chartering Agencies",
            CategoryChart::Specialization => "Institution Specializations",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            CategoryChart::BankClass => "Distribution by FDIC Bank Class",
            CategoryChart::CommunityBank => "Institutions by Community Bank Status",
            CategoryChart::RegulatorAgent => "Institutions by Primary Regulatory Agency",
            CategoryChart::CharteringAgency => "Distribution by Chartering Authority",
            CategoryChart::Specialization => "Distribution by Business Focus",
        }
    }

    pub fn cache_tag(self) -> &'static str {
        match self {
            CategoryChart::BankClass => "bankClass",
            CategoryChart::CommunityBank => "communityBank",
            CategoryChart::RegulatorAgent => "regulatorAgent",
            CategoryChart::CharteringAgency => "charteringAgency",
            CategoryChart::Specialization => "specialization",
        }
    }
}

/// Turns raw category tallies into chart bars, largest first.
///
/// Bank classes keep every class and use their descriptions; other charts keep
/// the ten largest categories.
pub fn category_bars(chart: CategoryChart, tallies: &BTreeMap<String, f64>) -> Vec<BucketCount> {
    let mut bars = tallies
        .iter()
        .map(|(category, count)| BucketCount {
            label: match chart {
                CategoryChart::BankClass => bank_class_description(category).to_string(),
                _ => category.clone(),
            },
            count: *count,
        })
        .collect::<Vec<_>>();
    bars.sort_by(|a, b| b.count.total_cmp(&a.count));
    if chart != CategoryChart::BankClass {
        bars.truncate(10);
    }
    bars
}

/// Federal vs state charter counts, from rows flagged `1` in each column.
pub fn charter_type_bars(federal: f64, state: f64) -> Vec<BucketCount> {
    let mut bars = vec![
        BucketCount {
            label: "Federal Charter".to_string(),
            count: federal,
        },
        BucketCount {
            label: "State Charter".to_string(),
            count: state,
        },
    ];
    bars.sort_by(|a, b| b.count.total_cmp(&a.count));
    bars
}

pub fn number_field(row: &Value, key: &str) -> f64 {
    match row.get(key) {
        Some(Value::Number(number)) => number.as_f64().unwrap_or(0.0),
        Some(Value::String(text)) => text.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

pub fn text_field(row: &Value, key: &str) -> String {
    match row.get(key) {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Number(number)) => number.to_string(),
        _ => "Unknown".to_string(),
    }
}
