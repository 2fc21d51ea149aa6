use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnKind {
    Text,
    Number,
    Currency,
    Percent,
    Date,
}

impl ColumnKind {
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            ColumnKind::Number | ColumnKind::Currency | ColumnKind::Percent
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDef {
    pub id: &'static str,
    pub label: &'static str,
    pub kind: ColumnKind,
}

const fn text(id: &'static str, label: &'static str) -> ColumnDef {
    ColumnDef {
        id,
        label,
        kind: ColumnKind::Text,
    }
}

const fn number(id: &'static str, label: &'static str) -> ColumnDef {
    ColumnDef {
        id,
        label,
        kind: ColumnKind::Number,
    }
}

const fn currency(id: &'static str, label: &'static str) -> ColumnDef {
    ColumnDef {
        id,
        label,
        kind: ColumnKind::Currency,
    }
}

const fn percent(id: &'static str, label: &'static str) -> ColumnDef {
    ColumnDef {
        id,
        label,
        kind: ColumnKind::Percent,
    }
}

const fn date(id: &'static str, label: &'static str) -> ColumnDef {
    ColumnDef {
        id,
        label,
        kind: ColumnKind::Date,
    }
}

pub const DEFAULT_COLUMNS: [&str; 5] = ["cert", "estymd", "name", "stalp", "dep"];

/// Sort applied when a request carries none: largest institutions first.
pub const DEFAULT_SORT_COLUMN: &str = "asset";

pub const INSTITUTION_COLUMNS: &[ColumnDef] = &[
    text("cert", "FDIC Cert #"),
    text("name", "Institution Name"),
    text("city", "City"),
    text("stname", "State Name"),
    text("zip", "Zip Code"),
    text("active", "Status"),
    text("bkclass", "Class"),
    currency("asset", "Total Assets"),
    currency("dep", "Total Deposits"),
    date("estymd", "Established"),
    text("webaddr", "Website"),
    text("address", "Street Address"),
    text("cb", "Community Bank"),
    text("cbsa", "CBSA Name"),
    text("cbsa_div", "CBSA Division Name"),
    text("cbsa_div_flg", "CBSA Division Flag"),
    text("cbsa_div_no", "CBSA Division Number"),
    text("cbsa_metro", "CBSA Metro Number"),
    text("cbsa_metro_flg", "CBSA Metro Flag"),
    text("cbsa_metro_name", "CBSA Metro Name"),
    text("cbsa_micro_flg", "CBSA Micro Flag"),
    text("cbsa_no", "CBSA Number"),
    text("certcons", "Parent Cert"),
    date("cfpbeffdte", "CFPB Effective Date"),
    date("cfpbenddte", "CFPB End Date"),
    text("cfpbflag", "CFPB Flag"),
    text("change1", "Change Code 1"),
    text("change2", "Change Code 2"),
    text("change3", "Change Code 3"),
    text("change4", "Change Code 4"),
    text("change5", "Change Code 5"),
    text("change6", "Change Code 6"),
    text("change7", "Change Code 7"),
    text("change8", "Change Code 8"),
    text("change9", "Change Code 9"),
    text("change10", "Change Code 10"),
    text("change11", "Change Code 11"),
    text("change12", "Change Code 12"),
    text("change13", "Change Code 13"),
    text("change14", "Change Code 14"),
    text("change15", "Change Code 15"),
    text("charter", "Charter Number"),
    text("chrtagnt", "Chartering Agency"),
    text("cityhcr", "City of High Holder"),
    number("clcode", "Class Code"),
    text("cmsa_no", "CMSA Number"),
    text("cmsa", "CMSA Name"),
    text("conserve", "Conservatorship"),
    text("county", "County"),
    text("csa", "CSA Name"),
    text("csa_no", "CSA Number"),
    text("csa_flg", "CSA Flag"),
    date("dateupdt", "Last Update Date"),
    text("denovo", "Denovo"),
    currency("depdom", "Domestic Deposits"),
    text("docket", "OTS Docket Number"),
    date("effdate", "Last Structure Change Effective Date"),
    date("endefymd", "End Date"),
    currency("eq", "Equity Capital"),
    text("fdicdbs", "FDIC Geographic Region"),
    text("fdicregn", "FDIC Supervisory Region"),
    text("fdicsupv", "Federal Reserve District"),
    text("fed", "Federal Reserve ID"),
    text("fed_rssd", "Federal Reserve RSSD"),
    text("fedchrtr", "Federal Charter"),
    text("fldoff", "FDIC Field Office"),
    text("form31", "FFIEC Call Report 31 Filer"),
    text("hctmult", "Bank Holding Company Type"),
    text("iba", "Insured Foreign Bank"),
    text("inactive", "Inactive"),
    text("insagnt1", "Primary Insurance Agency"),
    text("insagnt2", "Secondary Insurance Fund"),
    text("insbif", "Bank Insurance Fund"),
    text("inscoml", "Insured Commercial Bank"),
    date("insdate", "Deposit Insurance Date"),
    date("insdropdate", "Dropped Deposit Insurance Date"),
    text("insdif", "Deposit Insurance Fund Member"),
    number("insfdic", "FDIC Insured"),
    text("inssaif", "SAIF Insured"),
    text("inssave", "Insured Savings Institution"),
    text("instag", "Agricultural Lending Institution"),
    text("instcrcd", "Credit Card Institution"),
    number("latitude", "Latitude"),
    text("law_sasser_flg", "Law Sasser Flag"),
    number("longitude", "Longitude"),
    text("mdi_status_code", "Minority Status Code"),
    text("mdi_status_desc", "Minority Status Description"),
    text("msa", "MSA Name"),
    text("msa_no", "MSA Number"),
    text("mutual", "Ownership Type"),
    text("namehcr", "Holding Company Name"),
    currency("netinc", "Net Income"),
    currency("netincq", "Net Income Quarterly"),
    text("newcert", "New Certificate Number"),
    text("oakar", "Oakar Institution"),
    text("occdist", "OCC District Code"),
    number("offdom", "Domestic Offices"),
    number("offfor", "Foreign Offices"),
    number("offices", "Offices"),
    number("offoa", "US Offices"),
    text("otsdist", "OTS District Code"),
    text("otsregnm", "OTS Region Name"),
    text("parcert", "Parent Cert"),
    date("procdate", "Last Structure Change Process Date"),
    text("qbprcoml", "QBP Commercial Bank Region"),
    text("regagnt", "Primary Regulator"),
    text("regagent2", "Secondary Regulator"),
    date("repdte", "Report Date"),
    date("risdate", "RIS Date"),
    percent("roa", "Return on Assets"),
    percent("roaptx", "Pretax Return on Assets"),
    percent("roaptxq", "Quarterly Pretax Return on Assets"),
    percent("roaq", "Quarterly Return on Assets"),
    percent("roe", "Return on Equity"),
    percent("roeq", "Quarterly Return on Equity"),
    text("rssdhcr", "High Regulatory Holder ID"),
    date("rundate", "Run Date"),
    text("sasser", "Sasser Institution"),
    text("specgrp", "Asset Concentration Hierarchy Code"),
    text("specgrpn", "Specialization Group Name"),
    text("stalp", "State Alpha Code"),
    text("stalphcr", "Reg Holding Co State"),
    text("stchrtr", "State Charter"),
    text("stcnty", "State and County Number"),
    text("stnum", "State Number"),
    text("subchaps", "Subchapter S Corp"),
    text("suprv_fd", "Supervisory Region Number"),
    text("te01n528", "Web URL 1"),
    text("te02n528", "Web URL 2"),
    text("te03n528", "Web URL 3"),
    text("te04n528", "Web URL 4"),
    text("te05n528", "Web URL 5"),
    text("te06n528", "Web URL 6"),
    text("te07n528", "Web URL 7"),
    text("te08n528", "Web URL 8"),
    text("te09n528", "Web URL 9"),
    text("te10n528", "Web URL 10"),
    text("te01n529", "Trade Name 1"),
    text("te02n529", "Trade Name 2"),
    text("te03n529", "Trade Name 3"),
    text("te04n529", "Trade Name 4"),
    text("te05n529", "Trade Name 5"),
    text("te06n529", "Trade Name 6"),
    text("tract", "Tract"),
    text("trust", "Trust Powers"),
    text("ultcert", "Ultimate Cert"),
    text("uninum", "FDIC Unique Number"),
];

pub fn column_def(id: &str) -> Option<&'static ColumnDef> {
    INSTITUTION_COLUMNS.iter().find(|column| column.id == id)
}

pub fn column_kind(id: &str) -> Option<ColumnKind> {
    column_def(id).map(|column| column.kind)
}

pub fn is_date_column(id: &str) -> bool {
    column_kind(id) == Some(ColumnKind::Date)
}
