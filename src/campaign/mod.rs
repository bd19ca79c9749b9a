// src/campaign/mod.rs
use serde::Serialize;

use crate::import::{Dialect, NestedList, Record};

pub mod template;

pub const INTERESTS_LIST: &str = "interests_list";
pub const EXCLUDED_PH_REGION: &str = "excluded_ph_region";
pub const ADSET_COUNT: &str = "adset_count";
pub const START_DATE: &str = "start_date (YYYY-MM-DD)";
pub const START_TIME: &str = "start_time (HH-MM-SS)";

/// Header row of the current sheet, in template order.
static CURRENT_COLUMNS: &[&str] = &[
    "ad_account_id",
    "access_token",
    "page_name",
    "sku",
    "material_code",
    INTERESTS_LIST,
    "daily_budget",
    "facebook_page_id",
    "video_url",
    "headline",
    "primary_text",
    "image_url",
    "product",
    START_DATE,
    START_TIME,
    EXCLUDED_PH_REGION,
];

static LEGACY_COLUMNS: &[&str] = &[
    "ad_account_id",
    "access_token",
    ADSET_COUNT,
    "page_name",
    "sku",
    "material_code",
    "daily_budget",
    "facebook_page_id",
    "video_url",
    "headline",
    "primary_text",
    "image_url",
    "product",
];

static CURRENT_NESTED: &[(&str, Dialect)] = &[
    (INTERESTS_LIST, Dialect::SlashComma),
    (EXCLUDED_PH_REGION, Dialect::SlashComma),
];

static LEGACY_NESTED: &[(&str, Dialect)] = &[(INTERESTS_LIST, Dialect::JsonLiteral)];

/// Which generation of the import sheet a header row belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Layout {
    /// Per-adset interests and excluded regions, start date/time.
    #[default]
    Current,
    /// Older sheet with an explicit `adset_count` and no region column.
    Legacy,
}

impl Layout {
    /// Pick the layout from a header row. Unknown header sets are read as
    /// [`Layout::Current`].
    pub fn detect<S: AsRef<str>>(headers: &[S]) -> Self {
        let has = |name: &str| headers.iter().any(|h| h.as_ref() == name);
        if has(EXCLUDED_PH_REGION) {
            Layout::Current
        } else if has(ADSET_COUNT) {
            Layout::Legacy
        } else {
            Layout::Current
        }
    }

    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            Layout::Current => CURRENT_COLUMNS,
            Layout::Legacy => LEGACY_COLUMNS,
        }
    }

    /// Fields holding nested lists, with the dialect each is written in.
    pub fn nested_fields(&self) -> &'static [(&'static str, Dialect)] {
        match self {
            Layout::Current => CURRENT_NESTED,
            Layout::Legacy => LEGACY_NESTED,
        }
    }

    /// Columns of this layout missing from `headers`.
    pub fn missing_columns<S: AsRef<str>>(&self, headers: &[S]) -> Vec<&'static str> {
        self.columns()
            .iter()
            .copied()
            .filter(|c| !headers.iter().any(|h| h.as_ref() == *c))
            .collect()
    }
}

/// One campaign as the create-campaigns endpoint expects it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CampaignRequest {
    pub ad_account_id: String,
    pub access_token: String,
    pub page_name: String,
    pub sku: String,
    pub material_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adset_count: Option<i64>,
    pub daily_budget: i64,
    pub facebook_page_id: String,
    pub video_url: String,
    pub headline: String,
    pub primary_text: String,
    pub image_url: String,
    pub product: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interests_list: Option<NestedList>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclude_ph_region: Option<NestedList>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
}

impl CampaignRequest {
    pub fn from_record(record: &Record, layout: Layout) -> Self {
        let text = |name: &str| record.text(name).to_string();
        let nested = |name: &str| record.get(name).map(|v| v.to_nested());

        let (adset_count, exclude_ph_region, start_date, start_time) = match layout {
            Layout::Current => (
                None,
                Some(nested(EXCLUDED_PH_REGION).unwrap_or_else(NestedList::unrestricted)),
                record.get(START_DATE).map(|_| text(START_DATE)),
                record.get(START_TIME).map(|_| text(START_TIME)),
            ),
            Layout::Legacy => (
                Some(parse_int_lenient(record.text(ADSET_COUNT))),
                None,
                None,
                None,
            ),
        };

        let interests_list = match layout {
            Layout::Current => {
                Some(nested(INTERESTS_LIST).unwrap_or_else(NestedList::unrestricted))
            }
            Layout::Legacy => nested(INTERESTS_LIST),
        };

        CampaignRequest {
            ad_account_id: text("ad_account_id"),
            access_token: text("access_token"),
            page_name: text("page_name"),
            sku: text("sku"),
            material_code: text("material_code"),
            adset_count,
            daily_budget: parse_int_lenient(record.text("daily_budget")),
            facebook_page_id: text("facebook_page_id"),
            video_url: text("video_url"),
            headline: text("headline"),
            primary_text: text("primary_text"),
            image_url: text("image_url"),
            product: text("product"),
            interests_list,
            exclude_ph_region,
            start_date,
            start_time,
        }
    }
}

/// Request body of the create-campaigns endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct CreateCampaignsBody {
    pub user_id: u64,
    pub campaigns: Vec<CampaignRequest>,
}

/// Leading-integer parse: optional sign then digits, anything after the
/// digits ignored. No digits (or overflow) gives 0.
pub fn parse_int_lenient(s: &str) -> i64 {
    let s = s.trim_start();
    let (sign, rest) = match s.as_bytes().first() {
        Some(b'-') => (-1, &s[1..]),
        Some(b'+') => (1, &s[1..]),
        _ => (1, s),
    };
    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    rest[..end]
        .parse::<i64>()
        .map(|n| sign * n)
        .unwrap_or(0)
}

/// Records with every field filled in, in input order.
pub fn valid_records(records: &[Record]) -> Vec<&Record> {
    records.iter().filter(|r| r.is_complete()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::{import_text, normalize, FieldValue};

    fn full_row(sku: &str) -> String {
        format!(
            "act_1,tok,Page,{sku},MC1,\"[]/A,B\",500,123,http://v,Head,Text,http://i,Prod,2025-01-02,08-00-00,Davao"
        )
    }

    fn current_csv(rows: &[String]) -> String {
        let mut out = CURRENT_COLUMNS.join(",");
        for r in rows {
            out.push('\n');
            out.push_str(r);
        }
        out.push('\n');
        out
    }

    #[test]
    fn detects_layout_from_headers() {
        assert_eq!(Layout::detect(CURRENT_COLUMNS), Layout::Current);
        assert_eq!(Layout::detect(LEGACY_COLUMNS), Layout::Legacy);
        assert_eq!(Layout::detect(&["sku", "page_name"]), Layout::Current);
        assert_eq!(
            Layout::Legacy.missing_columns(&["ad_account_id", "sku"]).len(),
            LEGACY_COLUMNS.len() - 2
        );
    }

    #[test]
    fn lenient_int_parse() {
        assert_eq!(parse_int_lenient("500"), 500);
        assert_eq!(parse_int_lenient(" 42abc"), 42);
        assert_eq!(parse_int_lenient("12.9"), 12);
        assert_eq!(parse_int_lenient("-7"), -7);
        assert_eq!(parse_int_lenient("abc"), 0);
        assert_eq!(parse_int_lenient("'500"), 0);
        assert_eq!(parse_int_lenient(""), 0);
        assert_eq!(parse_int_lenient("-"), 0);
    }

    #[test]
    fn filter_drops_records_with_missing_fields_in_order() {
        let rows = vec![
            full_row("S1"),
            "act_1,tok,Page,,MC1,A,500,123,http://v,Head,Text,http://i,Prod,2025-01-02,08-00-00,Davao"
                .to_string(),
            full_row("S3"),
        ];
        let sheet = import_text(&current_csv(&rows));
        let valid = valid_records(&sheet.records);
        let skus: Vec<&str> = valid.iter().map(|r| r.text("sku")).collect();
        assert_eq!(skus, vec!["S1", "S3"]);
    }

    #[test]
    fn blank_list_cells_do_not_exclude_a_record() {
        let row = "act_1,tok,Page,S1,MC1,,500,123,http://v,Head,Text,http://i,Prod,2025-01-02,08-00-00,";
        let sheet = import_text(&current_csv(&[row.to_string()]));
        assert_eq!(valid_records(&sheet.records).len(), 1);
    }

    #[test]
    fn undecoded_records_with_blank_cells_are_excluded() {
        let records = normalize("sku,interests_list\nS1,\n");
        assert!(valid_records(&records).is_empty());
    }

    #[test]
    fn builds_current_request() {
        let sheet = import_text(&current_csv(&[full_row("S1")]));
        let req = CampaignRequest::from_record(&sheet.records[0], sheet.layout);
        assert_eq!(req.sku, "S1");
        assert_eq!(req.daily_budget, 500);
        assert_eq!(req.adset_count, None);
        assert_eq!(
            req.interests_list,
            Some(NestedList::from(vec![vec![], vec!["A", "B"]]))
        );
        assert_eq!(
            req.exclude_ph_region,
            Some(NestedList::from(vec![vec!["Davao"]]))
        );
        assert_eq!(req.start_date.as_deref(), Some("2025-01-02"));
        assert_eq!(req.start_time.as_deref(), Some("08-00-00"));

        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["interests_list"], serde_json::json!([[], ["A", "B"]]));
        assert_eq!(json["exclude_ph_region"], serde_json::json!([["Davao"]]));
        assert!(json.get("adset_count").is_none());
        assert!(json.get("excluded_ph_region").is_none());
    }

    #[test]
    fn builds_legacy_request() {
        let text = format!(
            "{}\nact_1,tok,3,Page,S1,MC1,250,123,http://v,Head,Text,http://i,Prod\n",
            LEGACY_COLUMNS.join(",")
        );
        let sheet = import_text(&text);
        assert_eq!(sheet.layout, Layout::Legacy);
        let req = CampaignRequest::from_record(&sheet.records[0], sheet.layout);
        assert_eq!(req.adset_count, Some(3));
        assert_eq!(req.daily_budget, 250);
        assert_eq!(req.interests_list, None);

        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["adset_count"], 3);
        assert!(json.get("start_date").is_none());
        assert!(json.get("exclude_ph_region").is_none());
    }

    #[test]
    fn legacy_interests_are_json_literals() {
        let text = "ad_account_id,adset_count,sku,interests_list\na,2,S1,\"[[\"\"A\"\"],[]]\"\n";
        let sheet = import_text(text);
        assert_eq!(
            sheet.records[0].get(INTERESTS_LIST),
            Some(&FieldValue::Nested(NestedList::from(vec![vec!["A"], vec![]])))
        );
    }

    #[test]
    fn absent_schedule_columns_are_left_out() {
        let text = "sku,excluded_ph_region,start_date (YYYY-MM-DD)\nS1,Davao,\n";
        let sheet = import_text(text);
        let req = CampaignRequest::from_record(&sheet.records[0], sheet.layout);
        assert_eq!(req.start_date, Some(String::new()));
        assert_eq!(req.start_time, None);

        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["start_date"], "");
        assert!(json.get("start_time").is_none());
    }

    #[test]
    fn non_numeric_budget_becomes_zero() {
        let row = "act_1,tok,Page,S1,MC1,A,lots,123,http://v,Head,Text,http://i,Prod,2025-01-02,08-00-00,Davao";
        let sheet = import_text(&current_csv(&[row.to_string()]));
        let req = CampaignRequest::from_record(&sheet.records[0], sheet.layout);
        assert_eq!(req.daily_budget, 0);
    }
}
