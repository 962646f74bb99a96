//! Merge everything a report run gathered into one flat mapping

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};
use tracing::debug;

use crate::insights::{Totals, RETRIEVAL_FAILED};
use crate::models::{data_field, BaseFields, ReportData};

static UNSAFE_FILENAME_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new("[^a-zA-Z0-9]").expect("static regex"));

/// Outcome of the grand total lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventTotal {
    /// Number of security hits
    Count(u64),
    /// Retrieval failed
    Failed,
}

impl EventTotal {
    /// `1,234,567` style string, or the `-1` sentinel
    pub fn to_value(self) -> Value {
        match self {
            Self::Count(n) => Value::String(group_thousands(n)),
            Self::Failed => Value::from(RETRIEVAL_FAILED),
        }
    }
}

/// Group digits by three with `,`, independent of locale
pub fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// `<prefix>_<YYYY-MM-DD>_<customer>.<ext>` with every non-alphanumeric
/// character of the customer name replaced by `_`
pub fn output_filename(prefix: &str, date: NaiveDate, customer: &str, ext: &str) -> String {
    let customer = UNSAFE_FILENAME_CHARS.replace_all(customer, "_");
    format!("{prefix}_{}_{customer}.{ext}", date.format("%Y-%m-%d"))
}

/// Build the renderer's input.
///
/// `insights` holds one entry per requested insight; `None` marks a failed or
/// unsupported insight and is stored as an empty object. Payloads are passed
/// through untouched, the template projects them into tables.
pub fn assemble(
    base: &BaseFields,
    insights: &[(String, Option<Value>)],
    totals: &Totals,
    chart_series: &[(String, i64)],
    total_events: EventTotal,
) -> ReportData {
    let mut data = match serde_json::to_value(base) {
        Ok(Value::Object(fields)) => fields.into_iter().collect::<ReportData>(),
        _ => ReportData::new(),
    };

    for (name, payload) in insights {
        let value = payload.clone().unwrap_or_else(|| json!({}));
        data.insert(data_field(name), value);
    }

    for (field, total) in totals {
        data.insert(field.clone(), *total);
    }

    let series: Vec<Value> = chart_series
        .iter()
        .map(|(label, count)| json!({ "label": label, "count": count }))
        .collect();
    data.insert("chart_series", series);
    data.insert("total_events", total_events.to_value());

    debug!(fields = data.len(), "Report data assembled");
    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_output_filename() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        assert_eq!(
            output_filename("B1TD_Report", date, "Acme, Inc.", "docx"),
            "B1TD_Report_2024-01-05_Acme__Inc_.docx"
        );
        assert_eq!(
            output_filename("B1TD_Report", date, "Zürich AG", "html"),
            "B1TD_Report_2024-01-05_Z_rich_AG.html"
        );
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1_000), "1,000");
        assert_eq!(group_thousands(1_234_567), "1,234,567");
        assert_eq!(group_thousands(12_345_678), "12,345,678");
    }

    #[test]
    fn test_assemble() {
        let base = BaseFields {
            customer: "Acme".to_string(),
            iso_date: "2024-01-05".to_string(),
            ..BaseFields::default()
        };
        let insights = vec![
            ("dex".to_string(), Some(json!({ "results": [] }))),
            ("doh".to_string(), None),
        ];
        let totals: Totals = [("total_mal_count".to_string(), 8)].into_iter().collect();
        let series = vec![("Phishing".to_string(), 10)];

        let data = assemble(&base, &insights, &totals, &series, EventTotal::Count(1_234_567));

        assert_eq!(data.get("customer"), Some(&json!("Acme")));
        assert_eq!(data.get("iso_date"), Some(&json!("2024-01-05")));
        assert_eq!(data.get("data_dex"), Some(&json!({ "results": [] })));
        assert_eq!(data.get("data_doh"), Some(&json!({})));
        assert_eq!(data.get("total_mal_count"), Some(&json!(8)));
        assert_eq!(
            data.get("chart_series"),
            Some(&json!([{ "label": "Phishing", "count": 10 }]))
        );
        assert_eq!(data.get("total_events"), Some(&json!("1,234,567")));
    }

    #[test]
    fn test_failed_total_events_is_sentinel() {
        let data = assemble(
            &BaseFields::default(),
            &[],
            &Totals::new(),
            &[],
            EventTotal::Failed,
        );
        assert_eq!(data.get("total_events"), Some(&json!(-1)));
    }
}
