// Elia open data, served by an Opendatasoft Explore v2.1 catalog.
// https://opendata.elia.be/api/explore/v2.1/console

use std::fmt;

use jiff::civil::Date;

use crate::config::ConfigError;

/// Name of the timestamp field the date filter is applied to.
pub const DATE_FIELD: &str = "datetime";

/// Error bodies are cut to this many characters before being reported.
pub const MAX_ERROR_BODY: usize = 200;

/// Inclusive range of days used to restrict an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateFilter {
    pub start: Date,
    pub end: Date,
}

impl DateFilter {
    pub fn new(start: Date, end: Date) -> Result<DateFilter, ConfigError> {
        if start > end {
            return Err(ConfigError::InvertedRange { start, end });
        }
        Ok(DateFilter { start, end })
    }

    /// The ODSQL `where` expression, e.g. `datetime >= '2024-01-01' AND datetime <= '2024-12-31'`.
    pub fn where_clause(&self, field: &str) -> String {
        format!(
            "{} >= '{}' AND {} <= '{}'",
            field, self.start, field, self.end
        )
    }
}

impl fmt::Display for DateFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}

/// Url of the full export endpoint for a dataset.  The `/records` endpoint is
/// paginated and stops at 10,000 rows, the export has no such cap.
pub fn export_url(base_url: &str, dataset_id: &str) -> String {
    format!("{}/{}/exports/json", base_url.trim_end_matches('/'), dataset_id)
}

/// Query parameters for an export: all rows, optionally restricted by date.
pub fn export_query(filter: Option<&DateFilter>) -> Vec<(&'static str, String)> {
    let mut query = vec![("limit", "-1".to_string())];
    if let Some(filter) = filter {
        query.push(("where", filter.where_clause(DATE_FIELD)));
    }
    query
}

/// Keep the first `max_chars` characters of a response body.
pub fn truncate_body(body: &str, max_chars: usize) -> String {
    body.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use jiff::civil::date;

    use super::*;

    #[test]
    fn where_clause() {
        let filter = DateFilter::new(date(2024, 1, 1), date(2025, 12, 31)).unwrap();
        assert_eq!(
            filter.where_clause(DATE_FIELD),
            "datetime >= '2024-01-01' AND datetime <= '2025-12-31'"
        );
        assert_eq!(filter.to_string(), "2024-01-01 to 2025-12-31");
    }

    #[test]
    fn single_day_filter_is_valid() {
        assert!(DateFilter::new(date(2024, 2, 29), date(2024, 2, 29)).is_ok());
        assert!(DateFilter::new(date(2024, 3, 1), date(2024, 2, 29)).is_err());
    }

    #[test]
    fn url_targets_exports_endpoint() {
        let base = "https://opendata.elia.be/api/explore/v2.1/catalog/datasets";
        assert_eq!(
            export_url(base, "ods031"),
            "https://opendata.elia.be/api/explore/v2.1/catalog/datasets/ods031/exports/json"
        );
        assert_eq!(export_url(&format!("{}/", base), "ods031"), export_url(base, "ods031"));
    }

    #[test]
    fn query_without_and_with_filter() {
        assert_eq!(export_query(None), vec![("limit", "-1".to_string())]);
        let filter = DateFilter::new(date(2024, 1, 1), date(2024, 1, 31)).unwrap();
        let query = export_query(Some(&filter));
        assert_eq!(query.len(), 2);
        assert_eq!(query[0], ("limit", "-1".to_string()));
        assert_eq!(query[1].0, "where");
        assert!(query[1].1.starts_with("datetime >= '2024-01-01'"));
    }

    #[test]
    fn truncate_counts_characters() {
        assert_eq!(truncate_body("abc", 200), "abc");
        assert_eq!(truncate_body("ééééé", 3), "ééé");
        let long = "x".repeat(500);
        assert_eq!(truncate_body(&long, MAX_ERROR_BODY).len(), 200);
    }
}
