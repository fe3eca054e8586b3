pub mod aggregator;
pub mod enrich;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::canonical::CanonicalJob;

/// Raw query string of `GET /api/jobs`, exactly as the client sent it.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    #[serde(alias = "q")]
    pub query: Option<String>,
    pub location: Option<String>,
    pub job_type: Option<String>,
    pub experience_level: Option<String>,
    pub date_posted: Option<String>,
    #[serde(alias = "isRemote")]
    pub remote: Option<bool>,
    pub salary_min: Option<i64>,
    pub salary_max: Option<i64>,
    pub sector: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// Validated search parameters. Construction is the request boundary: a
/// value of this type means no further input checking is needed anywhere
/// downstream, and nothing downstream runs until construction succeeds.
#[derive(Debug, Clone)]
pub struct SearchParams {
    pub query: String,
    /// Effective location, default applied. Providers always need one.
    pub location: String,
    /// Location exactly as the user supplied it, if they supplied one.
    /// Only this narrows the local store; the default never hides local
    /// rows whose location strings don't mention it.
    pub location_filter: Option<String>,
    pub job_type: Option<String>,
    pub experience_level: Option<String>,
    pub date_posted: Option<String>,
    pub remote: Option<bool>,
    pub salary_min: Option<i64>,
    pub salary_max: Option<i64>,
    pub sector: Option<String>,
    pub page: i64,
    pub limit: i64,
}

impl SearchParams {
    pub const DEFAULT_LIMIT: i64 = 20;
    pub const MAX_LIMIT: i64 = 50;

    pub fn from_query(raw: SearchQuery, default_location: &str) -> Result<Self, AppError> {
        let query = raw.query.unwrap_or_default().trim().to_string();
        if query.is_empty() {
            return Err(AppError::BadRequest(
                "Query parameter is required".to_string(),
            ));
        }

        let page = raw.page.unwrap_or(1);
        if page < 1 {
            return Err(AppError::BadRequest(
                "page must be a positive integer".to_string(),
            ));
        }

        let limit = raw.limit.unwrap_or(Self::DEFAULT_LIMIT);
        if limit < 1 {
            return Err(AppError::BadRequest(
                "limit must be a positive integer".to_string(),
            ));
        }

        let location_filter = raw
            .location
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string);
        let location = location_filter
            .clone()
            .unwrap_or_else(|| default_location.to_string());

        // "all" is the UI's way of saying no filter
        let not_a_filter = |v: &String| {
            let v = v.trim();
            v.is_empty() || v.eq_ignore_ascii_case("all")
        };

        // A reversed salary band is a slip, not an empty range
        let (salary_min, salary_max) = match (raw.salary_min, raw.salary_max) {
            (Some(min), Some(max)) if min > max => (Some(max), Some(min)),
            bounds => bounds,
        };

        Ok(SearchParams {
            query,
            location,
            location_filter,
            job_type: raw.job_type.filter(|v| !not_a_filter(v)),
            experience_level: raw.experience_level.filter(|v| !not_a_filter(v)),
            date_posted: raw.date_posted.filter(|v| !v.trim().is_empty()),
            remote: raw.remote,
            salary_min,
            salary_max,
            sector: raw.sector.filter(|v| !not_a_filter(v)),
            page,
            limit: limit.min(Self::MAX_LIMIT),
        })
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.limit
    }

    /// Oldest acceptable publish date for the current `datePosted` filter,
    /// or `None` when the filter is absent or unrecognized.
    pub fn posted_after(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let days = match self.date_posted.as_deref()? {
            "today" => 1,
            "3days" => 3,
            "week" => 7,
            "month" => 30,
            _ => return None,
        };
        Some(now - Duration::days(days))
    }
}

/// How a single adapter's fetch ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchState {
    Ok,
    Empty,
    Error,
    Timeout,
    Disabled,
}

/// One row of the `meta.apiStatus` diagnostics block.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiStatus {
    pub provider: String,
    pub configured: bool,
    pub state: FetchState,
    pub jobs: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchMeta {
    pub source: String,
    pub search_time: i64,
    pub api_status: Vec<ApiStatus>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub success: bool,
    pub jobs: Vec<CanonicalJob>,
    pub total: i64,
    pub page: i64,
    pub total_pages: i64,
    pub has_more: bool,
    pub meta: SearchMeta,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(q: &str) -> SearchQuery {
        SearchQuery {
            query: Some(q.to_string()),
            ..SearchQuery::default()
        }
    }

    #[test]
    fn empty_query_is_rejected() {
        for raw in [
            SearchQuery::default(),
            query(""),
            query("   "),
            query("\t\n"),
        ] {
            let err = SearchParams::from_query(raw, "India").unwrap_err();
            assert!(matches!(err, AppError::BadRequest(_)));
        }
    }

    #[test]
    fn defaults_apply_when_fields_are_absent() {
        let params = SearchParams::from_query(query("rust developer"), "India").unwrap();
        assert_eq!(params.query, "rust developer");
        assert_eq!(params.location, "India");
        assert_eq!(params.location_filter, None);
        assert_eq!(params.page, 1);
        assert_eq!(params.limit, SearchParams::DEFAULT_LIMIT);
        assert_eq!(params.offset(), 0);
    }

    #[test]
    fn explicit_location_is_both_effective_and_a_filter() {
        let mut raw = query("rust developer");
        raw.location = Some("Mumbai".to_string());
        let params = SearchParams::from_query(raw, "India").unwrap();
        assert_eq!(params.location, "Mumbai");
        assert_eq!(params.location_filter.as_deref(), Some("Mumbai"));
    }

    #[test]
    fn limit_is_capped_not_rejected() {
        let mut raw = query("nurse");
        raw.limit = Some(500);
        let params = SearchParams::from_query(raw, "India").unwrap();
        assert_eq!(params.limit, SearchParams::MAX_LIMIT);
    }

    #[test]
    fn non_positive_pagination_is_rejected() {
        let mut raw = query("nurse");
        raw.page = Some(0);
        assert!(SearchParams::from_query(raw, "India").is_err());

        let mut raw = query("nurse");
        raw.limit = Some(-5);
        assert!(SearchParams::from_query(raw, "India").is_err());
    }

    #[test]
    fn offset_follows_page_and_limit() {
        let mut raw = query("teacher");
        raw.page = Some(3);
        raw.limit = Some(10);
        let params = SearchParams::from_query(raw, "India").unwrap();
        assert_eq!(params.offset(), 20);
    }

    #[test]
    fn blank_optional_filters_collapse_to_none() {
        let mut raw = query("teacher");
        raw.job_type = Some("  ".to_string());
        raw.sector = Some(String::new());
        raw.location = Some("  ".to_string());
        let params = SearchParams::from_query(raw, "India").unwrap();
        assert_eq!(params.job_type, None);
        assert_eq!(params.sector, None);
        assert_eq!(params.location, "India");
        assert_eq!(params.location_filter, None);
    }

    #[test]
    fn all_is_treated_as_no_filter() {
        let mut raw = query("teacher");
        raw.job_type = Some("all".to_string());
        raw.experience_level = Some("All".to_string());
        raw.sector = Some("all".to_string());
        let params = SearchParams::from_query(raw, "India").unwrap();
        assert_eq!(params.job_type, None);
        assert_eq!(params.experience_level, None);
        assert_eq!(params.sector, None);
    }

    #[test]
    fn reversed_salary_bounds_are_swapped() {
        let mut raw = query("analyst");
        raw.salary_min = Some(900_000);
        raw.salary_max = Some(400_000);
        let params = SearchParams::from_query(raw, "India").unwrap();
        assert_eq!(params.salary_min, Some(400_000));
        assert_eq!(params.salary_max, Some(900_000));
    }

    #[test]
    fn posted_after_maps_known_windows() {
        let now = Utc::now();
        let mut raw = query("dev");
        raw.date_posted = Some("week".to_string());
        let params = SearchParams::from_query(raw, "India").unwrap();
        let cutoff = params.posted_after(now).unwrap();
        assert_eq!(cutoff, now - Duration::days(7));

        let mut raw = query("dev");
        raw.date_posted = Some("fortnight".to_string());
        let params = SearchParams::from_query(raw, "India").unwrap();
        assert_eq!(params.posted_after(now), None);
    }
}
