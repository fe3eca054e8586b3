use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;

use crate::models::canonical::{CanonicalJob, JobSource, composite_id, format_salary_range};
use crate::providers::{JobProvider, ProviderError, send_with_retry};
use crate::search::SearchParams;

const BASE_URL: &str = "https://jsearch.p.rapidapi.com/search";
const DETAIL_URL: &str = "https://jsearch.p.rapidapi.com/job-details";
const RAPIDAPI_HOST: &str = "jsearch.p.rapidapi.com";

/// JSearch (RapidAPI) adapter. The only provider whose `datePosted`
/// vocabulary matches ours exactly, so that filter is pushed down as-is.
pub struct JSearch {
    client: Client,
    api_key: Option<String>,
}

impl JSearch {
    pub fn new(client: Client, api_key: Option<String>) -> Self {
        JSearch { client, api_key }
    }
}

#[async_trait]
impl JobProvider for JSearch {
    fn kind(&self) -> JobSource {
        JobSource::Jsearch
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn fetch(&self, params: &SearchParams) -> Result<Vec<CanonicalJob>, ProviderError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Ok(Vec::new());
        };

        let mut query: Vec<(&str, String)> = vec![
            ("query", params.query.clone()),
            ("page", params.page.to_string()),
            ("num_pages", "1".to_string()),
            ("location", params.location.clone()),
        ];
        if let Some(date_posted) = &params.date_posted {
            query.push(("date_posted", date_posted.clone()));
        }
        if params.remote == Some(true) {
            query.push(("remote_jobs_only", "true".to_string()));
        }

        let req = self
            .client
            .get(BASE_URL)
            .header("X-RapidAPI-Key", api_key)
            .header("X-RapidAPI-Host", RAPIDAPI_HOST)
            .query(&query);
        let resp = send_with_retry(req).await?;
        let raw: JSearchResponse = resp.json().await?;
        Ok(map_response(
            raw,
            params.limit as usize,
            &params.location,
            Utc::now(),
        ))
    }

    async fn fetch_by_id(&self, source_id: &str) -> Result<Option<CanonicalJob>, ProviderError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Ok(None);
        };

        // Same payload shape as /search, a one-element `data` array.
        let req = self
            .client
            .get(DETAIL_URL)
            .header("X-RapidAPI-Key", api_key)
            .header("X-RapidAPI-Host", RAPIDAPI_HOST)
            .query(&[("job_id", source_id)]);
        let resp = send_with_retry(req).await?;
        let raw: JSearchResponse = resp.json().await?;
        Ok(raw
            .data
            .into_iter()
            .next()
            .and_then(|job| map_job(job, "", Utc::now())))
    }
}

#[derive(Debug, Deserialize)]
struct JSearchResponse {
    #[serde(default)]
    data: Vec<JSearchJob>,
}

#[derive(Debug, Deserialize)]
struct JSearchJob {
    job_id: Option<String>,
    job_title: Option<String>,
    employer_name: Option<String>,
    employer_logo: Option<String>,
    job_city: Option<String>,
    job_state: Option<String>,
    job_country: Option<String>,
    job_description: Option<String>,
    job_employment_type: Option<String>,
    #[serde(default)]
    job_is_remote: bool,
    job_apply_link: Option<String>,
    job_posted_at_datetime_utc: Option<String>,
    job_salary: Option<JSearchSalary>,
    job_highlights: Option<JSearchHighlights>,
}

#[derive(Debug, Deserialize)]
struct JSearchSalary {
    salary_min: Option<f64>,
    salary_max: Option<f64>,
    salary_currency: Option<String>,
}

#[derive(Debug, Deserialize)]
struct JSearchHighlights {
    #[serde(rename = "Qualifications", default)]
    qualifications: Vec<String>,
}

fn map_response(
    raw: JSearchResponse,
    limit: usize,
    fallback_location: &str,
    now: DateTime<Utc>,
) -> Vec<CanonicalJob> {
    raw.data
        .into_iter()
        .filter_map(|job| map_job(job, fallback_location, now))
        .take(limit)
        .collect()
}

fn map_job(job: JSearchJob, fallback_location: &str, now: DateTime<Utc>) -> Option<CanonicalJob> {
    let source_id = job.job_id?;
    let location = match (&job.job_city, &job.job_state) {
        (Some(city), Some(state)) => format!("{city}, {state}"),
        (Some(city), None) => city.clone(),
        (None, Some(state)) => state.clone(),
        (None, None) => job
            .job_country
            .clone()
            .unwrap_or_else(|| fallback_location.to_string()),
    };

    let (salary_min, salary_max, salary_currency) = match job.job_salary {
        Some(sal) => (
            sal.salary_min.map(|v| v as i64),
            sal.salary_max.map(|v| v as i64),
            Some(sal.salary_currency.unwrap_or_else(|| "USD".to_string())),
        ),
        None => (None, None, None),
    };

    let qualifications = job
        .job_highlights
        .map(|h| h.qualifications)
        .unwrap_or_default();

    Some(CanonicalJob {
        id: composite_id(JobSource::Jsearch, &source_id),
        source: JobSource::Jsearch,
        source_id: Some(source_id),
        title: job.job_title.unwrap_or_default(),
        company: job.employer_name.unwrap_or_default(),
        company_logo: job.employer_logo,
        location,
        country: job.job_country.unwrap_or_else(|| "IN".to_string()),
        description: job.job_description.unwrap_or_default(),
        salary: format_salary_range(salary_min, salary_max, salary_currency.as_deref()),
        salary_min,
        salary_max,
        salary_currency,
        job_type: job.job_employment_type,
        experience_level: None,
        sector: None,
        work_mode: None,
        skills: qualifications.clone(),
        requirements: qualifications,
        benefits: Vec::new(),
        is_remote: job.job_is_remote,
        is_hybrid: false,
        is_urgent: false,
        is_featured: false,
        is_external: true,
        apply_url: job.job_apply_link.clone(),
        source_url: job.job_apply_link,
        posted_at: job
            .job_posted_at_datetime_utc
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|d| d.with_timezone(&Utc)),
        created_at: now,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fixture() -> JSearchResponse {
        serde_json::from_value(json!({
            "status": "OK",
            "data": [
                {
                    "job_id": "ZXhhbXBsZQ==",
                    "job_title": "React Developer",
                    "employer_name": "Northwind Labs",
                    "employer_logo": "https://logo.example/nw.png",
                    "job_city": "Mumbai",
                    "job_state": "Maharashtra",
                    "job_country": "IN",
                    "job_description": "Build UI components in React.",
                    "job_employment_type": "FULLTIME",
                    "job_is_remote": true,
                    "job_apply_link": "https://apply.example/react",
                    "job_posted_at_datetime_utc": "2024-06-01T00:00:00.000Z",
                    "job_salary": {
                        "salary_min": 900000.0,
                        "salary_max": 1400000.0,
                        "salary_currency": "INR"
                    },
                    "job_highlights": {
                        "Qualifications": [
                            "3+ years with React",
                            "Strong TypeScript fundamentals"
                        ]
                    }
                },
                { "job_title": "Dropped, no job_id" }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn maps_data_and_joins_city_with_state() {
        let jobs = map_response(fixture(), 20, "India", Utc::now());
        assert_eq!(jobs.len(), 1);

        let job = &jobs[0];
        assert_eq!(job.id, "ext-jsearch-ZXhhbXBsZQ==");
        assert_eq!(job.source, JobSource::Jsearch);
        assert_eq!(job.location, "Mumbai, Maharashtra");
        assert_eq!(job.company_logo.as_deref(), Some("https://logo.example/nw.png"));
        assert!(job.is_remote);
        assert_eq!(job.job_type.as_deref(), Some("FULLTIME"));
        assert_eq!(job.salary.as_deref(), Some("₹ 900,000 - ₹ 1,400,000"));
        assert_eq!(job.requirements.len(), 2);
        assert_eq!(job.skills, job.requirements);
        assert!(job.posted_at.is_some());
    }

    #[test]
    fn truncates_to_the_requested_limit() {
        let raw: JSearchResponse = serde_json::from_value(json!({
            "data": [
                { "job_id": "a", "job_title": "One" },
                { "job_id": "b", "job_title": "Two" },
                { "job_id": "c", "job_title": "Three" }
            ]
        }))
        .unwrap();
        let jobs = map_response(raw, 2, "India", Utc::now());
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[1].title, "Two");
    }

    #[test]
    fn location_falls_back_through_country_to_search_location() {
        let raw: JSearchResponse = serde_json::from_value(json!({
            "data": [
                { "job_id": "a", "job_country": "IN" },
                { "job_id": "b" }
            ]
        }))
        .unwrap();
        let jobs = map_response(raw, 20, "Chennai", Utc::now());
        assert_eq!(jobs[0].location, "IN");
        assert_eq!(jobs[1].location, "Chennai");
        assert_eq!(jobs[1].country, "IN");
    }
}
