use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::Client;
use serde::Deserialize;

use crate::models::canonical::{CanonicalJob, JobSource, composite_id, format_salary_range};
use crate::providers::{JobProvider, ProviderError, send_with_retry};
use crate::search::SearchParams;

const BASE_URL: &str = "https://www.reed.co.uk/api/1.0/search";
const DETAIL_URL: &str = "https://www.reed.co.uk/api/1.0/jobs";

/// Reed.co.uk adapter. UK-only board, HTTP Basic auth with the key as the
/// username and a blank password, and the one provider with true offset
/// pagination (`resultsToSkip`).
pub struct Reed {
    client: Client,
    api_key: Option<String>,
}

impl Reed {
    pub fn new(client: Client, api_key: Option<String>) -> Self {
        Reed { client, api_key }
    }
}

/// Key as the username, blank password.
fn basic_auth(api_key: &str) -> String {
    format!("Basic {}", BASE64.encode(format!("{api_key}:")))
}

#[async_trait]
impl JobProvider for Reed {
    fn kind(&self) -> JobSource {
        JobSource::Reed
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn fetch(&self, params: &SearchParams) -> Result<Vec<CanonicalJob>, ProviderError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Ok(Vec::new());
        };

        let query: Vec<(&str, String)> = vec![
            ("keywords", params.query.clone()),
            ("locationName", params.location.clone()),
            ("resultsToTake", params.limit.to_string()),
            ("resultsToSkip", params.offset().to_string()),
        ];

        let req = self
            .client
            .get(BASE_URL)
            .header("Authorization", basic_auth(api_key))
            .query(&query);
        let resp = send_with_retry(req).await?;
        let raw: ReedResponse = resp.json().await?;
        if let Some(total) = raw.total_results {
            tracing::debug!(total, "reed reported total");
        }
        Ok(map_response(raw, Utc::now()))
    }

    async fn fetch_by_id(&self, source_id: &str) -> Result<Option<CanonicalJob>, ProviderError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Ok(None);
        };

        let req = self
            .client
            .get(format!("{DETAIL_URL}/{source_id}"))
            .header("Authorization", basic_auth(api_key));
        let resp = send_with_retry(req).await?;
        let raw: ReedJobDetail = resp.json().await?;
        Ok(map_job(raw.into(), Utc::now()))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReedResponse {
    #[serde(default)]
    results: Vec<ReedJob>,
    total_results: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReedJob {
    job_id: Option<i64>,
    job_title: Option<String>,
    employer_name: Option<String>,
    location_name: Option<String>,
    job_description: Option<String>,
    minimum_salary: Option<f64>,
    maximum_salary: Option<f64>,
    currency: Option<String>,
    /// `dd/MM/yyyy`, Reed's posting date format.
    date: Option<String>,
    job_url: Option<String>,
}

/// The by-id endpoint renames two fields relative to search results
/// (`datePosted`, `externalUrl`) but is otherwise the same job shape.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReedJobDetail {
    job_id: Option<i64>,
    job_title: Option<String>,
    employer_name: Option<String>,
    location_name: Option<String>,
    job_description: Option<String>,
    minimum_salary: Option<f64>,
    maximum_salary: Option<f64>,
    currency: Option<String>,
    date_posted: Option<String>,
    external_url: Option<String>,
}

impl From<ReedJobDetail> for ReedJob {
    fn from(detail: ReedJobDetail) -> Self {
        ReedJob {
            job_id: detail.job_id,
            job_title: detail.job_title,
            employer_name: detail.employer_name,
            location_name: detail.location_name,
            job_description: detail.job_description,
            minimum_salary: detail.minimum_salary,
            maximum_salary: detail.maximum_salary,
            currency: detail.currency,
            date: detail.date_posted,
            job_url: detail.external_url,
        }
    }
}

fn map_response(raw: ReedResponse, now: DateTime<Utc>) -> Vec<CanonicalJob> {
    raw.results
        .into_iter()
        .filter_map(|job| map_job(job, now))
        .collect()
}

fn map_job(job: ReedJob, now: DateTime<Utc>) -> Option<CanonicalJob> {
    let source_id = job.job_id?.to_string();
    let salary_min = job.minimum_salary.map(|v| v as i64);
    let salary_max = job.maximum_salary.map(|v| v as i64);
    let currency = job.currency.unwrap_or_else(|| "GBP".to_string());

    Some(CanonicalJob {
        id: composite_id(JobSource::Reed, &source_id),
        source: JobSource::Reed,
        source_id: Some(source_id),
        title: job.job_title.unwrap_or_default(),
        company: job.employer_name.unwrap_or_default(),
        company_logo: None,
        location: job.location_name.unwrap_or_else(|| "UK".to_string()),
        country: "GB".to_string(),
        description: job.job_description.unwrap_or_default(),
        salary: format_salary_range(salary_min, salary_max, Some(&currency)),
        salary_min,
        salary_max,
        salary_currency: Some(currency),
        job_type: None,
        experience_level: None,
        sector: None,
        work_mode: None,
        skills: Vec::new(),
        requirements: Vec::new(),
        benefits: Vec::new(),
        is_remote: false,
        is_hybrid: false,
        is_urgent: false,
        is_featured: false,
        is_external: true,
        apply_url: job.job_url.clone(),
        source_url: job.job_url,
        posted_at: job.date.as_deref().and_then(parse_reed_date),
        created_at: now,
    })
}

fn parse_reed_date(s: &str) -> Option<DateTime<Utc>> {
    NaiveDate::parse_from_str(s, "%d/%m/%Y")
        .ok()?
        .and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc())
}
