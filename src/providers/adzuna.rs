use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;

use crate::models::canonical::{CanonicalJob, JobSource, composite_id, format_salary_range};
use crate::providers::{JobProvider, ProviderError, send_with_retry};
use crate::search::SearchParams;

const BASE_URL: &str = "https://api.adzuna.com";

/// Adzuna job search API. Needs an app id + app key pair; the country code
/// is part of the URL path, not a query parameter.
pub struct Adzuna {
    client: Client,
    app_id: Option<String>,
    app_key: Option<String>,
    country: String,
}

impl Adzuna {
    pub fn new(
        client: Client,
        app_id: Option<String>,
        app_key: Option<String>,
        country: String,
    ) -> Self {
        Adzuna {
            client,
            app_id,
            app_key,
            country,
        }
    }

    fn credentials(&self) -> Option<(&str, &str)> {
        match (self.app_id.as_deref(), self.app_key.as_deref()) {
            (Some(id), Some(key)) => Some((id, key)),
            _ => None,
        }
    }
}

#[async_trait]
impl JobProvider for Adzuna {
    fn kind(&self) -> JobSource {
        JobSource::Adzuna
    }

    fn is_configured(&self) -> bool {
        self.credentials().is_some()
    }

    async fn fetch(&self, params: &SearchParams) -> Result<Vec<CanonicalJob>, ProviderError> {
        let Some((app_id, app_key)) = self.credentials() else {
            return Ok(Vec::new());
        };

        let url = format!(
            "{BASE_URL}/v1/api/jobs/{}/search/{}",
            self.country, params.page
        );
        let mut query: Vec<(&str, String)> = vec![
            ("app_id", app_id.to_string()),
            ("app_key", app_key.to_string()),
            ("results_per_page", params.limit.to_string()),
            ("what", params.query.clone()),
            ("where", params.location.clone()),
        ];
        if let Some(min) = params.salary_min {
            query.push(("salary_min", min.to_string()));
        }

        let resp = send_with_retry(self.client.get(&url).query(&query)).await?;
        let raw: AdzunaResponse = resp.json().await?;
        if let Some(count) = raw.count {
            tracing::debug!(count, "adzuna reported total");
        }
        Ok(map_response(raw, &self.country, &params.location, Utc::now()))
    }
}

#[derive(Debug, Deserialize)]
struct AdzunaResponse {
    #[serde(default)]
    results: Vec<AdzunaJob>,
    count: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct AdzunaJob {
    id: Option<String>,
    title: Option<String>,
    description: Option<String>,
    company: Option<AdzunaCompany>,
    location: Option<AdzunaLocation>,
    salary_min: Option<f64>,
    salary_max: Option<f64>,
    currency: Option<String>,
    contract_type: Option<String>,
    created: Option<String>,
    redirect_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AdzunaCompany {
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AdzunaLocation {
    display_name: Option<String>,
}

fn map_response(
    raw: AdzunaResponse,
    country: &str,
    fallback_location: &str,
    now: DateTime<Utc>,
) -> Vec<CanonicalJob> {
    raw.results
        .into_iter()
        .filter_map(|job| map_job(job, country, fallback_location, now))
        .collect()
}

/// Listings without a provider id are dropped: without one there is no
/// stable composite id and no dedup key.
fn map_job(
    job: AdzunaJob,
    country: &str,
    fallback_location: &str,
    now: DateTime<Utc>,
) -> Option<CanonicalJob> {
    let source_id = job.id?;
    let salary_min = job.salary_min.map(|v| v as i64);
    let salary_max = job.salary_max.map(|v| v as i64);

    Some(CanonicalJob {
        id: composite_id(JobSource::Adzuna, &source_id),
        source: JobSource::Adzuna,
        source_id: Some(source_id),
        title: job.title.unwrap_or_default(),
        company: job
            .company
            .and_then(|c| c.display_name)
            .unwrap_or_default(),
        company_logo: None,
        location: job
            .location
            .and_then(|l| l.display_name)
            .unwrap_or_else(|| fallback_location.to_string()),
        country: country.to_string(),
        description: job.description.unwrap_or_default(),
        salary: format_salary_range(salary_min, salary_max, job.currency.as_deref()),
        salary_min,
        salary_max,
        salary_currency: job.currency,
        job_type: job.contract_type,
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
        apply_url: job.redirect_url.clone(),
        source_url: job.redirect_url,
        posted_at: job
            .created
            .as_deref()
            .and_then(parse_created),
        created_at: now,
    })
}

fn parse_created(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fixture() -> AdzunaResponse {
        serde_json::from_value(json!({
            "count": 2417,
            "results": [
                {
                    "id": "5163966441",
                    "title": "Senior Backend Engineer",
                    "description": "We are looking for an engineer with Python experience.",
                    "company": { "display_name": "Acme Analytics" },
                    "location": { "display_name": "Bengaluru, Karnataka" },
                    "salary_min": 1500000.0,
                    "salary_max": 2400000.37,
                    "currency": "INR",
                    "contract_type": "permanent",
                    "created": "2024-05-12T07:08:47Z",
                    "redirect_url": "https://www.adzuna.in/details/5163966441"
                },
                {
                    "title": "No id, should be dropped",
                    "description": "x"
                }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn maps_results_and_drops_records_without_an_id() {
        let now = Utc::now();
        let jobs = map_response(fixture(), "in", "India", now);
        assert_eq!(jobs.len(), 1);

        let job = &jobs[0];
        assert_eq!(job.id, "ext-external-5163966441");
        assert_eq!(job.source, JobSource::Adzuna);
        assert_eq!(job.source_id.as_deref(), Some("5163966441"));
        assert_eq!(job.title, "Senior Backend Engineer");
        assert_eq!(job.company, "Acme Analytics");
        assert_eq!(job.location, "Bengaluru, Karnataka");
        assert_eq!(job.country, "in");
        assert_eq!(job.salary_min, Some(1_500_000));
        assert_eq!(job.salary_max, Some(2_400_000));
        assert_eq!(job.salary.as_deref(), Some("₹ 1,500,000 - ₹ 2,400,000"));
        assert_eq!(job.job_type.as_deref(), Some("permanent"));
        assert!(job.is_external);
        assert_eq!(job.created_at, now);
        assert_eq!(
            job.posted_at.map(|d| d.to_rfc3339()),
            Some("2024-05-12T07:08:47+00:00".to_string())
        );
    }

    #[test]
    fn falls_back_to_search_location_when_listing_has_none() {
        let raw: AdzunaResponse = serde_json::from_value(json!({
            "results": [{ "id": "77", "title": "Dispatcher" }]
        }))
        .unwrap();
        let jobs = map_response(raw, "in", "Pune", Utc::now());
        assert_eq!(jobs[0].location, "Pune");
        assert_eq!(jobs[0].salary, None);
        assert_eq!(jobs[0].posted_at, None);
    }
}
