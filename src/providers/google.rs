use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;

use crate::models::canonical::{CanonicalJob, JobSource, composite_id};
use crate::providers::{JobProvider, ProviderError, send_with_retry};
use crate::search::SearchParams;

const BASE_URL: &str = "https://serpapi.com/search.json";

/// Google Jobs adapter. Runs the same SerpApi engine as [`crate::providers::serpapi`]
/// but under its own credential and with a plain `"{query} jobs in {location}"`
/// search phrase, and only reads the handful of fields Google always fills.
pub struct GoogleJobs {
    client: Client,
    api_key: Option<String>,
}

impl GoogleJobs {
    pub fn new(client: Client, api_key: Option<String>) -> Self {
        GoogleJobs { client, api_key }
    }
}

#[async_trait]
impl JobProvider for GoogleJobs {
    fn kind(&self) -> JobSource {
        JobSource::Google
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn fetch(&self, params: &SearchParams) -> Result<Vec<CanonicalJob>, ProviderError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Ok(Vec::new());
        };

        let query: Vec<(&str, String)> = vec![
            ("engine", "google_jobs".to_string()),
            ("q", search_phrase(params)),
            ("hl", "en".to_string()),
            ("api_key", api_key.to_string()),
        ];

        let resp = send_with_retry(self.client.get(BASE_URL).query(&query)).await?;
        let raw: GoogleJobsResponse = resp.json().await?;
        Ok(map_response(raw, &params.location, Utc::now()))
    }
}

fn search_phrase(params: &SearchParams) -> String {
    format!("{} jobs in {}", params.query, params.location)
}

#[derive(Debug, Deserialize)]
struct GoogleJobsResponse {
    #[serde(default)]
    jobs_results: Vec<GoogleJob>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GoogleJob {
    job_id: Option<String>,
    title: Option<String>,
    company_name: Option<String>,
    location: Option<String>,
    description: Option<String>,
    share_link: Option<String>,
}

fn map_response(
    raw: GoogleJobsResponse,
    fallback_location: &str,
    now: DateTime<Utc>,
) -> Vec<CanonicalJob> {
    if let Some(error) = raw.error {
        // SerpApi reports "no results" style conditions in-body with a 200
        tracing::warn!(error, "google jobs returned an error payload");
        return Vec::new();
    }
    raw.jobs_results
        .into_iter()
        .filter_map(|job| map_job(job, fallback_location, now))
        .collect()
}

fn map_job(job: GoogleJob, fallback_location: &str, now: DateTime<Utc>) -> Option<CanonicalJob> {
    let source_id = job.job_id?;

    Some(CanonicalJob {
        id: composite_id(JobSource::Google, &source_id),
        source: JobSource::Google,
        source_id: Some(source_id),
        title: job.title.unwrap_or_default(),
        company: job.company_name.unwrap_or_default(),
        company_logo: None,
        location: job
            .location
            .unwrap_or_else(|| fallback_location.to_string()),
        country: "IN".to_string(),
        description: job.description.unwrap_or_default(),
        salary: None,
        salary_min: None,
        salary_max: None,
        salary_currency: None,
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
        apply_url: job.share_link.clone(),
        source_url: job.share_link,
        posted_at: None,
        created_at: now,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builds_the_jobs_in_location_phrase() {
        let params = SearchParams {
            query: "data engineer".to_string(),
            location: "Hyderabad".to_string(),
            location_filter: Some("Hyderabad".to_string()),
            job_type: None,
            experience_level: None,
            date_posted: None,
            remote: None,
            salary_min: None,
            salary_max: None,
            sector: None,
            page: 1,
            limit: 20,
        };
        assert_eq!(search_phrase(&params), "data engineer jobs in Hyderabad");
    }

    #[test]
    fn maps_jobs_results_minimally() {
        let raw: GoogleJobsResponse = serde_json::from_value(json!({
            "jobs_results": [
                {
                    "job_id": "eyJqb2JfdGl0bGUi",
                    "title": "Platform Engineer",
                    "company_name": "Meridian Systems",
                    "location": "Hyderabad, Telangana",
                    "description": "Kubernetes platform work.",
                    "share_link": "https://www.google.com/search?ibp=htl;jobs#fpstate=tldetail"
                },
                { "title": "Dropped, no job_id" }
            ]
        }))
        .unwrap();

        let jobs = map_response(raw, "India", Utc::now());
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].id, "ext-google-eyJqb2JfdGl0bGUi");
        assert_eq!(jobs[0].company, "Meridian Systems");
        assert!(jobs[0].apply_url.is_some());
        assert!(jobs[0].is_external);
    }

    #[test]
    fn error_payload_yields_no_jobs() {
        let raw: GoogleJobsResponse = serde_json::from_value(json!({
            "error": "Google hasn't returned any results for this query."
        }))
        .unwrap();
        assert!(map_response(raw, "India", Utc::now()).is_empty());
    }
}
