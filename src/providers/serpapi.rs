use std::sync::LazyLock;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;

use crate::models::canonical::{CanonicalJob, JobSource, composite_id};
use crate::providers::{JobProvider, ProviderError, send_with_retry};
use crate::search::SearchParams;

const BASE_URL: &str = "https://serpapi.com/search.json";
const DESCRIPTION_MAX_CHARS: usize = 300;

const REMOTE_KEYWORDS: &[&str] = &["remote", "work from home", "wfh", "telecommute", "virtual"];
const URGENT_KEYWORDS: &[&str] = &[
    "urgent",
    "immediate",
    "asap",
    "hiring now",
    "join immediately",
];

static HTML_TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());
static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static DOLLAR_AMOUNT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\$(\d+),(\d+)").unwrap());
static DAYS_AGO_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+)\s+days?\s+ago").unwrap());
static HOURS_AGO_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s+hours?\s+ago").unwrap());
static MINUTES_AGO_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s+minutes?\s+ago").unwrap());

/// SerpApi adapter, the richest of the Google Jobs pair: pushes location,
/// date and remote filters down as engine chips, paginates with `start`,
/// and mines `detected_extensions` for everything Google detected.
pub struct SerpApi {
    client: Client,
    api_key: Option<String>,
}

impl SerpApi {
    pub fn new(client: Client, api_key: Option<String>) -> Self {
        SerpApi { client, api_key }
    }
}

#[async_trait]
impl JobProvider for SerpApi {
    fn kind(&self) -> JobSource {
        JobSource::Serpapi
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn fetch(&self, params: &SearchParams) -> Result<Vec<CanonicalJob>, ProviderError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Ok(Vec::new());
        };

        let mut query: Vec<(&str, String)> = vec![
            ("engine", "google_jobs".to_string()),
            ("q", params.query.clone()),
            ("location", params.location.clone()),
            ("num", params.limit.min(100).to_string()),
            ("google_domain", "google.co.uk".to_string()),
            ("hl", "en".to_string()),
            ("gl", "uk".to_string()),
            ("api_key", api_key.to_string()),
        ];
        if params.offset() > 0 {
            query.push(("start", params.offset().to_string()));
        }
        if let Some(chips) = build_chips(params) {
            query.push(("chips", chips));
        }

        let resp = send_with_retry(self.client.get(BASE_URL).query(&query)).await?;
        let raw: SerpApiResponse = resp.json().await?;
        Ok(map_response(raw, &params.location, Utc::now()))
    }
}

/// Engine-side filter chips, joined with commas the way the search UI
/// encodes them.
fn build_chips(params: &SearchParams) -> Option<String> {
    let mut chips = Vec::new();
    if let Some(date_posted) = &params.date_posted {
        chips.push(format!("date_posted:{date_posted}"));
    }
    if params.remote == Some(true) {
        chips.push("work_from_home:true".to_string());
    }
    if chips.is_empty() {
        None
    } else {
        Some(chips.join(","))
    }
}

#[derive(Debug, Deserialize)]
struct SerpApiResponse {
    #[serde(default)]
    jobs_results: Vec<SerpJob>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SerpJob {
    job_id: Option<String>,
    title: Option<String>,
    company_name: Option<String>,
    location: Option<String>,
    description: Option<String>,
    share_link: Option<String>,
    thumbnail: Option<String>,
    #[serde(default)]
    related_links: Vec<SerpRelatedLink>,
    detected_extensions: Option<SerpDetectedExtensions>,
}

#[derive(Debug, Deserialize)]
struct SerpRelatedLink {
    link: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct SerpDetectedExtensions {
    /// Relative phrasing like "3 days ago"; Google never gives an absolute date.
    posted_at: Option<String>,
    schedule_type: Option<String>,
    salary: Option<String>,
    #[serde(default)]
    work_from_home: bool,
}

fn map_response(
    raw: SerpApiResponse,
    fallback_location: &str,
    now: DateTime<Utc>,
) -> Vec<CanonicalJob> {
    if let Some(error) = raw.error {
        tracing::warn!(error, "serpapi returned an error payload");
        return Vec::new();
    }
    raw.jobs_results
        .into_iter()
        .filter_map(|job| map_job(job, fallback_location, now))
        .collect()
}

fn map_job(job: SerpJob, fallback_location: &str, now: DateTime<Utc>) -> Option<CanonicalJob> {
    let source_id = job.job_id?;
    let exts = job.detected_extensions.unwrap_or_default();

    let title = job
        .title
        .unwrap_or_else(|| "Job Title Not Available".to_string());
    let raw_description = job.description.unwrap_or_default();
    let haystack = format!("{title} {raw_description}").to_lowercase();

    let apply_url = job
        .share_link
        .or_else(|| job.related_links.into_iter().find_map(|l| l.link));

    Some(CanonicalJob {
        id: composite_id(JobSource::Serpapi, &source_id),
        source: JobSource::Serpapi,
        source_id: Some(source_id),
        title,
        company: job
            .company_name
            .unwrap_or_else(|| "Company Not Listed".to_string()),
        company_logo: job.thumbnail,
        location: job
            .location
            .unwrap_or_else(|| fallback_location.to_string()),
        country: "IN".to_string(),
        description: clean_description(&raw_description),
        salary: exts.salary.as_deref().map(format_salary_text),
        salary_min: None,
        salary_max: None,
        salary_currency: None,
        job_type: Some(detect_job_type(exts.schedule_type.as_deref(), &haystack)),
        experience_level: None,
        sector: None,
        work_mode: None,
        skills: Vec::new(),
        requirements: Vec::new(),
        benefits: Vec::new(),
        is_remote: exts.work_from_home || contains_any(&haystack, REMOTE_KEYWORDS),
        is_hybrid: false,
        is_urgent: contains_any(&haystack, URGENT_KEYWORDS),
        is_featured: false,
        is_external: true,
        apply_url: apply_url.clone(),
        source_url: apply_url,
        posted_at: exts.posted_at.as_deref().and_then(|s| parse_posted_at(s, now)),
        created_at: now,
    })
}

/// Strip markup, collapse whitespace and cap the length; Google snippets
/// arrive as loosely formatted HTML fragments.
fn clean_description(description: &str) -> String {
    let stripped = HTML_TAG_RE.replace_all(description, "");
    let collapsed = WHITESPACE_RE.replace_all(&stripped, " ");
    let cleaned = collapsed.trim();
    if cleaned.chars().count() > DESCRIPTION_MAX_CHARS {
        let mut out: String = cleaned.chars().take(DESCRIPTION_MAX_CHARS).collect();
        out.push_str("...");
        out
    } else {
        cleaned.to_string()
    }
}

/// Tidy a detected salary string; dollar figures become rupees for the
/// India-first listings this feed serves.
fn format_salary_text(salary: &str) -> String {
    let collapsed = WHITESPACE_RE.replace_all(salary, " ");
    DOLLAR_AMOUNT_RE
        .replace_all(&collapsed, "₹${1},${2}")
        .trim()
        .to_string()
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

fn detect_job_type(schedule_type: Option<&str>, haystack: &str) -> String {
    if let Some(schedule) = schedule_type {
        let schedule = schedule.to_lowercase();
        if schedule.contains("full") {
            return "Full-time".to_string();
        }
        if schedule.contains("part") {
            return "Part-time".to_string();
        }
        if schedule.contains("contract") {
            return "Contract".to_string();
        }
        if schedule.contains("intern") {
            return "Internship".to_string();
        }
    }
    if haystack.contains("intern") {
        return "Internship".to_string();
    }
    if haystack.contains("contract") {
        return "Contract".to_string();
    }
    if haystack.contains("part-time") || haystack.contains("part time") {
        return "Part-time".to_string();
    }
    "Full-time".to_string()
}

/// Turn Google's relative posting phrases into a timestamp against the
/// fetch time. Unrecognized phrasing maps to `None`, never a guess.
fn parse_posted_at(posted_at: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let lower = posted_at.trim().to_lowercase();
    if let Some(caps) = DAYS_AGO_RE.captures(&lower) {
        let days: i64 = caps[1].parse().ok()?;
        return Some(now - Duration::days(days));
    }
    if let Some(caps) = HOURS_AGO_RE.captures(&lower) {
        let hours: i64 = caps[1].parse().ok()?;
        return Some(now - Duration::hours(hours));
    }
    if let Some(caps) = MINUTES_AGO_RE.captures(&lower) {
        let minutes: i64 = caps[1].parse().ok()?;
        return Some(now - Duration::minutes(minutes));
    }
    if lower.contains("yesterday") {
        return Some(now - Duration::days(1));
    }
    if lower.contains("today") {
        return Some(now);
    }
    None
}
