use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Where a job record came from. Never mutated after construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobSource {
    Manual,
    Adzuna,
    Jsearch,
    Google,
    Reed,
    Serpapi,
    Sample,
}

impl JobSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobSource::Manual => "manual",
            JobSource::Adzuna => "adzuna",
            JobSource::Jsearch => "jsearch",
            JobSource::Google => "google",
            JobSource::Reed => "reed",
            JobSource::Serpapi => "serpapi",
            JobSource::Sample => "sample",
        }
    }

    /// Segment used inside composite job ids. Adzuna listings have always
    /// been published under the legacy `external` segment; changing it would
    /// break every bookmarked deep link.
    pub fn id_segment(&self) -> &'static str {
        match self {
            JobSource::Adzuna => "external",
            other => other.as_str(),
        }
    }

    pub fn parse(s: &str) -> Option<JobSource> {
        match s {
            "manual" => Some(JobSource::Manual),
            "adzuna" | "external" => Some(JobSource::Adzuna),
            "jsearch" => Some(JobSource::Jsearch),
            "google" => Some(JobSource::Google),
            "reed" => Some(JobSource::Reed),
            "serpapi" => Some(JobSource::Serpapi),
            "sample" => Some(JobSource::Sample),
            _ => None,
        }
    }

    pub fn is_external(&self) -> bool {
        !matches!(self, JobSource::Manual)
    }
}

impl fmt::Display for JobSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Composite id for an externally sourced job: `ext-{segment}-{sourceId}`.
/// Stable across requests so the same listing always resolves to the same
/// detail URL.
pub fn composite_id(source: JobSource, source_id: &str) -> String {
    format!("ext-{}-{}", source.id_segment(), source_id)
}

/// Split a composite id back into source and provider-native id. The
/// provider id may itself contain hyphens, so only the first two segments
/// are structural. Manual jobs never carry composite ids.
pub fn parse_composite_id(id: &str) -> Option<(JobSource, String)> {
    let rest = id.strip_prefix("ext-")?;
    let (segment, source_id) = rest.split_once('-')?;
    if source_id.is_empty() {
        return None;
    }
    let source = JobSource::parse(segment)?;
    if source == JobSource::Manual {
        return None;
    }
    Some((source, source_id.to_string()))
}

/// The normalized job shape every adapter produces and every response
/// serves. Field names are part of the public API contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalJob {
    pub id: String,
    pub source: JobSource,
    pub source_id: Option<String>,
    pub title: String,
    pub company: String,
    pub company_logo: Option<String>,
    pub location: String,
    pub country: String,
    pub description: String,
    pub salary: Option<String>,
    pub salary_min: Option<i64>,
    pub salary_max: Option<i64>,
    pub salary_currency: Option<String>,
    pub job_type: Option<String>,
    pub experience_level: Option<String>,
    pub sector: Option<String>,
    pub work_mode: Option<String>,
    pub skills: Vec<String>,
    pub requirements: Vec<String>,
    pub benefits: Vec<String>,
    pub is_remote: bool,
    pub is_hybrid: bool,
    pub is_urgent: bool,
    pub is_featured: bool,
    pub is_external: bool,
    pub apply_url: Option<String>,
    pub source_url: Option<String>,
    pub posted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl CanonicalJob {
    /// Dedup key over `(source, sourceId)`. A cached copy of an external
    /// listing hashes identically to the live copy from the provider.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.source.as_str().as_bytes());
        hasher.update(b":");
        match &self.source_id {
            Some(source_id) => hasher.update(source_id.as_bytes()),
            None => hasher.update(self.id.as_bytes()),
        }
        hex::encode(hasher.finalize())
    }
}

fn currency_symbol(code: &str) -> &'static str {
    match code.to_ascii_uppercase().as_str() {
        "INR" => "₹",
        "USD" => "$",
        "GBP" => "£",
        "EUR" => "€",
        "CAD" => "C$",
        "AUD" => "A$",
        "SGD" => "S$",
        "JPY" => "¥",
        _ => "$",
    }
}

fn group_thousands(n: i64) -> String {
    let s = n.to_string();
    let (sign, digits) = match s.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", s.as_str()),
    };
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("{sign}{grouped}")
}

/// Build the display salary string from whatever numeric bounds a provider
/// supplied. `None` when nothing was disclosed; we never fabricate zeros.
pub fn format_salary_range(
    min: Option<i64>,
    max: Option<i64>,
    currency: Option<&str>,
) -> Option<String> {
    let symbol = currency_symbol(currency.unwrap_or("INR"));
    match (min, max) {
        (Some(min), Some(max)) => Some(format!(
            "{symbol} {} - {symbol} {}",
            group_thousands(min),
            group_thousands(max)
        )),
        (Some(min), None) => Some(format!("{symbol} {}+", group_thousands(min))),
        (None, Some(max)) => Some(format!("Up to {symbol} {}", group_thousands(max))),
        (None, None) => None,
    }
}
