//! Keyword and regex heuristics that fill in the fields providers rarely
//! supply: requirements, benefits, skills, sector, experience level and
//! work mode. Every function here is a pure function of the job text so
//! the whole module is testable without any I/O.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::models::canonical::{CanonicalJob, format_salary_range};

/// Phrase families that tend to introduce a requirement. Matched against
/// the original-cased description, case-insensitively, so the extracted
/// text keeps its display casing.
static REQUIREMENT_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)(?:require[sd]?|must have|essential|mandatory)[:\s-]*[^.]+",
        r"(?i)(?:experience in|knowledge of|proficient in)[:\s-]*[^.]+",
        r"(?i)\d+\+?\s*years?[^.]+",
        r"(?i)(?:degree|qualification|certification)[^.]+",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).unwrap())
    .collect()
});

const MATCHES_PER_PATTERN: usize = 5;
const MAX_REQUIREMENTS: usize = 10;

const BENEFIT_KEYWORDS: &[&str] = &[
    "health insurance",
    "dental",
    "vision",
    "retirement",
    "401k",
    "pension",
    "flexible hours",
    "remote work",
    "work from home",
    "vacation",
    "pto",
    "training",
    "development",
    "career growth",
    "bonus",
    "overtime",
    "gym membership",
    "free lunch",
    "coffee",
    "parking",
];

const TECH_SKILLS: &[&str] = &[
    "javascript",
    "python",
    "java",
    "c++",
    "react",
    "angular",
    "vue",
    "node.js",
    "sql",
    "mongodb",
    "postgresql",
    "aws",
    "azure",
    "docker",
    "kubernetes",
    "git",
    "agile",
    "scrum",
    "html",
    "css",
    "typescript",
    "machine learning",
    "ai",
    "data science",
    "analytics",
];

const SOFT_SKILLS: &[&str] = &[
    "communication",
    "leadership",
    "teamwork",
    "problem solving",
    "analytical",
    "creative",
    "detail oriented",
    "time management",
];

/// Keyword table checked in order against the lowercased title; the first
/// sector with any matching keyword wins.
const SECTOR_KEYWORDS: &[(&str, &[&str])] = &[
    ("technology", &["developer", "engineer", "programmer", "software", "tech"]),
    ("healthcare", &["nurse", "doctor", "medical", "health", "care"]),
    ("finance", &["finance", "accounting", "bank", "investment"]),
    ("education", &["teacher", "professor", "education", "school"]),
    ("sales", &["sales", "account manager", "business development"]),
    ("marketing", &["marketing", "brand", "social media", "seo"]),
];

fn capitalize_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Scan the description for requirement-like sentences. Up to five matches
/// per pattern family, duplicates removed keeping first-seen order, ten
/// total.
pub fn extract_requirements(description: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut requirements = Vec::new();
    for pattern in REQUIREMENT_PATTERNS.iter() {
        for m in pattern.find_iter(description).take(MATCHES_PER_PATTERN) {
            let text = m.as_str().to_string();
            if seen.insert(text.clone()) {
                requirements.push(text);
            }
        }
    }
    requirements.truncate(MAX_REQUIREMENTS);
    requirements
}

/// Match the benefit vocabulary against the lowercased description. Each
/// hit is reported once with its first letter capitalized.
pub fn extract_benefits(description: &str) -> Vec<String> {
    let text = description.to_lowercase();
    BENEFIT_KEYWORDS
        .iter()
        .filter(|keyword| text.contains(*keyword))
        .map(|keyword| capitalize_first(keyword))
        .collect()
}

/// Match the skill vocabularies against lowercased title+company+
/// description. Plain substring semantics: "javascript" satisfies both the
/// "javascript" and "java" keywords, which is the accepted recall/precision
/// tradeoff for this heuristic.
pub fn extract_skills(title: &str, company: &str, description: &str) -> Vec<String> {
    let text = format!("{title} {company} {description}").to_lowercase();
    TECH_SKILLS
        .iter()
        .chain(SOFT_SKILLS.iter())
        .filter(|skill| text.contains(*skill))
        .map(|skill| capitalize_first(skill))
        .collect()
}

pub fn determine_sector(title: &str) -> String {
    let title = title.to_lowercase();
    for (sector, keywords) in SECTOR_KEYWORDS {
        if keywords.iter().any(|keyword| title.contains(keyword)) {
            return (*sector).to_string();
        }
    }
    "general".to_string()
}

/// Senior markers are checked before entry markers so "senior graduate
/// scheme lead" classifies as senior.
pub fn determine_experience_level(title: &str, description: &str) -> String {
    let text = format!("{title} {description}").to_lowercase();
    if text.contains("senior") || text.contains("lead") || text.contains("5+ years") {
        return "senior".to_string();
    }
    if text.contains("junior") || text.contains("entry") || text.contains("graduate") {
        return "entry level".to_string();
    }
    "mid level".to_string()
}

pub fn determine_work_mode(description: &str) -> &'static str {
    let text = description.to_lowercase();
    if text.contains("remote") || text.contains("work from home") {
        return "Remote";
    }
    if text.contains("hybrid") {
        return "Hybrid";
    }
    "On-site"
}

/// Dedupe a provider-supplied skill list case-insensitively, keeping the
/// first display form of each skill.
fn dedupe_display_list(items: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.to_lowercase()))
        .collect()
}

/// Fill every inferable gap on a job. Provider-supplied values always win;
/// the heuristics only run where the adapter left a field empty. Flag
/// upgrades (a "Remote" work mode setting `isRemote`) are one-way.
pub fn complete(job: &mut CanonicalJob) {
    if job.experience_level.is_none() {
        job.experience_level = Some(determine_experience_level(&job.title, &job.description));
    }
    if job.sector.is_none() {
        job.sector = Some(determine_sector(&job.title));
    }
    if job.work_mode.is_none() {
        let mode = if job.is_remote {
            "Remote"
        } else if job.is_hybrid {
            "Hybrid"
        } else {
            determine_work_mode(&job.description)
        };
        job.work_mode = Some(mode.to_string());
    }
    match job.work_mode.as_deref() {
        Some("Remote") => job.is_remote = true,
        Some("Hybrid") => job.is_hybrid = true,
        _ => {}
    }
    if job.skills.is_empty() {
        job.skills = extract_skills(&job.title, &job.company, &job.description);
    } else {
        job.skills = dedupe_display_list(std::mem::take(&mut job.skills));
    }
    if job.requirements.is_empty() {
        job.requirements = extract_requirements(&job.description);
    }
    if job.benefits.is_empty() {
        job.benefits = extract_benefits(&job.description);
    }
    if let (Some(min), Some(max)) = (job.salary_min, job.salary_max)
        && min > max
    {
        job.salary_min = Some(max);
        job.salary_max = Some(min);
    }
    if job.salary.is_none() {
        job.salary = format_salary_range(
            job.salary_min,
            job.salary_max,
            job.salary_currency.as_deref(),
        );
    }
}
