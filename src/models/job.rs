use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;

use crate::error::AppError;
use crate::models::canonical::{CanonicalJob, JobSource, composite_id};
use crate::search::SearchParams;

/// A row of the local `jobs` table: manually posted jobs plus cached
/// copies of external listings. The search path only ever reads this table.
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct Job {
    pub id: i64,
    pub source: String,
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
    pub skills: String,
    pub requirements: String,
    pub benefits: String,
    pub is_remote: bool,
    pub is_hybrid: bool,
    pub is_urgent: bool,
    pub is_featured: bool,
    pub is_active: bool,
    pub apply_url: Option<String>,
    pub source_url: Option<String>,
    pub raw_json: Option<serde_json::Value>,
    pub posted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const SEARCH_WHERE: &str = "is_active \
     AND (title ILIKE '%' || $1 || '%' OR company ILIKE '%' || $1 || '%' \
          OR description ILIKE '%' || $1 || '%' OR skills ILIKE '%' || $1 || '%') \
     AND ($2::text IS NULL OR location ILIKE '%' || $2 || '%') \
     AND ($3::text IS NULL OR job_type ILIKE $3) \
     AND ($4::text IS NULL OR experience_level ILIKE $4 || '%') \
     AND (NOT COALESCE($5::boolean, FALSE) OR is_remote) \
     AND ($6::bigint IS NULL OR salary_min IS NULL OR salary_min >= $6) \
     AND ($7::bigint IS NULL OR salary_max IS NULL OR salary_max <= $7) \
     AND ($8::text IS NULL OR sector ILIKE $8) \
     AND ($9::timestamptz IS NULL OR COALESCE(posted_at, created_at) >= $9)";

impl Job {
    /// One page of matching rows plus the true match count. Filters follow
    /// the shared predicate the aggregator also applies to external
    /// results: missing salary bounds pass salary filters, `remote` only
    /// constrains when true, and experience level is a prefix match so
    /// "mid" finds "mid level".
    pub async fn search(
        pool: &PgPool,
        params: &SearchParams,
        posted_after: Option<DateTime<Utc>>,
    ) -> Result<(Vec<Job>, i64), AppError> {
        let select = format!(
            "SELECT * FROM jobs WHERE {SEARCH_WHERE} \
             ORDER BY is_featured DESC, created_at DESC LIMIT $10 OFFSET $11"
        );
        let jobs = sqlx::query_as::<_, Job>(&select)
            .bind(&params.query)
            .bind(&params.location_filter)
            .bind(&params.job_type)
            .bind(&params.experience_level)
            .bind(params.remote)
            .bind(params.salary_min)
            .bind(params.salary_max)
            .bind(&params.sector)
            .bind(posted_after)
            .bind(params.limit)
            .bind(params.offset())
            .fetch_all(pool)
            .await?;

        let count = format!("SELECT COUNT(*) FROM jobs WHERE {SEARCH_WHERE}");
        let total: (i64,) = sqlx::query_as(&count)
            .bind(&params.query)
            .bind(&params.location_filter)
            .bind(&params.job_type)
            .bind(&params.experience_level)
            .bind(params.remote)
            .bind(params.salary_min)
            .bind(params.salary_max)
            .bind(&params.sector)
            .bind(posted_after)
            .fetch_one(pool)
            .await?;

        Ok((jobs, total.0))
    }

    pub async fn get(pool: &PgPool, id: i64) -> Result<Option<Job>, AppError> {
        let job = sqlx::query_as::<_, Job>("SELECT * FROM jobs WHERE id = $1 AND is_active")
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(job)
    }

    /// Cached copy of an external listing, if the collector pipeline has
    /// stored one.
    pub async fn find_by_source(
        pool: &PgPool,
        source: JobSource,
        source_id: &str,
    ) -> Result<Option<Job>, AppError> {
        let job = sqlx::query_as::<_, Job>(
            "SELECT * FROM jobs WHERE source = $1 AND source_id = $2 AND is_active",
        )
        .bind(source.as_str())
        .bind(source_id)
        .fetch_optional(pool)
        .await?;
        Ok(job)
    }

    pub async fn active_count(pool: &PgPool) -> Result<i64, AppError> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM jobs WHERE is_active")
            .fetch_one(pool)
            .await?;
        Ok(row.0)
    }

    pub async fn source_counts(pool: &PgPool) -> Result<Vec<(String, i64)>, AppError> {
        let rows = sqlx::query_as::<_, (String, i64)>(
            "SELECT source, COUNT(*) FROM jobs WHERE is_active GROUP BY source ORDER BY COUNT(*) DESC",
        )
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    pub async fn sector_counts(pool: &PgPool) -> Result<Vec<(String, i64)>, AppError> {
        let rows = sqlx::query_as::<_, (String, i64)>(
            "SELECT COALESCE(sector, 'general'), COUNT(*) FROM jobs WHERE is_active \
             GROUP BY COALESCE(sector, 'general') ORDER BY COUNT(*) DESC",
        )
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    /// Convert a stored row into the canonical shape served by the API.
    /// Cached external rows get their composite id back; manual rows are
    /// identified by the database key.
    pub fn into_canonical(self) -> CanonicalJob {
        let source = JobSource::parse(&self.source).unwrap_or(JobSource::Manual);
        let id = match (&self.source_id, source) {
            (_, JobSource::Manual) | (None, _) => self.id.to_string(),
            (Some(source_id), _) => composite_id(source, source_id),
        };
        CanonicalJob {
            id,
            source,
            source_id: self.source_id,
            title: self.title,
            company: self.company,
            company_logo: self.company_logo,
            location: self.location,
            country: self.country,
            description: self.description,
            salary: self.salary,
            salary_min: self.salary_min,
            salary_max: self.salary_max,
            salary_currency: self.salary_currency,
            job_type: self.job_type,
            experience_level: self.experience_level,
            sector: self.sector,
            work_mode: self.work_mode,
            skills: split_list(&self.skills),
            requirements: split_lines(&self.requirements),
            benefits: split_list(&self.benefits),
            is_remote: self.is_remote,
            is_hybrid: self.is_hybrid,
            is_urgent: self.is_urgent,
            is_featured: self.is_featured,
            is_external: source.is_external(),
            apply_url: self.apply_url,
            source_url: self.source_url,
            posted_at: self.posted_at,
            created_at: self.created_at,
        }
    }
}

/// Comma-delimited storage form of skills and benefits.
fn split_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}

/// Requirements are full sentences, stored one per line.
fn split_lines(s: &str) -> Vec<String> {
    s.lines()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> Job {
        Job {
            id: 17,
            source: "manual".to_string(),
            source_id: None,
            title: "Backend Engineer".to_string(),
            company: "Acme".to_string(),
            company_logo: None,
            location: "Pune, India".to_string(),
            country: "IN".to_string(),
            description: "Build APIs".to_string(),
            salary: None,
            salary_min: Some(900000),
            salary_max: Some(1400000),
            salary_currency: Some("INR".to_string()),
            job_type: Some("full-time".to_string()),
            experience_level: Some("mid level".to_string()),
            sector: Some("technology".to_string()),
            work_mode: None,
            skills: "Rust, SQL, Docker".to_string(),
            requirements: "3+ years backend experience\nComfortable with SQL\n".to_string(),
            benefits: "Health insurance,Remote work".to_string(),
            is_remote: false,
            is_hybrid: false,
            is_urgent: false,
            is_featured: true,
            is_active: true,
            apply_url: Some("https://acme.example/apply".to_string()),
            source_url: None,
            raw_json: None,
            posted_at: None,
            created_at: DateTime::parse_from_rfc3339("2024-04-02T10:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
            updated_at: DateTime::parse_from_rfc3339("2024-04-02T10:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
        }
    }

    #[test]
    fn manual_rows_are_identified_by_database_id() {
        let canonical = row().into_canonical();
        assert_eq!(canonical.id, "17");
        assert_eq!(canonical.source, JobSource::Manual);
        assert!(!canonical.is_external);
        assert_eq!(canonical.skills, vec!["Rust", "SQL", "Docker"]);
        assert_eq!(
            canonical.requirements,
            vec!["3+ years backend experience", "Comfortable with SQL"]
        );
        assert_eq!(canonical.benefits, vec!["Health insurance", "Remote work"]);
    }

    #[test]
    fn cached_external_rows_recover_their_composite_id() {
        let mut r = row();
        r.source = "adzuna".to_string();
        r.source_id = Some("4411".to_string());
        let canonical = r.into_canonical();
        assert_eq!(canonical.id, "ext-external-4411");
        assert_eq!(canonical.source, JobSource::Adzuna);
        assert!(canonical.is_external);
    }

    #[test]
    fn unknown_source_strings_degrade_to_manual() {
        let mut r = row();
        r.source = "linkedin".to_string();
        r.source_id = Some("zzz".to_string());
        let canonical = r.into_canonical();
        assert_eq!(canonical.source, JobSource::Manual);
        assert_eq!(canonical.id, "17");
    }

    #[test]
    fn empty_delimited_fields_become_empty_vecs() {
        let mut r = row();
        r.skills = String::new();
        r.requirements = "  \n \n".to_string();
        r.benefits = " , ,".to_string();
        let canonical = r.into_canonical();
        assert!(canonical.skills.is_empty());
        assert!(canonical.requirements.is_empty());
        assert!(canonical.benefits.is_empty());
    }
}
