use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Serialize;
use serde_json::json;

use crate::error::{AppError, GoogleFallback};
use crate::models::canonical::{CanonicalJob, parse_composite_id};
use crate::models::job::Job;
use crate::routes::AppState;
use crate::search::{SearchParams, SearchQuery, SearchResponse, enrich};

pub async fn search(
    State(state): State<AppState>,
    Query(raw): Query<SearchQuery>,
) -> Result<Json<SearchResponse>, AppError> {
    let params = SearchParams::from_query(raw, &state.default_location)?;
    let response = state.aggregator.search(&params).await?;
    Ok(Json(response))
}

#[derive(Debug, Serialize)]
pub struct JobDetailResponse {
    pub success: bool,
    pub job: JobDetail,
}

/// The looked-up job with its similar-jobs list folded in, so the payload
/// reads as one object: `{ ...job, similarJobs: [...] }`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobDetail {
    #[serde(flatten)]
    pub job: CanonicalJob,
    pub similar_jobs: Vec<CanonicalJob>,
}

/// Composite `ext-{source}-{sourceId}` ids resolve through the local cache
/// first, then a live lookup against the owning provider. Anything else is
/// treated as a local database key. Ids nothing recognizes get the Google
/// fallback, never a hard error.
pub async fn detail(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<JobDetailResponse>, AppError> {
    let Some(mut job) = lookup(&state, &id).await? else {
        return Err(AppError::no_results(
            "Job not found",
            GoogleFallback::for_job(&id),
        ));
    };
    enrich::complete(&mut job);

    let similar_jobs = similar_jobs(&state, &job).await;
    Ok(Json(JobDetailResponse {
        success: true,
        job: JobDetail { job, similar_jobs },
    }))
}

async fn lookup(state: &AppState, id: &str) -> Result<Option<CanonicalJob>, AppError> {
    if id.starts_with("ext-") {
        let Some((source, source_id)) = parse_composite_id(id) else {
            return Ok(None);
        };

        if let Some(row) =
            Job::find_by_source(state.aggregator.pool(), source, &source_id).await?
        {
            return Ok(Some(row.into_canonical()));
        }

        let Some(provider) = state.aggregator.registry().get(source) else {
            return Ok(None);
        };
        return match provider.fetch_by_id(&source_id).await {
            Ok(job) => Ok(job),
            Err(e) => {
                tracing::warn!(source = source.as_str(), error = %e, "live detail lookup failed");
                Ok(None)
            }
        };
    }

    // Raw local key. A non-numeric id matches nothing, same as a miss.
    let Ok(local_id) = id.parse::<i64>() else {
        return Ok(None);
    };
    let job = Job::get(state.aggregator.pool(), local_id).await?;
    Ok(job.map(Job::into_canonical))
}

/// Up to three other listings sharing the first two title words and the
/// sector, from the local store only. Best effort: a failure here never
/// breaks the detail response.
async fn similar_jobs(state: &AppState, job: &CanonicalJob) -> Vec<CanonicalJob> {
    let query: String = job
        .title
        .split_whitespace()
        .take(2)
        .collect::<Vec<_>>()
        .join(" ");
    if query.is_empty() {
        return Vec::new();
    }

    let params = SearchParams {
        query,
        location: state.default_location.clone(),
        location_filter: None,
        job_type: None,
        experience_level: None,
        date_posted: None,
        remote: None,
        salary_min: None,
        salary_max: None,
        sector: job.sector.clone(),
        page: 1,
        limit: 5,
    };

    match Job::search(state.aggregator.pool(), &params, None).await {
        Ok((rows, _)) => rows
            .into_iter()
            .map(Job::into_canonical)
            .map(|mut similar| {
                enrich::complete(&mut similar);
                similar
            })
            .filter(|similar| similar.id != job.id)
            .take(3)
            .collect(),
        Err(e) => {
            tracing::warn!(error = %e, "similar jobs lookup failed");
            Vec::new()
        }
    }
}

pub async fn detail_preflight() -> impl IntoResponse {
    (
        StatusCode::OK,
        [
            ("Access-Control-Allow-Origin", "*"),
            ("Access-Control-Allow-Methods", "GET, OPTIONS"),
            ("Access-Control-Allow-Headers", "Content-Type, Authorization"),
        ],
    )
}

pub async fn stats(State(state): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    let pool = state.aggregator.pool();
    let total = Job::active_count(pool).await?;
    let sources = Job::source_counts(pool).await?;
    let sectors = Job::sector_counts(pool).await?;

    let by_source: serde_json::Map<String, serde_json::Value> = sources
        .into_iter()
        .map(|(source, count)| (source, count.into()))
        .collect();
    let by_sector: serde_json::Map<String, serde_json::Value> = sectors
        .into_iter()
        .map(|(sector, count)| (sector, count.into()))
        .collect();

    Ok(Json(json!({
        "success": true,
        "totalJobs": total,
        "bySource": by_source,
        "bySector": by_sector,
    })))
}
