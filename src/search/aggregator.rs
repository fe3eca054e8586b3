//! Fan-out search across the local store and every external provider.
//!
//! The local table and the five provider APIs are queried concurrently,
//! each provider behind its own deadline, and whatever settles in time is
//! merged in a fixed priority order: local rows first, then providers in
//! registry order. Network timing never changes the output order.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use futures::future::join_all;
use sqlx::PgPool;

use crate::error::{AppError, GoogleFallback};
use crate::models::canonical::CanonicalJob;
use crate::models::job::Job;
use crate::providers::{JobProvider, ProviderRegistry};
use crate::search::{ApiStatus, FetchState, SearchMeta, SearchParams, SearchResponse, enrich};

pub struct Aggregator {
    pool: PgPool,
    registry: Arc<ProviderRegistry>,
    provider_timeout: Duration,
}

struct ProviderOutcome {
    name: &'static str,
    configured: bool,
    state: FetchState,
    jobs: Vec<CanonicalJob>,
}

impl Aggregator {
    pub fn new(pool: PgPool, registry: Arc<ProviderRegistry>, provider_timeout: Duration) -> Self {
        Aggregator {
            pool,
            registry,
            provider_timeout,
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Run one search end to end: fan out, merge, enrich, paginate.
    ///
    /// The local store is just another participant here. If the database
    /// errors the search degrades exactly like a failed provider; only a
    /// fan-out where nothing at all succeeded becomes a 500.
    pub async fn search(&self, params: &SearchParams) -> Result<SearchResponse, AppError> {
        let started = Instant::now();
        let now = Utc::now();
        let posted_after = params.posted_after(now);

        let (local, outcomes) = tokio::join!(
            Job::search(&self.pool, params, posted_after),
            fetch_providers(self.registry.providers(), params, self.provider_timeout),
        );

        let (local_jobs, local_total, local_state) = match local {
            Ok((rows, total)) => {
                let jobs: Vec<CanonicalJob> = rows.into_iter().map(Job::into_canonical).collect();
                let state = if jobs.is_empty() {
                    FetchState::Empty
                } else {
                    FetchState::Ok
                };
                (jobs, total, state)
            }
            Err(e) => {
                tracing::error!(error = %e, "local job search failed");
                (Vec::new(), 0, FetchState::Error)
            }
        };

        assemble(
            local_jobs,
            local_total,
            local_state,
            outcomes,
            params,
            posted_after,
            started.elapsed().as_millis() as i64,
        )
    }
}

/// Fetch from every adapter concurrently, all-settled. A provider that
/// errors or runs past the deadline contributes an empty list and a
/// diagnostic state, never a failure of the whole search.
async fn fetch_providers(
    providers: &[Arc<dyn JobProvider>],
    params: &SearchParams,
    timeout: Duration,
) -> Vec<ProviderOutcome> {
    let fetches = providers.iter().map(|provider| async move {
        let name = provider.kind().as_str();
        if !provider.is_configured() {
            return ProviderOutcome {
                name,
                configured: false,
                state: FetchState::Disabled,
                jobs: Vec::new(),
            };
        }
        match tokio::time::timeout(timeout, provider.fetch(params)).await {
            Ok(Ok(jobs)) => {
                let state = if jobs.is_empty() {
                    FetchState::Empty
                } else {
                    FetchState::Ok
                };
                ProviderOutcome {
                    name,
                    configured: true,
                    state,
                    jobs,
                }
            }
            Ok(Err(e)) => {
                tracing::warn!(provider = name, error = %e, "provider fetch failed");
                ProviderOutcome {
                    name,
                    configured: true,
                    state: FetchState::Error,
                    jobs: Vec::new(),
                }
            }
            Err(_) => {
                tracing::warn!(
                    provider = name,
                    timeout_ms = timeout.as_millis() as u64,
                    "provider fetch timed out"
                );
                ProviderOutcome {
                    name,
                    configured: true,
                    state: FetchState::Timeout,
                    jobs: Vec::new(),
                }
            }
        }
    });
    join_all(fetches).await
}

/// Everything after the I/O settles. Pure so the merge semantics are
/// testable without a database or network.
fn assemble(
    local_jobs: Vec<CanonicalJob>,
    local_total: i64,
    local_state: FetchState,
    outcomes: Vec<ProviderOutcome>,
    params: &SearchParams,
    posted_after: Option<DateTime<Utc>>,
    search_time: i64,
) -> Result<SearchResponse, AppError> {
    let local_count = local_jobs.len();
    let (jobs, mut api_status) = merge(local_jobs, outcomes, params, posted_after);
    api_status.insert(
        0,
        ApiStatus {
            provider: "local".to_string(),
            configured: true,
            state: local_state,
            jobs: local_count,
        },
    );

    let all_failed = api_status
        .iter()
        .filter(|s| s.configured)
        .all(|s| matches!(s.state, FetchState::Error | FetchState::Timeout));
    if all_failed {
        return Err(AppError::SearchFailed {
            message: "every job source errored or timed out".to_string(),
            api_status,
        });
    }

    if jobs.is_empty() {
        return Err(AppError::no_results(
            "No jobs found matching your criteria",
            GoogleFallback::for_search(&params.query, &params.location),
        ));
    }

    let external_unique = (jobs.len() - local_count) as i64;
    let total = local_total + external_unique;
    let total_pages = (total + params.limit - 1) / params.limit;

    let mut jobs = jobs;
    jobs.truncate(params.limit as usize);

    Ok(SearchResponse {
        success: true,
        jobs,
        total,
        page: params.page,
        total_pages,
        has_more: params.page < total_pages,
        meta: SearchMeta {
            source: "aggregated".to_string(),
            search_time,
            api_status,
        },
    })
}

/// Merge local rows with provider results. Local jobs come pre-filtered by
/// SQL and claim their dedup keys first, so a cached copy of an external
/// listing always beats the live copy fetched in the same request.
fn merge(
    local_jobs: Vec<CanonicalJob>,
    outcomes: Vec<ProviderOutcome>,
    params: &SearchParams,
    posted_after: Option<DateTime<Utc>>,
) -> (Vec<CanonicalJob>, Vec<ApiStatus>) {
    let mut seen: HashSet<String> = HashSet::new();
    let mut jobs: Vec<CanonicalJob> = Vec::with_capacity(local_jobs.len());

    for mut job in local_jobs {
        enrich::complete(&mut job);
        seen.insert(job.fingerprint());
        jobs.push(job);
    }

    let mut api_status = Vec::with_capacity(outcomes.len());
    for outcome in outcomes {
        let mut contributed = 0;
        for mut job in outcome.jobs {
            enrich::complete(&mut job);
            if !matches_filters(&job, params, posted_after) {
                continue;
            }
            if seen.insert(job.fingerprint()) {
                contributed += 1;
                jobs.push(job);
            }
        }
        api_status.push(ApiStatus {
            provider: outcome.name.to_string(),
            configured: outcome.configured,
            state: outcome.state,
            jobs: contributed,
        });
    }

    (jobs, api_status)
}

/// The structured filters, applied to external results after enrichment.
/// Mirrors the SQL predicate the local store runs: missing salary bounds
/// pass salary filters, experience level matches by prefix, and the free
/// text query is not re-checked because the provider engine already
/// matched on it.
fn matches_filters(
    job: &CanonicalJob,
    params: &SearchParams,
    posted_after: Option<DateTime<Utc>>,
) -> bool {
    if let Some(location) = &params.location_filter
        && !job
            .location
            .to_lowercase()
            .contains(&location.to_lowercase())
    {
        return false;
    }
    if let Some(job_type) = &params.job_type {
        match &job.job_type {
            Some(jt) if jt.eq_ignore_ascii_case(job_type) => {}
            _ => return false,
        }
    }
    if let Some(level) = &params.experience_level {
        match &job.experience_level {
            Some(el) if el.to_lowercase().starts_with(&level.to_lowercase()) => {}
            _ => return false,
        }
    }
    if params.remote == Some(true) && !job.is_remote {
        return false;
    }
    if let Some(min) = params.salary_min
        && job.salary_min.is_some_and(|v| v < min)
    {
        return false;
    }
    if let Some(max) = params.salary_max
        && job.salary_max.is_some_and(|v| v > max)
    {
        return false;
    }
    if let Some(sector) = &params.sector {
        match &job.sector {
            Some(s) if s.eq_ignore_ascii_case(sector) => {}
            _ => return false,
        }
    }
    if let Some(cutoff) = posted_after
        && job.posted_at.unwrap_or(job.created_at) < cutoff
    {
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use reqwest::StatusCode;

    use crate::models::canonical::{JobSource, composite_id};
    use crate::providers::ProviderError;
    use crate::search::SearchQuery;

    enum StubResult {
        Jobs(Vec<CanonicalJob>),
        Fail,
        Hang,
    }

    struct Stub {
        kind: JobSource,
        configured: bool,
        result: StubResult,
    }

    #[async_trait]
    impl JobProvider for Stub {
        fn kind(&self) -> JobSource {
            self.kind
        }

        fn is_configured(&self) -> bool {
            self.configured
        }

        async fn fetch(&self, _params: &SearchParams) -> Result<Vec<CanonicalJob>, ProviderError> {
            match &self.result {
                StubResult::Jobs(jobs) => Ok(jobs.clone()),
                StubResult::Fail => Err(ProviderError::Status(StatusCode::BAD_GATEWAY)),
                StubResult::Hang => {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    Ok(Vec::new())
                }
            }
        }
    }

    fn stub(kind: JobSource, result: StubResult) -> Arc<dyn JobProvider> {
        Arc::new(Stub {
            kind,
            configured: true,
            result,
        })
    }

    fn job(source: JobSource, source_id: &str, title: &str) -> CanonicalJob {
        CanonicalJob {
            id: composite_id(source, source_id),
            source,
            source_id: Some(source_id.to_string()),
            title: title.to_string(),
            company: "Acme".to_string(),
            company_logo: None,
            location: "Mumbai, India".to_string(),
            country: "IN".to_string(),
            description: "Building things.".to_string(),
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
            is_external: source.is_external(),
            apply_url: None,
            source_url: None,
            posted_at: None,
            created_at: Utc::now(),
        }
    }

    fn params(q: &str) -> SearchParams {
        SearchParams::from_query(
            SearchQuery {
                query: Some(q.to_string()),
                ..SearchQuery::default()
            },
            "India",
        )
        .unwrap()
    }

    fn outcome(name: &'static str, state: FetchState, jobs: Vec<CanonicalJob>) -> ProviderOutcome {
        ProviderOutcome {
            name,
            configured: !matches!(state, FetchState::Disabled),
            state,
            jobs,
        }
    }

    #[tokio::test]
    async fn partial_failure_keeps_the_succeeding_providers() {
        let providers = vec![
            stub(
                JobSource::Adzuna,
                StubResult::Jobs(vec![job(JobSource::Adzuna, "a1", "Backend Engineer")]),
            ),
            stub(JobSource::Jsearch, StubResult::Fail),
            Arc::new(Stub {
                kind: JobSource::Reed,
                configured: false,
                result: StubResult::Jobs(Vec::new()),
            }) as Arc<dyn JobProvider>,
        ];

        let outcomes = fetch_providers(&providers, &params("engineer"), Duration::from_secs(5)).await;
        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes[0].state, FetchState::Ok);
        assert_eq!(outcomes[0].jobs.len(), 1);
        assert_eq!(outcomes[1].state, FetchState::Error);
        assert!(outcomes[1].jobs.is_empty());
        assert_eq!(outcomes[2].state, FetchState::Disabled);
        assert!(!outcomes[2].configured);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_provider_resolves_to_timeout_not_error() {
        let providers = vec![
            stub(JobSource::Serpapi, StubResult::Hang),
            stub(
                JobSource::Adzuna,
                StubResult::Jobs(vec![job(JobSource::Adzuna, "a1", "Fast")]),
            ),
        ];

        let outcomes =
            fetch_providers(&providers, &params("engineer"), Duration::from_millis(200)).await;
        assert_eq!(outcomes[0].state, FetchState::Timeout);
        assert!(outcomes[0].jobs.is_empty());
        assert_eq!(outcomes[1].state, FetchState::Ok);
    }

    #[test]
    fn cached_local_copy_wins_over_the_live_provider_copy() {
        let cached = job(JobSource::Adzuna, "123", "Cached Title");
        let live = job(JobSource::Adzuna, "123", "Live Title");
        let fresh = job(JobSource::Adzuna, "456", "Fresh");

        let (jobs, status) = merge(
            vec![cached],
            vec![outcome("adzuna", FetchState::Ok, vec![live, fresh])],
            &params("title"),
            None,
        );

        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].title, "Cached Title");
        assert_eq!(jobs[1].title, "Fresh");
        assert_eq!(status[0].jobs, 1);
    }

    #[test]
    fn merged_set_never_repeats_a_source_id_pair() {
        let (jobs, _) = merge(
            vec![job(JobSource::Manual, "ignored", "Local")],
            vec![
                outcome(
                    "jsearch",
                    FetchState::Ok,
                    vec![
                        job(JobSource::Jsearch, "x", "One"),
                        job(JobSource::Jsearch, "x", "One Again"),
                    ],
                ),
                outcome(
                    "reed",
                    FetchState::Ok,
                    vec![job(JobSource::Reed, "x", "Different Source Same Id")],
                ),
            ],
            &params("one"),
            None,
        );

        let mut keys: Vec<String> = jobs.iter().map(|j| j.fingerprint()).collect();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), jobs.len());
        assert_eq!(jobs.len(), 3);
    }

    #[test]
    fn structured_filters_apply_to_external_results() {
        let mut p = params("engineer");
        p.salary_min = Some(50_000);

        let mut below = job(JobSource::Reed, "1", "Underpaid");
        below.salary_min = Some(30_000);
        let mut above = job(JobSource::Reed, "2", "Well Paid");
        above.salary_min = Some(90_000);
        let undisclosed = job(JobSource::Reed, "3", "Undisclosed");

        let (jobs, status) = merge(
            Vec::new(),
            vec![outcome("reed", FetchState::Ok, vec![below, above, undisclosed])],
            &p,
            None,
        );

        let titles: Vec<&str> = jobs.iter().map(|j| j.title.as_str()).collect();
        assert_eq!(titles, vec!["Well Paid", "Undisclosed"]);
        assert_eq!(status[0].jobs, 2);
    }

    #[test]
    fn job_type_filter_requires_a_matching_value() {
        let mut p = params("engineer");
        p.job_type = Some("full-time".to_string());

        let mut matching = job(JobSource::Serpapi, "1", "Matching");
        matching.job_type = Some("Full-time".to_string());
        let mut other = job(JobSource::Serpapi, "2", "Contract");
        other.job_type = Some("Contract".to_string());
        let missing = job(JobSource::Serpapi, "3", "Unknown");

        let (jobs, _) = merge(
            Vec::new(),
            vec![outcome("serpapi", FetchState::Ok, vec![matching, other, missing])],
            &p,
            None,
        );

        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].title, "Matching");
    }

    #[test]
    fn experience_filter_matches_by_prefix() {
        let mut p = params("engineer");
        p.experience_level = Some("mid".to_string());

        // enrichment infers "mid level" from the empty description
        let inferred = job(JobSource::Adzuna, "1", "Engineer");
        let mut senior = job(JobSource::Adzuna, "2", "Senior Engineer");
        senior.experience_level = Some("senior".to_string());

        let (jobs, _) = merge(
            Vec::new(),
            vec![outcome("adzuna", FetchState::Ok, vec![inferred, senior])],
            &p,
            None,
        );

        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].title, "Engineer");
        assert_eq!(jobs[0].experience_level.as_deref(), Some("mid level"));
    }

    #[test]
    fn blended_page_counts_local_total_plus_unique_externals() {
        let p = params("software engineer");
        let local = vec![
            job(JobSource::Manual, "l1", "Local One"),
            job(JobSource::Manual, "l2", "Local Two"),
            job(JobSource::Manual, "l3", "Local Three"),
        ];
        let outcomes = vec![
            outcome(
                "adzuna",
                FetchState::Ok,
                vec![
                    job(JobSource::Adzuna, "a1", "Adzuna One"),
                    job(JobSource::Adzuna, "a2", "Adzuna Two"),
                ],
            ),
            outcome("reed", FetchState::Timeout, Vec::new()),
        ];

        let resp = assemble(local, 3, FetchState::Ok, outcomes, &p, None, 12).unwrap();
        assert!(resp.success);
        assert_eq!(resp.total, 5);
        assert_eq!(resp.jobs.len(), 5);
        assert_eq!(resp.total_pages, 1);
        assert!(!resp.has_more);
        assert_eq!(resp.meta.source, "aggregated");
        assert_eq!(resp.meta.api_status.len(), 3);
        assert_eq!(resp.meta.api_status[0].provider, "local");
        assert_eq!(resp.meta.api_status[2].state, FetchState::Timeout);
    }

    #[test]
    fn page_is_capped_at_the_requested_limit() {
        let mut p = params("engineer");
        p.limit = 2;

        let externals: Vec<CanonicalJob> = (0..5)
            .map(|i| job(JobSource::Jsearch, &format!("j{i}"), "Job"))
            .collect();
        let resp = assemble(
            Vec::new(),
            0,
            FetchState::Empty,
            vec![outcome("jsearch", FetchState::Ok, externals)],
            &p,
            None,
            3,
        )
        .unwrap();

        assert_eq!(resp.jobs.len(), 2);
        assert_eq!(resp.total, 5);
        assert_eq!(resp.total_pages, 3);
        assert!(resp.has_more);
    }

    #[test]
    fn empty_merge_returns_not_found_with_a_fallback_link() {
        let p = params("underwater basket weaver");
        let err = assemble(
            Vec::new(),
            0,
            FetchState::Empty,
            vec![outcome("adzuna", FetchState::Empty, Vec::new())],
            &p,
            None,
            1,
        )
        .unwrap_err();

        match err {
            AppError::NoResults { fallback, .. } => {
                assert!(fallback.url.contains("underwater%20basket%20weaver"));
                assert!(fallback.url.contains("ibp=htl;jobs"));
            }
            other => panic!("expected NoResults, got {other:?}"),
        }
    }

    #[test]
    fn total_failure_of_every_source_is_a_search_error() {
        let p = params("engineer");
        let err = assemble(
            Vec::new(),
            0,
            FetchState::Error,
            vec![
                outcome("adzuna", FetchState::Timeout, Vec::new()),
                outcome("reed", FetchState::Error, Vec::new()),
                outcome("serpapi", FetchState::Disabled, Vec::new()),
            ],
            &p,
            None,
            1,
        )
        .unwrap_err();

        match err {
            AppError::SearchFailed { api_status, .. } => {
                assert_eq!(api_status.len(), 4);
            }
            other => panic!("expected SearchFailed, got {other:?}"),
        }
    }

    #[test]
    fn one_healthy_source_prevents_the_search_error() {
        let p = params("engineer");
        let resp = assemble(
            vec![job(JobSource::Manual, "1", "Local")],
            1,
            FetchState::Ok,
            vec![
                outcome("adzuna", FetchState::Error, Vec::new()),
                outcome("reed", FetchState::Timeout, Vec::new()),
            ],
            &p,
            None,
            1,
        )
        .unwrap();
        assert_eq!(resp.jobs.len(), 1);
    }
}
