pub mod jobs;
pub mod providers;

use axum::Router;
use axum::routing::get;

use crate::routes::AppState;

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        // Jobs
        .route("/jobs", get(jobs::search))
        .route("/jobs/stats", get(jobs::stats))
        .route(
            "/jobs/{id}",
            get(jobs::detail).options(jobs::detail_preflight),
        )
        // Providers
        .route("/providers", get(providers::list))
        .with_state(state);

    Router::new().nest("/api", api)
}
