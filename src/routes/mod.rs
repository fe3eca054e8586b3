pub mod api;
pub mod ui;

use std::sync::Arc;

use crate::search::aggregator::Aggregator;

/// Shared state for every handler. The aggregator owns the pool and the
/// provider registry; the default location backs searches that don't
/// supply one.
#[derive(Clone)]
pub struct AppState {
    pub aggregator: Arc<Aggregator>,
    pub default_location: String,
}
