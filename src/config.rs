use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(name = "jobhub", about = "Job board portal with unified job search")]
pub struct Config {
    /// Database connection URL
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: String,

    /// Listen address
    #[arg(long, env = "LISTEN_ADDR", default_value = "0.0.0.0:8080")]
    pub listen_addr: String,

    /// Run database migrations on startup
    #[arg(long, env = "RUN_MIGRATIONS", default_value = "true")]
    pub run_migrations: bool,

    /// Adzuna application id
    #[arg(long, env = "ADZUNA_APP_ID")]
    pub adzuna_app_id: Option<String>,

    /// Adzuna application key
    #[arg(long, env = "ADZUNA_APP_KEY")]
    pub adzuna_app_key: Option<String>,

    /// Adzuna country code used in the search path (e.g. "in", "gb", "us")
    #[arg(long, env = "ADZUNA_COUNTRY", default_value = "in")]
    pub adzuna_country: String,

    /// RapidAPI key for the JSearch API
    #[arg(long, env = "RAPIDAPI_KEY")]
    pub rapidapi_key: Option<String>,

    /// Reed.co.uk API key
    #[arg(long, env = "REED_API_KEY")]
    pub reed_api_key: Option<String>,

    /// SerpApi key for the full-filter google_jobs adapter
    #[arg(long, env = "SERPAPI_KEY")]
    pub serpapi_key: Option<String>,

    /// Separate SerpApi key for the plain Google Jobs adapter
    #[arg(long, env = "GOOGLE_JOBS_API_KEY")]
    pub google_jobs_api_key: Option<String>,

    /// Per-provider request timeout in seconds
    #[arg(long, env = "PROVIDER_TIMEOUT_SECS", default_value = "10")]
    pub provider_timeout_secs: u64,

    /// Location used when a search does not specify one
    #[arg(long, env = "DEFAULT_LOCATION", default_value = "India")]
    pub default_location: String,
}
