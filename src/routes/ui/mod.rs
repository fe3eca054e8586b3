use axum::Router;
use axum::response::Html;
use axum::routing::get;

pub fn router() -> Router {
    Router::new().route("/", get(index))
}

async fn index() -> Html<&'static str> {
    Html(
        r#"<!DOCTYPE html>
<html lang="en" class="dark">
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>JobHub</title>
    <style>
        body { font-family: system-ui; background: #1a1a2e; color: #e0e0e0; margin: 2rem; }
        h1 { color: #6366f1; }
        a { color: #818cf8; }
        .card { background: #16213e; padding: 1.5rem; border-radius: 0.5rem; margin: 1rem 0; }
        code { background: #0f1630; padding: 0.1rem 0.3rem; border-radius: 0.25rem; }
    </style>
</head>
<body>
    <h1>JobHub</h1>
    <div class="card">
        <p>Unified job search API is running.</p>
        <p>Search: <a href="/api/jobs?query=rust%20developer">/api/jobs?query=rust developer</a></p>
        <p>Detail: <code>/api/jobs/{id}</code> &mdash; composite <code>ext-*</code> ids or local keys</p>
        <p>Stats: <a href="/api/jobs/stats">/api/jobs/stats</a> | Providers: <a href="/api/providers">/api/providers</a></p>
        <p>Health: <a href="/healthz">/healthz</a> | <a href="/readyz">/readyz</a></p>
    </div>
</body>
</html>"#,
    )
}
