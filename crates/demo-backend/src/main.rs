use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use clap::Parser;
use rand::Rng;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Serves `/v0/topstories.json` and `/v0/item/<id>.json` from generated data.
#[derive(Parser)]
#[command(name = "demo-backend")]
struct Args {
    #[arg(long, default_value = "0.0.0.0:4000")]
    listen_addr: String,

    /// Number of ids returned by topstories.json
    #[arg(long, default_value_t = 500)]
    num_items: u64,

    /// Upper bound of the simulated per-request latency
    #[arg(long, default_value_t = 20)]
    max_latency_ms: u64,

    /// Percentage of item requests answered with HTTP 500
    #[arg(long, default_value_t = 0)]
    error_rate: u8,
}

struct Backend {
    first_id: u64,
    num_items: u64,
    max_latency_ms: u64,
    error_rate: u8,
}

const FIRST_ID: u64 = 40_000_000;
const EPOCH: i64 = 1_700_000_000;

impl Backend {
    fn top_ids(&self) -> Vec<u64> {
        // Newest ids rank highest, like the real front page mostly does.
        (self.first_id..self.first_id + self.num_items).rev().collect()
    }

    fn contains(&self, id: u64) -> bool {
        (self.first_id..self.first_id + self.num_items).contains(&id)
    }

    async fn simulate_latency(&self) {
        if self.max_latency_ms == 0 {
            return;
        }
        let delay = rand::thread_rng().gen_range(self.max_latency_ms / 4..=self.max_latency_ms);
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }
}

/// Deterministic item for `id`. Mixes the shapes the real API returns: link
/// stories, text-only stories, jobs and comments.
fn generate_item(id: u64) -> Value {
    let time = EPOCH + (id % 86_400) as i64;
    let score = (id * 37 % 900) as i64 + 1;
    let by = format!("user{}", id % 97);

    if id % 10 == 0 {
        json!({
            "by": by, "id": id, "score": score, "time": time, "type": "job",
            "title": format!("Startup {id} is hiring"),
            "url": format!("https://jobs.example.com/{id}"),
        })
    } else if id % 13 == 0 {
        json!({
            "by": by, "id": id, "time": time, "type": "comment",
            "parent": id - 1, "text": "I disagree.",
        })
    } else if id % 7 == 0 {
        json!({
            "by": by, "id": id, "score": score, "time": time, "type": "story",
            "title": format!("Ask HN: question {id}?"),
            "text": "What do you all think?",
            "descendants": id % 50, "kids": [id + 1, id + 2],
        })
    } else {
        json!({
            "by": by, "id": id, "score": score, "time": time, "type": "story",
            "title": format!("Show HN: project number {id}"),
            "url": format!("https://www.example{}.com/posts/{id}", id % 5),
            "descendants": id % 120, "kids": [id + 3],
        })
    }
}

async fn top_stories(State(backend): State<Arc<Backend>>) -> Json<Vec<u64>> {
    backend.simulate_latency().await;
    Json(backend.top_ids())
}

async fn get_item(
    State(backend): State<Arc<Backend>>,
    Path(file): Path<String>,
) -> Result<Json<Value>, StatusCode> {
    let id: u64 = file
        .strip_suffix(".json")
        .and_then(|s| s.parse().ok())
        .ok_or(StatusCode::NOT_FOUND)?;

    backend.simulate_latency().await;

    if backend.error_rate > 0 && rand::thread_rng().gen_range(0..100) < backend.error_rate {
        tracing::debug!(id, "injecting error");
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }

    // Unknown ids answer `null`, as upstream does.
    if !backend.contains(id) {
        return Ok(Json(Value::Null));
    }
    Ok(Json(generate_item(id)))
}

async fn health() -> &'static str {
    "ok"
}

fn app(backend: Arc<Backend>) -> Router {
    Router::new()
        .route("/v0/topstories.json", get(top_stories))
        .route("/v0/item/{file}", get(get_item))
        .route("/health", get(health))
        .with_state(backend)
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let backend = Arc::new(Backend {
        first_id: FIRST_ID,
        num_items: args.num_items,
        max_latency_ms: args.max_latency_ms,
        error_rate: args.error_rate.min(100),
    });

    tracing::info!(
        addr = %args.listen_addr,
        num_items = args.num_items,
        max_latency_ms = args.max_latency_ms,
        error_rate = args.error_rate,
        "demo backend starting"
    );

    let listener = tokio::net::TcpListener::bind(&args.listen_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind to {}: {e}", args.listen_addr));
    if let Err(e) = axum::serve(listener, app(backend)).await {
        tracing::error!(error = %e, "demo backend error");
    }
}
