use crate::dispatcher::Dispatcher;
use crate::error::FetchError;
use crate::fetcher::Fetcher;
use crate::item::Item;
use crate::stats::stats_handler;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use html_escape::{encode_double_quoted_attribute, encode_text};
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::trace::TraceLayer;

/// Upper bound on `count` accepted by the JSON endpoint.
pub const MAX_STORIES: usize = 500;

/// Shared application state passed to all handlers.
pub struct AppState<F> {
    pub dispatcher: Dispatcher<F>,
    pub num_stories: usize,
}

pub fn router<F: Fetcher>(state: Arc<AppState<F>>) -> Router {
    Router::new()
        .route("/", get(index_handler::<F>))
        .route("/api/stories", get(stories_handler::<F>))
        .route("/api/stats", get(stats_handler::<F>))
        .route("/health", get(|| async { "ok" }))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// An item as presented, with its display host.
#[derive(Debug, Serialize)]
pub struct StoryView<'a> {
    #[serde(flatten)]
    pub item: &'a Item,
    pub host: Option<String>,
}

impl<'a> From<&'a Item> for StoryView<'a> {
    fn from(item: &'a Item) -> Self {
        Self {
            host: item.host(),
            item,
        }
    }
}

#[derive(Serialize)]
struct StoriesResponse<'a> {
    stories: Vec<StoryView<'a>>,
    elapsed_ms: u64,
}

#[derive(Debug, Deserialize)]
pub struct StoriesQuery {
    pub count: Option<usize>,
}

async fn timed_fill<F: Fetcher>(
    state: &AppState<F>,
    count: usize,
) -> Result<(Vec<Item>, Duration), FetchError> {
    let start = Instant::now();
    let stories = state.dispatcher.fill(count).await?;
    Ok((stories, start.elapsed()))
}

/// GET /: the front page as HTML.
pub async fn index_handler<F: Fetcher>(State(state): State<Arc<AppState<F>>>) -> Response {
    match timed_fill(&state, state.num_stories).await {
        Ok((stories, elapsed)) => Html(render_page(&stories, elapsed)).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "front page fill failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to load top stories").into_response()
        }
    }
}

/// GET /api/stories?count=N: the same list as JSON.
pub async fn stories_handler<F: Fetcher>(
    State(state): State<Arc<AppState<F>>>,
    Query(query): Query<StoriesQuery>,
) -> Response {
    let count = query.count.unwrap_or(state.num_stories).min(MAX_STORIES);

    match timed_fill(&state, count).await {
        Ok((stories, elapsed)) => Json(StoriesResponse {
            stories: stories.iter().map(StoryView::from).collect(),
            elapsed_ms: elapsed.as_millis() as u64,
        })
        .into_response(),
        Err(e) => {
            tracing::error!(error = %e, count, "api fill failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    }
}

fn render_page(stories: &[Item], elapsed: Duration) -> String {
    let mut html = String::from(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n\
         <title>Quiet Hacker News</title>\n</head>\n<body>\n\
         <h1>Quiet Hacker News</h1>\n<ol>\n",
    );

    for item in stories {
        let url = item.url.as_deref().unwrap_or_default();
        let _ = write!(
            html,
            "<li><a href=\"{}\">{}</a>",
            encode_double_quoted_attribute(url),
            encode_text(&item.title),
        );
        if let Some(host) = item.host() {
            let _ = write!(html, " <span class=\"host\">({})</span>", encode_text(&host));
        }
        let _ = writeln!(
            html,
            "<br><small>{} points by {} | {} comments</small></li>",
            item.score,
            encode_text(&item.by),
            item.descendants,
        );
    }

    let _ = write!(
        html,
        "</ol>\n<p><small>This page was rendered in {:?}</small></p>\n</body>\n</html>\n",
        elapsed
    );
    html
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RemoteError;
    use crate::id_cache::IdListCache;
    use crate::item::ItemKind;
    use crate::item_cache::ItemCache;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tower::ServiceExt;

    struct StaticUpstream {
        down: AtomicBool,
    }

    impl Fetcher for StaticUpstream {
        async fn top_ids(&self) -> Result<Vec<u64>, RemoteError> {
            if self.down.load(Ordering::SeqCst) {
                return Err(RemoteError::Status {
                    url: "fake://topstories.json".into(),
                    status: 502,
                });
            }
            Ok(vec![10, 11, 12, 13])
        }

        async fn item(&self, id: u64) -> Result<Item, RemoteError> {
            let kind = if id == 11 { ItemKind::Job } else { ItemKind::Story };
            Ok(Item {
                title: format!("Story <{id}>"),
                by: "pg".into(),
                score: id as i64,
                url: Some(format!("https://www.example.com/{id}?a=1&b=2")),
                ..Item::new(id, kind)
            })
        }
    }

    fn app(down: bool) -> Router {
        let dispatcher = Dispatcher::new(
            StaticUpstream {
                down: AtomicBool::new(down),
            },
            Arc::new(ItemCache::new(16)),
            Arc::new(IdListCache::new(Duration::from_secs(10), Duration::from_secs(5))),
        )
        .with_width(2);
        router(Arc::new(AppState {
            dispatcher,
            num_stories: 2,
        }))
    }

    async fn get_body(app: Router, uri: &str) -> (StatusCode, String) {
        let resp = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn front_page_lists_escaped_stories() {
        let (status, body) = get_body(app(false), "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Story &lt;10&gt;"));
        assert!(body.contains("Story &lt;12&gt;"));
        assert!(!body.contains("Story &lt;11&gt;"));
        assert!(!body.contains("Story &lt;13&gt;"));
        assert!(body.contains("href=\"https://www.example.com/10?a=1&amp;b=2\""));
        assert!(body.contains("(example.com)"));
        assert!(body.contains("rendered in"));
    }

    #[tokio::test]
    async fn front_page_reports_upstream_failure() {
        let (status, body) = get_body(app(true), "/").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, "Failed to load top stories");
    }

    #[tokio::test]
    async fn api_returns_requested_count() {
        let (status, body) = get_body(app(false), "/api/stories?count=3").await;
        assert_eq!(status, StatusCode::OK);

        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        let stories = json["stories"].as_array().unwrap();
        let ids: Vec<u64> = stories.iter().map(|s| s["id"].as_u64().unwrap()).collect();
        assert_eq!(ids, vec![10, 12, 13]);
        assert_eq!(stories[0]["host"], "example.com");
        assert_eq!(stories[1]["position"], 2);
        assert!(json["elapsed_ms"].is_u64());
    }

    #[tokio::test]
    async fn api_defaults_to_front_page_size() {
        let (_, body) = get_body(app(false), "/api/stories").await;
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["stories"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn api_failure_is_json_error() {
        let (status, body) = get_body(app(true), "/api/stories").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert!(json["error"].as_str().unwrap().contains("top story ids"));
    }

    #[tokio::test]
    async fn stats_reflect_cache_use() {
        let app = app(false);
        get_body(app.clone(), "/").await;
        get_body(app.clone(), "/").await;

        let (status, body) = get_body(app, "/api/stats").await;
        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["item_cache"]["misses"], 4);
        assert_eq!(json["item_cache"]["hits"], 4);
        assert_eq!(json["item_cache"]["size"], 4);
        assert_eq!(json["top_ids_cached"], 4);
        assert_eq!(json["max_concurrent"], 2);
    }

    #[tokio::test]
    async fn health_is_ok() {
        let (status, body) = get_body(app(false), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "ok");
    }
}
