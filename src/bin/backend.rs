use std::{net::SocketAddr, sync::Arc};

use anyhow::{Context, Result};
use axum::{
    Json, Router,
    extract::{Path as AxumPath, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use listtube::{
    aggregate::Aggregator,
    config::load_runtime_config,
    lists::{ListQuery, ListStore, ListSummary},
    logging,
    records::{ChannelMeta, VideoRecord},
    search::ChannelSearch,
    service::Services,
    youtube::SourceError,
};
use serde::{Deserialize, Serialize};
use tokio::{signal, task};
use tracing::{error, info, warn};

#[derive(Clone)]
struct AppState {
    lists: ListStore,
    aggregator: Arc<Aggregator>,
    search: Arc<ChannelSearch>,
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }

    fn bad_gateway(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_GATEWAY,
            message: message.into(),
        }
    }
}

impl From<SourceError> for ApiError {
    fn from(err: SourceError) -> Self {
        warn!(error = %err, "content API request failed");
        Self::bad_gateway(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        let body = serde_json::json!({
            "error": self.message,
        });
        (self.status, headers, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

#[derive(Serialize)]
struct ListVideos {
    list: Option<ListSummary>,
    videos: Vec<VideoRecord>,
}

#[derive(Deserialize)]
struct SearchParams {
    q: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = load_runtime_config()?;
    logging::init(&cfg.log_filter);

    let services = Services::from_config(&cfg).context("initializing feed services")?;
    let state = AppState {
        lists: services.lists,
        aggregator: services.aggregator,
        search: services.search,
    };

    let app = Router::new()
        .route("/api/lists/{id}/videos", get(list_videos_by_id))
        .route(
            "/api/users/{username}/lists/{slug}/videos",
            get(list_videos_by_slug),
        )
        .route("/api/channels/{id}", get(get_channel))
        .route("/api/channels/{id}/videos", get(channel_videos))
        .route("/api/search/channels", get(search_channels))
        .with_state(state);

    let addr = SocketAddr::new(
        cfg.listtube_host
            .parse()
            .with_context(|| format!("parsing LISTTUBE_HOST {}", cfg.listtube_host))?,
        cfg.listtube_port,
    );
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding to {}", addr))?;
    info!(%addr, "API server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("running API server")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = signal::ctrl_c().await {
        error!(error = %err, "failed to install Ctrl+C handler");
    }
}

async fn list_videos_by_id(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> ApiResult<Json<ListVideos>> {
    let query = ListQuery {
        id: Some(id),
        ..Default::default()
    };
    state.list_videos(query).await.map(Json)
}

async fn list_videos_by_slug(
    State(state): State<AppState>,
    AxumPath((username, slug)): AxumPath<(String, String)>,
) -> ApiResult<Json<ListVideos>> {
    let query = ListQuery {
        username: Some(username),
        slug: Some(slug),
        ..Default::default()
    };
    state.list_videos(query).await.map(Json)
}

async fn channel_videos(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> ApiResult<Json<Vec<VideoRecord>>> {
    let aggregator = state.aggregator.clone();
    let videos = blocking(move || Ok(aggregator.get_videos(&[id]))).await?;
    Ok(Json(videos))
}

async fn get_channel(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> ApiResult<Json<ChannelMeta>> {
    let search = state.search.clone();
    let channel = blocking(move || search.get_channel(&id).map_err(ApiError::from)).await?;
    channel
        .map(Json)
        .ok_or_else(|| ApiError::not_found("channel not found"))
}

async fn search_channels(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Json<Vec<ChannelMeta>>> {
    let query = params
        .q
        .map(|q| q.trim().to_string())
        .filter(|q| !q.is_empty())
        .ok_or_else(|| ApiError::bad_request("missing search query"))?;
    let search = state.search.clone();
    let results =
        blocking(move || search.search_channels(&query).map_err(ApiError::from)).await?;
    Ok(Json(results))
}

impl AppState {
    async fn list_videos(&self, query: ListQuery) -> ApiResult<ListVideos> {
        let lists = self.lists.clone();
        let aggregator = self.aggregator.clone();
        blocking(move || {
            let resolved = lists
                .resolve(&query)
                .map_err(|err| ApiError::internal(format!("{err:#}")))?;
            let videos = aggregator.get_videos(&resolved.channel_ids);
            Ok(ListVideos {
                list: resolved.list,
                videos,
            })
        })
        .await
    }
}

/// Runs blocking core work (SQLite, HTTP to the content API) off the async
/// executor.
async fn blocking<T, F>(work: F) -> ApiResult<T>
where
    F: FnOnce() -> ApiResult<T> + Send + 'static,
    T: Send + 'static,
{
    task::spawn_blocking(work)
        .await
        .map_err(|err| ApiError::internal(format!("task join error: {err}")))?
}
