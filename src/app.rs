//! HTTP API.
//!
//! The router wires the request surface to the engine: plot data endpoints
//! run the generate → classify → filter → sample pipeline against the shared
//! dataset cache, and the cache management endpoints expose clear, status
//! and warm operations.

use crate::app_state::{AppState, SharedAppState};
use crate::assemble;
use crate::classify::Thresholds;
use crate::cli::CommandLineArgs;
use crate::dataset::{CacheKey, Dataset};
use crate::error::PlotServeError;
use crate::generate;
use crate::metrics;
use crate::models::{
    CacheStatusResponse, ClearCacheResponse, PcaPoint, PcaRequest, PlotResponse, VolcanoPoint,
    VolcanoRequest, WarmCacheResponse, WarmRequest,
};
use crate::pipeline::{self, Reduction, ReductionSpec};
use crate::validated_json::ValidatedJson;

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tower::{Layer, ServiceBuilder};
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};
use tower_http::trace::TraceLayer;
use validator::Validate;

/// The axum service type served by [crate::server::serve].
pub type Service = NormalizePath<Router>;

/// Returns the router wrapped in a trailing-slash normalization layer.
pub fn service(args: &CommandLineArgs) -> Service {
    NormalizePathLayer::trim_trailing_slash().layer(router(args))
}

/// Returns the application router.
pub fn router(args: &CommandLineArgs) -> Router {
    let state: SharedAppState = Arc::new(AppState::new(args));
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/metrics", get(metrics::metrics_handler))
        .route("/api/volcano-data", get(volcano_get).post(volcano_post))
        .route("/api/pca-data", get(pca_get).post(pca_post))
        .route("/api/cache/clear", post(cache_clear))
        .route("/api/cache/status", get(cache_status))
        .route("/api/cache/warm", post(cache_warm))
        .with_state(state)
        .layer(
            ServiceBuilder::new().layer(
                TraceLayer::new_for_http()
                    .on_request(metrics::request_counter)
                    .on_response(metrics::record_response_metrics),
            ),
        )
}

async fn root() -> Json<serde_json::Value> {
    Json(json!({
        "message": "Plotserve API",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "healthy" }))
}

/// Reject dataset sizes outside the configured bounds before any work
/// begins.
fn check_dataset_size(args: &CommandLineArgs, requested: u64) -> Result<(), PlotServeError> {
    if requested < args.min_dataset_size || requested > args.max_dataset_size {
        return Err(PlotServeError::SizeOutOfRange {
            requested,
            min: args.min_dataset_size,
            max: args.max_dataset_size,
        });
    }
    Ok(())
}

/// Reject size/group combinations flagged as unsafe by the cost guard.
fn check_generation_cost(
    args: &CommandLineArgs,
    size: u64,
    factor: u64,
) -> Result<(), PlotServeError> {
    let cost = size.saturating_mul(factor.max(1));
    if cost > args.generation_cost_limit {
        return Err(PlotServeError::ResourceExhausted {
            cost,
            limit: args.generation_cost_limit,
        });
    }
    Ok(())
}

/// Fetch the dataset for `key` from the cache, generating it off the async
/// runtime on a miss. Concurrent requests for the same key coalesce onto one
/// generation.
async fn fetch_dataset(
    state: &SharedAppState,
    key: CacheKey,
) -> Result<Arc<Dataset>, PlotServeError> {
    let use_rayon = state.args.use_rayon;
    let factory_key = key.clone();
    state
        .cache
        .get_or_create(key, move || async move {
            if use_rayon {
                Ok(tokio_rayon::spawn(move || generate::generate(&factory_key)).await)
            } else {
                tokio::task::spawn_blocking(move || generate::generate(&factory_key))
                    .await
                    .map_err(|err| PlotServeError::Generation {
                        detail: err.to_string(),
                    })
            }
        })
        .await
}

/// Run the reduction pipeline off the async runtime.
async fn run_reduction(
    state: &SharedAppState,
    dataset: Arc<Dataset>,
    spec: ReductionSpec,
) -> Result<Reduction, PlotServeError> {
    let config = state.lod_config();
    if state.args.use_rayon {
        Ok(tokio_rayon::spawn(move || pipeline::reduce(&dataset, &spec, &config)).await)
    } else {
        tokio::task::spawn_blocking(move || pipeline::reduce(&dataset, &spec, &config))
            .await
            .map_err(|err| PlotServeError::Generation {
                detail: err.to_string(),
            })
    }
}

async fn volcano_get(
    State(state): State<SharedAppState>,
    Query(request): Query<VolcanoRequest>,
) -> Result<Json<PlotResponse<VolcanoPoint>>, PlotServeError> {
    request.validate()?;
    volcano(state, request).await
}

async fn volcano_post(
    State(state): State<SharedAppState>,
    ValidatedJson(request): ValidatedJson<VolcanoRequest>,
) -> Result<Json<PlotResponse<VolcanoPoint>>, PlotServeError> {
    volcano(state, request).await
}

async fn volcano(
    state: SharedAppState,
    request: VolcanoRequest,
) -> Result<Json<PlotResponse<VolcanoPoint>>, PlotServeError> {
    check_dataset_size(&state.args, request.dataset_size)?;
    check_generation_cost(&state.args, request.dataset_size, 1)?;
    let _permit = state.resource_manager.task().await?;

    let seed = request.seed.unwrap_or(state.args.default_seed);
    let key = CacheKey::Volcano {
        size: request.dataset_size,
        seed,
    };
    let dataset = fetch_dataset(&state, key).await?;

    let spec = ReductionSpec {
        thresholds: Thresholds {
            significance: request.p_value_threshold,
            magnitude_min: request.log_fc_min,
            magnitude_max: request.log_fc_max,
        },
        search_term: request.search_term.clone(),
        viewport: request.viewport(),
        max_points: request.max_points,
        zoom_level: request.zoom_level,
    };
    let reduction = run_reduction(&state, Arc::clone(&dataset), spec).await?;
    let response = assemble::assemble(&dataset, &reduction, |row, category| {
        assemble::volcano_point(&dataset, row, category)
    });
    Ok(Json(response))
}

async fn pca_get(
    State(state): State<SharedAppState>,
    Query(request): Query<PcaRequest>,
) -> Result<Json<PlotResponse<PcaPoint>>, PlotServeError> {
    request.validate()?;
    pca(state, request).await
}

async fn pca_post(
    State(state): State<SharedAppState>,
    ValidatedJson(request): ValidatedJson<PcaRequest>,
) -> Result<Json<PlotResponse<PcaPoint>>, PlotServeError> {
    pca(state, request).await
}

async fn pca(
    state: SharedAppState,
    request: PcaRequest,
) -> Result<Json<PlotResponse<PcaPoint>>, PlotServeError> {
    check_dataset_size(&state.args, request.n_samples)?;
    check_generation_cost(&state.args, request.n_samples, u64::from(request.n_groups))?;
    let _permit = state.resource_manager.task().await?;

    let seed = request.seed.unwrap_or(state.args.default_seed);
    let key = CacheKey::Pca {
        samples: request.n_samples,
        groups: request.n_groups,
        seed,
    };
    let dataset = fetch_dataset(&state, key).await?;

    let spec = ReductionSpec {
        // Thresholds are inert for grouped datasets but keep the pipeline
        // uniform.
        thresholds: Thresholds::default(),
        search_term: request.search_term.clone(),
        viewport: request.viewport(),
        max_points: request.max_points,
        zoom_level: request.zoom_level,
    };
    let reduction = run_reduction(&state, Arc::clone(&dataset), spec).await?;
    let response = assemble::assemble(&dataset, &reduction, |row, category| {
        assemble::pca_point(row, category)
    });
    Ok(Json(response))
}

async fn cache_clear(State(state): State<SharedAppState>) -> Json<ClearCacheResponse> {
    Json(ClearCacheResponse {
        removed_count: state.cache.clear(),
    })
}

async fn cache_status(State(state): State<SharedAppState>) -> Json<CacheStatusResponse> {
    let status = state.cache.status();
    Json(CacheStatusResponse {
        cached_keys: status.keys,
        total_cached: status.total_entries,
        total_size_bytes_estimate: status.total_size_bytes_estimate,
    })
}

async fn cache_warm(
    State(state): State<SharedAppState>,
    ValidatedJson(request): ValidatedJson<WarmRequest>,
) -> Result<Json<WarmCacheResponse>, PlotServeError> {
    // Validate the whole batch before paying for any generation.
    for &size in &request.sizes {
        check_dataset_size(&state.args, size)?;
    }
    for &size in &request.sizes {
        let key = CacheKey::Volcano {
            size,
            seed: state.args.default_seed,
        };
        fetch_dataset(&state, key).await?;
    }
    Ok(Json(WarmCacheResponse {
        cached_sizes: request.sizes,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli;

    use axum::{
        body::Body,
        http::{self, Request, StatusCode},
        response::Response,
    };
    use serde::de::DeserializeOwned;
    use tower::ServiceExt; // for `oneshot` and `ready`

    fn test_router() -> Router {
        router(&cli::test_args())
    }

    async fn get(router: &Router, uri: &str) -> Response {
        router
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn post_json(router: &Router, uri: &str, body: &str) -> Response {
        router
            .clone()
            .oneshot(
                Request::builder()
                    .method(http::Method::POST)
                    .uri(uri)
                    .header(http::header::CONTENT_TYPE, mime::APPLICATION_JSON.as_ref())
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    async fn json_body<T: DeserializeOwned>(response: Response) -> T {
        let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_check() {
        let response = get(&test_router(), "/health").await;
        assert_eq!(StatusCode::OK, response.status());
        let body: serde_json::Value = json_body(response).await;
        assert_eq!("healthy", body["status"]);
    }

    #[tokio::test]
    async fn root_reports_version() {
        let response = get(&test_router(), "/").await;
        assert_eq!(StatusCode::OK, response.status());
        let body: serde_json::Value = json_body(response).await;
        assert_eq!(env!("CARGO_PKG_VERSION"), body["version"]);
    }

    #[tokio::test]
    async fn volcano_defaults_are_downsampled() {
        let response = get(&test_router(), "/api/volcano-data").await;
        assert_eq!(StatusCode::OK, response.status());
        let body: PlotResponse<VolcanoPoint> = json_body(response).await;
        assert_eq!(10_000, body.total_rows);
        assert_eq!(2000, body.returned_rows);
        assert_eq!(2000, body.rows.len());
        assert!(body.was_downsampled);
    }

    #[tokio::test]
    async fn volcano_small_dataset_returns_everything() {
        let response = get(
            &test_router(),
            "/api/volcano-data?dataset_size=1000&max_points=1000",
        )
        .await;
        assert_eq!(StatusCode::OK, response.status());
        let body: PlotResponse<VolcanoPoint> = json_body(response).await;
        assert_eq!(1000, body.returned_rows);
        assert!(!body.was_downsampled);
        let counted: u64 = body.category_counts.values().sum();
        assert_eq!(1000, counted);
    }

    #[tokio::test]
    async fn volcano_post_matches_get() {
        let router = test_router();
        let from_get = get(
            &router,
            "/api/volcano-data?dataset_size=1000&max_points=500&zoom_level=1.0",
        )
        .await;
        let from_post = post_json(
            &router,
            "/api/volcano-data",
            r#"{"dataset_size": 1000, "max_points": 500, "zoom_level": 1.0}"#,
        )
        .await;
        let get_body: PlotResponse<VolcanoPoint> = json_body(from_get).await;
        let post_body: PlotResponse<VolcanoPoint> = json_body(from_post).await;
        assert_eq!(get_body, post_body);
    }

    #[tokio::test]
    async fn volcano_rejects_undersized_dataset() {
        let response = get(&test_router(), "/api/volcano-data?dataset_size=50").await;
        assert_eq!(StatusCode::BAD_REQUEST, response.status());
    }

    #[tokio::test]
    async fn volcano_rejects_partial_viewport() {
        let response = get(&test_router(), "/api/volcano-data?x_min=-1.0&x_max=1.0").await;
        assert_eq!(StatusCode::BAD_REQUEST, response.status());
    }

    #[tokio::test]
    async fn volcano_search_term_filters_rows() {
        let response = get(
            &test_router(),
            "/api/volcano-data?dataset_size=1000&search_term=taurine",
        )
        .await;
        assert_eq!(StatusCode::OK, response.status());
        let body: PlotResponse<VolcanoPoint> = json_body(response).await;
        assert!(body.returned_rows >= 1);
        for point in &body.rows {
            assert!(point.gene.to_lowercase().contains("taurine"));
        }
    }

    #[tokio::test]
    async fn pca_returns_grouped_points() {
        let response = get(
            &test_router(),
            "/api/pca-data?n_samples=500&n_groups=4&max_points=500",
        )
        .await;
        assert_eq!(StatusCode::OK, response.status());
        let body: PlotResponse<PcaPoint> = json_body(response).await;
        assert_eq!(500, body.returned_rows);
        assert_eq!(4, body.category_counts.len());
        let counted: u64 = body.category_counts.values().sum();
        assert_eq!(500, counted);
    }

    #[tokio::test]
    async fn pca_rejects_costly_combination() {
        // 10M samples x 20 groups exceeds the default cost limit.
        let response = get(
            &test_router(),
            "/api/pca-data?n_samples=10000000&n_groups=20",
        )
        .await;
        assert_eq!(StatusCode::BAD_REQUEST, response.status());
    }

    #[tokio::test]
    async fn warm_clear_status_round_trip() {
        let router = test_router();

        let response = post_json(
            &router,
            "/api/cache/warm",
            r#"{"sizes": [1000, 2000, 3000]}"#,
        )
        .await;
        assert_eq!(StatusCode::OK, response.status());
        let body: WarmCacheResponse = json_body(response).await;
        assert_eq!(vec![1000, 2000, 3000], body.cached_sizes);

        let response = get(&router, "/api/cache/status").await;
        let body: CacheStatusResponse = json_body(response).await;
        assert_eq!(3, body.total_cached);
        assert!(body
            .cached_keys
            .iter()
            .any(|key| key.starts_with("volcano:1000:")));

        let response = post_json(&router, "/api/cache/clear", "{}").await;
        let body: ClearCacheResponse = json_body(response).await;
        assert_eq!(3, body.removed_count);

        let response = get(&router, "/api/cache/status").await;
        let body: CacheStatusResponse = json_body(response).await;
        assert_eq!(0, body.total_cached);
        assert!(body.cached_keys.is_empty());
    }

    #[tokio::test]
    async fn warm_rejects_invalid_size() {
        let response = post_json(&test_router(), "/api/cache/warm", r#"{"sizes": [10]}"#).await;
        assert_eq!(StatusCode::BAD_REQUEST, response.status());
    }

    #[tokio::test]
    async fn repeated_requests_hit_the_cache() {
        let router = test_router();
        let first = get(&router, "/api/volcano-data?dataset_size=1000").await;
        let second = get(&router, "/api/volcano-data?dataset_size=1000").await;
        let first: PlotResponse<VolcanoPoint> = json_body(first).await;
        let second: PlotResponse<VolcanoPoint> = json_body(second).await;
        // Same dataset, same deterministic sample.
        assert_eq!(first, second);

        let response = get(&router, "/api/cache/status").await;
        let body: CacheStatusResponse = json_body(response).await;
        assert_eq!(1, body.total_cached);
    }
}
