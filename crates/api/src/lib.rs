//! HTTP API server with observability for the order fulfillment system.
//!
//! Provides REST endpoints for order creation, order lookup, and inventory
//! provisioning, with structured logging (tracing) and Prometheus metrics.
//! The HTTP layer is thin glue: validation beyond field shapes, stock
//! checks, and all concurrency control live in the crates below it.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post, put};
use lock::InMemoryLockStore;
use metrics_exporter_prometheus::PrometheusHandle;
use orchestrator::{InMemoryTaskQueue, OrderService, ShardRouter, TracingEventPublisher};
use store::FulfillmentStore;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use worker::{OrderProcessor, WorkerConfig};

use routes::orders::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: FulfillmentStore + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/orders", post(routes::orders::create::<S>))
        .route("/orders/{id}", get(routes::orders::get::<S>))
        .route("/inventory/{product_id}", put(routes::inventory::upsert::<S>))
        .route("/inventory/{product_id}", get(routes::inventory::get::<S>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the default application state plus the worker-side pieces.
///
/// Returns the shared state for the router, the order processor, and the
/// queue both sides share — the caller decides whether (and how many)
/// worker runners to spawn over them.
#[allow(clippy::type_complexity)]
pub fn create_default_state<S: FulfillmentStore + Clone + 'static>(
    store: S,
    shard_count: u32,
) -> (
    Arc<AppState<S>>,
    Arc<OrderProcessor<S, InMemoryLockStore, TracingEventPublisher>>,
    InMemoryTaskQueue,
) {
    let queue = InMemoryTaskQueue::new();
    let events = TracingEventPublisher;

    let order_service = OrderService::new(
        store.clone(),
        queue.clone(),
        events,
        ShardRouter::new(shard_count),
    );

    let processor = Arc::new(OrderProcessor::new(
        store.clone(),
        InMemoryLockStore::new(),
        events,
        WorkerConfig::default(),
    ));

    let state = Arc::new(AppState {
        order_service,
        store,
    });

    (state, processor, queue)
}
