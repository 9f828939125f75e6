//! Inventory provisioning endpoints.
//!
//! This is the operational seam for stocking products. Order processing
//! never goes through here — stock only leaves through the ledger's
//! conditional decrements.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use common::ProductId;
use serde::{Deserialize, Serialize};
use store::{FulfillmentStore, InventoryRecord};

use crate::error::ApiError;
use crate::routes::orders::AppState;

#[derive(Debug, Deserialize)]
pub struct UpsertInventoryRequest {
    pub quantity: u32,
}

#[derive(Serialize)]
pub struct InventoryResponse {
    pub product_id: String,
    pub quantity: u32,
    pub version: i64,
}

impl From<&InventoryRecord> for InventoryResponse {
    fn from(record: &InventoryRecord) -> Self {
        Self {
            product_id: record.product_id.to_string(),
            quantity: record.quantity,
            version: record.version.as_i64(),
        }
    }
}

/// PUT /inventory/{product_id} — set a product's stock level.
///
/// A new product starts at version 1; restocking an existing product keeps
/// its version so in-flight version snapshots stay meaningful.
#[tracing::instrument(skip(state))]
pub async fn upsert<S: FulfillmentStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(product_id): Path<String>,
    Json(req): Json<UpsertInventoryRequest>,
) -> Result<Json<InventoryResponse>, ApiError> {
    let product_id = ProductId::new(product_id);

    let record = match state.store.get_record(&product_id).await? {
        Some(existing) => InventoryRecord {
            quantity: req.quantity,
            ..existing
        },
        None => InventoryRecord::new(product_id, req.quantity),
    };

    state.store.upsert_record(record.clone()).await?;

    Ok(Json(InventoryResponse::from(&record)))
}

/// GET /inventory/{product_id} — fetch a product's stock record.
#[tracing::instrument(skip(state))]
pub async fn get<S: FulfillmentStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(product_id): Path<String>,
) -> Result<Json<InventoryResponse>, ApiError> {
    let record = state
        .store
        .get_record(&ProductId::new(product_id.clone()))
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Product not stocked: {product_id}")))?;

    Ok(Json(InventoryResponse::from(&record)))
}
