//! Small in-memory order book so the demo server has real endpoints to
//! measure: successes, 4xx, handled 5xx and an outright panic.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::server::AppState;

use super::AppError;

// ─── Domain type ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: u64,
    pub item: String,
    pub quantity: u32,
    /// Price in cents (e.g. 12999 = $129.99)
    pub unit_price: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewOrder {
    pub item: String,
    pub quantity: u32,
    #[serde(default)]
    pub unit_price: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("ledger refused item '{0}'")]
    Refused(String),
}

#[derive(Debug, Default)]
pub struct OrderBook {
    next_id: AtomicU64,
    orders: RwLock<BTreeMap<u64, Order>>,
}

impl OrderBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, new: NewOrder) -> Result<Order, LedgerError> {
        if new.item.eq_ignore_ascii_case("contraband") {
            return Err(LedgerError::Refused(new.item));
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let order = Order {
            id,
            item: new.item,
            quantity: new.quantity,
            unit_price: new.unit_price,
        };
        self.orders.write().insert(id, order.clone());
        Ok(order)
    }

    pub fn get(&self, id: u64) -> Option<Order> {
        self.orders.read().get(&id).cloned()
    }

    pub fn list(&self) -> Vec<Order> {
        self.orders.read().values().cloned().collect()
    }
}

// ─── GET /api/orders ─────────────────────────────────────────────

pub async fn list_orders(State(state): State<Arc<AppState>>) -> Json<Vec<Order>> {
    Json(state.orders.list())
}

// ─── GET /api/orders/:id ─────────────────────────────────────────

pub async fn get_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<Order>, AppError> {
    state
        .orders
        .get(id)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("order '{id}' not found")))
}

// ─── POST /api/orders ────────────────────────────────────────────

pub async fn create_order(
    State(state): State<Arc<AppState>>,
    Json(new): Json<NewOrder>,
) -> Result<(StatusCode, Json<Order>), AppError> {
    if new.item.trim().is_empty() {
        return Err(AppError::BadRequest("item must not be empty".into()));
    }
    if new.quantity == 0 {
        return Err(AppError::BadRequest("quantity must be at least 1".into()));
    }

    let order = state
        .orders
        .insert(new)
        .map_err(|e| AppError::internal(&e))?;
    Ok((StatusCode::CREATED, Json(order)))
}

// ─── GET /api/faults/panic ───────────────────────────────────────

/// Always panics; shows how an unhandled fault is recorded.
pub async fn panic_fault() -> &'static str {
    panic!("demo fault: handler panicked on purpose")
}
