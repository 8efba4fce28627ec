//! Basket command and totals endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use common::BasketId;
use domain::{
    AddItems, AdjustItemQuantity, BasketService, ItemToAdd, SetDiscountCode, SetShippingCost,
};
use event_store::EventStore;
use projections::ReadModelStore;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use totals::{BasketTotals, DiscountService, PriceService, TotalsService};

use crate::error::ApiError;

/// Totals service over type-erased collaborators.
pub type SharedTotalsService =
    TotalsService<Arc<dyn ReadModelStore>, Arc<dyn PriceService>, Arc<dyn DiscountService>>;

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub baskets: BasketService<Arc<dyn EventStore>>,
    pub totals: SharedTotalsService,
}

// -- Request types --

#[derive(Debug, Deserialize)]
pub struct AddItemsRequest {
    pub basket_id: String,
    pub items: Vec<ItemRequest>,
}

#[derive(Debug, Deserialize)]
pub struct ItemRequest {
    pub product_id: String,
    pub quantity: u32,
}

#[derive(Debug, Deserialize)]
pub struct AdjustQuantityRequest {
    pub basket_id: String,
    pub quantity_delta: i32,
}

#[derive(Debug, Deserialize)]
pub struct DiscountCodeRequest {
    pub basket_id: String,
    pub discount_code: String,
}

#[derive(Debug, Deserialize)]
pub struct ShippingCostRequest {
    pub basket_id: String,
    pub cost: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct TotalsQuery {
    pub basket_id: Option<String>,
    pub country_code: Option<String>,
}

// -- Response types --

#[derive(Debug, Serialize)]
pub struct CommandAccepted {
    pub basket_id: String,
    pub stream_version: i64,
}

// -- Handlers --

/// POST /basket/items: add items, creating the basket if needed.
#[tracing::instrument(skip(state, payload))]
pub async fn add_items(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<AddItemsRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CommandAccepted>), ApiError> {
    let Json(req) = payload?;
    let basket_id = require("basket_id", &req.basket_id)?;

    let items = req
        .items
        .into_iter()
        .map(|item| {
            require("product_id", &item.product_id)
                .map(|product_id| ItemToAdd::new(product_id, item.quantity))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let result = state
        .baskets
        .add_items(AddItems::new(basket_id.clone(), items))
        .await?;

    let response = CommandAccepted {
        basket_id,
        stream_version: result.new_version.as_i64(),
    };
    Ok((StatusCode::ACCEPTED, Json(response)))
}

/// PATCH /basket/items/{product_id}: change a line's quantity.
#[tracing::instrument(skip(state, payload))]
pub async fn adjust_item_quantity(
    State(state): State<Arc<AppState>>,
    Path(product_id): Path<String>,
    payload: Result<Json<AdjustQuantityRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(req) = payload?;
    let basket_id = require("basket_id", &req.basket_id)?;

    state
        .baskets
        .adjust_item_quantity(AdjustItemQuantity::new(
            basket_id,
            product_id,
            req.quantity_delta,
        ))
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// PUT /basket/discount-code: apply a discount code.
#[tracing::instrument(skip(state, payload))]
pub async fn set_discount_code(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<DiscountCodeRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(req) = payload?;
    let basket_id = require("basket_id", &req.basket_id)?;

    state
        .baskets
        .set_discount_code(SetDiscountCode::new(basket_id, req.discount_code))
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// PUT /basket/shipping/{country_code}: set the shipping cost for a country.
#[tracing::instrument(skip(state, payload))]
pub async fn set_shipping_cost(
    State(state): State<Arc<AppState>>,
    Path(country_code): Path<String>,
    payload: Result<Json<ShippingCostRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(req) = payload?;
    let basket_id = require("basket_id", &req.basket_id)?;

    state
        .baskets
        .set_shipping_cost(SetShippingCost::new(basket_id, country_code, req.cost))
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// GET /basket/totals: price the basket for a destination country.
#[tracing::instrument(skip(state, query))]
pub async fn totals(
    State(state): State<Arc<AppState>>,
    query: Result<Query<TotalsQuery>, QueryRejection>,
) -> Result<Json<BasketTotals>, ApiError> {
    let Query(query) = query?;
    let basket_id = require("basket_id", query.basket_id.as_deref().unwrap_or_default())?;
    let country_code = require(
        "country_code",
        query.country_code.as_deref().unwrap_or_default(),
    )?;

    let totals = state
        .totals
        .get_totals(&BasketId::new(basket_id), &country_code)
        .await?;

    Ok(Json(totals))
}

/// Rejects a blank required field.
fn require(field: &str, value: &str) -> Result<String, ApiError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ApiError::BadRequest(format!("{field} is required")));
    }
    Ok(value.to_string())
}
