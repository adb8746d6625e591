// src/handlers/stock.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::AppState,
    db::{CatalogEntity, CatalogStore},
    models::stock::{StockQuantityInput, StockUnitInput},
};

pub async fn create_unit<S: CatalogStore>(
    State(app_state): State<AppState<S>>,
    Json(payload): Json<StockUnitInput>,
) -> Result<impl IntoResponse, AppError> {
    let unit = app_state.stock_service.add_stock_unit(payload).await?;
    Ok((StatusCode::CREATED, Json(unit)))
}

pub async fn update_unit<S: CatalogStore>(
    State(app_state): State<AppState<S>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<StockUnitInput>,
) -> Result<impl IntoResponse, AppError> {
    let unit = app_state.stock_service.update_stock_unit(id, payload).await?;
    Ok(Json(unit))
}

pub async fn split_unit<S: CatalogStore>(
    State(app_state): State<AppState<S>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<StockQuantityInput>,
) -> Result<impl IntoResponse, AppError> {
    let (source, sibling) = app_state.stock_service.split(id, payload).await?;
    Ok((StatusCode::CREATED, Json(json!({ "source": source, "created": sibling }))))
}

pub async fn lock_unit<S: CatalogStore>(
    State(app_state): State<AppState<S>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<StockQuantityInput>,
) -> Result<impl IntoResponse, AppError> {
    let unit = app_state.stock_service.lock(id, payload).await?;
    Ok(Json(unit))
}

pub async fn consume_unit<S: CatalogStore>(
    State(app_state): State<AppState<S>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<StockQuantityInput>,
) -> Result<impl IntoResponse, AppError> {
    let unit = app_state.stock_service.consume(id, payload).await?;
    Ok(Json(unit))
}

pub async fn delete_unit<S: CatalogStore>(
    State(app_state): State<AppState<S>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    app_state
        .catalog_service
        .delete_entity(CatalogEntity::StockUnit, id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
