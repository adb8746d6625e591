// src/handlers/products.rs

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
    models::product::{ProductInput, ProductPricingInput, PromoteInput, RuleValueInput},
};

pub async fn create_product<S: CatalogStore>(
    State(app_state): State<AppState<S>>,
    Json(payload): Json<ProductInput>,
) -> Result<impl IntoResponse, AppError> {
    let product = app_state.catalog_service.create_product(payload).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn update_pricing<S: CatalogStore>(
    State(app_state): State<AppState<S>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ProductPricingInput>,
) -> Result<impl IntoResponse, AppError> {
    let (product, report) = app_state
        .catalog_service
        .update_product_pricing(id, payload)
        .await?;
    Ok(Json(json!({ "product": product, "recalculation": report })))
}

pub async fn promote<S: CatalogStore>(
    State(app_state): State<AppState<S>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<PromoteInput>,
) -> Result<impl IntoResponse, AppError> {
    let variant = app_state.catalog_service.promote_to_variant(id, payload).await?;
    Ok((StatusCode::CREATED, Json(variant)))
}

pub async fn set_feature<S: CatalogStore>(
    State(app_state): State<AppState<S>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RuleValueInput>,
) -> Result<impl IntoResponse, AppError> {
    let (value, report) = app_state.catalog_service.set_feature_value(id, payload).await?;
    Ok(Json(json!({ "value": value, "recalculation": report })))
}

pub async fn remove_feature<S: CatalogStore>(
    State(app_state): State<AppState<S>>,
    Path((id, feature_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, AppError> {
    let report = app_state
        .catalog_service
        .remove_feature_value(id, feature_id)
        .await?;
    Ok(Json(json!({ "recalculation": report })))
}

pub async fn delete_product<S: CatalogStore>(
    State(app_state): State<AppState<S>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    app_state
        .catalog_service
        .delete_entity(CatalogEntity::Product, id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
