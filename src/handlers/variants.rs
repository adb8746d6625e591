// src/handlers/variants.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::AppState,
    db::{CatalogEntity, CatalogStore},
    middleware::i18n::Locale,
    models::product::{RuleValueInput, ValueUpdateInput, VariantInput},
};

#[derive(Debug, Deserialize)]
pub struct PriceQuery {
    #[serde(default)]
    pub surcharge: bool,
}

pub async fn create_variant<S: CatalogStore>(
    State(app_state): State<AppState<S>>,
    Json(payload): Json<VariantInput>,
) -> Result<impl IntoResponse, AppError> {
    let variant = app_state.catalog_service.create_variant(payload).await?;
    Ok((StatusCode::CREATED, Json(variant)))
}

pub async fn update_variant<S: CatalogStore>(
    State(app_state): State<AppState<S>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<VariantInput>,
) -> Result<impl IntoResponse, AppError> {
    let variant = app_state.catalog_service.update_variant(id, payload).await?;
    Ok(Json(variant))
}

pub async fn get_variant<S: CatalogStore>(
    State(app_state): State<AppState<S>>,
    Locale(lang): Locale,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let view = app_state.catalog_service.describe_variant(id, lang).await?;
    Ok(Json(view))
}

pub async fn get_price<S: CatalogStore>(
    State(app_state): State<AppState<S>>,
    Path(id): Path<Uuid>,
    Query(query): Query<PriceQuery>,
) -> Result<impl IntoResponse, AppError> {
    let price = app_state
        .catalog_service
        .variant_price(id, query.surcharge)
        .await?;
    Ok(Json(price))
}

pub async fn add_attribute<S: CatalogStore>(
    State(app_state): State<AppState<S>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RuleValueInput>,
) -> Result<impl IntoResponse, AppError> {
    let (value, variant) = app_state.catalog_service.add_attribute_value(id, payload).await?;
    Ok((StatusCode::CREATED, Json(json!({ "value": value, "variant": variant }))))
}

pub async fn update_attribute<S: CatalogStore>(
    State(app_state): State<AppState<S>>,
    Path(value_id): Path<Uuid>,
    Json(payload): Json<ValueUpdateInput>,
) -> Result<impl IntoResponse, AppError> {
    let (value, variant) = app_state
        .catalog_service
        .update_attribute_value(value_id, payload)
        .await?;
    Ok(Json(json!({ "value": value, "variant": variant })))
}

pub async fn remove_attribute<S: CatalogStore>(
    State(app_state): State<AppState<S>>,
    Path(value_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let variant = app_state.catalog_service.remove_attribute_value(value_id).await?;
    Ok(Json(variant))
}

pub async fn get_stock<S: CatalogStore>(
    State(app_state): State<AppState<S>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let totals = app_state.stock_service.totals(id).await?;
    Ok(Json(json!({ "totals": totals, "available": totals.available() })))
}

pub async fn delete_variant<S: CatalogStore>(
    State(app_state): State<AppState<S>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    app_state
        .catalog_service
        .delete_entity(CatalogEntity::Variant, id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
