// src/handlers/catalog.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::AppState,
    db::{CatalogEntity, CatalogStore},
    models::catalog::{BrandInput, OptionGroupInput, OptionValueInput, TaxonomyInput},
};

// --- Taxonomia e grupos de valores ---

pub async fn create_family<S: CatalogStore>(
    State(app_state): State<AppState<S>>,
    Json(payload): Json<TaxonomyInput>,
) -> Result<impl IntoResponse, AppError> {
    let family = app_state.catalog_service.create_family(payload).await?;
    Ok((StatusCode::CREATED, Json(family)))
}

pub async fn create_category<S: CatalogStore>(
    State(app_state): State<AppState<S>>,
    Json(payload): Json<TaxonomyInput>,
) -> Result<impl IntoResponse, AppError> {
    let category = app_state.catalog_service.create_category(payload).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn create_subcategory<S: CatalogStore>(
    State(app_state): State<AppState<S>>,
    Json(payload): Json<TaxonomyInput>,
) -> Result<impl IntoResponse, AppError> {
    let subcategory = app_state.catalog_service.create_subcategory(payload).await?;
    Ok((StatusCode::CREATED, Json(subcategory)))
}

pub async fn create_brand<S: CatalogStore>(
    State(app_state): State<AppState<S>>,
    Json(payload): Json<BrandInput>,
) -> Result<impl IntoResponse, AppError> {
    let brand = app_state.catalog_service.create_brand(payload).await?;
    Ok((StatusCode::CREATED, Json(brand)))
}

pub async fn create_option_group<S: CatalogStore>(
    State(app_state): State<AppState<S>>,
    Json(payload): Json<OptionGroupInput>,
) -> Result<impl IntoResponse, AppError> {
    let group = app_state.catalog_service.create_option_group(payload).await?;
    Ok((StatusCode::CREATED, Json(group)))
}

pub async fn add_option_value<S: CatalogStore>(
    State(app_state): State<AppState<S>>,
    Path(group_id): Path<Uuid>,
    Json(payload): Json<OptionValueInput>,
) -> Result<impl IntoResponse, AppError> {
    let option = app_state
        .catalog_service
        .add_option_value(group_id, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(option)))
}

// --- Remoção protegida, para qualquer entidade do catálogo ---
// `entity` em kebab-case: family, category, option-group, special-feature...
pub async fn delete_entity<S: CatalogStore>(
    State(app_state): State<AppState<S>>,
    Path((entity, id)): Path<(CatalogEntity, Uuid)>,
) -> Result<impl IntoResponse, AppError> {
    app_state.catalog_service.delete_entity(entity, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
