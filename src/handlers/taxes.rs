// src/handlers/taxes.rs

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
    models::tax::TaxRateInput,
};

pub async fn create_tax<S: CatalogStore>(
    State(app_state): State<AppState<S>>,
    Json(payload): Json<TaxRateInput>,
) -> Result<impl IntoResponse, AppError> {
    let tax = app_state.catalog_service.create_tax(payload).await?;
    Ok((StatusCode::CREATED, Json(tax)))
}

pub async fn update_tax<S: CatalogStore>(
    State(app_state): State<AppState<S>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<TaxRateInput>,
) -> Result<impl IntoResponse, AppError> {
    let (tax, report) = app_state.catalog_service.update_tax(id, payload).await?;
    Ok(Json(json!({ "tax": tax, "recalculation": report })))
}

pub async fn delete_tax<S: CatalogStore>(
    State(app_state): State<AppState<S>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    app_state
        .catalog_service
        .delete_entity(CatalogEntity::Tax, id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
