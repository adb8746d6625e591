// src/handlers/images.rs

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
    db::CatalogStore,
    models::image::ImageInput,
};

pub async fn list_images<S: CatalogStore>(
    State(app_state): State<AppState<S>>,
    Path(product_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let images = app_state.image_service.list_images(product_id).await?;
    Ok(Json(images))
}

pub async fn add_image<S: CatalogStore>(
    State(app_state): State<AppState<S>>,
    Json(payload): Json<ImageInput>,
) -> Result<impl IntoResponse, AppError> {
    let image = app_state.image_service.add_image(payload).await?;
    Ok((StatusCode::CREATED, Json(image)))
}

pub async fn update_image<S: CatalogStore>(
    State(app_state): State<AppState<S>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ImageInput>,
) -> Result<impl IntoResponse, AppError> {
    let image = app_state.image_service.update_image(id, payload).await?;
    Ok(Json(image))
}

pub async fn delete_image<S: CatalogStore>(
    State(app_state): State<AppState<S>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    app_state.image_service.delete_image(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
