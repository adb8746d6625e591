// src/handlers/rules.rs

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
    models::rule::{RuleInput, RuleKind, RulePriceInput},
};

// Segmento da URL -> tipo de regra ("attributes", "features", "special-features").
fn parse_kind(segment: &str) -> Result<RuleKind, AppError> {
    match segment {
        "attributes" => Ok(RuleKind::Attribute),
        "features" => Ok(RuleKind::Feature),
        "special-features" => Ok(RuleKind::SpecialFeature),
        _ => Err(AppError::not_found("Tipo de regra")),
    }
}

pub async fn create_rule<S: CatalogStore>(
    State(app_state): State<AppState<S>>,
    Path(kind): Path<String>,
    Json(payload): Json<RuleInput>,
) -> Result<impl IntoResponse, AppError> {
    let kind = parse_kind(&kind)?;
    let rule = app_state.catalog_service.create_rule(kind, payload).await?;
    Ok((StatusCode::CREATED, Json(rule)))
}

pub async fn update_rule_price<S: CatalogStore>(
    State(app_state): State<AppState<S>>,
    Path((kind, id)): Path<(String, Uuid)>,
    Json(payload): Json<RulePriceInput>,
) -> Result<impl IntoResponse, AppError> {
    let kind = parse_kind(&kind)?;
    let (rule, report) = app_state
        .catalog_service
        .update_rule_price(kind, id, payload)
        .await?;
    Ok(Json(json!({ "rule": rule, "recalculation": report })))
}

pub async fn delete_rule<S: CatalogStore>(
    State(app_state): State<AppState<S>>,
    Path((kind, id)): Path<(String, Uuid)>,
) -> Result<impl IntoResponse, AppError> {
    let entity = match parse_kind(&kind)? {
        RuleKind::Attribute => CatalogEntity::Attribute,
        RuleKind::Feature => CatalogEntity::Feature,
        RuleKind::SpecialFeature => CatalogEntity::SpecialFeature,
    };
    app_state.catalog_service.delete_entity(entity, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
