// src/models/stock.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::models::{validate_not_negative, validate_positive};

// --- Unidade física de stock de uma variante ---
// `stock_real` e `stock_locked` são mantidos pelo sistema; o utilizador só
// informa `stock_original`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UniqueStockUnit {
    pub id: Uuid,
    pub variant_id: Uuid,
    /// Produto dono da variante (desnormalizado para o índice único).
    pub product_id: Uuid,
    /// Caixa do módulo de armazém; aqui só guardamos a referência.
    pub box_id: Uuid,
    pub value: Option<String>,
    /// Igual a `value` quando a característica especial é única; NULL caso
    /// contrário. O índice único (product_id, unique_value) vive na base.
    #[serde(skip)]
    pub unique_value: Option<String>,
    pub caducity: Option<NaiveDate>,
    pub stock_original: Decimal,
    pub stock_real: Decimal,
    pub stock_locked: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UniqueStockUnit {
    /// Stock livre: real menos o que já está reservado.
    pub fn available(&self) -> Decimal {
        self.stock_real - self.stock_locked
    }
}

/// Somatórios por variante, derivados das unidades.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct StockTotals {
    pub stock_original: Decimal,
    pub stock_real: Decimal,
    pub stock_locked: Decimal,
}

impl StockTotals {
    pub fn available(&self) -> Decimal {
        self.stock_real - self.stock_locked
    }
}

// ---
// Payloads
// ---

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct StockUnitInput {
    pub variant_id: Uuid,
    pub box_id: Uuid,

    #[validate(length(min = 1, max = 80))]
    pub value: Option<String>,

    pub caducity: Option<NaiveDate>,

    #[validate(custom(function = "validate_not_negative"))]
    pub stock_original: Decimal,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct StockQuantityInput {
    #[validate(custom(function = "validate_positive"))]
    pub quantity: Decimal,

    /// Para split/consumo: retirar do stock reservado em vez do livre.
    #[serde(default)]
    pub from_locked: bool,
}
