// src/models/tax.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::models::validate_percentage;

// --- Tipos de imposto ---
// Exatamente um registro é o padrão em qualquer momento (ver CatalogService::save_tax).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TaxRate {
    pub id: Uuid,
    pub name: String,
    pub percentage: Decimal,
    /// Recargo de equivalência (%), somado apenas quando o chamador pede.
    pub surcharge: Decimal,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TaxRateInput {
    #[validate(length(min = 1, max = 250, message = "O nome é obrigatório."))]
    pub name: String,

    #[validate(custom(function = "validate_percentage"))]
    pub percentage: Decimal,

    #[validate(custom(function = "validate_percentage"))]
    #[serde(default)]
    pub surcharge: Decimal,

    #[serde(default)]
    pub is_default: bool,
}
