// src/models/product.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::models::text::{pick, Language, Translations};
use crate::models::validate_not_negative;

// --- 1. Produto (catálogo) ---
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub code: String,
    pub base_price: Decimal,
    pub tax_id: Uuid,
    /// Característica especial obrigatória (IMEI, nº de série...).
    pub special_feature_id: Option<Uuid>,
    pub brand_id: Option<Uuid>,
    pub family_id: Uuid,
    pub category_id: Uuid,
    pub subcategory_id: Uuid,
    pub packing_cost: Decimal,
    pub weight: Decimal,
    pub public: bool,
    pub of_sales: bool,
    pub of_purchase: bool,
    pub force_stock: bool,
    pub caducable: bool,
    pub texts: Json<Translations>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// --- 2. Variante (produto final, a unidade vendável) ---
// `price_base` e `price` são derivados: recalculados em cada gravação.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Variant {
    pub id: Uuid,
    pub product_id: Uuid,
    pub code: Option<String>,
    pub ean13: Option<String>,
    pub local_base_price: Option<Decimal>,
    pub local_packing_cost: Option<Decimal>,
    pub local_weight: Option<Decimal>,
    /// Preço sem imposto.
    pub price_base: Decimal,
    /// Preço com imposto.
    pub price: Decimal,
    pub offer: bool,
    pub outstanding: bool,
    pub most_sold: bool,
    /// Amostra: não pode ser vendida.
    pub sample: bool,
    pub texts: Json<Translations>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Variant {
    /// Nome traduzido, com o EAN entre parênteses quando existir.
    pub fn display_name(&self, product: &Product, lang: Language) -> String {
        let name = pick(&self.texts, lang)
            .or_else(|| pick(&product.texts, lang))
            .map(|t| t.name.clone())
            .unwrap_or_else(|| product.code.clone());

        match &self.ean13 {
            Some(ean) => format!("{name} ({ean})"),
            None => name,
        }
    }

    pub fn is_sellable(&self, product: &Product) -> bool {
        product.of_sales && !self.sample
    }
}

// --- 3. Valores escolhidos ---

/// Valor de um atributo numa variante. No máximo um por (variante, atributo).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct VariantAttributeValue {
    pub id: Uuid,
    pub variant_id: Uuid,
    pub attribute_id: Uuid,
    pub value: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Valor de uma característica no produto, partilhado pelas variantes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ProductFeatureValue {
    pub id: Uuid,
    pub product_id: Uuid,
    pub feature_id: Uuid,
    pub value: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// --- 4. Resultado do avaliador ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceBreakdown {
    pub price_base: Decimal,
    pub tax_amount: Decimal,
    pub surcharge_amount: Decimal,
    pub price_total: Decimal,
}

// --- 5. Leitura para a camada de apresentação ---

/// Valor escolhido já pronto a mostrar.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueDisplay {
    pub value_id: Uuid,
    pub rule_id: Uuid,
    pub value: String,
    pub display: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantView {
    #[serde(flatten)]
    pub variant: Variant,
    pub display_name: String,
    pub sellable: bool,
    pub attributes: Vec<ValueDisplay>,
    pub features: Vec<ValueDisplay>,
}

// ---
// Payloads
// ---

fn validate_ean13(val: &str) -> Result<(), ValidationError> {
    if val.len() != 13 || !val.chars().all(|c| c.is_ascii_digit()) {
        let mut err = ValidationError::new("ean13");
        err.message = Some("O EAN-13 deve ter 13 dígitos.".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProductInput {
    #[validate(length(min = 1, max = 250, message = "O código é obrigatório."))]
    pub code: String,

    #[validate(custom(function = "validate_not_negative"))]
    pub base_price: Decimal,

    pub tax_id: Uuid,
    pub special_feature_id: Option<Uuid>,
    pub brand_id: Option<Uuid>,
    pub family_id: Uuid,
    pub category_id: Uuid,
    pub subcategory_id: Uuid,

    #[validate(custom(function = "validate_not_negative"))]
    #[serde(default)]
    pub packing_cost: Decimal,

    #[validate(custom(function = "validate_not_negative"))]
    #[serde(default)]
    pub weight: Decimal,

    #[serde(default = "default_true")]
    pub public: bool,
    #[serde(default = "default_true")]
    pub of_sales: bool,
    #[serde(default = "default_true")]
    pub of_purchase: bool,
    #[serde(default = "default_true")]
    pub force_stock: bool,
    #[serde(default)]
    pub caducable: bool,

    #[serde(default)]
    pub texts: Translations,
}

/// Campos do produto que influenciam o preço das variantes.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProductPricingInput {
    #[validate(custom(function = "validate_not_negative"))]
    pub base_price: Decimal,
    pub tax_id: Uuid,
    pub special_feature_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct VariantInput {
    pub product_id: Uuid,

    #[validate(length(min = 1, max = 250))]
    pub code: Option<String>,

    #[validate(custom(function = "validate_ean13"))]
    pub ean13: Option<String>,

    #[validate(custom(function = "validate_not_negative"))]
    pub local_base_price: Option<Decimal>,

    #[validate(custom(function = "validate_not_negative"))]
    pub local_packing_cost: Option<Decimal>,

    #[validate(custom(function = "validate_not_negative"))]
    pub local_weight: Option<Decimal>,

    #[serde(default)]
    pub offer: bool,
    #[serde(default)]
    pub outstanding: bool,
    #[serde(default)]
    pub most_sold: bool,
    #[serde(default)]
    pub sample: bool,

    #[serde(default)]
    pub texts: Translations,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PromoteInput {
    #[validate(custom(function = "validate_ean13"))]
    pub ean13: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ValueUpdateInput {
    #[validate(length(min = 1, message = "O valor é obrigatório."))]
    pub value: String,
}

/// Valor bruto enviado pelo formulário para um atributo/característica.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RuleValueInput {
    pub rule_id: Uuid,
    #[validate(length(min = 1, message = "O valor é obrigatório."))]
    pub value: String,
}

fn default_true() -> bool {
    true
}
