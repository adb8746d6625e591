// src/models/catalog.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use uuid::Uuid;
use validator::Validate;

use crate::models::rule::RuleKind;
use crate::models::text::LocalizedLabel;

// --- 1. Famílias ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Family {
    pub id: Uuid,
    pub code: Option<String>,
    pub public: bool,
    pub names: Json<LocalizedLabel>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// --- 2. Categorias (sempre penduradas numa família) ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: Uuid,
    pub family_id: Uuid,
    pub code: Option<String>,
    pub public: bool,
    pub names: Json<LocalizedLabel>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// --- 3. Subcategorias ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Subcategory {
    pub id: Uuid,
    pub category_id: Uuid,
    pub code: Option<String>,
    pub public: bool,
    pub names: Json<LocalizedLabel>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// --- 4. Marcas ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Brand {
    pub id: Uuid,
    pub outstanding: bool,
    pub names: Json<LocalizedLabel>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// --- 5. Grupos de valores (listas de opções das regras) ---
// Um grupo só serve para regras do mesmo tipo (atributo, característica ou especial).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct OptionGroup {
    pub id: Uuid,
    pub kind: RuleKind,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct OptionValue {
    pub id: Uuid,
    pub group_id: Uuid,
    pub labels: Json<LocalizedLabel>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// --- Payloads de criação ---

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TaxonomyInput {
    /// Família (para categorias) ou categoria (para subcategorias).
    pub parent_id: Option<Uuid>,
    #[validate(length(max = 250))]
    pub code: Option<String>,
    #[serde(default = "default_true")]
    pub public: bool,
    #[serde(default)]
    pub names: LocalizedLabel,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BrandInput {
    #[serde(default = "default_true")]
    pub outstanding: bool,
    #[serde(default)]
    pub names: LocalizedLabel,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct OptionGroupInput {
    pub kind: RuleKind,
    #[validate(length(min = 1, max = 250, message = "O nome é obrigatório."))]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct OptionValueInput {
    #[serde(default)]
    pub labels: LocalizedLabel,
}

fn default_true() -> bool {
    true
}
