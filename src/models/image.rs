// src/models/image.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

// --- Imagens de produto ---
// Por produto existe sempre exatamente uma imagem principal, uma de produto
// estrela e uma de destaque (ver ImageService::enforce_flags).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ProductImage {
    pub id: Uuid,
    pub product_id: Uuid,
    /// Caminho devolvido pelo serviço de ficheiros.
    pub path: String,
    pub sort_order: Option<i16>,
    pub public: bool,
    pub principal: bool,
    pub flagship: bool,
    pub outstanding: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFlag {
    Principal,
    Flagship,
    Outstanding,
}

impl ImageFlag {
    pub const ALL: [ImageFlag; 3] = [ImageFlag::Principal, ImageFlag::Flagship, ImageFlag::Outstanding];

    pub fn column(&self) -> &'static str {
        match self {
            ImageFlag::Principal => "principal",
            ImageFlag::Flagship => "flagship",
            ImageFlag::Outstanding => "outstanding",
        }
    }

    pub fn get(&self, image: &ProductImage) -> bool {
        match self {
            ImageFlag::Principal => image.principal,
            ImageFlag::Flagship => image.flagship,
            ImageFlag::Outstanding => image.outstanding,
        }
    }

    pub fn set(&self, image: &mut ProductImage, value: bool) {
        match self {
            ImageFlag::Principal => image.principal = value,
            ImageFlag::Flagship => image.flagship = value,
            ImageFlag::Outstanding => image.outstanding = value,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ImageInput {
    pub product_id: Uuid,
    #[validate(length(min = 1, max = 200, message = "O caminho é obrigatório."))]
    pub path: String,
    pub sort_order: Option<i16>,
    #[serde(default = "default_true")]
    pub public: bool,
    #[serde(default)]
    pub principal: bool,
    #[serde(default)]
    pub flagship: bool,
    #[serde(default)]
    pub outstanding: bool,
}

fn default_true() -> bool {
    true
}
