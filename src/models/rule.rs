// src/models/rule.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use uuid::Uuid;
use validator::Validate;

use crate::models::text::LocalizedLabel;
use crate::models::validate_not_negative;

// --- Enums (Mapeando o Postgres) ---

/// Como o preço da regra se combina com o total acumulado.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "price_mode", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PriceMode {
    Percentage,    // % sobre o preço base do produto
    Increase,      // soma fixa
    FinalOverride, // substitui o preço e encerra a avaliação
}

/// Como o valor escolhido numa variante/produto é validado e guardado.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "value_kind", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValueKind {
    FreeText,
    Boolean,
    OptionList,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "rule_kind", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleKind {
    Attribute,
    Feature,
    SpecialFeature,
}

impl RuleKind {
    pub fn label(&self) -> &'static str {
        match self {
            RuleKind::Attribute => "atributo",
            RuleKind::Feature => "característica",
            RuleKind::SpecialFeature => "característica especial",
        }
    }
}

// --- Núcleo comum das três regras ---
// Composição em vez de herança: cada regra embute um RuleCore.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RuleCore {
    pub price: Decimal,
    pub price_mode: PriceMode,
    pub value_kind: ValueKind,
    pub family_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub option_group_id: Option<Uuid>,
    pub public: bool,
    pub sort_order: Option<i16>,
    pub description: Json<LocalizedLabel>,
}

/// Atributo: escolhido por variante (cor, tamanho).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Attribute {
    pub id: Uuid,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub core: RuleCore,
    /// Agrupa atributos relacionados.
    pub parent_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Característica: partilhada por todas as variantes de um produto (RAM, resolução).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Feature {
    pub id: Uuid,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub core: RuleCore,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Característica especial: identifica cada unidade física (IMEI, número de série).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SpecialFeature {
    pub id: Uuid,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub core: RuleCore,
    pub unique: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Interface comum às três regras de preço.
pub trait PriceRule {
    const KIND: RuleKind;

    fn id(&self) -> Uuid;
    fn core(&self) -> &RuleCore;
    fn core_mut(&mut self) -> &mut RuleCore;
    fn touch(&mut self, at: DateTime<Utc>);

    fn price(&self) -> Decimal {
        self.core().price
    }

    fn price_mode(&self) -> PriceMode {
        self.core().price_mode
    }

    fn value_kind(&self) -> ValueKind {
        self.core().value_kind
    }
}

macro_rules! impl_price_rule {
    ($ty:ty, $kind:expr) => {
        impl PriceRule for $ty {
            const KIND: RuleKind = $kind;

            fn id(&self) -> Uuid {
                self.id
            }

            fn core(&self) -> &RuleCore {
                &self.core
            }

            fn core_mut(&mut self) -> &mut RuleCore {
                &mut self.core
            }

            fn touch(&mut self, at: DateTime<Utc>) {
                self.updated_at = at;
            }
        }
    };
}

impl_price_rule!(Attribute, RuleKind::Attribute);
impl_price_rule!(Feature, RuleKind::Feature);
impl_price_rule!(SpecialFeature, RuleKind::SpecialFeature);

// --- Regra já resolvida para o avaliador de preços ---
// `updated_at` e `value_id` vêm da linha de valor (variante x atributo ou
// produto x característica): é ela que define a ordem de avaliação.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AppliedRule {
    pub value_id: Uuid,
    pub rule_id: Uuid,
    pub price: Decimal,
    pub price_mode: PriceMode,
    pub updated_at: DateTime<Utc>,
}

// --- Payloads ---

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RuleInput {
    #[validate(custom(function = "validate_not_negative"))]
    #[serde(default)]
    pub price: Decimal,
    pub price_mode: PriceMode,
    pub value_kind: ValueKind,
    pub family_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub option_group_id: Option<Uuid>,
    #[serde(default = "default_true")]
    pub public: bool,
    pub sort_order: Option<i16>,
    #[serde(default)]
    pub description: LocalizedLabel,
    /// Só atributos.
    pub parent_id: Option<Uuid>,
    /// Só características especiais.
    #[serde(default = "default_true")]
    pub unique: bool,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RulePriceInput {
    #[validate(custom(function = "validate_not_negative"))]
    pub price: Decimal,
    pub price_mode: PriceMode,
}

fn default_true() -> bool {
    true
}

/// Qualquer uma das três regras, como devolvida pela API.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RuleRecord {
    Attribute(Attribute),
    Feature(Feature),
    SpecialFeature(SpecialFeature),
}

impl RuleRecord {
    pub fn core(&self) -> &RuleCore {
        match self {
            RuleRecord::Attribute(r) => r.core(),
            RuleRecord::Feature(r) => r.core(),
            RuleRecord::SpecialFeature(r) => r.core(),
        }
    }
}
