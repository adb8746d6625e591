// src/services/stock_service.rs

use std::collections::BTreeSet;

use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    db::{CatalogStore, CatalogTx},
    models::{
        rule::{RuleKind, SpecialFeature},
        stock::{StockQuantityInput, StockTotals, StockUnitInput, UniqueStockUnit},
    },
    services::rule_values::normalize_value,
};

// ---------------------------------------------------------------------------
// Guardião de unidades de stock.
//
// A verificação de duplicados aqui serve para dar uma mensagem clara; quem
// garante a unicidade sob concorrência é o índice (product_id, unique_value).
// ---------------------------------------------------------------------------

fn missing_unique_value() -> AppError {
    AppError::InvalidRuleValue {
        rule: RuleKind::SpecialFeature.label(),
        reason: "uma característica especial única exige um valor por unidade".into(),
    }
}

/// Revalida as unidades do produto contra a (nova) característica especial e
/// repõe `unique_value` em cada uma. Corre no tx de quem alterou o produto.
/// Devolve quantas unidades foram regravadas.
pub(crate) async fn reconcile_product_units<T: CatalogTx>(
    tx: &mut T,
    product_id: Uuid,
    special: Option<&SpecialFeature>,
) -> Result<usize, AppError> {
    let unique = special.is_some_and(|sf| sf.unique);
    let units = tx.list_product_units(product_id).await?;

    if unique {
        let mut seen = BTreeSet::new();
        for unit in &units {
            let value = unit.value.as_deref().ok_or_else(missing_unique_value)?;
            if unit.stock_original > Decimal::ONE {
                return Err(AppError::QuantityExceeded {
                    requested: unit.stock_original,
                });
            }
            if !seen.insert(value) {
                return Err(AppError::DuplicateUniqueValue {
                    value: value.to_string(),
                });
            }
        }
    }

    let now = Utc::now();
    let mut rewritten = 0;
    for mut unit in units {
        let unique_value = if unique { unit.value.clone() } else { None };
        if unit.unique_value != unique_value {
            unit.unique_value = unique_value;
            unit.updated_at = now;
            tx.update_stock_unit(&unit).await?;
            rewritten += 1;
        }
    }
    Ok(rewritten)
}

#[derive(Clone)]
pub struct StockService<S: CatalogStore> {
    store: S,
}

impl<S: CatalogStore> StockService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Aplica as regras da característica especial do produto e grava a
    /// unidade. Ao criar, `stock_real = stock_original` e `stock_locked = 0`.
    async fn guard_and_save(
        tx: &mut S::Tx,
        mut unit: UniqueStockUnit,
        is_new: bool,
    ) -> Result<UniqueStockUnit, AppError> {
        let variant = tx
            .get_variant(unit.variant_id)
            .await?
            .ok_or(AppError::not_found("Variante"))?;
        let product = tx
            .get_product(variant.product_id)
            .await?
            .ok_or(AppError::not_found("Produto"))?;
        let special_id = product
            .special_feature_id
            .ok_or(AppError::MissingSpecialFeature)?;
        let special = tx
            .get_special_feature(special_id)
            .await?
            .ok_or(AppError::not_found("Característica especial"))?;

        unit.product_id = product.id;
        if let Some(raw) = unit.value.take() {
            unit.value = Some(normalize_value(tx, RuleKind::SpecialFeature, &special.core, &raw).await?);
        }

        if special.unique {
            if unit.stock_original > Decimal::ONE {
                return Err(AppError::QuantityExceeded {
                    requested: unit.stock_original,
                });
            }
            let value = unit.value.clone().ok_or_else(missing_unique_value)?;
            let exclude = (!is_new).then_some(unit.id);
            if tx.find_unit_with_value(product.id, &value, exclude).await?.is_some() {
                return Err(AppError::DuplicateUniqueValue { value });
            }
            unit.unique_value = Some(value);
        } else {
            unit.unique_value = None;
        }

        if is_new {
            tx.insert_stock_unit(&unit).await?;
        } else {
            tx.update_stock_unit(&unit).await?;
        }
        Ok(unit)
    }

    #[tracing::instrument(skip(self))]
    pub async fn add_stock_unit(&self, input: StockUnitInput) -> Result<UniqueStockUnit, AppError> {
        input.validate()?;
        let mut tx = self.store.begin().await?;

        let now = Utc::now();
        let unit = UniqueStockUnit {
            id: Uuid::new_v4(),
            variant_id: input.variant_id,
            product_id: Uuid::nil(),
            box_id: input.box_id,
            value: input.value,
            unique_value: None,
            caducity: input.caducity,
            stock_original: input.stock_original,
            stock_real: input.stock_original,
            stock_locked: Decimal::ZERO,
            created_at: now,
            updated_at: now,
        };
        let unit = Self::guard_and_save(&mut tx, unit, true).await?;
        tx.commit().await?;
        Ok(unit)
    }

    /// `stock_real` e `stock_locked` não são editáveis: só mudam por
    /// reserva, consumo ou divisão.
    #[tracing::instrument(skip(self))]
    pub async fn update_stock_unit(
        &self,
        id: Uuid,
        input: StockUnitInput,
    ) -> Result<UniqueStockUnit, AppError> {
        input.validate()?;
        let mut tx = self.store.begin().await?;
        let old = tx
            .get_stock_unit(id)
            .await?
            .ok_or(AppError::not_found("Unidade de stock"))?;

        let unit = UniqueStockUnit {
            variant_id: input.variant_id,
            box_id: input.box_id,
            value: input.value,
            caducity: input.caducity,
            stock_original: input.stock_original,
            updated_at: Utc::now(),
            ..old
        };
        let unit = Self::guard_and_save(&mut tx, unit, false).await?;
        tx.commit().await?;
        Ok(unit)
    }

    /// Separa `quantity` numa nova unidade irmã (mesma variante, caixa e valor).
    /// Com `from_locked`, a quantidade sai do stock reservado.
    #[tracing::instrument(skip(self))]
    pub async fn split(
        &self,
        id: Uuid,
        input: StockQuantityInput,
    ) -> Result<(UniqueStockUnit, UniqueStockUnit), AppError> {
        input.validate()?;
        let quantity = input.quantity;
        let mut tx = self.store.begin().await?;
        let mut source = tx
            .get_stock_unit(id)
            .await?
            .ok_or(AppError::not_found("Unidade de stock"))?;

        if quantity == source.stock_real {
            return Err(AppError::SplitTakesWholeUnit { quantity });
        }
        let pool = if input.from_locked {
            source.stock_locked
        } else {
            source.available()
        };
        if quantity > source.stock_real || quantity > pool {
            return Err(AppError::InsufficientStock {
                requested: quantity,
                available: pool.min(source.stock_real),
            });
        }
        let moved_lock = if input.from_locked { quantity } else { Decimal::ZERO };

        let now = Utc::now();
        let sibling = UniqueStockUnit {
            id: Uuid::new_v4(),
            stock_original: quantity,
            stock_real: quantity,
            stock_locked: moved_lock,
            created_at: now,
            updated_at: now,
            ..source.clone()
        };
        source.stock_original -= quantity;
        source.stock_real -= quantity;
        source.stock_locked -= moved_lock;
        source.updated_at = now;

        tx.update_stock_unit(&source).await?;
        let sibling = Self::guard_and_save(&mut tx, sibling, true).await?;
        tx.commit().await?;

        tracing::info!(source = %source.id, sibling = %sibling.id, %quantity, "Unidade de stock dividida");
        Ok((source, sibling))
    }

    /// Reserva stock livre.
    #[tracing::instrument(skip(self))]
    pub async fn lock(&self, id: Uuid, input: StockQuantityInput) -> Result<UniqueStockUnit, AppError> {
        input.validate()?;
        let mut tx = self.store.begin().await?;
        let mut unit = tx
            .get_stock_unit(id)
            .await?
            .ok_or(AppError::not_found("Unidade de stock"))?;

        let available = unit.available();
        if input.quantity > available {
            return Err(AppError::InsufficientStock {
                requested: input.quantity,
                available,
            });
        }
        unit.stock_locked += input.quantity;
        unit.updated_at = Utc::now();
        tx.update_stock_unit(&unit).await?;
        tx.commit().await?;
        Ok(unit)
    }

    /// Retira stock real, do reservado (`from_locked`) ou do livre.
    #[tracing::instrument(skip(self))]
    pub async fn consume(&self, id: Uuid, input: StockQuantityInput) -> Result<UniqueStockUnit, AppError> {
        input.validate()?;
        let mut tx = self.store.begin().await?;
        let mut unit = tx
            .get_stock_unit(id)
            .await?
            .ok_or(AppError::not_found("Unidade de stock"))?;

        let pool = if input.from_locked {
            unit.stock_locked
        } else {
            unit.available()
        };
        if input.quantity > pool {
            return Err(AppError::InsufficientStock {
                requested: input.quantity,
                available: pool,
            });
        }
        unit.stock_real -= input.quantity;
        if input.from_locked {
            unit.stock_locked -= input.quantity;
        }
        unit.updated_at = Utc::now();
        tx.update_stock_unit(&unit).await?;
        tx.commit().await?;
        Ok(unit)
    }

    /// Somatórios por variante.
    pub async fn totals(&self, variant_id: Uuid) -> Result<StockTotals, AppError> {
        let mut tx = self.store.begin().await?;
        tx.get_variant(variant_id)
            .await?
            .ok_or(AppError::not_found("Variante"))?;
        tx.stock_totals(variant_id).await
    }
}
