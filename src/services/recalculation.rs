// src/services/recalculation.rs

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::{
    common::{error::AppError, money::PricingConfig},
    db::{CatalogTx, PriceSource},
    models::product::{PriceBreakdown, Product, Variant},
    services::pricing::{evaluate, PricingInput},
};

/// Resultado de uma cascata: quantas variantes dependiam da origem e quantas
/// tiveram de ser regravadas.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecalculationReport {
    pub examined: usize,
    pub updated: usize,
}

/// Propagador de recálculo. Corre sempre dentro do tx de quem disparou a
/// mudança: se uma escrita falhar, o tx inteiro é desfeito.
#[derive(Debug, Clone, Copy)]
pub struct PriceRecalculator {
    config: PricingConfig,
}

impl PriceRecalculator {
    pub fn new(config: PricingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PricingConfig {
        &self.config
    }

    async fn load_input<T: CatalogTx>(
        &self,
        tx: &mut T,
        variant: &Variant,
        product: &Product,
    ) -> Result<PricingInput, AppError> {
        let tax = tx
            .get_tax(product.tax_id)
            .await?
            .ok_or(AppError::not_found("Tipo de imposto"))?;

        let special_feature = match product.special_feature_id {
            Some(id) => {
                let rule = tx
                    .get_special_feature(id)
                    .await?
                    .ok_or(AppError::not_found("Característica especial"))?;
                Some((rule.core.price, rule.core.price_mode))
            }
            None => None,
        };

        Ok(PricingInput {
            base_price: variant.local_base_price.unwrap_or(product.base_price),
            attributes: tx.list_attribute_rules(variant.id).await?,
            features: tx.list_feature_rules(product.id).await?,
            special_feature,
            tax_percentage: tax.percentage,
            surcharge_percentage: tax.surcharge,
        })
    }

    /// Avalia o preço da variante com os dados atuais do tx, sem gravar nada.
    pub async fn price_variant<T: CatalogTx>(
        &self,
        tx: &mut T,
        variant: &Variant,
        product: &Product,
        with_surcharge: bool,
    ) -> Result<PriceBreakdown, AppError> {
        let input = self.load_input(tx, variant, product).await?;
        Ok(evaluate(&input, &self.config, with_surcharge))
    }

    /// Recalcula `price_base`/`price` na variante em memória.
    /// Devolve `true` se algum dos dois mudou.
    pub async fn apply_to<T: CatalogTx>(
        &self,
        tx: &mut T,
        variant: &mut Variant,
        product: &Product,
    ) -> Result<bool, AppError> {
        let breakdown = self.price_variant(tx, variant, product, false).await?;
        let changed = variant.price_base != breakdown.price_base || variant.price != breakdown.price_total;
        variant.price_base = breakdown.price_base;
        variant.price = breakdown.price_total;
        Ok(changed)
    }

    /// Recalcula uma variante gravada e só escreve se o preço mudou.
    pub async fn refresh_variant<T: CatalogTx>(&self, tx: &mut T, variant_id: Uuid) -> Result<bool, AppError> {
        let mut variant = tx
            .get_variant(variant_id)
            .await?
            .ok_or(AppError::not_found("Variante"))?;
        let product = tx
            .get_product(variant.product_id)
            .await?
            .ok_or(AppError::not_found("Produto"))?;

        if !self.apply_to(tx, &mut variant, &product).await? {
            return Ok(false);
        }

        variant.updated_at = Utc::now();
        tx.update_variant(&variant).await?;
        tracing::debug!(
            variant_id = %variant.id,
            price_base = %variant.price_base,
            price = %variant.price,
            "Preço da variante recalculado"
        );
        Ok(true)
    }

    /// Recalcula todas as variantes que dependem da origem indicada.
    pub async fn recalculate_dependents<T: CatalogTx>(
        &self,
        tx: &mut T,
        source: PriceSource,
    ) -> Result<RecalculationReport, AppError> {
        let ids = tx.dependent_variant_ids(source).await?;
        let mut report = RecalculationReport {
            examined: ids.len(),
            updated: 0,
        };

        for id in ids {
            if self.refresh_variant(tx, id).await? {
                report.updated += 1;
            }
        }

        tracing::info!(
            ?source,
            examined = report.examined,
            updated = report.updated,
            "Recálculo em cascata concluído"
        );
        Ok(report)
    }
}
