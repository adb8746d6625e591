// src/services/catalog_service.rs

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    db::{CatalogEntity, CatalogStore, CatalogTx, PriceSource},
    models::{
        catalog::{
            Brand, BrandInput, Category, Family, OptionGroup, OptionGroupInput, OptionValue,
            OptionValueInput, Subcategory, TaxonomyInput,
        },
        product::{
            PriceBreakdown, Product, ProductFeatureValue, ProductInput, ProductPricingInput,
            PromoteInput, RuleValueInput, ValueDisplay, ValueUpdateInput, Variant,
            VariantAttributeValue, VariantInput, VariantView,
        },
        rule::{
            Attribute, Feature, PriceRule, RuleCore, RuleInput, RuleKind, RulePriceInput,
            RuleRecord, SpecialFeature, ValueKind,
        },
        tax::{TaxRate, TaxRateInput},
        text::Language,
    },
    services::{
        recalculation::{PriceRecalculator, RecalculationReport},
        rule_values::{check_scope, display_value, normalize_value},
        stock_service::reconcile_product_units,
    },
};

/// Atualiza preço e modo da regra. Devolve `true` se algum dos dois mudou.
fn reprice<R: PriceRule>(rule: &mut R, input: &RulePriceInput, now: DateTime<Utc>) -> bool {
    let changed = rule.price() != input.price || rule.price_mode() != input.price_mode;
    let core = rule.core_mut();
    core.price = input.price;
    core.price_mode = input.price_mode;
    rule.touch(now);
    changed
}

#[derive(Clone)]
pub struct CatalogService<S: CatalogStore> {
    store: S,
    recalculator: PriceRecalculator,
}

impl<S: CatalogStore> CatalogService<S> {
    pub fn new(store: S, recalculator: PriceRecalculator) -> Self {
        Self { store, recalculator }
    }

    // ---
    // Impostos
    // ---
    // Invariante: existe sempre exatamente um imposto padrão.

    #[tracing::instrument(skip(self))]
    pub async fn create_tax(&self, input: TaxRateInput) -> Result<TaxRate, AppError> {
        input.validate()?;
        let mut tx = self.store.begin().await?;

        let now = Utc::now();
        let mut tax = TaxRate {
            id: Uuid::new_v4(),
            name: input.name,
            percentage: input.percentage,
            surcharge: input.surcharge,
            is_default: input.is_default,
            created_at: now,
            updated_at: now,
        };

        if tax.is_default {
            tx.clear_default_taxes(tax.id).await?;
        } else if tx.default_tax().await?.is_none() {
            tax.is_default = true;
        }

        tx.insert_tax(&tax).await?;
        tx.commit().await?;
        Ok(tax)
    }

    /// Atualiza o imposto e, se a percentagem mudou, recalcula todas as
    /// variantes cujos produtos o usam.
    #[tracing::instrument(skip(self))]
    pub async fn update_tax(
        &self,
        id: Uuid,
        input: TaxRateInput,
    ) -> Result<(TaxRate, RecalculationReport), AppError> {
        input.validate()?;
        let mut tx = self.store.begin().await?;

        let old = tx.get_tax(id).await?.ok_or(AppError::not_found("Tipo de imposto"))?;
        let mut tax = TaxRate {
            name: input.name,
            percentage: input.percentage,
            surcharge: input.surcharge,
            is_default: input.is_default,
            updated_at: Utc::now(),
            ..old.clone()
        };

        if tax.is_default {
            tx.clear_default_taxes(tax.id).await?;
        } else {
            // Desmarcar o único padrão não é permitido: continua padrão.
            let other_default = tx.default_tax().await?.filter(|t| t.id != tax.id);
            if other_default.is_none() {
                tax.is_default = true;
            }
        }

        tx.update_tax(&tax).await?;

        let report = if old.percentage != tax.percentage {
            self.recalculator
                .recalculate_dependents(&mut tx, PriceSource::Tax(tax.id))
                .await?
        } else {
            RecalculationReport::default()
        };

        tx.commit().await?;
        Ok((tax, report))
    }

    // ---
    // Taxonomia
    // ---

    pub async fn create_family(&self, input: TaxonomyInput) -> Result<Family, AppError> {
        input.validate()?;
        let mut tx = self.store.begin().await?;
        let now = Utc::now();
        let family = Family {
            id: Uuid::new_v4(),
            code: input.code,
            public: input.public,
            names: Json(input.names),
            created_at: now,
            updated_at: now,
        };
        tx.insert_family(&family).await?;
        tx.commit().await?;
        Ok(family)
    }

    pub async fn create_category(&self, input: TaxonomyInput) -> Result<Category, AppError> {
        input.validate()?;
        let mut tx = self.store.begin().await?;

        let family_id = input.parent_id.ok_or(AppError::not_found("Família"))?;
        tx.get_family(family_id).await?.ok_or(AppError::not_found("Família"))?;

        let now = Utc::now();
        let category = Category {
            id: Uuid::new_v4(),
            family_id,
            code: input.code,
            public: input.public,
            names: Json(input.names),
            created_at: now,
            updated_at: now,
        };
        tx.insert_category(&category).await?;
        tx.commit().await?;
        Ok(category)
    }

    pub async fn create_subcategory(&self, input: TaxonomyInput) -> Result<Subcategory, AppError> {
        input.validate()?;
        let mut tx = self.store.begin().await?;

        let category_id = input.parent_id.ok_or(AppError::not_found("Categoria"))?;
        tx.get_category(category_id).await?.ok_or(AppError::not_found("Categoria"))?;

        let now = Utc::now();
        let subcategory = Subcategory {
            id: Uuid::new_v4(),
            category_id,
            code: input.code,
            public: input.public,
            names: Json(input.names),
            created_at: now,
            updated_at: now,
        };
        tx.insert_subcategory(&subcategory).await?;
        tx.commit().await?;
        Ok(subcategory)
    }

    pub async fn create_brand(&self, input: BrandInput) -> Result<Brand, AppError> {
        let mut tx = self.store.begin().await?;
        let now = Utc::now();
        let brand = Brand {
            id: Uuid::new_v4(),
            outstanding: input.outstanding,
            names: Json(input.names),
            created_at: now,
            updated_at: now,
        };
        tx.insert_brand(&brand).await?;
        tx.commit().await?;
        Ok(brand)
    }

    pub async fn create_option_group(&self, input: OptionGroupInput) -> Result<OptionGroup, AppError> {
        input.validate()?;
        let mut tx = self.store.begin().await?;
        let now = Utc::now();
        let group = OptionGroup {
            id: Uuid::new_v4(),
            kind: input.kind,
            name: input.name,
            created_at: now,
            updated_at: now,
        };
        tx.insert_option_group(&group).await?;
        tx.commit().await?;
        Ok(group)
    }

    pub async fn add_option_value(
        &self,
        group_id: Uuid,
        input: OptionValueInput,
    ) -> Result<OptionValue, AppError> {
        let mut tx = self.store.begin().await?;
        tx.get_option_group(group_id)
            .await?
            .ok_or(AppError::not_found("Grupo de valores"))?;

        let now = Utc::now();
        let option = OptionValue {
            id: Uuid::new_v4(),
            group_id,
            labels: Json(input.labels),
            created_at: now,
            updated_at: now,
        };
        tx.insert_option_value(&option).await?;
        tx.commit().await?;
        Ok(option)
    }

    // ---
    // Regras de preço
    // ---

    async fn check_rule_refs(
        tx: &mut S::Tx,
        kind: RuleKind,
        input: &RuleInput,
    ) -> Result<(), AppError> {
        if let Some(id) = input.family_id {
            tx.get_family(id).await?.ok_or(AppError::not_found("Família"))?;
        }
        if let Some(id) = input.category_id {
            tx.get_category(id).await?.ok_or(AppError::not_found("Categoria"))?;
        }

        match input.option_group_id {
            Some(id) => {
                let group = tx
                    .get_option_group(id)
                    .await?
                    .ok_or(AppError::not_found("Grupo de valores"))?;
                if group.kind != kind {
                    return Err(AppError::InvalidRuleValue {
                        rule: kind.label(),
                        reason: format!("o grupo de valores é de {}", group.kind.label()),
                    });
                }
            }
            None if input.value_kind == ValueKind::OptionList => {
                return Err(AppError::InvalidRuleValue {
                    rule: kind.label(),
                    reason: "uma lista de opções precisa de um grupo de valores".into(),
                });
            }
            None => {}
        }
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub async fn create_rule(&self, kind: RuleKind, input: RuleInput) -> Result<RuleRecord, AppError> {
        input.validate()?;
        let mut tx = self.store.begin().await?;
        Self::check_rule_refs(&mut tx, kind, &input).await?;

        let now = Utc::now();
        let id = Uuid::new_v4();
        let core = RuleCore {
            price: input.price,
            price_mode: input.price_mode,
            value_kind: input.value_kind,
            family_id: input.family_id,
            category_id: input.category_id,
            option_group_id: input.option_group_id,
            public: input.public,
            sort_order: input.sort_order,
            description: Json(input.description),
        };

        let record = match kind {
            RuleKind::Attribute => {
                if let Some(parent_id) = input.parent_id {
                    tx.get_attribute(parent_id)
                        .await?
                        .ok_or(AppError::not_found("Atributo"))?;
                }
                let rule = Attribute {
                    id,
                    core,
                    parent_id: input.parent_id,
                    created_at: now,
                    updated_at: now,
                };
                tx.insert_attribute(&rule).await?;
                RuleRecord::Attribute(rule)
            }
            RuleKind::Feature => {
                let rule = Feature {
                    id,
                    core,
                    created_at: now,
                    updated_at: now,
                };
                tx.insert_feature(&rule).await?;
                RuleRecord::Feature(rule)
            }
            RuleKind::SpecialFeature => {
                let rule = SpecialFeature {
                    id,
                    core,
                    unique: input.unique,
                    created_at: now,
                    updated_at: now,
                };
                tx.insert_special_feature(&rule).await?;
                RuleRecord::SpecialFeature(rule)
            }
        };

        tx.commit().await?;
        Ok(record)
    }

    /// Edita o preço de uma regra e propaga para as variantes dependentes,
    /// tudo no mesmo tx. Sem mudança efetiva, nada é recalculado.
    #[tracing::instrument(skip(self))]
    pub async fn update_rule_price(
        &self,
        kind: RuleKind,
        id: Uuid,
        input: RulePriceInput,
    ) -> Result<(RuleRecord, RecalculationReport), AppError> {
        input.validate()?;
        let mut tx = self.store.begin().await?;
        let now = Utc::now();

        // O valor antigo é lido antes de gravar o novo.
        let (record, source, changed) = match kind {
            RuleKind::Attribute => {
                let mut rule = tx.get_attribute(id).await?.ok_or(AppError::not_found("Atributo"))?;
                let changed = reprice(&mut rule, &input, now);
                tx.update_attribute(&rule).await?;
                (RuleRecord::Attribute(rule), PriceSource::Attribute(id), changed)
            }
            RuleKind::Feature => {
                let mut rule = tx
                    .get_feature(id)
                    .await?
                    .ok_or(AppError::not_found("Característica"))?;
                let changed = reprice(&mut rule, &input, now);
                tx.update_feature(&rule).await?;
                (RuleRecord::Feature(rule), PriceSource::Feature(id), changed)
            }
            RuleKind::SpecialFeature => {
                let mut rule = tx
                    .get_special_feature(id)
                    .await?
                    .ok_or(AppError::not_found("Característica especial"))?;
                let changed = reprice(&mut rule, &input, now);
                tx.update_special_feature(&rule).await?;
                (RuleRecord::SpecialFeature(rule), PriceSource::SpecialFeature(id), changed)
            }
        };

        let report = if changed {
            self.recalculator.recalculate_dependents(&mut tx, source).await?
        } else {
            RecalculationReport::default()
        };

        tx.commit().await?;
        Ok((record, report))
    }

    // ---
    // Produtos
    // ---

    #[tracing::instrument(skip(self, input), fields(code = %input.code))]
    pub async fn create_product(&self, input: ProductInput) -> Result<Product, AppError> {
        input.validate()?;
        let mut tx = self.store.begin().await?;

        tx.get_tax(input.tax_id).await?.ok_or(AppError::not_found("Tipo de imposto"))?;
        tx.get_family(input.family_id).await?.ok_or(AppError::not_found("Família"))?;
        tx.get_category(input.category_id)
            .await?
            .ok_or(AppError::not_found("Categoria"))?;
        tx.get_subcategory(input.subcategory_id)
            .await?
            .ok_or(AppError::not_found("Subcategoria"))?;
        if let Some(id) = input.brand_id {
            tx.get_brand(id).await?.ok_or(AppError::not_found("Marca"))?;
        }
        if let Some(id) = input.special_feature_id {
            tx.get_special_feature(id)
                .await?
                .ok_or(AppError::not_found("Característica especial"))?;
        }

        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4(),
            code: input.code,
            base_price: input.base_price,
            tax_id: input.tax_id,
            special_feature_id: input.special_feature_id,
            brand_id: input.brand_id,
            family_id: input.family_id,
            category_id: input.category_id,
            subcategory_id: input.subcategory_id,
            packing_cost: input.packing_cost,
            weight: input.weight,
            public: input.public,
            of_sales: input.of_sales,
            of_purchase: input.of_purchase,
            force_stock: input.force_stock,
            caducable: input.caducable,
            texts: Json(input.texts),
            created_at: now,
            updated_at: now,
        };
        tx.insert_product(&product).await?;
        tx.commit().await?;
        Ok(product)
    }

    /// Preço base, imposto e característica especial: qualquer mudança
    /// recalcula todas as variantes do produto. Trocar a característica
    /// especial revalida as unidades de stock já existentes.
    #[tracing::instrument(skip(self))]
    pub async fn update_product_pricing(
        &self,
        id: Uuid,
        input: ProductPricingInput,
    ) -> Result<(Product, RecalculationReport), AppError> {
        input.validate()?;
        let mut tx = self.store.begin().await?;

        let old = tx.get_product(id).await?.ok_or(AppError::not_found("Produto"))?;
        if input.tax_id != old.tax_id {
            tx.get_tax(input.tax_id).await?.ok_or(AppError::not_found("Tipo de imposto"))?;
        }
        let special_changed = input.special_feature_id != old.special_feature_id;
        let special = match input.special_feature_id {
            Some(sf) if special_changed => Some(
                tx.get_special_feature(sf)
                    .await?
                    .ok_or(AppError::not_found("Característica especial"))?,
            ),
            _ => None,
        };

        let product = Product {
            base_price: input.base_price,
            tax_id: input.tax_id,
            special_feature_id: input.special_feature_id,
            updated_at: Utc::now(),
            ..old.clone()
        };
        tx.update_product(&product).await?;

        // As unidades existentes passam a obedecer à nova característica especial.
        if special_changed {
            let rewritten = reconcile_product_units(&mut tx, product.id, special.as_ref()).await?;
            tracing::info!(product_id = %product.id, rewritten, "Unidades de stock revalidadas");
        }

        let changed = special_changed
            || old.base_price != product.base_price
            || old.tax_id != product.tax_id;
        let report = if changed {
            self.recalculator
                .recalculate_dependents(&mut tx, PriceSource::Product(id))
                .await?
        } else {
            RecalculationReport::default()
        };

        tx.commit().await?;
        Ok((product, report))
    }

    /// Cria uma variante a partir do produto, copiando código, preço base e
    /// textos atuais.
    #[tracing::instrument(skip(self))]
    pub async fn promote_to_variant(&self, id: Uuid, input: PromoteInput) -> Result<Variant, AppError> {
        input.validate()?;
        let mut tx = self.store.begin().await?;
        let product = tx.get_product(id).await?.ok_or(AppError::not_found("Produto"))?;

        let now = Utc::now();
        let mut variant = Variant {
            id: Uuid::new_v4(),
            product_id: product.id,
            code: Some(product.code.clone()),
            ean13: input.ean13,
            local_base_price: Some(product.base_price),
            local_packing_cost: None,
            local_weight: None,
            price_base: Default::default(),
            price: Default::default(),
            offer: false,
            outstanding: false,
            most_sold: false,
            sample: false,
            texts: product.texts.clone(),
            created_at: now,
            updated_at: now,
        };
        self.recalculator.apply_to(&mut tx, &mut variant, &product).await?;
        tx.insert_variant(&variant).await?;

        tx.commit().await?;
        tracing::info!(product_id = %product.id, variant_id = %variant.id, "Produto promovido a variante");
        Ok(variant)
    }

    /// Define (ou substitui) o valor de uma característica no produto.
    #[tracing::instrument(skip(self))]
    pub async fn set_feature_value(
        &self,
        product_id: Uuid,
        input: RuleValueInput,
    ) -> Result<(ProductFeatureValue, RecalculationReport), AppError> {
        input.validate()?;
        let mut tx = self.store.begin().await?;

        let product = tx.get_product(product_id).await?.ok_or(AppError::not_found("Produto"))?;
        let feature = tx
            .get_feature(input.rule_id)
            .await?
            .ok_or(AppError::not_found("Característica"))?;
        check_scope(RuleKind::Feature, &feature.core, &product)?;
        let value = normalize_value(&mut tx, RuleKind::Feature, &feature.core, &input.value).await?;

        let now = Utc::now();
        let row = match tx.find_feature_value(product.id, feature.id).await? {
            Some(existing) => {
                let row = ProductFeatureValue {
                    value,
                    updated_at: now,
                    ..existing
                };
                tx.update_feature_value(&row).await?;
                row
            }
            None => {
                let row = ProductFeatureValue {
                    id: Uuid::new_v4(),
                    product_id: product.id,
                    feature_id: feature.id,
                    value,
                    created_at: now,
                    updated_at: now,
                };
                tx.insert_feature_value(&row).await?;
                row
            }
        };

        let report = self
            .recalculator
            .recalculate_dependents(&mut tx, PriceSource::Product(product.id))
            .await?;
        tx.commit().await?;
        Ok((row, report))
    }

    #[tracing::instrument(skip(self))]
    pub async fn remove_feature_value(
        &self,
        product_id: Uuid,
        feature_id: Uuid,
    ) -> Result<RecalculationReport, AppError> {
        let mut tx = self.store.begin().await?;
        let row = tx
            .find_feature_value(product_id, feature_id)
            .await?
            .ok_or(AppError::not_found("Valor de característica"))?;
        tx.delete_feature_value(row.id).await?;

        let report = self
            .recalculator
            .recalculate_dependents(&mut tx, PriceSource::Product(product_id))
            .await?;
        tx.commit().await?;
        Ok(report)
    }

    // ---
    // Variantes
    // ---
    // `price_base`/`price` nunca vêm do utilizador: são recalculados em cada gravação.

    #[tracing::instrument(skip(self))]
    pub async fn create_variant(&self, input: VariantInput) -> Result<Variant, AppError> {
        input.validate()?;
        let mut tx = self.store.begin().await?;
        let product = tx
            .get_product(input.product_id)
            .await?
            .ok_or(AppError::not_found("Produto"))?;

        let now = Utc::now();
        let mut variant = Variant {
            id: Uuid::new_v4(),
            product_id: product.id,
            code: input.code,
            ean13: input.ean13,
            local_base_price: input.local_base_price,
            local_packing_cost: input.local_packing_cost,
            local_weight: input.local_weight,
            price_base: Default::default(),
            price: Default::default(),
            offer: input.offer,
            outstanding: input.outstanding,
            most_sold: input.most_sold,
            sample: input.sample,
            texts: Json(input.texts),
            created_at: now,
            updated_at: now,
        };
        self.recalculator.apply_to(&mut tx, &mut variant, &product).await?;
        tx.insert_variant(&variant).await?;
        tx.commit().await?;
        Ok(variant)
    }

    /// O produto dono não muda; `input.product_id` tem de coincidir.
    #[tracing::instrument(skip(self))]
    pub async fn update_variant(&self, id: Uuid, input: VariantInput) -> Result<Variant, AppError> {
        input.validate()?;
        let mut tx = self.store.begin().await?;
        let old = tx.get_variant(id).await?.ok_or(AppError::not_found("Variante"))?;
        if old.product_id != input.product_id {
            return Err(AppError::not_found("Variante"));
        }
        let product = tx
            .get_product(old.product_id)
            .await?
            .ok_or(AppError::not_found("Produto"))?;

        let mut variant = Variant {
            code: input.code,
            ean13: input.ean13,
            local_base_price: input.local_base_price,
            local_packing_cost: input.local_packing_cost,
            local_weight: input.local_weight,
            offer: input.offer,
            outstanding: input.outstanding,
            most_sold: input.most_sold,
            sample: input.sample,
            texts: Json(input.texts),
            updated_at: Utc::now(),
            ..old
        };
        self.recalculator.apply_to(&mut tx, &mut variant, &product).await?;
        tx.update_variant(&variant).await?;
        tx.commit().await?;
        Ok(variant)
    }

    /// Preço calculado na hora, opcionalmente com o recargo de equivalência.
    pub async fn variant_price(&self, id: Uuid, with_surcharge: bool) -> Result<PriceBreakdown, AppError> {
        let mut tx = self.store.begin().await?;
        let variant = tx.get_variant(id).await?.ok_or(AppError::not_found("Variante"))?;
        let product = tx
            .get_product(variant.product_id)
            .await?
            .ok_or(AppError::not_found("Produto"))?;
        self.recalculator
            .price_variant(&mut tx, &variant, &product, with_surcharge)
            .await
    }

    async fn attribute_for_variant(
        tx: &mut S::Tx,
        variant: &Variant,
        attribute_id: Uuid,
    ) -> Result<Attribute, AppError> {
        let product = tx
            .get_product(variant.product_id)
            .await?
            .ok_or(AppError::not_found("Produto"))?;
        let attribute = tx
            .get_attribute(attribute_id)
            .await?
            .ok_or(AppError::not_found("Atributo"))?;
        check_scope(RuleKind::Attribute, &attribute.core, &product)?;
        Ok(attribute)
    }

    /// Adiciona um valor de atributo. Só um por (variante, atributo).
    #[tracing::instrument(skip(self))]
    pub async fn add_attribute_value(
        &self,
        variant_id: Uuid,
        input: RuleValueInput,
    ) -> Result<(VariantAttributeValue, Variant), AppError> {
        input.validate()?;
        let mut tx = self.store.begin().await?;
        let variant = tx.get_variant(variant_id).await?.ok_or(AppError::not_found("Variante"))?;
        let attribute = Self::attribute_for_variant(&mut tx, &variant, input.rule_id).await?;

        if tx.find_attribute_value(variant.id, attribute.id).await?.is_some() {
            return Err(AppError::DuplicateAttributeValue);
        }
        let value = normalize_value(&mut tx, RuleKind::Attribute, &attribute.core, &input.value).await?;

        let now = Utc::now();
        let row = VariantAttributeValue {
            id: Uuid::new_v4(),
            variant_id: variant.id,
            attribute_id: attribute.id,
            value,
            created_at: now,
            updated_at: now,
        };
        tx.insert_attribute_value(&row).await?;
        self.recalculator.refresh_variant(&mut tx, variant.id).await?;

        let variant = tx.get_variant(variant.id).await?.ok_or(AppError::not_found("Variante"))?;
        tx.commit().await?;
        Ok((row, variant))
    }

    /// Troca o valor escolhido. Também conta como "mais recente" para a
    /// ordem de avaliação.
    #[tracing::instrument(skip(self))]
    pub async fn update_attribute_value(
        &self,
        value_id: Uuid,
        input: ValueUpdateInput,
    ) -> Result<(VariantAttributeValue, Variant), AppError> {
        input.validate()?;
        let mut tx = self.store.begin().await?;
        let row = tx
            .get_attribute_value(value_id)
            .await?
            .ok_or(AppError::not_found("Valor de atributo"))?;
        let variant = tx
            .get_variant(row.variant_id)
            .await?
            .ok_or(AppError::not_found("Variante"))?;
        let attribute = Self::attribute_for_variant(&mut tx, &variant, row.attribute_id).await?;
        let value = normalize_value(&mut tx, RuleKind::Attribute, &attribute.core, &input.value).await?;

        let row = VariantAttributeValue {
            value,
            updated_at: Utc::now(),
            ..row
        };
        tx.update_attribute_value(&row).await?;
        self.recalculator.refresh_variant(&mut tx, variant.id).await?;

        let variant = tx.get_variant(variant.id).await?.ok_or(AppError::not_found("Variante"))?;
        tx.commit().await?;
        Ok((row, variant))
    }

    #[tracing::instrument(skip(self))]
    pub async fn remove_attribute_value(&self, value_id: Uuid) -> Result<Variant, AppError> {
        let mut tx = self.store.begin().await?;
        let row = tx
            .get_attribute_value(value_id)
            .await?
            .ok_or(AppError::not_found("Valor de atributo"))?;
        tx.delete_attribute_value(row.id).await?;
        self.recalculator.refresh_variant(&mut tx, row.variant_id).await?;

        let variant = tx
            .get_variant(row.variant_id)
            .await?
            .ok_or(AppError::not_found("Variante"))?;
        tx.commit().await?;
        Ok(variant)
    }

    async fn describe_value(
        tx: &mut S::Tx,
        value_kind: ValueKind,
        value_id: Uuid,
        rule_id: Uuid,
        value: String,
        lang: Language,
    ) -> Result<ValueDisplay, AppError> {
        let option = match value_kind {
            ValueKind::OptionList => match Uuid::parse_str(&value) {
                Ok(option_id) => tx.get_option_value(option_id).await?,
                Err(_) => None,
            },
            _ => None,
        };
        let display = display_value(value_kind, &value, option.as_ref(), lang);
        Ok(ValueDisplay {
            value_id,
            rule_id,
            value,
            display,
        })
    }

    /// Variante com nome traduzido e valores prontos a mostrar.
    pub async fn describe_variant(&self, id: Uuid, lang: Language) -> Result<VariantView, AppError> {
        let mut tx = self.store.begin().await?;
        let variant = tx.get_variant(id).await?.ok_or(AppError::not_found("Variante"))?;
        let product = tx
            .get_product(variant.product_id)
            .await?
            .ok_or(AppError::not_found("Produto"))?;

        let mut attributes = Vec::new();
        for applied in tx.list_attribute_rules(variant.id).await? {
            let (Some(row), Some(rule)) = (
                tx.get_attribute_value(applied.value_id).await?,
                tx.get_attribute(applied.rule_id).await?,
            ) else {
                continue;
            };
            attributes.push(
                Self::describe_value(&mut tx, rule.core.value_kind, row.id, rule.id, row.value, lang)
                    .await?,
            );
        }

        let mut features = Vec::new();
        for applied in tx.list_feature_rules(product.id).await? {
            let (Some(row), Some(rule)) = (
                tx.find_feature_value(product.id, applied.rule_id).await?,
                tx.get_feature(applied.rule_id).await?,
            ) else {
                continue;
            };
            features.push(
                Self::describe_value(&mut tx, rule.core.value_kind, row.id, rule.id, row.value, lang)
                    .await?,
            );
        }

        Ok(VariantView {
            display_name: variant.display_name(&product, lang),
            sellable: variant.is_sellable(&product),
            variant,
            attributes,
            features,
        })
    }

    // ---
    // Remoção protegida
    // ---

    /// Apaga o registo se nada depender dele; caso contrário devolve
    /// `BlockedDeletion` com a primeira relação encontrada e não toca em nada.
    #[tracing::instrument(skip(self))]
    pub async fn delete_entity(&self, entity: CatalogEntity, id: Uuid) -> Result<(), AppError> {
        let mut tx = self.store.begin().await?;
        if !tx.exists(entity, id).await? {
            return Err(AppError::not_found(entity.label()));
        }

        for dependency in entity.dependencies() {
            if tx.count_dependents(*dependency, id).await? > 0 {
                tracing::warn!(
                    entity = entity.label(),
                    %id,
                    relation = dependency.label(),
                    "Remoção recusada: registo com dependentes"
                );
                return Err(AppError::BlockedDeletion {
                    entity: entity.label(),
                    relation: dependency.label(),
                });
            }
        }

        let was_default_tax = match entity {
            CatalogEntity::Tax => tx.get_tax(id).await?.is_some_and(|t| t.is_default),
            _ => false,
        };

        tx.delete(entity, id).await?;

        // O padrão passa para o imposto restante de menor nome.
        if was_default_tax {
            if let Some(mut next) = tx.first_tax_by_name().await? {
                next.is_default = true;
                next.updated_at = Utc::now();
                tx.update_tax(&next).await?;
                tracing::info!(tax_id = %next.id, "Novo tipo de imposto padrão");
            }
        }

        tx.commit().await?;
        tracing::info!(entity = entity.label(), %id, "Registo apagado");
        Ok(())
    }
}
