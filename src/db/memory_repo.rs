// src/db/memory_repo.rs

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use anyhow::anyhow;
use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::store::{CatalogEntity, CatalogStore, CatalogTx, Dependency, PriceSource},
    models::{
        catalog::{Brand, Category, Family, OptionGroup, OptionValue, Subcategory},
        image::{ImageFlag, ProductImage},
        product::{Product, ProductFeatureValue, Variant, VariantAttributeValue},
        rule::{AppliedRule, Attribute, Feature, SpecialFeature},
        stock::{StockTotals, UniqueStockUnit},
        tax::TaxRate,
    },
};

// ---------------------------------------------------------------------------
// Store em memória: mesmo contrato do Postgres, usado nos testes e para
// correr o serviço sem base de dados.
//
// `begin` fica com o lock até ao fim do tx e trabalha sobre uma cópia do
// estado; `commit` troca a cópia pelo original. Sem `commit`, a cópia é
// descartada (rollback). As constraints únicas da migração são repetidas aqui.
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct CatalogState {
    pub taxes: BTreeMap<Uuid, TaxRate>,
    pub families: BTreeMap<Uuid, Family>,
    pub categories: BTreeMap<Uuid, Category>,
    pub subcategories: BTreeMap<Uuid, Subcategory>,
    pub brands: BTreeMap<Uuid, Brand>,
    pub option_groups: BTreeMap<Uuid, OptionGroup>,
    pub option_values: BTreeMap<Uuid, OptionValue>,
    pub attributes: BTreeMap<Uuid, Attribute>,
    pub features: BTreeMap<Uuid, Feature>,
    pub special_features: BTreeMap<Uuid, SpecialFeature>,
    pub products: BTreeMap<Uuid, Product>,
    pub variants: BTreeMap<Uuid, Variant>,
    pub attribute_values: BTreeMap<Uuid, VariantAttributeValue>,
    pub feature_values: BTreeMap<Uuid, ProductFeatureValue>,
    pub stock_units: BTreeMap<Uuid, UniqueStockUnit>,
    pub images: BTreeMap<Uuid, ProductImage>,
}

#[derive(Clone, Default)]
pub struct MemoryCatalogStore {
    state: Arc<Mutex<CatalogState>>,
    writes: Arc<std::sync::atomic::AtomicUsize>,
}

impl MemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cópia do último estado confirmado.
    pub async fn snapshot(&self) -> CatalogState {
        self.state.lock().await.clone()
    }

    /// Número de escritas em variantes confirmadas até agora.
    pub fn variant_writes(&self) -> usize {
        self.writes.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[async_trait]
impl CatalogStore for MemoryCatalogStore {
    type Tx = MemoryCatalogTx;

    async fn begin(&self) -> Result<MemoryCatalogTx, AppError> {
        let guard = self.state.clone().lock_owned().await;
        let work = guard.clone();
        Ok(MemoryCatalogTx {
            guard,
            work,
            writes: self.writes.clone(),
            pending_writes: 0,
        })
    }
}

pub struct MemoryCatalogTx {
    guard: OwnedMutexGuard<CatalogState>,
    work: CatalogState,
    writes: Arc<std::sync::atomic::AtomicUsize>,
    pending_writes: usize,
}

// --- Helpers de constraints ---

fn code_taken<'a, I>(mut codes: I, code: Option<&str>) -> Result<(), AppError>
where
    I: Iterator<Item = Option<&'a str>>,
{
    if let Some(code) = code {
        if codes.any(|other| other == Some(code)) {
            return Err(AppError::CodeAlreadyExists(code.to_string()));
        }
    }
    Ok(())
}

fn missing(table: &str) -> AppError {
    AppError::InternalServerError(anyhow!("registo inexistente em {table}"))
}

fn replace<T>(map: &mut BTreeMap<Uuid, T>, id: Uuid, row: T, table: &str) -> Result<(), AppError> {
    match map.get_mut(&id) {
        Some(slot) => {
            *slot = row;
            Ok(())
        }
        None => Err(missing(table)),
    }
}

impl MemoryCatalogTx {
    fn check_unique_value(&self, unit: &UniqueStockUnit) -> Result<(), AppError> {
        let Some(unique_value) = unit.unique_value.as_deref() else {
            return Ok(());
        };
        let clash = self.work.stock_units.values().any(|u| {
            u.id != unit.id
                && u.product_id == unit.product_id
                && u.unique_value.as_deref() == Some(unique_value)
        });
        if clash {
            return Err(AppError::DuplicateUniqueValue {
                value: unique_value.to_string(),
            });
        }
        Ok(())
    }

    fn check_single_default_tax(&self) -> Result<(), AppError> {
        if self.work.taxes.values().filter(|t| t.is_default).count() > 1 {
            return Err(AppError::InternalServerError(anyhow!(
                "mais de um tipo de imposto marcado como padrão"
            )));
        }
        Ok(())
    }

    fn variants_of_products(&self, products: &BTreeSet<Uuid>) -> Vec<Uuid> {
        self.work
            .variants
            .values()
            .filter(|v| products.contains(&v.product_id))
            .map(|v| v.id)
            .collect()
    }
}

#[async_trait]
impl CatalogTx for MemoryCatalogTx {
    async fn commit(mut self) -> Result<(), AppError> {
        *self.guard = self.work;
        self.writes
            .fetch_add(self.pending_writes, std::sync::atomic::Ordering::SeqCst);
        Ok(())
    }

    // --- Impostos ---

    async fn get_tax(&mut self, id: Uuid) -> Result<Option<TaxRate>, AppError> {
        Ok(self.work.taxes.get(&id).cloned())
    }

    async fn default_tax(&mut self) -> Result<Option<TaxRate>, AppError> {
        Ok(self.work.taxes.values().find(|t| t.is_default).cloned())
    }

    async fn first_tax_by_name(&mut self) -> Result<Option<TaxRate>, AppError> {
        Ok(self
            .work
            .taxes
            .values()
            .min_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)))
            .cloned())
    }

    async fn insert_tax(&mut self, tax: &TaxRate) -> Result<(), AppError> {
        code_taken(self.work.taxes.values().map(|t| Some(t.name.as_str())), Some(tax.name.as_str()))?;
        self.work.taxes.insert(tax.id, tax.clone());
        self.check_single_default_tax()
    }

    async fn update_tax(&mut self, tax: &TaxRate) -> Result<(), AppError> {
        code_taken(
            self.work
                .taxes
                .values()
                .filter(|t| t.id != tax.id)
                .map(|t| Some(t.name.as_str())),
            Some(tax.name.as_str()),
        )?;
        replace(&mut self.work.taxes, tax.id, tax.clone(), "tax_rates")?;
        self.check_single_default_tax()
    }

    async fn clear_default_taxes(&mut self, except: Uuid) -> Result<(), AppError> {
        for tax in self.work.taxes.values_mut().filter(|t| t.id != except) {
            tax.is_default = false;
        }
        Ok(())
    }

    // --- Taxonomia ---

    async fn get_family(&mut self, id: Uuid) -> Result<Option<Family>, AppError> {
        Ok(self.work.families.get(&id).cloned())
    }

    async fn insert_family(&mut self, family: &Family) -> Result<(), AppError> {
        code_taken(
            self.work.families.values().map(|f| f.code.as_deref()),
            family.code.as_deref(),
        )?;
        self.work.families.insert(family.id, family.clone());
        Ok(())
    }

    async fn get_category(&mut self, id: Uuid) -> Result<Option<Category>, AppError> {
        Ok(self.work.categories.get(&id).cloned())
    }

    async fn insert_category(&mut self, category: &Category) -> Result<(), AppError> {
        code_taken(
            self.work.categories.values().map(|c| c.code.as_deref()),
            category.code.as_deref(),
        )?;
        self.work.categories.insert(category.id, category.clone());
        Ok(())
    }

    async fn get_subcategory(&mut self, id: Uuid) -> Result<Option<Subcategory>, AppError> {
        Ok(self.work.subcategories.get(&id).cloned())
    }

    async fn insert_subcategory(&mut self, subcategory: &Subcategory) -> Result<(), AppError> {
        code_taken(
            self.work.subcategories.values().map(|s| s.code.as_deref()),
            subcategory.code.as_deref(),
        )?;
        self.work.subcategories.insert(subcategory.id, subcategory.clone());
        Ok(())
    }

    async fn get_brand(&mut self, id: Uuid) -> Result<Option<Brand>, AppError> {
        Ok(self.work.brands.get(&id).cloned())
    }

    async fn insert_brand(&mut self, brand: &Brand) -> Result<(), AppError> {
        self.work.brands.insert(brand.id, brand.clone());
        Ok(())
    }

    async fn get_option_group(&mut self, id: Uuid) -> Result<Option<OptionGroup>, AppError> {
        Ok(self.work.option_groups.get(&id).cloned())
    }

    async fn insert_option_group(&mut self, group: &OptionGroup) -> Result<(), AppError> {
        code_taken(
            self.work.option_groups.values().map(|g| Some(g.name.as_str())),
            Some(group.name.as_str()),
        )?;
        self.work.option_groups.insert(group.id, group.clone());
        Ok(())
    }

    async fn get_option_value(&mut self, id: Uuid) -> Result<Option<OptionValue>, AppError> {
        Ok(self.work.option_values.get(&id).cloned())
    }

    async fn insert_option_value(&mut self, option: &OptionValue) -> Result<(), AppError> {
        self.work.option_values.insert(option.id, option.clone());
        Ok(())
    }

    // --- Regras de preço ---

    async fn get_attribute(&mut self, id: Uuid) -> Result<Option<Attribute>, AppError> {
        Ok(self.work.attributes.get(&id).cloned())
    }

    async fn insert_attribute(&mut self, rule: &Attribute) -> Result<(), AppError> {
        self.work.attributes.insert(rule.id, rule.clone());
        Ok(())
    }

    async fn update_attribute(&mut self, rule: &Attribute) -> Result<(), AppError> {
        replace(&mut self.work.attributes, rule.id, rule.clone(), "attributes")
    }

    async fn get_feature(&mut self, id: Uuid) -> Result<Option<Feature>, AppError> {
        Ok(self.work.features.get(&id).cloned())
    }

    async fn insert_feature(&mut self, rule: &Feature) -> Result<(), AppError> {
        self.work.features.insert(rule.id, rule.clone());
        Ok(())
    }

    async fn update_feature(&mut self, rule: &Feature) -> Result<(), AppError> {
        replace(&mut self.work.features, rule.id, rule.clone(), "features")
    }

    async fn get_special_feature(&mut self, id: Uuid) -> Result<Option<SpecialFeature>, AppError> {
        Ok(self.work.special_features.get(&id).cloned())
    }

    async fn insert_special_feature(&mut self, rule: &SpecialFeature) -> Result<(), AppError> {
        self.work.special_features.insert(rule.id, rule.clone());
        Ok(())
    }

    async fn update_special_feature(&mut self, rule: &SpecialFeature) -> Result<(), AppError> {
        replace(&mut self.work.special_features, rule.id, rule.clone(), "special_features")
    }

    // --- Produtos e variantes ---

    async fn get_product(&mut self, id: Uuid) -> Result<Option<Product>, AppError> {
        Ok(self.work.products.get(&id).cloned())
    }

    async fn insert_product(&mut self, product: &Product) -> Result<(), AppError> {
        code_taken(
            self.work.products.values().map(|p| Some(p.code.as_str())),
            Some(product.code.as_str()),
        )?;
        self.work.products.insert(product.id, product.clone());
        Ok(())
    }

    async fn update_product(&mut self, product: &Product) -> Result<(), AppError> {
        code_taken(
            self.work
                .products
                .values()
                .filter(|p| p.id != product.id)
                .map(|p| Some(p.code.as_str())),
            Some(product.code.as_str()),
        )?;
        replace(&mut self.work.products, product.id, product.clone(), "products")
    }

    async fn get_variant(&mut self, id: Uuid) -> Result<Option<Variant>, AppError> {
        Ok(self.work.variants.get(&id).cloned())
    }

    async fn insert_variant(&mut self, variant: &Variant) -> Result<(), AppError> {
        code_taken(
            self.work.variants.values().map(|v| v.code.as_deref()),
            variant.code.as_deref(),
        )?;
        self.work.variants.insert(variant.id, variant.clone());
        self.pending_writes += 1;
        Ok(())
    }

    async fn update_variant(&mut self, variant: &Variant) -> Result<(), AppError> {
        code_taken(
            self.work
                .variants
                .values()
                .filter(|v| v.id != variant.id)
                .map(|v| v.code.as_deref()),
            variant.code.as_deref(),
        )?;
        replace(&mut self.work.variants, variant.id, variant.clone(), "variants")?;
        self.pending_writes += 1;
        Ok(())
    }

    // --- Valores de atributos e características ---

    async fn get_attribute_value(&mut self, id: Uuid) -> Result<Option<VariantAttributeValue>, AppError> {
        Ok(self.work.attribute_values.get(&id).cloned())
    }

    async fn find_attribute_value(
        &mut self,
        variant_id: Uuid,
        attribute_id: Uuid,
    ) -> Result<Option<VariantAttributeValue>, AppError> {
        Ok(self
            .work
            .attribute_values
            .values()
            .find(|v| v.variant_id == variant_id && v.attribute_id == attribute_id)
            .cloned())
    }

    async fn insert_attribute_value(&mut self, value: &VariantAttributeValue) -> Result<(), AppError> {
        let taken = self
            .work
            .attribute_values
            .values()
            .any(|v| v.variant_id == value.variant_id && v.attribute_id == value.attribute_id);
        if taken {
            return Err(AppError::DuplicateAttributeValue);
        }
        self.work.attribute_values.insert(value.id, value.clone());
        Ok(())
    }

    async fn update_attribute_value(&mut self, value: &VariantAttributeValue) -> Result<(), AppError> {
        replace(
            &mut self.work.attribute_values,
            value.id,
            value.clone(),
            "variant_attribute_values",
        )
    }

    async fn delete_attribute_value(&mut self, id: Uuid) -> Result<(), AppError> {
        self.work.attribute_values.remove(&id);
        Ok(())
    }

    async fn find_feature_value(
        &mut self,
        product_id: Uuid,
        feature_id: Uuid,
    ) -> Result<Option<ProductFeatureValue>, AppError> {
        Ok(self
            .work
            .feature_values
            .values()
            .find(|v| v.product_id == product_id && v.feature_id == feature_id)
            .cloned())
    }

    async fn insert_feature_value(&mut self, value: &ProductFeatureValue) -> Result<(), AppError> {
        let taken = self
            .work
            .feature_values
            .values()
            .any(|v| v.product_id == value.product_id && v.feature_id == value.feature_id);
        if taken {
            return Err(AppError::InternalServerError(anyhow!(
                "valor de característica duplicado para o produto"
            )));
        }
        self.work.feature_values.insert(value.id, value.clone());
        Ok(())
    }

    async fn update_feature_value(&mut self, value: &ProductFeatureValue) -> Result<(), AppError> {
        replace(
            &mut self.work.feature_values,
            value.id,
            value.clone(),
            "product_feature_values",
        )
    }

    async fn delete_feature_value(&mut self, id: Uuid) -> Result<(), AppError> {
        self.work.feature_values.remove(&id);
        Ok(())
    }

    async fn list_attribute_rules(&mut self, variant_id: Uuid) -> Result<Vec<AppliedRule>, AppError> {
        let mut rules: Vec<AppliedRule> = self
            .work
            .attribute_values
            .values()
            .filter(|v| v.variant_id == variant_id)
            .filter_map(|v| {
                self.work.attributes.get(&v.attribute_id).map(|a| AppliedRule {
                    value_id: v.id,
                    rule_id: a.id,
                    price: a.core.price,
                    price_mode: a.core.price_mode,
                    updated_at: v.updated_at,
                })
            })
            .collect();
        rules.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(a.value_id.cmp(&b.value_id)));
        Ok(rules)
    }

    async fn list_feature_rules(&mut self, product_id: Uuid) -> Result<Vec<AppliedRule>, AppError> {
        let mut rules: Vec<AppliedRule> = self
            .work
            .feature_values
            .values()
            .filter(|v| v.product_id == product_id)
            .filter_map(|v| {
                self.work.features.get(&v.feature_id).map(|f| AppliedRule {
                    value_id: v.id,
                    rule_id: f.id,
                    price: f.core.price,
                    price_mode: f.core.price_mode,
                    updated_at: v.updated_at,
                })
            })
            .collect();
        rules.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(a.value_id.cmp(&b.value_id)));
        Ok(rules)
    }

    // --- Propagação e remoção ---

    async fn dependent_variant_ids(&mut self, source: PriceSource) -> Result<Vec<Uuid>, AppError> {
        let ids: Vec<Uuid> = match source {
            PriceSource::Attribute(id) => self
                .work
                .attribute_values
                .values()
                .filter(|v| v.attribute_id == id)
                .map(|v| v.variant_id)
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect(),
            PriceSource::Feature(id) => {
                let products = self
                    .work
                    .feature_values
                    .values()
                    .filter(|v| v.feature_id == id)
                    .map(|v| v.product_id)
                    .collect();
                self.variants_of_products(&products)
            }
            PriceSource::SpecialFeature(id) => {
                let products = self
                    .work
                    .products
                    .values()
                    .filter(|p| p.special_feature_id == Some(id))
                    .map(|p| p.id)
                    .collect();
                self.variants_of_products(&products)
            }
            PriceSource::Product(id) => self.variants_of_products(&BTreeSet::from([id])),
            PriceSource::Tax(id) => {
                let products = self
                    .work
                    .products
                    .values()
                    .filter(|p| p.tax_id == id)
                    .map(|p| p.id)
                    .collect();
                self.variants_of_products(&products)
            }
        };
        Ok(ids)
    }

    async fn count_dependents(&mut self, dependency: Dependency, id: Uuid) -> Result<i64, AppError> {
        use Dependency::*;
        let s = &self.work;
        let n = match dependency {
            ProductsByTax => s.products.values().filter(|p| p.tax_id == id).count(),
            ProductsByFamily => s.products.values().filter(|p| p.family_id == id).count(),
            ProductsByCategory => s.products.values().filter(|p| p.category_id == id).count(),
            ProductsBySubcategory => s.products.values().filter(|p| p.subcategory_id == id).count(),
            ProductsByBrand => s.products.values().filter(|p| p.brand_id == Some(id)).count(),
            ProductsBySpecialFeature => s
                .products
                .values()
                .filter(|p| p.special_feature_id == Some(id))
                .count(),
            FeaturesByFamily => s.features.values().filter(|r| r.core.family_id == Some(id)).count(),
            FeaturesByCategory => s.features.values().filter(|r| r.core.category_id == Some(id)).count(),
            FeaturesByOptionGroup => s
                .features
                .values()
                .filter(|r| r.core.option_group_id == Some(id))
                .count(),
            AttributesByFamily => s.attributes.values().filter(|r| r.core.family_id == Some(id)).count(),
            AttributesByCategory => s
                .attributes
                .values()
                .filter(|r| r.core.category_id == Some(id))
                .count(),
            AttributesByOptionGroup => s
                .attributes
                .values()
                .filter(|r| r.core.option_group_id == Some(id))
                .count(),
            SpecialFeaturesByFamily => s
                .special_features
                .values()
                .filter(|r| r.core.family_id == Some(id))
                .count(),
            SpecialFeaturesByCategory => s
                .special_features
                .values()
                .filter(|r| r.core.category_id == Some(id))
                .count(),
            SpecialFeaturesByOptionGroup => s
                .special_features
                .values()
                .filter(|r| r.core.option_group_id == Some(id))
                .count(),
            CategoriesByFamily => s.categories.values().filter(|c| c.family_id == id).count(),
            SubcategoriesByCategory => s.subcategories.values().filter(|c| c.category_id == id).count(),
            OptionValuesByGroup => s.option_values.values().filter(|o| o.group_id == id).count(),
            VariantValuesByAttribute => s.attribute_values.values().filter(|v| v.attribute_id == id).count(),
            ChildrenByAttribute => s.attributes.values().filter(|a| a.parent_id == Some(id)).count(),
            ProductValuesByFeature => s.feature_values.values().filter(|v| v.feature_id == id).count(),
            VariantsByProduct => s.variants.values().filter(|v| v.product_id == id).count(),
            ImagesByProduct => s.images.values().filter(|i| i.product_id == id).count(),
            FeatureValuesByProduct => s.feature_values.values().filter(|v| v.product_id == id).count(),
            AttributeValuesByVariant => s.attribute_values.values().filter(|v| v.variant_id == id).count(),
            StockUnitsByVariant => s.stock_units.values().filter(|u| u.variant_id == id).count(),
        };
        Ok(n as i64)
    }

    async fn exists(&mut self, entity: CatalogEntity, id: Uuid) -> Result<bool, AppError> {
        let s = &self.work;
        let found = match entity {
            CatalogEntity::Tax => s.taxes.contains_key(&id),
            CatalogEntity::Family => s.families.contains_key(&id),
            CatalogEntity::Category => s.categories.contains_key(&id),
            CatalogEntity::Subcategory => s.subcategories.contains_key(&id),
            CatalogEntity::Brand => s.brands.contains_key(&id),
            CatalogEntity::OptionGroup => s.option_groups.contains_key(&id),
            CatalogEntity::OptionValue => s.option_values.contains_key(&id),
            CatalogEntity::Attribute => s.attributes.contains_key(&id),
            CatalogEntity::Feature => s.features.contains_key(&id),
            CatalogEntity::SpecialFeature => s.special_features.contains_key(&id),
            CatalogEntity::Product => s.products.contains_key(&id),
            CatalogEntity::Variant => s.variants.contains_key(&id),
            CatalogEntity::StockUnit => s.stock_units.contains_key(&id),
        };
        Ok(found)
    }

    async fn delete(&mut self, entity: CatalogEntity, id: Uuid) -> Result<(), AppError> {
        let s = &mut self.work;
        match entity {
            CatalogEntity::Tax => {
                s.taxes.remove(&id);
            }
            CatalogEntity::Family => {
                s.families.remove(&id);
            }
            CatalogEntity::Category => {
                s.categories.remove(&id);
            }
            CatalogEntity::Subcategory => {
                s.subcategories.remove(&id);
            }
            CatalogEntity::Brand => {
                s.brands.remove(&id);
            }
            CatalogEntity::OptionGroup => {
                s.option_groups.remove(&id);
            }
            CatalogEntity::OptionValue => {
                s.option_values.remove(&id);
            }
            CatalogEntity::Attribute => {
                s.attributes.remove(&id);
            }
            CatalogEntity::Feature => {
                s.features.remove(&id);
            }
            CatalogEntity::SpecialFeature => {
                s.special_features.remove(&id);
            }
            CatalogEntity::Product => {
                s.products.remove(&id);
            }
            CatalogEntity::Variant => {
                s.variants.remove(&id);
            }
            CatalogEntity::StockUnit => {
                s.stock_units.remove(&id);
            }
        }
        Ok(())
    }

    // --- Unidades de stock ---

    async fn get_stock_unit(&mut self, id: Uuid) -> Result<Option<UniqueStockUnit>, AppError> {
        Ok(self.work.stock_units.get(&id).cloned())
    }

    async fn insert_stock_unit(&mut self, unit: &UniqueStockUnit) -> Result<(), AppError> {
        self.check_unique_value(unit)?;
        self.work.stock_units.insert(unit.id, unit.clone());
        Ok(())
    }

    async fn update_stock_unit(&mut self, unit: &UniqueStockUnit) -> Result<(), AppError> {
        self.check_unique_value(unit)?;
        replace(&mut self.work.stock_units, unit.id, unit.clone(), "stock_units")
    }

    async fn find_unit_with_value(
        &mut self,
        product_id: Uuid,
        value: &str,
        exclude: Option<Uuid>,
    ) -> Result<Option<UniqueStockUnit>, AppError> {
        Ok(self
            .work
            .stock_units
            .values()
            .find(|u| {
                u.product_id == product_id
                    && u.value.as_deref() == Some(value)
                    && Some(u.id) != exclude
            })
            .cloned())
    }

    async fn list_product_units(&mut self, product_id: Uuid) -> Result<Vec<UniqueStockUnit>, AppError> {
        let mut units: Vec<UniqueStockUnit> = self
            .work
            .stock_units
            .values()
            .filter(|u| u.product_id == product_id)
            .cloned()
            .collect();
        units.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));
        Ok(units)
    }

    async fn stock_totals(&mut self, variant_id: Uuid) -> Result<StockTotals, AppError> {
        let totals = self
            .work
            .stock_units
            .values()
            .filter(|u| u.variant_id == variant_id)
            .fold(StockTotals::default(), |acc, u| StockTotals {
                stock_original: acc.stock_original + u.stock_original,
                stock_real: acc.stock_real + u.stock_real,
                stock_locked: acc.stock_locked + u.stock_locked,
            });
        Ok(totals)
    }

    // --- Imagens ---

    async fn get_image(&mut self, id: Uuid) -> Result<Option<ProductImage>, AppError> {
        Ok(self.work.images.get(&id).cloned())
    }

    async fn insert_image(&mut self, image: &ProductImage) -> Result<(), AppError> {
        self.work.images.insert(image.id, image.clone());
        Ok(())
    }

    async fn update_image(&mut self, image: &ProductImage) -> Result<(), AppError> {
        replace(&mut self.work.images, image.id, image.clone(), "product_images")
    }

    async fn delete_image(&mut self, id: Uuid) -> Result<(), AppError> {
        self.work.images.remove(&id);
        Ok(())
    }

    async fn list_images(&mut self, product_id: Uuid) -> Result<Vec<ProductImage>, AppError> {
        let mut images: Vec<ProductImage> = self
            .work
            .images
            .values()
            .filter(|i| i.product_id == product_id)
            .cloned()
            .collect();
        // Mesma ordem do SQL: sort_order (NULL no fim), criação, id.
        images.sort_by(|a, b| {
            (a.sort_order.is_none(), a.sort_order, a.created_at, a.id)
                .cmp(&(b.sort_order.is_none(), b.sort_order, b.created_at, b.id))
        });
        Ok(images)
    }

    async fn clear_image_flag(
        &mut self,
        product_id: Uuid,
        flag: ImageFlag,
        except: Uuid,
    ) -> Result<(), AppError> {
        for image in self
            .work
            .images
            .values_mut()
            .filter(|i| i.product_id == product_id && i.id != except)
        {
            flag.set(image, false);
        }
        Ok(())
    }
}
