// src/db/catalog_repo.rs

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::{
    common::{
        db_utils::{constraints, map_unique_violation},
        error::AppError,
    },
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

#[derive(Clone)]
pub struct PgCatalogStore {
    pool: PgPool,
}

impl PgCatalogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogStore for PgCatalogStore {
    type Tx = PgCatalogTx;

    async fn begin(&self) -> Result<PgCatalogTx, AppError> {
        let tx = self.pool.begin().await?;
        Ok(PgCatalogTx { tx })
    }
}

/// Unidade de trabalho sobre uma transação Postgres. Largar sem `commit`
/// faz rollback (comportamento do próprio `sqlx::Transaction`).
pub struct PgCatalogTx {
    tx: Transaction<'static, Postgres>,
}

// Só a constraint do próprio código vira CodeAlreadyExists; as outras
// (ex.: o índice do imposto padrão) seguem como erro de base de dados.
fn code_conflict<'a>(
    expected: &'static str,
    code: Option<&'a str>,
) -> impl FnOnce(&str) -> Option<AppError> + 'a {
    move |constraint: &str| {
        code.filter(|_| constraint == expected)
            .map(|c| AppError::CodeAlreadyExists(c.to_string()))
    }
}

#[async_trait]
impl CatalogTx for PgCatalogTx {
    async fn commit(self) -> Result<(), AppError> {
        self.tx.commit().await?;
        Ok(())
    }

    // ---
    // Impostos
    // ---

    async fn get_tax(&mut self, id: Uuid) -> Result<Option<TaxRate>, AppError> {
        let tax = sqlx::query_as::<_, TaxRate>("SELECT * FROM tax_rates WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(tax)
    }

    async fn default_tax(&mut self) -> Result<Option<TaxRate>, AppError> {
        let tax = sqlx::query_as::<_, TaxRate>("SELECT * FROM tax_rates WHERE is_default LIMIT 1")
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(tax)
    }

    async fn first_tax_by_name(&mut self) -> Result<Option<TaxRate>, AppError> {
        let tax = sqlx::query_as::<_, TaxRate>(
            "SELECT * FROM tax_rates ORDER BY name ASC, id ASC LIMIT 1",
        )
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(tax)
    }

    async fn insert_tax(&mut self, tax: &TaxRate) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO tax_rates (id, name, percentage, surcharge, is_default, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(tax.id)
        .bind(&tax.name)
        .bind(tax.percentage)
        .bind(tax.surcharge)
        .bind(tax.is_default)
        .bind(tax.created_at)
        .bind(tax.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| {
            map_unique_violation(e, code_conflict(constraints::TAX_NAME, Some(tax.name.as_str())))
        })?;
        Ok(())
    }

    async fn update_tax(&mut self, tax: &TaxRate) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE tax_rates
            SET name = $2, percentage = $3, surcharge = $4, is_default = $5, updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(tax.id)
        .bind(&tax.name)
        .bind(tax.percentage)
        .bind(tax.surcharge)
        .bind(tax.is_default)
        .bind(tax.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| {
            map_unique_violation(e, code_conflict(constraints::TAX_NAME, Some(tax.name.as_str())))
        })?;
        Ok(())
    }

    async fn clear_default_taxes(&mut self, except: Uuid) -> Result<(), AppError> {
        sqlx::query("UPDATE tax_rates SET is_default = FALSE WHERE is_default AND id <> $1")
            .bind(except)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    // ---
    // Taxonomia
    // ---

    async fn get_family(&mut self, id: Uuid) -> Result<Option<Family>, AppError> {
        let row = sqlx::query_as::<_, Family>("SELECT * FROM families WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(row)
    }

    async fn insert_family(&mut self, family: &Family) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO families (id, code, public, names, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(family.id)
        .bind(&family.code)
        .bind(family.public)
        .bind(&family.names)
        .bind(family.created_at)
        .bind(family.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| {
            map_unique_violation(e, code_conflict(constraints::FAMILY_CODE, family.code.as_deref()))
        })?;
        Ok(())
    }

    async fn get_category(&mut self, id: Uuid) -> Result<Option<Category>, AppError> {
        let row = sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(row)
    }

    async fn insert_category(&mut self, category: &Category) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO categories (id, family_id, code, public, names, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(category.id)
        .bind(category.family_id)
        .bind(&category.code)
        .bind(category.public)
        .bind(&category.names)
        .bind(category.created_at)
        .bind(category.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| {
            map_unique_violation(e, code_conflict(constraints::CATEGORY_CODE, category.code.as_deref()))
        })?;
        Ok(())
    }

    async fn get_subcategory(&mut self, id: Uuid) -> Result<Option<Subcategory>, AppError> {
        let row = sqlx::query_as::<_, Subcategory>("SELECT * FROM subcategories WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(row)
    }

    async fn insert_subcategory(&mut self, subcategory: &Subcategory) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO subcategories (id, category_id, code, public, names, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(subcategory.id)
        .bind(subcategory.category_id)
        .bind(&subcategory.code)
        .bind(subcategory.public)
        .bind(&subcategory.names)
        .bind(subcategory.created_at)
        .bind(subcategory.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| {
            map_unique_violation(e, code_conflict(constraints::SUBCATEGORY_CODE, subcategory.code.as_deref()))
        })?;
        Ok(())
    }

    async fn get_brand(&mut self, id: Uuid) -> Result<Option<Brand>, AppError> {
        let row = sqlx::query_as::<_, Brand>("SELECT * FROM brands WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(row)
    }

    async fn insert_brand(&mut self, brand: &Brand) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO brands (id, outstanding, names, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(brand.id)
        .bind(brand.outstanding)
        .bind(&brand.names)
        .bind(brand.created_at)
        .bind(brand.updated_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn get_option_group(&mut self, id: Uuid) -> Result<Option<OptionGroup>, AppError> {
        let row = sqlx::query_as::<_, OptionGroup>("SELECT * FROM option_groups WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(row)
    }

    async fn insert_option_group(&mut self, group: &OptionGroup) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO option_groups (id, kind, name, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(group.id)
        .bind(group.kind)
        .bind(&group.name)
        .bind(group.created_at)
        .bind(group.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| {
            map_unique_violation(e, code_conflict(constraints::OPTION_GROUP_NAME, Some(group.name.as_str())))
        })?;
        Ok(())
    }

    async fn get_option_value(&mut self, id: Uuid) -> Result<Option<OptionValue>, AppError> {
        let row = sqlx::query_as::<_, OptionValue>("SELECT * FROM option_values WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(row)
    }

    async fn insert_option_value(&mut self, option: &OptionValue) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO option_values (id, group_id, labels, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(option.id)
        .bind(option.group_id)
        .bind(&option.labels)
        .bind(option.created_at)
        .bind(option.updated_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    // ---
    // Regras de preço
    // ---
    // As três tabelas partilham as colunas do RuleCore; só muda o extra de cada uma.

    async fn get_attribute(&mut self, id: Uuid) -> Result<Option<Attribute>, AppError> {
        let row = sqlx::query_as::<_, Attribute>("SELECT * FROM attributes WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(row)
    }

    async fn insert_attribute(&mut self, rule: &Attribute) -> Result<(), AppError> {
        let c = &rule.core;
        sqlx::query(
            r#"
            INSERT INTO attributes (
                id, price, price_mode, value_kind, family_id, category_id, option_group_id,
                public, sort_order, description, parent_id, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(rule.id)
        .bind(c.price)
        .bind(c.price_mode)
        .bind(c.value_kind)
        .bind(c.family_id)
        .bind(c.category_id)
        .bind(c.option_group_id)
        .bind(c.public)
        .bind(c.sort_order)
        .bind(&c.description)
        .bind(rule.parent_id)
        .bind(rule.created_at)
        .bind(rule.updated_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn update_attribute(&mut self, rule: &Attribute) -> Result<(), AppError> {
        let c = &rule.core;
        sqlx::query(
            r#"
            UPDATE attributes
            SET price = $2, price_mode = $3, value_kind = $4, family_id = $5, category_id = $6,
                option_group_id = $7, public = $8, sort_order = $9, description = $10,
                parent_id = $11, updated_at = $12
            WHERE id = $1
            "#,
        )
        .bind(rule.id)
        .bind(c.price)
        .bind(c.price_mode)
        .bind(c.value_kind)
        .bind(c.family_id)
        .bind(c.category_id)
        .bind(c.option_group_id)
        .bind(c.public)
        .bind(c.sort_order)
        .bind(&c.description)
        .bind(rule.parent_id)
        .bind(rule.updated_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn get_feature(&mut self, id: Uuid) -> Result<Option<Feature>, AppError> {
        let row = sqlx::query_as::<_, Feature>("SELECT * FROM features WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(row)
    }

    async fn insert_feature(&mut self, rule: &Feature) -> Result<(), AppError> {
        let c = &rule.core;
        sqlx::query(
            r#"
            INSERT INTO features (
                id, price, price_mode, value_kind, family_id, category_id, option_group_id,
                public, sort_order, description, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(rule.id)
        .bind(c.price)
        .bind(c.price_mode)
        .bind(c.value_kind)
        .bind(c.family_id)
        .bind(c.category_id)
        .bind(c.option_group_id)
        .bind(c.public)
        .bind(c.sort_order)
        .bind(&c.description)
        .bind(rule.created_at)
        .bind(rule.updated_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn update_feature(&mut self, rule: &Feature) -> Result<(), AppError> {
        let c = &rule.core;
        sqlx::query(
            r#"
            UPDATE features
            SET price = $2, price_mode = $3, value_kind = $4, family_id = $5, category_id = $6,
                option_group_id = $7, public = $8, sort_order = $9, description = $10,
                updated_at = $11
            WHERE id = $1
            "#,
        )
        .bind(rule.id)
        .bind(c.price)
        .bind(c.price_mode)
        .bind(c.value_kind)
        .bind(c.family_id)
        .bind(c.category_id)
        .bind(c.option_group_id)
        .bind(c.public)
        .bind(c.sort_order)
        .bind(&c.description)
        .bind(rule.updated_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn get_special_feature(&mut self, id: Uuid) -> Result<Option<SpecialFeature>, AppError> {
        let row = sqlx::query_as::<_, SpecialFeature>("SELECT * FROM special_features WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(row)
    }

    async fn insert_special_feature(&mut self, rule: &SpecialFeature) -> Result<(), AppError> {
        let c = &rule.core;
        sqlx::query(
            r#"
            INSERT INTO special_features (
                id, price, price_mode, value_kind, family_id, category_id, option_group_id,
                public, sort_order, description, "unique", created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(rule.id)
        .bind(c.price)
        .bind(c.price_mode)
        .bind(c.value_kind)
        .bind(c.family_id)
        .bind(c.category_id)
        .bind(c.option_group_id)
        .bind(c.public)
        .bind(c.sort_order)
        .bind(&c.description)
        .bind(rule.unique)
        .bind(rule.created_at)
        .bind(rule.updated_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn update_special_feature(&mut self, rule: &SpecialFeature) -> Result<(), AppError> {
        let c = &rule.core;
        sqlx::query(
            r#"
            UPDATE special_features
            SET price = $2, price_mode = $3, value_kind = $4, family_id = $5, category_id = $6,
                option_group_id = $7, public = $8, sort_order = $9, description = $10,
                "unique" = $11, updated_at = $12
            WHERE id = $1
            "#,
        )
        .bind(rule.id)
        .bind(c.price)
        .bind(c.price_mode)
        .bind(c.value_kind)
        .bind(c.family_id)
        .bind(c.category_id)
        .bind(c.option_group_id)
        .bind(c.public)
        .bind(c.sort_order)
        .bind(&c.description)
        .bind(rule.unique)
        .bind(rule.updated_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    // ---
    // Produtos e variantes
    // ---

    async fn get_product(&mut self, id: Uuid) -> Result<Option<Product>, AppError> {
        let row = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(row)
    }

    async fn insert_product(&mut self, p: &Product) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO products (
                id, code, base_price, tax_id, special_feature_id, brand_id, family_id,
                category_id, subcategory_id, packing_cost, weight, public, of_sales,
                of_purchase, force_stock, caducable, texts, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)
            "#,
        )
        .bind(p.id)
        .bind(&p.code)
        .bind(p.base_price)
        .bind(p.tax_id)
        .bind(p.special_feature_id)
        .bind(p.brand_id)
        .bind(p.family_id)
        .bind(p.category_id)
        .bind(p.subcategory_id)
        .bind(p.packing_cost)
        .bind(p.weight)
        .bind(p.public)
        .bind(p.of_sales)
        .bind(p.of_purchase)
        .bind(p.force_stock)
        .bind(p.caducable)
        .bind(&p.texts)
        .bind(p.created_at)
        .bind(p.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| {
            map_unique_violation(e, |constraint| {
                (constraint == constraints::PRODUCT_CODE)
                    .then(|| AppError::CodeAlreadyExists(p.code.clone()))
            })
        })?;
        Ok(())
    }

    async fn update_product(&mut self, p: &Product) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE products
            SET code = $2, base_price = $3, tax_id = $4, special_feature_id = $5, brand_id = $6,
                family_id = $7, category_id = $8, subcategory_id = $9, packing_cost = $10,
                weight = $11, public = $12, of_sales = $13, of_purchase = $14,
                force_stock = $15, caducable = $16, texts = $17, updated_at = $18
            WHERE id = $1
            "#,
        )
        .bind(p.id)
        .bind(&p.code)
        .bind(p.base_price)
        .bind(p.tax_id)
        .bind(p.special_feature_id)
        .bind(p.brand_id)
        .bind(p.family_id)
        .bind(p.category_id)
        .bind(p.subcategory_id)
        .bind(p.packing_cost)
        .bind(p.weight)
        .bind(p.public)
        .bind(p.of_sales)
        .bind(p.of_purchase)
        .bind(p.force_stock)
        .bind(p.caducable)
        .bind(&p.texts)
        .bind(p.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| {
            map_unique_violation(e, |constraint| {
                (constraint == constraints::PRODUCT_CODE)
                    .then(|| AppError::CodeAlreadyExists(p.code.clone()))
            })
        })?;
        Ok(())
    }

    async fn get_variant(&mut self, id: Uuid) -> Result<Option<Variant>, AppError> {
        let row = sqlx::query_as::<_, Variant>("SELECT * FROM variants WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(row)
    }

    async fn insert_variant(&mut self, v: &Variant) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO variants (
                id, product_id, code, ean13, local_base_price, local_packing_cost, local_weight,
                price_base, price, offer, outstanding, most_sold, sample, texts,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            "#,
        )
        .bind(v.id)
        .bind(v.product_id)
        .bind(&v.code)
        .bind(&v.ean13)
        .bind(v.local_base_price)
        .bind(v.local_packing_cost)
        .bind(v.local_weight)
        .bind(v.price_base)
        .bind(v.price)
        .bind(v.offer)
        .bind(v.outstanding)
        .bind(v.most_sold)
        .bind(v.sample)
        .bind(&v.texts)
        .bind(v.created_at)
        .bind(v.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| {
            map_unique_violation(e, |constraint| {
                (constraint == constraints::VARIANT_CODE)
                    .then(|| AppError::CodeAlreadyExists(v.code.clone().unwrap_or_default()))
            })
        })?;
        Ok(())
    }

    async fn update_variant(&mut self, v: &Variant) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE variants
            SET code = $2, ean13 = $3, local_base_price = $4, local_packing_cost = $5,
                local_weight = $6, price_base = $7, price = $8, offer = $9, outstanding = $10,
                most_sold = $11, sample = $12, texts = $13, updated_at = $14
            WHERE id = $1
            "#,
        )
        .bind(v.id)
        .bind(&v.code)
        .bind(&v.ean13)
        .bind(v.local_base_price)
        .bind(v.local_packing_cost)
        .bind(v.local_weight)
        .bind(v.price_base)
        .bind(v.price)
        .bind(v.offer)
        .bind(v.outstanding)
        .bind(v.most_sold)
        .bind(v.sample)
        .bind(&v.texts)
        .bind(v.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| {
            map_unique_violation(e, |constraint| {
                (constraint == constraints::VARIANT_CODE)
                    .then(|| AppError::CodeAlreadyExists(v.code.clone().unwrap_or_default()))
            })
        })?;
        Ok(())
    }

    // ---
    // Valores de atributos e características
    // ---

    async fn get_attribute_value(&mut self, id: Uuid) -> Result<Option<VariantAttributeValue>, AppError> {
        let row = sqlx::query_as::<_, VariantAttributeValue>(
            "SELECT * FROM variant_attribute_values WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(row)
    }

    async fn find_attribute_value(
        &mut self,
        variant_id: Uuid,
        attribute_id: Uuid,
    ) -> Result<Option<VariantAttributeValue>, AppError> {
        let row = sqlx::query_as::<_, VariantAttributeValue>(
            "SELECT * FROM variant_attribute_values WHERE variant_id = $1 AND attribute_id = $2",
        )
        .bind(variant_id)
        .bind(attribute_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(row)
    }

    async fn insert_attribute_value(&mut self, value: &VariantAttributeValue) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO variant_attribute_values (id, variant_id, attribute_id, value, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(value.id)
        .bind(value.variant_id)
        .bind(value.attribute_id)
        .bind(&value.value)
        .bind(value.created_at)
        .bind(value.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| {
            map_unique_violation(e, |constraint| {
                (constraint == constraints::VARIANT_ATTRIBUTE).then_some(AppError::DuplicateAttributeValue)
            })
        })?;
        Ok(())
    }

    async fn update_attribute_value(&mut self, value: &VariantAttributeValue) -> Result<(), AppError> {
        sqlx::query("UPDATE variant_attribute_values SET value = $2, updated_at = $3 WHERE id = $1")
            .bind(value.id)
            .bind(&value.value)
            .bind(value.updated_at)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn delete_attribute_value(&mut self, id: Uuid) -> Result<(), AppError> {
        sqlx::query("DELETE FROM variant_attribute_values WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn find_feature_value(
        &mut self,
        product_id: Uuid,
        feature_id: Uuid,
    ) -> Result<Option<ProductFeatureValue>, AppError> {
        let row = sqlx::query_as::<_, ProductFeatureValue>(
            "SELECT * FROM product_feature_values WHERE product_id = $1 AND feature_id = $2",
        )
        .bind(product_id)
        .bind(feature_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(row)
    }

    async fn insert_feature_value(&mut self, value: &ProductFeatureValue) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO product_feature_values (id, product_id, feature_id, value, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(value.id)
        .bind(value.product_id)
        .bind(value.feature_id)
        .bind(&value.value)
        .bind(value.created_at)
        .bind(value.updated_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn update_feature_value(&mut self, value: &ProductFeatureValue) -> Result<(), AppError> {
        sqlx::query("UPDATE product_feature_values SET value = $2, updated_at = $3 WHERE id = $1")
            .bind(value.id)
            .bind(&value.value)
            .bind(value.updated_at)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn delete_feature_value(&mut self, id: Uuid) -> Result<(), AppError> {
        sqlx::query("DELETE FROM product_feature_values WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn list_attribute_rules(&mut self, variant_id: Uuid) -> Result<Vec<AppliedRule>, AppError> {
        let rows = sqlx::query_as::<_, AppliedRule>(
            r#"
            SELECT v.id AS value_id, a.id AS rule_id, a.price, a.price_mode, v.updated_at
            FROM variant_attribute_values v
            JOIN attributes a ON a.id = v.attribute_id
            WHERE v.variant_id = $1
            ORDER BY v.updated_at DESC, v.id ASC
            "#,
        )
        .bind(variant_id)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(rows)
    }

    async fn list_feature_rules(&mut self, product_id: Uuid) -> Result<Vec<AppliedRule>, AppError> {
        let rows = sqlx::query_as::<_, AppliedRule>(
            r#"
            SELECT v.id AS value_id, f.id AS rule_id, f.price, f.price_mode, v.updated_at
            FROM product_feature_values v
            JOIN features f ON f.id = v.feature_id
            WHERE v.product_id = $1
            ORDER BY v.updated_at DESC, v.id ASC
            "#,
        )
        .bind(product_id)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(rows)
    }

    // ---
    // Propagação e remoção
    // ---

    async fn dependent_variant_ids(&mut self, source: PriceSource) -> Result<Vec<Uuid>, AppError> {
        let (sql, id) = match source {
            PriceSource::Attribute(id) => (
                "SELECT DISTINCT variant_id FROM variant_attribute_values WHERE attribute_id = $1 ORDER BY variant_id",
                id,
            ),
            PriceSource::Feature(id) => (
                r#"
                SELECT DISTINCT v.id FROM variants v
                JOIN product_feature_values f ON f.product_id = v.product_id
                WHERE f.feature_id = $1
                ORDER BY v.id
                "#,
                id,
            ),
            PriceSource::SpecialFeature(id) => (
                r#"
                SELECT v.id FROM variants v
                JOIN products p ON p.id = v.product_id
                WHERE p.special_feature_id = $1
                ORDER BY v.id
                "#,
                id,
            ),
            PriceSource::Product(id) => (
                "SELECT id FROM variants WHERE product_id = $1 ORDER BY id",
                id,
            ),
            PriceSource::Tax(id) => (
                r#"
                SELECT v.id FROM variants v
                JOIN products p ON p.id = v.product_id
                WHERE p.tax_id = $1
                ORDER BY v.id
                "#,
                id,
            ),
        };

        let ids = sqlx::query_scalar::<_, Uuid>(sql)
            .bind(id)
            .fetch_all(&mut *self.tx)
            .await?;
        Ok(ids)
    }

    async fn count_dependents(&mut self, dependency: Dependency, id: Uuid) -> Result<i64, AppError> {
        let (table, column) = dependency.table_and_column();
        // Nomes vêm de constantes do enum, nunca do utilizador.
        let sql = format!("SELECT COUNT(*) FROM {table} WHERE {column} = $1");
        let count = sqlx::query_scalar::<_, i64>(&sql)
            .bind(id)
            .fetch_one(&mut *self.tx)
            .await?;
        Ok(count)
    }

    async fn exists(&mut self, entity: CatalogEntity, id: Uuid) -> Result<bool, AppError> {
        let sql = format!("SELECT EXISTS (SELECT 1 FROM {} WHERE id = $1)", entity.table());
        let found = sqlx::query_scalar::<_, bool>(&sql)
            .bind(id)
            .fetch_one(&mut *self.tx)
            .await?;
        Ok(found)
    }

    async fn delete(&mut self, entity: CatalogEntity, id: Uuid) -> Result<(), AppError> {
        let sql = format!("DELETE FROM {} WHERE id = $1", entity.table());
        sqlx::query(&sql).bind(id).execute(&mut *self.tx).await?;
        Ok(())
    }

    // ---
    // Unidades de stock
    // ---

    async fn get_stock_unit(&mut self, id: Uuid) -> Result<Option<UniqueStockUnit>, AppError> {
        let row = sqlx::query_as::<_, UniqueStockUnit>("SELECT * FROM stock_units WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(row)
    }

    async fn insert_stock_unit(&mut self, u: &UniqueStockUnit) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO stock_units (
                id, variant_id, product_id, box_id, value, unique_value, caducity,
                stock_original, stock_real, stock_locked, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(u.id)
        .bind(u.variant_id)
        .bind(u.product_id)
        .bind(u.box_id)
        .bind(&u.value)
        .bind(&u.unique_value)
        .bind(u.caducity)
        .bind(u.stock_original)
        .bind(u.stock_real)
        .bind(u.stock_locked)
        .bind(u.created_at)
        .bind(u.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_unique_violation(e, unique_value_conflict(u)))?;
        Ok(())
    }

    async fn update_stock_unit(&mut self, u: &UniqueStockUnit) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE stock_units
            SET variant_id = $2, product_id = $3, box_id = $4, value = $5, unique_value = $6,
                caducity = $7, stock_original = $8, stock_real = $9, stock_locked = $10,
                updated_at = $11
            WHERE id = $1
            "#,
        )
        .bind(u.id)
        .bind(u.variant_id)
        .bind(u.product_id)
        .bind(u.box_id)
        .bind(&u.value)
        .bind(&u.unique_value)
        .bind(u.caducity)
        .bind(u.stock_original)
        .bind(u.stock_real)
        .bind(u.stock_locked)
        .bind(u.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_unique_violation(e, unique_value_conflict(u)))?;
        Ok(())
    }

    async fn find_unit_with_value(
        &mut self,
        product_id: Uuid,
        value: &str,
        exclude: Option<Uuid>,
    ) -> Result<Option<UniqueStockUnit>, AppError> {
        let row = sqlx::query_as::<_, UniqueStockUnit>(
            r#"
            SELECT * FROM stock_units
            WHERE product_id = $1 AND value = $2 AND ($3::uuid IS NULL OR id <> $3)
            ORDER BY id
            LIMIT 1
            "#,
        )
        .bind(product_id)
        .bind(value)
        .bind(exclude)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(row)
    }

    async fn list_product_units(&mut self, product_id: Uuid) -> Result<Vec<UniqueStockUnit>, AppError> {
        let rows = sqlx::query_as::<_, UniqueStockUnit>(
            "SELECT * FROM stock_units WHERE product_id = $1 ORDER BY created_at, id",
        )
        .bind(product_id)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(rows)
    }

    async fn stock_totals(&mut self, variant_id: Uuid) -> Result<StockTotals, AppError> {
        let totals = sqlx::query_as::<_, StockTotals>(
            r#"
            SELECT
                COALESCE(SUM(stock_original), 0) AS stock_original,
                COALESCE(SUM(stock_real), 0) AS stock_real,
                COALESCE(SUM(stock_locked), 0) AS stock_locked
            FROM stock_units
            WHERE variant_id = $1
            "#,
        )
        .bind(variant_id)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(totals)
    }

    // ---
    // Imagens
    // ---

    async fn get_image(&mut self, id: Uuid) -> Result<Option<ProductImage>, AppError> {
        let row = sqlx::query_as::<_, ProductImage>("SELECT * FROM product_images WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(row)
    }

    async fn insert_image(&mut self, img: &ProductImage) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO product_images (
                id, product_id, path, sort_order, public, principal, flagship, outstanding,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(img.id)
        .bind(img.product_id)
        .bind(&img.path)
        .bind(img.sort_order)
        .bind(img.public)
        .bind(img.principal)
        .bind(img.flagship)
        .bind(img.outstanding)
        .bind(img.created_at)
        .bind(img.updated_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn update_image(&mut self, img: &ProductImage) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE product_images
            SET path = $2, sort_order = $3, public = $4, principal = $5, flagship = $6,
                outstanding = $7, updated_at = $8
            WHERE id = $1
            "#,
        )
        .bind(img.id)
        .bind(&img.path)
        .bind(img.sort_order)
        .bind(img.public)
        .bind(img.principal)
        .bind(img.flagship)
        .bind(img.outstanding)
        .bind(img.updated_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn delete_image(&mut self, id: Uuid) -> Result<(), AppError> {
        sqlx::query("DELETE FROM product_images WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn list_images(&mut self, product_id: Uuid) -> Result<Vec<ProductImage>, AppError> {
        let rows = sqlx::query_as::<_, ProductImage>(
            r#"
            SELECT * FROM product_images
            WHERE product_id = $1
            ORDER BY sort_order ASC NULLS LAST, created_at ASC, id ASC
            "#,
        )
        .bind(product_id)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(rows)
    }

    async fn clear_image_flag(
        &mut self,
        product_id: Uuid,
        flag: ImageFlag,
        except: Uuid,
    ) -> Result<(), AppError> {
        let column = flag.column();
        let sql = format!(
            "UPDATE product_images SET {column} = FALSE WHERE product_id = $1 AND id <> $2 AND {column}"
        );
        sqlx::query(&sql)
            .bind(product_id)
            .bind(except)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }
}

fn unique_value_conflict(unit: &UniqueStockUnit) -> impl FnOnce(&str) -> Option<AppError> + '_ {
    move |constraint: &str| {
        (constraint == constraints::UNIQUE_STOCK_VALUE).then(|| AppError::DuplicateUniqueValue {
            value: unit.value.clone().unwrap_or_default(),
        })
    }
}
