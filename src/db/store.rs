// src/db/store.rs

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    common::error::AppError,
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
// Contrato de persistência do catálogo.
//
// `CatalogStore` só sabe abrir uma unidade de trabalho (`begin`). Todas as
// leituras e escritas passam pelo `CatalogTx`, que é atómico: `commit` grava
// tudo, largar o tx sem `commit` desfaz tudo. É assim que uma cascata de
// recálculo fica "tudo ou nada".
//
// Implementações: PgCatalogStore (produção) e MemoryCatalogStore (testes e
// execução local sem base de dados).
// ---------------------------------------------------------------------------

/// Origem de uma mudança de preço: quem pode afetar quais variantes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceSource {
    Attribute(Uuid),
    Feature(Uuid),
    SpecialFeature(Uuid),
    Product(Uuid),
    Tax(Uuid),
}

/// Entidades que podem ser apagadas pelo guardião de remoção.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CatalogEntity {
    Tax,
    Family,
    Category,
    Subcategory,
    Brand,
    OptionGroup,
    OptionValue,
    Attribute,
    Feature,
    SpecialFeature,
    Product,
    Variant,
    StockUnit,
}

impl CatalogEntity {
    pub fn table(&self) -> &'static str {
        match self {
            CatalogEntity::Tax => "tax_rates",
            CatalogEntity::Family => "families",
            CatalogEntity::Category => "categories",
            CatalogEntity::Subcategory => "subcategories",
            CatalogEntity::Brand => "brands",
            CatalogEntity::OptionGroup => "option_groups",
            CatalogEntity::OptionValue => "option_values",
            CatalogEntity::Attribute => "attributes",
            CatalogEntity::Feature => "features",
            CatalogEntity::SpecialFeature => "special_features",
            CatalogEntity::Product => "products",
            CatalogEntity::Variant => "variants",
            CatalogEntity::StockUnit => "stock_units",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CatalogEntity::Tax => "tipo de imposto",
            CatalogEntity::Family => "família",
            CatalogEntity::Category => "categoria",
            CatalogEntity::Subcategory => "subcategoria",
            CatalogEntity::Brand => "marca",
            CatalogEntity::OptionGroup => "grupo de valores",
            CatalogEntity::OptionValue => "opção",
            CatalogEntity::Attribute => "atributo",
            CatalogEntity::Feature => "característica",
            CatalogEntity::SpecialFeature => "característica especial",
            CatalogEntity::Product => "produto",
            CatalogEntity::Variant => "variante",
            CatalogEntity::StockUnit => "unidade de stock",
        }
    }

    /// Relações que bloqueiam a remoção, na ordem em que são verificadas.
    pub fn dependencies(&self) -> &'static [Dependency] {
        use Dependency::*;
        match self {
            CatalogEntity::Tax => &[ProductsByTax],
            CatalogEntity::Family => &[
                ProductsByFamily,
                FeaturesByFamily,
                AttributesByFamily,
                SpecialFeaturesByFamily,
                CategoriesByFamily,
            ],
            CatalogEntity::Category => &[
                ProductsByCategory,
                FeaturesByCategory,
                AttributesByCategory,
                SpecialFeaturesByCategory,
                SubcategoriesByCategory,
            ],
            CatalogEntity::Subcategory => &[ProductsBySubcategory],
            CatalogEntity::Brand => &[ProductsByBrand],
            CatalogEntity::OptionGroup => &[
                OptionValuesByGroup,
                AttributesByOptionGroup,
                FeaturesByOptionGroup,
                SpecialFeaturesByOptionGroup,
            ],
            CatalogEntity::OptionValue => &[],
            CatalogEntity::Attribute => &[VariantValuesByAttribute, ChildrenByAttribute],
            CatalogEntity::Feature => &[ProductValuesByFeature],
            CatalogEntity::SpecialFeature => &[ProductsBySpecialFeature],
            CatalogEntity::Product => &[
                VariantsByProduct,
                ImagesByProduct,
                FeatureValuesByProduct,
            ],
            CatalogEntity::Variant => &[AttributeValuesByVariant, StockUnitsByVariant],
            CatalogEntity::StockUnit => &[],
        }
    }
}

/// Uma relação "tabela dependente . coluna FK".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dependency {
    ProductsByTax,
    ProductsByFamily,
    FeaturesByFamily,
    AttributesByFamily,
    SpecialFeaturesByFamily,
    CategoriesByFamily,
    ProductsByCategory,
    FeaturesByCategory,
    AttributesByCategory,
    SpecialFeaturesByCategory,
    SubcategoriesByCategory,
    ProductsBySubcategory,
    ProductsByBrand,
    OptionValuesByGroup,
    AttributesByOptionGroup,
    FeaturesByOptionGroup,
    SpecialFeaturesByOptionGroup,
    VariantValuesByAttribute,
    ChildrenByAttribute,
    ProductValuesByFeature,
    ProductsBySpecialFeature,
    VariantsByProduct,
    ImagesByProduct,
    FeatureValuesByProduct,
    AttributeValuesByVariant,
    StockUnitsByVariant,
}

impl Dependency {
    /// (tabela dependente, coluna que referencia o registo)
    pub fn table_and_column(&self) -> (&'static str, &'static str) {
        use Dependency::*;
        match self {
            ProductsByTax => ("products", "tax_id"),
            ProductsByFamily => ("products", "family_id"),
            FeaturesByFamily => ("features", "family_id"),
            AttributesByFamily => ("attributes", "family_id"),
            SpecialFeaturesByFamily => ("special_features", "family_id"),
            CategoriesByFamily => ("categories", "family_id"),
            ProductsByCategory => ("products", "category_id"),
            FeaturesByCategory => ("features", "category_id"),
            AttributesByCategory => ("attributes", "category_id"),
            SpecialFeaturesByCategory => ("special_features", "category_id"),
            SubcategoriesByCategory => ("subcategories", "category_id"),
            ProductsBySubcategory => ("products", "subcategory_id"),
            ProductsByBrand => ("products", "brand_id"),
            OptionValuesByGroup => ("option_values", "group_id"),
            AttributesByOptionGroup => ("attributes", "option_group_id"),
            FeaturesByOptionGroup => ("features", "option_group_id"),
            SpecialFeaturesByOptionGroup => ("special_features", "option_group_id"),
            VariantValuesByAttribute => ("variant_attribute_values", "attribute_id"),
            ChildrenByAttribute => ("attributes", "parent_id"),
            ProductValuesByFeature => ("product_feature_values", "feature_id"),
            ProductsBySpecialFeature => ("products", "special_feature_id"),
            VariantsByProduct => ("variants", "product_id"),
            ImagesByProduct => ("product_images", "product_id"),
            FeatureValuesByProduct => ("product_feature_values", "product_id"),
            AttributeValuesByVariant => ("variant_attribute_values", "variant_id"),
            StockUnitsByVariant => ("stock_units", "variant_id"),
        }
    }

    /// Nome legível da relação, usado na mensagem de BlockedDeletion.
    pub fn label(&self) -> &'static str {
        use Dependency::*;
        match self {
            ProductsByTax | ProductsByFamily | ProductsByCategory | ProductsBySubcategory
            | ProductsByBrand | ProductsBySpecialFeature => "produtos",
            FeaturesByFamily | FeaturesByCategory | FeaturesByOptionGroup => "características",
            AttributesByFamily | AttributesByCategory | AttributesByOptionGroup => "atributos",
            SpecialFeaturesByFamily | SpecialFeaturesByCategory | SpecialFeaturesByOptionGroup => {
                "características especiais"
            }
            CategoriesByFamily => "categorias",
            SubcategoriesByCategory => "subcategorias",
            OptionValuesByGroup => "opções",
            VariantValuesByAttribute | AttributeValuesByVariant => "atributos de variantes",
            ChildrenByAttribute => "atributos filhos",
            ProductValuesByFeature | FeatureValuesByProduct => "características de produtos",
            VariantsByProduct => "variantes",
            ImagesByProduct => "imagens de produto",
            StockUnitsByVariant => "unidades de stock",
        }
    }
}

#[async_trait]
pub trait CatalogStore: Clone + Send + Sync + 'static {
    type Tx: CatalogTx;

    async fn begin(&self) -> Result<Self::Tx, AppError>;
}

#[async_trait]
pub trait CatalogTx: Send {
    async fn commit(self) -> Result<(), AppError>;

    // --- Impostos ---
    async fn get_tax(&mut self, id: Uuid) -> Result<Option<TaxRate>, AppError>;
    async fn default_tax(&mut self) -> Result<Option<TaxRate>, AppError>;
    /// Primeiro imposto por nome (para promover a padrão).
    async fn first_tax_by_name(&mut self) -> Result<Option<TaxRate>, AppError>;
    async fn insert_tax(&mut self, tax: &TaxRate) -> Result<(), AppError>;
    async fn update_tax(&mut self, tax: &TaxRate) -> Result<(), AppError>;
    async fn clear_default_taxes(&mut self, except: Uuid) -> Result<(), AppError>;

    // --- Taxonomia ---
    async fn get_family(&mut self, id: Uuid) -> Result<Option<Family>, AppError>;
    async fn insert_family(&mut self, family: &Family) -> Result<(), AppError>;
    async fn get_category(&mut self, id: Uuid) -> Result<Option<Category>, AppError>;
    async fn insert_category(&mut self, category: &Category) -> Result<(), AppError>;
    async fn get_subcategory(&mut self, id: Uuid) -> Result<Option<Subcategory>, AppError>;
    async fn insert_subcategory(&mut self, subcategory: &Subcategory) -> Result<(), AppError>;
    async fn get_brand(&mut self, id: Uuid) -> Result<Option<Brand>, AppError>;
    async fn insert_brand(&mut self, brand: &Brand) -> Result<(), AppError>;
    async fn get_option_group(&mut self, id: Uuid) -> Result<Option<OptionGroup>, AppError>;
    async fn insert_option_group(&mut self, group: &OptionGroup) -> Result<(), AppError>;
    async fn get_option_value(&mut self, id: Uuid) -> Result<Option<OptionValue>, AppError>;
    async fn insert_option_value(&mut self, option: &OptionValue) -> Result<(), AppError>;

    // --- Regras de preço ---
    async fn get_attribute(&mut self, id: Uuid) -> Result<Option<Attribute>, AppError>;
    async fn insert_attribute(&mut self, rule: &Attribute) -> Result<(), AppError>;
    async fn update_attribute(&mut self, rule: &Attribute) -> Result<(), AppError>;
    async fn get_feature(&mut self, id: Uuid) -> Result<Option<Feature>, AppError>;
    async fn insert_feature(&mut self, rule: &Feature) -> Result<(), AppError>;
    async fn update_feature(&mut self, rule: &Feature) -> Result<(), AppError>;
    async fn get_special_feature(&mut self, id: Uuid) -> Result<Option<SpecialFeature>, AppError>;
    async fn insert_special_feature(&mut self, rule: &SpecialFeature) -> Result<(), AppError>;
    async fn update_special_feature(&mut self, rule: &SpecialFeature) -> Result<(), AppError>;

    // --- Produtos e variantes ---
    async fn get_product(&mut self, id: Uuid) -> Result<Option<Product>, AppError>;
    async fn insert_product(&mut self, product: &Product) -> Result<(), AppError>;
    async fn update_product(&mut self, product: &Product) -> Result<(), AppError>;
    async fn get_variant(&mut self, id: Uuid) -> Result<Option<Variant>, AppError>;
    async fn insert_variant(&mut self, variant: &Variant) -> Result<(), AppError>;
    async fn update_variant(&mut self, variant: &Variant) -> Result<(), AppError>;

    // --- Valores de atributos e características ---
    async fn get_attribute_value(&mut self, id: Uuid) -> Result<Option<VariantAttributeValue>, AppError>;
    async fn find_attribute_value(
        &mut self,
        variant_id: Uuid,
        attribute_id: Uuid,
    ) -> Result<Option<VariantAttributeValue>, AppError>;
    async fn insert_attribute_value(&mut self, value: &VariantAttributeValue) -> Result<(), AppError>;
    async fn update_attribute_value(&mut self, value: &VariantAttributeValue) -> Result<(), AppError>;
    async fn delete_attribute_value(&mut self, id: Uuid) -> Result<(), AppError>;
    async fn find_feature_value(
        &mut self,
        product_id: Uuid,
        feature_id: Uuid,
    ) -> Result<Option<ProductFeatureValue>, AppError>;
    async fn insert_feature_value(&mut self, value: &ProductFeatureValue) -> Result<(), AppError>;
    async fn update_feature_value(&mut self, value: &ProductFeatureValue) -> Result<(), AppError>;
    async fn delete_feature_value(&mut self, id: Uuid) -> Result<(), AppError>;

    /// Atributos da variante já resolvidos, mais recentes primeiro (desempate por id).
    async fn list_attribute_rules(&mut self, variant_id: Uuid) -> Result<Vec<AppliedRule>, AppError>;
    /// Características do produto já resolvidas, mais recentes primeiro (desempate por id).
    async fn list_feature_rules(&mut self, product_id: Uuid) -> Result<Vec<AppliedRule>, AppError>;

    // --- Propagação e remoção ---
    /// Variantes cujo preço depende da origem indicada, ordenadas por id.
    async fn dependent_variant_ids(&mut self, source: PriceSource) -> Result<Vec<Uuid>, AppError>;
    async fn count_dependents(&mut self, dependency: Dependency, id: Uuid) -> Result<i64, AppError>;
    async fn exists(&mut self, entity: CatalogEntity, id: Uuid) -> Result<bool, AppError>;
    async fn delete(&mut self, entity: CatalogEntity, id: Uuid) -> Result<(), AppError>;

    // --- Unidades de stock ---
    async fn get_stock_unit(&mut self, id: Uuid) -> Result<Option<UniqueStockUnit>, AppError>;
    async fn insert_stock_unit(&mut self, unit: &UniqueStockUnit) -> Result<(), AppError>;
    async fn update_stock_unit(&mut self, unit: &UniqueStockUnit) -> Result<(), AppError>;
    /// Outra unidade (excluindo `exclude`) de qualquer variante do produto com este valor.
    async fn find_unit_with_value(
        &mut self,
        product_id: Uuid,
        value: &str,
        exclude: Option<Uuid>,
    ) -> Result<Option<UniqueStockUnit>, AppError>;
    /// Unidades de todas as variantes do produto, por data de criação.
    async fn list_product_units(&mut self, product_id: Uuid) -> Result<Vec<UniqueStockUnit>, AppError>;
    async fn stock_totals(&mut self, variant_id: Uuid) -> Result<StockTotals, AppError>;

    // --- Imagens ---
    async fn get_image(&mut self, id: Uuid) -> Result<Option<ProductImage>, AppError>;
    async fn insert_image(&mut self, image: &ProductImage) -> Result<(), AppError>;
    async fn update_image(&mut self, image: &ProductImage) -> Result<(), AppError>;
    async fn delete_image(&mut self, id: Uuid) -> Result<(), AppError>;
    async fn list_images(&mut self, product_id: Uuid) -> Result<Vec<ProductImage>, AppError>;
    /// Desliga o flag em todas as imagens do produto, exceto `except`.
    async fn clear_image_flag(
        &mut self,
        product_id: Uuid,
        flag: ImageFlag,
        except: Uuid,
    ) -> Result<(), AppError>;
}
