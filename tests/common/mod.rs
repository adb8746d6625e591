#![allow(dead_code)]

use std::collections::BTreeMap;

use catalog::{
    common::money::PricingConfig,
    config::AppState,
    db::MemoryCatalogStore,
    models::{
        catalog::{Category, Family, Subcategory, TaxonomyInput},
        product::{Product, ProductInput, Variant, VariantInput},
        rule::{PriceMode, RuleInput, RuleKind, RuleRecord, ValueKind},
        tax::{TaxRate, TaxRateInput},
        text::{Language, TranslatableText},
    },
};
use rust_decimal::Decimal;
use uuid::Uuid;

pub fn d(s: &str) -> Decimal {
    s.parse().unwrap()
}

/// Estado em memória com um imposto de 21 % e uma família/categoria/subcategoria.
pub struct Fixture {
    pub store: MemoryCatalogStore,
    pub state: AppState<MemoryCatalogStore>,
    pub tax: TaxRate,
    pub family: Family,
    pub category: Category,
    pub subcategory: Subcategory,
}

impl Fixture {
    pub async fn new() -> Self {
        let store = MemoryCatalogStore::new();
        let state = AppState::with_store(store.clone(), PricingConfig::default(), Language::Es);

        let tax = state
            .catalog_service
            .create_tax(TaxRateInput {
                name: "IVA general".into(),
                percentage: d("21"),
                surcharge: d("5.2"),
                is_default: true,
            })
            .await
            .unwrap();
        let family = state
            .catalog_service
            .create_family(taxonomy(None, "FAM"))
            .await
            .unwrap();
        let category = state
            .catalog_service
            .create_category(taxonomy(Some(family.id), "CAT"))
            .await
            .unwrap();
        let subcategory = state
            .catalog_service
            .create_subcategory(taxonomy(Some(category.id), "SUB"))
            .await
            .unwrap();

        Self {
            store,
            state,
            tax,
            family,
            category,
            subcategory,
        }
    }

    pub fn product_input(&self, code: &str, base_price: &str) -> ProductInput {
        ProductInput {
            code: code.into(),
            base_price: d(base_price),
            tax_id: self.tax.id,
            special_feature_id: None,
            brand_id: None,
            family_id: self.family.id,
            category_id: self.category.id,
            subcategory_id: self.subcategory.id,
            packing_cost: Decimal::ZERO,
            weight: Decimal::ZERO,
            public: true,
            of_sales: true,
            of_purchase: true,
            force_stock: true,
            caducable: false,
            texts: BTreeMap::from([(
                Language::Es,
                TranslatableText {
                    name: format!("Producto {code}"),
                    slug: code.to_lowercase(),
                    ..Default::default()
                },
            )]),
        }
    }

    pub async fn product(&self, code: &str, base_price: &str) -> Product {
        self.state
            .catalog_service
            .create_product(self.product_input(code, base_price))
            .await
            .unwrap()
    }

    pub async fn variant(&self, product: &Product) -> Variant {
        self.state
            .catalog_service
            .create_variant(variant_input(product.id))
            .await
            .unwrap()
    }

    pub async fn rule(&self, kind: RuleKind, price: &str, mode: PriceMode) -> RuleRecord {
        self.state
            .catalog_service
            .create_rule(kind, rule_input(price, mode, ValueKind::FreeText))
            .await
            .unwrap()
    }

    pub async fn stored_variant(&self, id: Uuid) -> Variant {
        self.store.snapshot().await.variants[&id].clone()
    }
}

pub fn taxonomy(parent_id: Option<Uuid>, code: &str) -> TaxonomyInput {
    TaxonomyInput {
        parent_id,
        code: Some(code.into()),
        public: true,
        names: BTreeMap::from([(Language::Es, code.to_string())]),
    }
}

pub fn variant_input(product_id: Uuid) -> VariantInput {
    VariantInput {
        product_id,
        code: None,
        ean13: None,
        local_base_price: None,
        local_packing_cost: None,
        local_weight: None,
        offer: false,
        outstanding: false,
        most_sold: false,
        sample: false,
        texts: BTreeMap::new(),
    }
}

pub fn rule_input(price: &str, mode: PriceMode, value_kind: ValueKind) -> RuleInput {
    RuleInput {
        price: d(price),
        price_mode: mode,
        value_kind,
        family_id: None,
        category_id: None,
        option_group_id: None,
        public: true,
        sort_order: None,
        description: BTreeMap::new(),
        parent_id: None,
        unique: true,
    }
}

pub fn rule_id(record: &RuleRecord) -> Uuid {
    match record {
        RuleRecord::Attribute(r) => r.id,
        RuleRecord::Feature(r) => r.id,
        RuleRecord::SpecialFeature(r) => r.id,
    }
}
