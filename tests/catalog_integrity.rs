mod common;

use catalog::{
    common::{error::AppError, money::PricingConfig},
    config::AppState,
    db::{CatalogEntity, MemoryCatalogStore},
    models::{
        image::ImageInput,
        product::{ProductPricingInput, RuleValueInput},
        rule::{PriceMode, RuleKind, ValueKind},
        tax::TaxRateInput,
        text::Language,
    },
};
use common::{d, rule_id, rule_input, taxonomy, Fixture};
use uuid::Uuid;

fn tax(name: &str, percentage: &str, is_default: bool) -> TaxRateInput {
    TaxRateInput {
        name: name.into(),
        percentage: d(percentage),
        surcharge: d("0"),
        is_default,
    }
}

// --- Remoção protegida ---

#[tokio::test]
async fn tax_in_use_cannot_be_deleted() {
    let fx = Fixture::new().await;
    fx.product("P-1", "10").await;
    let before = fx.store.snapshot().await;

    let err = fx
        .state
        .catalog_service
        .delete_entity(CatalogEntity::Tax, fx.tax.id)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::BlockedDeletion { entity: "tipo de imposto", relation: "produtos" }
    ));

    let after = fx.store.snapshot().await;
    assert_eq!(after.taxes, before.taxes);
    assert_eq!(after.products, before.products);
}

#[tokio::test]
async fn rules_with_values_cannot_be_deleted() {
    let fx = Fixture::new().await;
    let product = fx.product("P-2", "10").await;
    let variant = fx.variant(&product).await;
    let color = fx.rule(RuleKind::Attribute, "1", PriceMode::Increase).await;
    let material = fx.rule(RuleKind::Feature, "1", PriceMode::Increase).await;
    let service = &fx.state.catalog_service;

    let (row, _) = service
        .add_attribute_value(
            variant.id,
            RuleValueInput {
                rule_id: rule_id(&color),
                value: "Rojo".into(),
            },
        )
        .await
        .unwrap();
    service
        .set_feature_value(
            product.id,
            RuleValueInput {
                rule_id: rule_id(&material),
                value: "Lana".into(),
            },
        )
        .await
        .unwrap();

    let err = service
        .delete_entity(CatalogEntity::Attribute, rule_id(&color))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BlockedDeletion { .. }));
    let err = service
        .delete_entity(CatalogEntity::Feature, rule_id(&material))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BlockedDeletion { .. }));

    // Sem dependentes, a remoção passa.
    service.remove_attribute_value(row.id).await.unwrap();
    service
        .delete_entity(CatalogEntity::Attribute, rule_id(&color))
        .await
        .unwrap();
    assert!(!fx.store.snapshot().await.attributes.contains_key(&rule_id(&color)));
}

#[tokio::test]
async fn special_feature_in_use_cannot_be_deleted() {
    let fx = Fixture::new().await;
    let service = &fx.state.catalog_service;
    let serial = fx.rule(RuleKind::SpecialFeature, "0", PriceMode::Increase).await;
    let mut input = fx.product_input("P-SF", "10");
    input.special_feature_id = Some(rule_id(&serial));
    let product = service.create_product(input).await.unwrap();

    let err = service
        .delete_entity(CatalogEntity::SpecialFeature, rule_id(&serial))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::BlockedDeletion { entity: "característica especial", relation: "produtos" }
    ));
    assert!(fx.store.snapshot().await.special_features.contains_key(&rule_id(&serial)));

    service
        .update_product_pricing(
            product.id,
            ProductPricingInput {
                base_price: product.base_price,
                tax_id: product.tax_id,
                special_feature_id: None,
            },
        )
        .await
        .unwrap();
    service
        .delete_entity(CatalogEntity::SpecialFeature, rule_id(&serial))
        .await
        .unwrap();
    assert!(!fx.store.snapshot().await.special_features.contains_key(&rule_id(&serial)));
}

#[tokio::test]
async fn taxonomy_in_use_cannot_be_deleted() {
    let fx = Fixture::new().await;
    let service = &fx.state.catalog_service;

    let err = service
        .delete_entity(CatalogEntity::Family, fx.family.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BlockedDeletion { relation: "categorias", .. }));

    let err = service
        .delete_entity(CatalogEntity::Category, fx.category.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BlockedDeletion { .. }));

    service
        .delete_entity(CatalogEntity::Subcategory, fx.subcategory.id)
        .await
        .unwrap();
    service
        .delete_entity(CatalogEntity::Category, fx.category.id)
        .await
        .unwrap();
}

#[tokio::test]
async fn deleting_unknown_record_is_not_found() {
    let fx = Fixture::new().await;
    let err = fx
        .state
        .catalog_service
        .delete_entity(CatalogEntity::Brand, Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound { .. }));
}

// --- Imposto padrão ---

#[tokio::test]
async fn exactly_one_default_tax() {
    let fx = Fixture::new().await;
    let service = &fx.state.catalog_service;

    let reduced = service.create_tax(tax("IVA reducido", "10", true)).await.unwrap();
    let zero = service.create_tax(tax("Exento", "0", false)).await.unwrap();
    assert!(!zero.is_default);

    let taxes = fx.store.snapshot().await.taxes;
    let defaults: Vec<_> = taxes.values().filter(|t| t.is_default).map(|t| t.id).collect();
    assert_eq!(defaults, vec![reduced.id]);

    // Desmarcar o único padrão não o desmarca.
    let (reduced, _) = service
        .update_tax(reduced.id, tax("IVA reducido", "10", false))
        .await
        .unwrap();
    assert!(reduced.is_default);
}

#[tokio::test]
async fn deleting_the_default_tax_promotes_another() {
    let fx = Fixture::new().await;
    let service = &fx.state.catalog_service;
    let zero = service.create_tax(tax("Exento", "0", false)).await.unwrap();
    let reduced = service.create_tax(tax("IVA reducido", "10", true)).await.unwrap();

    service.delete_entity(CatalogEntity::Tax, reduced.id).await.unwrap();

    let taxes = fx.store.snapshot().await.taxes;
    assert!(taxes[&zero.id].is_default);
    assert!(!taxes[&fx.tax.id].is_default);
}

#[tokio::test]
async fn first_tax_becomes_default() {
    let state = AppState::with_store(MemoryCatalogStore::new(), PricingConfig::default(), Language::Es);
    let first = state
        .catalog_service
        .create_tax(tax("IVA general", "21", false))
        .await
        .unwrap();
    assert!(first.is_default);
}

#[tokio::test]
async fn duplicated_codes_are_rejected() {
    let fx = Fixture::new().await;
    fx.product("DUP", "1").await;
    let err = fx
        .state
        .catalog_service
        .create_product(fx.product_input("DUP", "2"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::CodeAlreadyExists(ref code) if code == "DUP"));

    let err = fx
        .state
        .catalog_service
        .create_family(taxonomy(None, "FAM"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::CodeAlreadyExists(_)));
}

// --- Valores e âmbito das regras ---

#[tokio::test]
async fn attribute_is_single_per_variant() {
    let fx = Fixture::new().await;
    let product = fx.product("P-3", "10").await;
    let variant = fx.variant(&product).await;
    let size = fx.rule(RuleKind::Attribute, "1", PriceMode::Increase).await;
    let input = RuleValueInput {
        rule_id: rule_id(&size),
        value: "M".into(),
    };

    fx.state
        .catalog_service
        .add_attribute_value(variant.id, input.clone())
        .await
        .unwrap();
    let err = fx
        .state
        .catalog_service
        .add_attribute_value(variant.id, input)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::DuplicateAttributeValue));
}

#[tokio::test]
async fn rule_from_another_family_is_out_of_scope() {
    let fx = Fixture::new().await;
    let product = fx.product("P-4", "10").await;
    let variant = fx.variant(&product).await;
    let other_family = fx
        .state
        .catalog_service
        .create_family(taxonomy(None, "OTRA"))
        .await
        .unwrap();

    let mut input = rule_input("1", PriceMode::Increase, ValueKind::Boolean);
    input.family_id = Some(other_family.id);
    let rule = fx
        .state
        .catalog_service
        .create_rule(RuleKind::Attribute, input)
        .await
        .unwrap();

    let err = fx
        .state
        .catalog_service
        .add_attribute_value(
            variant.id,
            RuleValueInput {
                rule_id: rule_id(&rule),
                value: "true".into(),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::RuleOutOfScope { .. }));
}

#[tokio::test]
async fn described_variant_shows_translated_values() {
    let fx = Fixture::new().await;
    let product = fx.product("P-5", "10").await;
    let variant = fx.variant(&product).await;
    let rule = fx
        .state
        .catalog_service
        .create_rule(
            RuleKind::Attribute,
            rule_input("0", PriceMode::Increase, ValueKind::Boolean),
        )
        .await
        .unwrap();
    fx.state
        .catalog_service
        .add_attribute_value(
            variant.id,
            RuleValueInput {
                rule_id: rule_id(&rule),
                value: "sí".into(),
            },
        )
        .await
        .unwrap();

    let view = fx
        .state
        .catalog_service
        .describe_variant(variant.id, Language::Es)
        .await
        .unwrap();
    assert_eq!(view.display_name, "Producto P-5");
    assert!(view.sellable);
    assert_eq!(view.attributes.len(), 1);
    assert_eq!(view.attributes[0].value, "1");
    assert_eq!(view.attributes[0].display, "True");
}

// --- Imagens ---

fn image(product_id: Uuid, path: &str, sort_order: i16, principal: bool) -> ImageInput {
    ImageInput {
        product_id,
        path: path.into(),
        sort_order: Some(sort_order),
        public: true,
        principal,
        flagship: false,
        outstanding: false,
    }
}

#[tokio::test]
async fn product_always_has_one_principal_image() {
    let fx = Fixture::new().await;
    let product = fx.product("IMG", "10").await;
    let images = &fx.state.image_service;

    let first = images.add_image(image(product.id, "a.jpg", 1, false)).await.unwrap();
    assert!(first.principal && first.flagship && first.outstanding);

    let second = images.add_image(image(product.id, "b.jpg", 2, true)).await.unwrap();
    assert!(second.principal);

    let listed = images.list_images(product.id).await.unwrap();
    assert_eq!(listed.iter().filter(|i| i.principal).count(), 1);
    assert_eq!(listed.iter().filter(|i| i.flagship).count(), 1);

    images.delete_image(second.id).await.unwrap();
    let listed = images.list_images(product.id).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert!(listed[0].principal);
}
