mod common;

use std::time::Duration;

use catalog::{
    common::{error::AppError, money::PricingConfig},
    db::{CatalogEntity, CatalogStore, CatalogTx, PriceSource},
    models::{
        product::{ProductPricingInput, PromoteInput, RuleValueInput},
        rule::{PriceMode, RuleKind, RulePriceInput},
        tax::TaxRateInput,
    },
};
use catalog::services::PriceRecalculator;
use common::{d, rule_id, Fixture};

fn value(rule: uuid::Uuid, raw: &str) -> RuleValueInput {
    RuleValueInput {
        rule_id: rule,
        value: raw.into(),
    }
}

fn new_price(price: &str, mode: PriceMode) -> RulePriceInput {
    RulePriceInput {
        price: d(price),
        price_mode: mode,
    }
}

// Dá ao relógio tempo para avançar entre gravações que dependem de `updated_at`.
async fn tick() {
    tokio::time::sleep(Duration::from_millis(5)).await;
}

#[tokio::test]
async fn attribute_increase_is_applied_and_propagated() {
    let fx = Fixture::new().await;
    let product = fx.product("CAM-01", "100").await;
    let variant = fx.variant(&product).await;
    assert_eq!(variant.price_base, d("100.00"));
    assert_eq!(variant.price, d("121.00"));

    let color = fx.rule(RuleKind::Attribute, "10", PriceMode::Increase).await;
    let (_, variant) = fx
        .state
        .catalog_service
        .add_attribute_value(variant.id, value(rule_id(&color), "Rojo"))
        .await
        .unwrap();
    assert_eq!(variant.price_base, d("110.00"));
    assert_eq!(variant.price, d("133.10"));

    let breakdown = fx.state.catalog_service.variant_price(variant.id, false).await.unwrap();
    assert_eq!(breakdown.tax_amount, d("23.10"));
    assert_eq!(breakdown.surcharge_amount, d("0"));

    let (_, report) = fx
        .state
        .catalog_service
        .update_rule_price(RuleKind::Attribute, rule_id(&color), new_price("20", PriceMode::Increase))
        .await
        .unwrap();
    assert_eq!(report.examined, 1);
    assert_eq!(report.updated, 1);

    let stored = fx.stored_variant(variant.id).await;
    assert_eq!(stored.price_base, d("120.00"));
    assert_eq!(stored.price, d("145.20"));
}

#[tokio::test]
async fn unchanged_rule_price_does_not_rewrite_variants() {
    let fx = Fixture::new().await;
    let product = fx.product("CAM-02", "100").await;
    let variant = fx.variant(&product).await;
    let color = fx.rule(RuleKind::Attribute, "10", PriceMode::Increase).await;
    fx.state
        .catalog_service
        .add_attribute_value(variant.id, value(rule_id(&color), "Azul"))
        .await
        .unwrap();

    let writes = fx.store.variant_writes();
    let (_, report) = fx
        .state
        .catalog_service
        .update_rule_price(RuleKind::Attribute, rule_id(&color), new_price("10", PriceMode::Increase))
        .await
        .unwrap();

    assert_eq!(report.updated, 0);
    assert_eq!(fx.store.variant_writes(), writes);
}

#[tokio::test]
async fn newest_override_hides_older_rules() {
    let fx = Fixture::new().await;
    let product = fx.product("CAM-03", "100").await;
    let variant = fx.variant(&product).await;

    let size = fx.rule(RuleKind::Attribute, "10", PriceMode::Increase).await;
    let promo = fx.rule(RuleKind::Attribute, "50", PriceMode::FinalOverride).await;
    fx.state
        .catalog_service
        .add_attribute_value(variant.id, value(rule_id(&size), "XL"))
        .await
        .unwrap();
    tick().await;
    let (_, variant) = fx
        .state
        .catalog_service
        .add_attribute_value(variant.id, value(rule_id(&promo), "Outlet"))
        .await
        .unwrap();
    assert_eq!(variant.price_base, d("50.00"));
    assert_eq!(variant.price, d("60.50"));

    // A regra escondida pelo override muda, mas o preço final não.
    let writes = fx.store.variant_writes();
    let (_, report) = fx
        .state
        .catalog_service
        .update_rule_price(RuleKind::Attribute, rule_id(&size), new_price("30", PriceMode::Increase))
        .await
        .unwrap();
    assert_eq!(report.examined, 1);
    assert_eq!(report.updated, 0);
    assert_eq!(fx.store.variant_writes(), writes);
}

#[tokio::test]
async fn percentages_apply_to_the_starting_price() {
    let fx = Fixture::new().await;
    let product = fx.product("CAM-04", "100").await;
    let variant = fx.variant(&product).await;

    let attr = fx.rule(RuleKind::Attribute, "10", PriceMode::Percentage).await;
    let feature = fx.rule(RuleKind::Feature, "5", PriceMode::Increase).await;
    fx.state
        .catalog_service
        .add_attribute_value(variant.id, value(rule_id(&attr), "Algodón"))
        .await
        .unwrap();
    let (_, report) = fx
        .state
        .catalog_service
        .set_feature_value(product.id, value(rule_id(&feature), "Sí"))
        .await
        .unwrap();
    assert_eq!(report.examined, 1);

    let stored = fx.stored_variant(variant.id).await;
    assert_eq!(stored.price_base, d("115.00"));
}

#[tokio::test]
async fn feature_change_only_touches_products_that_use_it() {
    let fx = Fixture::new().await;
    let with_feature = fx.product("MESA-01", "200").await;
    let without_feature = fx.product("MESA-02", "200").await;
    let v1 = fx.variant(&with_feature).await;
    let v2 = fx.variant(&with_feature).await;
    let untouched = fx.variant(&without_feature).await;

    let material = fx.rule(RuleKind::Feature, "5", PriceMode::Increase).await;
    fx.state
        .catalog_service
        .set_feature_value(with_feature.id, value(rule_id(&material), "Roble"))
        .await
        .unwrap();

    let (_, report) = fx
        .state
        .catalog_service
        .update_rule_price(RuleKind::Feature, rule_id(&material), new_price("15", PriceMode::Increase))
        .await
        .unwrap();
    assert_eq!(report.examined, 2);
    assert_eq!(report.updated, 2);

    assert_eq!(fx.stored_variant(v1.id).await.price_base, d("215.00"));
    assert_eq!(fx.stored_variant(v2.id).await.price_base, d("215.00"));
    assert_eq!(fx.stored_variant(untouched.id).await, untouched);
}

#[tokio::test]
async fn tax_percentage_change_reprices_every_product_using_it() {
    let fx = Fixture::new().await;
    let a = fx.product("A", "100").await;
    let b = fx.product("B", "50").await;
    let va = fx.variant(&a).await;
    let vb = fx.variant(&b).await;

    let (tax, report) = fx
        .state
        .catalog_service
        .update_tax(
            fx.tax.id,
            TaxRateInput {
                name: fx.tax.name.clone(),
                percentage: d("10"),
                surcharge: fx.tax.surcharge,
                is_default: true,
            },
        )
        .await
        .unwrap();
    assert_eq!(tax.percentage, d("10"));
    assert_eq!(report.examined, 2);
    assert_eq!(report.updated, 2);
    assert_eq!(fx.stored_variant(va.id).await.price, d("110.00"));
    assert_eq!(fx.stored_variant(vb.id).await.price, d("55.00"));

    // Só o recargo mudou: o preço gravado não depende dele.
    let (_, report) = fx
        .state
        .catalog_service
        .update_tax(
            fx.tax.id,
            TaxRateInput {
                name: fx.tax.name.clone(),
                percentage: d("10"),
                surcharge: d("1.4"),
                is_default: true,
            },
        )
        .await
        .unwrap();
    assert_eq!(report.examined, 0);
}

#[tokio::test]
async fn surcharge_is_only_added_on_request() {
    let fx = Fixture::new().await;
    let product = fx.product("SUR-01", "100").await;
    let variant = fx.variant(&product).await;

    let plain = fx.state.catalog_service.variant_price(variant.id, false).await.unwrap();
    let with_surcharge = fx.state.catalog_service.variant_price(variant.id, true).await.unwrap();

    assert_eq!(plain.price_total, d("121.00"));
    assert_eq!(with_surcharge.surcharge_amount, d("5.20"));
    assert_eq!(with_surcharge.price_total, d("126.20"));
}

#[tokio::test]
async fn product_pricing_change_reprices_its_variants() {
    let fx = Fixture::new().await;
    let product = fx.product("SILLA-01", "100").await;
    let variant = fx.variant(&product).await;
    let serial = fx.rule(RuleKind::SpecialFeature, "3", PriceMode::Increase).await;

    let (product, report) = fx
        .state
        .catalog_service
        .update_product_pricing(
            product.id,
            ProductPricingInput {
                base_price: d("80"),
                tax_id: fx.tax.id,
                special_feature_id: Some(rule_id(&serial)),
            },
        )
        .await
        .unwrap();
    assert_eq!(report.updated, 1);
    assert_eq!(product.base_price, d("80"));
    assert_eq!(fx.stored_variant(variant.id).await.price_base, d("83.00"));

    // Mesmos valores: nada a recalcular.
    let (_, report) = fx
        .state
        .catalog_service
        .update_product_pricing(
            product.id,
            ProductPricingInput {
                base_price: d("80"),
                tax_id: fx.tax.id,
                special_feature_id: Some(rule_id(&serial)),
            },
        )
        .await
        .unwrap();
    assert_eq!(report.examined, 0);
}

#[tokio::test]
async fn promoted_variant_copies_product_data() {
    let fx = Fixture::new().await;
    let product = fx.product("LAMP-01", "40").await;

    let variant = fx
        .state
        .catalog_service
        .promote_to_variant(product.id, PromoteInput { ean13: None })
        .await
        .unwrap();

    assert_eq!(variant.code.as_deref(), Some("LAMP-01"));
    assert_eq!(variant.local_base_price, Some(d("40")));
    assert_eq!(variant.texts, product.texts);
    assert_eq!(variant.price, d("48.40"));
}

#[tokio::test]
async fn removing_values_restores_the_base_price() {
    let fx = Fixture::new().await;
    let product = fx.product("CAM-05", "100").await;
    let variant = fx.variant(&product).await;
    let color = fx.rule(RuleKind::Attribute, "10", PriceMode::Increase).await;
    let feature = fx.rule(RuleKind::Feature, "5", PriceMode::Increase).await;

    let (row, _) = fx
        .state
        .catalog_service
        .add_attribute_value(variant.id, value(rule_id(&color), "Verde"))
        .await
        .unwrap();
    fx.state
        .catalog_service
        .set_feature_value(product.id, value(rule_id(&feature), "Lino"))
        .await
        .unwrap();
    assert_eq!(fx.stored_variant(variant.id).await.price_base, d("115.00"));

    let variant = fx.state.catalog_service.remove_attribute_value(row.id).await.unwrap();
    assert_eq!(variant.price_base, d("105.00"));

    let report = fx
        .state
        .catalog_service
        .remove_feature_value(product.id, rule_id(&feature))
        .await
        .unwrap();
    assert_eq!(report.updated, 1);
    assert_eq!(fx.stored_variant(variant.id).await.price_base, d("100.00"));
}

#[tokio::test]
async fn uncommitted_transaction_leaves_state_untouched() {
    let fx = Fixture::new().await;
    let product = fx.product("ROLL-01", "100").await;
    let variant = fx.variant(&product).await;

    {
        let mut tx = fx.store.begin().await.unwrap();
        let mut changed = variant.clone();
        changed.price = d("1");
        tx.update_variant(&changed).await.unwrap();
        // sem commit
    }

    assert_eq!(fx.stored_variant(variant.id).await, variant);
}

#[tokio::test]
async fn failed_cascade_rolls_back_rule_and_variants() {
    let fx = Fixture::new().await;
    let color = fx.rule(RuleKind::Attribute, "10", PriceMode::Increase).await;
    let mut variants = Vec::new();
    for code in ["ROLL-02", "ROLL-03"] {
        let product = fx.product(code, "100").await;
        let variant = fx.variant(&product).await;
        let (_, variant) = fx
            .state
            .catalog_service
            .add_attribute_value(variant.id, value(rule_id(&color), "Rojo"))
            .await
            .unwrap();
        variants.push(variant);
    }
    variants.sort_by_key(|v| v.id);

    // A última variante da cascata fica a apontar para um imposto que já não existe.
    let orphan = fx
        .state
        .catalog_service
        .create_tax(TaxRateInput {
            name: "IVA reducido".into(),
            percentage: d("10"),
            surcharge: d("0"),
            is_default: false,
        })
        .await
        .unwrap();
    let mut tx = fx.store.begin().await.unwrap();
    let mut broken = tx.get_product(variants[1].product_id).await.unwrap().unwrap();
    broken.tax_id = orphan.id;
    tx.update_product(&broken).await.unwrap();
    tx.delete(CatalogEntity::Tax, orphan.id).await.unwrap();
    tx.commit().await.unwrap();

    let before = fx.store.snapshot().await;
    let writes = fx.store.variant_writes();
    let err = fx
        .state
        .catalog_service
        .update_rule_price(RuleKind::Attribute, rule_id(&color), new_price("20", PriceMode::Increase))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound { .. }));

    let after = fx.store.snapshot().await;
    assert_eq!(after.attributes[&rule_id(&color)].core.price, d("10"));
    assert_eq!(after.attributes, before.attributes);
    for variant in &variants {
        assert_eq!(after.variants[&variant.id], before.variants[&variant.id]);
    }
    assert_eq!(fx.store.variant_writes(), writes);
}

#[tokio::test]
async fn second_recalculation_finds_nothing_to_do() {
    let fx = Fixture::new().await;
    let product = fx.product("IDEM-01", "100").await;
    let variant = fx.variant(&product).await;
    let color = fx.rule(RuleKind::Attribute, "10", PriceMode::Increase).await;
    fx.state
        .catalog_service
        .add_attribute_value(variant.id, value(rule_id(&color), "Verde"))
        .await
        .unwrap();
    let recalculator = PriceRecalculator::new(PricingConfig::default());
    let source = PriceSource::Attribute(rule_id(&color));

    let mut tx = fx.store.begin().await.unwrap();
    let mut rule = tx.get_attribute(rule_id(&color)).await.unwrap().unwrap();
    rule.core.price = d("25");
    tx.update_attribute(&rule).await.unwrap();
    let report = recalculator.recalculate_dependents(&mut tx, source).await.unwrap();
    assert_eq!(report.examined, 1);
    assert_eq!(report.updated, 1);
    tx.commit().await.unwrap();

    let writes = fx.store.variant_writes();
    let mut tx = fx.store.begin().await.unwrap();
    let report = recalculator.recalculate_dependents(&mut tx, source).await.unwrap();
    tx.commit().await.unwrap();

    assert_eq!(report.examined, 1);
    assert_eq!(report.updated, 0);
    assert_eq!(fx.store.variant_writes(), writes);
    assert_eq!(fx.stored_variant(variant.id).await.price_base, d("125.00"));
}
