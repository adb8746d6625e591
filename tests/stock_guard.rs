mod common;

use catalog::{
    common::error::AppError,
    models::{
        product::{Product, ProductPricingInput, Variant},
        rule::{PriceMode, RuleKind, ValueKind},
        stock::{StockQuantityInput, StockUnitInput},
    },
};
use common::{d, rule_id, rule_input, Fixture};
use uuid::Uuid;

async fn special_feature(fx: &Fixture, unique: bool) -> Uuid {
    let mut input = rule_input("0", PriceMode::Increase, ValueKind::FreeText);
    input.unique = unique;
    let serial = fx
        .state
        .catalog_service
        .create_rule(RuleKind::SpecialFeature, input)
        .await
        .unwrap();
    rule_id(&serial)
}

/// Produto com característica especial (única ou não) e uma variante.
async fn serialized_product(fx: &Fixture, code: &str, unique: bool) -> (Product, Variant) {
    let mut product = fx.product_input(code, "100");
    product.special_feature_id = Some(special_feature(fx, unique).await);
    let product = fx.state.catalog_service.create_product(product).await.unwrap();
    let variant = fx.variant(&product).await;
    (product, variant)
}

fn unit(variant_id: Uuid, value: Option<&str>, quantity: &str) -> StockUnitInput {
    StockUnitInput {
        variant_id,
        box_id: Uuid::new_v4(),
        value: value.map(str::to_string),
        caducity: None,
        stock_original: d(quantity),
    }
}

fn qty(quantity: &str, from_locked: bool) -> StockQuantityInput {
    StockQuantityInput {
        quantity: d(quantity),
        from_locked,
    }
}

#[tokio::test]
async fn duplicate_serial_is_rejected_across_variants() {
    let fx = Fixture::new().await;
    let (product, first) = serialized_product(&fx, "PHONE", true).await;
    let second = fx.variant(&product).await;
    let stock = &fx.state.stock_service;

    let saved = stock.add_stock_unit(unit(first.id, Some("SN001"), "1")).await.unwrap();
    assert_eq!(saved.product_id, product.id);
    assert_eq!(saved.stock_real, d("1"));
    assert_eq!(saved.stock_locked, d("0"));

    let err = stock
        .add_stock_unit(unit(second.id, Some("SN001"), "1"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::DuplicateUniqueValue { ref value } if value == "SN001"));
    assert_eq!(fx.store.snapshot().await.stock_units.len(), 1);

    stock.add_stock_unit(unit(second.id, Some("SN002"), "1")).await.unwrap();
}

#[tokio::test]
async fn unit_can_be_saved_again_with_its_own_value() {
    let fx = Fixture::new().await;
    let (_, variant) = serialized_product(&fx, "PHONE", true).await;
    let stock = &fx.state.stock_service;

    let saved = stock.add_stock_unit(unit(variant.id, Some("SN001"), "1")).await.unwrap();
    let mut edit = unit(variant.id, Some("SN001"), "1");
    edit.box_id = saved.box_id;
    let updated = stock.update_stock_unit(saved.id, edit).await.unwrap();
    assert_eq!(updated.value.as_deref(), Some("SN001"));
}

#[tokio::test]
async fn product_without_special_feature_cannot_hold_units() {
    let fx = Fixture::new().await;
    let product = fx.product("PLAIN", "10").await;
    let variant = fx.variant(&product).await;

    let err = fx
        .state
        .stock_service
        .add_stock_unit(unit(variant.id, Some("X"), "1"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::MissingSpecialFeature));
}

#[tokio::test]
async fn unique_units_hold_a_single_item() {
    let fx = Fixture::new().await;
    let (_, variant) = serialized_product(&fx, "PHONE", true).await;

    let err = fx
        .state
        .stock_service
        .add_stock_unit(unit(variant.id, Some("SN009"), "2"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::QuantityExceeded { .. }));
}

#[tokio::test]
async fn non_unique_feature_accepts_repeated_values() {
    let fx = Fixture::new().await;
    let (_, variant) = serialized_product(&fx, "FLOUR", false).await;
    let stock = &fx.state.stock_service;

    stock.add_stock_unit(unit(variant.id, Some("LOTE-7"), "20")).await.unwrap();
    let second = stock.add_stock_unit(unit(variant.id, Some("LOTE-7"), "5")).await.unwrap();
    assert_eq!(second.unique_value, None);

    let totals = stock.totals(variant.id).await.unwrap();
    assert_eq!(totals.stock_original, d("25"));
    assert_eq!(totals.available(), d("25"));
}

#[tokio::test]
async fn unique_units_require_a_value() {
    let fx = Fixture::new().await;
    let (_, variant) = serialized_product(&fx, "PHONE", true).await;

    let err = fx
        .state
        .stock_service
        .add_stock_unit(unit(variant.id, None, "1"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidRuleValue { .. }));
    assert_eq!(err.field(), Some("value"));
    assert!(fx.store.snapshot().await.stock_units.is_empty());

    // Sem unicidade, a unidade pode ficar sem valor.
    let (_, bulk) = serialized_product(&fx, "FLOUR", false).await;
    fx.state
        .stock_service
        .add_stock_unit(unit(bulk.id, None, "3"))
        .await
        .unwrap();
}

// --- Troca da característica especial do produto ---

fn pricing(product: &Product, special_feature_id: Option<Uuid>) -> ProductPricingInput {
    ProductPricingInput {
        base_price: product.base_price,
        tax_id: product.tax_id,
        special_feature_id,
    }
}

#[tokio::test]
async fn switching_to_a_unique_feature_rejects_repeated_serials() {
    let fx = Fixture::new().await;
    let (product, first) = serialized_product(&fx, "PHONE", false).await;
    let second = fx.variant(&product).await;
    let stock = &fx.state.stock_service;
    let saved = stock.add_stock_unit(unit(first.id, Some("SN001"), "1")).await.unwrap();
    stock.add_stock_unit(unit(second.id, Some("SN001"), "1")).await.unwrap();
    let unique = special_feature(&fx, true).await;
    let before = fx.store.snapshot().await;

    let err = fx
        .state
        .catalog_service
        .update_product_pricing(product.id, pricing(&product, Some(unique)))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::DuplicateUniqueValue { ref value } if value == "SN001"));

    let after = fx.store.snapshot().await;
    assert_eq!(after.products, before.products);
    assert_eq!(after.stock_units, before.stock_units);

    // O produto continua a aceitar regravar as suas unidades.
    let mut edit = unit(first.id, Some("SN001"), "1");
    edit.box_id = saved.box_id;
    stock.update_stock_unit(saved.id, edit).await.unwrap();
}

#[tokio::test]
async fn switching_to_a_unique_feature_rejects_bulk_units() {
    let fx = Fixture::new().await;
    let (product, variant) = serialized_product(&fx, "FLOUR", false).await;
    fx.state
        .stock_service
        .add_stock_unit(unit(variant.id, Some("LOTE-1"), "5"))
        .await
        .unwrap();
    let unique = special_feature(&fx, true).await;

    let err = fx
        .state
        .catalog_service
        .update_product_pricing(product.id, pricing(&product, Some(unique)))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::QuantityExceeded { .. }));
}

#[tokio::test]
async fn switching_the_feature_rewrites_the_unique_index() {
    let fx = Fixture::new().await;
    let (product, first) = serialized_product(&fx, "PHONE", false).await;
    let second = fx.variant(&product).await;
    let stock = &fx.state.stock_service;
    let a = stock.add_stock_unit(unit(first.id, Some("SN001"), "1")).await.unwrap();
    let b = stock.add_stock_unit(unit(second.id, Some("SN002"), "1")).await.unwrap();
    assert_eq!(a.unique_value, None);
    let unique = special_feature(&fx, true).await;

    let (product, _) = fx
        .state
        .catalog_service
        .update_product_pricing(product.id, pricing(&product, Some(unique)))
        .await
        .unwrap();
    let units = fx.store.snapshot().await.stock_units;
    assert_eq!(units[&a.id].unique_value.as_deref(), Some("SN001"));
    assert_eq!(units[&b.id].unique_value.as_deref(), Some("SN002"));

    // A partir daqui o número de série é exclusivo.
    let err = stock
        .add_stock_unit(unit(second.id, Some("SN001"), "1"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::DuplicateUniqueValue { .. }));
    let mut edit = unit(first.id, Some("SN001"), "1");
    edit.box_id = a.box_id;
    stock.update_stock_unit(a.id, edit).await.unwrap();

    // Voltar a uma característica sem unicidade limpa o índice.
    let bulk = special_feature(&fx, false).await;
    fx.state
        .catalog_service
        .update_product_pricing(product.id, pricing(&product, Some(bulk)))
        .await
        .unwrap();
    let units = fx.store.snapshot().await.stock_units;
    assert!(units.values().all(|u| u.unique_value.is_none()));
    stock.add_stock_unit(unit(second.id, Some("SN001"), "1")).await.unwrap();
}

#[tokio::test]
async fn split_moves_quantity_to_a_sibling() {
    let fx = Fixture::new().await;
    let (_, variant) = serialized_product(&fx, "FLOUR", false).await;
    let stock = &fx.state.stock_service;
    let source = stock.add_stock_unit(unit(variant.id, Some("LOTE-1"), "10")).await.unwrap();

    let (source, sibling) = stock.split(source.id, qty("4", false)).await.unwrap();
    assert_eq!(source.stock_real, d("6"));
    assert_eq!(sibling.stock_real, d("4"));
    assert_eq!(sibling.box_id, source.box_id);
    assert_eq!(sibling.value.as_deref(), Some("LOTE-1"));

    let totals = stock.totals(variant.id).await.unwrap();
    assert_eq!(totals.stock_real, d("10"));
}

#[tokio::test]
async fn split_rejects_whole_unit_and_excess() {
    let fx = Fixture::new().await;
    let (_, variant) = serialized_product(&fx, "FLOUR", false).await;
    let stock = &fx.state.stock_service;
    let source = stock.add_stock_unit(unit(variant.id, Some("LOTE-2"), "10")).await.unwrap();

    let err = stock.split(source.id, qty("10", false)).await.unwrap_err();
    assert!(matches!(err, AppError::SplitTakesWholeUnit { .. }));

    let err = stock.split(source.id, qty("11", false)).await.unwrap_err();
    assert!(matches!(err, AppError::InsufficientStock { .. }));

    stock.lock(source.id, qty("8", false)).await.unwrap();
    let err = stock.split(source.id, qty("3", false)).await.unwrap_err();
    assert!(matches!(err, AppError::InsufficientStock { .. }));

    let (source, sibling) = stock.split(source.id, qty("3", true)).await.unwrap();
    assert_eq!(source.stock_locked, d("5"));
    assert_eq!(sibling.stock_locked, d("3"));
}

#[tokio::test]
async fn splitting_a_unique_unit_would_duplicate_its_serial() {
    let fx = Fixture::new().await;
    let (_, variant) = serialized_product(&fx, "PHONE", true).await;
    let stock = &fx.state.stock_service;
    let source = stock.add_stock_unit(unit(variant.id, Some("SN100"), "1")).await.unwrap();

    let err = stock.split(source.id, qty("0.5", false)).await.unwrap_err();
    assert!(matches!(err, AppError::DuplicateUniqueValue { .. }));
    assert_eq!(fx.store.snapshot().await.stock_units[&source.id], source);
}

#[tokio::test]
async fn lock_and_consume_keep_counters_consistent() {
    let fx = Fixture::new().await;
    let (_, variant) = serialized_product(&fx, "FLOUR", false).await;
    let stock = &fx.state.stock_service;
    let saved = stock.add_stock_unit(unit(variant.id, Some("LOTE-3"), "10")).await.unwrap();

    let locked = stock.lock(saved.id, qty("4", false)).await.unwrap();
    assert_eq!(locked.available(), d("6"));

    let err = stock.lock(saved.id, qty("7", false)).await.unwrap_err();
    assert!(matches!(err, AppError::InsufficientStock { .. }));

    let consumed = stock.consume(saved.id, qty("4", true)).await.unwrap();
    assert_eq!(consumed.stock_real, d("6"));
    assert_eq!(consumed.stock_locked, d("0"));

    let consumed = stock.consume(saved.id, qty("6", false)).await.unwrap();
    assert_eq!(consumed.stock_real, d("0"));

    let err = stock.consume(saved.id, qty("1", false)).await.unwrap_err();
    assert!(matches!(err, AppError::InsufficientStock { .. }));
}
