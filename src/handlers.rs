// src/handlers.rs

use axum::{
    routing::{delete, get, post, put},
    Router,
};

use crate::{config::AppState, db::CatalogStore};

pub mod catalog;
pub mod images;
pub mod products;
pub mod rules;
pub mod stock;
pub mod taxes;
pub mod variants;

/// Todas as rotas da API, sobre qualquer store.
pub fn router<S: CatalogStore>(app_state: AppState<S>) -> Router {
    let tax_routes = Router::new()
        .route("/", post(taxes::create_tax::<S>))
        .route("/{id}", put(taxes::update_tax::<S>).delete(taxes::delete_tax::<S>));

    let rule_routes = Router::new()
        .route("/{kind}", post(rules::create_rule::<S>))
        .route("/{kind}/{id}", delete(rules::delete_rule::<S>))
        .route("/{kind}/{id}/price", put(rules::update_rule_price::<S>));

    let product_routes = Router::new()
        .route("/", post(products::create_product::<S>))
        .route("/{id}", delete(products::delete_product::<S>))
        .route("/{id}/pricing", put(products::update_pricing::<S>))
        .route("/{id}/promote", post(products::promote::<S>))
        .route("/{id}/features", put(products::set_feature::<S>))
        .route("/{id}/features/{feature_id}", delete(products::remove_feature::<S>))
        .route("/{id}/images", get(images::list_images::<S>));

    let variant_routes = Router::new()
        .route("/", post(variants::create_variant::<S>))
        .route(
            "/{id}",
            get(variants::get_variant::<S>)
                .put(variants::update_variant::<S>)
                .delete(variants::delete_variant::<S>),
        )
        .route("/{id}/price", get(variants::get_price::<S>))
        .route("/{id}/attributes", post(variants::add_attribute::<S>))
        .route("/{id}/stock", get(variants::get_stock::<S>));

    let attribute_value_routes = Router::new().route(
        "/{value_id}",
        put(variants::update_attribute::<S>).delete(variants::remove_attribute::<S>),
    );

    let stock_routes = Router::new()
        .route("/", post(stock::create_unit::<S>))
        .route("/{id}", put(stock::update_unit::<S>).delete(stock::delete_unit::<S>))
        .route("/{id}/split", post(stock::split_unit::<S>))
        .route("/{id}/lock", post(stock::lock_unit::<S>))
        .route("/{id}/consume", post(stock::consume_unit::<S>));

    let catalog_routes = Router::new()
        .route("/families", post(catalog::create_family::<S>))
        .route("/categories", post(catalog::create_category::<S>))
        .route("/subcategories", post(catalog::create_subcategory::<S>))
        .route("/brands", post(catalog::create_brand::<S>))
        .route("/option-groups", post(catalog::create_option_group::<S>))
        .route("/option-groups/{id}/values", post(catalog::add_option_value::<S>))
        .route("/{entity}/{id}", delete(catalog::delete_entity::<S>));

    let image_routes = Router::new()
        .route("/", post(images::add_image::<S>))
        .route("/{id}", put(images::update_image::<S>).delete(images::delete_image::<S>));

    Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api/taxes", tax_routes)
        .nest("/api/rules", rule_routes)
        .nest("/api/products", product_routes)
        .nest("/api/variants", variant_routes)
        .nest("/api/attribute-values", attribute_value_routes)
        .nest("/api/stock-units", stock_routes)
        .nest("/api/catalog", catalog_routes)
        .nest("/api/images", image_routes)
        .with_state(app_state)
}
