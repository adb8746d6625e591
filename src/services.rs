pub mod catalog_service;
pub mod image_service;
pub mod pricing;
pub mod recalculation;
pub mod rule_values;
pub mod stock_service;

pub use catalog_service::CatalogService;
pub use image_service::ImageService;
pub use recalculation::{PriceRecalculator, RecalculationReport};
pub use stock_service::StockService;
