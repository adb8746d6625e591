pub mod catalog_repo;
pub mod memory_repo;
pub mod store;

pub use catalog_repo::PgCatalogStore;
pub use memory_repo::MemoryCatalogStore;
pub use store::{CatalogEntity, CatalogStore, CatalogTx, Dependency, PriceSource};
