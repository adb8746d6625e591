use crate::common::error::AppError;

// ---
// Helper: tradução de violações de unicidade
// ---
/// Converte um `sqlx::Error` em `AppError`. Se for uma violação de chave
/// única, `on_conflict` recebe o nome da constraint e pode devolver o erro de
/// domínio correspondente; caso contrário vira `AppError::DatabaseError`.
pub(crate) fn map_unique_violation<F>(e: sqlx::Error, on_conflict: F) -> AppError
where
    F: FnOnce(&str) -> Option<AppError>,
{
    if let Some(db_err) = e.as_database_error() {
        if db_err.is_unique_violation() {
            let constraint = db_err.constraint().unwrap_or_default();
            if let Some(mapped) = on_conflict(constraint) {
                return mapped;
            }
        }
    }
    e.into()
}

/// Nomes das constraints usadas pela migração, para o mapeamento acima.
pub(crate) mod constraints {
    pub const PRODUCT_CODE: &str = "products_code_key";
    pub const VARIANT_CODE: &str = "variants_code_key";
    pub const TAX_NAME: &str = "tax_rates_name_key";
    pub const FAMILY_CODE: &str = "families_code_key";
    pub const CATEGORY_CODE: &str = "categories_code_key";
    pub const SUBCATEGORY_CODE: &str = "subcategories_code_key";
    pub const OPTION_GROUP_NAME: &str = "option_groups_name_key";
    pub const VARIANT_ATTRIBUTE: &str = "variant_attribute_values_variant_id_attribute_id_key";
    pub const UNIQUE_STOCK_VALUE: &str = "stock_units_product_unique_value_key";
}
