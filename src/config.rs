// src/config.rs

use anyhow::Context;
use axum::extract::FromRef;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::{env, time::Duration};

use crate::{
    common::money::{PricingConfig, RoundingMode},
    db::{CatalogStore, PgCatalogStore},
    models::text::Language,
    services::{CatalogService, ImageService, PriceRecalculator, StockService},
};

/// Configuração lida do ambiente (e do `.env`, se existir).
#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: Option<String>,
    pub bind_addr: String,
    pub max_connections: u32,
    pub pricing: PricingConfig,
    pub default_language: Language,
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let max_connections = match env::var("DB_MAX_CONNECTIONS") {
            Ok(raw) => raw.parse().context("DB_MAX_CONNECTIONS deve ser um número")?,
            Err(_) => 5,
        };

        let scale = match env::var("CURRENCY_DECIMAL_PLACES") {
            Ok(raw) => raw.parse().context("CURRENCY_DECIMAL_PLACES deve ser um número")?,
            Err(_) => 2,
        };

        let rounding = match env::var("PRICE_ROUNDING") {
            Ok(raw) => RoundingMode::parse(&raw)
                .with_context(|| format!("PRICE_ROUNDING inválido: {raw}"))?,
            Err(_) => RoundingMode::Bankers,
        };

        let default_language = match env::var("DEFAULT_LANGUAGE") {
            Ok(raw) => Language::from_code(&raw)
                .with_context(|| format!("DEFAULT_LANGUAGE não suportado: {raw}"))?,
            Err(_) => Language::Es,
        };

        Ok(Self {
            database_url: env::var("DATABASE_URL").ok(),
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            max_connections,
            pricing: PricingConfig { scale, rounding },
            default_language,
        })
    }
}

#[derive(Clone)]
pub struct AppState<S: CatalogStore> {
    pub catalog_service: CatalogService<S>,
    pub stock_service: StockService<S>,
    pub image_service: ImageService<S>,
    pub default_language: Language,
}

impl<S: CatalogStore> AppState<S> {
    /// Monta o gráfico de dependências sobre um store qualquer.
    pub fn with_store(store: S, pricing: PricingConfig, default_language: Language) -> Self {
        let recalculator = PriceRecalculator::new(pricing);
        Self {
            catalog_service: CatalogService::new(store.clone(), recalculator),
            stock_service: StockService::new(store.clone()),
            image_service: ImageService::new(store),
            default_language,
        }
    }
}

impl AppState<PgCatalogStore> {
    /// Conecta ao Postgres, corre as migrações e devolve o estado pronto.
    pub async fn new(settings: &Settings) -> anyhow::Result<(Self, PgPool)> {
        let database_url = settings
            .database_url
            .as_deref()
            .context("DATABASE_URL deve ser definida")?;

        // Conecta ao banco de dados, usando '?' para propagar erros
        let db_pool = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(database_url)
            .await?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        sqlx::migrate!().run(&db_pool).await?;
        tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

        let store = PgCatalogStore::new(db_pool.clone());
        let state = Self::with_store(store, settings.pricing, settings.default_language);
        Ok((state, db_pool))
    }
}

// O extrator `Locale` lê o idioma padrão daqui.
impl<S: CatalogStore> FromRef<AppState<S>> for Language {
    fn from_ref(state: &AppState<S>) -> Language {
        state.default_language
    }
}
