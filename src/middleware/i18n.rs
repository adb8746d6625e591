// src/middleware/i18n.rs

use axum::extract::{FromRef, FromRequestParts};
use axum::http::{header, request::Parts};

use crate::models::text::Language;

// Extrator de idioma: primeiro idioma suportado do Accept-Language,
// senão o idioma padrão configurado no estado.
pub struct Locale(pub Language);

impl<S> FromRequestParts<S> for Locale
where
    S: Send + Sync,
    Language: FromRef<S>,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let lang = parts
            .headers
            .get(header::ACCEPT_LANGUAGE)
            .and_then(|header_value| header_value.to_str().ok())
            .and_then(|header_str| {
                // "es-ES,en;q=0.8" -> ["es-ES", "en"], já ordenado por peso
                accept_language::parse(header_str)
                    .iter()
                    .find_map(|tag| Language::from_code(tag))
            })
            .unwrap_or_else(|| Language::from_ref(state));

        Ok(Locale(lang))
    }
}
