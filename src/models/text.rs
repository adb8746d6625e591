// src/models/text.rs

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use validator::Validate;

// --- Idiomas suportados ---
// O conjunto é fechado em tempo de compilação: cada entidade traduzível guarda
// um mapa idioma -> texto, em vez de uma tabela por idioma.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Es,
    En,
}

impl Language {
    pub const ALL: [Language; 2] = [Language::Es, Language::En];

    pub fn code(&self) -> &'static str {
        match self {
            Language::Es => "es",
            Language::En => "en",
        }
    }

    /// Aceita "es", "ES", "es-ES"... só o prefixo primário conta.
    pub fn from_code(code: &str) -> Option<Self> {
        let primary = code.split(['-', '_']).next().unwrap_or(code);
        Self::ALL
            .into_iter()
            .find(|lang| lang.code().eq_ignore_ascii_case(primary))
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

// --- Texto traduzível (produtos e variantes) ---
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TranslatableText {
    #[validate(length(min = 1, max = 250, message = "O nome é obrigatório."))]
    pub name: String,
    #[validate(length(max = 250))]
    pub slug: String,
    pub description_short: Option<String>,
    pub description_long: Option<String>,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
}

pub type Translations = BTreeMap<Language, TranslatableText>;

/// Rótulo curto por idioma (descrição de regras, opções, famílias...).
pub type LocalizedLabel = BTreeMap<Language, String>;

/// Devolve o texto no idioma pedido ou, na falta dele, o primeiro disponível
/// seguindo a ordem de `Language::ALL`.
pub fn pick<T>(map: &BTreeMap<Language, T>, lang: Language) -> Option<&T> {
    map.get(&lang)
        .or_else(|| Language::ALL.iter().find_map(|l| map.get(l)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_language_tags() {
        assert_eq!(Language::from_code("es-ES"), Some(Language::Es));
        assert_eq!(Language::from_code("EN"), Some(Language::En));
        assert_eq!(Language::from_code("pt-BR"), None);
    }

    #[test]
    fn pick_falls_back_to_first_available() {
        let mut labels = LocalizedLabel::new();
        labels.insert(Language::En, "Red".to_string());
        assert_eq!(pick(&labels, Language::Es).map(String::as_str), Some("Red"));
        labels.insert(Language::Es, "Rojo".to_string());
        assert_eq!(pick(&labels, Language::Es).map(String::as_str), Some("Rojo"));
    }
}
