// src/services/rule_values.rs

use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::CatalogTx,
    models::{
        catalog::OptionValue,
        product::Product,
        rule::{RuleCore, RuleKind, ValueKind},
        text::{pick, Language},
    },
};

/// Tamanho máximo de um valor livre (mesmo limite da coluna).
pub const MAX_VALUE_LEN: usize = 80;

fn invalid(kind: RuleKind, reason: impl Into<String>) -> AppError {
    AppError::InvalidRuleValue {
        rule: kind.label(),
        reason: reason.into(),
    }
}

/// Normaliza um booleano vindo de formulário para "0"/"1".
pub fn parse_boolean(raw: &str) -> Option<&'static str> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" | "si" | "sí" => Some("1"),
        "0" | "false" | "off" | "no" => Some("0"),
        _ => None,
    }
}

/// Valida `raw` contra o `value_kind` da regra e devolve o valor a gravar.
/// Opções têm de pertencer ao grupo de valores da regra.
pub async fn normalize_value<T: CatalogTx>(
    tx: &mut T,
    kind: RuleKind,
    core: &RuleCore,
    raw: &str,
) -> Result<String, AppError> {
    match core.value_kind {
        ValueKind::FreeText => {
            let value = raw.trim();
            if value.is_empty() {
                return Err(invalid(kind, "o valor é obrigatório"));
            }
            if value.chars().count() > MAX_VALUE_LEN {
                return Err(invalid(kind, format!("máximo de {MAX_VALUE_LEN} caracteres")));
            }
            Ok(value.to_string())
        }
        ValueKind::Boolean => parse_boolean(raw)
            .map(str::to_string)
            .ok_or_else(|| invalid(kind, "esperado um valor booleano")),
        ValueKind::OptionList => {
            let group_id = core
                .option_group_id
                .ok_or_else(|| invalid(kind, "a regra não tem grupo de valores"))?;
            let option_id = Uuid::parse_str(raw.trim())
                .map_err(|_| invalid(kind, "opção inválida"))?;
            let option = tx
                .get_option_value(option_id)
                .await?
                .ok_or_else(|| invalid(kind, "opção inexistente"))?;
            if option.group_id != group_id {
                return Err(invalid(kind, "a opção não pertence ao grupo de valores da regra"));
            }
            Ok(option.id.to_string())
        }
    }
}

/// Garante que a família/categoria da regra coincide com a do produto.
pub fn check_scope(kind: RuleKind, core: &RuleCore, product: &Product) -> Result<(), AppError> {
    if let Some(family_id) = core.family_id {
        if family_id != product.family_id {
            return Err(AppError::RuleOutOfScope {
                rule: kind.label(),
                reason: "família diferente".into(),
            });
        }
    }
    if let Some(category_id) = core.category_id {
        if category_id != product.category_id {
            return Err(AppError::RuleOutOfScope {
                rule: kind.label(),
                reason: "categoria diferente".into(),
            });
        }
    }
    Ok(())
}

/// Texto para apresentação de um valor gravado.
pub fn display_value(
    value_kind: ValueKind,
    value: &str,
    option: Option<&OptionValue>,
    lang: Language,
) -> String {
    match value_kind {
        ValueKind::FreeText => value.to_string(),
        ValueKind::Boolean => match value {
            "1" => "True".to_string(),
            _ => "False".to_string(),
        },
        ValueKind::OptionList => option
            .and_then(|o| pick(&o.labels, lang))
            .cloned()
            .unwrap_or_else(|| value.to_string()),
    }
}
