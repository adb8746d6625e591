use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use serde_json::json;
use thiserror::Error;

// Nosso tipo de erro, com `thiserror` para melhor ergonomia.
// Os erros de domínio sabem a que campo do formulário pertencem (ver `field`),
// para a camada de apresentação mostrar a mensagem ao lado do campo certo.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("{entity} não encontrado(a)")]
    NotFound { entity: &'static str },

    #[error("Já existe uma unidade com o valor '{value}' para a característica especial deste produto")]
    DuplicateUniqueValue { value: String },

    #[error("Uma unidade com característica especial única só admite quantidade 1 (recebido {requested})")]
    QuantityExceeded { requested: Decimal },

    #[error("O produto não declara nenhuma característica especial")]
    MissingSpecialFeature,

    #[error("Stock insuficiente: pedido {requested}, disponível {available}")]
    InsufficientStock { requested: Decimal, available: Decimal },

    #[error("Não é necessário dividir: a quantidade pedida é todo o stock da unidade ({quantity})")]
    SplitTakesWholeUnit { quantity: Decimal },

    #[error("Não é possível apagar {entity}: existe relação com {relation}")]
    BlockedDeletion {
        entity: &'static str,
        relation: &'static str,
    },

    #[error("Valor inválido para o {rule}: {reason}")]
    InvalidRuleValue { rule: &'static str, reason: String },

    #[error("O {rule} não se aplica a este produto ({reason})")]
    RuleOutOfScope { rule: &'static str, reason: String },

    #[error("A variante já tem um valor para este atributo")]
    DuplicateAttributeValue,

    #[error("O código '{0}' já está em uso")]
    CodeAlreadyExists(String),

    // Variante para erros de banco de dados
    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    // Variante genérica para qualquer outro erro inesperado
    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),
}

impl AppError {
    pub fn not_found(entity: &'static str) -> Self {
        AppError::NotFound { entity }
    }

    /// Campo do formulário ao qual o erro deve ser associado.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            AppError::DuplicateUniqueValue { .. } => Some("value"),
            AppError::InvalidRuleValue { .. } => Some("value"),
            AppError::QuantityExceeded { .. } => Some("stockOriginal"),
            AppError::MissingSpecialFeature => Some("variantId"),
            AppError::InsufficientStock { .. } => Some("quantity"),
            AppError::SplitTakesWholeUnit { .. } => Some("quantity"),
            AppError::RuleOutOfScope { .. } => Some("ruleId"),
            AppError::DuplicateAttributeValue => Some("ruleId"),
            AppError::CodeAlreadyExists(_) => Some("code"),
            _ => None,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_)
            | AppError::InvalidRuleValue { .. }
            | AppError::RuleOutOfScope { .. }
            | AppError::QuantityExceeded { .. }
            | AppError::MissingSpecialFeature
            | AppError::SplitTakesWholeUnit { .. } => StatusCode::BAD_REQUEST,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::DuplicateUniqueValue { .. }
            | AppError::DuplicateAttributeValue
            | AppError::CodeAlreadyExists(_)
            | AppError::BlockedDeletion { .. }
            | AppError::InsufficientStock { .. } => StatusCode::CONFLICT,
            AppError::DatabaseError(_) | AppError::InternalServerError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = match &self {
            // Retorna todos os detalhes da validação, campo a campo.
            AppError::ValidationError(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .map(|e| {
                            e.message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| e.code.to_string())
                        })
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                json!({
                    "error": "Um ou mais campos são inválidos.",
                    "details": details,
                })
            }

            // Erros internos: o `tracing` loga o detalhe, o cliente só vê a mensagem genérica.
            AppError::DatabaseError(e) => {
                tracing::error!("Erro de banco de dados: {:?}", e);
                json!({ "error": "Ocorreu um erro inesperado." })
            }
            AppError::InternalServerError(e) => {
                tracing::error!("Erro Interno do Servidor: {:?}", e);
                json!({ "error": "Ocorreu um erro inesperado." })
            }

            e => {
                let message = e.to_string();
                match e.field() {
                    Some(field) => {
                        let mut details = serde_json::Map::new();
                        details.insert(field.to_string(), json!([message.clone()]));
                        json!({ "error": message, "details": details })
                    }
                    None => json!({ "error": message }),
                }
            }
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_errors_are_keyed_by_field() {
        let err = AppError::DuplicateUniqueValue { value: "SN001".into() };
        assert_eq!(err.field(), Some("value"));
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert!(err.to_string().contains("SN001"));
    }

    #[test]
    fn blocked_deletion_names_the_relation() {
        let err = AppError::BlockedDeletion {
            entity: "tipo de imposto",
            relation: "produtos",
        };
        assert_eq!(
            err.to_string(),
            "Não é possível apagar tipo de imposto: existe relação com produtos"
        );
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn validation_errors_are_bad_request() {
        let err = AppError::ValidationError(validator::ValidationErrors::new());
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.field(), None);
    }
}
