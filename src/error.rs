use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::NaiveDate;
use serde_json::json;
use thiserror::Error;

/// Business-rule failures caught before anything is sent to the sheet.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Por favor, selecione um 'Fractal/Comportamento-Alvo' para todos os Vórtices.")]
    MissingCategory,

    #[error("Erro na Prioridade: Você deve selecionar uma prioridade diferente (1, 2, 3) para cada Vórtice. Não repita.")]
    DuplicatePriority,

    #[error("Prioridade inválida: {0} (use valores de 1 a 3)")]
    PriorityOutOfRange(i64),

    #[error("Prioridade inválida: '{0}' (use valores de 1 a 3)")]
    InvalidPriority(String),

    #[error("Data de nascimento fora do intervalo permitido: {0}")]
    BirthDateOutOfRange(NaiveDate),

    #[error("Data de nascimento inválida: {0}")]
    InvalidBirthDate(String),

    #[error("Fractal/Comportamento-Alvo desconhecido: {0}")]
    UnknownTargetCategory(String),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Erro ao conectar com o Google Sheets: {0}")]
    Connect(String),

    #[error("Erro ao enviar dados para a planilha: {0}")]
    Append(String),

    #[error("Credenciais inválidas: {0}")]
    Credentials(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required setting {0}")]
    Missing(&'static str),

    #[error("Invalid {key}: {reason}")]
    Invalid { key: &'static str, reason: String },

    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Failure to sign a link with the configured secret.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LinkError {
    #[error("Link secret rejected by HMAC-SHA256")]
    InvalidSecret,
}

/// Error surface of the JSON API.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Acesso bloqueado: {0}")]
    LinkInvalid(&'static str),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::LinkInvalid(_) => StatusCode::FORBIDDEN,
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Store(_) => StatusCode::BAD_GATEWAY,
        };

        let body = json!({ "success": false, "message": self.to_string() });
        (status, Json(body)).into_response()
    }
}
