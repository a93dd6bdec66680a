use thiserror::Error;

use crate::audio::AudioError;
use crate::config::ConfigError;
use crate::planner::ServiceError;
use crate::trip::ShareError;

/// Every failure a command can surface to the user
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Share(#[from] ShareError),
    #[error(transparent)]
    Audio(#[from] AudioError),
    #[error(transparent)]
    Upstream(#[from] ServiceError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    NotFound(String),
}

impl AppError {
    /// Short message shown to the user; the detailed error goes to the log
    pub fn notice(&self) -> String {
        match self {
            AppError::Share(ShareError::MalformedShareLink(_)) => {
                "El enlace compartido está dañado o incompleto.".to_string()
            }
            AppError::Share(ShareError::SchemaMismatch(_)) => {
                "El enlace compartido no contiene un viaje válido.".to_string()
            }
            AppError::Audio(AudioError::Decode(_)) => {
                "No se pudo decodificar la audioguía.".to_string()
            }
            AppError::Audio(AudioError::SessionClosed) => {
                "El reproductor ya está cerrado.".to_string()
            }
            AppError::Audio(AudioError::Output(_)) => {
                "No se pudo abrir la salida de audio.".to_string()
            }
            AppError::Upstream(e) if e.is_retriable() => {
                "El servicio no responde ahora mismo. Inténtalo de nuevo en unos minutos.".to_string()
            }
            AppError::Upstream(_) => {
                "Error de conexión con el asistente. Revisa tu conexión a internet.".to_string()
            }
            AppError::Config(e) => e.to_string(),
            AppError::Database(_) => "No se pudo acceder a tus viajes guardados.".to_string(),
            AppError::Io(e) => format!("No se pudo leer o escribir el archivo: {}", e),
            AppError::NotFound(what) => what.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_each_kind_has_a_distinct_notice() {
        let errors: Vec<AppError> = vec![
            ShareError::MalformedShareLink("x".into()).into(),
            ShareError::SchemaMismatch("x".into()).into(),
            AudioError::Decode("x".into()).into(),
            AudioError::SessionClosed.into(),
            ServiceError::Status {
                model: "m".into(),
                status: 400,
                body: String::new(),
            }
            .into(),
        ];

        let notices: Vec<String> = errors.iter().map(AppError::notice).collect();
        for (i, notice) in notices.iter().enumerate() {
            assert!(!notice.is_empty());
            assert!(!notices[i + 1..].contains(notice));
        }
    }

    #[test]
    fn test_notice_hides_details() {
        let error: AppError = ShareError::MalformedShareLink("invalid base64 payload: byte 3".into()).into();
        assert!(!error.notice().contains("base64"));
        assert!(error.to_string().contains("base64"));
    }
}
