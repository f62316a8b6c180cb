pub mod serial;
pub mod slug;

use thiserror::Error;

/// Ошибки выделения уникальных идентификаторов (SNO, слаги).
#[derive(Debug, Error)]
pub enum AllocError {
    /// Исчерпан лимит проверок глобальной уникальности.
    #[error("no free serial number found after {attempts} attempts")]
    RetriesExhausted { attempts: u32 },
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}
