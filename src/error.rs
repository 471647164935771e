use std::error::Error;
use std::fmt;

/// Failure reported by the row store backing the tracker.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Db(#[from] sea_orm::DbErr),
    #[error("{table} id {id} not found")]
    NotFound { table: &'static str, id: i64 },
    #[error("constraint violated: {0}")]
    Constraint(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Failure of one tracker operation. Local state is untouched whenever one of
/// these is returned.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("load failed: {0}")]
    LoadFailed(#[source] StoreError),
    #[error("insert failed: {0}")]
    InsertFailed(#[source] StoreError),
    #[error("update failed: {0}")]
    UpdateFailed(#[source] StoreError),
    #[error("delete failed: {0}")]
    DeleteFailed(#[source] StoreError),
}

impl SyncError {
    pub fn store_error(&self) -> &StoreError {
        match self {
            Self::LoadFailed(err)
            | Self::InsertFailed(err)
            | Self::UpdateFailed(err)
            | Self::DeleteFailed(err) => err,
        }
    }
}

#[derive(Debug)]
pub enum AppError {
    Io(std::io::Error),
    Db(sea_orm::DbErr),
    Json(serde_json::Error),
    Sync(SyncError),
    NotFound(String),
    InvalidInput(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Io(err) => write!(f, "io error: {err}"),
            AppError::Db(err) => write!(f, "database error: {err}"),
            AppError::Json(err) => write!(f, "json error: {err}"),
            AppError::Sync(err) => write!(f, "{err}"),
            AppError::NotFound(message) => write_multiline(f, "Not found", message),
            AppError::InvalidInput(message) => write_multiline(f, "Invalid input", message),
        }
    }
}

impl Error for AppError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            AppError::Io(err) => Some(err),
            AppError::Db(err) => Some(err),
            AppError::Json(err) => Some(err),
            AppError::Sync(err) => Some(err),
            AppError::NotFound(_) | AppError::InvalidInput(_) => None,
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<sea_orm::DbErr> for AppError {
    fn from(value: sea_orm::DbErr) -> Self {
        Self::Db(value)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

impl From<SyncError> for AppError {
    fn from(value: SyncError) -> Self {
        Self::Sync(value)
    }
}

fn write_multiline(f: &mut fmt::Formatter<'_>, label: &str, message: &str) -> fmt::Result {
    if message.contains('\n') {
        write!(f, "{label}:\n{message}")
    } else {
        write!(f, "{label}: {message}")
    }
}
