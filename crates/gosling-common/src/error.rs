use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid version: {0}")]
    InvalidVersion(String),

    #[error("invalid migration: {0}")]
    InvalidMigration(String),

    #[error("duplicate migration version: {0}")]
    DuplicateVersion(i64),

    #[error("database error: {0}")]
    Database(String),

    /// The version ledger table does not exist yet.
    #[error("version ledger missing: {0}")]
    LedgerMissing(String),

    /// Nothing left to resolve. Strategies treat this as a no-op, not a failure.
    #[error("no next version found")]
    NoNextVersion,

    #[error("migration {version} failed: {reason}")]
    Execution { version: i64, reason: String },

    #[error("no migration found for version {0}")]
    MissingMigration(i64),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Wrap a failure raised while running migration `version`.
    pub fn execution(version: i64, reason: impl std::fmt::Display) -> Self {
        Error::Execution {
            version,
            reason: reason.to_string(),
        }
    }
}
