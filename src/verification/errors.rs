use thiserror::Error;

use crate::gamedb::DbError;

#[derive(Error, Debug)]
pub enum VerifyError {
    /// Operator error, not user error: a required role setting is absent.
    /// Raised before any lookup or side effect.
    #[error("the {0} role is not configured, set it with the config commands")]
    MissingConfiguration(&'static str),

    #[error("database failure during verification: {0}")]
    Database(#[from] DbError),
}
