use protogonos_types::SubstrateError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CortexError {
    #[error("no component registered under name '{0}'")]
    NotFound(String),

    #[error("component '{0}' is already registered")]
    AlreadyRegistered(String),

    #[error("component '{name}' is incompatible with scape '{scape}'")]
    Incompatible { name: String, scape: String },

    #[error("component '{name}' version mismatch: expected schema {expected_schema}/codec {expected_codec}, got schema {got_schema}/codec {got_codec}")]
    VersionMismatch {
        name: String,
        expected_schema: u32,
        expected_codec: u32,
        got_schema: u32,
        got_codec: u32,
    },

    #[error(transparent)]
    Substrate(#[from] SubstrateError),
}
