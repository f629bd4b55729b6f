use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum HydroError {
    #[error("invalid site code: {0}")]
    InvalidSiteCode(String),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("no parameters requested")]
    EmptyParameters,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("SPARQL request failed: {0}")]
    SparqlHttp(String),

    #[error("SPARQL endpoint returned status {status}: {message}")]
    SparqlStatus { status: u16, message: String },

    #[error("malformed SPARQL response: {0}")]
    MalformedResponse(String),

    #[error("CSV store error: {0}")]
    Persistence(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}
