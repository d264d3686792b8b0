use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),
    #[error("TLS initialization failed: {0}")]
    Tls(#[from] native_tls::Error),
}
