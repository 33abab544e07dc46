use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CrvError {
    #[error("io error: {0}")]
    Io(String),
    #[error("config parse error: {0}")]
    ConfigParse(String),
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("report parse error: {0}")]
    ReportParse(String),
    #[error("terminal error: {0}")]
    Terminal(String),
}
