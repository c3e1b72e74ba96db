use stockwatch_core::error::DomainError;
use stockwatch_ports::error::PortError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("domain error: {0}")]
    Domain(#[from] DomainError),
    #[error("port error: {0}")]
    Port(#[from] PortError),
}

impl AppError {
    pub fn not_found() -> Self {
        Self::Port(PortError::NotFound)
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Port(PortError::NotFound))
    }
}
