use crate::connection::TransportError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("Unknown chart type: {0}")]
    UnknownChartType(String),

    #[error("annotation source type '{0}' is not implemented yet")]
    NotImplemented(String),

    #[error(transparent)]
    Transport(#[from] TransportError),
}
