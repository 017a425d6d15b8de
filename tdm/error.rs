use std::io::Error as IoError;
use thiserror::Error;
use zbus::Error as ZbusError;

#[derive(Error, Debug)]
pub enum App {
    #[error("I/O operation failed")]
    Io(#[from] IoError),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Zbus error")]
    Zbus(#[from] ZbusError),
}
