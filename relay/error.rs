use flexi_logger::FlexiLoggerError;
use std::io::Error as IoError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum App {
    #[error("I/O operation failed: {0}")]
    Io(#[from] IoError),
    #[error("Logger initialization error: {0}")]
    Logger(#[from] FlexiLoggerError),
}
