pub mod message;
pub mod relay;
pub mod socket;
