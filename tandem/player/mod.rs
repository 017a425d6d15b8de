pub mod controller;
pub mod gst_logic;
pub mod media;
pub mod playlist;
pub mod render;
pub mod session;

pub use self::gst_logic::GstMedia;
pub use self::session::{PlayerCommand, Session};
