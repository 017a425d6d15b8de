use crate::error::App;

/// The single audio element the controller drives.
///
/// Times are in seconds. `duration` is NaN until the backend knows it.
/// Every `set_source` moves `source_id` forward, and events carry the id of
/// the source they belong to.
pub trait MediaElement {
    fn set_source(&mut self, url: &str) -> Result<(), App>;
    fn source_id(&self) -> u64;
    fn play(&mut self) -> Result<(), App>;
    fn pause(&mut self) -> Result<(), App>;
    fn is_paused(&self) -> bool;
    fn current_time(&self) -> f64;
    fn set_current_time(&mut self, seconds: f64) -> Result<(), App>;
    fn duration(&self) -> f64;
}

/// Notifications coming back from the media backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaEvent {
    Ended { source: u64 },
}
