use crate::error::App;
use crate::sync::message::SyncMessage;
use log::{debug, info};
use tokio::sync::mpsc;

/// Outbound half of listen-together: the activation flag plus the socket queue.
///
/// Inbound messages do not pass through here; they are applied whatever the flag says.
pub struct SyncRelay {
    active: bool,
    outbound: Option<mpsc::UnboundedSender<SyncMessage>>,
}

impl SyncRelay {
    pub fn new(outbound: Option<mpsc::UnboundedSender<SyncMessage>>, active: bool) -> Self {
        Self { active, outbound }
    }

    /// Player without a relay connection.
    pub fn baseline() -> Self {
        Self::new(None, false)
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn toggle(&mut self) -> bool {
        self.active = !self.active;
        if self.active {
            info!("Listen Together activated");
        } else {
            info!("Listen Together deactivated");
        }
        self.active
    }

    /// Returns whether the message was queued for the socket.
    pub fn broadcast(&self, message: SyncMessage) -> Result<bool, App> {
        if !self.active {
            return Ok(false);
        }
        let Some(outbound) = &self.outbound else {
            debug!("No relay connection, dropping {message:?}");
            return Ok(false);
        };
        outbound.send(message)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::controller::tests::{abc, FakeMedia};
    use crate::player::controller::Controller;
    use crate::sync::message::Origin;
    use tokio::sync::mpsc::error::TryRecvError;

    fn relay(active: bool) -> (SyncRelay, mpsc::UnboundedReceiver<SyncMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (SyncRelay::new(Some(tx), active), rx)
    }

    #[test]
    fn inactive_relay_sends_nothing() {
        let (relay, mut rx) = relay(false);
        assert!(!relay.broadcast(SyncMessage::Play).unwrap());
        assert_eq!(rx.try_recv(), Err(TryRecvError::Empty));
    }

    #[test]
    fn toggle_off_suppresses_until_toggled_back_on() {
        let (mut relay, mut rx) = relay(true);
        assert!(relay.broadcast(SyncMessage::Pause).unwrap());
        assert_eq!(rx.try_recv(), Ok(SyncMessage::Pause));

        assert!(!relay.toggle());
        relay.broadcast(SyncMessage::Play).unwrap();
        relay.broadcast(SyncMessage::Skip { index: 1 }).unwrap();
        assert_eq!(rx.try_recv(), Err(TryRecvError::Empty));

        assert!(relay.toggle());
        relay.broadcast(SyncMessage::Seek { time: 3.0 }).unwrap();
        assert_eq!(rx.try_recv(), Ok(SyncMessage::Seek { time: 3.0 }));
    }

    #[test]
    fn baseline_relay_drops_everything() {
        let mut relay = SyncRelay::baseline();
        relay.toggle();
        assert!(!relay.broadcast(SyncMessage::Play).unwrap());
    }

    #[test]
    fn closed_socket_is_a_send_error() {
        let (relay, rx) = relay(true);
        drop(rx);
        assert!(matches!(relay.broadcast(SyncMessage::Play), Err(App::Send(_))));
    }

    #[test]
    fn local_actions_reach_the_socket_but_remote_skips_do_not() {
        let (relay, mut rx) = relay(true);
        let mut controller = Controller::new(FakeMedia::new());
        controller.replace_playlist(abc()).unwrap();

        if let Some(msg) = controller.play_at(0, Origin::Local).unwrap() {
            relay.broadcast(msg).unwrap();
        }
        assert_eq!(rx.try_recv(), Ok(SyncMessage::Skip { index: 0 }));

        controller.apply_remote(&SyncMessage::Skip { index: 2 }).unwrap();
        assert_eq!(controller.current_index(), Some(2));
        assert_eq!(rx.try_recv(), Err(TryRecvError::Empty));
    }
}
