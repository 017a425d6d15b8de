use log::warn;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

#[derive(Clone, Debug)]
struct Frame {
    from: usize,
    text: String,
}

/// Fan-out point shared by every connection. Keeps no playback state.
pub struct Hub {
    tx: broadcast::Sender<Frame>,
    next_peer: AtomicUsize,
}

pub struct Peer {
    pub id: usize,
    rx: broadcast::Receiver<Frame>,
}

impl Hub {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            tx,
            next_peer: AtomicUsize::new(1),
        }
    }

    pub fn join(&self) -> Peer {
        Peer {
            id: self.next_peer.fetch_add(1, Ordering::Relaxed),
            rx: self.tx.subscribe(),
        }
    }

    pub fn peers(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Hands `text` to every other peer. Returns how many connections were listening.
    pub fn publish(&self, from: usize, text: String) -> usize {
        self.tx.send(Frame { from, text }).unwrap_or(0)
    }
}

impl Peer {
    /// Next frame sent by someone else, or `None` once the hub is gone.
    pub async fn recv(&mut self) -> Option<String> {
        loop {
            match self.rx.recv().await {
                Ok(frame) if frame.from == self.id => {}
                Ok(frame) => return Some(frame.text),
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Peer {} fell behind, {skipped} frames dropped", self.id);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}
