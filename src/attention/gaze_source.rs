//! Single-subscriber gaze channel
//!
//! The gaze estimator publishes samples into a `GazeHub`; the active
//! attention set holds the only `GazeSubscription`. Subscribing again
//! disconnects the previous subscriber before the new one is attached, and
//! dropping the subscription is unsubscribing.

use crate::types::GazeSample;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};

/// Publish side, held by the gaze estimator glue
#[derive(Debug, Default)]
pub struct GazeHub {
    tx: Option<Sender<GazeSample>>,
}

impl GazeHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a new subscriber, detaching any previous one.
    pub fn subscribe(&mut self) -> GazeSubscription {
        // Old sender goes first so the previous receiver sees a disconnect.
        self.tx = None;
        let (tx, rx) = mpsc::channel();
        self.tx = Some(tx);
        GazeSubscription { rx }
    }

    /// Push a sample to the current subscriber.
    ///
    /// Returns `false` when nobody is listening (never subscribed, or the
    /// subscription was dropped); the sample is discarded.
    pub fn publish(&mut self, sample: GazeSample) -> bool {
        let Some(tx) = &self.tx else {
            return false;
        };
        if tx.send(sample).is_ok() {
            true
        } else {
            self.tx = None;
            false
        }
    }

    pub fn has_subscriber(&self) -> bool {
        self.tx.is_some()
    }

    /// Stop publishing; the subscriber sees a disconnected channel.
    pub fn close(&mut self) {
        self.tx = None;
    }
}

/// Consumer side, owned by the running attention set
#[derive(Debug)]
pub struct GazeSubscription {
    rx: Receiver<GazeSample>,
}

impl GazeSubscription {
    /// Drain everything queued since the last call and return the newest
    /// sample, or `None` when the source produced nothing.
    pub fn latest(&self) -> Option<GazeSample> {
        let mut newest = None;
        loop {
            match self.rx.try_recv() {
                Ok(sample) => newest = Some(sample),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        newest
    }
}
