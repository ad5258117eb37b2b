//! The countdown is a value owned by the coordinator plus at most one
//! ticker task. Starting a new countdown cancels the previous one
//! atomically; admin stop/skip/start-now all go through the same cancel
//! path, and a cancelled countdown never fires another tick.

use std::time::Duration;

use tokio::task::JoinHandle;

use crate::common::types::{SessionKey, SongId};
use crate::room::RoomEvent;

#[derive(Debug, Clone, PartialEq)]
pub struct Countdown {
    pub seconds_remaining: u32,
    pub requires_approval: bool,
    pub song_id: SongId,
    pub singer: SessionKey,
    pub generation: u64,
}

/// At most one ticker exists; dropping/aborting it stops the ticks, and
/// the generation makes late ticks inert.
pub struct Ticker {
    pub generation: u64,
    handle: JoinHandle<()>,
}

impl Ticker {
    pub fn spawn(generation: u64, ticks: flume::Sender<RoomEvent>) -> Self {
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick of `interval` completes immediately.
            interval.tick().await;
            loop {
                interval.tick().await;
                if ticks.send(RoomEvent::CountdownTick { generation }).is_err() {
                    break;
                }
            }
        });
        Self { generation, handle }
    }

    pub fn cancel(self) {
        self.handle.abort();
    }
}
