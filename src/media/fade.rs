//! Asynchronous volume ramps. A fade never blocks the command path: the
//! ramp runs in its own task and aborts itself the moment a newer fade
//! claims the generation token.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde_json::json;

use crate::media::ipc::IpcChannel;
use crate::media::protocol::cmd;

const STEP: Duration = Duration::from_millis(50);

/// Linearly ramps the player volume from `from` to `to` over `duration`.
/// Returns early when superseded.
pub async fn run(
    ipc: &IpcChannel,
    generation: &AtomicU64,
    token: u64,
    from: f64,
    to: f64,
    duration: Duration,
) {
    let steps = (duration.as_millis() / STEP.as_millis()).max(1) as u32;
    for step in 1..=steps {
        if generation.load(Ordering::SeqCst) != token {
            return;
        }
        let progress = f64::from(step) / f64::from(steps);
        let volume = from + (to - from) * progress;
        let _ = ipc
            .command(cmd::set_property("volume", json!(volume)))
            .await;
        if step < steps {
            tokio::time::sleep(STEP).await;
        }
    }
}

/// Claims a new fade token, cancelling any ramp in flight.
pub fn claim(generation: &Arc<AtomicU64>) -> u64 {
    generation.fetch_add(1, Ordering::SeqCst) + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claim_invalidates_previous_token() {
        let generation = Arc::new(AtomicU64::new(0));
        let first = claim(&generation);
        let second = claim(&generation);
        assert_ne!(first, second);
        assert_eq!(generation.load(Ordering::SeqCst), second);
    }
}
