//! Follows a generation run to its end and keeps whatever it produced.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use anyhow::Result;
use client_core::{GenerationClient, SessionState};
use shared::domain::Phase;
use tracing::warn;

use crate::{
    progress::ProgressView,
    store::{save_deck, SavedDeck},
};

/// How often the run loop checks that the connection is still open.
const LIVENESS_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug)]
pub struct RunOutcome {
    /// Last snapshot seen, including every slide received so far.
    pub state: Arc<SessionState>,
    /// Why the run stopped early; `None` once a terminal phase was reached.
    pub interrupted: Option<String>,
}

impl RunOutcome {
    fn stopped(state: Arc<SessionState>, reason: &str) -> Self {
        Self {
            state,
            interrupted: Some(reason.to_string()),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.interrupted.is_none() && self.state.phase == Phase::Done
    }

    /// Message the command should fail with, if any.
    pub fn failure(&self) -> Option<String> {
        if let Some(reason) = &self.interrupted {
            return Some(reason.clone());
        }
        (self.state.phase == Phase::Error).then(|| self.state.error.clone())
    }
}

/// Prints progress until the run reaches a terminal phase or stops early. The
/// first Ctrl-C asks the service to cancel; a second one drops the connection.
pub async fn follow_run(client: &Arc<GenerationClient>) -> RunOutcome {
    let mut state_rx = client.subscribe_state();
    let mut view = ProgressView::new();
    let mut cancel_requested = false;
    let mut liveness = tokio::time::interval(LIVENESS_INTERVAL);

    loop {
        let state = Arc::clone(&state_rx.borrow_and_update());
        for line in view.update(&state) {
            eprintln!("{line}");
        }
        if state.phase.is_terminal() {
            return RunOutcome {
                state,
                interrupted: None,
            };
        }

        tokio::select! {
            changed = state_rx.changed() => {
                if changed.is_err() {
                    return RunOutcome::stopped(state, "generation client went away");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                if cancel_requested {
                    return RunOutcome::stopped(client.snapshot(), "generation interrupted");
                }
                cancel_requested = true;
                match client.cancel_generation().await {
                    Ok(true) => eprintln!("Cancel requested, waiting for the server (Ctrl-C again to quit)"),
                    Ok(false) => return RunOutcome::stopped(client.snapshot(), "generation interrupted"),
                    Err(err) => warn!("failed to send cancel: {err}"),
                }
            }
            _ = liveness.tick() => {
                if !client.has_connection().await {
                    let current = client.snapshot();
                    if !current.phase.is_terminal() {
                        return RunOutcome::stopped(current, "connection closed before generation finished");
                    }
                }
            }
        }
    }
}

/// Writes the received slides to `<dir>/<title>.json`. Runs that produced no
/// slides leave nothing behind.
pub async fn save_received(dir: &Path, state: &SessionState) -> Result<Option<PathBuf>> {
    let deck = SavedDeck::from_state(state);
    if deck.slides.is_empty() {
        return Ok(None);
    }
    save_deck(dir, &deck).await.map(Some)
}

#[cfg(test)]
#[path = "tests/run_tests.rs"]
mod tests;
