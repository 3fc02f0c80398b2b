//! Upload states and the trail a run leaves behind.

use std::fmt;
use std::time::Instant;

use serde::Serialize;
use tracing::{info, warn};

use tubely_models::AssetId;

use crate::error::UploadError;

/// Stages of a single upload.
///
/// `Received -> Authorized -> Staged -> Probed -> Transcoded -> Uploaded -> Finalized`,
/// with `Failed` reachable from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadState {
    Received,
    Authorized,
    Staged,
    Probed,
    Transcoded,
    Uploaded,
    Finalized,
    Failed,
}

impl UploadState {
    pub fn as_str(&self) -> &'static str {
        match self {
            UploadState::Received => "received",
            UploadState::Authorized => "authorized",
            UploadState::Staged => "staged",
            UploadState::Probed => "probed",
            UploadState::Transcoded => "transcoded",
            UploadState::Uploaded => "uploaded",
            UploadState::Finalized => "finalized",
            UploadState::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, UploadState::Finalized | UploadState::Failed)
    }
}

impl fmt::Display for UploadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Records and logs each transition of one run.
#[derive(Debug)]
pub(crate) struct StateTrail {
    asset_id: AssetId,
    states: Vec<UploadState>,
    entered: Instant,
}

impl StateTrail {
    pub(crate) fn new(asset_id: AssetId) -> Self {
        Self {
            asset_id,
            states: vec![UploadState::Received],
            entered: Instant::now(),
        }
    }

    pub(crate) fn current(&self) -> UploadState {
        self.states
            .last()
            .copied()
            .unwrap_or(UploadState::Received)
    }

    pub(crate) fn advance(&mut self, next: UploadState) {
        let duration_ms = self.entered.elapsed().as_millis() as u64;
        info!(
            asset_id = %self.asset_id,
            state = %next,
            from = %self.current(),
            duration_ms,
            "Upload state changed"
        );
        self.states.push(next);
        self.entered = Instant::now();
    }

    pub(crate) fn fail(&mut self, error: &UploadError) {
        if self.current().is_terminal() {
            return;
        }
        warn!(
            asset_id = %self.asset_id,
            state = %UploadState::Failed,
            from = %self.current(),
            kind = %error.kind(),
            "Upload failed: {}",
            error
        );
        self.states.push(UploadState::Failed);
    }

    pub(crate) fn into_states(self) -> Vec<UploadState> {
        self.states
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trail_records_order() {
        let mut trail = StateTrail::new(AssetId::new());
        trail.advance(UploadState::Authorized);
        trail.advance(UploadState::Staged);
        trail.fail(&UploadError::validation("too big"));
        // A second failure does not add another terminal state.
        trail.fail(&UploadError::validation("again"));

        assert_eq!(
            trail.into_states(),
            vec![
                UploadState::Received,
                UploadState::Authorized,
                UploadState::Staged,
                UploadState::Failed
            ]
        );
    }

    #[test]
    fn test_terminal_states() {
        assert!(UploadState::Finalized.is_terminal());
        assert!(UploadState::Failed.is_terminal());
        assert!(!UploadState::Uploaded.is_terminal());
        assert_eq!(
            serde_json::to_string(&UploadState::Transcoded).unwrap(),
            "\"transcoded\""
        );
    }
}
