//! Lifecycle shared by every pipeline stage.
//!
//! ```text
//! Uninitialized --configure--> Ready --configure--> Ready (buffers reused or reallocated)
//!                                 \--shutdown--> Released --configure--> Ready
//! ```
//! A failed `configure` leaves both state and buffers as they were.

use crate::core::error::Error;
use crate::core::types::Result;

/// Lifecycle state of a stage
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StageState {
    #[default]
    Uninitialized,
    Ready,
    Released,
}

/// Behaviour common to all stages. `configure` and `run` are stage-specific
/// because their inputs differ.
pub trait Stage {
    /// Name used in logs and `NotReady` errors
    const NAME: &'static str;

    fn state(&self) -> StageState;

    /// Release owned buffers. Calling it again is a no-op.
    fn shutdown(&mut self);

    /// Error unless the stage has been configured and not shut down.
    fn ensure_ready(&self) -> Result<()> {
        match self.state() {
            StageState::Ready => Ok(()),
            _ => Err(Error::NotReady(Self::NAME)),
        }
    }
}
