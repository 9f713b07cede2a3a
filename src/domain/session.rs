//! Recording session state machine

use std::fmt;

use thiserror::Error;

/// Recording session states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Starting,
    Recording,
    Stopping,
    Error,
}

impl SessionState {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Starting => "starting",
            Self::Recording => "recording",
            Self::Stopping => "stopping",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error when an invalid state transition is attempted
#[derive(Debug, Clone, Error)]
#[error("Invalid state transition: cannot {action} while in {current_state} state")]
pub struct InvalidStateTransition {
    pub current_state: SessionState,
    pub action: &'static str,
}

/// Session lifecycle entity.
///
/// State machine:
///   IDLE -> STARTING (begin_start)
///   STARTING -> RECORDING (mark_recording)
///   STARTING -> IDLE (abort_start; validation failed, nothing acquired)
///   RECORDING -> STOPPING (begin_stop)
///   STOPPING -> IDLE (complete_stop)
///   any -> ERROR (fail)
///   ERROR -> IDLE (reset)
#[derive(Debug, Default)]
pub struct SessionMachine {
    state: SessionState,
}

impl SessionMachine {
    pub fn new() -> Self {
        Self {
            state: SessionState::Idle,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == SessionState::Idle
    }

    pub fn is_recording(&self) -> bool {
        self.state == SessionState::Recording
    }

    /// IDLE -> STARTING. The sole guard against overlapping recordings.
    pub fn begin_start(&mut self) -> Result<(), InvalidStateTransition> {
        if self.state != SessionState::Idle {
            return Err(InvalidStateTransition {
                current_state: self.state,
                action: "start recording",
            });
        }
        self.state = SessionState::Starting;
        Ok(())
    }

    /// STARTING -> RECORDING, once every sink is ready.
    pub fn mark_recording(&mut self) -> Result<(), InvalidStateTransition> {
        if self.state != SessionState::Starting {
            return Err(InvalidStateTransition {
                current_state: self.state,
                action: "mark recording",
            });
        }
        self.state = SessionState::Recording;
        Ok(())
    }

    /// STARTING -> IDLE, when validation rejects the config before any
    /// resource was acquired.
    pub fn abort_start(&mut self) -> Result<(), InvalidStateTransition> {
        if self.state != SessionState::Starting {
            return Err(InvalidStateTransition {
                current_state: self.state,
                action: "abort start",
            });
        }
        self.state = SessionState::Idle;
        Ok(())
    }

    /// RECORDING -> STOPPING.
    pub fn begin_stop(&mut self) -> Result<(), InvalidStateTransition> {
        if self.state != SessionState::Recording {
            return Err(InvalidStateTransition {
                current_state: self.state,
                action: "stop recording",
            });
        }
        self.state = SessionState::Stopping;
        Ok(())
    }

    /// STOPPING -> IDLE, after all sinks finalized.
    pub fn complete_stop(&mut self) -> Result<(), InvalidStateTransition> {
        if self.state != SessionState::Stopping {
            return Err(InvalidStateTransition {
                current_state: self.state,
                action: "complete stop",
            });
        }
        self.state = SessionState::Idle;
        Ok(())
    }

    /// Any state -> ERROR. Used for sink-open failures and device faults.
    pub fn fail(&mut self) {
        self.state = SessionState::Error;
    }

    /// ERROR -> IDLE, at the caller's explicit request.
    pub fn reset(&mut self) -> Result<(), InvalidStateTransition> {
        if self.state != SessionState::Error {
            return Err(InvalidStateTransition {
                current_state: self.state,
                action: "reset",
            });
        }
        self.state = SessionState::Idle;
        Ok(())
    }
}
