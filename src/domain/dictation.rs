//! Push-to-talk dictation state machine
//!
//! Independent of the recording session machine; the two only meet at the
//! capture gate.

use std::fmt;

use thiserror::Error;

/// Dictation states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DictationState {
    #[default]
    Idle,
    Capturing,
    Transcribing,
    Error,
}

impl DictationState {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Capturing => "capturing",
            Self::Transcribing => "transcribing",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for DictationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error when an invalid dictation transition is attempted
#[derive(Debug, Clone, Error)]
#[error("Invalid dictation transition: cannot {action} while in {current_state} state")]
pub struct InvalidDictationTransition {
    pub current_state: DictationState,
    pub action: &'static str,
}

/// Dictation lifecycle entity.
///
/// State machine:
///   IDLE -> CAPTURING (begin_capture, hold-key down)
///   CAPTURING -> TRANSCRIBING (begin_transcribe, hold-key up)
///   CAPTURING -> IDLE (abort_capture; capture failed to start cleanly)
///   TRANSCRIBING -> IDLE (complete)
///   TRANSCRIBING -> ERROR (fail) -> IDLE (reset)
#[derive(Debug, Default)]
pub struct DictationMachine {
    state: DictationState,
}

impl DictationMachine {
    pub fn new() -> Self {
        Self {
            state: DictationState::Idle,
        }
    }

    pub fn state(&self) -> DictationState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == DictationState::Idle
    }

    pub fn is_capturing(&self) -> bool {
        self.state == DictationState::Capturing
    }

    pub fn is_transcribing(&self) -> bool {
        self.state == DictationState::Transcribing
    }

    pub fn begin_capture(&mut self) -> Result<(), InvalidDictationTransition> {
        if self.state != DictationState::Idle {
            return Err(InvalidDictationTransition {
                current_state: self.state,
                action: "begin capture",
            });
        }
        self.state = DictationState::Capturing;
        Ok(())
    }

    pub fn abort_capture(&mut self) -> Result<(), InvalidDictationTransition> {
        if self.state != DictationState::Capturing {
            return Err(InvalidDictationTransition {
                current_state: self.state,
                action: "abort capture",
            });
        }
        self.state = DictationState::Idle;
        Ok(())
    }

    pub fn begin_transcribe(&mut self) -> Result<(), InvalidDictationTransition> {
        if self.state != DictationState::Capturing {
            return Err(InvalidDictationTransition {
                current_state: self.state,
                action: "begin transcription",
            });
        }
        self.state = DictationState::Transcribing;
        Ok(())
    }

    pub fn complete(&mut self) -> Result<(), InvalidDictationTransition> {
        if self.state != DictationState::Transcribing {
            return Err(InvalidDictationTransition {
                current_state: self.state,
                action: "complete transcription",
            });
        }
        self.state = DictationState::Idle;
        Ok(())
    }

    pub fn fail(&mut self) {
        self.state = DictationState::Error;
    }

    pub fn reset(&mut self) {
        self.state = DictationState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_machine_is_idle() {
        assert!(DictationMachine::new().is_idle());
    }

    #[test]
    fn full_cycle() {
        let mut machine = DictationMachine::new();
        machine.begin_capture().unwrap();
        assert!(machine.is_capturing());
        machine.begin_transcribe().unwrap();
        assert!(machine.is_transcribing());
        machine.complete().unwrap();
        assert!(machine.is_idle());
    }

    #[test]
    fn capture_while_transcribing_is_rejected() {
        let mut machine = DictationMachine::new();
        machine.begin_capture().unwrap();
        machine.begin_transcribe().unwrap();

        let err = machine.begin_capture().unwrap_err();
        assert_eq!(err.current_state, DictationState::Transcribing);
        assert!(machine.is_transcribing());
    }

    #[test]
    fn repeated_capture_is_rejected() {
        let mut machine = DictationMachine::new();
        machine.begin_capture().unwrap();
        assert!(machine.begin_capture().is_err());
    }

    #[test]
    fn abort_capture_returns_to_idle() {
        let mut machine = DictationMachine::new();
        machine.begin_capture().unwrap();
        machine.abort_capture().unwrap();
        assert!(machine.is_idle());
    }

    #[test]
    fn fail_then_reset() {
        let mut machine = DictationMachine::new();
        machine.begin_capture().unwrap();
        machine.begin_transcribe().unwrap();
        machine.fail();
        assert_eq!(machine.state(), DictationState::Error);
        machine.reset();
        assert!(machine.is_idle());
    }

    #[test]
    fn state_display() {
        assert_eq!(DictationState::Capturing.to_string(), "capturing");
        assert_eq!(DictationState::Transcribing.to_string(), "transcribing");
    }
}
