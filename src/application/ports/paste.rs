//! Text paste port interface

use async_trait::async_trait;
use thiserror::Error;

/// Paste errors
#[derive(Debug, Clone, Error)]
pub enum PasteError {
    #[error("Clipboard unavailable: {0}")]
    ClipboardUnavailable(String),

    #[error("Failed to copy to clipboard: {0}")]
    CopyFailed(String),

    #[error("Failed to send paste keystroke: {0}")]
    KeystrokeFailed(String),
}

/// Port for delivering transcribed text into the focused application
#[async_trait]
pub trait TextPaster: Send + Sync {
    /// Place `text` on the clipboard and issue the platform paste
    /// keystroke into the currently focused window.
    async fn paste(&self, text: &str) -> Result<(), PasteError>;
}

/// Blanket implementation for boxed paster types
#[async_trait]
impl TextPaster for Box<dyn TextPaster> {
    async fn paste(&self, text: &str) -> Result<(), PasteError> {
        self.as_ref().paste(text).await
    }
}
