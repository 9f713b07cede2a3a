//! Cross-platform clipboard-and-keystroke paste adapter
//!
//! Copies the text with arboard, then issues the platform paste shortcut
//! with enigo (Cmd+V on macOS, Ctrl+V elsewhere).

use async_trait::async_trait;

use crate::application::ports::{PasteError, TextPaster};

/// Paste adapter backed by arboard and enigo
pub struct ClipboardPaster;

impl ClipboardPaster {
    pub fn new() -> Self {
        Self
    }

    fn send_paste_shortcut() -> Result<(), PasteError> {
        use enigo::{Direction, Enigo, Key, Keyboard, Settings};

        let mut enigo = Enigo::new(&Settings::default())
            .map_err(|e| PasteError::KeystrokeFailed(format!("Failed to create enigo: {}", e)))?;

        #[cfg(target_os = "macos")]
        let modifier = Key::Meta;
        #[cfg(not(target_os = "macos"))]
        let modifier = Key::Control;

        enigo
            .key(modifier, Direction::Press)
            .map_err(|e| PasteError::KeystrokeFailed(e.to_string()))?;
        let result = enigo
            .key(Key::Unicode('v'), Direction::Click)
            .map_err(|e| PasteError::KeystrokeFailed(e.to_string()));
        // Release the modifier even if the 'v' press failed.
        let released = enigo
            .key(modifier, Direction::Release)
            .map_err(|e| PasteError::KeystrokeFailed(e.to_string()));
        result.and(released)
    }
}

impl Default for ClipboardPaster {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TextPaster for ClipboardPaster {
    async fn paste(&self, text: &str) -> Result<(), PasteError> {
        let text = text.to_owned();

        // arboard and enigo are blocking, so run in spawn_blocking
        tokio::task::spawn_blocking(move || {
            let mut clipboard = arboard::Clipboard::new()
                .map_err(|e| PasteError::ClipboardUnavailable(e.to_string()))?;
            clipboard
                .set_text(&text)
                .map_err(|e| PasteError::CopyFailed(e.to_string()))?;

            Self::send_paste_shortcut()
        })
        .await
        .map_err(|e| PasteError::KeystrokeFailed(format!("Task join error: {}", e)))?
    }
}
