//! Text paste adapters

mod clipboard;

pub use clipboard::ClipboardPaster;
