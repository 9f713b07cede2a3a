//! cpal capture adapters

mod cpal_stream;
mod mic_capture;

pub use cpal_stream::CpalDeviceStream;
pub use mic_capture::CpalMicCapture;
