//! Settings value object and merging

mod settings;

pub use settings::Settings;
