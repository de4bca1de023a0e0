//! Component configuration sections

mod editor;
mod logging;

pub use editor::*;
pub use logging::*;
