pub mod analytics;
pub mod entry;

pub use analytics::*;
pub use entry::*;
