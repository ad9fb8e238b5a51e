pub mod drill;
pub mod source;

pub use drill::render_script;
pub use source::{CsvSource, SourceError};
