pub mod constants;
pub mod error;

pub use error::{AnalyzerError, AnalyzerResult};
