pub mod encoding;
pub mod errors;

pub use errors::ChartError;
