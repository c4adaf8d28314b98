pub mod chart;

pub use chart::{execute, USAGE};
