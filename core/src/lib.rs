pub mod action;
pub mod config;
pub mod preprocess;
pub mod report;
pub mod serdable;
pub mod style;
pub mod testing;

pub use crate::config::Config;
pub use crate::preprocess::preprocess;
