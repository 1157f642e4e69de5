pub mod command;
pub mod error_kind;
pub mod judge;
pub mod result;
pub mod runner;
pub mod subject;
pub mod testcase;

pub use command::*;
pub use error_kind::*;
pub use judge::*;
pub use result::*;
pub use runner::*;
pub use subject::*;
pub use testcase::*;
