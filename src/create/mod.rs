pub mod errors;
pub mod process;

pub use errors::*;
pub use process::*;
