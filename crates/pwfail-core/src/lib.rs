pub mod aggregate;
pub mod cache;
pub mod config;
pub mod environment;
pub mod error;
pub mod error_block;
pub mod fetch;
pub mod io;
pub mod log;
pub mod paths;
pub mod pipeline;
pub mod summary;
pub mod test_name;
pub mod types;

pub use error::{PwfailError, Result};
