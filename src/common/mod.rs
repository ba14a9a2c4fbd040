pub mod backoff;
pub mod errors;
pub mod http;
pub mod logger;
pub mod types;

pub use backoff::Backoff;
pub use errors::*;
pub use http::*;
pub use types::*;
