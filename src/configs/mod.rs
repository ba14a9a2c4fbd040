pub mod base;
pub mod cache;
pub mod logging;
pub mod resolver;
pub mod server;
pub mod spotify;

pub use base::*;
pub use cache::*;
pub use logging::*;
pub use resolver::*;
pub use server::*;
pub use spotify::*;
