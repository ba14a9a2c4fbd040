pub mod cache;
pub mod catalog;
pub mod common;
pub mod configs;
pub mod fetcher;
pub mod range;
pub mod resolver;
pub mod server;
pub mod sources;
pub mod transport;
