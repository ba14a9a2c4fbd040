pub mod client;
pub mod models;
pub mod token;

pub use client::SpotifyCatalog;
pub use token::SpotifyTokenTracker;
