pub mod plugin;
pub mod spotify;
pub mod youtube;

#[cfg(test)]
pub(crate) mod testing;

pub use plugin::{AudioResolver, CatalogService};
pub use spotify::SpotifyCatalog;
pub use youtube::YtDlpResolver;
