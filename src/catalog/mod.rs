pub mod facade;

pub use facade::{AlbumSummary, CatalogFacade, SongSummary};
