pub mod catalog;
pub mod info;
pub mod stream;

pub use catalog::{artist_albums, artist_top_tracks, get_artist, search_songs};
pub use info::{get_banner, get_info};
pub use stream::stream_track;
