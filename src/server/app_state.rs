use crate::{catalog::CatalogFacade, configs::Config, fetcher::TrackFetcher};

/// Top-level application state shared by every route.
pub struct AppState {
    pub config: Config,
    pub fetcher: TrackFetcher,
    pub catalog: CatalogFacade,
}
