use nw_archive::ArchiveStore;
use nw_providers::Aggregator;

pub struct AppState {
    pub aggregator: Aggregator,
    pub archive: ArchiveStore,
}
