// Store - Shared per-entity indicator state

pub mod tracker_store;

pub use tracker_store::{SharedTracker, TrackerStore, TrackerStoreStats};
