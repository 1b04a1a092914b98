// Selection - Per-batch filter / rank / limit over the tracker store

pub mod pipeline;

pub use pipeline::{Candidate, SelectionPipeline, SelectionStats};
