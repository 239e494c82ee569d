pub mod config;
pub mod datasets;
pub mod ingest;
pub mod registries;
