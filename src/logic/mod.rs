//! Logic Module - Parsing & Learning Engines
//!
//! ## Architecture
//! - `record` - One routing update: line decoder, AS path, `RouteRecord`
//! - `stats` - Exact streaming moments shared by the engines
//! - `snapshot/` - Per-AS aggregation of one routing dump
//! - `baseline/` - Learned per-AS behaviour, persistence
//! - `scorer/` - Snapshot vs baseline anomaly verdicts
//! - `pipeline` - Multi-file building and training on worker threads

// Core data
pub mod record;
pub mod stats;

// Engines
pub mod snapshot;
pub mod baseline;
pub mod scorer;
pub mod pipeline;
