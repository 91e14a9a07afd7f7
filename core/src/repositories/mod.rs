//! Storage seam and its in-process implementation.

pub mod kv;

pub use kv::{CasOutcome, KeyNamespace, KeyValueStore, MemoryKeyValueStore, StoreResult};
