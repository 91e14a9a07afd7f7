pub mod r#trait {
    pub use super::trait_::*;
}
#[path = "trait.rs"]
mod trait_;
pub mod keys;
pub mod memory;

pub use keys::KeyNamespace;
pub use memory::MemoryKeyValueStore;
pub use r#trait::{CasOutcome, KeyValueStore, StoreResult};
