// Ignore cache — TTL-gated suppression of recently-actioned accounts.
//
// One IgnoreCache type, two interchangeable backends behind the IgnoreStore
// trait: MemoryIgnoreStore (ephemeral, process lifetime) and the SQLite store
// in crate::db (durable). The tiers are never cross-checked automatically;
// callers pick the tier they consult.

pub mod cache;
pub mod memory;
pub mod traits;

pub use cache::{IgnoreCache, IgnoreTier};
pub use memory::MemoryIgnoreStore;
pub use traits::IgnoreStore;
