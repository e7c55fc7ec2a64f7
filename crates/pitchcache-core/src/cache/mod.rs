//! Persistent cache compartments.
//!
//! A compartment is a named key→response store. Two families exist:
//! - shell compartments (`static-{release}`) hold the application shell
//! - data compartments (`data-{release}-{host}`) hold API responses per host
//!
//! `CacheStore` is the contract; `MemoryCacheStore` and `DiskCacheStore`
//! implement it.

pub mod disk;
pub mod memory;
pub mod store;

pub use disk::{CachedEntry, CompartmentSummary, DiskCacheStore};
pub use memory::MemoryCacheStore;
pub use store::{
    data_name, data_release_prefix, shell_name, CacheStore, Compartment, CompartmentKind,
    MatchOptions,
};
