//! Copy-on-write collections.
//!
//! Every mutation of these collections copies the current backing
//! collection, applies the change to the private copy, and publishes the copy
//! with a single atomic store. Readers never lock and never observe a
//! half-applied change; writers are admitted one at a time.
//!
//! - [`CopyOnWrite`]: the protocol itself, for any cloneable value
//! - [`CowMap`]: a map over any [`MapStore`], with key, value and entry views
//! - [`CowSortedMap`]: a `BTreeMap`-backed [`CowMap`] with ordered accessors and
//!   range-scoped [`SubMap`] views
//! - [`CowSet`]: a set over any [`SetStore`]
//!
//! # Examples
//!
//! ```rust
//! use synchrony::cow::{CowError, CowSortedMap};
//! use std::collections::BTreeMap;
//!
//! let routes: CowSortedMap<String, u16> = CowSortedMap::new(BTreeMap::new());
//! routes.put("/api/users".to_string(), 8080);
//! routes.put("/api/orders".to_string(), 8081);
//! routes.put("/static".to_string(), 9000);
//!
//! let api = routes.sub_map("/api".to_string(), "/api~".to_string()).unwrap();
//! assert_eq!(api.len(), 2);
//! assert_eq!(api.put("/admin".to_string(), 1), Err(CowError::KeyOutOfRange));
//!
//! let rejected = routes.keys().insert("/x".to_string()).unwrap_err();
//! assert_eq!(rejected.to_string(), "key set does not support insert");
//! ```

mod copy_on_write;
mod error;
mod map;
mod set;
mod sorted;
mod store;

pub use copy_on_write::CopyOnWrite;
pub use error::CowError;
pub use map::{CowMap, Cursor, EntrySet, KeySet, SnapshotIter, Values};
pub use set::CowSet;
pub use sorted::{CowSortedMap, KeyRange, SubMap};
pub use store::{MapStore, SetStore, SortedMapStore};
