//! Transparent change tracking for nested structured values.
//!
//! Wrap a nested structure ([`Value`]) in a [`Tracker`] and mutate it
//! through the returned [`Handle`]; the tracker silently records which
//! dotted paths changed since the last reset. A notification layer lets
//! observers subscribe to batches of changed paths, either via push
//! callbacks or a pull-based blocking sequence.
//!
//! The same underlying value may be shared across several parents and
//! several independent trackers: the handle graph gives every value
//! exactly one canonical node, and every mutation fans out to every root
//! that can reach it, each root recording the paths of its own tree.
//!
//! # Example
//!
//! ```
//! use serde_json::json;
//! use telltale::{Tracker, Value};
//!
//! let tracker = Tracker::new(Value::from_json(json!({"a": {"b": {"c": 0}}}))).unwrap();
//! let a = tracker.handle().get_handle("a").unwrap().unwrap();
//! let b = a.get_handle("b").unwrap().unwrap();
//! b.set("c", 1i64).unwrap();
//!
//! let mut paths = tracker.dirty_paths();
//! paths.sort();
//! assert_eq!(paths, vec!["a", "a.b", "a.b.c"]);
//! ```

pub mod adapter;
pub mod changeset;
pub mod container;
pub mod error;
pub mod handle;
pub mod notify;
pub mod tracker;

mod graph;
mod propagate;

pub use changeset::ChangeSet;
pub use container::{BytesHandle, MapHandle, NumBufHandle, SetHandle, TimeHandle};
pub use error::{Error, SchemaError};
pub use handle::Handle;
pub use notify::{PullSubscription, PushSubscription};
pub use tracker::{is_tracked, subscribe, subscribe_pull, Canonicalize, Tracker};

// Re-export the value model so downstream users need only one crate.
pub use telltale_value::{
    deep_clone, join_path, ByteBuf, ContainerKind, Key, List, MapValue, NumBuffer, Record,
    ScalarKey, SetValue, Symbol, TimeValue, Value, ValueId,
};
