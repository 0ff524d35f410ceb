//! Shared value model for the telltale change-tracking workspace.
//!
//! A [`Value`] is a dynamically shaped datum with *shared identity* for its
//! structured variants: cloning a `Value::Record` clones a reference to the
//! same underlying record, so the same record can sit under several parents
//! (or several independent trackers) at once. That identity is what the
//! tracking layer keys its handle graph on.
//!
//! Two families of structured values exist:
//!
//! - **Records and lists** are tracked field-by-field / index-by-index.
//! - **Container categories** ([`MapValue`], [`SetValue`], [`TimeValue`],
//!   [`NumBuffer`], [`ByteBuf`]) carry internal state that cannot be
//!   intercepted per key; the tracking layer treats them at container
//!   granularity only.
//!
//! The crate also provides the two collaborator utilities the tracking core
//! depends on at its boundary: [`snapshot::deep_clone`] for baseline copies
//! and JSON conversion ([`Value::from_json`] / [`Value::to_json`]) for
//! fixtures and plain-data projection.

pub mod containers;
pub mod json;
pub mod key;
pub mod snapshot;
pub mod value;

pub use containers::{ByteBuf, ContainerKind, MapValue, NumBuffer, SetValue, TimeValue};
pub use key::{join_path, Key, Symbol};
pub use snapshot::deep_clone;
pub use value::{List, Record, ScalarKey, Shared, Value, ValueId};
