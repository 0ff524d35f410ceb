//! Typed handles for container-category values.
//!
//! Container internals cannot be intercepted per key, so these handles run
//! every operation against the exact underlying instance and route it
//! through one choke point that consults the mutation adapter: operations
//! classified as mutating mark the container's own path (and its
//! ancestors, in every owning root) dirty after the real method runs;
//! read/derive operations pass straight through.

use telltale_value::{
    ByteBuf, ContainerKind, MapValue, NumBuffer, ScalarKey, SetValue, Shared, TimeValue, Value,
};

use crate::adapter;
use crate::graph::NodeRef;
use crate::propagate::propagate;

macro_rules! container_handle {
    ($name:ident, $payload:ty, $kind:expr) => {
        #[derive(Clone)]
        pub struct $name {
            node: NodeRef,
            payload: Shared<$payload>,
        }

        impl $name {
            pub(crate) fn new(node: NodeRef, payload: Shared<$payload>) -> Self {
                Self { node, payload }
            }

            /// Run `op` named `method` against the underlying instance and
            /// propagate container-level dirtiness when the adapter
            /// classifies it as mutating.
            fn invoke<R>(&self, method: &'static str, op: impl FnOnce(&mut $payload) -> R) -> R {
                let out = op(&mut self.payload.borrow_mut());
                if adapter::is_mutating($kind, method) {
                    propagate(&self.node, None);
                }
                out
            }
        }
    };
}

container_handle!(MapHandle, MapValue, ContainerKind::Map);
container_handle!(SetHandle, SetValue, ContainerKind::Set);
container_handle!(TimeHandle, TimeValue, ContainerKind::Time);
container_handle!(NumBufHandle, NumBuffer, ContainerKind::NumBuf);
container_handle!(BytesHandle, ByteBuf, ContainerKind::Bytes);

impl MapHandle {
    pub fn get(&self, key: &ScalarKey) -> Option<Value> {
        self.invoke("get", |m| m.get(key).cloned())
    }

    pub fn set(&self, key: impl Into<ScalarKey>, value: impl Into<Value>) -> Option<Value> {
        let (key, value) = (key.into(), value.into());
        self.invoke("set", |m| m.set(key, value))
    }

    pub fn delete(&self, key: &ScalarKey) -> bool {
        self.invoke("delete", |m| m.delete(key))
    }

    pub fn clear(&self) {
        self.invoke("clear", |m| m.clear());
    }

    pub fn has(&self, key: &ScalarKey) -> bool {
        self.invoke("has", |m| m.has(key))
    }

    pub fn size(&self) -> usize {
        self.invoke("size", |m| m.size())
    }

    pub fn keys(&self) -> Vec<ScalarKey> {
        self.invoke("keys", |m| m.keys().cloned().collect())
    }

    pub fn values(&self) -> Vec<Value> {
        self.invoke("values", |m| m.values().cloned().collect())
    }

    pub fn entries(&self) -> Vec<(ScalarKey, Value)> {
        self.invoke("entries", |m| {
            m.entries().map(|(k, v)| (k.clone(), v.clone())).collect()
        })
    }
}

impl SetHandle {
    pub fn add(&self, elem: impl Into<ScalarKey>) -> bool {
        let elem = elem.into();
        self.invoke("add", |s| s.add(elem))
    }

    pub fn delete(&self, elem: &ScalarKey) -> bool {
        self.invoke("delete", |s| s.delete(elem))
    }

    pub fn clear(&self) {
        self.invoke("clear", |s| s.clear());
    }

    pub fn has(&self, elem: &ScalarKey) -> bool {
        self.invoke("has", |s| s.has(elem))
    }

    pub fn size(&self) -> usize {
        self.invoke("size", |s| s.size())
    }

    pub fn elems(&self) -> Vec<ScalarKey> {
        self.invoke("elems", |s| s.iter().cloned().collect())
    }
}

impl TimeHandle {
    pub fn get_time(&self) -> i64 {
        self.invoke("get_time", |t| t.get_time())
    }

    pub fn set_time(&self, millis: i64) {
        self.invoke("set_time", |t| t.set_time(millis));
    }

    pub fn year(&self) -> i32 {
        self.invoke("year", |t| t.year())
    }

    pub fn set_year(&self, year: i32) -> bool {
        self.invoke("set_year", |t| t.set_year(year))
    }

    pub fn month(&self) -> u32 {
        self.invoke("month", |t| t.month())
    }

    pub fn set_month(&self, month: u32) -> bool {
        self.invoke("set_month", |t| t.set_month(month))
    }

    pub fn day(&self) -> u32 {
        self.invoke("day", |t| t.day())
    }

    pub fn set_day(&self, day: u32) -> bool {
        self.invoke("set_day", |t| t.set_day(day))
    }

    pub fn hours(&self) -> u32 {
        self.invoke("hours", |t| t.hours())
    }

    pub fn set_hours(&self, hours: u32) -> bool {
        self.invoke("set_hours", |t| t.set_hours(hours))
    }

    pub fn minutes(&self) -> u32 {
        self.invoke("minutes", |t| t.minutes())
    }

    pub fn set_minutes(&self, minutes: u32) -> bool {
        self.invoke("set_minutes", |t| t.set_minutes(minutes))
    }

    pub fn seconds(&self) -> u32 {
        self.invoke("seconds", |t| t.seconds())
    }

    pub fn set_seconds(&self, seconds: u32) -> bool {
        self.invoke("set_seconds", |t| t.set_seconds(seconds))
    }

    pub fn millis(&self) -> u32 {
        self.invoke("millis", |t| t.millis())
    }

    pub fn set_millis(&self, millis: u32) -> bool {
        self.invoke("set_millis", |t| t.set_millis(millis))
    }

    pub fn to_rfc3339(&self) -> String {
        self.invoke("to_rfc3339", |t| t.to_rfc3339())
    }
}

impl NumBufHandle {
    pub fn len(&self) -> usize {
        self.invoke("len", |b| b.len())
    }

    pub fn is_empty(&self) -> bool {
        self.invoke("len", |b| b.is_empty())
    }

    pub fn get(&self, index: usize) -> Option<f64> {
        self.invoke("get", |b| b.get(index))
    }

    pub fn set(&self, index: usize, value: f64) -> bool {
        self.invoke("set", |b| b.set(index, value))
    }

    pub fn fill(&self, value: f64) {
        self.invoke("fill", |b| b.fill(value));
    }

    pub fn copy_within(&self, dest: usize, src: usize, src_end: usize) {
        self.invoke("copy_within", |b| b.copy_within(dest, src, src_end));
    }

    pub fn sort(&self) {
        self.invoke("sort", |b| b.sort());
    }

    pub fn reverse(&self) {
        self.invoke("reverse", |b| b.reverse());
    }

    /// Derived copy; never marks anything dirty.
    pub fn slice(&self, start: usize, end: usize) -> Vec<f64> {
        self.invoke("slice", |b| b.slice(start, end))
    }
}

impl BytesHandle {
    pub fn len(&self) -> usize {
        self.invoke("len", |b| b.len())
    }

    pub fn is_empty(&self) -> bool {
        self.invoke("len", |b| b.is_empty())
    }

    pub fn fill(&self, value: u8) {
        self.invoke("fill", |b| b.fill(value));
    }
}

macro_rules! bytes_handle_accessors {
    ($($get:ident / $set:ident : $ty:ty),+ $(,)?) => {
        impl BytesHandle {
            $(
                pub fn $get(&self, offset: usize) -> Option<$ty> {
                    self.invoke(stringify!($get), |b| b.$get(offset))
                }

                pub fn $set(&self, offset: usize, value: $ty) -> bool {
                    self.invoke(stringify!($set), |b| b.$set(offset, value))
                }
            )+
        }
    };
}

bytes_handle_accessors! {
    get_u8 / set_u8: u8,
    get_i8 / set_i8: i8,
    get_u16 / set_u16: u16,
    get_i16 / set_i16: i16,
    get_u32 / set_u32: u32,
    get_i32 / set_i32: i32,
    get_f32 / set_f32: f32,
    get_f64 / set_f64: f64,
}
