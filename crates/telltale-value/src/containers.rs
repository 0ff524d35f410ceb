//! Container categories: structured values with opaque internal state.
//!
//! These types keep state that cannot be intercepted field-by-field, so the
//! tracking layer marks them dirty at the container's own path and otherwise
//! passes operations straight through. [`ContainerKind`] is the runtime kind
//! tag the mutation adapter classifies by.

use chrono::{DateTime, Datelike, TimeZone, Timelike, Utc};
use indexmap::{IndexMap, IndexSet};

use crate::value::{ScalarKey, Value};

/// Runtime kind tag of a container-category value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContainerKind {
    Map,
    Set,
    Time,
    NumBuf,
    Bytes,
}

impl ContainerKind {
    /// Classify a value by runtime type test; `None` for scalars, records
    /// and lists.
    pub fn of(value: &Value) -> Option<ContainerKind> {
        match value {
            Value::Map(_) => Some(ContainerKind::Map),
            Value::Set(_) => Some(ContainerKind::Set),
            Value::Time(_) => Some(ContainerKind::Time),
            Value::NumBuf(_) => Some(ContainerKind::NumBuf),
            Value::Bytes(_) => Some(ContainerKind::Bytes),
            _ => None,
        }
    }
}

// ── Keyed map ──────────────────────────────────────────────────────────────

/// An insertion-ordered keyed map with scalar keys.
#[derive(Debug, Default)]
pub struct MapValue {
    entries: IndexMap<ScalarKey, Value>,
}

impl MapValue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &ScalarKey) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Insert or overwrite; overwrites keep the original insertion position.
    pub fn set(&mut self, key: ScalarKey, value: Value) -> Option<Value> {
        self.entries.insert(key, value)
    }

    pub fn delete(&mut self, key: &ScalarKey) -> bool {
        self.entries.shift_remove(key).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn has(&self, key: &ScalarKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn size(&self) -> usize {
        self.entries.len()
    }

    pub fn keys(&self) -> impl Iterator<Item = &ScalarKey> {
        self.entries.keys()
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.entries.values()
    }

    pub fn entries(&self) -> impl Iterator<Item = (&ScalarKey, &Value)> {
        self.entries.iter()
    }
}

// ── Set ────────────────────────────────────────────────────────────────────

/// An insertion-ordered set of scalar elements.
#[derive(Debug, Default)]
pub struct SetValue {
    elems: IndexSet<ScalarKey>,
}

impl SetValue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false when the element was already present.
    pub fn add(&mut self, elem: ScalarKey) -> bool {
        self.elems.insert(elem)
    }

    pub fn delete(&mut self, elem: &ScalarKey) -> bool {
        self.elems.shift_remove(elem)
    }

    pub fn clear(&mut self) {
        self.elems.clear();
    }

    pub fn has(&self, elem: &ScalarKey) -> bool {
        self.elems.contains(elem)
    }

    pub fn size(&self) -> usize {
        self.elems.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScalarKey> {
        self.elems.iter()
    }
}

// ── Timestamp ──────────────────────────────────────────────────────────────

/// A point in time with millisecond precision and mutable calendar fields.
#[derive(Debug, Clone)]
pub struct TimeValue {
    at: DateTime<Utc>,
}

impl TimeValue {
    pub fn from_millis(millis: i64) -> Self {
        Self {
            at: Utc
                .timestamp_millis_opt(millis)
                .single()
                .unwrap_or_else(|| Utc.timestamp_millis_opt(0).single().unwrap_or_default()),
        }
    }

    pub fn now() -> Self {
        Self { at: Utc::now() }
    }

    /// Milliseconds since the Unix epoch.
    pub fn get_time(&self) -> i64 {
        self.at.timestamp_millis()
    }

    pub fn set_time(&mut self, millis: i64) {
        if let Some(at) = Utc.timestamp_millis_opt(millis).single() {
            self.at = at;
        }
    }

    pub fn year(&self) -> i32 {
        self.at.year()
    }

    /// Replace the year; out-of-range combinations (e.g. Feb 29 in a
    /// non-leap year) leave the value unchanged and return false.
    pub fn set_year(&mut self, year: i32) -> bool {
        self.replace(self.at.with_year(year))
    }

    /// Month in `1..=12`.
    pub fn month(&self) -> u32 {
        self.at.month()
    }

    pub fn set_month(&mut self, month: u32) -> bool {
        self.replace(self.at.with_month(month))
    }

    pub fn day(&self) -> u32 {
        self.at.day()
    }

    pub fn set_day(&mut self, day: u32) -> bool {
        self.replace(self.at.with_day(day))
    }

    pub fn hours(&self) -> u32 {
        self.at.hour()
    }

    pub fn set_hours(&mut self, hours: u32) -> bool {
        self.replace(self.at.with_hour(hours))
    }

    pub fn minutes(&self) -> u32 {
        self.at.minute()
    }

    pub fn set_minutes(&mut self, minutes: u32) -> bool {
        self.replace(self.at.with_minute(minutes))
    }

    pub fn seconds(&self) -> u32 {
        self.at.second()
    }

    pub fn set_seconds(&mut self, seconds: u32) -> bool {
        self.replace(self.at.with_second(seconds))
    }

    pub fn millis(&self) -> u32 {
        self.at.timestamp_subsec_millis()
    }

    pub fn set_millis(&mut self, millis: u32) -> bool {
        self.replace(self.at.with_nanosecond(millis.min(999) * 1_000_000))
    }

    pub fn to_rfc3339(&self) -> String {
        self.at.to_rfc3339()
    }

    fn replace(&mut self, next: Option<DateTime<Utc>>) -> bool {
        match next {
            Some(at) => {
                self.at = at;
                true
            }
            None => false,
        }
    }
}

// ── Fixed-width numeric buffer ─────────────────────────────────────────────

/// A fixed-length numeric buffer with in-place write operations.
#[derive(Debug, Clone, Default)]
pub struct NumBuffer {
    data: Vec<f64>,
}

impl NumBuffer {
    pub fn zeroed(len: usize) -> Self {
        Self {
            data: vec![0.0; len],
        }
    }

    pub fn from_vec(data: Vec<f64>) -> Self {
        Self { data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<f64> {
        self.data.get(index).copied()
    }

    /// Out-of-range writes are ignored and return false; the buffer never
    /// grows.
    pub fn set(&mut self, index: usize, value: f64) -> bool {
        match self.data.get_mut(index) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    pub fn fill(&mut self, value: f64) {
        self.data.fill(value);
    }

    /// Copy `src..src_end` over the range starting at `dest`, clamped to the
    /// buffer bounds.
    pub fn copy_within(&mut self, dest: usize, src: usize, src_end: usize) {
        let len = self.data.len();
        let src = src.min(len);
        let src_end = src_end.min(len).max(src);
        if dest >= len {
            return;
        }
        let span = (src_end - src).min(len - dest);
        self.data.copy_within(src..src + span, dest);
    }

    pub fn sort(&mut self) {
        self.data.sort_by(f64::total_cmp);
    }

    pub fn reverse(&mut self) {
        self.data.reverse();
    }

    /// A derived copy of `start..end`, clamped to the buffer bounds.
    pub fn slice(&self, start: usize, end: usize) -> Vec<f64> {
        let len = self.data.len();
        let start = start.min(len);
        let end = end.min(len).max(start);
        self.data[start..end].to_vec()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }
}

// ── Raw byte buffer ────────────────────────────────────────────────────────

/// A raw byte buffer with fixed-width little-endian accessors.
#[derive(Debug, Clone, Default)]
pub struct ByteBuf {
    data: Vec<u8>,
}

macro_rules! byte_accessors {
    ($get:ident, $set:ident, $ty:ty) => {
        /// Little-endian read; `None` when the span exceeds the buffer.
        pub fn $get(&self, offset: usize) -> Option<$ty> {
            const N: usize = std::mem::size_of::<$ty>();
            let bytes = self.data.get(offset..offset + N)?;
            let mut buf = [0u8; N];
            buf.copy_from_slice(bytes);
            Some(<$ty>::from_le_bytes(buf))
        }

        /// Little-endian in-place write; false when the span exceeds the
        /// buffer.
        pub fn $set(&mut self, offset: usize, value: $ty) -> bool {
            const N: usize = std::mem::size_of::<$ty>();
            match self.data.get_mut(offset..offset + N) {
                Some(bytes) => {
                    bytes.copy_from_slice(&value.to_le_bytes());
                    true
                }
                None => false,
            }
        }
    };
}

impl ByteBuf {
    pub fn zeroed(len: usize) -> Self {
        Self {
            data: vec![0u8; len],
        }
    }

    pub fn from_vec(data: Vec<u8>) -> Self {
        Self { data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    byte_accessors!(get_u8, set_u8, u8);
    byte_accessors!(get_i8, set_i8, i8);
    byte_accessors!(get_u16, set_u16, u16);
    byte_accessors!(get_i16, set_i16, i16);
    byte_accessors!(get_u32, set_u32, u32);
    byte_accessors!(get_i32, set_i32, i32);
    byte_accessors!(get_f32, set_f32, f32);
    byte_accessors!(get_f64, set_f64, f64);

    pub fn fill(&mut self, value: u8) {
        self.data.fill(value);
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_overwrite_keeps_position() {
        let mut map = MapValue::new();
        map.set(ScalarKey::from("a"), Value::Int(1));
        map.set(ScalarKey::from("b"), Value::Int(2));
        map.set(ScalarKey::from("a"), Value::Int(3));
        let keys: Vec<&ScalarKey> = map.keys().collect();
        assert_eq!(keys, vec![&ScalarKey::from("a"), &ScalarKey::from("b")]);
    }

    #[test]
    fn set_add_reports_novelty() {
        let mut set = SetValue::new();
        assert!(set.add(ScalarKey::from(1)));
        assert!(!set.add(ScalarKey::from(1)));
        assert!(set.delete(&ScalarKey::from(1)));
        assert!(!set.delete(&ScalarKey::from(1)));
    }

    #[test]
    fn time_roundtrips_millis() {
        let mut t = TimeValue::from_millis(86_400_000);
        assert_eq!(t.get_time(), 86_400_000);
        t.set_time(0);
        assert_eq!(t.year(), 1970);
    }

    #[test]
    fn time_rejects_impossible_dates() {
        // 1970-01-31, setting month to February must fail and leave the
        // value untouched.
        let mut t = TimeValue::from_millis(30 * 86_400_000);
        assert_eq!(t.day(), 31);
        assert!(!t.set_month(2));
        assert_eq!(t.month(), 1);
    }

    #[test]
    fn num_buffer_never_grows() {
        let mut buf = NumBuffer::zeroed(3);
        assert!(buf.set(2, 5.0));
        assert!(!buf.set(3, 1.0));
        assert_eq!(buf.len(), 3);
    }

    #[test]
    fn num_buffer_copy_within_clamps() {
        let mut buf = NumBuffer::from_vec(vec![1.0, 2.0, 3.0, 4.0]);
        buf.copy_within(2, 0, 2);
        assert_eq!(buf.as_slice(), &[1.0, 2.0, 1.0, 2.0]);
        buf.copy_within(3, 0, 4);
        assert_eq!(buf.as_slice(), &[1.0, 2.0, 1.0, 1.0]);
    }

    #[test]
    fn byte_buf_multi_byte_roundtrip() {
        let mut buf = ByteBuf::zeroed(8);
        assert!(buf.set_u32(2, 0xDEAD_BEEF));
        assert_eq!(buf.get_u32(2), Some(0xDEAD_BEEF));
        assert!(!buf.set_f64(1, 1.0));
        assert_eq!(buf.get_u16(7), None);
    }
}
