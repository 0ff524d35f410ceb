//! Property keys and dotted-path rendering.
//!
//! A [`Key`] names one step through a structured value: a string field, a
//! numeric index, or an opaque [`Symbol`]. Paths are dot-joined segment
//! strings, shallowest to deepest. String keys and numeric indices stringify
//! identically, so the key `5` and the key `"5"` address the same slot and
//! render the same path segment.
//!
//! # Example
//!
//! ```
//! use telltale_value::{join_path, Key, Symbol};
//!
//! let path = join_path(&[Key::from("items"), Key::from(0), Key::from("name")]);
//! assert_eq!(path, "items.0.name");
//!
//! let sym = Symbol::new("meta");
//! assert_eq!(Key::Sym(sym).segment(), "Symbol(meta)");
//! ```

use std::borrow::Cow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};

/// An opaque property key with a process-unique identity and a textual
/// description. Two symbols with equal descriptions are still distinct keys.
#[derive(Clone, Debug)]
pub struct Symbol {
    id: u64,
    desc: String,
}

static NEXT_SYMBOL_ID: AtomicU64 = AtomicU64::new(1);

impl Symbol {
    /// Create a fresh symbol. The description is carried into path segments.
    pub fn new(desc: impl Into<String>) -> Self {
        Self {
            id: NEXT_SYMBOL_ID.fetch_add(1, Ordering::Relaxed),
            desc: desc.into(),
        }
    }

    pub fn description(&self) -> &str {
        &self.desc
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Symbol {}

impl Hash for Symbol {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// One step of a property path.
#[derive(Clone, Debug)]
pub enum Key {
    Str(String),
    Index(usize),
    Sym(Symbol),
}

impl Key {
    /// The raw key text before path escaping. Indices stringify in decimal,
    /// symbols as `Symbol(description)`. This is the plain-data form; the
    /// `\`-escape in [`segment`](Self::segment) exists for path strings
    /// only.
    pub(crate) fn raw(&self) -> Cow<'_, str> {
        match self {
            Key::Str(s) => Cow::Borrowed(s.as_str()),
            Key::Index(i) => Cow::Owned(i.to_string()),
            Key::Sym(sym) => Cow::Owned(format!("Symbol({})", sym.desc)),
        }
    }

    /// The rendered path segment.
    ///
    /// A *literal string key* whose text could be mistaken for a symbol
    /// rendering (or for an already-escaped segment) gains a single leading
    /// backslash, so `Symbol(test)` the string and `Symbol(test)` the symbol
    /// described `"test"` can never collide in a path. Symbol renderings are
    /// never escaped.
    pub fn segment(&self) -> String {
        match self {
            Key::Str(s) if needs_escape(s) => format!("\\{s}"),
            _ => self.raw().into_owned(),
        }
    }

    /// True when this key addresses a list position.
    pub fn as_index(&self) -> Option<usize> {
        match self {
            Key::Index(i) => Some(*i),
            Key::Str(s) => s.parse().ok(),
            Key::Sym(_) => None,
        }
    }
}

fn needs_escape(s: &str) -> bool {
    s.starts_with('\\') || (s.starts_with("Symbol(") && s.ends_with(')'))
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Key::Sym(a), Key::Sym(b)) => a == b,
            (Key::Sym(_), _) | (_, Key::Sym(_)) => false,
            _ => self.raw() == other.raw(),
        }
    }
}

impl Eq for Key {}

impl Hash for Key {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Hash must agree with Eq: `Index(5)` and `Str("5")` are equal, so
        // both hash their raw text. Symbols hash their identity.
        match self {
            Key::Sym(sym) => {
                1u8.hash(state);
                sym.hash(state);
            }
            _ => {
                0u8.hash(state);
                self.raw().hash(state);
            }
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segment())
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::Str(s.to_owned())
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key::Str(s)
    }
}

impl From<usize> for Key {
    fn from(i: usize) -> Self {
        Key::Index(i)
    }
}

impl From<Symbol> for Key {
    fn from(sym: Symbol) -> Self {
        Key::Sym(sym)
    }
}

/// Dot-join rendered segments, shallowest first.
pub fn join_path(keys: &[Key]) -> String {
    let mut out = String::new();
    for (i, key) in keys.iter().enumerate() {
        if i > 0 {
            out.push('.');
        }
        out.push_str(&key.segment());
    }
    out
}
