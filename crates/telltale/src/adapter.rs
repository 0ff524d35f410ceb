//! Container mutation adapter.
//!
//! Container categories keep internal state that cannot be intercepted
//! field-by-field, so their operations are classified wholesale: the
//! mutating subset triggers container-level dirty propagation after the
//! real method runs, the read/derive subset passes through and never marks
//! anything dirty. Classification is by runtime kind tag
//! ([`ContainerKind::of`]), not by static declaration, so any value of a
//! tracked category is covered regardless of where it was built.

use telltale_value::ContainerKind;

/// The closed classification table: is `method` a mutating operation on
/// containers of `kind`?
///
/// Method names are the operation names exposed by the typed container
/// handles; every handle operation consults this table through a single
/// choke point before deciding whether to propagate.
pub fn is_mutating(kind: ContainerKind, method: &str) -> bool {
    match kind {
        ContainerKind::Map => matches!(method, "set" | "delete" | "clear"),
        ContainerKind::Set => matches!(method, "add" | "delete" | "clear"),
        ContainerKind::Time => matches!(
            method,
            "set_time"
                | "set_year"
                | "set_month"
                | "set_day"
                | "set_hours"
                | "set_minutes"
                | "set_seconds"
                | "set_millis"
        ),
        ContainerKind::NumBuf => {
            matches!(method, "set" | "fill" | "copy_within" | "sort" | "reverse")
        }
        ContainerKind::Bytes => matches!(
            method,
            "set_u8" | "set_i8" | "set_u16" | "set_i16" | "set_u32" | "set_i32" | "set_f32"
                | "set_f64" | "fill"
        ),
    }
}
