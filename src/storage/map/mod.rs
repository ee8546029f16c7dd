//! Open-addressing hash maps keyed by `i32`
//!
//! # Architecture
//!
//! ```text
//! UnmanagedMap<V> ─┐
//! IntMap ──────────┼─→ OpenTable<V> ─→ RawBlock<Entry<V>>
//! LookupMap<V> ────┘        │
//!                           └─→ Probing { Linear, Quadratic }
//! ```
//!
//! All three front ends share one engine and differ only in configuration:
//!
//! | Map            | Values   | Max slots | Probing   | Duplicate keys |
//! |----------------|----------|-----------|-----------|----------------|
//! | `UnmanagedMap` | any Copy | 2^20      | linear    | overwrite      |
//! | `IntMap`       | i32      | 2^30      | linear    | overwrite      |
//! | `LookupMap`    | any Copy | 2^30      | quadratic | rejected       |

mod int_map;
mod lookup;
mod probe;
mod slot;
mod table;
mod unmanaged;

pub use int_map::IntMap;
pub use lookup::LookupMap;
pub use probe::Probing;
pub use slot::SlotState;
pub use table::{Iter, MapStats};
pub use unmanaged::UnmanagedMap;
