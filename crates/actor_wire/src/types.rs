//! Built-in value types with a dedicated wire form.

pub mod atom;
pub mod bool_vec;
pub mod time;

pub use atom::{atom, Atom, AtomError, MAX_ATOM_LEN};
pub use bool_vec::{pack_bools, unpack_bools, BoolVec};
pub use time::{Duration, TimeUnit, Timespan, Timestamp};
