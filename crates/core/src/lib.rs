//! `intelplat-core` — shared primitives for the auth and AI boundaries.
//!
//! No IO lives here: roles, time, and secret handling only.

pub mod clock;
pub mod role;
pub mod secret;

pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use role::{Role, UnknownRole};
pub use secret::Secret;
