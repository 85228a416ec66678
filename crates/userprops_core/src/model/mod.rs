//! Property bag domain model.
//!
//! # Responsibility
//! - Define keys, values and the ordered mapping held by a property store.
//!
//! # Invariants
//! - The in-memory mapping is the source of truth between mutations.
//! - Iteration order is insertion/decode order.

pub mod key;
pub mod property_map;
pub mod value;
