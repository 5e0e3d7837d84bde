//! Hamlet Types - Canonical domain types for the village economy
//!
//! This crate contains all foundational types for hamlet with zero
//! dependencies on other hamlet crates. It defines the complete type
//! system for:
//!
//! - Identity types (NodeId, TradeId) and node registrations
//! - The simulated clock (day + period) and its cyclic advance rule
//! - Items, occupations, and trade offers
//! - The error taxonomy shared by every node role
//! - Wire DTOs for every message that crosses a node boundary
//!
//! # Architectural Invariants
//!
//! These types support the core hamlet consistency invariants:
//!
//! 1. No mutation ever leaves a negative balance
//! 2. Trade status transitions are forward-only, never reversed
//! 3. Every error except `Unreachable` is detected before any mutation
//! 4. Remote notices are idempotent; re-delivery never moves value twice

pub mod clock;
pub mod error;
pub mod identity;
pub mod item;
pub mod protocol;
pub mod trade;

pub use clock::*;
pub use error::*;
pub use identity::*;
pub use item::*;
pub use protocol::*;
pub use trade::*;
