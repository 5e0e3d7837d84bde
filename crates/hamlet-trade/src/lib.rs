//! Hamlet Trade - Bilateral trade handshake and settlement
//!
//! The peer-to-peer variant of the trade protocol. Each node owns a
//! [`TradeBook`]: its mirror of every trade it participates in, keyed by
//! trade id. There is no shared store; the two mirrors are reconciled by
//! message-passing, and every inbound notice is idempotent (terminal or
//! unknown trades discard the notice).
//!
//! Handshake: Request -> Accept -> Confirm (each side) -> Settle.
//! Resource locks are optimistic, immediate deductions: the counterparty
//! locks its obligated resource at Accept, the initiator locks at its own
//! Confirm. Settlement credits what each side is owed, exactly once.
//!
//! Operations mutate local state only and return the notices the caller
//! must deliver to the peer. Delivery is fire-and-forget; a lost notice
//! is a liveness problem, never a safety one.

pub mod book;
pub mod merchant;

pub use book::{NoticePayload, TradeBook, TradeNotice};
pub use merchant::apply_merchant_exchange;
