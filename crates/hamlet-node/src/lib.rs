//! Hamlet Node - the villager
//!
//! A villager node owns exactly one [`hamlet_economy::EconomicState`] and
//! one [`hamlet_trade::TradeBook`], both behind a single write lock: the
//! node serves concurrent inbound calls but its state is effectively
//! single-writer.
//!
//! Local actions (produce, sleep, eat) live here, along with the
//! period-advance application, merchant trading, the peer-to-peer trade
//! operations, and the mutation surface the trade registry drives in the
//! centralized variant.
//!
//! Cross-node traffic goes through two seams: [`CoordinatorHandle`] for
//! barrier submissions and [`PeerNotifier`] for fire-and-forget trade
//! notices. HTTP implementations live in hamlet-client; tests plug in
//! in-memory ones.

pub mod villager;

pub use villager::{CoordinatorHandle, MerchantClient, PeerNotifier, Villager, VillagerConfig};
