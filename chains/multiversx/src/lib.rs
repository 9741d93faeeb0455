//! MultiversX Dropper - collection owner snapshots and token airdrops
//!
//! Two phases, run as separate invocations:
//!
//! 1. **Collect**: page through every item of an NFT/SFT collection through a
//!    rate-limited API, group the items by owner and write a snapshot.
//! 2. **Distribute**: replay the snapshot and send one transfer (EGLD, ESDT,
//!    SFT or MetaESDT) to every owner, with sequenced nonces and per-owner
//!    failure bookkeeping.
//!
//! # Architecture
//!
//! - **[`CollectionApi`]**: read-only queries; [`ApiClient`] over `reqwest`
//! - **[`collection`]**: paginator and owner aggregator
//! - **[`snapshot`]**: `nft-collection-owners.json` and the distribution log
//! - **[`DistributionEngine`]**: confirm, resolve, validate, dispatch
//! - **[`TransactionSigner`] / [`TransactionSender`]**: the opaque sign and
//!   send capabilities; keys never enter this crate
//!
//! Every API call of a phase goes through one [`core_logic::Throttle`], so
//! the configured calls-per-second bound holds across all concurrent work.
//!
//! # Quick Start
//!
//! ```bash
//! # Snapshot the owners of a collection, skipping contracts
//! cargo run -p multiversx-dropper --bin nft-dropper -- collect COLL-abc123 --exclude-contracts
//!
//! # Send 0.5 EGLD per held item to every owner in the snapshot
//! cargo run -p multiversx-dropper --bin nft-dropper -- distribute --kind egld --amount 0.5 --multiply
//! ```
//!
//! # Configuration
//!
//! Loaded from `config/config.toml`, see [`config::MultiversxConfig`].

pub mod address;
pub mod api;
pub mod collection;
pub mod config;
pub mod distribution;
pub mod sender;
pub mod snapshot;

/// Process exit code when a precondition fails before any work is done
pub const EXIT_PRECONDITION: i32 = 9;
/// Process exit code when the operator declines to proceed
pub const EXIT_ABORTED: i32 = 10;

pub use api::{ApiClient, CollectionApi};
pub use collection::{CollectionError, OwnerRecord};
pub use config::MultiversxConfig;
pub use distribution::{DistributionEngine, DistributionError, DistributionParams, TokenKind};
pub use sender::{GatewaySender, RemoteSigner, TransactionSender, TransactionSigner};
