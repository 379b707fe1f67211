//! SAGE Decentralized Identifiers
//!
//! Identity layer consumed by the SAGE core: DID parsing and
//! canonicalization, on-chain agent records, and the resolver interface the
//! core queries to map a DID to its registered public keys.
//!
//! The blockchain client itself (contract calls, retries, gas) lives
//! outside this workspace; the core only ever sees the [`DidResolver`]
//! trait.

pub mod cache;
pub mod did;
pub mod record;
pub mod resolver;

pub use cache::{CacheConfig, CachingResolver};
pub use did::{ChainId, Did, DidError};
pub use record::{AgentKey, AgentRecord};
pub use resolver::{DidResolver, MemoryResolver, ResolverError};
