//! Network Layer
//!
//! Bomb-throw replication between one authority and its observers.
//! Decisions live in `replicator`; `peer` applies them to a local arena;
//! `session` moves the resulting messages over in-process channels.

pub mod protocol;
pub mod replicator;
pub mod peer;
pub mod session;

pub use protocol::{ClientMessage, ServerMessage, PeerId, ThrowRequest, ThrowBroadcast};
pub use replicator::{
    ActionReplicator, AuthorityQuery, Effect, ReplicationError, Role, ThrowConfig, TriggerOutcome,
};
pub use peer::{Outbound, Peer};
pub use session::{LoopbackSession, SessionConfig, SessionError};
