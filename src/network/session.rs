//! Loopback Session
//!
//! Wires one authoritative host and any number of remote peers together
//! over in-process tokio channels:
//!
//! - uplink: `mpsc` carrying `(sender, ClientMessage)` from remotes to the host
//! - downlink: `broadcast` carrying `ServerMessage` from the host to every remote
//!
//! [`LoopbackSession::pump`] moves messages until no peer has anything left
//! to say. Delivery is FIFO per channel, so every remote sees broadcasts in
//! the order the host executed them.

use std::collections::{BTreeMap, VecDeque};
use serde::{Serialize, Deserialize};
use tokio::sync::{broadcast, mpsc};
use tokio::sync::broadcast::error::TryRecvError;
use tracing::{debug, info, warn};

use crate::config::ArenaConfig;
use crate::core::hash::WorldHash;
use crate::core::vec3::{Rotator, Vec3};
use crate::game::character::{ActorId, CharacterConfig};
use crate::game::skill::SkillKind;
use crate::network::peer::{Outbound, Peer};
use crate::network::protocol::{ClientMessage, PeerId, ServerMessage};
use crate::network::replicator::{ActionReplicator, ReplicationError, Role, TriggerOutcome};

/// Channel sizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Capacity of the uplink and downlink channels.
    pub channel_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { channel_capacity: 256 }
    }
}

/// Session errors.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// No peer with this id.
    #[error("unknown peer {0}")]
    UnknownPeer(PeerId),

    /// No peer controls this actor.
    #[error("actor {0:?} has no controlling peer")]
    Uncontrolled(ActorId),

    /// A channel closed while the session was running.
    #[error("channel closed")]
    ChannelClosed,

    /// Replication failed on a peer.
    #[error("replication error: {0}")]
    Replication(#[from] ReplicationError),
}

struct RemoteLink {
    peer: Peer,
    downlink: broadcast::Receiver<ServerMessage>,
}

/// Host plus remotes in one process.
pub struct LoopbackSession {
    host: Peer,
    remotes: BTreeMap<PeerId, RemoteLink>,
    controllers: BTreeMap<ActorId, PeerId>,
    uplink_tx: mpsc::Sender<(PeerId, ClientMessage)>,
    uplink_rx: mpsc::Receiver<(PeerId, ClientMessage)>,
    downlink: broadcast::Sender<ServerMessage>,
    replicator: ActionReplicator,
    character_config: CharacterConfig,
    config: SessionConfig,
    next_peer: u32,
}

impl LoopbackSession {
    /// Create a session with only the host.
    pub fn new(replicator: ActionReplicator, character_config: CharacterConfig, config: SessionConfig) -> Self {
        let capacity = config.channel_capacity.max(1);
        let (uplink_tx, uplink_rx) = mpsc::channel(capacity);
        let (downlink, _) = broadcast::channel(capacity);

        let host = Peer::new(PeerId::HOST, Role::Authoritative, replicator.clone(), character_config.clone());
        info!("Loopback session created (capacity {})", capacity);

        Self {
            host,
            remotes: BTreeMap::new(),
            controllers: BTreeMap::new(),
            uplink_tx,
            uplink_rx,
            downlink,
            replicator,
            character_config,
            config,
            next_peer: 1,
        }
    }

    /// Create a session from an arena config.
    pub fn from_config(config: &ArenaConfig) -> Self {
        Self::new(config.replicator(), config.character.clone(), config.session)
    }

    /// The authoritative peer.
    pub fn host(&self) -> &Peer {
        &self.host
    }

    /// A remote peer.
    pub fn remote(&self, id: PeerId) -> Option<&Peer> {
        self.remotes.get(&id).map(|link| &link.peer)
    }

    /// Any peer, host included.
    pub fn peer(&self, id: PeerId) -> Option<&Peer> {
        if id == self.host.id() {
            return Some(&self.host);
        }
        self.remote(id)
    }

    /// Every peer, host first.
    pub fn peers(&self) -> impl Iterator<Item = &Peer> {
        std::iter::once(&self.host).chain(self.remotes.values().map(|link| &link.peer))
    }

    /// Number of remote peers.
    pub fn remote_count(&self) -> usize {
        self.remotes.len()
    }

    /// Channel sizing in use.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    fn peer_mut(&mut self, id: PeerId) -> Result<&mut Peer, SessionError> {
        if id == self.host.id() {
            return Ok(&mut self.host);
        }
        self.remotes
            .get_mut(&id)
            .map(|link| &mut link.peer)
            .ok_or(SessionError::UnknownPeer(id))
    }

    // =========================================================================
    // MEMBERSHIP
    // =========================================================================

    /// Join a new remote peer.
    ///
    /// The newcomer gets copies of the host's characters; bombs thrown
    /// before it joined are not replayed.
    pub fn add_remote(&mut self) -> PeerId {
        let id = PeerId(self.next_peer);
        self.next_peer += 1;

        let mut peer = Peer::new(id, Role::Remote, self.replicator.clone(), self.character_config.clone());
        for character in self.host.state().characters.values() {
            peer.adopt_character(character.clone());
        }

        let downlink = self.downlink.subscribe();
        self.remotes.insert(id, RemoteLink { peer, downlink });
        id
    }

    /// Spawn a character on every peer, controlled from `controller`.
    pub fn spawn_character(&mut self, controller: PeerId, position: Vec3) -> Result<ActorId, SessionError> {
        if self.peer(controller).is_none() {
            return Err(SessionError::UnknownPeer(controller));
        }

        let actor = ActorId::random();
        self.host.spawn_character(actor, position)?;
        for link in self.remotes.values_mut() {
            link.peer.spawn_character(actor, position)?;
        }
        self.controllers.insert(actor, controller);

        info!("Character {} spawned, controlled by {}", actor.short(), controller);
        Ok(actor)
    }

    /// Peer whose input drives `actor`.
    pub fn controller_of(&self, actor: ActorId) -> Option<PeerId> {
        self.controllers.get(&actor).copied()
    }

    // =========================================================================
    // INPUT
    // =========================================================================

    /// Move a character on every peer.
    pub fn move_character(&mut self, actor: ActorId, position: Vec3, orientation: Rotator) -> Result<(), SessionError> {
        self.host.move_character(actor, position, orientation)?;
        for link in self.remotes.values_mut() {
            link.peer.move_character(actor, position, orientation)?;
        }
        Ok(())
    }

    /// Press throw for `actor` on its controlling peer.
    pub fn throw_bomb(&mut self, actor: ActorId) -> Result<TriggerOutcome, SessionError> {
        let controller = self.controller_of(actor).ok_or(SessionError::Uncontrolled(actor))?;
        Ok(self.peer_mut(controller)?.throw_bomb(actor)?)
    }

    /// Raise a skill at the host.
    pub fn upgrade_skill(&mut self, actor: ActorId, kind: SkillKind) -> Result<i32, SessionError> {
        Ok(self.host.upgrade_skill(actor, kind)?)
    }

    /// Advance every peer one tick.
    pub fn advance(&mut self) {
        self.host.advance();
        for link in self.remotes.values_mut() {
            link.peer.advance();
        }
    }

    // =========================================================================
    // DELIVERY
    // =========================================================================

    /// Deliver messages until every outbox and channel is empty.
    ///
    /// Returns the number of messages delivered.
    pub async fn pump(&mut self) -> Result<usize, SessionError> {
        let mut delivered = 0;

        loop {
            let before = delivered;

            self.flush_remotes().await?;
            delivered += self.drain_uplink()?;
            delivered += self.flush_host()?;
            delivered += self.drain_downlinks()?;

            if delivered == before && self.idle() {
                break;
            }
        }

        Ok(delivered)
    }

    fn idle(&self) -> bool {
        self.host.pending() == 0 && self.remotes.values().all(|link| link.peer.pending() == 0)
    }

    async fn flush_remotes(&mut self) -> Result<(), SessionError> {
        let ids: Vec<PeerId> = self.remotes.keys().copied().collect();
        for id in ids {
            let mut outbox: VecDeque<Outbound> = match self.remotes.get_mut(&id) {
                Some(link) => link.peer.drain_outbox().into(),
                None => continue,
            };
            if let Err(e) = self.send_uplink(id, &mut outbox).await {
                // Whatever was not handed to the channel goes back in order.
                if !outbox.is_empty() {
                    warn!("{} kept {} unsent message(s) after: {}", id, outbox.len(), e);
                    if let Some(link) = self.remotes.get_mut(&id) {
                        link.peer.requeue(outbox);
                    }
                }
                return Err(e);
            }
        }
        Ok(())
    }

    async fn send_uplink(&mut self, id: PeerId, outbox: &mut VecDeque<Outbound>) -> Result<(), SessionError> {
        while let Some(out) = outbox.front() {
            match out {
                Outbound::ToAuthority(message) => {
                    if self.uplink_tx.capacity() == 0 {
                        self.drain_uplink()?;
                    }
                    #[cfg(feature = "debug-tracing")]
                    debug!("{} -> host: {:?}", id, message);
                    let permit = self
                        .uplink_tx
                        .reserve()
                        .await
                        .map_err(|_| SessionError::ChannelClosed)?;
                    permit.send((id, message.clone()));
                }
                Outbound::ToObservers(message) => {
                    warn!("{} tried to broadcast {:?}; dropped", id, message);
                }
            }
            outbox.pop_front();
        }
        Ok(())
    }

    fn drain_uplink(&mut self) -> Result<usize, SessionError> {
        let mut count = 0;
        loop {
            match self.uplink_rx.try_recv() {
                Ok((from, message)) => {
                    self.host.receive_client(from, message)?;
                    count += 1;
                }
                Err(mpsc::error::TryRecvError::Empty) => return Ok(count),
                Err(mpsc::error::TryRecvError::Disconnected) => return Err(SessionError::ChannelClosed),
            }
        }
    }

    fn flush_host(&mut self) -> Result<usize, SessionError> {
        let capacity = self.config.channel_capacity.max(1);
        let mut sent = 0;
        let mut since_drain = 0;
        let mut delivered = 0;

        for out in self.host.drain_outbox() {
            match out {
                Outbound::ToObservers(message) => {
                    #[cfg(feature = "debug-tracing")]
                    debug!("host -> all: {:?}", message);
                    if self.downlink.send(message).is_err() {
                        debug!("Broadcast with no observers");
                    }
                    sent += 1;
                    since_drain += 1;
                    if since_drain == capacity {
                        delivered += self.drain_downlinks()?;
                        since_drain = 0;
                    }
                }
                Outbound::ToAuthority(message) => {
                    warn!("Host addressed itself with {:?}; dropped", message);
                }
            }
        }

        if sent > 0 {
            debug!("Host broadcast {} message(s)", sent);
        }
        Ok(delivered)
    }

    fn drain_downlinks(&mut self) -> Result<usize, SessionError> {
        let mut count = 0;
        for (id, link) in self.remotes.iter_mut() {
            loop {
                match link.downlink.try_recv() {
                    Ok(message) => {
                        link.peer.receive_server(message)?;
                        count += 1;
                    }
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Lagged(missed)) => {
                        warn!("{} lagged, missed {} broadcast(s)", id, missed);
                    }
                    Err(TryRecvError::Closed) => return Err(SessionError::ChannelClosed),
                }
            }
        }
        Ok(count)
    }

    // =========================================================================
    // CONVERGENCE
    // =========================================================================

    /// World digest of every peer, host first.
    pub fn digests(&self) -> Vec<(PeerId, WorldHash)> {
        self.peers().map(|peer| (peer.id(), peer.digest())).collect()
    }

    /// Whether every peer sees the same bombs.
    pub fn converged(&self) -> bool {
        let host = self.host.digest();
        self.remotes.values().all(|link| link.peer.digest() == host)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::bomb::BombOrigin;
    use crate::game::character::SkillBounds;

    fn session_with(remotes: usize) -> (LoopbackSession, Vec<PeerId>) {
        let mut session = LoopbackSession::new(
            ActionReplicator::default(),
            CharacterConfig::default(),
            SessionConfig::default(),
        );
        let ids = (0..remotes).map(|_| session.add_remote()).collect();
        (session, ids)
    }

    #[tokio::test]
    async fn test_remote_throw_executes_once_at_host() {
        let (mut session, ids) = session_with(2);
        let actor = session.spawn_character(ids[0], Vec3::new(149.0, 150.0, 60.0)).unwrap();

        assert!(session.throw_bomb(actor).unwrap().is_dispatched());
        let delivered = session.pump().await.unwrap();
        // 1 request + 1 broadcast to each of 2 remotes
        assert_eq!(delivered, 3);

        let host = session.host();
        assert_eq!(host.state().bombs.count(BombOrigin::Executed), 1);
        assert_eq!(host.state().bombs.count(BombOrigin::Mirrored), 0);

        for id in &ids {
            let remote = session.remote(*id).unwrap();
            assert_eq!(remote.state().bombs.count(BombOrigin::Executed), 0);
            assert_eq!(remote.state().bombs.count(BombOrigin::Mirrored), 1);
            let bomb = remote.state().bombs.iter().next().unwrap();
            assert_eq!(bomb.position, Vec3::new(100.0, 200.0, 0.0));
            assert_eq!(bomb.owner, Some(actor));
        }
        assert!(session.converged());
    }

    #[tokio::test]
    async fn test_host_throw_spawns_no_extra_copy() {
        let (mut session, ids) = session_with(2);
        let actor = session.spawn_character(PeerId::HOST, Vec3::ZERO).unwrap();

        session.throw_bomb(actor).unwrap();
        session.pump().await.unwrap();

        assert_eq!(session.host().state().bombs.len(), 1);
        for id in &ids {
            assert_eq!(session.remote(*id).unwrap().state().bombs.count(BombOrigin::Mirrored), 1);
        }
    }

    #[tokio::test]
    async fn test_power_read_at_execute() {
        let (mut session, ids) = session_with(1);
        let actor = session.spawn_character(ids[0], Vec3::ZERO).unwrap();

        session.throw_bomb(actor).unwrap();
        // Upgrade lands at the host before the request does.
        assert_eq!(session.upgrade_skill(actor, SkillKind::BlastRadius).unwrap(), 3);
        session.pump().await.unwrap();

        let remote = session.remote(ids[0]).unwrap();
        assert_eq!(remote.state().bombs.iter().next().unwrap().power, 3);
        assert_eq!(
            remote.state().character(&actor).unwrap().skills().level_of(SkillKind::BlastRadius).unwrap(),
            3
        );
        assert!(session.converged());
    }

    #[tokio::test]
    async fn test_remote_without_bombs_sends_nothing() {
        let character = CharacterConfig { bomb_count: SkillBounds::new(0, 4), ..CharacterConfig::default() };
        let mut session = LoopbackSession::new(ActionReplicator::default(), character, SessionConfig::default());
        let remote = session.add_remote();
        let actor = session.spawn_character(remote, Vec3::ZERO).unwrap();

        assert_eq!(session.throw_bomb(actor).unwrap(), TriggerOutcome::Skipped);
        assert_eq!(session.pump().await.unwrap(), 0);
        assert!(session.peers().all(|p| p.state().bombs.is_empty()));
    }

    #[tokio::test]
    async fn test_spam_beyond_capacity_converges() {
        let mut session = LoopbackSession::new(
            ActionReplicator::default(),
            CharacterConfig::default(),
            SessionConfig { channel_capacity: 4 },
        );
        let remotes: Vec<PeerId> = (0..3).map(|_| session.add_remote()).collect();
        let actor = session.spawn_character(remotes[1], Vec3::ZERO).unwrap();

        for i in 0..50 {
            session
                .move_character(actor, Vec3::new(i as f32 * 37.0, -(i as f32) * 91.0, 60.0), Rotator::IDENTITY)
                .unwrap();
            session.throw_bomb(actor).unwrap();
        }
        session.pump().await.unwrap();

        assert_eq!(session.host().state().bombs.count(BombOrigin::Executed), 50);
        for id in &remotes {
            assert_eq!(session.remote(*id).unwrap().state().bombs.len(), 50);
        }
        assert!(session.converged());
    }

    #[tokio::test]
    async fn test_failed_delivery_keeps_unsent_messages() {
        let mut session = LoopbackSession::new(
            ActionReplicator::default(),
            CharacterConfig::default(),
            SessionConfig { channel_capacity: 1 },
        );
        let remote = session.add_remote();

        // Known to the remote only, so the host rejects its throws.
        let stranger = crate::game::character::Character::new(
            ActorId::new([8; 16]),
            Vec3::ZERO,
            &CharacterConfig::default(),
        )
        .unwrap();
        let stranger_id = stranger.id();
        let link = session.remotes.get_mut(&remote).unwrap();
        link.peer.adopt_character(stranger);
        for _ in 0..3 {
            assert!(link.peer.throw_bomb(stranger_id).unwrap().is_dispatched());
        }

        let err = session.pump().await.unwrap_err();
        assert!(matches!(
            err,
            SessionError::Replication(ReplicationError::UnknownActor(id)) if id == stranger_id
        ));
        // First request reached the host; the other two are still queued.
        assert_eq!(session.remote(remote).unwrap().pending(), 2);
    }

    #[tokio::test]
    async fn test_late_joiner_gets_characters() {
        let (mut session, _) = session_with(0);
        let actor = session.spawn_character(PeerId::HOST, Vec3::ZERO).unwrap();
        session.upgrade_skill(actor, SkillKind::Speed).unwrap();
        session.pump().await.unwrap();

        let late = session.add_remote();
        let replica = session.remote(late).unwrap().state().character(&actor).unwrap();
        assert_eq!(replica.skills().level_of(SkillKind::Speed).unwrap(), 2);
    }

    #[tokio::test]
    async fn test_unknown_peer_and_actor() {
        let (mut session, _) = session_with(1);
        assert!(matches!(
            session.spawn_character(PeerId(42), Vec3::ZERO),
            Err(SessionError::UnknownPeer(PeerId(42)))
        ));
        let ghost = ActorId::new([7; 16]);
        assert!(matches!(session.throw_bomb(ghost), Err(SessionError::Uncontrolled(_))));
    }

    #[tokio::test]
    async fn test_fuses_expire_everywhere() {
        let template = crate::game::bomb::BombTemplate { name: "bomb".to_string(), fuse_ticks: 2 };
        let replicator = ActionReplicator::new(Some(template), Default::default(), Default::default());
        let mut session = LoopbackSession::new(replicator, CharacterConfig::default(), SessionConfig::default());
        let remote = session.add_remote();
        let actor = session.spawn_character(remote, Vec3::ZERO).unwrap();

        session.throw_bomb(actor).unwrap();
        session.pump().await.unwrap();
        session.advance();
        session.advance();

        assert!(session.peers().all(|p| p.state().bombs.is_empty()));
        assert!(session.converged());
    }
}
