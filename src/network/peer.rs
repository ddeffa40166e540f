//! Peer Simulation
//!
//! One participant in the arena: its own [`ArenaState`], the role it plays,
//! and an outbox of messages waiting to be routed. The peer turns replicator
//! effects into spawns and queued messages; it never touches a channel.

use std::collections::VecDeque;
use tracing::{debug, info};

use crate::core::hash::WorldHash;
use crate::core::vec3::{Rotator, Vec3};
use crate::game::character::{ActorId, Character, CharacterConfig};
use crate::game::events::GameEvent;
use crate::game::skill::SkillKind;
use crate::game::state::ArenaState;
use crate::network::protocol::{ClientMessage, PeerId, ServerMessage};
use crate::network::replicator::{
    ActionReplicator, AuthorityQuery, Effect, ReplicationError, Role, TriggerOutcome,
};

/// A message queued by a peer.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    /// Remote -> authority.
    ToAuthority(ClientMessage),
    /// Authority -> every observer.
    ToObservers(ServerMessage),
}

/// One participant in the arena.
#[derive(Debug)]
pub struct Peer {
    id: PeerId,
    role: Role,
    state: ArenaState,
    replicator: ActionReplicator,
    character_config: CharacterConfig,
    outbox: Vec<Outbound>,
}

impl AuthorityQuery for Peer {
    fn is_authoritative(&self, actor: ActorId) -> bool {
        self.role.is_authoritative(actor)
    }
}

impl Peer {
    /// Create a peer with an empty arena.
    pub fn new(id: PeerId, role: Role, replicator: ActionReplicator, character_config: CharacterConfig) -> Self {
        info!("{} joined as {:?}", id, role);
        Self {
            id,
            role,
            state: ArenaState::new(),
            replicator,
            character_config,
            outbox: Vec::new(),
        }
    }

    /// Peer id.
    pub fn id(&self) -> PeerId {
        self.id
    }

    /// Role this peer plays.
    pub fn role(&self) -> Role {
        self.role
    }

    /// This peer's arena.
    pub fn state(&self) -> &ArenaState {
        &self.state
    }

    /// Recorded events.
    pub fn events(&self) -> &[GameEvent] {
        &self.state.events
    }

    /// Digest of this peer's bombs.
    pub fn digest(&self) -> WorldHash {
        self.state.digest()
    }

    /// Number of queued messages.
    pub fn pending(&self) -> usize {
        self.outbox.len()
    }

    /// Take every queued message.
    pub fn drain_outbox(&mut self) -> Vec<Outbound> {
        std::mem::take(&mut self.outbox)
    }

    /// Put messages back at the front of the outbox, keeping their order.
    pub fn requeue<I>(&mut self, unsent: I)
    where
        I: IntoIterator<Item = Outbound>,
    {
        let mut outbox: Vec<Outbound> = unsent.into_iter().collect();
        outbox.append(&mut self.outbox);
        self.outbox = outbox;
    }

    fn character(&self, actor: ActorId) -> Result<&Character, ReplicationError> {
        self.state.character(&actor).ok_or(ReplicationError::UnknownActor(actor))
    }

    // =========================================================================
    // CHARACTERS
    // =========================================================================

    /// Create this peer's replica of a character.
    pub fn spawn_character(&mut self, actor: ActorId, position: Vec3) -> Result<&Character, ReplicationError> {
        let character = self.state.add_character(actor, position, &self.character_config)?;
        debug!("{} spawned character {}", self.id, actor.short());
        Ok(character)
    }

    /// Install a copy of a character as it exists elsewhere.
    pub fn adopt_character(&mut self, character: Character) {
        self.state.characters.insert(character.id(), character);
    }

    /// Move a character replica.
    pub fn move_character(&mut self, actor: ActorId, position: Vec3, orientation: Rotator) -> Result<(), ReplicationError> {
        let character = self
            .state
            .character_mut(&actor)
            .ok_or(ReplicationError::UnknownActor(actor))?;
        character.set_transform(position, orientation);
        Ok(())
    }

    /// Raise a skill at the authority and announce it to observers.
    pub fn upgrade_skill(&mut self, actor: ActorId, kind: SkillKind) -> Result<i32, ReplicationError> {
        if !self.is_authoritative(actor) {
            return Err(ReplicationError::NotAuthority);
        }
        let level = self
            .state
            .upgrade_skill(actor, kind)
            .ok_or(ReplicationError::UnknownActor(actor))??;

        info!("{} upgraded {} of {} to {}", self.id, kind, actor.short(), level);
        self.outbox.push(Outbound::ToObservers(ServerMessage::SkillUpgraded { actor_id: actor, kind }));
        Ok(level)
    }

    /// Advance one tick.
    pub fn advance(&mut self) {
        self.state.advance();
    }

    // =========================================================================
    // THROWS
    // =========================================================================

    /// Handle the local throw input for `actor`.
    pub fn throw_bomb(&mut self, actor: ActorId) -> Result<TriggerOutcome, ReplicationError> {
        let role = self.role_of(actor);
        let outcome = self.replicator.trigger(role, self.character(actor)?)?;
        if let TriggerOutcome::Dispatched(effects) = &outcome {
            self.apply(effects.iter().copied())?;
        }
        Ok(outcome)
    }

    /// Handle a message from a remote peer.
    pub fn receive_client(&mut self, from: PeerId, message: ClientMessage) -> Result<(), ReplicationError> {
        match message {
            ClientMessage::ThrowBomb(request) => {
                debug!("{} got throw from {} for {}", self.id, from, request.origin.short());
                let effects = self.replicator.on_request(
                    self.role_of(request.origin),
                    request,
                    self.state.character(&request.origin),
                )?;
                self.apply(effects)
            }
        }
    }

    /// Handle a message from the authority.
    pub fn receive_server(&mut self, message: ServerMessage) -> Result<(), ReplicationError> {
        match message {
            ServerMessage::BombThrown(broadcast) => {
                let effects = self.replicator.on_broadcast(self.id, broadcast);
                self.apply(effects)
            }
            ServerMessage::SkillUpgraded { actor_id, kind } => {
                // The authority applied this upgrade when it sent it.
                if self.is_authoritative(actor_id) {
                    return Ok(());
                }
                self.state
                    .upgrade_skill(actor_id, kind)
                    .ok_or(ReplicationError::UnknownActor(actor_id))??;
                Ok(())
            }
        }
    }

    /// Carry out replicator effects in order.
    pub fn apply<I>(&mut self, effects: I) -> Result<(), ReplicationError>
    where
        I: IntoIterator<Item = Effect>,
    {
        let mut pending: VecDeque<Effect> = effects.into_iter().collect();

        while let Some(effect) = pending.pop_front() {
            match effect {
                Effect::SendToAuthority(request) => {
                    self.outbox.push(Outbound::ToAuthority(ClientMessage::ThrowBomb(request)));
                }
                Effect::Execute(request) => {
                    if !self.is_authoritative(request.origin) {
                        return Err(ReplicationError::NotAuthority);
                    }
                    let thrower = self
                        .state
                        .characters
                        .get(&request.origin)
                        .ok_or(ReplicationError::UnknownActor(request.origin))?;
                    let (handle, broadcast) =
                        self.replicator.execute(&mut self.state.bombs, self.id, thrower, &request)?;

                    info!(
                        "{} executed bomb {:?} for {} at {:?} power {}",
                        self.id, handle, request.origin.short(), request.position, broadcast.power
                    );
                    self.state.events.push(GameEvent::bomb_executed(
                        self.state.tick,
                        request.origin,
                        handle,
                        request.position,
                        broadcast.power,
                    ));
                    pending.push_back(Effect::Broadcast(broadcast));
                }
                Effect::Broadcast(broadcast) => {
                    self.outbox.push(Outbound::ToObservers(ServerMessage::BombThrown(broadcast)));
                }
                Effect::Mirror(broadcast) => {
                    let handle = self.replicator.mirror(&mut self.state.bombs, &broadcast)?;
                    debug!(
                        "{} mirrored bomb {:?} for {} power {}",
                        self.id, handle, broadcast.origin.short(), broadcast.power
                    );
                    self.state.events.push(GameEvent::bomb_mirrored(
                        self.state.tick,
                        broadcast.origin,
                        handle,
                        broadcast.position,
                        broadcast.power,
                    ));
                }
            }
        }
        Ok(())
    }
}
