//! Bomb-Throw Replication
//!
//! Decides, per role, what a throw trigger turns into. Every decision is a
//! plain function from inputs to a list of [`Effect`]s; applying them
//! (spawning, sending) is the caller's job. That keeps the authority/remote
//! branching testable without any transport.
//!
//! ## Flow
//!
//! ```text
//!  triggering peer                 authority                  observers
//!  ───────────────                 ─────────                  ─────────
//!  trigger()
//!   ├─ Authoritative ──> Execute ─> Broadcast ──────────────> on_broadcast() -> Mirror
//!   └─ Remote ─ SendToAuthority ─> on_request() -> Execute ─> Broadcast ─> ...
//! ```
//!
//! Exactly one Execute runs per trigger, always at the authority. The
//! executing peer skips its own broadcast; every other peer mirrors it once.

use serde::{Serialize, Deserialize};
use tracing::debug;

use crate::core::grid::{GridConfig, SPAWN_VERTICAL_OFFSET};
use crate::game::bomb::{ActionSpawner, BombId, BombOrigin, BombTemplate};
use crate::game::character::{ActorId, Character};
use crate::game::skill::{SkillError, SkillKind};
use crate::network::protocol::{PeerId, ThrowBroadcast, ThrowRequest};

/// Which branch of the protocol a peer runs for an actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Canonical simulation for the actor.
    Authoritative,
    /// Observer; forwards its own triggers to the authority.
    Remote,
}

/// Authority lookup provided by the hosting session.
pub trait AuthorityQuery {
    /// Whether this peer is authoritative for `actor`.
    fn is_authoritative(&self, actor: ActorId) -> bool;

    /// Role for `actor`.
    fn role_of(&self, actor: ActorId) -> Role {
        if self.is_authoritative(actor) {
            Role::Authoritative
        } else {
            Role::Remote
        }
    }
}

/// A peer-wide role: the host is authoritative for every actor.
impl AuthorityQuery for Role {
    fn is_authoritative(&self, _actor: ActorId) -> bool {
        *self == Role::Authoritative
    }
}

/// Tuning for the throw path.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThrowConfig {
    /// Height subtracted from the thrower's position before snapping.
    pub vertical_offset: f32,
    /// Accept a remote's throw without checking its bomb count again.
    pub trust_client: bool,
}

impl Default for ThrowConfig {
    fn default() -> Self {
        Self {
            vertical_offset: SPAWN_VERTICAL_OFFSET,
            trust_client: true,
        }
    }
}

/// Replication setup errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReplicationError {
    /// No bomb class configured.
    #[error("no bomb template configured")]
    MissingTemplate,

    /// Actor has no replica on this peer.
    #[error("unknown actor {0:?}")]
    UnknownActor(ActorId),

    /// Authority-only step run on a remote peer.
    #[error("peer is not authoritative")]
    NotAuthority,

    /// Skill lookup failed.
    #[error("skill error: {0}")]
    Skill(#[from] SkillError),
}

/// One step the caller must carry out.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Effect {
    /// Forward the request to the authority.
    SendToAuthority(ThrowRequest),
    /// Spawn the real bomb here, then broadcast.
    Execute(ThrowRequest),
    /// Multicast an executed throw to observers.
    Broadcast(ThrowBroadcast),
    /// Spawn a local copy of an executed throw.
    Mirror(ThrowBroadcast),
}

/// Result of a trigger.
#[derive(Debug, Clone, PartialEq)]
pub enum TriggerOutcome {
    /// Nothing to spend; nothing happened.
    Skipped,
    /// Preconditions passed; apply these effects.
    Dispatched(Vec<Effect>),
}

impl TriggerOutcome {
    /// Whether the trigger went through.
    pub fn is_dispatched(&self) -> bool {
        matches!(self, TriggerOutcome::Dispatched(_))
    }
}

/// Throw replication policy for one peer.
#[derive(Debug, Clone)]
pub struct ActionReplicator {
    template: Option<BombTemplate>,
    grid: GridConfig,
    config: ThrowConfig,
}

impl ActionReplicator {
    /// Create a replicator.
    pub fn new(template: Option<BombTemplate>, grid: GridConfig, config: ThrowConfig) -> Self {
        Self { template, grid, config }
    }

    /// Configured bomb class.
    pub fn template(&self) -> Option<&BombTemplate> {
        self.template.as_ref()
    }

    /// Throw tuning.
    pub fn config(&self) -> &ThrowConfig {
        &self.config
    }

    fn require_template(&self) -> Result<&BombTemplate, ReplicationError> {
        self.template.as_ref().ok_or(ReplicationError::MissingTemplate)
    }

    /// Handle a throw input on the peer that owns the input.
    ///
    /// A missing template is a setup error. An empty bomb count is not:
    /// the trigger is skipped and nothing is sent.
    pub fn trigger(&self, role: Role, thrower: &Character) -> Result<TriggerOutcome, ReplicationError> {
        self.require_template()?;

        if !thrower.skills().can_afford(SkillKind::BombCount)? {
            debug!("Throw skipped for {:?}: no bombs", thrower.id());
            return Ok(TriggerOutcome::Skipped);
        }

        let request = ThrowRequest {
            origin: thrower.id(),
            position: self.grid.spawn_point(thrower.position(), self.config.vertical_offset),
            orientation: thrower.orientation(),
        };

        let effect = match role {
            Role::Authoritative => Effect::Execute(request),
            Role::Remote => Effect::SendToAuthority(request),
        };
        Ok(TriggerOutcome::Dispatched(vec![effect]))
    }

    /// Handle a forwarded request at the authority.
    ///
    /// With `trust_client` off, `thrower` (the authority's replica) must
    /// still have a bomb to spend; otherwise the request is dropped.
    pub fn on_request(
        &self,
        role: Role,
        request: ThrowRequest,
        thrower: Option<&Character>,
    ) -> Result<Vec<Effect>, ReplicationError> {
        if role != Role::Authoritative {
            return Err(ReplicationError::NotAuthority);
        }

        if !self.config.trust_client {
            let replica = thrower.ok_or(ReplicationError::UnknownActor(request.origin))?;
            if !replica.skills().can_afford(SkillKind::BombCount)? {
                debug!("Dropped throw from {:?}: authority sees no bombs", request.origin);
                return Ok(Vec::new());
            }
        }

        Ok(vec![Effect::Execute(request)])
    }

    /// Run Execute: spawn the real bomb and build its broadcast.
    ///
    /// Power is the thrower's `BlastRadius` level now, not at trigger time.
    pub fn execute<S>(
        &self,
        spawner: &mut S,
        executor: PeerId,
        thrower: &Character,
        request: &ThrowRequest,
    ) -> Result<(BombId, ThrowBroadcast), ReplicationError>
    where
        S: ActionSpawner + ?Sized,
    {
        let template = self.require_template()?;
        let power = thrower.skills().level_of(SkillKind::BlastRadius)?;

        let handle = spawner.spawn(template, request.position, request.orientation, BombOrigin::Executed);
        spawner.set_owner(handle, thrower.id());
        spawner.set_power(handle, power);

        let broadcast = ThrowBroadcast {
            origin: thrower.id(),
            executor,
            position: request.position,
            orientation: request.orientation,
            power,
        };
        Ok((handle, broadcast))
    }

    /// Handle an executed throw arriving at `local`.
    ///
    /// The executing peer already has the real bomb and mirrors nothing.
    pub fn on_broadcast(&self, local: PeerId, broadcast: ThrowBroadcast) -> Vec<Effect> {
        if broadcast.executor == local {
            return Vec::new();
        }
        vec![Effect::Mirror(broadcast)]
    }

    /// Spawn the local copy of an executed throw.
    pub fn mirror<S>(&self, spawner: &mut S, broadcast: &ThrowBroadcast) -> Result<BombId, ReplicationError>
    where
        S: ActionSpawner + ?Sized,
    {
        let template = self.require_template()?;
        let handle = spawner.spawn(template, broadcast.position, broadcast.orientation, BombOrigin::Mirrored);
        spawner.set_owner(handle, broadcast.origin);
        spawner.set_power(handle, broadcast.power);
        Ok(handle)
    }
}

impl Default for ActionReplicator {
    fn default() -> Self {
        Self::new(Some(BombTemplate::default()), GridConfig::default(), ThrowConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::vec3::{Rotator, Vec3};
    use crate::game::bomb::BombField;
    use crate::game::character::CharacterConfig;
    use crate::game::skill::{NullSink, SkillSet};

    fn thrower_at(position: Vec3) -> Character {
        let mut c = Character::new(ActorId::new([1; 16]), position, &CharacterConfig::default()).unwrap();
        c.set_transform(position, Rotator::from_yaw(45.0));
        c
    }

    fn bombless_thrower() -> Character {
        let mut skills = SkillSet::new();
        skills.init(SkillKind::BlastRadius, 2, 8).unwrap();
        skills.init(SkillKind::BombCount, 0, 4).unwrap();
        skills.init(SkillKind::Speed, 1, 6).unwrap();
        Character::with_skills(ActorId::new([2; 16]), Vec3::ZERO, &CharacterConfig::default(), skills).unwrap()
    }

    fn single(outcome: TriggerOutcome) -> Effect {
        match outcome {
            TriggerOutcome::Dispatched(effects) => {
                assert_eq!(effects.len(), 1);
                effects[0]
            }
            TriggerOutcome::Skipped => panic!("expected dispatch"),
        }
    }

    #[test]
    fn test_authority_trigger_executes_directly() {
        let r = ActionReplicator::default();
        let effect = single(r.trigger(Role::Authoritative, &thrower_at(Vec3::new(149.0, 150.0, 96.0))).unwrap());

        match effect {
            Effect::Execute(req) => {
                assert_eq!(req.position, Vec3::new(100.0, 200.0, 36.0));
                assert_eq!(req.orientation, Rotator::from_yaw(45.0));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_remote_trigger_forwards() {
        let r = ActionReplicator::default();
        let effect = single(r.trigger(Role::Remote, &thrower_at(Vec3::new(-149.0, 0.0, 60.0))).unwrap());
        match effect {
            Effect::SendToAuthority(req) => assert_eq!(req.position, Vec3::new(-100.0, 0.0, 0.0)),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_no_bombs_is_silent_skip() {
        let r = ActionReplicator::default();
        assert_eq!(r.trigger(Role::Remote, &bombless_thrower()).unwrap(), TriggerOutcome::Skipped);
        assert_eq!(r.trigger(Role::Authoritative, &bombless_thrower()).unwrap(), TriggerOutcome::Skipped);
    }

    #[test]
    fn test_missing_template_is_error() {
        let r = ActionReplicator::new(None, GridConfig::default(), ThrowConfig::default());
        assert_eq!(
            r.trigger(Role::Authoritative, &thrower_at(Vec3::ZERO)).unwrap_err(),
            ReplicationError::MissingTemplate
        );
    }

    #[test]
    fn test_on_request_requires_authority() {
        let r = ActionReplicator::default();
        let req = ThrowRequest { origin: ActorId::new([1; 16]), position: Vec3::ZERO, orientation: Rotator::IDENTITY };
        assert_eq!(r.on_request(Role::Remote, req, None).unwrap_err(), ReplicationError::NotAuthority);
        assert_eq!(r.on_request(Role::Authoritative, req, None).unwrap(), vec![Effect::Execute(req)]);
    }

    #[test]
    fn test_revalidation_drops_unaffordable_request() {
        let config = ThrowConfig { trust_client: false, ..ThrowConfig::default() };
        let r = ActionReplicator::new(Some(BombTemplate::default()), GridConfig::default(), config);
        let broke = bombless_thrower();
        let req = ThrowRequest { origin: broke.id(), position: Vec3::ZERO, orientation: Rotator::IDENTITY };

        assert!(r.on_request(Role::Authoritative, req, Some(&broke)).unwrap().is_empty());
        assert_eq!(
            r.on_request(Role::Authoritative, req, None).unwrap_err(),
            ReplicationError::UnknownActor(broke.id())
        );
    }

    #[test]
    fn test_execute_reads_power_at_execution() {
        let r = ActionReplicator::default();
        let mut thrower = thrower_at(Vec3::new(0.0, 0.0, 60.0));
        let mut field = BombField::new();

        let req = match single(r.trigger(Role::Authoritative, &thrower).unwrap()) {
            Effect::Execute(req) => req,
            other => panic!("unexpected {:?}", other),
        };

        // Upgrade lands between trigger and Execute.
        thrower.upgrade_skill(SkillKind::BlastRadius, &mut NullSink).unwrap();

        let (handle, bc) = r.execute(&mut field, PeerId::HOST, &thrower, &req).unwrap();
        assert_eq!(bc.power, 3);
        assert_eq!(bc.executor, PeerId::HOST);

        let bomb = field.get(handle).unwrap();
        assert_eq!(bomb.power, 3);
        assert_eq!(bomb.owner, Some(thrower.id()));
        assert_eq!(bomb.origin, BombOrigin::Executed);
    }

    #[test]
    fn test_execute_leaves_bomb_count_alone() {
        let r = ActionReplicator::default();
        let thrower = thrower_at(Vec3::ZERO);
        let req = ThrowRequest { origin: thrower.id(), position: Vec3::ZERO, orientation: Rotator::IDENTITY };
        r.execute(&mut BombField::new(), PeerId::HOST, &thrower, &req).unwrap();
        assert_eq!(thrower.skills().level_of(SkillKind::BombCount).unwrap(), 1);
    }

    #[test]
    fn test_executor_does_not_mirror_itself() {
        let r = ActionReplicator::default();
        let bc = ThrowBroadcast {
            origin: ActorId::new([1; 16]),
            executor: PeerId::HOST,
            position: Vec3::ZERO,
            orientation: Rotator::IDENTITY,
            power: 2,
        };
        assert!(r.on_broadcast(PeerId::HOST, bc).is_empty());
        assert_eq!(r.on_broadcast(PeerId(1), bc), vec![Effect::Mirror(bc)]);
    }

    #[test]
    fn test_mirror_copies_broadcast() {
        let r = ActionReplicator::default();
        let mut field = BombField::new();
        let bc = ThrowBroadcast {
            origin: ActorId::new([6; 16]),
            executor: PeerId::HOST,
            position: Vec3::new(300.0, -100.0, 36.0),
            orientation: Rotator::from_yaw(180.0),
            power: 7,
        };
        let handle = r.mirror(&mut field, &bc).unwrap();
        let bomb = field.get(handle).unwrap();
        assert_eq!(bomb.position, bc.position);
        assert_eq!(bomb.power, 7);
        assert_eq!(bomb.owner, Some(bc.origin));
        assert_eq!(bomb.origin, BombOrigin::Mirrored);
    }

    #[test]
    fn test_role_as_authority_query() {
        let id = ActorId::new([1; 16]);
        assert_eq!(Role::Authoritative.role_of(id), Role::Authoritative);
        assert_eq!(Role::Remote.role_of(id), Role::Remote);
    }
}
