//! Session coordinator: owns every capture session and drives the engine.
//!
//! All state lives behind one struct mutated only from the tick task, so the
//! maps have a single writer and no locks. Event entry points (movement,
//! death, disconnect) take plain values and interleave safely with the tick
//! because every mutation is a short, terminating operation; nothing spans
//! ticks. Ending a session tears down its queue entries, roster, and wave
//! counter synchronously in the same call, so no stale work can touch a dead
//! session.

use std::sync::Arc;

use hashbrown::HashMap;
use rand::Rng;
use tracing::{debug, info, warn};

use crate::capture::session::{CaptureSession, SessionPhase};
use crate::notify::{CancelReason, NotificationSink, ZoneEvent};
use crate::reinforcement::queue::{ReinforcementSpawnQueue, SpawnDecision};
use crate::reinforcement::spawner::{
    sample_reduction_secs, MobPool, MobSpawner, SpawnOrder, UnitAttributes, UnitId,
};
use crate::reinforcement::tracker::{ReinforcementTracker, TargetingMode};
use crate::reinforcement::waves::{mobs_per_wave, WaveScheduler};
use crate::util::vec3::Vec3;
use crate::zone::constants::{capture, mobs, paths, targeting, waves};
use crate::zone::owner::{ActorId, CaptureOwner, OwnerKind, OwnerPlatformAdapter};
use crate::zone::point::{CapturePoint, ZoneId};
use crate::zone::settings::ZoneSettings;
use crate::zone::spatial::ZoneChunkIndex;

/// Why a capture attempt could not start. Returned, never thrown.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StartRejection {
    #[error("unknown zone '{0}'")]
    UnknownZone(ZoneId),
    #[error("zone '{0}' is not capturable")]
    NotCapturable(ZoneId),
    #[error("zone '{0}' is already under capture")]
    AlreadyUnderCapture(ZoneId),
    #[error("zone '{zone}' is on cooldown until tick {until}")]
    OnCooldown { zone: ZoneId, until: u64 },
    #[error("owner '{owner}' is locked out of zone '{zone}' until tick {until}")]
    RecaptureLocked { zone: ZoneId, owner: String, until: u64 },
    #[error("zone '{0}' is already controlled by this owner")]
    AlreadyControlled(ZoneId),
    #[error("actor has no owner identity for this zone")]
    NoOwnerIdentity,
    #[error("actor has no known position")]
    ActorNotTracked,
    #[error("actor is not inside zone '{0}'")]
    NotInsideZone(ZoneId),
}

/// Administrative operation failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AdminError {
    #[error("zone '{0}' already exists")]
    DuplicateZone(ZoneId),
    #[error("unknown zone '{0}'")]
    UnknownZone(ZoneId),
}

/// Progress handling while a zone is contested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ContestedPolicy {
    /// Timer holds while contested
    Pause,
    /// Progress resets when the contest starts
    Reset,
    /// Progress drains back one second per contested tick
    Rollback,
}

impl ContestedPolicy {
    fn from_setting(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "reset" => Self::Reset,
            "rollback" => Self::Rollback,
            _ => Self::Pause,
        }
    }
}

fn owner_kind_from_setting(value: &str) -> OwnerKind {
    match value.trim().to_ascii_lowercase().as_str() {
        "player" => OwnerKind::Player,
        "alliance" => OwnerKind::Alliance,
        _ => OwnerKind::Group,
    }
}

/// Last known state for an actor, fed by movement/disconnect events.
#[derive(Debug, Clone)]
struct ActorState {
    world: String,
    position: Vec3,
    online: bool,
}

/// What a session tick decided once the borrow on the session ends.
enum TickAction {
    Cancel(CancelReason),
    Hold,
    Advance,
}

/// Lifetime counters exported to the metrics registry.
#[derive(Debug, Default, Clone, Copy)]
pub struct EngineStats {
    pub captures_completed: u64,
    pub captures_cancelled: u64,
    pub units_spawned: u64,
    pub units_lost: u64,
    pub waves_queued: u64,
    pub retargets_issued: u64,
}

/// The capture engine: zone points, live sessions, and the reinforcement
/// machinery, driven by [`tick`](CaptureEngine::tick) once per second.
pub struct CaptureEngine {
    points: HashMap<ZoneId, CapturePoint>,
    sessions: HashMap<ZoneId, CaptureSession>,
    zone_index: ZoneChunkIndex,
    queue: ReinforcementSpawnQueue,
    tracker: ReinforcementTracker,
    waves: WaveScheduler,
    settings: ZoneSettings,
    actors: HashMap<ActorId, ActorState>,
    platform: Arc<dyn OwnerPlatformAdapter>,
    spawner: Arc<dyn MobSpawner>,
    notifier: Arc<dyn NotificationSink>,
    stats: EngineStats,
    /// Spawn requests granted by the most recent drain pass
    last_drain_granted: u64,
    /// Tick-counted seconds since engine start; the only clock in the engine
    now: u64,
}

impl CaptureEngine {
    pub fn new(
        platform: Arc<dyn OwnerPlatformAdapter>,
        spawner: Arc<dyn MobSpawner>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            points: HashMap::new(),
            sessions: HashMap::new(),
            zone_index: ZoneChunkIndex::new(),
            queue: ReinforcementSpawnQueue::new(),
            tracker: ReinforcementTracker::new(),
            waves: WaveScheduler::new(),
            settings: ZoneSettings::new(),
            actors: HashMap::new(),
            platform,
            spawner,
            notifier,
            stats: EngineStats::default(),
            last_drain_granted: 0,
            now: 0,
        }
    }

    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    pub fn last_drain_granted(&self) -> u64 {
        self.last_drain_granted
    }

    pub fn now(&self) -> u64 {
        self.now
    }

    pub fn settings(&self) -> &ZoneSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut ZoneSettings {
        &mut self.settings
    }

    pub fn point(&self, zone_id: &str) -> Option<&CapturePoint> {
        self.points.get(zone_id)
    }

    pub fn session(&self, zone_id: &str) -> Option<&CaptureSession> {
        self.sessions.get(zone_id)
    }

    pub fn zone_count(&self) -> usize {
        self.points.len()
    }

    pub fn active_session_count(&self) -> usize {
        self.sessions.values().filter(|s| s.is_active()).count()
    }

    pub fn contested_session_count(&self) -> usize {
        self.sessions
            .values()
            .filter(|s| s.is_active() && s.is_contested())
            .count()
    }

    pub fn queued_spawn_count(&self) -> usize {
        self.queue.len()
    }

    pub fn live_unit_count(&self) -> usize {
        self.tracker.total_units()
    }

    // ------------------------------------------------------------------
    // Administrative operations
    // ------------------------------------------------------------------

    /// Registers a new capture zone.
    pub fn create_point(&mut self, point: CapturePoint) -> Result<(), AdminError> {
        if self.points.contains_key(&point.id) {
            return Err(AdminError::DuplicateZone(point.id.clone()));
        }
        self.zone_index.insert(&point);
        info!("Created capture zone '{}' ({})", point.id, point.name);
        self.points.insert(point.id.clone(), point);
        Ok(())
    }

    /// Deletes a zone, cancelling any session on it first.
    pub fn delete_point(&mut self, zone_id: &str) -> Result<CapturePoint, AdminError> {
        if !self.points.contains_key(zone_id) {
            return Err(AdminError::UnknownZone(zone_id.to_string()));
        }
        let zone = zone_id.to_string();
        self.cancel_session(&zone, CancelReason::ZoneDeleted);
        let point = self.points.remove(&zone).expect("checked above");
        self.zone_index.remove(&point);
        self.settings.clear_zone(&zone);
        info!("Deleted capture zone '{}'", zone);
        Ok(point)
    }

    /// Force-stops a session without ownership change. Returns false when no
    /// session exists.
    pub fn force_stop(&mut self, zone_id: &str) -> bool {
        self.cancel_session(&zone_id.to_string(), CancelReason::AdminStopped)
    }

    /// Clears a zone's cooldown window.
    pub fn clear_cooldown(&mut self, zone_id: &str) -> Result<(), AdminError> {
        let point = self
            .points
            .get_mut(zone_id)
            .ok_or_else(|| AdminError::UnknownZone(zone_id.to_string()))?;
        point.clear_cooldown();
        Ok(())
    }

    /// Clears a zone's recapture locks.
    pub fn clear_locks(&mut self, zone_id: &str) -> Result<(), AdminError> {
        let point = self
            .points
            .get_mut(zone_id)
            .ok_or_else(|| AdminError::UnknownZone(zone_id.to_string()))?;
        point.clear_locks();
        Ok(())
    }

    /// Cancels every session and drains all reinforcement state. Sessions are
    /// volatile by design: a restart cancels, never resumes.
    pub fn shutdown(&mut self) {
        let zones: Vec<ZoneId> = self.sessions.keys().cloned().collect();
        for zone in &zones {
            self.cancel_session(zone, CancelReason::Shutdown);
        }
        self.queue.clear();
        for unit in self.tracker.clear() {
            self.spawner.despawn_unit(unit);
        }
        self.waves.clear();
        info!("Capture engine shut down ({} sessions cancelled)", zones.len());
    }

    // ------------------------------------------------------------------
    // Session lifecycle
    // ------------------------------------------------------------------

    /// Begins a capture attempt for the actor's owner identity. Every
    /// integrity violation is a typed rejection, not an error.
    pub fn start_capture(&mut self, zone_id: &str, actor: ActorId) -> Result<(), StartRejection> {
        let now = self.now;
        let zone = zone_id.to_string();
        let Some(point) = self.points.get(&zone) else {
            return Err(StartRejection::UnknownZone(zone));
        };
        if !self.settings.get_bool(&zone, paths::CAPTURABLE, true) {
            return Err(StartRejection::NotCapturable(zone));
        }
        if self.sessions.contains_key(&zone) {
            return Err(StartRejection::AlreadyUnderCapture(zone));
        }
        if point.is_on_cooldown(now) {
            return Err(StartRejection::OnCooldown {
                until: point.cooldown_until().unwrap_or(now),
                zone,
            });
        }

        let kind = owner_kind_from_setting(&self.settings.get_string(
            &zone,
            paths::OWNER_KIND,
            "group",
        ));
        let owner = self
            .platform
            .resolve_owner(actor, kind)
            .ok_or(StartRejection::NoOwnerIdentity)?;

        if point
            .controlling_owner
            .as_ref()
            .map(|c| c.is_same_owner(&owner))
            .unwrap_or(false)
        {
            return Err(StartRejection::AlreadyControlled(zone));
        }
        if point.is_locked_for(&owner, now) {
            let until = point
                .deposed_lock()
                .iter()
                .chain(point.attacker_lock().iter())
                .filter(|l| l.owner.is_same_owner(&owner))
                .map(|l| l.expires_at)
                .max()
                .unwrap_or(now);
            return Err(StartRejection::RecaptureLocked {
                zone,
                owner: owner.display_name().to_string(),
                until,
            });
        }

        let state = self
            .actors
            .get(&actor)
            .filter(|s| s.online)
            .ok_or(StartRejection::ActorNotTracked)?;
        if !point.contains(&state.world, state.position, 0) {
            return Err(StartRejection::NotInsideZone(zone));
        }

        let prep_secs = self
            .settings
            .get_int_in(&zone, paths::PREPARATION_MINUTES, capture::PREPARATION_MINUTES, 0, 1440)
            as u64
            * 60;
        let capture_secs = self
            .settings
            .get_int_in(&zone, paths::CAPTURE_MINUTES, capture::CAPTURE_MINUTES, 1, 1440)
            as u64
            * 60;

        let session = CaptureSession::new(zone.clone(), owner.clone(), actor, now, prep_secs, capture_secs);
        let capturing_immediately = session.phase() == SessionPhase::Capturing;
        self.sessions.insert(zone.clone(), session);
        if let Some(point) = self.points.get_mut(&zone) {
            point.capturing_owner = Some(owner.clone());
        }

        info!(
            "Capture attempt started on '{}' by {} (prep {}s, capture {}s)",
            zone, owner, prep_secs, capture_secs
        );
        self.notifier.send(ZoneEvent::SessionStarted {
            zone: zone.clone(),
            owner: owner.display_name().to_string(),
        });
        if capturing_immediately {
            self.notifier
                .send(ZoneEvent::CapturePhaseStarted { zone: zone.clone() });
            self.check_waves(&zone);
        }
        Ok(())
    }

    fn cancel_session(&mut self, zone_id: &ZoneId, reason: CancelReason) -> bool {
        let Some(mut session) = self.sessions.remove(zone_id) else {
            return false;
        };
        session.stop();
        if let Some(point) = self.points.get_mut(zone_id) {
            point.capturing_owner = None;
            // Cancellation discards the attempt's progress entirely.
            point.set_capture_progress_percent(0.0);
        }
        self.teardown_reinforcements(zone_id);
        self.stats.captures_cancelled += 1;
        info!("Capture attempt on '{}' cancelled: {:?}", zone_id, reason);
        self.notifier.send(ZoneEvent::Cancelled {
            zone: zone_id.clone(),
            reason,
        });
        true
    }

    fn complete_session(&mut self, zone_id: &ZoneId) {
        let Some(mut session) = self.sessions.remove(zone_id) else {
            return;
        };
        session.stop();
        let owner = session.owner().clone();
        let now = self.now;

        let cooldown_secs = self
            .settings
            .get_int_in(zone_id, paths::COOLDOWN_SECONDS, capture::COOLDOWN_SECONDS, 0, 604_800)
            as u64;
        let deposed_secs = self.settings.get_int_in(
            zone_id,
            paths::DEPOSED_LOCK_SECONDS,
            capture::DEPOSED_LOCK_SECONDS,
            0,
            604_800,
        ) as u64;
        let attacker_secs = self.settings.get_int_in(
            zone_id,
            paths::ATTACKER_LOCK_SECONDS,
            capture::ATTACKER_LOCK_SECONDS,
            0,
            604_800,
        ) as u64;

        if let Some(point) = self.points.get_mut(zone_id) {
            let deposed = point.controlling_owner.take();
            if let Some(prev) = deposed {
                if !prev.is_same_owner(&owner) && deposed_secs > 0 {
                    point.lock_deposed_owner(prev, now + deposed_secs);
                }
            }
            point.controlling_owner = Some(owner.clone());
            point.capturing_owner = None;
            point.set_capture_progress_percent(100.0);
            if cooldown_secs > 0 {
                point.set_cooldown_until(now + cooldown_secs);
            }
            if attacker_secs > 0 {
                point.lock_attacker(owner.clone(), now + attacker_secs);
            }
        }

        self.teardown_reinforcements(zone_id);
        self.stats.captures_completed += 1;
        info!("Zone '{}' captured by {}", zone_id, owner);
        self.notifier.send(ZoneEvent::Captured {
            zone: zone_id.clone(),
            owner: owner.display_name().to_string(),
        });
    }

    /// Drops every queued request, roster entry, wave counter, and retarget
    /// schedule for a zone in one pass.
    fn teardown_reinforcements(&mut self, zone_id: &str) {
        let purged = self.queue.purge_zone(zone_id);
        let units = self.tracker.teardown_zone(zone_id);
        self.waves.remove_zone(zone_id);
        for unit in &units {
            self.spawner.despawn_unit(*unit);
        }
        if purged > 0 || !units.is_empty() {
            debug!(
                "Tore down reinforcements for '{}': {} queued, {} live",
                zone_id,
                purged,
                units.len()
            );
        }
    }

    // ------------------------------------------------------------------
    // Tick driver
    // ------------------------------------------------------------------

    /// Advances the engine by one tick-second: session timers, wave
    /// scheduling, queue drain, and retargeting.
    pub fn tick(&mut self) {
        self.now += 1;

        let zones: Vec<ZoneId> = self.sessions.keys().cloned().collect();
        for zone in &zones {
            self.tick_session(zone);
        }

        self.process_spawn_queue();
        self.run_retargeting();

        for point in self.points.values_mut() {
            let _ = point.expire_locks(self.now);
        }
    }

    fn tick_session(&mut self, zone_id: &ZoneId) {
        // The session may already be gone if an event cancelled it this tick.
        let Some(session) = self.sessions.get(zone_id) else {
            return;
        };
        if !session.is_active() {
            return;
        }
        let owner = session.owner().clone();

        let policy = ContestedPolicy::from_setting(&self.settings.get_string(
            zone_id,
            paths::CONTESTED_POLICY,
            capture::CONTESTED_POLICY,
        ));
        let grace_secs = self
            .settings
            .get_int_in(zone_id, paths::GRACE_SECONDS, capture::GRACE_SECONDS, 0, 3600)
            as u64;

        let (owner_present, rival_present) = self.zone_presence(zone_id, &owner);
        let notifier = self.notifier.clone();

        let action = {
            let session = self.sessions.get_mut(zone_id).expect("checked above");

            if rival_present != session.is_contested() {
                session.set_contested(rival_present);
                if rival_present {
                    if policy == ContestedPolicy::Reset {
                        session.reset_capture_timer();
                    }
                    notifier.send(ZoneEvent::Contested { zone: zone_id.clone() });
                } else {
                    notifier.send(ZoneEvent::ContestCleared { zone: zone_id.clone() });
                }
            }

            if owner_present {
                if session.grace_active() {
                    session.clear_grace();
                }
            } else if !session.grace_active() {
                if grace_secs > 0 {
                    session.start_grace(grace_secs);
                    notifier.send(ZoneEvent::GraceStarted {
                        zone: zone_id.clone(),
                        seconds: grace_secs,
                    });
                } else {
                    // No grace configured: leaving cancels outright.
                }
            }

            if !owner_present && grace_secs == 0 {
                TickAction::Cancel(CancelReason::OwnerLeft)
            } else if session.grace_active() {
                if session.decrement_grace_seconds() {
                    TickAction::Cancel(CancelReason::OwnerLeft)
                } else {
                    // Timers hold while the grace window runs down.
                    TickAction::Hold
                }
            } else {
                match session.phase() {
                    SessionPhase::Preparation => {
                        session.decrement_preparation_time();
                        if session.preparation_exhausted() {
                            session.start_capture_phase();
                            notifier.send(ZoneEvent::CapturePhaseStarted { zone: zone_id.clone() });
                        }
                    }
                    SessionPhase::Capturing => {
                        if session.is_contested() {
                            if policy == ContestedPolicy::Rollback {
                                session.regress_capture_time(1);
                            }
                        } else {
                            let _ = session.decrement_capture_time_by(1);
                        }
                    }
                }
                TickAction::Advance
            }
        };

        match action {
            TickAction::Cancel(reason) => {
                self.cancel_session(zone_id, reason);
            }
            TickAction::Hold => {}
            TickAction::Advance => {
                self.check_waves(zone_id);
                self.try_complete(zone_id);
            }
        }
    }

    fn try_complete(&mut self, zone_id: &ZoneId) {
        let complete = self
            .sessions
            .get(zone_id)
            .map(|s| s.is_complete())
            .unwrap_or(false);
        if complete {
            self.complete_session(zone_id);
        }
    }

    /// Presence scan for one zone: is any matching owner actor inside, and is
    /// any rival owner's actor inside.
    fn zone_presence(&self, zone_id: &str, owner: &CaptureOwner) -> (bool, bool) {
        let Some(point) = self.points.get(zone_id) else {
            return (false, false);
        };
        let mut owner_present = false;
        let mut rival_present = false;
        for (actor, state) in &self.actors {
            if !state.online {
                continue;
            }
            if !point.contains(&state.world, state.position, 0) {
                continue;
            }
            if self
                .platform
                .does_actor_match_owner(*actor, owner.display_name(), owner.kind())
            {
                owner_present = true;
            } else if self.platform.resolve_owner_name(*actor, owner.kind()).is_some() {
                rival_present = true;
            }
            if owner_present && rival_present {
                break;
            }
        }
        (owner_present, rival_present)
    }

    // ------------------------------------------------------------------
    // Wave scheduling and spawn queue
    // ------------------------------------------------------------------

    /// Fires every wave phase now due for a zone, including phases skipped by
    /// a timer jump, each bounded by remaining room under the point cap.
    fn check_waves(&mut self, zone_id: &ZoneId) {
        let Some(session) = self.sessions.get(zone_id) else {
            return;
        };
        if !session.is_active() || session.phase() != SessionPhase::Capturing {
            return;
        }
        let remaining = session.remaining_capture_secs();
        let elapsed = session.elapsed_capture_secs();

        let stop_under = self.settings.get_int_in(
            zone_id,
            paths::STOP_SPAWN_UNDER_SECONDS,
            waves::STOP_SPAWN_UNDER_SECONDS,
            0,
            86_400,
        ) as u64;
        if remaining < stop_under {
            return;
        }

        let interval = self
            .settings
            .get_int_in(zone_id, paths::WAVE_INTERVAL_SECONDS, waves::INTERVAL_SECONDS, 1, 86_400)
            as u64;
        let base = self
            .settings
            .get_int_in(zone_id, paths::BASE_MOBS_PER_WAVE, waves::BASE_MOBS_PER_WAVE, 0, 100)
            as u64;
        let increase = self
            .settings
            .get_int_in(zone_id, paths::PHASE_INCREASE, waves::PHASE_INCREASE, 0, 100)
            as u64;
        let max_per_wave = self
            .settings
            .get_int_in(zone_id, paths::MAX_MOBS_PER_WAVE, waves::MAX_MOBS_PER_WAVE, 0, 1000)
            as u64;
        let max_per_point = self
            .settings
            .get_int_in(zone_id, paths::MAX_MOBS_PER_POINT, waves::MAX_MOBS_PER_POINT, 0, 10_000)
            as u64;

        let due = self.waves.due_phases(zone_id, elapsed, interval);
        for phase in due {
            let want = mobs_per_wave(phase, base, increase, max_per_wave);
            let used = (self.tracker.roster_size(zone_id) + self.queue.pending_for(zone_id)) as u64;
            let room = max_per_point.saturating_sub(used);
            let queued = want.min(room);
            for _ in 0..queued {
                self.queue.enqueue(zone_id);
            }
            if queued > 0 {
                self.stats.waves_queued += 1;
                debug!(
                    "Zone '{}' wave {}: queued {} of {} units",
                    zone_id, phase, queued, want
                );
                self.notifier.send(ZoneEvent::WaveQueued {
                    zone: zone_id.clone(),
                    phase,
                    units: queued,
                });
            }
        }
    }

    /// One tick's queue drain under the global and per-zone caps.
    fn process_spawn_queue(&mut self) {
        self.last_drain_granted = 0;
        if self.queue.is_empty() {
            return;
        }
        let global_max = self.settings.get_int_in(
            "",
            paths::GLOBAL_MAX_PER_TICK,
            waves::GLOBAL_MAX_PER_TICK,
            0,
            10_000,
        ) as usize;
        if global_max == 0 {
            return;
        }

        let settings = &self.settings;
        let sessions = &self.sessions;
        let tracker = &self.tracker;
        let granted = self.queue.drain_for_tick(
            global_max,
            |zone| {
                settings.get_int_in(zone, paths::ZONE_MAX_PER_TICK, waves::ZONE_MAX_PER_TICK, 0, 1000)
                    as usize
            },
            |zone| {
                let Some(session) = sessions.get(zone) else {
                    return SpawnDecision::ZoneDead;
                };
                if !session.is_active() {
                    return SpawnDecision::ZoneDead;
                }
                if session.phase() != SessionPhase::Capturing {
                    return SpawnDecision::Defer;
                }
                let max_per_point = settings.get_int_in(
                    zone,
                    paths::MAX_MOBS_PER_POINT,
                    waves::MAX_MOBS_PER_POINT,
                    0,
                    10_000,
                ) as usize;
                if tracker.roster_size(zone) >= max_per_point {
                    SpawnDecision::Defer
                } else {
                    SpawnDecision::Grant
                }
            },
        );

        self.last_drain_granted = granted.len() as u64;
        for zone in granted {
            self.spawn_one(&zone);
        }
    }

    /// Materializes one unit for a zone through the spawner boundary.
    fn spawn_one(&mut self, zone_id: &ZoneId) {
        let Some(point) = self.points.get(zone_id) else {
            return;
        };
        let Some(session) = self.sessions.get(zone_id) else {
            return;
        };
        let world = point.shape.world().clone();
        if world.is_empty() {
            warn!("Zone '{}' has no backing world, dropping spawn", zone_id);
            return;
        }
        let anchor = point.shape.anchor();
        let radius_blocks = (point.shape.bounding_chunk_radius() as i64 * 16) as f64;
        let origin_actor = session.initiator();

        let enhanced_share = self.settings.get_f64_in(
            zone_id,
            paths::ENHANCED_SHARE,
            waves::ENHANCED_SHARE,
            0.0,
            1.0,
        );

        let mut rng = rand::thread_rng();
        let pool = if rng.gen::<f64>() < enhanced_share {
            MobPool::Enhanced
        } else {
            MobPool::Vanilla
        };
        let type_list = match pool {
            MobPool::Vanilla => self.settings.get_list(zone_id, paths::VANILLA_MOBS, mobs::VANILLA),
            MobPool::Enhanced => self.settings.get_list(zone_id, paths::ENHANCED_MOBS, mobs::ENHANCED),
        };
        let mob_type = if type_list.is_empty() {
            mobs::VANILLA[0].to_string()
        } else {
            type_list[rng.gen_range(0..type_list.len())].clone()
        };

        // Scatter spawns inside the zone rather than stacking on the anchor.
        let angle = rng.gen_range(0.0..std::f64::consts::TAU);
        let distance = rng.gen_range(0.0..radius_blocks * 0.75);
        let position = Vec3::new(
            anchor.x + angle.cos() * distance,
            anchor.y,
            anchor.z + angle.sin() * distance,
        );

        let order = SpawnOrder {
            zone_id: zone_id.clone(),
            world,
            position,
            pool,
            mob_type: mob_type.clone(),
            origin_actor,
        };
        match self.spawner.spawn_unit(&order) {
            Some(unit_id) => {
                self.stats.units_spawned += 1;
                self.tracker.register(
                    UnitAttributes {
                        unit_id,
                        zone_id: zone_id.clone(),
                        pool,
                        mob_type,
                        origin_actor,
                        spawned_at: self.now,
                    },
                    position,
                );
            }
            None => {
                // Transient failure: drop, the next wave re-evaluates need.
                warn!("Spawn failed for zone '{}', request dropped", zone_id);
            }
        }
    }

    // ------------------------------------------------------------------
    // Retargeting
    // ------------------------------------------------------------------

    fn run_retargeting(&mut self) {
        let zones: Vec<ZoneId> = self.sessions.keys().cloned().collect();
        for zone_id in zones {
            if !self.tracker.is_retarget_due(&zone_id, self.now) {
                continue;
            }
            let interval = self.settings.get_int_in(
                &zone_id,
                paths::RETARGET_INTERVAL_SECONDS,
                targeting::RETARGET_INTERVAL_SECONDS,
                1,
                3600,
            ) as u64;
            let mode = TargetingMode::from_setting(&self.settings.get_string(
                &zone_id,
                paths::TARGETING_MODE,
                targeting::MODE,
            ));
            let buffer = self.settings.get_int_in(
                &zone_id,
                paths::SEARCH_BUFFER_CHUNKS,
                targeting::SEARCH_BUFFER_CHUNKS,
                0,
                16,
            ) as u32;

            let candidates = self.target_candidates(&zone_id, mode, buffer);
            let spawner = self.spawner.clone();
            let changed = self.tracker.retarget_zone(&zone_id, &candidates, |_| None);
            self.stats.retargets_issued += changed.len() as u64;
            for (unit, actor) in changed {
                spawner.retarget_unit(unit, actor);
            }
            self.tracker.schedule_retarget(&zone_id, self.now + interval);
        }
    }

    /// Actors eligible as reinforcement targets under a zone's policy.
    fn target_candidates(
        &self,
        zone_id: &str,
        mode: TargetingMode,
        buffer_chunks: u32,
    ) -> Vec<(ActorId, Vec3)> {
        let Some(point) = self.points.get(zone_id) else {
            return Vec::new();
        };
        let Some(session) = self.sessions.get(zone_id) else {
            return Vec::new();
        };
        let owner = session.owner();
        self.actors
            .iter()
            .filter_map(|(actor, state)| {
                if !state.online {
                    return None;
                }
                if !point.contains(&state.world, state.position, buffer_chunks) {
                    return None;
                }
                let matches = self.platform.does_actor_match_owner(
                    *actor,
                    owner.display_name(),
                    owner.kind(),
                );
                let eligible = match mode {
                    TargetingMode::CapturingOwner => matches,
                    TargetingMode::OpposingOwners => !matches,
                    TargetingMode::AnyoneInside => true,
                };
                eligible.then_some((*actor, state.position))
            })
            .collect()
    }

    // ------------------------------------------------------------------
    // Inbound events (plain values only; no host-specific types)
    // ------------------------------------------------------------------

    /// Actor moved. Updates the registry and participant membership; absence
    /// consequences (grace, cancellation) are applied by the next tick.
    pub fn handle_movement(&mut self, actor: ActorId, world: &str, position: Vec3) {
        self.actors.insert(
            actor,
            ActorState {
                world: world.to_string(),
                position,
                online: true,
            },
        );

        // Joins: only zones whose chunk box covers the new position.
        for zone_id in self.zone_index.candidates(world, position, 0) {
            let Some(point) = self.points.get(&zone_id) else {
                continue;
            };
            if !point.contains(world, position, 0) {
                continue;
            }
            let Some(session) = self.sessions.get(&zone_id) else {
                continue;
            };
            if !session.is_active() {
                continue;
            }
            let owner = session.owner().clone();
            if self
                .platform
                .does_actor_match_owner(actor, owner.display_name(), owner.kind())
            {
                let session = self.sessions.get_mut(&zone_id).expect("checked above");
                // one-shot notice per session, even if the actor patrols in and out
                if session.add_participant(actor) && session.mark_warned(actor) {
                    debug!("Actor {} joined capture of '{}'", actor, zone_id);
                }
                if session.grace_active() {
                    session.clear_grace();
                }
            }
        }

        // Leaves: sessions the actor participates in but no longer stands in.
        let member_zones: Vec<ZoneId> = self
            .sessions
            .iter()
            .filter(|(_, s)| s.is_active() && s.is_participant(actor))
            .map(|(z, _)| z.clone())
            .collect();
        for zone_id in member_zones {
            let inside = self
                .points
                .get(&zone_id)
                .map(|p| p.contains(world, position, 0))
                .unwrap_or(false);
            if !inside {
                if let Some(session) = self.sessions.get_mut(&zone_id) {
                    session.remove_participant(actor);
                    debug!("Actor {} left capture of '{}'", actor, zone_id);
                }
            }
        }
    }

    /// Actor died. Treated as leaving every zone until the next movement
    /// event re-registers them.
    pub fn handle_actor_death(&mut self, actor: ActorId) {
        self.actors.remove(&actor);
        for session in self.sessions.values_mut() {
            if session.is_active() {
                session.remove_participant(actor);
            }
        }
    }

    /// Actor disconnected. Sessions whose participant set empties out are
    /// cancelled immediately.
    pub fn handle_disconnect(&mut self, actor: ActorId) {
        if let Some(state) = self.actors.get_mut(&actor) {
            state.online = false;
        }
        let mut emptied: Vec<ZoneId> = Vec::new();
        for (zone_id, session) in self.sessions.iter_mut() {
            if !session.is_active() {
                continue;
            }
            if session.remove_participant(actor) && session.participant_count() == 0 {
                emptied.push(zone_id.clone());
            }
        }
        for zone_id in emptied {
            self.cancel_session(&zone_id, CancelReason::AllParticipantsDisconnected);
        }
    }

    /// A reinforcement unit died. Applies the configured capture-timer
    /// reduction and re-runs the skipped-phase catch-up.
    pub fn handle_unit_death(&mut self, unit: UnitId) {
        let Some(attrs) = self.tracker.remove_unit(unit) else {
            return;
        };
        self.stats.units_lost += 1;
        let zone_id = attrs.zone_id.clone();
        let Some(session) = self.sessions.get(&zone_id) else {
            return;
        };
        if !session.is_active() || session.phase() != SessionPhase::Capturing {
            return;
        }

        let reduction = sample_reduction_secs(&self.settings, &zone_id, attrs.pool, &attrs.mob_type);
        let session = self.sessions.get_mut(&zone_id).expect("checked above");
        let whole = session.consume_capture_progress(reduction);
        let consumed = session.decrement_capture_time_by(whole);
        if consumed > 0 {
            debug!(
                "Reinforcement kill in '{}' cut the timer by {}s",
                zone_id, consumed
            );
            self.notifier.send(ZoneEvent::TimerReduced {
                zone: zone_id.clone(),
                seconds: consumed,
            });
        }
        self.check_waves(&zone_id);
        self.try_complete(&zone_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::ChannelSink;
    use crate::reinforcement::spawner::RecordingSpawner;
    use crate::zone::owner::StaticOwnerDirectory;
    use crate::zone::point::ZoneShape;
    use crossbeam_channel::Receiver;
    use serde_json::json;
    use uuid::Uuid;

    const WORLD: &str = "overworld";

    struct Harness {
        engine: CaptureEngine,
        spawner: Arc<RecordingSpawner>,
        events: Receiver<ZoneEvent>,
    }

    /// Engine with one circular zone "alpha" (1 chunk radius at the origin),
    /// no preparation, 2 minute capture, no grace, no cooldown.
    fn harness(members: &[(ActorId, &str)]) -> Harness {
        let mut directory = StaticOwnerDirectory::new();
        for (actor, owner) in members {
            directory.assign(*actor, OwnerKind::Group, *owner);
        }
        let spawner = Arc::new(RecordingSpawner::new());
        let (sink, events) = ChannelSink::unbounded();
        let mut engine = CaptureEngine::new(Arc::new(directory), spawner.clone(), Arc::new(sink));

        engine
            .create_point(CapturePoint::new(
                "alpha",
                "Alpha",
                ZoneShape::circle(WORLD, Vec3::new(0.0, 64.0, 0.0), 1),
            ))
            .unwrap();
        engine.settings_mut().set_zone_value("alpha", paths::PREPARATION_MINUTES, json!(0));
        engine.settings_mut().set_zone_value("alpha", paths::CAPTURE_MINUTES, json!(2));
        engine.settings_mut().set_zone_value("alpha", paths::GRACE_SECONDS, json!(0));
        engine.settings_mut().set_zone_value("alpha", paths::COOLDOWN_SECONDS, json!(0));

        Harness { engine, spawner, events }
    }

    fn drain(events: &Receiver<ZoneEvent>) -> Vec<ZoneEvent> {
        events.try_iter().collect()
    }

    fn inside() -> Vec3 {
        Vec3::new(4.0, 64.0, 4.0)
    }

    fn outside() -> Vec3 {
        Vec3::new(500.0, 64.0, 500.0)
    }

    #[test]
    fn test_full_capture_transfers_control() {
        let actor = Uuid::new_v4();
        let mut h = harness(&[(actor, "Ironclad")]);
        h.engine.settings_mut().set_zone_value("alpha", paths::COOLDOWN_SECONDS, json!(600));
        h.engine.settings_mut().set_zone_value("alpha", paths::DEPOSED_LOCK_SECONDS, json!(300));

        h.engine.handle_movement(actor, WORLD, inside());
        h.engine.start_capture("alpha", actor).unwrap();

        let session = h.engine.session("alpha").unwrap();
        assert_eq!(session.phase(), SessionPhase::Capturing);
        assert_eq!(session.remaining_capture_secs(), 120);
        assert_eq!(
            h.engine.point("alpha").unwrap().capturing_owner.as_ref().unwrap().display_name(),
            "Ironclad"
        );

        for _ in 0..120 {
            h.engine.tick();
        }

        assert!(h.engine.session("alpha").is_none());
        let point = h.engine.point("alpha").unwrap();
        assert_eq!(point.controlling_owner.as_ref().unwrap().display_name(), "Ironclad");
        assert!(point.capturing_owner.is_none());
        assert_eq!(point.capture_progress_percent(), 100.0);
        assert!(point.is_on_cooldown(h.engine.now()));
        // no previous owner, so no deposed lock
        assert!(point.deposed_lock().is_none());

        let events = drain(&h.events);
        assert!(events.iter().any(|e| matches!(e, ZoneEvent::Captured { owner, .. } if owner == "Ironclad")));
        // all reinforcement state torn down with the session
        assert_eq!(h.engine.queued_spawn_count(), 0);
        assert_eq!(h.engine.live_unit_count(), 0);
    }

    #[test]
    fn test_leaving_without_grace_cancels() {
        let actor = Uuid::new_v4();
        let mut h = harness(&[(actor, "Ironclad")]);

        h.engine.handle_movement(actor, WORLD, inside());
        h.engine.start_capture("alpha", actor).unwrap();

        for _ in 0..30 {
            h.engine.tick();
        }
        let spawned_before_cancel = h.engine.live_unit_count();
        assert!(spawned_before_cancel > 0, "waves should have spawned units by t=30");

        h.engine.handle_movement(actor, WORLD, outside());
        h.engine.tick();

        assert!(h.engine.session("alpha").is_none());
        let point = h.engine.point("alpha").unwrap();
        assert!(point.controlling_owner.is_none());
        assert!(point.capturing_owner.is_none());
        assert_eq!(point.capture_progress_percent(), 0.0);

        let events = drain(&h.events);
        assert!(events.iter().any(|e| matches!(
            e,
            ZoneEvent::Cancelled { reason: CancelReason::OwnerLeft, .. }
        )));
        // cancellation purges the queue and despawns the roster
        assert_eq!(h.engine.queued_spawn_count(), 0);
        assert_eq!(h.engine.live_unit_count(), 0);
        assert_eq!(h.spawner.despawned().len(), spawned_before_cancel);
    }

    #[test]
    fn test_one_session_per_zone() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let mut h = harness(&[(a, "Ironclad"), (b, "Raiders")]);

        h.engine.handle_movement(a, WORLD, inside());
        h.engine.handle_movement(b, WORLD, inside());
        h.engine.start_capture("alpha", a).unwrap();
        assert_eq!(
            h.engine.start_capture("alpha", b),
            Err(StartRejection::AlreadyUnderCapture("alpha".to_string()))
        );
        assert_eq!(h.engine.active_session_count(), 1);
    }

    #[test]
    fn test_start_rejections() {
        let actor = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        let mut h = harness(&[(actor, "Ironclad")]);

        assert_eq!(
            h.engine.start_capture("missing", actor),
            Err(StartRejection::UnknownZone("missing".to_string()))
        );
        // untracked actor
        assert_eq!(h.engine.start_capture("alpha", actor), Err(StartRejection::ActorNotTracked));
        // tracked but outside
        h.engine.handle_movement(actor, WORLD, outside());
        assert_eq!(
            h.engine.start_capture("alpha", actor),
            Err(StartRejection::NotInsideZone("alpha".to_string()))
        );
        // no owner identity
        h.engine.handle_movement(stranger, WORLD, inside());
        assert_eq!(h.engine.start_capture("alpha", stranger), Err(StartRejection::NoOwnerIdentity));
        // not capturable
        h.engine.handle_movement(actor, WORLD, inside());
        h.engine.settings_mut().set_zone_value("alpha", paths::CAPTURABLE, json!(false));
        assert_eq!(
            h.engine.start_capture("alpha", actor),
            Err(StartRejection::NotCapturable("alpha".to_string()))
        );
    }

    #[test]
    fn test_cooldown_and_deposed_lock_after_capture() {
        let attacker = Uuid::new_v4();
        let defender = Uuid::new_v4();
        let neutral = Uuid::new_v4();
        let mut h = harness(&[
            (attacker, "Raiders"),
            (defender, "Ironclad"),
            (neutral, "NorthPact"),
        ]);
        h.engine.settings_mut().set_zone_value("alpha", paths::DEPOSED_LOCK_SECONDS, json!(900));

        // Ironclad holds the zone going in
        h.engine.handle_movement(defender, WORLD, outside());
        {
            let point = h.engine.points.get_mut("alpha").unwrap();
            point.controlling_owner =
                Some(CaptureOwner::new(OwnerKind::Group, None, "Ironclad"));
        }

        h.engine.handle_movement(attacker, WORLD, inside());
        h.engine.start_capture("alpha", attacker).unwrap();
        for _ in 0..120 {
            h.engine.tick();
        }
        let point = h.engine.point("alpha").unwrap();
        assert_eq!(point.controlling_owner.as_ref().unwrap().display_name(), "Raiders");
        assert!(point.deposed_lock().is_some());

        // deposed owner is locked out even though no cooldown is set
        h.engine.handle_movement(defender, WORLD, inside());
        assert!(matches!(
            h.engine.start_capture("alpha", defender),
            Err(StartRejection::RecaptureLocked { .. })
        ));
        // a third owner may attempt (no cooldown configured)
        h.engine.handle_movement(neutral, WORLD, inside());
        assert!(h.engine.start_capture("alpha", neutral).is_ok());
    }

    #[test]
    fn test_cooldown_rejects_everyone() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let mut h = harness(&[(a, "Ironclad"), (b, "Raiders")]);
        h.engine.settings_mut().set_zone_value("alpha", paths::COOLDOWN_SECONDS, json!(600));

        h.engine.handle_movement(a, WORLD, inside());
        h.engine.start_capture("alpha", a).unwrap();
        for _ in 0..120 {
            h.engine.tick();
        }

        h.engine.handle_movement(b, WORLD, inside());
        assert!(matches!(
            h.engine.start_capture("alpha", b),
            Err(StartRejection::OnCooldown { .. })
        ));
        // admin can clear it
        h.engine.clear_cooldown("alpha").unwrap();
        assert!(h.engine.start_capture("alpha", b).is_ok());
    }

    #[test]
    fn test_contested_pause_holds_timer() {
        let attacker = Uuid::new_v4();
        let rival = Uuid::new_v4();
        let mut h = harness(&[(attacker, "Ironclad"), (rival, "Raiders")]);

        h.engine.handle_movement(attacker, WORLD, inside());
        h.engine.start_capture("alpha", attacker).unwrap();
        for _ in 0..10 {
            h.engine.tick();
        }
        assert_eq!(h.engine.session("alpha").unwrap().remaining_capture_secs(), 110);

        // rival walks in: contested, timer holds
        h.engine.handle_movement(rival, WORLD, inside());
        for _ in 0..10 {
            h.engine.tick();
        }
        let session = h.engine.session("alpha").unwrap();
        assert!(session.is_contested());
        assert_eq!(session.remaining_capture_secs(), 110);

        // rival leaves: timer resumes
        h.engine.handle_movement(rival, WORLD, outside());
        for _ in 0..10 {
            h.engine.tick();
        }
        let session = h.engine.session("alpha").unwrap();
        assert!(!session.is_contested());
        assert_eq!(session.remaining_capture_secs(), 100);

        let events = drain(&h.events);
        assert!(events.iter().any(|e| matches!(e, ZoneEvent::Contested { .. })));
        assert!(events.iter().any(|e| matches!(e, ZoneEvent::ContestCleared { .. })));
    }

    #[test]
    fn test_contested_reset_discards_progress() {
        let attacker = Uuid::new_v4();
        let rival = Uuid::new_v4();
        let mut h = harness(&[(attacker, "Ironclad"), (rival, "Raiders")]);
        h.engine.settings_mut().set_zone_value("alpha", paths::CONTESTED_POLICY, json!("reset"));

        h.engine.handle_movement(attacker, WORLD, inside());
        h.engine.start_capture("alpha", attacker).unwrap();
        for _ in 0..40 {
            h.engine.tick();
        }
        assert_eq!(h.engine.session("alpha").unwrap().remaining_capture_secs(), 80);

        h.engine.handle_movement(rival, WORLD, inside());
        h.engine.tick();
        assert_eq!(h.engine.session("alpha").unwrap().remaining_capture_secs(), 120);
    }

    #[test]
    fn test_grace_window_allows_return() {
        let actor = Uuid::new_v4();
        let mut h = harness(&[(actor, "Ironclad")]);
        h.engine.settings_mut().set_zone_value("alpha", paths::GRACE_SECONDS, json!(5));

        h.engine.handle_movement(actor, WORLD, inside());
        h.engine.start_capture("alpha", actor).unwrap();
        for _ in 0..10 {
            h.engine.tick();
        }

        h.engine.handle_movement(actor, WORLD, outside());
        h.engine.tick();
        let session = h.engine.session("alpha").unwrap();
        assert!(session.grace_active());
        // timer holds during grace
        assert_eq!(session.remaining_capture_secs(), 110);

        h.engine.handle_movement(actor, WORLD, inside());
        h.engine.tick();
        let session = h.engine.session("alpha").unwrap();
        assert!(!session.grace_active());
        assert_eq!(session.remaining_capture_secs(), 109);
    }

    #[test]
    fn test_grace_expiry_cancels() {
        let actor = Uuid::new_v4();
        let mut h = harness(&[(actor, "Ironclad")]);
        h.engine.settings_mut().set_zone_value("alpha", paths::GRACE_SECONDS, json!(3));

        h.engine.handle_movement(actor, WORLD, inside());
        h.engine.start_capture("alpha", actor).unwrap();
        h.engine.tick();

        h.engine.handle_movement(actor, WORLD, outside());
        for _ in 0..4 {
            h.engine.tick();
        }
        assert!(h.engine.session("alpha").is_none());
        let events = drain(&h.events);
        assert!(events.iter().any(|e| matches!(e, ZoneEvent::GraceStarted { seconds: 3, .. })));
        assert!(events.iter().any(|e| matches!(
            e,
            ZoneEvent::Cancelled { reason: CancelReason::OwnerLeft, .. }
        )));
    }

    #[test]
    fn test_disconnect_of_last_participant_cancels() {
        let actor = Uuid::new_v4();
        let mut h = harness(&[(actor, "Ironclad")]);

        h.engine.handle_movement(actor, WORLD, inside());
        h.engine.start_capture("alpha", actor).unwrap();
        h.engine.tick();

        h.engine.handle_disconnect(actor);
        assert!(h.engine.session("alpha").is_none());
        let events = drain(&h.events);
        assert!(events.iter().any(|e| matches!(
            e,
            ZoneEvent::Cancelled { reason: CancelReason::AllParticipantsDisconnected, .. }
        )));
    }

    #[test]
    fn test_kill_reduction_triggers_skipped_phases() {
        let actor = Uuid::new_v4();
        let mut h = harness(&[(actor, "Ironclad")]);
        // fixed 65 second reduction per kill
        h.engine.settings_mut().set_zone_value("alpha", paths::REDUCTION_VANILLA_MIN, json!(65.0));
        h.engine.settings_mut().set_zone_value("alpha", paths::REDUCTION_VANILLA_MAX, json!(65.0));
        h.engine.settings_mut().set_zone_value("alpha", paths::ENHANCED_SHARE, json!(0.0));

        h.engine.handle_movement(actor, WORLD, inside());
        h.engine.start_capture("alpha", actor).unwrap();

        // reach elapsed = 10 with one unit spawned
        for _ in 0..10 {
            h.engine.tick();
        }
        assert!(h.engine.live_unit_count() > 0);
        let unit = h.engine.tracker.unit_ids("alpha")[0];
        let _ = drain(&h.events);

        h.engine.handle_unit_death(unit);

        let session = h.engine.session("alpha").unwrap();
        assert_eq!(session.elapsed_capture_secs(), 75);

        let events = drain(&h.events);
        let phases: Vec<u64> = events
            .iter()
            .filter_map(|e| match e {
                ZoneEvent::WaveQueued { phase, .. } => Some(*phase),
                _ => None,
            })
            .collect();
        // exactly the two skipped phases, ascending
        assert_eq!(phases, vec![2, 3]);
        assert!(events.iter().any(|e| matches!(e, ZoneEvent::TimerReduced { seconds: 65, .. })));
    }

    #[test]
    fn test_roster_and_pending_never_exceed_point_cap() {
        let actor = Uuid::new_v4();
        let mut h = harness(&[(actor, "Ironclad")]);
        h.engine.settings_mut().set_zone_value("alpha", paths::MAX_MOBS_PER_POINT, json!(5));
        h.engine.settings_mut().set_zone_value("alpha", paths::BASE_MOBS_PER_WAVE, json!(10));
        h.engine.settings_mut().set_zone_value("alpha", paths::MAX_MOBS_PER_WAVE, json!(10));

        h.engine.handle_movement(actor, WORLD, inside());
        h.engine.start_capture("alpha", actor).unwrap();
        for _ in 0..90 {
            h.engine.tick();
            let total = h.engine.live_unit_count() + h.engine.queued_spawn_count();
            assert!(total <= 5, "roster + pending exceeded cap: {}", total);
        }
        assert_eq!(h.engine.live_unit_count(), 5);
    }

    #[test]
    fn test_drain_respects_global_and_zone_caps() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let mut h = harness(&[(a, "Ironclad"), (b, "Raiders")]);
        h.engine
            .create_point(CapturePoint::new(
                "beta",
                "Beta",
                ZoneShape::circle(WORLD, Vec3::new(1000.0, 64.0, 1000.0), 1),
            ))
            .unwrap();
        for zone in ["alpha", "beta"] {
            h.engine.settings_mut().set_zone_value(zone, paths::PREPARATION_MINUTES, json!(0));
            h.engine.settings_mut().set_zone_value(zone, paths::CAPTURE_MINUTES, json!(2));
            h.engine.settings_mut().set_zone_value(zone, paths::GRACE_SECONDS, json!(0));
            h.engine.settings_mut().set_zone_value(zone, paths::BASE_MOBS_PER_WAVE, json!(8));
            h.engine.settings_mut().set_zone_value(zone, paths::ZONE_MAX_PER_TICK, json!(2));
        }
        h.engine
            .settings_mut()
            .set_template_value(paths::GLOBAL_MAX_PER_TICK, json!(3));

        h.engine.handle_movement(a, WORLD, inside());
        h.engine.handle_movement(b, WORLD, Vec3::new(1004.0, 64.0, 1004.0));
        h.engine.start_capture("alpha", a).unwrap();
        h.engine.start_capture("beta", b).unwrap();

        let mut last_count = 0;
        for _ in 0..6 {
            h.engine.tick();
            let spawned_this_tick = h.spawner.order_count() - last_count;
            last_count = h.spawner.order_count();
            assert!(spawned_this_tick <= 3, "global cap exceeded: {}", spawned_this_tick);
        }
        // both zones made progress despite alpha's large backlog
        let orders = h.spawner.orders();
        assert!(orders.iter().any(|o| o.zone_id == "alpha"));
        assert!(orders.iter().any(|o| o.zone_id == "beta"));
    }

    #[test]
    fn test_spawn_failure_drops_request() {
        let actor = Uuid::new_v4();
        let mut h = harness(&[(actor, "Ironclad")]);
        h.spawner.fail_spawns.store(true, std::sync::atomic::Ordering::Relaxed);

        h.engine.handle_movement(actor, WORLD, inside());
        h.engine.start_capture("alpha", actor).unwrap();
        h.engine.tick();
        let queued_after_wave = h.engine.queued_spawn_count();
        h.engine.tick();

        // failed spawns are dropped, not retried
        assert!(h.engine.queued_spawn_count() < queued_after_wave || queued_after_wave == 0);
        assert_eq!(h.engine.live_unit_count(), 0);
    }

    #[test]
    fn test_retargeting_assigns_nearest_owner_actor() {
        let near = Uuid::new_v4();
        let far = Uuid::new_v4();
        let mut h = harness(&[(near, "Ironclad"), (far, "Ironclad")]);
        h.engine
            .settings_mut()
            .set_zone_value("alpha", paths::RETARGET_INTERVAL_SECONDS, json!(1));

        h.engine.handle_movement(near, WORLD, Vec3::new(2.0, 64.0, 2.0));
        h.engine.handle_movement(far, WORLD, Vec3::new(14.0, 64.0, 14.0));
        h.engine.start_capture("alpha", near).unwrap();

        for _ in 0..5 {
            h.engine.tick();
        }
        assert!(h.engine.live_unit_count() > 0);
        let retargets = h.spawner.retargets();
        assert!(!retargets.is_empty(), "retarget pass should have assigned targets");
        // targets are always one of the capturing owner's actors
        assert!(retargets.iter().all(|(_, t)| *t == near || *t == far));
    }

    #[test]
    fn test_force_stop_and_delete_zone() {
        let actor = Uuid::new_v4();
        let mut h = harness(&[(actor, "Ironclad")]);

        h.engine.handle_movement(actor, WORLD, inside());
        h.engine.start_capture("alpha", actor).unwrap();
        h.engine.tick();
        assert!(h.engine.force_stop("alpha"));
        assert!(!h.engine.force_stop("alpha"));

        h.engine.start_capture("alpha", actor).unwrap();
        h.engine.tick();
        let removed = h.engine.delete_point("alpha").unwrap();
        assert_eq!(removed.id, "alpha");
        assert!(h.engine.session("alpha").is_none());
        assert_eq!(h.engine.zone_count(), 0);
        assert!(matches!(
            h.engine.delete_point("alpha"),
            Err(AdminError::UnknownZone(_))
        ));
    }

    #[test]
    fn test_shutdown_cancels_everything() {
        let actor = Uuid::new_v4();
        let mut h = harness(&[(actor, "Ironclad")]);

        h.engine.handle_movement(actor, WORLD, inside());
        h.engine.start_capture("alpha", actor).unwrap();
        for _ in 0..5 {
            h.engine.tick();
        }
        h.engine.shutdown();

        assert_eq!(h.engine.active_session_count(), 0);
        assert_eq!(h.engine.queued_spawn_count(), 0);
        assert_eq!(h.engine.live_unit_count(), 0);
        let point = h.engine.point("alpha").unwrap();
        assert!(point.capturing_owner.is_none());
        assert!(point.controlling_owner.is_none());
    }

    #[test]
    fn test_duplicate_zone_rejected() {
        let mut h = harness(&[]);
        let result = h.engine.create_point(CapturePoint::new(
            "alpha",
            "Alpha again",
            ZoneShape::circle(WORLD, Vec3::ZERO, 1),
        ));
        assert_eq!(result, Err(AdminError::DuplicateZone("alpha".to_string())));
        assert_eq!(h.engine.zone_count(), 1);
    }
}
