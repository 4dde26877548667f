//! Capture session state machine.
//!
//! One session exists per zone while an attempt is in progress. The session
//! only owns its timers, flags, and participant bookkeeping; phase
//! transitions, contested policy, and completion are driven externally by the
//! coordinator's tick so every mutation stays a short, terminating operation.

use hashbrown::HashSet;

use crate::zone::owner::{ActorId, CaptureOwner};
use crate::zone::point::ZoneId;

/// Session phase. The underlying state is a single flag; the enum exists so
/// call sites read clearly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Warm-up before capture time starts depleting
    Preparation,
    /// Capture timer is depleting
    Capturing,
}

/// State for one in-progress capture attempt.
#[derive(Debug, Clone)]
pub struct CaptureSession {
    zone_id: ZoneId,
    owner: CaptureOwner,
    initiator: ActorId,
    started_at: u64,
    capturing: bool,
    remaining_preparation_secs: u64,
    initial_preparation_secs: u64,
    remaining_capture_secs: u64,
    initial_capture_secs: u64,
    /// Sub-second capture credit carried across partial-second reductions
    progress_accumulator: f64,
    contested: bool,
    grace_active: bool,
    remaining_grace_secs: u64,
    initial_grace_secs: u64,
    participants: HashSet<ActorId>,
    warned: HashSet<ActorId>,
    active: bool,
}

impl CaptureSession {
    pub fn new(
        zone_id: ZoneId,
        owner: CaptureOwner,
        initiator: ActorId,
        started_at: u64,
        preparation_secs: u64,
        capture_secs: u64,
    ) -> Self {
        let mut participants = HashSet::new();
        participants.insert(initiator);
        Self {
            zone_id,
            owner,
            initiator,
            started_at,
            capturing: preparation_secs == 0,
            remaining_preparation_secs: preparation_secs,
            initial_preparation_secs: preparation_secs,
            remaining_capture_secs: capture_secs,
            initial_capture_secs: capture_secs,
            progress_accumulator: 0.0,
            contested: false,
            grace_active: false,
            remaining_grace_secs: 0,
            initial_grace_secs: 0,
            participants,
            warned: HashSet::new(),
            active: true,
        }
    }

    pub fn zone_id(&self) -> &ZoneId {
        &self.zone_id
    }

    pub fn owner(&self) -> &CaptureOwner {
        &self.owner
    }

    pub fn initiator(&self) -> ActorId {
        self.initiator
    }

    pub fn started_at(&self) -> u64 {
        self.started_at
    }

    pub fn phase(&self) -> SessionPhase {
        if self.capturing {
            SessionPhase::Capturing
        } else {
            SessionPhase::Preparation
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn remaining_preparation_secs(&self) -> u64 {
        self.remaining_preparation_secs
    }

    pub fn initial_preparation_secs(&self) -> u64 {
        self.initial_preparation_secs
    }

    pub fn initial_capture_secs(&self) -> u64 {
        self.initial_capture_secs
    }

    pub fn remaining_capture_secs(&self) -> u64 {
        self.remaining_capture_secs
    }

    /// Combined remaining preparation + capture time.
    pub fn remaining_time(&self) -> u64 {
        self.remaining_preparation_secs + self.remaining_capture_secs
    }

    /// Capture seconds already consumed. Drives wave phase scheduling.
    pub fn elapsed_capture_secs(&self) -> u64 {
        self.initial_capture_secs - self.remaining_capture_secs
    }

    /// Progress through the capture phase as a 0-100 percentage.
    pub fn progress_percent(&self) -> f64 {
        if self.initial_capture_secs == 0 {
            return 100.0;
        }
        (self.elapsed_capture_secs() as f64 / self.initial_capture_secs as f64 * 100.0)
            .clamp(0.0, 100.0)
    }

    /// Ticks one second off the preparation timer. Never goes below zero.
    pub fn decrement_preparation_time(&mut self) {
        self.remaining_preparation_secs = self.remaining_preparation_secs.saturating_sub(1);
    }

    pub fn preparation_exhausted(&self) -> bool {
        self.remaining_preparation_secs == 0
    }

    /// Flips into the capturing phase. Does not touch the capture timers;
    /// the coordinator calls this once when preparation is exhausted.
    pub fn start_capture_phase(&mut self) {
        self.capturing = true;
    }

    /// Removes up to `n` seconds from the capture timer, clamped at zero.
    /// Returns the amount actually consumed.
    pub fn decrement_capture_time_by(&mut self, n: u64) -> u64 {
        let consumed = n.min(self.remaining_capture_secs);
        self.remaining_capture_secs -= consumed;
        consumed
    }

    /// Accepts fractional capture credit. Whole seconds are extracted and
    /// returned for the caller to apply via [`decrement_capture_time_by`];
    /// the fractional remainder stays in the accumulator, so progress is
    /// never lost to rounding and never applied twice.
    ///
    /// [`decrement_capture_time_by`]: CaptureSession::decrement_capture_time_by
    pub fn consume_capture_progress(&mut self, progress_units: f64) -> u64 {
        if !progress_units.is_finite() || progress_units <= 0.0 {
            return 0;
        }
        self.progress_accumulator += progress_units;
        let whole = self.progress_accumulator.floor();
        self.progress_accumulator -= whole;
        whole as u64
    }

    /// Discards all capture progress (contested "reset" policy).
    pub fn reset_capture_timer(&mut self) {
        self.remaining_capture_secs = self.initial_capture_secs;
        self.progress_accumulator = 0.0;
    }

    /// Gives back up to `n` seconds of progress (contested "rollback"
    /// policy). Never exceeds the initial capture time.
    pub fn regress_capture_time(&mut self, n: u64) {
        self.remaining_capture_secs =
            (self.remaining_capture_secs + n).min(self.initial_capture_secs);
    }

    #[cfg(test)]
    pub(crate) fn accumulator(&self) -> f64 {
        self.progress_accumulator
    }

    pub fn is_contested(&self) -> bool {
        self.contested
    }

    pub fn set_contested(&mut self, contested: bool) {
        self.contested = contested;
    }

    pub fn grace_active(&self) -> bool {
        self.grace_active
    }

    pub fn remaining_grace_secs(&self) -> u64 {
        self.remaining_grace_secs
    }

    pub fn initial_grace_secs(&self) -> u64 {
        self.initial_grace_secs
    }

    pub fn start_grace(&mut self, duration_secs: u64) {
        self.grace_active = true;
        self.remaining_grace_secs = duration_secs;
        self.initial_grace_secs = duration_secs;
    }

    /// Ticks the grace timer down. Returns true when the window has expired.
    pub fn decrement_grace_seconds(&mut self) -> bool {
        if !self.grace_active {
            return false;
        }
        self.remaining_grace_secs = self.remaining_grace_secs.saturating_sub(1);
        self.remaining_grace_secs == 0
    }

    pub fn clear_grace(&mut self) {
        self.grace_active = false;
        self.remaining_grace_secs = 0;
        self.initial_grace_secs = 0;
    }

    /// Complete iff the capture timer hit zero while capturing and neither
    /// contest nor grace is holding the session open.
    pub fn is_complete(&self) -> bool {
        self.active
            && self.capturing
            && self.remaining_capture_secs == 0
            && !self.contested
            && !self.grace_active
    }

    pub fn participants(&self) -> impl Iterator<Item = &ActorId> {
        self.participants.iter()
    }

    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }

    pub fn add_participant(&mut self, actor: ActorId) -> bool {
        self.participants.insert(actor)
    }

    pub fn remove_participant(&mut self, actor: ActorId) -> bool {
        self.participants.remove(&actor)
    }

    pub fn is_participant(&self, actor: ActorId) -> bool {
        self.participants.contains(&actor)
    }

    /// One-shot notice bookkeeping: true the first time an actor is warned.
    pub fn mark_warned(&mut self, actor: ActorId) -> bool {
        self.warned.insert(actor)
    }

    /// Deactivates the session and clears all transient collections.
    /// Idempotent; callers must check [`is_active`](CaptureSession::is_active)
    /// before further mutation.
    pub fn stop(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        self.participants.clear();
        self.warned.clear();
        self.progress_accumulator = 0.0;
        self.clear_grace();
        self.contested = false;
    }
}
