//! Outbound zone-scoped notifications.
//!
//! The engine emits these as fire-and-forget: a sink must accept the event
//! without blocking and never gets awaited. Player messaging, webhooks, and
//! map overlays all hang off this boundary.

use serde::{Deserialize, Serialize};

use crate::zone::point::ZoneId;

/// Why a session ended without completing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CancelReason {
    /// The capturing owner left the zone with no grace window left
    OwnerLeft,
    /// Every participating actor disconnected
    AllParticipantsDisconnected,
    /// An administrator force-stopped the attempt
    AdminStopped,
    /// The zone itself was deleted
    ZoneDeleted,
    /// A rival activation preempted the attempt
    Preempted,
    /// Server shutdown or reload
    Shutdown,
}

/// Zone-scoped text-worthy events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum ZoneEvent {
    SessionStarted {
        zone: ZoneId,
        owner: String,
    },
    /// Preparation exhausted; the capture timer starts depleting
    CapturePhaseStarted {
        zone: ZoneId,
    },
    /// A reinforcement kill (or other credit) shortened the timer
    TimerReduced {
        zone: ZoneId,
        seconds: u64,
    },
    Contested {
        zone: ZoneId,
    },
    ContestCleared {
        zone: ZoneId,
    },
    GraceStarted {
        zone: ZoneId,
        seconds: u64,
    },
    WaveQueued {
        zone: ZoneId,
        phase: u64,
        units: u64,
    },
    Captured {
        zone: ZoneId,
        owner: String,
    },
    Cancelled {
        zone: ZoneId,
        reason: CancelReason,
    },
}

impl ZoneEvent {
    pub fn zone(&self) -> &ZoneId {
        match self {
            Self::SessionStarted { zone, .. }
            | Self::CapturePhaseStarted { zone }
            | Self::TimerReduced { zone, .. }
            | Self::Contested { zone }
            | Self::ContestCleared { zone }
            | Self::GraceStarted { zone, .. }
            | Self::WaveQueued { zone, .. }
            | Self::Captured { zone, .. }
            | Self::Cancelled { zone, .. } => zone,
        }
    }
}

/// Non-blocking event consumer.
pub trait NotificationSink: Send + Sync {
    fn send(&self, event: ZoneEvent);
}

/// Sink that logs every event through tracing.
#[derive(Debug, Default)]
pub struct LogSink;

impl NotificationSink for LogSink {
    fn send(&self, event: ZoneEvent) {
        tracing::info!("zone event: {:?}", event);
    }
}

/// Sink backed by an unbounded channel; the receiver side belongs to the
/// messaging/webhook subsystem. A disconnected receiver drops events silently
/// rather than stalling the tick.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: crossbeam_channel::Sender<ZoneEvent>,
}

impl ChannelSink {
    pub fn unbounded() -> (Self, crossbeam_channel::Receiver<ZoneEvent>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (Self { tx }, rx)
    }
}

impl NotificationSink for ChannelSink {
    fn send(&self, event: ZoneEvent) {
        let _ = self.tx.send(event);
    }
}
