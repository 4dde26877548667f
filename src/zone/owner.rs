//! Owner identity values and the platform adapter boundary.
//!
//! The engine never assumes a specific identity backend (teams, factions,
//! solo players). It stores [`CaptureOwner`] values and asks an
//! [`OwnerPlatformAdapter`] "does this actor match this owner".

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique actor identifier (a connected player or simulated agent)
pub type ActorId = Uuid;

/// Which backend an owner identity belongs to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum OwnerKind {
    /// A single actor owns the zone directly
    Player,
    /// A named group (guild/town/team)
    Group,
    /// An alliance of groups
    Alliance,
}

/// A typed identity that can control a capture zone.
///
/// Immutable once constructed. Two owners are the same owner iff their kind
/// matches and their display names compare equal case-insensitively; `id` is
/// advisory and only used for backend lookups.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureOwner {
    kind: OwnerKind,
    id: Option<String>,
    display_name: String,
}

impl CaptureOwner {
    pub fn new(kind: OwnerKind, id: Option<String>, display_name: impl Into<String>) -> Self {
        Self {
            kind,
            id,
            display_name: display_name.into(),
        }
    }

    pub fn kind(&self) -> OwnerKind {
        self.kind
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Identity comparison: kind + case-insensitive display name.
    pub fn is_same_owner(&self, other: &CaptureOwner) -> bool {
        self.kind == other.kind && self.display_name.eq_ignore_ascii_case(&other.display_name)
    }
}

impl PartialEq for CaptureOwner {
    fn eq(&self, other: &Self) -> bool {
        self.is_same_owner(other)
    }
}

impl Eq for CaptureOwner {}

impl std::fmt::Display for CaptureOwner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}:{}", self.kind, self.display_name)
    }
}

/// Resolves and compares actor identity against owner identity.
///
/// Implemented by the excluded identity subsystem (team plugin, faction
/// service). The engine only ever calls through this trait.
pub trait OwnerPlatformAdapter: Send + Sync {
    /// The owner name the actor would capture under for the given kind,
    /// or `None` if the actor has no identity of that kind.
    fn resolve_owner_name(&self, actor: ActorId, kind: OwnerKind) -> Option<String>;

    /// Whether the actor currently belongs to the named owner.
    fn does_actor_match_owner(&self, actor: ActorId, owner_name: &str, kind: OwnerKind) -> bool;

    /// Canonical spelling for an owner name, or `None` if unknown.
    fn normalize_owner_name(&self, name: &str, kind: OwnerKind) -> Option<String>;

    /// Convenience: resolve the actor's full owner identity for a kind.
    fn resolve_owner(&self, actor: ActorId, kind: OwnerKind) -> Option<CaptureOwner> {
        let name = self.resolve_owner_name(actor, kind)?;
        Some(CaptureOwner::new(kind, None, name))
    }
}

/// In-memory adapter mapping actors directly to owner names.
///
/// Used by the demo binary and tests; a production deployment supplies its
/// own backend implementation.
#[derive(Debug, Default)]
pub struct StaticOwnerDirectory {
    members: hashbrown::HashMap<(ActorId, OwnerKind), String>,
}

impl StaticOwnerDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn assign(&mut self, actor: ActorId, kind: OwnerKind, owner_name: impl Into<String>) {
        self.members.insert((actor, kind), owner_name.into());
    }

    pub fn remove(&mut self, actor: ActorId, kind: OwnerKind) {
        self.members.remove(&(actor, kind));
    }
}

impl OwnerPlatformAdapter for StaticOwnerDirectory {
    fn resolve_owner_name(&self, actor: ActorId, kind: OwnerKind) -> Option<String> {
        self.members.get(&(actor, kind)).cloned()
    }

    fn does_actor_match_owner(&self, actor: ActorId, owner_name: &str, kind: OwnerKind) -> bool {
        self.members
            .get(&(actor, kind))
            .map(|name| name.eq_ignore_ascii_case(owner_name))
            .unwrap_or(false)
    }

    fn normalize_owner_name(&self, name: &str, kind: OwnerKind) -> Option<String> {
        self.members
            .iter()
            .find(|((_, k), member_name)| *k == kind && member_name.eq_ignore_ascii_case(name))
            .map(|(_, member_name)| member_name.clone())
    }
}
