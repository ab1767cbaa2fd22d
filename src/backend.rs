//! Backend classification and per-backend tuning.

use serde::{Deserialize, Serialize};

/// Storage medium backing a list item.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Local disk.
    Local,
    /// Removable media such as USB sticks or SD cards.
    Removable,
    /// Devices that serve one request at a time (MTP phones, cameras).
    Slow,
    /// Network or cloud backed storage.
    Network,
}

impl BackendKind {
    /// Network items never fall back to rendering from the raw file.
    pub fn allows_raw_fallback(self) -> bool {
        !matches!(self, BackendKind::Network)
    }

    /// Built-in tuning for this backend.
    pub fn profile(self) -> BackendProfile {
        match self {
            BackendKind::Local => BackendProfile::new(10, 20),
            BackendKind::Removable => BackendProfile::new(4, 8),
            BackendKind::Network => BackendProfile::new(3, 6),
            BackendKind::Slow => BackendProfile::new(1, 0),
        }
    }
}

/// Concurrency and prefetch settings applied to the whole scheduler while the
/// cursor sits on items of one backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendProfile {
    pub max_active_tasks: usize,
    pub prefetch_depth: usize,
}

impl BackendProfile {
    /// `max_active_tasks` is clamped to at least one.
    pub fn new(max_active_tasks: usize, prefetch_depth: usize) -> Self {
        Self {
            max_active_tasks: max_active_tasks.max(1),
            prefetch_depth,
        }
    }
}

impl Default for BackendProfile {
    fn default() -> Self {
        BackendKind::Local.profile()
    }
}

/// Optional per-backend overrides on top of the built-in profiles.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileTable {
    pub local: Option<BackendProfile>,
    pub removable: Option<BackendProfile>,
    pub slow: Option<BackendProfile>,
    pub network: Option<BackendProfile>,
}

impl ProfileTable {
    /// Resolve the profile for `kind`, preferring an override when set.
    pub fn profile_for(&self, kind: BackendKind) -> BackendProfile {
        let custom = match kind {
            BackendKind::Local => self.local,
            BackendKind::Removable => self.removable,
            BackendKind::Slow => self.slow,
            BackendKind::Network => self.network,
        };
        custom
            .map(|p| BackendProfile::new(p.max_active_tasks, p.prefetch_depth))
            .unwrap_or_else(|| kind.profile())
    }
}
