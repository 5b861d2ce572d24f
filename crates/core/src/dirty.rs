use crate::geojson::{sanitize, SanitizedGeoJson};

/// Whether an entity's geometry has an unflushed change.
///
/// `Dirty(None)` means the pending change sets the geometry to null.
/// Only a confirmed flush returns the state to `Clean`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DirtyState {
    #[default]
    Clean,
    Dirty(Option<SanitizedGeoJson>),
}

impl DirtyState {
    pub fn new() -> Self {
        Self::Clean
    }

    pub fn is_dirty(&self) -> bool {
        matches!(self, Self::Dirty(_))
    }

    /// Record a raw GeoJSON assignment. Last write wins.
    pub fn assign(&mut self, raw: Option<&str>) {
        *self = Self::Dirty(sanitize(raw));
    }

    /// The pending payload, or `None` when clean.
    pub fn pending(&self) -> Option<Option<&SanitizedGeoJson>> {
        match self {
            Self::Clean => None,
            Self::Dirty(value) => Some(value.as_ref()),
        }
    }

    /// Transition to `Clean` after the pending change was written.
    pub fn mark_flushed(&mut self) {
        *self = Self::Clean;
    }
}
