use doorstep_core::{DraftAddress, LocationSelectionState, MapView, SavedAddress};
use serde::Serialize;

/// Where the open form is in the resolution cycle. When several lookups
/// overlap, the earliest phase in declaration order after `Idle` wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionPhase {
    Idle,
    ReverseResolving,
    ForwardScheduled,
    ForwardResolving,
}

#[derive(Debug, Clone, Serialize)]
pub struct FormSnapshot {
    pub draft: DraftAddress,
    pub phase: ResolutionPhase,
    /// User-visible message from the most recent failed lookup.
    pub error: Option<String>,
}

/// Point-in-time copy of everything the UI renders.
#[derive(Debug, Clone, Serialize)]
pub struct PickerSnapshot {
    pub location: LocationSelectionState,
    pub map: MapView,
    /// A device position query is outstanding.
    pub locating: bool,
    pub form: Option<FormSnapshot>,
    pub addresses: Vec<SavedAddress>,
}

impl PickerSnapshot {
    /// No device query, timer or lookup is outstanding.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        !self.locating
            && self
                .form
                .as_ref()
                .is_none_or(|f| f.phase == ResolutionPhase::Idle)
    }
}
