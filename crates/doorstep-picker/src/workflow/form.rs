use doorstep_core::DraftAddress;

use super::snapshot::{FormSnapshot, ResolutionPhase};
use crate::debounce::Debouncer;

/// State of one open address form. Dropping it cancels its debounce timer.
pub(super) struct FormSession {
    pub(super) id: u64,
    pub(super) draft: DraftAddress,
    pub(super) debouncer: Debouncer,
    /// Bumped on every user edit; forward lookups carry the revision they were
    /// scheduled at and are discarded if the draft has moved on.
    pub(super) revision: u64,
    pub(super) pending_forward: Option<u64>,
    pub(super) reverse_in_flight: usize,
    pub(super) forward_in_flight: usize,
    pub(super) error: Option<String>,
}

impl FormSession {
    pub(super) fn new(id: u64, debouncer: Debouncer) -> Self {
        Self {
            id,
            draft: DraftAddress::default(),
            debouncer,
            revision: 0,
            pending_forward: None,
            reverse_in_flight: 0,
            forward_in_flight: 0,
            error: None,
        }
    }

    pub(super) fn cancel_pending_forward(&mut self) {
        if self.pending_forward.take().is_some() {
            self.debouncer.cancel();
        }
    }

    pub(super) fn phase(&self) -> ResolutionPhase {
        if self.reverse_in_flight > 0 {
            ResolutionPhase::ReverseResolving
        } else if self.pending_forward.is_some() {
            ResolutionPhase::ForwardScheduled
        } else if self.forward_in_flight > 0 {
            ResolutionPhase::ForwardResolving
        } else {
            ResolutionPhase::Idle
        }
    }

    pub(super) fn snapshot(&self) -> FormSnapshot {
        FormSnapshot {
            draft: self.draft.clone(),
            phase: self.phase(),
            error: self.error.clone(),
        }
    }
}
