//! In-memory list of saved addresses, kept in insertion order.

use chrono::{DateTime, Utc};
use doorstep_core::{AddressId, Coordinate, DraftAddress, SavedAddress};

#[derive(Debug, Default)]
pub struct AddressBook {
    entries: Vec<SavedAddress>,
    last_id: u64,
}

impl AddressBook {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Saves `draft` at `location` under a fresh id and appends it.
    pub fn add(&mut self, draft: &DraftAddress, location: Coordinate) -> SavedAddress {
        self.add_at(draft, location, Utc::now())
    }

    pub(crate) fn add_at(
        &mut self,
        draft: &DraftAddress,
        location: Coordinate,
        now: DateTime<Utc>,
    ) -> SavedAddress {
        let id = self.next_id(now);
        let saved = SavedAddress::from_draft(id, draft, location, now);
        tracing::debug!(%id, full_address = %saved.full_address, "address saved");
        self.entries.push(saved.clone());
        saved
    }

    /// Replaces the entry with the same id, keeping its position. Returns
    /// `false` (and changes nothing) when no entry matches.
    pub fn update(&mut self, address: SavedAddress) -> bool {
        match self.entries.iter_mut().find(|a| a.id == address.id) {
            Some(slot) => {
                *slot = address;
                true
            }
            None => false,
        }
    }

    /// Removes the entry with `id`. Returns `false` when no entry matches.
    pub fn remove(&mut self, id: AddressId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|a| a.id != id);
        self.entries.len() != before
    }

    #[must_use]
    pub fn get(&self, id: AddressId) -> Option<&SavedAddress> {
        self.entries.iter().find(|a| a.id == id)
    }

    /// Saved addresses in display (insertion) order.
    #[must_use]
    pub fn list(&self) -> &[SavedAddress] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Millisecond timestamp, bumped past the previous id when the clock has
    /// not advanced (or went backwards).
    fn next_id(&mut self, now: DateTime<Utc>) -> AddressId {
        let millis = u64::try_from(now.timestamp_millis()).unwrap_or(0);
        let id = millis.max(self.last_id.saturating_add(1));
        self.last_id = id;
        AddressId(id)
    }
}
