//! Per-playlist callback set registrations

use std::collections::HashMap;

use super::{PlaylistId, SessionEvent};

/// Notification subscription for a playlist
///
/// Every playlist starts on the cheap skim set while the target is searched
/// for; only the matched playlist is moved to the scan set, which also
/// receives track additions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallbackSet {
    Skim,
    Scan,
}

impl CallbackSet {
    fn bit(self) -> u8 {
        match self {
            CallbackSet::Skim => 0b01,
            CallbackSet::Scan => 0b10,
        }
    }
}

/// Registered callback sets, used by sessions to filter playlist events
#[derive(Debug, Default)]
pub struct Subscriptions {
    sets: HashMap<PlaylistId, u8>,
}

impl Subscriptions {
    /// Returns false if the set was already registered
    pub fn add(&mut self, playlist: PlaylistId, set: CallbackSet) -> bool {
        let mask = self.sets.entry(playlist).or_default();
        let added = *mask & set.bit() == 0;
        *mask |= set.bit();
        added
    }

    pub fn remove(&mut self, playlist: PlaylistId, set: CallbackSet) {
        if let Some(mask) = self.sets.get_mut(&playlist) {
            *mask &= !set.bit();
            if *mask == 0 {
                self.sets.remove(&playlist);
            }
        }
    }

    pub fn contains(&self, playlist: PlaylistId, set: CallbackSet) -> bool {
        self.sets
            .get(&playlist)
            .is_some_and(|mask| mask & set.bit() != 0)
    }

    pub fn is_subscribed(&self, playlist: PlaylistId) -> bool {
        self.sets.contains_key(&playlist)
    }

    /// Whether an event should be delivered at all
    pub fn admits(&self, event: &SessionEvent) -> bool {
        match event {
            SessionEvent::PlaylistMetadataUpdated(id) => self.is_subscribed(*id),
            SessionEvent::TracksAdded { playlist, .. } => self.contains(*playlist, CallbackSet::Scan),
            _ => true,
        }
    }
}
