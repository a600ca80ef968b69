//! Per-level player slots
//!
//! Players are owned by the server-wide player registry; a level only keeps
//! their ids. Each occupant gets a positive slot id that is unique among the
//! current occupants and is handed back to the pool when they leave. Slot 0
//! is never assigned: looking it up yields the level leader, the longest
//! present occupant.

use log::debug;

/// Handle into the server-wide player registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlayerId(pub u16);

#[derive(Debug, Clone, Default)]
pub struct PlayerSlots {
    /// Occupants in arrival order
    occupants: Vec<(u16, PlayerId)>,
}

impl PlayerSlots {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a player and returns their slot id.
    ///
    /// Adding a player that is already present returns their existing slot.
    pub fn add(&mut self, player: PlayerId) -> u16 {
        if let Some(slot) = self.slot_of(player) {
            return slot;
        }

        let slot = (1..=u16::MAX)
            .find(|candidate| self.occupants.iter().all(|(used, _)| used != candidate))
            .unwrap_or(u16::MAX);
        self.occupants.push((slot, player));
        debug!("Player {} took level slot {}", player.0, slot);
        slot
    }

    /// Frees the player's slot. Returns false if they were not present.
    pub fn remove(&mut self, player: PlayerId) -> bool {
        let before = self.occupants.len();
        self.occupants.retain(|(_, occupant)| *occupant != player);
        before != self.occupants.len()
    }

    /// Slot 0 resolves to the leader.
    pub fn get(&self, slot: u16) -> Option<PlayerId> {
        if slot == 0 {
            return self.leader();
        }
        self.occupants
            .iter()
            .find(|(used, _)| *used == slot)
            .map(|(_, player)| *player)
    }

    pub fn leader(&self) -> Option<PlayerId> {
        self.occupants.first().map(|(_, player)| *player)
    }

    pub fn slot_of(&self, player: PlayerId) -> Option<u16> {
        self.occupants
            .iter()
            .find(|(_, occupant)| *occupant == player)
            .map(|(slot, _)| *slot)
    }

    /// Players in arrival order
    pub fn iter(&self) -> impl Iterator<Item = PlayerId> + '_ {
        self.occupants.iter().map(|(_, player)| *player)
    }

    pub fn len(&self) -> usize {
        self.occupants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.occupants.is_empty()
    }

    pub fn clear(&mut self) {
        self.occupants.clear();
    }
}
