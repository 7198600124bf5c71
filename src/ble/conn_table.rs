//! Bounded table of live central connections.
//!
//! Each slot holds the SoftDevice connection handle of one central and the
//! HID protocol mode that central selected. The table never allocates; its
//! size `K` is fixed at compile time.

use crate::error::Error;

/// SoftDevice connection handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ConnHandle(pub u16);

/// HID protocol mode of one connection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ProtocolMode {
    /// Fixed 8-byte boot keyboard report on the Boot Keyboard Input characteristic.
    Boot,
    /// Report described by the Report Map, on the Input Report characteristic.
    #[default]
    Report,
}

impl ProtocolMode {
    /// Decode a Protocol Mode characteristic value (0 = boot, 1 = report).
    pub fn from_gatt(value: u8) -> Option<Self> {
        match value {
            0 => Some(ProtocolMode::Boot),
            1 => Some(ProtocolMode::Report),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ConnectionSlot {
    pub handle: Option<ConnHandle>,
    pub mode: ProtocolMode,
}

impl ConnectionSlot {
    pub const fn empty() -> Self {
        Self {
            handle: None,
            mode: ProtocolMode::Report,
        }
    }

    pub fn is_live(&self) -> bool {
        self.handle.is_some()
    }
}

pub struct ConnectionTable<const K: usize> {
    slots: [ConnectionSlot; K],
}

impl<const K: usize> ConnectionTable<K> {
    pub const fn new() -> Self {
        Self {
            slots: [ConnectionSlot::empty(); K],
        }
    }

    pub fn find_empty_slot(&self) -> Option<usize> {
        self.slots.iter().position(|s| !s.is_live())
    }

    fn position(&self, handle: ConnHandle) -> Option<usize> {
        self.slots.iter().position(|s| s.handle == Some(handle))
    }

    /// Store `handle` in the first free slot in report mode.
    ///
    /// A handle that is already present keeps its slot (and mode).
    pub fn assign(&mut self, handle: ConnHandle) -> Result<usize, Error> {
        if let Some(index) = self.position(handle) {
            return Ok(index);
        }
        let index = self.find_empty_slot().ok_or(Error::NoFreeSlot)?;
        self.slots[index] = ConnectionSlot {
            handle: Some(handle),
            mode: ProtocolMode::Report,
        };
        Ok(index)
    }

    /// Empty the slot holding `handle`.
    pub fn release(&mut self, handle: ConnHandle) -> Result<usize, Error> {
        let index = self.position(handle).ok_or(Error::ConnectionNotFound)?;
        self.slots[index] = ConnectionSlot::empty();
        Ok(index)
    }

    pub fn set_mode(&mut self, handle: ConnHandle, mode: ProtocolMode) -> Result<(), Error> {
        let index = self.position(handle).ok_or(Error::ConnectionNotFound)?;
        self.slots[index].mode = mode;
        Ok(())
    }

    pub fn mode_of(&self, handle: ConnHandle) -> Option<ProtocolMode> {
        self.position(handle).map(|i| self.slots[i].mode)
    }

    pub fn contains(&self, handle: ConnHandle) -> bool {
        self.position(handle).is_some()
    }

    /// Live connections with their protocol mode, in slot order.
    pub fn live(&self) -> impl Iterator<Item = (ConnHandle, ProtocolMode)> + '_ {
        self.slots
            .iter()
            .filter_map(|s| s.handle.map(|handle| (handle, s.mode)))
    }

    pub fn active_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_live()).count()
    }

    pub fn is_full(&self) -> bool {
        self.find_empty_slot().is_none()
    }

    pub fn is_empty(&self) -> bool {
        self.active_count() == 0
    }

    /// Release every slot.
    pub fn clear(&mut self) {
        self.slots = [ConnectionSlot::empty(); K];
    }

    pub fn slots(&self) -> &[ConnectionSlot; K] {
        &self.slots
    }
}

impl<const K: usize> Default for ConnectionTable<K> {
    fn default() -> Self {
        Self::new()
    }
}
