// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Persistent node identity.
//!
//! Two bytes of non-volatile storage hold the bus id and the default motor direction. The id is
//! stored as `0x80 | id`; a byte without the marker, or an erased 0xFF, falls back to the
//! configured default id. Storing 127 is therefore indistinguishable from the default.

use log::{info, warn};

use crate::hw::NvStore;
use crate::protocol::messages::MAX_ID;

/// Address of the id byte.
pub const ID_ADDRESS: u16 = 0;
/// Address of the direction byte.
pub const DIRECTION_ADDRESS: u16 = 1;
/// Marker set in a programmed id byte.
pub const ID_WRITTEN: u8 = 0x80;
/// Marker pattern in the upper bits of a programmed direction byte.
pub const DIRECTION_WRITTEN: u8 = 0xA0;

/// Node id and default direction, mirrored in RAM.
pub struct Identity<S> {
    store: S,
    id: u8,
    inverted: bool,
}

impl<S: NvStore> Identity<S> {
    /// Read the identity from `store`, using `default_id` if none was ever written.
    pub fn load(mut store: S, default_id: u8) -> Self {
        let id = read_id(&mut store).unwrap_or(default_id);
        let inverted = read_direction(&mut store);
        info!("node id {}, direction inverted: {}", id, inverted);
        Self {
            store,
            id,
            inverted,
        }
    }

    #[inline]
    pub fn id(&self) -> u8 {
        self.id
    }

    /// Persist a new id and return the id now in effect.
    ///
    /// The value is re-read from the store so a failed write keeps the old id.
    pub fn set_id(&mut self, id: u8) -> u8 {
        if id > MAX_ID {
            warn!("ignoring out-of-range id {}", id);
            return self.id;
        }
        if let Err(e) = update_id(&mut self.store, id) {
            warn!("id write failed: {:?}", e);
        }
        if let Some(stored) = read_id(&mut self.store) {
            self.id = stored;
        }
        self.id
    }

    #[inline]
    pub fn default_direction(&self) -> bool {
        self.inverted
    }

    /// Persist the default direction.
    pub fn set_default_direction(&mut self, inverted: bool) {
        match update_direction(&mut self.store, inverted) {
            Ok(()) => self.inverted = inverted,
            Err(e) => warn!("direction write failed: {:?}", e),
        }
    }

    pub fn free(self) -> S {
        self.store
    }
}

/// Stored id, or `None` when the store was never programmed.
pub fn read_id<S: NvStore>(store: &mut S) -> Option<u8> {
    let raw = store.read(ID_ADDRESS);
    (raw & ID_WRITTEN != 0 && raw != 0xFF).then_some(raw & MAX_ID)
}

/// Stored direction; unprogrammed stores read as not inverted.
pub fn read_direction<S: NvStore>(store: &mut S) -> bool {
    let raw = store.read(DIRECTION_ADDRESS);
    raw & 0xF0 == DIRECTION_WRITTEN && raw & 1 != 0
}

pub fn update_id<S: NvStore>(store: &mut S, id: u8) -> Result<(), S::Error> {
    store.update(ID_ADDRESS, (id & MAX_ID) | ID_WRITTEN)
}

pub fn update_direction<S: NvStore>(store: &mut S, inverted: bool) -> Result<(), S::Error> {
    store.update(DIRECTION_ADDRESS, DIRECTION_WRITTEN | inverted as u8)
}
