//! Save-state serialization for the complete emulator state.
//!
//! The on-disk layout is a versioned container with a fixed set of
//! slots, one per subsystem, each prefixed by its length:
//!
//! ```text
//! "WBSS" | version (u32) | core revision (u32) |
//! slot 0 length (u32) | slot 0 data | ... | slot 6 length (u32) | slot 6 data
//! ```
//!
//! Slot assignment is stable across versions: 0 = CPU, 1 = graphics,
//! 2 = memory, 3 = cartridge, 4 = timer, 5 = input and transfer,
//! 6 = sound.

use std::io::Cursor;

use ferroboy_common::{
    data::{read_bytes, read_u32, write_bytes, write_u32},
    error::Error,
};

use crate::gb::GameBoy;

/// Magic string that prefixes every save-state payload.
pub const SAVE_STATE_MAGIC: &[u8; 4] = b"WBSS";

/// Current version of the save-state layout, bumped whenever
/// the slot contents change in an incompatible way.
pub const SAVE_STATE_VERSION: u32 = 1;

/// Revision of the core that produced the state, stored for
/// diagnostics only, not checked on load.
pub const SAVE_STATE_CORE_REVISION: u32 = 3;

/// The number of subsystem slots in the container.
pub const SAVE_STATE_SLOTS: usize = 7;

/// Trait to be implemented by every component with state that
/// is going to be persisted in a save-state slot.
pub trait StateComponent {
    fn state(&self) -> Result<Vec<u8>, Error>;
    fn set_state(&mut self, data: &[u8]) -> Result<(), Error>;
}

/// Serializes the complete state of the provided emulator
/// instance into a save-state payload.
pub fn save_state(gb: &GameBoy) -> Result<Vec<u8>, Error> {
    let slots: [Vec<u8>; SAVE_STATE_SLOTS] = [
        gb.cpu_i().state()?,
        gb.ppu_i().state()?,
        gb.mmu_i().state()?,
        gb.rom_i().state()?,
        gb.timer_i().state()?,
        input_state(gb)?,
        gb.apu_i().state()?,
    ];

    let mut cursor = Cursor::new(vec![]);
    write_bytes(&mut cursor, SAVE_STATE_MAGIC)?;
    write_u32(&mut cursor, SAVE_STATE_VERSION)?;
    write_u32(&mut cursor, SAVE_STATE_CORE_REVISION)?;
    for slot in slots.iter() {
        write_u32(&mut cursor, slot.len() as u32)?;
        write_bytes(&mut cursor, slot)?;
    }
    Ok(cursor.into_inner())
}

/// Restores the complete state of the provided emulator instance
/// from a save-state payload.
///
/// The payload is validated in full before any state is mutated,
/// a rejected payload leaves the emulator untouched.
pub fn load_state(gb: &mut GameBoy, data: &[u8]) -> Result<(), Error> {
    let slots = parse_state(data)?;

    gb.cpu().set_state(&slots[0])?;
    gb.ppu().set_state(&slots[1])?;
    gb.mmu().set_state(&slots[2])?;
    gb.rom().set_state(&slots[3])?;
    gb.timer().set_state(&slots[4])?;
    set_input_state(gb, &slots[5])?;
    gb.apu().set_state(&slots[6])?;
    Ok(())
}

/// Parses and validates the container, returning the raw slot
/// payloads on success.
fn parse_state(data: &[u8]) -> Result<Vec<Vec<u8>>, Error> {
    let mut cursor = Cursor::new(data);

    let magic = read_bytes(&mut cursor, 4).map_err(|_| Error::InvalidSaveState)?;
    if magic != SAVE_STATE_MAGIC {
        return Err(Error::InvalidSaveState);
    }

    let version = read_u32(&mut cursor).map_err(|_| Error::InvalidSaveState)?;
    if version != SAVE_STATE_VERSION {
        return Err(Error::InvalidSaveState);
    }

    // core revision is informational, the value is read (and
    // discarded) only to advance the cursor
    read_u32(&mut cursor).map_err(|_| Error::InvalidSaveState)?;

    let mut slots = Vec::with_capacity(SAVE_STATE_SLOTS);
    for _ in 0..SAVE_STATE_SLOTS {
        let length = read_u32(&mut cursor).map_err(|_| Error::InvalidSaveState)? as usize;
        let slot = read_bytes(&mut cursor, length).map_err(|_| Error::InvalidSaveState)?;
        slots.push(slot);
    }

    if cursor.position() != data.len() as u64 {
        return Err(Error::InvalidSaveState);
    }

    Ok(slots)
}

/// Builds the input and transfer slot, aggregating the pad, the
/// serial controller and the DMA controller, each length prefixed.
fn input_state(gb: &GameBoy) -> Result<Vec<u8>, Error> {
    let mut cursor = Cursor::new(vec![]);
    for part in [
        gb.pad_i().state()?,
        gb.serial_i().state()?,
        gb.dma_i().state()?,
    ] {
        write_u32(&mut cursor, part.len() as u32)?;
        write_bytes(&mut cursor, &part)?;
    }
    Ok(cursor.into_inner())
}

fn set_input_state(gb: &mut GameBoy, data: &[u8]) -> Result<(), Error> {
    let mut cursor = Cursor::new(data);
    let mut parts = Vec::with_capacity(3);
    for _ in 0..3 {
        let length = read_u32(&mut cursor).map_err(|_| Error::InvalidSaveState)? as usize;
        parts.push(read_bytes(&mut cursor, length).map_err(|_| Error::InvalidSaveState)?);
    }
    gb.pad().set_state(&parts[0])?;
    gb.serial().set_state(&parts[1])?;
    gb.dma().set_state(&parts[2])?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use ferroboy_common::error::Error;

    use crate::gb::GameBoy;

    use super::{load_state, save_state, SAVE_STATE_MAGIC};

    #[test]
    fn test_invalid_magic() {
        let mut gb = GameBoy::default();
        gb.load(false).unwrap();
        gb.load_rom_empty().unwrap();

        let mut state = save_state(&gb).unwrap();
        state[0] = b'X';
        assert_eq!(load_state(&mut gb, &state), Err(Error::InvalidSaveState));
    }

    #[test]
    fn test_invalid_version() {
        let mut gb = GameBoy::default();
        gb.load(false).unwrap();
        gb.load_rom_empty().unwrap();

        let mut state = save_state(&gb).unwrap();
        state[4] = 0xff;
        assert_eq!(load_state(&mut gb, &state), Err(Error::InvalidSaveState));
    }

    #[test]
    fn test_truncated_payload() {
        let mut gb = GameBoy::default();
        gb.load(false).unwrap();
        gb.load_rom_empty().unwrap();

        let state = save_state(&gb).unwrap();
        assert_eq!(&state[0..4], SAVE_STATE_MAGIC);
        assert_eq!(
            load_state(&mut gb, &state[0..state.len() - 1]),
            Err(Error::InvalidSaveState)
        );
    }
}
