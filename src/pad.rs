//! Gamepad (Joypad) functions and structures.

use std::io::Cursor;

use ferroboy_common::{
    data::{read_u8, write_u8},
    error::Error,
};

use crate::{consts::JOYP_ADDR, mmu::BusComponent, state::StateComponent, warnln};

pub struct Pad {
    down: bool,
    up: bool,
    left: bool,
    right: bool,
    start: bool,
    select: bool,
    b: bool,
    a: bool,
    selection: PadSelection,
    int_pad: bool,
}

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum PadSelection {
    None,
    Action,
    Direction,
}

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum PadKey {
    Up,
    Down,
    Left,
    Right,
    Start,
    Select,
    A,
    B,
}

impl Pad {
    pub fn new() -> Self {
        Self {
            down: false,
            up: false,
            left: false,
            right: false,
            start: false,
            select: false,
            b: false,
            a: false,
            selection: PadSelection::None,
            int_pad: false,
        }
    }

    pub fn reset(&mut self) {
        self.down = false;
        self.up = false;
        self.left = false;
        self.right = false;
        self.start = false;
        self.select = false;
        self.b = false;
        self.a = false;
        self.selection = PadSelection::None;
        self.int_pad = false;
    }

    pub fn read(&self, addr: u16) -> u8 {
        match addr {
            JOYP_ADDR => {
                let low = match self.selection {
                    PadSelection::Action => {
                        (if self.a { 0x00 } else { 0x01 })
                            | (if self.b { 0x00 } else { 0x02 })
                            | (if self.select { 0x00 } else { 0x04 })
                            | (if self.start { 0x00 } else { 0x08 })
                    }
                    PadSelection::Direction => {
                        (if self.right { 0x00 } else { 0x01 })
                            | (if self.left { 0x00 } else { 0x02 })
                            | (if self.up { 0x00 } else { 0x04 })
                            | (if self.down { 0x00 } else { 0x08 })
                    }
                    PadSelection::None => 0x0f,
                };
                let high = match self.selection {
                    PadSelection::Action => 0x10,
                    PadSelection::Direction => 0x20,
                    PadSelection::None => 0x30,
                };
                low | high | 0xc0
            }
            _ => {
                warnln!("Reading from unknown Pad location 0x{:04x}", addr);
                #[allow(unreachable_code)]
                0xff
            }
        }
    }

    pub fn write(&mut self, addr: u16, value: u8) {
        match addr {
            // only bits 4 and 5 are writable, selecting the half
            // of the button matrix visible in the low nibble
            JOYP_ADDR => {
                self.selection = match value & 0x30 {
                    0x10 => PadSelection::Action,
                    0x20 => PadSelection::Direction,
                    _ => PadSelection::None,
                }
            }
            _ => warnln!("Writing to unknown Pad location 0x{:04x}", addr),
        }
    }

    pub fn key_press(&mut self, key: PadKey) {
        match key {
            PadKey::Up => self.up = true,
            PadKey::Down => self.down = true,
            PadKey::Left => self.left = true,
            PadKey::Right => self.right = true,
            PadKey::Start => self.start = true,
            PadKey::Select => self.select = true,
            PadKey::A => self.a = true,
            PadKey::B => self.b = true,
        }
        self.int_pad = true;
    }

    pub fn key_lift(&mut self, key: PadKey) {
        match key {
            PadKey::Up => self.up = false,
            PadKey::Down => self.down = false,
            PadKey::Left => self.left = false,
            PadKey::Right => self.right = false,
            PadKey::Start => self.start = false,
            PadKey::Select => self.select = false,
            PadKey::A => self.a = false,
            PadKey::B => self.b = false,
        }
    }

    /// Updates the complete pad state from a single byte latch
    /// where bits 0 to 7 encode up, right, left, down, a, b,
    /// select and start (1 = pressed).
    ///
    /// A joypad interrupt is raised whenever a key transitions
    /// from released to pressed.
    pub fn set_state_byte(&mut self, value: u8) {
        let up = value & 0x01 == 0x01;
        let right = value & 0x02 == 0x02;
        let left = value & 0x04 == 0x04;
        let down = value & 0x08 == 0x08;
        let a = value & 0x10 == 0x10;
        let b = value & 0x20 == 0x20;
        let select = value & 0x40 == 0x40;
        let start = value & 0x80 == 0x80;

        let pressed = (up && !self.up)
            || (right && !self.right)
            || (left && !self.left)
            || (down && !self.down)
            || (a && !self.a)
            || (b && !self.b)
            || (select && !self.select)
            || (start && !self.start);
        if pressed {
            self.int_pad = true;
        }

        self.up = up;
        self.right = right;
        self.left = left;
        self.down = down;
        self.a = a;
        self.b = b;
        self.select = select;
        self.start = start;
    }

    pub fn state_byte(&self) -> u8 {
        (if self.up { 0x01 } else { 0x00 })
            | (if self.right { 0x02 } else { 0x00 })
            | (if self.left { 0x04 } else { 0x00 })
            | (if self.down { 0x08 } else { 0x00 })
            | (if self.a { 0x10 } else { 0x00 })
            | (if self.b { 0x20 } else { 0x00 })
            | (if self.select { 0x40 } else { 0x00 })
            | (if self.start { 0x80 } else { 0x00 })
    }

    #[inline(always)]
    pub fn int_pad(&self) -> bool {
        self.int_pad
    }

    #[inline(always)]
    pub fn set_int_pad(&mut self, value: bool) {
        self.int_pad = value;
    }

    #[inline(always)]
    pub fn ack_pad(&mut self) {
        self.set_int_pad(false);
    }
}

impl BusComponent for Pad {
    fn read(&self, addr: u16) -> u8 {
        self.read(addr)
    }

    fn write(&mut self, addr: u16, value: u8) {
        self.write(addr, value);
    }
}

impl StateComponent for Pad {
    fn state(&self) -> Result<Vec<u8>, Error> {
        let mut cursor = Cursor::new(vec![]);
        write_u8(&mut cursor, self.state_byte())?;
        let selection = match self.selection {
            PadSelection::None => 0x00,
            PadSelection::Action => 0x01,
            PadSelection::Direction => 0x02,
        };
        write_u8(&mut cursor, selection)?;
        write_u8(&mut cursor, self.int_pad as u8)?;
        Ok(cursor.into_inner())
    }

    fn set_state(&mut self, data: &[u8]) -> Result<(), Error> {
        let mut cursor = Cursor::new(data);
        let state_byte = read_u8(&mut cursor)?;
        self.set_state_byte(state_byte);
        self.selection = match read_u8(&mut cursor)? {
            0x01 => PadSelection::Action,
            0x02 => PadSelection::Direction,
            _ => PadSelection::None,
        };
        self.int_pad = read_u8(&mut cursor)? != 0;
        Ok(())
    }
}

impl Default for Pad {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use crate::consts::JOYP_ADDR;

    use super::{Pad, PadKey};

    #[test]
    fn test_selection() {
        let mut pad = Pad::new();
        pad.key_press(PadKey::A);
        pad.key_press(PadKey::Down);

        pad.write(JOYP_ADDR, 0x10);
        assert_eq!(pad.read(JOYP_ADDR), 0xc0 | 0x10 | 0x0e);

        pad.write(JOYP_ADDR, 0x20);
        assert_eq!(pad.read(JOYP_ADDR), 0xc0 | 0x20 | 0x07);
    }

    #[test]
    fn test_write_touches_selection_only() {
        let mut pad = Pad::new();
        pad.write(JOYP_ADDR, 0xff);
        assert_eq!(pad.read(JOYP_ADDR) & 0x0f, 0x0f);
        pad.write(JOYP_ADDR, 0x10);
        assert_eq!(pad.read(JOYP_ADDR) & 0x30, 0x10);
    }

    #[test]
    fn test_state_byte_latch() {
        let mut pad = Pad::new();
        pad.set_state_byte(0x11);
        assert!(pad.int_pad());

        pad.write(JOYP_ADDR, 0x20);
        assert_eq!(pad.read(JOYP_ADDR) & 0x0f, 0x0b);

        pad.write(JOYP_ADDR, 0x10);
        assert_eq!(pad.read(JOYP_ADDR) & 0x0f, 0x0e);

        pad.ack_pad();
        pad.set_state_byte(0x11);
        assert!(!pad.int_pad());

        pad.set_state_byte(0x00);
        assert!(!pad.int_pad());
    }
}
