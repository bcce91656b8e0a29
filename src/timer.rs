//! Timer functions and structures.

use std::io::Cursor;

use ferroboy_common::{
    data::{read_u16, read_u8, write_u16, write_u8},
    error::Error,
};

use crate::{
    consts::{DIV_ADDR, TAC_ADDR, TIMA_ADDR, TMA_ADDR},
    mmu::BusComponent,
    state::StateComponent,
    warnln,
};

pub struct Timer {
    div: u8,
    tima: u8,
    tma: u8,
    tac: u8,
    div_clock: u16,
    tima_clock: u16,
    tima_enabled: bool,
    tima_ratio: u16,
    int_tima: bool,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            div: 0,
            tima: 0,
            tma: 0,
            tac: 0x0,
            div_clock: 0,
            tima_clock: 0,
            tima_enabled: false,
            tima_ratio: 1024,
            int_tima: false,
        }
    }

    pub fn reset(&mut self) {
        self.div = 0;
        self.tima = 0;
        self.tma = 0;
        self.tac = 0x0;
        self.div_clock = 0;
        self.tima_clock = 0;
        self.tima_enabled = false;
        self.tima_ratio = 1024;
        self.int_tima = false;
    }

    pub fn clock(&mut self, cycles: u16) {
        self.div_clock += cycles;
        while self.div_clock >= 256 {
            self.div = self.div.wrapping_add(1);
            self.div_clock -= 256;
        }

        if self.tima_enabled {
            self.tima_clock += cycles;
            while self.tima_clock >= self.tima_ratio {
                // in case TIMA value overflows must set the
                // interrupt and update the TIMA value to
                // the TMA one (reset operation)
                if self.tima == 0xff {
                    self.int_tima = true;
                    self.tima = self.tma;
                }
                // otherwise uses the normal add operation
                // and increments the TIMA value by one
                else {
                    self.tima = self.tima.wrapping_add(1);
                }

                self.tima_clock -= self.tima_ratio;
            }
        }
    }

    pub fn read(&self, addr: u16) -> u8 {
        match addr {
            // 0xFF04 — DIV: Divider register
            DIV_ADDR => self.div,
            // 0xFF05 — TIMA: Timer counter
            TIMA_ADDR => self.tima,
            // 0xFF06 — TMA: Timer modulo
            TMA_ADDR => self.tma,
            // 0xFF07 — TAC: Timer control
            TAC_ADDR => self.tac | 0xf8,
            _ => {
                warnln!("Reading from unknown Timer location 0x{:04x}", addr);
                #[allow(unreachable_code)]
                0xff
            }
        }
    }

    pub fn write(&mut self, addr: u16, value: u8) {
        match addr {
            // 0xFF04 — DIV: Divider register, any write clears
            // both the visible counter and its cycle accumulator
            DIV_ADDR => {
                self.div = 0;
                self.div_clock = 0;
            }
            // 0xFF05 — TIMA: Timer counter
            TIMA_ADDR => self.tima = value,
            // 0xFF06 — TMA: Timer modulo
            TMA_ADDR => self.tma = value,
            // 0xFF07 — TAC: Timer control
            TAC_ADDR => {
                self.tac = value;
                self.tima_ratio = match value & 0x03 {
                    0x00 => 1024,
                    0x01 => 16,
                    0x02 => 64,
                    _ => 256,
                };
                self.tima_enabled = (value & 0x04) == 0x04;
            }
            _ => warnln!("Writing to unknown Timer location 0x{:04x}", addr),
        }
    }

    #[inline(always)]
    pub fn int_tima(&self) -> bool {
        self.int_tima
    }

    #[inline(always)]
    pub fn set_int_tima(&mut self, value: bool) {
        self.int_tima = value;
    }

    #[inline(always)]
    pub fn ack_tima(&mut self) {
        self.set_int_tima(false);
    }

    #[inline(always)]
    pub fn div(&self) -> u8 {
        self.div
    }

    #[inline(always)]
    pub fn set_div(&mut self, value: u8) {
        self.div = value;
    }

    #[inline(always)]
    pub fn tima(&self) -> u8 {
        self.tima
    }

    #[inline(always)]
    pub fn set_tima(&mut self, value: u8) {
        self.tima = value;
    }
}

impl BusComponent for Timer {
    fn read(&self, addr: u16) -> u8 {
        self.read(addr)
    }

    fn write(&mut self, addr: u16, value: u8) {
        self.write(addr, value);
    }
}

impl StateComponent for Timer {
    fn state(&self) -> Result<Vec<u8>, Error> {
        let mut cursor = Cursor::new(vec![]);
        write_u8(&mut cursor, self.div)?;
        write_u8(&mut cursor, self.tima)?;
        write_u8(&mut cursor, self.tma)?;
        write_u8(&mut cursor, self.tac)?;
        write_u16(&mut cursor, self.div_clock)?;
        write_u16(&mut cursor, self.tima_clock)?;
        write_u8(&mut cursor, self.int_tima as u8)?;
        Ok(cursor.into_inner())
    }

    fn set_state(&mut self, data: &[u8]) -> Result<(), Error> {
        let mut cursor = Cursor::new(data);
        self.div = read_u8(&mut cursor)?;
        self.tima = read_u8(&mut cursor)?;
        self.tma = read_u8(&mut cursor)?;
        let tac = read_u8(&mut cursor)?;
        self.write(TAC_ADDR, tac);
        self.div_clock = read_u16(&mut cursor)?;
        self.tima_clock = read_u16(&mut cursor)?;
        self.int_tima = read_u8(&mut cursor)? != 0;
        Ok(())
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        consts::{DIV_ADDR, TAC_ADDR, TIMA_ADDR, TMA_ADDR},
        state::StateComponent,
    };

    use super::Timer;

    #[test]
    fn test_div_rate() {
        let mut timer = Timer::new();
        timer.clock(255);
        assert_eq!(timer.read(DIV_ADDR), 0);
        timer.clock(1);
        assert_eq!(timer.read(DIV_ADDR), 1);
        timer.clock(512);
        assert_eq!(timer.read(DIV_ADDR), 3);
    }

    #[test]
    fn test_div_write_clears_counter() {
        let mut timer = Timer::new();
        timer.clock(300);
        assert_eq!(timer.read(DIV_ADDR), 1);
        timer.write(DIV_ADDR, 0x55);
        assert_eq!(timer.read(DIV_ADDR), 0);

        // the internal accumulator must have been cleared as
        // well, meaning a full 256 cycles are needed again
        timer.clock(255);
        assert_eq!(timer.read(DIV_ADDR), 0);
        timer.clock(1);
        assert_eq!(timer.read(DIV_ADDR), 1);
    }

    #[test]
    fn test_tima_overflow() {
        let mut timer = Timer::new();
        timer.write(TMA_ADDR, 0xab);
        timer.write(TIMA_ADDR, 0xff);
        timer.write(TAC_ADDR, 0x05);

        // at the 262144 Hz ratio one increment happens
        // every 16 cycles, triggering the overflow
        timer.clock(16);
        assert_eq!(timer.read(TIMA_ADDR), 0xab);
        assert!(timer.int_tima());

        timer.set_int_tima(false);
        timer.clock(16 * 4);
        assert_eq!(timer.read(TIMA_ADDR), 0xaf);
        assert!(!timer.int_tima());
    }

    #[test]
    fn test_tima_disabled() {
        let mut timer = Timer::new();
        timer.write(TAC_ADDR, 0x01);
        timer.clock(1024);
        assert_eq!(timer.read(TIMA_ADDR), 0x00);
    }

    #[test]
    fn test_state_and_set_state() {
        let mut timer = Timer::new();
        timer.write(TMA_ADDR, 0x12);
        timer.write(TAC_ADDR, 0x06);
        timer.clock(100);

        let state = timer.state().unwrap();

        let mut new_timer = Timer::new();
        new_timer.set_state(&state).unwrap();

        assert_eq!(new_timer.read(TMA_ADDR), 0x12);
        assert_eq!(new_timer.read(TAC_ADDR), 0x06 | 0xf8);
        assert_eq!(new_timer.div_clock, 100);
    }
}
