//! MMU (Memory Management Unit) functions and structures.

use std::io::Cursor;

use ferroboy_common::{
    data::{read_bytes, read_u32, read_u8, write_bytes, write_u32, write_u8},
    error::Error,
};

use crate::{
    apu::Apu,
    consts::{BOOT_ADDR, IE_ADDR, IF_ADDR, KEY0_ADDR, KEY1_ADDR, SVBK_ADDR},
    dma::Dma,
    gb::{Components, GameBoyMode, GameBoySpeed},
    pad::Pad,
    ppu::Ppu,
    rom::Cartridge,
    serial::Serial,
    state::StateComponent,
    timer::Timer,
    warnln,
};

pub const BOOT_SIZE_DMG: usize = 256;
pub const BOOT_SIZE_CGB: usize = 2304;

pub const RAM_SIZE_DMG: usize = 8192;
pub const RAM_SIZE_CGB: usize = 32768;

/// The number of bytes copied by one OAM DMA transfer.
pub const DMA_TRANSFER_SIZE: u16 = 160;

pub trait BusComponent {
    fn read(&self, addr: u16) -> u8;
    fn write(&mut self, addr: u16, value: u8);
    fn read_many(&self, addr: u16, count: usize) -> Vec<u8> {
        (0..count)
            .map(|offset| self.read(addr + offset as u16))
            .collect()
    }
    fn write_many(&mut self, addr: u16, values: &[u8]) {
        for (offset, &value) in values.iter().enumerate() {
            self.write(addr + offset as u16, value);
        }
    }
}

pub struct Mmu {
    /// Register that controls the interrupts that are considered
    /// to be enabled and should be triggered.
    pub ie: u8,

    /// Register that controls the compatibility mode in use, this
    /// value comes directly from 0x0143 (CGB flag). The possible (and
    /// valid) values are: 0x80 for games that support CGB enhancements
    /// and 0xC0 for games that are compatible only with a CGB device
    /// (CGB only).
    pub key0: u8,

    /// Flag that controls if the system is currently in the process
    /// of switching between the double and single speed modes.
    pub switching: bool,

    /// The speed (frequency) at which the system is currently running,
    /// it may be either normal (4.194304 MHz) or double (8.388608 MHz).
    speed: GameBoySpeed,

    /// Callback to be called when the speed of the system changes, it
    /// should provide visibility over the current speed of the system.
    speed_callback: fn(speed: GameBoySpeed),

    /// Reference to the PPU (Pixel Processing Unit) that is going
    /// to be used both for VRAM reading/writing and to forward
    /// some of the access operations.
    ppu: Ppu,

    /// Reference to the APU (Audio Processing Unit) that is going
    /// to be used both for register reading/writing and to forward
    /// some of the access operations.
    apu: Apu,

    /// Reference to the DMA (Direct Memory Access) controller that is
    /// going to be used for quick and CPU offloaded memory transfers.
    dma: Dma,

    /// Reference to the Gamepad structure that is going to control
    /// the I/O access to this device.
    pad: Pad,

    /// The timer controller to be used as part of the I/O access
    /// that is memory mapped.
    timer: Timer,

    /// The serial data transfer controller to be used to control the
    /// link cable connection, this component is memory mapped.
    serial: Serial,

    /// The cartridge ROM that is currently loaded into the system,
    /// going to be used to access ROM and external RAM banks.
    rom: Cartridge,

    /// Flag that controls the access to the boot section in the
    /// 0x0000-0x00FE memory area, this flag should be unset after
    /// the boot sequence has been finished.
    boot_active: bool,

    /// Buffer to be used to store the boot ROM, this is the code
    /// that is going to be executed at the beginning of the Game
    /// Boy execution. The buffer effectively used is of 256 bytes
    /// for the "normal" Game Boy (DMG) and 2304 bytes for the
    /// Game Boy Color (CGB). Note that in the case of the CGB
    /// the 256 bytes in range 0x0100-0x01FF are meant to be
    /// read from the cartridge header instead.
    boot: Vec<u8>,

    /// Buffer that is used to store the work RAM of the system, this
    /// value varies between DMG and CGB emulation, being 8KB for
    /// the DMG and 32KB for the CGB. Mapped in range 0xC000-0xDFFF.
    ram: Vec<u8>,

    /// The RAM bank to be used in the read and write operation of
    /// the 0xD000-0xDFFF memory range (CGB only).
    ram_bank: u8,

    /// The offset to be used in the read and write operation of
    /// the RAM, this value should be consistent with the RAM bank
    /// that is currently selected (CGB only).
    ram_offset: u16,

    /// The current running mode of the emulator, this
    /// may affect many aspects of the emulation.
    mode: GameBoyMode,
}

impl Mmu {
    pub fn new(components: Components, mode: GameBoyMode) -> Self {
        Self {
            ppu: components.ppu,
            apu: components.apu,
            dma: components.dma,
            pad: components.pad,
            timer: components.timer,
            serial: components.serial,
            rom: Cartridge::new(),
            boot_active: true,
            boot: vec![],
            ram: vec![],
            ram_bank: 0x1,
            ram_offset: 0x1000,
            ie: 0x0,
            key0: 0x0,
            speed: GameBoySpeed::Normal,
            switching: false,
            speed_callback: |_| {},
            mode,
        }
    }

    pub fn reset(&mut self) {
        self.rom = Cartridge::new();
        self.boot_active = true;
        self.boot = vec![];
        self.ram = vec![];
        self.ram_bank = 0x1;
        self.ram_offset = 0x1000;
        self.ie = 0x0;
        self.key0 = 0x0;
        self.speed = GameBoySpeed::Normal;
        self.switching = false;
    }

    pub fn allocate_default(&mut self) {
        self.allocate_dmg();
    }

    pub fn allocate_dmg(&mut self) {
        self.boot = vec![0x00; BOOT_SIZE_DMG];
        self.ram = vec![0x00; RAM_SIZE_DMG];
    }

    pub fn allocate_cgb(&mut self) {
        self.boot = vec![0x00; BOOT_SIZE_CGB];
        self.ram = vec![0x00; RAM_SIZE_CGB];
    }

    /// Switches the current system's speed toggling between
    /// the normal and double speed modes.
    pub fn switch_speed(&mut self) {
        self.speed = self.speed.switch();
        self.switching = false;
        (self.speed_callback)(self.speed);
    }

    pub fn speed(&self) -> GameBoySpeed {
        self.speed
    }

    pub fn set_speed(&mut self, value: GameBoySpeed) {
        self.speed = value;
    }

    pub fn set_speed_callback(&mut self, callback: fn(speed: GameBoySpeed)) {
        self.speed_callback = callback;
    }

    pub fn ppu(&mut self) -> &mut Ppu {
        &mut self.ppu
    }

    pub fn ppu_i(&self) -> &Ppu {
        &self.ppu
    }

    pub fn apu(&mut self) -> &mut Apu {
        &mut self.apu
    }

    pub fn apu_i(&self) -> &Apu {
        &self.apu
    }

    pub fn dma(&mut self) -> &mut Dma {
        &mut self.dma
    }

    pub fn dma_i(&self) -> &Dma {
        &self.dma
    }

    pub fn pad(&mut self) -> &mut Pad {
        &mut self.pad
    }

    pub fn pad_i(&self) -> &Pad {
        &self.pad
    }

    pub fn timer(&mut self) -> &mut Timer {
        &mut self.timer
    }

    pub fn timer_i(&self) -> &Timer {
        &self.timer
    }

    pub fn serial(&mut self) -> &mut Serial {
        &mut self.serial
    }

    pub fn serial_i(&self) -> &Serial {
        &self.serial
    }

    pub fn boot_active(&self) -> bool {
        self.boot_active
    }

    pub fn set_boot_active(&mut self, value: bool) {
        self.boot_active = value;
    }

    /// Advances the DMA controller by the given number of cycles,
    /// running the pending transfers once their windows elapse.
    pub fn clock_dma(&mut self, cycles: u16) {
        if !self.dma.active() {
            return;
        }

        if self.dma.active_dma() {
            let cycles_dma = self.dma.cycles_dma().saturating_sub(cycles);
            if cycles_dma == 0x0 {
                // the active flag must be lifted before the copy so
                // that the source reads are not blocked by the bus
                // conflict rule
                self.dma.set_active_dma(false);
                let data = self.read_many((self.dma.value_dma() as u16) << 8, DMA_TRANSFER_SIZE);
                self.write_many(0xfe00, &data);
            }
            self.dma.set_cycles_dma(cycles_dma);
        }

        if self.dma.active_hdma() {
            // only runs the DMA transfer if the system is in CGB mode,
            // this avoids issues when writing to DMG unmapped registers
            if self.mode == GameBoyMode::Cgb {
                let data = self.read_many(self.dma.source(), self.dma.pending());
                self.write_many(self.dma.destination(), &data);
            }
            self.dma.set_pending(0);
            self.dma.set_active_hdma(false);
        }
    }

    /// Checks if the provided address is accessible to the CPU
    /// while an OAM DMA transfer is in flight, only the I/O and
    /// HRAM page survives the bus conflict.
    #[inline(always)]
    fn dma_conflict(&self, addr: u16) -> bool {
        self.dma.active_dma() && addr < 0xff00
    }

    pub fn read(&self, addr: u16) -> u8 {
        // while the OAM DMA window is open the CPU visible bus
        // is limited to the I/O and HRAM page, everything else
        // reads back as open bus
        if self.dma_conflict(addr) {
            return 0xff;
        }

        match addr {
            // 0x0000-0x0FFF - BOOT (256 B) + ROM0 (4 KB/16 KB)
            0x0000..=0x0fff => {
                // in case the boot mode is active and the
                // address is within boot memory reads from it
                if self.boot_active && addr <= 0x00ff {
                    return self.boot[addr as usize];
                }
                if self.boot_active
                    && self.mode == GameBoyMode::Cgb
                    && (0x0200..=0x08ff).contains(&addr)
                {
                    return self.boot[addr as usize];
                }
                self.rom.read(addr)
            }

            // 0x1000-0x3FFF - ROM 0 (12 KB/16 KB)
            // 0x4000-0x7FFF - ROM 1 (Banked) (16 KB)
            0x1000..=0x7fff => self.rom.read(addr),

            // 0x8000-0x9FFF - Graphics: VRAM (8 KB)
            0x8000..=0x9fff => self.ppu.read(addr),

            // 0xA000-0xBFFF - External RAM (8 KB)
            0xa000..=0xbfff => self.rom.read(addr),

            // 0xC000-0xCFFF - Working RAM 0 (4 KB)
            0xc000..=0xcfff => self.ram[(addr & 0x0fff) as usize],

            // 0xD000-0xDFFF - Working RAM 1 (Banked) (4KB)
            0xd000..=0xdfff => self.ram[(self.ram_offset + (addr & 0x0fff)) as usize],

            // 0xE000-0xFDFF - Working RAM Shadow
            0xe000..=0xfdff => self.ram[(addr & 0x1fff) as usize],

            // 0xFE00-0xFE9F - Object attribute memory (OAM)
            0xfe00..=0xfe9f => self.ppu.read(addr),

            // 0xFEA0-0xFEFF - Not Usable
            0xfea0..=0xfeff => 0xff,

            // 0xFF00 - Joypad input
            0xff00 => self.pad.read(addr),

            // 0xFF01-0xFF02 - Serial data transfer
            0xff01..=0xff02 => self.serial.read(addr),

            // 0xFF04-0xFF07 - Timer and divider
            0xff04..=0xff07 => self.timer.read(addr),

            // 0xFF0F — IF: Interrupt flag
            IF_ADDR => {
                (if self.ppu.int_vblank() { 0x01 } else { 0x00 })
                    | (if self.ppu.int_stat() { 0x02 } else { 0x00 })
                    | (if self.timer.int_tima() { 0x04 } else { 0x00 })
                    | (if self.serial.int_serial() { 0x08 } else { 0x00 })
                    | (if self.pad.int_pad() { 0x10 } else { 0x00 })
                    | 0xe0
            }

            // 0xFF10-0xFF26 — Audio
            // 0xFF30-0xFF3F — Wave pattern
            0xff10..=0xff26 | 0xff30..=0xff3f => self.apu.read(addr),

            // 0xFF40-0xFF45 - PPU registers
            // 0xFF47-0xFF4B - PPU registers
            0xff40..=0xff45 | 0xff47..=0xff4b => self.ppu.read(addr),

            // 0xFF46 — DMA: OAM DMA source address & start
            0xff46 => self.dma.read(addr),

            // 0xFF4C - KEY0: Compatibility flag (CGB only)
            KEY0_ADDR => self.key0,

            // 0xFF4D - KEY1: Speed switching (CGB only)
            KEY1_ADDR => {
                (if self.switching { 0x01 } else { 0x00 }) | ((self.speed as u8) << 7) | 0x7e
            }

            // 0xFF4F - VRAM Bank Select (CGB only)
            0xff4f => self.ppu.read(addr),

            // 0xFF50 - Boot active flag
            BOOT_ADDR => u8::from(!self.boot_active),

            // 0xFF51-0xFF55 - VRAM DMA (HDMA) (CGB only)
            0xff51..=0xff55 => self.dma.read(addr),

            // 0xFF56 - RP: Infrared communications port (CGB only)
            0xff56 => 0xff,

            // 0xFF68-0xFF6C - BG / OBJ Palettes (CGB only)
            0xff68..=0xff6c => self.ppu.read(addr),

            // 0xFF70 - SVBK: WRAM bank (CGB only)
            SVBK_ADDR => (self.ram_bank & 0x07) | 0xf8,

            // 0xFF80-0xFFFE - High RAM (HRAM)
            0xff80..=0xfffe => self.ppu.read(addr),

            // 0xFFFF — IE: Interrupt enable
            IE_ADDR => self.ie,

            addr => {
                warnln!("Reading from unknown location 0x{:04x}", addr);
                #[allow(unreachable_code)]
                0xff
            }
        }
    }

    pub fn write(&mut self, addr: u16, value: u8) {
        // writes outside the I/O and HRAM page are dropped while
        // the OAM DMA bus conflict is in place
        if self.dma_conflict(addr) {
            return;
        }

        match addr {
            // 0x0000-0x7FFF - ROM (mapper control writes)
            0x0000..=0x7fff => self.rom.write(addr, value),

            // 0x8000-0x9FFF - Graphics: VRAM (8 KB)
            0x8000..=0x9fff => self.ppu.write(addr, value),

            // 0xA000-0xBFFF - External RAM (8 KB)
            0xa000..=0xbfff => self.rom.write(addr, value),

            // 0xC000-0xCFFF - Working RAM 0 (4 KB)
            0xc000..=0xcfff => self.ram[(addr & 0x0fff) as usize] = value,

            // 0xD000-0xDFFF - Working RAM 1 (Banked) (4KB)
            0xd000..=0xdfff => self.ram[(self.ram_offset + (addr & 0x0fff)) as usize] = value,

            // 0xE000-0xFDFF - Working RAM Shadow
            0xe000..=0xfdff => self.ram[(addr & 0x1fff) as usize] = value,

            // 0xFE00-0xFE9F - Object attribute memory (OAM)
            0xfe00..=0xfe9f => self.ppu.write(addr, value),

            // 0xFEA0-0xFEFF - Not Usable
            0xfea0..=0xfeff => {}

            // 0xFF00 - Joypad input
            0xff00 => self.pad.write(addr, value),

            // 0xFF01-0xFF02 - Serial data transfer
            0xff01..=0xff02 => self.serial.write(addr, value),

            // 0xFF04-0xFF07 - Timer and divider
            0xff04..=0xff07 => self.timer.write(addr, value),

            // 0xFF0F — IF: Interrupt flag
            IF_ADDR => {
                self.ppu.set_int_vblank(value & 0x01 == 0x01);
                self.ppu.set_int_stat(value & 0x02 == 0x02);
                self.timer.set_int_tima(value & 0x04 == 0x04);
                self.serial.set_int_serial(value & 0x08 == 0x08);
                self.pad.set_int_pad(value & 0x10 == 0x10);
            }

            // 0xFF10-0xFF26 — Audio
            // 0xFF30-0xFF3F — Wave pattern
            0xff10..=0xff26 | 0xff30..=0xff3f => self.apu.write(addr, value),

            // 0xFF40-0xFF45 - PPU registers
            // 0xFF47-0xFF4B - PPU registers
            0xff40..=0xff45 | 0xff47..=0xff4b => self.ppu.write(addr, value),

            // 0xFF46 — DMA: OAM DMA source address & start
            0xff46 => self.dma.write(addr, value),

            // 0xFF4C - KEY0: Compatibility flag (CGB only)
            KEY0_ADDR => {
                self.key0 = value;
                if value == 0x04 {
                    self.ppu.set_dmg_compat(true);
                }
            }

            // 0xFF4D - KEY1: Speed switching (CGB only)
            KEY1_ADDR => self.switching = value & 0x01 == 0x01,

            // 0xFF4F - VRAM Bank Select (CGB only)
            0xff4f => self.ppu.write(addr, value),

            // 0xFF50 - Boot active flag
            BOOT_ADDR => self.boot_active = value == 0x00,

            // 0xFF51-0xFF55 - VRAM DMA (HDMA) (CGB only)
            0xff51..=0xff55 => self.dma.write(addr, value),

            // 0xFF56 - RP: Infrared communications port (CGB only)
            0xff56 => {}

            // 0xFF68-0xFF6C - BG / OBJ Palettes (CGB only)
            0xff68..=0xff6c => self.ppu.write(addr, value),

            // 0xFF70 - SVBK: WRAM bank (CGB only)
            SVBK_ADDR => {
                if self.mode == GameBoyMode::Cgb {
                    let mut ram_bank = value & 0x07;
                    if ram_bank == 0x0 {
                        ram_bank = 0x1;
                    }
                    self.ram_bank = ram_bank;
                    self.ram_offset = self.ram_bank as u16 * 0x1000;
                }
            }

            // 0xFF80-0xFFFE - High RAM (HRAM)
            0xff80..=0xfffe => self.ppu.write(addr, value),

            // 0xFFFF — IE: Interrupt enable
            IE_ADDR => self.ie = value,

            addr => warnln!("Writing to unknown location 0x{:04x}", addr),
        }
    }

    /// Reads a byte from a certain memory address, without the typical
    /// Game Boy verifications (register traps and bus conflicts),
    /// allowing deep read of values.
    pub fn read_raw(&self, addr: u16) -> u8 {
        match addr {
            0xff10..=0xff3f => self.apu.read_raw(addr),
            // the raw access is not subject to the DMA bus conflict
            _ if self.dma.active_dma() => self.read_unguarded(addr),
            _ => self.read(addr),
        }
    }

    /// Writes a byte to a certain memory address without the typical
    /// Game Boy verification process. This allows for faster memory
    /// access in registers and other memory areas that are typically
    /// inaccessible.
    pub fn write_raw(&mut self, addr: u16, value: u8) {
        match addr {
            0xff10..=0xff3f => self.apu.write_raw(addr, value),
            // the raw access is not subject to the DMA bus conflict
            _ if self.dma.active_dma() => self.write_unguarded(addr, value),
            _ => self.write(addr, value),
        }
    }

    /// Unguarded variant of the read operation, used internally to
    /// bypass the OAM DMA bus conflict.
    fn read_unguarded(&self, addr: u16) -> u8 {
        match addr {
            0x0000..=0x7fff => self.rom.read(addr),
            0x8000..=0x9fff => self.ppu.read(addr),
            0xa000..=0xbfff => self.rom.read(addr),
            0xc000..=0xcfff => self.ram[(addr & 0x0fff) as usize],
            0xd000..=0xdfff => self.ram[(self.ram_offset + (addr & 0x0fff)) as usize],
            0xe000..=0xfdff => self.ram[(addr & 0x1fff) as usize],
            0xfe00..=0xfe9f => self.ppu.read(addr),
            _ => self.read(addr),
        }
    }

    /// Unguarded variant of the write operation, used internally to
    /// bypass the OAM DMA bus conflict.
    fn write_unguarded(&mut self, addr: u16, value: u8) {
        match addr {
            0x0000..=0x7fff => self.rom.write(addr, value),
            0x8000..=0x9fff => self.ppu.write(addr, value),
            0xa000..=0xbfff => self.rom.write(addr, value),
            0xc000..=0xcfff => self.ram[(addr & 0x0fff) as usize] = value,
            0xd000..=0xdfff => self.ram[(self.ram_offset + (addr & 0x0fff)) as usize] = value,
            0xe000..=0xfdff => self.ram[(addr & 0x1fff) as usize] = value,
            0xfe00..=0xfe9f => self.ppu.write(addr, value),
            _ => self.write(addr, value),
        }
    }

    pub fn read_many(&self, addr: u16, count: u16) -> Vec<u8> {
        let mut data: Vec<u8> = vec![];

        for index in 0..count {
            let byte = self.read(addr.wrapping_add(index));
            data.push(byte);
        }

        data
    }

    pub fn write_many(&mut self, addr: u16, data: &[u8]) {
        for (index, byte) in data.iter().enumerate() {
            self.write(addr.wrapping_add(index as u16), *byte)
        }
    }

    pub fn write_boot(&mut self, addr: u16, buffer: &[u8]) {
        self.boot[addr as usize..addr as usize + buffer.len()].clone_from_slice(buffer);
    }

    pub fn write_ram(&mut self, addr: u16, buffer: &[u8]) {
        self.ram[addr as usize..addr as usize + buffer.len()].clone_from_slice(buffer);
    }

    pub fn ram(&mut self) -> &mut Vec<u8> {
        &mut self.ram
    }

    pub fn ram_i(&self) -> &Vec<u8> {
        &self.ram
    }

    pub fn rom(&mut self) -> &mut Cartridge {
        &mut self.rom
    }

    pub fn rom_i(&self) -> &Cartridge {
        &self.rom
    }

    pub fn set_rom(&mut self, rom: Cartridge) {
        self.rom = rom;
    }

    pub fn mode(&self) -> GameBoyMode {
        self.mode
    }

    pub fn set_mode(&mut self, value: GameBoyMode) {
        self.mode = value;
    }
}

impl StateComponent for Mmu {
    fn state(&self) -> Result<Vec<u8>, Error> {
        let mut cursor = Cursor::new(vec![]);
        write_u32(&mut cursor, self.ram.len() as u32)?;
        write_bytes(&mut cursor, &self.ram)?;
        write_u8(&mut cursor, self.ram_bank)?;
        write_u8(&mut cursor, self.ie)?;
        write_u8(&mut cursor, self.key0)?;
        write_u8(&mut cursor, self.speed as u8)?;
        write_u8(&mut cursor, self.switching as u8)?;
        write_u8(&mut cursor, self.boot_active as u8)?;
        Ok(cursor.into_inner())
    }

    fn set_state(&mut self, data: &[u8]) -> Result<(), Error> {
        let mut cursor = Cursor::new(data);
        let ram_len = read_u32(&mut cursor)? as usize;
        self.ram = read_bytes(&mut cursor, ram_len)?;
        self.ram_bank = read_u8(&mut cursor)?;
        self.ram_offset = self.ram_bank as u16 * 0x1000;
        self.ie = read_u8(&mut cursor)?;
        self.key0 = read_u8(&mut cursor)?;
        self.speed = GameBoySpeed::from_u8(read_u8(&mut cursor)?);
        self.switching = read_u8(&mut cursor)? != 0;
        self.boot_active = read_u8(&mut cursor)? != 0;
        Ok(())
    }
}

impl Default for Mmu {
    fn default() -> Self {
        let mode = GameBoyMode::Dmg;
        let components = Components {
            ppu: Ppu::new(mode),
            apu: Apu::default(),
            dma: Dma::default(),
            pad: Pad::default(),
            timer: Timer::default(),
            serial: Serial::default(),
        };
        Mmu::new(components, mode)
    }
}

#[cfg(test)]
mod tests {
    use crate::consts::{DMA_ADDR, IF_ADDR};

    use super::Mmu;

    #[test]
    fn test_ram_and_echo() {
        let mut mmu = Mmu::default();
        mmu.allocate_dmg();

        mmu.write(0xc001, 0x42);
        assert_eq!(mmu.read(0xc001), 0x42);

        // the echo RAM area aliases the work RAM
        assert_eq!(mmu.read(0xe001), 0x42);
        mmu.write(0xe002, 0x13);
        assert_eq!(mmu.read(0xc002), 0x13);
    }

    #[test]
    fn test_unusable_area() {
        let mut mmu = Mmu::default();
        mmu.allocate_dmg();

        mmu.write(0xfea0, 0x42);
        assert_eq!(mmu.read(0xfea0), 0xff);
    }

    #[test]
    fn test_interrupt_flag_composition() {
        let mut mmu = Mmu::default();
        mmu.allocate_dmg();

        assert_eq!(mmu.read(IF_ADDR), 0xe0);

        mmu.timer().set_int_tima(true);
        assert_eq!(mmu.read(IF_ADDR), 0xe0 | 0x04);

        mmu.write(IF_ADDR, 0x00);
        assert!(!mmu.timer_i().int_tima());
    }

    #[test]
    fn test_oam_dma_transfer() {
        let mut mmu = Mmu::default();
        mmu.allocate_dmg();

        for index in 0..160u16 {
            mmu.write(0xc000 + index, index as u8);
        }

        mmu.write(DMA_ADDR, 0xc0);

        // while the transfer window is open the bus is restricted
        // to the I/O and HRAM page
        assert_eq!(mmu.read(0xc010), 0xff);
        mmu.write(0xff80, 0x42);
        assert_eq!(mmu.read(0xff80), 0x42);

        mmu.clock_dma(640);
        assert_eq!(mmu.read(0xfe00), 0x00);
        assert_eq!(mmu.read(0xfe10), 0x10);
        assert_eq!(mmu.read(0xfe9f), 0x9f);
        assert_eq!(mmu.read(0xc010), 0x10);
    }

    #[test]
    fn test_raw_read_skips_dma_conflict() {
        let mut mmu = Mmu::default();
        mmu.allocate_dmg();

        mmu.write(0xc010, 0x77);
        mmu.write(DMA_ADDR, 0xc0);
        assert_eq!(mmu.read(0xc010), 0xff);
        assert_eq!(mmu.read_raw(0xc010), 0x77);
    }
}
