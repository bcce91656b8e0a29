//! Test harness helpers used both by the internal test suites
//! and by the benchmarks.
//!
//! Cartridges are synthesized in memory so that no external ROM
//! images are required.

use crate::{
    devices::buffer::BufferDevice,
    gb::{GameBoy, GameBoyConfig, GameBoyMode},
    rom::ROM_BANK_SIZE,
};

#[derive(Default)]
pub struct TestOptions {
    pub mode: Option<GameBoyMode>,
    pub ppu_enabled: Option<bool>,
    pub apu_enabled: Option<bool>,
    pub dma_enabled: Option<bool>,
    pub timer_enabled: Option<bool>,
}

/// Builds a [`GameBoy`] ready for testing: buffer backed serial
/// device, memory allocated and post boot register state loaded.
pub fn build_test(options: TestOptions) -> Box<GameBoy> {
    let config = GameBoyConfig::for_mode(options.mode.unwrap_or(GameBoyMode::Dmg));
    let mut game_boy = Box::new(GameBoy::with_config(config));
    game_boy.set_ppu_enabled(options.ppu_enabled.unwrap_or(true));
    game_boy.set_apu_enabled(options.apu_enabled.unwrap_or(true));
    game_boy.set_dma_enabled(options.dma_enabled.unwrap_or(true));
    game_boy.set_timer_enabled(options.timer_enabled.unwrap_or(true));
    game_boy.attach_serial(Box::<BufferDevice>::default());
    game_boy.load(false).unwrap();
    game_boy.boot();
    game_boy
}

/// Synthesizes a minimal 32KB cartridge image with the provided
/// program placed at the entry point (0x0100).
pub fn build_rom(program: &[u8]) -> Vec<u8> {
    let mut data = vec![0u8; 2 * ROM_BANK_SIZE];
    data[0x0100..0x0100 + program.len()].copy_from_slice(program);
    data
}

/// Variant of [`build_rom`] that also stamps the cartridge type,
/// the ROM size and the RAM size header fields.
pub fn build_rom_mapped(program: &[u8], rom_type: u8, rom_size: u8, ram_size: u8) -> Vec<u8> {
    let banks = 2usize << rom_size;
    let mut data = vec![0u8; banks * ROM_BANK_SIZE];
    data[0x0100..0x0100 + program.len()].copy_from_slice(program);
    data[0x0147] = rom_type;
    data[0x0148] = rom_size;
    data[0x0149] = ram_size;
    data
}

#[cfg(test)]
mod tests {
    use crate::gb::GameBoy;

    use super::{build_rom, build_test, TestOptions};

    #[test]
    fn test_boot_state() {
        let result = build_test(TestOptions::default());

        assert_eq!(result.cpu_i().pc(), 0x0100);
        assert_eq!(result.cpu_i().sp(), 0xfffe);
        assert_eq!(result.cpu_i().af(), 0x01b0);
        assert_eq!(result.cpu_i().bc(), 0x0013);
        assert_eq!(result.cpu_i().de(), 0x00d8);
        assert_eq!(result.cpu_i().hl(), 0x014d);
        assert!(!result.cpu_i().ime());

        assert_eq!(result.read_memory(0xff40), 0x91);
        assert_eq!(result.read_memory(0xff47), 0xfc);
    }

    #[test]
    fn test_serial_buffer_device() {
        // program that pushes a byte through the link cable: the
        // buffer device should capture it once the transfer ends
        let program = [
            0x3e, 0x42, // LD A, 0x42
            0xe0, 0x01, // LDH [0x01], A
            0x3e, 0x81, // LD A, 0x81
            0xe0, 0x02, // LDH [0x02], A
            0x76, // HALT
        ];

        let mut gb = build_test(TestOptions::default());
        gb.load_rom(&build_rom(&program)).unwrap();
        gb.step(GameBoy::LCD_CYCLES);

        assert_eq!(gb.serial_i().device().state(), "B");
    }
}
