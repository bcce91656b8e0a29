//! Game Boy emulation entrypoint and associated functions and structures.
//!
//! Most of the meaningful publicly available functions and structures to build
//! a working emulator should be present here.
//!
//! # Examples
//!
//! Creates a simple [`GameBoy`] instance, loads an (empty) cartridge and runs
//! one complete frame worth of cycles.
//!
//! ```rust
//! use ferroboy::gb::{GameBoy, GameBoyMode};
//! let mut game_boy = GameBoy::new(Some(GameBoyMode::Dmg));
//! game_boy.load(false).unwrap();
//! game_boy.load_rom_empty().unwrap();
//! let result = game_boy.step(GameBoy::LCD_CYCLES);
//! println!("Ran {} cycles", result.cycles);
//! ```

use std::fmt::{self, Display, Formatter};

use ferroboy_common::error::Error;

use crate::{
    apu::{Apu, DEFAULT_ACCUMULATE_MILLIS, DEFAULT_SAMPLE_RATE_HZ},
    cpu::Cpu,
    devices::{buffer::BufferDevice, stdout::StdoutDevice},
    dma::Dma,
    info::Info,
    mmu::Mmu,
    pad::{Pad, PadKey},
    ppu::{Ppu, PpuMode, Tile, DISPLAY_HEIGHT, DISPLAY_WIDTH, FRAME_BUFFER_SIZE},
    rom::Cartridge,
    serial::{NullDevice, Serial, SerialDevice},
    state::{load_state, save_state},
    timer::Timer,
};

/// Enumeration that describes the multiple running
/// modes of the Game Boy emulator.
///
/// DMG = Original Game Boy
/// CGB = Game Boy Color
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum GameBoyMode {
    Dmg = 1,
    Cgb = 2,
}

impl GameBoyMode {
    pub fn description(&self) -> &'static str {
        match self {
            GameBoyMode::Dmg => "Game Boy (DMG)",
            GameBoyMode::Cgb => "Game Boy Color (CGB)",
        }
    }

    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => GameBoyMode::Dmg,
            _ => GameBoyMode::Cgb,
        }
    }

    pub fn is_dmg(&self) -> bool {
        *self == GameBoyMode::Dmg
    }

    pub fn is_cgb(&self) -> bool {
        *self == GameBoyMode::Cgb
    }
}

impl Display for GameBoyMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

impl From<u8> for GameBoyMode {
    fn from(value: u8) -> Self {
        Self::from_u8(value)
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum GameBoySpeed {
    Normal = 0,
    Double = 1,
}

impl GameBoySpeed {
    pub fn description(&self) -> &'static str {
        match self {
            GameBoySpeed::Normal => "Normal Speed",
            GameBoySpeed::Double => "Double Speed",
        }
    }

    pub fn switch(&self) -> Self {
        match self {
            GameBoySpeed::Normal => GameBoySpeed::Double,
            GameBoySpeed::Double => GameBoySpeed::Normal,
        }
    }

    pub fn multiplier(&self) -> u8 {
        match self {
            GameBoySpeed::Normal => 1,
            GameBoySpeed::Double => 2,
        }
    }

    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => GameBoySpeed::Normal,
            _ => GameBoySpeed::Double,
        }
    }
}

impl Display for GameBoySpeed {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

impl From<u8> for GameBoySpeed {
    fn from(value: u8) -> Self {
        Self::from_u8(value)
    }
}

/// Configuration values of a Game Boy instance, gathered at
/// construction time and copied into the components that need
/// them, there is no shared mutable configuration state.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct GameBoyConfig {
    /// The running mode of the emulator, this may affect
    /// many aspects of the emulation, like CPU frequency,
    /// PPU behaviour, boot ROM size, etc.
    pub mode: GameBoyMode,

    /// If the boot ROM should be executed when one is
    /// provided, otherwise the post boot register state
    /// is loaded directly.
    pub enable_boot_rom: bool,

    /// The size of the audio accumulation window in
    /// milliseconds, used to size the audio queue.
    pub audio_accumulate_max_millis: u32,

    /// The sample rate hint used together with the audio
    /// accumulation window to size the audio queue.
    pub tas_sample_rate_hz: u32,

    /// If the PPU is enabled, it will be clocked.
    pub ppu_enabled: bool,

    /// If the APU is enabled, it will be clocked.
    pub apu_enabled: bool,

    /// If the DMA is enabled, it will be clocked.
    pub dma_enabled: bool,

    /// If the timer is enabled, it will be clocked.
    pub timer_enabled: bool,

    /// If the serial is enabled, it will be clocked.
    pub serial_enabled: bool,
}

impl GameBoyConfig {
    pub fn for_mode(mode: GameBoyMode) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }
}

impl Default for GameBoyConfig {
    fn default() -> Self {
        Self {
            mode: GameBoyMode::Dmg,
            enable_boot_rom: false,
            audio_accumulate_max_millis: DEFAULT_ACCUMULATE_MILLIS,
            tas_sample_rate_hz: DEFAULT_SAMPLE_RATE_HZ,
            ppu_enabled: true,
            apu_enabled: true,
            dma_enabled: true,
            timer_enabled: true,
            serial_enabled: true,
        }
    }
}

/// Aggregation structure allowing the bundling of
/// all the components of a GameBoy into a single
/// element for easy access.
pub struct Components {
    pub ppu: Ppu,
    pub apu: Apu,
    pub dma: Dma,
    pub pad: Pad,
    pub timer: Timer,
    pub serial: Serial,
}

pub struct Registers {
    pub pc: u16,
    pub sp: u16,
    pub a: u8,
    pub b: u8,
    pub c: u8,
    pub d: u8,
    pub e: u8,
    pub h: u8,
    pub l: u8,
    pub scy: u8,
    pub scx: u8,
    pub wy: u8,
    pub wx: u8,
    pub ly: u8,
    pub lyc: u8,
}

/// The result of a budgeted [`GameBoy::step`] call, the only
/// way emulation faults are surfaced to the host.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct StepResult {
    /// The number of CPU cycles effectively executed, may
    /// slightly exceed the requested budget as instructions
    /// are never split.
    pub cycles: u32,

    /// Set when at least one complete frame was emitted
    /// during the step, the frame buffer is ready.
    pub frame_ready: bool,

    /// Set when the CPU hit a hardware-halt opcode, no more
    /// progress is made until the system is reset.
    pub crashed: bool,
}

/// Top level structure that abstracts the usage of the
/// Game Boy system under the Ferroboy emulator.
///
/// Should serve as the main entry-point API.
pub struct GameBoy {
    /// The current running mode of the emulator, this
    /// may affect many aspects of the emulation.
    mode: GameBoyMode,

    /// If the PPU is enabled, it will be clocked.
    ppu_enabled: bool,

    /// If the APU is enabled, it will be clocked.
    apu_enabled: bool,

    /// If the DMA is enabled, it will be clocked.
    dma_enabled: bool,

    /// If the timer is enabled, it will be clocked.
    timer_enabled: bool,

    /// If the serial is enabled, it will be clocked.
    serial_enabled: bool,

    /// If the boot ROM should be executed when one is
    /// provided to the initialization operation.
    enable_boot_rom: bool,

    /// Reference to the Game Boy CPU component to be
    /// used as the main element of the system, when
    /// clocked, the amount of ticks from it will be
    /// used as reference for the rest of the components.
    cpu: Cpu,
}

impl GameBoy {
    /// The logic frequency of the Game Boy
    /// CPU in hz.
    pub const CPU_FREQ: u32 = 4194304;

    /// The visual frequency (refresh rate)
    /// of the Game Boy, close to 60 hz.
    pub const VISUAL_FREQ: f32 = 59.7275;

    /// The cycles taken to run a complete frame
    /// loop in the Game Boy's PPU (in CPU cycles).
    pub const LCD_CYCLES: u32 = 70224;

    pub fn new(mode: Option<GameBoyMode>) -> Self {
        Self::with_config(GameBoyConfig::for_mode(mode.unwrap_or(GameBoyMode::Dmg)))
    }

    pub fn with_config(config: GameBoyConfig) -> Self {
        let components = Components {
            ppu: Ppu::new(config.mode),
            apu: Apu::new(
                config.tas_sample_rate_hz,
                config.audio_accumulate_max_millis,
            ),
            dma: Dma::default(),
            pad: Pad::default(),
            timer: Timer::default(),
            serial: Serial::default(),
        };
        let mmu = Mmu::new(components, config.mode);
        let cpu = Cpu::new(mmu);

        Self {
            mode: config.mode,
            ppu_enabled: config.ppu_enabled,
            apu_enabled: config.apu_enabled,
            dma_enabled: config.dma_enabled,
            timer_enabled: config.timer_enabled,
            serial_enabled: config.serial_enabled,
            enable_boot_rom: config.enable_boot_rom,
            cpu,
        }
    }

    pub fn verify_rom(data: &[u8]) -> bool {
        Cartridge::from_data(data).is_ok()
    }

    pub fn reset(&mut self) {
        self.ppu().reset();
        self.apu().reset_all();
        self.dma().reset();
        self.pad().reset();
        self.timer().reset();
        self.serial().reset();
        self.mmu().reset();
        self.cpu.reset();
    }

    /// One shot initialization of the complete system, allocating
    /// the memory layout for the current mode, loading the provided
    /// cartridge and taking the boot ROM in consideration.
    ///
    /// In case no boot ROM is provided (or its execution disabled)
    /// the post boot register state is loaded directly.
    pub fn initialize(&mut self, data: &[u8], boot_rom: Option<&[u8]>) -> Result<(), Error> {
        self.load(false)?;
        match boot_rom {
            Some(boot_rom) if self.enable_boot_rom => self.load_boot(boot_rom),
            _ => self.boot(),
        }
        self.load_rom(data)?;
        Ok(())
    }

    /// Advances the system by (at least) the provided number of
    /// CPU cycles, the usual budget being one complete frame.
    ///
    /// Instructions are never split, meaning the effective number
    /// of cycles may slightly overshoot the budget. The step loop
    /// performs no allocation and no I/O.
    pub fn step(&mut self, cycle_budget: u32) -> StepResult {
        let mut cycles = 0u32;
        let frame_index = self.ppu_i().frame_index();

        while cycles < cycle_budget && !self.cpu_i().crashed() {
            cycles += self.clock() as u32;
        }

        StepResult {
            cycles,
            frame_ready: self.ppu_i().frame_index() != frame_index,
            crashed: self.cpu_i().crashed(),
        }
    }

    /// Advances the clock of the system by one tick, this will
    /// usually imply executing one CPU instruction and advancing
    /// all the other components of the system by the required
    /// amount of cycles.
    ///
    /// This method takes into account the current speed of the
    /// system (single or double) and will execute the required
    /// amount of cycles in the other components of the system
    /// accordingly.
    ///
    /// The amount of cycles executed by the CPU is returned.
    pub fn clock(&mut self) -> u16 {
        let cycles = self.cpu_clock() as u16;
        let cycles_n = cycles / self.multiplier() as u16;
        self.clock_devices(cycles, cycles_n);
        cycles
    }

    /// Function equivalent to `clock()` but that allows pre-emptive
    /// breaking of the clock cycle loop if the PC (Program Counter)
    /// reaches the provided address, making sure that in such a
    /// situation the devices are not clocked.
    pub fn clock_step(&mut self, addr: u16) -> u16 {
        let cycles = self.cpu_clock() as u16;
        if self.cpu_i().pc() == addr {
            return cycles;
        }
        let cycles_n = cycles / self.multiplier() as u16;
        self.clock_devices(cycles, cycles_n);
        cycles
    }

    /// Clocks the emulator until the limit of cycles that has been
    /// provided and returns the amount of cycles that have been
    /// clocked.
    pub fn clocks_cycles(&mut self, limit: usize) -> u64 {
        let mut cycles = 0_u64;
        while cycles < limit as u64 {
            cycles += self.clock() as u64;
        }
        cycles
    }

    pub fn next_frame(&mut self) -> u32 {
        let mut cycles = 0u32;
        let current_frame = self.ppu_frame();
        while self.ppu_frame() == current_frame {
            cycles += self.clock() as u32;
        }
        cycles
    }

    pub fn step_to(&mut self, addr: u16) -> u32 {
        let mut cycles = 0u32;
        while self.cpu_i().pc() != addr {
            cycles += self.clock_step(addr) as u32;
        }
        cycles
    }

    #[inline(always)]
    fn clock_devices(&mut self, cycles: u16, cycles_n: u16) {
        if self.ppu_enabled {
            self.ppu_clock(cycles_n);
        }
        if self.apu_enabled {
            self.apu_clock(cycles_n);
        }
        if self.dma_enabled {
            self.dma_clock(cycles);
        }
        if self.timer_enabled {
            self.timer_clock(cycles);
        }
        if self.serial_enabled {
            self.serial_clock(cycles);
        }
        self.rom_clock(cycles);
    }

    pub fn key_press(&mut self, key: PadKey) {
        self.pad().key_press(key);
    }

    pub fn key_lift(&mut self, key: PadKey) {
        self.pad().key_lift(key);
    }

    /// Updates the complete joypad state from a single byte latch
    /// where bits 0 to 7 encode up, right, left, down, a, b,
    /// select and start (1 = pressed).
    pub fn set_joypad(&mut self, value: u8) {
        self.pad().set_state_byte(value);
    }

    pub fn joypad(&self) -> u8 {
        self.pad_i().state_byte()
    }

    pub fn cpu_clock(&mut self) -> u8 {
        self.cpu.clock()
    }

    pub fn ppu_clock(&mut self, cycles: u16) {
        self.ppu().clock(cycles)
    }

    pub fn apu_clock(&mut self, cycles: u16) {
        self.apu().clock(cycles)
    }

    pub fn dma_clock(&mut self, cycles: u16) {
        self.mmu().clock_dma(cycles);
    }

    pub fn timer_clock(&mut self, cycles: u16) {
        self.timer().clock(cycles)
    }

    pub fn serial_clock(&mut self, cycles: u16) {
        self.serial().clock(cycles)
    }

    pub fn rom_clock(&mut self, cycles: u16) {
        self.rom().clock(cycles)
    }

    pub fn ppu_ly(&self) -> u8 {
        self.ppu_i().ly()
    }

    pub fn ppu_mode(&self) -> PpuMode {
        self.ppu_i().mode()
    }

    pub fn ppu_frame(&self) -> u16 {
        self.ppu_i().frame_index()
    }

    /// Direct boot method that immediately jumps the machine
    /// to the post boot state, this will effectively skip the
    /// boot sequence and jump to the cartridge execution.
    pub fn boot(&mut self) {
        match self.mode {
            GameBoyMode::Dmg => self.cpu.boot(),
            GameBoyMode::Cgb => self.cpu.boot_cgb(),
        }
    }

    pub fn frame_buffer(&self) -> &[u8; FRAME_BUFFER_SIZE] {
        self.ppu_i().frame_buffer()
    }

    pub fn frame_buffer_eager(&self) -> Vec<u8> {
        self.frame_buffer().to_vec()
    }

    /// Obtains the audio queue as the triplet that the host needs
    /// to drain it: the interleaved stereo buffer, the producer
    /// write index and the total capacity in bytes.
    pub fn audio_queue(&self) -> (&[u8], usize, usize) {
        let apu = self.apu_i();
        (apu.audio_buffer(), apu.write_index(), apu.capacity())
    }

    pub fn audio_output(&self) -> u8 {
        self.apu_i().output()
    }

    pub fn cartridge_ram(&self) -> &[u8] {
        self.rom_i().ram_data()
    }

    pub fn ram_data_eager(&self) -> Vec<u8> {
        self.rom_i().ram_data_eager()
    }

    pub fn set_ram_data(&mut self, ram_data: &[u8]) {
        self.rom().set_ram_data(ram_data)
    }

    pub fn save_state(&self) -> Result<Vec<u8>, Error> {
        save_state(self)
    }

    pub fn load_state(&mut self, data: &[u8]) -> Result<(), Error> {
        load_state(self, data)
    }

    pub fn registers(&self) -> Registers {
        let ppu_registers = self.ppu_i().registers();
        Registers {
            pc: self.cpu.pc,
            sp: self.cpu.sp,
            a: self.cpu.a,
            b: self.cpu.b,
            c: self.cpu.c,
            d: self.cpu.d,
            e: self.cpu.e,
            h: self.cpu.h,
            l: self.cpu.l,
            scy: ppu_registers.scy,
            scx: ppu_registers.scx,
            wy: ppu_registers.wy,
            wx: ppu_registers.wx,
            ly: ppu_registers.ly,
            lyc: ppu_registers.lyc,
        }
    }

    /// Obtains the tile structure for the tile at the
    /// given index, no conversion in the pixel buffer
    /// is done so that the color reference is the GB one.
    pub fn get_tile(&self, index: usize) -> Tile {
        self.ppu_i().tiles()[index]
    }

    /// Obtains the pixel buffer for the tile at the
    /// provided index, converting the color buffer
    /// using the currently loaded (background) palette.
    pub fn get_tile_buffer(&self, index: usize) -> Vec<u8> {
        let tile = self.get_tile(index);
        tile.palette_buffer(self.ppu_i().palette_bg())
    }

    pub fn is_dmg(&self) -> bool {
        self.mode == GameBoyMode::Dmg
    }

    pub fn is_cgb(&self) -> bool {
        self.mode == GameBoyMode::Cgb
    }

    pub fn speed(&self) -> GameBoySpeed {
        self.mmu_i().speed()
    }

    pub fn multiplier(&self) -> u8 {
        self.mmu_i().speed().multiplier()
    }

    pub fn mode(&self) -> GameBoyMode {
        self.mode
    }

    pub fn set_mode(&mut self, value: GameBoyMode) {
        self.mode = value;
        self.mmu().set_mode(value);
        self.ppu().set_gb_mode(value);
    }

    pub fn ppu_enabled(&self) -> bool {
        self.ppu_enabled
    }

    pub fn set_ppu_enabled(&mut self, value: bool) {
        self.ppu_enabled = value;
    }

    pub fn apu_enabled(&self) -> bool {
        self.apu_enabled
    }

    pub fn set_apu_enabled(&mut self, value: bool) {
        self.apu_enabled = value;
    }

    pub fn dma_enabled(&self) -> bool {
        self.dma_enabled
    }

    pub fn set_dma_enabled(&mut self, value: bool) {
        self.dma_enabled = value;
    }

    pub fn timer_enabled(&self) -> bool {
        self.timer_enabled
    }

    pub fn set_timer_enabled(&mut self, value: bool) {
        self.timer_enabled = value;
    }

    pub fn serial_enabled(&self) -> bool {
        self.serial_enabled
    }

    pub fn set_serial_enabled(&mut self, value: bool) {
        self.serial_enabled = value;
    }

    pub fn set_all_enabled(&mut self, value: bool) {
        self.set_ppu_enabled(value);
        self.set_apu_enabled(value);
        self.set_dma_enabled(value);
        self.set_timer_enabled(value);
        self.set_serial_enabled(value);
    }

    pub fn attach_null_serial(&mut self) {
        self.attach_serial(Box::<NullDevice>::default());
    }

    pub fn attach_stdout_serial(&mut self) {
        self.attach_serial(Box::<StdoutDevice>::default());
    }

    pub fn attach_buffer_serial(&mut self) {
        self.attach_serial(Box::<BufferDevice>::default());
    }

    pub fn display_width(&self) -> usize {
        DISPLAY_WIDTH
    }

    pub fn display_height(&self) -> usize {
        DISPLAY_HEIGHT
    }

    pub fn description(&self, column_length: usize) -> String {
        let version_l = format!("{:width$}", "Version", width = column_length);
        let mode_l = format!("{:width$}", "Mode", width = column_length);
        let clock_l = format!("{:width$}", "Clock", width = column_length);
        let serial_l = format!("{:width$}", "Serial", width = column_length);
        format!(
            "{}  {}\n{}  {}\n{}  {}\n{}  {}",
            version_l,
            Info::version(),
            mode_l,
            self.mode(),
            clock_l,
            format!("{:.02} Mhz", Self::CPU_FREQ as f32 / 1000.0 / 1000.0),
            serial_l,
            self.serial_i().device().description(),
        )
    }

    pub fn description_debug(&self) -> String {
        format!(
            "{}\nCPU:\n{}\nDMA:\n{}",
            self.description(12),
            self.cpu_i().description_default(),
            self.dma_i().description()
        )
    }
}

/// Game Boy implementations centered around the accessors to
/// the internal components and the loading of content.
impl GameBoy {
    pub fn cpu(&mut self) -> &mut Cpu {
        &mut self.cpu
    }

    pub fn cpu_i(&self) -> &Cpu {
        &self.cpu
    }

    pub fn mmu(&mut self) -> &mut Mmu {
        self.cpu.mmu()
    }

    pub fn mmu_i(&self) -> &Mmu {
        self.cpu.mmu_i()
    }

    pub fn ppu(&mut self) -> &mut Ppu {
        self.cpu.ppu()
    }

    pub fn ppu_i(&self) -> &Ppu {
        self.cpu.ppu_i()
    }

    pub fn apu(&mut self) -> &mut Apu {
        self.cpu.apu()
    }

    pub fn apu_i(&self) -> &Apu {
        self.cpu.apu_i()
    }

    pub fn dma(&mut self) -> &mut Dma {
        self.cpu.dma()
    }

    pub fn dma_i(&self) -> &Dma {
        self.cpu.dma_i()
    }

    pub fn pad(&mut self) -> &mut Pad {
        self.cpu.pad()
    }

    pub fn pad_i(&self) -> &Pad {
        self.cpu.pad_i()
    }

    pub fn timer(&mut self) -> &mut Timer {
        self.cpu.timer()
    }

    pub fn timer_i(&self) -> &Timer {
        self.cpu.timer_i()
    }

    pub fn serial(&mut self) -> &mut Serial {
        self.cpu.serial()
    }

    pub fn serial_i(&self) -> &Serial {
        self.cpu.serial_i()
    }

    pub fn rom(&mut self) -> &mut Cartridge {
        self.mmu().rom()
    }

    pub fn rom_i(&self) -> &Cartridge {
        self.mmu_i().rom_i()
    }

    /// Allocates the memory layout of the system for the current
    /// running mode, optionally loading the static boot ROM.
    pub fn load(&mut self, boot: bool) -> Result<(), Error> {
        match self.mode {
            GameBoyMode::Dmg => self.mmu().allocate_dmg(),
            GameBoyMode::Cgb => self.mmu().allocate_cgb(),
        }
        if boot {
            self.boot();
        }
        Ok(())
    }

    /// Loads the provided boot ROM binary into the boot memory
    /// area, the system then starts executing from address zero.
    pub fn load_boot(&mut self, data: &[u8]) {
        self.mmu().write_boot(0x0000, data);
        self.mmu().set_boot_active(true);
    }

    pub fn load_cartridge(&mut self, rom: Cartridge) -> Result<&mut Cartridge, Error> {
        self.mmu().set_rom(rom);
        Ok(self.mmu().rom())
    }

    pub fn load_rom(&mut self, data: &[u8]) -> Result<&mut Cartridge, Error> {
        let rom = Cartridge::from_data(data)?;
        self.load_cartridge(rom)
    }

    pub fn load_rom_empty(&mut self) -> Result<&mut Cartridge, Error> {
        let data = [0u8; 32 * 1024];
        self.load_rom(&data)
    }

    pub fn attach_serial(&mut self, device: Box<dyn SerialDevice>) {
        self.serial().set_device(device);
    }

    pub fn read_memory(&self, addr: u16) -> u8 {
        self.mmu_i().read(addr)
    }

    pub fn write_memory(&mut self, addr: u16, value: u8) {
        self.mmu().write(addr, value);
    }

    pub fn read_memory_raw(&self, addr: u16) -> u8 {
        self.mmu_i().read_raw(addr)
    }

    pub fn write_memory_raw(&mut self, addr: u16, value: u8) {
        self.mmu().write_raw(addr, value);
    }

    pub fn set_speed_callback(&mut self, callback: fn(speed: GameBoySpeed)) {
        self.mmu().set_speed_callback(callback);
    }
}

impl Default for GameBoy {
    fn default() -> Self {
        Self::new(None)
    }
}

impl Display for GameBoy {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description(9))
    }
}

#[cfg(test)]
mod tests {
    use crate::test::{build_rom, build_test, TestOptions};

    use super::GameBoy;

    #[test]
    fn test_step_budget() {
        let mut gb = build_test(TestOptions::default());
        gb.load_rom_empty().unwrap();

        let result = gb.step(GameBoy::LCD_CYCLES);
        assert!(result.cycles >= GameBoy::LCD_CYCLES);
        assert!(result.cycles < GameBoy::LCD_CYCLES + 24);
        assert!(result.frame_ready);
        assert!(!result.crashed);
    }

    #[test]
    fn test_step_zero_budget() {
        let mut gb = build_test(TestOptions::default());
        gb.load_rom_empty().unwrap();

        let result = gb.step(0);
        assert_eq!(result.cycles, 0);
        assert!(!result.frame_ready);
    }

    #[test]
    fn test_step_crash_stops_progress() {
        let mut gb = build_test(TestOptions::default());

        // a ROM with a single hardware-halt opcode at the entry
        // point crashes the CPU and freezes the step loop
        let rom = build_rom(&[0xd3]);
        gb.load_rom(&rom).unwrap();

        let result = gb.step(GameBoy::LCD_CYCLES);
        assert!(result.crashed);
        assert!(result.cycles < GameBoy::LCD_CYCLES);

        let result = gb.step(GameBoy::LCD_CYCLES);
        assert!(result.crashed);
        assert_eq!(result.cycles, 0);
    }

    #[test]
    fn test_frame_emission_cadence() {
        let mut gb = build_test(TestOptions::default());
        gb.load_rom_empty().unwrap();

        // every frame aligned budget must produce exactly one frame
        for _ in 0..4 {
            let before = gb.ppu_frame();
            gb.next_frame();
            assert_eq!(gb.ppu_frame(), before.wrapping_add(1));
        }
    }

    #[test]
    fn test_audio_sample_cadence() {
        let mut gb = build_test(TestOptions::default());
        gb.load_rom_empty().unwrap();

        let cycles = gb.clocks_cycles(87 * 1000) as usize;
        let (_, write_index, capacity) = gb.audio_queue();
        assert!(write_index < capacity);

        // one stereo sample (two bytes) is produced per 87 cycles
        let samples = write_index / 2;
        let expected = cycles / 87;
        assert!(samples >= expected - 1 && samples <= expected + 1);
    }

    #[test]
    fn test_save_state_parity() {
        // program that keeps mutating memory and registers, any
        // divergence after a state restore would be visible
        let program = [
            0x3c, // INC A
            0xea, 0x00, 0xc0, // LD [0xC000], A
            0x04, // INC B
            0xc3, 0x00, 0x01, // JP 0x0100
        ];

        let mut gb = build_test(TestOptions::default());
        gb.load_rom(&build_rom(&program)).unwrap();

        gb.step(GameBoy::LCD_CYCLES * 10);
        let state_a = gb.save_state().unwrap();

        gb.step(GameBoy::LCD_CYCLES * 10);
        let state_b = gb.save_state().unwrap();

        gb.load_state(&state_a).unwrap();
        gb.step(GameBoy::LCD_CYCLES * 10);
        let state_c = gb.save_state().unwrap();

        assert_eq!(state_b, state_c);
    }

    #[test]
    fn test_determinism() {
        let program = [
            0x3c, // INC A
            0xea, 0x00, 0xc0, // LD [0xC000], A
            0xc3, 0x00, 0x01, // JP 0x0100
        ];

        let run = || {
            let mut gb = build_test(TestOptions::default());
            gb.load_rom(&build_rom(&program)).unwrap();
            gb.set_joypad(0x11);
            gb.step(GameBoy::LCD_CYCLES * 4);
            (
                gb.frame_buffer_eager(),
                gb.audio_queue().0.to_vec(),
                gb.save_state().unwrap(),
            )
        };

        let (frame_first, audio_first, state_first) = run();
        let (frame_second, audio_second, state_second) = run();

        assert_eq!(frame_first, frame_second);
        assert_eq!(audio_first, audio_second);
        assert_eq!(state_first, state_second);
    }
}
