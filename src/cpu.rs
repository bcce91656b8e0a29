//! Implementation of the core CPU (Sharp LR35902) logic for the Game Boy.
//!
//! Does not include the instruction set implementation, only the core
//! CPU logic and the CPU struct definition.
//!
//! Most of the core CPU logic is implemented in the [`Cpu::clock`] method.

use std::{
    fmt::{self, Display, Formatter},
    io::Cursor,
};

use ferroboy_common::{
    data::{read_u16, read_u8, write_u16, write_u8},
    error::Error,
};

use crate::{
    apu::Apu,
    assert_pedantic_gb,
    consts::{BGP_ADDR, IF_ADDR, LCDC_ADDR},
    debugln,
    dma::Dma,
    inst::{Instruction, EXTENDED, INSTRUCTIONS},
    mmu::Mmu,
    pad::Pad,
    ppu::Ppu,
    serial::Serial,
    state::StateComponent,
    timer::Timer,
};

pub const PREFIX: u8 = 0xcb;

/// The number of CPU cycles taken by the servicing of an
/// interrupt (vector dispatch).
pub const INT_CYCLES: u8 = 20;

/// The number of CPU cycles billed while the CPU is halted
/// (or stopped) and no instruction is executed.
pub const IDLE_CYCLES: u8 = 4;

pub struct Cpu {
    pub pc: u16,
    pub sp: u16,
    pub a: u8,
    pub b: u8,
    pub c: u8,
    pub d: u8,
    pub e: u8,
    pub h: u8,
    pub l: u8,

    ime: bool,
    zero: bool,
    sub: bool,
    half_carry: bool,
    carry: bool,
    halted: bool,
    stopped: bool,

    /// Flag set when HALT was executed with interrupts globally
    /// disabled while an enabled interrupt was already pending,
    /// suppressing the PC increment of the next opcode fetch.
    halt_bug: bool,

    /// Countdown used to implement the delayed IME enable of the
    /// EI instruction, the master enable flag is only set after
    /// the instruction that follows EI.
    ei_delay: u8,

    /// Flag set when the CPU hit one of the hardware-halt (illegal)
    /// opcodes, no more instructions are executed until reset.
    crashed: bool,

    /// Reference to the MMU (Memory Management Unit) to be used
    /// for memory bus access operations.
    pub mmu: Mmu,

    /// Temporary counter used to control the number of cycles
    /// taken by the current or last CPU operation.
    pub cycles: u8,

    /// Reference to the PC (Program Counter) of the previous executed
    /// instruction, used to provide a reference to the instruction
    /// so that it can be logged or used for debugging purposes.
    pub ppc: u16,
}

impl Cpu {
    pub fn new(mmu: Mmu) -> Self {
        Self {
            pc: 0x0,
            sp: 0x0,
            a: 0x0,
            b: 0x0,
            c: 0x0,
            d: 0x0,
            e: 0x0,
            h: 0x0,
            l: 0x0,
            ime: false,
            zero: false,
            sub: false,
            half_carry: false,
            carry: false,
            halted: false,
            stopped: false,
            halt_bug: false,
            ei_delay: 0,
            crashed: false,
            mmu,
            cycles: 0,
            ppc: 0x0,
        }
    }

    pub fn reset(&mut self) {
        self.pc = 0x0;
        self.sp = 0x0;
        self.a = 0x0;
        self.b = 0x0;
        self.c = 0x0;
        self.d = 0x0;
        self.e = 0x0;
        self.h = 0x0;
        self.l = 0x0;
        self.ime = false;
        self.zero = false;
        self.sub = false;
        self.half_carry = false;
        self.carry = false;
        self.halted = false;
        self.stopped = false;
        self.halt_bug = false;
        self.ei_delay = 0;
        self.crashed = false;
        self.cycles = 0;
    }

    /// Sets the CPU registers and some of the memory space to the
    /// expected state after the DMG boot ROM finishes.
    ///
    /// Using this strategy it's possible to skip the "normal" boot
    /// loading process for the original DMG Game Boy.
    pub fn boot(&mut self) {
        self.pc = 0x0100;
        self.sp = 0xfffe;
        self.a = 0x01;
        self.b = 0x00;
        self.c = 0x13;
        self.d = 0x00;
        self.e = 0xd8;
        self.h = 0x01;
        self.l = 0x4d;
        self.set_f(0xb0);

        // updates part of the MMU state, disabling the boot
        // memory overlay and setting the LCD control and the
        // background palette registers to the values the boot
        // ROM leaves behind (required by some ROMs)
        self.mmu.set_boot_active(false);
        self.mmu.write(LCDC_ADDR, 0x91);
        self.mmu.write(BGP_ADDR, 0xfc);
    }

    /// Sets the CPU registers to the expected state after the CGB
    /// boot ROM finishes.
    pub fn boot_cgb(&mut self) {
        self.boot();
        self.a = 0x11;
        self.b = 0x00;
        self.c = 0x00;
        self.d = 0xff;
        self.e = 0x56;
        self.h = 0x00;
        self.l = 0x0d;
        self.set_f(0x80);
    }

    pub fn clock(&mut self) -> u8 {
        // a crashed CPU no longer fetches or executes, cycles
        // keep being billed so the other subsystems stay coherent
        if self.crashed {
            return IDLE_CYCLES;
        }

        // gathers the PC (program counter) reference that
        // is going to be used in the fetching phase
        let pc = self.pc;

        // runs a series of assertions to guarantee CPU execution
        // state, only if pedantic mode is set
        assert_pedantic_gb!(
            !(0x8000..=0x9fff).contains(&pc),
            "Invalid PC area at 0x{:04x}",
            pc
        );

        // prefetch the pending interrupt flags so we can quickly check
        // if any enabled interrupt is waiting to be served. This is used
        // both to release the CPU from a halted state and to execute the
        // correct handler when IME is enabled.
        let pending = self.mmu.read(IF_ADDR) & self.mmu.ie & 0x1f;

        // in case the CPU execution halted and there's a pending interrupt
        // while IME is disabled, release the CPU from the halted state so
        // execution can continue until the interrupt is serviced
        if self.halted && !self.ime && pending != 0 {
            self.halted = false;
        }

        // a stopped CPU is only released by joypad activity, until
        // then only idle cycles are billed
        if self.stopped {
            if pending & 0x10 != 0 {
                self.stopped = false;
            } else {
                return IDLE_CYCLES;
            }
        }

        // checks the IME (interrupt master enable) is enabled and then
        // checks if there's any interrupt to be handled, in case there's
        // one the lowest indexed pending bit is serviced
        if self.ime && pending != 0 {
            for index in 0..5u8 {
                let mask = 1u8 << index;
                if pending & mask == 0 {
                    continue;
                }

                debugln!("Going to run interrupt handler (0x{:02x})", 0x40 + index * 8);

                self.disable_int();
                self.push_word(pc);
                self.pc = 0x0040 + (index as u16) * 8;

                // acknowledges the interrupt at the component that
                // owns the line, effectively clearing the IF bit
                match index {
                    0 => self.mmu.ppu().ack_vblank(),
                    1 => self.mmu.ppu().ack_stat(),
                    2 => self.mmu.timer().ack_tima(),
                    3 => self.mmu.serial().ack_serial(),
                    4 => self.mmu.pad().ack_pad(),
                    _ => (),
                }

                // in case the CPU is currently halted waiting
                // for an interrupt, releases it
                if self.halted {
                    self.halted = false;
                }

                return INT_CYCLES;
            }
        }

        // in case the CPU is currently in the halted state
        // returns the control flow immediately with the associated
        // number of cycles estimated for the halted execution
        if self.halted {
            return IDLE_CYCLES;
        }

        // fetches the current instruction and updates the PC
        // (Program Counter) according to the final value returned
        // by the fetch operation (we may need to fetch instruction
        // more than one byte of length), the HALT bug suppresses
        // the increment of the opcode fetch exactly once
        let halt_bug = self.halt_bug;
        self.halt_bug = false;
        let (inst, pc) = self.fetch(self.pc, halt_bug);
        self.ppc = self.pc;
        self.pc = pc;

        let (inst_fn, inst_time, _inst_str) = inst;

        #[cfg(feature = "cpulog")]
        {
            println!("{}", self.description(inst, self.ppc));
        }

        // calls the current instruction and increments the number of
        // cycles executed by the instruction time of the instruction
        // that has just been executed
        self.cycles = 0;
        inst_fn(self);
        self.cycles = self.cycles.wrapping_add(*inst_time);

        // handles the delayed IME enable of the EI instruction, the
        // enable only takes effect after the instruction that follows
        if self.ei_delay > 0 {
            self.ei_delay -= 1;
            if self.ei_delay == 0 {
                self.ime = true;
            }
        }

        // returns the number of cycles that the operation
        // that has been executed has taken
        self.cycles
    }

    #[inline(always)]
    fn fetch(&self, pc: u16, halt_bug: bool) -> (&'static Instruction, u16) {
        let mut pc = pc;

        // fetches the current instruction and increments
        // the PC (program counter) accordingly, unless the
        // HALT bug is in effect for this fetch
        let mut opcode = self.mmu.read(pc);
        if !halt_bug {
            pc = pc.wrapping_add(1);
        }

        // checks if the current instruction is a prefix
        // instruction, in case it is, fetches the next
        // instruction and increments the PC accordingly
        let inst: &Instruction;
        if opcode == PREFIX {
            opcode = self.mmu.read(pc);
            pc = pc.wrapping_add(1);
            inst = &EXTENDED[opcode as usize];
        } else {
            inst = &INSTRUCTIONS[opcode as usize];
        }

        // returns both the fetched instruction and the
        // updated PC (Program Counter) value
        (inst, pc)
    }

    #[inline(always)]
    pub fn mmu(&mut self) -> &mut Mmu {
        &mut self.mmu
    }

    #[inline(always)]
    pub fn mmu_i(&self) -> &Mmu {
        &self.mmu
    }

    #[inline(always)]
    pub fn ppu(&mut self) -> &mut Ppu {
        self.mmu.ppu()
    }

    #[inline(always)]
    pub fn ppu_i(&self) -> &Ppu {
        self.mmu.ppu_i()
    }

    #[inline(always)]
    pub fn apu(&mut self) -> &mut Apu {
        self.mmu.apu()
    }

    #[inline(always)]
    pub fn apu_i(&self) -> &Apu {
        self.mmu.apu_i()
    }

    #[inline(always)]
    pub fn dma(&mut self) -> &mut Dma {
        self.mmu.dma()
    }

    #[inline(always)]
    pub fn dma_i(&self) -> &Dma {
        self.mmu.dma_i()
    }

    #[inline(always)]
    pub fn pad(&mut self) -> &mut Pad {
        self.mmu.pad()
    }

    #[inline(always)]
    pub fn pad_i(&self) -> &Pad {
        self.mmu.pad_i()
    }

    #[inline(always)]
    pub fn timer(&mut self) -> &mut Timer {
        self.mmu.timer()
    }

    #[inline(always)]
    pub fn timer_i(&self) -> &Timer {
        self.mmu.timer_i()
    }

    #[inline(always)]
    pub fn serial(&mut self) -> &mut Serial {
        self.mmu.serial()
    }

    #[inline(always)]
    pub fn serial_i(&self) -> &Serial {
        self.mmu.serial_i()
    }

    #[inline(always)]
    pub fn halted(&self) -> bool {
        self.halted
    }

    #[inline(always)]
    pub fn set_halted(&mut self, value: bool) {
        self.halted = value
    }

    #[inline(always)]
    pub fn stopped(&self) -> bool {
        self.stopped
    }

    #[inline(always)]
    pub fn crashed(&self) -> bool {
        self.crashed
    }

    #[inline(always)]
    pub fn set_crashed(&mut self, value: bool) {
        self.crashed = value;
    }

    #[inline(always)]
    pub fn cycles(&self) -> u8 {
        self.cycles
    }

    #[inline(always)]
    pub fn pc(&self) -> u16 {
        self.pc
    }

    #[inline(always)]
    pub fn set_pc(&mut self, value: u16) {
        self.pc = value;
    }

    #[inline(always)]
    pub fn sp(&self) -> u16 {
        self.sp
    }

    #[inline(always)]
    pub fn set_sp(&mut self, value: u16) {
        self.sp = value;
    }

    #[inline(always)]
    pub fn af(&self) -> u16 {
        ((self.a as u16) << 8) | self.f() as u16
    }

    #[inline(always)]
    pub fn bc(&self) -> u16 {
        ((self.b as u16) << 8) | self.c as u16
    }

    #[inline(always)]
    pub fn f(&self) -> u8 {
        let mut f = 0x0u8;
        if self.zero {
            f |= 0x80;
        }
        if self.sub {
            f |= 0x40;
        }
        if self.half_carry {
            f |= 0x20;
        }
        if self.carry {
            f |= 0x10;
        }
        f
    }

    #[inline(always)]
    pub fn set_f(&mut self, value: u8) {
        self.zero = value & 0x80 == 0x80;
        self.sub = value & 0x40 == 0x40;
        self.half_carry = value & 0x20 == 0x20;
        self.carry = value & 0x10 == 0x10;
    }

    #[inline(always)]
    pub fn set_af(&mut self, value: u16) {
        self.a = (value >> 8) as u8;
        self.set_f(value as u8);
    }

    #[inline(always)]
    pub fn set_bc(&mut self, value: u16) {
        self.b = (value >> 8) as u8;
        self.c = value as u8;
    }

    #[inline(always)]
    pub fn de(&self) -> u16 {
        ((self.d as u16) << 8) | self.e as u16
    }

    #[inline(always)]
    pub fn set_de(&mut self, value: u16) {
        self.d = (value >> 8) as u8;
        self.e = value as u8;
    }

    #[inline(always)]
    pub fn hl(&self) -> u16 {
        ((self.h as u16) << 8) | self.l as u16
    }

    #[inline(always)]
    pub fn set_hl(&mut self, value: u16) {
        self.h = (value >> 8) as u8;
        self.l = value as u8;
    }

    #[inline(always)]
    pub fn ime(&self) -> bool {
        self.ime
    }

    #[inline(always)]
    pub fn set_ime(&mut self, value: bool) {
        self.ime = value;
    }

    #[inline(always)]
    pub fn read_u8(&mut self) -> u8 {
        let byte = self.mmu.read(self.pc);
        self.pc = self.pc.wrapping_add(1);
        byte
    }

    #[inline(always)]
    pub fn read_u16(&mut self) -> u16 {
        let byte1 = self.read_u8();
        let byte2 = self.read_u8();

        byte1 as u16 | ((byte2 as u16) << 8)
    }

    #[inline(always)]
    pub fn push_byte(&mut self, byte: u8) {
        self.sp = self.sp.wrapping_sub(1);
        self.mmu.write(self.sp, byte);
    }

    #[inline(always)]
    pub fn push_word(&mut self, word: u16) {
        self.push_byte((word >> 8) as u8);
        self.push_byte(word as u8);
    }

    #[inline(always)]
    pub fn pop_byte(&mut self) -> u8 {
        let byte = self.mmu.read(self.sp);
        self.sp = self.sp.wrapping_add(1);
        byte
    }

    #[inline(always)]
    pub fn pop_word(&mut self) -> u16 {
        self.pop_byte() as u16 | ((self.pop_byte() as u16) << 8)
    }

    #[inline(always)]
    pub fn zero(&self) -> bool {
        self.zero
    }

    #[inline(always)]
    pub fn set_zero(&mut self, value: bool) {
        self.zero = value
    }

    #[inline(always)]
    pub fn sub(&self) -> bool {
        self.sub
    }

    #[inline(always)]
    pub fn set_sub(&mut self, value: bool) {
        self.sub = value;
    }

    #[inline(always)]
    pub fn half_carry(&self) -> bool {
        self.half_carry
    }

    #[inline(always)]
    pub fn set_half_carry(&mut self, value: bool) {
        self.half_carry = value
    }

    #[inline(always)]
    pub fn carry(&self) -> bool {
        self.carry
    }

    #[inline(always)]
    pub fn set_carry(&mut self, value: bool) {
        self.carry = value;
    }

    /// Handles the HALT instruction, the CPU is stalled until the
    /// next interrupt unless the HALT bug conditions are met (IME
    /// unset with an enabled interrupt already pending), in which
    /// case execution continues with a broken PC increment.
    #[inline(always)]
    pub fn halt(&mut self) {
        let pending = self.mmu.read(IF_ADDR) & self.mmu.ie & 0x1f;
        if !self.ime && pending != 0 {
            self.halt_bug = true;
        } else {
            self.halted = true;
        }
    }

    /// Handles the STOP instruction, performing the speed switch
    /// in case one is armed through KEY1 (CGB) and stalling the
    /// CPU until joypad activity otherwise.
    #[inline(always)]
    pub fn stop(&mut self) {
        if self.mmu.switching {
            self.mmu.switch_speed();
        } else {
            self.stopped = true;
        }
    }

    /// Arms the delayed IME enable used by the EI instruction,
    /// the master enable flag is only set after the instruction
    /// that follows.
    #[inline(always)]
    pub fn enable_int(&mut self) {
        self.ei_delay = 2;
    }

    #[inline(always)]
    pub fn disable_int(&mut self) {
        self.ime = false;
        self.ei_delay = 0;
    }

    pub fn description(&self, inst: &Instruction, inst_pc: u16) -> String {
        let (_, inst_time, inst_str) = inst;
        let title_str: String = format!("[0x{inst_pc:04x}] {inst_str}");
        let inst_time_str = format!("({inst_time} cycles)");
        let registers_str = format!("[PC=0x{:04x} SP=0x{:04x}] [A=0x{:02x} B=0x{:02x} C=0x{:02x} D=0x{:02x} E=0x{:02x} H=0x{:02x} L=0x{:02x}]",
        self.pc, self.sp, self.a, self.b, self.c, self.d, self.e, self.h, self.l);
        format!("{title_str: <24} {inst_time_str: <11} {registers_str: <10}")
    }

    pub fn description_default(&self) -> String {
        let (inst, _) = self.fetch(self.ppc, false);
        self.description(inst, self.ppc)
    }
}

impl StateComponent for Cpu {
    fn state(&self) -> Result<Vec<u8>, Error> {
        let mut cursor = Cursor::new(vec![]);
        write_u16(&mut cursor, self.pc)?;
        write_u16(&mut cursor, self.sp)?;
        write_u8(&mut cursor, self.a)?;
        write_u8(&mut cursor, self.b)?;
        write_u8(&mut cursor, self.c)?;
        write_u8(&mut cursor, self.d)?;
        write_u8(&mut cursor, self.e)?;
        write_u8(&mut cursor, self.h)?;
        write_u8(&mut cursor, self.l)?;
        write_u8(&mut cursor, self.f())?;
        write_u8(&mut cursor, self.ime as u8)?;
        write_u8(&mut cursor, self.halted as u8)?;
        write_u8(&mut cursor, self.stopped as u8)?;
        write_u8(&mut cursor, self.halt_bug as u8)?;
        write_u8(&mut cursor, self.ei_delay)?;
        write_u8(&mut cursor, self.crashed as u8)?;
        write_u8(&mut cursor, self.cycles)?;
        write_u16(&mut cursor, self.ppc)?;
        Ok(cursor.into_inner())
    }

    fn set_state(&mut self, data: &[u8]) -> Result<(), Error> {
        let mut cursor = Cursor::new(data);
        self.pc = read_u16(&mut cursor)?;
        self.sp = read_u16(&mut cursor)?;
        self.a = read_u8(&mut cursor)?;
        self.b = read_u8(&mut cursor)?;
        self.c = read_u8(&mut cursor)?;
        self.d = read_u8(&mut cursor)?;
        self.e = read_u8(&mut cursor)?;
        self.h = read_u8(&mut cursor)?;
        self.l = read_u8(&mut cursor)?;
        let f = read_u8(&mut cursor)?;
        self.set_f(f);
        self.ime = read_u8(&mut cursor)? != 0;
        self.halted = read_u8(&mut cursor)? != 0;
        self.stopped = read_u8(&mut cursor)? != 0;
        self.halt_bug = read_u8(&mut cursor)? != 0;
        self.ei_delay = read_u8(&mut cursor)?;
        self.crashed = read_u8(&mut cursor)? != 0;
        self.cycles = read_u8(&mut cursor)?;
        self.ppc = read_u16(&mut cursor)?;
        Ok(())
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Cpu::new(Mmu::default())
    }
}

impl Display for Cpu {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description_default())
    }
}

#[cfg(test)]
mod tests {
    use crate::{consts::IF_ADDR, state::StateComponent};

    use super::Cpu;

    fn build_cpu() -> Cpu {
        let mut cpu = Cpu::default();
        cpu.boot();
        cpu.mmu.allocate_default();
        cpu
    }

    #[test]
    fn test_cpu_clock() {
        let mut cpu = build_cpu();

        // test NOP instruction
        cpu.pc = 0xc000;
        cpu.mmu.write(0xc000, 0x00);
        let cycles = cpu.clock();
        assert_eq!(cycles, 4);
        assert_eq!(cpu.pc, 0xc001);

        // test LD A, d8 instruction
        cpu.pc = 0xc000;
        cpu.mmu.write(0xc000, 0x3e);
        cpu.mmu.write(0xc001, 0x42);
        let cycles = cpu.clock();
        assert_eq!(cycles, 8);
        assert_eq!(cpu.pc, 0xc002);
        assert_eq!(cpu.a, 0x42);

        // test LD (HL+), A instruction
        cpu.pc = 0xc000;
        cpu.mmu.write(0xc000, 0x22);
        cpu.set_hl(0xc000);
        let cycles = cpu.clock();
        assert_eq!(cycles, 8);
        assert_eq!(cpu.pc, 0xc001);
        assert_eq!(cpu.hl(), 0xc001);
        assert_eq!(cpu.mmu.read(cpu.hl()), 0x42);

        // test INC A instruction
        cpu.pc = 0xc000;
        cpu.mmu.write(0xc000, 0x3c);
        cpu.a = 0x42;
        let cycles = cpu.clock();
        assert_eq!(cycles, 4);
        assert_eq!(cpu.pc, 0xc001);
        assert_eq!(cpu.a, 0x43);

        // test JR n instruction
        cpu.pc = 0xc000;
        cpu.mmu.write(0xc000, 0x18);
        cpu.mmu.write(0xc001, 0x03);
        let cycles = cpu.clock();
        assert_eq!(cycles, 12);
        assert_eq!(cpu.pc, 0xc005);

        // test prefixed SWAP A instruction
        cpu.pc = 0xc000;
        cpu.mmu.write(0xc000, 0xcb);
        cpu.mmu.write(0xc001, 0x37);
        cpu.a = 0xa5;
        let cycles = cpu.clock();
        assert_eq!(cycles, 8);
        assert_eq!(cpu.pc, 0xc002);
        assert_eq!(cpu.a, 0x5a);
    }

    #[test]
    fn test_taken_branch_bonus() {
        let mut cpu = build_cpu();

        cpu.pc = 0xc000;
        cpu.mmu.write(0xc000, 0x20);
        cpu.mmu.write(0xc001, 0x03);

        cpu.set_zero(true);
        let cycles = cpu.clock();
        assert_eq!(cycles, 8);
        assert_eq!(cpu.pc, 0xc002);

        cpu.pc = 0xc000;
        cpu.set_zero(false);
        let cycles = cpu.clock();
        assert_eq!(cycles, 12);
        assert_eq!(cpu.pc, 0xc005);
    }

    #[test]
    fn test_interrupt_service() {
        let mut cpu = build_cpu();

        cpu.pc = 0xc000;
        cpu.sp = 0xd000;
        cpu.set_ime(true);
        cpu.mmu.ie = 0x04;
        cpu.mmu.timer().set_int_tima(true);

        let cycles = cpu.clock();
        assert_eq!(cycles, 20);
        assert_eq!(cpu.pc, 0x0050);
        assert!(!cpu.ime());
        assert!(!cpu.mmu.timer_i().int_tima());

        // the old PC must have been pushed to the stack
        assert_eq!(cpu.mmu.read(0xcffe), 0x00);
        assert_eq!(cpu.mmu.read(0xcfff), 0xc0);
    }

    #[test]
    fn test_ei_delay() {
        let mut cpu = build_cpu();

        cpu.pc = 0xc000;
        cpu.mmu.write(0xc000, 0xfb);
        cpu.mmu.write(0xc001, 0x00);
        cpu.mmu.ie = 0x04;
        cpu.mmu.timer().set_int_tima(true);

        // EI executes, IME is still unset
        cpu.clock();
        assert!(!cpu.ime());

        // the instruction after EI still executes normally
        cpu.clock();
        assert!(cpu.ime());
        assert_eq!(cpu.pc, 0xc002);

        // only now the pending interrupt is serviced
        cpu.clock();
        assert_eq!(cpu.pc, 0x0050);
    }

    #[test]
    fn test_halt_bug() {
        let mut cpu = build_cpu();

        // LD A, 0x00; HALT; INC A; INC A with a pending (enabled)
        // interrupt and IME unset, the first INC A runs twice
        cpu.pc = 0xc000;
        cpu.mmu.write(0xc000, 0x3e);
        cpu.mmu.write(0xc001, 0x00);
        cpu.mmu.write(0xc002, 0x76);
        cpu.mmu.write(0xc003, 0x3c);
        cpu.mmu.write(0xc004, 0x3c);

        cpu.set_ime(false);
        cpu.mmu.ie = 0x04;
        cpu.mmu.timer().set_int_tima(true);

        cpu.clock();
        assert_eq!(cpu.a, 0x00);

        cpu.clock();
        assert!(!cpu.halted());

        cpu.clock();
        assert_eq!(cpu.a, 0x01);
        assert_eq!(cpu.pc, 0xc003);

        cpu.clock();
        assert_eq!(cpu.a, 0x02);
        assert_eq!(cpu.pc, 0xc004);

        cpu.clock();
        assert_eq!(cpu.a, 0x03);
        assert_eq!(cpu.pc, 0xc005);
    }

    #[test]
    fn test_halt_wakes_on_interrupt() {
        let mut cpu = build_cpu();

        cpu.pc = 0xc000;
        cpu.mmu.write(0xc000, 0x76);
        cpu.mmu.write(0xc001, 0x3c);

        cpu.clock();
        assert!(cpu.halted());

        // while halted only idle cycles are billed
        assert_eq!(cpu.clock(), 4);
        assert!(cpu.halted());

        // a pending interrupt with IME unset releases the halt
        // and resumes execution at the next instruction
        cpu.mmu.ie = 0x04;
        cpu.mmu.timer().set_int_tima(true);
        cpu.clock();
        assert!(!cpu.halted());
        assert_eq!(cpu.a, 0x02);
        assert_eq!(cpu.pc, 0xc002);
    }

    #[test]
    fn test_illegal_opcode_crashes() {
        let mut cpu = build_cpu();

        cpu.pc = 0xc000;
        cpu.mmu.write(0xc000, 0xd3);
        cpu.clock();
        assert!(cpu.crashed());

        // once crashed the CPU stops fetching instructions
        let pc = cpu.pc;
        assert_eq!(cpu.clock(), 4);
        assert_eq!(cpu.pc, pc);
    }

    #[test]
    fn test_state_and_set_state() {
        let mut cpu = Cpu::default();
        cpu.pc = 0x1234;
        cpu.sp = 0x5678;
        cpu.a = 0x9a;
        cpu.b = 0xbc;
        cpu.c = 0xde;
        cpu.d = 0xf0;
        cpu.e = 0x12;
        cpu.h = 0x34;
        cpu.l = 0x56;
        cpu.set_ime(true);
        cpu.set_f(0xa0);
        cpu.set_halted(true);
        cpu.ppc = 0x9abc;

        let state = cpu.state().unwrap();

        let mut new_cpu = Cpu::default();
        new_cpu.set_state(&state).unwrap();

        assert_eq!(new_cpu.pc, 0x1234);
        assert_eq!(new_cpu.sp, 0x5678);
        assert_eq!(new_cpu.a, 0x9a);
        assert_eq!(new_cpu.b, 0xbc);
        assert_eq!(new_cpu.c, 0xde);
        assert_eq!(new_cpu.d, 0xf0);
        assert_eq!(new_cpu.e, 0x12);
        assert_eq!(new_cpu.h, 0x34);
        assert_eq!(new_cpu.l, 0x56);
        assert!(new_cpu.ime());
        assert_eq!(new_cpu.f(), 0xa0);
        assert!(new_cpu.halted());
        assert_eq!(new_cpu.ppc, 0x9abc);
    }
}
