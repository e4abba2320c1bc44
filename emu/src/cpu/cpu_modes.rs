//! # ARM7TDMI CPU Operating Modes
//!
//! The ARM7TDMI has seven operating modes. Five of them are entered
//! automatically when exceptions occur:
//!
//! | Exception          | Mode       | Vector     |
//! |--------------------|------------|------------|
//! | Reset              | Supervisor | 0x00000000 |
//! | Undefined          | Undefined  | 0x00000004 |
//! | Software Interrupt | Supervisor | 0x00000008 |
//! | Prefetch Abort     | Abort      | 0x0000000C |
//! | Data Abort         | Abort      | 0x00000010 |
//! | IRQ                | IRQ        | 0x00000018 |
//! | FIQ                | FIQ        | 0x0000001C |
//!
//! Each exception mode has its own banked R13/R14 and SPSR (FIQ also
//! banks R8-R12), so an exception handler can run without corrupting the
//! interrupted program's stack pointer and return address. See
//! [`RegisterBank`](super::register_bank::RegisterBank).
//!
//! On the GBA, games run in User or System mode, BIOS SWI handlers in
//! Supervisor, and `VBlank`/`HBlank`/timer/DMA/keypad handlers in IRQ mode.
//! FIQ has no external source and is essentially unused.

use serde::{Deserialize, Serialize};

/// The CPU operating mode, stored in bits 0-4 of the CPSR/SPSR.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub enum Mode {
    /// Normal program execution state (unprivileged).
    User = 0b10000,

    /// Fast Interrupt Request mode. Banks R8-R14 so the handler has
    /// scratch registers for free. Not used by GBA games in practice.
    Fiq = 0b10001,

    /// Interrupt Request mode, entered on any hardware IRQ.
    Irq = 0b10010,

    /// Supervisor mode, entered via Reset or the SWI instruction.
    Supervisor = 0b10011,

    /// Abort mode, entered after a failed memory access. On the GBA this
    /// indicates a bug since there is no memory protection.
    Abort = 0b10111,

    /// Undefined instruction mode.
    Undefined = 0b11011,

    /// Privileged mode sharing the User register bank.
    System = 0b11111,
}

impl From<Mode> for u32 {
    fn from(m: Mode) -> Self {
        m as Self
    }
}

impl TryFrom<u32> for Mode {
    type Error = String;

    fn try_from(n: u32) -> Result<Self, Self::Error> {
        match n {
            0b10000 => Ok(Self::User),
            0b10001 => Ok(Self::Fiq),
            0b10010 => Ok(Self::Irq),
            0b10011 => Ok(Self::Supervisor),
            0b10111 => Ok(Self::Abort),
            0b11011 => Ok(Self::Undefined),
            0b11111 => Ok(Self::System),
            _ => Err(String::from("Unexpected value for Mode")),
        }
    }
}
