//! # Banked Registers for Exception Modes
//!
//! When the CPU switches modes, specific registers are physically swapped
//! for private copies: every exception mode gets its own R13/R14 and
//! SPSR, and FIQ additionally banks R8-R12 (hence "Fast" Interrupt
//! Request - the handler gets five scratch registers without saving).
//!
//! This struct is the storage for the copies that are *not* currently
//! visible. [`Arm7tdmi::swap_mode`](super::arm7tdmi::Arm7tdmi::swap_mode)
//! moves values between here and the visible register file.
//!
//! The `_old` fields hold the User/System copies while an exception mode
//! is active.

use serde::{Deserialize, Serialize};

use crate::cpu::psr::Psr;

/// Storage for banked registers across all CPU modes.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct RegisterBank {
    /// R8 value when not in FIQ mode (saved when entering FIQ).
    pub r8_old: u32,
    /// R9 value when not in FIQ mode.
    pub r9_old: u32,
    /// R10 value when not in FIQ mode.
    pub r10_old: u32,
    /// R11 value when not in FIQ mode.
    pub r11_old: u32,
    /// R12 value when not in FIQ mode.
    pub r12_old: u32,
    /// R13 (SP) value when not in an exception mode.
    pub r13_old: u32,
    /// R14 (LR) value when not in an exception mode.
    pub r14_old: u32,

    /// R8 for FIQ mode.
    pub r8_fiq: u32,
    /// R9 for FIQ mode.
    pub r9_fiq: u32,
    /// R10 for FIQ mode.
    pub r10_fiq: u32,
    /// R11 for FIQ mode.
    pub r11_fiq: u32,
    /// R12 for FIQ mode.
    pub r12_fiq: u32,
    /// R13 (SP) for FIQ mode.
    pub r13_fiq: u32,
    /// R14 (LR) for FIQ mode.
    pub r14_fiq: u32,

    /// R13 (SP) for Supervisor mode (SWI handler stack).
    pub r13_svc: u32,
    /// R14 (LR) for Supervisor mode (return address from SWI).
    pub r14_svc: u32,

    /// R13 (SP) for Abort mode.
    pub r13_abt: u32,
    /// R14 (LR) for Abort mode.
    pub r14_abt: u32,

    /// R13 (SP) for IRQ mode (interrupt handler stack).
    pub r13_irq: u32,
    /// R14 (LR) for IRQ mode (return address from interrupt).
    pub r14_irq: u32,

    /// R13 (SP) for Undefined instruction mode.
    pub r13_und: u32,
    /// R14 (LR) for Undefined instruction mode.
    pub r14_und: u32,

    /// SPSR for FIQ mode.
    pub spsr_fiq: Psr,
    /// SPSR for Supervisor mode (saves CPSR when SWI occurs).
    pub spsr_svc: Psr,
    /// SPSR for Abort mode.
    pub spsr_abt: Psr,
    /// SPSR for IRQ mode (saves CPSR when IRQ occurs).
    pub spsr_irq: Psr,
    /// SPSR for Undefined mode.
    pub spsr_und: Psr,
}
