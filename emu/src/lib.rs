//! # Tangerine Emulation Core
//!
//! This crate contains all GBA hardware emulation - no UI code.
//!
//! ## Module Overview
//!
//! | Module    | Description                                    |
//! |-----------|------------------------------------------------|
//! | [`gba`]   | Top-level GBA system (start here)              |
//! | [`cpu`]   | ARM7TDMI processor and instruction sets        |
//! | [`bus`]   | Memory bus connecting CPU to hardware          |
//!
//! ## Quick Start
//!
//! ```ignore
//! use emu::gba::Gba;
//!
//! let rom = std::fs::read("game.gba")?;
//! let bios = std::fs::read("gba_bios.bin")?;
//!
//! let mut gba = Gba::new(Some(bios.try_into()?), rom);
//! loop { gba.step(); }
//! ```
//!
//! ## Architecture
//!
//! See [`gba`] for the stepping model and [`cpu`] for processor details.

#[allow(clippy::cast_possible_truncation)]
#[allow(clippy::cast_sign_loss)]
#[allow(clippy::cast_possible_wrap)]
mod bitwise;

#[allow(clippy::missing_panics_doc)]
#[allow(clippy::cast_lossless)]
pub mod bus;

pub mod cpu;
pub mod gba;
