//! The four 16-bit up-counting timers.
//!
//! Each timer either counts prescaled system cycles (÷1, ÷64, ÷256,
//! ÷1024) or, in count-up mode, counts overflows of its predecessor.
//! An overflow reloads the counter, optionally raises the timer's IRQ
//! and feeds the cascade. The cascade is walked by index: timer N+1 is
//! "the next timer" of timer N, there is no back-reference.

use logger::error;
use serde::{Deserialize, Serialize};

use crate::bitwise::Bits;

const PRESCALER_PERIODS: [u32; 4] = [1, 64, 256, 1024];

#[derive(Default, Copy, Clone, Serialize, Deserialize)]
pub struct Timer {
    /// Value loaded into the counter on enable and on overflow.
    pub reload: u16,
    /// The live counter, readable at TMxCNT_L.
    pub counter: u16,
    /// Prescaler selection (0..=3).
    pub prescaler: u8,
    /// Count-up timing: tick on the previous timer's overflow instead of
    /// on prescaled cycles. Ignored on timer 0.
    pub count_up: bool,
    /// Raise the timer's IRQ on overflow.
    pub irq_enable: bool,
    pub enabled: bool,

    prescaler_counter: u32,
}

impl Timer {
    fn set_control(&mut self, value: u8) {
        let was_enabled = self.enabled;
        self.prescaler = value & 0x3;
        self.count_up = value & 0x4 != 0;
        self.irq_enable = value & 0x40 != 0;
        self.enabled = value & 0x80 != 0;

        if !was_enabled && self.enabled {
            self.counter = self.reload;
        }
        self.prescaler_counter = 0;
    }

    fn control(&self) -> u8 {
        self.prescaler
            | (u8::from(self.count_up) << 2)
            | (u8::from(self.irq_enable) << 6)
            | (u8::from(self.enabled) << 7)
    }
}

#[derive(Default)]
pub struct TimersStepOutput {
    /// Overflow IRQ requests for timers 0..=3.
    pub request_irq: [bool; 4],
}

#[derive(Default, Serialize, Deserialize)]
pub struct Timers {
    pub timers: [Timer; 4],
}

impl Timers {
    /// Advance all timers by `cycles` master-clock cycles.
    pub fn step(&mut self, cycles: u32) -> TimersStepOutput {
        let mut output = TimersStepOutput::default();

        for idx in 0..4 {
            let timer = &mut self.timers[idx];
            if !timer.enabled || timer.count_up {
                continue;
            }

            let period = PRESCALER_PERIODS[timer.prescaler as usize];
            timer.prescaler_counter += cycles;
            while self.timers[idx].prescaler_counter >= period {
                self.timers[idx].prescaler_counter -= period;
                Self::tick(&mut self.timers, idx, &mut output);
            }
        }

        output
    }

    /// Increment timer `idx`; on overflow reload, request the IRQ and
    /// tick the next timer if it is enabled and in count-up mode.
    fn tick(timers: &mut [Timer; 4], idx: usize, output: &mut TimersStepOutput) {
        let mut idx = idx;
        loop {
            let timer = &mut timers[idx];
            let (counter, overflowed) = timer.counter.overflowing_add(1);
            timer.counter = counter;

            if !overflowed {
                break;
            }

            timer.counter = timer.reload;
            if timer.irq_enable {
                output.request_irq[idx] = true;
            }

            // Cascade into the next timer in the chain, if any.
            idx += 1;
            if idx >= 4 || !timers[idx].enabled || !timers[idx].count_up {
                break;
            }
        }
    }

    pub fn read_register(&self, address: usize) -> u8 {
        let offset = address - 0x0400_0100;
        let idx = offset / 4;
        match offset % 4 {
            0 => self.timers[idx].counter.get_byte(0),
            1 => self.timers[idx].counter.get_byte(1),
            2 => self.timers[idx].control(),
            3 => 0,
            _ => unreachable!(),
        }
    }

    pub fn write_register(&mut self, address: usize, value: u8) {
        let offset = address - 0x0400_0100;
        if offset >= 16 {
            error(format!("write on unhandled timer register {address:x}"));
            return;
        }

        let idx = offset / 4;
        match offset % 4 {
            // Writes to TMxCNT_L set the reload, not the counter.
            0 => self.timers[idx].reload.set_byte(0, value),
            1 => self.timers[idx].reload.set_byte(1, value),
            2 => self.timers[idx].set_control(value),
            3 => {}
            _ => unreachable!(),
        }
    }
}
