use crate::cpu::CpuCore;
use crate::display::Surface;
use crate::error::HarnessError;
use crate::input::{InputAction, TermInput};
use crate::keypad::Keypad;
use crate::scheduler::{FrameScheduler, Tick};
use crate::sound::AudioBackend;
use log::{debug, info};
use std::time::{Duration, Instant};

/// owns the scheduler and the terminal input, and plays the part of the
/// display-refresh callback: once per refresh period it drains input, then
/// steps the scheduler
pub struct Environment<C: CpuCore, B: AudioBackend, S: Surface> {
    scheduler: FrameScheduler<C, B, S>,
    input: TermInput,
    rom: String,
    refresh: Duration,
}

/// what the loop should do after an input action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Reload,
    Quit,
}

/// apply one input action to the keypad
pub fn dispatch(keypad: &mut Keypad, action: InputAction) -> Flow {
    match action {
        InputAction::KeyDown(code) => {
            keypad.on_key_down(code);
            Flow::Continue
        }
        InputAction::KeyUp(code) => {
            keypad.on_key_up(code);
            Flow::Continue
        }
        InputAction::Reload => Flow::Reload,
        InputAction::Quit => Flow::Quit,
    }
}

impl<C: CpuCore, B: AudioBackend, S: Surface> Environment<C, B, S> {
    pub fn new(
        scheduler: FrameScheduler<C, B, S>,
        input: TermInput,
        rom: String,
        refresh: Duration,
    ) -> Self {
        Environment {
            scheduler,
            input,
            rom,
            refresh,
        }
    }

    /// load the ROM and run until the user quits
    pub fn main_loop(&mut self) -> Result<(), HarnessError> {
        self.scheduler.load(&self.rom)?;

        let mut next_refresh = Instant::now();
        let mut report_at = next_refresh + Duration::from_secs(1);
        let mut cycles = 0u32;
        loop {
            let now = Instant::now();
            for action in self.input.poll(now)? {
                match dispatch(self.scheduler.keypad_mut(), action) {
                    Flow::Continue => {}
                    Flow::Reload => {
                        info!("reloading {}", self.rom);
                        self.scheduler.load(&self.rom)?;
                    }
                    Flow::Quit => return Ok(()),
                }
            }

            if self.scheduler.step(now)? == Tick::Cycled {
                cycles += 1;
            }
            if now >= report_at {
                debug!("{} cycles in the last second", cycles);
                cycles = 0;
                report_at = now + Duration::from_secs(1);
            }

            // sleep to the next refresh; if we fell behind, don't try to
            // catch up with a burst of refreshes
            next_refresh += self.refresh;
            let now = Instant::now();
            if next_refresh > now {
                spin_sleep::sleep(next_refresh - now);
            } else {
                next_refresh = now;
            }
        }
    }
}
