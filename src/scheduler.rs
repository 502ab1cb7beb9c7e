use crate::cpu::{Bus, CpuCore};
use crate::display::{Renderer, Surface};
use crate::error::LoadError;
use crate::keypad::Keypad;
use crate::loader::{PendingLoad, RomLoader};
use crate::sound::{AudioBackend, AudioDevice};
use log::{error, info, trace};
use std::io;
use std::time::{Duration, Instant};

/// cycles per second when nothing else is configured
pub const DEFAULT_CYCLE_HZ: u32 = 60;

/// why there's no core to run yet
#[derive(Debug)]
pub enum Idle {
    /// nothing asked for
    Empty,
    Loading(PendingLoad),
    Failed(LoadError),
}

pub enum CoreState<C> {
    Idle(Idle),
    Running { core: C, path: String },
}

/// what one scheduler step did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// no core; nothing to cycle
    Idle,
    /// core present but the interval hasn't elapsed
    Waiting,
    Cycled,
}

/// the run loop's context: owns the core and every device it talks to. the
/// host calls `step` once per display refresh; at most one cycle runs per
/// step, and only once a full interval has passed since the last one
pub struct FrameScheduler<C: CpuCore, B: AudioBackend, S: Surface> {
    state: CoreState<C>,
    keypad: Keypad,
    audio: AudioDevice<B>,
    renderer: Renderer<S>,
    loader: RomLoader,
    interval: Duration,
    last_cycle: Instant,
}

impl<C: CpuCore, B: AudioBackend, S: Surface> FrameScheduler<C, B, S> {
    pub fn new(
        loader: RomLoader,
        audio: AudioDevice<B>,
        renderer: Renderer<S>,
        cycle_hz: u32,
        now: Instant,
    ) -> Self {
        FrameScheduler {
            state: CoreState::Idle(Idle::Empty),
            keypad: Keypad::new(),
            audio,
            renderer,
            loader,
            interval: Duration::from_secs_f64(1.0 / f64::from(cycle_hz.max(1))),
            last_cycle: now,
        }
    }

    /// ask for a (new) ROM. any running core is dropped and any earlier load
    /// is abandoned; the scheduler stays idle until this one resolves
    pub fn load(&mut self, path: &str) -> io::Result<()> {
        if matches!(self.state, CoreState::Running { .. }) {
            info!("dropping running core for reload");
        }
        self.audio.stop();
        self.state = CoreState::Idle(Idle::Loading(self.loader.load(path)));
        let status = self.status();
        self.renderer.show_status(&status)
    }

    /// one host refresh
    pub fn step(&mut self, now: Instant) -> io::Result<Tick> {
        self.poll_load()?;

        let cpu = match &mut self.state {
            CoreState::Running { core, .. } => core,
            CoreState::Idle(_) => return Ok(Tick::Idle),
        };
        if now.saturating_duration_since(self.last_cycle) < self.interval {
            return Ok(Tick::Waiting);
        }

        let mut bus = Bus {
            keypad: &mut self.keypad,
            audio: &mut self.audio,
        };
        cpu.cycle(&mut bus);
        self.last_cycle = now;
        trace!("cycle at {:?}", now);
        self.renderer.render(cpu.framebuffer())?;
        Ok(Tick::Cycled)
    }

    fn poll_load(&mut self) -> io::Result<()> {
        let pending = match &mut self.state {
            CoreState::Idle(Idle::Loading(pending)) => pending,
            _ => return Ok(()),
        };
        let outcome = match pending.poll_core::<C>() {
            Some(outcome) => outcome,
            None => return Ok(()),
        };
        let path = pending.path().to_string();
        self.state = match outcome {
            Ok(core) => {
                info!("{} loaded; running", path);
                CoreState::Running { core, path }
            }
            Err(e) => {
                error!("{}", e);
                CoreState::Idle(Idle::Failed(e))
            }
        };
        let status = self.status();
        self.renderer.show_status(&status)
    }

    pub fn status(&self) -> String {
        match &self.state {
            CoreState::Idle(Idle::Empty) => "no rom".to_string(),
            CoreState::Idle(Idle::Loading(pending)) => format!("loading {}", pending.path()),
            CoreState::Idle(Idle::Failed(e)) => format!("load failed: {} (F5 retries)", e),
            CoreState::Running { path, .. } => format!("running {}", path),
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, CoreState::Running { .. })
    }

    pub fn core(&self) -> Option<&C> {
        match &self.state {
            CoreState::Running { core, .. } => Some(core),
            CoreState::Idle(_) => None,
        }
    }

    pub fn last_error(&self) -> Option<&LoadError> {
        match &self.state {
            CoreState::Idle(Idle::Failed(e)) => Some(e),
            _ => None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn keypad(&self) -> &Keypad {
        &self.keypad
    }

    pub fn keypad_mut(&mut self) -> &mut Keypad {
        &mut self.keypad
    }

    pub fn audio(&self) -> &AudioDevice<B> {
        &self.audio
    }

    pub fn renderer(&self) -> &Renderer<S> {
        &self.renderer
    }
}
