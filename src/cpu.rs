//! # cpu
//!
//! The instruction interpreter is not part of this crate. The harness only
//! knows it through `CpuCore`, and the core only reaches the host through
//! `Peripherals`; neither side sees the other's internals.
use crate::error::{InvalidKey, LoadError};
use crate::keypad::{KeyWait, Keypad};
use crate::sound::{AudioBackend, AudioDevice};

pub const COLS: usize = 64;
pub const ROWS: usize = 32;
pub const CELLS: usize = COLS * ROWS;

/// row-major, one bool per pixel
pub type Framebuffer = [bool; CELLS];

/// what a running core may ask of the host during a cycle
pub trait Peripherals {
    fn is_key_pressed(&self, key: u8) -> Result<bool, InvalidKey>;

    /// arm a wait for the next key press; poll or await the result
    fn request_next_key(&mut self) -> KeyWait;

    fn play(&mut self, frequency: Option<u32>);

    fn stop(&mut self);
}

/// the interpreter, seen from outside
pub trait CpuCore: Sized {
    /// build a core from a program image; the image is handed over
    fn construct(rom: Vec<u8>) -> Result<Self, LoadError>;

    /// advance one unit of execution
    fn cycle(&mut self, io: &mut dyn Peripherals);

    fn framebuffer(&self) -> &Framebuffer;
}

/// borrows the host's devices for the length of one cycle
pub struct Bus<'a, B: AudioBackend> {
    pub keypad: &'a mut Keypad,
    pub audio: &'a mut AudioDevice<B>,
}

impl<'a, B: AudioBackend> Peripherals for Bus<'a, B> {
    fn is_key_pressed(&self, key: u8) -> Result<bool, InvalidKey> {
        self.keypad.is_key_pressed(key)
    }

    fn request_next_key(&mut self) -> KeyWait {
        self.keypad.request_next_key()
    }

    fn play(&mut self, frequency: Option<u32>) {
        self.audio.play(frequency)
    }

    fn stop(&mut self) {
        self.audio.stop()
    }
}
