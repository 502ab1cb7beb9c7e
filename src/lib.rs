//! CHIP-8 host harness for the terminal.
//!
//! ## Design
//!
//! * the interpreter is somebody else's problem: the harness drives anything
//!   implementing `cpu::CpuCore`, and the core reaches the host only through
//!   `cpu::Peripherals`
//! * one cycle per display refresh at most, paced to a target rate; the
//!   simplification is deliberate, not a timing model of the COSMAC VIP
//! * full redraw of the 64x32 framebuffer after every cycle
//! * abstract the surface, the audio backend and the ROM source, so
//!   alternatives (and test doubles) plug in
//!
//! Model
//!
//! Environment
//!  |-- input (terminal key events -> press/release edges)
//!  `-- scheduler: the context object, owned by the loop
//!       |-- keypad   key state + one-shot "next key" wait
//!       |-- audio    persistent output, at most one oscillator
//!       |-- renderer surface, fixed 64*scale x 32*scale pixels
//!       |-- loader   background fetch -> core construction
//!       `-- state    Idle(Empty | Loading | Failed) -> Running { core, path }
//!
//! Each refresh: drain input, poll any pending load, and if running and a
//! full interval has elapsed, run exactly one cycle and redraw.
pub mod config;
pub mod cpu;
pub mod display;
pub mod environment;
pub mod error;
pub mod input;
pub mod keypad;
pub mod loader;
pub mod scheduler;
pub mod sound;
pub mod viewer;
