use crate::cpu::{CpuCore, Framebuffer, Peripherals, CELLS};
use crate::error::LoadError;
use crate::keypad::{KeyWait, KEY_COUNT};
use log::debug;

/// bytes shown on screen at once: one bit per pixel
pub const PAGE_BYTES: usize = CELLS / 8;

/// a core that runs no instructions at all: it shows the image it was built
/// from as a bitmap, one 256-byte page at a time. pressing hex key `k` jumps
/// to page `k` (wrapping), and holding any key sounds the tone. handy for
/// checking display, keypad and audio without an interpreter
pub struct RomViewer {
    rom: Vec<u8>,
    page: usize,
    wait: Option<KeyWait>,
    framebuffer: Framebuffer,
}

impl RomViewer {
    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_count(&self) -> usize {
        (self.rom.len() + PAGE_BYTES - 1) / PAGE_BYTES
    }

    fn paint(&mut self) {
        let start = self.page * PAGE_BYTES;
        let rom = &self.rom;
        for (i, px) in self.framebuffer.iter_mut().enumerate() {
            let byte = rom.get(start + i / 8).copied().unwrap_or(0);
            *px = 1 & (byte >> (7 - i % 8)) == 1;
        }
    }
}

impl CpuCore for RomViewer {
    fn construct(rom: Vec<u8>) -> Result<Self, LoadError> {
        if rom.is_empty() {
            return Err(LoadError::Rejected("nothing to show".into()));
        }
        let mut viewer = RomViewer {
            rom,
            page: 0,
            wait: None,
            framebuffer: [false; CELLS],
        };
        viewer.paint();
        Ok(viewer)
    }

    fn cycle(&mut self, io: &mut dyn Peripherals) {
        match self.wait.as_mut().map(KeyWait::try_key) {
            Some(Ok(None)) => {}
            Some(Ok(Some(key))) => {
                self.page = key as usize % self.page_count();
                debug!("showing page {}", self.page);
                self.wait = None;
            }
            // nothing armed, or someone else re-armed over us
            None | Some(Err(_)) => self.wait = Some(io.request_next_key()),
        }

        let held = (0..KEY_COUNT as u8).any(|k| matches!(io.is_key_pressed(k), Ok(true)));
        if held {
            io.play(None);
        } else {
            io.stop();
        }
        self.paint();
    }

    fn framebuffer(&self) -> &Framebuffer {
        &self.framebuffer
    }
}
