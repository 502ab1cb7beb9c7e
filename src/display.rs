use crate::cpu::{Framebuffer, COLS, ROWS};
use crate::error::HarnessError;
use crossterm::cursor::{Hide, Show};
use crossterm::event::{
    KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
};
use crossterm::execute;
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen};
use log::warn;
use std::io::{self, IsTerminal, Write};
use tui::backend::CrosstermBackend;
use tui::layout::Rect;
use tui::style::{Color, Style};
use tui::symbols::Marker;
use tui::widgets::canvas::{Canvas, Points};
use tui::widgets::{Block, Borders};
use tui::Terminal;

/// side of one CHIP-8 pixel on the surface, unless configured otherwise
pub const DEFAULT_SCALE: u32 = 10;

/// Surface is what the renderer paints on. It should abstract the
/// implementation details, so a variety of kinds of screen would work.
pub trait Surface {
    /// fix the pixel size of the surface; called once at start-up
    fn set_size(&mut self, width: u32, height: u32);

    /// blank the whole surface
    fn clear(&mut self);

    /// paint a filled square/rectangle; anything off the surface is clipped
    fn fill_rect(&mut self, x: u32, y: u32, width: u32, height: u32);

    /// one line of host status, e.g. "loading"
    fn set_status(&mut self, _status: &str) {}

    /// push whatever was painted to the real screen
    fn present(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// paints a framebuffer onto a surface, all of it, every time
pub struct Renderer<S: Surface> {
    surface: S,
    scale: u32,
}

impl<S: Surface> Renderer<S> {
    pub fn new(mut surface: S, scale: u32) -> Self {
        surface.set_size(COLS as u32 * scale, ROWS as u32 * scale);
        Renderer { surface, scale }
    }

    pub fn render(&mut self, framebuffer: &Framebuffer) -> io::Result<()> {
        self.surface.clear();
        for (i, _) in framebuffer.iter().enumerate().filter(|(_, lit)| **lit) {
            let x = (i % COLS) as u32 * self.scale;
            let y = (i / COLS) as u32 * self.scale;
            self.surface.fill_rect(x, y, self.scale, self.scale);
        }
        self.surface.present()
    }

    pub fn show_status(&mut self, status: &str) -> io::Result<()> {
        self.surface.set_status(status);
        self.surface.present()
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }
}

/// plain in-memory monochrome pixels
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    pixels: Vec<bool>,
}

impl PixelBuffer {
    pub fn new(width: u32, height: u32) -> Self {
        PixelBuffer {
            width,
            height,
            pixels: vec![false; (width * height) as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// off-surface reads are unlit
    pub fn get(&self, x: u32, y: u32) -> bool {
        x < self.width && y < self.height && self.pixels[(y * self.width + x) as usize]
    }

    pub fn lit_count(&self) -> usize {
        self.pixels.iter().filter(|p| **p).count()
    }
}

impl Surface for PixelBuffer {
    fn set_size(&mut self, width: u32, height: u32) {
        *self = PixelBuffer::new(width, height);
    }

    fn clear(&mut self) {
        self.pixels.iter_mut().for_each(|p| *p = false);
    }

    fn fill_rect(&mut self, x: u32, y: u32, width: u32, height: u32) {
        let x_end = x.saturating_add(width).min(self.width);
        let y_end = y.saturating_add(height).min(self.height);
        for row in y.min(y_end)..y_end {
            let start = (row * self.width + x.min(x_end)) as usize;
            let end = (row * self.width + x_end) as usize;
            self.pixels[start..end].iter_mut().for_each(|p| *p = true);
        }
    }
}

// store useful metadata about the terminal canvas: cells across, cells down,
// and surface pixels per cell
struct Resolution(usize, usize, usize);

impl Resolution {
    fn x_bounds(&self) -> [f64; 2] {
        [0.0, (self.0 - 1) as f64]
    }

    fn y_bounds(&self) -> [f64; 2] {
        [-1.0 * (self.1 - 1) as f64, 0.0]
    }

    /// one point per cell whose centre pixel is lit, in canvas coords
    fn lit_cells<'a>(
        &self,
        pixels: &'a PixelBuffer,
    ) -> impl std::iter::Iterator<Item = (f64, f64)> + 'a {
        let (w, h, s) = (self.0, self.1, self.2);
        let mut count = w * h;
        std::iter::from_fn(move || {
            while count > 0 {
                count -= 1;
                let (cx, cy) = (count % w, count / w);
                if pixels.get((cx * s + s / 2) as u32, (cy * s + s / 2) as u32) {
                    return Some((
                        cx as f64,         // x
                        -1.0 * cy as f64, // y
                    ));
                }
            }
            None
        })
    }
}

/// switch to the alternate screen, then ask for press/release/repeat
/// reporting. the keyboard flag stack is kept per screen, so the push has to
/// happen on the screen the canvas lives on. returns whether the push worked
fn enter_screen<W: Write>(w: &mut W) -> io::Result<bool> {
    execute!(w, EnterAlternateScreen, Hide)?;
    let flags = KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES
        | KeyboardEnhancementFlags::REPORT_EVENT_TYPES;
    match execute!(w, PushKeyboardEnhancementFlags(flags)) {
        Ok(()) => Ok(true),
        Err(e) => {
            warn!("no key release reporting ({}); falling back to key hold", e);
            Ok(false)
        }
    }
}

/// undo `enter_screen`, popping the flags while still on the alternate screen
fn leave_screen<W: Write>(w: &mut W, flags_pushed: bool) -> io::Result<()> {
    if flags_pushed {
        if let Err(e) = execute!(w, PopKeyboardEnhancementFlags) {
            warn!("couldn't pop keyboard flags: {}", e);
        }
    }
    execute!(w, Show, LeaveAlternateScreen)
}

/// monochrome surface in a terminal, rendered using TUI and Crossterm. one
/// terminal cell shows one CHIP-8 pixel
pub struct TermSurface {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
    resolution: Resolution,
    pixels: PixelBuffer,
    status: String,
    flags_pushed: bool,
}

impl TermSurface {
    pub fn new(scale: u32) -> Result<TermSurface, HarnessError> {
        let mut stdout = io::stdout();
        if !stdout.is_terminal() {
            return Err(HarnessError::Surface(io::Error::new(
                io::ErrorKind::Unsupported,
                "stdout is not a terminal",
            )));
        }
        let flags_pushed = enter_screen(&mut stdout).map_err(HarnessError::Surface)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).map_err(HarnessError::Surface)?;
        terminal.clear().map_err(HarnessError::Surface)?;
        Ok(TermSurface {
            terminal,
            resolution: Resolution(COLS, ROWS, scale.max(1) as usize),
            pixels: PixelBuffer::new(0, 0),
            status: String::new(),
            flags_pushed,
        })
    }
}

impl Drop for TermSurface {
    fn drop(&mut self) {
        if let Err(e) = leave_screen(self.terminal.backend_mut(), self.flags_pushed) {
            warn!("couldn't restore terminal: {}", e);
        }
    }
}

impl Surface for TermSurface {
    fn set_size(&mut self, width: u32, height: u32) {
        self.pixels.set_size(width, height);
    }

    fn clear(&mut self) {
        self.pixels.clear();
    }

    fn fill_rect(&mut self, x: u32, y: u32, width: u32, height: u32) {
        self.pixels.fill_rect(x, y, width, height);
    }

    fn set_status(&mut self, status: &str) {
        self.status = status.to_string();
    }

    fn present(&mut self) -> io::Result<()> {
        let coords = self.resolution.lit_cells(&self.pixels).collect::<Vec<_>>();
        let title = format!("CHIP-8 | {}", self.status);
        let (x_bounds, y_bounds) = (self.resolution.x_bounds(), self.resolution.y_bounds());
        let (w, h) = (self.resolution.0 as u16, self.resolution.1 as u16);

        self.terminal.draw(|f| {
            let size = Rect::new(0, 0, 2 + w, 2 + h).intersection(f.size());
            let canvas = Canvas::default()
                .block(
                    Block::default()
                        .title(title.as_str())
                        .borders(Borders::ALL)
                        .style(Style::default().bg(Color::Black)),
                )
                .x_bounds(x_bounds)
                .y_bounds(y_bounds)
                .marker(Marker::Block)
                .paint(|ctx| {
                    ctx.draw(&Points {
                        coords: &coords,
                        color: Color::White,
                    });
                });
            f.render_widget(canvas, size);
        })?;
        Ok(())
    }
}
