use crossterm::event::{poll, read, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use log::{debug, trace, warn};
use std::collections::HashMap;
use std::io;
use std::time::{Duration, Instant};

/// how long a key counts as held on terminals that never report releases
pub const DEFAULT_KEY_HOLD: Duration = Duration::from_millis(150);

/// what the host should do about a terminal event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputAction {
    KeyDown(KeyCode),
    KeyUp(KeyCode),
    Reload,
    Quit,
}

/// turns raw terminal key events into press/release edges. terminals that
/// don't speak the kitty keyboard protocol only send presses (and repeats as
/// more presses), so until a real release turns up, keys are let go once
/// they've been quiet for `hold`
pub struct KeyTracker {
    held: HashMap<KeyCode, Instant>,
    releases_reported: bool,
    hold: Duration,
}

impl KeyTracker {
    pub fn new(hold: Duration) -> Self {
        KeyTracker {
            held: HashMap::new(),
            releases_reported: false,
            hold,
        }
    }

    pub fn translate(
        &mut self,
        code: KeyCode,
        modifiers: KeyModifiers,
        kind: KeyEventKind,
        now: Instant,
    ) -> Option<InputAction> {
        let code = match code {
            KeyCode::Char(c) => KeyCode::Char(c.to_ascii_lowercase()),
            other => other,
        };
        match (code, kind) {
            (KeyCode::Esc, KeyEventKind::Press) => return Some(InputAction::Quit),
            (KeyCode::Char('c'), KeyEventKind::Press)
                if modifiers.contains(KeyModifiers::CONTROL) =>
            {
                return Some(InputAction::Quit)
            }
            (KeyCode::F(5), KeyEventKind::Press) => return Some(InputAction::Reload),
            _ => {}
        }
        match kind {
            KeyEventKind::Press => match self.held.insert(code, now) {
                Some(_) => None,
                None => Some(InputAction::KeyDown(code)),
            },
            KeyEventKind::Repeat => {
                if let Some(seen) = self.held.get_mut(&code) {
                    *seen = now;
                }
                None
            }
            KeyEventKind::Release => {
                if !self.releases_reported {
                    debug!("terminal reports key releases");
                    self.releases_reported = true;
                }
                self.held.remove(&code).map(|_| InputAction::KeyUp(code))
            }
        }
    }

    /// synthesise releases for keys that have gone quiet
    pub fn expire(&mut self, now: Instant) -> Vec<InputAction> {
        if self.releases_reported {
            return Vec::new();
        }
        let hold = self.hold;
        let stale = self
            .held
            .iter()
            .filter(|(_, seen)| now.saturating_duration_since(**seen) >= hold)
            .map(|(code, _)| *code)
            .collect::<Vec<_>>();
        stale
            .into_iter()
            .map(|code| {
                self.held.remove(&code);
                InputAction::KeyUp(code)
            })
            .collect()
    }
}

/// keyboard input from the controlling terminal, using crossterm. release
/// reporting is asked for by the surface, which owns the alternate screen
pub struct TermInput {
    tracker: KeyTracker,
}

impl TermInput {
    pub fn new(hold: Duration) -> Result<Self, io::Error> {
        terminal::enable_raw_mode()?;
        Ok(TermInput {
            tracker: KeyTracker::new(hold),
        })
    }

    /// drain every waiting terminal event without blocking
    pub fn poll(&mut self, now: Instant) -> Result<Vec<InputAction>, io::Error> {
        let mut actions = Vec::new();
        while poll(Duration::from_millis(0))? {
            match read()? {
                Event::Key(evt) => {
                    if let Some(action) =
                        self.tracker.translate(evt.code, evt.modifiers, evt.kind, now)
                    {
                        actions.push(action);
                    }
                }
                other => trace!("ignoring terminal event {:?}", other),
            }
        }
        actions.extend(self.tracker.expire(now));
        Ok(actions)
    }
}

impl Drop for TermInput {
    fn drop(&mut self) {
        if let Err(e) = terminal::disable_raw_mode() {
            warn!("couldn't leave raw mode: {}", e);
        }
    }
}
