use crate::error::{InvalidKey, KeyWaitError};
use crossterm::event::KeyCode;
use log::trace;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::oneshot;

/// number of keys on the COSMAC hex keypad
pub const KEY_COUNT: usize = 16;

/// left-hand side of a qwerty keyboard laid out as the 4x4 hex keypad:
///
/// ```text
///   1 2 3 4      1 2 3 C
///   q w e r  ->  4 5 6 D
///   a s d f      7 8 9 E
///   z x c v      A 0 B F
/// ```
const CHIP8_CONVENTIONAL_KEYMAP: [(char, u8); KEY_COUNT] = [
    ('x', 0x00),
    ('1', 0x01),
    ('2', 0x02),
    ('3', 0x03),
    ('q', 0x04),
    ('w', 0x05),
    ('e', 0x06),
    ('a', 0x07),
    ('s', 0x08),
    ('d', 0x09),
    ('z', 0x0a),
    ('c', 0x0b),
    ('4', 0x0c),
    ('r', 0x0d),
    ('f', 0x0e),
    ('v', 0x0f),
];

/// tracks which hex keys are held, and hands out one-shot waits for the next
/// press
pub struct Keypad {
    keys: [bool; KEY_COUNT],
    keymap: HashMap<char, u8>,
    pending: Option<oneshot::Sender<u8>>,
}

impl Keypad {
    pub fn new() -> Self {
        Keypad {
            keys: [false; KEY_COUNT],
            keymap: HashMap::from(CHIP8_CONVENTIONAL_KEYMAP),
            pending: None,
        }
    }

    /// translate a raw key code to a hex key, if it's one of ours
    pub fn map(&self, code: KeyCode) -> Option<u8> {
        match code {
            KeyCode::Char(c) => self.keymap.get(&c.to_ascii_lowercase()).copied(),
            _ => None,
        }
    }

    pub fn on_key_down(&mut self, code: KeyCode) {
        let key = match self.map(code) {
            Some(key) => key,
            None => return,
        };
        self.keys[key as usize] = true;
        if let Some(waiter) = self.pending.take() {
            trace!("key 0x{:x} resolves pending wait", key);
            // receiver may have gone away with its core; nothing to do then
            let _ = waiter.send(key);
        }
    }

    pub fn on_key_up(&mut self, code: KeyCode) {
        if let Some(key) = self.map(code) {
            self.keys[key as usize] = false;
        }
    }

    pub fn is_key_pressed(&self, key: u8) -> Result<bool, InvalidKey> {
        self.keys
            .get(key as usize)
            .copied()
            .ok_or(InvalidKey(key))
    }

    /// arm a wait for the next key press. any wait armed earlier is dropped
    /// and resolves as superseded.
    pub fn request_next_key(&mut self) -> KeyWait {
        let (tx, rx) = oneshot::channel();
        if self.pending.replace(tx).is_some() {
            trace!("re-armed key wait; previous waiter discarded");
        }
        KeyWait { rx }
    }

    pub fn is_waiting(&self) -> bool {
        self.pending.is_some()
    }
}

impl Default for Keypad {
    fn default() -> Self {
        Self::new()
    }
}

/// a pending "next key" request; await it, or poll it from a cycle with
/// `try_key`
#[derive(Debug)]
pub struct KeyWait {
    rx: oneshot::Receiver<u8>,
}

impl KeyWait {
    /// non-blocking check: `Ok(None)` while still waiting
    pub fn try_key(&mut self) -> Result<Option<u8>, KeyWaitError> {
        match self.rx.try_recv() {
            Ok(key) => Ok(Some(key)),
            Err(oneshot::error::TryRecvError::Empty) => Ok(None),
            Err(oneshot::error::TryRecvError::Closed) => Err(KeyWaitError::Superseded),
        }
    }
}

impl Future for KeyWait {
    type Output = Result<u8, KeyWaitError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map_err(|_| KeyWaitError::Superseded)
    }
}
