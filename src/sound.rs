use crate::error::AudioError;
use beep::beep;
use log::{debug, warn};

/// tone used when the caller doesn't ask for one
pub const DEFAULT_TONE_HZ: u32 = 440;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Waveform {
    Square,
}

/// something that can make tones. mirrors a web-audio style graph: one
/// output node made up-front, oscillators made per tone and wired into it
pub trait AudioBackend {
    type Output;
    type Oscillator: Oscillator<Output = Self::Output>;

    /// create the persistent output node; called exactly once per device
    fn create_output(&mut self) -> Result<Self::Output, AudioError>;

    fn create_oscillator(
        &mut self,
        frequency: u32,
        waveform: Waveform,
    ) -> Result<Self::Oscillator, AudioError>;
}

pub trait Oscillator {
    type Output;

    fn connect(&mut self, output: &Self::Output);
    fn start(&mut self) -> Result<(), AudioError>;
    fn stop(&mut self) -> Result<(), AudioError>;
    fn disconnect(&mut self);
}

/// single-channel tone generator: at most one oscillator sounds at once
pub struct AudioDevice<B: AudioBackend> {
    backend: B,
    output: B::Output,
    active: Option<B::Oscillator>,
}

impl<B: AudioBackend> AudioDevice<B> {
    pub fn new(mut backend: B) -> Result<Self, AudioError> {
        let output = backend.create_output()?;
        Ok(AudioDevice {
            backend,
            output,
            active: None,
        })
    }

    /// start a square-wave tone. does nothing if a tone is already sounding,
    /// even at a different frequency
    pub fn play(&mut self, frequency: Option<u32>) {
        if self.active.is_some() {
            return;
        }
        let frequency = frequency.unwrap_or(DEFAULT_TONE_HZ);
        match self.start_oscillator(frequency) {
            Ok(osc) => {
                debug!("tone on at {} Hz", frequency);
                self.active = Some(osc);
            }
            Err(e) => warn!("couldn't start tone: {}", e),
        }
    }

    pub fn stop(&mut self) {
        if let Some(mut osc) = self.active.take() {
            if let Err(e) = osc.stop() {
                warn!("couldn't stop tone: {}", e);
            }
            osc.disconnect();
            debug!("tone off");
        }
    }

    pub fn is_playing(&self) -> bool {
        self.active.is_some()
    }

    fn start_oscillator(&mut self, frequency: u32) -> Result<B::Oscillator, AudioError> {
        let mut osc = self.backend.create_oscillator(frequency, Waveform::Square)?;
        osc.connect(&self.output);
        if let Err(e) = osc.start() {
            osc.disconnect();
            return Err(e);
        }
        Ok(osc)
    }
}

impl<B: AudioBackend> Drop for AudioDevice<B> {
    fn drop(&mut self) {
        self.stop();
    }
}

/// PC speaker via the `beep` crate. the speaker is inherently a square wave
pub struct BeepBackend {}

/// the speaker itself; there's no mixing to do
pub struct Speaker;

pub struct BeepOscillator {
    pitch: u16,
    connected: bool,
}

impl BeepBackend {
    /// probe the speaker by silencing it
    pub fn open() -> Result<Self, AudioError> {
        beep(0).map_err(|e| AudioError::Unavailable(e.to_string()))?;
        Ok(BeepBackend {})
    }
}

impl AudioBackend for BeepBackend {
    type Output = Speaker;
    type Oscillator = BeepOscillator;

    fn create_output(&mut self) -> Result<Speaker, AudioError> {
        Ok(Speaker)
    }

    fn create_oscillator(
        &mut self,
        frequency: u32,
        waveform: Waveform,
    ) -> Result<BeepOscillator, AudioError> {
        match waveform {
            Waveform::Square => {}
        }
        let pitch = u16::try_from(frequency)
            .map_err(|_| AudioError::Backend(format!("{} Hz is out of range", frequency)))?;
        Ok(BeepOscillator {
            pitch,
            connected: false,
        })
    }
}

impl Oscillator for BeepOscillator {
    type Output = Speaker;

    fn connect(&mut self, _output: &Speaker) {
        self.connected = true;
    }

    fn start(&mut self) -> Result<(), AudioError> {
        // an unconnected oscillator runs but is inaudible
        if self.connected {
            beep(self.pitch).map_err(|e| AudioError::Backend(e.to_string()))?;
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<(), AudioError> {
        if self.connected {
            beep(0).map_err(|e| AudioError::Backend(e.to_string()))?;
        }
        Ok(())
    }

    fn disconnect(&mut self) {
        self.connected = false;
    }
}

/// silent backend for `--mute`
pub struct Mute {}

impl Mute {
    pub fn new() -> Self {
        Mute {}
    }
}

impl Default for Mute {
    fn default() -> Self {
        Self::new()
    }
}

pub struct MuteOscillator;

impl AudioBackend for Mute {
    type Output = ();
    type Oscillator = MuteOscillator;

    fn create_output(&mut self) -> Result<(), AudioError> {
        Ok(())
    }

    fn create_oscillator(&mut self, _: u32, _: Waveform) -> Result<MuteOscillator, AudioError> {
        Ok(MuteOscillator)
    }
}

impl Oscillator for MuteOscillator {
    type Output = ();

    fn connect(&mut self, _: &()) {}

    fn start(&mut self) -> Result<(), AudioError> {
        Ok(())
    }

    fn stop(&mut self) -> Result<(), AudioError> {
        Ok(())
    }

    fn disconnect(&mut self) {}
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// what the recording backend has seen
    #[derive(Debug, Default)]
    pub struct AudioLog {
        pub outputs_created: usize,
        pub oscillators_created: usize,
        /// frequencies of oscillators that are started and not yet stopped
        pub sounding: Vec<u32>,
        pub connected: usize,
    }

    /// backend that writes everything into a shared log
    #[derive(Clone, Default)]
    pub struct RecordingBackend {
        pub log: Rc<RefCell<AudioLog>>,
        pub fail_start: bool,
    }

    pub struct RecordingOscillator {
        log: Rc<RefCell<AudioLog>>,
        frequency: u32,
        connected: bool,
        fail_start: bool,
    }

    impl AudioBackend for RecordingBackend {
        type Output = ();
        type Oscillator = RecordingOscillator;

        fn create_output(&mut self) -> Result<(), AudioError> {
            self.log.borrow_mut().outputs_created += 1;
            Ok(())
        }

        fn create_oscillator(
            &mut self,
            frequency: u32,
            waveform: Waveform,
        ) -> Result<RecordingOscillator, AudioError> {
            assert_eq!(waveform, Waveform::Square);
            self.log.borrow_mut().oscillators_created += 1;
            Ok(RecordingOscillator {
                log: self.log.clone(),
                frequency,
                connected: false,
                fail_start: self.fail_start,
            })
        }
    }

    impl Oscillator for RecordingOscillator {
        type Output = ();

        fn connect(&mut self, _: &()) {
            self.connected = true;
            self.log.borrow_mut().connected += 1;
        }

        fn start(&mut self) -> Result<(), AudioError> {
            if self.fail_start {
                return Err(AudioError::Backend("start refused".into()));
            }
            assert!(self.connected, "started an unconnected oscillator");
            self.log.borrow_mut().sounding.push(self.frequency);
            Ok(())
        }

        fn stop(&mut self) -> Result<(), AudioError> {
            let mut log = self.log.borrow_mut();
            if let Some(pos) = log.sounding.iter().position(|f| *f == self.frequency) {
                log.sounding.remove(pos);
            }
            Ok(())
        }

        fn disconnect(&mut self) {
            if self.connected {
                self.connected = false;
                self.log.borrow_mut().connected -= 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::RecordingBackend;
    use super::*;

    #[test]
    fn test_output_created_once() -> Result<(), AudioError> {
        let backend = RecordingBackend::default();
        let log = backend.log.clone();
        let mut d = AudioDevice::new(backend)?;
        d.play(None);
        d.stop();
        d.play(Some(880));
        d.stop();
        assert_eq!(log.borrow().outputs_created, 1);
        Ok(())
    }

    #[test]
    fn test_play_defaults_to_440() -> Result<(), AudioError> {
        let backend = RecordingBackend::default();
        let log = backend.log.clone();
        let mut d = AudioDevice::new(backend)?;
        d.play(None);
        assert!(d.is_playing());
        assert_eq!(log.borrow().sounding, vec![440]);
        Ok(())
    }

    #[test]
    fn test_play_twice_keeps_first_tone() -> Result<(), AudioError> {
        let backend = RecordingBackend::default();
        let log = backend.log.clone();
        let mut d = AudioDevice::new(backend)?;
        d.play(Some(300));
        d.play(Some(600));
        assert_eq!(log.borrow().oscillators_created, 1);
        assert_eq!(log.borrow().sounding, vec![300]);
        Ok(())
    }

    #[test]
    fn test_stop_releases_oscillator() -> Result<(), AudioError> {
        let backend = RecordingBackend::default();
        let log = backend.log.clone();
        let mut d = AudioDevice::new(backend)?;
        d.play(Some(500));
        d.stop();
        assert!(!d.is_playing());
        assert!(log.borrow().sounding.is_empty());
        assert_eq!(log.borrow().connected, 0);

        // and a fresh tone can follow
        d.play(Some(700));
        assert_eq!(log.borrow().sounding, vec![700]);
        Ok(())
    }

    #[test]
    fn test_stop_without_play() -> Result<(), AudioError> {
        let backend = RecordingBackend::default();
        let log = backend.log.clone();
        let mut d = AudioDevice::new(backend)?;
        d.stop();
        d.stop();
        assert!(!d.is_playing());
        assert_eq!(log.borrow().oscillators_created, 0);
        Ok(())
    }

    #[test]
    fn test_failed_start_leaves_channel_free() -> Result<(), AudioError> {
        let backend = RecordingBackend {
            fail_start: true,
            ..Default::default()
        };
        let log = backend.log.clone();
        let mut d = AudioDevice::new(backend)?;
        d.play(None);
        assert!(!d.is_playing());
        assert_eq!(log.borrow().connected, 0);
        Ok(())
    }

    #[test]
    fn test_drop_silences() -> Result<(), AudioError> {
        let backend = RecordingBackend::default();
        let log = backend.log.clone();
        let mut d = AudioDevice::new(backend)?;
        d.play(None);
        drop(d);
        assert!(log.borrow().sounding.is_empty());
        Ok(())
    }

    #[test]
    fn test_mute_accepts_everything() -> Result<(), AudioError> {
        let mut d = AudioDevice::new(Mute::new())?;
        d.play(None);
        assert!(d.is_playing());
        d.stop();
        assert!(!d.is_playing());
        Ok(())
    }
}
