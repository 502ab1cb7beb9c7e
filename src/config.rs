use crate::display::DEFAULT_SCALE;
use crate::scheduler::DEFAULT_CYCLE_HZ;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// CHIP-8 host for the terminal
#[derive(Parser, Debug, Clone)]
#[command(name = "chip8", version, about)]
pub struct Config {
    /// ROM image to load
    #[arg(value_name = "ROM")]
    pub rom: String,

    /// no sound; skips opening the PC speaker
    #[arg(long)]
    pub mute: bool,

    /// CPU cycles per second
    #[arg(long, default_value_t = DEFAULT_CYCLE_HZ, value_parser = clap::value_parser!(u32).range(1..))]
    pub hz: u32,

    /// host refreshes per second. keep it a multiple of `--hz`: refreshing at
    /// the cycle rate loses cycles whenever a refresh lands a little early
    #[arg(long, default_value_t = 120, value_parser = clap::value_parser!(u32).range(1..))]
    pub refresh: u32,

    /// surface pixels per CHIP-8 pixel
    #[arg(long, default_value_t = DEFAULT_SCALE, value_parser = clap::value_parser!(u32).range(1..=64))]
    pub scale: u32,

    /// how long a key stays down on terminals that don't report releases
    #[arg(long, default_value_t = 150)]
    pub key_hold_ms: u64,

    /// extra attempts when fetching the ROM fails
    #[arg(long, default_value_t = 0)]
    pub retries: u32,

    #[arg(long, default_value_t = 250)]
    pub retry_delay_ms: u64,

    /// write log output here instead of stderr
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

impl Config {
    pub fn key_hold(&self) -> Duration {
        Duration::from_millis(self.key_hold_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn refresh_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.refresh))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let c = Config::try_parse_from(["chip8", "roms/pong.ch8"]).unwrap();
        assert_eq!(c.rom, "roms/pong.ch8");
        assert!(!c.mute);
        assert_eq!(c.hz, 60);
        assert_eq!(c.refresh, 120);
        assert_eq!(c.scale, 10);
        assert_eq!(c.key_hold(), Duration::from_millis(150));
        assert_eq!(c.retries, 0);
        assert!(c.log_file.is_none());
    }

    #[test]
    fn test_overrides() {
        let c = Config::try_parse_from([
            "chip8",
            "--mute",
            "--hz",
            "500",
            "--refresh",
            "240",
            "--retries",
            "3",
            "--log-file",
            "chip8.log",
            "game.ch8",
        ])
        .unwrap();
        assert!(c.mute);
        assert_eq!(c.hz, 500);
        assert_eq!(c.refresh_period(), Duration::from_secs_f64(1.0 / 240.0));
        assert_eq!(c.retries, 3);
        assert_eq!(c.log_file, Some(PathBuf::from("chip8.log")));
    }

    #[test]
    fn test_rom_required() {
        assert!(Config::try_parse_from(["chip8"]).is_err());
    }

    #[test]
    fn test_zero_rate_rejected() {
        assert!(Config::try_parse_from(["chip8", "--hz", "0", "x.ch8"]).is_err());
    }
}
