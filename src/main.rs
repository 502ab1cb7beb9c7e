use std::error::Error;
use std::fs::File;
use std::time::Instant;

use chip8_host::config::Config;
use chip8_host::display::{Renderer, TermSurface};
use chip8_host::environment::Environment;
use chip8_host::error::HarnessError;
use chip8_host::input::TermInput;
use chip8_host::loader::{FileFetch, RomLoader};
use chip8_host::scheduler::FrameScheduler;
use chip8_host::sound::{AudioBackend, AudioDevice, BeepBackend, Mute};
use chip8_host::viewer::RomViewer;
use clap::Parser;

fn main() -> Result<(), Box<dyn Error>> {
    let config = Config::parse();
    init_logging(&config)?;

    // a missing audio backend is fatal, so find out before touching the
    // terminal
    if config.mute {
        run(&config, Mute::new())?;
    } else {
        run(&config, BeepBackend::open()?)?;
    }
    Ok(())
}

fn run<B: AudioBackend>(config: &Config, backend: B) -> Result<(), HarnessError> {
    let audio = AudioDevice::new(backend)?;
    let input = TermInput::new(config.key_hold())?;
    let renderer = Renderer::new(TermSurface::new(config.scale)?, config.scale);
    let loader = RomLoader::new(FileFetch).with_retries(config.retries, config.retry_delay());
    let scheduler: FrameScheduler<RomViewer, B, TermSurface> =
        FrameScheduler::new(loader, audio, renderer, config.hz, Instant::now());

    let mut env = Environment::new(scheduler, input, config.rom.clone(), config.refresh_period());
    env.main_loop()?;
    Ok(())
}

fn init_logging(config: &Config) -> Result<(), Box<dyn Error>> {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if let Some(path) = &config.log_file {
        let file = File::create(path)?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }
    builder.init();
    Ok(())
}
