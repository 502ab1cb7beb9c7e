use crate::cpu::CpuCore;
use crate::error::LoadError;
use log::{debug, info, warn};
use std::fs::File;
use std::future::Future;
use std::io::Read;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::thread;
use std::time::Duration;
use tokio::sync::oneshot;

/// somewhere ROM images come from
pub trait Fetch: Send + Sync + 'static {
    fn fetch(&self, path: &str) -> Result<Vec<u8>, LoadError>;
}

/// reads ROM images off the local filesystem
pub struct FileFetch;

impl Fetch for FileFetch {
    fn fetch(&self, path: &str) -> Result<Vec<u8>, LoadError> {
        let fail = |e: std::io::Error| LoadError::Fetch {
            path: path.to_string(),
            message: e.to_string(),
        };
        let mut f = File::open(path).map_err(fail)?;
        let mut buf = Vec::new();
        f.read_to_end(&mut buf).map_err(fail)?;
        Ok(buf)
    }
}

/// fetches ROM images in the background
#[derive(Clone)]
pub struct RomLoader {
    fetch: Arc<dyn Fetch>,
    retries: u32,
    retry_delay: Duration,
}

impl RomLoader {
    pub fn new(fetch: impl Fetch) -> Self {
        RomLoader {
            fetch: Arc::new(fetch),
            retries: 0,
            retry_delay: Duration::from_millis(250),
        }
    }

    /// re-issue a failed fetch up to `retries` more times
    pub fn with_retries(mut self, retries: u32, retry_delay: Duration) -> Self {
        self.retries = retries;
        self.retry_delay = retry_delay;
        self
    }

    /// start fetching `path`. the result turns up on the returned handle;
    /// dropping the handle abandons the load
    pub fn load(&self, path: &str) -> PendingLoad {
        let (tx, rx) = oneshot::channel();
        let fetch = self.fetch.clone();
        let (retries, delay) = (self.retries, self.retry_delay);
        let owned_path = path.to_string();
        let spawned = thread::Builder::new()
            .name("rom-fetch".into())
            .spawn(move || {
                let result = fetch_with_retries(fetch.as_ref(), &owned_path, retries, delay);
                if tx.send(result).is_err() {
                    debug!("load of {} finished after being abandoned", owned_path);
                }
            });
        if let Err(e) = spawned {
            // the sender went down with the closure, so the handle reports
            // the load as abandoned
            warn!("couldn't start fetch thread: {}", e);
        }
        PendingLoad {
            path: path.to_string(),
            rx,
        }
    }
}

fn fetch_with_retries(
    fetch: &dyn Fetch,
    path: &str,
    retries: u32,
    delay: Duration,
) -> Result<Vec<u8>, LoadError> {
    let mut attempt = 0;
    loop {
        let result = fetch.fetch(path).and_then(|bytes| {
            if bytes.is_empty() {
                Err(LoadError::Empty {
                    path: path.to_string(),
                })
            } else {
                Ok(bytes)
            }
        });
        match result {
            Ok(bytes) => {
                info!("fetched {} bytes from {}", bytes.len(), path);
                return Ok(bytes);
            }
            Err(e) if attempt < retries => {
                attempt += 1;
                warn!("{}; retry {} of {}", e, attempt, retries);
                thread::sleep(delay);
            }
            Err(e) => return Err(e),
        }
    }
}

/// an in-flight ROM load
#[derive(Debug)]
pub struct PendingLoad {
    path: String,
    rx: oneshot::Receiver<Result<Vec<u8>, LoadError>>,
}

impl PendingLoad {
    pub fn path(&self) -> &str {
        &self.path
    }

    /// non-blocking: `None` while the fetch is still running, otherwise the
    /// core built from the fetched image
    pub fn poll_core<C: CpuCore>(&mut self) -> Option<Result<C, LoadError>> {
        match self.rx.try_recv() {
            Ok(result) => Some(result.and_then(C::construct)),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(Err(LoadError::Abandoned)),
        }
    }
}

impl Future for PendingLoad {
    type Output = Result<Vec<u8>, LoadError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|r| r.unwrap_or(Err(LoadError::Abandoned)))
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::cpu::{Framebuffer, Peripherals, CELLS};
    use std::io::Write;
    use std::sync::atomic::Ordering;

    struct Image {
        rom: Vec<u8>,
        fb: Framebuffer,
    }

    impl CpuCore for Image {
        fn construct(rom: Vec<u8>) -> Result<Self, LoadError> {
            if rom[0] == 0xff {
                return Err(LoadError::Rejected("bad header".into()));
            }
            Ok(Image {
                rom,
                fb: [false; CELLS],
            })
        }
        fn cycle(&mut self, _io: &mut dyn Peripherals) {}
        fn framebuffer(&self) -> &Framebuffer {
            &self.fb
        }
    }

    fn path_error(path: &str) -> LoadError {
        LoadError::Fetch {
            path: path.into(),
            message: "not found".into(),
        }
    }

    #[test]
    fn test_load_constructs_core() {
        let loader = RomLoader::new(StaticFetch::new(Ok(vec![0x00, 0xe0])));
        let mut pending = loader.load("roms/cls.ch8");
        assert_eq!(pending.path(), "roms/cls.ch8");
        let core: Image = wait_core(&mut pending).unwrap();
        assert_eq!(core.rom, vec![0x00, 0xe0]);
    }

    #[test]
    fn test_empty_image_fails() {
        let loader = RomLoader::new(StaticFetch::new(Ok(Vec::new())));
        let mut pending = loader.load("roms/empty.ch8");
        let result: Result<Image, _> = wait_core(&mut pending);
        assert_eq!(
            result.err(),
            Some(LoadError::Empty {
                path: "roms/empty.ch8".into()
            })
        );
    }

    #[test]
    fn test_fetch_failure_surfaces() {
        let loader = RomLoader::new(StaticFetch::new(Err(path_error("nope"))));
        let mut pending = loader.load("nope");
        let result: Result<Image, _> = wait_core(&mut pending);
        assert_eq!(result.err(), Some(path_error("nope")));
    }

    #[test]
    fn test_core_may_reject_image() {
        let loader = RomLoader::new(StaticFetch::new(Ok(vec![0xff])));
        let mut pending = loader.load("bad");
        let result: Result<Image, _> = wait_core(&mut pending);
        assert!(matches!(result, Err(LoadError::Rejected(_))));
    }

    #[test]
    fn test_retries_then_gives_up() {
        let fetch = StaticFetch::new(Err(path_error("x")));
        let calls = fetch.calls.clone();
        let loader = RomLoader::new(fetch).with_retries(2, Duration::from_millis(1));
        let mut pending = loader.load("x");
        let result: Result<Image, _> = wait_core(&mut pending);
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_pending_until_fetch_completes() {
        let (fetch, release) = GatedFetch::new();
        let loader = RomLoader::new(fetch);
        let mut pending = loader.load("slow");
        assert!(pending.poll_core::<Image>().is_none());
        release.send(Ok(vec![1, 2, 3])).unwrap();
        let core: Image = wait_core(&mut pending).unwrap();
        assert_eq!(core.rom, vec![1, 2, 3]);
    }

    #[test]
    fn test_file_fetch() -> Result<(), std::io::Error> {
        let path = std::env::temp_dir().join(format!("chip8-host-{}.ch8", std::process::id()));
        File::create(&path)?.write_all(&[0x12, 0x00])?;
        let bytes = FileFetch.fetch(path.to_str().unwrap());
        std::fs::remove_file(&path)?;
        assert_eq!(bytes, Ok(vec![0x12, 0x00]));
        Ok(())
    }

    #[test]
    fn test_file_fetch_missing() {
        let result = FileFetch.fetch("/definitely/not/here.ch8");
        assert!(matches!(result, Err(LoadError::Fetch { .. })));
    }

    #[tokio::test]
    async fn test_await_load() {
        let loader = RomLoader::new(StaticFetch::new(Ok(vec![0xa2, 0x2a])));
        assert_eq!(loader.load("any").await, Ok(vec![0xa2, 0x2a]));
    }
}
