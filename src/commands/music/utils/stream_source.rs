//! Opening audio streams for tracks.
//!
//! A `StreamOpener` turns a track URL into an `OpenedStream`: the byte stream
//! handed to the playback sink, plus the handle of the process producing it.
//! The guild worker owns the handle and terminates it before anything else
//! is started.

use serenity::async_trait;
use std::fmt;
use std::io::Read;
use std::process::{Child, Command, Stdio};
use tracing::{debug, info, warn};

use super::music_manager::{MusicError, MusicResult};

/// Raw encoded audio read from a streaming process.
pub struct AudioStream {
    reader: Box<dyn Read + Send + Sync>,
}

impl AudioStream {
    pub fn from_reader(reader: impl Read + Send + Sync + 'static) -> Self {
        Self {
            reader: Box::new(reader),
        }
    }

    pub fn into_reader(self) -> Box<dyn Read + Send + Sync> {
        self.reader
    }
}

impl fmt::Debug for AudioStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AudioStream")
    }
}

/// Handle to whatever produces an `AudioStream`.
///
/// `terminate` is fire-and-forget: it must not block waiting for the process
/// to exit, and calling it more than once is harmless.
pub trait ProcessHandle: Send {
    fn terminate(&mut self);
}

/// A freshly opened stream and the handle that owns its producer.
pub struct OpenedStream {
    pub stream: AudioStream,
    pub process: Box<dyn ProcessHandle>,
}

impl fmt::Debug for OpenedStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenedStream")
            .field("stream", &self.stream)
            .finish_non_exhaustive()
    }
}

/// Opens audio streams for track URLs.
#[async_trait]
pub trait StreamOpener: Send + Sync {
    async fn open(&self, url: &str) -> MusicResult<OpenedStream>;
}

/// A spawned `yt-dlp` child whose stdout is being streamed.
pub struct ChildProcess {
    child: Option<Child>,
}

impl ChildProcess {
    pub fn new(child: Child) -> Self {
        Self { child: Some(child) }
    }
}

impl ProcessHandle for ChildProcess {
    fn terminate(&mut self) {
        let Some(mut child) = self.child.take() else {
            return;
        };
        let pid = child.id();
        if let Err(e) = child.kill() {
            // Already exited; only reaping is left to do.
            debug!("kill({}) failed: {}", pid, e);
        }
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(move || {
                    let _ = child.wait();
                });
            }
            Err(_) => {
                let _ = child.try_wait();
            }
        }
        debug!("Terminated stream process {}", pid);
    }
}

impl Drop for ChildProcess {
    fn drop(&mut self) {
        self.terminate();
    }
}

/// Streams the best audio format of a URL through `yt-dlp -o -`.
pub struct YtDlpStreamOpener {
    binary: String,
}

impl YtDlpStreamOpener {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for YtDlpStreamOpener {
    fn default() -> Self {
        Self::new("yt-dlp")
    }
}

#[async_trait]
impl StreamOpener for YtDlpStreamOpener {
    async fn open(&self, url: &str) -> MusicResult<OpenedStream> {
        info!("Opening stream for {}", url);

        let mut child = Command::new(&self.binary)
            .args([url, "-o", "-", "-f", "bestaudio", "--no-playlist", "-q"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| MusicError::OpenFailed(format!("failed to spawn {}: {}", self.binary, e)))?;

        let Some(stdout) = child.stdout.take() else {
            let mut process = ChildProcess::new(child);
            process.terminate();
            warn!("{} started without a stdout pipe", self.binary);
            return Err(MusicError::OpenFailed("no stdout pipe".to_string()));
        };

        Ok(OpenedStream {
            stream: AudioStream::from_reader(stdout),
            process: Box::new(ChildProcess::new(child)),
        })
    }
}
