use std::{
    fmt::Display,
    io::ErrorKind,
    path::{Path, PathBuf},
    time::Duration,
};

use chrono::{DateTime, Local, TimeZone};
use futures::{future, Stream, StreamExt};
use tokio::{
    fs::{File, OpenOptions},
    io::{AsyncWriteExt, BufWriter},
    net::TcpStream,
    sync::watch,
};
use tokio_tungstenite::{
    tungstenite::{self, client::IntoClientRequest, http::HeaderValue, Message},
    MaybeTlsStream, WebSocketStream,
};

use crate::{
    session::{RecordingTarget, SessionState},
    stats::RecordingStatistics,
    status::StreamEndpoint,
    util,
};

/// One inbound event of the media socket, reduced to what the recorder
/// cares about.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Text(String),
    Binary(Vec<u8>),
    Closed(Option<String>),
}

impl StreamEvent {
    /// Control frames yield `None` and are skipped.
    pub fn from_message(msg: Message) -> Option<Self> {
        match msg {
            Message::Text(text) => Some(StreamEvent::Text(text)),
            Message::Binary(data) => Some(StreamEvent::Binary(data)),
            Message::Close(frame) => Some(StreamEvent::Closed(
                frame.map(|f| f.reason.into_owned()),
            )),
            Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => None,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum RecordError {
    #[error("Could not create output directory {0}: {1}")]
    CreateDir(PathBuf, #[source] std::io::Error),
    #[error("Could not open output file {0}: {1}")]
    Open(PathBuf, #[source] std::io::Error),
    #[error("Could not write output file {0}: {1}")]
    Write(PathBuf, #[source] std::io::Error),
}

/// In both variants `path` is `None` when no output file was created.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordingOutcome {
    ClosedNormally {
        path: Option<PathBuf>,
        stats: RecordingStatistics,
    },
    ClosedWithTransportError {
        path: Option<PathBuf>,
        stats: RecordingStatistics,
        error: String,
    },
}

impl RecordingOutcome {
    pub fn path(&self) -> Option<&Path> {
        match self {
            RecordingOutcome::ClosedNormally { path, .. }
            | RecordingOutcome::ClosedWithTransportError { path, .. } => path.as_deref(),
        }
    }

    pub fn stats(&self) -> RecordingStatistics {
        match self {
            RecordingOutcome::ClosedNormally { stats, .. }
            | RecordingOutcome::ClosedWithTransportError { stats, .. } => *stats,
        }
    }
}

/// `<root>/<target>/<target>_<YYYYMMDD_HHMMSS>_<streamId>.ts`
pub fn output_path<Tz: TimeZone>(
    root: &Path,
    target: &RecordingTarget,
    endpoint: &StreamEndpoint,
    at: &DateTime<Tz>,
) -> PathBuf
where
    Tz::Offset: std::fmt::Display,
{
    root.join(target.as_str()).join(format!(
        "{}_{}_{}.ts",
        target,
        util::capture_timestamp(at),
        endpoint.id()
    ))
}

/// Attempts at a free name before giving up on an output path.
const MAX_NAME_ATTEMPTS: u32 = 100;

/// `base` itself, then `<stem>_1.<ext>`, `<stem>_2.<ext>`, ...
fn numbered_path(base: &Path, n: u32) -> PathBuf {
    if n == 0 {
        return base.to_path_buf();
    }
    let stem = base
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match base.extension() {
        Some(ext) => format!("{}_{}.{}", stem, n, ext.to_string_lossy()),
        None => format!("{}_{}", stem, n),
    };
    base.with_file_name(name)
}

/// Output file and counters of one recording attempt. The file is released
/// only through [`RecordingSession::finish`], which consumes the session.
pub struct RecordingSession {
    path: PathBuf,
    file: BufWriter<File>,
    stats: RecordingStatistics,
    state: SessionState,
}

impl RecordingSession {
    pub async fn create(path: impl Into<PathBuf>) -> Result<Self, RecordError> {
        let path = path.into();
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| RecordError::CreateDir(dir.to_path_buf(), e))?;
        }

        // Existing recordings are never reopened.
        for n in 0..MAX_NAME_ATTEMPTS {
            let candidate = numbered_path(&path, n);
            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&candidate)
                .await
            {
                Ok(file) => return Ok(Self::with_file(candidate, file)),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    debug!("{} already exists", candidate.display());
                }
                Err(e) => return Err(RecordError::Open(candidate, e)),
            }
        }

        Err(RecordError::Open(
            path,
            std::io::Error::from(ErrorKind::AlreadyExists),
        ))
    }

    fn with_file(path: PathBuf, file: File) -> Self {
        Self {
            path,
            file: BufWriter::new(file),
            stats: RecordingStatistics::new(),
            state: SessionState::Recording,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn stats(&self) -> RecordingStatistics {
        self.stats
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Append one frame verbatim. Returns true when a progress line is due.
    pub async fn write_frame(&mut self, data: &[u8]) -> Result<bool, RecordError> {
        self.file
            .write_all(data)
            .await
            .map_err(|e| RecordError::Write(self.path.clone(), e))?;
        Ok(self.stats.add_frame(data.len()))
    }

    pub async fn finish(mut self) -> Result<RecordingStatistics, RecordError> {
        self.file
            .shutdown()
            .await
            .map_err(|e| RecordError::Write(self.path.clone(), e))?;
        self.state = SessionState::Closed;

        // Terminate the progress line.
        if self.stats.frames >= crate::stats::PROGRESS_EVERY {
            println!();
        }
        info!(
            "{} Wrote {} frames ({}) to {}",
            self.state,
            self.stats.frames,
            util::format_bytes(self.stats.bytes),
            self.path.display()
        );
        Ok(self.stats)
    }
}

#[derive(Debug, PartialEq)]
enum Termination {
    Closed,
    Shutdown,
    TransportError(String),
}

async fn consume<S, E>(
    events: S,
    session: &mut RecordingSession,
    shutdown: &mut watch::Receiver<bool>,
) -> Result<Termination, RecordError>
where
    S: Stream<Item = Result<StreamEvent, E>>,
    E: Display,
{
    tokio::pin!(events);

    loop {
        let event = tokio::select! {
            event = events.next() => event,
            _ = util::wait_for_shutdown(shutdown) => return Ok(Termination::Shutdown),
        };

        match event {
            None => return Ok(Termination::Closed),
            Some(Ok(StreamEvent::Closed(reason))) => {
                if let Some(reason) = reason.filter(|r| !r.is_empty()) {
                    info!("Server closed the stream: {}", reason);
                }
                return Ok(Termination::Closed);
            }
            Some(Ok(StreamEvent::Text(text))) => info!("{} {}", session.state(), text),
            Some(Ok(StreamEvent::Binary(data))) => {
                if session.write_frame(&data).await? {
                    session.stats().print();
                }
            }
            Some(Err(e)) => {
                error!("Stream error: {}", e);
                return Ok(Termination::TransportError(e.to_string()));
            }
        }
    }
}

/// Drain `events` into `session` until the stream closes, errors or
/// shutdown is requested, then finalise the file.
pub async fn record_events<S, E>(
    mut session: RecordingSession,
    events: S,
    shutdown: &mut watch::Receiver<bool>,
) -> Result<RecordingOutcome, RecordError>
where
    S: Stream<Item = Result<StreamEvent, E>>,
    E: Display,
{
    info!("{} Writing to {}", session.state(), session.path().display());

    let termination = consume(events, &mut session, shutdown).await;
    let path = session.path().to_path_buf();
    let closed = session.finish().await;

    let termination = termination?;
    let stats = closed?;
    Ok(match termination {
        Termination::Closed | Termination::Shutdown => RecordingOutcome::ClosedNormally {
            path: Some(path),
            stats,
        },
        Termination::TransportError(error) => RecordingOutcome::ClosedWithTransportError {
            path: Some(path),
            stats,
            error,
        },
    })
}

/// Records a live broadcast over the media websocket.
pub struct StreamRecorder {
    output_dir: PathBuf,
    origin: String,
    connect_timeout: Duration,
}

impl StreamRecorder {
    pub fn new(
        output_dir: impl Into<PathBuf>,
        origin: impl Into<String>,
        connect_timeout: Duration,
    ) -> Self {
        Self {
            output_dir: output_dir.into(),
            origin: origin.into(),
            connect_timeout,
        }
    }

    async fn connect(
        &self,
        url: &str,
    ) -> Result<WebSocketStream<MaybeTlsStream<TcpStream>>, tungstenite::Error> {
        let mut request = url.into_client_request()?;
        let origin = HeaderValue::from_str(&self.origin)
            .map_err(|e| tungstenite::Error::HttpFormat(e.into()))?;
        request.headers_mut().insert("Origin", origin);

        let (ws, _) = tokio_tungstenite::connect_async(request).await?;
        Ok(ws)
    }

    pub async fn record(
        &self,
        target: &RecordingTarget,
        endpoint: &StreamEndpoint,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<RecordingOutcome, RecordError> {
        let not_started = |error: Option<String>| match error {
            Some(error) => RecordingOutcome::ClosedWithTransportError {
                path: None,
                stats: RecordingStatistics::new(),
                error,
            },
            None => RecordingOutcome::ClosedNormally {
                path: None,
                stats: RecordingStatistics::new(),
            },
        };

        if *shutdown.borrow() {
            return Ok(not_started(None));
        }

        let url = endpoint.stream_url();
        info!("Connecting to {}", url);

        let connected = tokio::select! {
            connected = tokio::time::timeout(self.connect_timeout, self.connect(&url)) => connected,
            _ = util::wait_for_shutdown(&mut shutdown) => {
                info!("Shutdown requested while connecting to {}", url);
                return Ok(not_started(None));
            }
        };
        let ws = match connected {
            Ok(Ok(ws)) => ws,
            Ok(Err(e)) => {
                error!("Could not open stream {}: {}", url, e);
                return Ok(not_started(Some(e.to_string())));
            }
            Err(_) => {
                error!(
                    "Could not open stream {}: no handshake within {}s",
                    url,
                    self.connect_timeout.as_secs()
                );
                return Ok(not_started(Some(format!(
                    "handshake timed out after {:?}",
                    self.connect_timeout
                ))));
            }
        };
        if *shutdown.borrow() {
            return Ok(not_started(None));
        }
        info!("{} Stream connection open", SessionState::Recording);

        let path = output_path(&self.output_dir, target, endpoint, &Local::now());
        let session = RecordingSession::create(path).await?;

        let events = ws.filter_map(|msg| {
            future::ready(match msg {
                Ok(msg) => StreamEvent::from_message(msg).map(Ok),
                Err(e) => Some(Err(e)),
            })
        });
        record_events(session, events, &mut shutdown).await
    }
}
