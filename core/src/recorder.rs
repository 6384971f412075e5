//! Record/replay transport for deterministic tests.
//!
//! # Design
//! A `Recorder` sits where the client's transport would be. While recording
//! it forwards each request to a real transport and keeps the exchange;
//! while replaying it answers from a cassette on disk and never touches the
//! network. Cassettes are JSON files holding a list of interactions.
//!
//! `Recorder` is a handle around shared state, so a test can give one clone
//! to the client and keep another to call [`Recorder::stop`], which writes
//! the cassette out.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{RecorderError, TransportError};
use crate::http::{HttpRequest, HttpResponse};
use crate::transport::{BoxTransport, Middleware, Transport, UreqTransport};

const CASSETTE_VERSION: u32 = 1;

/// How a `Recorder` treats the network and its cassette.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Replay when the cassette exists, otherwise record a new one.
    RecordOnce,
    /// Always hit the real transport and overwrite the cassette.
    RecordOnly,
    /// Only replay. The cassette must exist.
    ReplayOnly,
    /// Hit the real transport and record nothing.
    Passthrough,
}

/// One recorded request and the response it got.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interaction {
    pub request: HttpRequest,
    pub response: HttpResponse,
}

/// On-disk form of a recording.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cassette {
    pub version: u32,
    pub interactions: Vec<Interaction>,
}

impl Default for Cassette {
    fn default() -> Self {
        Self {
            version: CASSETTE_VERSION,
            interactions: Vec::new(),
        }
    }
}

impl Cassette {
    pub fn load(path: &Path) -> Result<Self, RecorderError> {
        let raw = fs::read_to_string(path).map_err(|source| RecorderError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| RecorderError::Cassette {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), RecorderError> {
        let io_err = |source: std::io::Error| RecorderError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let raw = serde_json::to_string_pretty(self).map_err(|source| RecorderError::Cassette {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, raw).map_err(io_err)
    }
}

/// Decides whether a live request (first) matches a recorded one (second).
pub type Matcher = Box<dyn Fn(&HttpRequest, &HttpRequest) -> bool + Send + Sync>;

/// Matches on method and URL.
pub fn default_matcher(live: &HttpRequest, recorded: &HttpRequest) -> bool {
    live.method == recorded.method && live.url == recorded.url
}

pub struct RecorderOptions {
    /// Cassette path without extension; `.json` is appended.
    pub cassette_name: PathBuf,
    pub mode: Mode,
    /// Transport used when recording. Defaults to a fresh `UreqTransport`.
    pub real_transport: Option<BoxTransport>,
}

impl RecorderOptions {
    pub fn new(cassette_name: impl Into<PathBuf>, mode: Mode) -> Self {
        Self {
            cassette_name: cassette_name.into(),
            mode,
            real_transport: None,
        }
    }

    #[must_use]
    pub fn with_real_transport(mut self, transport: BoxTransport) -> Self {
        self.real_transport = Some(transport);
        self
    }
}

/// The mode a recorder settled on once it knew whether the cassette existed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Activity {
    Recording,
    Replaying,
    Passthrough,
}

struct Tape {
    cassette: Cassette,
    replayed: Vec<bool>,
}

struct Inner {
    path: PathBuf,
    activity: Activity,
    real: RwLock<BoxTransport>,
    real_pinned: bool,
    matcher: RwLock<Matcher>,
    tape: Mutex<Tape>,
}

#[derive(Clone)]
pub struct Recorder {
    inner: Arc<Inner>,
}

impl Recorder {
    pub fn new(options: RecorderOptions) -> Result<Self, RecorderError> {
        let mut path = options.cassette_name.into_os_string();
        path.push(".json");
        let path = PathBuf::from(path);

        let activity = match options.mode {
            Mode::RecordOnce if path.exists() => Activity::Replaying,
            Mode::RecordOnce | Mode::RecordOnly => Activity::Recording,
            Mode::ReplayOnly if path.exists() => Activity::Replaying,
            Mode::ReplayOnly => return Err(RecorderError::MissingCassette(path)),
            Mode::Passthrough => Activity::Passthrough,
        };

        let cassette = match activity {
            Activity::Replaying => Cassette::load(&path)?,
            Activity::Recording | Activity::Passthrough => Cassette::default(),
        };
        debug!(cassette = %path.display(), ?activity, interactions = cassette.interactions.len(), "recorder started");

        let real_pinned = options.real_transport.is_some();
        let real = options
            .real_transport
            .unwrap_or_else(|| Box::new(UreqTransport::default()));

        Ok(Self {
            inner: Arc::new(Inner {
                path,
                activity,
                real: RwLock::new(real),
                real_pinned,
                matcher: RwLock::new(Box::new(default_matcher)),
                tape: Mutex::new(Tape {
                    replayed: vec![false; cassette.interactions.len()],
                    cassette,
                }),
            }),
        })
    }

    pub fn set_matcher<F>(&self, matcher: F)
    where
        F: Fn(&HttpRequest, &HttpRequest) -> bool + Send + Sync + 'static,
    {
        *self.inner.matcher.write() = Box::new(matcher);
    }

    /// Replace the transport used when recording or passing through.
    pub fn set_real_transport(&self, transport: BoxTransport) {
        *self.inner.real.write() = transport;
    }

    /// Middleware that installs the recorder in place of the client's base
    /// transport.
    ///
    /// The base transport becomes the recorder's real transport unless one
    /// was given through [`RecorderOptions::with_real_transport`], in which
    /// case that one is kept and `base` is dropped.
    pub fn middleware(&self) -> Middleware {
        let recorder = self.clone();
        Box::new(move |base| {
            if !recorder.inner.real_pinned {
                recorder.set_real_transport(base);
            }
            Box::new(recorder) as BoxTransport
        })
    }

    pub fn is_recording(&self) -> bool {
        self.inner.activity == Activity::Recording
    }

    pub fn cassette_path(&self) -> &Path {
        &self.inner.path
    }

    pub fn interactions(&self) -> Vec<Interaction> {
        self.inner.tape.lock().cassette.interactions.clone()
    }

    /// Write recorded interactions to the cassette. Does nothing unless
    /// the recorder is recording.
    pub fn stop(&self) -> Result<(), RecorderError> {
        if !self.is_recording() {
            return Ok(());
        }
        let tape = self.inner.tape.lock();
        tape.cassette.save(&self.inner.path)?;
        debug!(
            cassette = %self.inner.path.display(),
            interactions = tape.cassette.interactions.len(),
            "cassette saved"
        );
        Ok(())
    }

    fn replay(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let matcher = self.inner.matcher.read();
        let mut tape = self.inner.tape.lock();
        let Tape { cassette, replayed } = &mut *tape;

        let hit = cassette
            .interactions
            .iter()
            .enumerate()
            .position(|(i, interaction)| !replayed[i] && (*matcher)(request, &interaction.request));

        match hit {
            Some(i) => {
                replayed[i] = true;
                debug!(method = %request.method, url = %request.url, index = i, "replayed interaction");
                Ok(cassette.interactions[i].response.clone())
            }
            None => Err(TransportError::NoMatchingInteraction {
                method: request.method,
                url: request.url.clone(),
            }),
        }
    }

    fn record(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let response = self.inner.real.read().round_trip(request.clone())?;
        debug!(method = %request.method, url = %request.url, status = response.status, "recorded interaction");
        self.inner.tape.lock().cassette.interactions.push(Interaction {
            request,
            response: response.clone(),
        });
        Ok(response)
    }
}

impl Transport for Recorder {
    fn round_trip(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        match self.inner.activity {
            Activity::Replaying => self.replay(&request),
            Activity::Recording => self.record(request),
            Activity::Passthrough => self.inner.real.read().round_trip(request),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::http::HttpMethod;
    use crate::transport::transport_fn;

    fn request(method: HttpMethod, url: &str) -> HttpRequest {
        HttpRequest {
            method,
            url: url.to_string(),
            headers: Vec::new(),
            body: None,
        }
    }

    fn counting_transport(hits: Arc<AtomicUsize>) -> BoxTransport {
        Box::new(transport_fn(move |req: HttpRequest| {
            let n = hits.fetch_add(1, Ordering::SeqCst);
            Ok(HttpResponse {
                status: 200,
                headers: vec![("content-type".to_string(), "text/plain".to_string())],
                body: format!("{} #{n}", req.url).into_bytes(),
            })
        }))
    }

    #[test]
    fn record_once_records_then_replays() {
        let dir = tempfile::tempdir().unwrap();
        let name = dir.path().join("cassettes").join("record_once");
        let hits = Arc::new(AtomicUsize::new(0));

        let recorder = Recorder::new(
            RecorderOptions::new(&name, Mode::RecordOnce).with_real_transport(counting_transport(hits.clone())),
        )
        .unwrap();
        assert!(recorder.is_recording());
        let live = recorder.round_trip(request(HttpMethod::Get, "https://example.com/")).unwrap();
        recorder.stop().unwrap();
        assert!(recorder.cassette_path().exists());
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        let replayer = Recorder::new(
            RecorderOptions::new(&name, Mode::RecordOnce).with_real_transport(counting_transport(hits.clone())),
        )
        .unwrap();
        assert!(!replayer.is_recording());
        let replayed = replayer.round_trip(request(HttpMethod::Get, "https://example.com/")).unwrap();
        assert_eq!(replayed, live);
        assert_eq!(hits.load(Ordering::SeqCst), 1, "replay must not hit the network");
    }

    #[test]
    fn replay_only_requires_cassette() {
        let dir = tempfile::tempdir().unwrap();
        let err = Recorder::new(RecorderOptions::new(dir.path().join("missing"), Mode::ReplayOnly))
            .err()
            .unwrap();
        assert!(matches!(err, RecorderError::MissingCassette(_)));
    }

    #[test]
    fn interactions_replay_once_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let name = dir.path().join("twice");
        let hits = Arc::new(AtomicUsize::new(0));

        let recorder = Recorder::new(
            RecorderOptions::new(&name, Mode::RecordOnly).with_real_transport(counting_transport(hits.clone())),
        )
        .unwrap();
        recorder.round_trip(request(HttpMethod::Get, "https://a.test/")).unwrap();
        recorder.round_trip(request(HttpMethod::Get, "https://a.test/")).unwrap();
        recorder.stop().unwrap();

        let replayer = Recorder::new(RecorderOptions::new(&name, Mode::ReplayOnly)).unwrap();
        let first = replayer.round_trip(request(HttpMethod::Get, "https://a.test/")).unwrap();
        let second = replayer.round_trip(request(HttpMethod::Get, "https://a.test/")).unwrap();
        assert_eq!(first.text(), "https://a.test/ #0");
        assert_eq!(second.text(), "https://a.test/ #1");

        let err = replayer
            .round_trip(request(HttpMethod::Get, "https://a.test/"))
            .unwrap_err();
        assert!(matches!(err, TransportError::NoMatchingInteraction { .. }));
    }

    #[test]
    fn default_matcher_compares_method_and_url() {
        let get = request(HttpMethod::Get, "https://a.test/");
        assert!(default_matcher(&get, &get.clone()));
        assert!(!default_matcher(&get, &request(HttpMethod::Post, "https://a.test/")));
        assert!(!default_matcher(&get, &request(HttpMethod::Get, "https://b.test/")));
    }

    #[test]
    fn method_only_matcher_ignores_host() {
        let dir = tempfile::tempdir().unwrap();
        let name = dir.path().join("method_only");
        let hits = Arc::new(AtomicUsize::new(0));

        let recorder = Recorder::new(
            RecorderOptions::new(&name, Mode::RecordOnly).with_real_transport(counting_transport(hits.clone())),
        )
        .unwrap();
        recorder.round_trip(request(HttpMethod::Get, "https://recorded.test/")).unwrap();
        recorder.stop().unwrap();

        let replayer = Recorder::new(RecorderOptions::new(&name, Mode::ReplayOnly)).unwrap();
        let err = replayer
            .round_trip(request(HttpMethod::Get, "https://other.test/"))
            .unwrap_err();
        assert!(matches!(err, TransportError::NoMatchingInteraction { .. }));

        replayer.set_matcher(|live, recorded| live.method == recorded.method);
        let resp = replayer.round_trip(request(HttpMethod::Get, "https://other.test/")).unwrap();
        assert_eq!(resp.text(), "https://recorded.test/ #0");
    }

    #[test]
    fn passthrough_records_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let name = dir.path().join("passthrough");
        let hits = Arc::new(AtomicUsize::new(0));

        let recorder = Recorder::new(
            RecorderOptions::new(&name, Mode::Passthrough).with_real_transport(counting_transport(hits.clone())),
        )
        .unwrap();
        recorder.round_trip(request(HttpMethod::Get, "https://a.test/")).unwrap();
        recorder.stop().unwrap();

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(recorder.interactions().is_empty());
        assert!(!recorder.cassette_path().exists());
    }

    #[test]
    fn middleware_adopts_base_transport() {
        let dir = tempfile::tempdir().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let recorder = Recorder::new(RecorderOptions::new(dir.path().join("mw"), Mode::RecordOnly)).unwrap();

        let wrapped = (recorder.middleware())(counting_transport(hits.clone()));
        wrapped.round_trip(request(HttpMethod::Post, "https://a.test/")).unwrap();

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        let recorded = recorder.interactions();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].request.method, HttpMethod::Post);
    }

    #[test]
    fn middleware_keeps_explicit_real_transport() {
        let dir = tempfile::tempdir().unwrap();
        let explicit = Arc::new(AtomicUsize::new(0));
        let base = Arc::new(AtomicUsize::new(0));
        let recorder = Recorder::new(
            RecorderOptions::new(dir.path().join("pinned"), Mode::RecordOnly)
                .with_real_transport(counting_transport(explicit.clone())),
        )
        .unwrap();

        let wrapped = (recorder.middleware())(counting_transport(base.clone()));
        wrapped.round_trip(request(HttpMethod::Get, "https://a.test/")).unwrap();

        assert_eq!(explicit.load(Ordering::SeqCst), 1);
        assert_eq!(base.load(Ordering::SeqCst), 0);
        assert_eq!(recorder.interactions().len(), 1);
    }

    #[test]
    fn malformed_cassette_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let name = dir.path().join("broken");
        fs::write(dir.path().join("broken.json"), "{not json").unwrap();

        let err = Recorder::new(RecorderOptions::new(&name, Mode::ReplayOnly)).err().unwrap();
        assert!(matches!(err, RecorderError::Cassette { .. }));
    }
}
