//! Headless narration backend
//!
//! Fetches narration assets over HTTP and probes them with symphonia to learn
//! their duration. There is no output device: a tokio timer stands in for the
//! playback clock and reports the natural end when the asset would have
//! finished playing.

use super::{AudioBackend, AudioTrack, EndSignal};
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::io::Cursor;
use std::time::Duration;
use symphonia::core::codecs::CODEC_TYPE_NULL;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tokio::task::JoinHandle;
use tracing::debug;

const USER_AGENT: &str = concat!("zoomi-player/", env!("CARGO_PKG_VERSION"));

/// [`AudioBackend`] that downloads assets and plays them on a virtual clock
#[derive(Clone)]
pub struct HttpNarrationBackend {
    http_client: reqwest::Client,
}

impl HttpNarrationBackend {
    pub fn new(timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;

        Ok(Self { http_client })
    }
}

#[async_trait]
impl AudioBackend for HttpNarrationBackend {
    async fn load(&self, url: &str, on_end: EndSignal) -> Result<Box<dyn AudioTrack>> {
        let response = self.http_client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Media(format!("GET {} returned {}", url, status)));
        }

        let bytes = response.bytes().await?.to_vec();
        let extension = url_extension(url);

        let duration = tokio::task::spawn_blocking(move || probe_duration(bytes, extension.as_deref()))
            .await
            .map_err(|e| Error::Internal(format!("Probe task failed: {}", e)))??;

        debug!(url, duration_ms = duration.as_millis() as u64, "Narration loaded");
        Ok(Box::new(ClockedTrack::new(duration, on_end)))
    }
}

/// File extension of the URL path, ignoring query and fragment
fn url_extension(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let file = path.rsplit('/').next()?;
    let (_, ext) = file.rsplit_once('.')?;
    if ext.is_empty() {
        None
    } else {
        Some(ext.to_ascii_lowercase())
    }
}

/// Probe an in-memory asset and return its playing time
pub fn probe_duration(bytes: Vec<u8>, extension: Option<&str>) -> Result<Duration> {
    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = extension {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| Error::Media(format!("Failed to probe format: {}", e)))?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| Error::Media("No audio track found".to_string()))?;

    let track_id = track.id;
    let params = track.codec_params.clone();

    if let (Some(frames), Some(rate)) = (params.n_frames, params.sample_rate) {
        if rate > 0 {
            return Ok(Duration::from_secs_f64(frames as f64 / rate as f64));
        }
    }

    // Containers without a frame count: sum packet durations
    let time_base = params
        .time_base
        .ok_or_else(|| Error::Media("Duration not available".to_string()))?;

    let mut total_ts: u64 = 0;
    loop {
        match format.next_packet() {
            Ok(packet) if packet.track_id() == track_id => total_ts += packet.dur(),
            Ok(_) => {}
            Err(symphonia::core::errors::Error::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => return Err(Error::Media(format!("Failed to read packet: {}", e))),
        }
    }

    let time = time_base.calc_time(total_ts);
    Ok(Duration::from_secs_f64(time.seconds as f64 + time.frac))
}

/// Track whose playback is a timer of the asset's duration
pub struct ClockedTrack {
    duration: Duration,
    on_end: EndSignal,
    clock: Option<JoinHandle<()>>,
}

impl ClockedTrack {
    pub fn new(duration: Duration, on_end: EndSignal) -> Self {
        Self {
            duration,
            on_end,
            clock: None,
        }
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn is_playing(&self) -> bool {
        self.clock.as_ref().is_some_and(|h| !h.is_finished())
    }

    fn halt(&mut self) {
        if let Some(clock) = self.clock.take() {
            clock.abort();
        }
    }
}

impl AudioTrack for ClockedTrack {
    fn play_from_start(&mut self) -> Result<()> {
        self.halt();

        let duration = self.duration;
        let on_end = self.on_end.clone();
        self.clock = Some(tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            on_end.fire();
        }));
        Ok(())
    }

    fn stop(&mut self) {
        self.halt();
    }

    fn unload(&mut self) {
        self.halt();
    }
}

impl Drop for ClockedTrack {
    fn drop(&mut self) {
        self.halt();
    }
}
