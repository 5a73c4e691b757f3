//! Media metadata analysis for observations.
//!
//! # Responsibility
//! - Probe attached media files for duration, frame rate and stream presence.
//! - Backfill `media_info` on media observations that predate it.
//!
//! # Invariants
//! - A media file that cannot be analysed is not an error.
//! - A missing analysis tool is an error only when a file must be analysed.

use crate::config::CoreConfig;
use crate::model::project::{MEDIA, PLAYER1, PLAYER2};
use crate::project::migrations::{MigrationContext, OBSERVATIONS};
use crate::project::{ProjectError, ProjectResult};
use log::{debug, info, warn};
use once_cell::sync::OnceCell;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::ffi::OsStr;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

const FFPROBE_PROGRAM: &str = "ffprobe";
const MEDIA_UPDATED_MESSAGE: &str = "The media files information was updated to the new project format.";

/// Metadata extracted from one media file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MediaMetadata {
    /// Duration in seconds.
    pub duration: f64,
    /// Frames per second, `0.0` for audio-only media.
    pub fps: f64,
    pub has_video: bool,
    pub has_audio: bool,
}

/// Source of media metadata.
pub trait MediaAnalyzer {
    /// Analyses `path`.
    ///
    /// Returns `Ok(None)` when the file is missing or cannot be analysed, and
    /// `Err(ProjectError::MediaToolMissing)` when the tool is unavailable.
    fn analyze(&self, path: &Path) -> ProjectResult<Option<MediaMetadata>>;
}

/// Analyzer backed by the `ffprobe` executable.
pub struct FfprobeAnalyzer {
    program: Option<PathBuf>,
    timeout: Duration,
    resolved: OnceCell<PathBuf>,
}

impl FfprobeAnalyzer {
    pub fn new(config: &CoreConfig) -> Self {
        Self {
            program: config.ffprobe_path.clone(),
            timeout: config.probe_timeout,
            resolved: OnceCell::new(),
        }
    }

    fn program(&self) -> ProjectResult<&Path> {
        self.resolved
            .get_or_try_init(|| match &self.program {
                Some(path) if path.is_file() => Ok(path.clone()),
                Some(path) => Err(ProjectError::MediaToolMissing(
                    path.display().to_string(),
                )),
                None => which::which(FFPROBE_PROGRAM)
                    .map_err(|_| ProjectError::MediaToolMissing(FFPROBE_PROGRAM.to_string())),
            })
            .map(PathBuf::as_path)
    }
}

impl MediaAnalyzer for FfprobeAnalyzer {
    fn analyze(&self, path: &Path) -> ProjectResult<Option<MediaMetadata>> {
        let program = self.program()?;
        if !path.is_file() {
            debug!(
                "event=media_probe module=media status=skipped reason=missing_file path={}",
                path.display()
            );
            return Ok(None);
        }

        let args = [
            OsStr::new("-v"),
            OsStr::new("error"),
            OsStr::new("-print_format"),
            OsStr::new("json"),
            OsStr::new("-show_format"),
            OsStr::new("-show_streams"),
            path.as_os_str(),
        ];
        let started_at = Instant::now();
        let stdout = match run_with_timeout(program, &args, self.timeout) {
            Ok(stdout) => stdout,
            Err(reason) => {
                warn!(
                    "event=media_probe module=media status=error duration_ms={} path={} error={}",
                    started_at.elapsed().as_millis(),
                    path.display(),
                    reason
                );
                return Ok(None);
            }
        };

        let metadata = parse_ffprobe_output(&String::from_utf8_lossy(&stdout));
        debug!(
            "event=media_probe module=media status=ok duration_ms={} path={} analysed={}",
            started_at.elapsed().as_millis(),
            path.display(),
            metadata.is_some()
        );
        Ok(metadata)
    }
}

/// Runs `program` and returns its stdout, killing it after `timeout`.
fn run_with_timeout(
    program: &Path,
    args: &[&OsStr],
    timeout: Duration,
) -> Result<Vec<u8>, String> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|err| format!("spawn failed: {err}"))?;

    let Some(mut stdout_pipe) = child.stdout.take() else {
        return Err("stdout not captured".to_string());
    };
    let reader = thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = stdout_pipe.read_to_end(&mut buf);
        buf
    });

    let started_at = Instant::now();
    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                let stdout = reader
                    .join()
                    .map_err(|_| "stdout reader panicked".to_string())?;
                if !status.success() {
                    return Err(format!("exited with {status}"));
                }
                return Ok(stdout);
            }
            Ok(None) if started_at.elapsed() >= timeout => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(format!("timed out after {} ms", timeout.as_millis()));
            }
            Ok(None) => thread::sleep(Duration::from_millis(20)),
            Err(err) => return Err(format!("wait failed: {err}")),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ProbeReport {
    #[serde(default)]
    format: Option<ProbeFormat>,
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    avg_frame_rate: Option<String>,
    r_frame_rate: Option<String>,
    duration: Option<String>,
}

/// Extracts metadata from `ffprobe -print_format json` output.
///
/// Returns `None` when no positive duration can be found.
pub fn parse_ffprobe_output(output: &str) -> Option<MediaMetadata> {
    let report: ProbeReport = serde_json::from_str(output).ok()?;

    let video = report
        .streams
        .iter()
        .find(|stream| stream.codec_type.as_deref() == Some("video"));
    let has_audio = report
        .streams
        .iter()
        .any(|stream| stream.codec_type.as_deref() == Some("audio"));

    let duration = report
        .format
        .as_ref()
        .and_then(|format| format.duration.as_deref())
        .or_else(|| report.streams.iter().find_map(|s| s.duration.as_deref()))
        .and_then(|raw| raw.trim().parse::<f64>().ok())
        .filter(|secs| secs.is_finite() && *secs > 0.0)?;

    let fps = video
        .and_then(|stream| {
            parse_frame_rate(stream.avg_frame_rate.as_deref())
                .or_else(|| parse_frame_rate(stream.r_frame_rate.as_deref()))
        })
        .unwrap_or(0.0);

    Some(MediaMetadata {
        duration,
        fps,
        has_video: video.is_some(),
        has_audio,
    })
}

/// Parses `30000/1001` or `25` frame rates; `0/0` yields `None`.
fn parse_frame_rate(raw: Option<&str>) -> Option<f64> {
    let raw = raw?.trim();
    let rate = match raw.split_once('/') {
        Some((num, den)) => {
            let num = num.trim().parse::<f64>().ok()?;
            let den = den.trim().parse::<f64>().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => raw.parse::<f64>().ok()?,
    };
    (rate.is_finite() && rate > 0.0).then_some(rate)
}

/// Adds `media_info` to media observations lacking it.
pub(crate) fn backfill_media_info(ctx: &mut MigrationContext<'_>) -> ProjectResult<()> {
    let analyzer = ctx.analyzer;
    let mut updated = false;

    if let Some(observations) = ctx.section_mut(OBSERVATIONS) {
        for (obs_id, observation) in observations.iter_mut() {
            let Some(observation) = observation.as_object_mut() else {
                continue;
            };
            let is_media = observation.get("type").and_then(Value::as_str) == Some(MEDIA);
            if !is_media || observation.contains_key("media_info") {
                continue;
            }
            if backfill_observation(obs_id, observation, analyzer)? {
                updated = true;
            }
        }
    }

    if updated {
        ctx.changed = true;
        ctx.message = Some(MEDIA_UPDATED_MESSAGE.to_string());
    }
    Ok(())
}

fn backfill_observation(
    obs_id: &str,
    observation: &mut Map<String, Value>,
    analyzer: &dyn MediaAnalyzer,
) -> ProjectResult<bool> {
    let mut info = MediaInfoMaps::default();
    let player1 = player_files(observation, PLAYER1);
    let player2 = player_files(observation, PLAYER2);
    let mut updated = false;

    for media_path in player1.iter().chain(player2.iter()) {
        match analyzer.analyze(Path::new(media_path))? {
            Some(metadata) => {
                info.insert(media_path, &metadata);
                updated = true;
            }
            None => {
                if player1.len() == 1 && player2.is_empty() {
                    if let Some((length, fps)) = legacy_media_file_info(observation) {
                        info.length.insert(media_path.clone(), Value::from(length));
                        info.fps.insert(media_path.clone(), Value::from(fps));
                        updated = true;
                    }
                }
            }
        }
    }

    observation.insert("media_info".to_string(), info.into_value());
    if updated {
        info!(
            "event=media_info_backfill module=media status=ok observation={} files={}",
            obs_id,
            player1.len() + player2.len()
        );
    }
    Ok(updated)
}

fn player_files(observation: &Map<String, Value>, player: &str) -> Vec<String> {
    observation
        .get("file")
        .and_then(|file| file.get(player))
        .and_then(Value::as_array)
        .map(|files| {
            files
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Duration and fps from a single legacy `media_file_info` entry.
///
/// `video_length` is stored in milliseconds; fps is `0` without `nframe`.
fn legacy_media_file_info(observation: &Map<String, Value>) -> Option<(f64, f64)> {
    let entries = observation.get("media_file_info")?.as_object()?;
    if entries.len() != 1 {
        return None;
    }
    let entry = entries.values().next()?;
    let length = entry.get("video_length")?.as_f64()? / 1000.0;
    let fps = match entry.get("nframe").and_then(Value::as_f64) {
        Some(nframe) if length > 0.0 => nframe / length,
        _ => 0.0,
    };
    Some((length, fps))
}

#[derive(Default)]
struct MediaInfoMaps {
    length: Map<String, Value>,
    fps: Map<String, Value>,
    has_video: Map<String, Value>,
    has_audio: Map<String, Value>,
}

impl MediaInfoMaps {
    fn insert(&mut self, path: &str, metadata: &MediaMetadata) {
        self.length
            .insert(path.to_string(), Value::from(metadata.duration));
        self.fps.insert(path.to_string(), Value::from(metadata.fps));
        self.has_video
            .insert(path.to_string(), Value::Bool(metadata.has_video));
        self.has_audio
            .insert(path.to_string(), Value::Bool(metadata.has_audio));
    }

    fn into_value(self) -> Value {
        let mut info = Map::new();
        info.insert("length".to_string(), Value::Object(self.length));
        info.insert("fps".to_string(), Value::Object(self.fps));
        info.insert("hasVideo".to_string(), Value::Object(self.has_video));
        info.insert("hasAudio".to_string(), Value::Object(self.has_audio));
        Value::Object(info)
    }
}
