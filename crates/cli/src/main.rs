mod settings;

use std::io::BufRead;
use std::ops::ControlFlow;
use std::path::PathBuf;
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use clap::Parser;

use facelens_core::capture::infrastructure::ffmpeg_camera::FfmpegCamera;
use facelens_core::detection::infrastructure::onnx_face_engine::OnnxFaceEngine;
use facelens_core::pipeline::detection_loop::CycleOutcome;
use facelens_core::pipeline::pipeline_logger::StatsPipelineLogger;
use facelens_core::pipeline::session::Session;
use facelens_core::render::infrastructure::image_surface::ImageSurface;
use facelens_core::render::infrastructure::snapshot_writer::write_snapshot;
use facelens_core::state::application_state::DetectedFace;

use crate::settings::Settings;

const MODEL_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Live webcam face detection, recognition and attribute annotation.
#[derive(Parser)]
#[command(name = "facelens")]
struct Cli {
    /// Directory or URL holding yolo11n-pose_widerface.onnx, w600k_r50.onnx,
    /// genderage.onnx and emotion-ferplus-8.onnx [default: ./models].
    #[arg(long)]
    models: Option<String>,

    /// Directory or URL holding `{label}/{label}.jpg` reference images.
    #[arg(long)]
    images: Option<String>,

    /// Identities to enroll (comma-separated).
    #[arg(long, value_delimiter = ',')]
    labels: Option<Vec<String>>,

    /// Face detection confidence threshold (0.0-1.0).
    #[arg(long)]
    confidence: Option<f64>,

    /// Maximum descriptor distance for a recognition match (0.0-2.0).
    #[arg(long)]
    match_threshold: Option<f64>,

    /// Capture device, e.g. /dev/video0.
    #[arg(long)]
    camera: Option<String>,

    /// Requested capture width.
    #[arg(long)]
    width: Option<u32>,

    /// Requested capture height.
    #[arg(long)]
    height: Option<u32>,

    /// Width of the annotated output surface.
    #[arg(long)]
    container_width: Option<u32>,

    /// Detection loop pacing in cycles per second.
    #[arg(long)]
    fps: Option<f64>,

    /// Stop after this many detection cycles.
    #[arg(long)]
    frames: Option<usize>,

    /// Stop after this many seconds of streaming.
    #[arg(long)]
    seconds: Option<f64>,

    /// Print detected faces as one JSON line whenever they change.
    #[arg(long)]
    json: bool,

    /// Write the last annotated frame to this image file on exit.
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// TrueType font used to draw captions.
    #[arg(long)]
    font: Option<PathBuf>,

    /// Persist the effective settings as the new defaults.
    #[arg(long)]
    save_settings: bool,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let settings = merge(&cli, Settings::load());
    validate(&cli, &settings)?;

    if cli.save_settings {
        let path = settings.save()?;
        log::info!("Settings saved to {}", path.display());
    }

    let engine = OnnxFaceEngine::new().with_progress(download_progress);
    let camera = FfmpegCamera::with_device(settings.camera.clone());
    let mut surface = ImageSurface::new(settings.container_width, settings.height);
    if let Some(font) = &cli.font {
        surface = surface.with_font(font)?;
    }

    let mut session = Session::new(
        settings.session_options(),
        Box::new(engine),
        Box::new(camera),
        Box::new(surface),
    )
    .with_logger(Box::new(StatsPipelineLogger::new()));

    log::info!("Loading models from {}", settings.model_location);
    session.start();
    while !session.wait_for_models(MODEL_POLL_INTERVAL) {}
    eprintln!();
    if let Some(e) = &session.state().model_error {
        log::error!("{e}");
        return Err(e.clone().into());
    }

    session.set_webcam_running(true);
    if let Some(e) = &session.state().detection_error {
        return Err(e.clone().into());
    }

    let stop = Arc::new(AtomicBool::new(false));
    watch_stdin(Arc::clone(&stop));
    log::info!("Streaming; press Enter to stop");
    stream(&mut session, &cli, &stop);

    if let Some(path) = &cli.snapshot {
        write_snapshot(session.surface(), path)?;
        log::info!("Snapshot written to {}", path.display());
    }
    session.detection().logger().summary();
    session.shutdown();
    Ok(())
}

/// Runs the detection loop until `stop` is set or the frame or time limit
/// is reached.
fn stream(session: &mut Session, cli: &Cli, stop: &AtomicBool) {
    let started = Instant::now();
    let limit = cli.seconds.map(Duration::from_secs_f64);
    let mut cycles = 0usize;
    let mut last_faces: Option<Vec<DetectedFace>> = None;

    session.run(stop, |state, outcome| {
        if matches!(
            outcome,
            Some(CycleOutcome::Published(_)) | Some(CycleOutcome::Failed)
        ) {
            cycles += 1;
        }
        if last_faces.as_ref() != Some(&state.detected_faces) {
            report_faces(&state.detected_faces, cli.json);
            last_faces = Some(state.detected_faces.clone());
        }

        let frames_done = cli.frames.is_some_and(|n| cycles >= n);
        let time_done = limit.is_some_and(|l| started.elapsed() >= l);
        if frames_done || time_done || !state.is_webcam_running {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    });
}

/// Sets `stop` once the user enters a line. EOF leaves it untouched so a
/// closed stdin doesn't end the session.
fn watch_stdin(stop: Arc<AtomicBool>) {
    let spawned = thread::Builder::new()
        .name("stdin-watch".to_string())
        .spawn(move || stop_on_input(std::io::stdin().lock(), &stop));
    if let Err(e) = spawned {
        log::warn!("Could not watch stdin, stop with --frames or --seconds: {e}");
    }
}

fn stop_on_input(mut input: impl BufRead, stop: &AtomicBool) {
    let mut line = String::new();
    if let Ok(n) = input.read_line(&mut line) {
        if n > 0 {
            log::info!("Stopping");
            stop.store(true, Ordering::Relaxed);
        }
    }
}

fn report_faces(faces: &[DetectedFace], json: bool) {
    if json {
        match serde_json::to_string(faces) {
            Ok(line) => println!("{line}"),
            Err(e) => log::warn!("Could not serialize faces: {e}"),
        }
        return;
    }
    log::info!("{} face(s) in view", faces.len());
    for face in faces {
        log::info!(
            "  #{} {} ({:.2}) age={} gender={} emotion={}",
            face.id,
            face.name.as_deref().unwrap_or("-"),
            face.confidence,
            face.age.map_or_else(|| "-".to_string(), |a| a.to_string()),
            if face.gender.is_empty() { "-" } else { &face.gender },
            face.emotion.as_deref().unwrap_or("-"),
        );
    }
}

/// Flags override the saved settings for this run.
fn merge(cli: &Cli, mut settings: Settings) -> Settings {
    if let Some(models) = &cli.models {
        settings.model_location = models.clone();
    }
    if let Some(images) = &cli.images {
        settings.enrollment_location = Some(images.clone());
    }
    if let Some(labels) = &cli.labels {
        settings.labels = labels
            .iter()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .collect();
    }
    if let Some(confidence) = cli.confidence {
        settings.min_confidence = confidence;
    }
    if let Some(threshold) = cli.match_threshold {
        settings.match_threshold = threshold;
    }
    if let Some(camera) = &cli.camera {
        settings.camera = camera.clone();
    }
    if let Some(width) = cli.width {
        settings.width = width;
    }
    if let Some(height) = cli.height {
        settings.height = height;
    }
    if let Some(container_width) = cli.container_width {
        settings.container_width = container_width;
    }
    if let Some(fps) = cli.fps {
        settings.paint_rate_hz = fps;
    }
    settings
}

fn validate(cli: &Cli, settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    if !(0.0..=1.0).contains(&settings.min_confidence) {
        return Err(format!(
            "Confidence must be between 0.0 and 1.0, got {}",
            settings.min_confidence
        )
        .into());
    }
    if !(0.0..=2.0).contains(&settings.match_threshold) {
        return Err(format!(
            "Match threshold must be between 0.0 and 2.0, got {}",
            settings.match_threshold
        )
        .into());
    }
    if settings.width == 0 || settings.height == 0 || settings.container_width == 0 {
        return Err(format!(
            "Dimensions must be positive, got {}x{} with container width {}",
            settings.width, settings.height, settings.container_width
        )
        .into());
    }
    if !settings.paint_rate_hz.is_finite() || settings.paint_rate_hz <= 0.0 {
        return Err(format!("FPS must be positive, got {}", settings.paint_rate_hz).into());
    }
    if let Some(seconds) = cli.seconds {
        if !seconds.is_finite() || seconds <= 0.0 {
            return Err(format!("Seconds must be positive, got {seconds}").into());
        }
    }
    if cli.frames == Some(0) {
        return Err("Frames must be at least 1".into());
    }
    if let Some(font) = &cli.font {
        if !font.is_file() {
            return Err(format!("Font file not found: {}", font.display()).into());
        }
    }
    if settings.enrollment_location.is_some() && settings.labels.is_empty() {
        log::warn!("Reference images given without --labels; recognition is disabled");
    }
    Ok(())
}

fn download_progress(name: &str, downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading {name}... {pct}%");
    } else {
        eprint!("\rDownloading {name}... {downloaded} bytes");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["facelens"];
        argv.extend_from_slice(args);
        Cli::parse_from(argv)
    }

    #[test]
    fn test_flags_override_settings() {
        let cli = parse(&["--labels", "chen, james", "--confidence", "0.7", "--fps", "30"]);
        let settings = merge(&cli, Settings::default());
        assert_eq!(settings.labels, vec!["chen".to_string(), "james".to_string()]);
        assert_eq!(settings.min_confidence, 0.7);
        assert_eq!(settings.paint_rate_hz, 30.0);
        assert_eq!(settings.width, Settings::default().width);
    }

    #[test]
    fn test_unset_flags_keep_saved_values() {
        let saved = Settings {
            camera: "/dev/video2".into(),
            match_threshold: 0.45,
            ..Settings::default()
        };
        let settings = merge(&parse(&[]), saved.clone());
        assert_eq!(settings, saved);
    }

    #[test]
    fn test_validate_rejects_out_of_range_confidence() {
        let cli = parse(&["--confidence", "1.5"]);
        let settings = merge(&cli, Settings::default());
        let err = validate(&cli, &settings).unwrap_err();
        assert!(err.to_string().contains("Confidence"));
    }

    #[test]
    fn test_validate_rejects_zero_dimensions() {
        let cli = parse(&["--width", "0"]);
        let settings = merge(&cli, Settings::default());
        assert!(validate(&cli, &settings).is_err());
    }

    #[test]
    fn test_validate_rejects_zero_frames() {
        let cli = parse(&["--frames", "0"]);
        let settings = merge(&cli, Settings::default());
        assert!(validate(&cli, &settings).is_err());
    }

    #[test]
    fn test_enter_sets_stop_flag() {
        let stop = AtomicBool::new(false);
        stop_on_input(std::io::Cursor::new("\n"), &stop);
        assert!(stop.load(Ordering::Relaxed));
    }

    #[test]
    fn test_closed_stdin_keeps_streaming() {
        let stop = AtomicBool::new(false);
        stop_on_input(std::io::Cursor::new(""), &stop);
        assert!(!stop.load(Ordering::Relaxed));
    }

    #[test]
    fn test_validate_accepts_defaults() {
        let cli = parse(&[]);
        assert!(validate(&cli, &merge(&cli, Settings::default())).is_ok());
    }
}
