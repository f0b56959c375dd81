mod console;
mod settings;

use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use crossbeam_channel::{select, Receiver};

use facecam_core::capture::domain::frame_source::FrameSource;
use facecam_core::capture::infrastructure::still_image_driver::StillImageDriver;
use facecam_core::capture::infrastructure::streamed_frame_source::StreamedFrameSource;
use facecam_core::detection::domain::face_locator::FaceLocator;
use facecam_core::detection::infrastructure::model_resolver::{self, ModelOrigin, ModelRequest};
use facecam_core::detection::infrastructure::seeta_face_locator::SeetaFaceLocator;
use facecam_core::pipeline::capture_session::CaptureSession;
use facecam_core::pipeline::frame_processor::FrameProcessor;
use facecam_core::pipeline::infrastructure::channel_render_sink::{ChannelRenderSink, RenderEvent};
use facecam_core::pipeline::infrastructure::tick_scheduler::TickScheduler;
use facecam_core::pipeline::pipeline_logger::StdoutPipelineLogger;
use facecam_core::shared::constants::{FACE_MODEL_NAME, FACE_MODEL_URL, IMAGE_EXTENSIONS};
use facecam_core::snapshot::infrastructure::png_snapshot_writer::PngSnapshotWriter;

use console::Command;
use settings::Settings;

const RENDER_QUEUE: usize = 4;
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Live webcam face detection with a console control surface.
#[derive(Parser)]
#[command(name = "facecam")]
struct Cli {
    /// Capture device index.
    #[arg(long)]
    device: Option<u32>,

    /// Face detection model file (downloaded to the cache if omitted).
    #[arg(long)]
    model: Option<PathBuf>,

    /// Replay a still image (jpg/png) instead of reading a camera.
    #[arg(long)]
    image: Option<PathBuf>,

    /// Tick period in milliseconds.
    #[arg(long)]
    period_ms: Option<u64>,

    /// Smallest face size searched for, in pixels (>= 20).
    #[arg(long)]
    min_face_size: Option<u32>,

    /// Classifier score a window must reach to count as a face (> 0).
    #[arg(long)]
    score_threshold: Option<f64>,

    /// Image pyramid scale factor, in [0.01, 0.99].
    #[arg(long)]
    pyramid_scale: Option<f32>,

    /// Sliding window step in pixels.
    #[arg(long)]
    window_step: Option<u32>,

    /// Directory snapshots are written to (default: current directory).
    #[arg(long)]
    snapshot_dir: Option<PathBuf>,

    /// Stop after this many ticks and exit.
    #[arg(long)]
    ticks: Option<u64>,

    /// Start capturing immediately.
    #[arg(long)]
    autostart: bool,

    /// Store the effective options as the new defaults.
    #[arg(long)]
    save_settings: bool,
}

impl Cli {
    fn apply(&self, mut settings: Settings) -> Settings {
        if let Some(v) = self.device {
            settings.device = v;
        }
        if let Some(v) = self.period_ms {
            settings.period_ms = v;
        }
        if let Some(v) = self.min_face_size {
            settings.min_face_size = v;
        }
        if let Some(v) = self.score_threshold {
            settings.score_threshold = v;
        }
        if let Some(v) = self.pyramid_scale {
            settings.pyramid_scale = v;
        }
        if let Some(v) = self.window_step {
            settings.window_step = v;
        }
        if let Some(v) = &self.snapshot_dir {
            settings.snapshot_dir = Some(v.clone());
        }
        settings
    }
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
    let settings = cli.apply(Settings::load());
    validate(&cli, &settings)?;

    if cli.save_settings {
        let path = settings.save()?;
        log::info!("Settings saved to {}", path.display());
    }

    let locator = build_locator(&cli, &settings)?;
    let source = build_source(&cli, &settings)?;
    let processor = FrameProcessor::new(source, locator, Box::new(StdoutPipelineLogger::default()));

    let (sink, render_rx) = ChannelRenderSink::with_default_surface(RENDER_QUEUE);
    let scheduler =
        TickScheduler::new(Duration::from_millis(settings.period_ms)).with_max_ticks(cli.ticks);
    let mut session = CaptureSession::new(
        processor,
        Arc::new(sink),
        scheduler,
        Box::new(PngSnapshotWriter::new()),
    );

    let snapshot_dir = settings
        .snapshot_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from("."));
    let headless = cli.ticks.is_some();

    if cli.autostart || headless {
        // A failed start is fatal only when there is no console to retry from.
        if let Err(e) = session.start() {
            if headless {
                return Err(e.into());
            }
            eprintln!("Cannot start capture: {e}");
        }
    }

    let (cmd_tx, cmd_rx) = crossbeam_channel::unbounded();
    if !headless {
        eprintln!("{}", console::HELP);
        console::spawn_reader(cmd_tx);
    } else {
        drop(cmd_tx);
    }

    event_loop(&mut session, &cmd_rx, &render_rx, &snapshot_dir, headless);

    session.stop()?;
    session.summary();
    Ok(())
}

fn event_loop(
    session: &mut CaptureSession,
    commands: &Receiver<Command>,
    events: &Receiver<RenderEvent>,
    snapshot_dir: &Path,
    headless: bool,
) {
    let mut shown_count: Option<usize> = None;
    let never = crossbeam_channel::never();
    let commands = if headless { &never } else { commands };

    loop {
        select! {
            recv(commands) -> cmd => {
                let Ok(cmd) = cmd else { break };
                match cmd {
                    Command::Start => match session.start() {
                        Ok(()) => println!("Capture started"),
                        Err(e) => eprintln!("Cannot start capture: {e}"),
                    },
                    Command::Stop => match session.stop() {
                        Ok(()) => println!("Capture stopped"),
                        Err(e) => eprintln!("Error stopping capture: {e}"),
                    },
                    Command::Snap => match session.snapshot(snapshot_dir) {
                        Ok(path) => println!("Snapshot saved: {}", path.display()),
                        Err(e) => eprintln!("Snapshot failed: {e}"),
                    },
                    Command::Status => println!(
                        "{} | faces: {} | ticks: {}",
                        if session.is_running() { "running" } else { "idle" },
                        shown_count.unwrap_or(0),
                        session.ticks_run()
                    ),
                    Command::Help => println!("{}", console::HELP),
                    Command::Quit => break,
                }
            }
            recv(events) -> event => {
                let Ok(event) = event else { break };
                match event {
                    RenderEvent::Frame { face_count, .. } => {
                        if shown_count != Some(face_count) {
                            println!("Faces: {face_count}");
                            shown_count = Some(face_count);
                        }
                    }
                    RenderEvent::Cleared => {
                        if shown_count.is_some_and(|n| n != 0) {
                            println!("Faces: 0");
                        }
                        shown_count = None;
                    }
                    RenderEvent::SignalLost => eprintln!("No camera signal"),
                    RenderEvent::SignalRestored => eprintln!("Camera signal restored"),
                }
            }
            default(POLL_INTERVAL) => {
                if headless && !session.is_running() {
                    break;
                }
            }
        }
    }
}

fn build_locator(
    cli: &Cli,
    settings: &Settings,
) -> Result<Arc<dyn FaceLocator>, Box<dyn std::error::Error>> {
    log::info!("Resolving model: {FACE_MODEL_NAME}");
    let request = ModelRequest {
        name: FACE_MODEL_NAME,
        url: FACE_MODEL_URL,
        explicit: cli.model.as_deref(),
        bundled_dir: None,
    };
    let (model_path, origin) = model_resolver::resolve(&request, Some(Box::new(download_progress)))?;
    if origin == ModelOrigin::Downloaded {
        eprintln!();
    }
    log::info!("Using model {}", model_path.display());

    let locator = SeetaFaceLocator::load(&model_path, settings.detector_params())?;
    Ok(Arc::new(locator))
}

fn build_source(
    cli: &Cli,
    settings: &Settings,
) -> Result<Box<dyn FrameSource>, Box<dyn std::error::Error>> {
    if let Some(path) = &cli.image {
        let driver = StillImageDriver::open_file(path, Duration::from_millis(settings.period_ms))?;
        return Ok(Box::new(StreamedFrameSource::new(driver)));
    }
    camera_source(settings.device)
}

#[cfg(feature = "camera")]
fn camera_source(device: u32) -> Result<Box<dyn FrameSource>, Box<dyn std::error::Error>> {
    use facecam_core::capture::infrastructure::nokhwa_driver::NokhwaDriver;
    Ok(Box::new(
        StreamedFrameSource::new(NokhwaDriver::new()).prefer_device(device),
    ))
}

#[cfg(not(feature = "camera"))]
fn camera_source(_device: u32) -> Result<Box<dyn FrameSource>, Box<dyn std::error::Error>> {
    Err("built without camera support; use --image <file>".into())
}

fn validate(cli: &Cli, settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(image) = &cli.image {
        if !image.exists() {
            return Err(format!("Image file not found: {}", image.display()).into());
        }
        if !is_image(image) {
            return Err(format!(
                "Unsupported image type: {} (expected one of {})",
                image.display(),
                IMAGE_EXTENSIONS.join(", ")
            )
            .into());
        }
    }
    if settings.period_ms == 0 {
        return Err("Tick period must be at least 1 ms".into());
    }
    if cli.ticks == Some(0) {
        return Err("--ticks must be at least 1".into());
    }
    settings.detector_params().validate()?;
    Ok(())
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading face detection model... {pct}%");
    } else {
        eprint!("\rDownloading face detection model... {downloaded} bytes");
    }
}
