use std::time::Duration;

pub const FACE_MODEL_NAME: &str = "seeta_fd_frontal_v1.0.bin";
pub const FACE_MODEL_URL: &str =
    "https://github.com/atomashpolskiy/rustface/raw/master/model/seeta_fd_frontal_v1.0.bin";

pub const DEFAULT_DEVICE_INDEX: u32 = 0;

/// Tick period of the capture loop (~33 fps).
pub const DEFAULT_TICK_PERIOD: Duration = Duration::from_millis(30);

/// Consecutive skipped ticks before the render surface is told the signal is lost.
pub const STALL_TICKS: usize = 5;

/// Render surface size used before anything has been laid out or presented.
pub const DEFAULT_SURFACE_SIZE: (u32, u32) = (640, 480);

pub const BOX_STROKE_WIDTH: u32 = 2;
pub const BOX_COLOR: [u8; 3] = [255, 0, 0];

pub const SNAPSHOT_PREFIX: &str = "screenshot_";
pub const SNAPSHOT_EXTENSION: &str = "png";

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];
