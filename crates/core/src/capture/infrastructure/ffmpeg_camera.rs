use std::io::ErrorKind;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{bounded, RecvTimeoutError, Sender};

use crate::capture::domain::camera::{Camera, CameraError, CameraStream, StreamConstraints};
use crate::shared::frame::Frame;

const DEFAULT_FRAMERATE: u32 = 30;
const DEFAULT_OPEN_TIMEOUT: Duration = Duration::from_secs(10);

#[cfg(target_os = "linux")]
const CAPTURE_FORMAT: &str = "v4l2";
#[cfg(target_os = "macos")]
const CAPTURE_FORMAT: &str = "avfoundation";
#[cfg(target_os = "windows")]
const CAPTURE_FORMAT: &str = "dshow";
#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
const CAPTURE_FORMAT: &str = "";

/// Platform default capture device.
pub fn default_device() -> &'static str {
    #[cfg(target_os = "linux")]
    {
        "/dev/video0"
    }
    #[cfg(target_os = "macos")]
    {
        "0"
    }
    #[cfg(target_os = "windows")]
    {
        "video=Integrated Camera"
    }
    #[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
    {
        ""
    }
}

/// Webcam capture through libavdevice (v4l2, avfoundation or dshow).
///
/// Every ffmpeg object lives on a dedicated capture thread that decodes
/// into a latest-frame slot; the returned stream only shares that slot and
/// two flags with it.
pub struct FfmpegCamera {
    device: String,
    framerate: u32,
    open_timeout: Duration,
}

impl FfmpegCamera {
    pub fn new() -> Self {
        Self::with_device(default_device())
    }

    pub fn with_device(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            framerate: DEFAULT_FRAMERATE,
            open_timeout: DEFAULT_OPEN_TIMEOUT,
        }
    }

    pub fn with_framerate(mut self, framerate: u32) -> Self {
        self.framerate = framerate;
        self
    }
}

impl Default for FfmpegCamera {
    fn default() -> Self {
        Self::new()
    }
}

impl Camera for FfmpegCamera {
    fn request_stream(
        &mut self,
        constraints: &StreamConstraints,
    ) -> Result<Box<dyn CameraStream>, CameraError> {
        if CAPTURE_FORMAT.is_empty() {
            return Err(CameraError::Unsupported(
                "no capture backend for this platform".to_string(),
            ));
        }

        let (ready_tx, ready_rx) = bounded(1);
        let slot = Arc::new(Mutex::new(None));
        let stop = Arc::new(AtomicBool::new(false));
        let active = Arc::new(AtomicBool::new(false));

        let capture = CaptureThread {
            device: self.device.clone(),
            constraints: *constraints,
            framerate: self.framerate,
            slot: Arc::clone(&slot),
            stop: Arc::clone(&stop),
            active: Arc::clone(&active),
        };
        let handle = std::thread::Builder::new()
            .name("camera-capture".to_string())
            .spawn(move || capture.run(ready_tx))
            .map_err(|e| CameraError::Stream(e.to_string()))?;

        match ready_rx.recv_timeout(self.open_timeout) {
            Ok(Ok(dimensions)) => {
                log::info!(
                    "Camera {} streaming at {}x{}",
                    self.device,
                    dimensions.0,
                    dimensions.1
                );
                Ok(Box::new(FfmpegStream {
                    dimensions,
                    slot,
                    stop,
                    active,
                    handle: Some(handle),
                }))
            }
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(RecvTimeoutError::Timeout) => {
                stop.store(true, Ordering::Relaxed);
                Err(CameraError::DeviceUnavailable(format!(
                    "{} did not open within {:?}",
                    self.device, self.open_timeout
                )))
            }
            Err(RecvTimeoutError::Disconnected) => {
                let _ = handle.join();
                Err(CameraError::Stream(
                    "capture thread exited before opening the device".to_string(),
                ))
            }
        }
    }
}

struct FfmpegStream {
    dimensions: (u32, u32),
    slot: Arc<Mutex<Option<Frame>>>,
    stop: Arc<AtomicBool>,
    active: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl CameraStream for FfmpegStream {
    fn dimensions(&self) -> (u32, u32) {
        self.dimensions
    }

    fn latest_frame(&self) -> Option<Frame> {
        self.slot.lock().ok().and_then(|slot| slot.clone())
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::Relaxed)
    }

    fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::warn!("Camera capture thread panicked");
            }
            log::info!("Camera released");
        }
        self.active.store(false, Ordering::Relaxed);
        if let Ok(mut slot) = self.slot.lock() {
            *slot = None;
        }
    }
}

impl Drop for FfmpegStream {
    fn drop(&mut self) {
        self.stop();
    }
}

struct CaptureThread {
    device: String,
    constraints: StreamConstraints,
    framerate: u32,
    slot: Arc<Mutex<Option<Frame>>>,
    stop: Arc<AtomicBool>,
    active: Arc<AtomicBool>,
}

struct OpenedDevice {
    ictx: ffmpeg_next::format::context::Input,
    decoder: ffmpeg_next::decoder::Video,
    scaler: ffmpeg_next::software::scaling::Context,
    stream_index: usize,
    width: u32,
    height: u32,
}

impl CaptureThread {
    fn run(self, ready: Sender<Result<(u32, u32), CameraError>>) {
        let mut device = match self.open() {
            Ok(device) => device,
            Err(e) => {
                let _ = ready.send(Err(e));
                return;
            }
        };
        self.active.store(true, Ordering::Relaxed);
        if ready.send(Ok((device.width, device.height))).is_err() {
            // Requester gave up waiting.
            self.active.store(false, Ordering::Relaxed);
            return;
        }

        let (width, height) = (device.width, device.height);
        for (stream, packet) in device.ictx.packets() {
            if self.stop.load(Ordering::Relaxed) {
                break;
            }
            if stream.index() != device.stream_index {
                continue;
            }
            if device.decoder.send_packet(&packet).is_err() {
                continue;
            }
            let mut decoded = ffmpeg_next::util::frame::video::Video::empty();
            while device.decoder.receive_frame(&mut decoded).is_ok() {
                let mut rgb_frame = ffmpeg_next::util::frame::video::Video::empty();
                if let Err(e) = device.scaler.run(&decoded, &mut rgb_frame) {
                    log::debug!("Dropping camera frame: {e}");
                    continue;
                }
                let frame = Frame::new(extract_rgb_pixels(&rgb_frame, width, height), width, height);
                if let Ok(mut slot) = self.slot.lock() {
                    *slot = Some(frame);
                }
            }
        }
        self.active.store(false, Ordering::Relaxed);
    }

    fn open(&self) -> Result<OpenedDevice, CameraError> {
        ffmpeg_next::init().map_err(|e| CameraError::Unsupported(e.to_string()))?;
        ffmpeg_next::device::register_all();

        let format = ffmpeg_next::device::input::video()
            .find(|f| f.name().split(',').any(|n| n == CAPTURE_FORMAT))
            .ok_or_else(|| {
                CameraError::Unsupported(format!("{CAPTURE_FORMAT} input device is not available"))
            })?;

        let mut options = ffmpeg_next::Dictionary::new();
        options.set(
            "video_size",
            &format!("{}x{}", self.constraints.width, self.constraints.height),
        );
        options.set("framerate", &self.framerate.to_string());

        let ictx = match ffmpeg_next::format::open_with(&self.device, &format, options) {
            Ok(ffmpeg_next::format::context::Context::Input(ictx)) => ictx,
            Ok(_) => {
                return Err(CameraError::Unsupported(format!(
                    "{} opened as an output",
                    self.device
                )))
            }
            Err(e) => return Err(map_open_error(&self.device, e)),
        };

        let stream = ictx
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or_else(|| CameraError::Stream(format!("{} has no video stream", self.device)))?;
        let stream_index = stream.index();
        let decoder = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())
            .and_then(|ctx| ctx.decoder().video())
            .map_err(|e| CameraError::Stream(e.to_string()))?;

        let width = decoder.width();
        let height = decoder.height();
        let scaler = ffmpeg_next::software::scaling::Context::get(
            decoder.format(),
            width,
            height,
            ffmpeg_next::format::Pixel::RGB24,
            width,
            height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )
        .map_err(|e| CameraError::Stream(e.to_string()))?;

        Ok(OpenedDevice {
            ictx,
            decoder,
            scaler,
            stream_index,
            width,
            height,
        })
    }
}

fn map_open_error(device: &str, err: ffmpeg_next::Error) -> CameraError {
    let message = format!("{device}: {err}");
    if let ffmpeg_next::Error::Other { errno } = err {
        match std::io::Error::from_raw_os_error(errno).kind() {
            ErrorKind::PermissionDenied => return CameraError::PermissionDenied(message),
            ErrorKind::NotFound => return CameraError::DeviceUnavailable(message),
            _ => {}
        }
    }
    CameraError::DeviceUnavailable(message)
}

/// Copies pixel data into a tightly packed RGB buffer, dropping the row
/// padding ffmpeg may add (stride > width * 3).
fn extract_rgb_pixels(
    rgb_frame: &ffmpeg_next::util::frame::video::Video,
    width: u32,
    height: u32,
) -> Vec<u8> {
    let stride = rgb_frame.stride(0);
    let data = rgb_frame.data(0);
    let w = width as usize;
    let h = height as usize;

    let mut pixels = Vec::with_capacity(w * h * 3);
    for row in 0..h {
        let row_start = row * stride;
        pixels.extend_from_slice(&data[row_start..row_start + w * 3]);
    }
    pixels
}
