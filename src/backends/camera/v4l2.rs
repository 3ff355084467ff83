// SPDX-License-Identifier: GPL-3.0-only

//! Direct V4L2 webcam capture
//!
//! A capture thread owns the device and its mmap stream and keeps the most
//! recent raw buffer; [`V4l2Stream::grab_frame`] converts that buffer to RGBA
//! on demand. Stopping the stream signals the thread and joins it, which
//! releases the device.

use super::format_converters::{mjpeg_to_rgba, rgb_to_rgba, yuyv_to_rgba};
use super::types::{BackendError, BackendResult, CameraDevice, CameraFrame, StreamRequest};
use super::{CameraBackend, CameraStream, check_request};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, mpsc};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use v4l::buffer::Type;
use v4l::io::traits::CaptureStream;
use v4l::prelude::*;
use v4l::video::Capture;
use v4l::FourCC;

/// How long `open_stream` waits for the capture thread to report in
const STARTUP_TIMEOUT: Duration = Duration::from_secs(5);

/// Longest a single dequeue may block, so the loop notices a stop request
const DEQUEUE_TIMEOUT: Duration = Duration::from_millis(250);

/// Number of mmap buffers queued on the device
const BUFFER_COUNT: u32 = 4;

/// Pixel formats we can decode, in order of preference
const PREFERRED_FOURCCS: [&[u8; 4]; 3] = [b"MJPG", b"YUYV", b"RGB3"];

/// V4L2 camera backend
#[derive(Debug, Default)]
pub struct V4l2Backend;

impl V4l2Backend {
    pub fn new() -> Self {
        Self
    }
}

impl CameraBackend for V4l2Backend {
    fn enumerate_cameras(&self) -> Vec<CameraDevice> {
        let mut cameras: Vec<CameraDevice> = v4l::context::enum_devices()
            .into_iter()
            .filter_map(|node| {
                let path = node.path().to_string_lossy().to_string();
                let dev = Device::with_path(node.path()).ok()?;
                let caps = dev.query_caps().ok()?;
                // Skip metadata-only nodes
                if !caps
                    .capabilities
                    .contains(v4l::capability::Flags::VIDEO_CAPTURE)
                {
                    return None;
                }
                Some(CameraDevice {
                    name: node.name().unwrap_or_else(|| caps.card.clone()),
                    path,
                    driver: Some(caps.driver),
                })
            })
            .collect();
        cameras.sort_by(|a, b| a.path.cmp(&b.path));
        debug!(count = cameras.len(), "Enumerated V4L2 cameras");
        cameras
    }

    fn open_stream(&self, request: &StreamRequest) -> BackendResult<Box<dyn CameraStream>> {
        check_request(request)?;
        let cameras = self.enumerate_cameras();
        let device = cameras.get(request.device_index).cloned().ok_or_else(|| {
            BackendError::DeviceNotFound(format!(
                "camera index {} (found {})",
                request.device_index,
                cameras.len()
            ))
        })?;
        Ok(Box::new(V4l2Stream::open(&device, request)?))
    }

    fn name(&self) -> &'static str {
        "v4l2"
    }
}

/// Raw buffer as delivered by the device
struct RawFrame {
    data: Vec<u8>,
    captured_at: Instant,
}

/// Negotiated stream format
#[derive(Debug, Clone, Copy)]
struct Negotiated {
    width: u32,
    height: u32,
    stride: u32,
    fourcc: FourCC,
}

/// A running V4L2 capture stream
pub struct V4l2Stream {
    device_path: String,
    format: Negotiated,
    latest: Arc<Mutex<Option<RawFrame>>>,
    running: Arc<AtomicBool>,
    thread_handle: Option<JoinHandle<()>>,
}

impl V4l2Stream {
    /// Open the device, negotiate a format and start the capture thread
    pub fn open(device: &CameraDevice, request: &StreamRequest) -> BackendResult<Self> {
        info!(
            device = %device.path,
            ideal_width = request.ideal_width,
            ideal_height = request.ideal_height,
            "Opening V4L2 stream"
        );

        let running = Arc::new(AtomicBool::new(true));
        let latest = Arc::new(Mutex::new(None));
        let (ready_tx, ready_rx) = mpsc::channel::<BackendResult<Negotiated>>();

        let path = device.path.clone();
        let ideal = (request.ideal_width, request.ideal_height);
        let running_clone = running.clone();
        let latest_clone = latest.clone();
        let thread_handle = std::thread::Builder::new()
            .name("v4l2-capture".into())
            .spawn(move || {
                if let Err(e) = capture_loop(&path, ideal, ready_tx, latest_clone, running_clone) {
                    error!(error = %e, "V4L2 capture loop failed");
                }
            })
            .map_err(|e| BackendError::InitializationFailed(e.to_string()))?;

        let format = await_startup(&ready_rx, &thread_handle, &running, STARTUP_TIMEOUT);
        let format = match format {
            Ok(format) => format,
            Err(e) => {
                if thread_handle.join().is_err() {
                    warn!(device = %device.path, "V4L2 capture thread panicked");
                }
                return Err(e);
            }
        };

        info!(
            width = format.width,
            height = format.height,
            fourcc = %format.fourcc,
            "V4L2 stream started"
        );

        Ok(Self {
            device_path: device.path.clone(),
            format,
            latest,
            running,
            thread_handle: Some(thread_handle),
        })
    }
}

impl CameraStream for V4l2Stream {
    fn resolution(&self) -> (u32, u32) {
        (self.format.width, self.format.height)
    }

    fn grab_frame(&mut self) -> BackendResult<CameraFrame> {
        if !self.is_active() {
            return Err(BackendError::NotActive);
        }

        let raw = {
            let guard = self
                .latest
                .lock()
                .map_err(|_| BackendError::Other("frame slot poisoned".into()))?;
            match guard.as_ref() {
                Some(raw) => (raw.data.clone(), raw.captured_at),
                None => return Err(BackendError::NoFrame),
            }
        };

        let Negotiated {
            width,
            height,
            stride,
            fourcc,
        } = self.format;
        let (rgba, width, height) = match &fourcc.repr {
            b"MJPG" => mjpeg_to_rgba(&raw.0)?,
            b"YUYV" => (yuyv_to_rgba(&raw.0, width, height, stride)?, width, height),
            b"RGB3" => (rgb_to_rgba(&raw.0), width, height),
            other => {
                return Err(BackendError::FormatNotSupported(
                    String::from_utf8_lossy(other).to_string(),
                ));
            }
        };

        let mut frame = CameraFrame::from_rgba(width, height, rgba)?;
        frame.captured_at = raw.1;
        Ok(frame)
    }

    fn stop(&mut self) {
        if !self.running.swap(false, Ordering::SeqCst) && self.thread_handle.is_none() {
            return;
        }
        info!(device = %self.device_path, "Stopping V4L2 stream");
        if let Some(handle) = self.thread_handle.take() {
            match handle.join() {
                Ok(_) => debug!("V4L2 capture thread stopped"),
                Err(_) => warn!("V4L2 capture thread panicked"),
            }
        }
    }

    fn is_active(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl Drop for V4l2Stream {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Wait for the capture thread to report its negotiated format
///
/// On an error report or a timeout the thread is told to stop; the caller
/// must then join it. The dequeue timeout bounds how long that join takes.
fn await_startup<T>(
    ready: &mpsc::Receiver<BackendResult<T>>,
    thread: &JoinHandle<()>,
    running: &AtomicBool,
    timeout: Duration,
) -> BackendResult<T> {
    let result = match ready.recv_timeout(timeout) {
        Ok(report) => report,
        Err(_) => {
            warn!(
                thread = thread.thread().name().unwrap_or("capture"),
                "Capture thread did not start in time, stopping it"
            );
            Err(BackendError::InitializationFailed(
                "timed out waiting for capture thread".into(),
            ))
        }
    };
    if result.is_err() {
        running.store(false, Ordering::SeqCst);
    }
    result
}

/// Main capture loop running in a separate thread
fn capture_loop(
    device_path: &str,
    ideal: (u32, u32),
    ready: mpsc::Sender<BackendResult<Negotiated>>,
    latest: Arc<Mutex<Option<RawFrame>>>,
    running: Arc<AtomicBool>,
) -> BackendResult<()> {
    let setup = || -> BackendResult<(Device, Negotiated)> {
        let dev = Device::with_path(device_path)?;
        let negotiated = negotiate_format(&dev, ideal)?;
        Ok((dev, negotiated))
    };

    let (dev, negotiated) = match setup() {
        Ok(v) => v,
        Err(e) => {
            let _ = ready.send(Err(e.clone()));
            return Err(e);
        }
    };

    let mut stream = match MmapStream::with_buffers(&dev, Type::VideoCapture, BUFFER_COUNT) {
        Ok(stream) => stream,
        Err(e) => {
            let err = BackendError::from(e);
            let _ = ready.send(Err(err.clone()));
            return Err(err);
        }
    };

    stream.set_timeout(DEQUEUE_TIMEOUT);

    if ready.send(Ok(negotiated)).is_err() {
        // open_stream gave up waiting
        debug!(device_path, "Nobody waiting for the capture thread, exiting");
        return Ok(());
    }

    while running.load(Ordering::SeqCst) {
        match stream.next() {
            Ok((buf, meta)) => {
                let used = (meta.bytesused as usize).min(buf.len());
                let used = if used == 0 { buf.len() } else { used };
                let raw = RawFrame {
                    data: buf[..used].to_vec(),
                    captured_at: Instant::now(),
                };
                if let Ok(mut slot) = latest.lock() {
                    *slot = Some(raw);
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => {}
            Err(e) => {
                warn!(error = %e, "V4L2 dequeue failed");
                std::thread::sleep(Duration::from_millis(10));
            }
        }
    }

    debug!(device_path, "V4L2 capture loop exiting");
    Ok(())
}

/// Pick the first decodable format the device accepts at (about) the ideal size
fn negotiate_format(dev: &Device, ideal: (u32, u32)) -> BackendResult<Negotiated> {
    let supported: Vec<FourCC> = dev
        .enum_formats()
        .map(|formats| formats.into_iter().map(|f| f.fourcc).collect())
        .unwrap_or_default();

    for repr in PREFERRED_FOURCCS {
        let fourcc = FourCC::new(repr);
        if !supported.is_empty() && !supported.contains(&fourcc) {
            continue;
        }

        let mut format = dev.format()?;
        format.width = ideal.0;
        format.height = ideal.1;
        format.fourcc = fourcc;

        match dev.set_format(&format) {
            Ok(actual) if actual.fourcc == fourcc => {
                if (actual.width, actual.height) != ideal {
                    debug!(
                        width = actual.width,
                        height = actual.height,
                        "Device delivered a different resolution than requested"
                    );
                }
                return Ok(Negotiated {
                    width: actual.width,
                    height: actual.height,
                    stride: actual.stride,
                    fourcc,
                });
            }
            Ok(actual) => {
                debug!(wanted = %fourcc, got = %actual.fourcc, "Format not accepted");
            }
            Err(e) => {
                debug!(fourcc = %fourcc, error = %e, "set_format failed");
            }
        }
    }

    Err(BackendError::FormatNotSupported(format!(
        "{} offers none of MJPG, YUYV, RGB3",
        dev_label(dev)
    )))
}

fn dev_label(dev: &Device) -> String {
    dev.query_caps()
        .map(|caps| caps.card)
        .unwrap_or_else(|_| "device".to_string())
}
