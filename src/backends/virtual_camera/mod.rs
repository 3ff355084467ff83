// SPDX-License-Identifier: GPL-3.0-only

//! Virtual camera backend
//!
//! Stands in for a webcam when running headless (image files on disk) and in
//! tests (generated frames with scripted failures). Each stream registers
//! with a shared [`StreamProbe`] so callers can check that streams were
//! opened and released.
//!
//! ```text
//! VirtualSource ──► VirtualBackend::open_stream ──► VirtualStream
//!                          │                            │
//!                          └────────► StreamProbe ◄─────┘
//! ```

mod file_source;

pub use file_source::{collect_image_paths, load_image_as_frame, synthetic_frame};

use crate::backends::camera::types::{
    BackendError, BackendResult, CameraDevice, CameraFrame, StreamRequest,
};
use crate::backends::camera::{CameraBackend, CameraStream, check_request};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tracing::{debug, info};

/// Where virtual frames come from
#[derive(Debug, Clone)]
pub enum VirtualSource {
    /// Generated test pattern of a fixed size
    Synthetic { width: u32, height: u32 },
    /// Cycle through image files
    Files(Vec<PathBuf>),
    /// Opening always fails with this error
    Failing(BackendError),
}

/// Shared counters describing what happened to virtual streams
#[derive(Debug, Default)]
pub struct StreamProbe {
    opened: AtomicUsize,
    stopped: AtomicUsize,
    grabs: AtomicUsize,
}

impl StreamProbe {
    /// Streams successfully opened
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    /// Streams that had all tracks stopped
    pub fn stopped(&self) -> usize {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Frame grab attempts, successful or not
    pub fn grabs(&self) -> usize {
        self.grabs.load(Ordering::SeqCst)
    }

    /// Whether every opened stream has been released
    pub fn all_released(&self) -> bool {
        self.opened() == self.stopped()
    }
}

/// Virtual camera backend
#[derive(Debug, Clone)]
pub struct VirtualBackend {
    source: VirtualSource,
    /// Zero-based grab attempts that fail
    failing_grabs: HashSet<usize>,
    probe: Arc<StreamProbe>,
}

impl VirtualBackend {
    pub fn new(source: VirtualSource) -> Self {
        Self {
            source,
            failing_grabs: HashSet::new(),
            probe: Arc::new(StreamProbe::default()),
        }
    }

    /// Generated frames of the given size
    pub fn synthetic(width: u32, height: u32) -> Self {
        Self::new(VirtualSource::Synthetic { width, height })
    }

    /// Frames loaded from image files or directories
    pub fn from_paths(inputs: &[PathBuf]) -> BackendResult<Self> {
        Ok(Self::new(VirtualSource::Files(collect_image_paths(inputs)?)))
    }

    /// A backend whose streams can never be opened
    pub fn failing(error: BackendError) -> Self {
        Self::new(VirtualSource::Failing(error))
    }

    /// Make the given grab attempts (zero-based, counted across the stream) fail
    pub fn with_failing_grabs(mut self, attempts: impl IntoIterator<Item = usize>) -> Self {
        self.failing_grabs.extend(attempts);
        self
    }

    /// Counters shared with every stream this backend opens
    pub fn probe(&self) -> Arc<StreamProbe> {
        self.probe.clone()
    }
}

impl CameraBackend for VirtualBackend {
    fn enumerate_cameras(&self) -> Vec<CameraDevice> {
        let path = match &self.source {
            VirtualSource::Synthetic { width, height } => format!("synthetic:{}x{}", width, height),
            VirtualSource::Files(paths) => format!("files:{}", paths.len()),
            VirtualSource::Failing(_) => return Vec::new(),
        };
        vec![CameraDevice {
            name: "Virtual Camera".to_string(),
            path,
            driver: None,
        }]
    }

    fn open_stream(&self, request: &StreamRequest) -> BackendResult<Box<dyn CameraStream>> {
        check_request(request)?;
        if request.device_index != 0 {
            return Err(BackendError::DeviceNotFound(format!(
                "virtual camera index {}",
                request.device_index
            )));
        }

        let resolution = match &self.source {
            VirtualSource::Failing(err) => return Err(err.clone()),
            VirtualSource::Synthetic { width, height } => (*width, *height),
            VirtualSource::Files(paths) => {
                let first = paths
                    .first()
                    .ok_or_else(|| BackendError::DeviceNotFound("empty file source".into()))?;
                let frame = load_image_as_frame(first)?;
                (frame.width, frame.height)
            }
        };

        self.probe.opened.fetch_add(1, Ordering::SeqCst);
        info!(
            width = resolution.0,
            height = resolution.1,
            "Virtual camera stream opened"
        );

        Ok(Box::new(VirtualStream {
            source: self.source.clone(),
            resolution,
            failing_grabs: self.failing_grabs.clone(),
            attempt: 0,
            active: AtomicBool::new(true),
            probe: self.probe.clone(),
        }))
    }

    fn name(&self) -> &'static str {
        "virtual"
    }
}

/// Stream handed out by [`VirtualBackend`]
pub struct VirtualStream {
    source: VirtualSource,
    resolution: (u32, u32),
    failing_grabs: HashSet<usize>,
    attempt: usize,
    active: AtomicBool,
    probe: Arc<StreamProbe>,
}

impl CameraStream for VirtualStream {
    fn resolution(&self) -> (u32, u32) {
        self.resolution
    }

    fn grab_frame(&mut self) -> BackendResult<CameraFrame> {
        if !self.is_active() {
            return Err(BackendError::NotActive);
        }
        let attempt = self.attempt;
        self.attempt += 1;
        self.probe.grabs.fetch_add(1, Ordering::SeqCst);

        if self.failing_grabs.contains(&attempt) {
            debug!(attempt, "Scripted grab failure");
            return Err(BackendError::NoFrame);
        }

        match &self.source {
            VirtualSource::Synthetic { width, height } => {
                synthetic_frame(*width, *height, (attempt * 40 % 256) as u8)
            }
            VirtualSource::Files(paths) => load_image_as_frame(&paths[attempt % paths.len()]),
            VirtualSource::Failing(err) => Err(err.clone()),
        }
    }

    fn stop(&mut self) {
        if self.active.swap(false, Ordering::SeqCst) {
            self.probe.stopped.fetch_add(1, Ordering::SeqCst);
            info!("Virtual camera stream stopped");
        }
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

impl Drop for VirtualStream {
    fn drop(&mut self) {
        self.stop();
    }
}
