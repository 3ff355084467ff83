// SPDX-License-Identifier: GPL-3.0-only

//! Timed multi-shot capture sequence
//!
//! The sequencer owns one camera stream and walks a single timeline:
//!
//! ```text
//! Setup ─► Ready ─start()─► Running ─► Waiting ─► Completed
//!   │                          │
//!   └─► Failed                 ├─► Aborted   (capture failure policy)
//!                              └─► Cancelled (cancel() / drop)
//! ```
//!
//! Per shot: intermission (not before the first), countdown 3-2-1, snap,
//! capture, flash, settle. Suspension happens only in the timed waits, and
//! every state write after a wait is dropped once the sequence is cancelled.
//! Writes and cancellation are serialised on the state channel, so nothing
//! is published after `cancel()` returns.

use super::capture::{CaptureSettings, PhotoCapture};
use super::encoding::StillImage;
use crate::backends::camera::types::StreamRequest;
use crate::backends::camera::{CameraBackend, CameraStream};
use crate::config::{CaptureFailurePolicy, SequenceTiming};
use crate::constants::TOTAL_SHOTS;
use crate::errors::{CameraError, PhotoError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Called once with the finished, ordered stills
pub type CompletionCallback = Box<dyn FnOnce(Vec<StillImage>) + Send + 'static>;

/// Where a running shot is on its timeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShotPhase {
    /// "NEXT SHOT..." pause, no countdown shown
    Intermission,
    /// Countdown value being shown
    Countdown(u8),
    /// The momentary zero, frame is grabbed now
    Snap,
    /// Flash indicator after a successful capture
    Flash,
    /// Rest of the post-capture buffer
    Settling,
}

/// Observable sequencer state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SequencerState {
    /// Requesting the stream
    Setup,
    /// Stream attached, waiting for start
    Ready { resolution: (u32, u32) },
    /// Stream could not be acquired; only cancel is left
    Failed { error: CameraError },
    /// Shooting
    Running {
        /// Zero-based slot being shot
        shot: usize,
        /// Stills captured so far
        captured: usize,
        phase: ShotPhase,
    },
    /// All shots done, "PROCESSING..." hold before hand-off
    Waiting { captured: usize },
    /// Stills handed to the completion callback
    Completed,
    /// Torn down by the caller
    Cancelled,
    /// Stopped by the capture failure policy
    Aborted,
}

impl SequencerState {
    /// Whether no further transitions can happen
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SequencerState::Completed | SequencerState::Cancelled | SequencerState::Aborted
        )
    }

    /// Current countdown value, `Some(0)` at the snap
    pub fn countdown(&self) -> Option<u8> {
        match self {
            SequencerState::Running {
                phase: ShotPhase::Countdown(n),
                ..
            } => Some(*n),
            SequencerState::Running {
                phase: ShotPhase::Snap,
                ..
            } => Some(0),
            _ => None,
        }
    }

    /// Whether the flash indicator is lit
    pub fn is_flashing(&self) -> bool {
        matches!(
            self,
            SequencerState::Running {
                phase: ShotPhase::Flash,
                ..
            }
        )
    }
}

/// Shared cancellation flag that timed waits can race against
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<CancelInner>,
}

#[derive(Debug, Default)]
struct CancelInner {
    cancelled: AtomicBool,
    notify: Notify,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel; wakes every pending wait
    pub fn cancel(&self) {
        if !self.inner.cancelled.swap(true, Ordering::SeqCst) {
            self.inner.notify.notify_waiters();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once cancelled
    pub async fn cancelled(&self) {
        loop {
            let notified = self.inner.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }

    /// Sleep for `duration` unless cancelled first
    ///
    /// Returns `true` if the full duration elapsed and the token is still live.
    pub async fn sleep(&self, duration: Duration) -> bool {
        tokio::select! {
            biased;
            _ = self.cancelled() => false,
            _ = tokio::time::sleep(duration) => !self.is_cancelled(),
        }
    }
}

/// Sequencer configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SequencerOptions {
    pub timing: SequenceTiming,
    pub failure_policy: CaptureFailurePolicy,
    pub capture: CaptureSettings,
}

type SharedStream = Arc<Mutex<Option<Box<dyn CameraStream>>>>;

/// State shared between the sequencer handle and its timeline task
struct Shared {
    state: watch::Sender<SequencerState>,
    cancel: CancelToken,
    stream: SharedStream,
}

impl Shared {
    /// Publish a state unless cancelled or already terminal
    fn publish(&self, next: SequencerState) -> bool {
        let cancel = &self.cancel;
        self.state.send_if_modified(|state| {
            if cancel.is_cancelled() || state.is_terminal() {
                return false;
            }
            *state = next;
            true
        })
    }

    /// Stop every track and drop the stream
    fn release_stream(&self) {
        let taken = match self.stream.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(mut stream) = taken {
            stream.stop();
            info!("Camera stream released");
        }
    }
}

/// Timed capture sequence over one owned camera stream
pub struct CaptureSequencer {
    shared: Arc<Shared>,
    options: SequencerOptions,
    on_complete: Option<CompletionCallback>,
    task: Option<JoinHandle<()>>,
}

impl CaptureSequencer {
    /// Acquire a stream and get ready to shoot
    ///
    /// Acquisition failure is not an error here: the sequencer comes back in
    /// [`SequencerState::Failed`], and the only exit is [`Self::cancel`].
    pub fn open<F>(
        backend: &dyn CameraBackend,
        request: &StreamRequest,
        options: SequencerOptions,
        on_complete: F,
    ) -> Self
    where
        F: FnOnce(Vec<StillImage>) + Send + 'static,
    {
        let (state, _) = watch::channel(SequencerState::Setup);
        let shared = Arc::new(Shared {
            state,
            cancel: CancelToken::new(),
            stream: Arc::new(Mutex::new(None)),
        });

        debug!(
            backend = backend.name(),
            device = request.device_index,
            ideal_width = request.ideal_width,
            ideal_height = request.ideal_height,
            "Requesting camera stream"
        );

        match backend.open_stream(request) {
            Ok(stream) => {
                let resolution = stream.resolution();
                if let Ok(mut guard) = shared.stream.lock() {
                    *guard = Some(stream);
                }
                info!(
                    width = resolution.0,
                    height = resolution.1,
                    "Camera stream attached"
                );
                shared.publish(SequencerState::Ready { resolution });
            }
            Err(e) => {
                let error = CameraError::from(e);
                warn!(error = %error, "Camera acquisition failed");
                shared.publish(SequencerState::Failed { error });
            }
        }

        Self {
            shared,
            options,
            on_complete: Some(Box::new(on_complete)),
            task: None,
        }
    }

    /// Start the sequence
    ///
    /// Returns `false` (and does nothing) unless the sequencer is ready and
    /// has not been started before. Must be called inside a Tokio runtime.
    pub fn start(&mut self) -> bool {
        if self.task.is_some() {
            debug!("Start ignored, sequence already running");
            return false;
        }
        if !matches!(self.state(), SequencerState::Ready { .. }) {
            debug!(state = ?self.state(), "Start ignored, sequencer not ready");
            return false;
        }
        let Some(on_complete) = self.on_complete.take() else {
            return false;
        };
        if !self.shared.publish(SequencerState::Running {
            shot: 0,
            captured: 0,
            phase: ShotPhase::Countdown(self.options.timing.countdown_from),
        }) {
            return false;
        }

        info!(
            shots = TOTAL_SHOTS,
            policy = ?self.options.failure_policy,
            "Capture sequence started"
        );
        let run = SequenceRun {
            shared: self.shared.clone(),
            options: self.options,
        };
        self.task = Some(tokio::spawn(run.execute(on_complete)));
        true
    }

    /// Abort the sequence and release the camera
    ///
    /// Once this returns, no further state is published and the completion
    /// callback will not fire. Has no effect on the state of a sequence that
    /// already finished.
    pub fn cancel(&mut self) {
        let cancel = &self.shared.cancel;
        self.shared.state.send_if_modified(|state| {
            cancel.cancel();
            if state.is_terminal() {
                return false;
            }
            *state = SequencerState::Cancelled;
            true
        });
        self.shared.release_stream();
        self.on_complete = None;
        if matches!(self.state(), SequencerState::Cancelled) {
            info!("Capture sequence cancelled");
        }
    }

    /// Current state
    pub fn state(&self) -> SequencerState {
        self.shared.state.borrow().clone()
    }

    /// Watch state changes
    pub fn subscribe(&self) -> watch::Receiver<SequencerState> {
        self.shared.state.subscribe()
    }

    /// Whether the sequencer still holds a camera stream
    pub fn has_stream(&self) -> bool {
        self.shared
            .stream
            .lock()
            .map(|guard| guard.is_some())
            .unwrap_or(false)
    }

    /// Wait for the timeline task to exit, if one was started
    pub async fn join(&mut self) {
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "Capture sequence task failed");
            }
        }
    }
}

impl Drop for CaptureSequencer {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Outcome of one capture attempt
enum Attempt {
    Captured,
    Skipped,
    Retry,
    Abort,
}

/// The timeline task
struct SequenceRun {
    shared: Arc<Shared>,
    options: SequencerOptions,
}

impl SequenceRun {
    async fn execute(self, on_complete: CompletionCallback) {
        let Some(stills) = self.shoot_all().await else {
            return;
        };

        let captured = stills.len();
        if !self.shared.publish(SequencerState::Waiting { captured }) {
            return;
        }
        info!(captured, "All shots done, processing");
        if !self.wait(self.options.timing.processing()).await {
            return;
        }

        if !self.shared.publish(SequencerState::Completed) {
            return;
        }
        self.shared.release_stream();
        info!(captured, "Capture sequence completed");
        on_complete(stills);
    }

    /// Run every slot; `None` when cancelled or aborted
    async fn shoot_all(&self) -> Option<Vec<StillImage>> {
        let timing = self.options.timing;
        let mut stills = Vec::with_capacity(TOTAL_SHOTS);
        let mut slot = 0;
        let mut attempts = 0u32;
        let mut first = true;

        while slot < TOTAL_SHOTS {
            let captured = stills.len();
            let running = |phase| SequencerState::Running {
                shot: slot,
                captured,
                phase,
            };

            if !first {
                self.step(running(ShotPhase::Intermission), timing.intermission())
                    .await?;
            }
            first = false;

            for n in (1..=timing.countdown_from).rev() {
                self.step(running(ShotPhase::Countdown(n)), timing.tick())
                    .await?;
            }

            if !self.shared.publish(running(ShotPhase::Snap)) {
                return None;
            }

            attempts += 1;
            let outcome = match self.capture(stills.len())? {
                Ok(still) => {
                    stills.push(still);
                    Attempt::Captured
                }
                Err(e) => match self.options.failure_policy {
                    CaptureFailurePolicy::Skip => {
                        warn!(shot = slot, error = %e, "Capture failed, skipping shot");
                        Attempt::Skipped
                    }
                    CaptureFailurePolicy::Retry { max_attempts } if attempts < max_attempts => {
                        warn!(shot = slot, attempt = attempts, error = %e, "Capture failed, retrying shot");
                        Attempt::Retry
                    }
                    CaptureFailurePolicy::Retry { .. } | CaptureFailurePolicy::Abort => {
                        warn!(shot = slot, attempt = attempts, error = %e, "Capture failed, aborting sequence");
                        Attempt::Abort
                    }
                },
            };

            let captured = stills.len();
            let running = |phase| SequencerState::Running {
                shot: slot,
                captured,
                phase,
            };
            match outcome {
                Attempt::Abort => {
                    if self.shared.publish(SequencerState::Aborted) {
                        self.shared.release_stream();
                    }
                    return None;
                }
                Attempt::Captured => {
                    self.step(running(ShotPhase::Flash), timing.flash()).await?;
                    self.step(running(ShotPhase::Settling), timing.settle())
                        .await?;
                }
                Attempt::Skipped | Attempt::Retry => {
                    self.step(
                        running(ShotPhase::Settling),
                        Duration::from_millis(timing.post_capture_ms),
                    )
                    .await?;
                }
            }

            if !matches!(outcome, Attempt::Retry) {
                slot += 1;
                attempts = 0;
            }
        }

        Some(stills)
    }

    /// Grab and process one still; `None` when the stream is already gone
    fn capture(&self, index: usize) -> Option<Result<StillImage, PhotoError>> {
        let mut guard = self.shared.stream.lock().ok()?;
        let stream = guard.as_mut()?;
        Some(PhotoCapture::capture_still(
            stream.as_mut(),
            index,
            &self.options.capture,
        ))
    }

    /// Publish `state` and hold it for `duration`
    async fn step(&self, state: SequencerState, duration: Duration) -> Option<()> {
        if !self.shared.publish(state) {
            return None;
        }
        self.wait(duration).await.then_some(())
    }

    async fn wait(&self, duration: Duration) -> bool {
        self.shared.cancel.sleep(duration).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::types::BackendError;
    use crate::backends::virtual_camera::VirtualBackend;
    use tokio::sync::oneshot;
    use tokio::time::Instant;

    fn options(policy: CaptureFailurePolicy) -> SequencerOptions {
        SequencerOptions {
            failure_policy: policy,
            ..SequencerOptions::default()
        }
    }

    fn open(
        backend: &VirtualBackend,
        options: SequencerOptions,
    ) -> (CaptureSequencer, oneshot::Receiver<Vec<StillImage>>) {
        let (tx, rx) = oneshot::channel();
        let sequencer =
            CaptureSequencer::open(backend, &StreamRequest::default(), options, move |stills| {
                let _ = tx.send(stills);
            });
        (sequencer, rx)
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_sequence_delivers_four_stills_in_order() {
        let backend = VirtualBackend::synthetic(640, 360);
        let probe = backend.probe();
        let (mut sequencer, done) = open(&backend, SequencerOptions::default());
        assert_eq!(
            sequencer.state(),
            SequencerState::Ready {
                resolution: (640, 360)
            }
        );

        let started = Instant::now();
        assert!(sequencer.start());
        let stills = done.await.unwrap();

        assert_eq!(started.elapsed(), Duration::from_millis(21_000));
        assert_eq!(stills.len(), TOTAL_SHOTS);
        for (i, still) in stills.iter().enumerate() {
            assert_eq!(still.index, i);
            assert_eq!((still.width, still.height), (480, 360));
        }
        assert_eq!(sequencer.state(), SequencerState::Completed);
        assert!(probe.all_released());
        assert_eq!(probe.stopped(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_scheduled_time_until_processing() {
        let backend = VirtualBackend::synthetic(320, 240);
        let (mut sequencer, _done) = open(&backend, SequencerOptions::default());
        let mut rx = sequencer.subscribe();

        let started = Instant::now();
        sequencer.start();
        loop {
            rx.changed().await.unwrap();
            if matches!(*rx.borrow(), SequencerState::Waiting { .. }) {
                break;
            }
        }

        // 3 intermissions + 4 countdowns + 4 post-capture buffers
        assert_eq!(
            started.elapsed(),
            Duration::from_millis(3 * 2000 + 4 * 3000 + 4 * 500)
        );
        assert_eq!(
            SequenceTiming::default().sequence_duration(TOTAL_SHOTS),
            started.elapsed()
        );
        assert_eq!(
            *rx.borrow(),
            SequencerState::Waiting {
                captured: TOTAL_SHOTS
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeline_phases() {
        let backend = VirtualBackend::synthetic(320, 240);
        let (mut sequencer, _done) = open(&backend, SequencerOptions::default());
        sequencer.start();

        let base = Instant::now();
        let probe_at = |ms: u64| tokio::time::sleep_until(base + Duration::from_millis(ms));

        probe_at(500).await;
        assert_eq!(sequencer.state().countdown(), Some(3));
        probe_at(1500).await;
        assert_eq!(sequencer.state().countdown(), Some(2));
        probe_at(2500).await;
        assert_eq!(sequencer.state().countdown(), Some(1));
        probe_at(3100).await;
        assert!(sequencer.state().is_flashing());
        probe_at(3300).await;
        assert_eq!(
            sequencer.state(),
            SequencerState::Running {
                shot: 0,
                captured: 1,
                phase: ShotPhase::Settling
            }
        );
        probe_at(4000).await;
        assert_eq!(
            sequencer.state(),
            SequencerState::Running {
                shot: 1,
                captured: 1,
                phase: ShotPhase::Intermission
            }
        );
        assert_eq!(sequencer.state().countdown(), None);
        probe_at(20_500).await;
        assert_eq!(
            sequencer.state(),
            SequencerState::Waiting {
                captured: TOTAL_SHOTS
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_mid_sequence_never_completes() {
        let backend = VirtualBackend::synthetic(320, 240);
        let probe = backend.probe();
        let (mut sequencer, done) = open(&backend, SequencerOptions::default());
        let mut rx = sequencer.subscribe();
        sequencer.start();

        tokio::time::sleep(Duration::from_millis(4_500)).await;
        sequencer.cancel();
        assert_eq!(sequencer.state(), SequencerState::Cancelled);
        assert!(probe.all_released());
        assert!(!sequencer.has_stream());

        let _ = rx.borrow_and_update();
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(!rx.has_changed().unwrap());
        assert_eq!(sequencer.state(), SequencerState::Cancelled);

        sequencer.join().await;
        assert!(done.await.is_err(), "completion fired after cancel");
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_releases_stream() {
        let backend = VirtualBackend::synthetic(320, 240);
        let probe = backend.probe();
        let (mut sequencer, done) = open(&backend, SequencerOptions::default());
        sequencer.start();
        tokio::time::sleep(Duration::from_millis(1_200)).await;
        drop(sequencer);

        assert!(probe.all_released());
        assert!(done.await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_before_start_releases_stream() {
        let backend = VirtualBackend::synthetic(320, 240);
        let probe = backend.probe();
        let (mut sequencer, _done) = open(&backend, SequencerOptions::default());
        sequencer.cancel();
        assert!(probe.all_released());
        assert!(!sequencer.start());
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_is_single_flight() {
        let backend = VirtualBackend::synthetic(320, 240);
        let (mut sequencer, done) = open(&backend, SequencerOptions::default());
        assert!(sequencer.start());
        assert!(!sequencer.start());
        assert_eq!(done.await.unwrap().len(), TOTAL_SHOTS);
        assert!(!sequencer.start());
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquisition_failure() {
        let backend = VirtualBackend::failing(BackendError::PermissionDenied("denied".into()));
        let (mut sequencer, done) = open(&backend, SequencerOptions::default());
        assert_eq!(
            sequencer.state(),
            SequencerState::Failed {
                error: CameraError::PermissionDenied
            }
        );
        assert!(!sequencer.start());
        sequencer.cancel();
        assert_eq!(sequencer.state(), SequencerState::Cancelled);
        assert!(done.await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_skip_policy_delivers_short_sequence() {
        let backend = VirtualBackend::synthetic(320, 240).with_failing_grabs([1]);
        let probe = backend.probe();
        let (mut sequencer, done) = open(&backend, options(CaptureFailurePolicy::Skip));
        let started = Instant::now();
        sequencer.start();

        let stills = done.await.unwrap();
        assert_eq!(stills.len(), TOTAL_SHOTS - 1);
        assert_eq!(
            stills.iter().map(|s| s.index).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
        assert_eq!(started.elapsed(), Duration::from_millis(21_000));
        assert_eq!(probe.grabs(), TOTAL_SHOTS);
        assert!(probe.all_released());
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_policy_reshoots_slot() {
        let backend = VirtualBackend::synthetic(320, 240).with_failing_grabs([1]);
        let probe = backend.probe();
        let (mut sequencer, done) = open(
            &backend,
            options(CaptureFailurePolicy::Retry { max_attempts: 3 }),
        );
        let started = Instant::now();
        sequencer.start();

        let stills = done.await.unwrap();
        assert_eq!(stills.len(), TOTAL_SHOTS);
        // One extra intermission + countdown + buffer
        assert_eq!(started.elapsed(), Duration::from_millis(21_000 + 5_500));
        assert_eq!(probe.grabs(), TOTAL_SHOTS + 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_policy_exhausted_aborts() {
        let backend = VirtualBackend::synthetic(320, 240).with_failing_grabs([1, 2]);
        let probe = backend.probe();
        let (mut sequencer, done) = open(
            &backend,
            options(CaptureFailurePolicy::Retry { max_attempts: 2 }),
        );
        sequencer.start();
        sequencer.join().await;

        assert_eq!(sequencer.state(), SequencerState::Aborted);
        assert!(probe.all_released());
        assert!(done.await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_abort_policy_stops_at_first_failure() {
        let backend = VirtualBackend::synthetic(320, 240).with_failing_grabs([0]);
        let (mut sequencer, done) = open(&backend, options(CaptureFailurePolicy::Abort));
        let started = Instant::now();
        sequencer.start();
        sequencer.join().await;

        assert_eq!(started.elapsed(), Duration::from_millis(3_000));
        assert_eq!(sequencer.state(), SequencerState::Aborted);
        // Cancelling a finished sequence leaves its state alone
        sequencer.cancel();
        assert_eq!(sequencer.state(), SequencerState::Aborted);
        assert!(done.await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_token_wakes_sleepers() {
        let token = CancelToken::new();
        let sleeper = {
            let token = token.clone();
            tokio::spawn(async move { token.sleep(Duration::from_secs(10)).await })
        };
        tokio::task::yield_now().await;
        token.cancel();
        assert!(!sleeper.await.unwrap());
        assert!(!token.sleep(Duration::from_millis(1)).await);
    }
}
