// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands for the photo booth
//!
//! This module provides command-line functionality for:
//! - Listing available cameras
//! - Shooting a four-cut sequence and saving the composite
//! - Composing existing images into a composite

use photo_booth::backends::camera::types::StreamRequest;
use photo_booth::backends::camera::{CameraBackend, get_backend};
use photo_booth::backends::virtual_camera::{
    VirtualBackend, collect_image_paths, load_image_as_frame,
};
use photo_booth::config::Config;
use photo_booth::constants::TOTAL_SHOTS;
use photo_booth::pipelines::composite::{
    CompositeImage, CompositeSession, CompositeSpec, FilterType, LayoutType, ThemeType,
};
use photo_booth::pipelines::photo::{
    CaptureSequencer, SequencerOptions, SequencerState, ShotPhase, StillImage, crop_and_mirror,
};
use photo_booth::storage::{save_composite, write_composite};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::oneshot;

type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Composite selection flags shared by `shoot` and `compose`
#[derive(clap::Args, Debug, Clone, Default)]
pub struct StyleArgs {
    /// Layout: strip, grid or film
    #[arg(short, long)]
    pub layout: Option<LayoutType>,

    /// Filter: normal, bw, sepia, vintage or dreamy
    #[arg(short, long)]
    pub filter: Option<FilterType>,

    /// Theme: milk, dark, blue or peach
    #[arg(short, long)]
    pub theme: Option<ThemeType>,
}

impl StyleArgs {
    fn apply(&self, base: CompositeSpec) -> CompositeSpec {
        CompositeSpec {
            layout: self.layout.unwrap_or(base.layout),
            filter: self.filter.unwrap_or(base.filter),
            theme: self.theme.unwrap_or(base.theme),
        }
    }
}

/// Options for `shoot`
#[derive(Debug, Clone, Default)]
pub struct ShootOptions {
    pub camera: Option<usize>,
    pub source: Vec<PathBuf>,
    pub no_mirror: bool,
    pub style: StyleArgs,
    pub output: Option<PathBuf>,
}

/// List all available cameras
pub fn list_cameras() -> CliResult {
    let backend = get_backend();
    let cameras = backend.enumerate_cameras();

    if cameras.is_empty() {
        println!("No cameras found.");
        return Ok(());
    }

    println!("Available cameras:");
    println!();
    for (index, camera) in cameras.iter().enumerate() {
        println!("  [{}] {}", index, camera.name);
        match &camera.driver {
            Some(driver) => println!("      {} ({})", camera.path, driver),
            None => println!("      {}", camera.path),
        }
    }
    println!();

    Ok(())
}

/// Run the timed four-shot sequence and save the composite
pub fn shoot(options: ShootOptions) -> CliResult {
    let mut config = Config::load();
    if let Some(camera) = options.camera {
        config.camera_index = camera;
    }
    if options.no_mirror {
        config.mirror = false;
    }
    let spec = options.style.apply(config.composite);

    let backend: Box<dyn CameraBackend> = if options.source.is_empty() {
        get_backend()
    } else {
        Box::new(VirtualBackend::from_paths(&options.source)?)
    };
    let request = StreamRequest {
        device_index: config.camera_index,
        ideal_width: config.ideal_width,
        ideal_height: config.ideal_height,
        ..StreamRequest::default()
    };
    let sequencer_options = SequencerOptions {
        timing: config.timing,
        failure_policy: config.capture_failure,
        capture: config.capture_settings(),
    };

    // Set up Ctrl+C handler
    let stop_flag = Arc::new(AtomicBool::new(false));
    let stop_flag_clone = stop_flag.clone();
    ctrlc::set_handler(move || {
        stop_flag_clone.store(true, Ordering::SeqCst);
    })?;

    let rt = tokio::runtime::Runtime::new()?;
    let stills = rt.block_on(run_sequence(
        backend.as_ref(),
        &request,
        sequencer_options,
        &stop_flag,
    ));

    let stills: Vec<StillImage> = match stills {
        Ok(Some(stills)) => stills,
        Ok(None) => {
            println!("Cancelled.");
            return Ok(());
        }
        Err(e) => return Err(e),
    };

    println!("Captured {} of {} shots", stills.len(), TOTAL_SHOTS);
    let output_dir = config.output_dir();
    let path = rt.block_on(render_and_save(stills, spec, options.output, &output_dir))?;
    println!("Composite saved: {}", path.display());

    Ok(())
}

/// Compose existing images into a composite
pub fn compose_images(inputs: Vec<PathBuf>, style: StyleArgs, output: Option<PathBuf>) -> CliResult {
    let config = Config::load();
    let spec = style.apply(config.composite);

    let paths = collect_image_paths(&inputs)?;
    if paths.len() > TOTAL_SHOTS {
        println!(
            "Using the first {} of {} images",
            TOTAL_SHOTS,
            paths.len()
        );
    }

    let mut stills = Vec::with_capacity(TOTAL_SHOTS);
    for (index, path) in paths.iter().take(TOTAL_SHOTS).enumerate() {
        let frame = load_image_as_frame(path)?;
        let cropped = crop_and_mirror(&frame, false)?;
        stills.push(StillImage::encode(index, &cropped, config.jpeg_quality)?);
        println!("  [{}] {}", index + 1, path.display());
    }

    let rt = tokio::runtime::Runtime::new()?;
    let path = rt.block_on(render_and_save(stills, spec, output, &config.output_dir()))?;
    println!("Composite saved: {}", path.display());

    Ok(())
}

/// Drive the sequencer with a terminal status line
///
/// `Ok(None)` when cancelled with Ctrl+C.
async fn run_sequence(
    backend: &dyn CameraBackend,
    request: &StreamRequest,
    options: SequencerOptions,
    stop_flag: &AtomicBool,
) -> Result<Option<Vec<StillImage>>, Box<dyn std::error::Error>> {
    let (done_tx, done_rx) = oneshot::channel();
    let mut sequencer = CaptureSequencer::open(backend, request, options, move |stills| {
        let _ = done_tx.send(stills);
    });

    match sequencer.state() {
        SequencerState::Ready { resolution } => {
            println!(
                "Camera ready: {}x{} (press Ctrl+C to cancel)",
                resolution.0, resolution.1
            );
        }
        SequencerState::Failed { error } => {
            sequencer.cancel();
            return Err(format!("{} ({})", error.user_message(), error).into());
        }
        other => return Err(format!("Unexpected camera state: {:?}", other).into()),
    }

    sequencer.start();
    let mut states = sequencer.subscribe();
    loop {
        let state = states.borrow_and_update().clone();
        print!("\r{:<40}", status_line(&state));
        std::io::stdout().flush()?;

        if state.is_terminal() {
            break;
        }
        if stop_flag.load(Ordering::SeqCst) {
            sequencer.cancel();
            break;
        }

        tokio::select! {
            changed = states.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = tokio::time::sleep(Duration::from_millis(100)) => {}
        }
    }
    println!();
    sequencer.join().await;

    match sequencer.state() {
        SequencerState::Completed => Ok(Some(done_rx.await?)),
        SequencerState::Cancelled => Ok(None),
        SequencerState::Aborted => Err("Capture failed: a shot could not be taken".into()),
        other => Err(format!("Sequence ended in state {:?}", other).into()),
    }
}

/// Render through a composite session and write the result
async fn render_and_save(
    stills: Vec<StillImage>,
    spec: CompositeSpec,
    output: Option<PathBuf>,
    default_dir: &Path,
) -> Result<PathBuf, Box<dyn std::error::Error>> {
    println!(
        "Rendering {} layout, {} filter, {} theme...",
        spec.layout,
        spec.filter.label(),
        spec.theme.label()
    );
    let mut session = CompositeSession::new(spec);
    session.set_stills(stills);
    let image: CompositeImage = session
        .settled()
        .await
        .ok_or("Nothing to render: no stills were captured")?;

    let path = match output {
        Some(path) if path.is_dir() => save_composite(&image, &path).await?,
        Some(path) => {
            write_composite(&image, &path).await?;
            path
        }
        None => save_composite(&image, default_dir).await?,
    };
    Ok(path)
}

/// One-line terminal status for a sequencer state
fn status_line(state: &SequencerState) -> String {
    match state {
        SequencerState::Setup => "CONNECTING...".to_string(),
        SequencerState::Ready { .. } => "READY".to_string(),
        SequencerState::Failed { error } => error.user_message().to_string(),
        SequencerState::Running {
            shot,
            captured,
            phase,
        } => {
            let prompt = match phase {
                ShotPhase::Intermission => "NEXT SHOT...".to_string(),
                ShotPhase::Countdown(n) => n.to_string(),
                ShotPhase::Snap | ShotPhase::Flash => "SNAP!".to_string(),
                ShotPhase::Settling => "...".to_string(),
            };
            format!(
                "[shot {}/{}] [{} taken] {}",
                shot + 1,
                TOTAL_SHOTS,
                captured,
                prompt
            )
        }
        SequencerState::Waiting { .. } => "PROCESSING...".to_string(),
        SequencerState::Completed => "DONE".to_string(),
        SequencerState::Cancelled => "CANCELLED".to_string(),
        SequencerState::Aborted => "CAPTURE FAILED".to_string(),
    }
}
