// SPDX-License-Identifier: GPL-3.0-only

//! Reactive composite regeneration
//!
//! The session holds the current stills and selection. Every change bumps a
//! generation counter and spawns a full re-render; a finished render is only
//! published if its generation is still the latest, so a burst of changes
//! settles on the last one regardless of finishing order.

use super::renderer::{CompositeImage, CompositeSpec, RenderContext, compose};
use super::{FilterType, LayoutType, ThemeType};
use crate::pipelines::photo::StillImage;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Supplies the footer stamp for each render
pub type StampSource = Arc<dyn Fn() -> RenderContext + Send + Sync>;

/// Latest published render
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderOutput {
    /// Request this output answers
    pub generation: u64,
    /// `None` while pending (no stills, or the stills failed to decode)
    pub image: Option<CompositeImage>,
}

/// Holds stills + selection and keeps the composite up to date
pub struct CompositeSession {
    stills: Arc<[StillImage]>,
    spec: CompositeSpec,
    generation: Arc<AtomicU64>,
    output: Arc<watch::Sender<RenderOutput>>,
    stamp: StampSource,
    task: Option<JoinHandle<()>>,
}

impl CompositeSession {
    pub fn new(spec: CompositeSpec) -> Self {
        Self::with_stamp(spec, Arc::new(RenderContext::now))
    }

    /// Use a custom footer stamp source
    pub fn with_stamp(spec: CompositeSpec, stamp: StampSource) -> Self {
        let (output, _) = watch::channel(RenderOutput::default());
        Self {
            stills: Arc::from(Vec::new()),
            spec,
            generation: Arc::new(AtomicU64::new(0)),
            output: Arc::new(output),
            stamp,
            task: None,
        }
    }

    pub fn spec(&self) -> CompositeSpec {
        self.spec
    }

    pub fn stills(&self) -> &[StillImage] {
        &self.stills
    }

    /// Replace the stills and re-render
    pub fn set_stills(&mut self, stills: Vec<StillImage>) {
        self.stills = Arc::from(stills);
        self.regenerate();
    }

    pub fn set_layout(&mut self, layout: LayoutType) {
        self.set_spec(CompositeSpec {
            layout,
            ..self.spec
        });
    }

    pub fn set_filter(&mut self, filter: FilterType) {
        self.set_spec(CompositeSpec {
            filter,
            ..self.spec
        });
    }

    pub fn set_theme(&mut self, theme: ThemeType) {
        self.set_spec(CompositeSpec { theme, ..self.spec });
    }

    /// Replace the whole selection and re-render
    pub fn set_spec(&mut self, spec: CompositeSpec) {
        self.spec = spec;
        self.regenerate();
    }

    /// Generation of the most recent request
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Latest published composite, if any
    pub fn latest(&self) -> Option<CompositeImage> {
        self.output.borrow().image.clone()
    }

    /// Watch published renders
    pub fn subscribe(&self) -> watch::Receiver<RenderOutput> {
        self.output.subscribe()
    }

    /// Wait until the most recent request has been answered
    pub async fn settled(&self) -> Option<CompositeImage> {
        let target = self.generation();
        let mut rx = self.output.subscribe();
        let image = match rx.wait_for(|out| out.generation >= target).await {
            Ok(out) => out.image.clone(),
            Err(_) => None,
        };
        image
    }

    fn regenerate(&mut self) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(previous) = self.task.take() {
            previous.abort();
        }

        let stills = self.stills.clone();
        let spec = self.spec;
        let latest = self.generation.clone();
        let output = self.output.clone();
        let ctx = (self.stamp)();

        debug!(
            generation,
            stills = stills.len(),
            layout = %spec.layout,
            filter = %spec.filter,
            theme = %spec.theme,
            "Composite regeneration requested"
        );

        self.task = Some(tokio::spawn(async move {
            let image = match compose(&stills, spec, ctx).await {
                Ok(image) => image,
                Err(e) => {
                    warn!(generation, error = %e, "Composite render failed");
                    None
                }
            };

            let published = output.send_if_modified(|out| {
                if latest.load(Ordering::SeqCst) != generation {
                    return false;
                }
                *out = RenderOutput { generation, image };
                true
            });
            if !published {
                debug!(generation, "Superseded composite discarded");
            }
        }));
    }
}

impl Drop for CompositeSession {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn stills(n: usize) -> Vec<StillImage> {
        (0..n)
            .map(|i| {
                let frame = RgbImage::from_pixel(400, 300, Rgb([i as u8 * 50, 100, 150]));
                StillImage::encode(i, &frame, 90).unwrap()
            })
            .collect()
    }

    fn session() -> CompositeSession {
        CompositeSession::with_stamp(
            CompositeSpec::default(),
            Arc::new(|| RenderContext::new("1/1/2026, 12:00:00 AM")),
        )
    }

    #[tokio::test]
    async fn test_pending_until_stills_arrive() {
        let mut session = session();
        session.set_spec(CompositeSpec::default());
        assert_eq!(session.settled().await, None);

        session.set_stills(stills(4));
        let image = session.settled().await.unwrap();
        assert_eq!((image.width, image.height), (480, 1560));
        assert_eq!(session.latest(), Some(image));
    }

    #[tokio::test]
    async fn test_spec_change_rerenders() {
        let mut session = session();
        session.set_stills(stills(4));
        let strip = session.settled().await.unwrap();

        session.set_layout(LayoutType::Film);
        let film = session.settled().await.unwrap();
        assert_eq!((film.width, film.height), (1740, 580));
        assert_eq!(film.spec.layout, LayoutType::Film);
        assert_ne!(strip.png, film.png);
    }

    #[tokio::test]
    async fn test_latest_request_wins() {
        let mut session = session();
        session.set_stills(stills(4));
        session.set_layout(LayoutType::Grid);
        session.set_filter(FilterType::Sepia);
        session.set_theme(ThemeType::Dark);
        session.set_layout(LayoutType::Film);

        let image = session.settled().await.unwrap();
        assert_eq!(
            image.spec,
            CompositeSpec {
                layout: LayoutType::Film,
                filter: FilterType::Sepia,
                theme: ThemeType::Dark,
            }
        );
        assert_eq!(session.subscribe().borrow().generation, session.generation());
    }

    #[tokio::test]
    async fn test_same_inputs_same_bytes() {
        let mut session = session();
        session.set_stills(stills(4));
        let first = session.settled().await.unwrap();
        session.set_spec(CompositeSpec::default());
        let second = session.settled().await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_clearing_stills_clears_output() {
        let mut session = session();
        session.set_stills(stills(4));
        assert!(session.settled().await.is_some());
        session.set_stills(Vec::new());
        assert_eq!(session.settled().await, None);
        assert_eq!(session.latest(), None);
    }
}
