//! Cooperative execution of one segmentation pass driven by the host.
//!
//! The host owns the processing loop. Before every iteration the segmentation reports progress
//! and polls the host, which answers whether to go on, to restart with (possibly) changed
//! parameters or to exit. Nothing is interrupted in the middle of a sweep.

use crate::arrays::{Array2D, LABImage, PackedImage, RgbaBuffer};
use crate::common::Config;
use crate::error::{Error, Result};
use crate::render::render;
use crate::slic::{iteration, Clusters, UNASSIGNED};
use log::{debug, trace, warn};
use std::panic::{catch_unwind, AssertUnwindSafe};

/// State in which the host is polled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProcessState {
    Start,
    Continue,
    End,
}

/// Answer of the host to a poll.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProcessResult {
    Continue,
    /// Drop everything and run again from ingestion.
    Restart,
    /// Drop everything, produce no output.
    Exit,
}

/// Progress and control protocol of the host.
pub trait Host {
    /// Declared once per pass, before any progress.
    fn set_progress_total(&mut self, total: u32);
    /// Monotonic number of done units.
    fn set_progress_done(&mut self, done: u32);
    fn process(&mut self, state: ProcessState) -> ProcessResult;
}

/// Whole filter integration: parameters, source surface and destination surface.
pub trait FilterHost: Host {
    /// Current values of the user properties.
    fn parameters(&mut self) -> Config;
    /// Copies the source surface out of the host. Fails with `Error::ResourceAcquisition` when
    /// the host can't provide it.
    fn acquire_source(&mut self) -> Result<SourceImage>;
    /// Copies the result back at `origin`, the same place the source was read from.
    fn write_destination(&mut self, origin: (i32, i32), output: &RgbaBuffer) -> Result<()>;
}

/// Source pixels copied out of the host. Owned, so it's released on every exit path of the
/// pass.
#[derive(Debug, Clone)]
pub struct SourceImage {
    pub data: Vec<u8>,
    /// Top-left corner of the extent in host coordinates.
    pub origin: (i32, i32),
    pub width: i32,
    pub height: i32,
    pub row_stride: usize,
    pub bytes_per_pixel: usize,
}

impl SourceImage {
    pub fn as_packed(&self) -> Result<PackedImage<'_>> {
        PackedImage::new(
            &self.data,
            self.width,
            self.height,
            self.row_stride,
            self.bytes_per_pixel,
        )
    }
}

/// Where the segmentation is. `Converting(i)` means iteration `i` is the next one to run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Setup,
    Converting(u16),
    Rendering,
    Done,
    /// Host answered `Restart` or `Exit`.
    Aborted(ProcessResult),
}

/// How a segmentation run ended.
#[derive(Debug)]
pub enum Completion {
    Finished(RgbaBuffer),
    Restart,
    Exit,
}

/// How a whole filter run ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// At least one pass was written to the destination and the host ended the run.
    Completed,
    /// Host asked to exit, nothing more is written.
    Exited,
}

/// All state of one segmentation invocation. Buffers are allocated on ingestion and released
/// when it's dropped.
pub struct Segmentation {
    config: Config,
    image: LABImage,
    output: RgbaBuffer,
    clusters: Clusters,
    min_distances: Array2D<f64>,
    stage: Stage,
    progress_done: u32,
}

impl Segmentation {
    /// Ingests the source. Clusters are seeded in the `Setup` stage.
    pub fn new(source: &PackedImage, config: &Config) -> Self {
        let (image, output) = LABImage::from_packed(source);
        let min_distances = Array2D::from_fill(f64::INFINITY, image.width, image.height);
        let clusters = Clusters {
            assignments: Array2D::from_fill(UNASSIGNED, image.width, image.height),
            clusters: Vec::new(),
            search_region_size: config.step(),
        };
        Self {
            config: config.clone(),
            image,
            output,
            clusters,
            min_distances,
            stage: Stage::Setup,
            progress_done: 0,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn clusters(&self) -> &Clusters {
        &self.clusters
    }

    pub fn image(&self) -> &LABImage {
        &self.image
    }

    fn report_progress<H: Host + ?Sized>(&mut self, host: &mut H) {
        self.progress_done += 1;
        host.set_progress_done(self.progress_done);
    }

    /// Advances by one stage and returns the new one. Terminal stages stay as they are.
    pub fn step<H: Host + ?Sized>(&mut self, host: &mut H) -> Stage {
        let current = self.stage;
        self.stage = match current {
            Stage::Setup => {
                self.clusters = Clusters::initialize_clusters(&self.image, &self.config);
                self.report_progress(host);
                if self.config.max_iterations > 0 {
                    Stage::Converting(0)
                } else {
                    Stage::Rendering
                }
            }
            Stage::Converting(i) => {
                self.report_progress(host);
                match host.process(ProcessState::Continue) {
                    ProcessResult::Continue => {
                        iteration(
                            &self.image,
                            &self.config,
                            &mut self.clusters,
                            &mut self.min_distances,
                            i,
                        );
                        if i + 1 < self.config.max_iterations {
                            Stage::Converting(i + 1)
                        } else {
                            Stage::Rendering
                        }
                    }
                    abort => {
                        debug!("host answered {abort:?} before iteration {i}");
                        Stage::Aborted(abort)
                    }
                }
            }
            Stage::Rendering => {
                self.report_progress(host);
                render(&self.clusters, &mut self.output);
                Stage::Done
            }
            stage @ (Stage::Done | Stage::Aborted(_)) => stage,
        };
        trace!("segmentation stage {:?}", self.stage);
        self.stage
    }

    /// Runs until done or aborted. Consumes the state, on abort everything is dropped.
    pub fn run<H: Host + ?Sized>(mut self, host: &mut H) -> Completion {
        loop {
            match self.step(host) {
                Stage::Done => return Completion::Finished(self.output),
                Stage::Aborted(ProcessResult::Restart) => return Completion::Restart,
                Stage::Aborted(_) => return Completion::Exit,
                _ => {}
            }
        }
    }
}

/// Segments a buffer with no host interaction and returns the flattened RGBA image.
pub fn segment(source: &PackedImage, config: &Config) -> RgbaBuffer {
    struct Unattended;
    impl Host for Unattended {
        fn set_progress_total(&mut self, _total: u32) {}
        fn set_progress_done(&mut self, _done: u32) {}
        fn process(&mut self, _state: ProcessState) -> ProcessResult {
            ProcessResult::Continue
        }
    }
    match Segmentation::new(source, config).run(&mut Unattended) {
        Completion::Finished(output) => output,
        Completion::Restart | Completion::Exit => {
            unreachable!("unattended host never aborts")
        }
    }
}

fn run_passes<H: FilterHost + ?Sized>(host: &mut H) -> Result<Outcome> {
    loop {
        if host.process(ProcessState::Start) == ProcessResult::Exit {
            debug!("host exited before the pass started");
            return Ok(Outcome::Exited);
        }
        let config = host.parameters();
        debug!(
            "pass start: cell size {}, compactness {}",
            config.cell_size, config.compactness
        );
        let source = host.acquire_source()?;
        let packed = source.as_packed()?;
        debug!(
            "source {}x{} at {:?}, {} bytes per pixel",
            packed.width, packed.height, source.origin, packed.bytes_per_pixel
        );
        host.set_progress_total(config.progress_total());
        let output = match Segmentation::new(&packed, &config).run(host) {
            Completion::Finished(output) => output,
            Completion::Restart => {
                debug!("restart requested");
                continue;
            }
            Completion::Exit => {
                debug!("exit requested");
                return Ok(Outcome::Exited);
            }
        };
        host.write_destination(source.origin, &output)?;
        drop(output);
        drop(source);
        debug!("pass finished");
        if host.process(ProcessState::End) != ProcessResult::Restart {
            return Ok(Outcome::Completed);
        }
        debug!("restart requested after the pass");
    }
}

/// Runs the filter against the host until it ends or exits.
///
/// Every pass re-reads the parameters and the source. Failures of a pass (invalid geometry,
/// host resources, unexpected panics) end the run with an error and nothing more is written.
pub fn run_filter<H: FilterHost + ?Sized>(host: &mut H) -> Result<Outcome> {
    let result = catch_unwind(AssertUnwindSafe(|| run_passes(host))).unwrap_or_else(|payload| {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        Err(Error::Fault(message))
    });
    if let Err(error) = &result {
        warn!("filter run failed: {error}");
    }
    result
}
