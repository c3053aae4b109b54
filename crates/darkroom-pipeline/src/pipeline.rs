//! Incremental pipeline: advance stage-by-stage, inspecting each
//! intermediate buffer before continuing.
//!
//! Unlike [`crate::process`] which runs the entire pipeline in one
//! call, [`Pipeline`] lets the caller drive execution one step at a time:
//!
//! ```rust
//! # use darkroom_pipeline::{Adjustments, Pipeline, PipelineError, RgbaImage};
//! # fn run(source: RgbaImage) -> Result<(), PipelineError> {
//! let params = Adjustments { exposure: 20.0, sharpness: 3.0, ..Adjustments::default() };
//! let staged = Pipeline::new(source, params)
//!     .tone()?
//!     .sharpen()
//!     .vignette()
//!     .into_result();
//! # Ok(())
//! # }
//! ```
//!
//! Each stage method consumes `self` and returns the next pipeline
//! state, carrying all previously computed buffers. Only
//! [`Pending::tone`] is fallible: parameter validation happens there,
//! before any pixel is written.
//!
//! # Memory
//!
//! Every stage retains the source snapshot and all earlier buffers, so
//! a fully advanced pipeline holds three or four copies of the image.
//! Callers that only need the final buffer should prefer
//! [`crate::process`].

use crate::diagnostics::StageMetrics;
use crate::kernel::Kernel;
use crate::types::{Adjustments, Dimensions, PipelineError, RgbaImage, StagedResult};

// ───────────────────────── Stage 0: Pending ──────────────────────────

/// Pipeline state before any processing has occurred.
///
/// The source snapshot and parameters are stored but not yet touched.
/// Call [`tone`](Self::tone) to advance.
#[must_use = "pipeline stages are consumed by advancing; call .tone() to continue"]
pub struct Pending {
    params: Adjustments,
    source: RgbaImage,
}

impl Pending {
    /// The source snapshot.
    #[must_use]
    pub const fn source(&self) -> &RgbaImage {
        &self.source
    }

    /// Parameters for this run.
    #[must_use]
    pub const fn params(&self) -> &Adjustments {
        &self.params
    }

    /// Validate the parameters, then apply the tone stage to a copy of
    /// the source.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidParameter`] if any control is
    /// non-finite. The source is untouched in that case.
    pub fn tone(self) -> Result<Toned, PipelineError> {
        self.params.validate()?;
        let mut toned = self.source.clone();
        crate::tone::apply_tone(&mut toned, &self.params);
        tracing::debug!(
            width = toned.width(),
            height = toned.height(),
            "tone stage complete"
        );
        Ok(Toned {
            params: self.params,
            source: self.source,
            toned,
        })
    }
}

// ───────────────────────── Stage 1: Toned ────────────────────────────

/// Pipeline state after the tone stage.
///
/// Call [`sharpen`](Self::sharpen) to advance.
#[must_use = "pipeline stages are consumed by advancing; call .sharpen() to continue"]
pub struct Toned {
    params: Adjustments,
    source: RgbaImage,
    toned: RgbaImage,
}

impl Toned {
    /// The tone-adjusted buffer.
    #[must_use]
    pub const fn toned(&self) -> &RgbaImage {
        &self.toned
    }

    /// Advance to the sharpen stage.
    ///
    /// When `params.sharpness <= 0` the convolution is skipped and the
    /// next stage carries no sharpened buffer.
    pub fn sharpen(self) -> Sharpened {
        let kernel = Kernel::sharpen(self.params.sharpness);
        let sharpened = kernel
            .as_ref()
            .map(|k| crate::convolve::convolve(&self.toned, k));
        tracing::debug!(
            sharpness = self.params.sharpness,
            applied = sharpened.is_some(),
            "sharpen stage complete"
        );
        Sharpened {
            params: self.params,
            source: self.source,
            toned: self.toned,
            sharpened,
            kernel,
        }
    }
}

// ───────────────────────── Stage 2: Sharpened ────────────────────────

/// Pipeline state after the (optional) sharpening convolution.
///
/// Call [`vignette`](Self::vignette) to advance.
#[must_use = "pipeline stages are consumed by advancing; call .vignette() to continue"]
pub struct Sharpened {
    params: Adjustments,
    source: RgbaImage,
    toned: RgbaImage,
    sharpened: Option<RgbaImage>,
    kernel: Option<Kernel>,
}

impl Sharpened {
    /// The tone-adjusted buffer.
    #[must_use]
    pub const fn toned(&self) -> &RgbaImage {
        &self.toned
    }

    /// The sharpened buffer, or `None` if sharpening was skipped.
    #[must_use]
    pub const fn sharpened(&self) -> Option<&RgbaImage> {
        self.sharpened.as_ref()
    }

    /// The kernel that was applied, if any.
    #[must_use]
    pub const fn kernel(&self) -> Option<&Kernel> {
        self.kernel.as_ref()
    }

    /// The buffer the vignette stage will read: the sharpened buffer
    /// when sharpening ran, otherwise the toned buffer.
    #[must_use]
    pub fn working(&self) -> &RgbaImage {
        self.sharpened.as_ref().unwrap_or(&self.toned)
    }

    /// Advance to the vignette stage.
    pub fn vignette(self) -> Vignetted {
        let mut vignetted = self.working().clone();
        crate::vignette::apply_vignette(&mut vignetted, self.params.vignette);
        tracing::debug!(amount = self.params.vignette, "vignette stage complete");
        Vignetted {
            params: self.params,
            source: self.source,
            toned: self.toned,
            sharpened: self.sharpened,
            vignetted,
        }
    }
}

// ───────────────────────── Stage 3: Vignetted ────────────────────────

/// Final pipeline state.
///
/// Call [`into_result`](Self::into_result) to collect every buffer.
#[must_use = "call .into_result() to collect the output"]
pub struct Vignetted {
    params: Adjustments,
    source: RgbaImage,
    toned: RgbaImage,
    sharpened: Option<RgbaImage>,
    vignetted: RgbaImage,
}

impl Vignetted {
    /// The final output buffer.
    #[must_use]
    pub const fn vignetted(&self) -> &RgbaImage {
        &self.vignetted
    }

    /// Image dimensions.
    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        Dimensions::of(&self.vignetted)
    }

    /// Consume the pipeline and return every intermediate buffer.
    #[must_use]
    pub fn into_result(self) -> StagedResult {
        let dimensions = self.dimensions();
        StagedResult {
            source: self.source,
            toned: self.toned,
            sharpened: self.sharpened,
            vignetted: self.vignetted,
            params: self.params,
            dimensions,
        }
    }

    /// Consume the pipeline and return only the final buffer.
    #[must_use]
    pub fn into_output(self) -> RgbaImage {
        self.vignetted
    }
}

// ───────────────────────── Stage trait ───────────────────────────────

/// Common interface for every pipeline stage.
pub trait PipelineStage: Sized {
    /// Short stage name for logs and diagnostics.
    const NAME: &'static str;

    /// Zero-based position in the pipeline.
    const INDEX: usize;

    /// The buffer this stage produced (the source for [`Pending`]).
    fn output(&self) -> &RgbaImage;

    /// Stage-specific metrics, or `None` for [`Pending`].
    fn metrics(&self) -> Option<StageMetrics>;

    /// Advance to the next stage.
    ///
    /// Returns `Ok(None)` if already at the final stage.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidParameter`] when leaving
    /// [`Pending`] with non-finite parameters.
    fn next(self) -> Result<Option<Stage>, PipelineError>;

    /// Run all remaining stages and return the [`StagedResult`].
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if a remaining fallible stage fails.
    fn complete(self) -> Result<StagedResult, PipelineError>;
}

impl PipelineStage for Pending {
    const NAME: &str = "source";
    const INDEX: usize = 0;

    fn output(&self) -> &RgbaImage {
        &self.source
    }

    fn metrics(&self) -> Option<StageMetrics> {
        None
    }

    fn next(self) -> Result<Option<Stage>, PipelineError> {
        Ok(Some(Stage::Toned(self.tone()?)))
    }

    fn complete(self) -> Result<StagedResult, PipelineError> {
        self.tone()?.complete()
    }
}

impl PipelineStage for Toned {
    const NAME: &str = "tone";
    const INDEX: usize = 1;

    fn output(&self) -> &RgbaImage {
        &self.toned
    }

    fn metrics(&self) -> Option<StageMetrics> {
        Some(StageMetrics::tone(&self.source, &self.toned))
    }

    fn next(self) -> Result<Option<Stage>, PipelineError> {
        Ok(Some(Stage::Sharpened(self.sharpen())))
    }

    fn complete(self) -> Result<StagedResult, PipelineError> {
        self.sharpen().complete()
    }
}

impl PipelineStage for Sharpened {
    const NAME: &str = "sharpen";
    const INDEX: usize = 2;

    fn output(&self) -> &RgbaImage {
        self.working()
    }

    fn metrics(&self) -> Option<StageMetrics> {
        Some(StageMetrics::sharpen(
            &self.toned,
            self.sharpened.as_ref(),
            self.kernel.as_ref(),
        ))
    }

    fn next(self) -> Result<Option<Stage>, PipelineError> {
        Ok(Some(Stage::Vignetted(self.vignette())))
    }

    fn complete(self) -> Result<StagedResult, PipelineError> {
        self.vignette().complete()
    }
}

impl PipelineStage for Vignetted {
    const NAME: &str = "vignette";
    const INDEX: usize = 3;

    fn output(&self) -> &RgbaImage {
        &self.vignetted
    }

    fn metrics(&self) -> Option<StageMetrics> {
        Some(StageMetrics::vignette(&self.vignetted, self.params.vignette))
    }

    fn next(self) -> Result<Option<Stage>, PipelineError> {
        Ok(None)
    }

    fn complete(self) -> Result<StagedResult, PipelineError> {
        Ok(self.into_result())
    }
}

// ───────────────────────── Stage enum ────────────────────────────────

/// Any pipeline stage, for loop-driven stepping.
///
/// ```rust
/// # use darkroom_pipeline::{Adjustments, Advance, Pipeline, PipelineError, RgbaImage, Stage};
/// # fn run(source: RgbaImage) -> Result<(), PipelineError> {
/// let mut stage = Stage::from(Pipeline::new(source, Adjustments::default()));
/// loop {
///     match stage.advance()? {
///         Advance::Next(next) => stage = next,
///         Advance::Complete(done) => {
///             stage = done;
///             break;
///         }
///     }
/// }
/// assert!(stage.is_complete());
/// # Ok(())
/// # }
/// ```
pub enum Stage {
    /// Stage 0.
    Pending(Pending),
    /// Stage 1.
    Toned(Toned),
    /// Stage 2.
    Sharpened(Sharpened),
    /// Stage 3.
    Vignetted(Vignetted),
}

/// Result of [`Stage::advance`]: either the next stage or the final
/// stage handed back unchanged.
#[must_use]
pub enum Advance {
    /// The pipeline advanced to this stage.
    Next(Stage),
    /// The pipeline was already at the final stage.
    Complete(Stage),
}

/// Dispatch a method call to whichever stage is held.
macro_rules! dispatch {
    ($self:expr, $s:ident => $body:expr) => {
        match $self {
            Stage::Pending($s) => $body,
            Stage::Toned($s) => $body,
            Stage::Sharpened($s) => $body,
            Stage::Vignetted($s) => $body,
        }
    };
}

impl Stage {
    /// Total number of stages.
    pub const COUNT: usize = 4;

    /// Short stage name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Pending(_) => Pending::NAME,
            Self::Toned(_) => Toned::NAME,
            Self::Sharpened(_) => Sharpened::NAME,
            Self::Vignetted(_) => Vignetted::NAME,
        }
    }

    /// Zero-based stage index.
    #[must_use]
    pub const fn index(&self) -> usize {
        match self {
            Self::Pending(_) => Pending::INDEX,
            Self::Toned(_) => Toned::INDEX,
            Self::Sharpened(_) => Sharpened::INDEX,
            Self::Vignetted(_) => Vignetted::INDEX,
        }
    }

    /// The buffer the current stage produced.
    #[must_use]
    pub fn output(&self) -> &RgbaImage {
        dispatch!(self, s => s.output())
    }

    /// Metrics for the current stage.
    #[must_use]
    pub fn metrics(&self) -> Option<StageMetrics> {
        dispatch!(self, s => s.metrics())
    }

    /// Whether this is the final stage.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        matches!(self, Self::Vignetted(_))
    }

    /// Advance one stage.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidParameter`] when leaving
    /// [`Stage::Pending`] with non-finite parameters.
    pub fn next(self) -> Result<Option<Self>, PipelineError> {
        dispatch!(self, s => s.next())
    }

    /// Advance one stage, handing the final stage back instead of
    /// consuming it.
    ///
    /// This is the loop-friendly version of [`next`](Self::next): the
    /// value in [`Advance::Complete`] can still be inspected or passed
    /// to [`complete`](Self::complete).
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidParameter`] when leaving
    /// [`Stage::Pending`] with non-finite parameters.
    pub fn advance(self) -> Result<Advance, PipelineError> {
        Ok(match self {
            Self::Pending(s) => Advance::Next(Self::Toned(s.tone()?)),
            Self::Toned(s) => Advance::Next(Self::Sharpened(s.sharpen())),
            Self::Sharpened(s) => Advance::Next(Self::Vignetted(s.vignette())),
            done @ Self::Vignetted(_) => Advance::Complete(done),
        })
    }

    /// Run all remaining stages.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if a remaining fallible stage fails.
    pub fn complete(self) -> Result<StagedResult, PipelineError> {
        dispatch!(self, s => s.complete())
    }
}

impl From<Pending> for Stage {
    fn from(s: Pending) -> Self {
        Self::Pending(s)
    }
}

impl From<Toned> for Stage {
    fn from(s: Toned) -> Self {
        Self::Toned(s)
    }
}

impl From<Sharpened> for Stage {
    fn from(s: Sharpened) -> Self {
        Self::Sharpened(s)
    }
}

impl From<Vignetted> for Stage {
    fn from(s: Vignetted) -> Self {
        Self::Vignetted(s)
    }
}

/// Entry point for the incremental pipeline.
pub struct Pipeline;

impl Pipeline {
    /// Start a pipeline run from an owned source snapshot.
    ///
    /// The snapshot is never modified; every stage writes to its own
    /// buffer.
    pub const fn new(source: RgbaImage, params: Adjustments) -> Pending {
        Pending { params, source }
    }
}
