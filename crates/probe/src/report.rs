//! Reporters: where per-face verdicts and per-variant driver status go.

use crate::matrix::Variant;
use crate::run::RunResult;
use crate::verify::FaceSample;
use cubeclear_common::DriverStatus;
use std::io::Write;

/// Errors writing a report. Driver errors never show up here.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Receives results as the matrix is walked. Observational only.
pub trait Reporter {
    fn face(&mut self, variant: Variant, sample: &FaceSample) -> Result<(), ReportError>;

    /// Called once per variant, after its six faces.
    fn driver_status(&mut self, variant: Variant, status: DriverStatus)
    -> Result<(), ReportError>;
}

/// Line-oriented diagnostic stream:
///
/// ```text
/// variant3: FACE0: 0xcd 0xcd 0xcd 0xcd OK: 0
/// variant3: error: 0x0
/// ```
pub struct TextReporter<W: Write> {
    out: W,
}

impl<W: Write> TextReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Reporter for TextReporter<W> {
    fn face(&mut self, variant: Variant, sample: &FaceSample) -> Result<(), ReportError> {
        writeln!(
            self.out,
            "variant{}: FACE{}: {} OK: {}",
            variant.id,
            sample.face.index(),
            sample.pixel,
            u8::from(sample.pass)
        )?;
        Ok(())
    }

    fn driver_status(
        &mut self,
        variant: Variant,
        status: DriverStatus,
    ) -> Result<(), ReportError> {
        writeln!(self.out, "variant{}: error: {:#x}", variant.id, status.code())?;
        self.out.flush()?;
        Ok(())
    }
}

/// Sends results to the log only.
#[derive(Debug, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn face(&mut self, variant: Variant, sample: &FaceSample) -> Result<(), ReportError> {
        if sample.pass {
            tracing::info!(
                variant = variant.id,
                face = sample.face.label(),
                pixel = %sample.pixel,
                "face cleared"
            );
        } else {
            tracing::warn!(
                variant = variant.id,
                face = sample.face.label(),
                pixel = %sample.pixel,
                "face not cleared"
            );
        }
        Ok(())
    }

    fn driver_status(
        &mut self,
        variant: Variant,
        status: DriverStatus,
    ) -> Result<(), ReportError> {
        match status.0 {
            None => tracing::info!(variant = variant.id, "no driver error"),
            Some(err) => tracing::warn!(
                variant = variant.id,
                code = err.code(),
                "driver error: {err}"
            ),
        }
        Ok(())
    }
}

/// Write every pass of a run as one JSON document.
pub fn write_json<W: Write>(out: W, passes: &[RunResult]) -> Result<(), ReportError> {
    serde_json::to_writer_pretty(out, passes)?;
    Ok(())
}
