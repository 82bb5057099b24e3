use crate::device::ClearDevice;
use crate::lifecycle::{Colors, process_variant};
use crate::matrix::{Variant, variants};
use crate::pool::PixelPool;
use crate::report::{ReportError, Reporter};
use crate::verify::FaceSample;
use cubeclear_common::{DriverStatus, Rgba8};
use serde::{Deserialize, Serialize};

/// Probe configuration.
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// Edge length of each cube face in texels.
    pub face_size: u32,
    /// Color of the layered framebuffer clear under test.
    pub clear_color: Rgba8,
    /// Color of the seed data and of the full-texture pre-clear.
    pub seed_color: Rgba8,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            face_size: 256,
            clear_color: Rgba8::RED,
            seed_color: Rgba8::WHITE,
        }
    }
}

/// Outcome of one variant: six face verdicts and the driver status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantResult {
    pub variant: Variant,
    pub faces: Vec<FaceSample>,
    pub status: DriverStatus,
}

impl VariantResult {
    pub fn all_pass(&self) -> bool {
        self.faces.iter().all(|s| s.pass)
    }

    pub fn verdicts(&self) -> Vec<bool> {
        self.faces.iter().map(|s| s.pass).collect()
    }
}

/// One full pass over the variant matrix.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunResult {
    pub variants: Vec<VariantResult>,
}

impl RunResult {
    /// Number of faces whose clear did not verify.
    pub fn failing_faces(&self) -> usize {
        self.variants
            .iter()
            .flat_map(|v| &v.faces)
            .filter(|s| !s.pass)
            .count()
    }

    /// Whether both passes produced the same verdict for every face.
    pub fn same_verdicts(&self, other: &RunResult) -> bool {
        self.variants.len() == other.variants.len()
            && self
                .variants
                .iter()
                .zip(&other.variants)
                .all(|(a, b)| a.variant == b.variant && a.verdicts() == b.verdicts())
    }
}

/// Walks the variant matrix against one device.
///
/// Owns the pixel pool for as long as the probe lives; each variant's GPU
/// objects live only inside [`Probe::run_variant`].
pub struct Probe<D: ClearDevice> {
    device: D,
    pool: PixelPool,
    config: ProbeConfig,
}

impl<D: ClearDevice> Probe<D> {
    pub fn new(device: D, config: ProbeConfig) -> Self {
        let pool = PixelPool::new(config.face_size, config.seed_color);
        Self {
            device,
            pool,
            config,
        }
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    pub fn into_device(self) -> D {
        self.device
    }

    /// Run every variant once, in matrix order.
    pub fn run<R: Reporter + ?Sized>(&mut self, reporter: &mut R) -> Result<RunResult, ReportError> {
        let _span = tracing::info_span!("probe_run", face_size = self.config.face_size).entered();
        let mut result = RunResult::default();
        for variant in variants() {
            result.variants.push(self.run_variant(variant, reporter)?);
        }
        tracing::info!(
            variants = result.variants.len(),
            failing_faces = result.failing_faces(),
            "matrix complete"
        );
        Ok(result)
    }

    /// Run one variant. Its texture and framebuffer are gone before this
    /// returns, whether or not reporting succeeds.
    pub fn run_variant<R: Reporter + ?Sized>(
        &mut self,
        variant: Variant,
        reporter: &mut R,
    ) -> Result<VariantResult, ReportError> {
        let _span =
            tracing::info_span!("variant", id = variant.id, mode = ?variant.mode).entered();
        let colors = Colors {
            clear: self.config.clear_color,
            seed: self.config.seed_color,
        };
        let (faces, status) = process_variant(&mut self.device, &mut self.pool, variant, colors);

        for sample in &faces {
            reporter.face(variant, sample)?;
        }
        reporter.driver_status(variant, status)?;

        if let Some(err) = status.0 {
            tracing::warn!(code = err.code(), "driver error pending: {err}");
        }
        Ok(VariantResult {
            variant,
            faces,
            status,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::{CubeTarget, Stage};
    use crate::matrix::{Allocation, AllocationMode, StorageKind};
    use crate::report::{TextReporter, TracingReporter};
    use crate::sim::{Call, CallKind, GARBAGE, Quirk, SimulatedDevice};
    use cubeclear_common::{CubeFace, DriverError, FACE_COUNT};

    fn small() -> ProbeConfig {
        ProbeConfig {
            face_size: 8,
            ..Default::default()
        }
    }

    fn run_with(device: SimulatedDevice) -> (RunResult, SimulatedDevice) {
        let mut probe = Probe::new(device, small());
        let result = probe.run(&mut TracingReporter).unwrap();
        (result, probe.into_device())
    }

    /// Split a call log into one slice per variant, starting at each create.
    fn per_variant(calls: &[Call]) -> Vec<&[Call]> {
        let starts: Vec<usize> = calls
            .iter()
            .enumerate()
            .filter(|(_, c)| c.kind() == CallKind::CreateCube)
            .map(|(i, _)| i)
            .collect();
        starts
            .iter()
            .enumerate()
            .map(|(n, &start)| {
                let end = starts.get(n + 1).copied().unwrap_or(calls.len());
                &calls[start..end]
            })
            .collect()
    }

    #[test]
    fn compliant_driver_clears_every_face() {
        let (result, _) = run_with(SimulatedDevice::compliant());
        assert_eq!(result.variants.len(), 5);
        for v in &result.variants {
            assert_eq!(v.faces.len(), FACE_COUNT);
            assert!(v.status.is_ok());
            for s in &v.faces {
                assert_eq!(s.pixel, Rgba8([0xFF, 0x00, 0x00, 0xFF]));
                assert!(s.pass);
            }
        }
        assert_eq!(result.failing_faces(), 0);
    }

    #[test]
    fn seeding_does_not_change_outcome() {
        let (result, _) = run_with(SimulatedDevice::compliant());
        assert_eq!(result.variants[1].faces, result.variants[0].faces);
    }

    #[test]
    fn divergent_driver_leaves_first_layer() {
        let quirk = Quirk::skips_first_layer(StorageKind::Immutable);
        let (result, _) = run_with(SimulatedDevice::new(quirk));

        let immutable = &result.variants[3];
        assert_eq!(immutable.variant.mode, AllocationMode::ImmutableStorage);
        assert!(!immutable.faces[0].pass);
        assert_eq!(immutable.faces[0].pixel, Rgba8([GARBAGE; 4]));
        assert!(immutable.faces[1..].iter().all(|s| s.pass));

        let pre_cleared = &result.variants[4];
        assert!(!pre_cleared.faces[0].pass);
        assert_eq!(pre_cleared.faces[0].pixel, Rgba8::WHITE);

        assert!(result.variants[..3].iter().all(VariantResult::all_pass));
        assert_eq!(result.failing_faces(), 2);
    }

    #[test]
    fn face_order_is_identical_across_variants() {
        let (result, _) = run_with(SimulatedDevice::compliant());
        for v in &result.variants {
            let faces: Vec<_> = v.faces.iter().map(|s| s.face).collect();
            assert_eq!(faces, CubeFace::ALL);
        }
    }

    #[test]
    fn resources_never_outlive_their_variant() {
        let (_, device) = run_with(SimulatedDevice::compliant());
        assert_eq!(device.live_textures(), 0);
        assert_eq!(device.live_framebuffers(), 0);
        assert_eq!(device.bound_framebuffer(), None);
        assert_eq!(device.peak_live_textures(), 1);

        let segments = per_variant(device.calls());
        assert_eq!(segments.len(), 5);
        for segment in segments {
            assert_eq!(segment.last(), Some(&Call::Destroy));
            assert!(segment.contains(&Call::Detach));
        }
    }

    #[test]
    fn pre_clear_variants_differ_only_by_inserted_clear() {
        let (_, device) = run_with(SimulatedDevice::compliant());
        let segments = per_variant(device.calls());

        for (base, pre) in [(0, 2), (3, 4)] {
            let inserted: Vec<_> = segments[pre]
                .iter()
                .filter(|c| c.kind() == CallKind::ClearTexture)
                .collect();
            assert_eq!(
                inserted,
                [&Call::ClearTexture {
                    color: Rgba8::WHITE
                }]
            );
            let stripped: Vec<_> = segments[pre]
                .iter()
                .filter(|c| c.kind() != CallKind::ClearTexture)
                .collect();
            let plain: Vec<_> = segments[base].iter().collect();
            assert_eq!(stripped, plain);

            let attach = segments[pre]
                .iter()
                .position(|c| *c == Call::AttachLayered)
                .unwrap();
            assert_eq!(segments[pre][attach - 1].kind(), CallKind::ClearTexture);
        }
    }

    #[test]
    fn allocation_call_shapes() {
        let (_, device) = run_with(SimulatedDevice::compliant());
        let segments = per_variant(device.calls());

        let specs = |seg: &[Call]| {
            seg.iter()
                .filter(|c| c.kind() == CallKind::SpecifyFace)
                .cloned()
                .collect::<Vec<_>>()
        };
        assert_eq!(specs(segments[0]).len(), 6);
        assert!(specs(segments[1]).contains(&Call::SpecifyFace {
            face: CubeFace::NegativeZ,
            seeded: true
        }));
        assert!(specs(segments[3]).is_empty());
        assert_eq!(
            segments[3]
                .iter()
                .filter(|c| **c == Call::AllocateStorage { levels: 1 })
                .count(),
            1
        );
    }

    #[test]
    fn driver_error_is_reported_and_run_continues() {
        let mut device = SimulatedDevice::compliant();
        device.fail_on(CallKind::AttachLayered, DriverError::InvalidOperation);
        let (result, device) = run_with(device);

        let first = &result.variants[0];
        assert_eq!(first.status.code(), 0x0502);
        assert!(first.faces.iter().all(|s| !s.pass));
        assert!(result.variants[1..].iter().all(|v| v.status.is_ok() && v.all_pass()));
        assert_eq!(device.live_textures(), 0);
        assert_eq!(device.live_framebuffers(), 0);
    }

    #[test]
    fn readback_failure_keeps_other_faces() {
        let mut device = SimulatedDevice::compliant();
        device.fail_on(CallKind::ReadFace, DriverError::Internal);
        let mut probe = Probe::new(device, small());
        let first = probe
            .run_variant(variants().next().unwrap(), &mut TracingReporter)
            .unwrap();
        assert_eq!(first.status, DriverError::Internal.into());
        assert!(first.faces[1..].iter().all(|s| s.pass));
    }

    #[test]
    fn failed_readback_after_passing_variant_does_not_pass() {
        let mut probe = Probe::new(SimulatedDevice::compliant(), small());
        let mut all = variants();
        let first = probe
            .run_variant(all.next().unwrap(), &mut TracingReporter)
            .unwrap();
        assert!(first.faces.iter().all(|s| s.pass));

        probe
            .device_mut()
            .fail_on(CallKind::ReadFace, DriverError::Internal);
        let second = probe
            .run_variant(all.next().unwrap(), &mut TracingReporter)
            .unwrap();
        assert!(!second.faces[0].pass);
        assert_eq!(second.faces[0].pixel, Rgba8::default());
        assert_eq!(second.status, DriverError::Internal.into());
        assert!(second.faces[1..].iter().all(|s| s.pass));
    }

    #[test]
    fn two_passes_agree() {
        let quirk = Quirk::clears_first_layer_only(StorageKind::Immutable);
        let mut probe = Probe::new(SimulatedDevice::new(quirk), small());
        let first = probe.run(&mut TracingReporter).unwrap();
        let second = probe.run(&mut TracingReporter).unwrap();
        assert!(first.same_verdicts(&second));
        assert_eq!(first, second);
        assert_eq!(first.failing_faces(), 10);
    }

    #[test]
    fn text_stream_has_seven_lines_per_variant() {
        let mut probe = Probe::new(SimulatedDevice::compliant(), small());
        let mut reporter = TextReporter::new(Vec::new());
        probe.run(&mut reporter).unwrap();
        let text = String::from_utf8(reporter.into_inner()).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 5 * 7);
        assert_eq!(lines[0], "variant0: FACE0: 0xff 0x00 0x00 0xff OK: 1");
        assert_eq!(lines[6], "variant0: error: 0x0");
        assert_eq!(lines[34], "variant4: error: 0x0");
    }

    #[test]
    fn reporter_failure_still_releases_resources() {
        struct Broken;
        impl std::io::Write for Broken {
            fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
                Err(std::io::Error::other("closed"))
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let mut probe = Probe::new(SimulatedDevice::compliant(), small());
        let err = probe.run(&mut TextReporter::new(Broken)).unwrap_err();
        assert!(matches!(err, ReportError::Io(_)));
        assert_eq!(probe.device().live_textures(), 0);
    }

    #[test]
    fn dropped_guard_destroys_handles() {
        let mut device = SimulatedDevice::compliant();
        {
            let mut target = CubeTarget::create(&mut device, 4);
            target.allocate(Allocation::Immutable { levels: 1 }, &[]);
            target.attach();
            assert_eq!(target.stage(), Stage::Attached);
        }
        assert_eq!(device.live_textures(), 0);
        assert_eq!(device.bound_framebuffer(), None);
    }

    #[test]
    fn diverging_passes_are_detected() {
        let (good, _) = run_with(SimulatedDevice::compliant());
        let (bad, _) = run_with(SimulatedDevice::new(Quirk::skips_first_layer(
            StorageKind::Mutable,
        )));
        assert!(!good.same_verdicts(&bad));
        assert!(good.same_verdicts(&good.clone()));
    }
}
