//! Forward/inverse N-dimensional transforms behind a swappable backend.

use ndarray::{ArrayD, Axis};
use num_complex::Complex64;
use rustfft::{Fft, FftDirection, FftPlanner};

/// Minimal transform capability needed by the stepper and diagnostics.
///
/// `forward` is unnormalised; `inverse` scales by `1 / N` so that
/// `inverse(forward(x)) == x` up to round-off.
pub trait SpectralBackend {
    fn forward(&mut self, field: &ArrayD<f64>) -> ArrayD<Complex64>;
    fn inverse(&mut self, spectrum: &mut ArrayD<Complex64>);
}

/// CPU backend on `rustfft`, transforming one axis at a time.
pub struct RustFftBackend {
    planner: FftPlanner<f64>,
    lane: Vec<Complex64>,
    scratch: Vec<Complex64>,
}

impl Default for RustFftBackend {
    fn default() -> Self {
        RustFftBackend::new()
    }
}

impl RustFftBackend {
    pub fn new() -> RustFftBackend {
        RustFftBackend {
            planner: FftPlanner::new(),
            lane: Vec::new(),
            scratch: Vec::new(),
        }
    }

    fn transform_axes(&mut self, data: &mut ArrayD<Complex64>, direction: FftDirection) {
        for axis in 0..data.ndim() {
            let len = data.len_of(Axis(axis));
            if len < 2 {
                continue;
            }
            // planner caches plans, so repeated steps reuse the same twiddles
            let fft = self.planner.plan_fft(len, direction);
            self.scratch
                .resize(fft.get_inplace_scratch_len(), Complex64::default());

            for mut lane in data.lanes_mut(Axis(axis)) {
                self.lane.clear();
                self.lane.extend(lane.iter().copied());
                fft.process_with_scratch(&mut self.lane, &mut self.scratch);
                for (dst, src) in lane.iter_mut().zip(self.lane.iter()) {
                    *dst = *src;
                }
            }
        }
    }
}

impl SpectralBackend for RustFftBackend {
    fn forward(&mut self, field: &ArrayD<f64>) -> ArrayD<Complex64> {
        let mut out = field.mapv(|v| Complex64::new(v, 0.0));
        self.transform_axes(&mut out, FftDirection::Forward);
        out
    }

    fn inverse(&mut self, spectrum: &mut ArrayD<Complex64>) {
        self.transform_axes(spectrum, FftDirection::Inverse);
        let scale = 1.0 / spectrum.len().max(1) as f64;
        spectrum.mapv_inplace(|c| c * scale);
    }
}
