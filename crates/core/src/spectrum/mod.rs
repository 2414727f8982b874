use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use realfft::{num_complex::Complex32, RealFftPlanner, RealToComplex};

use crate::{config::SpectrumConfig, frame::PANEL_HEIGHT, LedMatrixError, Result};

/// Transform bins rendered as the sixteen display bars, low frequency to
/// high. The indices are log-spaced over the 257-bin output of the 512
/// point transform; DC sits in bin 0 and is skipped.
pub const WAVE_BINS: [usize; 16] = [
    1, 2, 3, 4, 6, 8, 11, 16, 22, 31, 44, 62, 88, 124, 175, 247,
];

/// Converts blocks of raw audio samples into a frequency-domain amplitude
/// array sized for the display.
///
/// One analyzer serves every registered device: `feed` runs on whatever
/// thread captures audio while each device worker reads the amplitudes on
/// its own tick. The published array is swapped wholesale behind a lock, so
/// a reader always sees a complete transform, never a partial update.
pub struct SpectrumAnalyzer {
    config: SpectrumConfig,
    fft: Mutex<FftState>,
    amplitudes: Mutex<Arc<Vec<f32>>>,
}

struct FftState {
    planner: RealFftPlanner<f32>,
    resources: Option<FftResources>,
}

struct FftResources {
    plan: Arc<dyn RealToComplex<f32>>,
    input: Vec<f32>,
    spectrum: Vec<Complex32>,
    scratch: Vec<Complex32>,
}

impl SpectrumAnalyzer {
    pub fn new(config: SpectrumConfig) -> Self {
        Self {
            config,
            fft: Mutex::new(FftState {
                planner: RealFftPlanner::new(),
                resources: None,
            }),
            amplitudes: Mutex::new(Arc::new(Vec::new())),
        }
    }

    /// Runs one transform over `samples` and replaces the published
    /// amplitude array.
    ///
    /// When the block is longer than the transform, each input value is the
    /// mean of `prescale` consecutive raw samples; shorter blocks are
    /// zero-padded. Magnitudes are normalised per bin (DC and Nyquist by
    /// 1/N, interior bins by 2/N) and then scaled uniformly so the usable
    /// range lands on discrete bar heights.
    pub fn feed(&self, samples: &[f32]) -> Result<()> {
        if samples.is_empty() {
            return Err(LedMatrixError::msg("feed requires at least one sample"));
        }

        let transform_len = self.config.transform_len;
        let prescale = (samples.len() / transform_len).max(1);

        let mut state = self
            .fft
            .lock()
            .map_err(|_| LedMatrixError::msg("spectrum state has been poisoned"))?;
        let resources = state.prepare(transform_len);

        for (index, slot) in resources.input.iter_mut().enumerate() {
            let start = index * prescale;
            if start >= samples.len() {
                *slot = 0.0;
                continue;
            }
            let run = &samples[start..(start + prescale).min(samples.len())];
            *slot = run.iter().sum::<f32>() / run.len() as f32;
        }

        resources.plan.process_with_scratch(
            &mut resources.input,
            &mut resources.spectrum,
            &mut resources.scratch,
        )?;

        let scale = (self.config.bars * prescale * 2) as f32 / samples.len() as f32;
        let len = transform_len as f32;
        let last = resources.spectrum.len() - 1;
        let amplitudes: Vec<f32> = resources
            .spectrum
            .iter()
            .enumerate()
            .map(|(bin, value)| {
                let magnitude = value.norm();
                let normalised = if bin == 0 || bin == last {
                    magnitude / len
                } else {
                    magnitude * 2.0 / len
                };
                normalised * scale
            })
            .collect();

        *self.lock_amplitudes()? = Arc::new(amplitudes);
        Ok(())
    }

    /// Cheap snapshot of the latest amplitude array. Empty until the first
    /// successful feed.
    pub fn amplitudes(&self) -> Arc<Vec<f32>> {
        self.amplitudes
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    fn lock_amplitudes(&self) -> Result<MutexGuard<'_, Arc<Vec<f32>>>> {
        self.amplitudes
            .lock()
            .map_err(|_| LedMatrixError::msg("amplitude array has been poisoned"))
    }
}

impl FftState {
    /// Allocates the transform buffers once, on first use, and keeps them
    /// for the analyzer's lifetime.
    fn prepare(&mut self, size: usize) -> &mut FftResources {
        if self.resources.is_none() {
            let plan = self.planner.plan_fft_forward(size);
            let input = plan.make_input_vec();
            let spectrum = plan.make_output_vec();
            let scratch = plan.make_scratch_vec();
            self.resources = Some(FftResources {
                plan,
                input,
                spectrum,
                scratch,
            });
        }

        self.resources.as_mut().expect("fft resources must exist")
    }
}

impl fmt::Debug for SpectrumAnalyzer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpectrumAnalyzer")
            .field("config", &self.config)
            .field("bins", &self.amplitudes().len())
            .finish()
    }
}

/// Picks the sixteen representative bins out of an amplitude array and
/// clips each to a renderable bar height.
pub fn bar_heights(amplitudes: &[f32]) -> [u8; 16] {
    let top = (PANEL_HEIGHT - 1) as f32;
    let mut bars = [0u8; 16];

    for (slot, &bin) in WAVE_BINS.iter().enumerate() {
        let value = amplitudes.get(bin).copied().unwrap_or(0.0);
        bars[slot] = value.round().clamp(0.0, top) as u8;
    }

    bars
}
