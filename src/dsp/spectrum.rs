//! FFT spectrum analysis
//!
//! Turns the latest window of samples into byte-scaled magnitudes, one per
//! FFT bin up to Nyquist.

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

/// Spectrum analyzer with FFT processing
pub struct SpectrumAnalyzer {
    /// Hann window coefficients
    window: Vec<f32>,
    /// FFT processor
    fft: Arc<dyn Fft<f32>>,
    /// Scratch buffer for FFT computation
    scratch: Vec<Complex<f32>>,
    /// Smoothed linear magnitude per bin
    magnitudes: Vec<f32>,
    /// Byte-scaled output per bin
    bytes: Vec<u8>,
    min_db: f32,
    max_db: f32,
    /// Weight of the previous frame (0.0 = no smoothing)
    smoothing: f32,
}

impl SpectrumAnalyzer {
    /// Create a new spectrum analyzer
    ///
    /// # Arguments
    /// * `fft_size` - number of samples per analysis window
    /// * `min_db`/`max_db` - level range mapped onto 0..=255
    /// * `smoothing` - averaging constant between frames, 0.0-1.0
    pub fn new(fft_size: usize, min_db: f32, max_db: f32, smoothing: f32) -> Self {
        let fft_size = fft_size.max(2);
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);

        // Hann window - reduces spectral leakage
        let window: Vec<f32> = (0..fft_size)
            .map(|i| {
                let denom = (fft_size - 1) as f32;
                0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / denom).cos())
            })
            .collect();

        let bins = fft_size / 2;

        Self {
            window,
            fft,
            scratch: vec![Complex::new(0.0, 0.0); fft_size],
            magnitudes: vec![0.0; bins],
            bytes: vec![0; bins],
            min_db,
            max_db: max_db.max(min_db + 1.0),
            smoothing: smoothing.clamp(0.0, 1.0),
        }
    }

    pub fn fft_size(&self) -> usize {
        self.window.len()
    }

    pub fn bin_count(&self) -> usize {
        self.bytes.len()
    }

    /// Update the spectrum from new audio samples
    ///
    /// Ignores buffers whose length doesn't match the FFT size.
    pub fn update(&mut self, buffer: &[f32]) {
        if buffer.len() != self.window.len() {
            return;
        }

        for (i, sample) in buffer.iter().enumerate() {
            self.scratch[i].re = *sample * self.window[i];
            self.scratch[i].im = 0.0;
        }

        self.fft.process(&mut self.scratch);

        let scale = 1.0 / self.window.len() as f32;
        let range = self.max_db - self.min_db;
        for (i, bin) in self.scratch.iter().take(self.magnitudes.len()).enumerate() {
            let magnitude = bin.norm() * scale;
            let smoothed = self.smoothing * self.magnitudes[i] + (1.0 - self.smoothing) * magnitude;
            self.magnitudes[i] = smoothed;

            let db = 20.0 * smoothed.max(1e-12).log10();
            let scaled = 255.0 * (db - self.min_db) / range;
            self.bytes[i] = scaled.clamp(0.0, 255.0) as u8;
        }
    }

    /// Byte-scaled magnitude per bin
    pub fn data(&self) -> &[u8] {
        &self.bytes
    }

    /// Center frequency of a bin in Hz
    pub fn bin_frequency(&self, bin: usize, sample_rate: f32) -> f32 {
        bin as f32 * sample_rate / self.window.len() as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silence_maps_to_zero() {
        let mut analyzer = SpectrumAnalyzer::new(256, -100.0, -30.0, 0.0);
        analyzer.update(&[0.0; 256]);
        assert!(analyzer.data().iter().all(|&b| b == 0));
    }

    #[test]
    fn sine_peaks_at_its_bin() {
        let size = 1024;
        let sample_rate = 48_000.0;
        let freq = 3_000.0;
        let samples: Vec<f32> = (0..size)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate).sin())
            .collect();

        let mut analyzer = SpectrumAnalyzer::new(size, -100.0, -30.0, 0.0);
        analyzer.update(&samples);

        let (peak_bin, _) = analyzer
            .data()
            .iter()
            .enumerate()
            .max_by_key(|&(_, &b)| b)
            .unwrap();
        let peak_freq = analyzer.bin_frequency(peak_bin, sample_rate);
        assert!((peak_freq - freq).abs() < 100.0, "peak at {} Hz", peak_freq);
    }

    #[test]
    fn mismatched_length_is_ignored() {
        let mut analyzer = SpectrumAnalyzer::new(256, -100.0, -30.0, 0.0);
        analyzer.update(&[1.0; 100]);
        assert!(analyzer.data().iter().all(|&b| b == 0));
    }
}
