//! Configuration for scanning and watermarking.

/// Tunables for the attacker-side detectors.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Fraction of the page count a decoded stream hash must reach to be
    /// flagged as a per-page duplicate (clamped to a floor of 2 repeats).
    pub duplicate_threshold: f64,

    /// Decoded streams shorter than this are never hashed.
    pub min_stream_len: usize,

    /// Byte signature the specific-watermark cleaner looks for inside
    /// decoded streams.
    pub signature: Vec<u8>,

    /// Total suspicion score at which an embedded file is flagged.
    pub suspicion_cutoff: f64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ScanConfig {
    /// Create a new configuration with defaults.
    pub fn new() -> Self {
        Self {
            duplicate_threshold: 0.8,
            min_stream_len: 50,
            signature: b"<b78b".to_vec(),
            suspicion_cutoff: 0.5,
        }
    }

    /// Set the duplicate-stream threshold (clamped to `[0.0, 1.0]`).
    pub fn with_duplicate_threshold(mut self, threshold: f64) -> Self {
        self.duplicate_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    /// Set the watermark byte signature.
    pub fn with_signature(mut self, signature: impl Into<Vec<u8>>) -> Self {
        self.signature = signature.into();
        self
    }
}

/// Fixed style constants for the visual watermark overlay.
#[derive(Debug, Clone)]
pub struct WatermarkStyle {
    /// Font size in points for ASCII text
    pub font_size: f32,
    /// Rotation in degrees (counter-clockwise)
    pub rotation: f32,
    /// Stroke/fill opacity (0.0 transparent, 1.0 opaque)
    pub opacity: f32,
    /// Grey level (0.0 black, 1.0 white)
    pub grey: f32,
    /// Widest the rendered text may get before the font size is reduced
    pub max_width: f32,
}

impl Default for WatermarkStyle {
    fn default() -> Self {
        Self {
            font_size: 48.0,
            rotation: 45.0,
            opacity: 0.3,
            grey: 0.5,
            max_width: 800.0,
        }
    }
}
