//! Frame layout, header decoding and ADC conversion constants.

use std::fmt;
use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::ContractError;

// ============================================================================
// ADC conversion
// ============================================================================

/// Supply voltage (V)
pub const ADC_VCC: f64 = 3.3;
/// Accelerometer sensitivity (V/g) at the reference supply
pub const SENSITIVITY_V_PER_G: f64 = 0.04;
/// Reference supply for the sensitivity figure (V)
pub const SENSITIVITY_REF_V: f64 = 1.8;
/// ADC resolution (bits)
pub const ADC_BITS: u32 = 16;
/// Mid-scale code, i.e. 0 g on an ideal sensor
pub const MID_SCALE: f64 = 32768.0;

/// g per LSB: `(Vcc / 2^16) / (0.04 * Vcc / 1.8)`
pub const GAIN: f64 =
    (ADC_VCC / (1u32 << ADC_BITS) as f64) / (SENSITIVITY_V_PER_G * ADC_VCC / SENSITIVITY_REF_V);

/// Ideal ADC code for an acceleration of `g`.
pub fn ideal_code(g: f64) -> f64 {
    (g / GAIN + MID_SCALE).round()
}

/// Convert a raw code to g, removing mid-scale and the axis offset.
#[inline]
pub fn code_to_g(code: u16, offset: f64) -> f64 {
    GAIN * (code as f64 - MID_SCALE - offset)
}

/// Convert a firmware FFT magnitude word to g.
#[inline]
pub fn magnitude_to_g(magnitude: u16) -> f64 {
    2.0 * GAIN * magnitude as f64
}

// ============================================================================
// Wire constants
// ============================================================================

/// Words reserved at the start of every frame (header + reserved)
pub const PARAM_LEN: usize = 2;
/// Above this sample count the node has no room for an on-board spectrum
pub const FLASH_PAGE_SAMPLES: usize = 1024;
/// Payload a node sends once when it joins
pub const HANDSHAKE_PREAMBLE: [u8; 4] = [0xAA, 0xBB, 0xCC, 0xDD];
/// High byte of a frame header word
pub const START_SENTINEL: u8 = 0xFF;
/// Protocol version the gateway side speaks by default
pub const DEFAULT_PROTOCOL_VERSION: u8 = 5;

/// Whether a little-endian word is a frame start (high byte 0xFF).
#[inline]
pub fn is_start_word(word: u16) -> bool {
    (word >> 8) as u8 == START_SENTINEL
}

// ============================================================================
// Axis / header
// ============================================================================

/// Accelerometer axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    /// Position in x, y, z order
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    /// High nibble of the header's low byte (`0x9`, `0xA`, `0xC`)
    pub fn header_nibble(self) -> u8 {
        match self {
            Axis::X => 0x9,
            Axis::Y => 0xA,
            Axis::Z => 0xC,
        }
    }

    pub fn from_header_nibble(nibble: u8) -> Option<Self> {
        match nibble {
            0x9 => Some(Axis::X),
            0xA => Some(Axis::Y),
            0xC => Some(Axis::Z),
            _ => None,
        }
    }

    /// Gravity this axis sees when the sensor is mounted upright
    pub fn rest_g(self) -> f64 {
        match self {
            Axis::X | Axis::Y => 0.0,
            Axis::Z => 1.0,
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
        };
        f.write_str(name)
    }
}

/// Decoded frame header word.
///
/// | Bits  | Meaning |
/// |-------|---------|
/// | 15..8 | start sentinel `0xFF` |
/// | 7..4  | axis pattern: `0x9` x, `0xA` y, `0xC` z |
/// | 3..0  | protocol version |
///
/// Bit 7 is the alarm-flag position; nodes set it on every frame, so it is
/// part of the axis pattern and carries no alarm state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// `None` for any other pattern
    pub axis: Option<Axis>,
    pub version: u8,
}

impl FrameHeader {
    pub fn decode(word: u16) -> Self {
        let low = (word & 0x00FF) as u8;
        Self {
            axis: Axis::from_header_nibble(low >> 4),
            version: low & 0x0F,
        }
    }

    /// Header word as a node would write it (`0xFF90 | version` for x).
    pub fn encode(axis: Axis, version: u8) -> u16 {
        let low = (axis.header_nibble() << 4) | (version & 0x0F);
        ((START_SENTINEL as u16) << 8) | low as u16
    }
}

// ============================================================================
// Layout
// ============================================================================

/// Word layout of one frame for a given sample count.
///
/// `[0, PARAM_LEN)` header, `[PARAM_LEN, PARAM_LEN + n)` raw codes, then
/// `n / 2` spectrum magnitudes when `n <= FLASH_PAGE_SAMPLES`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameLayout {
    sample_count: usize,
}

impl FrameLayout {
    pub fn new(sample_count: usize) -> Result<Self, ContractError> {
        if sample_count < 2 {
            return Err(ContractError::invalid_layout(
                sample_count,
                "at least 2 samples required",
            ));
        }
        if sample_count % 2 != 0 {
            return Err(ContractError::invalid_layout(
                sample_count,
                "sample count must be even",
            ));
        }
        Ok(Self { sample_count })
    }

    #[inline]
    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    #[inline]
    pub fn has_spectrum(&self) -> bool {
        self.sample_count <= FLASH_PAGE_SAMPLES
    }

    /// Spectrum length, also the length of the zero block when absent
    #[inline]
    pub fn spectrum_len(&self) -> usize {
        self.sample_count / 2
    }

    /// Total words per frame
    pub fn buffer_len(&self) -> usize {
        let half = self.sample_count / 2;
        if self.has_spectrum() {
            PARAM_LEN + 3 * half
        } else {
            PARAM_LEN + 2 * half
        }
    }

    pub fn raw_range(&self) -> Range<usize> {
        PARAM_LEN..PARAM_LEN + self.sample_count
    }

    pub fn spectrum_range(&self) -> Option<Range<usize>> {
        self.has_spectrum()
            .then(|| PARAM_LEN + self.sample_count..self.buffer_len())
    }
}

// ============================================================================
// Frames
// ============================================================================

/// One completed frame converted to physical units (g).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub axis: Option<Axis>,
    pub version: u8,
    pub raw: Vec<f64>,
    /// Zero block of `n / 2` when the node sent no spectrum
    pub spectrum: Vec<f64>,
}

impl Frame {
    /// Spectrum with the DC bin zeroed. The node does not remove the
    /// mean before its FFT, so bin 0 mostly carries gravity and offset.
    pub fn spectrum_without_dc(&self) -> Vec<f64> {
        let mut spectrum = self.spectrum.clone();
        if let Some(dc) = spectrum.first_mut() {
            *dc = 0.0;
        }
        spectrum
    }
}

/// Uncorrected raw codes of the latest frame, used for calibration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCodes {
    pub axis: Option<Axis>,
    pub codes: Vec<u16>,
}

impl RawCodes {
    pub fn mean(&self) -> Option<f64> {
        if self.codes.is_empty() {
            return None;
        }
        let sum: f64 = self.codes.iter().map(|&c| c as f64).sum();
        Some(sum / self.codes.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gain_value() {
        assert!((GAIN - 6.866e-4).abs() < 1e-6);
    }

    #[test]
    fn test_ideal_code() {
        assert_eq!(ideal_code(0.0), 32768.0);
        // 1 g is about 1456 LSB above mid-scale
        assert_eq!(ideal_code(1.0), (1.0 / GAIN + 32768.0).round());
        assert!(ideal_code(1.0) > 34000.0 && ideal_code(1.0) < 34500.0);
    }

    #[test]
    fn test_code_conversion() {
        assert_eq!(code_to_g(32768, 0.0), 0.0);
        assert!((code_to_g(32778, 10.0)).abs() < 1e-12);
        assert!((magnitude_to_g(100) - 200.0 * GAIN).abs() < 1e-12);
    }

    #[test]
    fn test_header_decode_firmware_words() {
        let x = FrameHeader::decode(0xFF96);
        assert_eq!(x.axis, Some(Axis::X));
        assert_eq!(x.version, 6);

        assert_eq!(FrameHeader::decode(0xFFA5).axis, Some(Axis::Y));

        let z = FrameHeader::decode(0xFFC5);
        assert_eq!(z.axis, Some(Axis::Z));
        assert_eq!(z.version, 5);
    }

    #[test]
    fn test_header_rejects_partial_patterns() {
        // 同样的轴位但缺少 bit 7，固件不会发出
        for word in [0xFF10, 0xFF25, 0xFF45, 0xFF35, 0xFF05, 0xFFB5, 0xFFE5] {
            let header = FrameHeader::decode(word);
            assert_eq!(header.axis, None, "{word:#06x}");
            assert_eq!(header.version, 0x0F & word as u8);
        }
    }

    #[test]
    fn test_header_encode_decode() {
        assert_eq!(FrameHeader::encode(Axis::X, 0), 0xFF90);
        assert_eq!(FrameHeader::encode(Axis::Y, 0), 0xFFA0);
        assert_eq!(FrameHeader::encode(Axis::Z, 5), 0xFFC5);

        let word = FrameHeader::encode(Axis::Z, 5);
        assert!(is_start_word(word));
        assert_eq!(word.to_le_bytes()[1], 0xFF);
        assert_eq!(
            FrameHeader::decode(word),
            FrameHeader {
                axis: Some(Axis::Z),
                version: 5
            }
        );
    }

    #[test]
    fn test_layout_small() {
        let layout = FrameLayout::new(4).unwrap();
        assert!(layout.has_spectrum());
        assert_eq!(layout.buffer_len(), 8);
        assert_eq!(layout.raw_range(), 2..6);
        assert_eq!(layout.spectrum_range(), Some(6..8));
    }

    #[test]
    fn test_layout_flash_threshold() {
        let at = FrameLayout::new(1024).unwrap();
        assert_eq!(at.buffer_len(), 2 + 3 * 512);
        assert!(at.spectrum_range().is_some());

        let above = FrameLayout::new(2048).unwrap();
        assert!(!above.has_spectrum());
        assert_eq!(above.buffer_len(), 2 + 2048);
        assert_eq!(above.spectrum_len(), 1024);
        assert_eq!(above.spectrum_range(), None);
    }

    #[test]
    fn test_layout_rejects_bad_counts() {
        assert!(FrameLayout::new(0).is_err());
        assert!(FrameLayout::new(1).is_err());
        assert!(FrameLayout::new(7).is_err());
    }

    #[test]
    fn test_spectrum_without_dc() {
        let frame = Frame {
            axis: Some(Axis::X),
            version: 5,
            raw: vec![],
            spectrum: vec![3.0, 1.0, 2.0],
        };
        assert_eq!(frame.spectrum_without_dc(), vec![0.0, 1.0, 2.0]);
        assert_eq!(frame.spectrum[0], 3.0);
    }

    #[test]
    fn test_raw_codes_mean() {
        let codes = RawCodes {
            axis: None,
            codes: vec![32760, 32770],
        };
        assert_eq!(codes.mean(), Some(32765.0));
        assert_eq!(
            RawCodes {
                axis: None,
                codes: vec![]
            }
            .mean(),
            None
        );
    }
}
