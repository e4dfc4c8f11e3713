//! Ping-pong frame store.
//!
//! Two equally sized word buffers: the active one fills at the cursor while
//! the other holds the last completed frame. Word accumulation, the swap,
//! axis metadata and calibration offsets all sit behind one lock, so a
//! reader either sees the previous frame or the new one, never a mix.

use std::sync::{Mutex, MutexGuard};

use contracts::{
    code_to_g, is_start_word, magnitude_to_g, Axis, CalibrationMethod, Frame, FrameHeader,
    FrameLayout, RawCodes,
};

use crate::calibration::{CalibrationOutcome, OffsetCalibrator};

/// Cursor reset applied before the payload was consumed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoftReset {
    /// Payload would run past the end of the frame
    Overflow {
        cursor: usize,
        incoming: usize,
        capacity: usize,
    },
    /// Start sentinel seen mid-frame
    Realigned { cursor: usize },
}

impl SoftReset {
    pub fn reason(&self) -> &'static str {
        match self {
            SoftReset::Overflow { .. } => "overflow",
            SoftReset::Realigned { .. } => "realigned",
        }
    }
}

/// What happened to one payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Cursor at zero and payload is not a frame start
    Discarded,
    /// Payload alone is larger than a frame
    Oversized { words: usize, capacity: usize },
    /// Words appended; `started` carries the header when this payload began the frame
    Appended {
        started: Option<FrameHeader>,
        cursor: usize,
    },
    /// Frame filled exactly and was published
    Completed { started: Option<FrameHeader> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestReport {
    pub reset: Option<SoftReset>,
    pub outcome: IngestOutcome,
}

#[derive(Debug)]
struct PingPong {
    buffers: [Vec<u16>; 2],
    active: usize,
    cursor: usize,
    valid: bool,
    layout: FrameLayout,
    /// Header of the published frame
    header: Option<FrameHeader>,
    /// Last successfully decoded axis; survives undecodable headers
    axis: Option<Axis>,
    calibrator: OffsetCalibrator,
    completed: u64,
}

impl PingPong {
    fn new(layout: FrameLayout) -> Self {
        let len = layout.buffer_len();
        Self {
            buffers: [vec![0; len], vec![0; len]],
            active: 0,
            cursor: 0,
            valid: false,
            layout,
            header: None,
            axis: None,
            calibrator: OffsetCalibrator::new(),
            completed: 0,
        }
    }

    #[inline]
    fn published(&self) -> &[u16] {
        &self.buffers[1 - self.active]
    }

    fn raw_codes(&self) -> Option<RawCodes> {
        if !self.valid {
            return None;
        }
        Some(RawCodes {
            axis: self.axis,
            codes: self.published()[self.layout.raw_range()].to_vec(),
        })
    }
}

/// Per-node double buffer behind a single mutex
#[derive(Debug)]
pub struct FrameStore {
    inner: Mutex<PingPong>,
}

impl FrameStore {
    pub fn new(layout: FrameLayout) -> Self {
        Self {
            inner: Mutex::new(PingPong::new(layout)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, PingPong> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Consume one data payload of little-endian words. A trailing odd
    /// byte is ignored.
    pub fn ingest(&self, payload: &[u8]) -> IngestReport {
        let words: Vec<u16> = payload
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        let starts_frame = words.first().copied().is_some_and(is_start_word);

        let mut pp = self.lock();
        let capacity = pp.layout.buffer_len();
        let mut reset = None;

        if pp.cursor + words.len() > capacity {
            reset = Some(SoftReset::Overflow {
                cursor: pp.cursor,
                incoming: words.len(),
                capacity,
            });
            pp.cursor = 0;
        }
        if pp.cursor > 0 && starts_frame {
            reset = Some(SoftReset::Realigned { cursor: pp.cursor });
            pp.cursor = 0;
        }
        if pp.cursor == 0 && !starts_frame {
            return IngestReport {
                reset,
                outcome: IngestOutcome::Discarded,
            };
        }
        if words.len() > capacity {
            return IngestReport {
                reset,
                outcome: IngestOutcome::Oversized {
                    words: words.len(),
                    capacity,
                },
            };
        }

        let started = (pp.cursor == 0).then(|| FrameHeader::decode(words[0]));
        let (active, cursor) = (pp.active, pp.cursor);
        pp.buffers[active][cursor..cursor + words.len()].copy_from_slice(&words);
        pp.cursor += words.len();

        if pp.cursor < capacity {
            let cursor = pp.cursor;
            return IngestReport {
                reset,
                outcome: IngestOutcome::Appended { started, cursor },
            };
        }

        // 帧完成：同一临界区内切换缓冲区
        pp.active = 1 - pp.active;
        pp.valid = true;
        pp.cursor = 0;
        pp.completed += 1;
        let header = FrameHeader::decode(pp.published()[0]);
        pp.header = Some(header);
        if header.axis.is_some() {
            pp.axis = header.axis;
        }

        IngestReport {
            reset,
            outcome: IngestOutcome::Completed { started },
        }
    }

    /// Latest completed frame in g, offsets applied.
    pub fn latest_frame(&self) -> Option<Frame> {
        let pp = self.lock();
        if !pp.valid {
            return None;
        }
        let header = pp.header?;
        let layout = pp.layout;
        let words = pp.published();
        let offset = pp.axis.map_or(0.0, |axis| pp.calibrator.offset(axis));

        let raw = words[layout.raw_range()]
            .iter()
            .map(|&code| code_to_g(code, offset))
            .collect();
        let spectrum = match layout.spectrum_range() {
            Some(range) => words[range].iter().map(|&m| magnitude_to_g(m)).collect(),
            None => vec![0.0; layout.spectrum_len()],
        };

        Some(Frame {
            axis: pp.axis,
            version: header.version,
            raw,
            spectrum,
        })
    }

    /// Uncorrected codes of the latest frame.
    pub fn latest_codes(&self) -> Option<RawCodes> {
        self.lock().raw_codes()
    }

    /// Calibrate the axis of the latest frame.
    pub fn calibrate(&self, method: CalibrationMethod) -> CalibrationOutcome {
        let mut pp = self.lock();
        match pp.raw_codes() {
            Some(codes) => pp.calibrator.calibrate(&codes, method),
            None => CalibrationOutcome::Unavailable,
        }
    }

    pub fn reset_calibration(&self) {
        self.lock().calibrator.reset();
    }

    pub fn all_calibrated(&self) -> bool {
        self.lock().calibrator.all_calibrated()
    }

    pub fn offset(&self, axis: Axis) -> f64 {
        self.lock().calibrator.offset(axis)
    }

    /// Reallocate both buffers for a new layout.
    pub fn resize(&self, layout: FrameLayout) {
        let mut pp = self.lock();
        let calibrator = pp.calibrator.clone();
        let completed = pp.completed;
        *pp = PingPong::new(layout);
        pp.calibrator = calibrator;
        pp.completed = completed;
    }

    /// Drop all frame state, including calibration.
    pub fn reset(&self) {
        let mut pp = self.lock();
        let layout = pp.layout;
        *pp = PingPong::new(layout);
    }

    pub fn layout(&self) -> FrameLayout {
        self.lock().layout
    }

    pub fn cursor(&self) -> usize {
        self.lock().cursor
    }

    pub fn is_valid(&self) -> bool {
        self.lock().valid
    }

    pub fn frames_completed(&self) -> u64 {
        self.lock().completed
    }
}
