use tracing::warn;

use crate::{sink::PatternSink, Result};

/// The panel is a fixed 16x16 grid; the controller has no other geometry.
pub const PANEL_WIDTH: usize = 16;
pub const PANEL_HEIGHT: usize = 16;

const PACKED_LEN: usize = PANEL_WIDTH * PANEL_HEIGHT / 8;

/// Maps the logical bit position of a pixel within its packed byte onto the
/// physical output bit. The table encodes how the panel columns are wired
/// to the controller outputs:
///
/// ```text
/// led: 3 2 1 0 | 4 5 6 7
/// bit: 7 6 5 4 | 0 1 2 3
/// ```
///
/// Changing it scrambles the display, so it stays a single named constant.
pub const BIT_ORDER: [u8; 8] = [4, 5, 6, 7, 0, 1, 2, 3];

/// Constant address byte prefixed to every full pattern write.
const PATTERN_ADDR: u8 = 0x00;

/// The sink addresses pattern memory in words, two display columns per
/// byte, so incremental writes scale the byte index by this stride.
const ADDR_STRIDE: usize = 2;

/// Bit-packed monochrome frame for one device.
///
/// `bytes` is always derivable from `cells` under the current polarity;
/// every pixel write updates the one affected byte immediately, so the two
/// never drift apart.
pub struct FrameBuffer {
    cells: [[bool; PANEL_WIDTH]; PANEL_HEIGHT],
    bytes: [u8; PACKED_LEN],
    inverted: bool,
    sink: Box<dyn PatternSink>,
}

impl FrameBuffer {
    pub fn new(sink: Box<dyn PatternSink>) -> Self {
        Self {
            cells: [[false; PANEL_WIDTH]; PANEL_HEIGHT],
            bytes: [0; PACKED_LEN],
            inverted: false,
            sink,
        }
    }

    pub fn width(&self) -> usize {
        PANEL_WIDTH
    }

    pub fn height(&self) -> usize {
        PANEL_HEIGHT
    }

    /// Logical state of one pixel; out-of-bounds coordinates read as off.
    pub fn pixel(&self, x: usize, y: usize) -> bool {
        self.cells
            .get(y)
            .and_then(|row| row.get(x))
            .copied()
            .unwrap_or(false)
    }

    /// The packed wire representation, one byte per 8-pixel row group.
    pub fn packed_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Sets one pixel and updates its packed byte. An out-of-bounds
    /// coordinate is logged and ignored.
    pub fn set_pixel(&mut self, x: usize, y: usize, on: bool) {
        if x >= PANEL_WIDTH || y >= PANEL_HEIGHT {
            warn!(x, y, "pixel write outside the panel");
            return;
        }

        self.cells[y][x] = on;

        let index = (y * PANEL_WIDTH + x) / 8;
        let bit = BIT_ORDER[x % 8];
        if on != self.inverted {
            self.bytes[index] |= 1 << bit;
        } else {
            self.bytes[index] &= !(1 << bit);
        }
    }

    /// Serializes the whole frame as the pattern string the sink expects:
    /// the address byte followed by every packed byte, two hex digits each,
    /// space-separated, no newline.
    pub fn flush(&mut self) -> Result<()> {
        let mut out = String::with_capacity((PACKED_LEN + 1) * 3);
        out.push_str(&format!("{PATTERN_ADDR:02x}"));
        for byte in &self.bytes {
            out.push_str(&format!(" {byte:02x}"));
        }

        self.sink.pattern(&out)
    }

    /// Sets one pixel and pushes only the affected output word as an
    /// incremental `index`/`value` write. Cheaper than [`flush`] for
    /// single-pixel updates like the seconds bar; a full flush is always a
    /// valid substitute.
    ///
    /// [`flush`]: FrameBuffer::flush
    pub fn fill_and_push(&mut self, x: usize, y: usize, on: bool) -> Result<()> {
        if x >= PANEL_WIDTH || y >= PANEL_HEIGHT {
            warn!(x, y, "pixel fill outside the panel");
            return Ok(());
        }

        self.set_pixel(x, y, on);

        let index = (y * PANEL_WIDTH + x) / 8;
        let word = format!("{:02x}{:02x}", index * ADDR_STRIDE, self.bytes[index]);
        self.sink.pattern(&word)
    }

    /// All pixels off, then flush.
    pub fn clear(&mut self) -> Result<()> {
        self.set_all(false)
    }

    /// All pixels on (`true`) or off (`false`), then flush.
    pub fn blank(&mut self, on: bool) -> Result<()> {
        self.set_all(on)
    }

    fn set_all(&mut self, on: bool) -> Result<()> {
        self.cells = [[on; PANEL_WIDTH]; PANEL_HEIGHT];
        let fill = if on != self.inverted { 0xFF } else { 0x00 };
        self.bytes = [fill; PACKED_LEN];
        self.flush()
    }

    /// Toggles display polarity. Every byte is complemented exactly once
    /// per edge; calling again with the same flag is a no-op.
    pub fn invert(&mut self, invert: bool) -> Result<()> {
        if invert == self.inverted {
            return Ok(());
        }

        for byte in &mut self.bytes {
            *byte = !*byte;
        }
        self.inverted = invert;
        self.flush()
    }

    /// Passes a brightness level straight through to the sink.
    pub fn brightness(&mut self, level: u8) -> Result<()> {
        self.sink.brightness(level)
    }

    /// Passes a blink spec straight through to the sink.
    pub fn blink(&mut self, spec: &str) -> Result<()> {
        self.sink.blink(spec)
    }

    /// Passes an engine directive straight through to the sink.
    pub fn engine(&mut self, directive: &str) -> Result<()> {
        self.sink.engine(directive)
    }
}

impl std::fmt::Debug for FrameBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameBuffer")
            .field("inverted", &self.inverted)
            .field("bytes", &self.bytes)
            .finish()
    }
}
