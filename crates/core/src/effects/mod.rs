use rand::Rng;
use tracing::warn;

use crate::{frame::FrameBuffer, Result};

/// Digit glyph dimensions.
pub const DOT_WIDTH: usize = 6;
pub const DOT_HEIGHT: usize = 5;

/// 6x5 glyphs for the digits 0-9, one row per line, 1 = lit.
const DIGITS: [[[u8; DOT_WIDTH]; DOT_HEIGHT]; 10] = [
    [
        [1, 1, 1, 1, 1, 1],
        [1, 0, 0, 0, 0, 1],
        [1, 0, 0, 0, 0, 1],
        [1, 0, 0, 0, 0, 1],
        [1, 1, 1, 1, 1, 1],
    ],
    [
        [0, 0, 0, 0, 0, 1],
        [0, 0, 0, 0, 0, 1],
        [0, 0, 0, 0, 0, 1],
        [0, 0, 0, 0, 0, 1],
        [0, 0, 0, 0, 0, 1],
    ],
    [
        [1, 1, 1, 1, 1, 1],
        [0, 0, 0, 0, 0, 1],
        [1, 1, 1, 1, 1, 1],
        [1, 0, 0, 0, 0, 0],
        [1, 1, 1, 1, 1, 1],
    ],
    [
        [1, 1, 1, 1, 1, 1],
        [0, 0, 0, 0, 0, 1],
        [1, 1, 1, 1, 1, 1],
        [0, 0, 0, 0, 0, 1],
        [1, 1, 1, 1, 1, 1],
    ],
    [
        [1, 0, 0, 0, 0, 1],
        [1, 0, 0, 0, 0, 1],
        [1, 1, 1, 1, 1, 1],
        [0, 0, 0, 0, 0, 1],
        [0, 0, 0, 0, 0, 1],
    ],
    [
        [1, 1, 1, 1, 1, 1],
        [1, 0, 0, 0, 0, 0],
        [1, 1, 1, 1, 1, 1],
        [0, 0, 0, 0, 0, 1],
        [1, 1, 1, 1, 1, 1],
    ],
    [
        [1, 1, 1, 1, 1, 1],
        [1, 0, 0, 0, 0, 0],
        [1, 1, 1, 1, 1, 1],
        [1, 0, 0, 0, 0, 1],
        [1, 1, 1, 1, 1, 1],
    ],
    [
        [1, 1, 1, 1, 1, 1],
        [0, 0, 0, 0, 0, 1],
        [0, 0, 0, 0, 0, 1],
        [0, 0, 0, 0, 0, 1],
        [0, 0, 0, 0, 0, 1],
    ],
    [
        [1, 1, 1, 1, 1, 1],
        [1, 0, 0, 0, 0, 1],
        [1, 1, 1, 1, 1, 1],
        [1, 0, 0, 0, 0, 1],
        [1, 1, 1, 1, 1, 1],
    ],
    [
        [1, 1, 1, 1, 1, 1],
        [1, 0, 0, 0, 0, 1],
        [1, 1, 1, 1, 1, 1],
        [0, 0, 0, 0, 0, 1],
        [1, 1, 1, 1, 1, 1],
    ],
];

const HEART_WIDTH: usize = 16;
const HEART_HEIGHT: usize = 12;
const HEART_Y0: usize = 2;

const HEART: [[u8; HEART_WIDTH]; HEART_HEIGHT] = [
    [0, 0, 1, 1, 1, 1, 0, 0, 0, 1, 1, 1, 1, 0, 0, 0],
    [0, 1, 1, 1, 1, 1, 1, 0, 1, 1, 1, 1, 1, 1, 0, 0],
    [0, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 0, 0],
    [0, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 0, 0],
    [0, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 0, 0],
    [0, 0, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 0, 0, 0],
    [0, 0, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 0, 0, 0],
    [0, 0, 0, 1, 1, 1, 1, 1, 1, 1, 1, 1, 0, 0, 0, 0],
    [0, 0, 0, 0, 1, 1, 1, 1, 1, 1, 1, 0, 0, 0, 0, 0],
    [0, 0, 0, 0, 0, 1, 1, 1, 1, 1, 0, 0, 0, 0, 0, 0],
    [0, 0, 0, 0, 0, 0, 1, 1, 1, 0, 0, 0, 0, 0, 0, 0],
    [0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 0],
];

/// Draws one digit glyph with its top-left corner at (x0, y0), then
/// flushes. A non-digit value is logged and ignored.
pub fn draw_digit(frame: &mut FrameBuffer, x0: usize, y0: usize, digit: u32) -> Result<()> {
    let Some(glyph) = DIGITS.get(digit as usize) else {
        warn!(digit, "not a renderable digit");
        return Ok(());
    };

    for (y, row) in glyph.iter().enumerate() {
        for (x, cell) in row.iter().enumerate() {
            frame.set_pixel(x0 + x, y0 + y, *cell != 0);
        }
    }

    frame.flush()
}

/// Hour digits occupy the top band of the panel.
pub fn draw_hour(frame: &mut FrameBuffer, hour: u32) -> Result<()> {
    draw_digit(frame, 1, 2, hour / 10)?;
    draw_digit(frame, 9, 2, hour % 10)
}

/// Minute digits occupy the middle band.
pub fn draw_minute(frame: &mut FrameBuffer, minute: u32) -> Result<()> {
    draw_digit(frame, 1, 9, minute / 10)?;
    draw_digit(frame, 9, 9, minute % 10)
}

/// Seconds render as two progress rows along the bottom: tens (modulo 6)
/// on row 14, units on row 15. Each cell goes out as an incremental write
/// so a second tick never repaints the digits above.
pub fn draw_seconds(frame: &mut FrameBuffer, second: u32) -> Result<()> {
    let tens = (second / 10) % 6;
    let units = second % 10;

    for x in 0..6 {
        frame.fill_and_push(x, 14, (x as u32) < tens)?;
    }
    for x in 0..10 {
        frame.fill_and_push(x, 15, (x as u32) < units)?;
    }

    Ok(())
}

/// Full clock redraw: blank panel, then every digit group.
pub fn draw_clock(frame: &mut FrameBuffer, hour: u32, minute: u32, second: u32) -> Result<()> {
    frame.clear()?;
    draw_hour(frame, hour)?;
    draw_minute(frame, minute)?;
    draw_seconds(frame, second)
}

/// Fills the panel with a pseudo-random wave: one random cut per column
/// (or per row when rotated a quarter turn), polarity chosen by `degree`.
pub fn draw_random_wave(frame: &mut FrameBuffer, degree: u16) -> Result<()> {
    let width = frame.width();
    let height = frame.height();
    let mut rng = rand::thread_rng();

    match degree {
        90 => {
            for y in 0..height {
                let cut = rng.gen_range(1..width - 1);
                for x in 0..width {
                    frame.set_pixel(x, y, x <= cut);
                }
            }
        }
        180 => {
            for x in 0..width {
                let cut = rng.gen_range(1..height - 1);
                for y in 0..height {
                    frame.set_pixel(x, y, y <= cut);
                }
            }
        }
        270 => {
            for y in 0..height {
                let cut = rng.gen_range(1..width - 1);
                for x in 0..width {
                    frame.set_pixel(x, y, x > cut);
                }
            }
        }
        _ => {
            for x in 0..width {
                let cut = rng.gen_range(1..height - 1);
                for y in 0..height {
                    frame.set_pixel(x, y, y > cut);
                }
            }
        }
    }

    frame.flush()
}

/// Renders sixteen bar heights as a chart. Bars grow from the bottom edge
/// at degree 0 and rotate with it: left edge at 90, top at 180, right at
/// 270. Heights are expected in [0, 15].
pub fn draw_bar_wave(frame: &mut FrameBuffer, heights: &[u8; 16], degree: u16) -> Result<()> {
    let width = frame.width();
    let height = frame.height();

    for (i, &bar) in heights.iter().enumerate() {
        let bar = usize::from(bar);
        match degree {
            90 => {
                for x in 0..width {
                    frame.set_pixel(x, i, x < bar);
                }
            }
            180 => {
                for y in 0..height {
                    frame.set_pixel(i, y, y < bar);
                }
            }
            270 => {
                for x in 0..width {
                    frame.set_pixel(x, i, x >= width - bar);
                }
            }
            _ => {
                for y in 0..height {
                    frame.set_pixel(i, y, y >= height - bar);
                }
            }
        }
    }

    frame.flush()
}

/// Draws the static heart glyph centred on the panel.
pub fn draw_heart(frame: &mut FrameBuffer) -> Result<()> {
    frame.clear()?;

    let width = frame.width().min(HEART_WIDTH);
    let height = frame.height().saturating_sub(HEART_Y0).min(HEART_HEIGHT);

    for y in 0..height {
        for x in 0..width {
            frame.set_pixel(x, HEART_Y0 + y, HEART[y][x] != 0);
        }
    }

    frame.flush()
}
