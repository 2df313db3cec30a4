//! Frame rendering
//!
//! Draws the volume in large digits and a status line below it on a black
//! canvas, using tiny-skia for the pixel buffer and ab_glyph for the glyph
//! coverage.

use std::path::Path;

use ab_glyph::{Font, FontVec, PxScale, ScaleFont, point};
use svdcontrol::PlayerSnapshot;
use tiny_skia::{Color, ColorU8, Pixmap, PremultipliedColorU8};

use crate::errors::DisplayError;

pub const VOLUME_COLOR: ColorU8 = ColorU8::from_rgba(255, 255, 255, 255);
pub const IDLE_STATUS_COLOR: ColorU8 = ColorU8::from_rgba(255, 192, 128, 255);
pub const ACTIVE_STATUS_COLOR: ColorU8 = ColorU8::from_rgba(128, 255, 128, 255);

/// Text and colours of one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct DisplayContent {
    pub volume: String,
    pub status: String,
    pub status_color: ColorU8,
}

impl DisplayContent {
    /// Stopped players show their name only, active ones also the source.
    pub fn from_snapshot(player_name: &str, snapshot: &PlayerSnapshot) -> Self {
        let (status, status_color) = if snapshot.transport_state.is_stopped() {
            (player_name.to_string(), IDLE_STATUS_COLOR)
        } else {
            (
                format!("{}: {}", player_name, snapshot.source),
                ACTIVE_STATUS_COLOR,
            )
        };

        Self {
            volume: snapshot.volume.to_string(),
            status,
            status_color,
        }
    }
}

/// An opaque RGB image ready to be presented.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    pixmap: Pixmap,
}

impl Frame {
    /// Black frame.
    pub fn blank(width: u32, height: u32) -> Result<Self, DisplayError> {
        let mut pixmap =
            Pixmap::new(width, height).ok_or(DisplayError::FrameSize(width, height))?;
        pixmap.fill(Color::BLACK);
        Ok(Self { pixmap })
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    /// RGB of the pixel at (x, y), `None` outside the frame.
    pub fn rgb(&self, x: u32, y: u32) -> Option<(u8, u8, u8)> {
        let p = self.pixmap.pixel(x, y)?.demultiply();
        Some((p.red(), p.green(), p.blue()))
    }

    fn blend(&mut self, x: i32, y: i32, color: ColorU8, coverage: f32) {
        if x < 0 || y < 0 || x as u32 >= self.width() || y as u32 >= self.height() {
            return;
        }
        let coverage = coverage.clamp(0.0, 1.0);
        let idx = (y as u32 * self.width() + x as u32) as usize;
        let pixels = self.pixmap.pixels_mut();
        let dst = pixels[idx];

        let mix = |src: u8, dst: u8| -> u8 {
            (src as f32 * coverage + dst as f32 * (1.0 - coverage)).round() as u8
        };

        if let Some(out) = PremultipliedColorU8::from_rgba(
            mix(color.red(), dst.red()),
            mix(color.green(), dst.green()),
            mix(color.blue(), dst.blue()),
            255,
        ) {
            pixels[idx] = out;
        }
    }
}

/// Turns display content into a frame.
pub trait Composer {
    fn compose(&mut self, content: &DisplayContent) -> Result<Frame, DisplayError>;
}

/// Where a line of text is anchored relative to its reference point.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Anchor {
    /// horizontal middle, vertical middle of ascender and descender
    MiddleMiddle,
    /// horizontal middle, on the baseline
    MiddleBaseline,
}

/// Renders with a TrueType font.
pub struct TextRenderer {
    font: FontVec,
    width: u32,
    height: u32,
    volume_size: f32,
    status_size: f32,
}

impl TextRenderer {
    pub fn from_file(
        path: &Path,
        width: u32,
        height: u32,
        volume_size: f32,
        status_size: f32,
    ) -> Result<Self, DisplayError> {
        let data = std::fs::read(path)
            .map_err(|e| DisplayError::FontUnreadable(path.to_path_buf(), e))?;
        let font =
            FontVec::try_from_vec(data).map_err(|_| DisplayError::FontInvalid(path.to_path_buf()))?;

        Ok(Self::new(font, width, height, volume_size, status_size))
    }

    pub fn new(font: FontVec, width: u32, height: u32, volume_size: f32, status_size: f32) -> Self {
        Self {
            font,
            width,
            height,
            volume_size,
            status_size,
        }
    }

    /// Scale for which one em is `size` pixels.
    fn scale_for(&self, size: f32) -> PxScale {
        let units_per_em = self.font.units_per_em().unwrap_or(1000.0);
        PxScale::from(size * self.font.height_unscaled() / units_per_em)
    }

    fn draw_text(
        &self,
        frame: &mut Frame,
        text: &str,
        size: f32,
        color: ColorU8,
        (x, y): (f32, f32),
        anchor: Anchor,
    ) {
        let scaled = self.font.as_scaled(self.scale_for(size));

        let mut advance = 0.0;
        let mut previous = None;
        let mut placed = Vec::with_capacity(text.len());
        for c in text.chars() {
            let id = scaled.glyph_id(c);
            if let Some(prev) = previous {
                advance += scaled.kern(prev, id);
            }
            placed.push((id, advance));
            advance += scaled.h_advance(id);
            previous = Some(id);
        }

        let left = x - advance / 2.0;
        let baseline = match anchor {
            Anchor::MiddleMiddle => y + (scaled.ascent() + scaled.descent()) / 2.0,
            Anchor::MiddleBaseline => y,
        };

        for (id, offset) in placed {
            let glyph = id.with_scale_and_position(scaled.scale(), point(left + offset, baseline));
            let Some(outlined) = self.font.outline_glyph(glyph) else {
                continue;
            };
            let bounds = outlined.px_bounds();
            outlined.draw(|gx, gy, coverage| {
                frame.blend(
                    bounds.min.x as i32 + gx as i32,
                    bounds.min.y as i32 + gy as i32,
                    color,
                    coverage,
                );
            });
        }
    }
}

impl Composer for TextRenderer {
    fn compose(&mut self, content: &DisplayContent) -> Result<Frame, DisplayError> {
        let mut frame = Frame::blank(self.width, self.height)?;
        let w = self.width as f32;
        let h = self.height as f32;

        self.draw_text(
            &mut frame,
            &content.volume,
            self.volume_size,
            VOLUME_COLOR,
            (w / 2.0, h * 0.45),
            Anchor::MiddleMiddle,
        );
        self.draw_text(
            &mut frame,
            &content.status,
            self.status_size,
            content.status_color,
            (w / 2.0, h * 0.94),
            Anchor::MiddleBaseline,
        );

        Ok(frame)
    }
}

/// Copies `frame` into a `width` x `height` 0RGB buffer, black outside the frame.
pub fn frame_to_xrgb(frame: &Frame, width: u32, height: u32, out: &mut [u32]) {
    for y in 0..height {
        for x in 0..width {
            let idx = (y * width + x) as usize;
            let Some(slot) = out.get_mut(idx) else {
                return;
            };
            *slot = match frame.rgb(x, y) {
                Some((r, g, b)) => ((r as u32) << 16) | ((g as u32) << 8) | b as u32,
                None => 0,
            };
        }
    }
}

/// Window size: the configured one, or the screen when running full screen
/// on a larger screen.
pub fn effective_size(configured: (u32, u32), screen: Option<(u32, u32)>, fullscreen: bool) -> (u32, u32) {
    match screen {
        Some((sw, sh)) if fullscreen && configured.0 < sw && configured.1 < sh => (sw, sh),
        _ => configured,
    }
}
