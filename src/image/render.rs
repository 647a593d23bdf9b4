//! Local Deterministic Renderer
//!
//! Last tier of the image cascade. Draws a PNG from local primitives only:
//! a gradient background, decorative circles, the description's words as
//! outlined glyph bars, and a style band along the bottom edge.
//!
//! Every layout decision is drawn from a SHA-256 stream seeded by the
//! description, with colors tinted by the style. Identical inputs produce
//! byte-identical images.

use ::image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use sha2::{Digest, Sha256};
use std::io::Cursor;
use tracing::{debug, error};

use crate::constants::image as image_constants;
use crate::types::ImagePayload;

/// Constant 1x1 PNG returned if encoding itself fails
pub const PLACEHOLDER_PNG_BASE64: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

const SKY: [u8; 3] = [135, 206, 235];
const OUTLINE: Rgb<u8> = Rgb([0, 0, 0]);
const GLYPH: Rgb<u8> = Rgb([255, 255, 255]);

#[derive(Debug, Clone)]
pub struct LocalRenderer {
    size: u32,
    wrap_chars: usize,
}

impl Default for LocalRenderer {
    fn default() -> Self {
        Self::new(image_constants::RENDER_SIZE)
    }
}

impl LocalRenderer {
    pub fn new(size: u32) -> Self {
        Self {
            size: size.max(64),
            wrap_chars: image_constants::RENDER_WRAP_CHARS,
        }
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    /// Render and encode. Never fails and never returns an empty payload.
    pub fn render(&self, description: &str, style: &str) -> ImagePayload {
        let layout = Layout::compute(description, style, self.size, self.wrap_chars);
        let canvas = self.draw(&layout);

        match encode_png(canvas) {
            Ok(bytes) => {
                debug!(bytes = bytes.len(), "Rendered local image");
                ImagePayload::from_png_bytes(&bytes)
            }
            Err(e) => {
                error!(error = %e, "PNG encoding failed, using placeholder image");
                ImagePayload::png(PLACEHOLDER_PNG_BASE64)
            }
        }
    }

    fn draw(&self, layout: &Layout) -> RgbImage {
        let size = self.size;
        let (top, bottom) = layout.background;
        let mut canvas = RgbImage::from_fn(size, size, |_, y| {
            let t = y as f32 / (size - 1) as f32;
            Rgb(mix(top, bottom, t))
        });

        for circle in &layout.circles {
            fill_circle(&mut canvas, circle);
        }

        // Words: one outlined bar per word, lines centered on the canvas
        let cell = (size / 40).max(2);
        let bar_height = cell * 3 / 2;
        let line_gap = cell;
        let block_height = layout.lines.len() as u32 * (bar_height + line_gap);
        let mut y = size.saturating_sub(block_height) / 2;
        for line in &layout.lines {
            let line_width = line.chars().count() as u32 * cell;
            let mut x = size.saturating_sub(line_width) / 2;
            for word in line.split(' ') {
                let width = word.chars().count() as u32 * cell;
                if width > 0 {
                    outlined_rect(&mut canvas, x, y, width.saturating_sub(cell / 2), bar_height);
                }
                x += width + cell;
            }
            y += bar_height + line_gap;
        }

        // Style band with a label bar at the bottom-left
        let band = (size / 16).max(4);
        fill_rect(
            &mut canvas,
            0,
            size - band,
            size,
            band,
            Rgb(layout.style_color),
        );
        let label_width = (layout.style_label_chars as u32 * cell / 2).min(size - 20);
        outlined_rect(
            &mut canvas,
            10,
            size - band + band / 4,
            label_width,
            band / 2,
        );

        canvas
    }
}

// =============================================================================
// Layout
// =============================================================================

/// Every hash-derived decision, computed before any pixel is touched
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub background: ([u8; 3], [u8; 3]),
    pub circles: Vec<Circle>,
    pub lines: Vec<String>,
    pub style_color: [u8; 3],
    pub style_label_chars: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Circle {
    pub cx: u32,
    pub cy: u32,
    pub radius: u32,
    pub color: [u8; 3],
}

impl Layout {
    pub fn compute(description: &str, style: &str, size: u32, wrap_chars: usize) -> Self {
        let mut seed = HashStream::new(description.as_bytes());
        let mut tint = HashStream::new(style.as_bytes());

        let style_rgb = tint.rgb();
        let top = mix(SKY, style_rgb, 0.25);
        let bottom = mix(lighten(seed.rgb()), style_rgb, 0.2);

        let circle_count = 3 + (seed.next_byte() % 5) as usize;
        let circles = (0..circle_count)
            .map(|_| Circle {
                cx: seed.next_u32() % size,
                cy: seed.next_u32() % size,
                radius: size / 20 + seed.next_u32() % (size / 6),
                color: mix(lighten(seed.rgb()), style_rgb, 0.3),
            })
            .collect();

        Self {
            background: (top, bottom),
            circles,
            lines: wrap_words(description, wrap_chars),
            style_color: mix(style_rgb, [32, 32, 48], 0.4),
            style_label_chars: "Style: ".len() + style.chars().count(),
        }
    }
}

/// Greedy word wrap; words longer than the limit get a line of their own
pub fn wrap_words(text: &str, limit: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };
        if candidate > limit && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Unbounded byte stream: SHA-256 of (input, block counter)
struct HashStream {
    input: Vec<u8>,
    counter: u64,
    block: [u8; 32],
    pos: usize,
}

impl HashStream {
    fn new(input: &[u8]) -> Self {
        let mut stream = Self {
            input: input.to_vec(),
            counter: 0,
            block: [0; 32],
            pos: 32,
        };
        stream.refill();
        stream
    }

    fn refill(&mut self) {
        let mut hasher = Sha256::new();
        hasher.update(&self.input);
        hasher.update(self.counter.to_be_bytes());
        self.block = hasher.finalize().into();
        self.counter += 1;
        self.pos = 0;
    }

    fn next_byte(&mut self) -> u8 {
        if self.pos == self.block.len() {
            self.refill();
        }
        let byte = self.block[self.pos];
        self.pos += 1;
        byte
    }

    fn next_u32(&mut self) -> u32 {
        u32::from_be_bytes([
            self.next_byte(),
            self.next_byte(),
            self.next_byte(),
            self.next_byte(),
        ])
    }

    fn rgb(&mut self) -> [u8; 3] {
        [self.next_byte(), self.next_byte(), self.next_byte()]
    }
}

// =============================================================================
// Drawing primitives
// =============================================================================

fn mix(a: [u8; 3], b: [u8; 3], t: f32) -> [u8; 3] {
    let t = t.clamp(0.0, 1.0);
    let channel = |x: u8, y: u8| (x as f32 + (y as f32 - x as f32) * t).round() as u8;
    [channel(a[0], b[0]), channel(a[1], b[1]), channel(a[2], b[2])]
}

fn lighten(c: [u8; 3]) -> [u8; 3] {
    mix(c, [255, 255, 255], 0.45)
}

fn fill_circle(canvas: &mut RgbImage, circle: &Circle) {
    let (w, h) = canvas.dimensions();
    let r = circle.radius as i64;
    let (cx, cy) = (circle.cx as i64, circle.cy as i64);
    let x0 = (cx - r).max(0);
    let x1 = (cx + r).min(w as i64 - 1);
    let y0 = (cy - r).max(0);
    let y1 = (cy + r).min(h as i64 - 1);

    for y in y0..=y1 {
        for x in x0..=x1 {
            let (dx, dy) = (x - cx, y - cy);
            if dx * dx + dy * dy <= r * r {
                let pixel = canvas.get_pixel_mut(x as u32, y as u32);
                *pixel = Rgb(mix(pixel.0, circle.color, 0.6));
            }
        }
    }
}

fn fill_rect(canvas: &mut RgbImage, x: u32, y: u32, width: u32, height: u32, color: Rgb<u8>) {
    let (w, h) = canvas.dimensions();
    for py in y..y.saturating_add(height).min(h) {
        for px in x..x.saturating_add(width).min(w) {
            canvas.put_pixel(px, py, color);
        }
    }
}

/// White bar with a 1px black outline
fn outlined_rect(canvas: &mut RgbImage, x: u32, y: u32, width: u32, height: u32) {
    if width == 0 || height == 0 {
        return;
    }
    fill_rect(
        canvas,
        x.saturating_sub(1),
        y.saturating_sub(1),
        width + 2,
        height + 2,
        OUTLINE,
    );
    fill_rect(canvas, x, y, width, height, GLYPH);
}

fn encode_png(canvas: RgbImage) -> Result<Vec<u8>, ::image::ImageError> {
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(canvas).write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(bytes)
}
