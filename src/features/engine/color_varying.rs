//! 变色文字：背景与文字颜色沿色相环循环，文字自动换行居中。

use serde::Deserialize;

use super::EngineError;
use super::canvas::{self, Anchor, FontBook, Rgb, SvgFrame};

const MAX_FRAMES: i64 = 60;
const MIN_FONT_SIZE: f64 = 12.0;
const LINE_HEIGHT: f64 = 1.2;

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ColorVaryingTextOptions {
    pub delay: f64,
    pub frames: i64,
    pub height: i64,
    pub text: String,
    pub width: i64,
    pub color_scheme: String,
    pub padding: i64,
}

impl Default for ColorVaryingTextOptions {
    fn default() -> Self {
        Self {
            delay: 100.0,
            frames: 30,
            height: 400,
            text: "SALE".to_string(),
            width: 600,
            color_scheme: "complementary".to_string(),
            padding: 40,
        }
    }
}

/// 配色方案
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scheme {
    Complementary,
    Monochromatic,
    Triadic,
    Analogous,
}

impl Scheme {
    fn parse(raw: &str) -> Self {
        match raw {
            "complementary" => Scheme::Complementary,
            "monochromatic" => Scheme::Monochromatic,
            "triadic" => Scheme::Triadic,
            _ => Scheme::Analogous,
        }
    }

    /// 第 `frame` 帧的 (背景色, 文字色)
    fn colors(self, frame: i64, frames: i64) -> (Rgb, Rgb) {
        let hue = frame as f64 * (360.0 / frames as f64);
        match self {
            Scheme::Complementary => (
                Rgb::from_hsl(hue, 1.0, 0.3),
                Rgb::from_hsl((hue + 180.0) % 360.0, 1.0, 0.8),
            ),
            Scheme::Monochromatic => (Rgb::from_hsl(hue, 0.8, 0.2), Rgb::from_hsl(hue, 0.8, 0.8)),
            Scheme::Triadic => (
                Rgb::from_hsl(hue, 1.0, 0.3),
                Rgb::from_hsl((hue + 120.0) % 360.0, 1.0, 0.8),
            ),
            Scheme::Analogous => (
                Rgb::from_hsl(hue, 1.0, 0.3),
                Rgb::from_hsl((hue + 30.0) % 360.0, 1.0, 0.8),
            ),
        }
    }
}

/// 贪心换行：单词按空白切分，放不下就另起一行（超长单词独占一行）。
fn wrap(fonts: &FontBook, text: &str, size: f64, max_width: f64) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{current} {word}")
        };
        if fonts.measure(&candidate, size).0 <= max_width {
            current = candidate;
        } else {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            current.push_str(word);
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

#[derive(Debug)]
struct Layout {
    lines: Vec<String>,
    size: f64,
}

fn layout(fonts: &FontBook, text: &str, width: f64, height: f64, padding: f64) -> Layout {
    let avail_width = width - 2.0 * padding;
    let avail_height = height - 2.0 * padding;

    let mut size = height * 0.5;
    loop {
        let lines = wrap(fonts, text, size, avail_width);
        if size * LINE_HEIGHT * lines.len() as f64 <= avail_height {
            return Layout { lines, size };
        }
        size *= 0.9;
        if size < MIN_FONT_SIZE {
            return Layout {
                lines: wrap(fonts, text, MIN_FONT_SIZE, avail_width),
                size: MIN_FONT_SIZE,
            };
        }
    }
}

pub fn render(fonts: &FontBook, opts: ColorVaryingTextOptions) -> Result<Vec<u8>, EngineError> {
    let frames = opts.frames.clamp(1, MAX_FRAMES);
    let (width, height) = (canvas::canvas_side(opts.width), canvas::canvas_side(opts.height));
    let (w, h) = (f64::from(width), f64::from(height));
    let padding = opts.padding.max(0) as f64;
    let delay = canvas::frame_delay_ms(opts.delay);
    let scheme = Scheme::parse(&opts.color_scheme);

    let Layout { lines, size } = layout(fonts, &opts.text, w, h, padding);
    let line_height = size * LINE_HEIGHT;
    let start_y = padding + (h - 2.0 * padding - line_height * lines.len() as f64) / 2.0 + size;

    let mut out = Vec::with_capacity(frames as usize);
    for i in 0..frames {
        let (bg, fg) = scheme.colors(i, frames);
        let mut frame = SvgFrame::new(width, height, bg);
        for (n, line) in lines.iter().enumerate() {
            let y = start_y + n as f64 * line_height;
            frame.text(line, w / 2.0, y, size, fg, Anchor::Middle, false);
        }
        out.push((fonts.rasterize(frame)?, delay));
    }
    canvas::encode_gif(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::engine::test_support::empty_fonts;

    #[test]
    fn unknown_scheme_is_analogous() {
        assert_eq!(Scheme::parse("triadic"), Scheme::Triadic);
        assert_eq!(Scheme::parse("rainbow"), Scheme::Analogous);
    }

    #[test]
    fn first_frame_starts_at_red() {
        let (bg, fg) = Scheme::Complementary.colors(0, 30);
        assert_eq!(bg, Rgb::from_hsl(0.0, 1.0, 0.3));
        assert_eq!(fg, Rgb::from_hsl(180.0, 1.0, 0.8));
    }

    #[test]
    fn words_wrap_greedily() {
        let fonts = empty_fonts();
        // 估算宽度：每字符 0.55 * 20 = 11px
        let lines = wrap(&fonts, "AAA BBB CCC", 20.0, 80.0);
        assert_eq!(lines, vec!["AAA BBB", "CCC"]);
        assert!(wrap(&fonts, "   ", 20.0, 80.0).is_empty());
    }

    #[test]
    fn layout_shrinks_until_lines_fit() {
        let fonts = empty_fonts();
        let l = layout(&fonts, "ONE TWO THREE FOUR FIVE SIX", 600.0, 400.0, 40.0);
        assert!(l.size <= 200.0);
        assert!(l.size * LINE_HEIGHT * l.lines.len() as f64 <= 320.0 || l.size == MIN_FONT_SIZE);
    }
}
