//! 打字机效果：逐字出现，结束后光标闪烁三次。

use serde::Deserialize;

use super::EngineError;
use super::canvas::{self, Anchor, FontBook, SvgFrame};

const MIN_FONT_SIZE: f64 = 12.0;
/// 打完之后光标闪烁的帧数
const BLINK_FRAMES: usize = 6;
const CURSOR: &str = "|";

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TypingTextOptions {
    pub background: String,
    pub color: String,
    pub delay: f64,
    pub height: i64,
    pub text: String,
    pub width: i64,
    pub padding: i64,
}

impl Default for TypingTextOptions {
    fn default() -> Self {
        Self {
            background: "#000000".to_string(),
            color: "#ffffff".to_string(),
            delay: 100.0,
            height: 200,
            text: "BLACK FRIDAY".to_string(),
            width: 800,
            padding: 40,
        }
    }
}

/// 从半高开始每次缩小 10%，直到“文字 + 光标”能放进留白后的区域
fn fit_font_size(fonts: &FontBook, text: &str, width: f64, height: f64, padding: f64) -> f64 {
    let max_width = width - 2.0 * padding;
    let max_height = height - 2.0 * padding;
    let sample = format!("{text}{CURSOR}");

    let mut size = height * 0.5;
    loop {
        let (w, h) = fonts.measure(&sample, size);
        if w <= max_width && h <= max_height {
            return size;
        }
        size *= 0.9;
        if size < MIN_FONT_SIZE {
            return MIN_FONT_SIZE;
        }
    }
}

/// 帧序列：(可见字符数, 是否显示光标)
fn timeline(chars: usize) -> Vec<(usize, bool)> {
    (0..=chars)
        .map(|n| (n, false))
        .chain((0..BLINK_FRAMES).map(|i| (chars, i % 2 == 0)))
        .collect()
}

pub fn render(fonts: &FontBook, opts: TypingTextOptions) -> Result<Vec<u8>, EngineError> {
    let (width, height) = (canvas::canvas_side(opts.width), canvas::canvas_side(opts.height));
    let bg = canvas::parse_hex_color(&opts.background);
    let fg = canvas::parse_hex_color(&opts.color);
    let delay = canvas::frame_delay_ms(opts.delay);
    let padding = opts.padding.max(0) as f64;

    let text: Vec<char> = opts.text.trim().chars().collect();
    let full: String = text.iter().collect();
    let size = fit_font_size(fonts, &full, f64::from(width), f64::from(height), padding);
    let (_, cap_height) = fonts.measure("M", size);
    let baseline = (f64::from(height) + cap_height) / 2.0;

    let mut out = Vec::new();
    for (visible, cursor) in timeline(text.len()) {
        let shown: String = text[..visible].iter().collect();
        let mut frame = SvgFrame::new(width, height, bg);
        frame.text(&shown, padding, baseline, size, fg, Anchor::Start, false);
        if cursor {
            let cursor_x = padding + if visible > 0 { fonts.measure(&shown, size).0 } else { 0.0 };
            frame.text(CURSOR, cursor_x, baseline, size, fg, Anchor::Start, false);
        }
        out.push((fonts.rasterize(frame)?, delay));
    }
    canvas::encode_gif(out)
}
