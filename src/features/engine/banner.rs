//! LED 滚动横幅：文字首尾相接循环滚动。

use serde::Deserialize;

use super::EngineError;
use super::canvas::{self, Anchor, FontBook, SvgFrame};

const MAX_FRAMES: i64 = 30;
/// 空格宽度（相对字号）
const SPACE_EM: f64 = 0.25;

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LedBannerOptions {
    pub background: String,
    pub color: String,
    pub delay: f64,
    pub forward: bool,
    pub frames: i64,
    pub height: i64,
    pub space_size: i64,
    pub text: String,
    pub width: i64,
}

impl Default for LedBannerOptions {
    fn default() -> Self {
        Self {
            background: "#000000".to_string(),
            color: "#ffffff".to_string(),
            delay: 50.0,
            forward: true,
            frames: 10,
            height: 50,
            space_size: 4,
            text: "Hello World!".to_string(),
            width: 800,
        }
    }
}

/// 一段“文字 + 间隔空格”的宽度，即滚动一个周期的位移
fn segment_width(fonts: &FontBook, text: &str, size: f64, space_size: i64) -> f64 {
    let (text_width, _) = fonts.measure(text, size);
    let gap = space_size.max(0) as f64 * size * SPACE_EM;
    (text_width + gap).max(1.0)
}

/// 第 `frame` 帧最左侧一段文字的 x 坐标
fn scroll_x(frame: i64, frames: i64, segment: f64, forward: bool) -> f64 {
    let offset = frame as f64 * segment / frames as f64;
    if forward { -segment + offset } else { -offset }
}

pub fn render(fonts: &FontBook, opts: LedBannerOptions) -> Result<Vec<u8>, EngineError> {
    let frames = opts.frames.clamp(1, MAX_FRAMES);
    let (width, height) = (canvas::canvas_side(opts.width), canvas::canvas_side(opts.height));
    let bg = canvas::parse_hex_color(&opts.background);
    let fg = canvas::parse_hex_color(&opts.color);
    let size = f64::from(height) * 0.8;
    let delay = canvas::frame_delay_ms(opts.delay);

    let segment = segment_width(fonts, &opts.text, size, opts.space_size);
    // 铺满画布后再多画两段，保证滚动时两端不露底
    let copies = (f64::from(width) / segment).ceil() as usize + 2;

    let mut out = Vec::with_capacity(frames as usize);
    for i in 0..frames {
        let x0 = scroll_x(i, frames, segment, opts.forward);
        let mut frame = SvgFrame::new(width, height, bg);
        for k in 0..copies {
            frame.text(
                &opts.text,
                x0 + k as f64 * segment,
                f64::from(height) / 2.0,
                size,
                fg,
                Anchor::Start,
                true,
            );
        }
        out.push((fonts.rasterize(frame)?, delay));
    }
    canvas::encode_gif(out)
}
