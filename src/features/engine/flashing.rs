//! 两种闪烁效果：
//! - 闪烁文字：同一段文字出现在若干固定位置，每帧只点亮其中一处；
//! - 逐字母闪烁：每帧每个字母按概率熄灭。
//!
//! 随机数使用固定种子，同样的参数总是得到同样的动画。

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;

use super::EngineError;
use super::canvas::{self, Anchor, FontBook, SvgFrame};

const SEED: u64 = 42;
const MAX_FRAMES: i64 = 60;
const MAX_WORDS: i64 = 20;

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FlashingTextOptions {
    pub background: String,
    pub color: String,
    pub delay: f64,
    pub frames: i64,
    pub height: i64,
    pub text: String,
    pub width: i64,
    pub words: i64,
}

impl Default for FlashingTextOptions {
    fn default() -> Self {
        Self {
            background: "#000000".to_string(),
            color: "#ffffff".to_string(),
            delay: 300.0,
            frames: 30,
            height: 400,
            text: "SALE".to_string(),
            width: 600,
            words: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Placement {
    x: f64,
    y: f64,
    size: f64,
}

/// 在留白之内为每个副本挑一个位置
fn placements(width: f64, height: f64, words: usize) -> Vec<Placement> {
    let mut rng = StdRng::seed_from_u64(SEED);
    let padding = height * 0.1;
    let size = height * 0.15;

    (0..words)
        .map(|_| {
            let span_x = (width - 2.0 * padding - size).max(0.0);
            let span_y = (height - 2.0 * padding - size).max(0.0);
            let x = padding + rng.gen_range(0.0..1.0) * span_x;
            let y = padding + rng.gen_range(0.0..1.0) * span_y;
            Placement {
                x: x.min(width - padding - size),
                y: y.min(height - padding - size),
                size,
            }
        })
        .collect()
}

pub fn render_text(fonts: &FontBook, opts: FlashingTextOptions) -> Result<Vec<u8>, EngineError> {
    let frames = opts.frames.clamp(1, MAX_FRAMES);
    let words = opts.words.clamp(1, MAX_WORDS) as usize;
    let (width, height) = (canvas::canvas_side(opts.width), canvas::canvas_side(opts.height));
    let bg = canvas::parse_hex_color(&opts.background);
    let fg = canvas::parse_hex_color(&opts.color);
    let delay = canvas::frame_delay_ms(opts.delay);

    let spots = placements(f64::from(width), f64::from(height), words);

    let mut out = Vec::with_capacity(frames as usize);
    for i in 0..frames as usize {
        let spot = spots[i % spots.len()];
        let mut frame = SvgFrame::new(width, height, bg);
        frame.text(&opts.text, spot.x, spot.y, spot.size, fg, Anchor::Middle, true);
        out.push((fonts.rasterize(frame)?, delay));
    }
    canvas::encode_gif(out)
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FlashingLettersOptions {
    pub background: String,
    pub color: String,
    pub delay: f64,
    pub frames: i64,
    pub height: i64,
    pub text: String,
    pub width: i64,
    pub flash_probability: f64,
}

impl Default for FlashingLettersOptions {
    fn default() -> Self {
        Self {
            background: "#000000".to_string(),
            color: "#ffffff".to_string(),
            delay: 100.0,
            frames: 20,
            height: 200,
            text: "SALE".to_string(),
            width: 400,
            flash_probability: 0.3,
        }
    }
}

/// 每帧每个字母是否可见
fn visibility(frames: usize, letters: usize, probability: f64) -> Vec<Vec<bool>> {
    let mut rng = StdRng::seed_from_u64(SEED);
    (0..frames)
        .map(|_| {
            (0..letters)
                .map(|_| rng.gen_range(0.0..1.0) >= probability)
                .collect()
        })
        .collect()
}

pub fn render_letters(
    fonts: &FontBook,
    opts: FlashingLettersOptions,
) -> Result<Vec<u8>, EngineError> {
    let frames = opts.frames.clamp(1, MAX_FRAMES) as usize;
    let probability = if opts.flash_probability.is_finite() {
        opts.flash_probability.clamp(0.0, 1.0)
    } else {
        0.0
    };
    let (width, height) = (canvas::canvas_side(opts.width), canvas::canvas_side(opts.height));
    let bg = canvas::parse_hex_color(&opts.background);
    let fg = canvas::parse_hex_color(&opts.color);
    let delay = canvas::frame_delay_ms(opts.delay);
    let size = f64::from(height) * 0.6;

    // 字母位置与帧无关，先算好
    let (text_width, text_height) = fonts.measure(&opts.text, size);
    let mut x = (f64::from(width) - text_width) / 2.0;
    let baseline = (f64::from(height) + text_height) / 2.0;
    let letters: Vec<(String, f64)> = opts
        .text
        .chars()
        .map(|c| {
            let glyph = c.to_string();
            let at = x;
            x += fonts.measure(&glyph, size).0;
            (glyph, at)
        })
        .collect();

    let lit = visibility(frames, letters.len(), probability);

    let mut out = Vec::with_capacity(frames);
    for visible in &lit {
        let mut frame = SvgFrame::new(width, height, bg);
        for ((glyph, at), on) in letters.iter().zip(visible) {
            if *on {
                frame.text(glyph, *at, baseline, size, fg, Anchor::Start, false);
            }
        }
        out.push((fonts.rasterize(frame)?, delay));
    }
    canvas::encode_gif(out)
}
