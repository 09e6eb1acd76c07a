use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use image::codecs::gif::{GifEncoder, Repeat};
use image::{Delay, Frame, RgbaImage};
use resvg::usvg::{self, fontdb};
use tiny_skia::{Pixmap, Transform};

use super::EngineError;

/// 所有模式统一使用的字体族（缺失时由 usvg 回退到任意可用字体）
pub const FONT_FAMILY: &str = "Impact, 'Arial Black', 'DejaVu Sans', sans-serif";

/// 画布单边的像素范围，超出的请求会被夹紧，避免超大 pixmap。
const MIN_CANVAS_SIDE: i64 = 16;
const MAX_CANVAS_SIDE: i64 = 2048;

/// GIF 量化速度（1 最慢最好，30 最快）
const GIF_QUANTIZE_SPEED: i32 = 10;

// 全局字体数据库单例
static GLOBAL_FONT_DB: OnceLock<Arc<fontdb::Database>> = OnceLock::new();

fn init_font_db(fonts_dir: &Path) -> Arc<fontdb::Database> {
    let mut font_db = fontdb::Database::new();
    font_db.load_system_fonts();

    if let Ok(entries) = fs::read_dir(fonts_dir) {
        for path in entries.flatten().map(|e| e.path()) {
            let is_font = path.is_file()
                && matches!(
                    path.extension().and_then(|e| e.to_str()),
                    Some("ttf" | "otf" | "ttc")
                );
            if is_font && let Err(e) = font_db.load_font_file(&path) {
                tracing::error!("加载字体文件失败 '{}': {}", path.display(), e);
            }
        }
    }

    tracing::info!("字体数据库就绪，共 {} 个字体", font_db.len());
    Arc::new(font_db)
}

/// 获取全局字体数据库（首次调用时加载系统字体与 `fonts_dir` 下的字体）
pub fn global_font_db(fonts_dir: &Path) -> Arc<fontdb::Database> {
    GLOBAL_FONT_DB
        .get_or_init(|| init_font_db(&PathBuf::from(fonts_dir)))
        .clone()
}

/// 夹紧画布边长
pub fn canvas_side(v: i64) -> u32 {
    v.clamp(MIN_CANVAS_SIDE, MAX_CANVAS_SIDE) as u32
}

/// 不透明 RGB 颜色
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// 以 `alpha`（0-255）把自身叠加到 `bg` 上
    pub fn over(&self, bg: Rgb, alpha: u8) -> Rgb {
        let a = f64::from(alpha) / 255.0;
        let mix = |fg: u8, bg: u8| (f64::from(fg) * a + f64::from(bg) * (1.0 - a)) as u8;
        Rgb::new(mix(self.r, bg.r), mix(self.g, bg.g), mix(self.b, bg.b))
    }

    /// HSL（h 为角度，s/l 为 0-1）转 RGB
    pub fn from_hsl(h: f64, s: f64, l: f64) -> Rgb {
        fn hue_to_rgb(p: f64, q: f64, mut t: f64) -> f64 {
            if t < 0.0 {
                t += 1.0;
            }
            if t > 1.0 {
                t -= 1.0;
            }
            if t < 1.0 / 6.0 {
                return p + (q - p) * 6.0 * t;
            }
            if t < 0.5 {
                return q;
            }
            if t < 2.0 / 3.0 {
                return p + (q - p) * (2.0 / 3.0 - t) * 6.0;
            }
            p
        }

        let (r, g, b) = if s == 0.0 {
            (l, l, l)
        } else {
            let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
            let p = 2.0 * l - q;
            (
                hue_to_rgb(p, q, h / 360.0 + 1.0 / 3.0),
                hue_to_rgb(p, q, h / 360.0),
                hue_to_rgb(p, q, h / 360.0 - 1.0 / 3.0),
            )
        };
        Rgb::new((r * 255.0) as u8, (g * 255.0) as u8, (b * 255.0) as u8)
    }
}

/// 解析 `#rrggbb` / `rrggbb` / `#rgb` / `rgb`；其他输入一律视为白色。
pub fn parse_hex_color(raw: &str) -> Rgb {
    let s = raw.trim().trim_start_matches('#');
    let channel = |h: &str| u8::from_str_radix(h, 16).ok();

    let parsed = match s.len() {
        6 if s.is_ascii() => (|| {
            Some(Rgb::new(
                channel(&s[0..2])?,
                channel(&s[2..4])?,
                channel(&s[4..6])?,
            ))
        })(),
        3 if s.is_ascii() => (|| {
            Some(Rgb::new(
                channel(&s[0..1])? * 17,
                channel(&s[1..2])? * 17,
                channel(&s[2..3])? * 17,
            ))
        })(),
        _ => None,
    };
    parsed.unwrap_or(Rgb::WHITE)
}

pub fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// 文字水平锚点
#[derive(Debug, Clone, Copy)]
pub enum Anchor {
    Start,
    Middle,
}

impl Anchor {
    fn as_svg(self) -> &'static str {
        match self {
            Anchor::Start => "start",
            Anchor::Middle => "middle",
        }
    }
}

/// 单帧 SVG 文档构建器
pub struct SvgFrame {
    width: u32,
    height: u32,
    buf: String,
}

impl SvgFrame {
    /// 新建一帧并用背景色铺满
    pub fn new(width: u32, height: u32, background: Rgb) -> Self {
        let mut buf = String::with_capacity(2048);
        let _ = write!(
            buf,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {width} {height}"><rect width="{width}" height="{height}" fill="{}"/>"#,
            background.hex()
        );
        Self { width, height, buf }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// 绘制文字。`central=true` 时 `y` 为垂直中心，否则为基线。
    #[allow(clippy::too_many_arguments)]
    pub fn text(
        &mut self,
        content: &str,
        x: f64,
        y: f64,
        size: f64,
        fill: Rgb,
        anchor: Anchor,
        central: bool,
    ) {
        let baseline = if central {
            r#" dominant-baseline="central""#
        } else {
            ""
        };
        let _ = write!(
            self.buf,
            r#"<text x="{x:.2}" y="{y:.2}" font-family="{FONT_FAMILY}" font-size="{size:.2}" fill="{}" text-anchor="{}"{baseline} xml:space="preserve">{}</text>"#,
            fill.hex(),
            anchor.as_svg(),
            escape_xml(content)
        );
    }

    pub fn circle(&mut self, cx: f64, cy: f64, r: f64, fill: Rgb) {
        let _ = write!(
            self.buf,
            r#"<circle cx="{cx:.2}" cy="{cy:.2}" r="{r:.2}" fill="{}"/>"#,
            fill.hex()
        );
    }

    pub fn ring(&mut self, cx: f64, cy: f64, r: f64, stroke: Rgb, stroke_width: f64) {
        let _ = write!(
            self.buf,
            r#"<circle cx="{cx:.2}" cy="{cy:.2}" r="{r:.2}" fill="none" stroke="{}" stroke-width="{stroke_width:.2}"/>"#,
            stroke.hex()
        );
    }

    pub fn line(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, stroke: Rgb, stroke_width: f64) {
        let _ = write!(
            self.buf,
            r#"<line x1="{x1:.2}" y1="{y1:.2}" x2="{x2:.2}" y2="{y2:.2}" stroke="{}" stroke-width="{stroke_width:.2}"/>"#,
            stroke.hex()
        );
    }

    /// 从 `start` 到 `end`（弧度，顺时针）的圆弧描边
    #[allow(clippy::too_many_arguments)]
    pub fn arc(
        &mut self,
        cx: f64,
        cy: f64,
        r: f64,
        start: f64,
        end: f64,
        stroke: Rgb,
        stroke_width: f64,
    ) {
        let sweep = end - start;
        if sweep <= 0.0 {
            return;
        }
        if sweep >= std::f64::consts::TAU - 1e-6 {
            self.ring(cx, cy, r, stroke, stroke_width);
            return;
        }
        let (x0, y0) = (cx + r * start.cos(), cy + r * start.sin());
        let (x1, y1) = (cx + r * end.cos(), cy + r * end.sin());
        let large_arc = u8::from(sweep > std::f64::consts::PI);
        let _ = write!(
            self.buf,
            r#"<path d="M {x0:.3} {y0:.3} A {r:.3} {r:.3} 0 {large_arc} 1 {x1:.3} {y1:.3}" fill="none" stroke="{}" stroke-width="{stroke_width:.2}"/>"#,
            stroke.hex()
        );
    }

    pub fn finish(mut self) -> String {
        self.buf.push_str("</svg>");
        self.buf
    }
}

/// 引擎实例持有的字体视图：负责 SVG 解析、栅格化与文字测量。
#[derive(Clone)]
pub struct FontBook {
    db: Arc<fontdb::Database>,
}

impl FontBook {
    pub fn new(db: Arc<fontdb::Database>) -> Self {
        Self { db }
    }

    fn parse(&self, svg: &str) -> Result<usvg::Tree, EngineError> {
        let opts = usvg::Options {
            fontdb: self.db.clone(),
            font_family: "DejaVu Sans".to_string(),
            ..Default::default()
        };
        usvg::Tree::from_str(svg, &opts)
            .map_err(|e| EngineError::Render(format!("SVG 解析失败: {e}")))
    }

    /// 栅格化一帧
    pub fn rasterize(&self, frame: SvgFrame) -> Result<RgbaImage, EngineError> {
        let (w, h) = (frame.width(), frame.height());
        let tree = self.parse(&frame.finish())?;
        let mut pixmap = Pixmap::new(w, h)
            .ok_or_else(|| EngineError::Render(format!("无法创建 {w}x{h} 的 pixmap")))?;
        resvg::render(&tree, Transform::default(), &mut pixmap.as_mut());
        RgbaImage::from_raw(w, h, pixmap.take())
            .ok_or_else(|| EngineError::Render("pixmap 尺寸与缓冲区不一致".to_string()))
    }

    /// 测量单行文字的 (宽, 高)。无可用字体时退化为按字符数估算。
    pub fn measure(&self, text: &str, size: f64) -> (f64, f64) {
        if !text.trim().is_empty() {
            let svg = format!(
                r#"<svg xmlns="http://www.w3.org/2000/svg" width="8192" height="{h}"><text x="0" y="{size:.2}" font-family="{FONT_FAMILY}" font-size="{size:.2}">{}</text></svg>"#,
                escape_xml(text),
                h = (size * 2.0).ceil().max(1.0),
            );
            if let Ok(tree) = self.parse(&svg)
                && !tree.root().children().is_empty()
            {
                let bbox = tree.root().abs_bounding_box();
                if bbox.width() > 0.0 && bbox.height() > 0.0 {
                    return (f64::from(bbox.width()), f64::from(bbox.height()));
                }
            }
        }
        estimate_text_size(text, size)
    }
}

fn estimate_text_size(text: &str, size: f64) -> (f64, f64) {
    (text.chars().count() as f64 * size * 0.55, size * 0.75)
}

/// 帧延迟：毫秒 → GIF 的百分之一秒（向下取整）再换回毫秒
pub fn frame_delay_ms(delay: f64) -> u32 {
    if !delay.is_finite() || delay <= 0.0 {
        return 0;
    }
    let centis = (delay / 10.0).floor().min(f64::from(u16::MAX));
    centis as u32 * 10
}

/// 将 RGBA 帧序列编码为无限循环的 GIF
pub fn encode_gif(frames: Vec<(RgbaImage, u32)>) -> Result<Vec<u8>, EngineError> {
    if frames.is_empty() {
        return Err(EngineError::Render("没有可编码的帧".to_string()));
    }
    let mut out = Vec::new();
    {
        let mut encoder = GifEncoder::new_with_speed(&mut out, GIF_QUANTIZE_SPEED);
        encoder
            .set_repeat(Repeat::Infinite)
            .map_err(|e| EngineError::Render(format!("GIF 头写入失败: {e}")))?;
        for (image, delay_ms) in frames {
            let frame = Frame::from_parts(image, 0, 0, Delay::from_numer_denom_ms(delay_ms, 1));
            encoder
                .encode_frame(frame)
                .map_err(|e| EngineError::Render(format!("GIF 帧编码失败: {e}")))?;
        }
    }
    Ok(out)
}
