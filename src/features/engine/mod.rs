//! 沙箱化渲染引擎
//!
//! 渲染链路只通过两个 trait 与引擎打交道：
//! - [`EngineFactory`]：每次请求实例化一个全新的引擎实例；
//! - [`RenderEngine`]：按入口名同步调用，参数是一个字段名固定的 JSON 对象，返回 base64 编码的 GIF。
//!
//! 内置实现 [`GifEngine`] 把每一帧绘制为 SVG，经 resvg 栅格化后编码为 GIF。
//! 引擎不持有跨实例的可变状态；“当前时间”由 [`Clock`] 在实例化时注入，
//! 因此相同参数 + 相同时钟一定得到逐字节相同的输出。

mod banner;
mod canvas;
mod color_varying;
mod countdown;
mod flashing;
mod typing;

use std::path::Path;
use std::sync::Arc;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use chrono::{DateTime, Utc};
use resvg::usvg::fontdb;
use serde::de::DeserializeOwned;
use thiserror::Error;

pub use canvas::{FontBook, Rgb, parse_hex_color};
pub use countdown::parse_target as parse_timestamp;

/// 倒计时入口
pub const ENTRY_COUNTDOWN: &str = "build";
/// LED 滚动横幅入口
pub const ENTRY_LED_BANNER: &str = "buildLedBanner";
/// 闪烁文字入口
pub const ENTRY_FLASHING_TEXT: &str = "buildFlashingText";
/// 打字机效果入口
pub const ENTRY_TYPING_TEXT: &str = "buildTypingText";
/// 逐字母闪烁入口
pub const ENTRY_FLASHING_LETTERS: &str = "buildFlashingLetters";
/// 变色文字入口
pub const ENTRY_COLOR_VARYING_TEXT: &str = "buildColorVaryingText";

/// 引擎导出的全部入口
pub const EXPORTED_ENTRIES: [&str; 6] = [
    ENTRY_COUNTDOWN,
    ENTRY_LED_BANNER,
    ENTRY_FLASHING_TEXT,
    ENTRY_TYPING_TEXT,
    ENTRY_FLASHING_LETTERS,
    ENTRY_COLOR_VARYING_TEXT,
];

/// 引擎错误类型
#[derive(Error, Debug)]
pub enum EngineError {
    /// 引擎实例化失败（资源缺失/损坏）
    #[error("引擎实例化失败: {0}")]
    Instantiate(String),

    /// 调用了引擎未导出的入口
    #[error("引擎未导出入口: {0}")]
    MissingEntry(String),

    /// 入口参数对象无法解析
    #[error("入口参数无效: {0}")]
    InvalidArguments(String),

    /// 引擎内部渲染失败
    #[error("渲染失败: {0}")]
    Render(String),

    /// 超过平台给定的渲染时限
    #[error("渲染超时（{0}ms）")]
    Timeout(u64),

    /// 引擎任务异常终止（panic / 被取消）
    #[error("引擎任务异常终止: {0}")]
    Aborted(String),
}

/// 时钟：倒计时等依赖“当前时间”的模式从这里取时间。
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// 系统时钟
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// 固定时钟（测试与离线渲染使用）
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// 单个引擎实例：只暴露一个同步调用。
pub trait RenderEngine: Send {
    /// 调用导出入口，返回 base64 编码的图像。
    fn call(&mut self, entry: &str, args: &serde_json::Value) -> Result<String, EngineError>;
}

/// 引擎工厂：每次调用都返回一个全新的实例，实例用完即丢弃。
pub trait EngineFactory: Send + Sync {
    fn instantiate(&self) -> Result<Box<dyn RenderEngine>, EngineError>;
}

/// 内置 GIF 引擎的工厂
#[derive(Clone)]
pub struct BuiltinEngineFactory {
    fonts: Arc<fontdb::Database>,
    clock: Arc<dyn Clock>,
}

impl BuiltinEngineFactory {
    pub fn new(fonts: Arc<fontdb::Database>, clock: Arc<dyn Clock>) -> Self {
        Self { fonts, clock }
    }

    /// 使用系统字体 + 自定义字体目录，以及系统时钟。
    pub fn from_fonts_dir(fonts_dir: &Path) -> Self {
        Self::new(canvas::global_font_db(fonts_dir), Arc::new(SystemClock))
    }

    /// 替换时钟（离线渲染需要可复现的“当前时间”）
    pub fn with_clock(self, clock: Arc<dyn Clock>) -> Self {
        Self { clock, ..self }
    }
}

impl EngineFactory for BuiltinEngineFactory {
    fn instantiate(&self) -> Result<Box<dyn RenderEngine>, EngineError> {
        Ok(Box::new(GifEngine::new(
            FontBook::new(self.fonts.clone()),
            self.clock.now(),
        )))
    }
}

/// 内置 GIF 引擎实例
pub struct GifEngine {
    fonts: FontBook,
    now: DateTime<Utc>,
}

impl GifEngine {
    pub fn new(fonts: FontBook, now: DateTime<Utc>) -> Self {
        Self { fonts, now }
    }

    fn dispatch(&self, entry: &str, args: &serde_json::Value) -> Result<Vec<u8>, EngineError> {
        match entry {
            ENTRY_COUNTDOWN => countdown::render(&self.fonts, self.now, parse_args(args)?),
            ENTRY_LED_BANNER => banner::render(&self.fonts, parse_args(args)?),
            ENTRY_FLASHING_TEXT => flashing::render_text(&self.fonts, parse_args(args)?),
            ENTRY_TYPING_TEXT => typing::render(&self.fonts, parse_args(args)?),
            ENTRY_FLASHING_LETTERS => flashing::render_letters(&self.fonts, parse_args(args)?),
            ENTRY_COLOR_VARYING_TEXT => color_varying::render(&self.fonts, parse_args(args)?),
            other => Err(EngineError::MissingEntry(other.to_string())),
        }
    }
}

impl RenderEngine for GifEngine {
    fn call(&mut self, entry: &str, args: &serde_json::Value) -> Result<String, EngineError> {
        let t0 = std::time::Instant::now();
        let gif = self.dispatch(entry, args)?;
        tracing::debug!(
            target: "render_performance",
            entry,
            bytes = gif.len(),
            "引擎渲染完成，耗时: {}ms",
            t0.elapsed().as_millis()
        );
        Ok(STANDARD.encode(gif))
    }
}

/// 入口参数对象 → 各模式的选项结构（缺失字段取引擎侧默认值）
fn parse_args<T: DeserializeOwned>(args: &serde_json::Value) -> Result<T, EngineError> {
    if !args.is_object() {
        return Err(EngineError::InvalidArguments(
            "入口参数必须是对象".to_string(),
        ));
    }
    serde_json::from_value(args.clone()).map_err(|e| EngineError::InvalidArguments(e.to_string()))
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// 空字体库：测试不依赖宿主机字体，文字测量退化为估算。
    pub fn empty_fonts() -> FontBook {
        FontBook::new(Arc::new(fontdb::Database::new()))
    }

    pub fn fixed_now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-06-01T12:00:00Z")
            .map(|d| d.with_timezone(&Utc))
            .expect("valid timestamp")
    }

    pub fn engine() -> GifEngine {
        GifEngine::new(empty_fonts(), fixed_now())
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::engine;
    use super::*;
    use serde_json::json;

    fn decode(b64: &str) -> Vec<u8> {
        STANDARD.decode(b64).expect("engine output is base64")
    }

    #[test]
    fn every_exported_entry_renders_a_gif_with_defaults() {
        for entry in EXPORTED_ENTRIES {
            let out = engine().call(entry, &json!({})).expect(entry);
            let bytes = decode(&out);
            assert!(bytes.starts_with(b"GIF89a"), "{entry} did not produce a GIF");
        }
    }

    #[test]
    fn unknown_entry_is_reported() {
        let err = engine().call("buildNothing", &json!({})).unwrap_err();
        assert!(matches!(err, EngineError::MissingEntry(ref e) if e == "buildNothing"));
    }

    #[test]
    fn non_object_arguments_are_rejected() {
        let err = engine().call(ENTRY_COUNTDOWN, &json!("x")).unwrap_err();
        assert!(matches!(err, EngineError::InvalidArguments(_)));
    }

    #[test]
    fn same_arguments_and_clock_give_identical_output() {
        let args = json!({
            "background": "123",
            "color": "fed",
            "date": "2025-12-25T00:00:00.000Z",
            "frames": 3,
            "gmt": 2,
            "kind": "rounded-dots",
            "lang": "de"
        });
        let a = engine().call(ENTRY_COUNTDOWN, &args).expect("first");
        let b = engine().call(ENTRY_COUNTDOWN, &args).expect("second");
        assert_eq!(a, b);
    }

    #[test]
    fn flashing_text_ignores_banner_only_fields() {
        let base = json!({ "text": "GO", "width": 60, "height": 40, "frames": 2, "words": 1 });
        let mut with_extras = base.clone();
        with_extras["forward"] = json!(true);
        with_extras["spaceSize"] = json!(9);
        with_extras["speed"] = json!(3);
        assert_eq!(
            engine().call(ENTRY_FLASHING_TEXT, &base).expect("plain"),
            engine().call(ENTRY_FLASHING_TEXT, &with_extras).expect("extras")
        );
    }

    #[test]
    fn factory_hands_out_fresh_instances() {
        let factory = BuiltinEngineFactory::new(
            Arc::new(fontdb::Database::new()),
            Arc::new(FixedClock(test_support::fixed_now())),
        );
        let mut first = factory.instantiate().expect("instantiate");
        let mut second = factory.instantiate().expect("instantiate");
        let args = json!({ "text": "HI", "frames": 2 });
        assert_eq!(
            first.call(ENTRY_LED_BANNER, &args).expect("render"),
            second.call(ENTRY_LED_BANNER, &args).expect("render")
        );
    }
}
