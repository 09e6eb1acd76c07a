use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppError;
use crate::features::engine;

/// 渲染模式：由路径第一段选择（`/countdown`、`/led-banner` ...）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum RenderMode {
    Countdown,
    LedBanner,
    FlashingText,
    TypingText,
    FlashingLetters,
    ColorVaryingText,
}

impl RenderMode {
    pub const ALL: [RenderMode; 6] = [
        RenderMode::Countdown,
        RenderMode::LedBanner,
        RenderMode::FlashingText,
        RenderMode::TypingText,
        RenderMode::FlashingLetters,
        RenderMode::ColorVaryingText,
    ];

    /// 路径段
    pub fn slug(self) -> &'static str {
        match self {
            RenderMode::Countdown => "countdown",
            RenderMode::LedBanner => "led-banner",
            RenderMode::FlashingText => "flashing-text",
            RenderMode::TypingText => "typing-text",
            RenderMode::FlashingLetters => "flashing-letters",
            RenderMode::ColorVaryingText => "color-varying-text",
        }
    }

    /// 对应的引擎入口名
    pub fn entry_point(self) -> &'static str {
        match self {
            RenderMode::Countdown => engine::ENTRY_COUNTDOWN,
            RenderMode::LedBanner => engine::ENTRY_LED_BANNER,
            RenderMode::FlashingText => engine::ENTRY_FLASHING_TEXT,
            RenderMode::TypingText => engine::ENTRY_TYPING_TEXT,
            RenderMode::FlashingLetters => engine::ENTRY_FLASHING_LETTERS,
            RenderMode::ColorVaryingText => engine::ENTRY_COLOR_VARYING_TEXT,
        }
    }

    /// 按请求路径选择模式；第一段不是已知模式时回落到 `default`。
    pub fn from_path(path: &str, default: RenderMode) -> RenderMode {
        path.trim_start_matches('/')
            .split('/')
            .next()
            .and_then(|seg| seg.parse().ok())
            .unwrap_or(default)
    }
}

impl fmt::Display for RenderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for RenderMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RenderMode::ALL
            .into_iter()
            .find(|m| m.slug() == s)
            .ok_or_else(|| format!("未知的渲染模式: {s}"))
    }
}

/// 倒计时
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CountdownConfig {
    pub background: String,
    pub color: String,
    /// ISO-8601（UTC，毫秒精度）
    pub date: String,
    pub gmt: i64,
    pub frames: i64,
    pub lang: String,
    pub kind: String,
}

/// LED 滚动横幅
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LedBannerConfig {
    pub forward: bool,
    pub height: i64,
    pub delay: f64,
    pub space_size: i64,
    pub speed: i64,
    pub text: String,
    pub width: i64,
    pub background: String,
    pub color: String,
    pub frames: i64,
}

/// 闪烁文字
///
/// `forward` / `spaceSize` / `speed` 与横幅共用同一组查询参数，会原样传给引擎，但引擎不使用。
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FlashingTextConfig {
    pub forward: bool,
    pub height: i64,
    pub delay: f64,
    pub space_size: i64,
    pub speed: i64,
    pub text: String,
    pub width: i64,
    pub background: String,
    pub color: String,
    pub frames: i64,
    pub words: i64,
}

/// 打字机
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TypingTextConfig {
    pub background: String,
    pub color: String,
    pub delay: f64,
    pub height: i64,
    pub text: String,
    pub width: i64,
    pub padding: i64,
}

/// 逐字母闪烁
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FlashingLettersConfig {
    pub background: String,
    pub color: String,
    pub delay: f64,
    pub frames: i64,
    pub height: i64,
    pub text: String,
    pub width: i64,
    pub flash_probability: f64,
}

/// 变色文字
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ColorVaryingTextConfig {
    pub delay: f64,
    pub frames: i64,
    pub height: i64,
    pub text: String,
    pub width: i64,
    pub color_scheme: String,
    pub padding: i64,
}

/// 规范化后的渲染配置：字段齐全、类型确定、创建后不再修改。
#[derive(Debug, Clone, PartialEq)]
pub enum RenderConfig {
    Countdown(CountdownConfig),
    LedBanner(LedBannerConfig),
    FlashingText(FlashingTextConfig),
    TypingText(TypingTextConfig),
    FlashingLetters(FlashingLettersConfig),
    ColorVaryingText(ColorVaryingTextConfig),
}

impl RenderConfig {
    pub fn mode(&self) -> RenderMode {
        match self {
            RenderConfig::Countdown(_) => RenderMode::Countdown,
            RenderConfig::LedBanner(_) => RenderMode::LedBanner,
            RenderConfig::FlashingText(_) => RenderMode::FlashingText,
            RenderConfig::TypingText(_) => RenderMode::TypingText,
            RenderConfig::FlashingLetters(_) => RenderMode::FlashingLetters,
            RenderConfig::ColorVaryingText(_) => RenderMode::ColorVaryingText,
        }
    }

    /// 映射为引擎入口的参数对象（字段名即引擎侧字段名）
    pub fn to_engine_args(&self) -> Result<serde_json::Value, AppError> {
        let value = match self {
            RenderConfig::Countdown(c) => serde_json::to_value(c),
            RenderConfig::LedBanner(c) => serde_json::to_value(c),
            RenderConfig::FlashingText(c) => serde_json::to_value(c),
            RenderConfig::TypingText(c) => serde_json::to_value(c),
            RenderConfig::FlashingLetters(c) => serde_json::to_value(c),
            RenderConfig::ColorVaryingText(c) => serde_json::to_value(c),
        };
        value.map_err(|e| AppError::Internal(format!("渲染参数序列化失败: {e}")))
    }
}
