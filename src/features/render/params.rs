//! 查询参数规范化：不可信的原始查询串 → 字段齐全、类型确定的 [`RenderConfig`]。
//!
//! 规则：
//! - 字符串：按别名顺序取第一个非空值，否则取默认值；
//! - 数值：缺失、空、非有限数字一律取默认值，永不产生 NaN；整数字段截断小数；
//! - 布尔：仅当原值严格等于 `"true"` 时为真；
//! - 时间：缺失或空取默认日期，无法解析时直接失败（校验错误）。

use axum::extract::Query;
use axum::http::Uri;
use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::AppError;
use crate::features::engine;

use super::types::{
    ColorVaryingTextConfig, CountdownConfig, FlashingLettersConfig, FlashingTextConfig,
    LedBannerConfig, RenderConfig, RenderMode, TypingTextConfig,
};

/// 倒计时缺省目标日期
pub const DEFAULT_DATE: &str = "2025-01-01";

/// 原始查询参数（保留顺序，同名参数以第一次出现为准）
#[derive(Debug, Clone, Default)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            pairs: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// 解析请求 URI 的查询串；解析失败视为没有参数。
    pub fn from_uri(uri: &Uri) -> Self {
        let pairs = Query::<Vec<(String, String)>>::try_from_uri(uri)
            .map(|Query(pairs)| pairs)
            .unwrap_or_default();
        Self { pairs }
    }

    /// 解析裸查询串（不含 `?`），命令行里的字面空格按 `%20` 处理
    pub fn from_query_str(query: &str) -> Self {
        match format!("/?{}", query.replace(' ', "%20")).parse::<Uri>() {
            Ok(uri) => Self::from_uri(&uri),
            Err(_) => Self::default(),
        }
    }

    fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// 按别名优先级取第一个非空值
    pub fn string(&self, aliases: &[&str], default: &str) -> String {
        aliases
            .iter()
            .filter_map(|name| self.get(name))
            .find(|v| !v.is_empty())
            .unwrap_or(default)
            .to_string()
    }

    pub fn number(&self, name: &str, default: f64) -> f64 {
        self.get(name)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .and_then(|v| v.parse::<f64>().ok())
            .filter(|n| n.is_finite())
            .unwrap_or(default)
    }

    pub fn integer(&self, name: &str, default: i64) -> i64 {
        self.number(name, default as f64).trunc() as i64
    }

    pub fn boolean(&self, name: &str) -> bool {
        self.get(name) == Some("true")
    }

    pub fn timestamp(&self, name: &str, default: &str) -> Result<DateTime<Utc>, AppError> {
        let raw = match self.get(name) {
            Some(v) if !v.is_empty() => v,
            _ => default,
        };
        engine::parse_timestamp(raw)
            .ok_or_else(|| AppError::Validation(format!("无法解析的日期参数 {name}={raw}")))
    }
}

/// 按模式规范化查询参数
pub fn normalize(mode: RenderMode, q: &QueryParams) -> Result<RenderConfig, AppError> {
    let config = match mode {
        RenderMode::Countdown => RenderConfig::Countdown(CountdownConfig {
            background: q.string(&["background", "bg"], "000"),
            color: q.string(&["color"], "fff"),
            date: q
                .timestamp("date", DEFAULT_DATE)?
                .to_rfc3339_opts(SecondsFormat::Millis, true),
            gmt: q.integer("gmt", 0),
            frames: q.integer("frames", 10),
            lang: q.string(&["lang"], "en"),
            kind: q.string(&["kind"], "rounded"),
        }),
        RenderMode::LedBanner => RenderConfig::LedBanner(LedBannerConfig {
            forward: q.boolean("forward"),
            height: q.integer("height", 200),
            delay: q.number("delay", 100.0),
            space_size: q.integer("spaceSize", 5),
            speed: q.integer("speed", 5),
            text: q.string(&["text"], "BLACK FRIDAY"),
            width: q.integer("width", 800),
            background: q.string(&["background", "bg"], "fff"),
            color: q.string(&["color"], "000"),
            frames: q.integer("frames", 15),
        }),
        RenderMode::FlashingText => RenderConfig::FlashingText(FlashingTextConfig {
            forward: q.boolean("forward"),
            height: q.integer("height", 200),
            delay: q.number("delay", 200.0),
            space_size: q.integer("spaceSize", 5),
            speed: q.integer("speed", 5),
            text: q.string(&["text"], "BLACK FRIDAY"),
            width: q.integer("width", 800),
            background: q.string(&["background", "bg"], "fff"),
            color: q.string(&["color"], "000"),
            frames: q.integer("frames", 15),
            words: q.integer("words", 10),
        }),
        RenderMode::TypingText => RenderConfig::TypingText(TypingTextConfig {
            background: q.string(&["background", "bg"], "000"),
            color: q.string(&["color"], "fff"),
            delay: q.number("delay", 100.0),
            height: q.integer("height", 200),
            text: q.string(&["text"], "BLACK FRIDAY"),
            width: q.integer("width", 800),
            padding: q.integer("padding", 40),
        }),
        RenderMode::FlashingLetters => RenderConfig::FlashingLetters(FlashingLettersConfig {
            background: q.string(&["background", "bg"], "000"),
            color: q.string(&["color"], "fff"),
            delay: q.number("delay", 100.0),
            frames: q.integer("frames", 20),
            height: q.integer("height", 200),
            text: q.string(&["text"], "SALE"),
            width: q.integer("width", 400),
            flash_probability: q.number("flashProbability", 0.3),
        }),
        RenderMode::ColorVaryingText => RenderConfig::ColorVaryingText(ColorVaryingTextConfig {
            delay: q.number("delay", 100.0),
            frames: q.integer("frames", 30),
            height: q.integer("height", 400),
            text: q.string(&["text"], "SALE"),
            width: q.integer("width", 600),
            color_scheme: q.string(&["colorScheme"], "complementary"),
            padding: q.integer("padding", 40),
        }),
    };
    Ok(config)
}
