//! 倒计时模式：四个圆环（天/时/分/秒），或一行纯文本。

use std::f64::consts::{FRAC_PI_2, TAU};

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;

use super::EngineError;
use super::canvas::{self, Anchor, FontBook, Rgb, SvgFrame};

const WIDTH: u32 = 700;
const HEIGHT: u32 = 200;
const MAX_FRAMES: i64 = 60;
const FRAME_DELAY_MS: u32 = 1000;

const CIRCLE_RADIUS: f64 = 65.0;
const CIRCLE_SPACING: f64 = 160.0;
/// 圆环底色的不透明度
const TRACK_ALPHA: u8 = 50;

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CountdownOptions {
    pub background: String,
    pub color: String,
    /// 目标时间；缺省为“现在 + 10 天”
    pub date: Option<String>,
    pub frames: i64,
    pub gmt: i64,
    pub kind: String,
    pub lang: String,
}

impl Default for CountdownOptions {
    fn default() -> Self {
        Self {
            background: "#000000".to_string(),
            color: "#ffffff".to_string(),
            date: None,
            frames: 10,
            gmt: 0,
            kind: "rounded".to_string(),
            lang: "en".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Style {
    Basic,
    Rounded,
    Ticks,
    Dots,
}

impl Style {
    fn from_kind(kind: &str) -> Self {
        match kind {
            "rounded" => Style::Rounded,
            "rounded-ticks" => Style::Ticks,
            "rounded-dots" => Style::Dots,
            _ => Style::Basic,
        }
    }
}

/// 剩余时间拆分
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Remaining {
    days: i64,
    hours: i64,
    minutes: i64,
    seconds: i64,
}

impl Remaining {
    fn from_seconds(total: i64) -> Self {
        let total = total.max(0);
        Self {
            days: total / 86_400,
            hours: (total / 3_600) % 24,
            minutes: (total / 60) % 60,
            seconds: total % 60,
        }
    }
}

/// 解析目标时间（均按 UTC 解释）
///
/// 只接受四位年份（0000-9999），保证结果能以 RFC 3339 形式原样回读。
pub fn parse_target(raw: &str) -> Option<DateTime<Utc>> {
    parse_any(raw.trim()).filter(|dt| (0..=9999).contains(&dt.year()))
}

fn parse_any(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn translate(lang: &str, key: &'static str) -> &'static str {
    let labels: [&'static str; 4] = match lang {
        "ar" => ["أيام", "ساعات", "دقائق", "ثواني"],
        "bg" => ["дни", "часа", "минути", "секунди"],
        "cs" => ["dny", "hodiny", "minuty", "sekundy"],
        "da" => ["dage", "timer", "minutter", "sekunder"],
        "de" => ["Tage", "Stunden", "Minuten", "Sekunden"],
        "el" => ["ημέρες", "ώρες", "λεπτά", "δευτερόλεπτα"],
        "en" => ["days", "hours", "minutes", "seconds"],
        "es" => ["días", "horas", "minutos", "segundos"],
        "fa" => ["روز", "ساعت", "دقیقه", "ثانیه"],
        "fi" => ["päivää", "tuntia", "minuuttia", "sekuntia"],
        "fr" => ["jours", "heures", "minutes", "secondes"],
        "he" => ["ימים", "שעות", "דקות", "שניות"],
        "hi" => ["दिन", "घंटे", "मिनट", "सेकंड"],
        "hu" => ["nap", "óra", "perc", "másodperc"],
        "it" => ["giorni", "ore", "minuti", "secondi"],
        "ja" => ["日", "時間", "分", "秒"],
        "ko" => ["일", "시간", "분", "초"],
        "lt" => ["dienos", "valandos", "minutės", "sekundės"],
        "nl" => ["dagen", "uren", "minuten", "seconden"],
        "no" => ["dager", "timer", "minutter", "sekunder"],
        "pl" => ["dni", "godziny", "minuty", "sekundy"],
        "pt" => ["dias", "horas", "minutos", "segundos"],
        "ro" => ["zile", "ore", "minute", "secunde"],
        "ru" => ["дни", "часы", "минуты", "секунды"],
        "sk" => ["dni", "hodiny", "minúty", "sekundy"],
        "sv" => ["dagar", "timmar", "minuter", "sekunder"],
        "th" => ["วัน", "ชั่วโมง", "นาที", "วินาที"],
        "tr" => ["gün", "saat", "dakika", "saniye"],
        "uk" => ["дні", "години", "хвилини", "секунди"],
        "vi" => ["ngày", "giờ", "phút", "giây"],
        "zh" => ["天", "小时", "分钟", "秒"],
        _ => return key,
    };
    match key {
        "days" => labels[0],
        "hours" => labels[1],
        "minutes" => labels[2],
        "seconds" => labels[3],
        _ => key,
    }
}

struct Countdown {
    bg: Rgb,
    fg: Rgb,
    style: Style,
    lang: String,
}

impl Countdown {
    fn frame(&self, left: Remaining) -> SvgFrame {
        let mut frame = SvgFrame::new(WIDTH, HEIGHT, self.bg);
        let cy = f64::from(HEIGHT) / 2.0;

        if self.style == Style::Basic {
            let text = format!(
                "{}d {}h {}m {}s",
                left.days, left.hours, left.minutes, left.seconds
            );
            frame.text(
                &text,
                f64::from(WIDTH) / 2.0,
                cy,
                60.0,
                self.fg,
                Anchor::Middle,
                true,
            );
            return frame;
        }

        let start_x = f64::from(WIDTH) / 2.0 - 1.5 * CIRCLE_SPACING;
        let units = [
            (left.days, 31, "days"),
            (left.hours, 24, "hours"),
            (left.minutes, 60, "minutes"),
            (left.seconds, 60, "seconds"),
        ];
        for (i, (value, max, key)) in units.into_iter().enumerate() {
            let cx = start_x + i as f64 * CIRCLE_SPACING;
            self.unit(&mut frame, cx, cy, value, max, translate(&self.lang, key));
        }
        frame
    }

    fn unit(&self, frame: &mut SvgFrame, cx: f64, cy: f64, value: i64, max: i64, label: &str) {
        let track = self.fg.over(self.bg, TRACK_ALPHA);
        let start = -FRAC_PI_2;

        match self.style {
            Style::Rounded => {
                frame.ring(cx, cy, CIRCLE_RADIUS, track, 10.0);
                let end = (start + value as f64 / max as f64 * TAU).min(TAU);
                frame.arc(cx, cy, CIRCLE_RADIUS, start, end, self.fg, 10.0);
            }
            Style::Ticks | Style::Dots => {
                for i in 0..max {
                    let angle = start + i as f64 * TAU / max as f64;
                    let color = if i <= value { self.fg } else { track };
                    let (cos, sin) = (angle.cos(), angle.sin());
                    if self.style == Style::Dots {
                        let r = CIRCLE_RADIUS + 5.0;
                        frame.circle(cx + r * cos, cy + r * sin, 3.0, color);
                    } else {
                        let (r0, r1) = (CIRCLE_RADIUS - 5.0, CIRCLE_RADIUS + 5.0);
                        frame.line(
                            cx + r0 * cos,
                            cy + r0 * sin,
                            cx + r1 * cos,
                            cy + r1 * sin,
                            color,
                            3.0,
                        );
                    }
                }
            }
            Style::Basic => {}
        }

        frame.text(
            &value.to_string(),
            cx,
            cy - 10.0,
            40.0,
            self.fg,
            Anchor::Middle,
            true,
        );
        frame.text(
            &label.to_uppercase(),
            cx,
            cy + 25.0,
            16.0,
            self.fg,
            Anchor::Middle,
            true,
        );
    }
}

/// 起始剩余秒数与帧数
fn plan(now: DateTime<Utc>, target: DateTime<Utc>, opts: &CountdownOptions) -> (i64, i64) {
    let frames = opts.frames.clamp(1, MAX_FRAMES);

    // gmt 同时平移“现在”与目标时间
    let shift = Duration::hours(opts.gmt.clamp(-48, 48));
    let (shifted_now, shifted_target) = (now + shift, target + shift);
    if shifted_target <= shifted_now {
        return (0, 1);
    }
    ((shifted_target - shifted_now).num_seconds(), frames)
}

pub fn render(
    fonts: &FontBook,
    now: DateTime<Utc>,
    opts: CountdownOptions,
) -> Result<Vec<u8>, EngineError> {
    let target = match opts.date.as_deref() {
        Some(raw) => parse_target(raw).ok_or_else(|| {
            EngineError::InvalidArguments(format!("无法解析的目标时间: {raw}"))
        })?,
        None => now + Duration::days(10),
    };
    let (remaining_at_start, frames) = plan(now, target, &opts);

    let countdown = Countdown {
        bg: canvas::parse_hex_color(&opts.background),
        fg: canvas::parse_hex_color(&opts.color),
        style: Style::from_kind(&opts.kind),
        lang: opts.lang,
    };

    let mut out = Vec::with_capacity(frames as usize);
    for i in 0..frames {
        let left = Remaining::from_seconds(remaining_at_start - i);
        let image = fonts.rasterize(countdown.frame(left))?;
        out.push((image, FRAME_DELAY_MS));
    }
    canvas::encode_gif(out)
}
