//! 本地渲染工具：不启动 HTTP 服务，按“模式 + 查询串”渲染一张 GIF 写到文件。
//!
//! 与服务端走同一条链路（参数规范化 → 引擎适配器 → 解码），便于排查某个 URL 的输出。

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use gif_backend::AppConfig;
use gif_backend::features::engine::{BuiltinEngineFactory, FixedClock, parse_timestamp};
use gif_backend::features::render::{QueryParams, RenderEngineAdapter, RenderMode, decoder, normalize};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    let args = Args::parse(std::env::args().skip(1).collect());
    if args.help {
        print_help();
        return Ok(());
    }

    let config = AppConfig::load()?;
    let mode = match args.mode.as_deref() {
        Some(m) => m.parse::<RenderMode>()?,
        None => config.render.default_mode,
    };
    let fonts_dir = args.fonts_dir.unwrap_or_else(|| config.render.fonts_path());

    let factory = match args.now.as_deref() {
        Some(raw) => {
            let now = parse_timestamp(raw).ok_or_else(|| format!("无法解析 --now: {raw}"))?;
            let base = BuiltinEngineFactory::from_fonts_dir(&fonts_dir);
            base.with_clock(Arc::new(FixedClock(now)))
        }
        None => BuiltinEngineFactory::from_fonts_dir(&fonts_dir),
    };

    let timeout = args
        .timeout_ms
        .map(Duration::from_millis)
        .unwrap_or_else(|| config.render.timeout());
    let adapter = RenderEngineAdapter::new(Arc::new(factory), timeout, 1);

    let params = QueryParams::from_query_str(&args.query);
    let render_config = normalize(mode, &params)?;
    let output = adapter.render(&render_config).await?;
    let bytes = decoder::decode(&output)?;

    fs::write(&args.out_path, &bytes)?;
    println!(
        "已写入: {}（{} 模式，{} 字节）",
        args.out_path.display(),
        mode,
        bytes.len()
    );
    Ok(())
}

#[derive(Debug, Clone)]
struct Args {
    help: bool,
    mode: Option<String>,
    query: String,
    out_path: PathBuf,
    fonts_dir: Option<PathBuf>,
    now: Option<String>,
    timeout_ms: Option<u64>,
}

impl Args {
    fn parse(argv: Vec<String>) -> Self {
        let mut args = Self {
            help: false,
            mode: None,
            query: String::new(),
            out_path: PathBuf::from("out.gif"),
            fonts_dir: None,
            now: None,
            timeout_ms: None,
        };

        let mut it = argv.into_iter();
        while let Some(a) = it.next() {
            match a.as_str() {
                "-h" | "--help" => args.help = true,
                "--mode" => args.mode = it.next(),
                "--query" => {
                    if let Some(v) = it.next() {
                        args.query = v.trim_start_matches('?').to_string();
                    }
                }
                "--out" => {
                    if let Some(v) = it.next() {
                        args.out_path = PathBuf::from(v);
                    }
                }
                "--fonts-dir" => args.fonts_dir = it.next().map(PathBuf::from),
                "--now" => args.now = it.next(),
                "--timeout-ms" => args.timeout_ms = it.next().and_then(|v| v.parse().ok()),
                _ => {}
            }
        }
        args
    }
}

fn print_help() {
    println!(
        r#"render_gif（本地渲染工具）

用法：
  cargo run --bin render_gif -- --mode countdown --query "date=2025-12-25&lang=de" --out countdown.gif

参数：
  --mode MODE          countdown | led-banner | flashing-text | typing-text |
                       flashing-letters | color-varying-text（默认取配置 render.default_mode）
  --query QS           查询串，与 HTTP 请求中的 ?后部分相同
  --out PATH           输出文件（默认 out.gif）
  --fonts-dir DIR      额外字体目录（默认取配置 render.fonts_dir）
  --now TIMESTAMP      固定“当前时间”（倒计时模式可复现输出）
  --timeout-ms N       引擎时限（默认取配置 render.timeout_ms）
"#
    );
}
