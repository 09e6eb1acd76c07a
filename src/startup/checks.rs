use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::error::AppError;
use crate::features::engine::{BuiltinEngineFactory, EngineFactory};

/// 执行启动检查（只告警，不阻断启动）
pub async fn run_startup_checks(config: &AppConfig) -> Result<(), AppError> {
    tracing::info!("🔍 开始执行启动检查...");
    ensure_fonts_dir(&config.render.fonts_path());
    tracing::info!("✅ 启动检查完成");
    Ok(())
}

/// 在阻塞线程池上加载字体库并构造内置引擎工厂，避免首个请求承担字体扫描的延迟。
pub async fn prepare_engine(config: &AppConfig) -> Result<Arc<dyn EngineFactory>, AppError> {
    let fonts_dir = config.render.fonts_path();
    let t_prewarm = std::time::Instant::now();
    let factory = tokio::task::spawn_blocking(move || BuiltinEngineFactory::from_fonts_dir(&fonts_dir))
        .await
        .map_err(|e| AppError::Internal(format!("字体预热任务失败: {e}")))?;
    tracing::info!("字体预热完成: {}ms", t_prewarm.elapsed().as_millis());
    Ok(Arc::new(factory))
}

/// 字体目录不存在时只告警：系统字体仍可用。
fn ensure_fonts_dir(dir: &Path) -> bool {
    if !dir.is_dir() {
        tracing::warn!("📁 未找到字体目录 {:?}，仅使用系统字体", dir);
        return false;
    }
    let count = fs::read_dir(dir)
        .map(|entries| {
            entries
                .flatten()
                .filter(|e| {
                    matches!(
                        e.path().extension().and_then(|x| x.to_str()),
                        Some("ttf" | "otf" | "ttc")
                    )
                })
                .count()
        })
        .unwrap_or(0);
    if count == 0 {
        tracing::warn!("字体目录 {:?} 中没有 .ttf/.otf/.ttc 文件", dir);
    } else {
        tracing::info!("✅ 字体目录 {:?}：{} 个字体文件", dir, count);
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fonts_dir_is_not_fatal() {
        assert!(!ensure_fonts_dir(Path::new("no/such/fonts/dir")));
    }

    #[test]
    fn existing_dir_is_accepted_even_if_empty() {
        let dir = std::env::temp_dir().join(format!("gif-backend-fonts-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).expect("mkdir");
        assert!(ensure_fonts_dir(&dir));
        let _ = fs::remove_dir_all(&dir);
    }
}
