/// 启动检查工具模块
pub mod checks;

pub use checks::{prepare_engine, run_startup_checks};
