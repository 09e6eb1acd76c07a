/// 内置 GIF 渲染引擎
pub mod engine;
/// 健康检查
pub mod health;
/// HTTP 渲染链路（参数、引擎适配、解码、缓存）
pub mod render;
