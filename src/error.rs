//! 错误类型 (Error types)

/// 库内统一的 Result 别名
pub type Result<T> = std::result::Result<T, Error>;

/// 数据集构建错误
///
/// - `Config` / `Source`: 启动阶段的致命错误
/// - `Decode` / `Detection` / `Io` / `Json`: 单个视频内的错误, 在视频边界被捕获
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("配置错误: {0}")]
    Config(String),

    #[error("数据源错误: {0}")]
    Source(String),

    #[error("视频解码失败: {0}")]
    Decode(String),

    #[error("关键点检测失败: {0}")]
    Detection(String),

    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON错误: {0}")]
    Json(#[from] serde_json::Error),
}
