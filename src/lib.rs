// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
pub mod config; // 构建参数 (命令行 + 特征配置)
pub mod dataset; // 数据集构建: 记录/输出/断点/会话/校验
pub mod detection; // 关键点检测
pub mod error; // 错误类型
pub mod features; // 关键点特征: 原始特征/窗口统计/分段
pub mod input; // 视频输入与抽帧
pub mod source; // 视频/标签数据源

pub use crate::config::{Args, FeatureConfig};
pub use crate::dataset::{DatasetSession, OutputConfig, OutputFormat, Record, SessionConfig, SessionStats};
pub use crate::detection::Landmarker;
pub use crate::error::{Error, Result};
pub use crate::features::{Detections, Segmentation, WindowAggregator};
pub use crate::input::{FrameStream, VideoDecoder};
pub use crate::source::{SourceMode, VideoEntry};
