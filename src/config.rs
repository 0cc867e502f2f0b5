//! 构建参数 - 命令行 + JSON 特征配置

use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;
use log::info;
use serde::{Deserialize, Serialize};

use crate::dataset::{OutputConfig, OutputFormat, SessionConfig, DEFAULT_SAMPLE_TYPE};
use crate::error::{Error, Result};
use crate::features::Segmentation;
use crate::input::SamplingConfig;
use crate::source::SourceMode;

/// 默认姿态关键点模型
pub const DEFAULT_POSE_MODEL: &str = "models/pose_landmark_full.onnx";
/// 默认手部关键点模型
pub const DEFAULT_HAND_MODEL: &str = "models/hand_landmark_full.onnx";

/// 特征参数 (可从 JSON 文件加载, 缺省字段取默认值)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    // === 窗口统计 ===
    pub window_size: usize,   // 每个窗口的帧数
    pub window_stride: usize, // 窗口步长

    // === 分段 ===
    pub segment_windows: usize, // 每段窗口数, 0 = 整个视频一段
    pub segment_stride: usize,  // 分段步长

    // === 采样 ===
    pub fps: u32,         // 目标帧率
    pub max_seconds: f64, // 每个视频最长处理时长
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            window_size: 8,
            window_stride: 4,
            segment_windows: 0,
            segment_stride: 1,
            fps: 15,
            max_seconds: 6.0,
        }
    }
}

impl FeatureConfig {
    /// 从JSON文件加载配置
    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("特征配置不可读 {}: {}", path.display(), e)))?;
        let config: Self = serde_json::from_str(&json)
            .map_err(|e| Error::Config(format!("特征配置解析失败 {}: {}", path.display(), e)))?;
        info!("✅ 特征配置已从 {} 加载", path.display());
        Ok(config)
    }

    pub fn segmentation(&self) -> Result<Segmentation> {
        Segmentation::from_params(self.segment_windows, self.segment_stride)
    }

    pub fn sampling(&self) -> SamplingConfig {
        SamplingConfig {
            target_fps: self.fps,
            max_seconds: self.max_seconds,
        }
    }

    pub fn to_session_config(&self, sample_type: &str, start_id: u64) -> Result<SessionConfig> {
        if self.window_size == 0 || self.window_stride == 0 {
            return Err(Error::Config(format!(
                "窗口参数必须 >= 1: size={}, stride={}",
                self.window_size, self.window_stride
            )));
        }
        let config = SessionConfig {
            window_size: self.window_size,
            window_stride: self.window_stride,
            segmentation: self.segmentation()?,
            sampling: self.sampling(),
            sample_type: sample_type.to_string(),
            start_id,
        };
        config.validate()?;
        Ok(config)
    }
}

/// 命令行参数
#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "手语关键点数据集构建 (WLASL / 类别目录)", long_about = None)]
pub struct Args {
    /// WLASL 根目录 (含 WLASL_v0.3.json 与 videos/)
    #[arg(long, conflicts_with = "folder_root", required_unless_present = "folder_root")]
    pub wlasl_root: Option<PathBuf>,

    /// WLASL 清单路径 (默认 <wlasl-root>/WLASL_v0.3.json)
    #[arg(long, requires = "wlasl_root")]
    pub wlasl_json: Option<PathBuf>,

    /// 类别子目录形式的视频根目录
    #[arg(long)]
    pub folder_root: Option<PathBuf>,

    /// 类别ID → 标签 映射文件 (每行 `key value`)
    #[arg(long, requires = "folder_root")]
    pub label_map: Option<PathBuf>,

    /// 输出文件
    #[arg(short, long)]
    pub out: PathBuf,

    /// 输出格式
    #[arg(long, value_enum, default_value_t = OutputFormat::Jsonl)]
    pub out_format: OutputFormat,

    /// gzip 压缩输出
    #[arg(long)]
    pub gzip: bool,

    /// 只处理前 N 个标签/类别 (0 = 全部)
    #[arg(long, default_value_t = 0)]
    pub labels_limit: usize,

    /// 目标采样帧率
    #[arg(long)]
    pub fps: Option<u32>,

    /// 每个视频最长处理秒数
    #[arg(long)]
    pub max_seconds: Option<f64>,

    /// 窗口帧数
    #[arg(long)]
    pub window_size: Option<usize>,

    /// 窗口步长
    #[arg(long)]
    pub window_stride: Option<usize>,

    /// 每段窗口数 (0 = 整个视频一段)
    #[arg(long)]
    pub segment_windows: Option<usize>,

    /// 分段步长
    #[arg(long)]
    pub segment_stride: Option<usize>,

    /// 记录的 type 字段
    #[arg(long = "type", default_value = DEFAULT_SAMPLE_TYPE)]
    pub sample_type: String,

    /// 起始记录ID
    #[arg(long, default_value_t = 10000)]
    pub start_id: u64,

    /// 断点续跑 (跳过断点日志中已完成的视频, 追加输出)
    #[arg(long)]
    pub resume: bool,

    /// 特征参数 JSON 文件; 命令行参数优先
    #[arg(long)]
    pub feature_config: Option<PathBuf>,

    /// 姿态关键点模型 (ONNX)
    #[arg(long, default_value = DEFAULT_POSE_MODEL)]
    pub pose_model: PathBuf,

    /// 手部关键点模型 (ONNX)
    #[arg(long, default_value = DEFAULT_HAND_MODEL)]
    pub hand_model: PathBuf,
}

impl Args {
    /// 特征配置: 文件 (或默认值) + 命令行覆盖
    pub fn feature_config(&self) -> Result<FeatureConfig> {
        let mut config = match &self.feature_config {
            Some(path) => FeatureConfig::load(path)?,
            None => FeatureConfig::default(),
        };
        if let Some(v) = self.fps {
            config.fps = v;
        }
        if let Some(v) = self.max_seconds {
            config.max_seconds = v;
        }
        if let Some(v) = self.window_size {
            config.window_size = v;
        }
        if let Some(v) = self.window_stride {
            config.window_stride = v;
        }
        if let Some(v) = self.segment_windows {
            config.segment_windows = v;
        }
        if let Some(v) = self.segment_stride {
            config.segment_stride = v;
        }
        Ok(config)
    }

    pub fn session_config(&self) -> Result<SessionConfig> {
        self.feature_config()?
            .to_session_config(&self.sample_type, self.start_id)
    }

    pub fn source_mode(&self) -> Result<SourceMode> {
        match (&self.wlasl_root, &self.folder_root) {
            (Some(root), None) => Ok(SourceMode::Manifest {
                root: root.clone(),
                manifest: self.wlasl_json.clone(),
            }),
            (None, Some(root)) => Ok(SourceMode::Folder {
                root: root.clone(),
                label_map: self.label_map.clone(),
            }),
            _ => Err(Error::Config(
                "必须且只能指定 --wlasl-root 或 --folder-root 之一".to_string(),
            )),
        }
    }

    pub fn output_config(&self) -> OutputConfig {
        OutputConfig {
            path: self.out.clone(),
            format: self.out_format,
            gzip: self.gzip,
        }
    }
}
