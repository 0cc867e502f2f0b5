/// 关键点检测系统 (Landmark Detection)
///
/// - Landmarker: 统一检测接口, 输入一帧 + 时间戳, 输出 姿态/左手/右手 关键点
/// - OrtLandmarker: 基于 ONNX Runtime 的姿态 + 手部关键点模型 (feature = "onnx")
#[cfg(feature = "onnx")]
pub mod landmarker;

use image::RgbImage;

use crate::error::Result;
pub use crate::features::Detections;

#[cfg(feature = "onnx")]
pub use landmarker::{OrtLandmarker, OrtLandmarkerConfig};

/// 关键点检测器接口
///
/// 调用约定: 同一个检测器实例生命周期内, `timestamp_ms` 必须严格递增
/// (视频模式的跟踪状态依赖时间戳)
pub trait Landmarker {
    fn detect(&mut self, frame: &RgbImage, timestamp_ms: u64) -> Result<Detections>;
}

impl<T: Landmarker + ?Sized> Landmarker for Box<T> {
    fn detect(&mut self, frame: &RgbImage, timestamp_ms: u64) -> Result<Detections> {
        (**self).detect(frame, timestamp_ms)
    }
}

/// 时间戳单调性检查
#[derive(Debug, Default, Clone)]
pub struct TimestampGuard {
    last: Option<u64>,
}

impl TimestampGuard {
    pub fn check(&mut self, timestamp_ms: u64) -> Result<()> {
        if let Some(last) = self.last {
            if timestamp_ms <= last {
                return Err(crate::Error::Detection(format!(
                    "时间戳必须严格递增: {} <= {}",
                    timestamp_ms, last
                )));
            }
        }
        self.last = Some(timestamp_ms);
        Ok(())
    }
}
