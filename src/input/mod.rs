/// 视频输入系统 (Video Input System)
///
/// - VideoDecoder / FrameStream: 解码器接口 (会话按帧拉取)
/// - FrameSampler: 按目标帧率抽帧
/// - FfmpegDecoder: 基于 ez-ffmpeg 的本地视频文件解码 (feature = "ffmpeg")
#[cfg(feature = "ffmpeg")]
pub mod decode_filter;
#[cfg(feature = "ffmpeg")]
pub mod decoder;
pub mod sampler;

use std::path::Path;

use image::RgbImage;

use crate::error::Result;

#[cfg(feature = "ffmpeg")]
pub use decoder::FfmpegDecoder;
pub use sampler::{FrameSampler, SampleDecision, SamplingConfig};

/// 一个已打开视频的帧流
pub trait FrameStream {
    /// 原生帧率, 未知时返回 None
    fn native_fps(&self) -> Option<f64>;

    /// 读取下一帧; 视频结束返回 Ok(None)
    fn next_frame(&mut self) -> Result<Option<RgbImage>>;
}

/// 视频解码器: 打开视频文件, 返回帧流
pub trait VideoDecoder {
    type Stream: FrameStream;

    fn open(&mut self, path: &Path) -> Result<Self::Stream>;
}
