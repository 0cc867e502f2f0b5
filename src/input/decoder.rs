/// 本地视频文件解码器 (ez-ffmpeg)
/// Local video file decoder: 独立解码线程 → 有界通道 → 会话按帧拉取
use std::path::Path;

use crossbeam_channel::{bounded, Receiver};
use ez_ffmpeg::core::context::null_output::create_null_output;
use ez_ffmpeg::core::scheduler::ffmpeg_scheduler::{FfmpegScheduler, Running};
use ez_ffmpeg::filter::frame_pipeline_builder::FramePipelineBuilder;
use ez_ffmpeg::stream_info::{find_video_stream_info, StreamInfo};
use ez_ffmpeg::{AVMediaType, FfmpegContext, Input};
use image::RgbImage;
use log::{debug, warn};

use super::decode_filter::DecodeFilter;
use super::{FrameStream, VideoDecoder};
use crate::error::{Error, Result};

/// 解码线程与会话之间的帧队列长度
const FRAME_QUEUE: usize = 16;

/// FFmpeg 解码器
#[derive(Debug, Default)]
pub struct FfmpegDecoder;

impl FfmpegDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl VideoDecoder for FfmpegDecoder {
    type Stream = FfmpegStream;

    fn open(&mut self, path: &Path) -> Result<FfmpegStream> {
        let url = path.to_string_lossy().to_string();

        let native_fps = match find_video_stream_info(url.clone()) {
            Ok(Some(StreamInfo::Video { fps, .. })) => Some(fps),
            Ok(_) => None,
            Err(e) => {
                warn!("⚠️ 读取视频流信息失败 {}: {}", url, e);
                None
            }
        };

        let (tx, rx) = bounded::<RgbImage>(FRAME_QUEUE);

        let pipe: FramePipelineBuilder = AVMediaType::AVMEDIA_TYPE_VIDEO.into();
        let pipe = pipe.filter("decode", Box::new(DecodeFilter::new(tx)));
        let out = create_null_output().add_frame_pipeline(pipe);

        // 构建FFmpeg上下文: 统一转换为RGB24
        let ctx = FfmpegContext::builder()
            .input(Input::new(url.clone()))
            .filter_descs(["format=rgb24"].into())
            .output(out)
            .build()
            .map_err(|e| Error::Decode(format!("构建失败 {}: {}", url, e)))?;

        let scheduler = ctx
            .start()
            .map_err(|e| Error::Decode(format!("启动失败 {}: {}", url, e)))?;
        debug!("🎬 解码启动: {} (原生帧率 {:?})", url, native_fps);

        Ok(FfmpegStream {
            rx: Some(rx),
            scheduler: Some(scheduler),
            native_fps,
        })
    }
}

/// 已打开的视频帧流
pub struct FfmpegStream {
    rx: Option<Receiver<RgbImage>>,
    scheduler: Option<FfmpegScheduler<Running>>,
    native_fps: Option<f64>,
}

impl FfmpegStream {
    /// 关闭接收端并等待解码线程退出
    fn shutdown(&mut self) -> Result<()> {
        self.rx.take();
        match self.scheduler.take() {
            Some(scheduler) => scheduler
                .wait()
                .map_err(|e| Error::Decode(format!("解码线程异常退出: {}", e))),
            None => Ok(()),
        }
    }
}

impl FrameStream for FfmpegStream {
    fn native_fps(&self) -> Option<f64> {
        self.native_fps
    }

    fn next_frame(&mut self) -> Result<Option<RgbImage>> {
        let frame = match &self.rx {
            Some(rx) => rx.recv().ok(),
            None => None,
        };
        match frame {
            Some(frame) => Ok(Some(frame)),
            // 发送端已关闭: 解码结束或出错
            None => {
                self.shutdown()?;
                Ok(None)
            }
        }
    }
}

impl Drop for FfmpegStream {
    fn drop(&mut self) {
        // 提前结束时解码线程可能以 "receiver closed" 退出, 忽略
        let _ = self.shutdown();
    }
}
