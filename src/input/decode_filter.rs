/// FFmpeg解码过滤器模块
/// FFmpeg decode filter: RGB24帧 → RgbImage → 有界通道
use crossbeam_channel::Sender;
use ez_ffmpeg::filter::frame_filter::FrameFilter;
use ez_ffmpeg::filter::frame_filter_context::FrameFilterContext;
use ez_ffmpeg::{AVMediaType, Frame};
use image::RgbImage;
use log::{debug, warn};

/// 解码过滤器: 把解码线程的帧转交给会话线程
pub struct DecodeFilter {
    tx: Option<Sender<RgbImage>>,
    pub total_frames: usize,   // 总帧数
    pub dropped_frames: usize, // 丢弃的帧数
}

impl DecodeFilter {
    pub fn new(tx: Sender<RgbImage>) -> Self {
        Self {
            tx: Some(tx),
            total_frames: 0,
            dropped_frames: 0,
        }
    }
}

impl FrameFilter for DecodeFilter {
    fn media_type(&self) -> AVMediaType {
        AVMediaType::AVMEDIA_TYPE_VIDEO
    }

    fn init(&mut self, _ctx: &FrameFilterContext) -> Result<(), String> {
        debug!("✅ 解码线程启动");
        Ok(())
    }

    fn filter_frame(
        &mut self,
        frame: Frame,
        _ctx: &FrameFilterContext,
    ) -> Result<Option<Frame>, String> {
        self.total_frames += 1;

        let image = match rgb_image_from_frame(&frame) {
            Some(image) => image,
            None => {
                self.dropped_frames += 1;
                if self.dropped_frames <= 10 {
                    warn!("⚠️ 丢弃帧 #{}: 空帧/损坏帧", self.total_frames);
                }
                return Ok(None);
            }
        };

        // 接收端已关闭(会话提前结束采样), 终止解码
        let sent = match &self.tx {
            Some(tx) => tx.send(image).is_ok(),
            None => false,
        };
        if !sent {
            return Err("frame receiver closed".to_string());
        }

        Ok(Some(frame))
    }

    fn uninit(&mut self, _ctx: &FrameFilterContext) {
        // 关闭发送端, 接收端读完剩余帧后得到流结束
        self.tx.take();
        debug!(
            "✅ 解码线程退出: 总帧{} | 丢弃{}",
            self.total_frames, self.dropped_frames
        );
    }
}

/// RGB24 AVFrame → RgbImage (逐行拷贝, 去掉行对齐填充)
fn rgb_image_from_frame(frame: &Frame) -> Option<RgbImage> {
    unsafe {
        // 基本检查：空帧或损坏帧
        if frame.as_ptr().is_null() || frame.is_empty() || frame.is_corrupt() {
            return None;
        }

        let raw = &*frame.as_ptr();
        if raw.width <= 0 || raw.height <= 0 {
            return None;
        }
        let width = raw.width as usize;
        let height = raw.height as usize;
        let row_bytes = width * 3;

        let plane = raw.data[0];
        if plane.is_null() || raw.linesize[0] < row_bytes as i32 {
            return None;
        }
        let stride = raw.linesize[0] as usize;

        let mut buffer = Vec::with_capacity(row_bytes * height);
        for row in 0..height {
            let src = std::slice::from_raw_parts(plane.add(row * stride), row_bytes);
            buffer.extend_from_slice(src);
        }

        RgbImage::from_raw(width as u32, height as u32, buffer)
    }
}
