//! 分段 (Segmentation)
//!
//! 一个视频的窗口序列 → 若干固定长度、可重叠的训练样本

use crate::error::{Error, Result};

/// 分段模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Segmentation {
    /// 整个视频作为一个样本 (segment_size = 0)
    #[default]
    WholeVideo,
    /// 固定长度滑动分段
    Sliding { size: usize, stride: usize },
}

impl Segmentation {
    /// 从命令行参数构建: size 为 0 表示整段输出
    pub fn from_params(size: usize, stride: usize) -> Result<Self> {
        if size == 0 {
            return Ok(Segmentation::WholeVideo);
        }
        if stride == 0 {
            return Err(Error::Config("segment stride 必须 >= 1".to_string()));
        }
        Ok(Segmentation::Sliding { size, stride })
    }

    /// 切分序列; 长度不足一个分段时返回空列表
    pub fn split<'a, T>(&self, sequence: &'a [T]) -> Vec<&'a [T]> {
        if sequence.is_empty() {
            return Vec::new();
        }
        match *self {
            Segmentation::WholeVideo => vec![sequence],
            Segmentation::Sliding { size, stride } => {
                if sequence.len() < size {
                    return Vec::new();
                }
                sequence.windows(size).step_by(stride).collect()
            }
        }
    }
}
