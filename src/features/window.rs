//! 滑动窗口统计 (Sliding window statistics)
//!
//! 帧特征(48维) → 缓冲 → 每满 `window_size` 帧输出一次 (均值, 标准差) 交错的96维向量

use std::collections::VecDeque;

use ndarray::{Array1, Array2, Axis};

use super::keypoints::{Detections, RAW_FEATURE_DIM, WINDOW_FEATURE_DIM};
use crate::error::{Error, Result};

/// 窗口聚合器
#[derive(Debug, Clone)]
pub struct WindowAggregator {
    window_size: usize,
    stride: usize,
    buffer: VecDeque<Vec<f32>>,
    pending_skip: usize, // stride > window_size 时仍需丢弃的帧数
}

impl WindowAggregator {
    pub fn new(window_size: usize, stride: usize) -> Result<Self> {
        if window_size == 0 {
            return Err(Error::Config("window_size 必须 >= 1".to_string()));
        }
        if stride == 0 {
            return Err(Error::Config("window stride 必须 >= 1".to_string()));
        }
        Ok(Self {
            window_size,
            stride,
            buffer: VecDeque::with_capacity(window_size),
            pending_skip: 0,
        })
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    /// 当前缓冲帧数
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// 清空缓冲 (每个视频开始前调用)
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.pending_skip = 0;
    }

    /// 处理一帧检测结果, 窗口满时返回96维统计向量
    pub fn process_frame(&mut self, detections: &Detections) -> Option<Vec<f32>> {
        self.push_features(detections.raw_features())
    }

    /// 直接输入48维帧特征
    pub fn push_features(&mut self, features: Vec<f32>) -> Option<Vec<f32>> {
        debug_assert_eq!(features.len(), RAW_FEATURE_DIM);

        if self.pending_skip > 0 {
            self.pending_skip -= 1;
            return None;
        }

        self.buffer.push_back(features);
        if self.buffer.len() < self.window_size {
            return None;
        }

        let stats = window_stats(self.buffer.iter().take(self.window_size));

        let drained = self.stride.min(self.buffer.len());
        self.buffer.drain(..drained);
        self.pending_skip = self.stride - drained;

        Some(stats)
    }
}

/// 计算窗口内每个特征的均值与总体标准差(除以N), 交错输出
fn window_stats<'a>(frames: impl ExactSizeIterator<Item = &'a Vec<f32>>) -> Vec<f32> {
    let rows = frames.len();
    let mut data = Array2::<f32>::zeros((rows, RAW_FEATURE_DIM));
    for (mut row, frame) in data.axis_iter_mut(Axis(0)).zip(frames) {
        for (dst, src) in row.iter_mut().zip(frame.iter()) {
            *dst = *src;
        }
    }

    let means = data
        .mean_axis(Axis(0))
        .unwrap_or_else(|| Array1::zeros(RAW_FEATURE_DIM));
    let stds = data.std_axis(Axis(0), 0.0);

    let mut out = Vec::with_capacity(WINDOW_FEATURE_DIM);
    for (m, s) in means.iter().zip(stds.iter()) {
        out.push(*m);
        out.push(*s);
    }
    out
}
