// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//
// ONNX Runtime 关键点检测器
//
// 姿态: 整帧输入姿态关键点模型 (33点 × [x, y, z, visibility, presence])
// 手部: 左右半帧分别输入手部关键点模型 (21点 × [x, y, z] + 置信度 + 左右手分数)

use std::path::{Path, PathBuf};

use image::imageops::{self, FilterType};
use image::RgbImage;
use log::info;
use ndarray::{Array4, ArrayViewD};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;

use super::{Detections, Landmarker, TimestampGuard};
use crate::config::{DEFAULT_HAND_MODEL, DEFAULT_POSE_MODEL};
use crate::error::{Error, Result};
use crate::features::{Landmark, LandmarkSet};

/// 姿态模型输出的关键点数 (含辅助点时模型输出39个, 取前33个)
const POSE_POINTS: usize = 33;
/// 手部关键点数
const HAND_POINTS: usize = 21;

/// 检测器配置
#[derive(Debug, Clone)]
pub struct OrtLandmarkerConfig {
    pub pose_model: PathBuf,
    pub hand_model: PathBuf,
    pub pose_input_size: u32,  // 姿态模型输入边长
    pub hand_input_size: u32,  // 手部模型输入边长
    pub min_pose_presence: f32, // 姿态存在阈值
    pub min_hand_presence: f32, // 手部存在阈值
}

impl Default for OrtLandmarkerConfig {
    fn default() -> Self {
        Self {
            pose_model: PathBuf::from(DEFAULT_POSE_MODEL),
            hand_model: PathBuf::from(DEFAULT_HAND_MODEL),
            pose_input_size: 256,
            hand_input_size: 224,
            min_pose_presence: 0.5,
            min_hand_presence: 0.5,
        }
    }
}

/// 单只手的检测结果
struct HandCandidate {
    points: Vec<Landmark>,
    presence: f32,
    is_right: bool,
}

pub struct OrtLandmarker {
    pose: Session,
    hand: Session,
    config: OrtLandmarkerConfig,
    timestamps: TimestampGuard,
}

fn ort_err(e: impl std::fmt::Display) -> Error {
    Error::Detection(e.to_string())
}

/// 模型输出个数不足时报检测错误, 不做越界索引
fn check_outputs(model: &str, found: usize, needed: usize) -> Result<()> {
    if found < needed {
        return Err(Error::Detection(format!(
            "{}模型输出个数不足: 需要 {}, 实际 {}",
            model, needed, found
        )));
    }
    Ok(())
}

fn load_session(path: &Path) -> Result<Session> {
    if !path.exists() {
        return Err(Error::Config(format!("模型文件不存在: {}", path.display())));
    }
    Session::builder()
        .map_err(ort_err)?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(ort_err)?
        .commit_from_file(path)
        .map_err(ort_err)
}

impl OrtLandmarker {
    pub fn new(config: OrtLandmarkerConfig) -> Result<Self> {
        let pose = load_session(&config.pose_model)?;
        info!("✅ 姿态模型加载成功: {}", config.pose_model.display());
        let hand = load_session(&config.hand_model)?;
        info!("✅ 手部模型加载成功: {}", config.hand_model.display());

        Ok(Self {
            pose,
            hand,
            config,
            timestamps: TimestampGuard::default(),
        })
    }

    fn detect_pose(&mut self, frame: &RgbImage) -> Result<LandmarkSet> {
        let size = self.config.pose_input_size;
        let input = Tensor::from_array(nhwc_tensor(frame, size)).map_err(ort_err)?;
        let outputs = self.pose.run(ort::inputs![input]).map_err(ort_err)?;
        check_outputs("姿态", outputs.len(), 2)?;

        let landmarks: ArrayViewD<f32> = outputs[0].try_extract_array().map_err(ort_err)?;
        let presence: ArrayViewD<f32> = outputs[1].try_extract_array().map_err(ort_err)?;

        let score = presence.iter().next().copied().unwrap_or(0.0);
        if score < self.config.min_pose_presence {
            return Ok(LandmarkSet::Absent);
        }

        let values: Vec<f32> = landmarks.iter().copied().collect();
        let stride = if values.len() >= POSE_POINTS * 5 { 5 } else { 3 };
        let scale = size as f32;
        let points = values
            .chunks_exact(stride)
            .take(POSE_POINTS)
            .map(|p| Landmark::new(p[0] / scale, p[1] / scale, p[2] / scale))
            .collect();
        Ok(LandmarkSet::Present(points))
    }

    /// 在 [x0, x0 + width) 的竖条区域内检测一只手, 坐标映射回整帧
    fn detect_hand(&mut self, frame: &RgbImage, x0: u32, width: u32) -> Result<Option<HandCandidate>> {
        let (frame_w, frame_h) = frame.dimensions();
        let crop = imageops::crop_imm(frame, x0, 0, width, frame_h).to_image();

        let size = self.config.hand_input_size;
        let input = Tensor::from_array(nhwc_tensor(&crop, size)).map_err(ort_err)?;
        let outputs = self.hand.run(ort::inputs![input]).map_err(ort_err)?;
        check_outputs("手部", outputs.len(), 3)?;

        let landmarks: ArrayViewD<f32> = outputs[0].try_extract_array().map_err(ort_err)?;
        let presence: ArrayViewD<f32> = outputs[1].try_extract_array().map_err(ort_err)?;
        let handedness: ArrayViewD<f32> = outputs[2].try_extract_array().map_err(ort_err)?;

        let presence = presence.iter().next().copied().unwrap_or(0.0);
        if presence < self.config.min_hand_presence {
            return Ok(None);
        }
        let is_right = handedness.iter().next().copied().unwrap_or(0.0) > 0.5;

        let scale = size as f32;
        let points: Vec<Landmark> = landmarks
            .iter()
            .copied()
            .collect::<Vec<f32>>()
            .chunks_exact(3)
            .take(HAND_POINTS)
            .map(|p| {
                let x = (p[0] / scale * width as f32 + x0 as f32) / frame_w as f32;
                Landmark::new(x, p[1] / scale, p[2] / scale)
            })
            .collect();

        Ok(Some(HandCandidate {
            points,
            presence,
            is_right,
        }))
    }
}

impl Landmarker for OrtLandmarker {
    fn detect(&mut self, frame: &RgbImage, timestamp_ms: u64) -> Result<Detections> {
        self.timestamps.check(timestamp_ms)?;

        let (w, h) = frame.dimensions();
        if w < 2 || h == 0 {
            return Err(Error::Detection(format!("非法帧尺寸 {}x{}", w, h)));
        }

        let pose = self.detect_pose(frame)?;

        let half = w / 2;
        let mut left: Option<HandCandidate> = None;
        let mut right: Option<HandCandidate> = None;
        for (x0, width) in [(0, half), (half, w - half)] {
            if let Some(hand) = self.detect_hand(frame, x0, width)? {
                // 两个半帧判为同一只手时保留置信度高的
                let slot = if hand.is_right { &mut right } else { &mut left };
                if slot.as_ref().map_or(true, |prev| hand.presence > prev.presence) {
                    *slot = Some(hand);
                }
            }
        }

        Ok(Detections::new(
            pose,
            LandmarkSet::from(left.map(|h| h.points)),
            LandmarkSet::from(right.map(|h| h.points)),
        ))
    }
}

/// RGB图像 → [1, size, size, 3] 归一化张量
fn nhwc_tensor(image: &RgbImage, size: u32) -> Array4<f32> {
    let resized = imageops::resize(image, size, size, FilterType::Triangle);
    let mut input = Array4::<f32>::zeros((1, size as usize, size as usize, 3));
    for (x, y, rgb) in resized.enumerate_pixels() {
        let [r, g, b] = rgb.0;
        input[[0, y as usize, x as usize, 0]] = r as f32 / 255.0;
        input[[0, y as usize, x as usize, 1]] = g as f32 / 255.0;
        input[[0, y as usize, x as usize, 2]] = b as f32 / 255.0;
    }
    input
}
