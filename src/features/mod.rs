/// 特征工程 (Feature Engineering)
///
/// 三级流水线:
/// - keypoints: 单帧检测结果 → 48维帧特征
/// - window:    帧特征 → 96维窗口统计 (均值/标准差)
/// - segment:   窗口序列 → 固定长度训练样本
pub mod keypoints;
pub mod segment;
pub mod window;

pub use keypoints::{
    extract_raw_features, Detections, Landmark, LandmarkSet, HAND_INDICES, POSE_INDICES,
    RAW_FEATURE_DIM, WINDOW_FEATURE_DIM,
};
pub use segment::Segmentation;
pub use window::WindowAggregator;
