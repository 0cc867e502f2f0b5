//! 帧级关键点特征提取 (Raw frame features)
//!
//! 每帧: 6个姿态点 + 5个左手指尖 + 5个右手指尖, 每点 (x, y, z) → 48维

/// 姿态关键点索引: 左右肩、左右肘、左右腕
pub const POSE_INDICES: [usize; 6] = [11, 12, 13, 14, 15, 16];

/// 手部关键点索引: 五个指尖
pub const HAND_INDICES: [usize; 5] = [4, 8, 12, 16, 20];

/// 单帧特征维度 (6 + 5 + 5) * 3
pub const RAW_FEATURE_DIM: usize = (POSE_INDICES.len() + 2 * HAND_INDICES.len()) * 3;

/// 窗口统计特征维度 (均值 + 标准差)
pub const WINDOW_FEATURE_DIM: usize = RAW_FEATURE_DIM * 2;

/// 归一化关键点 (normalized landmark)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// 某个身体部位在一帧中的检测结果: 有 / 无
#[derive(Debug, Clone, PartialEq, Default)]
pub enum LandmarkSet {
    Present(Vec<Landmark>),
    #[default]
    Absent,
}

impl LandmarkSet {
    pub fn is_present(&self) -> bool {
        matches!(self, LandmarkSet::Present(_))
    }

    /// 取指定索引的点; 缺失、越界或非有限值都返回 None
    pub fn point(&self, idx: usize) -> Option<Landmark> {
        match self {
            LandmarkSet::Present(points) => points.get(idx).copied().filter(Landmark::is_finite),
            LandmarkSet::Absent => None,
        }
    }
}

impl From<Option<Vec<Landmark>>> for LandmarkSet {
    fn from(points: Option<Vec<Landmark>>) -> Self {
        match points {
            Some(points) => LandmarkSet::Present(points),
            None => LandmarkSet::Absent,
        }
    }
}

/// 一帧的检测结果 (检测器 → 特征提取)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Detections {
    pub pose: LandmarkSet,
    pub left_hand: LandmarkSet,
    pub right_hand: LandmarkSet,
}

impl Detections {
    pub fn new(pose: LandmarkSet, left_hand: LandmarkSet, right_hand: LandmarkSet) -> Self {
        Self {
            pose,
            left_hand,
            right_hand,
        }
    }

    pub fn raw_features(&self) -> Vec<f32> {
        extract_raw_features(&self.pose, &self.left_hand, &self.right_hand)
    }
}

fn push_points(features: &mut Vec<f32>, set: &LandmarkSet, indices: &[usize]) {
    for &idx in indices {
        let lm = set.point(idx).unwrap_or_default();
        features.extend_from_slice(&[lm.x, lm.y, lm.z]);
    }
}

/// 提取48维帧特征, 缺失部位补零, 永不失败
pub fn extract_raw_features(pose: &LandmarkSet, left_hand: &LandmarkSet, right_hand: &LandmarkSet) -> Vec<f32> {
    let mut features = Vec::with_capacity(RAW_FEATURE_DIM);
    push_points(&mut features, pose, &POSE_INDICES);
    push_points(&mut features, left_hand, &HAND_INDICES);
    push_points(&mut features, right_hand, &HAND_INDICES);
    features
}
