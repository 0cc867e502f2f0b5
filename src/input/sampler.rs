/// 帧采样器: 按目标帧率从原生帧序列中抽帧, 并限制最大时长
use log::debug;

/// 原生帧率未知时的默认值
pub const DEFAULT_NATIVE_FPS: f64 = 30.0;

/// 采样参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingConfig {
    pub target_fps: u32,  // 目标帧率
    pub max_seconds: f64, // 每个视频最多处理的时长
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            target_fps: 15,
            max_seconds: 6.0,
        }
    }
}

impl SamplingConfig {
    /// 检测器时间戳步长 (ms)
    pub fn step_ms(&self) -> u64 {
        let fps = self.target_fps.max(1) as f64;
        ((1000.0 / fps).round() as u64).max(1)
    }

    /// 每个视频的最大采样帧数
    pub fn max_frames(&self) -> usize {
        (self.target_fps as f64 * self.max_seconds).floor().max(0.0) as usize
    }
}

/// 对单帧的采样决定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleDecision {
    Take,
    Skip,
    Stop,
}

/// 单个视频的采样状态
#[derive(Debug, Clone)]
pub struct FrameSampler {
    interval: usize,
    max_frames: usize,
    seen: usize,  // 已读取的原生帧
    taken: usize, // 已采样的帧
}

impl FrameSampler {
    pub fn new(native_fps: Option<f64>, config: &SamplingConfig) -> Self {
        let native = native_fps
            .filter(|fps| fps.is_finite() && *fps > 0.0)
            .unwrap_or(DEFAULT_NATIVE_FPS);
        let target = config.target_fps.max(1) as f64;
        let interval = ((native / target).round() as usize).max(1);
        debug!(
            "🎞️ 采样: 原生{:.2}fps → 目标{}fps, 每{}帧取1帧, 上限{}帧",
            native,
            config.target_fps,
            interval,
            config.max_frames()
        );
        Self {
            interval,
            max_frames: config.max_frames(),
            seen: 0,
            taken: 0,
        }
    }

    pub fn interval(&self) -> usize {
        self.interval
    }

    pub fn taken(&self) -> usize {
        self.taken
    }

    /// 读到下一帧原生帧时调用
    pub fn next_frame(&mut self) -> SampleDecision {
        let index = self.seen;
        self.seen += 1;
        if index % self.interval != 0 {
            return SampleDecision::Skip;
        }
        if self.taken >= self.max_frames {
            return SampleDecision::Stop;
        }
        self.taken += 1;
        SampleDecision::Take
    }
}
