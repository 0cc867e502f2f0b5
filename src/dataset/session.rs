//! 数据集构建会话 (Dataset session)
//!
//! 顺序处理视频: 解码 → 抽帧 → 关键点检测 → 窗口统计 → 分段 → 写记录 → 写断点

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, error, info, warn};

use super::checkpoint::CheckpointLog;
use super::record::{now_millis, Record, DEFAULT_SAMPLE_TYPE};
use super::writer::{open_writer, OutputConfig, RecordWriter};
use crate::detection::Landmarker;
use crate::error::{Error, Result};
use crate::features::{Segmentation, WindowAggregator};
use crate::input::{FrameSampler, FrameStream, SampleDecision, SamplingConfig, VideoDecoder};
use crate::source::VideoEntry;

/// 会话参数
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub window_size: usize,
    pub window_stride: usize,
    pub segmentation: Segmentation,
    pub sampling: SamplingConfig,
    pub sample_type: String,
    pub start_id: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            window_size: 8,
            window_stride: 4,
            segmentation: Segmentation::WholeVideo,
            sampling: SamplingConfig::default(),
            sample_type: DEFAULT_SAMPLE_TYPE.to_string(),
            start_id: 10000,
        }
    }
}

impl SessionConfig {
    pub fn validate(&self) -> Result<()> {
        if self.sampling.target_fps == 0 {
            return Err(Error::Config("fps 必须 >= 1".to_string()));
        }
        if !self.sampling.max_seconds.is_finite() || self.sampling.max_seconds <= 0.0 {
            return Err(Error::Config(format!(
                "max_seconds 必须 > 0, 当前 {}",
                self.sampling.max_seconds
            )));
        }
        if let Segmentation::Sliding { stride: 0, .. } = self.segmentation {
            return Err(Error::Config("segment stride 必须 >= 1".to_string()));
        }
        Ok(())
    }
}

/// 检测器时间轴: 整个会话单调递增, 不随视频重置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunClock {
    now_ms: u64,
    step_ms: u64,
}

impl RunClock {
    pub fn new(step_ms: u64) -> Self {
        Self {
            now_ms: 0,
            step_ms: step_ms.max(1),
        }
    }

    /// 返回当前时间戳并前进一步
    pub fn tick(&mut self) -> u64 {
        let now = self.now_ms;
        self.now_ms += self.step_ms;
        now
    }

    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }
}

/// 记录ID计数器 (后增)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdCounter {
    next: u64,
}

impl IdCounter {
    pub fn new(start: u64) -> Self {
        Self { next: start }
    }

    pub fn next_id(&mut self) -> u64 {
        let id = self.next;
        self.next += 1;
        id
    }

    pub fn peek(&self) -> u64 {
        self.next
    }
}

/// 运行统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub processed: usize,    // 写出记录的视频
    pub skipped: usize,      // 过短或处理失败的视频
    pub checkpointed: usize, // 断点中已完成而跳过的视频
    pub records: usize,      // 写出的记录数
    pub interrupted: bool,   // 是否被中断
}

/// 单个视频的处理结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoOutcome {
    /// 已写出 n 条记录并写入断点
    Committed(usize),
    /// 窗口数不足一个分段
    TooShort,
    /// 收到停止请求, 本视频未写出任何内容
    Interrupted,
}

/// 数据集构建会话
pub struct DatasetSession<D: VideoDecoder, L: Landmarker> {
    config: SessionConfig,
    decoder: D,
    landmarker: L,
    aggregator: WindowAggregator,
    clock: RunClock,
    ids: IdCounter,
    checkpoint: CheckpointLog,
    writer: Box<dyn RecordWriter>,
    stats: SessionStats,
    stop: Arc<AtomicBool>,
}

impl<D: VideoDecoder, L: Landmarker> DatasetSession<D, L> {
    pub fn new(
        config: SessionConfig,
        decoder: D,
        landmarker: L,
        writer: Box<dyn RecordWriter>,
        checkpoint: CheckpointLog,
    ) -> Result<Self> {
        config.validate()?;
        let aggregator = WindowAggregator::new(config.window_size, config.window_stride)?;
        let clock = RunClock::new(config.sampling.step_ms());
        let ids = IdCounter::new(config.start_id);
        Ok(Self {
            config,
            decoder,
            landmarker,
            aggregator,
            clock,
            ids,
            checkpoint,
            writer,
            stats: SessionStats::default(),
            stop: Arc::new(AtomicBool::new(false)),
        })
    }

    /// 按输出配置打开写入器与断点日志
    pub fn create(
        config: SessionConfig,
        output: &OutputConfig,
        resume: bool,
        decoder: D,
        landmarker: L,
    ) -> Result<Self> {
        config.validate()?;
        let writer = open_writer(output, resume)?;
        let checkpoint = CheckpointLog::open(&output.checkpoint_path(), resume)?;
        Self::new(config, decoder, landmarker, writer, checkpoint)
    }

    /// 共享停止标志 (Ctrl+C)
    pub fn with_stop_flag(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = stop;
        self
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    /// 处理全部视频, 然后收尾 (闭合 JSON 数组 / 写 gzip 尾部)
    pub fn run(mut self, entries: impl IntoIterator<Item = VideoEntry>) -> Result<SessionStats> {
        info!(
            "🎬 开始构建: 窗口 {}/{}, {:?}, {}fps, 最长 {}s, 起始ID {}",
            self.config.window_size,
            self.config.window_stride,
            self.config.segmentation,
            self.config.sampling.target_fps,
            self.config.sampling.max_seconds,
            self.ids.peek()
        );

        for entry in entries {
            if self.stop_requested() {
                self.stats.interrupted = true;
                break;
            }
            if self.checkpoint.contains(&entry.unique_id) {
                debug!("🔖 已完成, 跳过: {}", entry.unique_id);
                self.stats.checkpointed += 1;
                continue;
            }

            match self.process_video(&entry) {
                Ok(VideoOutcome::Committed(count)) => {
                    self.stats.processed += 1;
                    self.stats.records += count;
                    info!("✅ {} [{}]: {} 条记录", entry.unique_id, entry.label, count);
                }
                Ok(VideoOutcome::TooShort) => {
                    self.stats.skipped += 1;
                    warn!("⚠️ 视频过短, 跳过: {}", entry.unique_id);
                }
                Ok(VideoOutcome::Interrupted) => {
                    self.stats.interrupted = true;
                    warn!("⚠️ 收到停止请求, 放弃当前视频: {}", entry.unique_id);
                    break;
                }
                Err(e) => {
                    self.stats.skipped += 1;
                    error!("❌ 处理失败, 跳过 {} ({}): {}", entry.unique_id, entry.path.display(), e);
                }
            }
        }

        self.writer.finish()?;

        let stats = self.stats;
        info!(
            "🏁 完成: 处理 {}, 跳过 {}, 断点跳过 {}, 记录 {}{}",
            stats.processed,
            stats.skipped,
            stats.checkpointed,
            stats.records,
            if stats.interrupted { " (已中断)" } else { "" }
        );
        Ok(stats)
    }

    /// 处理单个视频; 出错时本视频不写断点
    pub fn process_video(&mut self, entry: &VideoEntry) -> Result<VideoOutcome> {
        self.aggregator.reset();

        let Some(windows) = self.collect_windows(&entry.path)? else {
            return Ok(VideoOutcome::Interrupted);
        };

        let segments = self.config.segmentation.split(&windows);
        if segments.is_empty() {
            debug!("{}: {} 个窗口, 不足一个分段", entry.unique_id, windows.len());
            return Ok(VideoOutcome::TooShort);
        }

        // 写入并刷盘成功后才推进ID计数器
        let mut ids = self.ids;
        let mut records = Vec::with_capacity(segments.len());
        for segment in segments {
            records.push(Record::new(
                ids.next_id(),
                &entry.label,
                &self.config.sample_type,
                segment,
                &entry.unique_id,
                now_millis(),
            ));
        }

        self.writer.write_records(&records)?;
        self.writer.flush()?;
        self.ids = ids;
        self.checkpoint.commit(&entry.unique_id)?;

        Ok(VideoOutcome::Committed(records.len()))
    }

    /// 解码 + 抽帧 + 检测 + 窗口统计; 收到停止请求时返回 None
    fn collect_windows(&mut self, path: &Path) -> Result<Option<Vec<Vec<f32>>>> {
        let mut stream = self.decoder.open(path)?;
        let mut sampler = FrameSampler::new(stream.native_fps(), &self.config.sampling);
        let mut windows = Vec::new();

        while let Some(frame) = stream.next_frame()? {
            if self.stop_requested() {
                return Ok(None);
            }
            match sampler.next_frame() {
                SampleDecision::Skip => continue,
                SampleDecision::Stop => break,
                SampleDecision::Take => {}
            }

            let timestamp_ms = self.clock.tick();
            let detections = self.landmarker.detect(&frame, timestamp_ms)?;
            if let Some(window) = self.aggregator.process_frame(&detections) {
                windows.push(window);
            }
        }

        debug!(
            "{}: 采样 {} 帧, {} 个窗口",
            path.display(),
            sampler.taken(),
            windows.len()
        );
        Ok(Some(windows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::{Detections, TimestampGuard};
    use crate::features::{Landmark, LandmarkSet};
    use image::RgbImage;
    use std::cell::{Cell, RefCell};
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::rc::Rc;

    #[derive(Clone, Copy)]
    struct MockVideo {
        frames: usize,
        fps: Option<f64>,
        fail_at: Option<usize>,
    }

    struct MockDecoder {
        videos: HashMap<PathBuf, MockVideo>,
    }

    struct MockStream {
        video: MockVideo,
        next: usize,
    }

    impl FrameStream for MockStream {
        fn native_fps(&self) -> Option<f64> {
            self.video.fps
        }

        fn next_frame(&mut self) -> Result<Option<RgbImage>> {
            if Some(self.next) == self.video.fail_at {
                return Err(Error::Decode("corrupt packet".to_string()));
            }
            if self.next >= self.video.frames {
                return Ok(None);
            }
            self.next += 1;
            Ok(Some(RgbImage::new(4, 4)))
        }
    }

    impl VideoDecoder for MockDecoder {
        type Stream = MockStream;

        fn open(&mut self, path: &Path) -> Result<MockStream> {
            let video = self
                .videos
                .get(path)
                .copied()
                .ok_or_else(|| Error::Decode(format!("no such video: {}", path.display())))?;
            Ok(MockStream { video, next: 0 })
        }
    }

    /// 检查时间戳单调性并记录所有时间戳
    struct MockLandmarker {
        guard: TimestampGuard,
        timestamps: Rc<RefCell<Vec<u64>>>,
        stop_after: Option<(usize, Arc<AtomicBool>)>,
    }

    impl Landmarker for MockLandmarker {
        fn detect(&mut self, _frame: &RgbImage, timestamp_ms: u64) -> Result<Detections> {
            self.guard.check(timestamp_ms)?;
            self.timestamps.borrow_mut().push(timestamp_ms);
            if let Some((after, stop)) = &self.stop_after {
                if self.timestamps.borrow().len() >= *after {
                    stop.store(true, Ordering::SeqCst);
                }
            }
            let pose = vec![Landmark::new(0.5, 0.5, timestamp_ms as f32); 33];
            Ok(Detections::new(
                LandmarkSet::Present(pose),
                LandmarkSet::Absent,
                LandmarkSet::Absent,
            ))
        }
    }

    /// 写入失败注入点 (按视频ID)
    #[derive(Clone, Copy)]
    enum WriterFault {
        Never,
        Write(&'static str),
        Flush(&'static str),
    }

    /// 刷盘前的记录暂存在 pending, 刷盘成功才算落盘
    struct CaptureWriter {
        records: Rc<RefCell<Vec<Record>>>,
        pending: Vec<Record>,
        fault: WriterFault,
        finished: Rc<Cell<bool>>,
    }

    impl CaptureWriter {
        fn pending_has(&self, video_id: &str) -> bool {
            self.pending.iter().any(|r| r.metadata.video_id == video_id)
        }
    }

    impl RecordWriter for CaptureWriter {
        fn write_records(&mut self, records: &[Record]) -> Result<()> {
            if let WriterFault::Write(video_id) = self.fault {
                if records.iter().any(|r| r.metadata.video_id == video_id) {
                    return Err(Error::Io(std::io::Error::other("disk full")));
                }
            }
            self.pending.extend_from_slice(records);
            Ok(())
        }

        fn flush(&mut self) -> Result<()> {
            if let WriterFault::Flush(video_id) = self.fault {
                if self.pending_has(video_id) {
                    self.pending.clear();
                    return Err(Error::Io(std::io::Error::other("flush failed")));
                }
            }
            self.records.borrow_mut().append(&mut self.pending);
            Ok(())
        }

        fn finish(self: Box<Self>) -> Result<()> {
            self.finished.set(true);
            Ok(())
        }
    }

    struct Harness {
        _dir: tempfile::TempDir,
        checkpoint_path: PathBuf,
        records: Rc<RefCell<Vec<Record>>>,
        finished: Rc<Cell<bool>>,
        timestamps: Rc<RefCell<Vec<u64>>>,
        session: DatasetSession<MockDecoder, MockLandmarker>,
    }

    fn video(frames: usize) -> MockVideo {
        MockVideo {
            frames,
            fps: Some(15.0),
            fail_at: None,
        }
    }

    fn entry(id: &str) -> VideoEntry {
        VideoEntry {
            path: PathBuf::from(id),
            label: format!("label-{}", id),
            unique_id: id.to_string(),
        }
    }

    /// 窗口 2/2, 分段 2/1: 8 帧 → 4 个窗口 → 3 条记录
    fn config() -> SessionConfig {
        SessionConfig {
            window_size: 2,
            window_stride: 2,
            segmentation: Segmentation::Sliding { size: 2, stride: 1 },
            ..SessionConfig::default()
        }
    }

    fn harness(videos: &[(&str, MockVideo)], checkpoint: &str, stop_after: Option<usize>) -> Harness {
        harness_with_fault(videos, checkpoint, stop_after, WriterFault::Never)
    }

    fn harness_with_fault(
        videos: &[(&str, MockVideo)],
        checkpoint: &str,
        stop_after: Option<usize>,
        fault: WriterFault,
    ) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let checkpoint_path = dir.path().join("out.jsonl.checkpoint.txt");
        let resume = !checkpoint.is_empty();
        if resume {
            std::fs::write(&checkpoint_path, checkpoint).unwrap();
        }

        let records = Rc::new(RefCell::new(Vec::new()));
        let finished = Rc::new(Cell::new(false));
        let timestamps = Rc::new(RefCell::new(Vec::new()));
        let stop = Arc::new(AtomicBool::new(false));

        let decoder = MockDecoder {
            videos: videos
                .iter()
                .map(|(id, v)| (PathBuf::from(id), *v))
                .collect(),
        };
        let landmarker = MockLandmarker {
            guard: TimestampGuard::default(),
            timestamps: timestamps.clone(),
            stop_after: stop_after.map(|n| (n, stop.clone())),
        };
        let writer = Box::new(CaptureWriter {
            records: records.clone(),
            pending: Vec::new(),
            fault,
            finished: finished.clone(),
        });
        let log = CheckpointLog::open(&checkpoint_path, resume).unwrap();
        let session = DatasetSession::new(config(), decoder, landmarker, writer, log)
            .unwrap()
            .with_stop_flag(stop);

        Harness {
            _dir: dir,
            checkpoint_path,
            records,
            finished,
            timestamps,
            session,
        }
    }

    #[test]
    fn test_ids_increase_once_per_segment() {
        let h = harness(&[("a", video(8)), ("b", video(8))], "", None);
        let stats = h.session.run(vec![entry("a"), entry("b")]).unwrap();

        assert_eq!(stats.processed, 2);
        assert_eq!(stats.records, 6);
        let records = h.records.borrow();
        let ids: Vec<u64> = records.iter().map(|r| r.id).collect();
        assert_eq!(ids, (10000..10006).collect::<Vec<u64>>());
        assert!(records[..3].iter().all(|r| r.metadata.video_id == "a"));
        assert!(records[3..].iter().all(|r| r.label == "label-b"));
        assert!(records.iter().all(|r| r.features.len() == 2 && r.features[0].len() == 96));
        assert!(h.finished.get());

        let log = std::fs::read_to_string(&h.checkpoint_path).unwrap();
        assert_eq!(log, "a\nb\n");
    }

    #[test]
    fn test_resume_skips_checkpointed_video() {
        let h = harness(&[("5/a.mp4", video(8)), ("5/b.mp4", video(8))], "5/a.mp4\n", None);
        let stats = h.session.run(vec![entry("5/a.mp4"), entry("5/b.mp4")]).unwrap();

        assert_eq!(stats.checkpointed, 1);
        assert_eq!(stats.processed, 1);
        let records = h.records.borrow();
        assert_eq!(records.len(), 3);
        assert!(records.iter().all(|r| r.metadata.video_id == "5/b.mp4"));
        assert_eq!(records[0].id, 10000);

        let log = std::fs::read_to_string(&h.checkpoint_path).unwrap();
        assert_eq!(log, "5/a.mp4\n5/b.mp4\n");
    }

    #[test]
    fn test_failing_video_does_not_abort_run() {
        let broken = MockVideo {
            fail_at: Some(5),
            ..video(8)
        };
        let h = harness(&[("bad", broken), ("good", video(8))], "", None);
        let stats = h.session.run(vec![entry("missing"), entry("bad"), entry("good")]).unwrap();

        assert_eq!(stats.skipped, 2);
        assert_eq!(stats.processed, 1);
        assert!(h.records.borrow().iter().all(|r| r.metadata.video_id == "good"));
        let log = std::fs::read_to_string(&h.checkpoint_path).unwrap();
        assert_eq!(log, "good\n");
    }

    #[test]
    fn test_clock_never_rewinds() {
        // 过短视频与失败视频之后, 时间戳继续递增
        let broken = MockVideo {
            fail_at: Some(3),
            ..video(8)
        };
        let h = harness(&[("short", video(3)), ("bad", broken), ("ok", video(8))], "", None);
        let stats = h.session.run(vec![entry("short"), entry("bad"), entry("ok")]).unwrap();
        assert_eq!(stats.skipped, 2);
        assert_eq!(stats.processed, 1);

        let timestamps = h.timestamps.borrow();
        assert_eq!(timestamps.len(), 3 + 3 + 8);
        assert_eq!(timestamps[0], 0);
        // 15fps → 67ms 步长
        assert!(timestamps.windows(2).all(|w| w[1] - w[0] == 67));
    }

    #[test]
    fn test_too_short_video_is_skipped() {
        let h = harness(&[("short", video(3))], "", None);
        let stats = h.session.run(vec![entry("short")]).unwrap();
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.records, 0);
        assert!(h.records.borrow().is_empty());
        assert!(h.finished.get());
    }

    #[test]
    fn test_downsampling_and_frame_cap() {
        // 30fps → 15fps: 每2帧取1帧; 最长 6s → 最多 90 帧
        let fast = MockVideo {
            frames: 400,
            fps: Some(30.0),
            fail_at: None,
        };
        let h = harness(&[("fast", fast)], "", None);
        h.session.run(vec![entry("fast")]).unwrap();
        assert_eq!(h.timestamps.borrow().len(), 90);
    }

    #[test]
    fn test_stop_abandons_in_flight_video() {
        let h = harness(&[("a", video(8)), ("b", video(8))], "", Some(11));
        let stats = h.session.run(vec![entry("a"), entry("b")]).unwrap();

        assert!(stats.interrupted);
        assert_eq!(stats.processed, 1);
        let records = h.records.borrow();
        assert!(records.iter().all(|r| r.metadata.video_id == "a"));
        assert!(h.finished.get());
        let log = std::fs::read_to_string(&h.checkpoint_path).unwrap();
        assert_eq!(log, "a\n");
    }

    #[test]
    fn test_write_failure_skips_video_and_keeps_ids() {
        let h = harness_with_fault(
            &[("bad", video(8)), ("good", video(8))],
            "",
            None,
            WriterFault::Write("bad"),
        );
        let stats = h.session.run(vec![entry("bad"), entry("good")]).unwrap();

        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.processed, 1);
        assert_eq!(stats.records, 3);
        let ids: Vec<u64> = h.records.borrow().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![10000, 10001, 10002]);
        let log = std::fs::read_to_string(&h.checkpoint_path).unwrap();
        assert_eq!(log, "good\n");
    }

    #[test]
    fn test_flush_failure_never_checkpoints() {
        let h = harness_with_fault(
            &[("a", video(8)), ("bad", video(8)), ("c", video(8))],
            "",
            None,
            WriterFault::Flush("bad"),
        );
        let stats = h.session.run(vec![entry("a"), entry("bad"), entry("c")]).unwrap();

        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.processed, 2);
        let records = h.records.borrow();
        assert!(records.iter().all(|r| r.metadata.video_id != "bad"));
        let ids: Vec<u64> = records.iter().map(|r| r.id).collect();
        assert_eq!(ids, (10000..10006).collect::<Vec<u64>>());
        let log = std::fs::read_to_string(&h.checkpoint_path).unwrap();
        assert_eq!(log, "a\nc\n");
    }

    #[test]
    fn test_invalid_config() {
        let mut config = config();
        config.sampling.target_fps = 0;
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let mut config = SessionConfig::default();
        config.sampling.max_seconds = 0.0;
        assert!(config.validate().is_err());
        assert!(SessionConfig::default().validate().is_ok());
    }

    #[test]
    fn test_run_clock_and_ids() {
        let mut clock = RunClock::new(67);
        assert_eq!(clock.tick(), 0);
        assert_eq!(clock.tick(), 67);
        assert_eq!(clock.now_ms(), 134);

        let mut ids = IdCounter::new(10000);
        assert_eq!(ids.next_id(), 10000);
        assert_eq!(ids.next_id(), 10001);
        assert_eq!(ids.peek(), 10002);
    }
}
