/// 关键点数据集构建 (Dataset Builder)
///
/// 流程:
/// 1. 数据源: WLASL 清单 或 类别子目录
/// 2. 逐个视频: ffmpeg 解码 → 抽帧 → 姿态/手部关键点 → 窗口统计 → 分段
/// 3. 输出: jsonl / JSON 数组 (可选 gzip), 每个视频完成后写断点
///
/// Ctrl+C: 放弃当前视频并正常收尾, 之后可用 --resume 继续
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};

use keypoint_dataset_rs::dataset::DatasetSession;
use keypoint_dataset_rs::detection::{OrtLandmarker, OrtLandmarkerConfig};
use keypoint_dataset_rs::input::FfmpegDecoder;
use keypoint_dataset_rs::{source, Args};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let session_config = args.session_config().context("参数无效")?;
    let source_mode = args.source_mode()?;
    let output = args.output_config();

    info!("🚀 数据集构建启动");
    info!("📦 姿态模型: {}", args.pose_model.display());
    info!("✋ 手部模型: {}", args.hand_model.display());
    info!("💾 输出: {} ({:?}, gzip={})", output.path.display(), output.format, output.gzip);

    // 先打开数据源, 清单/目录错误在写任何输出前报告
    let entries = source::open(&source_mode, args.labels_limit).context("数据源打开失败")?;

    let landmarker = OrtLandmarker::new(OrtLandmarkerConfig {
        pose_model: args.pose_model.clone(),
        hand_model: args.hand_model.clone(),
        ..OrtLandmarkerConfig::default()
    })
    .context("关键点模型加载失败")?;

    let stop = Arc::new(AtomicBool::new(false));
    let stop_handler = stop.clone();
    ctrlc::set_handler(move || {
        if !stop_handler.swap(true, Ordering::SeqCst) {
            warn!("⚠️ 收到 Ctrl+C, 完成收尾后退出...");
        }
    })?;

    let session = DatasetSession::create(
        session_config,
        &output,
        args.resume,
        FfmpegDecoder::default(),
        landmarker,
    )
    .context("输出打开失败")?
    .with_stop_flag(stop);

    let stats = session.run(entries)?;
    if stats.interrupted {
        info!("🔖 已中断, 使用 --resume 继续");
    }
    Ok(())
}
