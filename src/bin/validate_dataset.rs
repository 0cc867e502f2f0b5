/// 数据集校验
///
/// 检查每条记录的必需字段、features 非空、每帧 96 维; 统计各标签数量
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use log::{error, info};

use keypoint_dataset_rs::dataset::validate_path;

#[derive(Parser, Debug)]
#[command(author, version, about = "校验数据集文件 (.json/.jsonl, 可 gzip)", long_about = None)]
struct Args {
    /// 数据集文件
    dataset_path: PathBuf,

    /// 打印每个标签的数量
    #[arg(long)]
    labels: bool,
}

fn main() -> Result<ExitCode> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let report = match validate_path(&args.dataset_path) {
        Ok(report) => report,
        Err(e) => {
            error!("❌ 读取失败: {}", e);
            return Ok(ExitCode::FAILURE);
        }
    };

    info!("总条目: {}", report.entries);
    info!("错误数: {}", report.error_count());
    if args.labels {
        for (label, count) in &report.label_counts {
            info!("  {}: {}", label, count);
        }
    }

    if report.passed() {
        info!("✅ PASS (标签数: {})", report.label_counts.len());
        Ok(ExitCode::SUCCESS)
    } else {
        error!("❌ FAIL");
        Ok(ExitCode::FAILURE)
    }
}
