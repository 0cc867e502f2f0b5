/// jsonl → JSON 数组
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use keypoint_dataset_rs::dataset::convert_jsonl_to_json;

#[derive(Parser, Debug)]
#[command(author, version, about = "把 jsonl (可 gzip) 转换为单个 JSON 数组文件", long_about = None)]
struct Args {
    /// 输入 jsonl 文件 (.jsonl / .jsonl.gz)
    input_path: PathBuf,

    /// 输出 JSON 文件
    output_path: PathBuf,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    convert_jsonl_to_json(&args.input_path, &args.output_path).with_context(|| {
        format!(
            "转换失败: {} → {}",
            args.input_path.display(),
            args.output_path.display()
        )
    })?;
    Ok(())
}
