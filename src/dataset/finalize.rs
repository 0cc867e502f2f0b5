//! JSON lines → JSON 数组
//!
//! 断点续跑只能写 jsonl; 跑完后用它转换成单个 JSON 数组

use std::io::{BufRead, Write};
use std::path::Path;

use log::{info, warn};
use serde_json::Value;

use super::validate::open_reader;
use super::writer::OutputSink;
use crate::error::Result;

/// 逐行转换, 无效行跳过; 返回转换的条目数
pub fn convert_lines(reader: impl BufRead, out: &mut impl Write) -> Result<usize> {
    out.write_all(b"[\n")?;
    let mut count = 0;
    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let entry: Value = match serde_json::from_str(line) {
            Ok(entry) => entry,
            Err(e) => {
                let head: String = line.chars().take(50).collect();
                warn!("⚠️ 跳过无效行 ({}): {}...", e, head);
                continue;
            }
        };
        if count > 0 {
            out.write_all(b",\n")?;
        }
        serde_json::to_writer(&mut *out, &entry)?;
        count += 1;
        if count % 1000 == 0 {
            info!("已转换 {} 条", count);
        }
    }
    out.write_all(b"\n]")?;
    Ok(count)
}

/// 转换文件; 输入 `.gz` 自动解压, 输出 `.gz` 自动压缩
pub fn convert_jsonl_to_json(input: &Path, output: &Path) -> Result<usize> {
    info!("🔄 转换 {} → {}", input.display(), output.display());
    let reader = open_reader(input)?;
    let gzip = output.to_string_lossy().ends_with(".gz");
    let mut sink = OutputSink::open(output, gzip, false)?;
    let count = convert_lines(reader, &mut sink)?;
    sink.close()?;
    info!("✅ 完成, 转换 {} 条", count);
    Ok(count)
}
