//! 数据集校验 (Dataset validation)
//!
//! 支持 `.json` / `.json.gz` (JSON 数组) 与 `.jsonl` / `.jsonl.gz` (每行一条);
//! 单条记录的问题只记入报告, 不中断校验

use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use flate2::read::MultiGzDecoder;
use log::{info, warn};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::features::WINDOW_FEATURE_DIM;

/// 记录必须包含的字段
pub const REQUIRED_KEYS: [&str; 5] = ["label", "type", "features", "createdAt", "id"];

/// 单条记录的问题
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordIssue {
    #[error("缺少字段: {0:?}")]
    MissingKeys(Vec<String>),

    #[error("features 为空")]
    EmptyFeatures,

    #[error("第 {frame} 帧维度错误: {dim}")]
    BadDimension { frame: usize, dim: usize },

    #[error("无效 JSON: {0}")]
    InvalidJson(String),
}

/// 问题位置: JSON 数组按条目序号, JSON lines 按行号
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    Entry(usize),
    Line(usize),
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Position::Entry(i) => write!(f, "条目 {}", i),
            Position::Line(n) => write!(f, "第 {} 行", n),
        }
    }
}

/// 校验报告
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationReport {
    pub entries: usize,
    pub issues: Vec<(Position, RecordIssue)>,
    pub label_counts: BTreeMap<String, usize>,
}

impl ValidationReport {
    pub fn error_count(&self) -> usize {
        self.issues.len()
    }

    pub fn passed(&self) -> bool {
        self.issues.is_empty()
    }

    fn record(&mut self, position: Position, entry: &Value) {
        self.entries += 1;
        match check_entry(entry) {
            Ok(label) => *self.label_counts.entry(label).or_insert(0) += 1,
            Err(issue) => {
                warn!("⚠️ {}: {}", position, issue);
                self.issues.push((position, issue));
            }
        }
    }
}

/// 校验一条记录, 通过时返回其标签
pub fn check_entry(entry: &Value) -> std::result::Result<String, RecordIssue> {
    let missing: Vec<String> = REQUIRED_KEYS
        .iter()
        .filter(|key| entry.get(**key).is_none())
        .map(|key| key.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(RecordIssue::MissingKeys(missing));
    }

    let frames = match entry["features"].as_array() {
        Some(frames) if !frames.is_empty() => frames,
        _ => return Err(RecordIssue::EmptyFeatures),
    };
    for (frame, vector) in frames.iter().enumerate() {
        let dim = vector.as_array().map_or(0, Vec::len);
        if dim != WINDOW_FEATURE_DIM {
            return Err(RecordIssue::BadDimension { frame, dim });
        }
    }

    Ok(match &entry["label"] {
        Value::String(label) => label.clone(),
        other => other.to_string(),
    })
}

/// 打开数据集文件, `.gz` 后缀按 gzip 解压 (支持多 member)
pub fn open_reader(path: &Path) -> Result<Box<dyn BufRead>> {
    let file = File::open(path)?;
    let name = path.to_string_lossy();
    Ok(if name.ends_with(".gz") {
        Box::new(BufReader::new(MultiGzDecoder::new(file)))
    } else {
        Box::new(BufReader::new(file))
    })
}

fn is_json_lines(path: &Path) -> bool {
    let name = path.to_string_lossy();
    name.ends_with(".jsonl") || name.ends_with(".jsonl.gz")
}

/// 校验 JSON lines 流; 空行忽略
pub fn validate_lines(reader: impl BufRead) -> Result<ValidationReport> {
    let mut report = ValidationReport::default();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let position = Position::Line(index + 1);
        match serde_json::from_str::<Value>(line) {
            Ok(entry) => report.record(position, &entry),
            Err(e) => {
                let issue = RecordIssue::InvalidJson(e.to_string());
                warn!("⚠️ {}: {}", position, issue);
                report.issues.push((position, issue));
            }
        }
    }
    Ok(report)
}

/// 校验 JSON 数组; 根节点不是数组时返回错误
pub fn validate_array(reader: impl Read) -> Result<ValidationReport> {
    let root: Value = serde_json::from_reader(reader)?;
    let Value::Array(entries) = root else {
        return Err(Error::Source("根节点必须是数组".to_string()));
    };
    let mut report = ValidationReport::default();
    for (index, entry) in entries.iter().enumerate() {
        report.record(Position::Entry(index), entry);
    }
    Ok(report)
}

/// 按文件后缀选择格式并校验
pub fn validate_path(path: &Path) -> Result<ValidationReport> {
    info!("🔍 校验 {}", path.display());
    if !path.exists() {
        return Err(Error::Source(format!("文件不存在: {}", path.display())));
    }
    let reader = open_reader(path)?;
    if is_json_lines(path) {
        validate_lines(reader)
    } else {
        validate_array(reader)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use serde_json::json;
    use std::io::Write;

    fn good(label: &str) -> Value {
        json!({
            "label": label,
            "type": "PHRASE",
            "features": [vec![0.0; 96], vec![1.0; 96]],
            "createdAt": 1,
            "id": 10000,
            "metadata": {"video_id": "001"}
        })
    }

    #[test]
    fn test_check_entry() {
        assert_eq!(check_entry(&good("book")), Ok("book".to_string()));

        let mut entry = good("book");
        entry.as_object_mut().unwrap().remove("createdAt");
        entry.as_object_mut().unwrap().remove("id");
        assert_eq!(
            check_entry(&entry),
            Err(RecordIssue::MissingKeys(vec!["createdAt".into(), "id".into()]))
        );

        let mut entry = good("book");
        entry["features"] = json!([]);
        assert_eq!(check_entry(&entry), Err(RecordIssue::EmptyFeatures));

        let mut entry = good("book");
        entry["features"][1] = json!(vec![0.0; 95]);
        assert_eq!(
            check_entry(&entry),
            Err(RecordIssue::BadDimension { frame: 1, dim: 95 })
        );
    }

    #[test]
    fn test_validate_lines() {
        let text = format!(
            "{}\n\n{}\nnot json\n{}\n",
            good("book"),
            good("drink"),
            json!({"label": "x"})
        );
        let report = validate_lines(text.as_bytes()).unwrap();
        assert_eq!(report.entries, 3);
        assert_eq!(report.error_count(), 2);
        assert!(!report.passed());
        assert_eq!(report.issues[0].0, Position::Line(4));
        assert!(matches!(report.issues[0].1, RecordIssue::InvalidJson(_)));
        assert_eq!(report.label_counts.get("book"), Some(&1));
        assert_eq!(report.label_counts.len(), 2);
    }

    #[test]
    fn test_validate_gzip_jsonl_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.jsonl.gz");
        let mut encoder = GzEncoder::new(File::create(&path).unwrap(), Compression::default());
        for label in ["book", "book", "drink"] {
            writeln!(encoder, "{}", good(label)).unwrap();
        }
        encoder.finish().unwrap();

        let report = validate_path(&path).unwrap();
        assert!(report.passed());
        assert_eq!(report.entries, 3);
        assert_eq!(report.label_counts.get("book"), Some(&2));
    }

    #[test]
    fn test_validate_json_array_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        std::fs::write(&path, json!([good("a"), {"label": "b"}]).to_string()).unwrap();

        let report = validate_path(&path).unwrap();
        assert_eq!(report.entries, 2);
        assert_eq!(report.issues[0].0, Position::Entry(1));

        std::fs::write(&path, "{}").unwrap();
        assert!(validate_path(&path).is_err());
        assert!(validate_path(&dir.path().join("missing.json")).is_err());
    }
}
