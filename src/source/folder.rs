//! 类别子目录模式

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};

use super::{VideoEntries, VideoEntry};
use crate::error::{Error, Result};

/// 类别ID → 标签 映射
///
/// 文件格式: 每行 `key value`, 空白分隔; 先按字符串匹配, 再按整数匹配 ("007" 命中 7)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabelMap {
    by_name: HashMap<String, String>,
    by_index: HashMap<i64, String>,
}

impl LabelMap {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| {
            Error::Source(format!("标签映射不可读 {}: {}", path.display(), e))
        })?;
        let map = Self::parse(&text);
        info!("🏷️ 标签映射: {} 条 ({})", map.len(), path.display());
        Ok(map)
    }

    pub fn parse(text: &str) -> Self {
        let mut map = Self::default();
        for line in text.lines() {
            let mut parts = line.split_whitespace();
            let (Some(key), Some(value)) = (parts.next(), parts.next()) else {
                continue;
            };
            map.insert(key, value);
        }
        map
    }

    pub fn insert(&mut self, key: &str, value: &str) {
        self.by_name.insert(key.to_string(), value.to_string());
        if let Ok(index) = key.parse::<i64>() {
            self.by_index.insert(index, value.to_string());
        }
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    pub fn lookup(&self, class_id: &str) -> Option<&str> {
        self.by_name
            .get(class_id)
            .or_else(|| {
                class_id
                    .parse::<i64>()
                    .ok()
                    .and_then(|index| self.by_index.get(&index))
            })
            .map(String::as_str)
    }

    /// 映射后的标签, 未命中时使用类别目录名
    pub fn label_for(&self, class_id: &str) -> String {
        self.lookup(class_id).unwrap_or(class_id).to_string()
    }
}

fn sorted_dir_names(dir: &Path, keep: impl Fn(&Path, &str) -> bool) -> std::io::Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().to_string();
        if keep(&entry.path(), &name) {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}

fn is_mp4(name: &str) -> bool {
    name.to_lowercase().ends_with(".mp4")
}

/// 扫描类别目录; 每个类别内的 .mp4 文件按名称排序
pub fn scan_folder(root: &Path, label_map: LabelMap, labels_limit: usize) -> Result<VideoEntries> {
    if !root.is_dir() {
        return Err(Error::Source(format!("视频目录不存在: {}", root.display())));
    }
    let mut classes = sorted_dir_names(root, |path, _| path.is_dir())
        .map_err(|e| Error::Source(format!("视频目录不可读 {}: {}", root.display(), e)))?;
    if labels_limit > 0 {
        classes.truncate(labels_limit);
    }
    info!("📁 目录: {} ({} 个类别)", root.display(), classes.len());

    let root: PathBuf = root.to_path_buf();
    let entries = classes.into_iter().flat_map(move |class_id| {
        let class_dir = root.join(&class_id);
        let label = label_map.label_for(&class_id);
        let files = sorted_dir_names(&class_dir, |path, name| path.is_file() && is_mp4(name))
            .unwrap_or_else(|e| {
                warn!("⚠️ 跳过不可读的类别目录 {}: {}", class_dir.display(), e);
                Vec::new()
            });
        files.into_iter().map(move |file| VideoEntry {
            path: class_dir.join(&file),
            label: label.clone(),
            unique_id: format!("{}/{}", class_id, file),
        })
    });

    Ok(Box::new(entries))
}
