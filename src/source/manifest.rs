//! WLASL 清单模式

use std::fs;
use std::path::{Path, PathBuf};

use log::info;
use serde::Deserialize;

use super::{VideoEntries, VideoEntry};
use crate::error::{Error, Result};

/// 默认清单文件名
pub const DEFAULT_MANIFEST: &str = "WLASL_v0.3.json";

#[derive(Debug, Deserialize)]
struct GlossEntry {
    gloss: String,
    #[serde(default)]
    instances: Vec<Instance>,
}

#[derive(Debug, Deserialize)]
struct Instance {
    video_id: String,
}

/// 扫描清单: 只产出视频文件存在的实例
pub fn scan_manifest(
    root: &Path,
    manifest: Option<&Path>,
    labels_limit: usize,
) -> Result<VideoEntries> {
    let manifest_path = manifest
        .map(Path::to_path_buf)
        .unwrap_or_else(|| root.join(DEFAULT_MANIFEST));

    let text = fs::read_to_string(&manifest_path).map_err(|e| {
        Error::Source(format!("清单不可读 {}: {}", manifest_path.display(), e))
    })?;
    let mut glosses: Vec<GlossEntry> = serde_json::from_str(&text).map_err(|e| {
        Error::Source(format!("清单解析失败 {}: {}", manifest_path.display(), e))
    })?;

    if labels_limit > 0 {
        glosses.truncate(labels_limit);
    }
    info!(
        "📋 清单: {} ({} 个标签)",
        manifest_path.display(),
        glosses.len()
    );

    let videos_dir: PathBuf = root.join("videos");
    let entries = glosses.into_iter().flat_map(move |entry| {
        let videos_dir = videos_dir.clone();
        let gloss = entry.gloss;
        entry.instances.into_iter().filter_map(move |inst| {
            let path = videos_dir.join(format!("{}.mp4", inst.video_id));
            path.exists().then(|| VideoEntry {
                path,
                label: gloss.clone(),
                unique_id: inst.video_id,
            })
        })
    });

    Ok(Box::new(entries))
}
