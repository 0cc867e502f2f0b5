/// 视频/标签数据源 (Video Source)
///
/// 两种枚举方式, 均惰性产出 (视频路径, 标签, 唯一ID):
/// - manifest: WLASL 风格的 JSON 清单 (gloss → instances[].video_id)
/// - folder:   按类别子目录组织的视频文件夹, 可选 ID→标签 映射文件
pub mod folder;
pub mod manifest;

use std::path::PathBuf;

use crate::error::Result;

pub use folder::{scan_folder, LabelMap};
pub use manifest::scan_manifest;

/// 一个待处理的视频
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoEntry {
    pub path: PathBuf,
    pub label: String,
    pub unique_id: String,
}

/// 惰性视频序列
pub type VideoEntries = Box<dyn Iterator<Item = VideoEntry>>;

/// 数据源模式
#[derive(Debug, Clone, PartialEq)]
pub enum SourceMode {
    Manifest {
        root: PathBuf,
        manifest: Option<PathBuf>,
    },
    Folder {
        root: PathBuf,
        label_map: Option<PathBuf>,
    },
}

/// 打开数据源; 清单/目录缺失或不可读是致命错误
pub fn open(mode: &SourceMode, labels_limit: usize) -> Result<VideoEntries> {
    match mode {
        SourceMode::Manifest { root, manifest } => {
            scan_manifest(root, manifest.as_deref(), labels_limit)
        }
        SourceMode::Folder { root, label_map } => {
            let map = match label_map {
                Some(path) => LabelMap::load(path)?,
                None => LabelMap::default(),
            };
            scan_folder(root, map, labels_limit)
        }
    }
}
