//! 断点日志 (Checkpoint log)
//!
//! 纯文本, 每行一个已落盘视频的唯一ID, 只追加

use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use log::info;

use crate::error::Result;

pub struct CheckpointLog {
    path: PathBuf,
    done: HashSet<String>,
    file: BufWriter<File>,
}

impl CheckpointLog {
    /// 打开断点日志
    ///
    /// resume 时完整读入已有ID; 否则清空, 使日志始终对应当前输出文件
    pub fn open(path: &Path, resume: bool) -> Result<Self> {
        let done = if resume { load_ids(path)? } else { HashSet::new() };
        if resume {
            info!("🔖 断点续跑: 已完成 {} 个视频 ({})", done.len(), path.display());
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .append(resume)
            .truncate(!resume)
            .open(path)?;

        Ok(Self {
            path: path.to_path_buf(),
            done,
            file: BufWriter::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn contains(&self, unique_id: &str) -> bool {
        self.done.contains(unique_id)
    }

    /// 记录一个视频已完成; 必须在其记录刷盘之后调用
    pub fn commit(&mut self, unique_id: &str) -> Result<()> {
        writeln!(self.file, "{}", unique_id)?;
        self.file.flush()?;
        self.done.insert(unique_id.to_string());
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.done.len()
    }

    pub fn is_empty(&self) -> bool {
        self.done.is_empty()
    }
}

fn load_ids(path: &Path) -> io::Result<HashSet<String>> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(HashSet::new()),
        Err(e) => Err(e),
    }
}
