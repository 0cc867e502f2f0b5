//! 记录输出 (Record writers)
//!
//! 两种编码 (JSON lines / JSON 数组) 统一在 `RecordWriter` 之后,
//! 底层输出流可选 gzip 压缩

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use flate2::write::GzEncoder;
use flate2::Compression;

use super::record::Record;
use crate::error::{Error, Result};

/// 输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// 每行一个 JSON 对象
    #[default]
    Jsonl,
    /// 单个 JSON 数组
    Json,
}

/// 输出流: 普通文件或 gzip
pub enum OutputSink {
    Plain(BufWriter<File>),
    Gzip(GzEncoder<BufWriter<File>>),
}

impl OutputSink {
    /// 打开输出文件; append 为 true 时追加 (gzip 追加为新的 member)
    pub fn open(path: &Path, gzip: bool, append: bool) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .append(append)
            .truncate(!append)
            .open(path)?;
        let file = BufWriter::new(file);
        Ok(if gzip {
            OutputSink::Gzip(GzEncoder::new(file, Compression::default()))
        } else {
            OutputSink::Plain(file)
        })
    }

    /// 写完 gzip 尾部并刷新到磁盘
    pub fn close(self) -> io::Result<()> {
        let mut file = match self {
            OutputSink::Plain(file) => file,
            OutputSink::Gzip(encoder) => encoder.finish()?,
        };
        file.flush()?;
        file.get_ref().sync_all()
    }
}

impl Write for OutputSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            OutputSink::Plain(w) => w.write(buf),
            OutputSink::Gzip(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            OutputSink::Plain(w) => w.flush(),
            OutputSink::Gzip(w) => {
                // 同步刷新压缩块, 保证已写记录可被解压读取
                w.flush()?;
                w.get_mut().flush()
            }
        }
    }
}

/// 记录写入接口
pub trait RecordWriter {
    /// 一个视频的全部记录先编码到内存, 再一次性写入
    fn write_records(&mut self, records: &[Record]) -> Result<()>;

    fn write_record(&mut self, record: &Record) -> Result<()> {
        self.write_records(std::slice::from_ref(record))
    }

    /// 把已写记录刷到底层文件
    fn flush(&mut self) -> Result<()>;

    /// 收尾 (闭合数组、写 gzip 尾部), 之后不可再写
    fn finish(self: Box<Self>) -> Result<()>;
}

/// JSON lines 编码
pub struct JsonLinesWriter<W: Write> {
    out: W,
}

impl<W: Write> JsonLinesWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_lines(&mut self, records: &[Record]) -> Result<()> {
        let mut buf = Vec::new();
        for record in records {
            serde_json::to_writer(&mut buf, record)?;
            buf.push(b'\n');
        }
        self.out.write_all(&buf)?;
        Ok(())
    }
}

/// JSON 数组编码: `[` + 逗号分隔的对象 + `]`
pub struct JsonArrayWriter<W: Write> {
    out: W,
    opened: bool,
    count: usize,
}

impl<W: Write> JsonArrayWriter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            opened: false,
            count: 0,
        }
    }

    fn open_bracket(&mut self) -> Result<()> {
        if !self.opened {
            self.out.write_all(b"[\n")?;
            self.opened = true;
        }
        Ok(())
    }

    fn write_items(&mut self, records: &[Record]) -> Result<()> {
        let mut buf = Vec::new();
        for (i, record) in records.iter().enumerate() {
            if self.count + i > 0 {
                buf.extend_from_slice(b",\n");
            }
            serde_json::to_writer(&mut buf, record)?;
        }
        self.open_bracket()?;
        self.out.write_all(&buf)?;
        self.count += records.len();
        Ok(())
    }

    fn close_bracket(&mut self) -> Result<()> {
        self.open_bracket()?;
        self.out.write_all(b"\n]\n")?;
        Ok(())
    }

    pub fn into_inner(mut self) -> Result<W> {
        self.close_bracket()?;
        Ok(self.out)
    }
}

impl RecordWriter for JsonLinesWriter<OutputSink> {
    fn write_records(&mut self, records: &[Record]) -> Result<()> {
        self.write_lines(records)
    }

    fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }

    fn finish(self: Box<Self>) -> Result<()> {
        self.out.close()?;
        Ok(())
    }
}

impl RecordWriter for JsonArrayWriter<OutputSink> {
    fn write_records(&mut self, records: &[Record]) -> Result<()> {
        self.write_items(records)
    }

    fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }

    fn finish(self: Box<Self>) -> Result<()> {
        let sink = self.into_inner()?;
        sink.close()?;
        Ok(())
    }
}

/// 输出配置
#[derive(Debug, Clone, PartialEq)]
pub struct OutputConfig {
    pub path: std::path::PathBuf,
    pub format: OutputFormat,
    pub gzip: bool,
}

impl OutputConfig {
    /// 断点文件路径: `<out>.checkpoint.txt`
    pub fn checkpoint_path(&self) -> std::path::PathBuf {
        let mut name = self.path.as_os_str().to_os_string();
        name.push(".checkpoint.txt");
        std::path::PathBuf::from(name)
    }
}

/// 按配置打开写入器; JSON 数组无法在已闭合的文件后追加, 断点续跑只支持 jsonl
pub fn open_writer(config: &OutputConfig, resume: bool) -> Result<Box<dyn RecordWriter>> {
    if resume && config.format == OutputFormat::Json {
        return Err(Error::Config(
            "断点续跑只支持 jsonl 输出 (可用 finalize_jsonl 转换为 JSON 数组)".to_string(),
        ));
    }
    let sink = OutputSink::open(&config.path, config.gzip, resume)?;
    Ok(match config.format {
        OutputFormat::Jsonl => Box::new(JsonLinesWriter::new(sink)),
        OutputFormat::Json => Box::new(JsonArrayWriter::new(sink)),
    })
}
