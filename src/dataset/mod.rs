/// 数据集构建系统 (Dataset Building)
///
/// - record:     记录格式 (label/type/features/createdAt/id/metadata)
/// - writer:     JSON lines / JSON 数组输出, 可选 gzip
/// - checkpoint: 断点日志, 支持断点续跑
/// - session:    视频 → 记录 的顺序处理会话
/// - validate:   数据集校验
/// - finalize:   jsonl → JSON 数组 转换
pub mod checkpoint;
pub mod finalize;
pub mod record;
pub mod session;
pub mod validate;
pub mod writer;

pub use checkpoint::CheckpointLog;
pub use finalize::convert_jsonl_to_json;
pub use record::{Record, RecordMetadata, DEFAULT_SAMPLE_TYPE};
pub use session::{DatasetSession, IdCounter, RunClock, SessionConfig, SessionStats, VideoOutcome};
pub use validate::{validate_path, RecordIssue, ValidationReport};
pub use writer::{open_writer, OutputConfig, OutputFormat, OutputSink, RecordWriter};
