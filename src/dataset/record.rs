use serde::{Deserialize, Serialize};

/// 默认样本类型
pub const DEFAULT_SAMPLE_TYPE: &str = "PHRASE";

/// 数据集记录 (一个分段一条)
///
/// 线上格式:
/// `{"label", "type", "features": [[f32; 96], ...], "createdAt", "id", "metadata": {"video_id"}}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub label: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub features: Vec<Vec<f32>>,
    #[serde(rename = "createdAt")]
    pub created_at: i64,
    pub id: u64,
    pub metadata: RecordMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordMetadata {
    pub video_id: String,
}

impl Record {
    pub fn new(
        id: u64,
        label: &str,
        kind: &str,
        features: &[Vec<f32>],
        video_id: &str,
        created_at: i64,
    ) -> Self {
        Self {
            label: label.to_string(),
            kind: kind.to_string(),
            features: features.to_vec(),
            created_at,
            id,
            metadata: RecordMetadata {
                video_id: video_id.to_string(),
            },
        }
    }
}

/// 当前墙钟时间 (epoch ms)
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn sample() -> Record {
        let window: Vec<f32> = (0..96).map(|i| i as f32 * 0.013 - 0.4).collect();
        Record::new(10000, "book", DEFAULT_SAMPLE_TYPE, &[window.clone(), window], "5/a.mp4", 1_700_000_000_123)
    }

    #[test]
    fn test_wire_field_names() {
        let value = serde_json::to_value(sample()).unwrap();
        let obj = value.as_object().unwrap();
        let mut keys: Vec<&str> = obj.keys().map(String::as_str).collect();
        keys.sort();
        assert_eq!(keys, vec!["createdAt", "features", "id", "label", "metadata", "type"]);
        assert_eq!(obj["type"], "PHRASE");
        assert_eq!(obj["metadata"]["video_id"], "5/a.mp4");
        assert_eq!(obj["features"][0].as_array().unwrap().len(), 96);
    }

    #[test]
    fn test_line_round_trip() {
        let record = sample();
        let line = serde_json::to_string(&record).unwrap();
        assert!(!line.contains('\n'));

        let parsed: Record = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed, record);

        let value: Value = serde_json::from_str(&line).unwrap();
        let again = serde_json::to_string(&value).unwrap();
        let reparsed: Value = serde_json::from_str(&again).unwrap();
        assert_eq!(reparsed, value);
    }
}
