// 该文件是 Yinyue （音乐手势） 项目的一部分。
// src/output/json_record.rs - 逐帧 JSON 行记录
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use chrono::Utc;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, decoder::Detection, output::Render};

#[derive(Error, Debug)]
pub enum JsonRecordError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("JSON 序列化错误: {0}")]
  JsonError(#[from] serde_json::Error),
  #[error("记录文件锁已损坏")]
  Poisoned,
}

struct RecordFile {
  file: File,
  frame_counter: u64,
}

/// 每帧追加一行 JSON：`{"timestamp", "frame", "detection"}`，未检测到时 `detection` 为 `null`
pub struct JsonRecordOutput {
  path: String,
  inner: Mutex<RecordFile>,
}

impl FromUrlWithScheme for JsonRecordOutput {
  const SCHEME: &'static str = "record";
}

impl FromUrl for JsonRecordOutput {
  type Error = JsonRecordError;

  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(JsonRecordError::SchemeMismatch);
    }

    let path = uri.path().to_string();
    if let Some(parent) = Path::new(&path).parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent)?;
    }

    // `append` 参数存在时保留已有内容
    let append = uri.query_pairs().any(|(k, _)| k == "append");
    let file = OpenOptions::new()
      .create(true)
      .write(true)
      .append(append)
      .truncate(!append)
      .open(&path)?;
    info!("记录检测结果到: {}", path);

    Ok(JsonRecordOutput {
      path,
      inner: Mutex::new(RecordFile {
        file,
        frame_counter: 0,
      }),
    })
  }
}

impl JsonRecordOutput {
  pub fn path(&self) -> &str {
    &self.path
  }
}

impl<F> Render<F, Option<Detection>> for JsonRecordOutput {
  type Error = JsonRecordError;

  fn render_result(&self, _frame: &F, result: &Option<Detection>) -> Result<(), Self::Error> {
    let mut inner = self.inner.lock().map_err(|_| JsonRecordError::Poisoned)?;
    // 帧号从 1 开始
    inner.frame_counter += 1;
    let frame = inner.frame_counter;

    let line = json!({
      "timestamp": Utc::now().to_rfc3339(),
      "frame": frame,
      "detection": result,
    });
    serde_json::to_writer(&mut inner.file, &line)?;
    inner.file.write_all(b"\n")?;
    inner.file.flush()?;
    debug!("写入第 {} 帧记录", frame);
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::decoder::{KeypointLayout, PredictionBox};
  use serde_json::Value;

  fn record_url(path: &Path) -> Url {
    Url::parse(&format!("record://{}", path.display())).unwrap()
  }

  #[test]
  fn writes_one_line_per_frame() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out/result.jsonl");
    let output = JsonRecordOutput::from_url(&record_url(&path)).unwrap();

    let detection = Detection {
      index: 7,
      bbox: PredictionBox {
        x: 320.0,
        y: 240.0,
        width: 100.0,
        height: 80.0,
      },
      confidence: 0.75,
      keypoint_count: 1,
      layout: KeypointLayout::Interleaved,
      features: vec![1.0, 2.0, 0.5].into_boxed_slice(),
    };
    output.render_result(&(), &Some(detection)).unwrap();
    output.render_result(&(), &None).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<Value> = text
      .lines()
      .map(|line| serde_json::from_str(line).unwrap())
      .collect();
    assert_eq!(lines.len(), 2);

    assert_eq!(lines[0]["frame"], 1);
    assert_eq!(lines[0]["detection"]["index"], 7);
    assert_eq!(lines[0]["detection"]["bbox"]["width"], 100.0);
    assert_eq!(lines[0]["detection"]["layout"], "interleaved");
    assert!(lines[0]["timestamp"].is_string());

    assert_eq!(lines[1]["frame"], 2);
    assert!(lines[1]["detection"].is_null());
  }

  #[test]
  fn append_keeps_previous_records() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("result.jsonl");
    std::fs::write(&path, "{}\n").unwrap();

    let mut url = record_url(&path);
    url.set_query(Some("append"));
    let output = JsonRecordOutput::from_url(&url).unwrap();
    output.render_result(&(), &None).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    assert_eq!(text.lines().count(), 2);
  }
}
