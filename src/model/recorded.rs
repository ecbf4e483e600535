// 该文件是 Yinyue （音乐手势） 项目的一部分。
// src/model/recorded.rs - 回放记录的推理输出
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

//! 把预先导出的网络输出当作推理会话使用，便于离线调试解码。
//!
//! 记录文件为 JSON：
//!
//! ```json
//! {
//!   "inputs": ["images"],
//!   "outputs": ["output0"],
//!   "input_shape": [1, 3, 640, 640],
//!   "frames": [
//!     { "output0": { "dims": [1, 68, 8400], "data": [0.0, ...] } }
//!   ]
//! }
//! ```
//!
//! 每次 `run` 依次返回一帧记录；URL 带 `?loop` 时循环回放。

use std::{collections::HashMap, path::Path, sync::Mutex};

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::ShapeMismatch,
  model::{OutputMap, Session, TensorFeed},
  tensor::OutputTensor,
};

#[derive(Error, Debug)]
pub enum RecordedSessionError {
  #[error("URI 方案不匹配: 期望 '{expected}', 实际 '{actual}'")]
  SchemeMismatch {
    expected: &'static str,
    actual: String,
  },
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("记录文件解析错误: {0}")]
  JsonError(#[from] serde_json::Error),
  #[error("记录的张量 '{name}' 形状无效: {source}")]
  InvalidTensor {
    name: String,
    #[source]
    source: ShapeMismatch,
  },
  #[error("输入名称 '{0}' 不在模型声明中")]
  UnknownInput(String),
  #[error("输入形状不匹配: 期望 {expected:?}, 实际 {actual:?}")]
  InputShape {
    expected: Vec<usize>,
    actual: Vec<usize>,
  },
  #[error("记录的输出已经全部回放")]
  Exhausted,
  #[error("回放游标锁已损坏")]
  Poisoned,
}

#[derive(Deserialize)]
struct RecordFile {
  inputs: Vec<String>,
  outputs: Vec<String>,
  #[serde(default)]
  input_shape: Option<Vec<usize>>,
  frames: Vec<HashMap<String, RecordedTensor>>,
}

#[derive(Deserialize)]
struct RecordedTensor {
  dims: Vec<i64>,
  data: Vec<f32>,
}

pub struct RecordedSession {
  inputs: Vec<String>,
  outputs: Vec<String>,
  input_shape: Option<Vec<usize>>,
  frames: Vec<OutputMap>,
  cursor: Mutex<usize>,
  looping: bool,
}

impl FromUrlWithScheme for RecordedSession {
  const SCHEME: &'static str = "recorded";
}

impl FromUrl for RecordedSession {
  type Error = RecordedSessionError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(RecordedSessionError::SchemeMismatch {
        expected: Self::SCHEME,
        actual: url.scheme().to_string(),
      });
    }

    let looping = url.query_pairs().any(|(k, _)| k == "loop");
    Ok(Self::from_path(url.path())?.with_looping(looping))
  }
}

impl RecordedSession {
  pub fn new(inputs: Vec<String>, outputs: Vec<String>, frames: Vec<OutputMap>) -> Self {
    Self {
      inputs,
      outputs,
      input_shape: None,
      frames,
      cursor: Mutex::new(0),
      looping: false,
    }
  }

  pub fn from_path(path: impl AsRef<Path>) -> Result<Self, RecordedSessionError> {
    let path = path.as_ref();
    info!("加载推理记录文件: {}", path.display());
    let text = std::fs::read_to_string(path)?;
    Self::from_json(&text)
  }

  pub fn from_json(text: &str) -> Result<Self, RecordedSessionError> {
    let record: RecordFile = serde_json::from_str(text)?;

    let mut frames = Vec::with_capacity(record.frames.len());
    for frame in record.frames {
      let mut outputs = OutputMap::default();
      for (name, tensor) in frame {
        let tensor = OutputTensor::from_signed_dims(tensor.data, &tensor.dims)
          .map_err(|source| RecordedSessionError::InvalidTensor {
            name: name.clone(),
            source,
          })?;
        outputs.insert(name, tensor);
      }
      frames.push(outputs);
    }
    debug!("共 {} 帧推理记录", frames.len());

    Ok(Self {
      inputs: record.inputs,
      outputs: record.outputs,
      input_shape: record.input_shape,
      frames,
      cursor: Mutex::new(0),
      looping: false,
    })
  }

  pub fn with_looping(mut self, looping: bool) -> Self {
    self.looping = looping;
    self
  }

  pub fn with_input_shape(mut self, shape: Vec<usize>) -> Self {
    self.input_shape = Some(shape);
    self
  }

  pub fn num_frames(&self) -> usize {
    self.frames.len()
  }

  fn next_index(&self) -> Result<usize, RecordedSessionError> {
    let mut cursor = self
      .cursor
      .lock()
      .map_err(|_| RecordedSessionError::Poisoned)?;

    let idx = if *cursor < self.frames.len() {
      *cursor
    } else if self.looping && !self.frames.is_empty() {
      debug!("推理记录回放到末尾，从头开始");
      0
    } else {
      warn!("推理记录已经全部回放");
      return Err(RecordedSessionError::Exhausted);
    };
    *cursor = idx + 1;
    Ok(idx)
  }
}

impl Session for RecordedSession {
  type Error = RecordedSessionError;

  fn input_names(&self) -> &[String] {
    &self.inputs
  }

  fn output_names(&self) -> &[String] {
    &self.outputs
  }

  fn run(&self, feed: TensorFeed<'_>) -> Result<OutputMap, Self::Error> {
    if !self.inputs.iter().any(|name| name == feed.name) {
      return Err(RecordedSessionError::UnknownInput(feed.name.to_string()));
    }
    if let Some(expected) = &self.input_shape
      && expected.as_slice() != feed.shape.as_slice()
    {
      return Err(RecordedSessionError::InputShape {
        expected: expected.clone(),
        actual: feed.shape.to_vec(),
      });
    }

    let idx = self.next_index()?;
    debug!("回放第 {} 帧推理记录", idx);
    Ok(self.frames[idx].clone())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::OutputName;
  use std::io::Write;

  const RECORD: &str = r#"{
    "inputs": ["images"],
    "outputs": ["output0"],
    "input_shape": [1, 3, 2, 2],
    "frames": [
      { "output0": { "dims": [1, 2, 3], "data": [1, 2, 3, 4, 5, 6] } },
      { "output0": { "dims": [1, 2, 1], "data": [7, 8] } }
    ]
  }"#;

  fn feed<'a>(name: &'a str, data: &'a [f32]) -> TensorFeed<'a> {
    TensorFeed {
      name,
      data,
      shape: [1, 3, 2, 2],
    }
  }

  #[test]
  fn replays_frames_in_order() {
    let session = RecordedSession::from_json(RECORD).unwrap();
    let output = OutputName::resolve(&session).unwrap();
    let data = [0f32; 12];

    let mut first = session.run(feed("images", &data)).unwrap();
    assert_eq!(first.take(&output).unwrap().dims(), [1, 2, 3]);
    let mut second = session.run(feed("images", &data)).unwrap();
    assert_eq!(second.take(&output).unwrap().as_slice(), &[7.0, 8.0]);
    assert!(matches!(
      session.run(feed("images", &data)),
      Err(RecordedSessionError::Exhausted)
    ));
  }

  #[test]
  fn looping_restarts_from_first_frame() {
    let session = RecordedSession::from_json(RECORD).unwrap().with_looping(true);
    let output = OutputName::resolve(&session).unwrap();
    let data = [0f32; 12];
    for _ in 0..2 {
      session.run(feed("images", &data)).unwrap();
    }
    let mut third = session.run(feed("images", &data)).unwrap();
    assert_eq!(third.take(&output).unwrap().dims(), [1, 2, 3]);
  }

  #[test]
  fn checks_feed_against_signature() {
    let session = RecordedSession::from_json(RECORD).unwrap();
    let data = [0f32; 12];
    assert!(matches!(
      session.run(feed("pixels", &data)),
      Err(RecordedSessionError::UnknownInput(name)) if name == "pixels"
    ));

    let wrong = TensorFeed {
      name: "images",
      data: &data,
      shape: [1, 3, 4, 1],
    };
    assert!(matches!(
      session.run(wrong),
      Err(RecordedSessionError::InputShape { .. })
    ));
  }

  #[test]
  fn invalid_recorded_tensor_fails_at_load() {
    let text = r#"{
      "inputs": ["images"],
      "outputs": ["output0"],
      "frames": [ { "output0": { "dims": [1, 2, 3], "data": [1, 2] } } ]
    }"#;
    assert!(matches!(
      RecordedSession::from_json(text),
      Err(RecordedSessionError::InvalidTensor { name, .. }) if name == "output0"
    ));
  }

  #[test]
  fn loads_from_url() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(RECORD.as_bytes()).unwrap();
    let url = Url::from_file_path(file.path()).unwrap();
    let url = Url::parse(&format!("recorded://{}?loop", url.path())).unwrap();

    let session = RecordedSession::from_url(&url).unwrap();
    assert_eq!(session.num_frames(), 2);
    assert_eq!(session.input_names(), &["images".to_string()]);

    let wrong = Url::parse("image:///tmp/a.png").unwrap();
    assert!(matches!(
      RecordedSession::from_url(&wrong),
      Err(RecordedSessionError::SchemeMismatch { .. })
    ));
  }
}
