// 该文件是 Yinyue （音乐手势） 项目的一部分。
// src/output/log_output.rs - 日志输出
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

use std::sync::Mutex;

use thiserror::Error;
use tracing::info;
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, decoder::Detection, output::Render};

#[derive(Error, Debug)]
pub enum LogOutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("帧计数器锁已损坏")]
  Poisoned,
}

/// 只把每帧结果写进日志
#[derive(Debug, Default)]
pub struct LogOutput {
  frame_counter: Mutex<u64>,
}

impl FromUrlWithScheme for LogOutput {
  const SCHEME: &'static str = "log";
}

impl FromUrl for LogOutput {
  type Error = LogOutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(LogOutputError::SchemeMismatch);
    }
    Ok(LogOutput::default())
  }
}

impl LogOutput {
  fn frame_id(&self) -> Result<u64, LogOutputError> {
    let mut counter = self
      .frame_counter
      .lock()
      .map_err(|_| LogOutputError::Poisoned)?;
    *counter += 1;
    Ok(*counter)
  }
}

impl<F> Render<F, Option<Detection>> for LogOutput {
  type Error = LogOutputError;

  fn render_result(&self, _frame: &F, result: &Option<Detection>) -> Result<(), Self::Error> {
    let id = self.frame_id()?;
    match result {
      Some(detection) => {
        let [left, top, width, height] = detection.bbox.to_ltwh();
        info!(
          "第 {} 帧: 候选框 {}, 置信度 {:.2}%, 位置 ({:.0}, {:.0}, {:.0}x{:.0}), {} 个关键点",
          id,
          detection.index,
          detection.confidence * 100.0,
          left,
          top,
          width,
          height,
          detection.keypoints().count()
        );
      }
      None => info!("第 {} 帧: 未检测到目标", id),
    }
    Ok(())
  }
}
