// 该文件是 Yinyue （音乐手势） 项目的一部分。
// src/args.rs - 命令行参数
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

use clap::Parser;
use url::Url;

use yinyue::decoder::KeypointLayout;
use yinyue::model::HandPoseBuilder;

/// Yinyue 单手关键点检测
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 推理会话，例如 recorded:///tmp/hand.json?loop
  ///
  /// 查询串可带解码参数: min_confidence、keypoints、layout
  #[arg(long, value_name = "MODEL")]
  pub model: Url,

  /// 输入来源: raw:///path/frames.rgba 或 image:///path/hand.png
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,

  /// 输出: log://、image:///path/out.png 或 record:///path/out.jsonl
  #[arg(long, value_name = "OUTPUT", default_value = "log://")]
  pub output: Url,

  /// 置信度阈值，覆盖模型 URL 中的设置
  #[arg(long, value_name = "THRESHOLD")]
  pub min_confidence: Option<f32>,

  /// 关键点数量
  #[arg(long, value_name = "COUNT")]
  pub keypoints: Option<usize>,

  /// 关键点特征排列: interleaved、planar 或 scalar
  #[arg(long, value_name = "LAYOUT")]
  pub layout: Option<KeypointLayout>,

  /// 最多处理的帧数
  #[arg(long, value_name = "FRAME_NUMBER")]
  pub frames: Option<usize>,

  /// 只处理第一帧
  #[arg(long)]
  pub once: bool,
}

impl Args {
  /// 命令行参数优先于模型 URL 查询串
  pub fn apply(&self, mut builder: HandPoseBuilder) -> HandPoseBuilder {
    if let Some(min_confidence) = self.min_confidence {
      builder = builder.min_confidence(min_confidence);
    }
    if let Some(keypoints) = self.keypoints {
      builder = builder.keypoint_count(keypoints);
    }
    if let Some(layout) = self.layout {
      builder = builder.layout(layout);
    }
    builder
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use yinyue::FromUrl;

  #[test]
  fn flags_override_model_query() {
    let args = Args::parse_from([
      "yinyue",
      "--model",
      "recorded:///tmp/hand.json?min_confidence=0.25&layout=planar",
      "--input",
      "raw:///tmp/frames.rgba",
      "--min-confidence",
      "0.6",
      "--layout",
      "scalar",
    ]);
    assert_eq!(args.output.scheme(), "log");

    let builder = args.apply(HandPoseBuilder::from_url(&args.model).unwrap());
    let config = builder.decoder_config();
    assert_eq!(config.min_confidence, 0.6);
    assert_eq!(config.layout, KeypointLayout::Scalar);
    assert_eq!(config.keypoint_count, 21);
  }
}
