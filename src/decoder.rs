// 该文件是 Yinyue （音乐手势） 项目的一部分。
// src/decoder.rs - 检测结果解码
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

use std::{fmt, str::FromStr};

use serde::Serialize;
use tracing::debug;

use crate::{frame::ShapeMismatch, tensor::OutputTensor};

const ATTR_CX: usize = 0;
const ATTR_CY: usize = 1;
const ATTR_W: usize = 2;
const ATTR_H: usize = 3;
const ATTR_SCORE: usize = 4;
const ATTR_KEYPOINTS: usize = 5;
const KEYPOINT_COMPONENTS: usize = 3;

/// 手部模型的关键点数量
pub const HAND_KEYPOINT_NUM: usize = 21;

/// 关键点特征在属性轴上的排列方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum KeypointLayout {
  /// 每个关键点连续三个属性：`5 + 3k + c`
  #[default]
  Interleaved,
  /// 三组各 K 个属性，依次为全部 x、全部 y、全部可见度：`5 + cK + k`
  Planar,
  /// 每个关键点只读一个属性：`5 + k`
  Scalar,
}

impl KeypointLayout {
  /// 关键点 `keypoint` 的第 `component` 个分量所在的属性下标
  fn attribute(self, keypoint: usize, component: usize, count: usize) -> usize {
    match self {
      KeypointLayout::Interleaved => ATTR_KEYPOINTS + KEYPOINT_COMPONENTS * keypoint + component,
      KeypointLayout::Planar => ATTR_KEYPOINTS + component * count + keypoint,
      KeypointLayout::Scalar => ATTR_KEYPOINTS + keypoint,
    }
  }

  fn components(self) -> usize {
    match self {
      KeypointLayout::Scalar => 1,
      _ => KEYPOINT_COMPONENTS,
    }
  }

  pub fn feature_len(self, count: usize) -> usize {
    self.components().saturating_mul(count)
  }
}

impl fmt::Display for KeypointLayout {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      KeypointLayout::Interleaved => "interleaved",
      KeypointLayout::Planar => "planar",
      KeypointLayout::Scalar => "scalar",
    };
    f.write_str(name)
  }
}

impl FromStr for KeypointLayout {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "interleaved" => Ok(KeypointLayout::Interleaved),
      "planar" => Ok(KeypointLayout::Planar),
      "scalar" => Ok(KeypointLayout::Scalar),
      other => Err(format!(
        "未知的关键点排列方式 '{}', 可选 interleaved / planar / scalar",
        other
      )),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecoderConfig {
  pub min_confidence: f32,
  pub keypoint_count: usize,
  pub layout: KeypointLayout,
}

impl Default for DecoderConfig {
  fn default() -> Self {
    Self {
      min_confidence: 0.0,
      keypoint_count: HAND_KEYPOINT_NUM,
      layout: KeypointLayout::default(),
    }
  }
}

impl DecoderConfig {
  pub fn min_confidence(mut self, min_confidence: f32) -> Self {
    self.min_confidence = min_confidence;
    self
  }

  pub fn keypoint_count(mut self, keypoint_count: usize) -> Self {
    self.keypoint_count = keypoint_count;
    self
  }

  pub fn layout(mut self, layout: KeypointLayout) -> Self {
    self.layout = layout;
    self
  }

  /// 输出张量至少需要的属性数量：`5 + 3K`
  ///
  /// 溢出时为 `usize::MAX`，任何张量都无法满足。
  pub fn required_attributes(&self) -> usize {
    KEYPOINT_COMPONENTS
      .checked_mul(self.keypoint_count)
      .and_then(|len| len.checked_add(ATTR_KEYPOINTS))
      .unwrap_or(usize::MAX)
  }
}

/// 中心点表示的边界框，坐标位于模型输出空间
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PredictionBox {
  pub x: f32,
  pub y: f32,
  pub width: f32,
  pub height: f32,
}

impl PredictionBox {
  /// 左上角坐标与宽高 `[x - w/2, y - h/2, w, h]`
  pub fn to_ltwh(&self) -> [f32; 4] {
    [
      self.x - self.width / 2.0,
      self.y - self.height / 2.0,
      self.width,
      self.height,
    ]
  }

  /// `[x_min, y_min, x_max, y_max]`
  pub fn to_xyxy(&self) -> [f32; 4] {
    let [left, top, w, h] = self.to_ltwh();
    [left, top, left + w, top + h]
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Keypoint {
  pub x: f32,
  pub y: f32,
  pub visibility: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Detection {
  /// 候选框下标（输出张量的列）
  pub index: usize,
  pub bbox: PredictionBox,
  pub confidence: f32,
  pub keypoint_count: usize,
  pub layout: KeypointLayout,
  /// 三分量排列时按 (x, y, 可见度) 交错存放，长度 3K；`Scalar` 时为原始的 K 个值
  pub features: Box<[f32]>,
}

impl Detection {
  /// 逐个关键点迭代；`Scalar` 排列下没有完整的三元组，迭代为空
  pub fn keypoints(&self) -> impl Iterator<Item = Keypoint> + '_ {
    let features: &[f32] = match self.layout {
      KeypointLayout::Scalar => &[],
      _ => &self.features[..],
    };
    features
      .chunks_exact(KEYPOINT_COMPONENTS)
      .map(|kp| Keypoint {
        x: kp[0],
        y: kp[1],
        visibility: kp[2],
      })
  }
}

/// 选出分数不低于阈值的最高分候选框
///
/// 分数相同保留下标较小者；NaN 分数（以及 NaN 阈值）不会被选中。
pub fn select_best(tensor: &OutputTensor, min_confidence: f32) -> Option<(usize, f32)> {
  let mut best: Option<(usize, f32)> = None;

  for b in 0..tensor.num_boxes() {
    let score = tensor.value_at(ATTR_SCORE, b);
    // 对 NaN 比较结果为 false
    if !(score >= min_confidence) {
      continue;
    }
    match best {
      Some((_, best_score)) if score <= best_score => {}
      _ => best = Some((b, score)),
    }
  }

  best
}

#[derive(Debug, Clone, Default)]
pub struct DetectionDecoder {
  config: DecoderConfig,
}

impl DetectionDecoder {
  pub fn new(config: DecoderConfig) -> Self {
    Self { config }
  }

  pub fn config(&self) -> &DecoderConfig {
    &self.config
  }

  /// 从输出张量中取出唯一的最佳检测
  ///
  /// 没有候选框达到阈值时返回 `Ok(None)`，这不是错误。
  pub fn decode(&self, tensor: &OutputTensor) -> Result<Option<Detection>, ShapeMismatch> {
    let required = self.config.required_attributes();
    if tensor.num_attributes() < required {
      return Err(ShapeMismatch::Attributes {
        required,
        actual: tensor.num_attributes(),
      });
    }

    let Some((index, confidence)) = select_best(tensor, self.config.min_confidence) else {
      debug!(
        "{} 个候选框中没有分数不低于 {} 的检测",
        tensor.num_boxes(),
        self.config.min_confidence
      );
      return Ok(None);
    };

    let bbox = PredictionBox {
      x: tensor.value_at(ATTR_CX, index),
      y: tensor.value_at(ATTR_CY, index),
      width: tensor.value_at(ATTR_W, index),
      height: tensor.value_at(ATTR_H, index),
    };

    let count = self.config.keypoint_count;
    let layout = self.config.layout;
    let mut features = Vec::with_capacity(layout.feature_len(count));
    for k in 0..count {
      for c in 0..layout.components() {
        features.push(tensor.value_at(layout.attribute(k, c, count), index));
      }
    }

    debug!(
      "最佳检测: 下标 {}, 置信度 {:.4}, 边界框 {:?}",
      index, confidence, bbox
    );

    Ok(Some(Detection {
      index,
      bbox,
      confidence,
      keypoint_count: count,
      layout,
      features: features.into_boxed_slice(),
    }))
  }
}
