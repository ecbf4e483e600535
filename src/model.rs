// 该文件是 Yinyue （音乐手势） 项目的一部分。
// src/model.rs - 模型
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

use std::collections::HashMap;

use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::{
  FromUrl,
  decoder::{DecoderConfig, Detection, DetectionDecoder, KeypointLayout},
  encoder::encode_frame,
  frame::{AsRgbaFrame, ShapeMismatch},
  tensor::OutputTensor,
};

pub trait Model {
  type Input;
  type Output;
  type Error;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error>;
  fn postprocess(&self, output: OutputMap) -> Result<Self::Output, Self::Error>;
}

/// 推理算子的输入：单个命名张量
#[derive(Debug, Clone, Copy)]
pub struct TensorFeed<'a> {
  pub name: &'a str,
  pub data: &'a [f32],
  pub shape: [usize; 4],
}

/// 推理结果，按输出名称索引
#[derive(Debug, Clone, Default)]
pub struct OutputMap {
  tensors: HashMap<String, OutputTensor>,
}

impl OutputMap {
  pub fn insert(&mut self, name: impl Into<String>, tensor: OutputTensor) {
    self.tensors.insert(name.into(), tensor);
  }

  pub fn get(&self, name: &OutputName) -> Option<&OutputTensor> {
    self.tensors.get(name.as_str())
  }

  pub fn take(&mut self, name: &OutputName) -> Option<OutputTensor> {
    self.tensors.remove(name.as_str())
  }

  pub fn len(&self) -> usize {
    self.tensors.len()
  }

  pub fn is_empty(&self) -> bool {
    self.tensors.is_empty()
  }
}

impl<S: Into<String>> FromIterator<(S, OutputTensor)> for OutputMap {
  fn from_iter<I: IntoIterator<Item = (S, OutputTensor)>>(iter: I) -> Self {
    Self {
      tensors: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
    }
  }
}

/// 不透明的推理算子：张量进，张量出
pub trait Session {
  type Error: std::error::Error + Send + Sync + 'static;

  /// 模型声明的输入名称
  fn input_names(&self) -> &[String];
  /// 模型声明的输出名称
  fn output_names(&self) -> &[String];
  fn run(&self, feed: TensorFeed<'_>) -> Result<OutputMap, Self::Error>;
}

/// 加载模型时确定的输入名称
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputName(String);

impl InputName {
  pub fn resolve<S: Session>(session: &S) -> Result<Self, ModelError> {
    session
      .input_names()
      .first()
      .map(|name| InputName(name.clone()))
      .ok_or(ModelError::MissingInput)
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

/// 加载模型时确定的输出名称，取模型声明的第一个输出
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputName(String);

impl OutputName {
  pub fn resolve<S: Session>(session: &S) -> Result<Self, ModelError> {
    session
      .output_names()
      .first()
      .map(|name| OutputName(name.clone()))
      .ok_or(ModelError::MissingOutput)
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

#[derive(Error, Debug)]
pub enum ModelError {
  #[error("形状不匹配: {0}")]
  Shape(#[from] ShapeMismatch),
  #[error("模型没有声明输入")]
  MissingInput,
  #[error("模型没有声明输出")]
  MissingOutput,
  #[error("推理结果中缺少输出张量 '{0}'")]
  OutputNotFound(String),
  #[error("推理错误: {0}")]
  Session(#[source] Box<dyn std::error::Error + Send + Sync>),
  #[error("模型参数 '{0}' 无效: {1}")]
  InvalidParameter(String, String),
}

/// 单手关键点检测模型
///
/// 持有调用方加载好的推理会话，输入、输出名称在构建时解析一次。
pub struct HandPose<S, Frame, const W: u32, const H: u32> {
  session: S,
  input: InputName,
  output: OutputName,
  decoder: DetectionDecoder,
  _phantom: std::marker::PhantomData<Frame>,
}

#[derive(Debug, Clone, Default)]
pub struct HandPoseBuilder {
  config: DecoderConfig,
}

/// 解码参数来自模型 URL 的查询串，例如
/// `recorded:///tmp/out.json?min_confidence=0.5&keypoints=21&layout=interleaved`。
/// URL 方案属于推理会话，这里不检查。
impl FromUrl for HandPoseBuilder {
  type Error = ModelError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    let mut config = DecoderConfig::default();
    for (k, v) in url.query_pairs() {
      match &*k {
        "min_confidence" => {
          let value = v
            .parse::<f32>()
            .map_err(|e| ModelError::InvalidParameter(k.to_string(), e.to_string()))?;
          config = config.min_confidence(value);
        }
        "keypoints" => {
          let value = v
            .parse::<usize>()
            .map_err(|e| ModelError::InvalidParameter(k.to_string(), e.to_string()))?;
          config = config.keypoint_count(value);
        }
        "layout" => {
          let value = v
            .parse::<KeypointLayout>()
            .map_err(|e| ModelError::InvalidParameter(k.to_string(), e))?;
          config = config.layout(value);
        }
        _ => {}
      }
    }
    debug!("模型解码参数: {:?}", config);
    Ok(HandPoseBuilder { config })
  }
}

impl HandPoseBuilder {
  pub fn config(mut self, config: DecoderConfig) -> Self {
    self.config = config;
    self
  }

  pub fn decoder_config(&self) -> &DecoderConfig {
    &self.config
  }

  pub fn min_confidence(mut self, min_confidence: f32) -> Self {
    self.config = self.config.min_confidence(min_confidence);
    self
  }

  pub fn keypoint_count(mut self, keypoint_count: usize) -> Self {
    self.config = self.config.keypoint_count(keypoint_count);
    self
  }

  pub fn layout(mut self, layout: KeypointLayout) -> Self {
    self.config = self.config.layout(layout);
    self
  }

  pub fn build<S: Session, Frame, const W: u32, const H: u32>(
    self,
    session: S,
  ) -> Result<HandPose<S, Frame, W, H>, ModelError> {
    let input = InputName::resolve(&session)?;
    let output = OutputName::resolve(&session)?;
    info!(
      "模型就绪: 输入 '{}', 输出 '{}', 输入尺寸 {}x{}",
      input.as_str(),
      output.as_str(),
      W,
      H
    );
    debug!(
      "关键点数量 {}, 排列方式 {}, 置信度阈值 {}",
      self.config.keypoint_count, self.config.layout, self.config.min_confidence
    );

    Ok(HandPose {
      session,
      input,
      output,
      decoder: DetectionDecoder::new(self.config),
      _phantom: std::marker::PhantomData,
    })
  }
}

impl<S, Frame, const W: u32, const H: u32> HandPose<S, Frame, W, H> {
  pub fn session(&self) -> &S {
    &self.session
  }

  pub fn input_name(&self) -> &InputName {
    &self.input
  }

  pub fn output_name(&self) -> &OutputName {
    &self.output
  }

  pub fn decoder(&self) -> &DetectionDecoder {
    &self.decoder
  }
}

impl<S: Session, Frame: AsRgbaFrame<W, H>, const W: u32, const H: u32> Model
  for HandPose<S, Frame, W, H>
{
  type Input = Frame;
  type Output = Option<Detection>;
  type Error = ModelError;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    let tensor = encode_frame::<W, H, Frame>(input);

    debug!("执行模型推理");
    let feed = TensorFeed {
      name: self.input.as_str(),
      data: tensor.as_slice(),
      shape: tensor.shape(),
    };
    let output = self
      .session
      .run(feed)
      .map_err(|e| ModelError::Session(Box::new(e)))?;

    self.postprocess(output)
  }

  fn postprocess(&self, mut output: OutputMap) -> Result<Self::Output, Self::Error> {
    debug!("后处理模型输出");
    let tensor = output
      .take(&self.output)
      .ok_or_else(|| ModelError::OutputNotFound(self.output.as_str().to_string()))?;
    debug!("输出张量维度: {:?}", tensor.dims());

    Ok(self.decoder.decode(&tensor)?)
  }
}

mod recorded;
pub use self::recorded::{RecordedSession, RecordedSessionError};
