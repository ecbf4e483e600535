// 该文件是 Yinyue （音乐手势） 项目的一部分。
// src/encoder.rs - 帧编码：RGBA 交错像素转 NCHW 归一化张量
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

use crate::frame::{AsRgbaFrame, RGBA_CHANNELS, ShapeMismatch, check_rgba_len};

pub const RGB_CHANNELS: usize = 3;
const PIXEL_SCALE: f32 = 255.0;

/// 模型输入张量，逻辑形状为 `[1, 3, H, W]`，通道顺序 R、G、B
#[derive(Debug, Clone)]
pub struct NchwTensor<const W: u32, const H: u32> {
  data: Box<[f32]>,
}

impl<const W: u32, const H: u32> NchwTensor<W, H> {
  pub fn shape(&self) -> [usize; 4] {
    [1, RGB_CHANNELS, H as usize, W as usize]
  }

  pub fn len(&self) -> usize {
    self.data.len()
  }

  pub fn is_empty(&self) -> bool {
    self.data.is_empty()
  }

  pub fn as_slice(&self) -> &[f32] {
    &self.data
  }

  /// 单个通道平面，`c` 依次为 0 (R)、1 (G)、2 (B)
  pub fn channel(&self, c: usize) -> Option<&[f32]> {
    let plane = W as usize * H as usize;
    self.data.get(c * plane..(c + 1) * plane)
  }

  pub fn into_inner(self) -> Box<[f32]> {
    self.data
  }
}

/// 将 RGBA 交错的像素缓冲区编码为平面的归一化张量
///
/// 像素按扫描顺序拆分到 R、G、B 三个平面，丢弃 alpha，
/// 三个平面依次拼接后每个值除以 255。不做缩放或填充。
pub fn encode<const W: u32, const H: u32>(
  pixels: &[u8],
) -> Result<NchwTensor<W, H>, ShapeMismatch> {
  check_rgba_len::<W, H>(pixels.len())?;
  Ok(planarize(pixels))
}

/// 编码一个已经通过长度校验的帧
pub fn encode_frame<const W: u32, const H: u32, F: AsRgbaFrame<W, H>>(
  frame: &F,
) -> NchwTensor<W, H> {
  planarize(frame.as_rgba())
}

fn planarize<const W: u32, const H: u32>(pixels: &[u8]) -> NchwTensor<W, H> {
  let plane = W as usize * H as usize;
  let mut data = vec![0f32; RGB_CHANNELS * plane];

  let (red, rest) = data.split_at_mut(plane);
  let (green, blue) = rest.split_at_mut(plane);

  for (idx, px) in pixels.chunks_exact(RGBA_CHANNELS).enumerate() {
    red[idx] = px[0] as f32 / PIXEL_SCALE;
    green[idx] = px[1] as f32 / PIXEL_SCALE;
    blue[idx] = px[2] as f32 / PIXEL_SCALE;
  }

  NchwTensor {
    data: data.into_boxed_slice(),
  }
}
