// 该文件是 Yinyue （音乐手势） 项目的一部分。
// src/frame.rs - RGBA 帧定义
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

use thiserror::Error;

pub const RGBA_CHANNELS: usize = 4;

/// 输入或输出缓冲区与声明的形状不一致
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShapeMismatch {
  #[error("像素缓冲区长度 {len} 不是 4 的倍数")]
  PixelStride { len: usize },
  #[error("数据长度不匹配: 期望长度 {expected}, 实际长度 {actual}")]
  Length { expected: usize, actual: usize },
  #[error("输出张量维度无效: {dims:?}, 期望 [1, A, B]")]
  Rank { dims: Vec<i64> },
  #[error("输出张量属性数量不足: 至少需要 {required}, 实际为 {actual}")]
  Attributes { required: usize, actual: usize },
}

/// 按行优先、RGBA 交错排列的像素数据
pub trait AsRgbaFrame<const W: u32, const H: u32> {
  fn as_rgba(&self) -> &[u8];
}

pub(crate) fn check_rgba_len<const W: u32, const H: u32>(len: usize) -> Result<(), ShapeMismatch> {
  if len % RGBA_CHANNELS != 0 {
    return Err(ShapeMismatch::PixelStride { len });
  }
  let expected = RGBA_CHANNELS * W as usize * H as usize;
  if len != expected {
    return Err(ShapeMismatch::Length {
      expected,
      actual: len,
    });
  }
  Ok(())
}

/// 自有的 RGBA 帧，长度固定为 `4 × W × H`
#[derive(Debug, Clone)]
pub struct RgbaFrame<const W: u32, const H: u32> {
  data: Box<[u8]>,
}

impl<const W: u32, const H: u32> TryFrom<Vec<u8>> for RgbaFrame<W, H> {
  type Error = ShapeMismatch;

  fn try_from(data: Vec<u8>) -> Result<Self, Self::Error> {
    check_rgba_len::<W, H>(data.len())?;
    Ok(Self {
      data: data.into_boxed_slice(),
    })
  }
}

impl<const W: u32, const H: u32> Default for RgbaFrame<W, H> {
  fn default() -> Self {
    let size = RGBA_CHANNELS * (W as usize) * (H as usize);
    let data = vec![0u8; size].into_boxed_slice();
    Self { data }
  }
}

impl<const W: u32, const H: u32> RgbaFrame<W, H> {
  /// 每个像素填充同一个 RGBA 值
  pub fn filled(pixel: [u8; 4]) -> Self {
    let data = pixel.repeat(W as usize * H as usize).into_boxed_slice();
    Self { data }
  }

  pub fn height(&self) -> usize {
    H as usize
  }

  pub fn width(&self) -> usize {
    W as usize
  }

  pub fn channels(&self) -> usize {
    RGBA_CHANNELS
  }

  /// 读取 (x, y) 处的像素，越界返回 None
  pub fn pixel(&self, x: usize, y: usize) -> Option<[u8; 4]> {
    if x >= self.width() || y >= self.height() {
      return None;
    }
    let idx = (y * self.width() + x) * RGBA_CHANNELS;
    let px = &self.data[idx..idx + RGBA_CHANNELS];
    Some([px[0], px[1], px[2], px[3]])
  }

  pub fn into_inner(self) -> Box<[u8]> {
    self.data
  }
}

impl<const W: u32, const H: u32> AsMut<[u8]> for RgbaFrame<W, H> {
  fn as_mut(&mut self) -> &mut [u8] {
    &mut self.data
  }
}

impl<const W: u32, const H: u32> AsRgbaFrame<W, H> for RgbaFrame<W, H> {
  fn as_rgba(&self) -> &[u8] {
    &self.data
  }
}

/// 借用外部缓冲区的只读 RGBA 帧视图
#[derive(Debug, Clone, Copy)]
pub struct RgbaFrameRef<'a, const W: u32, const H: u32> {
  data: &'a [u8],
}

impl<'a, const W: u32, const H: u32> TryFrom<&'a [u8]> for RgbaFrameRef<'a, W, H> {
  type Error = ShapeMismatch;

  fn try_from(data: &'a [u8]) -> Result<Self, Self::Error> {
    check_rgba_len::<W, H>(data.len())?;
    Ok(Self { data })
  }
}

impl<const W: u32, const H: u32> RgbaFrameRef<'_, W, H> {
  pub fn to_owned_frame(&self) -> RgbaFrame<W, H> {
    RgbaFrame {
      data: self.data.into(),
    }
  }
}

impl<const W: u32, const H: u32> AsRgbaFrame<W, H> for RgbaFrameRef<'_, W, H> {
  fn as_rgba(&self) -> &[u8] {
    self.data
  }
}
