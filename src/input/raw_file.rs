// 该文件是 Yinyue （音乐手势） 项目的一部分。
// src/input/raw_file.rs - 原始 RGBA 像素文件输入
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
use tracing::{error, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::{RGBA_CHANNELS, RgbaFrame, ShapeMismatch},
};

#[derive(Error, Debug)]
pub enum RawFileInputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("文件长度与帧尺寸不符: {0}")]
  ShapeMismatch(#[from] ShapeMismatch),
}

/// 由若干个 `4 × W × H` 字节的 RGBA 帧首尾相接组成的文件，
/// 相当于逐帧读取画布像素得到的缓冲区。
pub struct RawFileInput<const W: u32, const H: u32> {
  data: Vec<u8>,
  offset: usize,
}

impl<const W: u32, const H: u32> FromUrlWithScheme for RawFileInput<W, H> {
  const SCHEME: &'static str = "raw";
}

impl<const W: u32, const H: u32> FromUrl for RawFileInput<W, H> {
  type Error = RawFileInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(RawFileInputError::SchemeMismatch);
    }

    let data = std::fs::read(url.path())?;
    let input = Self::from_bytes(data)?;
    info!(
      "读取原始像素文件: {}, 共 {} 帧",
      url.path(),
      input.remaining()
    );
    Ok(input)
  }
}

impl<const W: u32, const H: u32> RawFileInput<W, H> {
  const FRAME_LEN: usize = RGBA_CHANNELS * W as usize * H as usize;

  pub fn from_bytes(data: Vec<u8>) -> Result<Self, ShapeMismatch> {
    if data.len() % RGBA_CHANNELS != 0 {
      return Err(ShapeMismatch::PixelStride { len: data.len() });
    }
    if data.is_empty() || data.len() % Self::FRAME_LEN != 0 {
      let frames = data.len() / Self::FRAME_LEN;
      return Err(ShapeMismatch::Length {
        expected: (frames + 1) * Self::FRAME_LEN,
        actual: data.len(),
      });
    }
    Ok(Self { data, offset: 0 })
  }

  /// 尚未读取的帧数
  pub fn remaining(&self) -> usize {
    (self.data.len() - self.offset) / Self::FRAME_LEN
  }
}

impl<const W: u32, const H: u32> Iterator for RawFileInput<W, H> {
  type Item = RgbaFrame<W, H>;

  fn next(&mut self) -> Option<Self::Item> {
    let end = self.offset + Self::FRAME_LEN;
    let bytes = self.data.get(self.offset..end)?;
    self.offset = end;
    RgbaFrame::try_from(bytes.to_vec()).ok()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::frame::AsRgbaFrame;
  use std::io::Write;

  #[test]
  fn splits_file_into_frames() {
    let data: Vec<u8> = (0..32).collect();
    let mut input = RawFileInput::<2, 2>::from_bytes(data).unwrap();
    assert_eq!(input.remaining(), 2);

    let first = input.next().unwrap();
    assert_eq!(first.pixel(0, 0), Some([0, 1, 2, 3]));
    let second = input.next().unwrap();
    assert_eq!(second.as_rgba()[0], 16);
    assert!(input.next().is_none());
  }

  #[test]
  fn rejects_partial_frames() {
    assert_eq!(
      RawFileInput::<2, 2>::from_bytes(vec![0; 18]).err(),
      Some(ShapeMismatch::PixelStride { len: 18 })
    );
    assert_eq!(
      RawFileInput::<2, 2>::from_bytes(vec![0; 20]).err(),
      Some(ShapeMismatch::Length {
        expected: 32,
        actual: 20
      })
    );
    assert!(RawFileInput::<2, 2>::from_bytes(Vec::new()).is_err());
  }

  #[test]
  fn reads_from_url() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&[9u8; 16]).unwrap();
    let url = Url::parse(&format!("raw://{}", file.path().display())).unwrap();

    let frames: Vec<_> = RawFileInput::<2, 2>::from_url(&url).unwrap().collect();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].pixel(1, 1), Some([9, 9, 9, 9]));
  }
}
