// 该文件是 Yinyue （音乐手势） 项目的一部分。
// src/input/read_image_file.rs - 图像文件输入
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

use image::{ImageReader, RgbaImage, imageops::FilterType};
use thiserror::Error;
use tracing::{debug, error};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::{RgbaFrame, ShapeMismatch},
};

#[derive(Error, Debug)]
pub enum ImageFileInputError {
  #[error("URI schema mismatch")]
  SchemaMismatch,
  #[error("I/O error: {0}")]
  IoError(#[from] std::io::Error),
  #[error("Image loading error: {0}")]
  ImageLoadError(#[from] image::ImageError),
  #[error("Frame shape error: {0}")]
  ShapeMismatch(#[from] ShapeMismatch),
}

/// 单张图像文件，缩放到 `W × H` 后作为一帧 RGBA 输入
pub struct ImageFileInput<const W: u32, const H: u32> {
  frame: Option<RgbaFrame<W, H>>,
}

impl<const W: u32, const H: u32> FromUrlWithScheme for ImageFileInput<W, H> {
  const SCHEME: &'static str = "image";
}

impl<const W: u32, const H: u32> FromUrl for ImageFileInput<W, H> {
  type Error = ImageFileInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(ImageFileInputError::SchemaMismatch);
    }

    let image = ImageReader::open(url.path())?.decode()?.to_rgba8();
    Ok(ImageFileInput {
      frame: Some(Self::fit(image)?),
    })
  }
}

impl<const W: u32, const H: u32> ImageFileInput<W, H> {
  /// 与画布 drawImage 一致：直接拉伸到目标尺寸，不保持长宽比
  pub fn fit(image: RgbaImage) -> Result<RgbaFrame<W, H>, ShapeMismatch> {
    let image = if image.dimensions() == (W, H) {
      image
    } else {
      debug!(
        "缩放图像: {}x{} -> {}x{}",
        image.width(),
        image.height(),
        W,
        H
      );
      image::imageops::resize(&image, W, H, FilterType::Triangle)
    };
    RgbaFrame::try_from(image.into_raw())
  }
}

impl<const W: u32, const H: u32> Iterator for ImageFileInput<W, H> {
  type Item = RgbaFrame<W, H>;

  fn next(&mut self) -> Option<Self::Item> {
    self.frame.take()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::frame::AsRgbaFrame;
  use image::Rgba;

  #[test]
  fn image_is_stretched_to_frame_size() {
    let image = RgbaImage::from_pixel(8, 4, Rgba([10, 20, 30, 255]));
    let frame = ImageFileInput::<4, 4>::fit(image).unwrap();
    assert_eq!(frame.as_rgba().len(), 4 * 4 * 4);
    assert_eq!(frame.pixel(3, 3), Some([10, 20, 30, 255]));
  }

  #[test]
  fn reads_png_from_url() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("frame.png");
    RgbaImage::from_pixel(2, 2, Rgba([1, 2, 3, 255]))
      .save(&path)
      .unwrap();

    let url = Url::parse(&format!("image://{}", path.display())).unwrap();
    let frames: Vec<_> = ImageFileInput::<2, 2>::from_url(&url).unwrap().collect();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].pixel(0, 1), Some([1, 2, 3, 255]));
  }
}
