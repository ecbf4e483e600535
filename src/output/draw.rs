// 该文件是 Yinyue （音乐手势） 项目的一部分。
// src/output/draw.rs - 手部检测结果可视化
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

use image::{ImageBuffer, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_hollow_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect;

use crate::{
  decoder::{Detection, HAND_KEYPOINT_NUM, Keypoint},
  frame::RgbaFrame,
};

const BOX_COLOR: [u8; 3] = [0, 0, 255]; // 蓝色
const KEYPOINT_COLOR: [u8; 3] = [255, 0, 0];
const SKELETON_COLOR: [u8; 3] = [0, 255, 0];
const KEYPOINT_RADIUS: i32 = 3;
const MIN_VISIBILITY: f32 = 0.5;

/// 21 点手部关键点的连线：手掌一圈，再加五根手指
///
/// 0 为手腕，1-4 拇指，5-8 食指，9-12 中指，13-16 无名指，17-20 小指。
const HAND_SKELETON: [(usize, usize); 21] = [
  (0, 1),
  (1, 5),
  (5, 9),
  (9, 13),
  (13, 17),
  (17, 0),
  (1, 2),
  (2, 3),
  (3, 4),
  (5, 6),
  (6, 7),
  (7, 8),
  (9, 10),
  (10, 11),
  (11, 12),
  (13, 14),
  (14, 15),
  (15, 16),
  (17, 18),
  (18, 19),
  (19, 20),
];

pub trait ToRgbImage {
  fn to_rgb_image(&self) -> RgbImage;
}

impl<const W: u32, const H: u32> ToRgbImage for RgbaFrame<W, H> {
  fn to_rgb_image(&self) -> RgbImage {
    // 丢弃 Alpha 通道
    ImageBuffer::from_fn(W, H, |x, y| {
      let [r, g, b, _] = self
        .pixel(x as usize, y as usize)
        .unwrap_or([0, 0, 0, 0]);
      Rgb([r, g, b])
    })
  }
}

pub struct Draw {
  box_color: [u8; 3],
  keypoint_color: [u8; 3],
  skeleton_color: [u8; 3],
  keypoint_radius: i32,
  min_visibility: f32,
}

impl Default for Draw {
  fn default() -> Self {
    Self {
      box_color: BOX_COLOR,
      keypoint_color: KEYPOINT_COLOR,
      skeleton_color: SKELETON_COLOR,
      keypoint_radius: KEYPOINT_RADIUS,
      min_visibility: MIN_VISIBILITY,
    }
  }
}

impl Draw {
  /// 边框位于 `(x - w/2, y - h/2)`，宽高为 `w × h`，超出图像的部分裁掉
  fn draw_bbox(&self, image: &mut RgbImage, detection: &Detection) {
    let (w, h) = (image.width() as f32, image.height() as f32);
    let [left, top, right, bottom] = detection.bbox.to_xyxy();

    // 右、下边界不含在框内
    let x_min = left.round().clamp(0.0, w - 1.0);
    let y_min = top.round().clamp(0.0, h - 1.0);
    let x_max = (right.round() - 1.0).clamp(0.0, w - 1.0);
    let y_max = (bottom.round() - 1.0).clamp(0.0, h - 1.0);

    // NaN 比较结果为 false，同样跳过
    if !(x_min < x_max && y_min < y_max) {
      return;
    }

    let rect = Rect::at(x_min as i32, y_min as i32)
      .of_size((x_max - x_min) as u32 + 1, (y_max - y_min) as u32 + 1);
    draw_hollow_rect_mut(image, rect, Rgb(self.box_color));
  }

  /// 可见且落在图像内的关键点
  fn is_drawable(&self, image: &RgbImage, keypoint: &Keypoint) -> bool {
    let (w, h) = (image.width() as f32, image.height() as f32);
    keypoint.visibility >= self.min_visibility
      && (0.0..w).contains(&keypoint.x)
      && (0.0..h).contains(&keypoint.y)
  }

  fn draw_keypoints(&self, image: &mut RgbImage, keypoints: &[Keypoint]) {
    if keypoints.len() == HAND_KEYPOINT_NUM {
      for (a, b) in HAND_SKELETON {
        let (a, b) = (&keypoints[a], &keypoints[b]);
        if self.is_drawable(image, a) && self.is_drawable(image, b) {
          draw_line_segment_mut(image, (a.x, a.y), (b.x, b.y), Rgb(self.skeleton_color));
        }
      }
    }

    for keypoint in keypoints {
      if !self.is_drawable(image, keypoint) {
        continue;
      }
      draw_filled_circle_mut(
        image,
        (keypoint.x.round() as i32, keypoint.y.round() as i32),
        self.keypoint_radius,
        Rgb(self.keypoint_color),
      );
    }
  }

  pub fn draw_detection_on_image(&self, image: &mut RgbImage, detection: &Detection) {
    self.draw_bbox(image, detection);
    let keypoints: Vec<Keypoint> = detection.keypoints().collect();
    self.draw_keypoints(image, &keypoints);
  }

  pub fn draw_detection<F: ToRgbImage>(&self, frame: &F, result: &Option<Detection>) -> RgbImage {
    let mut image = frame.to_rgb_image();
    if let Some(detection) = result {
      self.draw_detection_on_image(&mut image, detection);
    }
    image
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::decoder::{KeypointLayout, PredictionBox};

  fn detection(bbox: PredictionBox, features: Vec<f32>, layout: KeypointLayout) -> Detection {
    let keypoint_count = match layout {
      KeypointLayout::Scalar => features.len(),
      _ => features.len() / 3,
    };
    Detection {
      index: 0,
      bbox,
      confidence: 0.9,
      keypoint_count,
      layout,
      features: features.into_boxed_slice(),
    }
  }

  #[test]
  fn frame_drops_alpha() {
    let frame = RgbaFrame::<2, 2>::filled([1, 2, 3, 4]);
    let image = frame.to_rgb_image();
    assert_eq!(image.dimensions(), (2, 2));
    assert_eq!(image.get_pixel(1, 1), &Rgb([1, 2, 3]));
  }

  #[test]
  fn box_is_drawn_from_its_top_left_corner() {
    let frame = RgbaFrame::<32, 32>::default();
    let bbox = PredictionBox {
      x: 16.0,
      y: 16.0,
      width: 10.0,
      height: 8.0,
    };
    let image = Draw::default().draw_detection(
      &frame,
      &Some(detection(bbox, Vec::new(), KeypointLayout::Interleaved)),
    );

    assert_eq!(image.get_pixel(11, 12), &Rgb(BOX_COLOR));
    assert_eq!(image.get_pixel(20, 19), &Rgb(BOX_COLOR));
    // 框内部不填充
    assert_eq!(image.get_pixel(16, 16), &Rgb([0, 0, 0]));
  }

  #[test]
  fn oversized_box_is_clamped_to_the_image() {
    let frame = RgbaFrame::<64, 64>::default();
    let bbox = PredictionBox {
      x: 320.0,
      y: 320.0,
      width: 1e10,
      height: 1e10,
    };
    let image = Draw::default().draw_detection(
      &frame,
      &Some(detection(bbox, Vec::new(), KeypointLayout::Interleaved)),
    );

    assert_eq!(image.get_pixel(0, 0), &Rgb(BOX_COLOR));
    assert_eq!(image.get_pixel(63, 63), &Rgb(BOX_COLOR));
    assert_eq!(image.get_pixel(32, 32), &Rgb([0, 0, 0]));
  }

  #[test]
  fn box_outside_the_image_is_skipped() {
    let frame = RgbaFrame::<16, 16>::default();
    let draw = Draw::default();
    for bbox in [
      PredictionBox {
        x: -100.0,
        y: 8.0,
        width: 10.0,
        height: 10.0,
      },
      PredictionBox {
        x: f32::NAN,
        y: 8.0,
        width: 4.0,
        height: 4.0,
      },
    ] {
      let image = draw.draw_detection(
        &frame,
        &Some(detection(bbox, Vec::new(), KeypointLayout::Interleaved)),
      );
      assert!(image.pixels().all(|p| *p == Rgb([0, 0, 0])));
    }
  }

  #[test]
  fn only_visible_keypoints_are_drawn() {
    let frame = RgbaFrame::<32, 32>::default();
    let bbox = PredictionBox {
      x: 0.0,
      y: 0.0,
      width: 0.0,
      height: 0.0,
    };
    let features = vec![8.0, 8.0, 0.9, 24.0, 24.0, 0.1];
    let image = Draw::default().draw_detection(
      &frame,
      &Some(detection(bbox, features, KeypointLayout::Interleaved)),
    );

    assert_eq!(image.get_pixel(8, 8), &Rgb(KEYPOINT_COLOR));
    assert_eq!(image.get_pixel(24, 24), &Rgb([0, 0, 0]));
  }

  #[test]
  fn keypoints_outside_the_image_are_skipped() {
    let frame = RgbaFrame::<32, 32>::default();
    let bbox = PredictionBox {
      x: 0.0,
      y: 0.0,
      width: 0.0,
      height: 0.0,
    };
    // 21 个关键点，除手腕外都在图像外，连线同样跳过
    let mut features = vec![8.0, 8.0, 1.0];
    for _ in 1..HAND_KEYPOINT_NUM {
      features.extend([1e10, -1e10, 1.0]);
    }
    features[3] = f32::NAN;
    let image = Draw::default().draw_detection(
      &frame,
      &Some(detection(bbox, features, KeypointLayout::Interleaved)),
    );

    assert_eq!(image.get_pixel(8, 8), &Rgb(KEYPOINT_COLOR));
    assert!(!image.pixels().any(|p| *p == Rgb(SKELETON_COLOR)));
  }

  #[test]
  fn no_detection_leaves_frame_untouched() {
    let frame = RgbaFrame::<4, 4>::filled([7, 7, 7, 255]);
    let image = Draw::default().draw_detection(&frame, &None);
    assert!(image.pixels().all(|p| *p == Rgb([7, 7, 7])));
  }
}
