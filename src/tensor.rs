// 该文件是 Yinyue （音乐手势） 项目的一部分。
// src/tensor.rs - 模型输出张量
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

use crate::frame::ShapeMismatch;

/// 模型输出张量，形状为 `[1, A, B]`
///
/// A 为每个候选框的属性数量，B 为候选框数量。数据按属性优先排列：
/// 属性 `a`、候选框 `b` 的值位于 `a × B + b`。
#[derive(Debug, Clone, PartialEq)]
pub struct OutputTensor {
  data: Box<[f32]>,
  attributes: usize,
  boxes: usize,
}

impl OutputTensor {
  pub fn new(data: Vec<f32>, dims: &[usize]) -> Result<Self, ShapeMismatch> {
    let &[batch, attributes, boxes] = dims else {
      return Err(ShapeMismatch::Rank {
        dims: dims.iter().map(|&d| d as i64).collect(),
      });
    };
    if batch != 1 {
      return Err(ShapeMismatch::Rank {
        dims: dims.iter().map(|&d| d as i64).collect(),
      });
    }

    let expected = attributes
      .checked_mul(boxes)
      .ok_or_else(|| ShapeMismatch::Rank {
        dims: dims.iter().map(|&d| d as i64).collect(),
      })?;
    if data.len() != expected {
      return Err(ShapeMismatch::Length {
        expected,
        actual: data.len(),
      });
    }

    Ok(Self {
      data: data.into_boxed_slice(),
      attributes,
      boxes,
    })
  }

  /// ONNX 风格的有符号维度，负数（动态维度）视为无效
  pub fn from_signed_dims(data: Vec<f32>, dims: &[i64]) -> Result<Self, ShapeMismatch> {
    let dims = dims
      .iter()
      .map(|&d| usize::try_from(d))
      .collect::<Result<Vec<_>, _>>()
      .map_err(|_| ShapeMismatch::Rank {
        dims: dims.to_vec(),
      })?;
    Self::new(data, &dims)
  }

  pub fn dims(&self) -> [usize; 3] {
    [1, self.attributes, self.boxes]
  }

  pub fn num_attributes(&self) -> usize {
    self.attributes
  }

  pub fn num_boxes(&self) -> usize {
    self.boxes
  }

  /// 属性 `attribute`、候选框 `box_index` 在扁平数组中的位置
  #[inline]
  pub fn offset(&self, attribute: usize, box_index: usize) -> usize {
    attribute * self.boxes + box_index
  }

  /// 读取属性 `attribute`、候选框 `box_index` 处的值
  ///
  /// # Panics
  ///
  /// 索引超出 `[0, A) × [0, B)` 时 panic。
  #[inline]
  pub fn value_at(&self, attribute: usize, box_index: usize) -> f32 {
    debug_assert!(attribute < self.attributes && box_index < self.boxes);
    self.data[self.offset(attribute, box_index)]
  }

  pub fn get(&self, attribute: usize, box_index: usize) -> Option<f32> {
    if attribute < self.attributes && box_index < self.boxes {
      Some(self.value_at(attribute, box_index))
    } else {
      None
    }
  }

  pub fn as_slice(&self) -> &[f32] {
    &self.data
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn indexed(attributes: usize, boxes: usize) -> OutputTensor {
    let mut data = vec![0f32; attributes * boxes];
    for a in 0..attributes {
      for b in 0..boxes {
        data[a * boxes + b] = (a * 100 + b) as f32;
      }
    }
    OutputTensor::new(data, &[1, attributes, boxes]).unwrap()
  }

  #[test]
  fn addressing_is_attribute_major() {
    let tensor = indexed(7, 5);
    for a in 0..7 {
      for b in 0..5 {
        assert_eq!(tensor.offset(a, b), a * 5 + b);
        assert_eq!(tensor.value_at(a, b), (a * 100 + b) as f32);
      }
    }
    assert_eq!(tensor.get(7, 0), None);
    assert_eq!(tensor.get(0, 5), None);
  }

  #[test]
  fn rejects_bad_rank_and_batch() {
    assert!(matches!(
      OutputTensor::new(vec![0.0; 4], &[4]),
      Err(ShapeMismatch::Rank { .. })
    ));
    assert!(matches!(
      OutputTensor::new(vec![0.0; 4], &[1, 1, 2, 2]),
      Err(ShapeMismatch::Rank { .. })
    ));
    assert!(matches!(
      OutputTensor::new(vec![0.0; 4], &[2, 1, 2]),
      Err(ShapeMismatch::Rank { .. })
    ));
  }

  #[test]
  fn rejects_box_count_inconsistent_with_length() {
    // dims[2] 必须等于 len / dims[1]
    assert_eq!(
      OutputTensor::new(vec![0.0; 10], &[1, 5, 3]),
      Err(ShapeMismatch::Length {
        expected: 15,
        actual: 10
      })
    );
  }

  #[test]
  fn zero_boxes_is_a_valid_shape() {
    let tensor = OutputTensor::new(Vec::new(), &[1, 68, 0]).unwrap();
    assert_eq!(tensor.dims(), [1, 68, 0]);
    assert_eq!(tensor.num_boxes(), 0);
  }

  #[test]
  fn signed_dims_reject_dynamic_axes() {
    assert!(OutputTensor::from_signed_dims(vec![0.0; 6], &[1, 3, 2]).is_ok());
    assert_eq!(
      OutputTensor::from_signed_dims(vec![0.0; 6], &[1, -1, 2]),
      Err(ShapeMismatch::Rank {
        dims: vec![1, -1, 2]
      })
    );
  }
}
