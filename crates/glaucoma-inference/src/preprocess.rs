//! OCT 图像预处理：解码 → RGB → 缩放 → 归一化到 [0,1]

use glaucoma_core::config::TensorLayout;
use glaucoma_core::{GlaucomaError, Result};
use image::imageops::FilterType;
use tract_onnx::prelude::tract_ndarray::Array4;

/// 模型输入形状（batch 固定为 1，三通道）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputShape {
    pub size: u32,
    pub layout: TensorLayout,
}

impl InputShape {
    pub const CHANNELS: usize = 3;

    pub fn new(size: u32, layout: TensorLayout) -> Self {
        Self { size, layout }
    }

    pub fn dims(&self) -> [usize; 4] {
        let side = self.size as usize;
        match self.layout {
            TensorLayout::Nhwc => [1, side, side, Self::CHANNELS],
            TensorLayout::Nchw => [1, Self::CHANNELS, side, side],
        }
    }
}

/// 将上传的图像字节转换为模型输入张量
pub fn prepare_image(bytes: &[u8], shape: InputShape) -> Result<Array4<f32>> {
    let decoded =
        image::load_from_memory(bytes).map_err(|e| GlaucomaError::InvalidImage(e.to_string()))?;

    let rgb = decoded
        .resize_exact(shape.size, shape.size, FilterType::Triangle)
        .to_rgb8();

    let mut tensor = Array4::<f32>::zeros(shape.dims());
    for (x, y, pixel) in rgb.enumerate_pixels() {
        let (x, y) = (x as usize, y as usize);
        for (c, value) in pixel.0.iter().enumerate() {
            let scaled = f32::from(*value) / 255.0;
            match shape.layout {
                TensorLayout::Nhwc => tensor[[0, y, x, c]] = scaled,
                TensorLayout::Nchw => tensor[[0, c, y, x]] = scaled,
            }
        }
    }

    Ok(tensor)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    /// 生成测试用图像（左白右黑）
    pub(crate) fn sample_image(format: ImageFormat) -> Vec<u8> {
        let img = RgbImage::from_fn(40, 30, |x, _| {
            if x < 20 {
                Rgb([255, 255, 255])
            } else {
                Rgb([0, 0, 0])
            }
        });
        let mut bytes = Cursor::new(Vec::new());
        img.write_to(&mut bytes, format).unwrap();
        bytes.into_inner()
    }

    #[test]
    fn test_nhwc_shape_and_range() {
        let shape = InputShape::new(16, TensorLayout::Nhwc);
        let tensor = prepare_image(&sample_image(ImageFormat::Png), shape).unwrap();

        assert_eq!(tensor.shape(), &[1, 16, 16, 3]);
        assert!(tensor.iter().all(|v| (0.0..=1.0).contains(v)));
        assert!((tensor[[0, 8, 0, 0]] - 1.0).abs() < 1e-6);
        assert!(tensor[[0, 8, 15, 2]].abs() < 1e-6);
    }

    #[test]
    fn test_nchw_layout() {
        let shape = InputShape::new(8, TensorLayout::Nchw);
        let tensor = prepare_image(&sample_image(ImageFormat::Jpeg), shape).unwrap();

        assert_eq!(tensor.shape(), &[1, 3, 8, 8]);
        assert!(tensor.iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn test_rejects_non_image_bytes() {
        let shape = InputShape::new(8, TensorLayout::Nhwc);
        let err = prepare_image(b"definitely not a png", shape).unwrap_err();
        assert!(matches!(err, GlaucomaError::InvalidImage(_)));
    }
}
