//! Image -> model input. The network was trained on 299x299 RGB scaled to
//! [0, 1] in NHWC layout, so that is exactly what comes out of here.

use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageError};
use ndarray::Array4;

pub const INPUT_SIZE: u32 = 299;
pub const CHANNELS: usize = 3;

/// (batch, height, width, channels)
pub type InputTensor = Array4<f32>;

pub const fn input_shape() -> (usize, usize, usize, usize) {
    (1, INPUT_SIZE as usize, INPUT_SIZE as usize, CHANNELS)
}

/// Decode uploaded bytes; the container format is sniffed from the content, not the file name.
pub fn decode(bytes: &[u8]) -> Result<DynamicImage, ImageError> {
    image::load_from_memory(bytes)
}

/// Drop alpha/palette, stretch to 299x299 with Lanczos3 (no crop, no padding),
/// scale to [0, 1] and add the leading batch axis.
pub fn preprocess(image: &DynamicImage) -> InputTensor {
    let rgb = image.to_rgb8();
    let resized = imageops::resize(&rgb, INPUT_SIZE, INPUT_SIZE, FilterType::Lanczos3);
    Array4::from_shape_fn(input_shape(), |(_, y, x, c)| {
        resized.get_pixel(x as u32, y as u32)[c] as f32 / 255.0
    })
}

/// All-zero tensor used to warm the model up at load time.
pub fn warmup_tensor() -> InputTensor { Array4::zeros(input_shape()) }

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, ImageBuffer, ImageFormat, Luma, Rgb, RgbImage, Rgba, RgbaImage};
    use std::io::Cursor;

    fn encode(img: DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), format).unwrap();
        buf
    }

    fn gradient(w: u32, h: u32) -> RgbImage {
        ImageBuffer::from_fn(w, h, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, ((x * 7 + y * 3) % 256) as u8]))
    }

    fn assert_close(v: f32, expected: f32) {
        assert!((v - expected).abs() <= 1.0 / 255.0 + 1e-6, "{v} vs {expected}");
    }

    #[test]
    fn output_has_model_shape_and_unit_range() {
        for (w, h) in [(64, 64), (640, 480), (17, 900), (299, 299)] {
            let t = preprocess(&DynamicImage::ImageRgb8(gradient(w, h)));
            assert_eq!(t.dim(), (1, 299, 299, 3));
            assert!(t.iter().all(|v| (0.0..=1.0).contains(v)));
        }
    }

    #[test]
    fn same_bytes_give_bit_identical_tensors() {
        let bytes = encode(DynamicImage::ImageRgb8(gradient(320, 240)), ImageFormat::Png);
        let a = preprocess(&decode(&bytes).unwrap());
        let b = preprocess(&decode(&bytes).unwrap());
        assert!(a.iter().zip(b.iter()).all(|(x, y)| x.to_bits() == y.to_bits()));
    }

    #[test]
    fn uniform_colour_survives_resize_and_scaling() {
        let img = RgbImage::from_pixel(120, 80, Rgb([51, 102, 204]));
        let t = preprocess(&DynamicImage::ImageRgb8(img));
        assert_close(t[[0, 0, 0, 0]], 0.2);
        assert_close(t[[0, 150, 150, 1]], 0.4);
        assert_close(t[[0, 298, 298, 2]], 0.8);
    }

    #[test]
    fn alpha_is_discarded_not_composited() {
        let img = RgbaImage::from_pixel(50, 50, Rgba([255, 0, 0, 0]));
        let t = preprocess(&DynamicImage::ImageRgba8(img));
        assert_close(t[[0, 10, 10, 0]], 1.0);
        assert_close(t[[0, 10, 10, 1]], 0.0);
        assert_close(t[[0, 10, 10, 2]], 0.0);
    }

    #[test]
    fn grayscale_is_replicated_across_channels() {
        let img = GrayImage::from_pixel(40, 90, Luma([128]));
        let t = preprocess(&DynamicImage::ImageLuma8(img));
        let px = [t[[0, 5, 5, 0]], t[[0, 5, 5, 1]], t[[0, 5, 5, 2]]];
        assert_eq!(px[0], px[1]);
        assert_eq!(px[1], px[2]);
        assert_close(px[0], 128.0 / 255.0);
    }

    #[test]
    fn jpeg_round_trips_through_decode() {
        let bytes = encode(DynamicImage::ImageRgb8(gradient(100, 60)), ImageFormat::Jpeg);
        let img = decode(&bytes).unwrap();
        assert_eq!((img.width(), img.height()), (100, 60));
    }

    #[test]
    fn non_image_bytes_fail_to_decode() {
        assert!(decode(b"definitely not an image, just text saved as scan.jpg").is_err());
        assert!(decode(&[]).is_err());
    }

    #[test]
    fn warmup_tensor_is_zero_filled() {
        let t = warmup_tensor();
        assert_eq!(t.dim(), input_shape());
        assert!(t.iter().all(|v| *v == 0.0));
    }
}
