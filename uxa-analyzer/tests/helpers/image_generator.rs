//! Synthetic screenshots

use image::{Rgba, RgbaImage};
use std::path::{Path, PathBuf};

/// Write a `width` x `height` PNG with a light background and a dark header bar
pub fn write_test_png(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let header = height / 10;
    let img = RgbaImage::from_fn(width, height, |_, y| {
        if y < header {
            Rgba([40, 44, 52, 255])
        } else {
            Rgba([245, 245, 245, 255])
        }
    });
    let path = dir.join(name);
    img.save(&path).expect("write test png");
    path
}

/// Write a PNG whose header is intact but whose pixel data is cut short
///
/// Probing the dimensions succeeds; decoding the pixels fails.
pub fn write_truncated_png(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let img = RgbaImage::from_fn(width, height, |x, y| {
        let v = ((x * 37) ^ (y * 91)) as u8;
        Rgba([v, v.wrapping_mul(3), v.wrapping_add(101), 255])
    });
    let mut bytes = Vec::new();
    img.write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
        .expect("encode test png");
    bytes.truncate(bytes.len() / 2);

    let path = dir.join(name);
    std::fs::write(&path, bytes).expect("write truncated png");
    path
}
