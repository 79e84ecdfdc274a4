use std::path::Path;

use crate::frame::Frame;
use crate::spectrum::Spectrum;
use crate::Float;

/// Linear to sRGB transfer curve.
pub fn gamma_correct(v: Float) -> Float {
    if v <= 0.0031308 {
        12.92 * v
    } else {
        1.055 * v.powf(1.0 / 2.4) - 0.055
    }
}

pub fn spectrum_into_rgb8(s: Spectrum) -> [u8; 3] {
    let [r, g, b] = s.clamp(0.0, 1.0).into_array();
    [(r * 255.0).round() as u8, (g * 255.0).round() as u8, (b * 255.0).round() as u8]
}

/// Gamma-corrected 8-bit image of a row-major buffer of linear colors.
pub fn spectrum_to_image(img: &[Spectrum], (w, h): (usize, usize)) -> image::RgbImage {
    assert_eq!(img.len(), w * h, "buffer does not match image dimensions");
    image::RgbImage::from_fn(w as u32, h as u32, |x, y| {
        let s = img[y as usize * w + x as usize];
        image::Rgb(spectrum_into_rgb8(s.map(gamma_correct)))
    })
}

pub fn frame_to_image(frame: &Frame) -> image::RgbImage {
    spectrum_to_image(&frame.colors(), (frame.width(), frame.height()))
}

/// Write the frame as an image file; the format follows the extension.
pub fn write_frame(frame: &Frame, path: impl AsRef<Path>) -> anyhow::Result<()> {
    let path = path.as_ref();
    frame_to_image(frame).save(path)?;
    tracing::info!(path = %path.display(), "wrote image");
    Ok(())
}
