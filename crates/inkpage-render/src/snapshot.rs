//! Reading rendered pixmaps back out for hosts.

use crate::renderer::{RenderResult, RendererError};
use vello_cpu::Pixmap;

/// Unpremultiplied RGBA bytes, as expected by `ImageData` and PNG.
pub fn rgba8(pixmap: &Pixmap) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(pixmap.data().len() * 4);
    for p in pixmap.clone().take_unpremultiplied() {
        bytes.extend_from_slice(&[p.r, p.g, p.b, p.a]);
    }
    bytes
}

/// Encode a pixmap as a PNG image.
pub fn encode_png(pixmap: &Pixmap) -> RenderResult<Vec<u8>> {
    let rgba = rgba8(pixmap);
    let mut png_data = Vec::new();
    {
        let mut encoder = png::Encoder::new(
            &mut png_data,
            u32::from(pixmap.width()),
            u32::from(pixmap.height()),
        );
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);

        let mut writer = encoder
            .write_header()
            .map_err(|e| RendererError::Png(e.to_string()))?;
        writer
            .write_image_data(&rgba)
            .map_err(|e| RendererError::Png(e.to_string()))?;
    }
    Ok(png_data)
}
