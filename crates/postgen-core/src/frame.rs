/// A raster surface of 8-bit RGBA pixels (4 bytes per pixel, straight alpha).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    /// Raw pixel data, row-major.
    pub data: Vec<u8>,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl FrameBuffer {
    /// Transparent black surface.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            data: vec![0u8; (width as usize) * (height as usize) * 4],
            width,
            height,
        }
    }

    pub fn solid(width: u32, height: u32, color: &crate::Color) -> Self {
        let mut fb = Self::new(width, height);
        fb.fill(color);
        fb
    }

    /// Wrap raw RGBA bytes. Returns `None` when the length does not match.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        if data.len() != (width as usize) * (height as usize) * 4 {
            return None;
        }
        Some(Self {
            data,
            width,
            height,
        })
    }

    /// Overwrite every pixel with `color`.
    pub fn fill(&mut self, color: &crate::Color) {
        let pixel = color.to_rgba8();
        for px in self.data.chunks_exact_mut(4) {
            px.copy_from_slice(&pixel);
        }
    }

    pub fn pixel_count(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    /// `None` outside the surface.
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = self.offset(x, y);
        Some([
            self.data[offset],
            self.data[offset + 1],
            self.data[offset + 2],
            self.data[offset + 3],
        ])
    }

    /// Overwrite one pixel; writes outside the surface are dropped.
    pub fn set_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let offset = self.offset(x, y);
        self.data[offset..offset + 4].copy_from_slice(&rgba);
    }

    /// Source-over blend a single pixel. No-op if out of bounds.
    pub fn blend_pixel(&mut self, x: i32, y: i32, rgba: [u8; 4]) {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return;
        }
        let offset = self.offset(x as u32, y as u32);
        blend_over(&rgba, &mut self.data[offset..offset + 4]);
    }

    /// True when at least one pixel is not fully opaque.
    pub fn has_transparency(&self) -> bool {
        self.data.chunks_exact(4).any(|px| px[3] != 255)
    }

    /// Draw `src` over this buffer with its top-left corner at (dx, dy).
    /// Only the part of `src` that lands inside the buffer is blended.
    pub fn composite_over(&mut self, src: &FrameBuffer, dx: i32, dy: i32) {
        let x0 = dx.max(0);
        let y0 = dy.max(0);
        let x1 = (dx + src.width as i32).min(self.width as i32);
        let y1 = (dy + src.height as i32).min(self.height as i32);
        if x0 >= x1 || y0 >= y1 {
            return;
        }

        let span = (x1 - x0) as usize * 4;
        for y in y0..y1 {
            let src_at = src.offset((x0 - dx) as u32, (y - dy) as u32);
            let dst_at = self.offset(x0 as u32, y as u32);
            let row = &src.data[src_at..src_at + span];
            let out = &mut self.data[dst_at..dst_at + span];
            for (s, d) in row.chunks_exact(4).zip(out.chunks_exact_mut(4)) {
                blend_over(s, d);
            }
        }
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        ((y as usize) * (self.width as usize) + (x as usize)) * 4
    }
}

/// Integer source-over for one straight-alpha pixel.
fn blend_over(s: &[u8], d: &mut [u8]) {
    let sa = u32::from(s[3]);
    match sa {
        0 => return,
        255 => {
            d.copy_from_slice(&s[..4]);
            return;
        }
        _ => {}
    }

    // Destination weight is da * (1 - sa), kept in 0..=255 * 255.
    let dw = u32::from(d[3]) * (255 - sa);
    let total = sa * 255 + dw;
    for c in 0..3 {
        d[c] = ((u32::from(s[c]) * sa * 255 + u32::from(d[c]) * dw) / total) as u8;
    }
    d[3] = (total / 255) as u8;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Color;

    #[test]
    fn test_frame_buffer_new() {
        let fb = FrameBuffer::new(600, 750);
        assert_eq!(fb.width, 600);
        assert_eq!(fb.height, 750);
        assert_eq!(fb.data.len(), 600 * 750 * 4);
        assert_eq!(fb.pixel_count(), 600 * 750);
        assert!(fb.has_transparency());
    }

    #[test]
    fn test_frame_buffer_solid() {
        let fb = FrameBuffer::solid(2, 2, &Color::PLACEHOLDER);
        assert_eq!(fb.get_pixel(0, 0), Some([238, 238, 238, 255]));
        assert_eq!(fb.get_pixel(1, 1), Some([238, 238, 238, 255]));
        assert!(!fb.has_transparency());
    }

    #[test]
    fn test_from_raw_checks_length() {
        assert!(FrameBuffer::from_raw(2, 2, vec![0; 16]).is_some());
        assert!(FrameBuffer::from_raw(2, 2, vec![0; 15]).is_none());
    }

    #[test]
    fn test_out_of_bounds_access() {
        let mut fb = FrameBuffer::new(10, 10);
        assert_eq!(fb.get_pixel(10, 0), None);
        fb.set_pixel(0, 10, [1, 2, 3, 4]);
        fb.blend_pixel(-1, 3, [255, 255, 255, 255]);
        assert!(fb.data.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_composite_over_opaque() {
        let mut dst = FrameBuffer::solid(4, 4, &Color::BLACK);
        let src = FrameBuffer::solid(2, 2, &Color::WHITE);
        dst.composite_over(&src, 1, 1);
        assert_eq!(dst.get_pixel(1, 1), Some([255, 255, 255, 255]));
        assert_eq!(dst.get_pixel(2, 2), Some([255, 255, 255, 255]));
        assert_eq!(dst.get_pixel(0, 0), Some([0, 0, 0, 255]));
    }

    #[test]
    fn test_composite_over_clips_negative_offset() {
        let mut dst = FrameBuffer::solid(4, 4, &Color::BLACK);
        let src = FrameBuffer::solid(3, 3, &Color::WHITE);
        dst.composite_over(&src, -2, -2);
        assert_eq!(dst.get_pixel(0, 0), Some([255, 255, 255, 255]));
        assert_eq!(dst.get_pixel(1, 1), Some([0, 0, 0, 255]));
    }

    #[test]
    fn test_composite_over_transparent_keeps_destination() {
        let mut dst = FrameBuffer::solid(4, 4, &Color::WHITE);
        let src = FrameBuffer::new(2, 2);
        dst.composite_over(&src, 0, 0);
        assert_eq!(dst.get_pixel(0, 0), Some([255, 255, 255, 255]));
    }

    #[test]
    fn test_blend_pixel_semi_transparent() {
        let mut fb = FrameBuffer::solid(1, 1, &Color::WHITE);
        fb.blend_pixel(0, 0, [0, 0, 0, 153]);
        let px = fb.get_pixel(0, 0).unwrap();
        assert_eq!(px[3], 255);
        assert!(px[0] > 90 && px[0] < 115, "got {:?}", px);
    }
}
