//! Content hashing for deterministic rendering verification.
//!
//! A SHA-256 digest over a frame's dimensions and pixels lets callers check
//! that rendering the same input twice produced pixel-identical slides.

use sha2::{Digest, Sha256};

use crate::frame::FrameBuffer;

/// SHA-256 digest of a rendered slide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    pub fn from_bytes(digest: [u8; 32]) -> Self {
        Self(digest)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex, 64 characters.
    pub fn to_hex(&self) -> String {
        use std::fmt::Write;
        self.0.iter().fold(String::with_capacity(64), |mut out, b| {
            let _ = write!(out, "{:02x}", b);
            out
        })
    }

    /// Short prefix for log lines.
    pub fn short(&self) -> String {
        self.to_hex()[..12].to_string()
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Digest of a frame's shape and pixels. The shape is included so equal
/// bytes at different dimensions never collide.
pub fn hash_frame(frame: &FrameBuffer) -> ContentHash {
    let digest = Sha256::new()
        .chain_update(frame.width.to_le_bytes())
        .chain_update(frame.height.to_le_bytes())
        .chain_update(&frame.data)
        .finalize();
    ContentHash(digest.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Color;

    #[test]
    fn test_equal_frames_hash_equal() {
        let a = FrameBuffer::solid(10, 10, &Color::PLACEHOLDER);
        let b = FrameBuffer::solid(10, 10, &Color::PLACEHOLDER);
        assert_eq!(hash_frame(&a), hash_frame(&b));
    }

    #[test]
    fn test_one_pixel_changes_the_hash() {
        let a = FrameBuffer::solid(10, 10, &Color::WHITE);
        let mut b = a.clone();
        b.set_pixel(9, 9, [254, 255, 255, 255]);
        assert_ne!(hash_frame(&a), hash_frame(&b));
    }

    #[test]
    fn test_hash_different_shape_same_bytes() {
        let frame1 = FrameBuffer::solid(10, 20, &Color::WHITE);
        let frame2 = FrameBuffer::solid(20, 10, &Color::WHITE);
        assert_ne!(hash_frame(&frame1), hash_frame(&frame2));
    }

    #[test]
    fn test_hash_hex_format() {
        let hash = hash_frame(&FrameBuffer::solid(2, 2, &Color::BLACK));
        let hex = hash.to_hex();
        assert_eq!(hex.len(), 64);
        assert!(hex.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(format!("{}", hash), hex);
        assert!(hex.starts_with(&hash.short()));
    }
}
