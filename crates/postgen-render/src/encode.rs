use postgen_core::{FrameBuffer, PostError, PostResult};

/// Encode an RGBA frame buffer as a PNG byte stream.
pub fn encode_png(frame: &FrameBuffer) -> PostResult<Vec<u8>> {
    if frame.width == 0 || frame.height == 0 {
        return Err(PostError::Encode(format!(
            "cannot encode an empty {}x{} frame",
            frame.width, frame.height
        )));
    }

    let mut out = Vec::with_capacity(frame.data.len() / 2);
    {
        let mut encoder = png::Encoder::new(&mut out, frame.width, frame.height);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);

        let mut writer = encoder
            .write_header()
            .map_err(|e| PostError::Encode(format!("failed to write PNG header: {}", e)))?;
        writer
            .write_image_data(&frame.data)
            .map_err(|e| PostError::Encode(format!("failed to write PNG data: {}", e)))?;
        writer
            .finish()
            .map_err(|e| PostError::Encode(format!("failed to finalize PNG: {}", e)))?;
    }

    tracing::debug!(
        "Encoded {}x{} slide to {} PNG bytes",
        frame.width,
        frame.height,
        out.len()
    );

    Ok(out)
}
