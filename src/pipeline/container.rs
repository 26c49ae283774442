//! Layered-container decoding.
//!
//! The stereo container is a concatenation of independent JPEG
//! codestreams (the layout multi-picture stereo cameras write). The
//! splitter walks the marker structure of each codestream instead of
//! pattern-matching on SOI bytes, so thumbnails embedded in APPn
//! segments can never produce a phantom layer boundary.

use crate::error::PipelineError;
use image::RgbaImage;
use std::io::Cursor;
use tracing::debug;

const SOI: u8 = 0xD8;
const EOI: u8 = 0xD9;
const SOS: u8 = 0xDA;
const TEM: u8 = 0x01;

/// Splits container bytes into one slice per complete SOI..EOI
/// codestream, in container order.
pub fn split_layers(bytes: &[u8]) -> Result<Vec<&[u8]>, PipelineError> {
    let mut layers = Vec::new();
    let mut pos = 0usize;

    loop {
        // Writers may pad between codestreams with zero bytes.
        while pos < bytes.len() && bytes[pos] == 0x00 {
            pos += 1;
        }
        if pos == bytes.len() {
            break;
        }
        if bytes.len() - pos < 2 || bytes[pos] != 0xFF || bytes[pos + 1] != SOI {
            return Err(PipelineError::Decode(format!(
                "expected SOI marker at offset {pos}"
            )));
        }
        let end = scan_codestream(bytes, pos)?;
        layers.push(&bytes[pos..end]);
        pos = end;
    }

    if layers.is_empty() {
        return Err(PipelineError::Decode("empty container".into()));
    }
    Ok(layers)
}

/// Decodes every layer to RGBA8, applying per-layer EXIF orientation.
pub fn decode_layers(bytes: &[u8]) -> Result<Vec<RgbaImage>, PipelineError> {
    let layers = split_layers(bytes)?;
    debug!(layers = layers.len(), "container split");
    layers
        .into_iter()
        .enumerate()
        .map(|(idx, raw)| {
            decode_layer(raw).map_err(|e| PipelineError::Decode(format!("layer {idx}: {e}")))
        })
        .collect()
}

fn decode_layer(raw: &[u8]) -> Result<RgbaImage, image::ImageError> {
    let img = image::load_from_memory_with_format(raw, image::ImageFormat::Jpeg)?;
    let mut img = img.to_rgba8();

    // EXIF orientation correction, best-effort: missing or exotic
    // metadata leaves the decoded orientation as-is.
    match read_orientation(raw).unwrap_or(1) {
        2 => img = image::imageops::flip_horizontal(&img),
        3 => img = image::imageops::rotate180(&img),
        4 => img = image::imageops::flip_vertical(&img),
        5 => {
            img = image::imageops::rotate90(&img);
            img = image::imageops::flip_horizontal(&img);
        }
        6 => img = image::imageops::rotate90(&img),
        7 => {
            img = image::imageops::rotate270(&img);
            img = image::imageops::flip_horizontal(&img);
        }
        8 => img = image::imageops::rotate270(&img),
        _ => {}
    }

    Ok(img)
}

fn read_orientation(raw: &[u8]) -> Option<u16> {
    let mut cursor = Cursor::new(raw);
    let exif = exif::Reader::new().read_from_container(&mut cursor).ok()?;
    let field = exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY)?;
    let value = field.value.get_uint(0)?;
    Some(value as u16)
}

/// Walks one codestream starting at its SOI; returns the offset one
/// past the matching EOI.
fn scan_codestream(bytes: &[u8], start: usize) -> Result<usize, PipelineError> {
    let mut i = start + 2;
    loop {
        if i >= bytes.len() {
            return Err(truncated(i));
        }
        if bytes[i] != 0xFF {
            return Err(PipelineError::Decode(format!(
                "expected marker at offset {i}, found 0x{:02X}",
                bytes[i]
            )));
        }
        // Fill bytes: any number of 0xFF may precede the marker code.
        while i < bytes.len() && bytes[i] == 0xFF {
            i += 1;
        }
        if i >= bytes.len() {
            return Err(truncated(i));
        }
        let marker = bytes[i];
        i += 1;
        match marker {
            EOI => return Ok(i),
            SOI => {
                return Err(PipelineError::Decode(format!(
                    "nested SOI marker at offset {i}"
                )));
            }
            TEM | 0xD0..=0xD7 => {} // standalone markers carry no payload
            SOS => {
                i = skip_segment(bytes, i)?;
                i = skip_entropy(bytes, i)?;
            }
            _ => i = skip_segment(bytes, i)?,
        }
    }
}

/// `i` points at the two-byte big-endian segment length (which counts
/// itself). Returns the offset just past the segment payload.
fn skip_segment(bytes: &[u8], i: usize) -> Result<usize, PipelineError> {
    if i + 2 > bytes.len() {
        return Err(truncated(i));
    }
    let len = usize::from(u16::from_be_bytes([bytes[i], bytes[i + 1]]));
    if len < 2 {
        return Err(PipelineError::Decode(format!(
            "invalid segment length {len} at offset {i}"
        )));
    }
    let end = i + len;
    if end > bytes.len() {
        return Err(truncated(end));
    }
    Ok(end)
}

/// Skips entropy-coded scan data up to the next real marker. Inside a
/// scan, 0xFF is always followed by 0x00 (stuffing), a restart
/// marker, or another 0xFF fill byte.
fn skip_entropy(bytes: &[u8], mut i: usize) -> Result<usize, PipelineError> {
    while i + 1 < bytes.len() {
        if bytes[i] != 0xFF {
            i += 1;
            continue;
        }
        match bytes[i + 1] {
            0x00 => i += 2,
            0xFF => i += 1,
            0xD0..=0xD7 => i += 2,
            _ => return Ok(i),
        }
    }
    Err(truncated(bytes.len()))
}

fn truncated(at: usize) -> PipelineError {
    PipelineError::Decode(format!("truncated codestream near offset {at}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;

    /// A syntactically valid codestream with no scan: SOI, one APPn
    /// segment carrying `payload`, EOI.
    fn bare_codestream(app_marker: u8, payload: &[u8]) -> Vec<u8> {
        let mut out = vec![0xFF, 0xD8, 0xFF, app_marker];
        let len = u16::try_from(payload.len() + 2).unwrap();
        out.extend_from_slice(&len.to_be_bytes());
        out.extend_from_slice(payload);
        out.extend_from_slice(&[0xFF, 0xD9]);
        out
    }

    fn encode_jpeg(width: u32, height: u32, rgb: [u8; 3]) -> Vec<u8> {
        let img = image::RgbImage::from_pixel(width, height, image::Rgb(rgb));
        let mut out = Cursor::new(Vec::new());
        image::codecs::jpeg::JpegEncoder::new_with_quality(&mut out, 90)
            .encode(
                img.as_raw(),
                width,
                height,
                image::ExtendedColorType::Rgb8,
            )
            .unwrap();
        out.into_inner()
    }

    // JPEG 2x1 with EXIF orientation 6 (rotate 90 CW), base64 encoded.
    const ORIENT6_JPEG: &str = concat!(
        "/9j/4AAQSkZJRgABAQAAAQABAAD/4QAiRXhpZgAATU0AKgAAAAgAAQESAAMAAAABAAYAAAAAAAD/2wBDAAgGBgcGBQgHBwcJCQgKDBQNDAsLDBkSEw8UHRofHh0aHBwgJC4nICIsIxwcKDcpLDAxNDQ0Hyc5PTgyPC4zNDL/",
        "2wBDAQkJCQwLDBgNDRgyIRwhMjIyMjIyMjIyMjIyMjIyMjIyMjIyMjIyMjIyMjIyMjIyMjIyMjIyMjIyMjIyMjIyMjL/wAARCAABAAIDASIAAhEBAxEB/8QAHwAAAQUBAQEBAQEAAAAAAAAAAAECAwQFBgcICQoL/8QAtRAAAgEDAwIEAwUFBAQAAAF9AQIDAAQRBRIhMUEGE1FhByJxFDKBkaEII0KxwRVS0fAkM2JyggkKFhcYGRolJicoKSo0NTY3ODk6Q0RFRkdISUpTVFVWV1hZWmNkZWZnaGlqc3R1dnd4eXqDhIWGh4iJipKTlJWWl5iZmqKjpKWmp6ipqrKztLW2t7i5usLDxMXGx8jJytLT1NXW19jZ2uHi4+Tl5ufo6erx8vP09fb3+Pn6/8QAHwEAAwEBAQEBAQEBAQAAAAAAAAECAwQFBgcICQoL/8QAtREAAgECBAQDBAcFBAQAAQJ3AAECAxEEBSExBhJBUQdhcRMiMoEIFEKRobHBCSMzUvAVYnLRChYkNOEl8RcYGRomJygpKjU2Nzg5OkNERUZHSElKU1RVVldYWVpjZGVmZ2hpanN0dXZ3eHl6goOEhYaHiImKkpOUlZaXmJmaoqOkpaanqKmqsrO0tba3uLm6wsPExcbHyMnK0tPU1dbX2Nna4uPk5ebn6Onq8vP09fb3+Pn6/9oADAMBAAIRAxEAPwDi6KKK+ZP3E//Z"
    );

    #[test]
    fn splits_concatenated_codestreams() {
        let mut container = bare_codestream(0xE0, b"one");
        container.extend(bare_codestream(0xE1, b"two"));
        container.extend(bare_codestream(0xE2, b"three"));

        let layers = split_layers(&container).unwrap();
        assert_eq!(layers.len(), 3);
        assert!(layers.iter().all(|l| l.starts_with(&[0xFF, 0xD8])));
        assert!(layers.iter().all(|l| l.ends_with(&[0xFF, 0xD9])));
    }

    #[test]
    fn embedded_thumbnail_does_not_split() {
        // The APP2 payload holds a complete inner codestream; the
        // length-prefixed walk must treat it as opaque bytes.
        let thumbnail = bare_codestream(0xE0, b"thumb");
        let mut container = bare_codestream(0xE2, &thumbnail);
        container.extend(bare_codestream(0xE1, b"second"));

        let layers = split_layers(&container).unwrap();
        assert_eq!(layers.len(), 2);
    }

    #[test]
    fn zero_padding_between_layers_is_skipped() {
        let mut container = bare_codestream(0xE0, b"a");
        container.extend_from_slice(&[0x00, 0x00]);
        container.extend(bare_codestream(0xE0, b"b"));
        assert_eq!(split_layers(&container).unwrap().len(), 2);
    }

    #[test]
    fn garbage_is_a_decode_error() {
        let err = split_layers(b"not a container").unwrap_err();
        assert!(matches!(err, PipelineError::Decode(_)));
    }

    #[test]
    fn truncated_segment_is_a_decode_error() {
        let mut container = bare_codestream(0xE0, b"payload");
        container.truncate(container.len() - 4);
        let err = split_layers(&container).unwrap_err();
        assert!(matches!(err, PipelineError::Decode(_)));
    }

    #[test]
    fn empty_input_is_a_decode_error() {
        assert!(matches!(
            split_layers(&[]).unwrap_err(),
            PipelineError::Decode(_)
        ));
    }

    #[test]
    fn decodes_real_encoded_layers() {
        let mut container = encode_jpeg(8, 6, [200, 30, 30]);
        container.extend(encode_jpeg(6, 4, [30, 200, 30]));

        let layers = decode_layers(&container).unwrap();
        assert_eq!(layers.len(), 2);
        assert_eq!(layers[0].dimensions(), (8, 6));
        assert_eq!(layers[1].dimensions(), (6, 4));
    }

    #[test]
    fn applies_exif_orientation_per_layer() {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(ORIENT6_JPEG)
            .unwrap();
        let layers = decode_layers(&bytes).unwrap();
        assert_eq!(layers.len(), 1);
        // 2x1 source with orientation 6 decodes as 1x2.
        assert_eq!(layers[0].dimensions(), (1, 2));
    }
}
