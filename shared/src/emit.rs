/*!
PNG frame emission.

[`PngFrameWriter`] is the [`FrameSink`] used by the command-line tool: each
completed frame becomes `<prefix>_<index:03>.png` inside an output directory.
*/

use crate::error::Result;
use crate::frame::{frame_filename, FrameBuffer};
use crate::timing::FrameSink;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Writes every emitted frame as an 8-bit RGB PNG
#[derive(Debug, Clone)]
pub struct PngFrameWriter {
    output_dir: PathBuf,
    prefix: String,
    written: Vec<PathBuf>,
}

impl PngFrameWriter {
    /// Create a writer; the directory is created on first write
    pub fn new(output_dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            output_dir: output_dir.into(),
            prefix: prefix.into(),
            written: Vec::new(),
        }
    }

    /// Path a frame with `index` is written to
    pub fn path_for(&self, index: u32) -> PathBuf {
        self.output_dir.join(frame_filename(&self.prefix, index))
    }

    /// Files written so far, in order
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl FrameSink for PngFrameWriter {
    fn emit(&mut self, index: u32, frame: FrameBuffer) -> Result<()> {
        std::fs::create_dir_all(&self.output_dir)?;

        let path = self.path_for(index);
        save_png(&path, &frame)?;
        debug!("Wrote {} ({}x{})", path.display(), frame.width(), frame.height());

        self.written.push(path);
        Ok(())
    }
}

/// Encode a frame as an RGB PNG file
pub fn save_png(path: &Path, frame: &FrameBuffer) -> Result<()> {
    let file = File::create(path)?;
    let w = BufWriter::new(file);

    let mut encoder = png::Encoder::new(w, frame.width() as u32, frame.height() as u32);
    encoder.set_color(png::ColorType::Rgb);
    encoder.set_depth(png::BitDepth::Eight);

    let mut writer = encoder.write_header()?;
    writer.write_image_data(frame.as_bytes())?;
    writer.finish()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Rgb;
    use tempfile::TempDir;

    const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    #[test]
    fn test_path_for() {
        let writer = PngFrameWriter::new("out", "frame");
        assert_eq!(writer.path_for(1), PathBuf::from("out").join("frame_001.png"));
        assert_eq!(writer.prefix(), "frame");
    }

    #[test]
    fn test_emit_writes_png() {
        let dir = TempDir::new().unwrap();
        let mut writer = PngFrameWriter::new(dir.path().join("frames"), "vga");

        let mut frame = FrameBuffer::new(8, 4);
        frame.set(0, 0, Rgb::new(255, 0, 0));
        writer.emit(7, frame).unwrap();

        let path = dir.path().join("frames").join("vga_007.png");
        assert_eq!(writer.written(), &[path.clone()]);

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..8], &PNG_SIGNATURE);
        // IHDR follows the signature: width and height, big-endian
        assert_eq!(&bytes[16..20], &8u32.to_be_bytes());
        assert_eq!(&bytes[20..24], &4u32.to_be_bytes());
        // Bit depth 8, color type 2 (RGB)
        assert_eq!(bytes[24], 8);
        assert_eq!(bytes[25], 2);
    }
}
