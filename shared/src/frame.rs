/*!
Frame buffer storage.

A [`FrameBuffer`] holds one reconstructed image as packed 8-bit RGB rows,
addressed by `(row, column)`.
*/

/// One 8-bit-per-channel color sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };

    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// Fixed-size RGB raster
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    width: usize,
    height: usize,
    data: Vec<u8>,
}

impl FrameBuffer {
    /// Number of bytes per pixel
    pub const CHANNELS: usize = 3;

    /// Create a new all-zero frame
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![0; width * height * Self::CHANNELS],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Store a pixel. Writes outside the frame are dropped.
    pub fn set(&mut self, row: usize, col: usize, color: Rgb) -> bool {
        match self.offset(row, col) {
            Some(index) => {
                self.data[index..index + Self::CHANNELS].copy_from_slice(&[color.r, color.g, color.b]);
                true
            }
            None => false,
        }
    }

    /// Read a pixel, `None` outside the frame
    pub fn get(&self, row: usize, col: usize) -> Option<Rgb> {
        self.offset(row, col).map(|index| {
            Rgb::new(self.data[index], self.data[index + 1], self.data[index + 2])
        })
    }

    /// Check if nothing but zeros was ever written
    pub fn is_blank(&self) -> bool {
        self.data.iter().all(|&byte| byte == 0)
    }

    /// Reset every sample to zero
    pub fn clear(&mut self) {
        self.data.fill(0);
    }

    /// Packed RGB rows, top to bottom
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    fn offset(&self, row: usize, col: usize) -> Option<usize> {
        if row < self.height && col < self.width {
            Some((row * self.width + col) * Self::CHANNELS)
        } else {
            None
        }
    }
}

/// File name for an emitted frame, e.g. `frame_001.png`
pub fn frame_filename(prefix: &str, index: u32) -> String {
    format!("{}_{:03}.png", prefix, index)
}
