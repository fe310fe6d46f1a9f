use image::RgbaImage;

/// 单帧像素数据（RGBA）
#[derive(Debug, Clone)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>, // RGBA 格式
    /// Capture time in seconds from the start of the clip.
    pub timestamp: f64,
}

impl Frame {
    pub fn new(width: u32, height: u32, data: Vec<u8>, timestamp: f64) -> Self {
        Self {
            width,
            height,
            data,
            timestamp,
        }
    }

    /// Builds a frame from a decoded image, keeping its dimensions.
    pub fn from_image(image: RgbaImage, timestamp: f64) -> Self {
        let (width, height) = image.dimensions();
        Self::new(width, height, image.into_raw(), timestamp)
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// A frame is usable when it has at least one pixel and a buffer that
    /// matches its dimensions.
    pub fn is_valid(&self) -> bool {
        self.width >= 1 && self.height >= 1 && self.data.len() == self.pixel_count() * 4
    }

    pub fn with_timestamp(mut self, timestamp: f64) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn to_rgb(&self) -> Vec<u8> {
        let mut rgb = Vec::with_capacity(self.pixel_count() * 3);
        for chunk in self.data.chunks_exact(4) {
            rgb.push(chunk[0]); // R
            rgb.push(chunk[1]); // G
            rgb.push(chunk[2]); // B
        }
        rgb
    }

    /// Copies the pixels into an `image` buffer, `None` when the buffer length is off.
    pub fn as_image(&self) -> Option<RgbaImage> {
        RgbaImage::from_raw(self.width, self.height, self.data.clone())
    }
}
