//! Uncompressed Windows bitmap output for decoded images.

use crate::image::Image;

const FILE_HEADER_LEN: u32 = 14;
const INFO_HEADER_LEN: u32 = 40;
const V5_HEADER_LEN: u32 = 124;
const PIXELS_PER_METER: u32 = 2835; // 72 DPI
const BI_RGB: u32 = 0;
const BI_BITFIELDS: u32 = 3;
const LCS_SRGB: u32 = 0x7352_4742;

struct BmpWriter {
    bytes: Vec<u8>,
}

impl BmpWriter {
    fn new(capacity: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(capacity),
        }
    }

    fn u16(&mut self, value: u16) -> &mut Self {
        self.bytes.extend_from_slice(&value.to_le_bytes());
        self
    }

    fn u32(&mut self, value: u32) -> &mut Self {
        self.bytes.extend_from_slice(&value.to_le_bytes());
        self
    }

    fn zeros(&mut self, n: usize) -> &mut Self {
        self.bytes.resize(self.bytes.len() + n, 0);
        self
    }

    fn file_header(&mut self, header_len: u32, pixels_len: u32) -> &mut Self {
        let offset = FILE_HEADER_LEN + header_len;
        self.bytes.extend_from_slice(b"BM");
        self.u32(offset + pixels_len).u16(0).u16(0).u32(offset)
    }

    fn info_header(
        &mut self,
        image: &Image,
        header_len: u32,
        bit_count: u16,
        compression: u32,
    ) -> &mut Self {
        // Negative height stores rows top-down
        self.u32(header_len)
            .u32(image.width())
            .u32((image.height() as i32).wrapping_neg() as u32)
            .u16(1)
            .u16(bit_count)
            .u32(compression)
            .u32(0)
            .u32(PIXELS_PER_METER)
            .u32(PIXELS_PER_METER)
            .u32(0)
            .u32(0)
    }
}

/// 32 bits per pixel, R, G, B, A byte order described with channel masks.
pub fn write_rgba(image: &Image) -> Vec<u8> {
    let pixels_len = image.pixels().len() as u32;
    let mut writer = BmpWriter::new((FILE_HEADER_LEN + V5_HEADER_LEN + pixels_len) as usize);
    writer
        .file_header(V5_HEADER_LEN, pixels_len)
        .info_header(image, V5_HEADER_LEN, 32, BI_BITFIELDS)
        .u32(0x0000_00ff)
        .u32(0x0000_ff00)
        .u32(0x00ff_0000)
        .u32(0xff00_0000)
        .u32(LCS_SRGB)
        // Endpoints, gamma, intent and profile
        .zeros(36 + 12 + 16);
    writer.bytes.extend_from_slice(image.pixels());
    writer.bytes
}

/// 24 bits per pixel in B, G, R order, alpha dropped, rows padded to 4 bytes.
pub fn write_rgb(image: &Image) -> Vec<u8> {
    let row_len = image.width() as usize * 3;
    let padding = (4 - row_len % 4) % 4;
    let pixels_len = ((row_len + padding) * image.height() as usize) as u32;
    let mut writer = BmpWriter::new((FILE_HEADER_LEN + INFO_HEADER_LEN + pixels_len) as usize);
    writer
        .file_header(INFO_HEADER_LEN, pixels_len)
        .info_header(image, INFO_HEADER_LEN, 24, BI_RGB);
    if image.width() > 0 {
        for row in image.pixels().chunks_exact(image.width() as usize * 4) {
            for pixel in row.chunks_exact(4) {
                writer.bytes.extend_from_slice(&[pixel[2], pixel[1], pixel[0]]);
            }
            writer.zeros(padding);
        }
    }
    writer.bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn u32_at(bytes: &[u8], offset: usize) -> u32 {
        u32::from_le_bytes(bytes[offset..offset + 4].try_into().unwrap())
    }

    #[test]
    fn rgba_layout() {
        let image = Image::new(2, 1, vec![1, 2, 3, 4, 5, 6, 7, 8]);
        let bmp = write_rgba(&image);
        assert_eq!(b"BM", &bmp[..2]);
        assert_eq!(14 + 124 + 8, bmp.len());
        assert_eq!(bmp.len() as u32, u32_at(&bmp, 2));
        assert_eq!(138, u32_at(&bmp, 10));
        assert_eq!(124, u32_at(&bmp, 14));
        assert_eq!(2, u32_at(&bmp, 18));
        assert_eq!(-1, u32_at(&bmp, 22) as i32);
        assert_eq!(BI_BITFIELDS, u32_at(&bmp, 30));
        assert_eq!(0xff00_0000, u32_at(&bmp, 66));
        assert_eq!(LCS_SRGB, u32_at(&bmp, 70));
        assert_eq!(&[1, 2, 3, 4, 5, 6, 7, 8], &bmp[138..]);
    }

    #[test]
    fn rgb_rows_are_padded() {
        let image = Image::new(1, 2, vec![1, 2, 3, 255, 4, 5, 6, 255]);
        let bmp = write_rgb(&image);
        assert_eq!(14 + 40 + 8, bmp.len());
        assert_eq!(54, u32_at(&bmp, 10));
        assert_eq!(-2, u32_at(&bmp, 22) as i32);
        assert_eq!(&[3, 2, 1, 0, 6, 5, 4, 0], &bmp[54..]);
    }
}
