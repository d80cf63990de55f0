use tracing::trace;

use crate::error::{zeroed_buffer, Error, Result};

const OPAQUE: u8 = 0xff;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterType {
    None,
    Sub,
    Up,
    Average,
    Paeth,
}

impl TryFrom<u8> for FilterType {
    type Error = u8;

    fn try_from(byte: u8) -> std::result::Result<Self, Self::Error> {
        match byte {
            0 => Ok(Self::None),
            1 => Ok(Self::Sub),
            2 => Ok(Self::Up),
            3 => Ok(Self::Average),
            4 => Ok(Self::Paeth),
            byte => Err(byte),
        }
    }
}

/// Picks whichever of left, above and upper-left is closest to `a + b - c`, preferring them in
/// that order on ties.
#[inline]
pub fn paeth_predictor(a: u8, b: u8, c: u8) -> u8 {
    let p = a as i16 + b as i16 - c as i16;
    let pa = (p - a as i16).abs();
    let pb = (p - b as i16).abs();
    let pc = (p - c as i16).abs();
    if pa <= pb && pa <= pc {
        a
    } else if pb <= pc {
        b
    } else {
        c
    }
}

fn unfilter_row(filter: FilterType, line: &mut [u8], previous: Option<&[u8]>, bpp: usize) {
    let above = |x: usize| previous.map_or(0, |previous| previous[x]);
    match filter {
        FilterType::None => {}
        FilterType::Sub => {
            for x in bpp..line.len() {
                line[x] = line[x].wrapping_add(line[x - bpp]);
            }
        }
        FilterType::Up => {
            for x in 0..line.len() {
                line[x] = line[x].wrapping_add(above(x));
            }
        }
        FilterType::Average => {
            for x in 0..line.len() {
                let left = if x >= bpp { line[x - bpp] } else { 0 };
                let average = ((left as u16 + above(x) as u16) / 2) as u8;
                line[x] = line[x].wrapping_add(average);
            }
        }
        FilterType::Paeth => {
            for x in 0..line.len() {
                let (left, upper_left) = if x >= bpp {
                    (line[x - bpp], above(x - bpp))
                } else {
                    (0, 0)
                };
                line[x] = line[x].wrapping_add(paeth_predictor(left, above(x), upper_left));
            }
        }
    }
}

/// Reverses the per-scanline filters in place. `data` holds `height` rows of one filter type
/// byte followed by `row_len` filtered bytes.
pub fn unfilter(data: &mut [u8], row_len: usize, height: usize, bpp: usize) -> Result<()> {
    let stride = row_len + 1;
    debug_assert_eq!(data.len(), stride * height);
    for row in 0..height {
        let (done, rest) = data.split_at_mut(row * stride);
        let (filter_byte, line) = rest[..stride].split_at_mut(1);
        let filter = FilterType::try_from(filter_byte[0])
            .map_err(|filter| Error::UnknownFilter { row, filter })?;
        trace!(row, ?filter, "unfiltering scanline");
        let previous = row.checked_sub(1).map(|_| &done[done.len() - row_len..]);
        unfilter_row(filter, line, previous, bpp);
    }
    Ok(())
}

/// Drops the filter type bytes and widens 3-byte pixels to 4 bytes with an opaque alpha.
pub fn expand_to_rgba(data: &[u8], width: usize, height: usize, bpp: usize) -> Result<Vec<u8>> {
    let row_len = width * bpp;
    let mut pixels = zeroed_buffer(width * height * 4)?;
    if width == 0 {
        return Ok(pixels);
    }
    let rows = data
        .chunks_exact(row_len + 1)
        .map(|row| &row[1..])
        .zip(pixels.chunks_exact_mut(width * 4));
    for (src, dst) in rows {
        if bpp == 4 {
            dst.copy_from_slice(src);
            continue;
        }
        for (src, dst) in src.chunks_exact(3).zip(dst.chunks_exact_mut(4)) {
            dst[..3].copy_from_slice(src);
            dst[3] = OPAQUE;
        }
    }
    Ok(pixels)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paeth_ties() {
        assert_eq!(7, paeth_predictor(7, 7, 7));
        // p = a + b - c = 1: pa = 1, pb = 2, pc = 1 -> a over c
        assert_eq!(0, paeth_predictor(0, 3, 2));
        // p = 2: pa = 2, pb = 1, pc = 1 -> b over c
        assert_eq!(3, paeth_predictor(0, 3, 1));
        // p = 4: pa = 1, pb = 1, pc = 0 -> c
        assert_eq!(4, paeth_predictor(3, 5, 4));
        // p = 7: pa = 2, pb = 4, pc = 6 -> a
        assert_eq!(5, paeth_predictor(5, 3, 1));
    }

    #[test]
    fn sub_and_up() {
        // 2 rows, 2 pixels of 3 bytes
        let mut data = vec![
            1, 10, 20, 30, 1, 2, 3, //
            2, 1, 1, 1, 250, 250, 250,
        ];
        unfilter(&mut data, 6, 2, 3).unwrap();
        assert_eq!(
            vec![1, 10, 20, 30, 11, 22, 33, 2, 11, 21, 31, 5, 16, 27],
            data
        );
    }

    #[test]
    fn average_and_paeth() {
        let mut data = vec![
            3, 100, 50, //
            4, 10, 20, //
            3, 0, 0,
        ];
        unfilter(&mut data, 2, 3, 1).unwrap();
        // row 0: [100, 50 + 100 / 2] = [100, 100]
        // row 1: x0: a=0, b=100, c=0 -> b -> 110; x1: a=110, b=100, c=100 -> p=110 -> a -> 130
        // row 2: x0: (0 + 110) / 2 = 55; x1: (55 + 130) / 2 = 92
        assert_eq!(vec![3, 100, 100, 4, 110, 130, 3, 55, 92], data);
    }

    #[test]
    fn wrapping_arithmetic() {
        let mut data = vec![1, 200, 100];
        unfilter(&mut data, 2, 1, 1).unwrap();
        assert_eq!(vec![1, 200, 44], data);
    }

    #[test]
    fn unknown_filter() {
        let mut data = vec![0, 1, 5, 1];
        assert!(matches!(
            unfilter(&mut data, 1, 2, 1),
            Err(Error::UnknownFilter { row: 1, filter: 5 })
        ));
    }

    #[test]
    fn expand_rgb() {
        let data = [0, 1, 2, 3, 4, 5, 6, 0, 7, 8, 9, 10, 11, 12];
        assert_eq!(
            vec![1, 2, 3, 255, 4, 5, 6, 255, 7, 8, 9, 255, 10, 11, 12, 255],
            expand_to_rgba(&data, 2, 2, 3).unwrap()
        );
    }

    #[test]
    fn expand_rgba() {
        let data = [0, 1, 2, 3, 4, 0, 5, 6, 7, 8];
        assert_eq!(
            vec![1, 2, 3, 4, 5, 6, 7, 8],
            expand_to_rgba(&data, 1, 2, 4).unwrap()
        );
    }
}
