use crate::cielab::srgb_to_cielab_pixel;
use crate::error::{Error, Result};
use aligned_vec::{AVec, ConstAlign};
use std::ops::{Index, IndexMut};

const ALIGN: usize = 64;

/// Flat row-major 2D container indexed by `y * width + x`.
#[derive(Debug, Clone)]
pub struct Array2D<T> {
    pub data: AVec<T, ConstAlign<ALIGN>>,
    pub width: usize,
    pub height: usize,
}

impl<T> Array2D<T> {
    pub fn from_slice(data: &[T], width: usize, height: usize) -> Result<Self>
    where
        T: Clone,
    {
        if data.len() != width * height {
            return Err(Error::DimensionMismatch);
        }
        Ok(Self {
            width,
            height,
            data: AVec::from_slice(ALIGN, data),
        })
    }

    pub fn from_fill(value: T, width: usize, height: usize) -> Self
    where
        T: Clone + Copy,
    {
        let data: AVec<T, ConstAlign<ALIGN>> =
            AVec::from_iter(ALIGN, (0..width * height).map(|_| value));
        Self {
            width,
            height,
            data,
        }
    }

    pub fn fill(&mut self, value: T)
    where
        T: Clone,
    {
        self.data.fill(value)
    }
    pub fn get_row(&self, row: usize) -> &[T] {
        debug_assert!(row < self.height);
        &self.data[(self.width * row)..(self.width * row + self.width)]
    }
    pub fn get_row_mut(&mut self, row: usize) -> &mut [T] {
        debug_assert!(row < self.height);
        &mut self.data[(self.width * row)..(self.width * row + self.width)]
    }
    /// Part of the row `row` in columns `left..right` (right is exclusive).
    #[inline(always)]
    pub fn get_row_part(&self, row: usize, left: usize, right: usize) -> &[T] {
        debug_assert!(
            row < self.height,
            "Out-of-bounds row {row} < {}",
            self.height
        );
        debug_assert!(left <= right, "Inverted range {left}..{right}");
        debug_assert!(
            right <= self.width,
            "Out-of-bounds right {right} <= {}",
            self.width
        );
        &self.data[(self.width * row + left)..(self.width * row + right)]
    }
    #[inline(always)]
    pub fn get_row_part_mut(&mut self, row: usize, left: usize, right: usize) -> &mut [T] {
        debug_assert!(row < self.height);
        debug_assert!(left <= right);
        debug_assert!(right <= self.width);
        &mut self.data[(self.width * row + left)..(self.width * row + right)]
    }
    pub fn get_index(&self, x: usize, y: usize) -> usize {
        debug_assert!(self.width > x);
        debug_assert!(self.height > y);
        self.width * y + x
    }
    pub fn get_x_y_index(&self, ind: usize) -> (usize, usize) {
        debug_assert!(ind < self.data.len());
        (ind % self.width, ind / self.width)
    }
    pub fn len(&self) -> usize {
        self.data.len()
    }
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
impl<T> Index<(usize, usize)> for Array2D<T> {
    type Output = T;
    fn index(&self, (x, y): (usize, usize)) -> &Self::Output {
        &self.data[self.get_index(x, y)]
    }
}
impl<T> IndexMut<(usize, usize)> for Array2D<T> {
    fn index_mut(&mut self, (x, y): (usize, usize)) -> &mut Self::Output {
        let idx = self.get_index(x, y);
        &mut self.data[idx]
    }
}

/// Borrowed packed pixel buffer as handed over by the host.
///
/// Rows start at multiples of `row_stride` bytes, pixels are `bytes_per_pixel` bytes wide with
/// channel order R, G, B (and A when `bytes_per_pixel == 4`). Origin is top-left.
#[derive(Debug, Clone, Copy)]
pub struct PackedImage<'a> {
    pub data: &'a [u8],
    pub width: usize,
    pub height: usize,
    pub row_stride: usize,
    pub bytes_per_pixel: usize,
}

impl<'a> PackedImage<'a> {
    /// Checks the geometry against the buffer. Width and height are signed because the host
    /// computes them from an extent rectangle, which can be empty or inverted.
    pub fn new(
        data: &'a [u8],
        width: i32,
        height: i32,
        row_stride: usize,
        bytes_per_pixel: usize,
    ) -> Result<Self> {
        if width <= 0 || height <= 0 {
            return Err(Error::InvalidGeometry {
                width: width as i64,
                height: height as i64,
            });
        }
        if !(3..=4).contains(&bytes_per_pixel) {
            return Err(Error::UnsupportedPixelSize(bytes_per_pixel));
        }
        let (width, height) = (width as usize, height as usize);
        let min_stride = width * bytes_per_pixel;
        if row_stride < min_stride {
            return Err(Error::RowStrideTooSmall {
                stride: row_stride,
                min: min_stride,
            });
        }
        let needed = (height - 1) * row_stride + min_stride;
        if data.len() < needed {
            return Err(Error::BufferTooSmall {
                needed,
                actual: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
            row_stride,
            bytes_per_pixel,
        })
    }

    /// Tightly packed RGBA8 buffer.
    pub fn from_rgba8(data: &'a [u8], width: i32, height: i32) -> Result<Self> {
        Self::new(data, width, height, width.max(0) as usize * 4, 4)
    }

    #[inline(always)]
    pub fn get_row(&self, row: usize) -> &[u8] {
        debug_assert!(row < self.height);
        let start = row * self.row_stride;
        &self.data[start..start + self.width * self.bytes_per_pixel]
    }
}

/// RGBA8 output buffer, tightly packed, same geometry as the source.
#[derive(Debug, Clone)]
pub struct RgbaBuffer {
    pub data: AVec<u8, ConstAlign<ALIGN>>,
    pub width: usize,
    pub height: usize,
}

impl RgbaBuffer {
    #[inline(always)]
    pub fn get_index(&self, x: usize, y: usize) -> usize {
        debug_assert!(self.width > x);
        debug_assert!(self.height > y);
        self.width * y * 4 + x * 4
    }
    #[inline(always)]
    pub fn get_pixel(&self, x: usize, y: usize) -> &[u8] {
        let idx = self.get_index(x, y);
        &self.data[idx..idx + 4]
    }
    pub fn get_row(&self, row: usize) -> &[u8] {
        debug_assert!(row < self.height);
        &self.data[(self.width * 4 * row)..(self.width * 4 * (row + 1))]
    }
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Copies the buffer into a destination surface with its own row stride (4 bytes per
    /// pixel).
    pub fn copy_to_strided(&self, dst: &mut [u8], dst_row_stride: usize) -> Result<()> {
        let row_bytes = self.width * 4;
        if dst_row_stride < row_bytes {
            return Err(Error::RowStrideTooSmall {
                stride: dst_row_stride,
                min: row_bytes,
            });
        }
        let needed = (self.height - 1) * dst_row_stride + row_bytes;
        if dst.len() < needed {
            return Err(Error::BufferTooSmall {
                needed,
                actual: dst.len(),
            });
        }
        for (row, dst_row) in dst.chunks_mut(dst_row_stride).take(self.height).enumerate() {
            dst_row[..row_bytes].copy_from_slice(self.get_row(row));
        }
        Ok(())
    }
}

/// Image converted to CIE Lab together with its validity (alpha) mask.
///
/// Both are computed once on ingestion and never change afterward.
#[derive(Debug)]
pub struct LABImage {
    pub lab_data: Array2D<[f64; 3]>,
    /// `true` where the source alpha is non-zero.
    pub valid: Array2D<bool>,
    pub width: usize,
    pub height: usize,
}

impl LABImage {
    /// Ingests a packed buffer. Returns the Lab image and the output buffer seeded with the
    /// original colors and alpha.
    ///
    /// Images without alpha channel are fully opaque.
    pub fn from_packed(source: &PackedImage) -> (Self, RgbaBuffer) {
        let (width, height) = (source.width, source.height);
        let bpp = source.bytes_per_pixel;
        let mut lab_data = Array2D::from_fill([0f64; 3], width, height);
        let mut valid = Array2D::from_fill(false, width, height);
        let mut rgba: AVec<u8, ConstAlign<ALIGN>> =
            AVec::from_iter(ALIGN, (0..width * height * 4).map(|_| 0u8));
        for row in 0..height {
            let src_row = source.get_row(row);
            let lab_row = lab_data.get_row_mut(row);
            let valid_row = valid.get_row_mut(row);
            let rgba_row = &mut rgba[row * width * 4..(row + 1) * width * 4];
            for (((px, lab), is_valid), out) in src_row
                .chunks_exact(bpp)
                .zip(lab_row.iter_mut())
                .zip(valid_row.iter_mut())
                .zip(rgba_row.chunks_exact_mut(4))
            {
                let alpha = if bpp >= 4 { px[3] } else { 255 };
                *lab = srgb_to_cielab_pixel(px);
                *is_valid = alpha != 0;
                out.copy_from_slice(&[px[0], px[1], px[2], alpha]);
            }
        }
        (
            Self {
                lab_data,
                valid,
                width,
                height,
            },
            RgbaBuffer {
                data: rgba,
                width,
                height,
            },
        )
    }

    #[inline(always)]
    pub fn get_index(&self, x: usize, y: usize) -> usize {
        self.lab_data.get_index(x, y)
    }
    #[inline(always)]
    pub fn get_pixel(&self, x: usize, y: usize) -> &[f64; 3] {
        &self.lab_data[(x, y)]
    }
    #[inline(always)]
    pub fn is_valid(&self, x: usize, y: usize) -> bool {
        self.valid[(x, y)]
    }
    pub fn num_valid(&self) -> usize {
        self.valid.data.iter().filter(|v| **v).count()
    }
}
impl Index<(usize, usize)> for LABImage {
    type Output = [f64; 3];
    fn index(&self, (x, y): (usize, usize)) -> &Self::Output {
        self.get_pixel(x, y)
    }
}

#[cfg(test)]
mod tests {
    use super::{Array2D, LABImage, PackedImage};
    use crate::cielab::srgb_to_cielab_pixel;
    use crate::error::Error;
    use image::{Rgb, RgbImage, Rgba, RgbaImage};

    fn gradient(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x * 20) as u8, (y * 20) as u8, 128, ((x + y) % 3 * 100) as u8])
        })
    }

    #[test]
    fn from_packed_rgba_test() {
        let img = gradient(7, 5);
        let source = PackedImage::from_rgba8(img.as_raw(), 7, 5).unwrap();
        let (lab, rgba) = LABImage::from_packed(&source);
        assert_eq!(lab.lab_data.len(), 35);
        assert_eq!(rgba.data.len(), 35 * 4);
        assert_eq!(rgba.as_slice(), img.as_raw().as_slice());
        for (x, y, p) in img.enumerate_pixels() {
            let (x, y) = (x as usize, y as usize);
            assert_eq!(lab.is_valid(x, y), p.0[3] != 0);
            assert_eq!(lab[(x, y)], srgb_to_cielab_pixel(&p.0));
        }
        assert_eq!(lab.num_valid(), img.pixels().filter(|p| p.0[3] != 0).count());
    }

    #[test]
    fn from_packed_rgb_with_padding_test() {
        let img = RgbImage::from_fn(3, 2, |x, y| Rgb([x as u8 * 50, y as u8 * 90, 7]));
        // 3 pixels * 3 bytes + 3 bytes of row padding
        let stride = 12;
        let mut raw = vec![0xAAu8; stride * 2];
        for (y, row) in img.as_raw().chunks_exact(9).enumerate() {
            raw[y * stride..y * stride + 9].copy_from_slice(row);
        }
        let source = PackedImage::new(&raw, 3, 2, stride, 3).unwrap();
        let (lab, rgba) = LABImage::from_packed(&source);
        assert_eq!(lab.num_valid(), 6);
        for (x, y, p) in img.enumerate_pixels() {
            let out = rgba.get_pixel(x as usize, y as usize);
            assert_eq!(&out[..3], &p.0);
            assert_eq!(out[3], 255);
        }
    }

    #[test]
    fn packed_image_validation_test() {
        let raw = [0u8; 64];
        assert_eq!(
            PackedImage::new(&raw, 0, 4, 16, 4).unwrap_err(),
            Error::InvalidGeometry {
                width: 0,
                height: 4
            }
        );
        assert!(matches!(
            PackedImage::new(&raw, 4, -1, 16, 4),
            Err(Error::InvalidGeometry { .. })
        ));
        assert_eq!(
            PackedImage::new(&raw, 4, 4, 16, 2).unwrap_err(),
            Error::UnsupportedPixelSize(2)
        );
        assert_eq!(
            PackedImage::new(&raw, 4, 4, 12, 4).unwrap_err(),
            Error::RowStrideTooSmall { stride: 12, min: 16 }
        );
        assert_eq!(
            PackedImage::new(&raw, 4, 5, 16, 4).unwrap_err(),
            Error::BufferTooSmall {
                needed: 80,
                actual: 64
            }
        );
        assert!(PackedImage::new(&raw, 4, 4, 16, 4).is_ok());
    }

    #[test]
    fn copy_to_strided_test() {
        let img = gradient(4, 3);
        let source = PackedImage::from_rgba8(img.as_raw(), 4, 3).unwrap();
        let (_, rgba) = LABImage::from_packed(&source);
        let mut dst = vec![0u8; 20 * 3];
        rgba.copy_to_strided(&mut dst, 20).unwrap();
        for y in 0..3 {
            assert_eq!(&dst[y * 20..y * 20 + 16], rgba.get_row(y));
            assert_eq!(&dst[y * 20 + 16..y * 20 + 20], &[0, 0, 0, 0]);
        }
        assert!(rgba.copy_to_strided(&mut dst, 8).is_err());
    }

    #[test]
    fn array2d_rows_test() {
        let mut arr = Array2D::from_fill(0u32, 6, 4);
        arr.get_row_mut(2).iter_mut().for_each(|v| *v = 2);
        arr[(5, 3)] = 9;
        assert_eq!(arr.get_row(2), &[2; 6]);
        assert_eq!(arr.get_row_part(3, 4, 6), &[0, 9]);
        assert_eq!(arr.get_x_y_index(arr.get_index(5, 3)), (5, 3));
        assert_eq!(
            Array2D::from_slice(&[1u8, 2, 3], 2, 2).unwrap_err(),
            Error::DimensionMismatch
        );
        arr.fill(1);
        assert!(arr.data.iter().all(|v| *v == 1));
    }
}
