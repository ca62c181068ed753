use crate::arrays::LABImage;

/// Struct of SLIC cluster/superpixel.
///
/// Identity of the cluster is its index in `Clusters::clusters`, which is also the value stored
/// in the assignments. Fields are updated by `slic::update()`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Cluster {
    /// x position of center, continuous (mean of member columns)
    pub x: f64,
    /// y position of center
    pub y: f64,
    /// Average L color of cluster
    pub l: f64,
    /// Average a color of cluster
    pub a: f64,
    /// Average b color of cluster
    pub b: f64,
    /// Number of pixels inside cluster in the last update
    pub num_members: u32,
}

impl Cluster {
    pub fn from_pixel(image: &LABImage, x: usize, y: usize) -> Self {
        let [l, a, b] = *image.get_pixel(x, y);
        Self {
            x: x as f64,
            y: y as f64,
            l,
            a,
            b,
            num_members: 0,
        }
    }

    #[inline(always)]
    pub fn color(&self) -> [f64; 3] {
        [self.l, self.a, self.b]
    }

    // The window is placed around the truncated center coordinates.
    #[inline(always)]
    fn center(&self) -> (usize, usize) {
        (self.x as usize, self.y as usize)
    }

    #[inline(always)]
    pub(crate) fn top(&self, search_region_size: usize) -> usize {
        self.center().1.saturating_sub(search_region_size)
    }

    #[inline(always)]
    pub(crate) fn bottom(&self, image: &LABImage, search_region_size: usize) -> usize {
        (self.center().1 + search_region_size).min(image.height)
    }

    #[inline(always)]
    pub(crate) fn left(&self, search_region_size: usize) -> usize {
        self.center().0.saturating_sub(search_region_size)
    }

    #[inline(always)]
    pub(crate) fn right(&self, image: &LABImage, search_region_size: usize) -> usize {
        (self.center().0 + search_region_size).min(image.width)
    }

    /// Half-open window `[x-S, x+S) x [y-S, y+S)` clipped to the image, as
    /// `(left..right, top..bottom)`.
    pub fn search_window(
        &self,
        image: &LABImage,
        search_region_size: usize,
    ) -> (std::ops::Range<usize>, std::ops::Range<usize>) {
        (
            self.left(search_region_size)..self.right(image, search_region_size),
            self.top(search_region_size)..self.bottom(image, search_region_size),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::Cluster;
    use crate::arrays::{LABImage, PackedImage};

    fn image(width: i32, height: i32) -> LABImage {
        let raw = vec![255u8; (width * height * 4) as usize];
        let source = PackedImage::from_rgba8(&raw, width, height).unwrap();
        LABImage::from_packed(&source).0
    }

    #[test]
    fn search_window_clipping_test() {
        let img = image(20, 10);
        let inner = Cluster {
            x: 10.7,
            y: 5.2,
            ..Cluster::default()
        };
        assert_eq!(inner.search_window(&img, 3), (7..13, 2..8));
        let corner = Cluster {
            x: 1.9,
            y: 8.0,
            ..Cluster::default()
        };
        assert_eq!(corner.search_window(&img, 4), (0..5, 4..10));
    }

    #[test]
    fn from_pixel_test() {
        let img = image(3, 3);
        let c = Cluster::from_pixel(&img, 2, 1);
        assert_eq!((c.x, c.y, c.num_members), (2.0, 1.0, 0));
        assert_eq!(c.color(), *img.get_pixel(2, 1));
    }
}
