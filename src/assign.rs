use crate::arrays::{Array2D, LABImage};
use crate::slic::Clusters;
use assume::assume;
use multiversion::multiversion;

/// The assignment step.
///
/// For every cluster `k` only its window `[x-S, x+S) x [y-S, y+S)` (clipped to the image) is
/// scanned, every valid pixel in it gets distance
///
/// _D² = ΔL² + Δa² + Δb² + (m²/S²)·(Δx² + Δy²)_
///
/// and is claimed by `k` when _D²_ is strictly lower than the best distance stored for the
/// pixel. Windows overlap, so the stored minimum is shared by all clusters of one sweep and
/// `min_distances` must be reset by the caller between sweeps, not between clusters.
#[multiversion(targets = "simd")]
pub fn assign(
    image: &LABImage,
    clusters: &mut Clusters,
    min_distances: &mut Array2D<f64>,
    compactness: f64,
) {
    let search_region_size = clusters.search_region_size;
    let s = search_region_size as f64;
    let spatial_coef = compactness * compactness / (s * s);
    let Clusters {
        assignments,
        clusters,
        ..
    } = clusters;
    for (number, cluster) in clusters.iter().enumerate() {
        let (columns, rows) = cluster.search_window(image, search_region_size);
        if columns.is_empty() {
            continue;
        }
        let cluster_color = cluster.color();
        let center = (cluster.x, cluster.y);
        for row in rows {
            let dy = row as f64 - center.1;
            assign_row_generic(
                image.lab_data.get_row_part(row, columns.start, columns.end),
                image.valid.get_row_part(row, columns.start, columns.end),
                &cluster_color,
                columns.start,
                center.0,
                dy * dy,
                spatial_coef,
                number as u32,
                min_distances.get_row_part_mut(row, columns.start, columns.end),
                assignments.get_row_part_mut(row, columns.start, columns.end),
            );
        }
    }
}

/// Assigns one row part of a cluster window starting at column `left`. `dy2` is the squared
/// vertical offset of the row from the cluster center.
#[allow(clippy::too_many_arguments)]
#[inline(always)]
fn assign_row_generic(
    image_row: &[[f64; 3]],
    valid_row: &[bool],
    cluster_color: &[f64; 3],
    left: usize,
    center_x: f64,
    dy2: f64,
    spatial_coef: f64,
    cluster_number: u32,
    min_distances_row: &mut [f64],
    assignments_row: &mut [u32],
) {
    assume!(unsafe: valid_row.len() == image_row.len());
    assume!(unsafe: min_distances_row.len() == image_row.len());
    assume!(unsafe: assignments_row.len() == image_row.len());
    for (i, (((pixel, valid), min_distance), assignment)) in image_row
        .iter()
        .zip(valid_row)
        .zip(min_distances_row.iter_mut())
        .zip(assignments_row.iter_mut())
        .enumerate()
    {
        if !*valid {
            continue;
        }
        let dl = pixel[0] - cluster_color[0];
        let da = pixel[1] - cluster_color[1];
        let db = pixel[2] - cluster_color[2];
        let dx = (left + i) as f64 - center_x;
        let distance = (dl * dl + da * da + db * db) + spatial_coef * (dx * dx + dy2);
        if distance < *min_distance {
            *min_distance = distance;
            *assignment = cluster_number;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::assign;
    use crate::arrays::{Array2D, LABImage, PackedImage};
    use crate::cluster::Cluster;
    use crate::common::Config;
    use crate::slic::{Clusters, UNASSIGNED};
    use image::{Rgba, RgbaImage};

    fn lab_image(img: &RgbaImage) -> LABImage {
        let source =
            PackedImage::from_rgba8(img.as_raw(), img.width() as i32, img.height() as i32)
                .unwrap();
        LABImage::from_packed(&source).0
    }

    fn stripes() -> RgbaImage {
        RgbaImage::from_fn(12, 9, |x, y| {
            let alpha = if x == 11 && y % 2 == 0 { 0 } else { 255 };
            if x < 6 {
                Rgba([230, 30, 30, alpha])
            } else {
                Rgba([30, 30, 230, alpha])
            }
        })
    }

    /// Brute force reference: the minimum over all clusters whose window covers the pixel.
    fn reference_distance(
        image: &LABImage,
        clusters: &Clusters,
        m: f64,
        x: usize,
        y: usize,
    ) -> f64 {
        let s = clusters.search_region_size as f64;
        clusters
            .clusters
            .iter()
            .filter(|c| {
                let (columns, rows) = c.search_window(image, clusters.search_region_size);
                columns.contains(&x) && rows.contains(&y)
            })
            .map(|c| {
                let p = image.get_pixel(x, y);
                let color = c.color();
                let d_lab = (p[0] - color[0]).powi(2)
                    + (p[1] - color[1]).powi(2)
                    + (p[2] - color[2]).powi(2);
                let d_xy = (x as f64 - c.x).powi(2) + (y as f64 - c.y).powi(2);
                d_lab + (m * m / (s * s)) * d_xy
            })
            .fold(f64::INFINITY, f64::min)
    }

    #[test]
    fn assign_test() {
        let image = lab_image(&stripes());
        let config = Config::new(3, 10.0);
        let mut clusters = Clusters::initialize_clusters(&image, &config);
        let mut min_distances = Array2D::from_fill(f64::INFINITY, image.width, image.height);
        assign(&image, &mut clusters, &mut min_distances, config.compactness);
        for y in 0..image.height {
            for x in 0..image.width {
                let label = clusters.assignments[(x, y)];
                if !image.is_valid(x, y) {
                    assert_eq!(label, UNASSIGNED);
                    assert!(min_distances[(x, y)].is_infinite());
                    continue;
                }
                let expected = reference_distance(&image, &clusters, config.compactness, x, y);
                assert!(
                    (min_distances[(x, y)] - expected).abs() < 1e-9,
                    "({x}, {y}): {} != {expected}",
                    min_distances[(x, y)]
                );
                assert!((label as usize) < clusters.len());
            }
        }
    }

    #[test]
    fn assign_order_independent_test() {
        let image = lab_image(&stripes());
        let config = Config::new(4, 3.0);
        let mut forward = Clusters::initialize_clusters(&image, &config);
        let mut backward = forward.clone();
        backward.clusters.reverse();
        let mut min_forward = Array2D::from_fill(f64::INFINITY, image.width, image.height);
        let mut min_backward = min_forward.clone();
        assign(&image, &mut forward, &mut min_forward, config.compactness);
        assign(&image, &mut backward, &mut min_backward, config.compactness);
        let n = forward.len() as u32;
        for i in 0..min_forward.len() {
            assert_eq!(min_forward.data[i], min_backward.data[i]);
            let (f, b) = (forward.assignments.data[i], backward.assignments.data[i]);
            if f != UNASSIGNED {
                let owner = forward.clusters[f as usize];
                let other = backward.clusters[b as usize];
                // same cluster or a tie with identical distance
                assert!(f == n - 1 - b || owner.color() == other.color());
            }
        }
    }

    #[test]
    fn assign_keeps_lower_distance_test() {
        let image = lab_image(&stripes());
        let mut clusters = Clusters {
            assignments: Array2D::from_fill(UNASSIGNED, image.width, image.height),
            clusters: vec![Cluster::from_pixel(&image, 2, 4)],
            search_region_size: 3,
        };
        let mut min_distances = Array2D::from_fill(f64::INFINITY, image.width, image.height);
        min_distances[(2, 4)] = -1.0;
        assign(&image, &mut clusters, &mut min_distances, 10.0);
        assert_eq!(clusters.assignments[(2, 4)], UNASSIGNED);
        assert_eq!(clusters.assignments[(3, 4)], 0);
        // the window is half-open: x+S is outside
        assert_eq!(clusters.assignments[(5, 4)], UNASSIGNED);
        assert_eq!(clusters.assignments[(4, 4)], 0);
        assert_eq!(clusters.assignments[(2, 1)], 0);
        assert_eq!(clusters.assignments[(2, 7)], UNASSIGNED);
    }
}
