use crate::arrays::RgbaBuffer;
use crate::cielab::cielab_to_srgb_pixel;
use crate::slic::Clusters;

/// Flattens every assigned pixel to the mean color of its cluster.
///
/// Only the color channels are written. Alpha seeded on ingestion stays, and pixels without a
/// cluster keep their original color.
pub fn render(clusters: &Clusters, output: &mut RgbaBuffer) {
    debug_assert_eq!(clusters.assignments.width, output.width);
    debug_assert_eq!(clusters.assignments.height, output.height);
    let colors: Vec<[u8; 3]> = clusters
        .clusters
        .iter()
        .map(|c| cielab_to_srgb_pixel(&c.color()))
        .collect();
    for (pixel, cluster_n) in output
        .data
        .chunks_exact_mut(4)
        .zip(clusters.assignments.data.iter())
    {
        if let Some(rgb) = colors.get(*cluster_n as usize) {
            pixel[..3].copy_from_slice(rgb);
        }
    }
}
