use crate::arrays::{Array2D, LABImage};
use crate::assign::assign;
use crate::cluster::Cluster;
use crate::common::Config;
use log::{debug, trace};
use multiversion::multiversion;

/// Assignment value of pixels which don't belong to any cluster (yet).
pub const UNASSIGNED: u32 = u32::MAX;

/// Convenient struct for passing values around.
#[derive(Debug, Clone)]
pub struct Clusters {
    /// For every pixel in image this stores index of the cluster it belongs to or `UNASSIGNED`.
    pub assignments: Array2D<u32>,
    pub clusters: Vec<Cluster>,
    /// Seed spacing (_S_), reused unchanged as the search radius in every iteration.
    pub search_region_size: usize,
}

impl Clusters {
    /// Default initialize clusters function.
    ///
    /// Seeds are laid on a regular grid with spacing `config.step()` starting at `(S/2, S/2)`.
    /// A seed which falls on an invalid (transparent) pixel is moved to the first valid pixel
    /// of the surrounding `[x-S/2, x+S/2) x [y-S/2, y+S/2)` neighbourhood in row-major order.
    /// When there is none, the grid point gets no cluster at all.
    pub fn initialize_clusters(image: &LABImage, config: &Config) -> Clusters {
        let step = config.step();
        let half = step / 2;
        let mut clusters = Clusters {
            assignments: Array2D::from_fill(UNASSIGNED, image.width, image.height),
            clusters: Vec::with_capacity(
                image.width.div_ceil(step) * image.height.div_ceil(step),
            ),
            search_region_size: step,
        };
        let mut relocated = 0usize;
        let mut skipped = 0usize;
        for y in (half..image.height).step_by(step) {
            for x in (half..image.width).step_by(step) {
                let seed = if image.is_valid(x, y) {
                    Some((x, y))
                } else {
                    let found = find_valid_in_neighbourhood(image, x, y, half);
                    match found {
                        Some(_) => relocated += 1,
                        None => skipped += 1,
                    }
                    found
                };
                if let Some((seed_x, seed_y)) = seed {
                    clusters
                        .clusters
                        .push(Cluster::from_pixel(image, seed_x, seed_y));
                }
            }
        }
        debug!(
            "seeded {} clusters with step {step} ({relocated} relocated, {skipped} skipped)",
            clusters.clusters.len()
        );
        clusters
    }

    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    /// Cluster owning the pixel, `None` for unassigned pixels.
    #[inline(always)]
    pub fn cluster_of(&self, x: usize, y: usize) -> Option<&Cluster> {
        self.clusters.get(self.assignments[(x, y)] as usize)
    }
}

fn find_valid_in_neighbourhood(
    image: &LABImage,
    x: usize,
    y: usize,
    range: usize,
) -> Option<(usize, usize)> {
    let rows = y.saturating_sub(range)..(y + range).min(image.height);
    let columns = x.saturating_sub(range)..(x + range).min(image.width);
    rows.flat_map(|ny| columns.clone().map(move |nx| (nx, ny)))
        .find(|&(nx, ny)| image.is_valid(nx, ny))
}

/// One iteration of the main loop: assign, update and reset of the distances for the next
/// iteration (skipped after the last one).
pub fn iteration(
    image: &LABImage,
    config: &Config,
    clusters: &mut Clusters,
    min_distances: &mut Array2D<f64>,
    i: u16,
) {
    assign(image, clusters, min_distances, config.compactness);
    update(clusters, image);
    trace!("iteration {i} done");
    if i + 1 < config.max_iterations {
        min_distances.fill(f64::INFINITY);
    }
}

/// This function is the main loop without any host interaction.
///
/// The steps are generally:
/// - N iterations
///     - assign
///     - update (empty clusters are rolled back)
///
/// The distances map is returned, it holds the distance of every valid pixel to its cluster
/// from the last assignment and can be useful for post-processing.
pub fn iterate(image: &LABImage, config: &Config, clusters: &mut Clusters) -> Array2D<f64> {
    let mut min_distances = Array2D::from_fill(f64::INFINITY, image.width, image.height);
    for i in 0..config.max_iterations {
        iteration(image, config, clusters, &mut min_distances, i);
    }
    min_distances
}

/// This function does the update step.
///
/// Every valid assigned pixel contributes its color and position to the mean of its cluster.
/// A cluster without members keeps the values it had before the update instead of collapsing
/// to zero.
#[multiversion(targets = "simd")]
pub fn update(clusters: &mut Clusters, image: &LABImage) {
    let previous: Vec<Cluster> = clusters.clusters.clone();
    let mut cluster_acc: Vec<[f64; 5]> = vec![[0f64; 5]; clusters.clusters.len()];
    let mut num_cluster_members: Vec<u32> = vec![0; clusters.clusters.len()];

    for row in 0..image.height {
        let image_row = image.lab_data.get_row(row);
        let valid_row = image.valid.get_row(row);
        let assignments_row = clusters.assignments.get_row(row);
        for (column, ((pixel, valid), cluster_n)) in image_row
            .iter()
            .zip(valid_row)
            .zip(assignments_row)
            .enumerate()
        {
            let cluster_n = *cluster_n as usize;
            if !*valid || cluster_n >= cluster_acc.len() {
                continue;
            }
            let acc = &mut cluster_acc[cluster_n];
            acc[0] += pixel[0];
            acc[1] += pixel[1];
            acc[2] += pixel[2];
            acc[3] += column as f64;
            acc[4] += row as f64;
            num_cluster_members[cluster_n] += 1;
        }
    }

    for (cluster_n, cluster) in clusters.clusters.iter_mut().enumerate() {
        let cluster_members = num_cluster_members[cluster_n];
        if cluster_members == 0 {
            *cluster = previous[cluster_n];
            continue;
        }
        let n = cluster_members as f64;
        let [l, a, b, x, y] = cluster_acc[cluster_n];
        *cluster = Cluster {
            l: l / n,
            a: a / n,
            b: b / n,
            x: x / n,
            y: y / n,
            num_members: cluster_members,
        };
        debug_assert!(
            cluster.x < image.width as f64 && cluster.y < image.height as f64,
            "{:?} moved out of bounds",
            cluster
        );
    }
}
