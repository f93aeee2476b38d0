//! Smoothed vertex normals

use chsmodel_core::Vec3;
use chsmodel_export::Corner;

/// Area-weighted average of the face normals around each vertex.
///
/// Face normals use Newell's method, so concave and non-planar polygons are
/// handled. Corners referencing missing vertices are ignored here; vertices
/// no polygon touches get `Vec3::UP`.
pub fn smooth_normals(positions: &[Vec3], polygons: &[Vec<Corner>]) -> Vec<Vec3> {
    let mut sums = vec![Vec3::ZERO; positions.len()];

    for polygon in polygons {
        let points: Vec<(usize, Vec3)> = polygon
            .iter()
            .filter_map(|c| {
                let index = c.vertex as usize;
                positions.get(index).map(|p| (index, *p))
            })
            .collect();
        if points.len() < 3 {
            continue;
        }

        let face = newell_normal(points.iter().map(|(_, p)| *p));
        for (index, _) in &points {
            sums[*index] = sums[*index].add(&face);
        }
    }

    sums.into_iter()
        .map(|n| if n.length() > 0.0 { n.normalize() } else { Vec3::UP })
        .collect()
}

/// Unnormalized polygon normal; its length is twice the polygon area
fn newell_normal(points: impl Iterator<Item = Vec3> + Clone) -> Vec3 {
    let next = points.clone().cycle().skip(1);
    points.zip(next).fold(Vec3::ZERO, |n, (a, b)| {
        Vec3::new(
            n.x + (a.y - b.y) * (a.z + b.z),
            n.y + (a.z - b.z) * (a.x + b.x),
            n.z + (a.x - b.x) * (a.y + b.y),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corners(ids: &[u32]) -> Vec<Corner> {
        ids.iter().map(|&v| Corner::new(v, None)).collect()
    }

    fn close(a: Vec3, b: Vec3) -> bool {
        (a.x - b.x).abs() < 1e-5 && (a.y - b.y).abs() < 1e-5 && (a.z - b.z).abs() < 1e-5
    }

    #[test]
    fn test_flat_quad_faces_z() {
        let positions = vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        ];
        let normals = smooth_normals(&positions, &[corners(&[0, 1, 2, 3])]);
        assert!(normals.iter().all(|n| close(*n, Vec3::new(0.0, 0.0, 1.0))));
    }

    #[test]
    fn test_shared_edge_averages() {
        // two faces folded 90 degrees along the x axis
        let positions = vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(1.0, 0.0, 1.0),
            Vec3::new(0.0, 0.0, 1.0),
        ];
        let polygons = vec![corners(&[0, 1, 2, 3]), corners(&[1, 0, 5, 4])];
        let normals = smooth_normals(&positions, &polygons);

        let s = std::f32::consts::FRAC_1_SQRT_2;
        assert!(close(normals[0], Vec3::new(0.0, s, s)));
        assert!(close(normals[2], Vec3::new(0.0, 0.0, 1.0)));
        assert!(close(normals[4], Vec3::new(0.0, 1.0, 0.0)));
    }

    #[test]
    fn test_unused_and_degenerate() {
        let positions = vec![Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0), Vec3::new(2.0, 0.0, 0.0)];
        let normals = smooth_normals(&positions, &[corners(&[0, 1, 2]), corners(&[0, 9])]);
        assert_eq!(normals, vec![Vec3::UP; 3]);
    }
}
