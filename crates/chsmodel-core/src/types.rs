//! Common types used across the exporter
//!
//! Small vector, matrix and color types shared by the pipeline and the scene
//! collaborators.

use serde::{Deserialize, Serialize};

/// 3D vector (position, normal, etc.)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0, z: 0.0 };
    pub const UP: Self = Self { x: 0.0, y: 1.0, z: 0.0 };

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn length(&self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Unit-length copy; the zero vector stays zero
    pub fn normalize(&self) -> Self {
        let len = self.length();
        if len > 0.0 {
            Self {
                x: self.x / len,
                y: self.y / len,
                z: self.z / len,
            }
        } else {
            Self::ZERO
        }
    }

    pub fn dot(&self, other: &Self) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(&self, other: &Self) -> Self {
        Self {
            x: self.y * other.z - self.z * other.y,
            y: self.z * other.x - self.x * other.z,
            z: self.x * other.y - self.y * other.x,
        }
    }

    pub fn add(&self, other: &Self) -> Self {
        Self::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }

    pub fn sub(&self, other: &Self) -> Self {
        Self::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }

    pub fn to_array(&self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }
}

impl Default for Vec3 {
    fn default() -> Self {
        Self::ZERO
    }
}

impl From<[f32; 3]> for Vec3 {
    fn from(v: [f32; 3]) -> Self {
        Self::new(v[0], v[1], v[2])
    }
}

/// Homogeneous point (x, y, z, w)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vec4 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Vec4 {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0, z: 0.0, w: 0.0 };
    pub const ORIGIN: Self = Self { x: 0.0, y: 0.0, z: 0.0, w: 1.0 };

    pub fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }

    /// Point with w = 1
    pub fn point(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z, w: 1.0 }
    }

    /// Divide through by w. Points at infinity (w == 0) keep their xyz.
    pub fn homogenize(&self) -> Vec3 {
        if self.w != 0.0 && self.w != 1.0 {
            Vec3::new(self.x / self.w, self.y / self.w, self.z / self.w)
        } else {
            Vec3::new(self.x, self.y, self.z)
        }
    }
}

impl Default for Vec4 {
    fn default() -> Self {
        Self::ORIGIN
    }
}

/// 2D vector (UV coordinates)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl Default for Vec2 {
    fn default() -> Self {
        Self::ZERO
    }
}

impl From<[f32; 2]> for Vec2 {
    fn from(v: [f32; 2]) -> Self {
        Self::new(v[0], v[1])
    }
}

/// 4x4 transformation matrix, stored row by row as captured from the host
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Mat4x4 {
    pub m: [[f32; 4]; 4],
}

impl Mat4x4 {
    pub const IDENTITY: Self = Self {
        m: [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ],
    };

    /// Create a new matrix from a flat row-major array
    pub fn from_flat(data: &[f32; 16]) -> Self {
        Self {
            m: [
                [data[0], data[1], data[2], data[3]],
                [data[4], data[5], data[6], data[7]],
                [data[8], data[9], data[10], data[11]],
                [data[12], data[13], data[14], data[15]],
            ],
        }
    }

    /// Flatten row by row
    pub fn to_flat(&self) -> [f32; 16] {
        let mut out = [0.0; 16];
        for (row, values) in self.m.iter().enumerate() {
            out[row * 4..row * 4 + 4].copy_from_slice(values);
        }
        out
    }

    /// Translation component (row-vector convention, last row)
    pub fn translation(&self) -> Vec3 {
        Vec3::new(self.m[3][0], self.m[3][1], self.m[3][2])
    }

    /// Transform a point using the row-vector convention `p * M`
    pub fn transform_point(&self, p: &Vec4) -> Vec4 {
        let v = [p.x, p.y, p.z, p.w];
        let mut out = [0.0f32; 4];
        for (col, slot) in out.iter_mut().enumerate() {
            *slot = (0..4).map(|row| v[row] * self.m[row][col]).sum();
        }
        Vec4::new(out[0], out[1], out[2], out[3])
    }

    /// Transform a direction (w = 0) using the row-vector convention
    pub fn transform_vector(&self, v: &Vec3) -> Vec3 {
        let p = self.transform_point(&Vec4::new(v.x, v.y, v.z, 0.0));
        Vec3::new(p.x, p.y, p.z)
    }

    /// Inverse-transpose of the upper 3x3, laid out for row vectors (`n * N`).
    ///
    /// `None` when the linear part is singular.
    pub fn normal_matrix(&self) -> Option<[[f32; 3]; 3]> {
        let row = |i: usize| Vec3::new(self.m[i][0], self.m[i][1], self.m[i][2]);
        let (r0, r1, r2) = (row(0), row(1), row(2));

        let det = r0.dot(&r1.cross(&r2));
        if det.abs() <= f32::EPSILON {
            return None;
        }
        // cofactor rows divided by the determinant
        let scale = |v: Vec3| [v.x / det, v.y / det, v.z / det];
        Some([scale(r1.cross(&r2)), scale(r2.cross(&r0)), scale(r0.cross(&r1))])
    }

    /// Transform a surface normal so it stays perpendicular under non-uniform
    /// scale. Falls back to the plain vector transform for singular matrices.
    pub fn transform_normal(&self, n: &Vec3) -> Vec3 {
        match self.normal_matrix() {
            Some(nm) => Vec3::new(
                n.x * nm[0][0] + n.y * nm[1][0] + n.z * nm[2][0],
                n.x * nm[0][1] + n.y * nm[1][1] + n.z * nm[2][1],
                n.x * nm[0][2] + n.y * nm[1][2] + n.z * nm[2][2],
            )
            .normalize(),
            None => self.transform_vector(n).normalize(),
        }
    }

    /// Matrix product `self * other`
    pub fn multiply(&self, other: &Self) -> Self {
        let mut m = [[0.0f32; 4]; 4];
        for (row, out_row) in m.iter_mut().enumerate() {
            for (col, slot) in out_row.iter_mut().enumerate() {
                *slot = (0..4).map(|k| self.m[row][k] * other.m[k][col]).sum();
            }
        }
        Self { m }
    }
}

impl Default for Mat4x4 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Color in normalized RGBA (0.0-1.0 per channel)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const WHITE: Self = Self { r: 1.0, g: 1.0, b: 1.0, a: 1.0 };
    pub const BLACK: Self = Self { r: 0.0, g: 0.0, b: 0.0, a: 1.0 };

    pub fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Opaque color
    pub fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub fn to_array(&self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

impl From<[f32; 4]> for Color {
    fn from(c: [f32; 4]) -> Self {
        Self::new(c[0], c[1], c[2], c[3])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec3_operations() {
        let v1 = Vec3::new(1.0, 2.0, 3.0);
        let v2 = Vec3::new(4.0, 5.0, 6.0);

        assert!((v1.dot(&v2) - 32.0).abs() < 0.001);

        let cross = v1.cross(&v2);
        assert!((cross.x - (-3.0)).abs() < 0.001);
        assert!((cross.y - 6.0).abs() < 0.001);
        assert!((cross.z - (-3.0)).abs() < 0.001);
    }

    #[test]
    fn test_homogenize() {
        assert_eq!(Vec4::new(2.0, 4.0, 6.0, 2.0).homogenize(), Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(Vec4::point(1.0, 2.0, 3.0).homogenize(), Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(Vec4::new(1.0, 0.0, 0.0, 0.0).homogenize(), Vec3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_matrix_flat_roundtrip() {
        let flat: [f32; 16] = std::array::from_fn(|i| i as f32);
        let m = Mat4x4::from_flat(&flat);
        assert_eq!(m.to_flat(), flat);
        assert_eq!(m.translation(), Vec3::new(12.0, 13.0, 14.0));
    }

    #[test]
    fn test_transform_point_translation() {
        let mut m = Mat4x4::IDENTITY;
        m.m[3] = [5.0, -1.0, 2.0, 1.0];
        let p = m.transform_point(&Vec4::point(1.0, 1.0, 1.0));
        assert_eq!(p.homogenize(), Vec3::new(6.0, 0.0, 3.0));
        assert_eq!(m.transform_vector(&Vec3::UP), Vec3::UP);
    }

    #[test]
    fn test_normal_stays_perpendicular_under_scale() {
        let mut m = Mat4x4::IDENTITY;
        m.m[0][0] = 2.0;
        m.m[3] = [3.0, 0.0, 0.0, 1.0];

        // surface spanned by the edge (1, -1, 0) and the z axis
        let s = std::f32::consts::FRAC_1_SQRT_2;
        let n = m.transform_normal(&Vec3::new(s, s, 0.0));
        let edge = m.transform_vector(&Vec3::new(1.0, -1.0, 0.0));

        assert!(n.dot(&edge).abs() < 1e-5);
        assert!((n.length() - 1.0).abs() < 1e-5);
        assert!(n.x > 0.0 && n.y > 0.0);
    }

    #[test]
    fn test_normal_matrix_of_rotation_is_rotation() {
        // 90 degrees about z: x -> y
        let m = Mat4x4::from_flat(&[
            0.0, 1.0, 0.0, 0.0, //
            -1.0, 0.0, 0.0, 0.0, //
            0.0, 0.0, 1.0, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ]);
        let n = m.transform_normal(&Vec3::new(1.0, 0.0, 0.0));
        assert!((n.x).abs() < 1e-6 && (n.y - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_singular_matrix_has_no_normal_matrix() {
        let mut m = Mat4x4::IDENTITY;
        m.m[2][2] = 0.0;
        assert!(m.normal_matrix().is_none());
        assert_eq!(m.transform_normal(&Vec3::UP), Vec3::UP);
    }

    #[test]
    fn test_color_default_is_opaque_white() {
        assert_eq!(Color::default().to_array(), [1.0, 1.0, 1.0, 1.0]);
        assert_eq!(Color::rgb(0.5, 0.25, 0.0).a, 1.0);
    }
}
