// Wed Jan 15 2026 - Alex

use super::{Vector2, Vector3};
use serde::{Deserialize, Serialize};

/// Row-major 4x4 view-projection matrix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Matrix4 {
    pub data: [f32; 16],
}

impl Default for Matrix4 {
    fn default() -> Self {
        Self { data: [0.0; 16] }
    }
}

impl Matrix4 {
    pub fn from_slice(values: &[f32]) -> Self {
        let mut data = [0.0; 16];
        if values.len() >= 16 {
            data.copy_from_slice(&values[..16]);
        }
        Self { data }
    }

    pub fn identity() -> Self {
        let mut data = [0.0; 16];
        for i in 0..4 {
            data[i * 5] = 1.0;
        }
        Self { data }
    }

    /// Homogeneous transform of a point; returns (x, y, z, w).
    pub fn transform(&self, p: Vector3) -> [f32; 4] {
        let d = &self.data;
        let row = |r: usize| p.x * d[r * 4] + p.y * d[r * 4 + 1] + p.z * d[r * 4 + 2] + d[r * 4 + 3];
        [row(0), row(1), row(2), row(3)]
    }

    /// Screen coordinates for `viewport`, or [`Vector2::OFFSCREEN`] when the
    /// point is behind the camera.
    pub fn project(&self, p: Vector3, viewport: Vector2) -> Vector2 {
        let [x, y, _, w] = self.transform(p);
        if w < 0.1 {
            return Vector2::OFFSCREEN;
        }
        let (ndc_x, ndc_y) = (x / w, y / w);
        Vector2::new(viewport.x / 2.0 * (1.0 + ndc_x), viewport.y / 2.0 * (1.0 - ndc_y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project() {
        let mut m = Matrix4::identity();
        // w = z
        m.data[14] = 1.0;
        m.data[15] = 0.0;
        let viewport = Vector2::new(800.0, 600.0);
        assert_eq!(m.project(Vector3::new(0.0, 0.0, 1.0), viewport), Vector2::new(400.0, 300.0));
        assert_eq!(m.project(Vector3::new(0.0, 0.0, -1.0), viewport), Vector2::OFFSCREEN);
    }
}
