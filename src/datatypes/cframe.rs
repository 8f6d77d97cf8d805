// Wed Jan 15 2026 - Alex

use super::Vector3;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Mul, Sub};

/// Position plus an orthonormal right/up/look basis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CFrame {
    pub position: Vector3,
    pub right: Vector3,
    pub up: Vector3,
    pub look: Vector3,
}

impl Default for CFrame {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl CFrame {
    pub const IDENTITY: CFrame = CFrame {
        position: Vector3::ZERO,
        right: Vector3::X_AXIS,
        up: Vector3::Y_AXIS,
        look: Vector3::new(0.0, 0.0, -1.0),
    };

    pub fn from_position(position: Vector3) -> Self {
        Self { position, ..Self::IDENTITY }
    }

    /// Re-orthonormalizes the given axes; `look` is derived from the other two.
    pub fn from_axes(position: Vector3, right: Vector3, up: Vector3) -> Self {
        let right = right.unit();
        if right == Vector3::ZERO {
            return Self::from_position(position);
        }
        let mut up = (up - right * up.dot(right)).unit();
        if up == Vector3::ZERO {
            let fallback = if right.dot(Vector3::Y_AXIS).abs() > 0.9999 {
                Vector3::X_AXIS
            } else {
                Vector3::Y_AXIS
            };
            up = (fallback - right * fallback.dot(right)).unit();
        }
        let look = -right.cross(up).unit();
        Self { position, right, up, look }
    }

    /// Row-major 3x3 rotation followed by the position, as laid out in part
    /// primitives. The third column stores the backward axis.
    pub fn from_components(data: &[f32]) -> Self {
        if data.len() < 12 {
            return Self::IDENTITY;
        }
        let column = |c: usize| Vector3::new(data[c], data[c + 3], data[c + 6]);
        Self {
            position: Vector3::new(data[9], data[10], data[11]),
            right: column(0),
            up: column(1),
            look: -column(2),
        }
    }

    pub fn components(&self) -> [f32; 12] {
        let back = -self.look;
        [
            self.right.x, self.up.x, back.x,
            self.right.y, self.up.y, back.y,
            self.right.z, self.up.z, back.z,
            self.position.x, self.position.y, self.position.z,
        ]
    }

    fn rotate(&self, v: Vector3) -> Vector3 {
        self.right * v.x + self.up * v.y + self.look * v.z
    }

    pub fn inverse(&self) -> CFrame {
        let right = Vector3::new(self.right.x, self.up.x, self.look.x);
        let up = Vector3::new(self.right.y, self.up.y, self.look.y);
        let look = Vector3::new(self.right.z, self.up.z, self.look.z);
        let position = Vector3::new(
            -self.position.dot(self.right),
            -self.position.dot(self.up),
            -self.position.dot(self.look),
        );
        CFrame { position, right, up, look }
    }

    pub fn to_world_space(&self, other: CFrame) -> CFrame {
        *self * other
    }

    pub fn to_object_space(&self, other: CFrame) -> CFrame {
        self.inverse() * other
    }
}

impl Mul for CFrame {
    type Output = CFrame;
    fn mul(self, rhs: CFrame) -> CFrame {
        CFrame {
            position: self.position + self.rotate(rhs.position),
            right: self.rotate(rhs.right),
            up: self.rotate(rhs.up),
            look: self.rotate(rhs.look),
        }
    }
}

impl Mul<Vector3> for CFrame {
    type Output = Vector3;
    fn mul(self, rhs: Vector3) -> Vector3 {
        self.position + self.rotate(rhs)
    }
}

impl Add<Vector3> for CFrame {
    type Output = CFrame;
    fn add(self, rhs: Vector3) -> CFrame {
        CFrame { position: self.position + rhs, ..self }
    }
}

impl Sub<Vector3> for CFrame {
    type Output = CFrame;
    fn sub(self, rhs: Vector3) -> CFrame {
        CFrame { position: self.position - rhs, ..self }
    }
}

impl fmt::Display for CFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P: {}, R: {}, U: {}, L: {}", self.position, self.right, self.up, self.look)
    }
}
