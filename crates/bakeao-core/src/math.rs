use glam::{Mat3, Mat4, Vec2, Vec3};
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box in world space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Default for Aabb {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl Aabb {
    /// Inverted box; the identity for `union`.
    pub const EMPTY: Self = Self {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    pub fn from_points(points: &[Vec3]) -> Self {
        points.iter().fold(Self::EMPTY, |b, &p| b.grow(p))
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    pub fn grow(self, p: Vec3) -> Self {
        Self {
            min: self.min.min(p),
            max: self.max.max(p),
        }
    }

    pub fn union(self, other: Self) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn extent(&self) -> Vec3 {
        if self.is_empty() {
            Vec3::ZERO
        } else {
            self.max - self.min
        }
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Half surface area, the SAH cost metric.
    pub fn half_area(&self) -> f32 {
        let e = self.extent();
        e.x * e.y + e.y * e.z + e.z * e.x
    }

    /// Distance between two boxes (0 when they overlap).
    pub fn distance_to(&self, other: &Aabb) -> f32 {
        let gap = (other.min - self.max).max(self.min - other.max).max(Vec3::ZERO);
        gap.length()
    }

    /// Slab test. Returns the entry distance when the ray overlaps the box
    /// within [0, t_max].
    pub fn ray_entry(&self, origin: Vec3, inv_dir: Vec3, t_max: f32) -> Option<f32> {
        let t1 = (self.min - origin) * inv_dir;
        let t2 = (self.max - origin) * inv_dir;
        let t_near = t1.min(t2).max_element().max(0.0);
        let t_far = t1.max(t2).min_element().min(t_max);
        if t_near <= t_far {
            Some(t_near)
        } else {
            None
        }
    }

    /// Transform all eight corners and re-fit.
    pub fn transformed(&self, m: &Mat4) -> Self {
        if self.is_empty() {
            return *self;
        }
        let mut out = Self::EMPTY;
        for i in 0..8 {
            let corner = Vec3::new(
                if i & 1 == 0 { self.min.x } else { self.max.x },
                if i & 2 == 0 { self.min.y } else { self.max.y },
                if i & 4 == 0 { self.min.z } else { self.max.z },
            );
            out = out.grow(m.transform_point3(corner));
        }
        out
    }
}

/// Matrix that maps object-space normals to world space (inverse transpose).
/// Falls back to the plain linear part when the transform is singular.
pub fn normal_matrix(object_to_world: &Mat4) -> Mat3 {
    let linear = Mat3::from_mat4(*object_to_world);
    if linear.determinant().abs() <= f32::EPSILON {
        return linear;
    }
    linear.inverse().transpose()
}

/// Twice the signed area of a UV triangle.
pub fn signed_area_2d(a: Vec2, b: Vec2, c: Vec2) -> f32 {
    (b - a).perp_dot(c - a)
}

/// Area of a 3D triangle.
pub fn triangle_area(a: Vec3, b: Vec3, c: Vec3) -> f32 {
    0.5 * (b - a).cross(c - a).length()
}

/// Barycentric coordinates of `p` in the UV triangle `(a, b, c)`.
/// `double_area` is `signed_area_2d(a, b, c)` and must be non-zero.
pub fn barycentric_2d(p: Vec2, a: Vec2, b: Vec2, c: Vec2, double_area: f32) -> Vec3 {
    let w0 = signed_area_2d(b, c, p) / double_area;
    let w1 = signed_area_2d(c, a, p) / double_area;
    let w2 = 1.0 - w0 - w1;
    Vec3::new(w0, w1, w2)
}

/// Component-wise reciprocal that maps zero to a large finite value so slab
/// tests stay NaN-free for axis-aligned rays.
pub fn safe_inverse(dir: Vec3) -> Vec3 {
    let inv = |v: f32| {
        if v.abs() > 1e-12 {
            1.0 / v
        } else {
            1e12f32.copysign(v)
        }
    };
    Vec3::new(inv(dir.x), inv(dir.y), inv(dir.z))
}
