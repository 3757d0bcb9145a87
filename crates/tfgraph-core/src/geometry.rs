//! Rigid-body geometry: vectors, unit quaternions and poses.
//!
//! A [`Pose`] registered on an edge `from => to` is the pose of `from`
//! expressed in `to`: it maps a point given in `from` coordinates into `to`
//! coordinates (rotate, then translate).
//!
//! # Example
//!
//! ```rust
//! use tfgraph_core::geometry::{Pose, Quaternion, Vec3};
//! use std::f64::consts::FRAC_PI_2;
//!
//! let base_in_world = Pose::new(Vec3::new(1.0, 0.0, 0.0), Quaternion::identity());
//! let camera_in_base = Pose::new(
//!     Vec3::new(0.5, 0.0, 0.0),
//!     Quaternion::from_axis_angle(Vec3::unit_z(), FRAC_PI_2),
//! );
//!
//! let camera_in_world = base_in_world * camera_in_base;
//! assert!((camera_in_world.translation.x - 1.5).abs() < 1e-9);
//! assert!((camera_in_world * camera_in_world.inverse()).approx_eq(&Pose::identity(), 1e-9));
//! ```

use std::ops::{Mul, Neg};

use serde::{Deserialize, Serialize};

// ────────────────────────────────────────────────────────────────────────────
// Vec3
// ────────────────────────────────────────────────────────────────────────────

/// A 3-D vector.  Serialized as `[x, y, z]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 3]", into = "[f64; 3]")]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    pub fn unit_x() -> Self {
        Self::new(1.0, 0.0, 0.0)
    }

    pub fn unit_y() -> Self {
        Self::new(0.0, 1.0, 0.0)
    }

    pub fn unit_z() -> Self {
        Self::new(0.0, 0.0, 1.0)
    }

    pub fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }

    pub fn scale(self, s: f64) -> Self {
        Self::new(self.x * s, self.y * s, self.z * s)
    }

    pub fn norm(self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Unit vector in the same direction, or `None` for a (near) zero vector.
    pub fn normalized(self) -> Option<Self> {
        let n = self.norm();
        if n < f64::EPSILON {
            None
        } else {
            Some(self.scale(1.0 / n))
        }
    }

    pub fn approx_eq(&self, other: &Self, tolerance: f64) -> bool {
        (self.x - other.x).abs() <= tolerance
            && (self.y - other.y).abs() <= tolerance
            && (self.z - other.z).abs() <= tolerance
    }
}

impl Neg for Vec3 {
    type Output = Vec3;

    fn neg(self) -> Vec3 {
        Vec3::new(-self.x, -self.y, -self.z)
    }
}

impl From<[f64; 3]> for Vec3 {
    fn from(v: [f64; 3]) -> Self {
        Vec3::new(v[0], v[1], v[2])
    }
}

impl From<Vec3> for [f64; 3] {
    fn from(v: Vec3) -> Self {
        [v.x, v.y, v.z]
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Quaternion
// ────────────────────────────────────────────────────────────────────────────

/// A unit quaternion representing a 3-D rotation (w, x, y, z convention).
/// Serialized as `[w, x, y, z]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct Quaternion {
    pub w: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Quaternion {
    /// Create a quaternion.  The caller is responsible for providing a unit
    /// quaternion, or for calling [`Quaternion::normalize`].
    pub fn new(w: f64, x: f64, y: f64, z: f64) -> Self {
        Self { w, x, y, z }
    }

    pub fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0, 0.0)
    }

    /// Rotation of `angle` radians about `axis`.  A zero axis yields the
    /// identity.
    pub fn from_axis_angle(axis: Vec3, angle: f64) -> Self {
        match axis.normalized() {
            Some(a) => {
                let (s, c) = (angle * 0.5).sin_cos();
                Self::new(c, a.x * s, a.y * s, a.z * s)
            }
            None => Self::identity(),
        }
    }

    /// Fixed-axis roll/pitch/yaw: rotate about X by `roll`, then about the
    /// fixed Y by `pitch`, then about the fixed Z by `yaw`.
    pub fn from_rpy(roll: f64, pitch: f64, yaw: f64) -> Self {
        Self::from_axis_angle(Vec3::unit_z(), yaw)
            * Self::from_axis_angle(Vec3::unit_y(), pitch)
            * Self::from_axis_angle(Vec3::unit_x(), roll)
    }

    pub fn norm(self) -> f64 {
        (self.w * self.w + self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Scale to unit length.  A zero quaternion becomes the identity.
    pub fn normalize(self) -> Self {
        let n = self.norm();
        if n < f64::EPSILON {
            Self::identity()
        } else {
            Self::new(self.w / n, self.x / n, self.y / n, self.z / n)
        }
    }

    /// Conjugate (== inverse for a unit quaternion).
    pub fn conjugate(self) -> Self {
        Self::new(self.w, -self.x, -self.y, -self.z)
    }

    pub fn inverse(self) -> Self {
        self.normalize().conjugate()
    }

    /// Rotate a vector by this quaternion: p' = q * p * q*.
    pub fn rotate(self, v: Vec3) -> Vec3 {
        let p = Self::new(0.0, v.x, v.y, v.z);
        let rotated = self * p * self.conjugate();
        Vec3::new(rotated.x, rotated.y, rotated.z)
    }

    /// Compare two rotations; `q` and `-q` describe the same rotation.
    pub fn approx_eq(&self, other: &Self, tolerance: f64) -> bool {
        let same = (self.w - other.w).abs() <= tolerance
            && (self.x - other.x).abs() <= tolerance
            && (self.y - other.y).abs() <= tolerance
            && (self.z - other.z).abs() <= tolerance;
        let opposite = (self.w + other.w).abs() <= tolerance
            && (self.x + other.x).abs() <= tolerance
            && (self.y + other.y).abs() <= tolerance
            && (self.z + other.z).abs() <= tolerance;
        same || opposite
    }
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::identity()
    }
}

/// Hamilton product: compose two rotations.
impl Mul for Quaternion {
    type Output = Quaternion;

    fn mul(self, rhs: Self) -> Self {
        Self::new(
            self.w * rhs.w - self.x * rhs.x - self.y * rhs.y - self.z * rhs.z,
            self.w * rhs.x + self.x * rhs.w + self.y * rhs.z - self.z * rhs.y,
            self.w * rhs.y - self.x * rhs.z + self.y * rhs.w + self.z * rhs.x,
            self.w * rhs.z + self.x * rhs.y - self.y * rhs.x + self.z * rhs.w,
        )
    }
}

impl From<[f64; 4]> for Quaternion {
    fn from(q: [f64; 4]) -> Self {
        Quaternion::new(q[0], q[1], q[2], q[3])
    }
}

impl From<Quaternion> for [f64; 4] {
    fn from(q: Quaternion) -> Self {
        [q.w, q.x, q.y, q.z]
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Pose
// ────────────────────────────────────────────────────────────────────────────

/// A rigid-body pose: rotation followed by translation.
///
/// Serialized as a table with optional `translation = [x, y, z]` and either
/// `rotation = [w, x, y, z]` or `rpy = [roll, pitch, yaw]`; missing parts
/// default to zero / identity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PoseRepr", into = "PoseRepr")]
pub struct Pose {
    pub translation: Vec3,
    pub rotation: Quaternion,
}

impl Pose {
    pub fn new(translation: Vec3, rotation: Quaternion) -> Self {
        Self {
            translation,
            rotation,
        }
    }

    /// The identity pose (no translation, no rotation).
    pub fn identity() -> Self {
        Self::new(Vec3::zero(), Quaternion::identity())
    }

    /// A pure translation; the rotation defaults to the identity.
    pub fn from_translation(translation: Vec3) -> Self {
        Self::new(translation, Quaternion::identity())
    }

    pub fn from_rotation(rotation: Quaternion) -> Self {
        Self::new(Vec3::zero(), rotation)
    }

    /// Compose two poses.
    ///
    /// If `self` = T_A_B (pose of B in A) and `other` = T_B_C, the result is
    /// T_A_C.
    pub fn compose(self, other: Self) -> Self {
        let translated = self.translation.add(self.rotation.rotate(other.translation));
        let rotated = (self.rotation * other.rotation).normalize();
        Self::new(translated, rotated)
    }

    /// If `self` = T_A_B, returns T_B_A.
    pub fn inverse(self) -> Self {
        let rotation = self.rotation.inverse();
        Self::new(-rotation.rotate(self.translation), rotation)
    }

    /// Map a point expressed in the child frame into the parent frame.
    pub fn transform_point(&self, p: Vec3) -> Vec3 {
        self.translation.add(self.rotation.rotate(p))
    }

    pub fn approx_eq(&self, other: &Self, tolerance: f64) -> bool {
        self.translation.approx_eq(&other.translation, tolerance)
            && self.rotation.approx_eq(&other.rotation, tolerance)
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::identity()
    }
}

impl Mul for Pose {
    type Output = Pose;

    fn mul(self, rhs: Self) -> Self {
        self.compose(rhs)
    }
}

#[derive(Serialize, Deserialize)]
struct PoseRepr {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    translation: Option<[f64; 3]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    rotation: Option<[f64; 4]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    rpy: Option<[f64; 3]>,
}

impl TryFrom<PoseRepr> for Pose {
    type Error = String;

    fn try_from(repr: PoseRepr) -> Result<Self, Self::Error> {
        let translation = repr.translation.map(Vec3::from).unwrap_or_else(Vec3::zero);
        let rotation = match (repr.rotation, repr.rpy) {
            (Some(_), Some(_)) => {
                return Err("pose sets both `rotation` and `rpy`".to_string());
            }
            (Some(q), None) => Quaternion::from(q).normalize(),
            (None, Some([r, p, y])) => Quaternion::from_rpy(r, p, y),
            (None, None) => Quaternion::identity(),
        };
        Ok(Pose::new(translation, rotation))
    }
}

impl From<Pose> for PoseRepr {
    fn from(p: Pose) -> Self {
        PoseRepr {
            translation: Some(p.translation.into()),
            rotation: Some(p.rotation.into()),
            rpy: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_1_SQRT_2, FRAC_PI_2};

    const EPS: f64 = 1e-9;

    #[test]
    fn quaternion_identity_rotate_is_noop() {
        let r = Quaternion::identity().rotate(Vec3::new(1.0, 2.0, 3.0));
        assert!(r.approx_eq(&Vec3::new(1.0, 2.0, 3.0), EPS));
    }

    #[test]
    fn quaternion_90deg_yaw_rotates_x_to_y() {
        let q = Quaternion::new(FRAC_1_SQRT_2, 0.0, 0.0, FRAC_1_SQRT_2);
        let r = q.rotate(Vec3::unit_x());
        assert!(r.approx_eq(&Vec3::unit_y(), EPS), "got {r:?}");
    }

    #[test]
    fn axis_angle_matches_explicit_quaternion() {
        let q = Quaternion::from_axis_angle(Vec3::new(0.0, 0.0, 2.0), FRAC_PI_2);
        assert!(q.approx_eq(&Quaternion::new(FRAC_1_SQRT_2, 0.0, 0.0, FRAC_1_SQRT_2), EPS));
    }

    #[test]
    fn axis_angle_with_zero_axis_is_identity() {
        let q = Quaternion::from_axis_angle(Vec3::zero(), 1.0);
        assert_eq!(q, Quaternion::identity());
    }

    #[test]
    fn quaternion_conjugate_is_inverse() {
        let q = Quaternion::from_axis_angle(Vec3::new(1.0, 2.0, 3.0), 0.7);
        assert!((q * q.conjugate()).approx_eq(&Quaternion::identity(), EPS));
    }

    #[test]
    fn approx_eq_accepts_opposite_sign() {
        let q = Quaternion::from_axis_angle(Vec3::unit_x(), 0.3);
        let neg = Quaternion::new(-q.w, -q.x, -q.y, -q.z);
        assert!(q.approx_eq(&neg, EPS));
    }

    #[test]
    fn rpy_yaw_only_matches_axis_angle() {
        let q = Quaternion::from_rpy(0.0, 0.0, 2.0);
        assert!(q.approx_eq(&Quaternion::from_axis_angle(Vec3::unit_z(), 2.0), EPS));
    }

    #[test]
    fn pose_compose_translations_add() {
        let t1 = Pose::from_translation(Vec3::new(1.0, 0.0, 0.0));
        let t2 = Pose::from_translation(Vec3::new(2.0, 0.0, 0.0));
        assert!((t1 * t2).translation.approx_eq(&Vec3::new(3.0, 0.0, 0.0), EPS));
    }

    #[test]
    fn pose_compose_respects_rotation() {
        let base = Pose::from_rotation(Quaternion::from_axis_angle(Vec3::unit_z(), FRAC_PI_2));
        let camera = Pose::from_translation(Vec3::unit_x());
        let composed = base * camera;
        assert!(composed.translation.approx_eq(&Vec3::unit_y(), EPS));
    }

    #[test]
    fn pose_inverse_cancels() {
        let p = Pose::new(
            Vec3::new(1.0, -2.0, 0.5),
            Quaternion::from_axis_angle(Vec3::new(1.0, 1.0, 0.0), 1.2),
        );
        assert!((p * p.inverse()).approx_eq(&Pose::identity(), EPS));
        assert!((p.inverse() * p).approx_eq(&Pose::identity(), EPS));
    }

    #[test]
    fn transform_point_applies_rotation_then_translation() {
        let p = Pose::new(
            Vec3::new(0.0, 0.0, 1.0),
            Quaternion::from_axis_angle(Vec3::unit_z(), FRAC_PI_2),
        );
        let out = p.transform_point(Vec3::unit_x());
        assert!(out.approx_eq(&Vec3::new(0.0, 1.0, 1.0), EPS));
    }

    #[test]
    fn pose_deserializes_with_defaults() {
        let p: Pose = serde_json::from_str(r#"{"translation": [1, 2, 3]}"#).unwrap();
        assert_eq!(p.translation, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(p.rotation, Quaternion::identity());

        let p: Pose = serde_json::from_str("{}").unwrap();
        assert_eq!(p, Pose::identity());
    }

    #[test]
    fn pose_deserializes_rpy() {
        let p: Pose = serde_json::from_str(r#"{"rpy": [0, 0, 2]}"#).unwrap();
        assert!(p.rotation.approx_eq(&Quaternion::from_axis_angle(Vec3::unit_z(), 2.0), EPS));
    }

    #[test]
    fn pose_rejects_rotation_and_rpy_together() {
        let res = serde_json::from_str::<Pose>(r#"{"rotation": [1, 0, 0, 0], "rpy": [0, 0, 0]}"#);
        assert!(res.is_err());
    }
}
