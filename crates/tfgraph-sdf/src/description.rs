//! Hierarchical world / model / link / joint description.
//!
//! Plain `serde` data: the importer only reads names, relative poses, the
//! static flag, children, and for joints the type, parent/child link names,
//! pose, axis and limits.  Keys are singular so that TOML documents read
//! naturally:
//!
//! ```toml
//! [[world]]
//! name = "lab"
//!
//! [[world.model]]
//! name = "arm"
//! pose = { translation = [0.0, 0.0, 0.8] }
//!
//! [[world.model.link]]
//! name = "base"
//!
//! [[world.model.link]]
//! name = "forearm"
//! pose = { translation = [0.0, 0.0, 0.3] }
//!
//! [[world.model.joint]]
//! name = "elbow"
//! type = "revolute"
//! parent = "base"
//! child = "forearm"
//! axis = { xyz = [0.0, 1.0, 0.0], limit = { lower = -1.5, upper = 1.5 } }
//! ```

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};
use tfgraph_core::geometry::{Pose, Quaternion, Vec3};
use tfgraph_types::JointType;

/// Name of the reserved pseudo-link standing for the enclosing world.
pub const WORLD_LINK: &str = "world";

/// Separator between the segments of a hierarchical frame name.
pub const SEPARATOR: &str = "::";

/// Join `name` under `prefix`; an empty prefix leaves `name` as is.
pub fn scoped(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}{SEPARATOR}{name}")
    }
}

/// Root of a description: any number of worlds and of top-level models.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default, rename = "world", skip_serializing_if = "Vec::is_empty")]
    pub worlds: Vec<World>,
    #[serde(default, rename = "model", skip_serializing_if = "Vec::is_empty")]
    pub models: Vec<Model>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct World {
    pub name: String,
    #[serde(default, rename = "model", skip_serializing_if = "Vec::is_empty")]
    pub models: Vec<Model>,
}

/// A model: links, the joints between them and nested submodels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model {
    pub name: String,
    /// Pose of the model in its parent (world or enclosing model).
    #[serde(default)]
    pub pose: Pose,
    /// Immovable models are tied to their parent by a static transform.
    #[serde(default, rename = "static")]
    pub is_static: bool,
    /// Link representing the model frame.  Only honoured when no joint
    /// drives it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canonical_link: Option<String>,
    #[serde(default, rename = "link", skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<Link>,
    #[serde(default, rename = "joint", skip_serializing_if = "Vec::is_empty")]
    pub joints: Vec<Joint>,
    #[serde(default, rename = "model", skip_serializing_if = "Vec::is_empty")]
    pub models: Vec<Model>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub name: String,
    /// Pose of the link in its model.
    #[serde(default)]
    pub pose: Pose,
}

/// A joint between two links of a model.
///
/// `parent` and `child` name links relative to the model, with
/// `submodel::link` reaching into nested models and [`WORLD_LINK`] standing
/// for the enclosing world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Joint {
    pub name: String,
    #[serde(rename = "type")]
    pub joint_type: JointType,
    pub parent: String,
    pub child: String,
    /// Pose of the joint frame in the child link.
    #[serde(default)]
    pub pose: Pose,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub axis: Option<Axis>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Axis {
    #[serde(default = "default_axis")]
    pub xyz: Vec3,
    #[serde(default)]
    pub limit: Limit,
    /// `xyz` is expressed in the model frame instead of the joint frame.
    #[serde(default)]
    pub use_parent_model_frame: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Limit {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lower: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upper: Option<f64>,
}

fn default_axis() -> Vec3 {
    Vec3::unit_z()
}

impl Joint {
    /// Declared motion range `(lower, upper)`.
    ///
    /// Fixed joints have a zero range.  Missing limits count as zero, except
    /// for continuous joints where they default to a full turn.
    pub fn range(&self) -> (f64, f64) {
        if !self.joint_type.has_axis() {
            return (0.0, 0.0);
        }
        let limit = self.axis.as_ref().map(|a| a.limit).unwrap_or_default();
        let (lower_default, upper_default) = match self.joint_type {
            JointType::Continuous => (-PI, PI),
            _ => (0.0, 0.0),
        };
        (
            limit.lower.unwrap_or(lower_default),
            limit.upper.unwrap_or(upper_default),
        )
    }

    /// `true` when the joint cannot move.
    pub fn is_rigid(&self) -> bool {
        let (lower, upper) = self.range();
        lower == upper
    }

    /// Declared axis, `+Z` when absent.
    pub fn axis_xyz(&self) -> Vec3 {
        self.axis.as_ref().map_or_else(default_axis, |a| a.xyz)
    }

    pub fn axis_in_model_frame(&self) -> bool {
        self.axis.as_ref().is_some_and(|a| a.use_parent_model_frame)
    }

    /// Pose of the joint's post frame in its pre frame at `position` along
    /// `axis` (radians for rotational joints, metres for prismatic ones).
    pub fn motion(&self, position: f64, axis: Vec3) -> Pose {
        if !self.joint_type.has_axis() {
            return Pose::identity();
        }
        if self.joint_type.is_rotational() {
            return Pose::from_rotation(Quaternion::from_axis_angle(axis, position));
        }
        match axis.normalized() {
            Some(unit) => Pose::from_translation(unit.scale(position)),
            None => Pose::identity(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn joint(joint_type: JointType, axis: Option<Axis>) -> Joint {
        Joint {
            name: "j".into(),
            joint_type,
            parent: "a".into(),
            child: "b".into(),
            pose: Pose::identity(),
            axis,
        }
    }

    fn limited(lower: f64, upper: f64) -> Option<Axis> {
        Some(Axis {
            xyz: Vec3::unit_x(),
            limit: Limit {
                lower: Some(lower),
                upper: Some(upper),
            },
            use_parent_model_frame: false,
        })
    }

    #[test]
    fn scoped_omits_separator_at_top_level() {
        assert_eq!(scoped("", "m"), "m");
        assert_eq!(scoped("m", "l"), "m::l");
        assert_eq!(scoped("m::sub", "l"), "m::sub::l");
    }

    #[test]
    fn fixed_joints_are_rigid_whatever_the_limits() {
        let j = joint(JointType::Fixed, limited(-1.0, 1.0));
        assert_eq!(j.range(), (0.0, 0.0));
        assert!(j.is_rigid());
    }

    #[test]
    fn revolute_without_limits_is_rigid() {
        assert!(joint(JointType::Revolute, None).is_rigid());
        assert!(!joint(JointType::Revolute, limited(-1.0, 2.0)).is_rigid());
    }

    #[test]
    fn continuous_defaults_to_a_full_turn() {
        let j = joint(JointType::Continuous, None);
        assert_eq!(j.range(), (-PI, PI));
        assert!(!j.is_rigid());
    }

    #[test]
    fn axis_defaults_to_z() {
        assert_eq!(joint(JointType::Revolute, None).axis_xyz(), Vec3::unit_z());
    }

    #[test]
    fn prismatic_motion_translates_along_axis() {
        let j = joint(JointType::Prismatic, limited(0.0, 1.0));
        let p = j.motion(0.5, Vec3::new(0.0, 2.0, 0.0));
        assert!(p.translation.approx_eq(&Vec3::new(0.0, 0.5, 0.0), 1e-9));
        assert_eq!(p.rotation, Quaternion::identity());
    }

    #[test]
    fn revolute_motion_rotates_about_axis() {
        let j = joint(JointType::Revolute, limited(-1.0, 2.0));
        let p = j.motion(0.5, Vec3::unit_x());
        assert!(
            p.rotation
                .approx_eq(&Quaternion::from_axis_angle(Vec3::unit_x(), 0.5), 1e-9)
        );
        assert_eq!(p.translation, Vec3::zero());
    }

    #[test]
    fn continuous_motion_rotates_and_fixed_motion_is_identity() {
        let spin = joint(JointType::Continuous, None).motion(1.0, Vec3::unit_z());
        assert!(
            spin.rotation
                .approx_eq(&Quaternion::from_axis_angle(Vec3::unit_z(), 1.0), 1e-9)
        );
        let fixed = joint(JointType::Fixed, None).motion(1.0, Vec3::unit_z());
        assert_eq!(fixed, Pose::identity());
    }
}
