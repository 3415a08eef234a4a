//! Rigid and joint-parameterized transforms.

use std::ops::Mul;

use nalgebra::{Isometry3, Matrix3, Point3, Rotation3, Translation3, Unit, UnitQuaternion, Vector3};
use tracing::warn;

/// Rigid transform mapping points of a child frame into its parent frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform(Isometry3<f64>);

/// Coordinate axis used to spell Euler sequences.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    fn unit(self) -> Unit<Vector3<f64>> {
        match self {
            Axis::X => Vector3::x_axis(),
            Axis::Y => Vector3::y_axis(),
            Axis::Z => Vector3::z_axis(),
        }
    }
}

impl Transform {
    pub fn identity() -> Self {
        Self(Isometry3::identity())
    }

    pub fn from_isometry(isometry: Isometry3<f64>) -> Self {
        Self(isometry)
    }

    pub fn translation(offset: Vector3<f64>) -> Self {
        Self(Isometry3::from_parts(
            Translation3::from(offset),
            UnitQuaternion::identity(),
        ))
    }

    pub fn rotation(rotation: UnitQuaternion<f64>) -> Self {
        Self(Isometry3::from_parts(Translation3::identity(), rotation))
    }

    /// Rotation taking direction `u` onto direction `v`, built as the product
    /// of two Householder reflections (through `u`, then through the bisector).
    pub fn rotation_two_reflections(u: &Vector3<f64>, v: &Vector3<f64>) -> Self {
        let (Some(u), Some(v)) = (u.try_normalize(1e-12), v.try_normalize(1e-12)) else {
            return Self::identity();
        };
        let bisector = (u + v)
            .try_normalize(1e-9)
            .unwrap_or_else(|| any_orthogonal(&u));
        let reflect = |n: Vector3<f64>| Matrix3::identity() - n * n.transpose() * 2.0;
        let matrix = reflect(bisector) * reflect(u);
        let rotation = Rotation3::from_matrix_unchecked(matrix);
        Self::rotation(UnitQuaternion::from_rotation_matrix(&rotation))
    }

    /// Extrinsic Euler rotation: `angles[0]` about `order[0]` is applied first.
    pub fn euler_rotation(order: [Axis; 3], angles: [f64; 3]) -> Self {
        let rotation = order
            .iter()
            .zip(angles)
            .fold(UnitQuaternion::identity(), |acc, (axis, angle)| {
                UnitQuaternion::from_axis_angle(&axis.unit(), angle) * acc
            });
        Self::rotation(rotation)
    }

    pub fn compose(&self, other: &Transform) -> Transform {
        Transform(self.0 * other.0)
    }

    pub fn inverse(&self) -> Transform {
        Transform(self.0.inverse())
    }

    pub fn apply(&self, point: &Point3<f64>) -> Point3<f64> {
        self.0.transform_point(point)
    }

    /// Rotate a direction without translating it.
    pub fn apply_vector(&self, vector: &Vector3<f64>) -> Vector3<f64> {
        self.0.rotation * vector
    }

    pub fn translation_part(&self) -> Vector3<f64> {
        self.0.translation.vector
    }

    pub fn rotation_part(&self) -> UnitQuaternion<f64> {
        self.0.rotation
    }

    pub fn isometry(&self) -> &Isometry3<f64> {
        &self.0
    }

    pub fn is_identity(&self, epsilon: f64) -> bool {
        self.0.translation.vector.norm() <= epsilon && self.0.rotation.angle() <= epsilon
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl Mul for Transform {
    type Output = Transform;

    fn mul(self, rhs: Transform) -> Transform {
        self.compose(&rhs)
    }
}

fn any_orthogonal(u: &Vector3<f64>) -> Vector3<f64> {
    let helper = if u.x.abs() < 0.9 {
        Vector3::x()
    } else {
        Vector3::y()
    };
    u.cross(&helper).normalize()
}

/// Kind of one-degree-of-freedom motion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JointMotion {
    Revolute,
    Prismatic,
}

/// One-DoF transform whose state (angle or displacement) can be changed
/// after the graph is built. The state always stays within `[lower, upper]`.
#[derive(Debug, Clone, PartialEq)]
pub struct JointTransform {
    motion: JointMotion,
    axis: Unit<Vector3<f64>>,
    position: f64,
    lower: f64,
    upper: f64,
}

impl JointTransform {
    pub fn revolute(axis: Vector3<f64>, angle: f64, lower: f64, upper: f64) -> Self {
        Self::new(JointMotion::Revolute, axis, angle, lower, upper)
    }

    pub fn prismatic(axis: Vector3<f64>, displacement: f64, lower: f64, upper: f64) -> Self {
        Self::new(JointMotion::Prismatic, axis, displacement, lower, upper)
    }

    fn new(motion: JointMotion, axis: Vector3<f64>, position: f64, lower: f64, upper: f64) -> Self {
        let axis = Unit::try_new(axis, 1e-10).unwrap_or_else(|| {
            warn!(?axis, "joint axis is zero or near-zero, defaulting to Z-axis");
            Vector3::z_axis()
        });
        let mut joint = Self {
            motion,
            axis,
            position: 0.0,
            lower,
            upper,
        };
        joint.set_position(position);
        joint
    }

    pub fn motion(&self) -> JointMotion {
        self.motion
    }

    pub fn axis(&self) -> Unit<Vector3<f64>> {
        self.axis
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn limits(&self) -> (f64, f64) {
        (self.lower, self.upper)
    }

    /// Set the state, clamped into the limits. Returns the applied value.
    pub fn set_position(&mut self, value: f64) -> f64 {
        // clamp() panics when lower > upper
        self.position = value.max(self.lower).min(self.upper);
        self.position
    }

    pub fn transform(&self) -> Transform {
        match self.motion {
            JointMotion::Revolute => {
                Transform::rotation(UnitQuaternion::from_axis_angle(&self.axis, self.position))
            }
            JointMotion::Prismatic => Transform::translation(self.axis.into_inner() * self.position),
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    use super::*;

    #[test]
    fn compose_with_inverse_is_identity() {
        let t = Transform::translation(Vector3::new(1.0, -2.0, 0.5))
            * Transform::euler_rotation([Axis::X, Axis::Y, Axis::Z], [0.3, -0.2, 1.1]);
        let round_trip = t.compose(&t.inverse());
        assert!(round_trip.is_identity(1e-12));

        let p = Point3::new(0.4, 5.0, -3.0);
        assert_relative_eq!(t.inverse().apply(&t.apply(&p)), p, epsilon = 1e-12);
    }

    #[test]
    fn two_reflections_maps_u_onto_v() {
        let u = Vector3::new(1.0, 0.0, 0.0);
        let v = Vector3::new(0.0, 1.0, 1.0);
        let r = Transform::rotation_two_reflections(&u, &v);
        assert_relative_eq!(r.apply_vector(&u), v.normalize(), epsilon = 1e-12);
        // proper rotation, not a reflection
        assert_relative_eq!(
            r.rotation_part().to_rotation_matrix().matrix().determinant(),
            1.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn two_reflections_antiparallel() {
        let u = Vector3::z();
        let r = Transform::rotation_two_reflections(&u, &-u);
        assert_relative_eq!(r.apply_vector(&u), -u, epsilon = 1e-12);
    }

    #[test]
    fn euler_order_matters() {
        let xyz = Transform::euler_rotation([Axis::X, Axis::Y, Axis::Z], [FRAC_PI_2, FRAC_PI_2, 0.0]);
        let zyx = Transform::euler_rotation([Axis::Z, Axis::Y, Axis::X], [0.0, FRAC_PI_2, FRAC_PI_2]);
        // rotate x first about X (no-op on x-axis), then about Y: x -> -z
        assert_relative_eq!(xyz.apply_vector(&Vector3::x()), -Vector3::z(), epsilon = 1e-12);
        assert!(!(xyz.compose(&zyx.inverse())).is_identity(1e-9));
    }

    #[test]
    fn revolute_clamps_initial_angle() {
        let j = JointTransform::revolute(Vector3::z(), 0.0, -1.0, 1.0);
        assert_eq!(j.position(), 0.0);

        let j = JointTransform::revolute(Vector3::z(), 0.0, 2.0, 5.0);
        assert_eq!(j.position(), 2.0);
        assert_relative_eq!(
            j.transform().rotation_part().angle(),
            2.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn prismatic_moves_along_axis() {
        let mut j = JointTransform::prismatic(Vector3::new(0.0, 2.0, 0.0), 1.0, 0.0, 0.5);
        assert_eq!(j.position(), 0.5);
        assert_eq!(j.set_position(0.25), 0.25);
        assert_relative_eq!(
            j.transform().translation_part(),
            Vector3::new(0.0, 0.25, 0.0),
            epsilon = 1e-12
        );
        assert_eq!(j.set_position(-3.0), 0.0);
    }

    #[test]
    fn zero_axis_falls_back_to_z() {
        let j = JointTransform::revolute(Vector3::zeros(), 0.0, -1.0, 1.0);
        assert_eq!(j.axis(), Vector3::z_axis());
    }
}
