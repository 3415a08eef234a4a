use nalgebra::{Matrix3, Matrix6};

use crate::transform::Transform;

// spatial inertia of a body expressed in its link frame
// twist ordering is [angular; linear]
pub(super) fn to_local_spatial_inertial(
    inertia_frame: &Transform,
    inertia: &Matrix3<f64>,
    mass: f64,
) -> Matrix6<f64> {
    let mut i_b = Matrix6::from_diagonal_element(mass);
    i_b.fixed_view_mut::<3, 3>(0, 0).copy_from(inertia);
    let b_t_a = inertia_frame.inverse();
    let adj_b_t_a = adjoint(&b_t_a);
    adj_b_t_a.transpose() * i_b * adj_b_t_a
}

fn adjoint(transform: &Transform) -> Matrix6<f64> {
    let r = transform.rotation_part().to_rotation_matrix().into_inner();
    let p = transform.translation_part();
    let mut adj = Matrix6::zeros();
    adj.fixed_view_mut::<3, 3>(0, 0).copy_from(&r);
    adj.fixed_view_mut::<3, 3>(3, 3).copy_from(&r);
    adj.fixed_view_mut::<3, 3>(3, 0).copy_from(&(p.cross_matrix() * r));
    adj
}
