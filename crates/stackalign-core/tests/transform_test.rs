use nalgebra::Matrix3;
use stackalign_core::spatial::{Point2, Point3, Vector2};
use stackalign_core::transform::{AffineTransform, Euler2D, Euler3D};
use stackalign_core::Placement;
use std::f64::consts::FRAC_PI_4;

#[test]
fn composition_is_pointwise_outer_after_inner() {
    let inner = Euler2D::new(FRAC_PI_4, Vector2::new([1.0, 0.0]), Point2::origin()).to_affine();
    let outer = Euler2D::new(-0.2, Vector2::new([0.0, 3.0]), Point2::new([1.0, 1.0])).to_affine();

    let composed = AffineTransform::compose(&outer, &inner);
    let p = Point2::new([0.7, -1.3]);

    let expected = outer.transform_point(&inner.transform_point(&p));
    let actual = composed.transform_point(&p);
    assert!((actual[0] - expected[0]).abs() < 1e-12);
    assert!((actual[1] - expected[1]).abs() < 1e-12);
}

#[test]
fn in_plane_expansion_round_trip() {
    let rigid = Euler2D::new(0.3, Vector2::new([2.0, -1.0]), Point2::new([5.0, 6.0]));
    let expanded = Euler3D::from_in_plane(&rigid);

    // z-rotation and x/y translation recover the 2D parameters, the
    // remaining rotation and translation components are zero.
    let [rx, ry, rz] = expanded.rotation();
    assert_eq!((rx, ry), (0.0, 0.0));
    assert!((rz - rigid.angle()).abs() < 1e-15);
    let t = expanded.translation();
    assert_eq!(t.to_vec(), vec![2.0, -1.0, 0.0]);

    // The 3D action restricted to the z = 0 plane matches the 2D action.
    let p = Point2::new([-0.5, 4.0]);
    let q2 = rigid.to_affine().transform_point(&p);
    let q3 = expanded
        .to_affine()
        .transform_point(&Point3::new([p[0], p[1], 0.0]));
    assert!((q3[0] - q2[0]).abs() < 1e-12);
    assert!((q3[1] - q2[1]).abs() < 1e-12);
    assert!(q3[2].abs() < 1e-12);
}

#[test]
fn placement_alignment_transform_undoes_placement() {
    // A slice rotated 45 degrees around z and shifted: the inverse of its
    // placement affine maps it back onto the canonical frame.
    let (s, c) = FRAC_PI_4.sin_cos();
    let direction = stackalign_core::spatial::Direction3::from_matrix(Matrix3::new(
        c, -s, 0.0, s, c, 0.0, 0.0, 0.0, 1.0,
    ));
    let origin = Point3::new([12.0, -7.0, 3.0]);
    let placement = Placement::new(direction, origin);

    let alignment = placement.to_affine().try_inverse().unwrap();
    let aligned = AffineTransform::compose(&alignment, &placement.to_affine());

    let p = Point3::new([1.0, 2.0, 3.0]);
    let q = aligned.transform_point(&p);
    assert!((q[0] - p[0]).abs() < 1e-12);
    assert!((q[1] - p[1]).abs() < 1e-12);
    assert!((q[2] - p[2]).abs() < 1e-12);
}

#[test]
fn motion_correction_in_aligned_frame_translates_origin_in_plane() {
    // Correcting a slice by an in-plane shift expressed in its own frame:
    // PP^-1 . T3d . PP applied to the placement moves the origin along the
    // slice axes, not the world axes.
    let direction = stackalign_core::spatial::Direction3::from_matrix(Matrix3::new(
        0.0, -1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0,
    ));
    let origin = Point3::new([5.0, 5.0, 2.0]);
    let mut placement = Placement::new(direction, origin);

    let pp = placement.to_affine().try_inverse().unwrap();
    let rigid = Euler2D::new(0.0, Vector2::new([1.0, 0.0]), Point2::origin());
    let t3d = Euler3D::from_in_plane(&rigid).to_affine();

    let a = AffineTransform::compose(&t3d, &pp);
    let a_final = AffineTransform::compose(&pp.try_inverse().unwrap(), &a);
    placement.apply(&a_final);

    // A +x shift in the aligned frame is a +y shift in world space for a
    // 90-degree rotated slice.
    let moved = placement.origin().to_vec();
    assert!((moved[0] - 5.0).abs() < 1e-12);
    assert!((moved[1] - 6.0).abs() < 1e-12);
    assert!((moved[2] - 2.0).abs() < 1e-12);

    // Orientation is untouched by a pure translation correction.
    assert_eq!(placement.direction(), &direction);

    // The same correction applied to the canonical frame directly would
    // move along world x instead.
    let mut canonical = Placement::canonical();
    canonical.apply(&t3d);
    assert_eq!(canonical.origin().to_vec(), vec![1.0, 0.0, 0.0]);
}
