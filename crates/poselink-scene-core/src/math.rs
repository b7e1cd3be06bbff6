//! Affine matrix math for the scene graph.
//!
//! Matrices are row-major with the row-vector convention (`p' = p * M`), so a
//! chain `[a, b, c]` applies `a` first. Local matrices compose in
//! `scale * shear * rotate * translate` order with XYZ rotate order, which is
//! what [`compose`](Mat4::compose) and [`Mat4::decompose`] assume.

use serde::{Deserialize, Serialize};

pub const EPSILON: f32 = 1e-5;

/// Row-major 4x4 affine matrix.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Mat4(pub [[f32; 4]; 4]);

/// Translate / rotate / scale / shear channels of an affine matrix.
///
/// Rotation is XYZ euler in radians; shear components are (xy, xz, yz).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Trs {
    pub translate: [f32; 3],
    pub rotate: [f32; 3],
    pub scale: [f32; 3],
    pub shear: [f32; 3],
}

impl Default for Trs {
    fn default() -> Self {
        Trs {
            translate: [0.0; 3],
            rotate: [0.0; 3],
            scale: [1.0; 3],
            shear: [0.0; 3],
        }
    }
}

impl Mat4 {
    pub const IDENTITY: Mat4 = Mat4([
        [1.0, 0.0, 0.0, 0.0],
        [0.0, 1.0, 0.0, 0.0],
        [0.0, 0.0, 1.0, 0.0],
        [0.0, 0.0, 0.0, 1.0],
    ]);

    pub fn from_translation(t: [f32; 3]) -> Mat4 {
        let mut m = Mat4::IDENTITY;
        m.0[3][0] = t[0];
        m.0[3][1] = t[1];
        m.0[3][2] = t[2];
        m
    }

    pub fn translation(&self) -> [f32; 3] {
        [self.0[3][0], self.0[3][1], self.0[3][2]]
    }

    /// `self` then `rhs` under the row-vector convention.
    pub fn mul(&self, rhs: &Mat4) -> Mat4 {
        let a = &self.0;
        let b = &rhs.0;
        let mut out = [[0.0f32; 4]; 4];
        for (i, row) in a.iter().enumerate() {
            for j in 0..4 {
                out[i][j] =
                    row[0] * b[0][j] + row[1] * b[1][j] + row[2] * b[2][j] + row[3] * b[3][j];
            }
        }
        Mat4(out)
    }

    pub fn determinant3(&self) -> f32 {
        let m = &self.0;
        m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
            - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
            + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
    }

    /// Inverse assuming the last column is (0, 0, 0, 1).
    pub fn affine_inverse(&self) -> Mat4 {
        let m = &self.0;
        let det = self.determinant3();
        let inv_det = if det.abs() < f32::EPSILON {
            0.0
        } else {
            1.0 / det
        };

        let mut r = [[0.0f32; 4]; 4];
        r[0][0] = (m[1][1] * m[2][2] - m[1][2] * m[2][1]) * inv_det;
        r[0][1] = (m[0][2] * m[2][1] - m[0][1] * m[2][2]) * inv_det;
        r[0][2] = (m[0][1] * m[1][2] - m[0][2] * m[1][1]) * inv_det;
        r[1][0] = (m[1][2] * m[2][0] - m[1][0] * m[2][2]) * inv_det;
        r[1][1] = (m[0][0] * m[2][2] - m[0][2] * m[2][0]) * inv_det;
        r[1][2] = (m[0][2] * m[1][0] - m[0][0] * m[1][2]) * inv_det;
        r[2][0] = (m[1][0] * m[2][1] - m[1][1] * m[2][0]) * inv_det;
        r[2][1] = (m[0][1] * m[2][0] - m[0][0] * m[2][1]) * inv_det;
        r[2][2] = (m[0][0] * m[1][1] - m[0][1] * m[1][0]) * inv_det;

        let t = self.translation();
        for j in 0..3 {
            r[3][j] = -(t[0] * r[0][j] + t[1] * r[1][j] + t[2] * r[2][j]);
        }
        r[3][3] = 1.0;
        Mat4(r)
    }

    pub fn approx_eq(&self, other: &Mat4, eps: f32) -> bool {
        self.0
            .iter()
            .flatten()
            .zip(other.0.iter().flatten())
            .all(|(a, b)| (a - b).abs() <= eps)
    }

    /// Build an affine matrix as `scale * shear * rotate * translate`.
    pub fn compose(trs: &Trs) -> Mat4 {
        let r = rot_from_euler(trs.rotate);
        let [sx, sy, sz] = trs.scale;
        let [xy, xz, yz] = trs.shear;

        // Rows of scale * shear * rotate, expanded.
        let a0 = scale3(&r[0], sx);
        let a1 = scale3(&add3(&scale3(&r[0], xy), &r[1]), sy);
        let a2 = scale3(
            &add3(&add3(&scale3(&r[0], xz), &scale3(&r[1], yz)), &r[2]),
            sz,
        );

        Mat4([
            [a0[0], a0[1], a0[2], 0.0],
            [a1[0], a1[1], a1[2], 0.0],
            [a2[0], a2[1], a2[2], 0.0],
            [trs.translate[0], trs.translate[1], trs.translate[2], 1.0],
        ])
    }

    /// Recover translate / rotate / scale / shear by Gram-Schmidt on the rows.
    pub fn decompose(&self) -> Trs {
        let translate = self.translation();
        let mut a0 = [self.0[0][0], self.0[0][1], self.0[0][2]];
        let a1 = [self.0[1][0], self.0[1][1], self.0[1][2]];
        let a2 = [self.0[2][0], self.0[2][1], self.0[2][2]];

        let mut sx = len3(&a0).max(EPSILON);
        a0 = scale3(&a0, 1.0 / sx);

        let mut xy = dot3(&a0, &a1);
        let mut r1 = sub3(&a1, &scale3(&a0, xy));
        let mut sy = len3(&r1).max(EPSILON);
        r1 = scale3(&r1, 1.0 / sy);
        xy /= sy;

        let mut xz = dot3(&a0, &a2);
        let mut r2 = sub3(&a2, &scale3(&a0, xz));
        let mut yz = dot3(&r1, &r2);
        r2 = sub3(&r2, &scale3(&r1, yz));
        let mut sz = len3(&r2).max(EPSILON);
        r2 = scale3(&r2, 1.0 / sz);
        xz /= sz;
        yz /= sz;

        // A negative determinant means the basis is mirrored.
        if dot3(&a0, &cross3(&r1, &r2)) < 0.0 {
            sx = -sx;
            sy = -sy;
            sz = -sz;
            a0 = scale3(&a0, -1.0);
            r1 = scale3(&r1, -1.0);
            r2 = scale3(&r2, -1.0);
        }

        Trs {
            translate,
            rotate: euler_from_rot(&[a0, r1, r2]),
            scale: [sx, sy, sz],
            shear: [xy, xz, yz],
        }
    }
}

fn dot3(a: &[f32; 3], b: &[f32; 3]) -> f32 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn len3(a: &[f32; 3]) -> f32 {
    dot3(a, a).sqrt()
}

fn scale3(a: &[f32; 3], s: f32) -> [f32; 3] {
    [a[0] * s, a[1] * s, a[2] * s]
}

fn add3(a: &[f32; 3], b: &[f32; 3]) -> [f32; 3] {
    [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
}

fn sub3(a: &[f32; 3], b: &[f32; 3]) -> [f32; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

fn cross3(a: &[f32; 3], b: &[f32; 3]) -> [f32; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

pub fn lerp3(a: &[f32; 3], b: &[f32; 3], t: f32) -> [f32; 3] {
    [
        lerp(a[0], b[0], t),
        lerp(a[1], b[1], t),
        lerp(a[2], b[2], t),
    ]
}

/// 3x3 rotation from XYZ euler, row-vector convention.
pub fn rot_from_euler(e: [f32; 3]) -> [[f32; 3]; 3] {
    let (sx, cx) = e[0].sin_cos();
    let (sy, cy) = e[1].sin_cos();
    let (sz, cz) = e[2].sin_cos();
    [
        [cy * cz, cy * sz, -sy],
        [sx * sy * cz - cx * sz, sx * sy * sz + cx * cz, sx * cy],
        [cx * sy * cz + sx * sz, cx * sy * sz - sx * cz, cx * cy],
    ]
}

/// XYZ euler from an orthonormal row-vector rotation matrix.
pub fn euler_from_rot(r: &[[f32; 3]; 3]) -> [f32; 3] {
    let sy = (-r[0][2]).clamp(-1.0, 1.0);
    let ry = sy.asin();
    if sy.abs() < 1.0 - EPSILON {
        let rx = r[1][2].atan2(r[2][2]);
        let rz = r[0][1].atan2(r[0][0]);
        [rx, ry, rz]
    } else if sy > 0.0 {
        // ry = +pi/2; x and z are coupled, pick rz = 0.
        [r[1][0].atan2(r[1][1]), ry, 0.0]
    } else {
        [(-r[1][0]).atan2(r[1][1]), ry, 0.0]
    }
}

/// Quaternion (x, y, z, w) from a row-vector rotation matrix.
pub fn quat_from_rot(m: &[[f32; 3]; 3]) -> [f32; 4] {
    let trace = m[0][0] + m[1][1] + m[2][2];
    if trace > 0.0 {
        let s = (trace + 1.0).sqrt() * 2.0;
        [
            (m[1][2] - m[2][1]) / s,
            (m[2][0] - m[0][2]) / s,
            (m[0][1] - m[1][0]) / s,
            s / 4.0,
        ]
    } else if m[0][0] > m[1][1] && m[0][0] > m[2][2] {
        let s = (1.0 + m[0][0] - m[1][1] - m[2][2]).sqrt() * 2.0;
        [
            s / 4.0,
            (m[0][1] + m[1][0]) / s,
            (m[0][2] + m[2][0]) / s,
            (m[1][2] - m[2][1]) / s,
        ]
    } else if m[1][1] > m[2][2] {
        let s = (1.0 + m[1][1] - m[0][0] - m[2][2]).sqrt() * 2.0;
        [
            (m[0][1] + m[1][0]) / s,
            s / 4.0,
            (m[1][2] + m[2][1]) / s,
            (m[2][0] - m[0][2]) / s,
        ]
    } else {
        let s = (1.0 + m[2][2] - m[0][0] - m[1][1]).sqrt() * 2.0;
        [
            (m[0][2] + m[2][0]) / s,
            (m[1][2] + m[2][1]) / s,
            s / 4.0,
            (m[0][1] - m[1][0]) / s,
        ]
    }
}

/// Row-vector rotation matrix from a unit quaternion (x, y, z, w).
pub fn rot_from_quat(q: [f32; 4]) -> [[f32; 3]; 3] {
    let [x, y, z, w] = q;
    [
        [
            1.0 - 2.0 * (y * y + z * z),
            2.0 * (x * y + w * z),
            2.0 * (x * z - w * y),
        ],
        [
            2.0 * (x * y - w * z),
            1.0 - 2.0 * (x * x + z * z),
            2.0 * (y * z + w * x),
        ],
        [
            2.0 * (x * z + w * y),
            2.0 * (y * z - w * x),
            1.0 - 2.0 * (x * x + y * y),
        ],
    ]
}

pub fn quat_from_euler(e: [f32; 3]) -> [f32; 4] {
    quat_from_rot(&rot_from_euler(e))
}

pub fn euler_from_quat(q: [f32; 4]) -> [f32; 3] {
    euler_from_rot(&rot_from_quat(normalize_quat(q)))
}

pub fn normalize_quat(q: [f32; 4]) -> [f32; 4] {
    let mag = (q[0] * q[0] + q[1] * q[1] + q[2] * q[2] + q[3] * q[3]).sqrt();
    if mag == 0.0 {
        [0.0, 0.0, 0.0, 1.0]
    } else {
        [q[0] / mag, q[1] / mag, q[2] / mag, q[3] / mag]
    }
}

/// Shortest-arc slerp between two quaternions.
pub fn slerp(q1: [f32; 4], q2: [f32; 4], t: f32) -> [f32; 4] {
    let qa = normalize_quat(q1);
    let mut qb = normalize_quat(q2);

    let mut dot = qa[0] * qb[0] + qa[1] * qb[1] + qa[2] * qb[2] + qa[3] * qb[3];
    if dot < 0.0 {
        qb = [-qb[0], -qb[1], -qb[2], -qb[3]];
        dot = -dot;
    }

    const DOT_THRESHOLD: f32 = 0.9995;
    if dot > DOT_THRESHOLD {
        return normalize_quat([
            lerp(qa[0], qb[0], t),
            lerp(qa[1], qb[1], t),
            lerp(qa[2], qb[2], t),
            lerp(qa[3], qb[3], t),
        ]);
    }

    let theta_0 = dot.clamp(-1.0, 1.0).acos();
    let theta = theta_0 * t;
    let sin_theta_0 = theta_0.sin();
    let s0 = (theta_0 - theta).sin() / sin_theta_0;
    let s1 = theta.sin() / sin_theta_0;
    [
        s0 * qa[0] + s1 * qb[0],
        s0 * qa[1] + s1 * qb[1],
        s0 * qa[2] + s1 * qb[2],
        s0 * qa[3] + s1 * qb[3],
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f32 = 1e-4;

    fn sample_trs() -> Trs {
        Trs {
            translate: [1.5, -2.0, 3.25],
            rotate: [0.3, -0.7, 1.1],
            scale: [2.0, 0.5, 1.25],
            shear: [0.1, -0.2, 0.3],
        }
    }

    #[test]
    fn identity_round_trips() {
        let trs = Mat4::IDENTITY.decompose();
        assert!(Mat4::compose(&trs).approx_eq(&Mat4::IDENTITY, TOL));
        assert_eq!(trs.translate, [0.0; 3]);
    }

    #[test]
    fn compose_decompose_round_trips_with_shear() {
        let trs = sample_trs();
        let m = Mat4::compose(&trs);
        let back = m.decompose();
        let m2 = Mat4::compose(&back);
        assert!(m.approx_eq(&m2, TOL), "{m:?} vs {m2:?}");
        for i in 0..3 {
            assert!((trs.scale[i] - back.scale[i]).abs() < TOL);
            assert!((trs.shear[i] - back.shear[i]).abs() < TOL);
        }
    }

    #[test]
    fn affine_inverse_cancels() {
        let m = Mat4::compose(&sample_trs());
        assert!(m.mul(&m.affine_inverse()).approx_eq(&Mat4::IDENTITY, TOL));
        assert!(m.affine_inverse().mul(&m).approx_eq(&Mat4::IDENTITY, TOL));
    }

    #[test]
    fn mul_order_is_left_to_right() {
        let a = Mat4::from_translation([1.0, 0.0, 0.0]);
        let b = Mat4::compose(&Trs {
            scale: [2.0, 2.0, 2.0],
            ..Trs::default()
        });
        // Translate then scale doubles the translation.
        assert_eq!(a.mul(&b).translation(), [2.0, 0.0, 0.0]);
        assert_eq!(b.mul(&a).translation(), [1.0, 0.0, 0.0]);
    }

    #[test]
    fn euler_quat_round_trips() {
        let e = [0.4, -1.0, 2.2];
        let q = quat_from_euler(e);
        let r = rot_from_quat(q);
        let expected = rot_from_euler(e);
        for i in 0..3 {
            for j in 0..3 {
                assert!((r[i][j] - expected[i][j]).abs() < TOL);
            }
        }
    }

    #[test]
    fn slerp_endpoints() {
        let a = quat_from_euler([0.0, 0.0, 0.0]);
        let b = quat_from_euler([0.0, 1.2, 0.0]);
        let at0 = slerp(a, b, 0.0);
        let at1 = slerp(a, b, 1.0);
        for i in 0..4 {
            assert!((at0[i] - a[i]).abs() < TOL);
            assert!((at1[i] - b[i]).abs() < TOL);
        }
    }

    #[test]
    fn gimbal_euler_extraction_stays_finite() {
        let e = [0.5, std::f32::consts::FRAC_PI_2, 0.0];
        let r = rot_from_euler(e);
        let back = euler_from_rot(&r);
        let r2 = rot_from_euler(back);
        for i in 0..3 {
            for j in 0..3 {
                assert!((r[i][j] - r2[i][j]).abs() < 1e-3);
            }
        }
    }
}
