use std::fmt;

use serde::{Deserialize, Serialize};

const SQRT_3: f64 = 1.732_050_807_568_877_2;

/// One of the three drive points, mounted 120° apart around the base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Actuator {
    X,
    Y,
    Z,
}

impl Actuator {
    pub const ALL: [Actuator; 3] = [Actuator::X, Actuator::Y, Actuator::Z];

    /// Position in [`Actuator::ALL`].
    pub fn index(self) -> usize {
        return match self {
            Actuator::X => 0,
            Actuator::Y => 1,
            Actuator::Z => 2,
        };
    }
}

impl fmt::Display for Actuator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Actuator::X => "x",
            Actuator::Y => "y",
            Actuator::Z => "z",
        };
        return f.write_str(name);
    }
}

/// Fixed mechanism dimensions, all in the same length unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    /// Base center to drive joint.
    pub base_radius: f64,
    /// Platform center to platform attachment point.
    pub platform_radius: f64,
    /// Drive joint to link junction.
    pub proximal_link: f64,
    /// Link junction to platform attachment point.
    pub distal_link: f64,
}

impl Default for Geometry {
    fn default() -> Self {
        Self {
            base_radius: 50.0,
            platform_radius: 40.0,
            proximal_link: 80.0,
            distal_link: 120.0,
        }
    }
}

/// Unit platform normal derived from the tilt vector `(tilt_x, tilt_y, 1)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TiltNormal {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl TiltNormal {
    /// Normalize `(tilt_x, tilt_y, 1)`.
    ///
    /// The magnitude is taken with `hypot` rather than `sqrt(x² + y² + 1)`, so
    /// it stays finite where the squared sum would overflow. The two agree in
    /// exact arithmetic but results are not guaranteed bit-identical to the
    /// plain square-root form.
    pub fn from_tilt(tilt_x: f64, tilt_y: f64) -> Self {
        let magnitude = tilt_x.hypot(tilt_y).hypot(1.0);

        return Self {
            x: tilt_x / magnitude,
            y: tilt_y / magnitude,
            z: 1.0 / magnitude,
        };
    }
}

/// Drive angles in degrees for all three actuators of one pose.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Angles {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Angles {
    pub fn get(&self, actuator: Actuator) -> f64 {
        return self.to_array()[actuator.index()];
    }

    /// Angles in [`Actuator::ALL`] order.
    pub fn to_array(&self) -> [f64; 3] {
        return [self.x, self.y, self.z];
    }

    pub fn iter(&self) -> impl Iterator<Item = (Actuator, f64)> + '_ {
        return Actuator::ALL.into_iter().map(move |a| (a, self.get(a)));
    }

    /// False when any angle is NaN or infinite, i.e. the pose is out of reach.
    pub fn is_finite(&self) -> bool {
        return self.x.is_finite() && self.y.is_finite() && self.z.is_finite();
    }
}

/// Inverse kinematics for a three-armed tilt platform.
///
/// The solver is stateless beyond its geometry: every call works on locals
/// only, so one instance can be shared across threads. Out of reach poses are
/// not reported as errors, they come back as NaN angles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KinematicsSolver {
    geometry: Geometry,
}

impl KinematicsSolver {
    pub fn new(base_radius: f64, platform_radius: f64, proximal_link: f64, distal_link: f64) -> Self {
        return Self::from_geometry(Geometry {
            base_radius,
            platform_radius,
            proximal_link,
            distal_link,
        });
    }

    pub fn from_geometry(geometry: Geometry) -> Self {
        debug_assert!(
            [
                geometry.base_radius,
                geometry.platform_radius,
                geometry.proximal_link,
                geometry.distal_link,
            ]
            .iter()
            .all(|v| v.is_finite() && *v > 0.0),
            "geometry lengths must be positive: {:?}",
            geometry
        );

        return Self { geometry };
    }

    pub fn geometry(&self) -> &Geometry {
        return &self.geometry;
    }

    /// Angular displacement in degrees of the given actuator's drive joint.
    pub fn compute_angle(&self, actuator: Actuator, vertical_offset: f64, tilt_x: f64, tilt_y: f64) -> f64 {
        let Geometry {
            base_radius: base,
            platform_radius: plate,
            ..
        } = self.geometry;

        let n = TiltNormal::from_tilt(tilt_x, tilt_y);
        let (nx, ny, nz) = (n.x, n.y, n.z);

        // Each branch is its own closed form for the 0°, 120° and 240° mounts.
        let radians = match actuator {
            Actuator::X => {
                let nx2 = nx * nx;
                let coord_y = base
                    + (plate / 2.0)
                        * (1.0
                            - (nx2 + 3.0 * nz * nz + 3.0 * nz)
                                / (nz + 1.0 - nx2
                                    + (nx2 * nx2 - 3.0 * nx2 * ny * ny)
                                        / ((nz + 1.0) * (nz + 1.0 - nx2))));
                let coord_z = vertical_offset + plate * ny;
                let length = (coord_y * coord_y + coord_z * coord_z).sqrt();

                log::trace!("IK {} joint:  (-, {:.4}, {:.4}) L={:.4}", actuator, coord_y, coord_z, length);

                (coord_y / length).acos() + self.triangle_correction(length)
            }
            Actuator::Y => {
                let coord_x = (SQRT_3 / 2.0)
                    * (plate * (1.0 - (nx * nx + SQRT_3 * nx * ny) / (nz + 1.0)) - base);
                let coord_y = coord_x / SQRT_3;
                let coord_z = vertical_offset - (plate / 2.0) * (SQRT_3 * nx + ny);
                let length = (coord_x * coord_x + coord_y * coord_y + coord_z * coord_z).sqrt();

                log::trace!(
                    "IK {} joint:  ({:.4}, {:.4}, {:.4}) L={:.4}",
                    actuator,
                    coord_x,
                    coord_y,
                    coord_z,
                    length
                );

                ((SQRT_3 * coord_x + coord_y) / (-2.0 * length)).acos() + self.triangle_correction(length)
            }
            Actuator::Z => {
                let coord_x = (SQRT_3 / 2.0)
                    * (base - plate * (1.0 - (nx * nx - SQRT_3 * nx * ny) / (nz + 1.0)));
                let coord_y = -coord_x / SQRT_3;
                let coord_z = vertical_offset + (plate / 2.0) * (SQRT_3 * nx - ny);
                let length = (coord_x * coord_x + coord_y * coord_y + coord_z * coord_z).sqrt();

                log::trace!(
                    "IK {} joint:  ({:.4}, {:.4}, {:.4}) L={:.4}",
                    actuator,
                    coord_x,
                    coord_y,
                    coord_z,
                    length
                );

                ((SQRT_3 * coord_x - coord_y) / (2.0 * length)).acos() + self.triangle_correction(length)
            }
        };

        return radians.to_degrees();
    }

    /// Evaluate all three actuators for one pose.
    pub fn compute_angles(&self, vertical_offset: f64, tilt_x: f64, tilt_y: f64) -> Angles {
        return Angles {
            x: self.compute_angle(Actuator::X, vertical_offset, tilt_x, tilt_y),
            y: self.compute_angle(Actuator::Y, vertical_offset, tilt_x, tilt_y),
            z: self.compute_angle(Actuator::Z, vertical_offset, tilt_x, tilt_y),
        };
    }

    // Law of cosines over the triangle (length, proximal, distal).
    fn triangle_correction(&self, length: f64) -> f64 {
        let proximal = self.geometry.proximal_link;
        let distal = self.geometry.distal_link;

        return ((length * length + proximal * proximal - distal * distal) / (2.0 * length * proximal)).acos();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-9;

    fn solver() -> KinematicsSolver {
        return KinematicsSolver::new(50.0, 40.0, 80.0, 120.0);
    }

    #[test]
    fn neutral_pose_is_rotationally_symmetric() {
        let solver = solver();

        for height in [120.0, 150.0, 180.0] {
            let angles = solver.compute_angles(height, 0.0, 0.0);
            assert!((angles.x - angles.y).abs() < EPSILON, "{:?}", angles);
            assert!((angles.x - angles.z).abs() < EPSILON, "{:?}", angles);
        }
    }

    #[test]
    fn neutral_pose_regression_baseline() {
        let solver = solver();

        // Joint lies at (base - plate, height) = (10, 150) in the arm plane.
        let length = (10.0_f64.powi(2) + 150.0_f64.powi(2)).sqrt();
        let elevation = (10.0 / length).acos();
        let correction = ((length.powi(2) + 80.0_f64.powi(2) - 120.0_f64.powi(2)) / (2.0 * length * 80.0)).acos();
        let expected = (elevation + correction).to_degrees();

        assert!((expected - 138.814_038_498_289_05).abs() < EPSILON);
        for actuator in Actuator::ALL {
            let angle = solver.compute_angle(actuator, 150.0, 0.0, 0.0);
            assert!((angle - expected).abs() < EPSILON, "{} = {}", actuator, angle);
        }
    }

    #[test]
    fn tilted_pose_regression_baseline() {
        let angles = solver().compute_angles(150.0, 0.1, -0.05);

        assert!((angles.x - 139.978_082_242_866_32).abs() < EPSILON);
        assert!((angles.y - 140.222_228_066_507_54).abs() < EPSILON);
        assert!((angles.z - 136.040_073_963_226_86).abs() < EPSILON);
    }

    #[test]
    fn repeated_calls_are_bit_identical() {
        let solver = solver();

        for actuator in Actuator::ALL {
            let first = solver.compute_angle(actuator, 142.5, 0.12, -0.07);
            for _ in 0..10 {
                let again = solver.compute_angle(actuator, 142.5, 0.12, -0.07);
                assert_eq!(first.to_bits(), again.to_bits());
            }
        }
    }

    #[test]
    fn calls_do_not_interfere() {
        let solver = solver();

        let before = solver.compute_angle(Actuator::Y, 150.0, 0.1, 0.1);
        solver.compute_angle(Actuator::X, 60.0, -0.3, 0.2);
        solver.compute_angle(Actuator::Z, 10.0, 5.0, 5.0);
        let after = solver.compute_angle(Actuator::Y, 150.0, 0.1, 0.1);

        assert_eq!(before.to_bits(), after.to_bits());
    }

    #[test]
    fn angle_moves_monotonically_away_from_neutral_height() {
        let solver = solver();
        let neutral = 130.0;

        for actuator in Actuator::ALL {
            let reference = solver.compute_angle(actuator, neutral, 0.05, 0.02);

            let mut previous = 0.0;
            for step in 1..=6 {
                let offset = step as f64 * 10.0;
                let above = solver.compute_angle(actuator, neutral + offset, 0.05, 0.02);
                let below = solver.compute_angle(actuator, neutral - offset, 0.05, 0.02);

                // Raising the platform lowers the drive angle and vice versa.
                assert!(above < reference && below > reference, "{} at ±{}", actuator, offset);

                let deviation = (above - reference).abs().min((below - reference).abs());
                assert!(deviation > previous, "{} at ±{}", actuator, offset);
                previous = deviation;
            }
        }
    }

    #[test]
    fn mirrored_tilt_swaps_y_and_z() {
        let solver = solver();

        for (height, tilt_x, tilt_y) in [(150.0, 0.1, -0.05), (130.0, -0.2, 0.15), (170.0, 0.03, 0.0)] {
            let y = solver.compute_angle(Actuator::Y, height, tilt_x, tilt_y);
            let z = solver.compute_angle(Actuator::Z, height, -tilt_x, tilt_y);
            assert!((y - z).abs() < EPSILON, "y={} z={}", y, z);

            let x = solver.compute_angle(Actuator::X, height, tilt_x, tilt_y);
            let x_mirrored = solver.compute_angle(Actuator::X, height, -tilt_x, tilt_y);
            assert!((x - x_mirrored).abs() < EPSILON, "x={} x'={}", x, x_mirrored);
        }
    }

    #[test]
    fn short_links_yield_nan() {
        let solver = KinematicsSolver::new(50.0, 40.0, 10.0, 10.0);

        for actuator in Actuator::ALL {
            assert!(solver.compute_angle(actuator, 150.0, 0.0, 0.0).is_nan());
        }
        assert!(!solver.compute_angles(150.0, 0.0, 0.0).is_finite());
    }

    #[test]
    fn zero_length_joint_vector_yields_nan() {
        // Equal radii put the untilted joint on the drive axis at zero height.
        let solver = KinematicsSolver::new(40.0, 40.0, 80.0, 120.0);

        for actuator in Actuator::ALL {
            assert!(solver.compute_angle(actuator, 0.0, 0.0, 0.0).is_nan(), "{}", actuator);
        }
    }

    #[test]
    fn out_of_reach_height_yields_nan() {
        let solver = solver();

        assert!(solver.compute_angle(Actuator::X, 200.0, 0.05, 0.02).is_nan());
        assert!(solver.compute_angle(Actuator::Y, 40.0, 0.05, 0.02).is_nan());
    }

    #[test]
    fn normalization_is_stable_at_extremes() {
        let n = TiltNormal::from_tilt(1e6, 0.0);
        assert!(n.x.is_finite() && n.y.is_finite() && n.z.is_finite());
        assert!((n.x - 1.0).abs() < 1e-9);
        assert!(n.z > 0.0 && n.z < 1e-5);

        let n = TiltNormal::from_tilt(-1e6, 1e6);
        assert!((n.x * n.x + n.y * n.y + n.z * n.z - 1.0).abs() < 1e-12);
        assert!(n.x < 0.0 && n.y > 0.0);
        assert!(n.z > 0.0 && n.z < 1e-5);

        let n = TiltNormal::from_tilt(1e200, 1e200);
        assert!(n.x.is_finite() && n.z.is_finite());
        assert!((n.x - std::f64::consts::FRAC_1_SQRT_2).abs() < 1e-12);
    }

    #[test]
    fn extreme_tilt_still_produces_angles() {
        let angles = solver().compute_angles(150.0, 1e6, 0.0);

        assert!(angles.is_finite(), "{:?}", angles);
    }

    #[test]
    fn untilted_normal_points_up() {
        let n = TiltNormal::from_tilt(0.0, 0.0);

        assert_eq!(n, TiltNormal { x: 0.0, y: 0.0, z: 1.0 });
    }

    #[test]
    fn angles_accessors_follow_actuator_order() {
        let angles = Angles { x: 1.0, y: 2.0, z: 3.0 };

        let collected: Vec<(Actuator, f64)> = angles.iter().collect();
        assert_eq!(collected, vec![(Actuator::X, 1.0), (Actuator::Y, 2.0), (Actuator::Z, 3.0)]);
        assert_eq!(angles.get(Actuator::Z), 3.0);
        assert_eq!(angles.to_array(), [1.0, 2.0, 3.0]);
        for (i, actuator) in Actuator::ALL.into_iter().enumerate() {
            assert_eq!(actuator.index(), i);
        }
        assert!(!Angles { y: f64::NAN, ..angles }.is_finite());
    }

    #[test]
    fn solver_is_shareable_across_threads() {
        let solver = solver();
        let expected = solver.compute_angles(150.0, 0.1, -0.05);

        let handles: Vec<_> = (0..4)
            .map(|_| std::thread::spawn(move || solver.compute_angles(150.0, 0.1, -0.05)))
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), expected);
        }
    }
}
