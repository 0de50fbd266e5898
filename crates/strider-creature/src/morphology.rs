//! Creature morphologies
//!
//! Each body turns a genome into a [`Blueprint`], spawns it as one
//! [`BodyGroup`] and exposes its actuation channels:
//! - [`LeggedBody`]: torso on four two-segment legs driven by hip and knee muscles
//! - [`SoftBody`]: deformable lattice of particles whose structural springs are muscles
//! - [`SegmentChain`]: chain of rigid segments spun by a neural controller

use glam::Vec2;
use rapier2d::prelude::RigidBodyHandle;
use std::f32::consts::FRAC_PI_2;

use crate::error::ConstructionError;
use crate::genome::{NeuralGenome, OscillatorGenome};
use crate::physics::{
    Blueprint, BodyGroup, HingeDesc, PartDesc, PartShape, PhysicsWorld, SpringDesc,
    SpringHandle,
};
use crate::traits::Body;

/// Muscle length swing per unit signal, as a fraction of rest length
pub const MUSCLE_STROKE: f32 = 0.35;

/// Angular velocity added per unit signal each tick (rad/s)
pub const SPIN_GAIN: f32 = 0.5;

/// Angular velocity limit for spun segments (rad/s)
pub const MAX_SPIN: f32 = 12.0;

/// Spring constant per unit of genome stiffness (N/m)
pub const STIFFNESS_SCALE: f32 = 250.0;

/// Damping coefficient per unit of genome damping (N·s/m)
pub const DAMPING_SCALE: f32 = 10.0;

/// Gap left between the lowest part and the ground at spawn
const SPAWN_CLEARANCE: f32 = 0.05;

const LIMB_DENSITY: f32 = 4.0;
const TORSO_DENSITY: f32 = 1.0;
const FOOT_FRICTION: f32 = 1.2;
const BODY_FRICTION: f32 = 0.6;

/// One actuation channel of a body
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Actuator {
    /// Spring whose active length is driven to `rest_length + signal * stroke`
    Muscle {
        spring: SpringHandle,
        rest_length: f32,
        stroke: f32,
    },
    /// Segment whose angular velocity is nudged by `signal * SPIN_GAIN`
    Spin { body: RigidBodyHandle },
}

impl Actuator {
    fn muscle(spring: SpringHandle, rest_length: f32) -> Self {
        Actuator::Muscle {
            spring,
            rest_length,
            stroke: rest_length * MUSCLE_STROKE,
        }
    }

    /// Write one control signal to the world. Non-finite signals are ignored.
    pub fn apply(&self, world: &mut PhysicsWorld, signal: f32) {
        if !signal.is_finite() {
            return;
        }

        match *self {
            Actuator::Muscle {
                spring,
                rest_length,
                stroke,
            } => {
                world.set_spring_length(spring, rest_length + signal * stroke);
            }
            Actuator::Spin { body } => {
                if let Some(state) = world.body_state(body) {
                    let spin = (state.angular_velocity + signal * SPIN_GAIN)
                        .clamp(-MAX_SPIN, MAX_SPIN);
                    world.set_angular_velocity(body, spin);
                }
            }
        }
    }
}

fn muscles(group: &BodyGroup, count: usize) -> Vec<Actuator> {
    group
        .springs()
        .iter()
        .zip(group.rest_lengths())
        .take(count)
        .map(|(&spring, &rest_length)| Actuator::muscle(spring, rest_length))
        .collect()
}

// ===== Legged body =====

/// Number of legs on a [`LeggedBody`]
pub const LEG_COUNT: usize = 4;

const LIMB_HALF_WIDTH: f32 = 0.08;

/// Torso carried by [`LEG_COUNT`] thigh/shin legs.
///
/// Actuators are ordered hip, knee per leg, front to back.
#[derive(Debug)]
pub struct LeggedBody {
    group: BodyGroup,
    actuators: Vec<Actuator>,
}

impl LeggedBody {
    /// Hip and knee muscle per leg
    pub const ACTUATOR_COUNT: usize = LEG_COUNT * 2;

    /// Layout for `genome` with the feet resting just above `origin`
    pub fn blueprint(genome: &OscillatorGenome, origin: Vec2) -> Blueprint {
        let shape = &genome.shape;
        let stiffness = genome.stiffness * STIFFNESS_SCALE;
        let damping = genome.damping * DAMPING_SCALE;

        let half_width = shape.width / 2.0;
        let half_height = shape.height / 2.0;
        let segment = shape.limb_length / 2.0;
        let half_segment = segment / 2.0;
        let lever = (half_width * 0.3).min(0.4);

        let torso_y = origin.y + SPAWN_CLEARANCE + shape.limb_length + half_height;
        let hip_y = torso_y - half_height;

        let mut blueprint = Blueprint::default();
        let torso = blueprint.add_part(PartDesc {
            position: Vec2::new(origin.x, torso_y),
            angle: 0.0,
            shape: PartShape::Box {
                half_width,
                half_height,
            },
            density: TORSO_DENSITY,
            friction: BODY_FRICTION,
        });

        let limb = PartShape::Box {
            half_width: LIMB_HALF_WIDTH,
            half_height: half_segment,
        };
        let span = half_width * 0.8;
        let mut hip_springs = Vec::with_capacity(LEG_COUNT);
        let mut knee_springs = Vec::with_capacity(LEG_COUNT);

        for leg in 0..LEG_COUNT {
            let offset = span - leg as f32 * (2.0 * span / (LEG_COUNT - 1) as f32);
            let x = origin.x + offset;

            let thigh = blueprint.add_part(PartDesc {
                position: Vec2::new(x, hip_y - half_segment),
                angle: 0.0,
                shape: limb,
                density: LIMB_DENSITY,
                friction: BODY_FRICTION,
            });
            let shin = blueprint.add_part(PartDesc {
                position: Vec2::new(x, hip_y - segment - half_segment),
                angle: 0.0,
                shape: limb,
                density: LIMB_DENSITY,
                friction: FOOT_FRICTION,
            });

            blueprint.add_hinge(HingeDesc {
                parent: torso,
                child: thigh,
                parent_anchor: Vec2::new(offset, -half_height),
                child_anchor: Vec2::new(0.0, half_segment),
                limits: Some((-1.0, 1.0)),
            });
            blueprint.add_hinge(HingeDesc {
                parent: thigh,
                child: shin,
                parent_anchor: Vec2::new(0.0, -half_segment),
                child_anchor: Vec2::new(0.0, half_segment),
                limits: Some((-1.2, 1.2)),
            });

            hip_springs.push(SpringDesc {
                a: torso,
                b: thigh,
                anchor_a: Vec2::new(offset + lever, -half_height),
                anchor_b: Vec2::ZERO,
                stiffness,
                damping,
            });
            knee_springs.push(SpringDesc {
                a: thigh,
                b: shin,
                anchor_a: Vec2::new(lever / 2.0, 0.0),
                anchor_b: Vec2::ZERO,
                stiffness,
                damping,
            });
        }

        for (hip, knee) in hip_springs.into_iter().zip(knee_springs) {
            blueprint.add_spring(hip);
            blueprint.add_spring(knee);
        }
        blueprint
    }
}

impl Body for LeggedBody {
    type Genome = OscillatorGenome;

    fn build(
        genome: &OscillatorGenome,
        world: &mut PhysicsWorld,
        origin: Vec2,
    ) -> Result<Self, ConstructionError> {
        let group = world.spawn_group(&Self::blueprint(genome, origin))?;
        let actuators = muscles(&group, Self::ACTUATOR_COUNT);
        Ok(Self { group, actuators })
    }

    fn group(&self) -> &BodyGroup {
        &self.group
    }

    fn group_mut(&mut self) -> &mut BodyGroup {
        &mut self.group
    }

    fn actuators(&self) -> &[Actuator] {
        &self.actuators
    }
}

// ===== Soft body =====

/// Lattice columns of a [`SoftBody`]
pub const SOFT_COLUMNS: usize = 4;
/// Lattice rows of a [`SoftBody`]
pub const SOFT_ROWS: usize = 3;

const PARTICLE_RADIUS: f32 = 0.1;
const SHEAR_STIFFNESS_FACTOR: f32 = 0.5;

/// Deformable lattice of ball particles.
///
/// Structural (horizontal and vertical) springs are muscles; diagonal shear
/// springs are passive.
#[derive(Debug)]
pub struct SoftBody {
    group: BodyGroup,
    actuators: Vec<Actuator>,
}

impl SoftBody {
    /// One muscle per structural spring
    pub const ACTUATOR_COUNT: usize =
        SOFT_ROWS * (SOFT_COLUMNS - 1) + SOFT_COLUMNS * (SOFT_ROWS - 1);

    /// Layout for `genome`, bottom row resting just above `origin`
    pub fn blueprint(genome: &OscillatorGenome, origin: Vec2) -> Blueprint {
        let shape = &genome.shape;
        let stiffness = genome.stiffness * STIFFNESS_SCALE;
        let damping = genome.damping * DAMPING_SCALE;

        let dx = shape.width / (SOFT_COLUMNS - 1) as f32;
        let dy = shape.limb_length / 2.0;
        let left = origin.x - shape.width / 2.0;
        let bottom = origin.y + SPAWN_CLEARANCE + PARTICLE_RADIUS;

        let mut blueprint = Blueprint::default();
        for row in 0..SOFT_ROWS {
            for col in 0..SOFT_COLUMNS {
                blueprint.add_part(PartDesc {
                    position: Vec2::new(left + col as f32 * dx, bottom + row as f32 * dy),
                    angle: 0.0,
                    shape: PartShape::Ball {
                        radius: PARTICLE_RADIUS,
                    },
                    density: LIMB_DENSITY,
                    friction: if row == 0 { FOOT_FRICTION } else { BODY_FRICTION },
                });
            }
        }

        let index = |row: usize, col: usize| row * SOFT_COLUMNS + col;
        let mut link = |a: usize, b: usize, stiffness: f32| {
            blueprint.add_spring(SpringDesc {
                a,
                b,
                anchor_a: Vec2::ZERO,
                anchor_b: Vec2::ZERO,
                stiffness,
                damping,
            });
        };

        for row in 0..SOFT_ROWS {
            for col in 0..SOFT_COLUMNS - 1 {
                link(index(row, col), index(row, col + 1), stiffness);
            }
        }
        for row in 0..SOFT_ROWS - 1 {
            for col in 0..SOFT_COLUMNS {
                link(index(row, col), index(row + 1, col), stiffness);
            }
        }
        let shear = stiffness * SHEAR_STIFFNESS_FACTOR;
        for row in 0..SOFT_ROWS - 1 {
            for col in 0..SOFT_COLUMNS - 1 {
                link(index(row, col), index(row + 1, col + 1), shear);
                link(index(row, col + 1), index(row + 1, col), shear);
            }
        }

        blueprint
    }
}

impl Body for SoftBody {
    type Genome = OscillatorGenome;

    fn build(
        genome: &OscillatorGenome,
        world: &mut PhysicsWorld,
        origin: Vec2,
    ) -> Result<Self, ConstructionError> {
        let group = world.spawn_group(&Self::blueprint(genome, origin))?;
        let actuators = muscles(&group, Self::ACTUATOR_COUNT);
        Ok(Self { group, actuators })
    }

    fn group(&self) -> &BodyGroup {
        &self.group
    }

    fn group_mut(&mut self) -> &mut BodyGroup {
        &mut self.group
    }

    fn actuators(&self) -> &[Actuator] {
        &self.actuators
    }

    /// Angle of the bottom row; the ball particles roll freely
    fn tilt(&self, world: &PhysicsWorld) -> f32 {
        let bodies = self.group.bodies();
        let ends = (bodies.first(), bodies.get(SOFT_COLUMNS - 1));
        let (Some(&left), Some(&right)) = ends else {
            return 0.0;
        };
        match (world.body_state(left), world.body_state(right)) {
            (Some(left), Some(right)) => {
                let row = right.position - left.position;
                row.y.atan2(row.x)
            }
            _ => 0.0,
        }
    }
}

// ===== Segment chain =====

pub const SEGMENT_HALF_LENGTH: f32 = 0.25;
pub const SEGMENT_HALF_THICKNESS: f32 = 0.075;

/// Horizontal chain of rigid segments joined by hinges limited to ±90°.
///
/// One spin actuator per segment, ordered left to right.
#[derive(Debug)]
pub struct SegmentChain {
    group: BodyGroup,
    actuators: Vec<Actuator>,
}

impl SegmentChain {
    /// Layout for `segment_count` segments centred on `origin`
    pub fn blueprint(segment_count: usize, origin: Vec2) -> Result<Blueprint, ConstructionError> {
        if segment_count < 2 {
            return Err(ConstructionError::TooFewSegments(segment_count));
        }

        let length = SEGMENT_HALF_LENGTH * 2.0;
        let first_x = origin.x - (segment_count - 1) as f32 * length / 2.0;
        let y = origin.y + SPAWN_CLEARANCE + SEGMENT_HALF_THICKNESS;

        let mut blueprint = Blueprint::default();
        for i in 0..segment_count {
            blueprint.add_part(PartDesc {
                position: Vec2::new(first_x + i as f32 * length, y),
                angle: 0.0,
                shape: PartShape::Box {
                    half_width: SEGMENT_HALF_LENGTH,
                    half_height: SEGMENT_HALF_THICKNESS,
                },
                density: LIMB_DENSITY,
                friction: FOOT_FRICTION,
            });
        }
        for i in 1..segment_count {
            blueprint.add_hinge(HingeDesc {
                parent: i - 1,
                child: i,
                parent_anchor: Vec2::new(SEGMENT_HALF_LENGTH, 0.0),
                child_anchor: Vec2::new(-SEGMENT_HALF_LENGTH, 0.0),
                limits: Some((-FRAC_PI_2, FRAC_PI_2)),
            });
        }
        Ok(blueprint)
    }
}

impl Body for SegmentChain {
    type Genome = NeuralGenome;

    fn build(
        genome: &NeuralGenome,
        world: &mut PhysicsWorld,
        origin: Vec2,
    ) -> Result<Self, ConstructionError> {
        let group = world.spawn_group(&Self::blueprint(genome.segment_count, origin)?)?;
        let actuators = group
            .bodies()
            .iter()
            .map(|&body| Actuator::Spin { body })
            .collect();
        Ok(Self { group, actuators })
    }

    fn group(&self) -> &BodyGroup {
        &self.group
    }

    fn group_mut(&mut self) -> &mut BodyGroup {
        &mut self.group
    }

    fn actuators(&self) -> &[Actuator] {
        &self.actuators
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genome::{NeuralTopology, OscillatorTopology};
    use crate::sensors::SensorFrame;
    use crate::traits::Genome;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    fn oscillator(muscle_count: usize) -> OscillatorGenome {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(7);
        OscillatorGenome::random(&OscillatorTopology { muscle_count }, &mut rng)
    }

    #[test]
    fn test_legged_blueprint() {
        let genome = oscillator(LeggedBody::ACTUATOR_COUNT);
        let blueprint = LeggedBody::blueprint(&genome, Vec2::ZERO);

        assert_eq!(blueprint.parts.len(), 1 + LEG_COUNT * 2);
        assert_eq!(blueprint.hinges.len(), LEG_COUNT * 2);
        assert_eq!(blueprint.springs.len(), LeggedBody::ACTUATOR_COUNT);
        assert!(blueprint.validate().is_ok());

        // Feet start above the ground, centred on the spawn line
        for part in &blueprint.parts {
            assert!(part.position.y - part.shape.extent_below(part.angle) > 0.0);
        }
        let mean_x: f32 = blueprint.parts.iter().map(|p| p.position.x).sum::<f32>()
            / blueprint.parts.len() as f32;
        assert!(mean_x.abs() < 1e-4);
    }

    #[test]
    fn test_soft_body_lattice() {
        let genome = oscillator(SoftBody::ACTUATOR_COUNT);
        let blueprint = SoftBody::blueprint(&genome, Vec2::new(3.0, 0.0));

        assert_eq!(SoftBody::ACTUATOR_COUNT, 17);
        assert_eq!(blueprint.parts.len(), SOFT_COLUMNS * SOFT_ROWS);
        // 17 structural + 12 shear
        assert_eq!(blueprint.springs.len(), 29);
        assert!(blueprint.hinges.is_empty());

        let mut world = PhysicsWorld::new();
        let body = SoftBody::build(&genome, &mut world, Vec2::new(3.0, 0.0)).unwrap();
        assert_eq!(body.actuators().len(), 17);
        assert_eq!(body.group().springs().len(), 29);
        assert_eq!(body.sensor_count(), SensorFrame::dim(0));
    }

    #[test]
    fn test_soft_body_tilt_ignores_particle_spin() {
        let genome = oscillator(SoftBody::ACTUATOR_COUNT);
        let mut world = PhysicsWorld::new();
        let body = SoftBody::build(&genome, &mut world, Vec2::ZERO).unwrap();

        let particle = body.group().bodies()[0];
        world.set_angular_velocity(particle, MAX_SPIN);
        world.step();

        let spun = world.body_state(particle).unwrap().angle;
        assert!(spun > 0.1, "particle angle {spun}");
        assert!(body.tilt(&world).abs() < 0.05, "tilt {}", body.tilt(&world));
    }

    #[test]
    fn test_segment_chain() {
        let topology = NeuralTopology {
            segment_count: 4,
            hidden_count: 8,
        };
        let genome = NeuralGenome::zeroed(&topology);

        let mut world = PhysicsWorld::new();
        let chain = SegmentChain::build(&genome, &mut world, Vec2::ZERO).unwrap();

        assert_eq!(chain.group().bodies().len(), 4);
        assert_eq!(chain.group().hinge_count(), 3);
        assert_eq!(chain.actuators().len(), topology.output_count());
        assert_eq!(chain.sensor_count(), topology.input_count());
    }

    #[test]
    fn test_segment_chain_too_short() {
        let genome = NeuralGenome::zeroed(&NeuralTopology {
            segment_count: 1,
            hidden_count: 4,
        });

        let mut world = PhysicsWorld::new();
        let err = SegmentChain::build(&genome, &mut world, Vec2::ZERO).unwrap_err();
        assert_eq!(err, ConstructionError::TooFewSegments(1));
        assert_eq!(world.body_count(), 0);
    }

    #[test]
    fn test_muscle_actuator_drives_length() {
        let genome = oscillator(LeggedBody::ACTUATOR_COUNT);
        let mut world = PhysicsWorld::new();
        let body = LeggedBody::build(&genome, &mut world, Vec2::ZERO).unwrap();

        let Actuator::Muscle {
            spring,
            rest_length,
            stroke,
        } = body.actuators()[0]
        else {
            panic!("legged actuators are muscles");
        };
        assert!((stroke - rest_length * MUSCLE_STROKE).abs() < 1e-6);

        body.actuators()[0].apply(&mut world, 1.0);
        assert!((world.spring_length(spring).unwrap() - (rest_length + stroke)).abs() < 1e-5);

        body.actuators()[0].apply(&mut world, f32::NAN);
        assert!((world.spring_length(spring).unwrap() - (rest_length + stroke)).abs() < 1e-5);
    }

    #[test]
    fn test_spin_actuator_clamped() {
        let genome = NeuralGenome::zeroed(&NeuralTopology {
            segment_count: 2,
            hidden_count: 2,
        });
        let mut world = PhysicsWorld::new();
        let chain = SegmentChain::build(&genome, &mut world, Vec2::ZERO).unwrap();

        let actuator = chain.actuators()[0];
        for _ in 0..100 {
            actuator.apply(&mut world, 1.0);
        }

        let Actuator::Spin { body } = actuator else {
            panic!("chain actuators spin");
        };
        let spin = world.body_state(body).unwrap().angular_velocity;
        assert!((spin - MAX_SPIN).abs() < 1e-4);
    }
}
