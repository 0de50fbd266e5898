//! Rigid body physics for creatures
//!
//! Wraps a rapier2d world and adds what creatures need on top of it:
//! - damped springs whose active length can be rewritten every tick,
//! - a [`Blueprint`] → [`BodyGroup`] grouping primitive that adds or removes a
//!   creature's bodies, hinges and springs as one unit,
//! - a static ground that every creature collides with (creatures never collide
//!   with each other).
//!
//! Units are meters, kilograms and seconds; +y points up.

use ahash::HashMap;
use glam::Vec2;
use rapier2d::prelude::*;
use serde::{Deserialize, Serialize};

/// Fixed simulation time step (60 Hz)
pub const TIME_STEP: f32 = 1.0 / 60.0;

/// Gravity along -y in m/s²
pub const GRAVITY: f32 = 9.81;

/// Top surface of the ground plane
pub const GROUND_Y: f32 = 0.0;

const GROUND_HALF_WIDTH: f32 = 5000.0;
const GROUND_HALF_HEIGHT: f32 = 1.0;
const GROUND_FRICTION: f32 = 1.0;

const GROUND_GROUP: Group = Group::GROUP_1;
const CREATURE_GROUP: Group = Group::GROUP_2;

/// Shortest length a spring may be driven to
pub const MIN_SPRING_LENGTH: f32 = 0.05;

fn to_vector(v: Vec2) -> Vector<Real> {
    vector![v.x, v.y]
}

fn to_point(v: Vec2) -> Point<Real> {
    point![v.x, v.y]
}

fn to_vec2(v: &Vector<Real>) -> Vec2 {
    Vec2::new(v.x, v.y)
}

/// Collision shape of a body part
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PartShape {
    Ball { radius: f32 },
    Box { half_width: f32, half_height: f32 },
}

impl PartShape {
    /// Vertical distance from the part's center down to its lowest point
    pub fn extent_below(&self, angle: f32) -> f32 {
        match *self {
            PartShape::Ball { radius } => radius,
            PartShape::Box {
                half_width,
                half_height,
            } => half_width * angle.sin().abs() + half_height * angle.cos().abs(),
        }
    }
}

/// Rigid body in a blueprint
#[derive(Debug, Clone, PartialEq)]
pub struct PartDesc {
    pub position: Vec2,
    pub angle: f32,
    pub shape: PartShape,
    pub density: f32,
    pub friction: f32,
}

/// Hinge (revolute joint) between two parts, anchors in each part's local frame
#[derive(Debug, Clone, PartialEq)]
pub struct HingeDesc {
    pub parent: usize,
    pub child: usize,
    pub parent_anchor: Vec2,
    pub child_anchor: Vec2,
    /// Allowed relative angle range in radians
    pub limits: Option<(f32, f32)>,
}

/// Damped spring between two parts, anchors in each part's local frame.
///
/// The rest length is measured from the anchors' world positions at spawn.
#[derive(Debug, Clone, PartialEq)]
pub struct SpringDesc {
    pub a: usize,
    pub b: usize,
    pub anchor_a: Vec2,
    pub anchor_b: Vec2,
    /// N/m
    pub stiffness: f32,
    /// N·s/m
    pub damping: f32,
}

/// Pure description of a creature's physical structure
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Blueprint {
    pub parts: Vec<PartDesc>,
    pub hinges: Vec<HingeDesc>,
    pub springs: Vec<SpringDesc>,
}

impl Blueprint {
    /// Add a part and return its index
    pub fn add_part(&mut self, part: PartDesc) -> usize {
        self.parts.push(part);
        self.parts.len() - 1
    }

    /// Add a hinge and return its index
    pub fn add_hinge(&mut self, hinge: HingeDesc) -> usize {
        self.hinges.push(hinge);
        self.hinges.len() - 1
    }

    /// Add a spring and return its index
    pub fn add_spring(&mut self, spring: SpringDesc) -> usize {
        self.springs.push(spring);
        self.springs.len() - 1
    }

    /// Check every hinge and spring references an existing part
    pub fn validate(&self) -> Result<(), crate::error::ConstructionError> {
        let parts = self.parts.len();
        let indices = self
            .hinges
            .iter()
            .flat_map(|h| [h.parent, h.child])
            .chain(self.springs.iter().flat_map(|s| [s.a, s.b]));
        for index in indices {
            if index >= parts {
                return Err(crate::error::ConstructionError::InvalidPartIndex { index, parts });
            }
        }
        Ok(())
    }
}

/// Handle to a spring owned by [`PhysicsWorld`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpringHandle(u32);

/// Hinge handle plus the two bodies it joins
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HingeLink {
    pub joint: ImpulseJointHandle,
    pub parent: RigidBodyHandle,
    pub child: RigidBodyHandle,
}

/// Everything one blueprint spawned, indexed like the blueprint
#[derive(Debug, Clone, Default)]
pub struct BodyGroup {
    bodies: Vec<RigidBodyHandle>,
    shapes: Vec<PartShape>,
    hinges: Vec<HingeLink>,
    springs: Vec<SpringHandle>,
    rest_lengths: Vec<f32>,
    active: bool,
}

impl BodyGroup {
    pub fn bodies(&self) -> &[RigidBodyHandle] {
        &self.bodies
    }

    pub fn shapes(&self) -> &[PartShape] {
        &self.shapes
    }

    pub fn hinges(&self) -> &[HingeLink] {
        &self.hinges
    }

    pub fn hinge_count(&self) -> usize {
        self.hinges.len()
    }

    pub fn springs(&self) -> &[SpringHandle] {
        &self.springs
    }

    /// Spring lengths at spawn, indexed like [`BodyGroup::springs`]
    pub fn rest_lengths(&self) -> &[f32] {
        &self.rest_lengths
    }

    /// Whether the group is currently registered with a world
    pub fn is_active(&self) -> bool {
        self.active
    }
}

/// Snapshot of one rigid body's kinematic state
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyState {
    pub position: Vec2,
    pub velocity: Vec2,
    pub angle: f32,
    pub angular_velocity: f32,
}

#[derive(Debug, Clone)]
struct Spring {
    body_a: RigidBodyHandle,
    body_b: RigidBodyHandle,
    anchor_a: Point<Real>,
    anchor_b: Point<Real>,
    length: f32,
    stiffness: f32,
    damping: f32,
}

/// Manages the rapier2d world creatures live in
pub struct PhysicsWorld {
    /// Rapier rigid body set
    rigid_body_set: RigidBodySet,

    /// Rapier collider set
    collider_set: ColliderSet,

    /// Physics pipeline
    pipeline: PhysicsPipeline,

    /// Integration parameters
    integration_parameters: IntegrationParameters,

    /// Island manager
    island_manager: IslandManager,

    /// Broad phase
    broad_phase: BroadPhase,

    /// Narrow phase
    narrow_phase: NarrowPhase,

    /// Impulse joint set (creature hinges)
    impulse_joint_set: ImpulseJointSet,

    /// Multibody joint set (unused by creatures, required by the pipeline)
    multibody_joint_set: MultibodyJointSet,

    /// CCD solver
    ccd_solver: CCDSolver,

    /// Query pipeline
    query_pipeline: QueryPipeline,

    /// Springs applied as impulses before every step
    springs: HashMap<SpringHandle, Spring>,
    next_spring: u32,

    gravity: Vector<Real>,
    steps: u64,
}

impl PhysicsWorld {
    pub fn new() -> Self {
        let integration_parameters = IntegrationParameters {
            dt: TIME_STEP,
            ..Default::default()
        };

        let mut collider_set = ColliderSet::new();

        let ground = ColliderBuilder::cuboid(GROUND_HALF_WIDTH, GROUND_HALF_HEIGHT)
            .translation(vector![0.0, GROUND_Y - GROUND_HALF_HEIGHT])
            .friction(GROUND_FRICTION)
            .restitution(0.0)
            .collision_groups(InteractionGroups::new(GROUND_GROUP, CREATURE_GROUP))
            .build();
        collider_set.insert(ground);

        log::debug!(
            "Physics: Created ground plane at y={} ({}m wide)",
            GROUND_Y,
            GROUND_HALF_WIDTH * 2.0
        );

        Self {
            rigid_body_set: RigidBodySet::new(),
            collider_set,
            pipeline: PhysicsPipeline::new(),
            integration_parameters,
            island_manager: IslandManager::new(),
            broad_phase: BroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            springs: HashMap::default(),
            next_spring: 0,
            gravity: vector![0.0, -GRAVITY],
            steps: 0,
        }
    }

    /// Advance the simulation by one [`TIME_STEP`]
    pub fn step(&mut self) {
        self.apply_springs();

        let physics_hooks = ();
        let event_handler = ();

        self.pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &physics_hooks,
            &event_handler,
        );
        self.steps += 1;
    }

    /// Number of steps taken since creation
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Hooke spring plus damping along the spring axis, applied as one impulse per step
    fn apply_springs(&mut self) {
        let dt = self.integration_parameters.dt;

        for spring in self.springs.values() {
            let (Some(a), Some(b)) = (
                self.rigid_body_set.get(spring.body_a),
                self.rigid_body_set.get(spring.body_b),
            ) else {
                continue;
            };

            let pa = a.position() * spring.anchor_a;
            let pb = b.position() * spring.anchor_b;
            let delta = pb - pa;
            let distance = delta.norm();
            if distance < 1e-6 {
                continue;
            }
            let axis = delta / distance;
            let closing_speed = (b.velocity_at_point(&pb) - a.velocity_at_point(&pa)).dot(&axis);

            // Damping may stop the relative motion along the axis but never reverse it
            let reduced_mass = 1.0 / (a.mass().recip() + b.mass().recip());
            let max_damping = reduced_mass * closing_speed.abs() / dt;
            let damping_force = (spring.damping * closing_speed).clamp(-max_damping, max_damping);

            let force = spring.stiffness * (distance - spring.length) + damping_force;
            let impulse = axis * (force * dt);

            if let Some(a) = self.rigid_body_set.get_mut(spring.body_a) {
                a.apply_impulse_at_point(impulse, pa, true);
            }
            if let Some(b) = self.rigid_body_set.get_mut(spring.body_b) {
                b.apply_impulse_at_point(-impulse, pb, true);
            }
        }
    }

    /// Add every part, hinge and spring of `blueprint` as one unit
    pub fn spawn_group(
        &mut self,
        blueprint: &Blueprint,
    ) -> Result<BodyGroup, crate::error::ConstructionError> {
        blueprint.validate()?;

        let mut group = BodyGroup {
            active: true,
            ..Default::default()
        };

        for part in &blueprint.parts {
            let body = RigidBodyBuilder::dynamic()
                .translation(to_vector(part.position))
                .rotation(part.angle)
                .build();
            let handle = self.rigid_body_set.insert(body);

            let collider = match part.shape {
                PartShape::Ball { radius } => ColliderBuilder::ball(radius),
                PartShape::Box {
                    half_width,
                    half_height,
                } => ColliderBuilder::cuboid(half_width, half_height),
            }
            .density(part.density)
            .friction(part.friction)
            .restitution(0.0)
            .collision_groups(InteractionGroups::new(CREATURE_GROUP, GROUND_GROUP))
            .build();
            self.collider_set
                .insert_with_parent(collider, handle, &mut self.rigid_body_set);

            group.bodies.push(handle);
            group.shapes.push(part.shape);
        }

        for hinge in &blueprint.hinges {
            let parent = group.bodies[hinge.parent];
            let child = group.bodies[hinge.child];
            let mut joint = RevoluteJointBuilder::new()
                .local_anchor1(to_point(hinge.parent_anchor))
                .local_anchor2(to_point(hinge.child_anchor));
            if let Some((min, max)) = hinge.limits {
                joint = joint.limits([min, max]);
            }
            let handle = self.impulse_joint_set.insert(parent, child, joint, true);
            group.hinges.push(HingeLink {
                joint: handle,
                parent,
                child,
            });
        }

        for desc in &blueprint.springs {
            let anchor_a = to_point(desc.anchor_a);
            let anchor_b = to_point(desc.anchor_b);
            let pa = self.rigid_body_set[group.bodies[desc.a]].position() * anchor_a;
            let pb = self.rigid_body_set[group.bodies[desc.b]].position() * anchor_b;
            let length = (pb - pa).norm().max(MIN_SPRING_LENGTH);

            let handle = SpringHandle(self.next_spring);
            self.next_spring = self.next_spring.wrapping_add(1);
            self.springs.insert(
                handle,
                Spring {
                    body_a: group.bodies[desc.a],
                    body_b: group.bodies[desc.b],
                    anchor_a,
                    anchor_b,
                    length,
                    stiffness: desc.stiffness,
                    damping: desc.damping,
                },
            );
            group.springs.push(handle);
            group.rest_lengths.push(length);
        }

        log::debug!(
            "Physics: Spawned group with {} bodies, {} hinges, {} springs",
            group.bodies.len(),
            group.hinges.len(),
            group.springs.len()
        );

        Ok(group)
    }

    /// Remove every handle of `group` from the world. Idempotent.
    pub fn despawn_group(&mut self, group: &mut BodyGroup) {
        if !group.active {
            return;
        }

        for spring in &group.springs {
            self.springs.remove(spring);
        }
        for hinge in &group.hinges {
            self.impulse_joint_set.remove(hinge.joint, false);
        }
        for &handle in &group.bodies {
            self.rigid_body_set.remove(
                handle,
                &mut self.island_manager,
                &mut self.collider_set,
                &mut self.impulse_joint_set,
                &mut self.multibody_joint_set,
                true,
            );
        }
        group.active = false;

        log::debug!("Physics: Despawned group with {} bodies", group.bodies.len());
    }

    /// Current kinematic state of a body
    pub fn body_state(&self, handle: RigidBodyHandle) -> Option<BodyState> {
        self.rigid_body_set.get(handle).map(|rb| BodyState {
            position: to_vec2(rb.translation()),
            velocity: to_vec2(rb.linvel()),
            angle: rb.rotation().angle(),
            angular_velocity: rb.angvel(),
        })
    }

    /// Set a body's angular velocity (rad/s)
    pub fn set_angular_velocity(&mut self, handle: RigidBodyHandle, angular_velocity: f32) {
        if let Some(rb) = self.rigid_body_set.get_mut(handle) {
            rb.set_angvel(angular_velocity, true);
        }
    }

    /// Rewrite a spring's active length; clamped to [`MIN_SPRING_LENGTH`]
    pub fn set_spring_length(&mut self, handle: SpringHandle, length: f32) {
        if let Some(spring) = self.springs.get_mut(&handle) {
            spring.length = if length.is_finite() {
                length.max(MIN_SPRING_LENGTH)
            } else {
                spring.length
            };
        }
    }

    /// Current active length of a spring
    pub fn spring_length(&self, handle: SpringHandle) -> Option<f32> {
        self.springs.get(&handle).map(|s| s.length)
    }

    /// World-space endpoints of a spring
    pub fn spring_endpoints(&self, handle: SpringHandle) -> Option<(Vec2, Vec2)> {
        let spring = self.springs.get(&handle)?;
        let a = self.rigid_body_set.get(spring.body_a)?;
        let b = self.rigid_body_set.get(spring.body_b)?;
        let pa = a.position() * spring.anchor_a;
        let pb = b.position() * spring.anchor_b;
        Some((Vec2::new(pa.x, pa.y), Vec2::new(pb.x, pb.y)))
    }

    /// Number of rigid bodies (ground excluded)
    pub fn body_count(&self) -> usize {
        self.rigid_body_set.len()
    }

    /// Number of live springs
    pub fn spring_count(&self) -> usize {
        self.springs.len()
    }

    /// Number of live hinges
    pub fn hinge_count(&self) -> usize {
        self.impulse_joint_set.len()
    }
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}
