//! Physics simulation using `Rapier3D` with a fixed timestep.
//!
//! The adapter owns every rapier set and exposes a small contract to the rest
//! of the crate: add/remove bodies, step once, query transforms by handle, and
//! register contact materials between surface kinds.

use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

use rapier3d::prelude::*;
use serde::{Deserialize, Serialize};

use crate::entity::Transform;

/// Fixed timestep for physics simulation (60Hz).
pub const PHYSICS_DT: f32 = 1.0 / 60.0;

/// Default gravity vector (downward, in m/s²).
pub fn default_gravity() -> [f32; 3] {
    [0.0, -9.81, 0.0]
}

/// Surface kind attached to every collider; contact materials are keyed by
/// pairs of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurfaceMaterial {
    Ball,
    Ground,
    Wall,
    Target,
}

impl SurfaceMaterial {
    fn to_user_data(self) -> u128 {
        match self {
            Self::Ball => 1,
            Self::Ground => 2,
            Self::Wall => 3,
            Self::Target => 4,
        }
    }

    fn from_user_data(data: u128) -> Option<Self> {
        match data {
            1 => Some(Self::Ball),
            2 => Some(Self::Ground),
            3 => Some(Self::Wall),
            4 => Some(Self::Target),
            _ => None,
        }
    }
}

/// Friction and restitution applied to contacts between two surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContactMaterial {
    pub friction: f32,
    pub restitution: f32,
}

impl Default for ContactMaterial {
    fn default() -> Self {
        Self {
            friction: 0.4,
            restitution: 0.3,
        }
    }
}

/// Symmetric table of contact materials, consulted by rapier for every
/// solver contact between two hooked colliders.
#[derive(Debug, Clone, Default)]
pub struct ContactMaterialTable {
    fallback: ContactMaterial,
    pairs: HashMap<(SurfaceMaterial, SurfaceMaterial), ContactMaterial>,
}

impl ContactMaterialTable {
    pub fn new(fallback: ContactMaterial) -> Self {
        Self {
            fallback,
            pairs: HashMap::new(),
        }
    }

    fn key(a: SurfaceMaterial, b: SurfaceMaterial) -> (SurfaceMaterial, SurfaceMaterial) {
        if a <= b { (a, b) } else { (b, a) }
    }

    /// Registers a pair. Registering the same pair again replaces it.
    pub fn register(&mut self, a: SurfaceMaterial, b: SurfaceMaterial, material: ContactMaterial) {
        if self.pairs.insert(Self::key(a, b), material).is_some() {
            tracing::debug!(?a, ?b, "contact material replaced");
        }
    }

    /// Looks up the material for a pair, falling back to the default.
    pub fn lookup(&self, a: SurfaceMaterial, b: SurfaceMaterial) -> ContactMaterial {
        self.pairs
            .get(&Self::key(a, b))
            .copied()
            .unwrap_or(self.fallback)
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl PhysicsHooks for ContactMaterialTable {
    fn modify_solver_contacts(&self, context: &mut ContactModificationContext) {
        let surface = |handle: ColliderHandle| {
            context
                .colliders
                .get(handle)
                .and_then(|c| SurfaceMaterial::from_user_data(c.user_data))
        };
        let (Some(a), Some(b)) = (surface(context.collider1), surface(context.collider2)) else {
            return;
        };
        let material = self.lookup(a, b);
        for contact in context.solver_contacts.iter_mut() {
            contact.friction = material.friction;
            contact.restitution = material.restitution;
        }
    }
}

/// Collision shape primitives.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BodyShape {
    Sphere { radius: f32 },
    Box { half_extents: [f32; 3] },
    /// Cylinder aligned with the Y axis.
    Cylinder { radius: f32, half_height: f32 },
    /// Infinite plane facing +Y through the body origin.
    Plane,
}

impl BodyShape {
    fn to_shared_shape(self) -> SharedShape {
        match self {
            Self::Sphere { radius } => SharedShape::ball(radius),
            Self::Box { half_extents: [x, y, z] } => SharedShape::cuboid(x, y, z),
            Self::Cylinder {
                radius,
                half_height,
            } => SharedShape::cylinder(half_height, radius),
            Self::Plane => SharedShape::halfspace(Vector::<Real>::y_axis()),
        }
    }
}

/// Whether a body is simulated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BodyKind {
    /// Immovable, zero mass.
    Static,
    /// Subject to gravity.
    Dynamic {
        mass: f32,
        linear_damping: f32,
        angular_damping: f32,
    },
}

/// Everything needed to insert one body with a single collider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyDesc {
    pub kind: BodyKind,
    pub shape: BodyShape,
    pub position: [f32; 3],
    pub velocity: [f32; 3],
    pub material: SurfaceMaterial,
    /// Sensors report overlap but produce no contact response.
    pub sensor: bool,
}

impl BodyDesc {
    /// A static body with a solid collider.
    pub fn fixed(shape: BodyShape, position: [f32; 3], material: SurfaceMaterial) -> Self {
        Self {
            kind: BodyKind::Static,
            shape,
            position,
            velocity: [0.0; 3],
            material,
            sensor: false,
        }
    }

    /// A falling ball.
    pub fn ball(radius: f32, mass: f32, position: [f32; 3], velocity: [f32; 3]) -> Self {
        Self {
            kind: BodyKind::Dynamic {
                mass,
                linear_damping: 0.3,
                angular_damping: 0.3,
            },
            shape: BodyShape::Sphere { radius },
            position,
            velocity,
            material: SurfaceMaterial::Ball,
            sensor: false,
        }
    }

    #[must_use]
    pub fn with_sensor(mut self, sensor: bool) -> Self {
        self.sensor = sensor;
        self
    }
}

/// Physics world containing all `Rapier3D` components for deterministic simulation.
pub struct PhysicsWorld {
    rigid_body_set: RigidBodySet,
    collider_set: ColliderSet,
    integration_parameters: IntegrationParameters,
    physics_pipeline: PhysicsPipeline,
    island_manager: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    impulse_joint_set: ImpulseJointSet,
    multibody_joint_set: MultibodyJointSet,
    ccd_solver: CCDSolver,
    contact_materials: ContactMaterialTable,
    gravity: Vector<Real>,
    frame: u64,
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PhysicsWorld {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhysicsWorld")
            .field("frame", &self.frame)
            .field("rigid_body_count", &self.rigid_body_set.len())
            .field("collider_count", &self.collider_set.len())
            .field("gravity", &self.gravity)
            .finish_non_exhaustive()
    }
}

impl PhysicsWorld {
    /// Creates a new physics world with default settings.
    pub fn new() -> Self {
        Self::with_gravity(default_gravity())
    }

    /// Creates a new physics world with custom gravity.
    pub fn with_gravity(gravity: [f32; 3]) -> Self {
        let integration_parameters = IntegrationParameters {
            dt: PHYSICS_DT,
            ..Default::default()
        };

        Self {
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            integration_parameters,
            physics_pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            contact_materials: ContactMaterialTable::default(),
            gravity: vector![gravity[0], gravity[1], gravity[2]],
            frame: 0,
        }
    }

    /// Replaces the material used for pairs with no registration.
    pub fn set_default_contact_material(&mut self, material: ContactMaterial) {
        self.contact_materials.fallback = material;
    }

    /// Registers friction/restitution between two surfaces. Last registration wins.
    pub fn register_contact_material(
        &mut self,
        a: SurfaceMaterial,
        b: SurfaceMaterial,
        material: ContactMaterial,
    ) {
        self.contact_materials.register(a, b, material);
    }

    pub fn contact_materials(&self) -> &ContactMaterialTable {
        &self.contact_materials
    }

    /// Advances the physics simulation by one fixed timestep.
    pub fn step(&mut self) {
        self.physics_pipeline.step(
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
            None,
            &self.contact_materials,
            &(),
        );
        self.frame += 1;
    }

    /// Advances the physics simulation by multiple steps.
    pub fn step_n(&mut self, n: u32) {
        for _ in 0..n {
            self.step();
        }
    }

    /// Inserts a body and its collider, returning the body handle.
    pub fn add_body(&mut self, desc: &BodyDesc) -> RigidBodyHandle {
        let [x, y, z] = desc.position;
        let rigid_body = match desc.kind {
            BodyKind::Static => RigidBodyBuilder::fixed().translation(vector![x, y, z]).build(),
            BodyKind::Dynamic {
                linear_damping,
                angular_damping,
                ..
            } => {
                let [vx, vy, vz] = desc.velocity;
                RigidBodyBuilder::dynamic()
                    .translation(vector![x, y, z])
                    .linvel(vector![vx, vy, vz])
                    .linear_damping(linear_damping)
                    .angular_damping(angular_damping)
                    .build()
            }
        };
        let handle = self.rigid_body_set.insert(rigid_body);

        let mut collider = ColliderBuilder::new(desc.shape.to_shared_shape())
            .sensor(desc.sensor)
            .user_data(desc.material.to_user_data());
        if !desc.sensor {
            collider = collider.active_hooks(ActiveHooks::MODIFY_SOLVER_CONTACTS);
        }
        if let BodyKind::Dynamic { mass, .. } = desc.kind {
            collider = collider.mass(mass);
        }
        self.collider_set
            .insert_with_parent(collider.build(), handle, &mut self.rigid_body_set);

        handle
    }

    /// Removes a rigid body and its attached colliders. Unknown handles are ignored.
    pub fn remove_body(&mut self, handle: RigidBodyHandle) {
        let removed = self.rigid_body_set.remove(
            handle,
            &mut self.island_manager,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            true,
        );
        if removed.is_none() {
            tracing::debug!(?handle, "remove_body on unknown handle");
        }
    }

    /// Current position and orientation of a body.
    pub fn transform(&self, handle: RigidBodyHandle) -> Option<Transform> {
        self.rigid_body_set.get(handle).map(|body| {
            let t = body.translation();
            let q = body.rotation().coords;
            Transform {
                position: [t.x, t.y, t.z],
                rotation: [q.x, q.y, q.z, q.w],
            }
        })
    }

    /// Teleports a body. Used to follow zones repositioned by the pointer.
    pub fn set_position(&mut self, handle: RigidBodyHandle, position: [f32; 3]) {
        if let Some(body) = self.rigid_body_set.get_mut(handle) {
            body.set_translation(vector![position[0], position[1], position[2]], true);
        }
    }

    pub fn contains(&self, handle: RigidBodyHandle) -> bool {
        self.rigid_body_set.contains(handle)
    }

    pub fn body_count(&self) -> usize {
        self.rigid_body_set.len()
    }

    /// Computes a deterministic hash of the current physics state.
    pub fn compute_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();

        self.frame.hash(&mut hasher);

        for (handle, body) in self.rigid_body_set.iter() {
            let (index, generation) = handle.into_raw_parts();
            index.hash(&mut hasher);
            generation.hash(&mut hasher);

            let pos = body.translation();
            let rot = body.rotation().coords;
            let linvel = body.linvel();
            for value in [pos.x, pos.y, pos.z, rot.x, rot.y, rot.z, rot.w, linvel.x, linvel.y, linvel.z] {
                value.to_bits().hash(&mut hasher);
            }
        }

        hasher.finish()
    }

    /// Returns the current simulation frame number.
    pub fn current_frame(&self) -> u64 {
        self.frame
    }
}
