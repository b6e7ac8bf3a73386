//! World systems
//!
//! The minimal scene the avatar walks around in: ground, light, camera.

use bevy::light::CascadeShadowConfigBuilder;
use bevy::prelude::*;
use bevy_rapier3d::prelude::*;

/// Half extent of the square ground plane.
pub const GROUND_HALF_SIZE: f32 = 50.0;

/// Root entity for all client-side world visuals
#[derive(Component)]
pub struct ClientWorldRoot;

pub fn spawn_world(
    mut commands: Commands,
    world_roots: Query<Entity, With<ClientWorldRoot>>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    if !world_roots.is_empty() {
        return;
    }

    let root = commands
        .spawn((ClientWorldRoot, Transform::default(), Visibility::default()))
        .id();

    let sun = commands
        .spawn((
            DirectionalLight {
                illuminance: 12_000.0,
                shadows_enabled: true,
                color: Color::srgb(1.0, 0.97, 0.92),
                ..default()
            },
            CascadeShadowConfigBuilder {
                num_cascades: 2,
                maximum_distance: 60.0,
                first_cascade_far_bound: 10.0,
                ..default()
            }
            .build(),
            Transform::from_rotation(Quat::from_euler(EulerRot::XYZ, -0.9, 0.4, 0.0)),
        ))
        .id();
    commands.entity(root).add_child(sun);

    commands.insert_resource(AmbientLight {
        color: Color::srgb(0.85, 0.88, 0.95),
        brightness: 250.0,
        affects_lightmapped_meshes: true,
    });
    commands.insert_resource(ClearColor(Color::srgb(0.55, 0.68, 0.82)));

    let size = GROUND_HALF_SIZE * 2.0;
    let ground = commands
        .spawn((
            Mesh3d(meshes.add(Plane3d::default().mesh().size(size, size).subdivisions(10))),
            MeshMaterial3d(materials.add(StandardMaterial {
                base_color: Color::srgb(0.42, 0.48, 0.36),
                perceptual_roughness: 0.95,
                ..default()
            })),
            Transform::default(),
            RigidBody::Fixed,
            Collider::cuboid(GROUND_HALF_SIZE, 0.01, GROUND_HALF_SIZE),
        ))
        .id();
    commands.entity(root).add_child(ground);

    commands.spawn((
        Camera3d::default(),
        Transform::from_xyz(0.0, 4.0, -8.0).looking_at(Vec3::new(0.0, 1.0, 0.0), Vec3::Y),
    ));

    info!("World spawned");
}
