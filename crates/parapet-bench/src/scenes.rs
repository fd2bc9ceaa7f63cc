use glam::Vec3;
use parapet_sampler::test_harness::BoxWorld;
use parapet_sampler::StartParams;

/// A synthetic benchmark scene: a box world plus the seeds cover discovery
/// starts from.
pub struct Scene {
    pub name: &'static str,
    pub world: BoxWorld,
    pub seeds: Vec<StartParams>,
    /// Where nearby-cover queries are issued from.
    pub query_center: Vec3,
    /// The threat position used by query filtering.
    pub eye: Vec3,
}

/// The standard scene set, smallest first.
pub fn standard_scenes() -> Vec<Scene> {
    vec![single_wall(), street(), courtyard(), debris_field()]
}

fn single_wall() -> Scene {
    let mut world = BoxWorld::new(0.0);
    world.add_solid(Vec3::new(-6.0, 0.0, 0.0), Vec3::new(6.0, 0.5, 1.2));
    Scene {
        name: "single-wall",
        world,
        seeds: vec![StartParams::new(Vec3::new(0.0, -1.0, 0.0), Vec3::Y)],
        query_center: Vec3::new(0.0, -0.5, 0.0),
        eye: Vec3::new(0.0, 8.0, 1.7),
    }
}

fn street() -> Scene {
    let mut world = BoxWorld::new(0.0);
    let mut seeds = Vec::new();
    // Two facades with gaps, like parked geometry along a street.
    for i in 0..4 {
        let x = i as f32 * 9.0;
        world.add_solid(Vec3::new(x, 4.0, 0.0), Vec3::new(x + 7.0, 4.6, 1.4));
        world.add_solid(Vec3::new(x, -4.6, 0.0), Vec3::new(x + 7.0, -4.0, 1.0));
        seeds.push(StartParams::new(Vec3::new(x + 3.5, 3.0, 0.0), Vec3::Y));
        seeds.push(StartParams::new(Vec3::new(x + 3.5, -3.0, 0.0), Vec3::NEG_Y));
    }
    Scene {
        name: "street",
        world,
        seeds,
        query_center: Vec3::new(16.0, 0.0, 0.0),
        eye: Vec3::new(16.0, 30.0, 1.7),
    }
}

fn courtyard() -> Scene {
    let mut world = BoxWorld::new(0.0);
    world.add_solid(Vec3::new(-8.0, 8.0, 0.0), Vec3::new(8.0, 8.6, 1.3));
    world.add_solid(Vec3::new(-8.0, -8.6, 0.0), Vec3::new(8.0, -8.0, 1.3));
    world.add_solid(Vec3::new(-8.6, -8.0, 0.0), Vec3::new(-8.0, 8.0, 1.3));
    world.add_solid(Vec3::new(8.0, -8.0, 0.0), Vec3::new(8.6, 8.0, 1.3));
    // Seeds sit within probe reach of each inner face.
    let seeds = vec![
        StartParams::new(Vec3::new(0.0, 7.2, 0.0), Vec3::Y),
        StartParams::new(Vec3::new(0.0, -7.2, 0.0), Vec3::NEG_Y),
        StartParams::new(Vec3::new(-7.2, 0.0, 0.0), Vec3::NEG_X),
        StartParams::new(Vec3::new(7.2, 0.0, 0.0), Vec3::X),
    ];
    Scene {
        name: "courtyard",
        world,
        seeds,
        query_center: Vec3::ZERO,
        eye: Vec3::new(0.0, 40.0, 1.7),
    }
}

fn debris_field() -> Scene {
    let mut world = BoxWorld::new(0.0);
    let mut seeds = Vec::new();
    // A grid of breakable blocks, each its own small surface.
    for gy in 0..5 {
        for gx in 0..5 {
            let x = gx as f32 * 6.0;
            let y = gy as f32 * 6.0;
            world.add_dynamic(
                Vec3::new(x, y, 0.0),
                Vec3::new(x + 2.5, y + 1.0, 0.9),
            );
            seeds.push(StartParams::new(Vec3::new(x + 1.25, y - 0.8, 0.0), Vec3::Y));
        }
    }
    Scene {
        name: "debris-field",
        world,
        seeds,
        query_center: Vec3::new(12.0, 12.0, 0.0),
        eye: Vec3::new(12.0, 60.0, 1.7),
    }
}
