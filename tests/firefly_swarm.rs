use firefly_forest::firefly::{FireflySwarm, REROLL_PERIOD_SECS, SWARM_SIZE, VERTICAL_BAND};
use firefly_forest::input::{self, Key, KeyboardState, INPUT_TIME_SCALE};
use firefly_forest::{PointLight, ProgramState};
use glam::Vec3;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn seeded_swarm(seed: u64) -> (Vec<PointLight>, FireflySwarm, ChaCha8Rng) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut lights = vec![PointLight {
        position: Vec3::new(0.0, 4.5, 0.0),
        diffuse: Vec3::ONE,
        constant: 1.0,
        ..PointLight::default()
    }];
    FireflySwarm::populate(&mut lights, SWARM_SIZE, &mut rng);
    let swarm = FireflySwarm::new(lights.len());
    (lights, swarm, rng)
}

#[test]
fn long_walk_stays_inside_the_vertical_band() {
    let (mut lights, mut swarm, mut rng) = seeded_swarm(11);
    for _ in 0..10_000 {
        swarm.update(&mut lights, 1.0 / 60.0, &mut rng);
        for light in &lights {
            assert!(VERTICAL_BAND.contains(&light.position.y));
        }
    }
}

#[test]
fn no_light_rests_on_the_band_edge_moving_outward() {
    let mut rng = ChaCha8Rng::seed_from_u64(5);
    let mut lights: Vec<PointLight> = (0..32)
        .map(|i| PointLight::default().with_position(Vec3::new(i as f32 * 0.1, 4.5, 0.0)))
        .collect();
    let mut swarm = FireflySwarm::new(lights.len());
    let (bottom, top) = (*VERTICAL_BAND.start(), *VERTICAL_BAND.end());
    for frame in 0..180 {
        swarm.update(&mut lights, 1.0 / 60.0, &mut rng);
        for (light, velocity) in lights.iter().zip(swarm.velocities()) {
            let y = light.position.y;
            assert!(
                !(y >= top && velocity.y > 0.0) && !(y <= bottom && velocity.y < 0.0),
                "frame {frame}: y={y} velocity.y={}",
                velocity.y
            );
        }
    }
}

#[test]
fn rerolls_share_one_timer() {
    let (mut lights, mut swarm, mut rng) = seeded_swarm(12);
    let frame = 0.25;
    let periods = 3;
    // Stops one frame short of the fourth period boundary.
    let frames = (REROLL_PERIOD_SECS as f32 * periods as f32 / frame) as usize - 1;
    for _ in 0..frames {
        swarm.update(&mut lights, frame, &mut rng);
    }
    assert_eq!(swarm.rerolls(), periods);
}

#[test]
fn lights_draw_independent_velocities() {
    let (mut lights, mut swarm, mut rng) = seeded_swarm(13);
    let before: Vec<Vec3> = lights.iter().map(|light| light.position).collect();
    for _ in 0..30 {
        swarm.update(&mut lights, 1.0 / 60.0, &mut rng);
    }
    let deltas: Vec<Vec3> = lights
        .iter()
        .zip(&before)
        .map(|(light, start)| light.position - *start)
        .collect();
    assert!(deltas.iter().any(|delta| *delta != deltas[0]));
}

#[test]
fn held_forward_key_moves_twice_as_fast() {
    let mut keys = KeyboardState::new();
    keys.set_key_down(Key::W);

    let distance_after = |seconds: f32| {
        let mut state = ProgramState::default();
        let start = state.camera.position;
        let front = state.camera.front();
        let frames = (seconds * 60.0).round() as usize;
        for _ in 0..frames {
            input::process_input(&mut state, &keys, 1.0 / 60.0);
        }
        let moved = state.camera.position - start;
        assert!(moved.normalize().dot(front) > 0.999);
        moved.length()
    };

    let one = distance_after(1.0);
    let two = distance_after(2.0);
    assert!(two > one);
    let speed = ProgramState::default().camera.movement_speed;
    assert!((one - speed * INPUT_TIME_SCALE).abs() < 1e-3);
}
