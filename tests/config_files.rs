use std::fs;
use std::path::Path;

use firefly_forest::config::{load_skybox_vertices, SKYBOX_VERTEX_FLOATS};
use firefly_forest::lights::{DirectionalLight, PointLight};
use firefly_forest::mesh::MeshData;
use firefly_forest::render::scene::{load_material_library, MaterialMaps, FALLBACK_FOREST_COLOR};
use firefly_forest::render::texture::{image_or_solid, solid_image};
use firefly_forest::{ProgramState, ResourcePaths};
use glam::Vec3;
use tempfile::tempdir;

fn write(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create resource dir");
    }
    fs::write(path, contents).expect("write resource");
}

#[test]
fn program_state_file_is_applied_verbatim() {
    let dir = tempdir().expect("temp dir");
    let paths = ResourcePaths::new(dir.path());
    write(
        dir.path(),
        "program_state.txt",
        "0.1 0.2 0.3\n1\n1.5 -2.25 3.125\n0 0 -1\n",
    );

    let state = ProgramState::load(&paths);
    assert_eq!(state.clear_color, Vec3::new(0.1, 0.2, 0.3));
    assert!(state.overlay_enabled);
    assert_eq!(state.camera.position, Vec3::new(1.5, -2.25, 3.125));
    assert_eq!(state.camera.front(), Vec3::NEG_Z);
}

#[test]
fn camera_front_is_kept_as_written() {
    for (text, front) in [
        ("0.6 0 -0.8", Vec3::new(0.6, 0.0, -0.8)),
        ("0 0 -2", Vec3::new(0.0, 0.0, -2.0)),
        ("0.3 -0.2 -0.9", Vec3::new(0.3, -0.2, -0.9)),
    ] {
        let dir = tempdir().expect("temp dir");
        write(
            dir.path(),
            "program_state.txt",
            &format!("0 0 0\n0\n0 0 3\n{text}\n"),
        );
        let state = ProgramState::load(&ResourcePaths::new(dir.path()));
        assert_eq!(state.camera.front(), front, "front {text}");
    }
}

#[test]
fn loading_never_writes_the_state_file() {
    let dir = tempdir().expect("temp dir");
    let paths = ResourcePaths::new(dir.path());
    let _ = ProgramState::load(&paths);
    assert!(!paths.program_state().exists());

    write(dir.path(), "program_state.txt", "not a state file");
    let state = ProgramState::load(&paths);
    assert_eq!(state.clear_color, ProgramState::default().clear_color);
    assert_eq!(
        fs::read_to_string(paths.program_state()).expect("state file"),
        "not a state file"
    );
}

#[test]
fn missing_files_fall_back_to_defaults() {
    let dir = tempdir().expect("temp dir");
    let state = ProgramState::load(&ResourcePaths::new(dir.path()));
    let defaults = ProgramState::default();
    assert_eq!(state.clear_color, defaults.clear_color);
    assert_eq!(state.camera.position, defaults.camera.position);
    assert_eq!(state.dir_light, DirectionalLight::default());
    assert_eq!(state.point_lights, vec![PointLight::default()]);
}

#[test]
fn lights_are_read_from_their_files() {
    let dir = tempdir().expect("temp dir");
    write(
        dir.path(),
        "lightSources/pointLight.txt",
        "0 2 -1 , 0.05 0.05 0.05 , 0.8 0.7 0.2 , 1 1 1 , 1.0 , 0.09 , 0.032 ,",
    );
    write(
        dir.path(),
        "lightSources/dirLight.txt",
        "-0.2 -1 -0.3 , 0.05 0.05 0.1 , 0.2 0.2 0.3 , 0.5 0.5 0.5 ,",
    );

    let state = ProgramState::load(&ResourcePaths::new(dir.path()));
    let template = state.point_lights[0];
    assert_eq!(template.position, Vec3::new(0.0, 2.0, -1.0));
    assert_eq!(template.diffuse, Vec3::new(0.8, 0.7, 0.2));
    assert_eq!(
        (template.constant, template.linear, template.quadratic),
        (1.0, 0.09, 0.032)
    );
    assert_eq!(state.dir_light.direction, Vec3::new(-0.2, -1.0, -0.3));
    assert_eq!(state.dir_light.specular, Vec3::splat(0.5));
}

#[test]
fn malformed_light_is_zeroed() {
    let dir = tempdir().expect("temp dir");
    write(
        dir.path(),
        "lightSources/pointLight.txt",
        "0 2 -1 , 0.05 oops 0.05 ,",
    );
    let state = ProgramState::load(&ResourcePaths::new(dir.path()));
    assert_eq!(state.point_lights, vec![PointLight::default()]);
}

#[test]
fn short_vertex_file_is_zero_filled() {
    let dir = tempdir().expect("temp dir");
    write(dir.path(), "vertices/skybox_vertices.txt", "-1 1 -1\n-1 -1 -1\nend 5 5");
    let paths = ResourcePaths::new(dir.path());

    let vertices = load_skybox_vertices(&paths.skybox_vertices()).expect("vertex file");
    assert_eq!(vertices.len(), SKYBOX_VERTEX_FLOATS);
    assert_eq!(&vertices[..6], &[-1.0, 1.0, -1.0, -1.0, -1.0, -1.0]);
    assert!(vertices[6..].iter().all(|value| *value == 0.0));

    assert!(load_skybox_vertices(&paths.cat_trumpet_vertices()).is_err());
}

#[test]
fn forest_materials_are_read_next_to_the_model() {
    let dir = tempdir().expect("temp dir");
    write(
        dir.path(),
        "objects/forest/forest.obj",
        "mtllib forest.mtl\nv 0 0 0\nv 1 0 0\nv 0 1 0\nvt 0 0\nvt 1 0\nvt 0 1\n\
         usemtl Bark\nf 1/1 2/2 3/3\nusemtl Moss\nf 3/3 2/2 1/1\n",
    );
    write(
        dir.path(),
        "objects/forest/forest.mtl",
        "newmtl Bark\nmap_Kd bark.png\nnewmtl Moss\nKd 0 1 0\n",
    );
    let paths = ResourcePaths::new(dir.path());
    let model = paths.forest_model();

    let mesh = MeshData::load_obj(&model).expect("forest model");
    assert_eq!(mesh.groups.len(), 2);
    assert_eq!(mesh.vertices[1].tex_coords, [1.0, 0.0]);

    let library = load_material_library(&mesh, &model);
    let bark = MaterialMaps::for_group(&mesh.groups[0], &library);
    assert_eq!(
        bark.diffuse,
        Some(dir.path().join("objects/forest/bark.png"))
    );
    // bark.png was never written, so the flat colour stands in.
    let image = image_or_solid(bark.diffuse.as_deref(), bark.diffuse_fallback, "Bark");
    assert_eq!(image, solid_image(FALLBACK_FOREST_COLOR));

    let moss = MaterialMaps::for_group(&mesh.groups[1], &library);
    assert_eq!(moss.diffuse_fallback, Vec3::Y);
}

#[test]
fn model_without_a_material_library_uses_the_flat_colour() {
    let dir = tempdir().expect("temp dir");
    write(
        dir.path(),
        "objects/forest/forest.obj",
        "mtllib missing.mtl\nv 0 0 0\nv 1 0 0\nv 0 1 0\nusemtl Bark\nf 1 2 3\n",
    );
    let model = ResourcePaths::new(dir.path()).forest_model();
    let mesh = MeshData::load_obj(&model).expect("forest model");
    let library = load_material_library(&mesh, &model);
    assert!(library.is_empty());
    let maps = MaterialMaps::for_group(&mesh.groups[0], &library);
    assert_eq!(maps.diffuse, None);
    assert_eq!(maps.diffuse_fallback, FALLBACK_FOREST_COLOR);
}
