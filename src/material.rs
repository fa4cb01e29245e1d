//! Wavefront `.mtl` material libraries referenced by the forest model.

use std::path::{Path, PathBuf};

use glam::Vec3;

use crate::config::{read_text, LoadError};

/// One `newmtl` entry. Map paths are already resolved against the library's
/// directory.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Material {
    pub name: String,
    pub diffuse_color: Option<Vec3>,
    pub diffuse_map: Option<PathBuf>,
    pub specular_map: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MaterialLibrary {
    materials: Vec<Material>,
}

impl MaterialLibrary {
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let contents = read_text(path)?;
        let dir = path.parent().unwrap_or(Path::new(""));
        parse_mtl(&contents, dir).map_err(|reason| LoadError::Mesh {
            path: path.to_path_buf(),
            reason,
        })
    }

    pub fn get(&self, name: &str) -> Option<&Material> {
        self.materials.iter().find(|material| material.name == name)
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }
}

/// Reads `newmtl`, `Kd`, `map_Kd` and `map_Ks`; everything else is skipped.
pub fn parse_mtl(data: &str, dir: &Path) -> Result<MaterialLibrary, String> {
    let mut materials: Vec<Material> = Vec::new();

    for (line_no, line) in data.lines().enumerate() {
        let mut parts = line.split_whitespace();
        let Some(tag) = parts.next() else {
            continue;
        };
        if tag == "newmtl" {
            materials.push(Material {
                name: line.trim_start()[tag.len()..].trim().to_string(),
                ..Material::default()
            });
            continue;
        }
        let Some(current) = materials.last_mut() else {
            continue;
        };
        match tag {
            "Kd" => {
                let color = parse_color(parts).map_err(|e| format!("line {}: {e}", line_no + 1))?;
                current.diffuse_color = Some(color);
            }
            "map_Kd" => current.diffuse_map = map_path(parts, dir),
            "map_Ks" => current.specular_map = map_path(parts, dir),
            _ => {}
        }
    }
    Ok(MaterialLibrary { materials })
}

fn parse_color<'a>(mut parts: impl Iterator<Item = &'a str>) -> Result<Vec3, String> {
    let mut component = || -> Result<f32, String> {
        let token = parts.next().ok_or("missing colour component")?;
        token
            .parse::<f32>()
            .map_err(|_| format!("`{token}` is not a number"))
    };
    Ok(Vec3::new(component()?, component()?, component()?))
}

/// The file name is the last token; options such as `-s 1 1 1` come first.
fn map_path<'a>(parts: impl Iterator<Item = &'a str>, dir: &Path) -> Option<PathBuf> {
    parts.last().map(|file| dir.join(file.replace('\\', "/")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const FOREST_MTL: &str = "\
# two materials
newmtl Bark
Ns 96.0
Kd 0.4 0.3 0.2
map_Kd textures\\bark_diffuse.png
map_Ks -s 1 1 1 bark_specular.png

newmtl Leaves
map_Kd leaves.jpg
";

    #[test]
    fn reads_colours_and_maps_relative_to_the_library() {
        let library = parse_mtl(FOREST_MTL, Path::new("objects/forest")).unwrap();
        assert_eq!(library.len(), 2);

        let bark = library.get("Bark").unwrap();
        assert_eq!(bark.diffuse_color, Some(Vec3::new(0.4, 0.3, 0.2)));
        assert_eq!(
            bark.diffuse_map,
            Some(PathBuf::from("objects/forest/textures/bark_diffuse.png"))
        );
        assert_eq!(
            bark.specular_map,
            Some(PathBuf::from("objects/forest/bark_specular.png"))
        );

        let leaves = library.get("Leaves").unwrap();
        assert_eq!(leaves.diffuse_color, None);
        assert_eq!(leaves.specular_map, None);
        assert!(library.get("Stone").is_none());
    }

    #[test]
    fn bad_colour_names_the_line() {
        let err = parse_mtl("newmtl A\nKd 1 oops 1\n", Path::new("")).unwrap_err();
        assert!(err.starts_with("line 2"), "{err}");
    }

    #[test]
    fn statements_before_the_first_material_are_ignored() {
        let library = parse_mtl("Kd 1 1 1\nmap_Kd stray.png\n", Path::new("")).unwrap();
        assert!(library.is_empty());
    }
}
