use std::path::Path;

use glam::Vec3;

use crate::config::{read_text, LoadError, TokenReader};

/// Global sun-like light. The direction is used as authored, without normalization.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DirectionalLight {
    pub direction: Vec3,
    pub ambient: Vec3,
    pub diffuse: Vec3,
    pub specular: Vec3,
}

impl DirectionalLight {
    /// Parses `direction , ambient , diffuse , specular ,` groups.
    pub fn from_str(path: &Path, contents: &str) -> Result<Self, LoadError> {
        let mut reader = TokenReader::new(path, contents);
        let direction = read_group(&mut reader, "direction")?;
        let ambient = read_group(&mut reader, "ambient colour")?;
        let diffuse = read_group(&mut reader, "diffuse colour")?;
        let specular = read_group(&mut reader, "specular colour")?;
        Ok(Self {
            direction,
            ambient,
            diffuse,
            specular,
        })
    }

    pub fn load(path: &Path) -> Result<Self, LoadError> {
        Self::from_str(path, &read_text(path)?)
    }
}

/// Attenuated point light; every firefly in the swarm is one of these.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PointLight {
    pub position: Vec3,
    pub ambient: Vec3,
    pub diffuse: Vec3,
    pub specular: Vec3,
    pub constant: f32,
    pub linear: f32,
    pub quadratic: f32,
}

impl PointLight {
    /// Parses four vector groups followed by `constant , linear , quadratic ,`.
    pub fn from_str(path: &Path, contents: &str) -> Result<Self, LoadError> {
        let mut reader = TokenReader::new(path, contents);
        let position = read_group(&mut reader, "position")?;
        let ambient = read_group(&mut reader, "ambient colour")?;
        let diffuse = read_group(&mut reader, "diffuse colour")?;
        let specular = read_group(&mut reader, "specular colour")?;
        let constant = read_scalar(&mut reader, "constant attenuation")?;
        let linear = read_scalar(&mut reader, "linear attenuation")?;
        let quadratic = read_scalar(&mut reader, "quadratic attenuation")?;
        Ok(Self {
            position,
            ambient,
            diffuse,
            specular,
            constant,
            linear,
            quadratic,
        })
    }

    pub fn load(path: &Path) -> Result<Self, LoadError> {
        Self::from_str(path, &read_text(path)?)
    }

    /// Colour of the self-illuminated marker drawn at the light's position.
    pub fn marker_color(&self) -> Vec3 {
        self.ambient + self.diffuse + self.specular
    }

    /// Copy sharing colours and attenuation, placed elsewhere.
    pub fn with_position(&self, position: Vec3) -> Self {
        Self { position, ..*self }
    }
}

fn read_group(reader: &mut TokenReader<'_>, what: &'static str) -> Result<Vec3, LoadError> {
    let value = reader.vec3(what)?;
    reader.skip(what)?;
    Ok(value)
}

fn read_scalar(reader: &mut TokenReader<'_>, what: &'static str) -> Result<f32, LoadError> {
    let value = reader.f32(what)?;
    reader.skip(what)?;
    Ok(value)
}

/// Loads a light, logging and zeroing it when the file is missing or malformed.
pub fn load_or_default<T, F>(path: &Path, load: F) -> T
where
    T: Default,
    F: FnOnce(&Path) -> Result<T, LoadError>,
{
    load(path).unwrap_or_else(|err| {
        log::warn!("{err}; using an all-zero light");
        T::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const POINT: &str = "0 1 2 ,\n0.1 0.1 0.05 ambient\n0.8 0.7 0.2 ,\n1 1 1 ,\n1.0 , 0.09 , 0.032 ,\n";

    #[test]
    fn parses_point_light_groups() {
        let light = PointLight::from_str(Path::new("point"), POINT).unwrap();
        assert_eq!(light.position, Vec3::new(0.0, 1.0, 2.0));
        assert_eq!(light.ambient, Vec3::new(0.1, 0.1, 0.05));
        assert_eq!(light.diffuse, Vec3::new(0.8, 0.7, 0.2));
        assert_eq!(light.specular, Vec3::ONE);
        assert_eq!(light.constant, 1.0);
        assert_eq!(light.linear, 0.09);
        assert_eq!(light.quadratic, 0.032);
    }

    #[test]
    fn parses_directional_light_groups() {
        let text = "-0.2 -1 -0.3 , 0.05 0.05 0.05 , 0.4 0.4 0.4 , 0.5 0.5 0.5 ,";
        let light = DirectionalLight::from_str(Path::new("dir"), text).unwrap();
        assert_eq!(light.direction, Vec3::new(-0.2, -1.0, -0.3));
        assert_eq!(light.specular, Vec3::splat(0.5));
    }

    #[test]
    fn truncated_file_is_an_error() {
        let text = "0 1 2 , 0.1 0.1";
        assert!(PointLight::from_str(Path::new("point"), text).is_err());
    }

    #[test]
    fn malformed_file_falls_back_to_zeroed_light() {
        let light = load_or_default(Path::new("point"), |path| {
            PointLight::from_str(path, "0 1 x ,")
        });
        assert_eq!(light, PointLight::default());
        assert_eq!(light.constant, 0.0);
    }

    #[test]
    fn marker_color_sums_the_three_terms() {
        let light = PointLight::from_str(Path::new("point"), POINT).unwrap();
        let color = light.marker_color();
        assert!((color - Vec3::new(1.9, 1.8, 1.25)).abs().max_element() < 1e-6);
    }
}
