use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use glam::Vec3;
use thiserror::Error;

/// Environment variable that relocates the resource directory.
pub const RESOURCE_ROOT_ENV: &str = "FIREFLY_FOREST_RESOURCES";

/// Fixed window resolution; the offscreen targets are allocated at this size.
pub const WINDOW_WIDTH: u32 = 1200;
pub const WINDOW_HEIGHT: u32 = 750;
pub const WINDOW_TITLE: &str = "Firefly Forest";

/// Number of floats in a skybox-shaped vertex file (36 vertices, xyz).
pub const SKYBOX_VERTEX_FLOATS: usize = 108;

/// Failure to read one of the plain-text resource files.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("unable to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{} ended before {what} was read", path.display())]
    MissingValue { path: PathBuf, what: &'static str },
    #[error("{} contains `{token}` where a number was expected", path.display())]
    InvalidNumber { path: PathBuf, token: String },
    #[error("unable to decode image {}: {source}", path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("invalid mesh {}: {reason}", path.display())]
    Mesh { path: PathBuf, reason: String },
}

/// Locations of every file the scene reads at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourcePaths {
    root: PathBuf,
}

impl ResourcePaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolves the root from `FIREFLY_FOREST_RESOURCES`, falling back to `resources/`.
    pub fn from_env() -> Self {
        match env::var_os(RESOURCE_ROOT_ENV) {
            Some(root) if !root.is_empty() => Self::new(root),
            _ => Self::new("resources"),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn program_state(&self) -> PathBuf {
        self.root.join("program_state.txt")
    }

    pub fn point_light(&self) -> PathBuf {
        self.root.join("lightSources/pointLight.txt")
    }

    pub fn dir_light(&self) -> PathBuf {
        self.root.join("lightSources/dirLight.txt")
    }

    pub fn skybox_vertices(&self) -> PathBuf {
        self.root.join("vertices/skybox_vertices.txt")
    }

    pub fn cat_trumpet_vertices(&self) -> PathBuf {
        self.root.join("vertices/cat_trumpet_vertices.txt")
    }

    pub fn forest_model(&self) -> PathBuf {
        self.root.join("objects/forest/forest.obj")
    }

    /// Environment cubemap faces in +X, -X, +Y, -Y, +Z, -Z order.
    pub fn skybox_faces(&self) -> [PathBuf; 6] {
        ["px", "nx", "py", "ny", "pz", "nz"]
            .map(|face| self.root.join(format!("textures/skybox/skybox_{face}.jpg")))
    }

    /// The secondary cubemap repeats one image on every face.
    pub fn cat_trumpet_faces(&self) -> [PathBuf; 6] {
        std::array::from_fn(|_| self.root.join("textures/cat.png"))
    }
}

impl Default for ResourcePaths {
    fn default() -> Self {
        Self::new("resources")
    }
}

/// Whitespace tokenizer over a text resource, reading values positionally.
pub(crate) struct TokenReader<'a> {
    path: &'a Path,
    tokens: std::str::SplitWhitespace<'a>,
}

impl<'a> TokenReader<'a> {
    pub(crate) fn new(path: &'a Path, contents: &'a str) -> Self {
        Self {
            path,
            tokens: contents.split_whitespace(),
        }
    }

    fn next_token(&mut self, what: &'static str) -> Result<&'a str, LoadError> {
        self.tokens.next().ok_or_else(|| LoadError::MissingValue {
            path: self.path.to_path_buf(),
            what,
        })
    }

    pub(crate) fn f32(&mut self, what: &'static str) -> Result<f32, LoadError> {
        let token = self.next_token(what)?;
        token.parse::<f32>().map_err(|_| LoadError::InvalidNumber {
            path: self.path.to_path_buf(),
            token: token.to_string(),
        })
    }

    pub(crate) fn vec3(&mut self, what: &'static str) -> Result<Vec3, LoadError> {
        Ok(Vec3::new(self.f32(what)?, self.f32(what)?, self.f32(what)?))
    }

    /// Integer flag where any non-zero value is `true`.
    pub(crate) fn flag(&mut self, what: &'static str) -> Result<bool, LoadError> {
        let token = self.next_token(what)?;
        token
            .parse::<i64>()
            .map(|value| value != 0)
            .map_err(|_| LoadError::InvalidNumber {
                path: self.path.to_path_buf(),
                token: token.to_string(),
            })
    }

    /// Consumes a separator token whose content is irrelevant.
    pub(crate) fn skip(&mut self, what: &'static str) -> Result<(), LoadError> {
        self.next_token(what).map(|_| ())
    }
}

pub(crate) fn read_text(path: &Path) -> Result<String, LoadError> {
    fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Reads a positional float stream of skybox-shaped geometry.
///
/// Reading stops at the first token that is not a float; entries that were
/// never read stay zero. Only a missing file is an error.
pub fn load_skybox_vertices(path: &Path) -> Result<[f32; SKYBOX_VERTEX_FLOATS], LoadError> {
    let contents = read_text(path)?;
    let mut vertices = [0.0f32; SKYBOX_VERTEX_FLOATS];
    let values = contents
        .split_whitespace()
        .map_while(|token| token.parse::<f32>().ok());
    let mut read = 0;
    for (slot, value) in vertices.iter_mut().zip(values) {
        *slot = value;
        read += 1;
    }
    if read < SKYBOX_VERTEX_FLOATS {
        log::warn!(
            "{} holds {read} of {SKYBOX_VERTEX_FLOATS} vertex components; the rest stay zero",
            path.display()
        );
    }
    Ok(vertices)
}
