//! GPU data contract and the terrain scene facade.

pub mod context;
pub mod mesh;
pub mod renderer;
pub mod resources;
pub mod shader;

use crate::assets;
use crate::config::{self, Config};
use glow::HasContext;
use log::{error, info};
use self::mesh::{MeshData, Topology};
use std::error::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SamplerFilter {
    Linear,
    Nearest,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SamplerWrap {
    #[allow(dead_code)]
    Clamp,
    #[allow(dead_code)]
    Repeat,
    Mirror,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SamplerDesc {
    pub filter: SamplerFilter,
    pub wrap: SamplerWrap,
}

/// The three altitude-banding scalars, constant for the process lifetime
/// and pushed to the shader every frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TerrainBands {
    pub lower: f32,
    pub upper: f32,
    pub transition: f32,
}

/// Semantic role of each fixed texture unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextureRole {
    Heightmap,
    DiffuseA,
    DiffuseB,
    DiffuseC,
    SpecularA,
    SpecularB,
    SpecularC,
}

pub struct TextureBinding {
    pub unit: u32,
    pub sampler: &'static str,
    pub role: TextureRole,
}

/// Texture-unit contract shared between the frame renderer (which binds
/// handles to units) and the shader manager (which points samplers at
/// units). Unit assignments must match the sampler declarations in the
/// GLSL stages exactly.
pub const TEXTURE_UNITS: [TextureBinding; 7] = [
    TextureBinding { unit: 0, sampler: "u_heightmap", role: TextureRole::Heightmap },
    TextureBinding { unit: 1, sampler: "u_diffuse_a", role: TextureRole::DiffuseA },
    TextureBinding { unit: 2, sampler: "u_diffuse_b", role: TextureRole::DiffuseB },
    TextureBinding { unit: 3, sampler: "u_diffuse_c", role: TextureRole::DiffuseC },
    TextureBinding { unit: 4, sampler: "u_specular_a", role: TextureRole::SpecularA },
    TextureBinding { unit: 5, sampler: "u_specular_b", role: TextureRole::SpecularB },
    TextureBinding { unit: 6, sampler: "u_specular_c", role: TextureRole::SpecularC },
];

/// Everything the terrain pass owns on the GPU: the uploaded mesh, the
/// seven textures and the linked program. There is no process-wide GPU
/// state; every GL handle lives here and is released exactly once in
/// `destroy`.
pub struct TerrainScene {
    pub mesh: resources::GpuMesh,
    pub textures: resources::TerrainTextures,
    pub program: shader::TerrainProgram,
    bands: TerrainBands,
    height_scale: f32,
}

impl TerrainScene {
    /// Builds the whole scene: program, patch state, textures, mesh.
    /// A model that cannot be loaded aborts before any GPU object exists;
    /// later failures roll back what was already created.
    pub fn create(gl: &glow::Context, config: &Config) -> Result<Self, Box<dyn Error>> {
        let (data, topology) = match &config.model_path {
            Some(path) => {
                let data =
                    assets::load_obj(path).map_err(|e| format!("model not loaded: {e}"))?;
                (data, Topology::Triangles)
            }
            None => (
                MeshData::grid(config::GRID_POINTS, config::GRID_SCALE, Topology::Patches),
                Topology::Patches,
            ),
        };
        if data.is_empty() {
            return Err("model not loaded: no vertices or indices".into());
        }

        let sources = match topology {
            Topology::Patches => shader::ProgramSources::tessellated_terrain(),
            Topology::Triangles => shader::ProgramSources::displaced_model(),
        };
        let program = shader::TerrainProgram::build(gl, sources)?;

        if topology == Topology::Patches {
            unsafe {
                gl.patch_parameter_i32(glow::PATCH_VERTICES, 4);
            }
        }

        let textures = match resources::TerrainTextures::load(gl, config) {
            Ok(textures) => textures,
            Err(e) => {
                program.destroy(gl);
                return Err(e.into());
            }
        };

        let mesh = match resources::GpuMesh::upload(gl, &data, topology) {
            Ok(mesh) => mesh,
            Err(e) => {
                textures.destroy(gl);
                program.destroy(gl);
                return Err(e.into());
            }
        };

        info!(
            "Terrain scene ready: {} vertices, {} indices ({topology})",
            data.vertex_count(),
            data.index_count()
        );

        Ok(Self {
            mesh,
            textures,
            program,
            bands: TerrainBands {
                lower: config::BAND_LOWER,
                upper: config::BAND_UPPER,
                transition: config::BAND_TRANSITION,
            },
            height_scale: config::GRID_SCALE,
        })
    }

    pub fn draw(&self, gl: &glow::Context, frame: &renderer::FrameUniforms, wireframe: bool) {
        renderer::draw_terrain(
            gl,
            &self.program,
            &self.mesh,
            &self.textures,
            frame,
            self.bands,
            self.height_scale,
            wireframe,
        );
    }

    /// Rebuilds the shader program from its source files. A failed rebuild
    /// keeps the previous program; no frame ever renders with a missing or
    /// half-linked one.
    pub fn reload_shaders(&mut self, gl: &glow::Context) {
        match self.program.reload(gl) {
            Ok(()) => info!("Shader program reloaded"),
            Err(e) => error!("Shader reload failed; keeping previous program: {e}"),
        }
    }

    /// Teardown sequence: mesh, textures, shader program.
    pub fn destroy(&self, gl: &glow::Context) {
        self.mesh.destroy(gl);
        self.textures.destroy(gl);
        self.program.destroy(gl);
    }
}

#[cfg(test)]
mod tests {
    use super::{TEXTURE_UNITS, TextureRole};
    use std::collections::HashSet;

    #[test]
    fn texture_units_are_fixed_and_contiguous() {
        let units: Vec<u32> = TEXTURE_UNITS.iter().map(|b| b.unit).collect();
        assert_eq!(units, vec![0, 1, 2, 3, 4, 5, 6]);
        assert_eq!(TEXTURE_UNITS[0].role, TextureRole::Heightmap);
        assert_eq!(TEXTURE_UNITS[1].role, TextureRole::DiffuseA);
        assert_eq!(TEXTURE_UNITS[4].role, TextureRole::SpecularA);
    }

    #[test]
    fn sampler_names_are_unique() {
        let names: HashSet<_> = TEXTURE_UNITS.iter().map(|b| b.sampler).collect();
        assert_eq!(names.len(), TEXTURE_UNITS.len());
    }
}
