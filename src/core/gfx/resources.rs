//! GPU resource lifecycle: vertex/index buffers and texture objects.
//! Creation and destruction are symmetric; every handle allocated here is
//! released exactly once by the matching `destroy`.

use crate::assets::{self, Bitmap};
use crate::config::Config;
use crate::core::gfx::mesh::{MeshData, Topology};
use crate::core::gfx::{SamplerDesc, SamplerFilter, SamplerWrap, TextureRole};
use glow::{HasContext, PixelUnpackData};
use log::info;
use std::path::Path;

/// The uploaded mesh: one VAO, one static buffer per attribute stream
/// (locations 0/1/2 for position/uv/normal) and one element buffer.
pub struct GpuMesh {
    vao: glow::VertexArray,
    position_buffer: glow::Buffer,
    uv_buffer: glow::Buffer,
    normal_buffer: glow::Buffer,
    index_buffer: glow::Buffer,
    pub index_count: i32,
    pub topology: Topology,
}

impl GpuMesh {
    pub fn upload(gl: &glow::Context, data: &MeshData, topology: Topology) -> Result<Self, String> {
        unsafe {
            let vao = gl.create_vertex_array()?;
            gl.bind_vertex_array(Some(vao));

            let position_buffer = gl.create_buffer()?;
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(position_buffer));
            gl.buffer_data_u8_slice(
                glow::ARRAY_BUFFER,
                bytemuck::cast_slice(&data.positions),
                glow::STATIC_DRAW,
            );
            gl.enable_vertex_attrib_array(0);
            gl.vertex_attrib_pointer_f32(0, 3, glow::FLOAT, false, 0, 0);

            let uv_buffer = gl.create_buffer()?;
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(uv_buffer));
            gl.buffer_data_u8_slice(
                glow::ARRAY_BUFFER,
                bytemuck::cast_slice(&data.uvs),
                glow::STATIC_DRAW,
            );
            gl.enable_vertex_attrib_array(1);
            gl.vertex_attrib_pointer_f32(1, 2, glow::FLOAT, false, 0, 0);

            let normal_buffer = gl.create_buffer()?;
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(normal_buffer));
            gl.buffer_data_u8_slice(
                glow::ARRAY_BUFFER,
                bytemuck::cast_slice(&data.normals),
                glow::STATIC_DRAW,
            );
            gl.enable_vertex_attrib_array(2);
            gl.vertex_attrib_pointer_f32(2, 3, glow::FLOAT, false, 0, 0);

            let index_buffer = gl.create_buffer()?;
            gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, Some(index_buffer));
            gl.buffer_data_u8_slice(
                glow::ELEMENT_ARRAY_BUFFER,
                bytemuck::cast_slice(&data.indices),
                glow::STATIC_DRAW,
            );

            gl.bind_vertex_array(None);

            Ok(Self {
                vao,
                position_buffer,
                uv_buffer,
                normal_buffer,
                index_buffer,
                index_count: data.index_count() as i32,
                topology,
            })
        }
    }

    pub fn vao(&self) -> glow::VertexArray {
        self.vao
    }

    pub fn destroy(&self, gl: &glow::Context) {
        unsafe {
            gl.delete_buffer(self.index_buffer);
            gl.delete_buffer(self.normal_buffer);
            gl.delete_buffer(self.uv_buffer);
            gl.delete_buffer(self.position_buffer);
            gl.delete_vertex_array(self.vao);
        }
    }
}

/// A GPU texture handle plus its source dimensions.
#[derive(Clone, Copy, Debug)]
pub struct TextureResource {
    pub handle: glow::Texture,
    pub width: u32,
    pub height: u32,
}

/// Uploads a decoded RGB bitmap. Mipmaps are generated unless the filter is
/// nearest-neighbor.
pub fn create_texture(
    gl: &glow::Context,
    bitmap: &Bitmap,
    sampler: SamplerDesc,
) -> Result<TextureResource, String> {
    let wrap_mode = match sampler.wrap {
        SamplerWrap::Clamp => glow::CLAMP_TO_EDGE,
        SamplerWrap::Repeat => glow::REPEAT,
        SamplerWrap::Mirror => glow::MIRRORED_REPEAT,
    };
    let (min_filter, mag_filter, mipmaps) = match sampler.filter {
        SamplerFilter::Linear => (glow::LINEAR_MIPMAP_LINEAR, glow::LINEAR, true),
        SamplerFilter::Nearest => (glow::NEAREST, glow::NEAREST, false),
    };

    unsafe {
        let handle = gl.create_texture()?;
        gl.bind_texture(glow::TEXTURE_2D, Some(handle));

        // Rows are tightly packed 3-byte pixels.
        gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, 1);

        gl.tex_image_2d(
            glow::TEXTURE_2D,
            0,
            glow::RGB8 as i32,
            bitmap.width as i32,
            bitmap.height as i32,
            0,
            glow::RGB,
            glow::UNSIGNED_BYTE,
            PixelUnpackData::Slice(Some(&bitmap.pixels)),
        );

        gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_S, wrap_mode as i32);
        gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_T, wrap_mode as i32);
        gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MIN_FILTER, min_filter as i32);
        gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MAG_FILTER, mag_filter as i32);

        if mipmaps {
            gl.generate_mipmap(glow::TEXTURE_2D);
        }

        gl.bind_texture(glow::TEXTURE_2D, None);

        Ok(TextureResource {
            handle,
            width: bitmap.width,
            height: bitmap.height,
        })
    }
}

/// Heightmap dimensions and the reciprocal per-texel UV step, derived once
/// at load and read every frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HeightmapInfo {
    pub size: [i32; 2],
    pub uv_step: [f32; 2],
}

impl HeightmapInfo {
    pub fn for_texture(width: u32, height: u32) -> Self {
        Self {
            size: [width as i32, height as i32],
            uv_step: [1.0 / width as f32, 1.0 / height as f32],
        }
    }
}

/// The full texture roster: one heightmap, three diffuse surfaces and their
/// three specular maps.
pub struct TerrainTextures {
    pub heightmap: TextureResource,
    pub heightmap_info: HeightmapInfo,
    pub diffuse: [TextureResource; 3],
    pub specular: [TextureResource; 3],
}

impl TerrainTextures {
    /// Loads all seven textures. Any texture that fails to decode or upload
    /// aborts setup; a terrain with a missing surface has no usable
    /// degraded mode.
    pub fn load(gl: &glow::Context, config: &Config) -> Result<Self, String> {
        let surface = SamplerDesc {
            filter: SamplerFilter::Linear,
            wrap: SamplerWrap::Mirror,
        };
        // Nearest keeps altitude texels exact; interpolated heights smear
        // the band boundaries.
        let heightmap_sampler = SamplerDesc {
            filter: SamplerFilter::Nearest,
            wrap: SamplerWrap::Mirror,
        };

        let load = |path: &Path, sampler: SamplerDesc| -> Result<TextureResource, String> {
            let bitmap = assets::load_bmp(path)?;
            create_texture(gl, &bitmap, sampler)
        };

        let diffuse = [
            load(&config.diffuse_path(&config.texture_a), surface)?,
            load(&config.diffuse_path(&config.texture_b), surface)?,
            load(&config.diffuse_path(&config.texture_c), surface)?,
        ];
        let specular = [
            load(&config.specular_path(&config.texture_a), surface)?,
            load(&config.specular_path(&config.texture_b), surface)?,
            load(&config.specular_path(&config.texture_c), surface)?,
        ];

        let heightmap = load(&config.heightmap_path, heightmap_sampler)?;
        let heightmap_info = HeightmapInfo::for_texture(heightmap.width, heightmap.height);
        info!(
            "Heightmap {}x{} loaded (uv step {:.6} x {:.6})",
            heightmap.width, heightmap.height, heightmap_info.uv_step[0], heightmap_info.uv_step[1]
        );

        Ok(Self {
            heightmap,
            heightmap_info,
            diffuse,
            specular,
        })
    }

    /// Resolves the texture for a semantic role from the shared binding
    /// table.
    pub fn handle_for(&self, role: TextureRole) -> glow::Texture {
        match role {
            TextureRole::Heightmap => self.heightmap.handle,
            TextureRole::DiffuseA => self.diffuse[0].handle,
            TextureRole::DiffuseB => self.diffuse[1].handle,
            TextureRole::DiffuseC => self.diffuse[2].handle,
            TextureRole::SpecularA => self.specular[0].handle,
            TextureRole::SpecularB => self.specular[1].handle,
            TextureRole::SpecularC => self.specular[2].handle,
        }
    }

    pub fn destroy(&self, gl: &glow::Context) {
        unsafe {
            gl.delete_texture(self.heightmap.handle);
            for texture in self.diffuse.iter().chain(self.specular.iter()) {
                gl.delete_texture(texture.handle);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::HeightmapInfo;

    #[test]
    fn uv_step_is_the_texel_reciprocal() {
        let info = HeightmapInfo::for_texture(512, 256);
        assert_eq!(info.size, [512, 256]);
        assert!((info.uv_step[0] - 1.0 / 512.0).abs() < 1e-9);
        assert!((info.uv_step[1] - 1.0 / 256.0).abs() < 1e-9);
    }

    #[test]
    fn one_texel_heightmap_yields_a_finite_step() {
        let info = HeightmapInfo::for_texture(1, 1);
        assert_eq!(info.uv_step, [1.0, 1.0]);
        assert!(info.uv_step.iter().all(|s| s.is_finite()));
    }
}
