//! Per-frame terrain pass: bind program and textures, push every uniform,
//! issue one indexed draw call.

use crate::core::gfx::TEXTURE_UNITS;
use crate::core::gfx::TerrainBands;
use crate::core::gfx::resources::{GpuMesh, TerrainTextures};
use crate::core::gfx::shader::TerrainProgram;
use glam::{Mat3, Mat4, Vec3};
use glow::HasContext;

/// Transform and lighting inputs assembled by the app shell each frame.
pub struct FrameUniforms {
    pub mvp: Mat4,
    pub model: Mat4,
    pub view: Mat4,
    /// Upper-left 3x3 of model-view, for normal correction.
    pub normal_matrix: Mat3,
    pub light_pos_world: Vec3,
}

/// Renders the terrain. The program, buffers and textures must all be in a
/// valid state; binds happen before the draw that uses them. Uniforms are
/// pushed fresh every frame with no dirty tracking, and the wireframe flag
/// is whatever the live input query said this frame.
pub fn draw_terrain(
    gl: &glow::Context,
    program: &TerrainProgram,
    mesh: &GpuMesh,
    textures: &TerrainTextures,
    frame: &FrameUniforms,
    bands: TerrainBands,
    height_scale: f32,
    wireframe: bool,
) {
    let uniforms = &program.uniforms;
    let heightmap = textures.heightmap_info;

    unsafe {
        gl.use_program(Some(program.program));
        gl.bind_vertex_array(Some(mesh.vao()));

        for binding in &TEXTURE_UNITS {
            gl.active_texture(glow::TEXTURE0 + binding.unit);
            gl.bind_texture(glow::TEXTURE_2D, Some(textures.handle_for(binding.role)));
        }

        gl.uniform_matrix_4_f32_slice(Some(&uniforms.mvp), false, &frame.mvp.to_cols_array());
        gl.uniform_matrix_4_f32_slice(Some(&uniforms.model), false, &frame.model.to_cols_array());
        gl.uniform_matrix_4_f32_slice(Some(&uniforms.view), false, &frame.view.to_cols_array());
        gl.uniform_matrix_3_f32_slice(
            Some(&uniforms.normal_matrix),
            false,
            &frame.normal_matrix.to_cols_array(),
        );
        gl.uniform_3_f32(
            Some(&uniforms.light_pos_world),
            frame.light_pos_world.x,
            frame.light_pos_world.y,
            frame.light_pos_world.z,
        );
        gl.uniform_2_i32(
            Some(&uniforms.heightmap_size),
            heightmap.size[0],
            heightmap.size[1],
        );
        gl.uniform_2_f32(
            Some(&uniforms.heightmap_uv_step),
            heightmap.uv_step[0],
            heightmap.uv_step[1],
        );
        gl.uniform_1_f32(Some(&uniforms.height_scale), height_scale);
        gl.uniform_1_f32(Some(&uniforms.band_lower), bands.lower);
        gl.uniform_1_f32(Some(&uniforms.band_upper), bands.upper);
        gl.uniform_1_f32(Some(&uniforms.band_transition), bands.transition);

        gl.polygon_mode(
            glow::FRONT_AND_BACK,
            if wireframe { glow::LINE } else { glow::FILL },
        );

        gl.draw_elements(mesh.topology.gl_mode(), mesh.index_count, glow::UNSIGNED_INT, 0);

        gl.bind_vertex_array(None);
        gl.use_program(None);
    }
}
