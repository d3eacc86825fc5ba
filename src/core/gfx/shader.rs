//! Shader program lifecycle: per-stage compilation from source files,
//! linking, uniform resolution against the declared binding tables, and
//! atomic hot-reload.

use crate::core::gfx::TEXTURE_UNITS;
use glow::{HasContext, UniformLocation};
use log::{error, info, warn};
use std::fs;
use std::path::{Path, PathBuf};

pub const TERRAIN_VERTEX_PATH: &str = "shaders/terrain.vert";
pub const TERRAIN_TESS_CONTROL_PATH: &str = "shaders/terrain.tesc";
pub const TERRAIN_TESS_EVAL_PATH: &str = "shaders/terrain.tese";
pub const TERRAIN_FRAGMENT_PATH: &str = "shaders/terrain.frag";
pub const MODEL_VERTEX_PATH: &str = "shaders/model.vert";

/// Source files for one program. Vertex and fragment are mandatory;
/// tessellation control and evaluation are requested only as a pair.
#[derive(Clone, Debug)]
pub struct ProgramSources {
    pub vertex: PathBuf,
    pub fragment: PathBuf,
    pub tessellation: Option<(PathBuf, PathBuf)>,
}

impl ProgramSources {
    /// The 4-stage pipeline for the synthesized grid: quad patches are
    /// subdivided and displaced in the tessellation stages.
    pub fn tessellated_terrain() -> Self {
        Self {
            vertex: PathBuf::from(TERRAIN_VERTEX_PATH),
            fragment: PathBuf::from(TERRAIN_FRAGMENT_PATH),
            tessellation: Some((
                PathBuf::from(TERRAIN_TESS_CONTROL_PATH),
                PathBuf::from(TERRAIN_TESS_EVAL_PATH),
            )),
        }
    }

    /// The 2-stage pipeline for imported triangle meshes: displacement
    /// happens in the vertex stage instead.
    pub fn displaced_model() -> Self {
        Self {
            vertex: PathBuf::from(MODEL_VERTEX_PATH),
            fragment: PathBuf::from(TERRAIN_FRAGMENT_PATH),
            tessellation: None,
        }
    }
}

/// Non-sampler uniforms every terrain program must expose. Resolution is
/// by name at link time; an absent name fails the build instead of leaving
/// a silent -1 location behind.
pub struct TerrainUniforms {
    pub mvp: UniformLocation,
    pub model: UniformLocation,
    pub view: UniformLocation,
    pub normal_matrix: UniformLocation,
    pub light_pos_world: UniformLocation,
    pub heightmap_size: UniformLocation,
    pub heightmap_uv_step: UniformLocation,
    pub height_scale: UniformLocation,
    pub band_lower: UniformLocation,
    pub band_upper: UniformLocation,
    pub band_transition: UniformLocation,
}

pub const UNIFORM_NAMES: [&str; 11] = [
    "u_mvp",
    "u_model",
    "u_view",
    "u_normal_matrix",
    "u_light_pos_world",
    "u_heightmap_size",
    "u_heightmap_uv_step",
    "u_height_scale",
    "u_band_lower",
    "u_band_upper",
    "u_band_transition",
];

fn stage_name(stage: u32) -> &'static str {
    match stage {
        glow::VERTEX_SHADER => "vertex",
        glow::TESS_CONTROL_SHADER => "tessellation control",
        glow::TESS_EVALUATION_SHADER => "tessellation evaluation",
        glow::FRAGMENT_SHADER => "fragment",
        _ => "unknown",
    }
}

/// Reads and compiles one stage. The driver info log is captured and
/// reported either way; failure deletes the stage object.
fn compile_stage(gl: &glow::Context, stage: u32, path: &Path) -> Result<glow::Shader, String> {
    let source = fs::read_to_string(path)
        .map_err(|e| format!("could not open shader {}: {e}", path.display()))?;

    info!("Compiling {} shader: {}", stage_name(stage), path.display());
    unsafe {
        let shader = gl.create_shader(stage)?;
        gl.shader_source(shader, &source);
        gl.compile_shader(shader);

        let log = gl.get_shader_info_log(shader);
        if !gl.get_shader_compile_status(shader) {
            gl.delete_shader(shader);
            error!("Compilation of {} failed:\n{log}", path.display());
            return Err(format!("failed to compile {}", path.display()));
        }
        if !log.is_empty() {
            warn!("{}: {log}", path.display());
        }
        info!("Compilation of {}: success", path.display());
        Ok(shader)
    }
}

/// Attaches the given stages and links. The stage objects are detached and
/// deleted regardless of the link outcome; only the program handle
/// survives.
fn link_program(gl: &glow::Context, stages: &[glow::Shader]) -> Result<glow::Program, String> {
    unsafe {
        let program = gl.create_program()?;
        for &stage in stages {
            gl.attach_shader(program, stage);
        }
        gl.link_program(program);

        let linked = gl.get_program_link_status(program);
        let log = gl.get_program_info_log(program);
        for &stage in stages {
            gl.detach_shader(program, stage);
            gl.delete_shader(stage);
        }

        if !linked {
            gl.delete_program(program);
            error!("Linking program failed:\n{log}");
            return Err("failed to link shader program".into());
        }
        if !log.is_empty() {
            warn!("link log: {log}");
        }
        info!("Linking program: success");
        Ok(program)
    }
}

fn resolve_uniforms(gl: &glow::Context, program: glow::Program) -> Result<TerrainUniforms, String> {
    // Validate the declared table first so a renamed or pruned uniform is
    // diagnosed by name instead of surfacing later as a silent -1 location.
    let missing: Vec<&str> = UNIFORM_NAMES
        .iter()
        .copied()
        .filter(|&name| unsafe { gl.get_uniform_location(program, name) }.is_none())
        .collect();
    if !missing.is_empty() {
        return Err(format!(
            "linked program is missing uniforms: {}",
            missing.join(", ")
        ));
    }

    let get = |name: &'static str| -> Result<UniformLocation, String> {
        unsafe { gl.get_uniform_location(program, name) }
            .ok_or_else(|| format!("linked program is missing uniform '{name}'"))
    };
    Ok(TerrainUniforms {
        mvp: get("u_mvp")?,
        model: get("u_model")?,
        view: get("u_view")?,
        normal_matrix: get("u_normal_matrix")?,
        light_pos_world: get("u_light_pos_world")?,
        heightmap_size: get("u_heightmap_size")?,
        heightmap_uv_step: get("u_heightmap_uv_step")?,
        height_scale: get("u_height_scale")?,
        band_lower: get("u_band_lower")?,
        band_upper: get("u_band_upper")?,
        band_transition: get("u_band_transition")?,
    })
}

/// Points every declared sampler at its fixed texture unit. Done once per
/// link; the frame renderer binds handles to the same units from the same
/// table.
fn assign_sampler_units(gl: &glow::Context, program: glow::Program) -> Result<(), String> {
    unsafe {
        gl.use_program(Some(program));
        for binding in &TEXTURE_UNITS {
            let location = gl
                .get_uniform_location(program, binding.sampler)
                .ok_or_else(|| format!("linked program is missing sampler '{}'", binding.sampler))?;
            gl.uniform_1_i32(Some(&location), binding.unit as i32);
        }
        gl.use_program(None);
    }
    Ok(())
}

fn build_program(
    gl: &glow::Context,
    sources: &ProgramSources,
) -> Result<(glow::Program, TerrainUniforms), String> {
    let mut stages: Vec<glow::Shader> = Vec::new();
    let compiled = (|| -> Result<(), String> {
        stages.push(compile_stage(gl, glow::VERTEX_SHADER, &sources.vertex)?);
        if let Some((control, evaluation)) = &sources.tessellation {
            stages.push(compile_stage(gl, glow::TESS_CONTROL_SHADER, control)?);
            stages.push(compile_stage(gl, glow::TESS_EVALUATION_SHADER, evaluation)?);
        }
        stages.push(compile_stage(gl, glow::FRAGMENT_SHADER, &sources.fragment)?);
        Ok(())
    })();
    if let Err(e) = compiled {
        for stage in stages {
            unsafe { gl.delete_shader(stage) };
        }
        return Err(e);
    }

    let program = link_program(gl, &stages)?;

    let uniforms = match resolve_uniforms(gl, program).and_then(|uniforms| {
        assign_sampler_units(gl, program)?;
        Ok(uniforms)
    }) {
        Ok(uniforms) => uniforms,
        Err(e) => {
            unsafe { gl.delete_program(program) };
            return Err(e);
        }
    };

    Ok((program, uniforms))
}

/// The linked terrain program plus its resolved uniform locations. Keeps
/// its source paths so reload can rebuild from the same files.
pub struct TerrainProgram {
    pub program: glow::Program,
    pub uniforms: TerrainUniforms,
    sources: ProgramSources,
}

impl TerrainProgram {
    pub fn build(gl: &glow::Context, sources: ProgramSources) -> Result<Self, String> {
        let (program, uniforms) = build_program(gl, &sources)?;
        Ok(Self {
            program,
            uniforms,
            sources,
        })
    }

    /// Rebuilds from the same source files. The replacement is compiled and
    /// linked first; the old program is destroyed only after the new one
    /// succeeded, so a failed reload leaves the previous program bound and
    /// valid.
    pub fn reload(&mut self, gl: &glow::Context) -> Result<(), String> {
        let (program, uniforms) = build_program(gl, &self.sources)?;
        unsafe { gl.delete_program(self.program) };
        self.program = program;
        self.uniforms = uniforms;
        Ok(())
    }

    pub fn destroy(&self, gl: &glow::Context) {
        unsafe { gl.delete_program(self.program) };
    }
}

#[cfg(test)]
mod tests {
    use super::{ProgramSources, UNIFORM_NAMES};
    use std::collections::HashSet;
    use std::path::PathBuf;

    #[test]
    fn tessellation_stages_come_as_a_pair_or_not_at_all() {
        let terrain = ProgramSources::tessellated_terrain();
        let (control, evaluation) = terrain.tessellation.expect("grid pipeline tessellates");
        assert_eq!(control, PathBuf::from("shaders/terrain.tesc"));
        assert_eq!(evaluation, PathBuf::from("shaders/terrain.tese"));

        let model = ProgramSources::displaced_model();
        assert!(model.tessellation.is_none());
        assert_eq!(model.fragment, terrain.fragment, "both variants share the fragment stage");
    }

    #[test]
    fn uniform_table_has_no_duplicate_names() {
        let unique: HashSet<_> = UNIFORM_NAMES.iter().collect();
        assert_eq!(unique.len(), UNIFORM_NAMES.len());
        assert!(UNIFORM_NAMES.iter().all(|n| n.starts_with("u_")));
    }

    #[test]
    fn reload_resolves_locations_from_the_same_declarations() {
        // Hot-reload rebuilds from the stored source paths and re-resolves
        // every uniform from the same tables, so two reloads with unchanged
        // sources cannot diverge. Headless, we pin down the inputs: the
        // source set and the declared name tables are stable values.
        let first = ProgramSources::tessellated_terrain();
        let second = ProgramSources::tessellated_terrain();
        assert_eq!(format!("{first:?}"), format!("{second:?}"));
    }
}
