use log::warn;
use std::path::PathBuf;

// Terrain constants. The grid spacing doubles as the vertical scale applied
// to heightmap texels, so the band thresholds below are expressed in the
// same displaced-altitude units (0..=25.5 for 8-bit texels at scale 0.1).
pub const GRID_POINTS: usize = 128;
pub const GRID_SCALE: f32 = 0.1;
pub const BAND_LOWER: f32 = 12.0;
pub const BAND_UPPER: f32 = 25.0;
pub const BAND_TRANSITION: f32 = 6.0;

pub const WINDOW_WIDTH: u32 = 1920;
pub const WINDOW_HEIGHT: u32 = 1080;

pub const LIGHT_POSITION_WORLD: [f32; 3] = [0.0, -0.5, -0.5];

const DEFAULT_TEXTURE_A: &str = "grass";
const DEFAULT_TEXTURE_B: &str = "rocks";
const DEFAULT_TEXTURE_C: &str = "snow";
const DEFAULT_HEIGHTMAP: &str = "mountains_height.bmp";

/// Immutable CLI snapshot, produced before any GL state exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// External model path; `None` means synthesize the grid.
    pub model_path: Option<PathBuf>,
    /// Base-name stems for the three surface textures. The diffuse file is
    /// `<stem>.bmp`, the specular map `<stem>-s.bmp`.
    pub texture_a: String,
    pub texture_b: String,
    pub texture_c: String,
    pub heightmap_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model_path: None,
            texture_a: DEFAULT_TEXTURE_A.to_string(),
            texture_b: DEFAULT_TEXTURE_B.to_string(),
            texture_c: DEFAULT_TEXTURE_C.to_string(),
            heightmap_path: PathBuf::from(DEFAULT_HEIGHTMAP),
        }
    }
}

impl Config {
    pub fn diffuse_path(&self, stem: &str) -> PathBuf {
        PathBuf::from(format!("{stem}.bmp"))
    }

    pub fn specular_path(&self, stem: &str) -> PathBuf {
        PathBuf::from(format!("{stem}-s.bmp"))
    }
}

/// Parses the process arguments. Recognized flags are `-m <model path>` and
/// `-h <heightmap path>`; anything else is skipped without comment.
pub fn parse_args<I>(args: I) -> Config
where
    I: IntoIterator<Item = String>,
{
    let mut config = Config::default();
    let mut iter = args.into_iter();

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-m" => match iter.next() {
                Some(path) if !path.is_empty() => config.model_path = Some(PathBuf::from(path)),
                Some(_) => {}
                None => warn!("-m given without a model path; ignoring"),
            },
            "-h" => match iter.next() {
                Some(path) if !path.is_empty() => config.heightmap_path = PathBuf::from(path),
                Some(_) => {}
                None => warn!("-h given without a heightmap path; ignoring"),
            },
            _ => {}
        }
    }

    config
}

pub fn from_cli_args() -> Config {
    parse_args(std::env::args().skip(1))
}

#[cfg(test)]
mod tests {
    use super::{Config, parse_args};
    use std::path::PathBuf;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn defaults_when_no_args() {
        let config = parse_args(args(&[]));
        assert_eq!(config, Config::default());
        assert!(config.model_path.is_none(), "empty model path means grid");
        assert_eq!(config.heightmap_path, PathBuf::from("mountains_height.bmp"));
    }

    #[test]
    fn model_and_heightmap_flags() {
        let config = parse_args(args(&["-m", "hill.obj", "-h", "alps.bmp"]));
        assert_eq!(config.model_path, Some(PathBuf::from("hill.obj")));
        assert_eq!(config.heightmap_path, PathBuf::from("alps.bmp"));
    }

    #[test]
    fn unrecognized_flags_are_silently_ignored() {
        let config = parse_args(args(&["--verbose", "-x", "7", "-h", "alps.bmp"]));
        assert_eq!(config.heightmap_path, PathBuf::from("alps.bmp"));
        assert_eq!(config.texture_a, "grass");
    }

    #[test]
    fn flag_without_value_keeps_default() {
        let config = parse_args(args(&["-h"]));
        assert_eq!(config.heightmap_path, PathBuf::from("mountains_height.bmp"));
    }

    #[test]
    fn texture_file_names_derive_from_stems() {
        let config = Config::default();
        assert_eq!(config.diffuse_path("grass"), PathBuf::from("grass.bmp"));
        assert_eq!(config.specular_path("grass"), PathBuf::from("grass-s.bmp"));
    }
}
