//! CPU-side asset decoding: 24-bpp uncompressed bitmaps and triangulated
//! OBJ models. No GL types here; the gfx layer decides what to upload.

use crate::core::gfx::mesh::MeshData;
use log::info;
use std::fs;
use std::path::Path;

const BMP_HEADER_LEN: usize = 54;

/// Raw decoded bitmap: tightly packed RGB triples, rows in file order.
#[derive(Clone, Debug)]
pub struct Bitmap {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

fn read_u16_le(bytes: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([bytes[at], bytes[at + 1]])
}

fn read_u32_le(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

fn read_i32_le(bytes: &[u8], at: usize) -> i32 {
    read_u32_le(bytes, at) as i32
}

/// Decodes a 24-bpp uncompressed BMP. Header fields consumed: data offset
/// (0x0A, zero means the header length), declared image size (0x22, zero
/// means width*height*3), width (0x12), height (0x16), bits per pixel
/// (0x1C, must be 24) and compression (0x1E, must be 0). Pixel bytes are
/// BGR in the file and come back swizzled to RGB.
pub fn decode_bmp(bytes: &[u8]) -> Result<Bitmap, String> {
    if bytes.len() < BMP_HEADER_LEN {
        return Err("not a correct BMP file: header is shorter than 54 bytes".into());
    }
    if &bytes[0..2] != b"BM" {
        return Err("not a correct BMP file: missing BM magic".into());
    }

    let bits_per_pixel = read_u16_le(bytes, 0x1C);
    if bits_per_pixel != 24 {
        return Err(format!(
            "unsupported BMP: {bits_per_pixel} bits per pixel, expected 24"
        ));
    }
    let compression = read_u32_le(bytes, 0x1E);
    if compression != 0 {
        return Err(format!(
            "unsupported BMP: compression {compression}, expected uncompressed"
        ));
    }

    let width = read_i32_le(bytes, 0x12);
    let height = read_i32_le(bytes, 0x16);
    if width <= 0 || height <= 0 {
        return Err(format!("bad BMP dimensions {width}x{height}"));
    }
    let width = width as usize;
    let height = height as usize;

    // Misformatted files leave these at zero; derive them.
    let mut data_pos = read_u32_le(bytes, 0x0A) as usize;
    if data_pos == 0 {
        data_pos = BMP_HEADER_LEN;
    }
    let mut image_size = read_u32_le(bytes, 0x22) as usize;
    if image_size == 0 {
        image_size = width * height * 3;
    }

    let needed = width * height * 3;
    if image_size < needed {
        return Err(format!(
            "bad BMP: declares {image_size} pixel bytes, {needed} required"
        ));
    }
    let available = bytes.len().saturating_sub(data_pos);
    if available < needed {
        return Err(format!(
            "truncated BMP: {available} pixel bytes present, {needed} required"
        ));
    }

    let mut pixels = Vec::with_capacity(needed);
    for bgr in bytes[data_pos..data_pos + needed].chunks_exact(3) {
        pixels.extend_from_slice(&[bgr[2], bgr[1], bgr[0]]);
    }

    Ok(Bitmap {
        width: width as u32,
        height: height as u32,
        pixels,
    })
}

pub fn load_bmp(path: &Path) -> Result<Bitmap, String> {
    info!("Reading image {}", path.display());
    let bytes =
        fs::read(path).map_err(|e| format!("could not open {}: {e}", path.display()))?;
    decode_bmp(&bytes).map_err(|e| format!("{}: {e}", path.display()))
}

fn parse_floats<'a, const N: usize>(
    words: impl Iterator<Item = &'a str>,
    line_no: usize,
    tag: &str,
) -> Result<[f32; N], String> {
    let mut out = [0.0f32; N];
    let mut filled = 0;
    for word in words {
        if filled == N {
            break;
        }
        out[filled] = word
            .parse()
            .map_err(|_| format!("line {line_no}: bad {tag} component '{word}'"))?;
        filled += 1;
    }
    if filled < N {
        return Err(format!("line {line_no}: {tag} needs {N} components"));
    }
    Ok(out)
}

fn parse_corner(word: &str, line_no: usize) -> Result<[usize; 3], String> {
    let mut parts = word.split('/');
    let mut triplet = [0usize; 3];
    for slot in &mut triplet {
        let part = parts
            .next()
            .ok_or_else(|| format!("line {line_no}: face corner '{word}' is not v/vt/vn"))?;
        *slot = part
            .parse()
            .map_err(|_| format!("line {line_no}: face corner '{word}' is not v/vt/vn"))?;
    }
    if parts.next().is_some() {
        return Err(format!(
            "line {line_no}: face corner '{word}' has extra index fields"
        ));
    }
    Ok(triplet)
}

/// Parses a triangulated OBJ. Recognized tags: `v`, `vt`, `vn` and `f` with
/// exactly three `v/vt/vn` corners; every other line is skipped as a
/// comment. Quads and n-gons reject the whole file. On success each face
/// corner becomes its own flattened vertex with a sequential index, so
/// shared attributes are duplicated rather than reused.
pub fn parse_obj(source: &str) -> Result<MeshData, String> {
    let mut positions: Vec<[f32; 3]> = Vec::new();
    let mut uvs: Vec<[f32; 2]> = Vec::new();
    let mut normals: Vec<[f32; 3]> = Vec::new();
    // 1-based (position, uv, normal) index triplets, one per face corner.
    let mut corners: Vec<[usize; 3]> = Vec::new();

    for (idx, line) in source.lines().enumerate() {
        let line_no = idx + 1;
        let mut words = line.split_whitespace();
        match words.next() {
            Some("v") => positions.push(parse_floats(words, line_no, "vertex")?),
            Some("vt") => uvs.push(parse_floats(words, line_no, "uv")?),
            Some("vn") => normals.push(parse_floats(words, line_no, "normal")?),
            Some("f") => {
                let face: Vec<&str> = words.collect();
                if face.len() != 3 {
                    return Err(format!(
                        "line {line_no}: face has {} corners; only triangulated \
                         OBJ files are supported",
                        face.len()
                    ));
                }
                for word in face {
                    corners.push(parse_corner(word, line_no)?);
                }
            }
            _ => {}
        }
    }

    let mut mesh = MeshData::default();
    for (n, [vi, ti, ni]) in corners.into_iter().enumerate() {
        let position = *positions
            .get(vi.wrapping_sub(1))
            .ok_or_else(|| format!("face references missing vertex {vi}"))?;
        let uv = *uvs
            .get(ti.wrapping_sub(1))
            .ok_or_else(|| format!("face references missing uv {ti}"))?;
        let normal = *normals
            .get(ni.wrapping_sub(1))
            .ok_or_else(|| format!("face references missing normal {ni}"))?;
        mesh.positions.push(position);
        mesh.uvs.push(uv);
        mesh.normals.push(normal);
        mesh.indices.push(n as u32);
    }

    Ok(mesh)
}

pub fn load_obj(path: &Path) -> Result<MeshData, String> {
    info!("Loading OBJ file {}", path.display());
    let source =
        fs::read_to_string(path).map_err(|e| format!("could not open {}: {e}", path.display()))?;
    parse_obj(&source).map_err(|e| format!("{}: {e}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::{decode_bmp, parse_obj};

    /// Builds a minimal 24-bpp BMP: 54-byte header followed by tightly
    /// packed BGR pixel data.
    fn bmp_fixture(width: i32, height: i32, pixels: &[u8]) -> Vec<u8> {
        let mut bytes = vec![0u8; 54];
        bytes[0] = b'B';
        bytes[1] = b'M';
        bytes[0x0A..0x0E].copy_from_slice(&54u32.to_le_bytes());
        bytes[0x12..0x16].copy_from_slice(&width.to_le_bytes());
        bytes[0x16..0x1A].copy_from_slice(&height.to_le_bytes());
        bytes[0x1C..0x1E].copy_from_slice(&24u16.to_le_bytes());
        bytes[0x1E..0x22].copy_from_slice(&0u32.to_le_bytes());
        bytes[0x22..0x26].copy_from_slice(&(pixels.len() as u32).to_le_bytes());
        bytes.extend_from_slice(pixels);
        bytes
    }

    #[test]
    fn two_by_two_fixture_decodes_with_swizzled_pixels() {
        // Four BGR pixels: blue, green, red, white.
        let pixels = [
            255, 0, 0, /**/ 0, 255, 0, /**/ 0, 0, 255, /**/ 255, 255, 255,
        ];
        let bitmap = decode_bmp(&bmp_fixture(2, 2, &pixels)).expect("fixture should decode");
        assert_eq!((bitmap.width, bitmap.height), (2, 2));
        assert_eq!(bitmap.pixels.len(), 12);
        assert_eq!(&bitmap.pixels[0..3], &[0, 0, 255], "first pixel is blue in RGB");
        assert_eq!(&bitmap.pixels[6..9], &[255, 0, 0], "third pixel is red in RGB");
    }

    #[test]
    fn missing_magic_fails_before_any_allocation() {
        let mut bytes = bmp_fixture(2, 2, &[0; 12]);
        bytes[0] = b'X';
        let err = decode_bmp(&bytes).unwrap_err();
        assert!(err.contains("BM magic"), "got: {err}");
    }

    #[test]
    fn short_header_is_rejected() {
        assert!(decode_bmp(b"BM").is_err());
    }

    #[test]
    fn wrong_depth_or_compression_is_rejected() {
        let mut bytes = bmp_fixture(2, 2, &[0; 12]);
        bytes[0x1C] = 32;
        assert!(decode_bmp(&bytes).unwrap_err().contains("32 bits"));

        let mut bytes = bmp_fixture(2, 2, &[0; 12]);
        bytes[0x1E] = 1;
        assert!(decode_bmp(&bytes).unwrap_err().contains("compression"));
    }

    #[test]
    fn zero_offset_and_size_fields_are_derived() {
        let mut bytes = bmp_fixture(1, 1, &[10, 20, 30]);
        bytes[0x0A..0x0E].copy_from_slice(&0u32.to_le_bytes());
        bytes[0x22..0x26].copy_from_slice(&0u32.to_le_bytes());
        let bitmap = decode_bmp(&bytes).expect("derived fields should decode");
        assert_eq!((bitmap.width, bitmap.height), (1, 1));
        assert_eq!(bitmap.pixels, vec![30, 20, 10]);
    }

    #[test]
    fn truncated_pixel_data_is_rejected() {
        let mut bytes = bmp_fixture(4, 4, &[0; 10]);
        // Header claims the full 48 bytes; the file carries only 10.
        bytes[0x22..0x26].copy_from_slice(&48u32.to_le_bytes());
        assert!(decode_bmp(&bytes).unwrap_err().contains("truncated"));
    }

    #[test]
    fn declared_size_smaller_than_the_image_is_rejected() {
        let bytes = bmp_fixture(4, 4, &[0; 10]);
        assert!(decode_bmp(&bytes).unwrap_err().contains("declares"));
    }

    const TRIANGLE_OBJ: &str = "\
# a single triangle
v 0.0 0.0 0.0
v 1.0 0.0 0.0
v 0.0 0.0 1.0
vt 0.0 0.0
vt 1.0 0.0
vt 0.0 1.0
vn 0.0 1.0 0.0
f 1/1/1 2/2/1 3/3/1
";

    #[test]
    fn triangle_obj_flattens_one_vertex_per_corner() {
        let mesh = parse_obj(TRIANGLE_OBJ).expect("triangle should parse");
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.indices, vec![0, 1, 2]);
        assert_eq!(mesh.positions[1], [1.0, 0.0, 0.0]);
        assert_eq!(mesh.uvs[2], [0.0, 1.0]);
        assert!(mesh.normals.iter().all(|n| *n == [0.0, 1.0, 0.0]));
    }

    #[test]
    fn shared_attributes_are_duplicated_not_reused() {
        let two_faces = "\
v 0.0 0.0 0.0
v 1.0 0.0 0.0
v 0.0 0.0 1.0
v 1.0 0.0 1.0
vt 0.0 0.0
vn 0.0 1.0 0.0
f 1/1/1 2/1/1 3/1/1
f 2/1/1 4/1/1 3/1/1
";
        let mesh = parse_obj(two_faces).expect("two triangles should parse");
        // Six corners, six vertices: vertices 2 and 3 appear twice.
        assert_eq!(mesh.vertex_count(), 6);
        assert_eq!(mesh.indices, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn quad_face_rejects_the_whole_file() {
        let quad = "\
v 0.0 0.0 0.0
v 1.0 0.0 0.0
v 1.0 0.0 1.0
v 0.0 0.0 1.0
vt 0.0 0.0
vn 0.0 1.0 0.0
f 1/1/1 2/1/1 3/1/1 4/1/1
";
        let err = parse_obj(quad).unwrap_err();
        assert!(err.contains("4 corners"), "got: {err}");
    }

    #[test]
    fn corner_without_uv_index_is_rejected() {
        let src = "v 0 0 0\nvn 0 1 0\nf 1//1 1//1 1//1\n";
        assert!(parse_obj(src).is_err());
    }

    #[test]
    fn face_referencing_missing_attribute_is_rejected() {
        let src = "v 0 0 0\nvt 0 0\nvn 0 1 0\nf 1/1/1 2/1/1 1/1/1\n";
        let err = parse_obj(src).unwrap_err();
        assert!(err.contains("missing vertex 2"), "got: {err}");
    }

    #[test]
    fn unknown_tags_are_skipped_as_comments() {
        let src = format!("mtllib scene.mtl\no terrain\ns off\n{TRIANGLE_OBJ}");
        assert_eq!(parse_obj(&src).expect("should parse").vertex_count(), 3);
    }
}
