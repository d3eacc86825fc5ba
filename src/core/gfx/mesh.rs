//! CPU-side mesh construction: either a synthesized N x N grid on the XZ
//! plane or attribute arrays adopted verbatim from an imported model.

/// Primitive layout of the index sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Topology {
    Triangles,
    Patches,
}

impl Topology {
    pub fn gl_mode(self) -> u32 {
        match self {
            Self::Triangles => glow::TRIANGLES,
            Self::Patches => glow::PATCHES,
        }
    }

    /// Indices per emitted primitive: 3 for triangles, 4 for quad patches.
    pub fn indices_per_primitive(self) -> usize {
        match self {
            Self::Triangles => 3,
            Self::Patches => 4,
        }
    }
}

impl core::fmt::Display for Topology {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Triangles => write!(f, "triangles"),
            Self::Patches => write!(f, "patches"),
        }
    }
}

/// Parallel attribute arrays plus the index sequence. The three attribute
/// arrays are index-aligned and equal length; every index is smaller than
/// the vertex count. Consumed once by the GPU upload.
#[derive(Clone, Debug, Default)]
pub struct MeshData {
    pub positions: Vec<[f32; 3]>,
    pub uvs: Vec<[f32; 2]>,
    pub normals: Vec<[f32; 3]>,
    pub indices: Vec<u32>,
}

impl MeshData {
    /// Synthesizes a `points` x `points` grid centered on the origin with
    /// `spacing` between neighbors, flat-up normals and half-texel UVs.
    /// Cells on the last row/column have no next neighbor and emit nothing.
    pub fn grid(points: usize, spacing: f32, topology: Topology) -> Self {
        let half_extent = spacing * points as f32 / 2.0;
        let mut mesh = Self {
            positions: Vec::with_capacity(points * points),
            uvs: Vec::with_capacity(points * points),
            normals: Vec::with_capacity(points * points),
            indices: Vec::new(),
        };

        for i in 0..points {
            for j in 0..points {
                let x = spacing * i as f32 - half_extent;
                let z = spacing * j as f32 - half_extent;
                mesh.positions.push([x, 0.0, z]);
                mesh.uvs.push([
                    (i as f32 + 0.5) / points as f32,
                    (j as f32 + 0.5) / points as f32,
                ]);
                mesh.normals.push([0.0, 1.0, 0.0]);
            }
        }

        let cells = points.saturating_sub(1);
        mesh.indices
            .reserve(cells * cells * topology.indices_per_primitive());
        for i in 0..cells {
            for j in 0..cells {
                let top_left = (i * points + j) as u32;
                let top_right = top_left + 1;
                let bottom_left = top_left + points as u32;
                let bottom_right = bottom_left + 1;
                match topology {
                    Topology::Triangles => {
                        mesh.indices.extend_from_slice(&[
                            top_left,
                            top_right,
                            bottom_left,
                            bottom_left,
                            top_right,
                            bottom_right,
                        ]);
                    }
                    Topology::Patches => {
                        mesh.indices.extend_from_slice(&[
                            top_left,
                            top_right,
                            bottom_left,
                            bottom_right,
                        ]);
                    }
                }
            }
        }

        mesh
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    /// True when there is nothing to upload. Callers must not hand an empty
    /// mesh to the GPU or issue a draw call for it.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty() || self.indices.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::{MeshData, Topology};

    #[test]
    fn triangle_and_patch_index_counts_follow_grid_size() {
        for points in [2usize, 3, 5, 16, 128] {
            let cells = (points - 1) * (points - 1);
            let tris = MeshData::grid(points, 0.1, Topology::Triangles);
            let patches = MeshData::grid(points, 0.1, Topology::Patches);
            assert_eq!(tris.index_count(), 6 * cells, "triangles, N={points}");
            assert_eq!(patches.index_count(), 4 * cells, "patches, N={points}");
            assert_eq!(tris.vertex_count(), points * points);
            assert_eq!(patches.vertex_count(), points * points);
        }
    }

    #[test]
    fn default_grid_in_patch_mode_emits_64516_indices() {
        let mesh = MeshData::grid(128, 0.1, Topology::Patches);
        assert_eq!(mesh.index_count(), 4 * 127 * 127);
        assert_eq!(mesh.index_count(), 64516);
    }

    #[test]
    fn every_index_references_a_real_vertex() {
        for topology in [Topology::Triangles, Topology::Patches] {
            let mesh = MeshData::grid(9, 0.25, topology);
            let count = mesh.vertex_count() as u32;
            assert!(
                mesh.indices.iter().all(|&i| i < count),
                "out-of-range index in {topology} mode"
            );
        }
    }

    #[test]
    fn grid_normals_point_up_and_uvs_stay_inside_unit_square() {
        let mesh = MeshData::grid(32, 0.1, Topology::Patches);
        assert!(mesh.normals.iter().all(|n| *n == [0.0, 1.0, 0.0]));
        assert!(
            mesh.uvs
                .iter()
                .all(|uv| uv.iter().all(|c| (0.0..=1.0).contains(c))),
            "UV left the unit square"
        );
        // Half-texel offset: the first UV sits half a step in, not at 0.
        assert!((mesh.uvs[0][0] - 0.5 / 32.0).abs() < 1e-6);
    }

    #[test]
    fn grid_is_centered_on_the_origin() {
        let mesh = MeshData::grid(4, 0.5, Topology::Triangles);
        let min_x = mesh.positions.iter().map(|p| p[0]).fold(f32::MAX, f32::min);
        let max_x = mesh.positions.iter().map(|p| p[0]).fold(f32::MIN, f32::max);
        assert!((min_x + 1.0).abs() < 1e-6, "min x was {min_x}");
        assert!((max_x - 0.5).abs() < 1e-6, "max x was {max_x}");
        assert!(mesh.positions.iter().all(|p| p[1] == 0.0), "grid is flat");
    }

    #[test]
    fn first_cell_winding_matches_the_layout_contract() {
        let points = 4u32;
        let tris = MeshData::grid(points as usize, 0.1, Topology::Triangles);
        // Cell (0,0): TL,TR,BL then BL,TR,BR.
        assert_eq!(&tris.indices[..6], &[0, 1, points, points, 1, points + 1]);

        let patches = MeshData::grid(points as usize, 0.1, Topology::Patches);
        // Patch vertices arrive as TL,TR,BL,BR.
        assert_eq!(&patches.indices[..4], &[0, 1, points, points + 1]);
    }

    #[test]
    fn empty_mesh_is_reported_empty() {
        assert!(MeshData::default().is_empty());
        assert!(!MeshData::grid(2, 1.0, Topology::Patches).is_empty());
    }
}
