//! Mesh asset
//!
//! The renderer draws exactly one indexed triangle mesh. A source document is
//! accepted only if it holds one mesh with one triangle primitive whose
//! attributes are exactly position, normal, tangent and texcoord, in that order.
//! Anything else is a load failure; there is no partial result.

use std::borrow::Cow;
use std::path::Path;

use bytemuck::{Pod, Zeroable};

use crate::arena::ScratchArena;
use crate::error::{Error, Result};
use crate::{engine_debug, engine_error};

/// Vertex attribute kinds understood by the renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeKind {
    Position,
    Normal,
    Tangent,
    TexCoord,
}

/// Attribute order a source primitive must follow
pub const EXPECTED_ATTRIBUTES: [AttributeKind; 4] = [
    AttributeKind::Position,
    AttributeKind::Normal,
    AttributeKind::Tangent,
    AttributeKind::TexCoord,
];

/// One decoded attribute stream of a source primitive
#[derive(Debug, Clone)]
pub enum RawAttribute {
    Position(Vec<[f32; 3]>),
    Normal(Vec<[f32; 3]>),
    Tangent(Vec<[f32; 4]>),
    TexCoord(Vec<[f32; 2]>),
    /// Any other semantic (colors, joints, second UV set...)
    Other(String),
}

impl RawAttribute {
    /// Attribute kind, `None` for unsupported semantics
    pub fn kind(&self) -> Option<AttributeKind> {
        match self {
            RawAttribute::Position(_) => Some(AttributeKind::Position),
            RawAttribute::Normal(_) => Some(AttributeKind::Normal),
            RawAttribute::Tangent(_) => Some(AttributeKind::Tangent),
            RawAttribute::TexCoord(_) => Some(AttributeKind::TexCoord),
            RawAttribute::Other(_) => None,
        }
    }

    fn describe(&self) -> String {
        match self {
            RawAttribute::Other(name) => name.clone(),
            other => format!("{:?}", other.kind()),
        }
    }
}

/// A decoded source primitive
#[derive(Debug, Clone)]
pub struct RawPrimitive {
    /// Attributes in source order
    pub attributes: Vec<RawAttribute>,
    /// Index list (required)
    pub indices: Option<Vec<u32>>,
    /// True for triangle-list topology
    pub triangles: bool,
}

/// A decoded source mesh
#[derive(Debug, Clone)]
pub struct RawMesh {
    pub primitives: Vec<RawPrimitive>,
}

/// Per-vertex shading attributes, interleaved for the color pass
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct SurfaceVertex {
    pub normal: [f32; 3],
    pub tangent: [f32; 4],
    pub tex_coord: [f32; 2],
}

/// Validated mesh ready for upload
///
/// All attribute arrays have the same length. Triangles are wound clockwise
/// (as seen from their front side), matching the pipeline's front-face rule.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshData {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub tangents: Vec<[f32; 4]>,
    pub tex_coords: Vec<[f32; 2]>,
    pub indices: Vec<u16>,
}

impl MeshData {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }

    /// Position array as raw bytes (vertex binding 0)
    pub fn position_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.positions)
    }

    /// Index array as raw bytes
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    /// Size in bytes of the interleaved surface array (vertex binding 1)
    pub fn surface_byte_size(&self) -> usize {
        self.vertex_count() * std::mem::size_of::<SurfaceVertex>()
    }

    /// Interleave normal/tangent/texcoord into a scratch region.
    ///
    /// The region stays valid until the arena is restored past it.
    pub fn interleave_surface<'a>(&self, arena: &'a ScratchArena) -> Result<&'a [u8]> {
        let size = self.surface_byte_size();
        let remaining = arena.remaining();
        let region = arena
            .push(size)
            .ok_or(Error::ArenaExhausted { requested: size, remaining })?;

        let vertices: &mut [SurfaceVertex] = bytemuck::cast_slice_mut(region);
        for (i, vertex) in vertices.iter_mut().enumerate() {
            *vertex = SurfaceVertex {
                normal: self.normals[i],
                tangent: self.tangents[i],
                tex_coord: self.tex_coords[i],
            };
        }
        Ok(bytemuck::cast_slice(vertices))
    }

    /// Unit quad in the XY plane facing +Z (4 vertices, 6 indices)
    pub fn quad(half_extent: f32) -> Self {
        let h = half_extent;
        let primitive = RawPrimitive {
            attributes: vec![
                RawAttribute::Position(vec![[-h, -h, 0.0], [h, -h, 0.0], [h, h, 0.0], [-h, h, 0.0]]),
                RawAttribute::Normal(vec![[0.0, 0.0, 1.0]; 4]),
                RawAttribute::Tangent(vec![[1.0, 0.0, 0.0, 1.0]; 4]),
                RawAttribute::TexCoord(vec![[0.0, 1.0], [1.0, 1.0], [1.0, 0.0], [0.0, 0.0]]),
            ],
            indices: Some(vec![0, 1, 2, 2, 3, 0]),
            triangles: true,
        };
        // A literal quad always satisfies the shape rules
        match assemble_mesh(vec![RawMesh { primitives: vec![primitive] }]) {
            Ok(mesh) => mesh,
            Err(e) => unreachable!("quad mesh rejected: {}", e),
        }
    }
}

fn reject(reason: String) -> Error {
    engine_error!("umbra::asset", "Mesh rejected: {}", reason);
    Error::AssetLoadFailed(reason)
}

/// Validate decoded source meshes and build the renderer's mesh.
///
/// Source triangles are counter-clockwise (glTF convention); they are
/// rewound to clockwise here.
pub fn assemble_mesh(meshes: Vec<RawMesh>) -> Result<MeshData> {
    if meshes.len() != 1 {
        return Err(reject(format!("expected exactly one mesh, found {}", meshes.len())));
    }
    let mut mesh = meshes.into_iter().next().ok_or_else(|| reject("no mesh".to_string()))?;

    if mesh.primitives.len() != 1 {
        return Err(reject(format!(
            "expected exactly one primitive, found {}",
            mesh.primitives.len()
        )));
    }
    let primitive = mesh.primitives.remove(0);

    if !primitive.triangles {
        return Err(reject("primitive topology is not a triangle list".to_string()));
    }

    let kinds: Vec<Option<AttributeKind>> = primitive.attributes.iter().map(RawAttribute::kind).collect();
    if kinds.len() != EXPECTED_ATTRIBUTES.len()
        || kinds.iter().zip(EXPECTED_ATTRIBUTES).any(|(kind, expected)| *kind != Some(expected))
    {
        let found: Vec<String> = primitive.attributes.iter().map(RawAttribute::describe).collect();
        return Err(reject(format!(
            "expected attributes [Position, Normal, Tangent, TexCoord], found [{}]",
            found.join(", ")
        )));
    }

    let mut attributes = primitive.attributes.into_iter();
    let (
        Some(RawAttribute::Position(positions)),
        Some(RawAttribute::Normal(normals)),
        Some(RawAttribute::Tangent(tangents)),
        Some(RawAttribute::TexCoord(tex_coords)),
    ) = (attributes.next(), attributes.next(), attributes.next(), attributes.next())
    else {
        return Err(reject("attribute order changed during validation".to_string()));
    };

    let vertex_count = positions.len();
    if vertex_count == 0 {
        return Err(reject("mesh has no vertices".to_string()));
    }
    if normals.len() != vertex_count || tangents.len() != vertex_count || tex_coords.len() != vertex_count {
        return Err(reject(format!(
            "attribute counts differ (position {}, normal {}, tangent {}, texcoord {})",
            vertex_count,
            normals.len(),
            tangents.len(),
            tex_coords.len()
        )));
    }
    if vertex_count > u16::MAX as usize + 1 {
        return Err(reject(format!("{} vertices cannot be addressed by 16-bit indices", vertex_count)));
    }

    let source_indices = primitive
        .indices
        .ok_or_else(|| reject("primitive has no index buffer".to_string()))?;
    if source_indices.is_empty() || source_indices.len() % 3 != 0 {
        return Err(reject(format!(
            "index count {} is not a non-zero multiple of 3",
            source_indices.len()
        )));
    }
    if let Some(bad) = source_indices.iter().find(|&&i| i as usize >= vertex_count) {
        return Err(reject(format!("index {} out of range ({} vertices)", bad, vertex_count)));
    }

    let indices: Vec<u16> = source_indices
        .chunks_exact(3)
        .flat_map(|tri| [tri[0] as u16, tri[2] as u16, tri[1] as u16])
        .collect();

    engine_debug!(
        "umbra::asset",
        "Mesh assembled: {} vertices, {} indices",
        vertex_count,
        indices.len()
    );

    Ok(MeshData { positions, normals, tangents, tex_coords, indices })
}

/// Attribute names of every primitive, indexed `[mesh][primitive]`, in the
/// order the document lists them.
///
/// gltf's own primitive view sorts attributes, so the order is read from the
/// raw JSON (serde_json keeps object key order with `preserve_order`).
fn source_attribute_order(path: &Path) -> Result<Vec<Vec<Vec<String>>>> {
    let bytes = std::fs::read(path).map_err(|e| reject(format!("failed to read {}: {}", path.display(), e)))?;
    let json: Cow<[u8]> = if bytes.starts_with(b"glTF") {
        gltf::Glb::from_slice(&bytes)
            .map_err(|e| reject(format!("failed to parse {}: {}", path.display(), e)))?
            .json
    } else {
        Cow::Borrowed(bytes.as_slice())
    };
    let root: serde_json::Value = serde_json::from_slice(&json)
        .map_err(|e| reject(format!("failed to parse {}: {}", path.display(), e)))?;

    let list = |value: &serde_json::Value, key: &str| -> Vec<serde_json::Value> {
        value.get(key).and_then(serde_json::Value::as_array).cloned().unwrap_or_default()
    };
    Ok(list(&root, "meshes")
        .iter()
        .map(|mesh| {
            list(mesh, "primitives")
                .iter()
                .map(|primitive| {
                    primitive
                        .get("attributes")
                        .and_then(serde_json::Value::as_object)
                        .map(|attributes| attributes.keys().cloned().collect())
                        .unwrap_or_default()
                })
                .collect()
        })
        .collect())
}

/// Load a glTF file and validate it into a [`MeshData`]
pub fn load_mesh(path: impl AsRef<Path>) -> Result<MeshData> {
    let path = path.as_ref();
    let (document, buffers, _images) = gltf::import(path)
        .map_err(|e| reject(format!("failed to import {}: {}", path.display(), e)))?;
    let order = source_attribute_order(path)?;

    let mut meshes = Vec::new();
    for mesh in document.meshes() {
        let mut primitives = Vec::new();
        for primitive in mesh.primitives() {
            let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|data| &data.0[..]));
            let names = order
                .get(mesh.index())
                .and_then(|mesh_order| mesh_order.get(primitive.index()))
                .ok_or_else(|| reject(format!("{}: primitive attributes not found", path.display())))?;

            let mut attributes = Vec::with_capacity(names.len());
            for name in names {
                let attribute = match name.as_str() {
                    "POSITION" => reader.read_positions().map(|it| RawAttribute::Position(it.collect())),
                    "NORMAL" => reader.read_normals().map(|it| RawAttribute::Normal(it.collect())),
                    "TANGENT" => reader.read_tangents().map(|it| RawAttribute::Tangent(it.collect())),
                    "TEXCOORD_0" => reader
                        .read_tex_coords(0)
                        .map(|it| RawAttribute::TexCoord(it.into_f32().collect())),
                    other => Some(RawAttribute::Other(other.to_string())),
                };
                let attribute = attribute.ok_or_else(|| {
                    reject(format!("{}: attribute {} could not be read", path.display(), name))
                })?;
                attributes.push(attribute);
            }

            primitives.push(RawPrimitive {
                attributes,
                indices: reader.read_indices().map(|it| it.into_u32().collect()),
                triangles: primitive.mode() == gltf::mesh::Mode::Triangles,
            });
        }
        meshes.push(RawMesh { primitives });
    }

    assemble_mesh(meshes)
}

#[cfg(test)]
#[path = "mesh_tests.rs"]
mod tests;
