//! Imported scene to GPU mesh conversion

use crate::cache::TextureCache;
use crate::diagnostics::Diagnostic;
use crate::error::{LoaderError, Result};
use crate::gpu::GpuDevice;
use crate::renderer::{GpuMesh, Vertex};
use crate::resolver::TextureResolver;
use crate::scene::{ImportedMesh, ImportedScene, SceneNode, TextureRole};

/// Mutable state threaded through a conversion
///
/// Meshes and textures land here as soon as they are built, so whatever was
/// created before a hard failure is still reachable for release.
pub struct ConversionTarget<'a, G: GpuDevice> {
    pub meshes: &'a mut Vec<GpuMesh<G>>,
    pub textures: &'a mut TextureCache<G::TextureView>,
    pub diagnostics: &'a mut Vec<Diagnostic>,
}

/// Walks an imported node tree and builds one [`GpuMesh`] per mesh reference
pub struct SceneConverter<'a, G: GpuDevice> {
    device: &'a G,
    resolver: TextureResolver<'a, G>,
    trace_geometry: bool,
}

impl<'a, G: GpuDevice> SceneConverter<'a, G> {
    pub fn new(device: &'a G, resolver: TextureResolver<'a, G>) -> Self {
        Self {
            device,
            resolver,
            trace_geometry: false,
        }
    }

    /// Dump every converted vertex and face at trace level
    pub fn with_geometry_trace(mut self, enabled: bool) -> Self {
        self.trace_geometry = enabled;
        self
    }

    /// Convert every mesh referenced from `root` and its descendants
    ///
    /// Visits nodes depth first: a node's meshes in listed order, then its
    /// children in listed order. Returns the number of meshes appended.
    pub fn convert_tree(
        &self,
        scene: &ImportedScene,
        root: &SceneNode,
        target: &mut ConversionTarget<'_, G>,
    ) -> Result<usize> {
        let mut converted = 0;
        let mut stack = vec![root];

        while let Some(node) = stack.pop() {
            for &mesh_index in &node.mesh_indices {
                let mesh = scene
                    .meshes
                    .get(mesh_index)
                    .ok_or_else(|| LoaderError::InvalidMeshIndex {
                        node: node.name.clone(),
                        index: mesh_index,
                        count: scene.meshes.len(),
                    })?;

                let gpu_mesh = self.convert_mesh(scene, mesh, target)?;
                target.meshes.push(gpu_mesh);
                converted += 1;
            }

            stack.extend(node.children.iter().rev());
        }

        Ok(converted)
    }

    /// Convert one imported mesh
    pub fn convert_mesh(
        &self,
        scene: &ImportedScene,
        mesh: &ImportedMesh,
        target: &mut ConversionTarget<'_, G>,
    ) -> Result<GpuMesh<G>> {
        if mesh.positions.is_empty() || mesh.faces.is_empty() {
            return Err(LoaderError::EmptyGeometry {
                mesh: mesh.name.clone(),
                vertices: mesh.positions.len(),
                faces: mesh.faces.len(),
            });
        }

        let vertices = self.build_vertices(mesh);
        let indices = self.build_indices(mesh);

        let textures = match mesh.material_index {
            Some(index) => {
                let material =
                    scene
                        .materials
                        .get(index)
                        .ok_or_else(|| LoaderError::InvalidMaterial {
                            mesh: mesh.name.clone(),
                            index,
                            count: scene.materials.len(),
                        })?;
                self.resolver.resolve(
                    scene,
                    material,
                    TextureRole::Diffuse,
                    target.textures,
                    target.diagnostics,
                )?
            }
            None => Vec::new(),
        };

        if textures.is_empty() {
            return Err(LoaderError::MissingTextures(mesh.name.clone()));
        }

        log::debug!(
            "Converted mesh {}: {} vertices, {} indices, {} textures",
            mesh.name,
            vertices.len(),
            indices.len(),
            textures.len()
        );
        GpuMesh::new(self.device, mesh.name.as_str(), &vertices, &indices, textures)
    }

    fn build_vertices(&self, mesh: &ImportedMesh) -> Vec<Vertex> {
        let vertices: Vec<Vertex> = mesh
            .positions
            .iter()
            .enumerate()
            .map(|(i, &position)| {
                let uv = mesh
                    .tex_coords
                    .as_ref()
                    .and_then(|channel| channel.get(i))
                    .map_or([0.0, 0.0], |tc| [tc[0], tc[1]]);
                Vertex::new(position, uv)
            })
            .collect();

        if self.trace_geometry {
            for (i, v) in vertices.iter().enumerate() {
                log::trace!(
                    "vertex [{i}/{}] x:{} y:{} z:{}, {} {}",
                    vertices.len(),
                    v.position[0],
                    v.position[1],
                    v.position[2],
                    v.uv[0],
                    v.uv[1]
                );
            }
        }

        vertices
    }

    fn build_indices(&self, mesh: &ImportedMesh) -> Vec<u32> {
        let mut indices = Vec::with_capacity(mesh.faces.len() * 3);
        for (i, face) in mesh.faces.iter().enumerate() {
            if self.trace_geometry {
                log::trace!("index [{}/{}] {:?}", i + 1, mesh.faces.len(), face.indices);
            }
            indices.extend_from_slice(&face.indices);
        }
        indices
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::mock::{MockFailures, MockGpu};
    use crate::gpu::BufferUsage;
    use crate::scene::{Face, ImportedMaterial};
    use std::path::Path;

    fn triangle(name: &str, material: Option<usize>) -> ImportedMesh {
        ImportedMesh {
            name: name.to_string(),
            positions: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            tex_coords: Some(vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.5]]),
            faces: vec![Face::triangle(0, 1, 2)],
            material_index: material,
        }
    }

    fn scene(root: SceneNode, meshes: Vec<ImportedMesh>) -> ImportedScene {
        ImportedScene {
            root,
            meshes,
            materials: vec![ImportedMaterial::new("m").with_texture(TextureRole::Diffuse, "a.png")],
            embedded_textures: Vec::new(),
        }
    }

    struct Fixture {
        gpu: MockGpu,
        meshes: Vec<GpuMesh<MockGpu>>,
        textures: TextureCache<crate::gpu::mock::MockView>,
        diagnostics: Vec<Diagnostic>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                gpu: MockGpu::new(),
                meshes: Vec::new(),
                textures: TextureCache::new(),
                diagnostics: Vec::new(),
            }
        }

        fn convert(&mut self, scene: &ImportedScene) -> Result<usize> {
            let resolver = TextureResolver::new(&self.gpu, Path::new(""));
            let converter = SceneConverter::new(&self.gpu, resolver);
            let mut target = ConversionTarget {
                meshes: &mut self.meshes,
                textures: &mut self.textures,
                diagnostics: &mut self.diagnostics,
            };
            converter.convert_tree(scene, &scene.root, &mut target)
        }
    }

    #[test]
    fn test_traversal_order_is_preorder() {
        // root[m0] -> a[m1, m2] -> a1[m3]
        //          -> b[m4]
        let root = SceneNode::new("root")
            .with_meshes([0])
            .with_child(
                SceneNode::new("a")
                    .with_meshes([1, 2])
                    .with_child(SceneNode::new("a1").with_meshes([3])),
            )
            .with_child(SceneNode::new("b").with_meshes([4]));
        let meshes = (0..5).map(|i| triangle(&format!("m{i}"), Some(0))).collect();
        let scene = scene(root, meshes);

        let mut fixture = Fixture::new();
        let converted = fixture.convert(&scene).unwrap();

        let names: Vec<_> = fixture.meshes.iter().map(|m| m.name()).collect();
        assert_eq!(converted, 5);
        assert_eq!(names, vec!["m0", "m1", "m2", "m3", "m4"]);
    }

    #[test]
    fn test_repeated_mesh_reference_converts_twice() {
        let root = SceneNode::new("root")
            .with_meshes([0])
            .with_child(SceneNode::new("copy").with_meshes([0]));
        let scene = scene(root, vec![triangle("shared", Some(0))]);

        let mut fixture = Fixture::new();
        fixture.convert(&scene).unwrap();

        assert_eq!(fixture.meshes.len(), 2);
        assert_eq!(fixture.textures.len(), 1);
        assert_eq!(fixture.meshes[0].textures(), fixture.meshes[1].textures());
    }

    #[test]
    fn test_uv_copied_from_first_channel() {
        let gpu = MockGpu::new();
        let converter = SceneConverter::new(&gpu, TextureResolver::new(&gpu, Path::new("")));

        let with_uv = converter.build_vertices(&triangle("t", None));
        assert_eq!(with_uv[2].uv, [0.0, 1.0]);

        let mut bare = triangle("t", None);
        bare.tex_coords = None;
        let without_uv = converter.build_vertices(&bare);
        assert!(without_uv.iter().all(|v| v.uv == [0.0, 0.0]));
    }

    #[test]
    fn test_indices_flattened_in_face_order() {
        let gpu = MockGpu::new();
        let converter = SceneConverter::new(&gpu, TextureResolver::new(&gpu, Path::new("")));
        let mut mesh = triangle("t", None);
        mesh.positions.push([1.0, 1.0, 0.0]);
        mesh.faces.push(Face::triangle(2, 1, 3));

        assert_eq!(converter.build_indices(&mesh), vec![0, 1, 2, 2, 1, 3]);
    }

    #[test]
    fn test_empty_mesh_rejected_before_buffers() {
        let mut empty = triangle("empty", Some(0));
        empty.faces.clear();
        let scene = scene(SceneNode::new("root").with_meshes([0]), vec![empty]);

        let mut fixture = Fixture::new();
        let result = fixture.convert(&scene);

        assert!(matches!(result, Err(LoaderError::EmptyGeometry { faces: 0, .. })));
        assert_eq!(fixture.gpu.buffers_created(BufferUsage::Vertex), 0);
        assert_eq!(fixture.gpu.texture_uploads(), 0);
    }

    #[test]
    fn test_mesh_without_material_fails_hard() {
        let scene = scene(SceneNode::new("root").with_meshes([0]), vec![triangle("bare", None)]);

        let mut fixture = Fixture::new();
        let result = fixture.convert(&scene);

        assert!(matches!(result, Err(LoaderError::MissingTextures(name)) if name == "bare"));
        assert_eq!(fixture.gpu.live_buffers(), 0);
    }

    #[test]
    fn test_invalid_indices_reported() {
        let bad_mesh = scene(SceneNode::new("root").with_meshes([3]), vec![triangle("t", Some(0))]);
        let mut fixture = Fixture::new();
        assert!(matches!(
            fixture.convert(&bad_mesh),
            Err(LoaderError::InvalidMeshIndex { index: 3, count: 1, .. })
        ));

        let bad_material =
            scene(SceneNode::new("root").with_meshes([0]), vec![triangle("t", Some(5))]);
        let mut fixture = Fixture::new();
        assert!(matches!(
            fixture.convert(&bad_material),
            Err(LoaderError::InvalidMaterial { index: 5, .. })
        ));
    }

    #[test]
    fn test_partial_progress_survives_hard_failure() {
        let root = SceneNode::new("root")
            .with_meshes([0])
            .with_child(SceneNode::new("child").with_meshes([1]));
        let scene = scene(root, vec![triangle("good", Some(0)), triangle("orphan", None)]);

        let mut fixture = Fixture::new();
        assert!(fixture.convert(&scene).is_err());

        assert_eq!(fixture.meshes.len(), 1);
        assert_eq!(fixture.gpu.live_buffers(), 2);
    }

    #[test]
    fn test_buffer_failure_propagates() {
        let scene = scene(SceneNode::new("root").with_meshes([0]), vec![triangle("t", Some(0))]);
        let mut fixture = Fixture::new();
        fixture.gpu.set_failures(MockFailures {
            vertex_buffer: true,
            ..Default::default()
        });

        assert!(matches!(fixture.convert(&scene), Err(LoaderError::Gpu(_))));
        assert!(fixture.meshes.is_empty());
        assert_eq!(fixture.textures.len(), 1);
    }
}
