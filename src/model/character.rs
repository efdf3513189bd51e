//! Animated character loaded from a binary glTF.
//!
//! A [`CharacterModel`] is immutable asset data: node hierarchy, skins, mesh
//! parts with optional morph targets, and the first animation clip. A
//! [`Character`] is one placed instance of it with its own
//! [`AnimationMixer`], position and morph weights. Each frame the pose is
//! sampled from the clip, node world matrices are composed parent-first, and
//! vertices are morphed then linear-blend skinned on the CPU.

use glam::{Mat4, Quat, Vec3};

use crate::error::AssetError;
use crate::utils::{Mesh, Vertex};

/// Local TRS transform of a node
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NodeTransform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl NodeTransform {
    pub const IDENTITY: NodeTransform = NodeTransform {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

#[derive(Clone, Debug)]
pub struct Node {
    pub name: String,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
    pub transform: NodeTransform,
    /// Morph set driven by this node's mesh, if it has morph targets
    pub morph_set: Option<usize>,
}

#[derive(Clone, Debug)]
pub struct Skin {
    pub joints: Vec<usize>,
    pub inverse_bind: Vec<Mat4>,
}

/// Morph targets of one glTF mesh and their current weights
#[derive(Clone, Debug)]
pub struct MorphSet {
    pub name: String,
    pub target_names: Vec<String>,
    pub weights: Vec<f32>,
}

/// One triangle primitive, vertices already in the shared vertex range
#[derive(Clone, Debug)]
pub struct MeshPart {
    pub node: usize,
    pub skin: Option<usize>,
    pub morph_set: Option<usize>,
    pub color: [f32; 4],
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub joints: Vec<[u16; 4]>,
    pub weights: Vec<[f32; 4]>,
    /// Position deltas, one list per morph target
    pub morph_targets: Vec<Vec<Vec3>>,
    /// Indices local to this part
    pub indices: Vec<u32>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Interpolation {
    Step,
    Linear,
}

#[derive(Clone, Debug)]
pub enum ChannelValues {
    Translation(Vec<Vec3>),
    Rotation(Vec<Quat>),
    Scale(Vec<Vec3>),
    /// `targets` weights per keyframe, flattened
    MorphWeights { targets: usize, values: Vec<f32> },
}

#[derive(Clone, Debug)]
pub struct Channel {
    pub node: usize,
    pub interpolation: Interpolation,
    pub times: Vec<f32>,
    pub values: ChannelValues,
}

#[derive(Clone, Debug)]
pub struct AnimationClip {
    pub name: String,
    pub duration: f32,
    pub channels: Vec<Channel>,
}

/// Sampled state of every node for one instant
#[derive(Clone, Debug)]
pub struct SkeletonPose {
    pub locals: Vec<NodeTransform>,
    /// Animated morph weights per morph set, when the clip drives them
    pub morph_weights: Vec<Option<Vec<f32>>>,
}

#[derive(Clone, Debug)]
pub struct CharacterModel {
    pub name: String,
    pub nodes: Vec<Node>,
    pub roots: Vec<usize>,
    pub skins: Vec<Skin>,
    pub parts: Vec<MeshPart>,
    pub morph_sets: Vec<MorphSet>,
    pub clip: AnimationClip,
}

/// Cubic-spline keys are (in-tangent, value, out-tangent) triples; keep the values
fn values_only<T: Copy>(v: Vec<T>, cubic: bool, width: usize) -> Vec<T> {
    if !cubic {
        return v;
    }
    v.chunks(width * 3)
        .filter_map(|c| c.get(width..width * 2))
        .flatten()
        .copied()
        .collect()
}

fn check_attribute(attribute: &'static str, expected: usize, found: usize) -> Result<(), AssetError> {
    if expected == found {
        Ok(())
    } else {
        Err(AssetError::AttributeMismatch { attribute, expected, found })
    }
}

/// Exporters (three.js, Blender) store morph names in `mesh.extras.targetNames`
#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct MeshExtras {
    #[serde(default)]
    target_names: Vec<String>,
}

fn target_names(mesh: &gltf::Mesh<'_>, count: usize) -> Vec<String> {
    let names = mesh
        .extras()
        .as_ref()
        .and_then(|raw| serde_json::from_str::<MeshExtras>(raw.get()).ok())
        .map(|extras| extras.target_names)
        .unwrap_or_default();
    (0..count)
        .map(|k| names.get(k).cloned().unwrap_or_else(|| format!("morph {k}")))
        .collect()
}

/// Keyframe interval containing `time`: (index0, index1, blend factor)
fn find_keyframe(times: &[f32], time: f32) -> Option<(usize, usize, f32)> {
    let last = times.len().checked_sub(1)?;
    if time <= times[0] || last == 0 {
        return Some((0, 0, 0.0));
    }
    if time >= times[last] {
        return Some((last, last, 0.0));
    }
    // First key strictly after `time`
    let hi = times.partition_point(|&t| t <= time);
    let lo = hi - 1;
    let span = times[hi] - times[lo];
    let factor = if span.abs() < 1e-8 { 0.0 } else { (time - times[lo]) / span };
    Some((lo, hi, factor))
}

impl Channel {
    fn apply(&self, time: f32, pose: &mut SkeletonPose, morph_sets: &[Option<usize>]) {
        let Some((i0, i1, t)) = find_keyframe(&self.times, time) else {
            return;
        };
        let t = match self.interpolation {
            Interpolation::Step => 0.0,
            Interpolation::Linear => t,
        };
        let Some(local) = pose.locals.get_mut(self.node) else {
            return;
        };
        match &self.values {
            ChannelValues::Translation(v) => {
                if let (Some(a), Some(b)) = (v.get(i0), v.get(i1)) {
                    local.translation = a.lerp(*b, t);
                }
            }
            ChannelValues::Rotation(v) => {
                if let (Some(a), Some(b)) = (v.get(i0), v.get(i1)) {
                    local.rotation = a.slerp(*b, t).normalize();
                }
            }
            ChannelValues::Scale(v) => {
                if let (Some(a), Some(b)) = (v.get(i0), v.get(i1)) {
                    local.scale = a.lerp(*b, t);
                }
            }
            ChannelValues::MorphWeights { targets, values } => {
                let Some(Some(set)) = morph_sets.get(self.node) else {
                    return;
                };
                let (a, b) = (i0 * targets, i1 * targets);
                if b + targets > values.len() {
                    return;
                }
                let weights = (0..*targets)
                    .map(|k| values[a + k] + (values[b + k] - values[a + k]) * t)
                    .collect();
                if let Some(slot) = pose.morph_weights.get_mut(*set) {
                    *slot = Some(weights);
                }
            }
        }
    }
}

impl CharacterModel {
    /// Parse a self-contained `.glb`
    pub fn from_glb(name: &str, bytes: &[u8]) -> Result<Self, AssetError> {
        let gltf = gltf::Gltf::from_slice(bytes)?;
        let blob: &[u8] = gltf.blob.as_deref().ok_or(AssetError::MissingBinaryChunk)?;
        let document = &gltf.document;
        let buffer_data = move |buffer: gltf::Buffer| match buffer.source() {
            gltf::buffer::Source::Bin => Some(blob),
            gltf::buffer::Source::Uri(_) => None,
        };

        // Nodes and hierarchy
        let mut nodes: Vec<Node> = document
            .nodes()
            .map(|node| {
                let (t, r, s) = node.transform().decomposed();
                Node {
                    name: node.name().unwrap_or("node").to_string(),
                    parent: None,
                    children: node.children().map(|c| c.index()).collect(),
                    transform: NodeTransform {
                        translation: Vec3::from(t),
                        rotation: Quat::from_array(r),
                        scale: Vec3::from(s),
                    },
                    morph_set: None,
                }
            })
            .collect();
        for i in 0..nodes.len() {
            for c in nodes[i].children.clone() {
                if let Some(child) = nodes.get_mut(c) {
                    child.parent = Some(i);
                }
            }
        }
        let roots: Vec<usize> = match document.default_scene().or_else(|| document.scenes().next()) {
            Some(scene) => scene.nodes().map(|n| n.index()).collect(),
            None => (0..nodes.len()).filter(|&i| nodes[i].parent.is_none()).collect(),
        };

        // Skins
        let skins = document
            .skins()
            .map(|skin| {
                let joints: Vec<usize> = skin.joints().map(|j| j.index()).collect();
                let inverse_bind = skin
                    .reader(buffer_data)
                    .read_inverse_bind_matrices()
                    .map(|m| m.map(|c| Mat4::from_cols_array_2d(&c)).collect())
                    .unwrap_or_else(|| vec![Mat4::IDENTITY; joints.len()]);
                Skin { joints, inverse_bind }
            })
            .collect();

        // Meshes
        let mut parts = Vec::new();
        let mut morph_sets: Vec<MorphSet> = Vec::new();
        let mut mesh_morph_set: Vec<Option<usize>> = vec![None; document.meshes().count()];
        for node in document.nodes() {
            let Some(mesh) = node.mesh() else {
                continue;
            };
            let skin = node.skin().map(|s| s.index());
            for primitive in mesh.primitives() {
                if primitive.mode() != gltf::mesh::Mode::Triangles {
                    continue;
                }
                let reader = primitive.reader(buffer_data);
                let positions: Vec<Vec3> = reader
                    .read_positions()
                    .ok_or(AssetError::MissingAttribute("position"))?
                    .map(Vec3::from)
                    .collect();
                let count = positions.len();
                let normals: Vec<Vec3> = reader
                    .read_normals()
                    .map(|n| n.map(Vec3::from).collect())
                    .unwrap_or_else(|| vec![Vec3::Y; count]);
                check_attribute("normal", count, normals.len())?;
                let (joints, weights): (Vec<[u16; 4]>, Vec<[f32; 4]>) =
                    match (reader.read_joints(0), reader.read_weights(0)) {
                        (Some(j), Some(w)) if skin.is_some() => (j.into_u16().collect(), w.into_f32().collect()),
                        _ => (Vec::new(), Vec::new()),
                    };
                if !joints.is_empty() || !weights.is_empty() {
                    check_attribute("joint", count, joints.len())?;
                    check_attribute("weight", count, weights.len())?;
                }
                let indices: Vec<u32> = reader
                    .read_indices()
                    .map(|i| i.into_u32().collect())
                    .unwrap_or_else(|| (0..count as u32).collect());
                if let Some(&index) = indices.iter().find(|&&i| i as usize >= count) {
                    return Err(AssetError::IndexOutOfRange { index, count });
                }
                let morph_targets: Vec<Vec<Vec3>> = reader
                    .read_morph_targets()
                    .map(|(p, _, _)| match p {
                        Some(p) => p.map(Vec3::from).collect(),
                        None => vec![Vec3::ZERO; count],
                    })
                    .collect();
                for (target, deltas) in morph_targets.iter().enumerate() {
                    if deltas.len() != count {
                        return Err(AssetError::MorphTargetMismatch { target, expected: count, found: deltas.len() });
                    }
                }

                let morph_set = if morph_targets.is_empty() {
                    None
                } else {
                    let slot = &mut mesh_morph_set[mesh.index()];
                    if slot.is_none() {
                        let defaults: Vec<f32> = mesh.weights().map(|w| w.to_vec()).unwrap_or_default();
                        let weights = (0..morph_targets.len())
                            .map(|k| defaults.get(k).copied().unwrap_or(0.0))
                            .collect();
                        morph_sets.push(MorphSet {
                            name: mesh.name().unwrap_or("mesh").to_string(),
                            target_names: target_names(&mesh, morph_targets.len()),
                            weights,
                        });
                        *slot = Some(morph_sets.len() - 1);
                    }
                    *slot
                };
                nodes[node.index()].morph_set = nodes[node.index()].morph_set.or(morph_set);

                parts.push(MeshPart {
                    node: node.index(),
                    skin,
                    morph_set,
                    color: primitive.material().pbr_metallic_roughness().base_color_factor(),
                    positions,
                    normals,
                    joints,
                    weights,
                    morph_targets,
                    indices,
                });
            }
        }
        if parts.is_empty() {
            return Err(AssetError::MissingMesh);
        }

        // First animation
        let animation = document.animations().next().ok_or(AssetError::MissingAnimation)?;
        let mut channels = Vec::new();
        let mut duration: f32 = 0.0;
        for channel in animation.channels() {
            let reader = channel.reader(buffer_data);
            let Some(inputs) = reader.read_inputs() else {
                continue;
            };
            let times: Vec<f32> = inputs.collect();
            let (interpolation, cubic) = match channel.sampler().interpolation() {
                gltf::animation::Interpolation::Step => (Interpolation::Step, false),
                gltf::animation::Interpolation::Linear => (Interpolation::Linear, false),
                gltf::animation::Interpolation::CubicSpline => (Interpolation::Linear, true),
            };
            let node = channel.target().node().index();
            let values = match reader.read_outputs() {
                Some(gltf::animation::util::ReadOutputs::Translations(v)) => {
                    ChannelValues::Translation(values_only(v.map(Vec3::from).collect(), cubic, 1))
                }
                Some(gltf::animation::util::ReadOutputs::Rotations(v)) => ChannelValues::Rotation(
                    values_only(v.into_f32().map(Quat::from_array).collect(), cubic, 1),
                ),
                Some(gltf::animation::util::ReadOutputs::Scales(v)) => {
                    ChannelValues::Scale(values_only(v.map(Vec3::from).collect(), cubic, 1))
                }
                Some(gltf::animation::util::ReadOutputs::MorphTargetWeights(v)) => {
                    let raw: Vec<f32> = v.into_f32().collect();
                    let keys = times.len().max(1);
                    let per_key = raw.len() / keys;
                    let targets = if cubic { per_key / 3 } else { per_key };
                    ChannelValues::MorphWeights {
                        targets,
                        values: values_only(raw, cubic, targets.max(1)),
                    }
                }
                None => continue,
            };
            if let Some(&end) = times.last() {
                duration = duration.max(end);
            }
            channels.push(Channel { node, interpolation, times, values });
        }

        let clip = AnimationClip {
            name: animation.name().unwrap_or(name).to_string(),
            duration,
            channels,
        };

        tracing::debug!(
            asset = name,
            nodes = nodes.len(),
            parts = parts.len(),
            morph_sets = morph_sets.len(),
            channels = clip.channels.len(),
            duration = clip.duration,
            "parsed character"
        );

        Ok(Self {
            name: name.to_string(),
            nodes,
            roots,
            skins,
            parts,
            morph_sets,
            clip,
        })
    }

    pub fn vertex_count(&self) -> usize {
        self.parts.iter().map(|p| p.positions.len()).sum()
    }

    /// Sample the clip at `time` on top of the rest pose
    pub fn sample(&self, time: f32) -> SkeletonPose {
        let mut pose = SkeletonPose {
            locals: self.nodes.iter().map(|n| n.transform).collect(),
            morph_weights: vec![None; self.morph_sets.len()],
        };
        let node_morph_sets: Vec<Option<usize>> = self.nodes.iter().map(|n| n.morph_set).collect();
        for channel in &self.clip.channels {
            channel.apply(time, &mut pose, &node_morph_sets);
        }
        pose
    }

    /// World matrix of every node, parents composed before children
    pub fn world_matrices(&self, pose: &SkeletonPose) -> Vec<Mat4> {
        let mut world = vec![Mat4::IDENTITY; self.nodes.len()];
        let mut stack: Vec<(usize, Mat4)> = self.roots.iter().map(|&r| (r, Mat4::IDENTITY)).collect();
        let mut visited = vec![false; self.nodes.len()];
        while let Some((index, parent)) = stack.pop() {
            let Some(local) = pose.locals.get(index) else {
                continue;
            };
            if std::mem::replace(&mut visited[index], true) {
                continue;
            }
            let matrix = parent * local.matrix();
            world[index] = matrix;
            for &child in &self.nodes[index].children {
                stack.push((child, matrix));
            }
        }
        world
    }

    /// Index list shared by every skinned frame
    pub fn mesh_template(&self) -> Mesh {
        let mut mesh = Mesh::empty();
        let mut base = 0u32;
        for part in &self.parts {
            mesh.indices.extend(part.indices.iter().map(|i| i + base));
            mesh.vertices.extend(part.positions.iter().zip(&part.normals).map(|(p, n)| Vertex {
                pos: p.to_array(),
                normal: n.to_array(),
                color: part.color,
            }));
            base += part.positions.len() as u32;
        }
        mesh
    }

    /// Morph then skin every part into `out`, which is cleared first
    pub fn skin_into(&self, pose: &SkeletonPose, morph_weights: &[Vec<f32>], out: &mut Vec<Vertex>) {
        out.clear();
        out.reserve(self.vertex_count());
        let world = self.world_matrices(pose);

        let skin_matrices: Vec<Vec<Mat4>> = self
            .skins
            .iter()
            .map(|skin| {
                skin.joints
                    .iter()
                    .enumerate()
                    .map(|(j, &node)| {
                        let ibm = skin.inverse_bind.get(j).copied().unwrap_or(Mat4::IDENTITY);
                        world.get(node).copied().unwrap_or(Mat4::IDENTITY) * ibm
                    })
                    .collect()
            })
            .collect();

        for part in &self.parts {
            let weights: &[f32] = part
                .morph_set
                .and_then(|s| pose.morph_weights.get(s).and_then(|w| w.as_deref()).or(morph_weights.get(s).map(|w| w.as_slice())))
                .unwrap_or(&[]);
            let node_matrix = world.get(part.node).copied().unwrap_or(Mat4::IDENTITY);
            let joints = part.skin.and_then(|s| skin_matrices.get(s));

            for (i, (&p, &n)) in part.positions.iter().zip(&part.normals).enumerate() {
                let mut position = p;
                for (target, &w) in part.morph_targets.iter().zip(weights) {
                    if let Some(&delta) = target.get(i).filter(|_| w != 0.0) {
                        position += delta * w;
                    }
                }

                let matrix = match (joints, part.joints.get(i), part.weights.get(i)) {
                    (Some(mats), Some(j), Some(w)) => {
                        let mut m = Mat4::ZERO;
                        for k in 0..4 {
                            if w[k] > 0.0 {
                                m += *mats.get(j[k] as usize).unwrap_or(&Mat4::IDENTITY) * w[k];
                            }
                        }
                        if w.iter().sum::<f32>() <= 0.0 { node_matrix } else { m }
                    }
                    _ => node_matrix,
                };

                out.push(Vertex {
                    pos: matrix.transform_point3(position).to_array(),
                    normal: matrix.transform_vector3(n).normalize_or_zero().to_array(),
                    color: part.color,
                });
            }
        }
    }
}

/// Clip playback clock; `time_scale` 0 pauses, 1 plays at normal speed
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AnimationMixer {
    pub time: f32,
    pub time_scale: f32,
}

impl AnimationMixer {
    pub fn new() -> Self {
        Self {
            time: 0.0,
            time_scale: 1.0,
        }
    }

    /// Advance by `dt` scaled by `time_scale`, looping over `duration`
    pub fn update(&mut self, dt: f32, duration: f32) {
        self.time += dt * self.time_scale;
        if duration > 0.0 {
            self.time = self.time.rem_euclid(duration);
        } else {
            self.time = 0.0;
        }
    }
}

impl Default for AnimationMixer {
    fn default() -> Self {
        Self::new()
    }
}

/// A loaded model placed in the scene
#[derive(Clone, Debug)]
pub struct Character {
    pub model: CharacterModel,
    pub mixer: AnimationMixer,
    pub position: Vec3,
    /// Weights edited from the UI, one list per morph set
    pub morph_weights: Vec<Vec<f32>>,
}

impl Character {
    pub fn new(model: CharacterModel) -> Self {
        let morph_weights = model.morph_sets.iter().map(|s| s.weights.clone()).collect();
        Self {
            model,
            mixer: AnimationMixer::new(),
            position: Vec3::ZERO,
            morph_weights,
        }
    }

    pub fn has_morphs(&self) -> bool {
        !self.model.morph_sets.is_empty()
    }

    pub fn advance(&mut self, dt: f32) {
        self.mixer.update(dt, self.model.clip.duration);
    }

    pub fn model_matrix(&self) -> Mat4 {
        Mat4::from_translation(self.position)
    }

    /// Current skinned vertices in model space
    pub fn skin_into(&self, out: &mut Vec<Vertex>) {
        let pose = self.model.sample(self.mixer.time);
        self.model.skin_into(&pose, &self.morph_weights, out);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Two-bone model: a root joint and a child joint one unit up, with a
    /// single vertex skinned fully to the child and one morph target
    pub(crate) fn two_bone_model() -> CharacterModel {
        let nodes = vec![
            Node {
                name: "root".into(),
                parent: None,
                children: vec![1],
                transform: NodeTransform::IDENTITY,
                morph_set: None,
            },
            Node {
                name: "child".into(),
                parent: Some(0),
                children: vec![],
                transform: NodeTransform {
                    translation: Vec3::Y,
                    ..NodeTransform::IDENTITY
                },
                morph_set: None,
            },
            Node {
                name: "mesh".into(),
                parent: None,
                children: vec![],
                transform: NodeTransform::IDENTITY,
                morph_set: Some(0),
            },
        ];
        let skin = Skin {
            joints: vec![0, 1],
            inverse_bind: vec![Mat4::IDENTITY, Mat4::from_translation(-Vec3::Y)],
        };
        let part = MeshPart {
            node: 2,
            skin: Some(0),
            morph_set: Some(0),
            color: [1.0; 4],
            positions: vec![Vec3::new(0.0, 1.0, 0.0)],
            normals: vec![Vec3::X],
            joints: vec![[1, 0, 0, 0]],
            weights: vec![[1.0, 0.0, 0.0, 0.0]],
            morph_targets: vec![vec![Vec3::new(0.0, 0.0, 1.0)]],
            indices: vec![0, 0, 0],
        };
        let clip = AnimationClip {
            name: "slide".into(),
            duration: 2.0,
            channels: vec![Channel {
                node: 0,
                interpolation: Interpolation::Linear,
                times: vec![0.0, 2.0],
                values: ChannelValues::Translation(vec![Vec3::ZERO, Vec3::new(4.0, 0.0, 0.0)]),
            }],
        };
        CharacterModel {
            name: "two-bone".into(),
            nodes,
            roots: vec![0, 2],
            skins: vec![skin],
            parts: vec![part],
            morph_sets: vec![MorphSet {
                name: "mesh".into(),
                target_names: vec!["morph 0".into()],
                weights: vec![0.0],
            }],
            clip,
        }
    }

    #[test]
    fn test_find_keyframe() {
        let times = [0.0, 1.0, 3.0];
        assert_eq!(find_keyframe(&times, -1.0), Some((0, 0, 0.0)));
        assert_eq!(find_keyframe(&times, 2.0), Some((1, 2, 0.5)));
        assert_eq!(find_keyframe(&times, 1.0), Some((1, 2, 0.0)));
        assert_eq!(find_keyframe(&times, 5.0), Some((2, 2, 0.0)));
        assert_eq!(find_keyframe(&[], 1.0), None);
    }

    #[test]
    fn test_sample_interpolates_translation() {
        let model = two_bone_model();
        let pose = model.sample(1.0);
        assert_eq!(pose.locals[0].translation, Vec3::new(2.0, 0.0, 0.0));
        assert_eq!(pose.locals[1].translation, Vec3::Y, "unanimated nodes keep the rest pose");
    }

    #[test]
    fn test_skinning_follows_animated_joint() {
        let model = two_bone_model();
        let mut out = Vec::new();

        model.skin_into(&model.sample(0.0), &[vec![0.0]], &mut out);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].pos, [0.0, 1.0, 0.0], "bind pose reproduces the mesh");

        model.skin_into(&model.sample(1.0), &[vec![0.0]], &mut out);
        assert_eq!(out[0].pos, [2.0, 1.0, 0.0]);
    }

    #[test]
    fn test_morph_weights_offset_vertices() {
        let model = two_bone_model();
        let mut out = Vec::new();
        model.skin_into(&model.sample(0.0), &[vec![0.5]], &mut out);
        assert_eq!(out[0].pos, [0.0, 1.0, 0.5]);
    }

    #[test]
    fn test_mixer_pauses_and_loops() {
        let mut mixer = AnimationMixer::new();
        mixer.update(0.5, 2.0);
        assert_eq!(mixer.time, 0.5);

        mixer.time_scale = 0.0;
        mixer.update(10.0, 2.0);
        assert_eq!(mixer.time, 0.5, "paused mixer must not advance");

        mixer.time_scale = 1.0;
        mixer.update(2.0, 2.0);
        assert_eq!(mixer.time, 0.5, "time wraps around the clip duration");
    }

    #[test]
    fn test_mesh_template_offsets_indices() {
        let mut model = two_bone_model();
        let mut second = model.parts[0].clone();
        second.indices = vec![0, 0, 0];
        model.parts.push(second);
        let mesh = model.mesh_template();
        assert_eq!(mesh.vertices.len(), 2);
        assert_eq!(mesh.indices, vec![0, 0, 0, 1, 1, 1]);
    }

    #[test]
    fn test_garbage_bytes_are_rejected() {
        assert!(CharacterModel::from_glb("broken", b"not a glb").is_err());
    }

    fn floats(values: &[f32]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    fn pack_glb(json: &str, bin: &[u8]) -> Vec<u8> {
        let mut json = json.as_bytes().to_vec();
        while json.len() % 4 != 0 {
            json.push(b' ');
        }
        let mut bin = bin.to_vec();
        while bin.len() % 4 != 0 {
            bin.push(0);
        }
        let total = 12 + 8 + json.len() + 8 + bin.len();
        let mut out = Vec::with_capacity(total);
        out.extend_from_slice(b"glTF");
        out.extend_from_slice(&2u32.to_le_bytes());
        out.extend_from_slice(&(total as u32).to_le_bytes());
        out.extend_from_slice(&(json.len() as u32).to_le_bytes());
        out.extend_from_slice(b"JSON");
        out.extend_from_slice(&json);
        out.extend_from_slice(&(bin.len() as u32).to_le_bytes());
        out.extend_from_slice(b"BIN\0");
        out.extend_from_slice(&bin);
        out
    }

    /// Three-vertex skinned triangle with one named morph target, a linear
    /// translation track on the bone and a cubic-spline scale track on the root
    fn triangle_glb(target_count: u32, weight_count: u32) -> Vec<u8> {
        let views_data: Vec<Vec<u8>> = vec![
            floats(&[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]),
            floats(&[0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0]),
            [0u16; 12].iter().flat_map(|v| v.to_le_bytes()).collect(),
            floats(&[1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0]),
            floats(&Mat4::from_translation(-Vec3::Y).to_cols_array()),
            floats(&[0.0, 1.0]),
            floats(&[0.0, 1.0, 0.0, 0.0, 3.0, 0.0]),
            floats(&[0.0, 2.0]),
            floats(&[
                9.0, 9.0, 9.0, 1.0, 1.0, 1.0, 9.0, 9.0, 9.0, //
                9.0, 9.0, 9.0, 2.0, 2.0, 2.0, 9.0, 9.0, 9.0,
            ]),
        ];
        let mut bin = Vec::new();
        let mut views = Vec::new();
        for data in &views_data {
            views.push(format!(r#"{{"buffer":0,"byteOffset":{},"byteLength":{}}}"#, bin.len(), data.len()));
            bin.extend_from_slice(data);
        }

        let json = format!(
            r#"{{
"asset":{{"version":"2.0"}},
"scene":0,
"scenes":[{{"nodes":[0]}}],
"nodes":[
  {{"name":"root","children":[1,2]}},
  {{"name":"body","mesh":0,"skin":0}},
  {{"name":"bone","translation":[0,1,0]}}
],
"meshes":[{{"name":"face","weights":[0.25],"extras":{{"targetNames":["smile"]}},
  "primitives":[{{"attributes":{{"POSITION":0,"JOINTS_0":2,"WEIGHTS_0":3}},"targets":[{{"POSITION":1}}]}}]}}],
"skins":[{{"inverseBindMatrices":4,"joints":[2]}}],
"animations":[{{"name":"wave",
  "samplers":[{{"input":5,"output":6,"interpolation":"LINEAR"}},{{"input":7,"output":8,"interpolation":"CUBICSPLINE"}}],
  "channels":[{{"sampler":0,"target":{{"node":2,"path":"translation"}}}},{{"sampler":1,"target":{{"node":0,"path":"scale"}}}}]}}],
"accessors":[
  {{"bufferView":0,"componentType":5126,"count":3,"type":"VEC3","min":[0,0,0],"max":[1,1,0]}},
  {{"bufferView":1,"componentType":5126,"count":{target_count},"type":"VEC3","min":[0,0,1],"max":[0,0,1]}},
  {{"bufferView":2,"componentType":5123,"count":3,"type":"VEC4"}},
  {{"bufferView":3,"componentType":5126,"count":{weight_count},"type":"VEC4"}},
  {{"bufferView":4,"componentType":5126,"count":1,"type":"MAT4"}},
  {{"bufferView":5,"componentType":5126,"count":2,"type":"SCALAR","min":[0],"max":[1]}},
  {{"bufferView":6,"componentType":5126,"count":2,"type":"VEC3"}},
  {{"bufferView":7,"componentType":5126,"count":2,"type":"SCALAR","min":[0],"max":[2]}},
  {{"bufferView":8,"componentType":5126,"count":6,"type":"VEC3"}}
],
"bufferViews":[{views}],
"buffers":[{{"byteLength":{bin_len}}}]
}}"#,
            views = views.join(","),
            bin_len = bin.len(),
        );
        pack_glb(&json, &bin)
    }

    fn assert_close(a: Vec3, b: Vec3) {
        assert!(a.abs_diff_eq(b, 1e-5), "expected {b:?}, got {a:?}");
    }

    #[test]
    fn test_glb_import_reads_hierarchy_skin_morphs_and_clip() {
        let model = CharacterModel::from_glb("triangle", &triangle_glb(3, 3)).unwrap();

        assert_eq!(model.nodes.len(), 3);
        assert_eq!(model.roots, vec![0]);
        assert_eq!(model.nodes[0].parent, None);
        assert_eq!(model.nodes[1].parent, Some(0));
        assert_eq!(model.nodes[2].parent, Some(0));

        assert_eq!(model.skins.len(), 1);
        assert_eq!(model.skins[0].joints, vec![2]);
        assert_close(model.skins[0].inverse_bind[0].w_axis.truncate(), -Vec3::Y);

        assert_eq!(model.morph_sets.len(), 1);
        assert_eq!(model.morph_sets[0].name, "face");
        assert_eq!(model.morph_sets[0].target_names, vec!["smile".to_string()]);
        assert_eq!(model.morph_sets[0].weights, vec![0.25]);
        assert_eq!(model.nodes[1].morph_set, Some(0));
        assert_eq!(model.parts[0].indices, vec![0, 1, 2], "unindexed primitives get a sequential list");

        assert_eq!(model.clip.name, "wave");
        assert_eq!(model.clip.duration, 2.0);
        assert_eq!(model.clip.channels.len(), 2);
        match &model.clip.channels[1].values {
            ChannelValues::Scale(values) => assert_eq!(values, &vec![Vec3::ONE, Vec3::splat(2.0)]),
            other => panic!("expected a scale track, got {other:?}"),
        }

        let pose = model.sample(0.5);
        assert_close(pose.locals[2].translation, Vec3::new(0.0, 2.0, 0.0));
        assert_close(model.sample(1.0).locals[0].scale, Vec3::splat(1.5));
    }

    #[test]
    fn test_imported_bind_pose_applies_default_morph_weights() {
        let model = CharacterModel::from_glb("triangle", &triangle_glb(3, 3)).unwrap();
        let weights: Vec<Vec<f32>> = model.morph_sets.iter().map(|s| s.weights.clone()).collect();
        let mut out = Vec::new();
        model.skin_into(&model.sample(0.0), &weights, &mut out);
        assert_eq!(out.len(), 3);
        assert_close(Vec3::from(out[0].pos), Vec3::new(0.0, 0.0, 0.25));
        assert_close(Vec3::from(out[1].pos), Vec3::new(1.0, 0.0, 0.25));
    }

    #[test]
    fn test_short_morph_target_is_rejected() {
        let result = CharacterModel::from_glb("triangle", &triangle_glb(1, 3));
        assert!(
            matches!(result, Err(AssetError::MorphTargetMismatch { target: 0, expected: 3, found: 1 })),
            "got {result:?}"
        );
    }

    #[test]
    fn test_short_weight_list_is_rejected() {
        let result = CharacterModel::from_glb("triangle", &triangle_glb(3, 2));
        assert!(result.is_err(), "a weight list shorter than the vertex list must not load");
    }

    #[test]
    fn test_skinning_tolerates_short_morph_target() {
        let mut model = two_bone_model();
        model.parts[0].morph_targets = vec![Vec::new()];
        let mut out = Vec::new();
        model.skin_into(&model.sample(0.0), &[vec![1.0]], &mut out);
        assert_eq!(out[0].pos, [0.0, 1.0, 0.0]);
    }
}
