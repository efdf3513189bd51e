// terrain.rs - Procedural scene content
//
// Everything random in the scene comes from one seeded generator so a given
// seed always produces the same floor, star layout and starfield:
//
//   floor      → flat grid in XZ, every vertex jittered, pastel HSL colors
//   stars      → sphere centres scattered over the floor, above the ground
//   particles  → points uniformly filling a cube around the origin
//   grid       → helper lines on the ground plane

use glam::Vec3;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::config::SceneConfig;
use crate::utils::{hsl_to_rgb, Mesh, Vertex};

pub struct TerrainGenerator {
    config: SceneConfig,
    rng: SmallRng,
}

impl TerrainGenerator {
    pub fn new(config: SceneConfig) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(config.seed),
            config,
        }
    }

    /// Floor plane with `segments × segments` cells, jittered and vertex colored
    pub fn floor(&mut self) -> Mesh {
        let segments = self.config.floor_segments.max(1);
        let size = self.config.floor_size;
        let jitter = self.config.floor_jitter;
        let step = size / segments as f32;
        let half = size / 2.0;
        let row = segments + 1;

        let mut vertices = Vec::with_capacity((row * row) as usize);
        for iz in 0..=segments {
            for ix in 0..=segments {
                let x = -half + ix as f32 * step + self.rng.gen::<f32>() * jitter;
                let y = self.rng.gen::<f32>() * jitter;
                let z = -half + iz as f32 * step + self.rng.gen::<f32>() * jitter;
                vertices.push(Vertex {
                    pos: [x, y, z],
                    normal: [0.0, 1.0, 0.0],
                    color: [1.0; 4],
                });
            }
        }

        for v in vertices.iter_mut() {
            let hue = self.rng.gen::<f32>() * 0.3 + 0.5;
            let lightness = self.rng.gen::<f32>() * 0.25 + 0.75;
            let [r, g, b] = hsl_to_rgb(hue, 0.75, lightness);
            v.color = [r, g, b, 1.0];
        }

        let mut indices = Vec::with_capacity((segments * segments * 6) as usize);
        for iz in 0..segments {
            for ix in 0..segments {
                let a = iz * row + ix;
                let b = a + 1;
                let c = a + row;
                let d = c + 1;
                indices.extend_from_slice(&[a, c, b, b, c, d]);
            }
        }

        let mut mesh = Mesh { vertices, indices };
        flat_shade(&mut mesh);
        mesh
    }

    /// Centres for the star spheres
    pub fn star_positions(&mut self) -> Vec<Vec3> {
        let spread = self.config.star_spread;
        (0..self.config.star_count)
            .map(|_| {
                Vec3::new(
                    self.rng.gen::<f32>() * spread - spread / 2.0,
                    self.rng.gen::<f32>() * self.config.star_height_range + self.config.star_min_height,
                    self.rng.gen::<f32>() * spread - spread / 2.0,
                )
            })
            .collect()
    }

    /// One color shared by every star
    pub fn star_color(&mut self) -> [f32; 4] {
        [self.rng.gen(), self.rng.gen(), self.rng.gen(), 1.0]
    }

    /// White points filling a cube of `particle_spread` around the origin
    pub fn particles(&mut self) -> Mesh {
        let spread = self.config.particle_spread;
        let count = self.config.particle_count;
        let mut vertices = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let x = self.rng.gen::<f32>() * spread - spread / 2.0;
            let y = self.rng.gen::<f32>() * spread - spread / 2.0;
            let z = self.rng.gen::<f32>() * spread - spread / 2.0;
            vertices.push(Vertex {
                pos: [x, y, z],
                normal: [0.0, 1.0, 0.0],
                color: [1.0, 1.0, 1.0, 1.0],
            });
        }
        let indices = (0..count).collect();
        Mesh { vertices, indices }
    }

    /// Line list of the ground helper grid
    pub fn grid(&self) -> Mesh {
        let divisions = self.config.grid_divisions.max(1);
        let size = self.config.grid_size;
        let half = size / 2.0;
        let step = size / divisions as f32;
        let color = [0.0, 1.0, 0.0, self.config.grid_opacity];

        let mut vertices = Vec::with_capacity(((divisions + 1) * 4) as usize);
        for i in 0..=divisions {
            let k = -half + i as f32 * step;
            for pos in [[-half, 0.0, k], [half, 0.0, k], [k, 0.0, -half], [k, 0.0, half]] {
                vertices.push(Vertex { pos, normal: [0.0, 1.0, 0.0], color });
            }
        }
        let indices = (0..vertices.len() as u32).collect();
        Mesh { vertices, indices }
    }
}

/// Un-index a triangle mesh so each face gets its own normal
fn flat_shade(mesh: &mut Mesh) {
    let mut vertices = Vec::with_capacity(mesh.indices.len());
    for tri in mesh.indices.chunks_exact(3) {
        let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| mesh.vertices[i as usize]);
        let pa = Vec3::from(a.pos);
        let normal = (Vec3::from(b.pos) - pa).cross(Vec3::from(c.pos) - pa).normalize_or_zero();
        for mut v in [a, b, c] {
            v.normal = normal.to_array();
            vertices.push(v);
        }
    }
    mesh.indices = (0..vertices.len() as u32).collect();
    mesh.vertices = vertices;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> SceneConfig {
        SceneConfig {
            floor_segments: 4,
            star_count: 64,
            particle_count: 128,
            ..SceneConfig::default()
        }
    }

    #[test]
    fn test_floor_faces_up_and_stays_in_bounds() {
        let config = small_config();
        let mesh = TerrainGenerator::new(config).floor();
        assert_eq!(mesh.vertices.len(), 4 * 4 * 6);
        let half = config.floor_size / 2.0;
        for v in &mesh.vertices {
            assert!(v.normal[1] > 0.9, "floor faces must point up");
            assert!(v.pos[0] >= -half && v.pos[0] <= half + config.floor_jitter);
            assert!(v.pos[1] >= 0.0 && v.pos[1] < config.floor_jitter);
            assert!(v.color[0] >= 0.0 && v.color[0] <= 1.0);
        }
    }

    #[test]
    fn test_stars_spawn_above_ground() {
        let config = small_config();
        let stars = TerrainGenerator::new(config).star_positions();
        assert_eq!(stars.len(), 64);
        for p in stars {
            assert!(p.y >= config.star_min_height);
            assert!(p.y < config.star_min_height + config.star_height_range);
            assert!(p.x.abs() <= config.star_spread / 2.0);
            assert!(p.z.abs() <= config.star_spread / 2.0);
        }
    }

    #[test]
    fn test_same_seed_same_scene() {
        let config = small_config();
        let a = TerrainGenerator::new(config).star_positions();
        let b = TerrainGenerator::new(config).star_positions();
        assert_eq!(a, b);
    }

    #[test]
    fn test_grid_is_a_line_list() {
        let grid = TerrainGenerator::new(small_config()).grid();
        assert_eq!(grid.vertices.len(), 21 * 4);
        assert_eq!(grid.indices.len() % 2, 0);
    }
}
