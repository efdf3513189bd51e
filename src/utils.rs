use wgpu::util::DeviceExt;
use bytemuck::NoUninit;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, NoUninit)]
pub struct Vertex {
    pub pos: [f32; 3],
    pub normal: [f32; 3],
    pub color: [f32; 4],
}

pub struct MeshBuffer {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
    pub vertex_count: u32,
}

impl MeshBuffer {
    /// Free the GPU memory now instead of waiting for the drop
    pub fn destroy(&self) {
        self.vertex_buffer.destroy();
        self.index_buffer.destroy();
    }
}

#[derive(Debug, Clone, Default)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl Mesh {
    pub fn empty() -> Self {
        Self {
            vertices: Vec::new(),
            indices: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() && self.indices.is_empty()
    }

    pub fn upload(&self, device: &wgpu::Device) -> MeshBuffer {
        self.upload_with_usage(device, wgpu::BufferUsages::VERTEX)
    }

    /// Upload with a vertex buffer that can be rewritten every frame
    pub fn upload_dynamic(&self, device: &wgpu::Device) -> MeshBuffer {
        self.upload_with_usage(device, wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST)
    }

    fn upload_with_usage(&self, device: &wgpu::Device, vertex_usage: wgpu::BufferUsages) -> MeshBuffer {
        let vertices = bytemuck::cast_slice(&self.vertices);
        let indices = bytemuck::cast_slice(&self.indices);

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Mesh Vertex Buffer"),
            contents: vertices,
            usage: vertex_usage,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Mesh Index Buffer"),
            contents: indices,
            usage: wgpu::BufferUsages::INDEX,
        });

        MeshBuffer {
            vertex_buffer,
            index_buffer,
            index_count: self.indices.len() as u32,
            vertex_count: self.vertices.len() as u32,
        }
    }
}

/// Unit UV sphere centred at the origin
pub fn create_sphere_mesh(width_segments: u32, height_segments: u32, color: [f32; 4]) -> Mesh {
    let width_segments = width_segments.max(3);
    let height_segments = height_segments.max(2);
    let mut vertices = Vec::with_capacity(((width_segments + 1) * (height_segments + 1)) as usize);
    let mut indices = Vec::new();

    for iy in 0..=height_segments {
        let v = iy as f32 / height_segments as f32;
        let theta = v * std::f32::consts::PI;
        for ix in 0..=width_segments {
            let u = ix as f32 / width_segments as f32;
            let phi = u * std::f32::consts::TAU;
            let n = [
                -phi.cos() * theta.sin(),
                theta.cos(),
                phi.sin() * theta.sin(),
            ];
            vertices.push(Vertex { pos: n, normal: n, color });
        }
    }

    let row = width_segments + 1;
    for iy in 0..height_segments {
        for ix in 0..width_segments {
            let a = iy * row + ix + 1;
            let b = iy * row + ix;
            let c = (iy + 1) * row + ix;
            let d = (iy + 1) * row + ix + 1;
            // Skip the degenerate triangles at the poles
            if iy != 0 {
                indices.extend_from_slice(&[a, b, d]);
            }
            if iy != height_segments - 1 {
                indices.extend_from_slice(&[b, c, d]);
            }
        }
    }

    Mesh { vertices, indices }
}

/// HSL (all components in [0, 1]) to linear-ish RGB
pub fn hsl_to_rgb(h: f32, s: f32, l: f32) -> [f32; 3] {
    if s == 0.0 {
        return [l, l, l];
    }
    let q = if l <= 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let p = 2.0 * l - q;
    let hue = |t: f32| {
        let t = t.rem_euclid(1.0);
        if t < 1.0 / 6.0 {
            p + (q - p) * 6.0 * t
        } else if t < 0.5 {
            q
        } else if t < 2.0 / 3.0 {
            p + (q - p) * 6.0 * (2.0 / 3.0 - t)
        } else {
            p
        }
    };
    [hue(h + 1.0 / 3.0), hue(h), hue(h - 1.0 / 3.0)]
}

/// 0xRRGGBB to RGB floats
pub fn rgb_from_hex(hex: u32) -> [f32; 3] {
    [
        ((hex >> 16) & 0xff) as f32 / 255.0,
        ((hex >> 8) & 0xff) as f32 / 255.0,
        (hex & 0xff) as f32 / 255.0,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sphere_vertices_on_unit_sphere() {
        let mesh = create_sphere_mesh(32, 32, [1.0; 4]);
        assert_eq!(mesh.vertices.len(), 33 * 33);
        assert_eq!(mesh.indices.len() % 3, 0);
        for v in &mesh.vertices {
            let len = (v.pos[0].powi(2) + v.pos[1].powi(2) + v.pos[2].powi(2)).sqrt();
            assert!((len - 1.0).abs() < 1e-4);
        }
        let max = *mesh.indices.iter().max().unwrap();
        assert!((max as usize) < mesh.vertices.len());
    }

    #[test]
    fn test_hsl_primaries() {
        let red = hsl_to_rgb(0.0, 1.0, 0.5);
        assert!((red[0] - 1.0).abs() < 1e-6 && red[1].abs() < 1e-6 && red[2].abs() < 1e-6);
        let grey = hsl_to_rgb(0.7, 0.0, 0.25);
        assert_eq!(grey, [0.25, 0.25, 0.25]);
    }

    #[test]
    fn test_hex_colors() {
        assert_eq!(rgb_from_hex(0xff0000), [1.0, 0.0, 0.0]);
        assert_eq!(rgb_from_hex(0x00ff00), [0.0, 1.0, 0.0]);
    }
}
