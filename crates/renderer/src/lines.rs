use bytemuck::{Pod, Zeroable};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Number of vertices in the line set; consecutive pairs form one segment.
pub const LINE_VERTEX_COUNT: usize = 1500;

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LineVertex {
    pub position: [f32; 3],
}

unsafe impl Zeroable for LineVertex {}
unsafe impl Pod for LineVertex {}

/// Immutable random point cloud drawn as a line list.
///
/// `x` and `y` lie in `[-1, 1]`, `z` in `[0, 1)`.
#[derive(Clone, Debug)]
pub struct LineSet {
    vertices: Vec<LineVertex>,
}

impl LineSet {
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let vertices = (0..LINE_VERTEX_COUNT)
            .map(|_| LineVertex {
                position: [
                    rng.gen::<f32>() * 2.0 - 1.0,
                    rng.gen::<f32>() * 2.0 - 1.0,
                    rng.gen::<f32>(),
                ],
            })
            .collect();
        Self { vertices }
    }

    pub fn from_seed(seed: u64) -> Self {
        Self::generate(&mut StdRng::seed_from_u64(seed))
    }

    pub fn from_entropy() -> Self {
        Self::generate(&mut StdRng::from_entropy())
    }

    pub fn vertices(&self) -> &[LineVertex] {
        &self.vertices
    }

    pub fn segment_count(&self) -> u32 {
        (self.vertices.len() / 2) as u32
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_expected_vertex_count() {
        let set = LineSet::from_seed(7);
        assert_eq!(set.vertices().len(), LINE_VERTEX_COUNT);
        assert_eq!(set.segment_count(), 750);
        assert_eq!(set.as_bytes().len(), LINE_VERTEX_COUNT * 12);
    }

    #[test]
    fn coordinates_stay_in_range() {
        let set = LineSet::from_seed(42);
        for vertex in set.vertices() {
            let [x, y, z] = vertex.position;
            assert!((-1.0..=1.0).contains(&x));
            assert!((-1.0..=1.0).contains(&y));
            assert!((0.0..1.0).contains(&z));
        }
    }

    #[test]
    fn same_seed_is_reproducible() {
        let a = LineSet::from_seed(1234);
        let b = LineSet::from_seed(1234);
        let c = LineSet::from_seed(4321);
        assert_eq!(a.vertices(), b.vertices());
        assert_ne!(a.vertices(), c.vertices());
    }
}
