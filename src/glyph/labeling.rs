//! Two-pass connected-component labeling (4-connectivity).
//!
//! Pass 1 scans in raster order and gives each ink pixel a provisional label
//! taken from its west or north neighbor, recording equivalences in a
//! union-find forest whenever both neighbors carry different labels.
//! Pass 2 rewrites each provisional label to its root. The surviving roots
//! are then renumbered densely (1..=n) in ascending root order.

use super::binarize::BinaryMatrix;

/// Label reserved for paper pixels. Never assigned to a component.
pub const BACKGROUND: u32 = 0;

/// Disjoint-set forest over provisional labels.
///
/// Slot 0 is the background sentinel and is never unioned. Roots are always
/// the smallest label of their set.
#[derive(Debug, Clone)]
struct UnionFind {
    parent: Vec<u32>,
}

impl UnionFind {
    fn new() -> Self {
        Self {
            parent: vec![BACKGROUND],
        }
    }

    fn make_set(&mut self) -> u32 {
        let label = self.parent.len() as u32;
        self.parent.push(label);
        label
    }

    fn len(&self) -> usize {
        self.parent.len()
    }

    fn find(&mut self, mut label: u32) -> u32 {
        // Path halving
        while self.parent[label as usize] != label {
            let grandparent = self.parent[self.parent[label as usize] as usize];
            self.parent[label as usize] = grandparent;
            label = grandparent;
        }
        label
    }

    fn union(&mut self, a: u32, b: u32) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            self.parent[ra.max(rb) as usize] = ra.min(rb);
        }
    }
}

/// Component labels for every pixel of a binary matrix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelMatrix {
    width: u32,
    height: u32,
    labels: Vec<u32>,
    component_count: u32,
}

impl LabelMatrix {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Number of components; ids run from 1 to this value.
    pub fn component_count(&self) -> u32 {
        self.component_count
    }

    pub fn get(&self, x: u32, y: u32) -> u32 {
        self.labels[(y as usize) * (self.width as usize) + (x as usize)]
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.labels
    }
}

/// Pass 1: provisional labels plus the equivalences found between them.
fn provisional_labels(matrix: &BinaryMatrix) -> (Vec<u32>, UnionFind) {
    let (width, height) = (matrix.width() as usize, matrix.height() as usize);
    let mut labels = vec![BACKGROUND; width * height];
    let mut equivalence = UnionFind::new();

    for y in 0..height {
        for x in 0..width {
            if !matrix.is_ink(x as u32, y as u32) {
                continue;
            }

            let west = if x > 0 { labels[y * width + x - 1] } else { BACKGROUND };
            let north = if y > 0 { labels[(y - 1) * width + x] } else { BACKGROUND };

            labels[y * width + x] = match (west, north) {
                (BACKGROUND, BACKGROUND) => equivalence.make_set(),
                (w, BACKGROUND) => w,
                (BACKGROUND, n) => n,
                (w, n) => {
                    if w != n {
                        equivalence.union(w, n);
                    }
                    w.min(n)
                }
            };
        }
    }

    (labels, equivalence)
}

/// Pass 2: rewrites every provisional label to its equivalence root.
fn resolve_roots(provisional: &[u32], equivalence: &mut UnionFind) -> Vec<u32> {
    provisional
        .iter()
        .map(|&label| {
            if label == BACKGROUND {
                BACKGROUND
            } else {
                equivalence.find(label)
            }
        })
        .collect()
}

/// Renumbers roots densely, preserving ascending root order.
fn densify(roots: &[u32], label_space: usize) -> (Vec<u32>, u32) {
    let mut present = vec![false; label_space];
    for &root in roots {
        present[root as usize] = true;
    }

    let mut dense = vec![BACKGROUND; label_space];
    let mut next = 0u32;
    for (root, _) in present.iter().enumerate().skip(1).filter(|(_, p)| **p) {
        next += 1;
        dense[root] = next;
    }

    (roots.iter().map(|&root| dense[root as usize]).collect(), next)
}

/// Labels every maximal 4-connected ink blob of `matrix`.
///
/// Paper pixels get [`BACKGROUND`]; components are numbered 1..=n in the
/// raster order of their first pixel.
pub fn label_components(matrix: &BinaryMatrix) -> LabelMatrix {
    let (provisional, mut equivalence) = provisional_labels(matrix);
    let roots = resolve_roots(&provisional, &mut equivalence);
    let (labels, component_count) = densify(&roots, equivalence.len());

    LabelMatrix {
        width: matrix.width(),
        height: matrix.height(),
        labels,
        component_count,
    }
}
