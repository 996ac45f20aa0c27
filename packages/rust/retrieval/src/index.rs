//! Nearest-neighbour index.

use serde::Serialize;

use papercorpus_shared::{CorpusError, Result};

/// One search result: squared L2 distance and insertion position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Neighbor {
    pub distance: f32,
    pub index: usize,
}

/// Vector index capability.
pub trait VectorIndex: Send + Sync {
    /// Append vectors; positions continue from the current [`len`](Self::len).
    fn add(&mut self, vectors: &[Vec<f32>]) -> Result<()>;

    /// Up to `top_k` nearest vectors, nearest first.
    fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<Neighbor>>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Exhaustive index over squared Euclidean distance.
///
/// The dimension is fixed by the first vector added.
#[derive(Debug, Clone, Default)]
pub struct FlatL2Index {
    dimensions: Option<usize>,
    data: Vec<f32>,
}

impl FlatL2Index {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an index with a fixed, non-zero dimension.
    pub fn with_dimensions(dimensions: usize) -> Result<Self> {
        if dimensions == 0 {
            return Err(CorpusError::retrieval("index dimension must be at least 1"));
        }
        Ok(Self {
            dimensions: Some(dimensions),
            data: Vec::new(),
        })
    }

    pub fn dimensions(&self) -> Option<usize> {
        self.dimensions
    }

    fn check_dimensions(&self, expected: usize, got: usize) -> Result<()> {
        if expected != got {
            return Err(CorpusError::retrieval(format!(
                "vector has {got} dimensions, index expects {expected}"
            )));
        }
        Ok(())
    }
}

impl VectorIndex for FlatL2Index {
    fn add(&mut self, vectors: &[Vec<f32>]) -> Result<()> {
        let Some(first) = vectors.first() else {
            return Ok(());
        };
        let dims = self.dimensions.unwrap_or(first.len());
        if dims == 0 {
            return Err(CorpusError::retrieval("cannot index zero-length vectors"));
        }
        // Validate the whole batch before touching the index.
        for v in vectors {
            self.check_dimensions(dims, v.len())?;
        }

        self.dimensions = Some(dims);
        self.data.reserve(dims * vectors.len());
        for v in vectors {
            self.data.extend_from_slice(v);
        }
        Ok(())
    }

    fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<Neighbor>> {
        let Some(dims) = self.dimensions else {
            return Ok(Vec::new());
        };
        self.check_dimensions(dims, query.len())?;

        let mut neighbors: Vec<Neighbor> = self
            .data
            .chunks_exact(dims)
            .enumerate()
            .map(|(index, v)| Neighbor {
                distance: squared_l2(query, v),
                index,
            })
            .collect();

        neighbors.sort_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then(a.index.cmp(&b.index))
        });
        neighbors.truncate(top_k);
        Ok(neighbors)
    }

    fn len(&self) -> usize {
        self.dimensions.map_or(0, |d| self.data.len() / d)
    }
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}
