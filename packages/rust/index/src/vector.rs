//! Flat inner-product vector storage.

use std::cmp::Ordering;

use tracing::debug;

use docqa_shared::{ChunkId, DocQaError, Result};

/// One scored neighbor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchHit {
    /// Insertion position of the matched vector.
    pub id: ChunkId,
    /// Inner product with the query.
    pub score: f32,
}

/// Exact (brute-force) inner-product index with a fixed dimension.
#[derive(Debug, Clone)]
pub struct VectorIndex {
    dimension: usize,
    /// Row-major, `len() * dimension` values.
    data: Vec<f32>,
}

impl VectorIndex {
    /// Create an empty index. `dimension` must be at least 1.
    pub fn new(dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(DocQaError::validation("index dimension must be at least 1"));
        }
        Ok(Self {
            dimension,
            data: Vec::new(),
        })
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of stored vectors.
    pub fn len(&self) -> usize {
        self.data.len() / self.dimension
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Append vectors in input order.
    ///
    /// The whole batch is checked before anything is stored, so a failed
    /// call leaves the index unchanged. There is no deduplication: adding
    /// the same batch twice stores it twice.
    pub fn add_batch(&mut self, vectors: &[Vec<f32>]) -> Result<()> {
        for vector in vectors {
            self.check_dimension(vector)?;
            if vector.iter().any(|v| !v.is_finite()) {
                return Err(DocQaError::validation("embedding contains a non-finite value"));
            }
        }

        self.data.reserve(vectors.len() * self.dimension);
        for vector in vectors {
            self.data.extend_from_slice(vector);
        }

        debug!(added = vectors.len(), total = self.len(), "vectors added");
        Ok(())
    }

    /// Return the `min(k, len())` vectors with the highest inner product.
    ///
    /// Results are sorted by descending score; equal scores keep insertion
    /// order. Searching an empty index is an [`DocQaError::EmptyIndex`] error.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        if self.is_empty() {
            return Err(DocQaError::EmptyIndex);
        }
        self.check_dimension(query)?;

        let mut hits: Vec<SearchHit> = self
            .data
            .chunks_exact(self.dimension)
            .enumerate()
            .map(|(i, row)| SearchHit {
                id: ChunkId(i),
                score: dot(row, query),
            })
            .collect();

        let k = k.min(hits.len());
        if k == 0 {
            return Ok(Vec::new());
        }
        if k < hits.len() {
            hits.select_nth_unstable_by(k - 1, rank);
            hits.truncate(k);
        }
        hits.sort_unstable_by(rank);

        Ok(hits)
    }

    fn check_dimension(&self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dimension {
            return Err(DocQaError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        Ok(())
    }
}

/// Descending score, then ascending id.
fn rank(a: &SearchHit, b: &SearchHit) -> Ordering {
    b.score.total_cmp(&a.score).then_with(|| a.id.cmp(&b.id))
}

/// Inner product, with `-0.0` folded into `0.0` so equal scores rank as ties.
fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum::<f32>() + 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(dimension: usize, axis: usize) -> Vec<f32> {
        let mut v = vec![0.0; dimension];
        v[axis] = 1.0;
        v
    }

    fn scored(first: f32) -> Vec<f32> {
        vec![first, (1.0 - first * first).sqrt()]
    }

    #[test]
    fn zero_dimension_is_rejected() {
        assert!(VectorIndex::new(0).is_err());
    }

    #[test]
    fn search_on_empty_index_fails() {
        let index = VectorIndex::new(3).unwrap();
        assert!(matches!(
            index.search(&unit(3, 0), 1),
            Err(DocQaError::EmptyIndex)
        ));
    }

    #[test]
    fn add_batch_checks_dimension_atomically() {
        let mut index = VectorIndex::new(3).unwrap();
        let err = index
            .add_batch(&[unit(3, 0), vec![1.0, 0.0]])
            .unwrap_err();
        assert!(matches!(
            err,
            DocQaError::DimensionMismatch {
                expected: 3,
                actual: 2
            }
        ));
        assert!(index.is_empty());
    }

    #[test]
    fn add_batch_rejects_nan() {
        let mut index = VectorIndex::new(2).unwrap();
        assert!(index.add_batch(&[vec![f32::NAN, 0.0]]).is_err());
        assert_eq!(index.len(), 0);
    }

    #[test]
    fn second_batch_appends() {
        let mut index = VectorIndex::new(2).unwrap();
        index.add_batch(&[unit(2, 0)]).unwrap();
        index.add_batch(&[unit(2, 0), unit(2, 1)]).unwrap();
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn query_dimension_is_checked() {
        let mut index = VectorIndex::new(2).unwrap();
        index.add_batch(&[unit(2, 0)]).unwrap();
        assert!(matches!(
            index.search(&[1.0, 0.0, 0.0], 1),
            Err(DocQaError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn search_returns_min_k_n_sorted_descending() {
        let mut index = VectorIndex::new(2).unwrap();
        index
            .add_batch(&[scored(0.2), scored(0.9), scored(-0.4), scored(0.6)])
            .unwrap();
        let query = unit(2, 0);

        let hits = index.search(&query, 3).unwrap();
        let ids: Vec<usize> = hits.iter().map(|h| h.id.0).collect();
        assert_eq!(ids, vec![1, 3, 0]);
        assert!(hits.windows(2).all(|w| w[0].score >= w[1].score));

        assert_eq!(index.search(&query, 10).unwrap().len(), 4);
        assert!(index.search(&query, 0).unwrap().is_empty());
    }

    #[test]
    fn ties_break_by_insertion_order() {
        let mut index = VectorIndex::new(2).unwrap();
        index
            .add_batch(&[
                unit(2, 1),
                unit(2, 0),
                unit(2, 1),
                unit(2, 0),
                unit(2, 0),
            ])
            .unwrap();

        let hits = index.search(&unit(2, 0), 2).unwrap();
        let ids: Vec<usize> = hits.iter().map(|h| h.id.0).collect();
        assert_eq!(ids, vec![1, 3]);

        let hits = index.search(&unit(2, 0), 5).unwrap();
        let ids: Vec<usize> = hits.iter().map(|h| h.id.0).collect();
        assert_eq!(ids, vec![1, 3, 4, 0, 2]);
    }

    #[test]
    fn signed_zero_scores_tie_by_insertion_order() {
        let mut index = VectorIndex::new(2).unwrap();
        index
            .add_batch(&[vec![-0.0, 1.0], vec![0.0, 1.0]])
            .unwrap();

        let hits = index.search(&[1.0, -0.0], 2).unwrap();
        let ids: Vec<usize> = hits.iter().map(|h| h.id.0).collect();
        assert_eq!(ids, vec![0, 1]);
        assert!(hits.iter().all(|h| h.score.is_sign_positive()));
    }

    #[test]
    fn inner_product_equals_cosine_for_unit_vectors() {
        let mut index = VectorIndex::new(2).unwrap();
        let v = vec![0.6, 0.8];
        index.add_batch(&[v.clone()]).unwrap();
        let hits = index.search(&v, 1).unwrap();
        assert!((hits[0].score - 1.0).abs() < 1e-6);
    }
}
