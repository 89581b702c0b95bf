//! Similarity computation for embeddings.

use std::collections::HashMap;

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::DocumentId;
use crate::error::{EmbeddingError, Result};

fn check_dimensions(a: &[f32], b: &[f32]) -> Result<()> {
    if a.len() != b.len() {
        return Err(EmbeddingError::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }
    Ok(())
}

/// Compute the cosine similarity between two embeddings.
///
/// Returns a value between -1.0 and 1.0, where:
/// - 1.0 means identical direction
/// - 0.0 means orthogonal vectors (or either vector has zero norm)
/// - -1.0 means opposite vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32> {
    let dot = dot_product(a, b)?;
    let magnitude_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let magnitude_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if magnitude_a == 0.0 || magnitude_b == 0.0 {
        return Ok(0.0);
    }

    Ok(dot / (magnitude_a * magnitude_b))
}

/// Compute the euclidean distance between two embeddings.
pub fn euclidean_distance(a: &[f32], b: &[f32]) -> Result<f32> {
    check_dimensions(a, b)?;

    let sum: f32 = a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum();

    Ok(sum.sqrt())
}

/// Compute the dot product between two embeddings.
pub fn dot_product(a: &[f32], b: &[f32]) -> Result<f32> {
    check_dimensions(a, b)?;

    Ok(a.iter().zip(b.iter()).map(|(x, y)| x * y).sum())
}

/// A nearest-neighbor hit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
    /// Document that owns the matched vector.
    pub document_id: DocumentId,

    /// Euclidean distance to the query.
    pub distance: f32,
}

/// Find the `k` documents closest to `query`.
///
/// Results are ordered by ascending euclidean distance, ties broken by the
/// lower document id. A document owning several vectors appears once, at
/// its closest vector.
pub fn find_top_k<'a, I>(query: &[f32], candidates: I, k: usize) -> Result<Vec<Neighbor>>
where
    I: IntoIterator<Item = (DocumentId, &'a [f32])>,
{
    let mut best: HashMap<DocumentId, OrderedFloat<f32>> = HashMap::new();

    for (document_id, vector) in candidates {
        let distance = OrderedFloat(euclidean_distance(query, vector)?);
        best.entry(document_id)
            .and_modify(|current| {
                if distance < *current {
                    *current = distance;
                }
            })
            .or_insert(distance);
    }

    let mut scored: Vec<(OrderedFloat<f32>, DocumentId)> =
        best.into_iter().map(|(id, distance)| (distance, id)).collect();
    scored.sort();

    Ok(scored
        .into_iter()
        .take(k)
        .map(|(distance, document_id)| Neighbor {
            document_id,
            distance: distance.0,
        })
        .collect())
}
