//! Similarity math shared by the retrieval backends and the tool selector.
//!
//! Scores are cosine similarities computed in f64 and reported as f32.
//! Chunk ranking is a stable sort, so equal scores keep storage order.

use docweave_core::memory::{ChunkRecord, ScoredChunk};

/// Cosine similarity of `a` and `b`, in [-1, 1].
///
/// Mismatched lengths, empty input, and zero vectors score 0.0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }

    let (dot, sq_a, sq_b) = a
        .iter()
        .zip(b)
        .map(|(&x, &y)| (f64::from(x), f64::from(y)))
        .fold((0.0, 0.0, 0.0), |(dot, sq_a, sq_b), (x, y)| {
            (dot + x * y, sq_a + x * x, sq_b + y * y)
        });

    let norms = (sq_a * sq_b).sqrt();
    if norms < 1e-10 {
        0.0
    } else {
        (dot / norms) as f32
    }
}

/// Rank chunks by cosine similarity to a query embedding.
///
/// Returns at most `k` chunks, best first. The sort is stable, so equal
/// scores keep storage order.
pub fn rank_chunks(chunks: &[ChunkRecord], query_embedding: &[f32], k: usize) -> Vec<ScoredChunk> {
    let mut scored: Vec<ScoredChunk> = chunks
        .iter()
        .map(|chunk| ScoredChunk {
            index: chunk.index,
            text: chunk.text.clone(),
            score: cosine_similarity(&chunk.embedding, query_embedding),
        })
        .collect();

    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(k);
    scored
}

/// Serialize an embedding vector to little-endian bytes.
pub fn embedding_to_blob(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Inverse of [`embedding_to_blob`]. Trailing partial floats are dropped.
pub fn blob_to_embedding(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}
