use edu_core::error::AppError;
use sha2::{Digest, Sha256};

use super::EmbeddingProvider;

pub const DEFAULT_DIMS: usize = 256;

/// Deterministic local embedder: signed feature hashing of lowercased word tokens.
///
/// Texts sharing vocabulary land close in cosine space, which is enough for offline
/// use and tests. The empty string embeds to the zero vector.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    model: String,
    dims: usize,
}

impl HashingEmbedder {
    pub fn new(model: &str, dims: usize) -> Self {
        Self {
            model: model.to_string(),
            dims: dims.max(1),
        }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dims];
        let lowered = text.to_lowercase();
        for token in lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let digest = Sha256::digest(token.as_bytes());
            let bucket = u64::from_le_bytes([
                digest[0], digest[1], digest[2], digest[3], digest[4], digest[5], digest[6],
                digest[7],
            ]) as usize
                % self.dims;
            let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
            v[bucket] += sign;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in v.iter_mut() {
                *x /= norm;
            }
        }
        v
    }
}

impl EmbeddingProvider for HashingEmbedder {
    fn model_id(&self) -> &str {
        &self.model
    }

    fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, AppError> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }

    fn embed_query(&self, text: &str) -> Result<Vec<f32>, AppError> {
        Ok(self.embed_one(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_embeds_to_zero_vector_of_fixed_dims() {
        let e = HashingEmbedder::new("hash", 64);
        let v = e.embed_query("").expect("embed");
        assert_eq!(v.len(), 64);
        assert!(v.iter().all(|x| *x == 0.0));
    }

    #[test]
    fn same_input_same_output_and_batch_matches_single() {
        let e = HashingEmbedder::new("hash", 64);
        let q = e.embed_query("Machine learning is a subfield of AI.").expect("q");
        let docs = e
            .embed_documents(&["Machine learning is a subfield of AI.".to_string()])
            .expect("docs");
        assert_eq!(q, docs[0]);
    }

    #[test]
    fn tokenisation_ignores_case_and_punctuation() {
        let e = HashingEmbedder::new("hash", 64);
        assert_eq!(
            e.embed_query("Gradient, DESCENT!").expect("a"),
            e.embed_query("gradient descent").expect("b")
        );
    }
}
