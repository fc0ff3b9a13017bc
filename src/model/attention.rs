// ============================================================
// Multi-Head Attention
// ============================================================
// Scaled dot-product attention with explicit head handling.
//
// Why write this out instead of using burn::nn::attention?
//   The whole architecture hinges on four tensor moves:
//   1. Project Q, K, V with learned d_model→d_model Linears
//   2. Split the last axis into (heads, d_k) and move the head
//      axis next to batch: [batch, heads, seq, d_k]
//   3. Score = Q·Kᵀ / √d_k, mask, softmax over the KEY axis,
//      then weight the values
//   4. Merge the heads back and apply the output projection
//
//   Keeping those moves visible is the point of the crate.
//
// The softmax axis matters: it must be the last axis (key
// positions), so that each query position gets a probability
// distribution over the keys it may attend to. Softmax over any
// other axis produces rows that do not sum to one.
//
// Masking happens BEFORE softmax, by filling suppressed
// positions with a large negative score. A literal -inf would
// turn fully-masked rows into NaN once exponentiated, so a
// finite constant is used instead.
//
// Reference: Vaswani et al. (2017) Attention Is All You Need §3.2
//            Burn Book §3 (Building Blocks)

use anyhow::Result;
use burn::{
    nn::{Linear, LinearConfig},
    prelude::*,
    tensor::activation::softmax,
};

/// Score assigned to masked-out positions before softmax.
/// Finite on purpose: exp(-1e9) underflows to zero without
/// producing NaN the way -inf does for fully-masked rows.
const MASKED_SCORE: f64 = -1e9;

// ─── Configuration ────────────────────────────────────────────────────────────
#[derive(Config, Debug)]
pub struct MultiHeadAttentionConfig {
    /// Width of the representation vector at every position
    pub d_model:   usize,
    /// Number of parallel attention heads
    pub num_heads: usize,
}

impl MultiHeadAttentionConfig {
    /// Build the attention module, validating the head split up front.
    ///
    /// Fails if `d_model` is not divisible by `num_heads` — the per-head
    /// slice width `d_k = d_model / num_heads` must be exact, and catching
    /// it here keeps the per-call path infallible.
    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<MultiHeadAttention<B>> {
        anyhow::ensure!(
            self.num_heads > 0 && self.d_model % self.num_heads == 0,
            "d_model ({}) must be divisible by num_heads ({})",
            self.d_model,
            self.num_heads,
        );
        Ok(MultiHeadAttention {
            w_query:   LinearConfig::new(self.d_model, self.d_model).init(device),
            w_key:     LinearConfig::new(self.d_model, self.d_model).init(device),
            w_value:   LinearConfig::new(self.d_model, self.d_model).init(device),
            w_output:  LinearConfig::new(self.d_model, self.d_model).init(device),
            num_heads: self.num_heads,
            d_k:       self.d_model / self.num_heads,
        })
    }
}

// ─── Module ───────────────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct MultiHeadAttention<B: Backend> {
    w_query:   Linear<B>,
    w_key:     Linear<B>,
    w_value:   Linear<B>,
    w_output:  Linear<B>,
    num_heads: usize,
    d_k:       usize,
}

/// Query/key/value bundle for one attention call.
///
/// `mask` is boolean with `true` = attend, `false` = suppress, and must be
/// broadcastable against the score tensor [batch, heads, seq_q, seq_k] —
/// i.e. [batch, 1, 1, seq_k] for a padding mask or [batch, 1, seq_q, seq_k]
/// for a combined padding + causal mask.
pub struct MhaInput<B: Backend> {
    query: Tensor<B, 3>,
    key:   Tensor<B, 3>,
    value: Tensor<B, 3>,
    mask:  Option<Tensor<B, 4, Bool>>,
}

impl<B: Backend> MhaInput<B> {
    /// Attention with distinct query, key and value streams
    /// (cross-attention between decoder and encoder states).
    pub fn new(query: Tensor<B, 3>, key: Tensor<B, 3>, value: Tensor<B, 3>) -> Self {
        Self { query, key, value, mask: None }
    }

    /// Self-attention: the same tensor serves as query, key and value.
    pub fn self_attn(x: Tensor<B, 3>) -> Self {
        Self::new(x.clone(), x.clone(), x)
    }

    /// Attach an attention mask (`true` = attend).
    pub fn with_mask(mut self, mask: Tensor<B, 4, Bool>) -> Self {
        self.mask = Some(mask);
        self
    }
}

/// Attention result: the recombined, output-projected context plus the raw
/// per-head attention weights (useful for tests and inspection).
pub struct MhaOutput<B: Backend> {
    /// Softmax-normalised weights, [batch, heads, seq_q, seq_k]
    pub weights: Tensor<B, 4>,
    /// Attended output, same shape as the query input
    pub context: Tensor<B, 3>,
}

impl<B: Backend> MultiHeadAttention<B> {
    /// Run one attention pass. Pure function of inputs and parameters.
    pub fn forward(&self, input: MhaInput<B>) -> MhaOutput<B> {
        // ── Project and split into heads ──────────────────────────────────────
        let query = self.split_heads(self.w_query.forward(input.query));
        let key   = self.split_heads(self.w_key.forward(input.key));
        let value = self.split_heads(self.w_value.forward(input.value));

        // ── Scaled dot-product attention ──────────────────────────────────────
        let (weights, attended) =
            self.scaled_dot_product(query, key, value, input.mask);

        // ── Merge heads and project the result ────────────────────────────────
        let context = self.w_output.forward(self.combine_heads(attended));

        MhaOutput { weights, context }
    }

    /// [batch, seq, d_model] → [batch, heads, seq, d_k]
    fn split_heads(&self, x: Tensor<B, 3>) -> Tensor<B, 4> {
        let [batch, seq_len, _] = x.dims();
        x.reshape([batch, seq_len, self.num_heads, self.d_k])
            .swap_dims(1, 2)
    }

    /// [batch, heads, seq, d_k] → [batch, seq, d_model]
    fn combine_heads(&self, x: Tensor<B, 4>) -> Tensor<B, 3> {
        let [batch, _, seq_len, _] = x.dims();
        x.swap_dims(1, 2)
            .reshape([batch, seq_len, self.num_heads * self.d_k])
    }

    /// softmax(Q·Kᵀ / √d_k, masked) · V for every head in parallel.
    fn scaled_dot_product(
        &self,
        query: Tensor<B, 4>,
        key:   Tensor<B, 4>,
        value: Tensor<B, 4>,
        mask:  Option<Tensor<B, 4, Bool>>,
    ) -> (Tensor<B, 4>, Tensor<B, 4>) {
        // [batch, heads, seq_q, seq_k]
        let scores = query.matmul(key.transpose()) / (self.d_k as f64).sqrt();

        // Suppressed positions get a large negative score so their softmax
        // weight underflows to ~0. The mask broadcasts over the head axis
        // (and the query axis, for padding masks).
        let scores = match mask {
            Some(mask) => {
                let dims = scores.dims();
                scores.mask_fill(mask.expand(dims).bool_not(), MASKED_SCORE)
            }
            None => scores,
        };

        // Softmax over the key axis — each query position ends up with a
        // probability distribution over the positions it attends to.
        let weights = softmax(scores, 3);

        let attended = weights.clone().matmul(value);
        (weights, attended)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::tensor::Distribution;

    type TestBackend = burn::backend::NdArray;

    fn attention(d_model: usize, num_heads: usize) -> MultiHeadAttention<TestBackend> {
        let device = Default::default();
        MultiHeadAttentionConfig::new(d_model, num_heads)
            .init(&device)
            .unwrap()
    }

    #[test]
    fn test_init_rejects_indivisible_head_count() {
        let device = Default::default();
        let result = MultiHeadAttentionConfig::new(10, 3).init::<TestBackend>(&device);
        assert!(result.is_err());
    }

    #[test]
    fn test_output_shape_matches_query_shape() {
        let device = Default::default();
        let mha = attention(16, 4);

        let x = Tensor::<TestBackend, 3>::random(
            [2, 5, 16], Distribution::Default, &device,
        );
        let out = mha.forward(MhaInput::self_attn(x));

        assert_eq!(out.context.dims(), [2, 5, 16]);
        assert_eq!(out.weights.dims(), [2, 4, 5, 5]);
    }

    #[test]
    fn test_cross_attention_keeps_query_length() {
        // Query of length 4 over keys/values of length 6 — the output
        // must follow the query, the weights must follow both.
        let device = Default::default();
        let mha = attention(8, 2);

        let q  = Tensor::<TestBackend, 3>::random([1, 4, 8], Distribution::Default, &device);
        let kv = Tensor::<TestBackend, 3>::random([1, 6, 8], Distribution::Default, &device);
        let out = mha.forward(MhaInput::new(q, kv.clone(), kv));

        assert_eq!(out.context.dims(), [1, 4, 8]);
        assert_eq!(out.weights.dims(), [1, 2, 4, 6]);
    }

    #[test]
    fn test_attention_weights_sum_to_one_over_keys() {
        let device = Default::default();
        let mha = attention(16, 4);

        let x = Tensor::<TestBackend, 3>::random(
            [2, 5, 16], Distribution::Default, &device,
        );
        let out = mha.forward(MhaInput::self_attn(x));

        // Every (batch, head, query-position) row sums to 1 over seq_k
        let row_sums = out.weights.sum_dim(3);
        let max_err: f32 = (row_sums - 1.0)
            .abs()
            .max()
            .into_scalar()
            .elem();
        assert!(max_err < 1e-5, "row sums deviate from 1 by {max_err}");
    }

    #[test]
    fn test_masked_key_position_gets_zero_weight() {
        let device = Default::default();
        let mha = attention(16, 4);

        let x = Tensor::<TestBackend, 3>::random(
            [1, 4, 16], Distribution::Default, &device,
        );
        // Padding-style mask: last key position suppressed for all queries
        let mask = Tensor::<TestBackend, 1, Int>::from_ints([1, 1, 1, 0], &device)
            .reshape([1, 1, 1, 4])
            .equal_elem(1);

        let out = mha.forward(MhaInput::self_attn(x).with_mask(mask));

        let masked_weight: f32 = out
            .weights
            .slice([0..1, 0..4, 0..4, 3..4])
            .max()
            .into_scalar()
            .elem();
        assert!(
            masked_weight < 1e-6,
            "masked position still receives weight {masked_weight}"
        );
    }

    #[test]
    fn test_causal_mask_zeroes_future_positions() {
        let device = Default::default();
        let mha = attention(8, 2);

        let x = Tensor::<TestBackend, 3>::random(
            [1, 3, 8], Distribution::Default, &device,
        );
        // Lower-triangular look-ahead mask: position i may attend to j <= i
        let mask = Tensor::<TestBackend, 2, Int>::from_ints(
            [[1, 0, 0], [1, 1, 0], [1, 1, 1]],
            &device,
        )
        .reshape([1, 1, 3, 3])
        .equal_elem(1);

        let out = mha.forward(MhaInput::self_attn(x).with_mask(mask));
        let weights = out.weights.into_data().to_vec::<f32>().unwrap();

        // weights layout: [1, 2, 3, 3] — check every (head, i, j > i) entry
        for head in 0..2 {
            for i in 0..3 {
                for j in (i + 1)..3 {
                    let w = weights[head * 9 + i * 3 + j];
                    assert!(
                        w < 1e-6,
                        "head {head}: position {i} attends to future position {j} (w={w})"
                    );
                }
            }
        }
    }
}
