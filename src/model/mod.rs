// ============================================================
// Model Layer
// ============================================================
// All Burn-specific model code lives here. The modules are
// ordered leaves-first, matching the data flow:
//
//   attention.rs   — Multi-head scaled dot-product attention.
//                    The core of the crate: Q/K/V projections,
//                    head splitting, score scaling, masking,
//                    softmax over the key axis, head merge.
//
//   feedforward.rs — Position-wise feed-forward network
//                    (Linear → ReLU → Linear, no cross-position
//                    interaction).
//
//   encoding.rs    — Sinusoidal positional encoding. A fixed,
//                    non-trainable buffer added to embeddings.
//
//   encoder.rs     — One encoder block: self-attention +
//                    feed-forward, residual + post-norm.
//
//   decoder.rs     — One decoder block: masked self-attention,
//                    cross-attention over the encoder output,
//                    feed-forward, residual + post-norm.
//
//   transformer.rs — The full model: N encoder blocks, N
//                    decoder blocks, optional positional
//                    encoding, final vocabulary projection.
//
//   mask.rs        — Padding and causal mask construction from
//                    integer token-id tensors.
//
// Reference: Vaswani et al. (2017) Attention Is All You Need
//            Burn Book §3 (Building Blocks)

/// Multi-head scaled dot-product attention
pub mod attention;

/// Decoder block — masked self-attention + cross-attention + FFN
pub mod decoder;

/// Encoder block — self-attention + FFN
pub mod encoder;

/// Sinusoidal positional encoding buffer
pub mod encoding;

/// Position-wise feed-forward network
pub mod feedforward;

/// Padding and look-ahead mask construction
pub mod mask;

/// Full encoder/decoder model with vocabulary projection
pub mod transformer;
