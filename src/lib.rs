// ============================================================
// seq2seq-transformer — Transformer forward computation graph
// ============================================================
// A from-scratch implementation of the Transformer
// encoder/decoder architecture (Vaswani et al. 2017) on top of
// Burn's tensor primitives.
//
// What this crate IS:
//   - Multi-head scaled dot-product attention, written out
//     explicitly (head split, score scaling, masking, softmax,
//     head recombination) rather than delegating to
//     burn::nn::attention
//   - Position-wise feed-forward layers
//   - Sinusoidal positional encoding
//   - Encoder and decoder block stacks with residual
//     connections and post-norm layer normalisation
//   - Padding + causal mask construction from raw token ids
//
// What this crate is NOT:
//   - No tokenizer, no dataset handling, no training loop,
//     no checkpointing, no decoding strategies. Callers supply
//     embedded input tensors and consume raw logits.
//
// Everything is generic over a Burn `Backend`, so the same
// graph runs on NdArray, Wgpu, or an Autodiff wrapper for
// training. Dropout is live only on autodiff backends, which
// makes the train/eval switch part of the type rather than a
// hidden global flag.
//
// Reference: Vaswani et al. (2017) Attention Is All You Need
//            Burn Book §3 (Building Blocks)

#![recursion_limit = "256"]

pub mod model;

pub use model::attention::{MhaInput, MhaOutput, MultiHeadAttention, MultiHeadAttentionConfig};
pub use model::decoder::{DecoderBlock, DecoderBlockConfig};
pub use model::encoder::{EncoderBlock, EncoderBlockConfig};
pub use model::encoding::{PositionalEncoding, PositionalEncodingConfig};
pub use model::feedforward::{PositionWiseFeedForward, PositionWiseFeedForwardConfig};
pub use model::mask::{generate_mask, PAD_ID};
pub use model::transformer::{Transformer, TransformerConfig};
