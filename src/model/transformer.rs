// ============================================================
// Transformer Orchestration
// ============================================================
// Wires the pieces into the full sequence-to-sequence forward
// graph:
//
//   src_embed ─(+PE)→ encoder stack ──────────────┐
//                                                 ▼
//   tgt_embed ─(+PE)→ decoder stack (cross-attn) ─→ Linear → logits
//
// Stack depth is an explicit `num_layers` parameter; the encoder
// and decoder stacks hold independently parameterized blocks and
// each block consumes the previous block's output.
//
// The positional encoding stage is optional (on by default) and
// applied to BOTH embedding streams before their stacks.
//
// The final projection returns raw logits [batch, tgt_len,
// vocab] — no softmax, the caller picks the loss function.
//
// Reference: Vaswani et al. (2017) Attention Is All You Need
//            Burn Book §3 (Building Blocks)

use anyhow::Result;
use burn::{
    nn::{Linear, LinearConfig},
    prelude::*,
};

use crate::model::decoder::{DecoderBlock, DecoderBlockConfig};
use crate::model::encoder::{EncoderBlock, EncoderBlockConfig};
use crate::model::encoding::{PositionalEncoding, PositionalEncodingConfig};

// ─── Configuration ────────────────────────────────────────────────────────────
#[derive(Config, Debug)]
pub struct TransformerConfig {
    pub d_model:        usize,
    pub num_heads:      usize,
    pub num_layers:     usize,
    pub d_ff:           usize,
    pub max_seq_len:    usize,
    pub tgt_vocab_size: usize,
    #[config(default = 0.1)]
    pub dropout:        f64,
    /// Add the sinusoidal positional signal to both embedding streams.
    /// Off means the caller injects position information itself.
    #[config(default = true)]
    pub positional_encoding: bool,
}

impl TransformerConfig {
    /// Build the full model. Fails if `d_model` is not divisible by
    /// `num_heads` (propagated from the attention blocks).
    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<Transformer<B>> {
        let encoder_layers = (0..self.num_layers)
            .map(|_| {
                EncoderBlockConfig::new(self.d_model, self.num_heads, self.d_ff)
                    .with_dropout(self.dropout)
                    .init(device)
            })
            .collect::<Result<Vec<_>>>()?;

        let decoder_layers = (0..self.num_layers)
            .map(|_| {
                DecoderBlockConfig::new(self.d_model, self.num_heads, self.d_ff)
                    .with_dropout(self.dropout)
                    .init(device)
            })
            .collect::<Result<Vec<_>>>()?;

        let pos_encoding = self.positional_encoding.then(|| {
            PositionalEncodingConfig::new(self.d_model, self.max_seq_len).init(device)
        });

        let output_projection =
            LinearConfig::new(self.d_model, self.tgt_vocab_size).init(device);

        tracing::info!(
            "Transformer ready: {} encoder + {} decoder blocks, d_model={}, heads={}, positional_encoding={}",
            self.num_layers, self.num_layers, self.d_model, self.num_heads,
            self.positional_encoding,
        );

        Ok(Transformer {
            encoder_layers,
            decoder_layers,
            pos_encoding,
            output_projection,
            d_model:     self.d_model,
            max_seq_len: self.max_seq_len,
        })
    }
}

// ─── Module ───────────────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct Transformer<B: Backend> {
    encoder_layers:    Vec<EncoderBlock<B>>,
    decoder_layers:    Vec<DecoderBlock<B>>,
    pos_encoding:      Option<PositionalEncoding<B>>,
    output_projection: Linear<B>,
    d_model:           usize,
    max_seq_len:       usize,
}

impl<B: Backend> Transformer<B> {
    /// Run the full forward graph.
    ///
    /// * `src_embed` — [batch, src_len, d_model] source embeddings
    /// * `tgt_embed` — [batch, tgt_len, d_model] target embeddings
    /// * `src_mask`  — padding mask, broadcastable to [batch, heads, q, src_len]
    /// * `tgt_mask`  — combined padding + look-ahead mask
    ///
    /// Returns logits [batch, tgt_len, tgt_vocab_size]. The inputs are
    /// validated up front so shape errors surface here with a message
    /// instead of deep inside a matmul.
    pub fn forward(
        &self,
        src_embed: Tensor<B, 3>,
        tgt_embed: Tensor<B, 3>,
        src_mask:  Option<Tensor<B, 4, Bool>>,
        tgt_mask:  Option<Tensor<B, 4, Bool>>,
    ) -> Result<Tensor<B, 3>> {
        let [src_batch, src_len, src_width] = src_embed.dims();
        let [tgt_batch, tgt_len, tgt_width] = tgt_embed.dims();

        anyhow::ensure!(
            src_batch == tgt_batch,
            "source batch ({src_batch}) and target batch ({tgt_batch}) differ",
        );
        anyhow::ensure!(
            src_width == self.d_model && tgt_width == self.d_model,
            "embedding width (src {src_width}, tgt {tgt_width}) does not match d_model ({})",
            self.d_model,
        );
        anyhow::ensure!(
            src_len <= self.max_seq_len && tgt_len <= self.max_seq_len,
            "sequence length (src {src_len}, tgt {tgt_len}) exceeds max_seq_len ({})",
            self.max_seq_len,
        );

        // ── Positional encoding, both streams ─────────────────────────────────
        let (src_embed, tgt_embed) = match &self.pos_encoding {
            Some(pe) => (pe.forward(src_embed)?, pe.forward(tgt_embed)?),
            None => (src_embed, tgt_embed),
        };

        // ── Encoder stack ─────────────────────────────────────────────────────
        let mut encoder_output = src_embed;
        for layer in &self.encoder_layers {
            encoder_output = layer.forward(encoder_output, src_mask.clone());
        }

        // ── Decoder stack, attending into the encoder output ──────────────────
        let mut decoder_output = tgt_embed;
        for layer in &self.decoder_layers {
            decoder_output = layer.forward(
                decoder_output,
                encoder_output.clone(),
                src_mask.clone(),
                tgt_mask.clone(),
            );
        }

        // ── Vocabulary projection — raw logits, no softmax ────────────────────
        Ok(self.output_projection.forward(decoder_output))
    }
}
