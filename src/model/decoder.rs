// ============================================================
// Decoder Block
// ============================================================
// One decoder block, three sublayers, post-norm convention:
//
//   h1  = norm1(x  + dropout(self_attn(x, tgt_mask)))
//   h2  = norm2(h1 + dropout(cross_attn(h1, enc_out, src_mask)))
//   out = norm3(h2 + dropout(ffn(h2)))
//
// Self-attention uses the combined padding + look-ahead mask so
// a target position can never see later positions.
// Cross-attention takes its query from the decoder state and its
// key/value from the encoder output, masked by the SOURCE
// padding mask — the decoder may look at every non-pad source
// position regardless of causality.
//
// Reference: Vaswani et al. (2017) §3.1

use anyhow::Result;
use burn::{
    nn::{Dropout, DropoutConfig, LayerNorm, LayerNormConfig},
    prelude::*,
};

use crate::model::attention::{MhaInput, MultiHeadAttention, MultiHeadAttentionConfig};
use crate::model::feedforward::{PositionWiseFeedForward, PositionWiseFeedForwardConfig};

#[derive(Config, Debug)]
pub struct DecoderBlockConfig {
    pub d_model:   usize,
    pub num_heads: usize,
    pub d_ff:      usize,
    #[config(default = 0.1)]
    pub dropout:   f64,
}

impl DecoderBlockConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<DecoderBlock<B>> {
        Ok(DecoderBlock {
            self_attn: MultiHeadAttentionConfig::new(self.d_model, self.num_heads)
                .init(device)?,
            cross_attn: MultiHeadAttentionConfig::new(self.d_model, self.num_heads)
                .init(device)?,
            ffn:     PositionWiseFeedForwardConfig::new(self.d_model, self.d_ff).init(device),
            norm1:   LayerNormConfig::new(self.d_model).init(device),
            norm2:   LayerNormConfig::new(self.d_model).init(device),
            norm3:   LayerNormConfig::new(self.d_model).init(device),
            dropout: DropoutConfig::new(self.dropout).init(),
        })
    }
}

#[derive(Module, Debug)]
pub struct DecoderBlock<B: Backend> {
    self_attn:  MultiHeadAttention<B>,
    cross_attn: MultiHeadAttention<B>,
    ffn:        PositionWiseFeedForward<B>,
    norm1:      LayerNorm<B>,
    norm2:      LayerNorm<B>,
    norm3:      LayerNorm<B>,
    dropout:    Dropout,
}

impl<B: Backend> DecoderBlock<B> {
    pub fn forward(
        &self,
        x:          Tensor<B, 3>,
        enc_output: Tensor<B, 3>,
        src_mask:   Option<Tensor<B, 4, Bool>>,
        tgt_mask:   Option<Tensor<B, 4, Bool>>,
    ) -> Tensor<B, 3> {
        // ── Masked self-attention over the target stream ──────────────────────
        let mut self_input = MhaInput::self_attn(x.clone());
        if let Some(mask) = tgt_mask {
            self_input = self_input.with_mask(mask);
        }
        let self_attn = self.self_attn.forward(self_input).context;
        let x = self.norm1.forward(x + self.dropout.forward(self_attn));

        // ── Cross-attention into the encoder output ───────────────────────────
        let mut cross_input = MhaInput::new(x.clone(), enc_output.clone(), enc_output);
        if let Some(mask) = src_mask {
            cross_input = cross_input.with_mask(mask);
        }
        let cross_attn = self.cross_attn.forward(cross_input).context;
        let x = self.norm2.forward(x + self.dropout.forward(cross_attn));

        // ── Position-wise feed-forward ────────────────────────────────────────
        let ffn = self.ffn.forward(x.clone());
        self.norm3.forward(x + self.dropout.forward(ffn))
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::mask::generate_mask;
    use burn::tensor::Distribution;

    type TestBackend = burn::backend::NdArray;

    #[test]
    fn test_forward_follows_target_shape() {
        let device = Default::default();
        let block = DecoderBlockConfig::new(16, 4, 32)
            .init::<TestBackend>(&device)
            .unwrap();

        let tgt = Tensor::<TestBackend, 3>::random(
            [2, 4, 16], Distribution::Default, &device,
        );
        let enc = Tensor::<TestBackend, 3>::random(
            [2, 6, 16], Distribution::Default, &device,
        );

        // Output tracks the target stream, not the encoder length
        assert_eq!(block.forward(tgt, enc, None, None).dims(), [2, 4, 16]);
    }

    #[test]
    fn test_forward_with_generated_masks_stays_finite() {
        let device = Default::default();
        let block = DecoderBlockConfig::new(8, 2, 16)
            .init::<TestBackend>(&device)
            .unwrap();

        let src_ids = Tensor::<TestBackend, 2, Int>::from_ints([[4, 7, 2, 0, 0]], &device);
        let tgt_ids = Tensor::<TestBackend, 2, Int>::from_ints([[3, 9, 0]], &device);
        let (src_mask, tgt_mask) = generate_mask(src_ids, tgt_ids);

        let tgt = Tensor::<TestBackend, 3>::random(
            [1, 3, 8], Distribution::Default, &device,
        );
        let enc = Tensor::<TestBackend, 3>::random(
            [1, 5, 8], Distribution::Default, &device,
        );

        let out = block.forward(tgt, enc, Some(src_mask), Some(tgt_mask));
        assert_eq!(out.dims(), [1, 3, 8]);
        assert!(out
            .into_data()
            .to_vec::<f32>()
            .unwrap()
            .iter()
            .all(|v| v.is_finite()));
    }
}
