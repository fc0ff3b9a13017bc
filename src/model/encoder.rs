// ============================================================
// Encoder Block
// ============================================================
// One encoder block, post-norm convention:
//
//   h   = norm1(x + dropout(self_attn(x, src_mask)))
//   out = norm2(h + dropout(ffn(h)))
//
// The residual add wraps each sublayer's RAW output; the
// normalisation comes after the add. Dropout hits the sublayer
// output before the residual add and is live only on autodiff
// backends, so inference stays deterministic.
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
pub struct EncoderBlockConfig {
    pub d_model:   usize,
    pub num_heads: usize,
    pub d_ff:      usize,
    #[config(default = 0.1)]
    pub dropout:   f64,
}

impl EncoderBlockConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<EncoderBlock<B>> {
        Ok(EncoderBlock {
            self_attn: MultiHeadAttentionConfig::new(self.d_model, self.num_heads)
                .init(device)?,
            ffn:     PositionWiseFeedForwardConfig::new(self.d_model, self.d_ff).init(device),
            norm1:   LayerNormConfig::new(self.d_model).init(device),
            norm2:   LayerNormConfig::new(self.d_model).init(device),
            dropout: DropoutConfig::new(self.dropout).init(),
        })
    }
}

#[derive(Module, Debug)]
pub struct EncoderBlock<B: Backend> {
    self_attn: MultiHeadAttention<B>,
    ffn:       PositionWiseFeedForward<B>,
    norm1:     LayerNorm<B>,
    norm2:     LayerNorm<B>,
    dropout:   Dropout,
}

impl<B: Backend> EncoderBlock<B> {
    /// `src_mask` suppresses attention to padded source positions,
    /// shape broadcastable to [batch, heads, seq, seq].
    pub fn forward(
        &self,
        x:        Tensor<B, 3>,
        src_mask: Option<Tensor<B, 4, Bool>>,
    ) -> Tensor<B, 3> {
        let mut attn_input = MhaInput::self_attn(x.clone());
        if let Some(mask) = src_mask {
            attn_input = attn_input.with_mask(mask);
        }
        let attn = self.self_attn.forward(attn_input).context;
        let x = self.norm1.forward(x + self.dropout.forward(attn));

        let ffn = self.ffn.forward(x.clone());
        self.norm2.forward(x + self.dropout.forward(ffn))
    }
}
