// ============================================================
// Sinusoidal Positional Encoding
// ============================================================
// Self-attention is permutation-invariant, so position must be
// injected explicitly. This module precomputes the classic
// sinusoidal signal once at construction:
//
//   pe[pos, 2i]   = sin(pos · exp(-ln(10000) · 2i / d_model))
//   pe[pos, 2i+1] = cos(pos · exp(-ln(10000) · 2i / d_model))
//
// Each sin/cos pair shares one divisor term, so for every
// (pos, i) the pair lies on the unit circle: sin² + cos² = 1.
// The buffer is a plain tensor field, not a Param — Burn treats
// it as a module constant, which is exactly the non-trainable,
// read-only semantics wanted here.
//
// The buffer is computed on the host in f64 and shipped to the
// device once. Every value is a sine or cosine of a finite
// angle, so the buffer can never contain NaN or Inf.
//
// Reference: Vaswani et al. (2017) §3.5

use anyhow::Result;
use burn::{prelude::*, tensor::TensorData};

#[derive(Config, Debug)]
pub struct PositionalEncodingConfig {
    pub d_model:     usize,
    pub max_seq_len: usize,
}

impl PositionalEncodingConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> PositionalEncoding<B> {
        let mut buffer = vec![0.0f32; self.max_seq_len * self.d_model];

        for pos in 0..self.max_seq_len {
            let mut i = 0;
            while i < self.d_model {
                // div_term = 10000^(-i / d_model), shared by the sin/cos pair
                let div_term =
                    (-(10_000f64.ln()) * i as f64 / self.d_model as f64).exp();
                let angle = pos as f64 * div_term;

                buffer[pos * self.d_model + i] = angle.sin() as f32;
                if i + 1 < self.d_model {
                    buffer[pos * self.d_model + i + 1] = angle.cos() as f32;
                }
                i += 2;
            }
        }

        let pe = Tensor::from_data(
            TensorData::new(buffer, [1, self.max_seq_len, self.d_model]),
            device,
        );
        PositionalEncoding { pe, max_seq_len: self.max_seq_len }
    }
}

#[derive(Module, Debug)]
pub struct PositionalEncoding<B: Backend> {
    /// Fixed signal, [1, max_seq_len, d_model] — immutable after init
    pe:          Tensor<B, 3>,
    max_seq_len: usize,
}

impl<B: Backend> PositionalEncoding<B> {
    /// Add the positional signal to `x`, broadcast over the batch axis.
    ///
    /// Errors if the sequence is longer than the buffer — truncating
    /// silently would feed wrong positions downstream.
    pub fn forward(&self, x: Tensor<B, 3>) -> Result<Tensor<B, 3>> {
        let [batch, seq_len, d_model] = x.dims();
        anyhow::ensure!(
            seq_len <= self.max_seq_len,
            "sequence length {} exceeds positional encoding capacity {}",
            seq_len,
            self.max_seq_len,
        );
        anyhow::ensure!(
            d_model == self.pe.dims()[2],
            "embedding width {} does not match positional encoding width {}",
            d_model,
            self.pe.dims()[2],
        );

        let pe = self
            .pe
            .clone()
            .slice([0..1, 0..seq_len, 0..d_model])
            .expand([batch, seq_len, d_model]);
        Ok(x + pe)
    }
}
