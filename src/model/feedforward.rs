// ============================================================
// Position-Wise Feed-Forward Network
// ============================================================
// Linear(d_model → d_ff) → ReLU → Linear(d_ff → d_model),
// applied to every sequence position independently. The Linears
// operate on the last axis only, so no information moves between
// positions here — that is attention's job.
//
// Reference: Vaswani et al. (2017) §3.3

use burn::{
    nn::{Linear, LinearConfig},
    prelude::*,
    tensor::activation::relu,
};

#[derive(Config, Debug)]
pub struct PositionWiseFeedForwardConfig {
    pub d_model: usize,
    pub d_ff:    usize,
}

impl PositionWiseFeedForwardConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> PositionWiseFeedForward<B> {
        PositionWiseFeedForward {
            linear1: LinearConfig::new(self.d_model, self.d_ff).init(device),
            linear2: LinearConfig::new(self.d_ff, self.d_model).init(device),
        }
    }
}

#[derive(Module, Debug)]
pub struct PositionWiseFeedForward<B: Backend> {
    linear1: Linear<B>,
    linear2: Linear<B>,
}

impl<B: Backend> PositionWiseFeedForward<B> {
    /// [batch, seq, d_model] → [batch, seq, d_model]
    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        self.linear2.forward(relu(self.linear1.forward(x)))
    }
}
