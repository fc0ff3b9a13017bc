// ============================================================
// Mask Construction
// ============================================================
// Builds the two boolean attention masks from raw token ids,
// with `true` = attend and `false` = suppress:
//
//   src_mask [batch, 1, 1, src_len]
//     true where the source token is not padding. Broadcasts
//     over heads and query positions, so every query skips the
//     same padded keys.
//
//   tgt_mask [batch, 1, tgt_len, tgt_len]
//     padding mask AND lower-triangular look-ahead mask:
//     position i may attend to position j iff tgt[b, i] is not
//     padding and j <= i.
//
// Token id 0 is reserved as the padding id.
//
// Reference: Vaswani et al. (2017) §3.2.3 (masked attention)

use burn::prelude::*;

/// Reserved padding token id.
pub const PAD_ID: i64 = 0;

/// Build the source padding mask and the combined target mask for one batch
/// of token-id sequences.
///
/// Returns `(src_mask, tgt_mask)` shaped `[batch, 1, 1, src_len]` and
/// `[batch, 1, tgt_len, tgt_len]`, ready to broadcast against attention
/// scores `[batch, heads, seq_q, seq_k]`.
pub fn generate_mask<B: Backend>(
    src: Tensor<B, 2, Int>,
    tgt: Tensor<B, 2, Int>,
) -> (Tensor<B, 4, Bool>, Tensor<B, 4, Bool>) {
    let device = src.device();
    let [batch, src_len] = src.dims();
    let [tgt_batch, tgt_len] = tgt.dims();
    debug_assert_eq!(batch, tgt_batch, "src and tgt batch sizes differ");

    // ── Source padding mask ───────────────────────────────────────────────────
    let src_mask = src
        .equal_elem(PAD_ID)
        .bool_not()
        .reshape([batch, 1, 1, src_len]);

    // ── Target padding mask, keyed on the QUERY position ──────────────────────
    // [batch, 1, tgt_len, 1]: a padded query position attends to nothing.
    // Combined in integer space because the AND is a broadcasted product.
    let tgt_pad = tgt
        .equal_elem(PAD_ID)
        .bool_not()
        .int()
        .reshape([batch, 1, tgt_len, 1])
        .expand([batch, 1, tgt_len, tgt_len]);

    // ── Look-ahead mask: j <= i, lower-triangular inclusive ───────────────────
    let rows = Tensor::<B, 1, Int>::arange(0..tgt_len as i64, &device)
        .reshape([tgt_len, 1])
        .expand([tgt_len, tgt_len]);
    let cols = Tensor::<B, 1, Int>::arange(0..tgt_len as i64, &device)
        .reshape([1, tgt_len])
        .expand([tgt_len, tgt_len]);
    let causal = cols
        .lower_equal(rows)
        .int()
        .reshape([1, 1, tgt_len, tgt_len])
        .expand([batch, 1, tgt_len, tgt_len]);

    let tgt_mask = (tgt_pad * causal).equal_elem(1);

    tracing::debug!(
        "generated masks: src [{},1,1,{}], tgt [{},1,{},{}]",
        batch, src_len, batch, tgt_len, tgt_len,
    );

    (src_mask, tgt_mask)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    type TestBackend = burn::backend::NdArray;

    #[test]
    fn test_src_mask_marks_non_pad_positions() {
        let device = Default::default();
        let src = Tensor::<TestBackend, 2, Int>::from_ints([[1, 2, 3, 0, 0]], &device);
        let tgt = Tensor::<TestBackend, 2, Int>::from_ints([[1, 2, 0]], &device);

        let (src_mask, _) = generate_mask(src, tgt);
        assert_eq!(src_mask.dims(), [1, 1, 1, 5]);

        let values = src_mask.into_data().to_vec::<bool>().unwrap();
        assert_eq!(values, vec![true, true, true, false, false]);
    }

    #[test]
    fn test_tgt_mask_combines_padding_and_causality() {
        let device = Default::default();
        let src = Tensor::<TestBackend, 2, Int>::from_ints([[1, 2, 3, 0, 0]], &device);
        let tgt = Tensor::<TestBackend, 2, Int>::from_ints([[1, 2, 0]], &device);

        let (_, tgt_mask) = generate_mask(src, tgt);
        assert_eq!(tgt_mask.dims(), [1, 1, 3, 3]);

        let values = tgt_mask.into_data().to_vec::<bool>().unwrap();
        // Row 0: sees only itself. Row 1: sees 0 and 1.
        // Row 2: the query token is padding, so it sees nothing at all.
        #[rustfmt::skip]
        let expected = vec![
            true,  false, false,
            true,  true,  false,
            false, false, false,
        ];
        assert_eq!(values, expected);
    }

    #[test]
    fn test_causal_constraint_holds_without_padding() {
        let device = Default::default();
        let src = Tensor::<TestBackend, 2, Int>::from_ints([[5, 6]], &device);
        let tgt = Tensor::<TestBackend, 2, Int>::from_ints([[7, 8, 9, 3]], &device);

        let (_, tgt_mask) = generate_mask(src, tgt);
        let values = tgt_mask.into_data().to_vec::<bool>().unwrap();

        for i in 0..4 {
            for j in 0..4 {
                assert_eq!(
                    values[i * 4 + j],
                    j <= i,
                    "tgt_mask[{i},{j}] violates the look-ahead rule"
                );
            }
        }
    }

    #[test]
    fn test_masks_are_per_batch_entry() {
        let device = Default::default();
        let src = Tensor::<TestBackend, 2, Int>::from_ints([[1, 0], [1, 2]], &device);
        let tgt = Tensor::<TestBackend, 2, Int>::from_ints([[1, 1], [1, 0]], &device);

        let (src_mask, tgt_mask) = generate_mask(src, tgt);

        let src_values = src_mask.into_data().to_vec::<bool>().unwrap();
        assert_eq!(src_values, vec![true, false, true, true]);

        let tgt_values = tgt_mask.into_data().to_vec::<bool>().unwrap();
        // Batch 0: no padding, plain causal triangle.
        // Batch 1: position 1 is padding — its whole query row is false.
        #[rustfmt::skip]
        let expected = vec![
            true, false, true, true,
            true, false, false, false,
        ];
        assert_eq!(tgt_values, expected);
    }
}
