// ============================================================
// Layer 5 - Embedding Table
// ============================================================
// Assembles the full lookup table a span model embeds with:
//
//   rows 0 .. V        GloVe vectors of the restricted vocabulary
//   rows V .. V+C      one vector per unknown class
//   row  V+C           padding (all zeros)
//
// Unknown-class rows are drawn from N(0, 1) in smart mode so each
// class is distinguishable; plain mode uses zeros.

use anyhow::{anyhow, Result};
use burn::{
    prelude::*,
    tensor::{Distribution, TensorData},
};

use crate::data::{embedding::EmbeddingMatrix, vocab::IndexLayout};

pub fn embedding_table<B: Backend>(
    matrix:  &EmbeddingMatrix,
    classes: usize,
    smart:   bool,
    device:  &B::Device,
) -> Tensor<B, 2> {
    let dim  = matrix.dim;
    let rows = matrix.rows();

    let mut parts: Vec<Tensor<B, 2>> = Vec::with_capacity(3);
    if rows > 0 {
        parts.push(Tensor::from_data(TensorData::new(matrix.data.clone(), [rows, dim]), device));
    }
    if classes > 0 {
        parts.push(if smart {
            Tensor::random([classes, dim], Distribution::Normal(0.0, 1.0), device)
        } else {
            Tensor::zeros([classes, dim], device)
        });
    }
    parts.push(Tensor::zeros([1, dim], device));

    Tensor::cat(parts, 0)
}

/// Copy a table tensor back into a host matrix for persistence.
pub fn to_matrix<B: Backend>(table: Tensor<B, 2>) -> Result<EmbeddingMatrix> {
    let [_, dim] = table.dims();
    let data = table
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|e| anyhow!("Cannot read embedding table: {e:?}"))?;
    Ok(EmbeddingMatrix { dim, data })
}

/// Check a table against the index layout it is meant to serve.
///
/// Row count must match and the padding row must be all zeros.
pub fn check_layout(table: &EmbeddingMatrix, layout: &IndexLayout) -> Result<()> {
    if table.rows() != layout.table_rows() {
        anyhow::bail!(
            "Embedding table has {} rows, index layout needs {}",
            table.rows(),
            layout.table_rows()
        );
    }
    if table.row(layout.pad_id()).iter().any(|v| *v != 0.0) {
        anyhow::bail!("Padding row {} of the embedding table is not zero", layout.pad_id());
    }
    Ok(())
}

/// Serialises tests that seed or draw from the backend's global RNG.
#[cfg(test)]
pub(crate) static BACKEND_RNG: std::sync::Mutex<()> = std::sync::Mutex::new(());

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    #[test]
    fn test_table_stacks_words_unknowns_and_padding() {
        let _rng   = BACKEND_RNG.lock().unwrap_or_else(|e| e.into_inner());
        let device = Default::default();
        let matrix = EmbeddingMatrix { dim: 2, data: vec![1.0, 2.0, 3.0, 4.0] };
        let table  = embedding_table::<NdArray>(&matrix, 4, true, &device);
        assert_eq!(table.dims(), [7, 2]);

        let host = to_matrix(table).unwrap();
        assert_eq!(host.row(1), &[3.0, 4.0]);
        assert_eq!(host.row(6), &[0.0, 0.0]);
        check_layout(&host, &IndexLayout::new(2, 4)).unwrap();
        assert!(check_layout(&host, &IndexLayout::new(2, 1)).is_err());
    }

    #[test]
    fn test_plain_mode_unknown_rows_are_zero() {
        let device = Default::default();
        let matrix = EmbeddingMatrix { dim: 3, data: vec![1.0; 3] };
        let host   = to_matrix(embedding_table::<NdArray>(&matrix, 1, false, &device)).unwrap();
        assert_eq!(host.rows(), 3);
        assert_eq!(host.row(1), &[0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_nonzero_padding_row_fails_layout_check() {
        let table = EmbeddingMatrix { dim: 2, data: vec![1.0, 2.0, 0.0, 0.0, 0.5, 0.0] };
        let err = check_layout(&table, &IndexLayout::new(1, 1)).unwrap_err();
        assert!(err.to_string().contains("Padding row 2"));
    }

    #[test]
    fn test_seeded_unknown_rows_repeat_and_are_nonzero() {
        let _rng   = BACKEND_RNG.lock().unwrap_or_else(|e| e.into_inner());
        let device = Default::default();
        let matrix = EmbeddingMatrix { dim: 3, data: vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6] };
        let layout = IndexLayout::new(2, 4);

        // Same seed, same unknown-class vectors.
        <NdArray>::seed(7);
        let first  = to_matrix(embedding_table::<NdArray>(&matrix, 4, true, &device)).unwrap();
        <NdArray>::seed(7);
        let second = to_matrix(embedding_table::<NdArray>(&matrix, 4, true, &device)).unwrap();

        // Rows V .. V+C hold the unknown classes.
        for c in 0..4 {
            let row = layout.unknown_id(c);
            assert_eq!(first.row(row), second.row(row));
            assert!(first.row(row).iter().any(|v| *v != 0.0));
        }
        check_layout(&first, &layout).unwrap();
    }
}
