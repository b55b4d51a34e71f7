use ndarray::Array2;
use sprs::{CsMat, TriMat};

/// Samples × genes matrix, stored dense or as CSR depending on fill.
#[derive(Debug, Clone, PartialEq)]
pub enum AbundanceMatrix {
    Dense(Array2<f64>),
    Sparse(CsMat<f64>),
}

impl AbundanceMatrix {
    pub fn from_dense(dense: Array2<f64>, threshold: f64) -> Self {
        let total = dense.len();
        if total == 0 {
            return AbundanceMatrix::Dense(dense);
        }
        let nnz = dense.iter().filter(|value| **value != 0.0).count();
        if (nnz as f64) / (total as f64) < threshold {
            AbundanceMatrix::Sparse(compress(&dense))
        } else {
            AbundanceMatrix::Dense(dense)
        }
    }

    pub fn dim(&self) -> (usize, usize) {
        match self {
            AbundanceMatrix::Dense(dense) => dense.dim(),
            AbundanceMatrix::Sparse(sparse) => sparse.shape(),
        }
    }

    pub fn is_sparse(&self) -> bool {
        matches!(self, AbundanceMatrix::Sparse(_))
    }

    pub fn to_dense(&self) -> Array2<f64> {
        match self {
            AbundanceMatrix::Dense(dense) => dense.clone(),
            AbundanceMatrix::Sparse(sparse) => sparse.to_dense(),
        }
    }
}

fn compress(dense: &Array2<f64>) -> CsMat<f64> {
    let mut triplets = TriMat::new(dense.dim());
    for ((row, col), &value) in dense.indexed_iter() {
        if value != 0.0 {
            triplets.add_triplet(row, col, value);
        }
    }
    triplets.to_csr()
}
