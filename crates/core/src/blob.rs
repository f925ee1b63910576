//! Dense numeric matrices stored as raw SQLite blobs.
//!
//! A blob is the row-major dump of a matrix's elements at their native width.
//! It carries no shape or element type: callers keep `rows`/`cols` in sibling
//! columns and know the element type from the column it was read from
//! (keypoints `f32`, descriptors `u8`, match indices `u32`, geometry `f64`).

use std::fmt::Debug;

use bytemuck::Pod;

use crate::error::{Error, Result};

/// Element types that may be stored in a blob.
pub trait Element: Pod + PartialEq + Debug {}

impl Element for u8 {}
impl Element for u32 {}
impl Element for f32 {}
impl Element for f64 {}

/// A row-major matrix with an explicit shape.
///
/// `null` marks an empty matrix read from a SQL NULL blob, so it is written
/// back as NULL rather than as a zero-length blob.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix<T> {
    rows: usize,
    cols: usize,
    data: Vec<T>,
    null: bool,
}

impl<T: Element> Matrix<T> {
    /// Build a matrix from row-major data. Fails if `data.len() != rows * cols`.
    pub fn new(rows: usize, cols: usize, data: Vec<T>) -> Result<Self> {
        let expected = rows.checked_mul(cols).ok_or(Error::InvalidShape {
            rows: rows as i64,
            cols: cols as i64,
        })?;
        if data.len() != expected {
            return Err(Error::Format {
                expected: expected * std::mem::size_of::<T>(),
                actual: data.len() * std::mem::size_of::<T>(),
            });
        }
        Ok(Self {
            rows,
            cols,
            data,
            null: false,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// True when the matrix came from a NULL blob.
    pub fn is_null(&self) -> bool {
        self.null
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    pub fn get(&self, row: usize, col: usize) -> T {
        self.data[row * self.cols + col]
    }

    pub fn transpose(&self) -> Self {
        let mut data = Vec::with_capacity(self.data.len());
        for c in 0..self.cols {
            for r in 0..self.rows {
                data.push(self.get(r, c));
            }
        }
        Self {
            rows: self.cols,
            cols: self.rows,
            data,
            null: self.null,
        }
    }

    /// Swap two columns in place on every row.
    pub fn swap_columns(&mut self, a: usize, b: usize) {
        if a == b || self.cols == 0 {
            return;
        }
        for row in self.data.chunks_exact_mut(self.cols) {
            row.swap(a, b);
        }
    }
}

/// Dump a matrix's elements in row-major order at native width.
pub fn encode<T: Element>(matrix: &Matrix<T>) -> Vec<u8> {
    bytemuck::cast_slice(&matrix.data).to_vec()
}

/// Like [`encode`], but `None` for a matrix read from a NULL blob.
pub fn encode_nullable<T: Element>(matrix: &Matrix<T>) -> Option<Vec<u8>> {
    (!matrix.null).then(|| encode(matrix))
}

/// Reinterpret `bytes` as a `rows x cols` matrix of `T`.
///
/// The shape arrives straight from SQLite integer columns, so negative or
/// overflowing values are rejected rather than wrapped. The input buffer may
/// have any alignment.
pub fn decode<T: Element>(bytes: &[u8], rows: i64, cols: i64) -> Result<Matrix<T>> {
    let (r, c) = match (usize::try_from(rows), usize::try_from(cols)) {
        (Ok(r), Ok(c)) => (r, c),
        _ => return Err(Error::InvalidShape { rows, cols }),
    };
    let count = r
        .checked_mul(c)
        .ok_or(Error::InvalidShape { rows, cols })?;
    let expected = count
        .checked_mul(std::mem::size_of::<T>())
        .ok_or(Error::InvalidShape { rows, cols })?;
    if bytes.len() != expected {
        return Err(Error::Format {
            expected,
            actual: bytes.len(),
        });
    }

    let mut data = vec![T::zeroed(); count];
    bytemuck::cast_slice_mut::<T, u8>(&mut data).copy_from_slice(bytes);
    Ok(Matrix {
        rows: r,
        cols: c,
        data,
        null: false,
    })
}

/// Like [`decode`], for a column that may hold NULL. A NULL blob decodes to an
/// empty matrix only when the shape is empty too.
pub fn decode_nullable<T: Element>(
    bytes: Option<&[u8]>,
    rows: i64,
    cols: i64,
) -> Result<Matrix<T>> {
    match bytes {
        Some(bytes) => decode(bytes, rows, cols),
        None => {
            let mut matrix = decode(&[], rows, cols)?;
            matrix.null = true;
            Ok(matrix)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    const SHAPES: [(usize, usize); 5] = [(0, 128), (1, 1), (5, 2), (37, 9), (500, 128)];

    fn random_matrix<T: Element>(
        rng: &mut StdRng,
        rows: usize,
        cols: usize,
        mut gen: impl FnMut(&mut StdRng) -> T,
    ) -> Matrix<T> {
        let data = (0..rows * cols).map(|_| gen(rng)).collect();
        Matrix::new(rows, cols, data).unwrap()
    }

    fn assert_round_trip<T: Element>(m: &Matrix<T>) {
        let bytes = encode(m);
        assert_eq!(bytes.len(), m.rows() * m.cols() * std::mem::size_of::<T>());
        let back: Matrix<T> = decode(&bytes, m.rows() as i64, m.cols() as i64).unwrap();
        assert_eq!(back.rows(), m.rows());
        assert_eq!(back.cols(), m.cols());
        assert_eq!(
            bytemuck::cast_slice::<T, u8>(back.as_slice()),
            bytemuck::cast_slice::<T, u8>(m.as_slice())
        );
    }

    #[test]
    fn test_round_trip_u8() {
        let mut rng = StdRng::seed_from_u64(1);
        for (r, c) in SHAPES {
            assert_round_trip(&random_matrix(&mut rng, r, c, |g| g.gen::<u8>()));
        }
    }

    #[test]
    fn test_round_trip_u32() {
        let mut rng = StdRng::seed_from_u64(2);
        for (r, c) in SHAPES {
            assert_round_trip(&random_matrix(&mut rng, r, c, |g| g.gen::<u32>()));
        }
    }

    #[test]
    fn test_round_trip_f32_bit_identical() {
        let mut rng = StdRng::seed_from_u64(3);
        for (r, c) in SHAPES {
            // Arbitrary bit patterns, NaN payloads and subnormals included
            assert_round_trip(&random_matrix(&mut rng, r, c, |g| f32::from_bits(g.gen())));
        }
    }

    #[test]
    fn test_round_trip_f64_bit_identical() {
        let mut rng = StdRng::seed_from_u64(4);
        for (r, c) in SHAPES {
            assert_round_trip(&random_matrix(&mut rng, r, c, |g| f64::from_bits(g.gen())));
        }
    }

    #[test]
    fn test_known_u8_bytes() {
        let m = Matrix::new(5, 2, vec![6u8, 227, 209, 98, 49, 179, 17, 177, 96, 183]).unwrap();
        assert_eq!(encode(&m), b"\x06\xe3\xd1b1\xb3\x11\xb1`\xb7".to_vec());
    }

    #[test]
    fn test_known_f32_bytes() {
        let bytes = b"\xb4 $\xbf0Z\xbe>\x90}F?";
        let m: Matrix<f32> = decode(bytes, 1, 3).unwrap();
        assert_eq!(m.as_slice(), &[-0.641124f32, 0.37178183, 0.77535343]);
    }

    #[test]
    fn test_decode_length_mismatch() {
        let bytes = vec![0u8; 10];
        let err = decode::<f32>(&bytes, 1, 3).unwrap_err();
        assert!(matches!(
            err,
            Error::Format {
                expected: 12,
                actual: 10
            }
        ));
        // Never truncated: extra bytes are an error too
        assert!(decode::<u8>(&bytes, 3, 3).is_err());
    }

    #[test]
    fn test_decode_negative_shape() {
        let err = decode::<u8>(&[], -1, 0).unwrap_err();
        assert!(matches!(err, Error::InvalidShape { rows: -1, cols: 0 }));
    }

    #[test]
    fn test_decode_unaligned_buffer() {
        let m = Matrix::new(2, 2, vec![1.5f64, -2.0, 3.25, 1e300]).unwrap();
        let mut padded = vec![0u8];
        padded.extend(encode(&m));
        let back: Matrix<f64> = decode(&padded[1..], 2, 2).unwrap();
        assert_eq!(back, m);
    }

    #[test]
    fn test_new_rejects_wrong_length() {
        assert!(Matrix::new(2, 2, vec![1u32, 2, 3]).is_err());
    }

    #[test]
    fn test_transpose() {
        let m = Matrix::new(2, 3, vec![1u32, 2, 3, 4, 5, 6]).unwrap();
        let t = m.transpose();
        assert_eq!((t.rows(), t.cols()), (3, 2));
        assert_eq!(t.as_slice(), &[1, 4, 2, 5, 3, 6]);
        assert_eq!(t.transpose(), m);
    }

    #[test]
    fn test_swap_columns() {
        let mut m = Matrix::new(3, 2, vec![0u32, 10, 1, 11, 2, 12]).unwrap();
        m.swap_columns(0, 1);
        assert_eq!(m.as_slice(), &[10, 0, 11, 1, 12, 2]);
    }

    #[test]
    fn test_swap_columns_on_empty_matrix() {
        let mut no_cols = Matrix::<u32>::new(0, 0, Vec::new()).unwrap();
        no_cols.swap_columns(0, 1);
        assert_eq!(no_cols.cols(), 0);

        let mut no_rows = Matrix::<u32>::new(0, 2, Vec::new()).unwrap();
        no_rows.swap_columns(0, 1);
        assert!(no_rows.as_slice().is_empty());
    }

    #[test]
    fn test_null_blob_kept_distinct_from_empty() {
        let null: Matrix<u8> = decode_nullable(None, 0, 128).unwrap();
        assert!(null.is_null());
        assert_eq!((null.rows(), null.cols()), (0, 128));
        assert_eq!(encode_nullable(&null), None);

        let empty: Matrix<u8> = decode_nullable(Some(&[]), 0, 128).unwrap();
        assert!(!empty.is_null());
        assert_eq!(encode_nullable(&empty), Some(Vec::new()));
        assert_ne!(null, empty);
    }

    #[test]
    fn test_null_blob_with_nonempty_shape_rejected() {
        let err = decode_nullable::<f32>(None, 2, 2).unwrap_err();
        assert!(matches!(
            err,
            Error::Format {
                expected: 16,
                actual: 0
            }
        ));
    }
}
