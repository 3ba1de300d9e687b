use std::fmt;

use bytes::Bytes;
use smallvec::SmallVec;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DType {
    F32,
    F16,
    I64,
    I32,
    U8,
}

impl DType {
    pub fn size_bytes(self) -> usize {
        match self {
            DType::F32 => 4,
            DType::F16 => 2,
            DType::I64 => 8,
            DType::I32 => 4,
            DType::U8 => 1,
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DType::F32 => "f32",
            DType::F16 => "f16",
            DType::I64 => "i64",
            DType::I32 => "i32",
            DType::U8 => "u8",
        };
        f.write_str(s)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Shape(pub SmallVec<[usize; 6]>);

impl Shape {
    pub fn from_slice(dims: &[usize]) -> Self {
        Self(dims.iter().copied().collect())
    }

    pub fn rank(&self) -> usize {
        self.0.len()
    }

    /// Element count; a rank-0 scalar counts as one element, while a
    /// zero-sized axis yields zero (rejected at validation time).
    pub fn numel(&self) -> usize {
        if self.0.is_empty() {
            1
        } else {
            self.0.iter().product()
        }
    }

    pub fn dims(&self) -> &[usize] {
        &self.0
    }
}

/// A typed, shaped view over an owned contiguous little-endian buffer.
///
/// `Bytes` storage makes cloning a tensor a refcount bump, so requests can
/// be handed to worker threads without copying the payload.
#[derive(Clone, Debug)]
pub struct Tensor {
    pub dtype: DType,
    pub shape: Shape,
    pub bytes: Bytes,
}

impl Tensor {
    pub fn new(dtype: DType, shape: Shape, bytes: Bytes) -> Self {
        Self {
            dtype,
            shape,
            bytes,
        }
    }

    pub fn byte_len(&self) -> usize {
        self.bytes.len()
    }

    pub fn from_f32(shape: Shape, data: &[f32]) -> Self {
        Self::new(DType::F32, shape, bytes_from_slice(data))
    }

    pub fn from_i64(shape: Shape, data: &[i64]) -> Self {
        Self::new(DType::I64, shape, bytes_from_slice(data))
    }

    pub fn from_i32(shape: Shape, data: &[i32]) -> Self {
        Self::new(DType::I32, shape, bytes_from_slice(data))
    }

    pub fn from_u8(shape: Shape, data: &[u8]) -> Self {
        Self::new(DType::U8, shape, Bytes::copy_from_slice(data))
    }

    /// Decode the buffer as `f32`; `None` when the dtype or byte length
    /// does not line up.
    pub fn f32_data(&self) -> Option<Vec<f32>> {
        if self.dtype != DType::F32 || self.bytes.len() % 4 != 0 {
            return None;
        }
        Some(
            self.bytes
                .chunks_exact(4)
                .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                .collect(),
        )
    }

    pub fn i64_data(&self) -> Option<Vec<i64>> {
        if self.dtype != DType::I64 || self.bytes.len() % 8 != 0 {
            return None;
        }
        Some(
            self.bytes
                .chunks_exact(8)
                .map(|b| i64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]))
                .collect(),
        )
    }

    pub fn i32_data(&self) -> Option<Vec<i32>> {
        if self.dtype != DType::I32 || self.bytes.len() % 4 != 0 {
            return None;
        }
        Some(
            self.bytes
                .chunks_exact(4)
                .map(|b| i32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                .collect(),
        )
    }

    pub fn u8_data(&self) -> Option<Vec<u8>> {
        if self.dtype != DType::U8 {
            return None;
        }
        Some(self.bytes.to_vec())
    }
}

fn bytes_from_slice<T>(slice: &[T]) -> Bytes {
    let byte_len = std::mem::size_of_val(slice);
    let ptr = slice.as_ptr().cast::<u8>();
    let bytes = unsafe { std::slice::from_raw_parts(ptr, byte_len) };
    Bytes::copy_from_slice(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numel_counts_scalars_as_one() {
        assert_eq!(Shape::from_slice(&[]).numel(), 1);
        assert_eq!(Shape::from_slice(&[2, 3, 4]).numel(), 24);
        assert_eq!(Shape::from_slice(&[2, 0]).numel(), 0);
    }

    #[test]
    fn f32_round_trip() {
        let data = vec![0.5f32, -1.0, 3.25];
        let t = Tensor::from_f32(Shape::from_slice(&[3]), &data);
        assert_eq!(t.byte_len(), 12);
        assert_eq!(t.f32_data().unwrap(), data);
    }

    #[test]
    fn decode_rejects_wrong_dtype() {
        let t = Tensor::from_i64(Shape::from_slice(&[2]), &[1, 2]);
        assert!(t.f32_data().is_none());
        assert_eq!(t.i64_data().unwrap(), vec![1, 2]);
    }
}
