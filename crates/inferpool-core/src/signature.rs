use std::fmt;

use crate::{DType, Tensor, ValidationError};

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct IOName(pub String);

impl IOName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

impl fmt::Display for IOName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Expected dtype and shape for one named model input or output.
/// `None` dims are dynamic axes fixed only at execution time.
#[derive(Clone, Debug)]
pub struct TensorSpec {
    pub name: IOName,
    pub dtype: DType,
    pub dims: Vec<Option<usize>>,
}

impl TensorSpec {
    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    /// Check a concrete tensor against this spec. Dynamic axes accept any
    /// non-zero size; fixed axes must match exactly.
    pub fn validate(&self, tensor: &Tensor) -> Result<(), ValidationError> {
        if tensor.dtype != self.dtype {
            return Err(ValidationError::DTypeMismatch {
                name: self.name.0.clone(),
                expected: self.dtype,
                actual: tensor.dtype,
            });
        }

        if tensor.shape.rank() != self.rank() {
            return Err(ValidationError::RankMismatch {
                name: self.name.0.clone(),
                expected: self.rank(),
                actual: tensor.shape.rank(),
            });
        }

        for (axis, (expected, &actual)) in
            self.dims.iter().zip(tensor.shape.dims()).enumerate()
        {
            if actual == 0 {
                return Err(ValidationError::ZeroDim {
                    name: self.name.0.clone(),
                    axis,
                });
            }
            if let Some(expected) = expected {
                if actual != *expected {
                    return Err(ValidationError::ShapeMismatch {
                        name: self.name.0.clone(),
                        axis,
                        expected: *expected,
                        actual,
                    });
                }
            }
        }

        let expected_bytes = tensor.shape.numel() * tensor.dtype.size_bytes();
        if tensor.byte_len() != expected_bytes {
            return Err(ValidationError::ByteLenMismatch {
                name: self.name.0.clone(),
                expected: expected_bytes,
                actual: tensor.byte_len(),
            });
        }

        Ok(())
    }
}

/// Named input and output signatures of a loaded model, in graph order.
#[derive(Clone, Debug)]
pub struct ModelSignature {
    pub inputs: Vec<TensorSpec>,
    pub outputs: Vec<TensorSpec>,
}

impl ModelSignature {
    pub fn input(&self, name: &IOName) -> Option<&TensorSpec> {
        self.inputs.iter().find(|spec| &spec.name == name)
    }

    /// Validate a named input set: every signature input present exactly
    /// once, nothing extra, every tensor conforming to its spec.
    pub fn validate_inputs(&self, inputs: &[(IOName, Tensor)]) -> Result<(), ValidationError> {
        let mut seen: Vec<&IOName> = Vec::with_capacity(inputs.len());
        for (name, tensor) in inputs {
            let spec = self
                .input(name)
                .ok_or_else(|| ValidationError::UnknownInput {
                    name: name.0.clone(),
                })?;
            if seen.contains(&name) {
                return Err(ValidationError::DuplicateInput {
                    name: name.0.clone(),
                });
            }
            seen.push(name);
            spec.validate(tensor)?;
        }

        for spec in &self.inputs {
            if !seen.contains(&&spec.name) {
                return Err(ValidationError::MissingInput {
                    name: spec.name.0.clone(),
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Shape;

    fn sig() -> ModelSignature {
        ModelSignature {
            inputs: vec![TensorSpec {
                name: IOName::new("input"),
                dtype: DType::F32,
                dims: vec![None, Some(4)],
            }],
            outputs: vec![TensorSpec {
                name: IOName::new("output"),
                dtype: DType::F32,
                dims: vec![None, Some(4)],
            }],
        }
    }

    fn named(name: &str, tensor: Tensor) -> Vec<(IOName, Tensor)> {
        vec![(IOName::new(name), tensor)]
    }

    #[test]
    fn accepts_conforming_input() {
        let t = Tensor::from_f32(Shape::from_slice(&[2, 4]), &[0.0; 8]);
        assert!(sig().validate_inputs(&named("input", t)).is_ok());
    }

    #[test]
    fn rejects_fixed_axis_mismatch() {
        let t = Tensor::from_f32(Shape::from_slice(&[2, 5]), &[0.0; 10]);
        let err = sig().validate_inputs(&named("input", t)).unwrap_err();
        assert_eq!(
            err,
            ValidationError::ShapeMismatch {
                name: "input".into(),
                axis: 1,
                expected: 4,
                actual: 5,
            }
        );
    }

    #[test]
    fn rejects_zero_dynamic_axis() {
        let t = Tensor::from_f32(Shape::from_slice(&[0, 4]), &[]);
        let err = sig().validate_inputs(&named("input", t)).unwrap_err();
        assert!(matches!(err, ValidationError::ZeroDim { axis: 0, .. }));
    }

    #[test]
    fn rejects_wrong_dtype_and_unknown_name() {
        let t = Tensor::from_i64(Shape::from_slice(&[1, 4]), &[0; 4]);
        let err = sig().validate_inputs(&named("input", t)).unwrap_err();
        assert!(matches!(err, ValidationError::DTypeMismatch { .. }));

        let t = Tensor::from_f32(Shape::from_slice(&[1, 4]), &[0.0; 4]);
        let err = sig().validate_inputs(&named("other", t)).unwrap_err();
        assert!(matches!(err, ValidationError::UnknownInput { .. }));
    }

    #[test]
    fn rejects_short_buffer() {
        let short = Tensor::new(
            DType::F32,
            Shape::from_slice(&[1, 4]),
            Tensor::from_f32(Shape::from_slice(&[2]), &[0.0; 2]).bytes,
        );
        let err = sig().validate_inputs(&named("input", short)).unwrap_err();
        assert!(matches!(err, ValidationError::ByteLenMismatch { .. }));
    }

    #[test]
    fn rejects_missing_and_duplicate() {
        let err = sig().validate_inputs(&[]).unwrap_err();
        assert!(matches!(err, ValidationError::MissingInput { .. }));

        let t = Tensor::from_f32(Shape::from_slice(&[1, 4]), &[0.0; 4]);
        let twice = vec![
            (IOName::new("input"), t.clone()),
            (IOName::new("input"), t),
        ];
        let err = sig().validate_inputs(&twice).unwrap_err();
        assert!(matches!(err, ValidationError::DuplicateInput { .. }));
    }
}
