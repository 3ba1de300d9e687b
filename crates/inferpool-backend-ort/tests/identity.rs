use std::path::PathBuf;

use anyhow::{ensure, Context, Result};
use bytes::Bytes;
use inferpool_backend_ort::OrtBackend;
use inferpool_core::{Backend, BackendModel, DType, DeviceProvider, LoadError, ModelSource, Shape, Tensor};

fn identity_model_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../models/identity.onnx")
}

#[test]
fn ort_identity_cpu() -> Result<()> {
    let model_path = identity_model_path();
    if !model_path.exists() {
        eprintln!("skipping: {} not present", model_path.display());
        return Ok(());
    }

    let backend = OrtBackend::new();
    let model = backend.load(&ModelSource::OnnxPath(model_path), DeviceProvider::cpu())?;

    let input_spec = model
        .signature()
        .inputs
        .first()
        .context("missing model input spec")?;
    ensure!(input_spec.dtype == DType::F32, "expected f32 identity model");

    let mut shape = input_spec
        .dims
        .iter()
        .map(|d| d.unwrap_or(3))
        .collect::<Vec<_>>();
    if shape.is_empty() {
        shape.push(3);
    }

    let numel = shape.iter().product::<usize>().max(1);
    let data: Vec<f32> = (0..numel).map(|i| i as f32).collect();
    let input = Tensor::from_f32(Shape::from_slice(&shape), &data);

    let mut ctx = model.create_context()?;
    let name = input_spec.name.clone();
    let outputs = model.execute(&mut ctx, vec![(name, input)])?;
    let (_, out) = outputs.first().context("missing model output")?;
    ensure!(out.dtype == DType::F32, "expected f32 output");
    assert_eq!(out.f32_data().context("decode output")?, data);

    Ok(())
}

#[test]
fn corrupt_bytes_fail_with_malformed() {
    let backend = OrtBackend::new();
    let source = ModelSource::OnnxBytes(Bytes::from_static(b"not an onnx graph"));
    let err = backend
        .load(&source, DeviceProvider::cpu())
        .err()
        .expect("corrupt source must not produce a handle");
    assert!(matches!(err, LoadError::Malformed(_)), "got {err:?}");
}

#[test]
fn nonexistent_path_fails_with_io() {
    let backend = OrtBackend::new();
    let source = ModelSource::OnnxPath(PathBuf::from("/definitely/not/here.onnx"));
    let err = backend
        .load(&source, DeviceProvider::cpu())
        .err()
        .expect("missing file must not produce a handle");
    assert!(matches!(err, LoadError::Io(_)), "got {err:?}");
}

#[cfg(not(feature = "cuda"))]
#[test]
fn cuda_without_feature_is_unavailable_not_fallback() {
    let backend = OrtBackend::new();
    let source = ModelSource::OnnxBytes(Bytes::from_static(b""));
    let err = backend
        .load(&source, DeviceProvider::cuda(0))
        .err()
        .expect("unavailable device must fail loading");
    assert!(matches!(err, LoadError::DeviceUnavailable(_)), "got {err:?}");
}
