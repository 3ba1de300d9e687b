//! ONNX Runtime backend.
//!
//! Loads a serialized graph into an immutable `Session` and exposes it
//! through the `BackendModel` contract: the session is read-only during
//! execution, per-call state lives in the pooled `OrtContext`, and the
//! device provider decides both placement and the intra-op thread budget.

use bytes::Bytes;
use inferpool_core::{
    Backend, BackendModel, DType, Device, DeviceProvider, ExecuteError, IOName, LoadError,
    ModelSignature, ModelSource, Shape, Tensor, TensorSpec,
};
use ort::{
    session::{builder::SessionBuilder, RunOptions, Session, SessionInputValue},
    tensor::TensorElementType,
    value::{DynValue, ValueType},
};
use tracing::info;

pub struct OrtBackend;

impl OrtBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for OrtBackend {
    fn default() -> Self {
        Self::new()
    }
}

pub struct OrtModel {
    signature: ModelSignature,
    provider: DeviceProvider,
    session: Session,
    input_names: Vec<String>,
}

/// Per-call scratch for one in-flight session run. Owning the `RunOptions`
/// here keeps every call's run state exclusive to the caller holding the
/// pooled context.
pub struct OrtContext {
    options: RunOptions,
}

impl Backend for OrtBackend {
    type Model = OrtModel;

    fn name(&self) -> &'static str {
        "onnxruntime"
    }

    fn load(
        &self,
        source: &ModelSource,
        provider: DeviceProvider,
    ) -> Result<Self::Model, LoadError> {
        let builder = Session::builder()
            .map_err(|e| LoadError::Backend(format!("failed to create session builder: {e}")))?
            .with_optimization_level(ort::session::builder::GraphOptimizationLevel::Level3)
            .map_err(|e| LoadError::Backend(format!("failed to configure session builder: {e}")))?
            .with_intra_threads(provider.intra_threads())
            .map_err(|e| LoadError::Backend(format!("failed to set intra-op threads: {e}")))?;

        let builder = configure_device(builder, &provider.device)?;

        let session = match source {
            ModelSource::OnnxPath(path) => {
                // Distinguish a missing file from a parse failure.
                std::fs::metadata(path)?;
                builder
                    .commit_from_file(path)
                    .map_err(|e| LoadError::Malformed(e.to_string()))?
            }
            ModelSource::OnnxBytes(bytes) => builder
                .commit_from_memory(bytes)
                .map_err(|e| LoadError::Malformed(e.to_string()))?,
        };

        let input_names = session
            .inputs
            .iter()
            .map(|input| input.name.clone())
            .collect();
        let signature = build_signature(&session)?;

        info!(
            backend = "onnxruntime",
            device = ?provider.device,
            intra_threads = provider.intra_threads(),
            inputs = signature.inputs.len(),
            outputs = signature.outputs.len(),
            "model loaded"
        );

        Ok(OrtModel {
            signature,
            provider,
            session,
            input_names,
        })
    }
}

impl BackendModel for OrtModel {
    type Context = OrtContext;

    fn signature(&self) -> &ModelSignature {
        &self.signature
    }

    fn provider(&self) -> &DeviceProvider {
        &self.provider
    }

    fn create_context(&self) -> Result<Self::Context, LoadError> {
        let options =
            RunOptions::new().map_err(|e| LoadError::Backend(format!("run options: {e}")))?;
        Ok(OrtContext { options })
    }

    fn execute(
        &self,
        ctx: &mut Self::Context,
        inputs: Vec<(IOName, Tensor)>,
    ) -> Result<Vec<(IOName, Tensor)>, ExecuteError> {
        if inputs.len() != self.input_names.len() {
            return Err(ExecuteError::InvalidInput(format!(
                "expected {} inputs, got {}",
                self.input_names.len(),
                inputs.len()
            )));
        }

        let mut ort_inputs = Vec::with_capacity(inputs.len());
        for (session_name, (name, tensor)) in self.input_names.iter().zip(inputs) {
            if name.0 != *session_name {
                return Err(ExecuteError::InvalidInput(format!(
                    "input `{name}` out of signature order (expected `{session_name}`)"
                )));
            }
            let value = tensor_to_ort_value(tensor)?;
            ort_inputs.push((session_name.clone(), SessionInputValue::from(value)));
        }

        let outputs = self
            .session
            .run_with_options(ort_inputs, &ctx.options)
            .map_err(|e| ExecuteError::Fault(e.to_string()))?;

        let mut out_tensors = Vec::with_capacity(outputs.len());
        for (name, value) in outputs.iter() {
            out_tensors.push((IOName::new(name), ort_value_to_tensor(&value)?));
        }

        Ok(out_tensors)
    }
}

fn configure_device(builder: SessionBuilder, device: &Device) -> Result<SessionBuilder, LoadError> {
    match device {
        Device::Cpu => Ok(builder),
        Device::Cuda { device_id } => configure_cuda(builder, *device_id),
    }
}

fn configure_cuda(builder: SessionBuilder, device_id: u32) -> Result<SessionBuilder, LoadError> {
    #[cfg(feature = "cuda")]
    {
        use ort::execution_providers::cuda::CUDAExecutionProvider;
        let ep = CUDAExecutionProvider::default()
            .with_device_id(device_id as i32)
            .build();
        builder
            .with_execution_providers([ep])
            .map_err(|e| LoadError::DeviceUnavailable(format!("cuda:{device_id}: {e}")))
    }
    #[cfg(not(feature = "cuda"))]
    {
        let _ = builder;
        Err(LoadError::DeviceUnavailable(format!(
            "cuda:{device_id} requested but inferpool-backend-ort was built without the `cuda` feature"
        )))
    }
}

fn build_signature(session: &Session) -> Result<ModelSignature, LoadError> {
    let inputs = session
        .inputs
        .iter()
        .map(|input| spec_from_value_type(&input.name, &input.input_type))
        .collect::<Result<Vec<_>, _>>()?;

    let outputs = session
        .outputs
        .iter()
        .map(|output| spec_from_value_type(&output.name, &output.output_type))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ModelSignature { inputs, outputs })
}

fn spec_from_value_type(name: &str, value_type: &ValueType) -> Result<TensorSpec, LoadError> {
    let ValueType::Tensor { ty, shape, .. } = value_type else {
        return Err(LoadError::Unsupported(format!(
            "IO `{name}` has a non-tensor value type"
        )));
    };

    let dtype = element_to_dtype(*ty).ok_or_else(|| {
        LoadError::Unsupported(format!("IO `{name}` has unsupported element type {ty}"))
    })?;
    let dims = shape
        .iter()
        .map(|d| if *d < 0 { None } else { Some(*d as usize) })
        .collect();

    Ok(TensorSpec {
        name: IOName::new(name),
        dtype,
        dims,
    })
}

fn element_to_dtype(ty: TensorElementType) -> Option<DType> {
    match ty {
        TensorElementType::Float32 => Some(DType::F32),
        TensorElementType::Float16 => Some(DType::F16),
        TensorElementType::Int64 => Some(DType::I64),
        TensorElementType::Int32 => Some(DType::I32),
        TensorElementType::Uint8 => Some(DType::U8),
        _ => None,
    }
}

fn tensor_to_ort_value(tensor: Tensor) -> Result<DynValue, ExecuteError> {
    let shape: Vec<usize> = tensor.shape.dims().to_vec();
    let expected_bytes = tensor.shape.numel() * tensor.dtype.size_bytes();
    if tensor.byte_len() != expected_bytes {
        return Err(ExecuteError::InvalidInput(format!(
            "input byte size mismatch: got {}, expected {expected_bytes}",
            tensor.byte_len()
        )));
    }

    let value = match tensor.dtype {
        DType::F32 => {
            let data = tensor
                .f32_data()
                .ok_or_else(|| ExecuteError::InvalidInput("f32 input has invalid byte length".into()))?;
            ort::value::Tensor::from_array((shape, data))
                .map_err(|e| ExecuteError::InvalidInput(e.to_string()))?
                .into_dyn()
        }
        DType::I64 => {
            let data = tensor
                .i64_data()
                .ok_or_else(|| ExecuteError::InvalidInput("i64 input has invalid byte length".into()))?;
            ort::value::Tensor::from_array((shape, data))
                .map_err(|e| ExecuteError::InvalidInput(e.to_string()))?
                .into_dyn()
        }
        DType::I32 => {
            let data = tensor
                .i32_data()
                .ok_or_else(|| ExecuteError::InvalidInput("i32 input has invalid byte length".into()))?;
            ort::value::Tensor::from_array((shape, data))
                .map_err(|e| ExecuteError::InvalidInput(e.to_string()))?
                .into_dyn()
        }
        DType::U8 => {
            let data = tensor.bytes.to_vec();
            ort::value::Tensor::from_array((shape, data))
                .map_err(|e| ExecuteError::InvalidInput(e.to_string()))?
                .into_dyn()
        }
        DType::F16 => {
            return Err(ExecuteError::Unsupported(
                "f16 inputs are not supported at the CPU boundary".into(),
            ))
        }
    };

    Ok(value)
}

fn ort_value_to_tensor(value: &ort::value::ValueRef<'_>) -> Result<Tensor, ExecuteError> {
    let ValueType::Tensor { ty, shape, .. } = value.dtype() else {
        return Err(ExecuteError::Unsupported(
            "non-tensor outputs are not supported".into(),
        ));
    };

    let dims: Vec<usize> = shape.iter().map(|d| *d as usize).collect();
    let out_shape = Shape::from_slice(&dims);

    match *ty {
        TensorElementType::Float32 => {
            let array = value
                .try_extract_array::<f32>()
                .map_err(|e| ExecuteError::Fault(e.to_string()))?;
            let slice = array
                .as_slice()
                .ok_or_else(|| ExecuteError::Fault("non-contiguous output tensor".into()))?;
            Ok(Tensor::new(DType::F32, out_shape, bytes_from_slice(slice)))
        }
        TensorElementType::Int64 => {
            let array = value
                .try_extract_array::<i64>()
                .map_err(|e| ExecuteError::Fault(e.to_string()))?;
            let slice = array
                .as_slice()
                .ok_or_else(|| ExecuteError::Fault("non-contiguous output tensor".into()))?;
            Ok(Tensor::new(DType::I64, out_shape, bytes_from_slice(slice)))
        }
        TensorElementType::Int32 => {
            let array = value
                .try_extract_array::<i32>()
                .map_err(|e| ExecuteError::Fault(e.to_string()))?;
            let slice = array
                .as_slice()
                .ok_or_else(|| ExecuteError::Fault("non-contiguous output tensor".into()))?;
            Ok(Tensor::new(DType::I32, out_shape, bytes_from_slice(slice)))
        }
        TensorElementType::Uint8 => {
            let array = value
                .try_extract_array::<u8>()
                .map_err(|e| ExecuteError::Fault(e.to_string()))?;
            let slice = array
                .as_slice()
                .ok_or_else(|| ExecuteError::Fault("non-contiguous output tensor".into()))?;
            Ok(Tensor::new(DType::U8, out_shape, bytes_from_slice(slice)))
        }
        TensorElementType::Float16 => Err(ExecuteError::Unsupported(
            "f16 outputs are not supported at the CPU boundary".into(),
        )),
        other => Err(ExecuteError::Unsupported(format!(
            "unsupported output tensor element type: {other}"
        ))),
    }
}

fn bytes_from_slice<T>(slice: &[T]) -> Bytes {
    let byte_len = std::mem::size_of_val(slice);
    let ptr = slice.as_ptr().cast::<u8>();
    let bytes = unsafe { std::slice::from_raw_parts(ptr, byte_len) };
    Bytes::copy_from_slice(bytes)
}
