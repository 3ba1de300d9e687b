use inferpool_core::{IOName, Tensor};

/// One inference call: named input tensors satisfying the model signature.
#[derive(Clone, Debug)]
pub struct InferenceRequest {
    pub inputs: Vec<(IOName, Tensor)>,
}

impl InferenceRequest {
    pub fn new(inputs: Vec<(IOName, Tensor)>) -> Self {
        Self { inputs }
    }

    pub fn single(name: IOName, tensor: Tensor) -> Self {
        Self {
            inputs: vec![(name, tensor)],
        }
    }
}

#[derive(Debug)]
pub struct InferenceResult {
    pub outputs: Vec<(IOName, Tensor)>,
    pub timings: Timings,
}

impl InferenceResult {
    pub fn output(&self, name: &IOName) -> Option<&Tensor> {
        self.outputs
            .iter()
            .find(|(candidate, _)| candidate == name)
            .map(|(_, tensor)| tensor)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Timings {
    /// Time spent waiting for a pooled execution context.
    pub queued_us: u64,
    /// Time spent inside the backend execute call.
    pub backend_us: u64,
}
