use crate::{DeviceProvider, ExecuteError, IOName, LoadError, ModelSignature, ModelSource, Tensor};

pub trait Backend: Send + Sync + 'static {
    type Model: BackendModel;

    fn name(&self) -> &'static str;

    fn load(&self, source: &ModelSource, provider: DeviceProvider)
        -> Result<Self::Model, LoadError>;
}

/// A loaded model handle. Immutable after `Backend::load`: the graph
/// representation is read-only during execution, so `execute` is safe to
/// call concurrently from many threads as long as each caller holds its
/// own context and its own input/output tensors.
pub trait BackendModel: Send + Sync + 'static {
    /// Per-call scratch state. Exclusively owned by one in-flight call at
    /// a time; the runtime pools these and never shares one between calls.
    type Context: Send + 'static;

    fn signature(&self) -> &ModelSignature;

    fn provider(&self) -> &DeviceProvider;

    fn create_context(&self) -> Result<Self::Context, LoadError>;

    /// Run one inference call. Inputs arrive in signature order, already
    /// validated against `signature()` by the caller.
    fn execute(
        &self,
        ctx: &mut Self::Context,
        inputs: Vec<(IOName, Tensor)>,
    ) -> Result<Vec<(IOName, Tensor)>, ExecuteError>;
}
