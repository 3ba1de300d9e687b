#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Device {
    Cpu,
    Cuda { device_id: u32 },
}

/// Where a model executes and how many compute threads a single call may
/// use inside the backend. Chosen at load time and immutable for the
/// handle's lifetime.
///
/// The intra-call budget exists to keep outer-pool workers and backend
/// kernel threads from multiplying into oversubscription: the CPU default
/// caps intra-op threads at 1 so the worker pool is the sole source of
/// concurrency. On CUDA the kernels run on the device, but the budget
/// still governs host-side pre/post-processing threads.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceProvider {
    pub device: Device,
    pub intra_threads: usize,
}

impl DeviceProvider {
    pub fn cpu() -> Self {
        Self {
            device: Device::Cpu,
            intra_threads: 1,
        }
    }

    pub fn cpu_with_intra_threads(intra_threads: usize) -> Self {
        Self {
            device: Device::Cpu,
            intra_threads: intra_threads.max(1),
        }
    }

    pub fn cuda(device_id: u32) -> Self {
        Self {
            device: Device::Cuda { device_id },
            intra_threads: 1,
        }
    }

    pub fn intra_threads(&self) -> usize {
        self.intra_threads
    }
}
