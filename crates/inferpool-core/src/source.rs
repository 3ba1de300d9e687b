use bytes::Bytes;

/// Serialized model graph handed to a backend loader.
#[derive(Clone, Debug)]
pub enum ModelSource {
    OnnxPath(std::path::PathBuf),
    OnnxBytes(Bytes),
}
