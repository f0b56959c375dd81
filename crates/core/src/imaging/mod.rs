pub mod annotate;
pub mod decode;
pub mod transform;
