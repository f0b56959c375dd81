pub mod device_claims;
#[cfg(feature = "camera")]
pub mod nokhwa_driver;
pub mod still_image_driver;
pub mod streamed_frame_source;
