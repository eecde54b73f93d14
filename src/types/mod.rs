// ABOUTME: Validated domain types shared by the spec, store, and engine.
// ABOUTME: Container identities, service names, image names, and content digests.

mod digest;
mod id;
mod image_ref;
mod service_name;

pub use digest::Digest;
pub use id::{Ctid, CtidError};
pub use image_ref::{ImageName, ImageNameError};
pub use service_name::{ServiceName, ServiceNameError};
