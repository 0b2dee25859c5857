//! GPU side of the viewer.
//!
//! - `context` owns wgpu instance/device/surface wiring and reconfigures the
//!   swapchain when the window resizes.
//! - `pipeline` turns a validated [`ShaderProgram`](crate::ShaderProgram) into a
//!   render pipeline with a uniform group and a palette group.
//! - `palette` uploads the colour stops as a repeating lookup texture.
//! - `uniforms` packs projected frame values into the std140 block.
//! - `state` glues everything together and exposes the `GpuState` API used by
//!   `window`.

mod context;
mod palette;
mod pipeline;
mod state;
mod uniforms;

pub use context::AdapterProfile;
pub(crate) use state::GpuState;
