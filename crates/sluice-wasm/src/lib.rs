// WASM streaming session bridge entry point.

#[cfg(target_arch = "wasm32")]
mod bridge;

// Re-export for wasm-bindgen.
#[cfg(target_arch = "wasm32")]
pub use bridge::SluiceBridge;
