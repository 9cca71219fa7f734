mod analysis;
mod particles;
mod system;

pub use analysis::WasmPoincareRunner;
pub use particles::WasmParticleField;
pub use system::WasmIntegrator;
