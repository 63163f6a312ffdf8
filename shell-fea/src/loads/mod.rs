//! Surface pressures and load combinations

mod load_combo;
mod surface_pressure;

pub use load_combo::LoadCombination;
pub use surface_pressure::SurfacePressure;
