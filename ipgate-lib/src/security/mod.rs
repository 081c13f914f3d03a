pub mod gate;

pub use gate::AccessGate;
