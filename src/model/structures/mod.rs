pub mod mode;
pub mod partition;
pub mod variant;
