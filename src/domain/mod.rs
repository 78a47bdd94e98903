// Domain layer: the frame model and the ports the pipeline stages depend on.

pub mod model;
pub mod ports;
