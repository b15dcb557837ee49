// Domain layer: data file / warehouse models and ports (interfaces).

pub mod model;
pub mod ports;
