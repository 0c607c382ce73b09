pub const EPSILON1: f64 = 0.1;
pub const EPSILON2: f64 = 0.01;
pub const EPSILON3: f64 = 0.001;
pub const EPSILON5: f64 = 0.00001;
pub const EPSILON7: f64 = 0.0000001;
pub const EPSILON10: f64 = 0.0000000001;
pub const EPSILON12: f64 = 0.000000000001;
pub const EPSILON14: f64 = 0.00000000000001;
pub const EPSILON15: f64 = 0.000000000000001;
