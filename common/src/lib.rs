pub mod bit_buffer2;
pub mod buffer2;
pub mod float_ext;

pub const EPSILON: f64 = 1e-6;
