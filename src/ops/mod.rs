pub mod handles;
pub mod hit_test;
pub mod resample;
pub mod transform;
