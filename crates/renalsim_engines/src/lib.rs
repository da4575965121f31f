#![forbid(unsafe_code)]

pub mod staging;
pub mod treatment;
