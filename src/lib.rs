#![forbid(unsafe_code)]

pub mod gma;
