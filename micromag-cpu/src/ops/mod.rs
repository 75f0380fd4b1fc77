//! Op trait implementations for [`CpuBackend`](crate::CpuBackend).
//!
//! Each launch clones the partition handles into a job and queues it on
//! the target device's stream. Slicing to the per-device count happens
//! inside the job, so a size mismatch faults that stream instead of the
//! caller.

mod arith;
mod normalize;
mod torque;
