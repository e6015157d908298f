//! Synchronization primitives for one-time cache population

mod once_barrier;

pub use once_barrier::OnceBarrier;
