//! Gathering side of the daemon. [sampler::Sampler] asks the platform which application is
//! focused and [tracker::SessionTracker] turns those samples into committed time.

pub mod sampler;
pub mod tracker;
