pub mod composer;
pub mod integrator;
pub mod pipeline;
pub mod sampler;
pub mod scene;

mod rng;

#[cfg(test)]
mod test_harness;

pub use composer::OcclusionMap;
pub use pipeline::{bake, BakeControl, BakeOutput, BakeProgress, BakeReport, BakeTimings};
pub use sampler::{build_samples, SampleSet, TexelSample};
pub use scene::{Hit, OccluderScene};
