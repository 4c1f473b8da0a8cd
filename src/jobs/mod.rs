//! Batch jobs

pub mod renamer;

pub use renamer::{
    Instance, InstanceReport, RunContext, RunSummary, run, run_collection_instance,
    run_instances, run_library_instance,
};
