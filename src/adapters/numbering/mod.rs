//! Participant numbering adapters.

mod sequence_assigner;

pub use sequence_assigner::SequenceNumberAssigner;
