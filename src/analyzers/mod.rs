pub mod narrative;

pub use narrative::{Narrative, NarrativeBuilder};
