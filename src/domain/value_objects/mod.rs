pub mod data_map;
pub mod matcher;
pub mod misfire;
pub mod trigger_state;

pub use data_map::JobDataMap;
pub use matcher::Matcher;
pub use misfire::{CompletionInstruction, MisfireInstruction};
pub use trigger_state::TriggerState;
