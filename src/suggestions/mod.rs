// Gateway module for suggestions - follows the Train Station Pattern
// All external access must go through this gateway

// Private submodules - not directly accessible from outside
mod engine;
mod signature;
mod throttled;
mod types;

// Public re-exports - the ONLY way to access suggestions functionality
pub use engine::{SuggestionEngine, SuggestionSource, SuggestionThresholds};
pub use signature::Signature;
pub use throttled::{SuggestionList, ThrottledSuggestionCache};
pub use types::{CodeUnit, Severity, Suggestion, SuggestionType};
