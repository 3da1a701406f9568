//! Search-time state and request assembly.
//!
//! [`SearchContext`] collects the main query, filters, highlighting, rescoring
//! inputs, aggregations and suggestions while a query is being built. The
//! collaborators it consults at assembly time are traits: [`ProfileService`]
//! for profile names, [`ResultsType`] for highlighting, [`RescoreBuilder`]
//! for the rescoring chain.

pub mod context;
pub mod filters;
pub mod profile;
pub mod rescore;
pub mod results;

pub use context::{SearchContext, DEFAULT_SYNTAX_WEIGHT, FULL_TEXT_SEARCH_TYPE};
pub use profile::{ProfileKind, ProfileService, StaticProfileService};
pub use rescore::{ProfileRescoreBuilder, RescoreBuilder, RescoreProfile, RescoreStageConfig};
pub use results::{FieldsResultsType, NoHighlightResultsType, ResultsType};
