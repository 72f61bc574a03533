pub mod dedup;
pub mod highlight;
pub mod resolve;

pub use dedup::{dedup, DedupResult, IndexMap};
pub use highlight::Highlight;
pub use resolve::{
    find_markers, CitationMarker, CitationResolver, IndexBase, Resolution, UnresolvedCitation, UnresolvedReason,
};
