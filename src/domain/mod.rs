pub mod links;
pub mod post;
pub mod status;

pub use links::{DiscoveredLink, LinkSet};
pub use post::{PostFeatures, PostRef, PostText, Reply, ScannedPost};
pub use status::{PostStatus, ProcessState};
