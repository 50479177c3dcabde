mod placement;

pub use placement::{parse_filters, PlacementService};
