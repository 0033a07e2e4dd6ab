pub mod analysis;
pub mod control;
pub mod curve;
pub mod demand;
pub mod link;
pub mod node;
pub mod options;
pub mod rule;
pub mod types;

pub use control::Control;
pub use curve::CurveType;
pub use demand::DemandCategory;
pub use rule::Rule;
pub use types::ActionCode;

/// Max ID Size
pub const MAX_ID_SIZE: usize = 31;
/// Max message size
pub const MAX_MSG_SIZE: usize = 255;
/// Max project title size. Taken from the EPANET C API source code.
pub const MAX_TITLE_SIZE: usize = 79;
