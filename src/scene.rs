/// JSON scene files and their validation.
pub mod def;
/// In-memory vector features.
pub mod model;
