pub mod field;

pub use field::{Field2D, Field3D, FieldPerp};
