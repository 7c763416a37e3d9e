//! Query fragment library and composite query building

pub mod builder;
pub mod fragments;

pub use builder::{QueryBuilder, QueryDocument};
pub use fragments::{find, FragmentDescriptor, LIBRARY};
