pub mod config;
pub mod error;
pub mod lookup;
pub mod metadata;
pub mod normalize;
pub mod sink;

pub mod prelude {
    pub use crate::error::*;
    pub use crate::lookup::douban::{DoubanConfig, DoubanProvider};
    pub use crate::lookup::{MetadataProvider, MetadataQuery};
    pub use crate::metadata::*;
    pub use crate::sink::{FieldMap, MetadataSink};
}
