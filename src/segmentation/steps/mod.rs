//! Individual segmentation stages

pub mod aggregate;
pub mod background;
pub mod cluster;
pub mod compositor;
pub mod crop;
pub mod filter;
pub mod refine;
pub mod scan;
