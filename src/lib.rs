pub mod camera;
pub mod cloud;
pub mod config;
pub mod error;
pub mod geometry;
pub mod io;
pub mod keyframes;
pub mod mapping;
pub mod publish;
pub mod system;

pub use config::{Config, MapperConfig};
pub use error::{MappingError, Result};
pub use system::{MapperState, PointCloudMapping};
