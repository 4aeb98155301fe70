pub mod compound;
pub mod ifc;
pub mod step;

pub use crate::error::ParseError;
pub use compound::{default_backend, ContainerBackend, ContainerMetadata};
pub use ifc::{open_ifc, IfcModel};
pub use step::{StepEntity, StepFile, StepHeader, StepValue};
