pub mod category;
pub mod element;
pub mod job;
pub mod raw;

pub use category::ElementCategory;
pub use element::{Element, PropertyMap, PropertyValue};
pub use job::{FileFormat, JobStatus, ModelMetadata, ProcessingJob, SourceFile};
pub use raw::{GeometryHandle, NativeType, RawElement};
