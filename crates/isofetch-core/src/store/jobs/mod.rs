//! Job CRUD on `JobDb`, split by direction.

mod read;
mod write;

pub use write::INTERRUPTED_MESSAGE;
