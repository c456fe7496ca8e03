//! Fleet operations: deployment planning, orchestration, enumeration and
//! teardown

pub mod destroy;
pub mod list;
pub mod plan;
pub mod spawn;

pub use destroy::destroy;
pub use list::list;
pub use spawn::spawn;
