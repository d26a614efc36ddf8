mod credentials;
mod project;
mod shipyard;

pub use credentials::*;
pub use project::*;
pub use shipyard::*;
