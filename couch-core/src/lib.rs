mod command;
mod config;
mod errors;
mod model;
mod playlist;
mod roster;
mod util;
mod validation;

pub use command::*;
pub use config::*;
pub use errors::*;
pub use model::*;
pub use playlist::*;
pub use roster::*;
pub use util::*;
pub use validation::*;
