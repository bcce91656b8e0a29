//! Constants that define the current build and execution environment.

use std::collections::HashMap;

#[cfg(feature = "gen-mock")]
pub mod mock;
#[cfg(feature = "gen-mock")]
pub use self::mock::*;

#[rustfmt::skip]
#[cfg(not(feature = "gen-mock"))]
mod build {
    include!(concat!(env!("OUT_DIR"), "/build_constants.rs"));
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}
#[cfg(not(feature = "gen-mock"))]
pub use self::build::*;

pub fn dependencies_map() -> HashMap<&'static str, &'static str> {
    DEPENDENCIES.iter().copied().collect()
}
