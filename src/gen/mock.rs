//! Static stand-ins for the generated build constants, used in
//! read-only build environments (eg: docs generation).

pub const COMPILATION_DATE: &str = "Jan 01 2025";
pub const COMPILATION_TIME: &str = "00:00:00";
pub const NAME: &str = "ferroboy";
pub const VERSION: &str = "0.3.1";
pub const COMPILER: &str = "rustc";
pub const COMPILER_VERSION: &str = "1.82.0";
pub const DEPENDENCIES: [(&str, &str); 0] = [];
