#![allow(clippy::uninlined_format_args)]

//! Build script (https://doc.rust-lang.org/cargo/reference/build-scripts.html)
//! This script is executed as the first step in the compilation process.
//! Here we export metadata constants to a `build_constants.rs` file placed
//! in the build output directory, which is then included and used by the
//! remaining crate (see `src/gen`).

use std::{env, fs::File, io::Write, path::Path, process::Command};

use built::write_built_file;
use chrono::Utc;

const BUILD_OUT_FILE: &str = "build_constants.rs";

fn main() {
    let out_dir = env::var("OUT_DIR").expect("OUT_DIR not set");
    let dest_path = Path::new(&out_dir).join(BUILD_OUT_FILE);
    let mut file = File::create(&dest_path)
        .unwrap_or_else(|_| panic!("Can't open '{}'", dest_path.display()));

    writeln!(
        file,
        "// Global constants, such as compiler version used, features, platform information and others.\n"
    )
    .unwrap();
    writeln!(file, "// @generated\n").unwrap();

    let now_utc = Utc::now();
    write_str_constant(
        &mut file,
        "COMPILATION_DATE",
        &format!("{}", now_utc.format("%b %d %Y")),
    );
    write_str_constant(
        &mut file,
        "COMPILATION_TIME",
        &format!("{}", now_utc.format("%H:%M:%S")),
    );

    write_str_constant(
        &mut file,
        "NAME",
        &env::var("CARGO_PKG_NAME").unwrap_or_else(|_| String::from("UNKNOWN")),
    );
    write_str_constant(
        &mut file,
        "VERSION",
        &env::var("CARGO_PKG_VERSION").unwrap_or_else(|_| String::from("UNKNOWN")),
    );

    write_str_constant(&mut file, "COMPILER", "rustc");
    write_str_constant(&mut file, "COMPILER_VERSION", &compiler_version());

    // exports the remaining constants (platform, features,
    // dependencies) through the `built` crate
    write_built_file().expect("Failed to acquire build-time information");
}

fn compiler_version() -> String {
    let rustc = env::var("RUSTC").unwrap_or_else(|_| String::from("rustc"));
    let output = Command::new(rustc).arg("--version").output();
    let version = match output {
        Ok(output) => String::from_utf8(output.stdout).unwrap_or_default(),
        Err(_) => String::new(),
    };
    version
        .split_whitespace()
        .nth(1)
        .unwrap_or("UNKNOWN")
        .to_string()
}

fn write_str_constant(file: &mut File, key: &str, val: &str) {
    writeln!(file, "pub const {}: &str = {:?};", key, val).unwrap();
}
