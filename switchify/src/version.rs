//! Version information display

// Include the auto-generated versions from build.rs
include!(concat!(env!("OUT_DIR"), "/versions.rs"));

/// Package version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Git commit hash (set by build.rs)
pub const GIT_HASH: &str = env!("SWITCHIFY_GIT_HASH");

/// Git commit date (set by build.rs)
pub const GIT_DATE: &str = env!("SWITCHIFY_GIT_DATE");

/// Print version information; `verbose` adds the grammar ABI.
pub fn print_version(verbose: bool) {
    println!("switchify {} ({} {})", VERSION, GIT_HASH, GIT_DATE);
    println!();
    println!("Core libraries:");

    let max_len = DEPENDENCY_VERSIONS.iter().map(|(n, _)| n.len()).max().unwrap_or(0);
    for (name, version) in DEPENDENCY_VERSIONS {
        println!("  {:width$}  {}", name, version, width = max_len);
    }

    if verbose {
        println!();
        println!("Java grammar ABI: {}", switchify_core::parser::java_abi_version());
    }
}
