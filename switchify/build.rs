//! Build script to capture git information and dependency versions at compile time

use std::collections::BTreeMap;
use std::env;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use std::process::Command;

/// Crates whose versions are reported by `--version`.
const TRACKED: &[&str] = &["tree-sitter", "tree-sitter-java"];

fn main() -> io::Result<()> {
    println!("cargo:rerun-if-changed=../.git/HEAD");
    println!("cargo:rerun-if-changed=../.git/index");
    println!("cargo:rerun-if-changed=../Cargo.lock");

    let commit_hash = git(&["rev-parse", "--short", "HEAD"]).unwrap_or_else(|| "unknown".to_string());
    let commit_date = git(&["log", "-1", "--format=%ci"]).unwrap_or_else(|| "unknown".to_string());
    let is_dirty = Command::new("git")
        .args(["status", "--porcelain"])
        .output()
        .ok()
        .map(|o| !o.stdout.is_empty())
        .unwrap_or(false);
    let dirty_suffix = if is_dirty { "-dirty" } else { "" };

    println!("cargo:rustc-env=SWITCHIFY_GIT_HASH={}{}", commit_hash, dirty_suffix);
    println!("cargo:rustc-env=SWITCHIFY_GIT_DATE={}", commit_date);

    let versions = std::fs::read_to_string("../Cargo.lock")
        .map(|lockfile| parse_cargo_lock(&lockfile))
        .unwrap_or_default();

    let out_dir = env::var("OUT_DIR").map_err(|e| io::Error::new(io::ErrorKind::NotFound, e))?;
    let dest_path = Path::new(&out_dir).join("versions.rs");
    let mut f = File::create(dest_path)?;

    writeln!(f, "/// Auto-generated dependency versions from Cargo.lock")?;
    writeln!(f, "pub const DEPENDENCY_VERSIONS: &[(&str, &str)] = &[")?;
    for name in TRACKED {
        if let Some(version) = versions.get(*name) {
            writeln!(f, "    (\"{}\", \"{}\"),", name, version)?;
        }
    }
    writeln!(f, "];")?;
    Ok(())
}

fn git(args: &[&str]) -> Option<String> {
    Command::new("git")
        .args(args)
        .output()
        .ok()
        .and_then(|o| String::from_utf8(o.stdout).ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Versions of the tracked packages in Cargo.lock
fn parse_cargo_lock(content: &str) -> BTreeMap<String, String> {
    let mut versions = BTreeMap::new();
    let mut current_name: Option<String> = None;

    for line in content.lines() {
        let line = line.trim();
        if line == "[[package]]" {
            current_name = None;
        } else if let Some(name) = line.strip_prefix("name = ") {
            current_name = Some(name.trim_matches('"').to_string());
        } else if let Some(version) = line.strip_prefix("version = ") {
            if let Some(name) = current_name.take() {
                if TRACKED.contains(&name.as_str()) {
                    versions.insert(name, version.trim_matches('"').to_string());
                }
            }
        }
    }

    versions
}
