//! Build script that generates branding constants from branding.toml
//!
//! Reads the workspace-level branding.toml and emits Rust constants that
//! `src/branding.rs` includes at compile time.

use std::env;
use std::fs;
use std::path::Path;

const DEFAULTS: [(&str, &str); 4] = [
    ("display_name", "ToolMux"),
    ("identifier", "dev.toolmux.cli"),
    ("log_prefix", "toolmux"),
    ("data_dir_name", "toolmux"),
];

fn main() {
    println!("cargo:rerun-if-changed=../../branding.toml");

    let manifest_dir = env::var("CARGO_MANIFEST_DIR").unwrap();
    let branding_path = Path::new(&manifest_dir).join("../../branding.toml");
    let content = fs::read_to_string(&branding_path).unwrap_or_default();

    let value = |key: &str| -> String {
        extract_toml_string(&content, key)
            .map(str::to_string)
            .unwrap_or_else(|| {
                DEFAULTS
                    .iter()
                    .find(|(k, _)| *k == key)
                    .map(|(_, v)| v.to_string())
                    .unwrap_or_default()
            })
    };

    let rust_code = format!(
        r#"// Auto-generated branding constants from branding.toml
// DO NOT EDIT - regenerate with `cargo build`

/// User-facing display name
pub const DISPLAY_NAME: &str = {display_name:?};

/// Reverse-domain app identifier
pub const IDENTIFIER: &str = {identifier:?};

/// Log file prefix
pub const LOG_PREFIX: &str = {log_prefix:?};

/// Directory name under the platform data directory
pub const DATA_DIR_NAME: &str = {data_dir_name:?};
"#,
        display_name = value("display_name"),
        identifier = value("identifier"),
        log_prefix = value("log_prefix"),
        data_dir_name = value("data_dir_name"),
    );

    let out_dir = env::var("OUT_DIR").unwrap();
    fs::write(Path::new(&out_dir).join("branding_generated.rs"), rust_code)
        .expect("Failed to write branding_generated.rs");
}

/// Extract a string value from TOML content (simple parser, no dependencies)
fn extract_toml_string<'a>(content: &'a str, key: &str) -> Option<&'a str> {
    for line in content.lines() {
        let line = line.trim();
        let Some((name, value)) = line.split_once('=') else {
            continue;
        };
        if name.trim() != key {
            continue;
        }
        let value = value.trim();
        if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
            return Some(&value[1..value.len() - 1]);
        }
    }
    None
}
