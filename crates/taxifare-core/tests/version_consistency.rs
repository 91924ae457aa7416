//! Ensures every workspace crate uses `version.workspace = true` and that
//! the workspace version matches the compiled package version.

use std::path::{Path, PathBuf};

fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .parent()
        .unwrap()
        .to_path_buf()
}

fn read_toml(path: &Path) -> toml::Value {
    toml::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

fn workspace_version() -> String {
    let doc = read_toml(&workspace_root().join("Cargo.toml"));
    doc["workspace"]["package"]["version"]
        .as_str()
        .unwrap()
        .to_string()
}

fn workspace_members() -> Vec<String> {
    let doc = read_toml(&workspace_root().join("Cargo.toml"));
    doc["workspace"]["members"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m.as_str().unwrap().to_string())
        .collect()
}

#[test]
fn all_crates_use_workspace_version() {
    let members = workspace_members();
    assert_eq!(members.len(), 3);

    for member in &members {
        let doc = read_toml(&workspace_root().join(member).join("Cargo.toml"));
        let uses_workspace = doc["package"]["version"]
            .get("workspace")
            .and_then(|v| v.as_bool())
            == Some(true);
        assert!(uses_workspace, "{} should use version.workspace = true", member);
    }
}

#[test]
fn workspace_version_matches_cargo_pkg() {
    assert_eq!(workspace_version(), env!("CARGO_PKG_VERSION"));
    assert_eq!(taxifare_core::VERSION, env!("CARGO_PKG_VERSION"));
}

#[test]
fn internal_dependency_versions_match_workspace() {
    let doc = read_toml(&workspace_root().join("Cargo.toml"));
    let deps = &doc["workspace"]["dependencies"];
    for name in ["taxifare-core", "taxifare-state"] {
        assert_eq!(
            deps[name]["version"].as_str(),
            Some(workspace_version().as_str()),
            "{} dependency version drifted",
            name
        );
    }
}
