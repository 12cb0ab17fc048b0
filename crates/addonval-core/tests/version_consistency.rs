//! Every workspace crate inherits its version from the root manifest.

use std::path::{Path, PathBuf};

fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .ancestors()
        .nth(2)
        .unwrap()
        .to_path_buf()
}

fn manifest(path: &Path) -> toml::Value {
    let raw = std::fs::read_to_string(path.join("Cargo.toml")).unwrap();
    raw.parse().unwrap()
}

#[test]
fn member_crates_inherit_workspace_version() {
    let root = workspace_root();
    let members = manifest(&root)["workspace"]["members"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m.as_str().unwrap().to_string())
        .collect::<Vec<_>>();
    assert_eq!(members.len(), 3);

    for member in &members {
        let doc = manifest(&root.join(member));
        let inherited = doc["package"]["version"]
            .get("workspace")
            .and_then(toml::Value::as_bool);
        assert_eq!(inherited, Some(true), "{member} pins its own version");
    }
}

#[test]
fn internal_dependency_pins_match_workspace_version() {
    let doc = manifest(&workspace_root());
    let version = doc["workspace"]["package"]["version"].as_str().unwrap();
    assert_eq!(version, env!("CARGO_PKG_VERSION"));
    assert_eq!(version, addonval_core::VERSION);

    for internal in ["addonval-core", "addonval-catalog"] {
        let pinned = doc["workspace"]["dependencies"][internal]["version"]
            .as_str()
            .unwrap();
        assert_eq!(pinned, version, "{internal} pin drifted");
    }
}
