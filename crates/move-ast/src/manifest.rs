//! `Move.toml` manifest rendering.

use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Serialize)]
struct Package {
    name: String,
    version: String,
}

#[derive(Debug, Serialize)]
struct GitDependency {
    git: String,
    rev: String,
    subdir: String,
}

#[derive(Debug, Serialize)]
struct Manifest {
    package: Package,
    addresses: BTreeMap<String, String>,
    dependencies: BTreeMap<String, GitDependency>,
}

/// Renders the package manifest for the emitted sources.
///
/// `needs_token_objects` binds `aptos_token_objects` when NFT routing was
/// used by any module.
pub fn render_manifest(
    package_name: &str,
    module_address: &str,
    needs_token_objects: bool,
) -> String {
    let mut addresses = BTreeMap::new();
    addresses.insert(package_name.to_string(), module_address.to_string());
    addresses.insert("std".to_string(), "0x1".to_string());
    addresses.insert("aptos_std".to_string(), "0x1".to_string());
    addresses.insert("aptos_framework".to_string(), "0x1".to_string());
    if needs_token_objects {
        addresses.insert("aptos_token_objects".to_string(), "0x4".to_string());
    }

    let mut dependencies = BTreeMap::new();
    dependencies.insert(
        "AptosFramework".to_string(),
        GitDependency {
            git: "https://github.com/aptos-labs/aptos-core.git".to_string(),
            rev: "mainnet".to_string(),
            subdir: "aptos-move/framework/aptos-framework".to_string(),
        },
    );

    let manifest = Manifest {
        package: Package { name: package_name.to_string(), version: "1.0.0".to_string() },
        addresses,
        dependencies,
    };

    toml::to_string_pretty(&manifest).expect("manifest serialization cannot fail")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_binds_framework_addresses() {
        let text = render_manifest("counter", "0x42", false);
        assert!(text.contains("name = \"counter\""));
        assert!(text.contains("counter = \"0x42\""));
        assert!(text.contains("std = \"0x1\""));
        assert!(text.contains("aptos_framework = \"0x1\""));
        assert!(!text.contains("aptos_token_objects"));
        assert!(text.contains("[dependencies.AptosFramework]") || text.contains("AptosFramework ="));
    }

    #[test]
    fn token_objects_binding_is_conditional() {
        let text = render_manifest("nft", "0xA11CE", true);
        assert!(text.contains("aptos_token_objects = \"0x4\""));
    }

    #[test]
    fn manifest_is_deterministic() {
        assert_eq!(render_manifest("p", "0x1", true), render_manifest("p", "0x1", true));
    }
}
