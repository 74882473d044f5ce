//! Built-in catalogs embedded in the binary
//!
//! Lets users say `--connector demo-shop` instead of pointing at a YAML file.

use std::collections::HashMap;
use std::sync::LazyLock;

/// Built-in catalog YAML definitions
pub static BUILTIN_CATALOGS: LazyLock<HashMap<&'static str, &'static str>> =
    LazyLock::new(|| {
        let mut m = HashMap::new();

        // JSON
        m.insert("demo-shop", include_str!("../catalogs/demo-shop.yaml"));
        m.insert("shop", include_str!("../catalogs/demo-shop.yaml"));

        // XML
        m.insert("demo-erp", include_str!("../catalogs/demo-erp.yaml"));
        m.insert("erp", include_str!("../catalogs/demo-erp.yaml"));

        m
    });

/// Get a built-in catalog by name
pub fn get_builtin(name: &str) -> Option<&'static str> {
    BUILTIN_CATALOGS.get(name).copied()
}

/// Check if a name is a built-in catalog
pub fn is_builtin(name: &str) -> bool {
    BUILTIN_CATALOGS.contains_key(name)
}

/// List all built-in catalog names (primary names only)
pub fn list_builtin() -> Vec<&'static str> {
    vec!["demo-shop", "demo-erp"]
}
