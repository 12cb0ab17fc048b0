//! Shared catalog fixture: `cloud-logs` depending on `cos` and `kms`.

#![allow(dead_code)]

use std::collections::BTreeMap;

use addonval_catalog::fakes::{ConfigTemplate, MemoryPlatform, PlatformFixture};
use addonval_catalog::{
    DependencyDeclaration, Flavor, Offering, OfferingImport, OfferingVersion, UnitConfig,
};

pub const CATALOG: &str = "cat";

pub fn decl(name: &str, on_by_default: bool, constraint: &str) -> DependencyDeclaration {
    DependencyDeclaration {
        name: name.to_string(),
        on_by_default,
        default_flavor: Some("standard".to_string()),
        allowed_flavors: vec!["standard".to_string()],
        catalog_id: CATALOG.to_string(),
        offering_id: format!("off-{name}"),
        version_constraint: constraint.to_string(),
    }
}

pub fn version(
    name: &str,
    version: &str,
    flavor: &str,
    dependencies: Vec<DependencyDeclaration>,
) -> OfferingVersion {
    OfferingVersion {
        version: version.to_string(),
        version_locator: locator(name, version),
        flavor: Flavor::named(flavor),
        dependencies,
    }
}

pub fn locator(name: &str, version: &str) -> String {
    format!("{CATALOG}.{name}-{}", version.replace('.', ""))
}

pub fn offering(name: &str, versions: Vec<OfferingVersion>) -> Offering {
    Offering {
        id: format!("off-{name}"),
        catalog_id: CATALOG.to_string(),
        name: name.to_string(),
        label: None,
        versions,
    }
}

pub fn template(config_name: &str, locator: &str) -> ConfigTemplate {
    ConfigTemplate {
        config_name: config_name.to_string(),
        version_locator: locator.to_string(),
        inputs: BTreeMap::new(),
        required_inputs: vec![],
        input_sources: BTreeMap::new(),
        state: None,
    }
}

/// `cloud-logs 1.0.0` -> `cos >=1.0.0`, `kms ^2.0.0`, both on by default.
/// The logs config needs `cos_crn` and `kms_crn`, supplied by those two.
pub fn logs_fixture() -> PlatformFixture {
    let mut logs_cfg = template("logs-cfg", &locator("cloud-logs", "1.0.0"));
    logs_cfg
        .inputs
        .insert("region".to_string(), serde_json::json!("us-south"));
    logs_cfg.required_inputs = vec![
        "region".to_string(),
        "cos_crn".to_string(),
        "kms_crn".to_string(),
    ];
    logs_cfg
        .input_sources
        .insert("cos_crn".to_string(), "cos".to_string());
    logs_cfg
        .input_sources
        .insert("kms_crn".to_string(), "kms".to_string());

    PlatformFixture {
        offerings: vec![
            offering(
                "cloud-logs",
                vec![version(
                    "cloud-logs",
                    "1.0.0",
                    "standard",
                    vec![decl("cos", true, ">=1.0.0"), decl("kms", true, "^2.0.0")],
                )],
            ),
            offering(
                "cos",
                vec![
                    version("cos", "0.9.0", "standard", vec![]),
                    version("cos", "1.2.0", "standard", vec![]),
                ],
            ),
            offering(
                "kms",
                vec![
                    version("kms", "2.1.0", "standard", vec![]),
                    version("kms", "3.0.0", "standard", vec![]),
                ],
            ),
        ],
        deployment: vec![
            logs_cfg,
            template("cos-cfg", &locator("cos", "1.2.0")),
            template("kms-cfg", &locator("kms", "2.1.0")),
        ],
    }
}

pub fn logs_platform() -> MemoryPlatform {
    MemoryPlatform::from_fixture(logs_fixture())
}

pub fn logs_root() -> UnitConfig {
    UnitConfig {
        offering_name: "cloud-logs".to_string(),
        offering_flavor: "standard".to_string(),
        catalog_id: CATALOG.to_string(),
        offering_id: "off-cloud-logs".to_string(),
        version_locator: locator("cloud-logs", "1.0.0"),
        ..UnitConfig::default()
    }
}

pub fn logs_import() -> OfferingImport {
    OfferingImport {
        catalog_name: "addonval-test".to_string(),
        offering_name: "cloud-logs".to_string(),
        flavor: "standard".to_string(),
        version_locator: None,
    }
}
