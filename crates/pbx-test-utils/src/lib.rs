//! Testing utilities for the pbxgraph workspace
//!
//! Document builders and canned project files in the shape
//! `plutil -convert json` produces.

#![allow(missing_docs)]

use serde_json::{json, Map, Value};

/// Identifiers of the records in [`sample_project`]
///
/// All of them are in Xcode's 24-digit form with a zero sequence counter,
/// so fresh identifiers derived from them never collide with one another.
pub mod ids {
    pub const PROJECT: &str = "AA0000000000000000000001";
    pub const PROJECT_CONFIG_LIST: &str = "AA0000000000000000000002";
    pub const PROJECT_DEBUG: &str = "AA0000000000000000000003";
    pub const MAIN_GROUP: &str = "AA0000000000000000000010";
    pub const SOURCES_GROUP: &str = "AA0000000000000000000011";
    pub const MAIN_C: &str = "AA0000000000000000000012";
    pub const VENDOR_GROUP: &str = "AA0000000000000000000013";
    pub const LIB_A: &str = "AA0000000000000000000014";
    pub const PRODUCTS_GROUP: &str = "AA0000000000000000000015";
    pub const APP_PRODUCT: &str = "AA0000000000000000000016";
    pub const TARGET: &str = "AA0000000000000000000020";
    pub const TARGET_CONFIG_LIST: &str = "AA0000000000000000000021";
    pub const TARGET_DEBUG: &str = "AA0000000000000000000022";
    pub const TARGET_RELEASE: &str = "AA0000000000000000000023";
    pub const SOURCES_PHASE: &str = "AA0000000000000000000024";
    pub const FRAMEWORKS_PHASE: &str = "AA0000000000000000000025";
    pub const MAIN_C_BUILD: &str = "AA0000000000000000000026";
    pub const LIB_A_BUILD: &str = "AA0000000000000000000027";
}

/// Builder for a whole project document
#[derive(Debug, Clone)]
pub struct DocumentBuilder {
    root: String,
    objects: Map<String, Value>,
}

impl DocumentBuilder {
    pub fn new(root: &str) -> Self {
        Self {
            root: root.to_string(),
            objects: Map::new(),
        }
    }

    pub fn object(mut self, id: &str, value: Value) -> Self {
        self.objects.insert(id.to_string(), value);
        self
    }

    pub fn without(mut self, id: &str) -> Self {
        self.objects.shift_remove(id);
        self
    }

    pub fn objects(&self) -> &Map<String, Value> {
        &self.objects
    }

    pub fn build(self) -> Value {
        json!({
            "archiveVersion": "1",
            "classes": {},
            "objectVersion": "56",
            "objects": Value::Object(self.objects),
            "rootObject": self.root,
        })
    }
}

pub fn group(children: &[&str], path: Option<&str>, source_tree: &str) -> Value {
    let mut value = json!({
        "isa": "PBXGroup",
        "children": children,
        "sourceTree": source_tree,
    });
    if let Some(path) = path {
        value["path"] = json!(path);
    }
    value
}

pub fn named_group(name: &str, children: &[&str]) -> Value {
    json!({
        "isa": "PBXGroup",
        "children": children,
        "name": name,
        "sourceTree": "<group>",
    })
}

pub fn file_reference(path: &str, source_tree: &str, file_type: &str) -> Value {
    json!({
        "isa": "PBXFileReference",
        "lastKnownFileType": file_type,
        "path": path,
        "sourceTree": source_tree,
    })
}

pub fn build_file(file_ref: &str) -> Value {
    json!({"isa": "PBXBuildFile", "fileRef": file_ref})
}

pub fn build_phase(isa: &str, files: &[&str]) -> Value {
    json!({
        "isa": isa,
        "buildActionMask": "2147483647",
        "files": files,
        "runOnlyForDeploymentPostprocessing": "0",
    })
}

pub fn configuration(name: &str, settings: Value) -> Value {
    json!({
        "isa": "XCBuildConfiguration",
        "buildSettings": settings,
        "name": name,
    })
}

pub fn configuration_list(configurations: &[&str], default: &str) -> Value {
    json!({
        "isa": "XCConfigurationList",
        "buildConfigurations": configurations,
        "defaultConfigurationIsVisible": "0",
        "defaultConfigurationName": default,
    })
}

pub fn native_target(name: &str, config_list: &str, phases: &[&str]) -> Value {
    json!({
        "isa": "PBXNativeTarget",
        "buildConfigurationList": config_list,
        "buildPhases": phases,
        "buildRules": [],
        "dependencies": [],
        "name": name,
        "productName": name,
        "productReference": ids::APP_PRODUCT,
        "productType": "com.apple.product-type.application",
    })
}

pub fn project(main_group: &str, config_list: &str, targets: &[&str]) -> Value {
    json!({
        "isa": "PBXProject",
        "attributes": {"LastUpgradeCheck": "1500"},
        "buildConfigurationList": config_list,
        "compatibilityVersion": "Xcode 14.0",
        "developmentRegion": "en",
        "hasScannedForEncodings": "0",
        "knownRegions": ["en", "Base"],
        "mainGroup": main_group,
        "productRefGroup": ids::PRODUCTS_GROUP,
        "projectDirPath": "",
        "projectRoot": "",
        "targets": targets,
    })
}

/// Builder preloaded with the records of [`sample_project`]
///
/// Group tree:
/// ```text
/// <main group>
/// ├── Sources/            (group-relative)
/// │   └── main.c
/// ├── /opt/vendor         (absolute)
/// │   └── lib.a
/// └── Products
///     └── App.app         (BUILT_PRODUCTS_DIR)
/// ```
/// Target `App` compiles `main.c` and links `lib.a`.
pub fn sample_builder() -> DocumentBuilder {
    use ids::*;
    DocumentBuilder::new(PROJECT)
        .object(PROJECT, project(MAIN_GROUP, PROJECT_CONFIG_LIST, &[TARGET]))
        .object(PROJECT_CONFIG_LIST, configuration_list(&[PROJECT_DEBUG], "Debug"))
        .object(
            PROJECT_DEBUG,
            configuration("Debug", json!({"SDKROOT": "macosx", "ONLY_ACTIVE_ARCH": "YES"})),
        )
        .object(
            MAIN_GROUP,
            group(&[SOURCES_GROUP, VENDOR_GROUP, PRODUCTS_GROUP], None, "<group>"),
        )
        .object(SOURCES_GROUP, group(&[MAIN_C], Some("Sources"), "<group>"))
        .object(MAIN_C, {
            let mut main_c = file_reference("main.c", "<group>", "sourcecode.c.c");
            main_c["fileEncoding"] = json!("4");
            main_c
        })
        .object(VENDOR_GROUP, group(&[LIB_A], Some("/opt/vendor"), "<absolute>"))
        .object(LIB_A, file_reference("lib.a", "<group>", "archive.ar"))
        .object(PRODUCTS_GROUP, named_group("Products", &[APP_PRODUCT]))
        .object(
            APP_PRODUCT,
            json!({
                "isa": "PBXFileReference",
                "explicitFileType": "wrapper.application",
                "includeInIndex": "0",
                "path": "App.app",
                "sourceTree": "BUILT_PRODUCTS_DIR",
            }),
        )
        .object(
            TARGET,
            native_target("App", TARGET_CONFIG_LIST, &[SOURCES_PHASE, FRAMEWORKS_PHASE]),
        )
        .object(
            TARGET_CONFIG_LIST,
            configuration_list(&[TARGET_DEBUG, TARGET_RELEASE], "Release"),
        )
        .object(
            TARGET_DEBUG,
            configuration(
                "Debug",
                json!({"PRODUCT_NAME": "$(TARGET_NAME)", "OTHER_LDFLAGS": ["-ObjC"]}),
            ),
        )
        .object(
            TARGET_RELEASE,
            configuration("Release", json!({"PRODUCT_NAME": "$(TARGET_NAME)"})),
        )
        .object(SOURCES_PHASE, build_phase("PBXSourcesBuildPhase", &[MAIN_C_BUILD]))
        .object(FRAMEWORKS_PHASE, build_phase("PBXFrameworksBuildPhase", &[LIB_A_BUILD]))
        .object(MAIN_C_BUILD, build_file(MAIN_C))
        .object(LIB_A_BUILD, build_file(LIB_A))
}

/// Small consistent project document
pub fn sample_project() -> Value {
    sample_builder().build()
}

/// `objects` dictionary of [`sample_project`]
pub fn sample_objects() -> Map<String, Value> {
    sample_builder().objects().clone()
}

/// Serialized sample document, as written to `project.pbxproj`
pub fn sample_project_text() -> String {
    serde_json::to_string_pretty(&sample_project()).unwrap_or_default()
}
