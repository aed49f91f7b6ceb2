//! Integration tests for extension discovery over a real directory tree.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use quench_engine::discovery::{Capability, ExtensionManager};
use quench_engine::env::HostEnv;
use quench_engine::error::EngineError;
use quench_engine::fs::RealFileSystem;
use quench_pack::{header, PackBuilder};
use tempfile::TempDir;

fn write_pack(path: &Path, header_toml: &str) {
    let header = header::parse(header_toml).unwrap();
    PackBuilder::new(header)
        .payload(b"payload".as_slice())
        .write_to(path)
        .unwrap();
}

fn manager() -> ExtensionManager {
    // RUST_LOG=quench_engine=debug surfaces the scan decisions
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
    let mut manager = ExtensionManager::new(Arc::new(RealFileSystem::new()), HostEnv::default());
    manager.register_default_points().unwrap();
    manager
}

#[test]
fn manifest_directed_discovery_binds_declarations_to_points() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();

    // Engine install dir with a manifest, plus a sibling dir the
    // manifest points at explicitly
    let main_dir = root.join("main");
    let ext_dir = main_dir.join("ext");
    let side_dir = root.join("side");
    fs::create_dir_all(&ext_dir).unwrap();
    fs::create_dir_all(&side_dir).unwrap();

    fs::write(
        main_dir.join("extensions.addons"),
        "# extensions shipped with the runner\n\
         ext/\n\
         ../side/writer.qpack\n",
    )
    .unwrap();

    write_pack(
        &ext_dir.join("listener.qpack"),
        r#"[pack]
name = "timing-listener"
version = "1.0.0"

[[extension]]
entry = "TimingListener"
capability = "EventListener"
"#,
    );
    write_pack(
        &side_dir.join("writer.qpack"),
        r#"[pack]
name = "junit-writer"
version = "2.1.0"

[[extension]]
entry = "JUnitWriter"
capability = "ResultWriter"
description = "Writes results in the JUnit schema"
"#,
    );

    let mut manager = manager();
    manager.find_candidates(&main_dir).unwrap();

    let nodes = manager.extensions().unwrap();
    assert_eq!(nodes.len(), 2);

    let listeners = manager
        .extensions_for_capability(Capability::EventListener)
        .unwrap();
    assert_eq!(listeners.len(), 1);
    assert_eq!(listeners[0].entry(), "TimingListener");
    assert!(listeners[0].is_enabled());

    let writers = manager
        .extensions_for_path(&Capability::ResultWriter.default_path())
        .unwrap();
    assert_eq!(writers.len(), 1);
    assert_eq!(writers[0].entry(), "JUnitWriter");
    assert_eq!(
        writers[0].description(),
        Some("Writes results in the JUnit schema")
    );
}

#[test]
fn single_capability_declaration_registers_one_enabled_node() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();

    write_pack(
        &root.join("loader.qpack"),
        r#"[pack]
name = "vs-loader"
version = "1.0.0"

[[extension]]
entry = "VsProjectLoader"
capability = "ProjectLoader"
"#,
    );

    let mut manager = manager();
    manager.find_candidates(root).unwrap();

    let point_path = Capability::ProjectLoader.default_path();
    let nodes = manager.extensions_for_path(&point_path).unwrap();
    assert_eq!(nodes.len(), 1);
    assert_eq!(nodes[0].point_path(), point_path);
    assert!(nodes[0].is_enabled());
    assert!(!nodes[0].is_legacy());
}

#[test]
fn higher_version_wins_across_directories() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();

    // The same extension installed twice, older copy first in
    // traversal order
    let old_dir = root.join("installed");
    let new_dir = root.join("staged");
    fs::create_dir_all(&old_dir).unwrap();
    fs::create_dir_all(&new_dir).unwrap();

    fs::write(root.join("all.addons"), "installed/\nstaged/\n").unwrap();

    let decl = |version: &str| {
        format!(
            r#"[pack]
name = "timing-listener"
version = "{version}"

[[extension]]
entry = "TimingListener"
capability = "EventListener"
"#
        )
    };
    write_pack(&old_dir.join("timing.qpack"), &decl("1.0.0"));
    write_pack(&new_dir.join("timing.qpack"), &decl("2.0.0"));

    let mut manager = manager();
    manager.find_candidates(root).unwrap();

    let nodes = manager.extensions().unwrap();
    assert_eq!(nodes.len(), 1);
    assert_eq!(nodes[0].pack_version().to_string(), "2.0.0");
    assert!(nodes[0].pack_path().starts_with(&new_dir));
}

#[test]
fn manifest_mixing_patterns_and_comments_covers_both_directories() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    let addins_dir = root.join("addins");
    fs::create_dir_all(&addins_dir).unwrap();

    // One manifest with a bare pattern, a directory pattern, and a
    // comment-only line
    fs::write(
        root.join("mixed.addons"),
        "*.qpack\naddins/*.qpack\n# nothing else\n",
    )
    .unwrap();

    write_pack(
        &root.join("writer.qpack"),
        r#"[pack]
name = "local-writer"
version = "1.0.0"

[[extension]]
entry = "LocalWriter"
capability = "ResultWriter"
"#,
    );
    write_pack(
        &addins_dir.join("listener.qpack"),
        r#"[pack]
name = "addin-listener"
version = "1.0.0"

[[extension]]
entry = "AddinListener"
capability = "EventListener"
"#,
    );
    // Pattern entries taint their matches as wildcard-origin, so a torn
    // pack caught by the same glob is skipped, not fatal
    fs::write(addins_dir.join("torn.qpack"), b"not a pack at all").unwrap();

    let mut manager = manager();
    manager.find_candidates(root).unwrap();

    let nodes = manager.extensions().unwrap();
    assert_eq!(nodes.len(), 2);
    assert_eq!(
        manager
            .extensions_for_capability(Capability::ResultWriter)
            .unwrap()[0]
            .entry(),
        "LocalWriter"
    );
    assert_eq!(
        manager
            .extensions_for_capability(Capability::EventListener)
            .unwrap()[0]
            .entry(),
        "AddinListener"
    );
}

#[test]
fn wildcard_scan_tolerates_unreadable_packs() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();

    // No manifest: the whole directory is scanned as a wildcard, so a
    // torn pack is skipped rather than failing discovery
    fs::write(root.join("torn.qpack"), b"not a pack at all").unwrap();
    write_pack(
        &root.join("good.qpack"),
        r#"[pack]
name = "good"
version = "1.0.0"

[[extension]]
entry = "Good"
capability = "EventListener"
"#,
    );

    let mut manager = manager();
    manager.find_candidates(root).unwrap();

    let nodes = manager.extensions().unwrap();
    assert_eq!(nodes.len(), 1);
    assert_eq!(nodes[0].entry(), "Good");
}

#[test]
fn explicit_manifest_entry_failures_surface() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();

    fs::write(root.join("exts.addons"), "torn.qpack\n").unwrap();
    fs::write(root.join("torn.qpack"), b"not a pack at all").unwrap();

    let mut manager = manager();
    let err = manager.find_candidates(root).unwrap_err();
    assert!(matches!(err, EngineError::CandidateLoad { .. }));
}

#[test]
fn incompatible_target_fails_only_explicit_candidates() {
    let classic_only = r#"[pack]
name = "desktop-timer"
version = "1.0.0"
target = "classic-4.8"

[[extension]]
entry = "DesktopTimer"
capability = "EventListener"
"#;

    // Found by wildcard scan: quietly skipped under the modern runner
    let wild = TempDir::new().unwrap();
    write_pack(&wild.path().join("timer.qpack"), classic_only);
    let mut manager_wild = manager();
    manager_wild.find_candidates(wild.path()).unwrap();
    assert!(manager_wild.extensions().unwrap().is_empty());

    // Listed explicitly: the same pack is a hard error
    let explicit = TempDir::new().unwrap();
    fs::write(explicit.path().join("exts.addons"), "timer.qpack\n").unwrap();
    write_pack(&explicit.path().join("timer.qpack"), classic_only);
    let mut manager_explicit = manager();
    manager_explicit.find_candidates(explicit.path()).unwrap();
    let err = manager_explicit.extensions().unwrap_err();
    assert!(matches!(err, EngineError::IncompatibleTarget { .. }));
}

#[test]
fn host_layout_discovery_climbs_ancestors() {
    let temp_dir = TempDir::new().unwrap();
    let store = temp_dir.path().join("store");

    // Package-store layout two levels above the engine install
    let tools_dir = store.join("quench-ext-timing").join("1.2.0").join("tools");
    let install_dir = store.join("app").join("bin");
    fs::create_dir_all(&tools_dir).unwrap();
    fs::create_dir_all(&install_dir).unwrap();

    write_pack(
        &tools_dir.join("timing.qpack"),
        r#"[pack]
name = "timing-listener"
version = "1.2.0"

[[extension]]
entry = "TimingListener"
capability = "EventListener"
"#,
    );

    let mut manager = manager();
    manager.find_candidates_for_host(&install_dir).unwrap();

    let nodes = manager.extensions().unwrap();
    assert_eq!(nodes.len(), 1);
    assert_eq!(nodes[0].entry(), "TimingListener");
}

#[test]
fn install_receipt_switches_to_the_verified_layout() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();

    let install_dir = root.join("app");
    let verified_tools = root.join("quench-extension-report").join("tools");
    let legacy_tools = root.join("quench-ext-old").join("1.0.0").join("tools");
    fs::create_dir_all(&install_dir).unwrap();
    fs::create_dir_all(&verified_tools).unwrap();
    fs::create_dir_all(&legacy_tools).unwrap();
    fs::write(install_dir.join("INSTALL_RECEIPT.json"), "{}").unwrap();

    write_pack(
        &verified_tools.join("report.qpack"),
        r#"[pack]
name = "report-writer"
version = "3.0.0"

[[extension]]
entry = "ReportWriter"
capability = "ResultWriter"
"#,
    );
    write_pack(
        &legacy_tools.join("old.qpack"),
        r#"[pack]
name = "old-writer"
version = "1.0.0"

[[extension]]
entry = "OldWriter"
capability = "ResultWriter"
"#,
    );

    let mut manager = manager();
    manager.find_candidates_for_host(&install_dir).unwrap();

    // Only the verified layout is searched once the receipt is present
    let nodes = manager.extensions().unwrap();
    assert_eq!(nodes.len(), 1);
    assert_eq!(nodes[0].entry(), "ReportWriter");
}

#[test]
fn legacy_addin_declarations_keep_their_style() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();

    write_pack(
        &root.join("veteran.qpack"),
        r#"[pack]
name = "veteran"
version = "0.9.0"

[[addin]]
entry = "VeteranListener"
capability = "EventListener"
"#,
    );

    let mut manager = manager();
    manager.find_candidates(root).unwrap();

    let nodes = manager.extensions().unwrap();
    assert_eq!(nodes.len(), 1);
    assert!(nodes[0].is_legacy());
    // legacy adapters translate canonical operation names on demand
    assert_eq!(
        nodes[0].object().operation_name("WriteResultFile"),
        "write_result_file"
    );
}
