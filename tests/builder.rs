mod common;

use common::{archive_members, create_test_mod, setup_test_env, write_file};
use mod_packer_lib::config::AppSettings;
use mod_packer_lib::core::builder::{BuildSession, BuildStep, PackageBuilder};
use mod_packer_lib::core::host::DirectoryHost;
use mod_packer_lib::core::package::{BundleRequest, PackageReader, PackageWriter};
use mod_packer_lib::models::error::SError;
use mod_packer_lib::models::modpack::{IncludeFlag, IncludeFlags, Modpack};
use mod_packer_lib::models::paths::PackageKind;
use mod_packer_lib::models::task_status::TaskStatus;
use mod_packer_lib::utils::context::TaskContext;
use serde_json::json;
use tokio::sync::mpsc::unbounded_channel;

fn session() -> BuildSession {
    BuildSession::new(Modpack::new("Bob"), &AppSettings::default())
}

fn session_at_finalize(session: &mut BuildSession) {
    while session.step() != BuildStep::Finalize {
        session.next().unwrap();
    }
}

#[test]
fn test_build_archive_with_files_and_id_only_entry() {
    let (_tmp, paths, out) = setup_test_env();
    create_test_mod(
        &paths,
        "a",
        Some(&json!({"volume": 3, "API_Token": "secret", "nested": {"token": "kept"}})),
        None,
    );
    create_test_mod(&paths, "b", None, None);
    write_file(&paths.mod_config_dir("a").join("a.cfg"), "cfg");
    let host = DirectoryHost::from_paths(paths.clone());

    let mut session = session();
    session.select(&host, "a").unwrap();
    session.select(&host, "b").unwrap();
    session.next().unwrap();
    assert!(!session.toggle_files("b").unwrap());
    session.next().unwrap();
    session.set_field("name", r#""Test Pack""#).unwrap();
    session.next().unwrap();

    let (tx, mut rx) = unbounded_channel();
    let report =
        TaskContext::scope(tx, || PackageBuilder::build(&mut session, &host, &out)).unwrap();

    assert_eq!(report.package.kind, PackageKind::Archive);
    assert_eq!(report.package.path, out.join("Test_Pack.geode_modpack"));
    assert_eq!(report.bundled, ["a"]);
    assert_eq!(session.step(), BuildStep::Built);

    let members = archive_members(&report.package.path);
    assert!(members.contains(&"mods/a.geode".to_string()));
    assert!(!members.contains(&"mods/b.geode".to_string()));
    assert!(members.contains(&"config/a/a.cfg".to_string()));
    assert!(members.contains(&"this.geode_modlist".to_string()));

    let loaded = PackageReader::default().load(&report.package.path).unwrap();
    let entries = &loaded.modpack.entries;
    assert_eq!(entries.keys().collect::<Vec<_>>(), ["a", "b"]);
    assert_eq!(
        entries["a"].settings,
        Some(json!({"volume": 3, "nested": {"token": "kept"}}))
    );
    assert_eq!(entries["b"].settings, None);
    assert_eq!(loaded.modpack.files_installed, None);

    let mut lines = Vec::new();
    while let Ok(status) = rx.try_recv() {
        lines.push(status);
    }
    assert_eq!(lines.first(), Some(&TaskStatus::Log("creating \"Test_Pack\" pack".into())));
    assert!(lines.contains(&TaskStatus::Log("adding files of a".into())));
    assert_eq!(
        lines.last(),
        Some(&TaskStatus::Finished(report.package.path.to_string()))
    );
}

#[test]
fn test_build_without_files_writes_manifest() {
    let (_tmp, paths, out) = setup_test_env();
    create_test_mod(&paths, "a", Some(&json!({"k": 1})), None);
    let host = DirectoryHost::from_paths(paths.clone());

    let mut session = session();
    session.select(&host, "a").unwrap();
    session.select(&host, "remote.only").unwrap();
    session.next().unwrap();
    session.toggle_all_files().unwrap();
    assert!(session.selected().values().all(|s| !s.include_files));
    session_at_finalize(&mut session);

    let (tx, _rx) = unbounded_channel();
    let report =
        TaskContext::scope(tx, || PackageBuilder::build(&mut session, &host, &out)).unwrap();

    assert_eq!(report.package.kind, PackageKind::Manifest);
    assert!(report.package.path.is_file());
    assert!(!out.join("Bob_s_modpack.geode_modpack").exists());

    let loaded = PackageReader::default().load(&report.package.path).unwrap();
    assert_eq!(loaded.modpack.entries.len(), 2);
    assert_eq!(loaded.modpack.entries["a"].settings, Some(json!({"k": 1})));
}

#[test]
fn test_vanished_mod_is_kept_by_id_only() {
    let (_tmp, paths, out) = setup_test_env();
    create_test_mod(&paths, "a", None, None);
    let host = DirectoryHost::from_paths(paths.clone());

    let mut session = session();
    session.select(&host, "a").unwrap();
    // Gone between selection and build.
    std::fs::remove_file(paths.package_file("a")).unwrap();
    session_at_finalize(&mut session);

    let (tx, _rx) = unbounded_channel();
    let report =
        TaskContext::scope(tx, || PackageBuilder::build(&mut session, &host, &out)).unwrap();

    assert_eq!(report.package.kind, PackageKind::Manifest);
    assert!(report.bundled.is_empty());
    assert!(!out.join("Bob_s_modpack.geode_modpack").exists());
}

#[test]
fn test_reserved_ids_never_enter_the_pack() {
    let (_tmp, paths, out) = setup_test_env();
    create_test_mod(&paths, "geode.loader", None, None);
    create_test_mod(&paths, "a", None, None);
    create_test_mod(&paths, "mod_packer", None, None);
    create_test_mod(&paths, "someone.hidden", None, None);
    let host = DirectoryHost::from_paths(paths.clone());

    let mut session = session();
    session.reserve("someone.hidden");
    assert_eq!(session.add_loaded_mods(&host).unwrap(), 4);
    session_at_finalize(&mut session);
    assert!(session.summary().contains("- geode.loader (always excluded)"));
    assert!(session.summary().contains("- mod_packer (always excluded)"));

    let (tx, _rx) = unbounded_channel();
    let report =
        TaskContext::scope(tx, || PackageBuilder::build(&mut session, &host, &out)).unwrap();

    let loaded = PackageReader::default().load(&report.package.path).unwrap();
    assert_eq!(loaded.modpack.entries.keys().collect::<Vec<_>>(), ["a"]);
}

#[test]
fn test_closed_status_channel_aborts_build() {
    let (_tmp, paths, out) = setup_test_env();
    create_test_mod(&paths, "a", None, None);
    let host = DirectoryHost::from_paths(paths.clone());

    let mut session = session();
    session.select(&host, "a").unwrap();
    session_at_finalize(&mut session);

    let (tx, rx) = unbounded_channel();
    drop(rx);
    let result = TaskContext::scope(tx, || PackageBuilder::build(&mut session, &host, &out));

    assert!(matches!(result, Err(SError::UpdateStatusError(_))));
    assert_ne!(session.step(), BuildStep::Built);
    assert_eq!(std::fs::read_dir(&out).unwrap().count(), 0);
}

#[test]
fn test_operations_are_bound_to_their_step() {
    let (_tmp, paths, out) = setup_test_env();
    let host = DirectoryHost::from_paths(paths);
    let mut session = session();

    assert!(matches!(session.toggle_files("a"), Err(SError::InvalidStep(_))));
    assert!(matches!(
        session.toggle_include(IncludeFlag::Saves),
        Err(SError::InvalidStep(_))
    ));
    assert!(matches!(session.back(), Err(SError::InvalidStep(_))));

    let (tx, _rx) = unbounded_channel();
    let result = TaskContext::scope(tx, || PackageBuilder::build(&mut session, &host, &out));
    assert!(matches!(result, Err(SError::InvalidStep(_))));

    session.next().unwrap();
    assert!(matches!(session.select(&host, "a"), Err(SError::InvalidStep(_))));
}

#[test]
fn test_bad_field_input_keeps_previous_value() {
    let mut session = session();
    session.next().unwrap();
    session.next().unwrap();

    let err = session.set_field("name", "{not json").unwrap_err();
    assert!(matches!(err, SError::InvalidField(key, _) if key == "name"));
    assert_eq!(session.modpack.name, "Bob's modpack");
}

#[tokio::test]
async fn test_build_in_background_streams_status() {
    let (_tmp, paths, out) = setup_test_env();
    create_test_mod(&paths, "a", None, None);
    let host = DirectoryHost::from_paths(paths.clone());

    let mut session = session();
    session.select(&host, "a").unwrap();
    session_at_finalize(&mut session);

    let (tx, mut rx) = unbounded_channel();
    let (session, report) = PackageBuilder::build_in_background(session, host, out, tx)
        .await
        .unwrap();

    assert_eq!(session.step(), BuildStep::Built);
    assert_eq!(report.package.kind, PackageKind::Archive);
    let mut last = None;
    while let Some(status) = rx.recv().await {
        last = Some(status);
    }
    assert_eq!(last, Some(TaskStatus::Finished(report.package.path.to_string())));
}

#[test]
fn test_saves_and_saved_data_are_captured_when_enabled() {
    let (_tmp, paths, out) = setup_test_env();
    create_test_mod(
        &paths,
        "a",
        None,
        Some(&json!({"coins": 5, "SESSION_TOKEN": "x", "deep": {"token": 1}})),
    );
    write_file(&paths.mod_save_dir("a").join("levels/extra.dat"), "dat");
    let host = DirectoryHost::from_paths(paths.clone());

    let mut session = session();
    session.select(&host, "a").unwrap();
    session.next().unwrap();
    session.next().unwrap();
    assert!(session.toggle_include(IncludeFlag::Saved).unwrap());
    assert!(session.toggle_include(IncludeFlag::Saves).unwrap());
    session.next().unwrap();

    let (tx, _rx) = unbounded_channel();
    let report =
        TaskContext::scope(tx, || PackageBuilder::build(&mut session, &host, &out)).unwrap();

    let members = archive_members(&report.package.path);
    assert!(members.contains(&"saves/a/levels/extra.dat".to_string()));
    assert!(members.contains(&"saves/a/saved.json".to_string()));

    let loaded = PackageReader::default().load(&report.package.path).unwrap();
    assert_eq!(
        loaded.modpack.entries["a"].saved,
        Some(json!({"coins": 5, "deep": {"token": 1}}))
    );
}

#[test]
fn test_no_files_and_no_flags_yields_bare_manifest() {
    let (_tmp, paths, out) = setup_test_env();
    create_test_mod(&paths, "a", Some(&json!({"k": 1})), Some(&json!({"s": 2})));
    write_file(&paths.mod_config_dir("a").join("a.cfg"), "cfg");
    let host = DirectoryHost::from_paths(paths.clone());

    let mut session = session();
    session.select(&host, "a").unwrap();
    session.next().unwrap();
    assert!(!session.toggle_files("a").unwrap());
    session.next().unwrap();
    session.toggle_include(IncludeFlag::Settings).unwrap();
    session.toggle_include(IncludeFlag::Config).unwrap();
    assert_eq!(session.modpack.include, IncludeFlags {
        settings: false,
        saved: false,
        config: false,
        saves: false,
    });
    session.next().unwrap();

    let (tx, _rx) = unbounded_channel();
    let report =
        TaskContext::scope(tx, || PackageBuilder::build(&mut session, &host, &out)).unwrap();

    assert_eq!(report.package.kind, PackageKind::Manifest);
    let loaded = PackageReader::default().load(&report.package.path).unwrap();
    assert!(!loaded.modpack.entries["a"].has_data());
}

#[cfg(target_os = "linux")]
#[test]
fn test_entry_with_unreadable_tree_is_left_out_entirely() {
    use std::os::unix::ffi::OsStrExt;

    let (_tmp, paths, out) = setup_test_env();
    create_test_mod(&paths, "a", None, None);
    create_test_mod(&paths, "b", None, None);
    write_file(&paths.mod_config_dir("a").join("a.cfg"), "cfg");
    let bad_name = std::ffi::OsStr::from_bytes(b"bad\xff.cfg");
    std::fs::write(paths.mod_config_dir("a").as_std_path().join(bad_name), "x").unwrap();
    let host = DirectoryHost::from_paths(paths.clone());

    let mut session = session();
    session.select(&host, "a").unwrap();
    session.select(&host, "b").unwrap();
    session_at_finalize(&mut session);

    let (tx, _rx) = unbounded_channel();
    let report =
        TaskContext::scope(tx, || PackageBuilder::build(&mut session, &host, &out)).unwrap();

    let skipped: Vec<&str> = report.skipped.iter().map(|(id, _)| id.as_str()).collect();
    assert_eq!(skipped, ["a"]);
    assert_eq!(report.bundled, ["b"]);
    assert_eq!(
        archive_members(&report.package.path),
        ["mods/b.geode", "this.geode_modlist"]
    );

    let loaded = PackageReader::default().load(&report.package.path).unwrap();
    assert!(loaded.modpack.entries.contains_key("a"));
}

#[test]
fn test_failed_write_keeps_previous_pack() {
    let (_tmp, paths, out) = setup_test_env();
    create_test_mod(&paths, "a", None, None);
    let previous = out.join("Bob_s_modpack.geode_modpack");
    write_file(&previous, "previous build");

    let bundles = [BundleRequest {
        mod_id: "a".into(),
        package_path: paths.package_file("a"),
        config_dir: None,
        save_dir: None,
    }];
    let mut fail_at_list = |line: String| {
        if line == "creating list..." {
            Err(SError::UpdateStatusError("watcher left".into()))
        } else {
            Ok(())
        }
    };

    let none: [BundleRequest; 0] = [];
    for bundles in [&bundles[..], &none[..]] {
        let result = PackageWriter::write(
            &out,
            "Bob_s_modpack",
            &Modpack::new("Bob"),
            bundles,
            &mut fail_at_list,
        );
        assert!(matches!(result, Err(SError::UpdateStatusError(_))));
        assert_eq!(std::fs::read_to_string(&previous).unwrap(), "previous build");
        assert_eq!(std::fs::read_dir(&out).unwrap().count(), 1);
    }
}

#[test]
fn test_editing_existing_pack_preselects_entries() {
    let (_tmp, paths, _out) = setup_test_env();
    create_test_mod(&paths, "a", None, None);
    let host = DirectoryHost::from_paths(paths.clone());

    let existing = Modpack::from_json(
        r#"{"name":"Old","creator":"C","entries":{"a":{},"gone":{}},
            "files_installed":true,"install_progress":{}}"#,
    )
    .unwrap();
    let session = BuildSession::from_existing(existing, &AppSettings::default(), &host);

    assert_eq!(session.step(), BuildStep::SelectEntries);
    assert_eq!(session.modpack.name, "Old");
    assert_eq!(session.modpack.files_installed, None);
    assert_eq!(session.modpack.install_progress, None);
    assert!(session.selected()["a"].include_files);
    assert!(!session.selected()["gone"].installed);
    assert!(!session.selected()["gone"].include_files);
}
