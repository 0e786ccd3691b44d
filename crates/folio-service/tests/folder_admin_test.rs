//! Integration tests for folder lookups, uploads and administrative operations.

mod helpers;

use std::sync::Arc;

use bytes::Bytes;
use futures::TryStreamExt;

use folio_core::error::ErrorKind;
use folio_core::events::StorageOperation;
use folio_core::traits::storage::StorageClient;
use folio_database::FolderRegistry;
use folio_entity::{DriveOptions, EntityKind, FolderOwner};

use helpers::{StableIdClient, TestApp, spaced};

#[tokio::test]
async fn test_upload_and_fetch_round_through_primary_folder() {
    let mut app = TestApp::local().await;
    let (_, study, _) = app.hierarchy().await;
    let created = app
        .orchestrator
        .create_folder_for_entity(study.id, None)
        .await
        .unwrap();

    let file = app
        .orchestrator
        .upload_file(study.id, "dosing.csv", Bytes::from_static(b"subject,dose\n1,10\n"))
        .await
        .unwrap();
    assert_eq!(file.path, format!("{}/dosing.csv", created.record.path));
    assert_eq!(file.size, 18);

    let fetched = app.orchestrator.fetch_file(study.id, "dosing.csv").await.unwrap();
    assert_eq!(fetched.file.path, file.path);
    let chunks: Vec<Bytes> = fetched.stream.try_collect().await.unwrap();
    assert_eq!(chunks.concat(), b"subject,dose\n1,10\n");

    let listed = app.orchestrator.get_primary_folder(study.id, true).await.unwrap();
    assert!(listed.folder.contents_loaded);
    assert_eq!(listed.folder.files.len(), 1);

    let operations: Vec<StorageOperation> = app.events().iter().map(|e| e.operation).collect();
    assert_eq!(
        operations,
        vec![
            StorageOperation::FolderCreated,
            StorageOperation::FileUploaded,
            StorageOperation::FileFetched,
            StorageOperation::FolderFetched,
        ]
    );
}

#[tokio::test]
async fn test_upload_refused_on_write_disabled_folder() {
    let options = DriveOptions {
        write_enabled: false,
        ..DriveOptions::default()
    };
    let app = TestApp::local_with(options).await;
    let (program, _, _) = app.hierarchy().await;
    app.orchestrator
        .create_folder_for_entity(program.id, None)
        .await
        .unwrap();

    let err = app
        .orchestrator
        .upload_file(program.id, "notes.txt", Bytes::from_static(b"x"))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Authorization);
}

#[tokio::test]
async fn test_fetch_rejects_escaping_paths() {
    let app = TestApp::local().await;
    let (program, _, _) = app.hierarchy().await;
    app.orchestrator
        .create_folder_for_entity(program.id, None)
        .await
        .unwrap();

    let err = app
        .orchestrator
        .fetch_file(program.id, "../secrets.txt")
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
    let err = app.orchestrator.fetch_file(program.id, "/").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
}

#[tokio::test]
async fn test_repair_recreates_vanished_folder() {
    let mut app = TestApp::local().await;
    let (program, _, _) = app.hierarchy().await;
    let created = app
        .orchestrator
        .create_folder_for_entity(program.id, None)
        .await
        .unwrap();
    std::fs::remove_dir(app.disk(&created.record.path)).unwrap();

    let repaired = app.orchestrator.repair_folder(program.id, None).await.unwrap();
    assert_eq!(repaired.record.id, created.record.id);
    assert_eq!(repaired.record.path, created.record.path);
    assert!(app.disk(&created.record.path).is_dir());

    // Running it again is harmless.
    app.orchestrator.repair_folder(program.id, None).await.unwrap();

    let operations: Vec<StorageOperation> = app.events().iter().map(|e| e.operation).collect();
    assert_eq!(
        operations,
        vec![
            StorageOperation::FolderCreated,
            StorageOperation::FolderRepaired,
            StorageOperation::FolderRepaired,
        ]
    );
}

#[tokio::test]
async fn test_rename_keeps_backend_id_on_stable_backend() {
    let client = Arc::new(StableIdClient::new());
    let app = TestApp::with_client(client.clone(), spaced()).await;
    let (_, study, assay) = app.hierarchy().await;
    let assay_before = app
        .orchestrator
        .create_folder_for_entity(assay.id, None)
        .await
        .unwrap();
    let study_before = app
        .registry
        .find_primary(FolderOwner::new(EntityKind::Study, study.id))
        .await
        .unwrap()
        .unwrap();

    let renamed = app
        .orchestrator
        .rename_entity_folder(study.id, "Renamed Study")
        .await
        .unwrap();

    assert_eq!(renamed.folder.folder_id, study_before.backend_folder_id);
    assert_eq!(renamed.record.backend_folder_id, study_before.backend_folder_id);
    assert_eq!(renamed.record.path, "/Studies/Clinical Program A/Renamed Study");

    let by_id = client
        .find_folder_by_id(&renamed.record.backend_folder_id, false)
        .await
        .unwrap();
    assert_eq!(by_id.path, renamed.record.path);

    let assay_after = app
        .registry
        .find_primary(FolderOwner::new(EntityKind::Assay, assay.id))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        assay_after.path,
        "/Studies/Clinical Program A/Renamed Study/CPA-10001-01 - PK Panel"
    );
    assert_eq!(assay_after.backend_folder_id, assay_before.record.backend_folder_id);
}

#[tokio::test]
async fn test_rename_on_path_addressed_backend_rebases_ids() {
    let app = TestApp::local().await;
    let (_, study, assay) = app.hierarchy().await;
    app.orchestrator
        .create_folder_for_entity(assay.id, None)
        .await
        .unwrap();

    let renamed = app
        .orchestrator
        .rename_entity_folder(study.id, "Renamed Study")
        .await
        .unwrap();
    assert_eq!(renamed.record.path, "/Studies/Clinical_Program_A/Renamed_Study");
    assert_eq!(renamed.record.backend_folder_id, renamed.record.path);

    let assay_row = app
        .registry
        .find_primary(FolderOwner::new(EntityKind::Assay, assay.id))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        assay_row.path,
        "/Studies/Clinical_Program_A/Renamed_Study/CPA-10001-01_-_PK_Panel"
    );
    assert_eq!(assay_row.backend_folder_id, assay_row.path);

    let found = app.orchestrator.get_primary_folder(assay.id, false).await.unwrap();
    assert_eq!(found.folder.path, assay_row.path);
}

#[tokio::test]
async fn test_move_entity_folder() {
    let mut app = TestApp::local().await;
    let (_, study, _) = app.hierarchy().await;
    let created = app
        .orchestrator
        .create_folder_for_entity(study.id, None)
        .await
        .unwrap();

    let moved = app
        .orchestrator
        .move_entity_folder(study.id, "/Studies")
        .await
        .unwrap();
    assert_eq!(moved.record.path, "/Studies/CPA-10001_-_First_In_Human");
    assert!(app.disk(&moved.record.path).is_dir());
    assert!(!app.disk(&created.record.path).exists());

    let last = app.events().pop().unwrap();
    assert_eq!(last.operation, StorageOperation::FolderMoved);
}

#[tokio::test]
async fn test_secondary_folders_and_deactivation() {
    let app = TestApp::local().await;
    let (_, study, _) = app.hierarchy().await;
    app.orchestrator
        .create_folder_for_entity(study.id, None)
        .await
        .unwrap();

    let secondary = app
        .orchestrator
        .add_secondary_folder(study.id, app.drive.id, "/Studies/FIH shared")
        .await
        .unwrap();
    assert!(!secondary.record.is_primary);
    assert!(app.disk("/Studies/FIH shared").is_dir());

    let folders = app.orchestrator.folders_for_entity(study.id).await.unwrap();
    assert_eq!(folders.len(), 2);
    assert!(folders[0].is_primary);

    assert_eq!(app.orchestrator.deactivate_entity(study.id).await.unwrap(), 2);
    let err = app
        .orchestrator
        .get_primary_folder(study.id, false)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_register_root_twice_is_rejected() {
    let app = TestApp::local().await;
    let err = app
        .orchestrator
        .register_root_folder(
            app.drive.id,
            "/Studies",
            folio_service::RootFlags {
                study_root: true,
                browser_root: false,
            },
            false,
        )
        .await
        .unwrap_err();
    assert!(err.is_already_exists());

    let err = app
        .orchestrator
        .register_root_folder(app.drive.id, "/Missing", folio_service::RootFlags::default(), true)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
}

#[tokio::test]
async fn test_retired_drive_takes_no_new_folders() {
    let app = TestApp::local().await;
    let (program, study, _) = app.hierarchy().await;
    app.orchestrator
        .create_folder_for_entity(program.id, None)
        .await
        .unwrap();

    assert!(app.orchestrator.retire_drive(app.drive.id).await.unwrap());
    assert!(!app.orchestrator.retire_drive(app.drive.id).await.unwrap());

    let err = app
        .orchestrator
        .create_folder_for_entity(study.id, None)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Configuration);
    assert!(!app.disk("/Studies/Clinical_Program_A/CPA-10001_-_First_In_Human").exists());

    let err = app
        .orchestrator
        .register_root_folder(
            app.drive.id,
            "/Archive",
            folio_service::RootFlags {
                study_root: true,
                browser_root: false,
            },
            true,
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Configuration);

    // Folders already on the drive stay reachable.
    let found = app
        .orchestrator
        .get_primary_folder(program.id, false)
        .await
        .unwrap();
    assert_eq!(found.record.path, "/Studies/Clinical_Program_A");
    assert_eq!(
        app.orchestrator.drive_health().await.get(&app.drive.id),
        Some(&true)
    );
}
