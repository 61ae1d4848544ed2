//! Command handlers.
//!
//! Each handler drives the [`ProfileManager`] for one subcommand and renders
//! the result to `out`. The binary passes stdout.

use std::io::Write;
use std::path::{Path, PathBuf};

use super::commands::{
    ConfigCommand, CreateCommand, DeleteCommand, DocumentCommand, ExportCommand, UpdateCommand,
};
use crate::config::Config;
use crate::document::PreviewKind;
use crate::error::{Error, Result};
use crate::lifecycle::ProfileManager;
use crate::profile::Profile;

/// Printed after a save fails with [`Error::CapacityExceeded`].
pub const CAPACITY_HINT: &str =
    "Storage is full. Remove the embedded document (or use a smaller one) and try again.";

/// Extra advice to print for an error, if any.
#[must_use]
pub fn capacity_hint(err: &Error) -> Option<&'static str> {
    err.is_capacity_exceeded().then_some(CAPACITY_HINT)
}

/// List every profile as a card, or as a JSON array.
///
/// # Errors
///
/// Returns an error if the store cannot be read or `out` cannot be written.
pub fn list(manager: &ProfileManager, json: bool, out: &mut impl Write) -> Result<()> {
    let profiles = manager.list()?;

    if json {
        writeln!(out, "{}", serde_json::to_string_pretty(&profiles)?)?;
        return Ok(());
    }

    if profiles.is_empty() {
        writeln!(out, "No profiles found in the directory.")?;
        return Ok(());
    }

    for profile in &profiles {
        write_card(profile, out)?;
        writeln!(out)?;
    }
    Ok(())
}

fn write_card(profile: &Profile, out: &mut impl Write) -> Result<()> {
    writeln!(out, "{}  (ID: {})", profile.name, profile.id)?;
    writeln!(out, "  Email:     {}", profile.email)?;
    writeln!(out, "  Born:      {}", profile.dob_label())?;
    writeln!(out, "  Address:   {}", profile.address_preview())?;
    writeln!(
        out,
        "  Document:  {} ({})",
        profile.document_label(),
        profile.document_file_label()
    )?;
    if !profile.has_document() {
        writeln!(out, "             File Not Stored")?;
    }
    Ok(())
}

/// Show one profile in full.
///
/// # Errors
///
/// Returns [`Error::NotFound`] if no profile has this id.
pub fn show(manager: &ProfileManager, id: i64, json: bool, out: &mut impl Write) -> Result<()> {
    let profile = manager.get(id)?;

    if json {
        writeln!(out, "{}", profile.to_export_json()?)?;
        return Ok(());
    }

    let address = if profile.address.is_empty() {
        "Address Missing"
    } else {
        profile.address.as_str()
    };

    writeln!(out, "Profile {}", profile.id)?;
    writeln!(out, "==========")?;
    writeln!(out, "Name:          {}", profile.name)?;
    writeln!(out, "Email:         {}", profile.email)?;
    writeln!(out, "Date of birth: {}", profile.dob_label())?;
    writeln!(out, "Address:       {address}")?;
    writeln!(out)?;
    writeln!(out, "[Document]")?;
    writeln!(out, "  Type:         {}", profile.document_label())?;
    writeln!(out, "  File tracked: {}", profile.document_file_label())?;

    match &profile.document_content {
        Some(content) => {
            let preview = PreviewKind::for_file_name(&profile.document_file_name);
            writeln!(
                out,
                "  Stored:       yes ({}, {} bytes encoded)",
                content.mime_type().unwrap_or("unknown type"),
                content.len()
            )?;
            writeln!(out, "  Preview:      {preview}")?;
            writeln!(
                out,
                "  Use `profiledir document {}` to download the original file.",
                profile.id
            )?;
        }
        None => {
            writeln!(out, "  Stored:       no")?;
            writeln!(
                out,
                "  No document content was stored for this profile. Update it with --file to enable downloading."
            )?;
        }
    }
    Ok(())
}

/// Create a profile from command-line fields.
///
/// # Errors
///
/// See [`ProfileManager::create_or_update`].
pub async fn create(
    manager: &ProfileManager,
    cmd: &CreateCommand,
    out: &mut impl Write,
) -> Result<Profile> {
    let profile = manager.create(cmd.fields(), cmd.raw_file()).await?;
    writeln!(
        out,
        "Profile for {} created (ID: {}).",
        profile.name, profile.id
    )?;
    Ok(profile)
}

/// Update a profile. Fields not given on the command line keep their values.
///
/// # Errors
///
/// See [`ProfileManager::create_or_update`].
pub async fn update(
    manager: &ProfileManager,
    cmd: &UpdateCommand,
    out: &mut impl Write,
) -> Result<Profile> {
    let current = manager.get(cmd.id)?;
    let profile = manager
        .update(cmd.id, cmd.fields(&current), cmd.raw_file())
        .await?;
    writeln!(out, "Profile for {} updated.", profile.name)?;
    Ok(profile)
}

/// Delete a profile once confirmed with `--yes`.
///
/// # Errors
///
/// Returns an error if the store cannot be read or written.
pub async fn delete(
    manager: &ProfileManager,
    cmd: &DeleteCommand,
    out: &mut impl Write,
) -> Result<()> {
    if !cmd.yes {
        writeln!(out, "This will permanently delete profile {}.", cmd.id)?;
        writeln!(out, "Use --yes to confirm.")?;
        return Ok(());
    }

    if manager.delete(cmd.id).await? {
        writeln!(out, "Profile deleted successfully.")?;
    } else {
        writeln!(out, "No profile with ID {}; nothing to delete.", cmd.id)?;
    }
    Ok(())
}

/// Where `export` writes: `out` if given, else `<Name>_Profile.json`.
#[must_use]
pub fn export_path(profile: &Profile, out: Option<&Path>) -> PathBuf {
    out.map_or_else(|| PathBuf::from(profile.export_file_name()), Path::to_path_buf)
}

/// Write a profile's JSON to a file.
///
/// # Errors
///
/// Returns [`Error::NotFound`] for an unknown id or [`Error::FileWrite`] if
/// the file cannot be written.
pub fn export(
    manager: &ProfileManager,
    cmd: &ExportCommand,
    out: &mut impl Write,
) -> Result<PathBuf> {
    let profile = manager.get(cmd.id)?;
    let path = export_path(&profile, cmd.out.as_deref());

    write_file(&path, profile.to_export_json()?.as_bytes())?;
    writeln!(
        out,
        "Exported profile data for {} to {}",
        profile.name,
        path.display()
    )?;
    Ok(path)
}

/// Where `document` writes: `out` if given, else the stored file name.
///
/// Only the final component of the stored name is used.
#[must_use]
pub fn document_path(profile: &Profile, out: Option<&Path>) -> PathBuf {
    if let Some(path) = out {
        return path.to_path_buf();
    }
    match Path::new(&profile.document_file_name).file_name() {
        Some(name) => PathBuf::from(name),
        None => PathBuf::from(format!("profile_{}_document", profile.id)),
    }
}

/// Write a profile's stored document back to disk.
///
/// # Errors
///
/// Returns [`Error::DocumentMissing`] if no content was stored,
/// [`Error::InvalidDataUrl`] if it cannot be decoded, or
/// [`Error::FileWrite`] if the file cannot be written.
pub fn document(
    manager: &ProfileManager,
    cmd: &DocumentCommand,
    out: &mut impl Write,
) -> Result<PathBuf> {
    let profile = manager.get(cmd.id)?;
    let content = profile
        .document_content
        .as_ref()
        .ok_or(Error::DocumentMissing { id: profile.id })?;

    let (_, bytes) = content.decode()?;
    let path = document_path(&profile, cmd.out.as_deref());

    write_file(&path, &bytes)?;
    writeln!(
        out,
        "Saved {} to {}",
        profile.document_file_label(),
        path.display()
    )?;
    Ok(path)
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    std::fs::write(path, bytes).map_err(|source| Error::FileWrite {
        path: path.to_path_buf(),
        source,
    })
}

/// Show storage usage.
///
/// # Errors
///
/// Returns an error if the store cannot be read.
pub fn status(
    manager: &ProfileManager,
    database_path: &Path,
    json: bool,
    out: &mut impl Write,
) -> Result<()> {
    let stats = manager.store().stats()?;

    if json {
        let status = serde_json::json!({
            "database_path": database_path,
            "slot_key": manager.store().key(),
            "total_profiles": stats.total_profiles,
            "documents_stored": stats.documents_stored,
            "used_bytes": stats.used_bytes,
            "quota_bytes": stats.quota_bytes,
        });
        writeln!(out, "{}", serde_json::to_string_pretty(&status)?)?;
        return Ok(());
    }

    writeln!(out, "profiledir status")?;
    writeln!(out, "-----------------")?;
    writeln!(out, "Database:      {}", database_path.display())?;
    writeln!(out, "Slot:          {}", manager.store().key())?;
    writeln!(out, "Profiles:      {}", stats.total_profiles)?;
    writeln!(out, "Documents:     {}", stats.documents_stored)?;
    writeln!(
        out,
        "Storage:       {} / {} bytes",
        stats.used_bytes, stats.quota_bytes
    )?;
    Ok(())
}

/// Show, locate or validate configuration.
///
/// # Errors
///
/// Returns an error if `out` cannot be written.
pub fn config(config: &Config, cmd: ConfigCommand, out: &mut impl Write) -> Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                writeln!(out, "{}", serde_json::to_string_pretty(config)?)?;
            } else {
                writeln!(out, "Current Configuration")?;
                writeln!(out, "=====================")?;
                writeln!(out)?;
                writeln!(out, "[Storage]")?;
                writeln!(
                    out,
                    "  Database path:  {}",
                    config.database_path().display()
                )?;
                writeln!(out, "  Slot key:       {}", config.storage.slot_key)?;
                writeln!(out, "  Quota (bytes):  {}", config.storage.quota_bytes)?;
                writeln!(out)?;
                writeln!(out, "[Ids]")?;
                writeln!(out, "  Strategy:       {}", config.ids.strategy)?;
            }
        }
        ConfigCommand::Path => {
            writeln!(out, "{}", Config::default_config_path().display())?;
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            writeln!(out, "Validating configuration: {}", path.display())?;
            match Config::load_from(Some(path)) {
                Ok(_) => writeln!(out, "Configuration is valid.")?,
                Err(e) => writeln!(out, "Configuration error: {e}")?,
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::document::{DataUrl, FsDocumentReader, RawFile};
    use crate::ids::SequentialIdGenerator;
    use crate::profile::FieldSet;
    use crate::storage::{MemoryMedium, ProfileStore, DEFAULT_QUOTA_BYTES};

    const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    fn create_manager(quota: u64) -> ProfileManager {
        ProfileManager::new(
            ProfileStore::with_default_key(Arc::new(MemoryMedium::new(quota))),
            Arc::new(SequentialIdGenerator::new()),
            Arc::new(FsDocumentReader::default()),
        )
    }

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("profiledir_{}_{name}", std::process::id()))
    }

    fn output(buf: Vec<u8>) -> String {
        String::from_utf8(buf).unwrap()
    }

    fn create_cmd(name: &str, email: &str) -> CreateCommand {
        CreateCommand {
            name: name.to_string(),
            email: email.to_string(),
            dob: String::new(),
            address: String::new(),
            document_name: String::new(),
            file: None,
        }
    }

    fn update_cmd(id: i64) -> UpdateCommand {
        UpdateCommand {
            id,
            name: None,
            email: None,
            dob: None,
            address: None,
            document_name: None,
            file: None,
        }
    }

    #[test]
    fn test_list_empty() {
        let manager = create_manager(DEFAULT_QUOTA_BYTES);
        let mut out = Vec::new();
        list(&manager, false, &mut out).unwrap();
        assert_eq!(output(out), "No profiles found in the directory.\n");
    }

    #[tokio::test]
    async fn test_list_cards_and_json() {
        let manager = create_manager(DEFAULT_QUOTA_BYTES);
        create(&manager, &create_cmd("Ada", "ada@x.com"), &mut Vec::new())
            .await
            .unwrap();

        let mut cards = Vec::new();
        list(&manager, false, &mut cards).unwrap();
        let cards = output(cards);
        assert!(cards.contains("Ada  (ID: 1)"));
        assert!(cards.contains("Date Not Set"));
        assert!(cards.contains("File Not Stored"));

        let mut json = Vec::new();
        list(&manager, true, &mut json).unwrap();
        let parsed: Vec<Profile> = serde_json::from_str(&output(json)).unwrap();
        assert_eq!(parsed, manager.list().unwrap());
    }

    #[tokio::test]
    async fn test_show_reports_document_state() {
        let manager = create_manager(DEFAULT_QUOTA_BYTES);
        let bare = manager.create(FieldSet::new("A", ""), None).await.unwrap();
        let with_doc = manager
            .create(
                FieldSet::new("B", ""),
                Some(RawFile::from_bytes("id.png", PNG)),
            )
            .await
            .unwrap();

        let mut out = Vec::new();
        show(&manager, bare.id, false, &mut out).unwrap();
        let text = output(out);
        assert!(text.contains("Address Missing"));
        assert!(text.contains("Stored:       no"));

        let mut out = Vec::new();
        show(&manager, with_doc.id, false, &mut out).unwrap();
        let text = output(out);
        assert!(text.contains("Stored:       yes (image/png"));
        assert!(text.contains("Preview:      image"));

        let err = show(&manager, 99, false, &mut Vec::new()).unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_update_keeps_fields_not_given() {
        let manager = create_manager(DEFAULT_QUOTA_BYTES);
        let mut cmd = create_cmd("Ada", "ada@x.com");
        cmd.address = "12 St James's Square".to_string();
        let created = create(&manager, &cmd, &mut Vec::new()).await.unwrap();

        let mut change = update_cmd(created.id);
        change.name = Some("Ada King".to_string());
        let mut out = Vec::new();
        let updated = update(&manager, &change, &mut out).await.unwrap();

        assert_eq!(output(out), "Profile for Ada King updated.\n");
        assert_eq!(updated.name, "Ada King");
        assert_eq!(updated.email, "ada@x.com");
        assert_eq!(updated.address, "12 St James's Square");
    }

    #[tokio::test]
    async fn test_update_missing_profile() {
        let manager = create_manager(DEFAULT_QUOTA_BYTES);
        let err = update(&manager, &update_cmd(5), &mut Vec::new())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_delete_requires_confirmation() {
        let manager = create_manager(DEFAULT_QUOTA_BYTES);
        let created = manager.create(FieldSet::new("A", ""), None).await.unwrap();

        let mut out = Vec::new();
        let unconfirmed = DeleteCommand {
            id: created.id,
            yes: false,
        };
        delete(&manager, &unconfirmed, &mut out).await.unwrap();
        assert!(output(out).contains("Use --yes to confirm."));
        assert_eq!(manager.list().unwrap(), vec![created.clone()]);

        let mut out = Vec::new();
        let confirmed = DeleteCommand {
            id: created.id,
            yes: true,
        };
        delete(&manager, &confirmed, &mut out).await.unwrap();
        assert_eq!(output(out), "Profile deleted successfully.\n");
        assert!(manager.list().unwrap().is_empty());

        let mut out = Vec::new();
        delete(&manager, &confirmed, &mut out).await.unwrap();
        assert!(output(out).contains("nothing to delete"));
    }

    #[tokio::test]
    async fn test_export_writes_profile_json() {
        let manager = create_manager(DEFAULT_QUOTA_BYTES);
        let created = manager
            .create(FieldSet::new("Ada Lovelace", "ada@x.com"), None)
            .await
            .unwrap();
        assert_eq!(
            export_path(&created, None),
            PathBuf::from("Ada_Lovelace_Profile.json")
        );

        let target = temp_path("export.json");
        let cmd = ExportCommand {
            id: created.id,
            out: Some(target.clone()),
        };
        let written = export(&manager, &cmd, &mut Vec::new()).unwrap();

        assert_eq!(written, target);
        let contents = std::fs::read_to_string(&target).unwrap();
        assert_eq!(contents, created.to_export_json().unwrap());

        let _ = std::fs::remove_file(&target);
    }

    #[tokio::test]
    async fn test_export_unwritable_path() {
        let manager = create_manager(DEFAULT_QUOTA_BYTES);
        let created = manager.create(FieldSet::new("A", ""), None).await.unwrap();
        let cmd = ExportCommand {
            id: created.id,
            out: Some(PathBuf::from("/nonexistent/profiledir/out.json")),
        };
        let err = export(&manager, &cmd, &mut Vec::new()).unwrap_err();
        assert!(matches!(err, Error::FileWrite { .. }));
    }

    #[tokio::test]
    async fn test_document_round_trips_bytes() {
        let manager = create_manager(DEFAULT_QUOTA_BYTES);
        let created = manager
            .create(
                FieldSet::new("B", ""),
                Some(RawFile::from_bytes("id.png", PNG)),
            )
            .await
            .unwrap();
        assert_eq!(document_path(&created, None), PathBuf::from("id.png"));

        let target = temp_path("id.png");
        let cmd = DocumentCommand {
            id: created.id,
            out: Some(target.clone()),
        };
        let mut out = Vec::new();
        document(&manager, &cmd, &mut out).unwrap();

        assert_eq!(std::fs::read(&target).unwrap(), PNG);
        assert!(output(out).starts_with("Saved id.png to "));

        let _ = std::fs::remove_file(&target);
    }

    #[test]
    fn test_document_path_uses_final_component() {
        let mut profile = Profile::new(4, FieldSet::new("A", ""), String::new(), None);
        profile.document_file_name = "../../etc/passwd".to_string();
        assert_eq!(document_path(&profile, None), PathBuf::from("passwd"));

        profile.document_file_name.clear();
        assert_eq!(
            document_path(&profile, None),
            PathBuf::from("profile_4_document")
        );

        let chosen = Path::new("/tmp/out.bin");
        assert_eq!(document_path(&profile, Some(chosen)), chosen);
    }

    #[tokio::test]
    async fn test_document_without_content() {
        let manager = create_manager(DEFAULT_QUOTA_BYTES);
        let created = manager.create(FieldSet::new("A", ""), None).await.unwrap();
        let cmd = DocumentCommand {
            id: created.id,
            out: Some(temp_path("never_written")),
        };
        let err = document(&manager, &cmd, &mut Vec::new()).unwrap_err();
        assert!(matches!(err, Error::DocumentMissing { id } if id == created.id));
    }

    #[tokio::test]
    async fn test_capacity_hint_after_oversized_create() {
        let manager = create_manager(256);
        create(&manager, &create_cmd("A", "a@x.com"), &mut Vec::new())
            .await
            .unwrap();

        let err = manager
            .create(
                FieldSet::new("B", ""),
                Some(RawFile::from_bytes("scan.pdf", vec![0u8; 1024])),
            )
            .await
            .unwrap_err();

        assert_eq!(capacity_hint(&err), Some(CAPACITY_HINT));
        assert_eq!(capacity_hint(&Error::not_found(1)), None);
    }

    #[tokio::test]
    async fn test_status_json() {
        let manager = create_manager(DEFAULT_QUOTA_BYTES);
        let mut with_doc = Profile::new(1, FieldSet::new("A", ""), "a.txt".to_string(), None);
        with_doc.document_content = Some(DataUrl::encode("text/plain", b"a"));
        manager.store().save(&[with_doc]).unwrap();

        let mut out = Vec::new();
        status(&manager, Path::new("/data/profiles.db"), true, &mut out).unwrap();
        let value: serde_json::Value = serde_json::from_str(&output(out)).unwrap();

        assert_eq!(value["database_path"], "/data/profiles.db");
        assert_eq!(value["total_profiles"], 1);
        assert_eq!(value["documents_stored"], 1);
        assert_eq!(value["quota_bytes"], DEFAULT_QUOTA_BYTES);
    }

    /// Output stream whose reader has gone away.
    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::ErrorKind::BrokenPipe.into())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_output_failure_is_io_error() {
        let manager = create_manager(DEFAULT_QUOTA_BYTES);
        let err = list(&manager, false, &mut ClosedPipe).unwrap_err();
        assert!(matches!(err, Error::Io(ref e) if e.kind() == std::io::ErrorKind::BrokenPipe));
    }

    #[test]
    fn test_config_show() {
        let mut out = Vec::new();
        config(
            &Config::default(),
            ConfigCommand::Show { json: false },
            &mut out,
        )
        .unwrap();
        let text = output(out);
        assert!(text.contains("detailedProfilesData"));
        assert!(text.contains("Strategy:       clock"));
    }
}
