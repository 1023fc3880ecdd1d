// Metadata extraction from mod archives (Fabric, Forge, Quilt)

use crate::models::{ModLoader, PackageMetadata};
use crate::providers::hash::{self, HashAlgorithm};
use log::{debug, warn};
use serde_json::Value;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use zip::ZipArchive;

const FABRIC_MOD_JSON: &str = "fabric.mod.json";
const FORGE_TOML: &str = "META-INF/mods.toml";
const QUILT_MOD_JSON: &str = "quilt.mod.json";
const MANIFEST_MF: &str = "META-INF/MANIFEST.MF";
const MOD_EXTENSIONS: [&str; 2] = ["jar", "zip"];

/// Reads package metadata from a file on disk
pub trait MetadataExtractor {
    fn extract(&self, path: &Path) -> PackageMetadata;
}

/// Extractor for zip-based mod archives
pub struct ArchiveExtractor;

impl MetadataExtractor for ArchiveExtractor {
    fn extract(&self, path: &Path) -> PackageMetadata {
        extract_metadata(path)
    }
}

/// Absolute path with forward slashes, used as the cache key for a file
pub fn normalize_path(path: &Path) -> String {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    absolute.to_string_lossy().replace('\\', "/")
}

fn has_mod_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| MOD_EXTENSIONS.contains(&e.to_lowercase().as_str()))
}

/// Whether `path` is a .jar/.zip archive carrying a known mod descriptor
pub fn is_valid_mod_file(path: &Path) -> bool {
    if !path.is_file() || !has_mod_extension(path) {
        return false;
    }

    let Ok(file) = fs::File::open(path) else {
        return false;
    };
    let Ok(archive) = ZipArchive::new(file) else {
        return false;
    };

    let names: Vec<&str> = archive.file_names().collect();
    [FABRIC_MOD_JSON, FORGE_TOML, QUILT_MOD_JSON]
        .iter()
        .any(|descriptor| names.contains(descriptor))
}

/// Mod archives under `dir`, sorted by path
pub fn find_mod_files(dir: &Path, recursive: bool) -> Vec<PathBuf> {
    let mut files = Vec::new();
    collect_mod_files(dir, recursive, &mut files);
    files.sort();
    files
}

fn collect_mod_files(dir: &Path, recursive: bool, files: &mut Vec<PathBuf>) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Could not read directory {}: {}", dir.display(), e);
            return;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            if recursive {
                collect_mod_files(&path, recursive, files);
            }
        } else if is_valid_mod_file(&path) {
            files.push(path);
        }
    }
}

/// Extract metadata from a mod archive.
///
/// File facts (name, size, hash) are always filled in. Descriptor fields stay
/// empty for non-mod or corrupt archives.
pub fn extract_metadata(path: &Path) -> PackageMetadata {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    let mut metadata = PackageMetadata {
        file_path: normalize_path(path),
        file_name: file_name.clone(),
        file_size: fs::metadata(path).map(|m| m.len()).unwrap_or(0),
        file_hash: match hash::compute_file_hash(path, HashAlgorithm::Sha256) {
            Ok(h) => Some(h),
            Err(e) => {
                warn!("Could not compute hash for {}: {}", file_name, e);
                None
            }
        },
        ..PackageMetadata::default()
    };

    if !is_valid_mod_file(path) {
        debug!("{} is not a mod archive", file_name);
        return metadata;
    }

    if let Err(e) = read_descriptor(path, &mut metadata) {
        warn!("Error extracting metadata from {}: {}", file_name, e);
        return metadata;
    }

    // Archive opened but declared no id: fall back to the file stem
    if metadata.mod_id.is_none() {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        if !stem.is_empty() {
            if metadata.mod_name.is_none() {
                metadata.mod_name = Some(stem.clone());
            }
            metadata.mod_id = Some(stem);
        }
    }

    metadata
}

fn read_descriptor(path: &Path, metadata: &mut PackageMetadata) -> anyhow::Result<()> {
    let file = fs::File::open(path)?;
    let mut archive = ZipArchive::new(file)?;

    if let Some(text) = read_entry(&mut archive, FABRIC_MOD_JSON)? {
        metadata.mod_loader = Some(ModLoader::Fabric);
        let json: Value = serde_json::from_str(&text)?;
        apply_fabric(&json, metadata);
    } else if let Some(text) = read_entry(&mut archive, FORGE_TOML)? {
        metadata.mod_loader = Some(ModLoader::Forge);
        let table: toml::Table = toml::from_str(&text)?;
        apply_forge(&table, metadata);

        if metadata.version.as_deref() == Some("${file.jarVersion}") {
            let manifest = read_entry(&mut archive, MANIFEST_MF)?;
            metadata.version = manifest.as_deref().and_then(implementation_version);
        }
    } else if let Some(text) = read_entry(&mut archive, QUILT_MOD_JSON)? {
        metadata.mod_loader = Some(ModLoader::Quilt);
        let json: Value = serde_json::from_str(&text)?;
        apply_quilt(&json, metadata);
    }

    Ok(())
}

fn read_entry<R: Read + std::io::Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> anyhow::Result<Option<String>> {
    let mut entry = match archive.by_name(name) {
        Ok(entry) => entry,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let mut bytes = Vec::new();
    entry.read_to_end(&mut bytes)?;
    Ok(Some(String::from_utf8_lossy(&bytes).into_owned()))
}

fn json_str(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

/// Author entries are either plain strings or `{ "name": ... }` objects
fn person_names(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => vec![s.clone()],
        Value::Array(items) => items.iter().flat_map(person_names).collect(),
        Value::Object(map) => map
            .get("name")
            .and_then(Value::as_str)
            .map(|s| vec![s.to_string()])
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

fn join_names(names: Vec<String>) -> Option<String> {
    if names.is_empty() {
        None
    } else {
        Some(names.join(", "))
    }
}

/// A version requirement that is either a string or a list of strings
fn first_version(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => items.iter().find_map(|v| v.as_str().map(String::from)),
        _ => None,
    }
}

fn apply_fabric(json: &Value, metadata: &mut PackageMetadata) {
    metadata.mod_id = json_str(json, "id");
    metadata.mod_name = json_str(json, "name");
    metadata.version = json_str(json, "version");
    metadata.description = json_str(json, "description");
    metadata.authors = json.get("authors").map(person_names).and_then(join_names);
    metadata.mc_version = json
        .get("depends")
        .and_then(|d| d.get("minecraft"))
        .and_then(first_version);
}

fn apply_quilt(json: &Value, metadata: &mut PackageMetadata) {
    // Fields live under "quilt_loader"; older files put them at the top level
    let loader = json.get("quilt_loader").unwrap_or(json);
    let details = loader.get("metadata").unwrap_or(loader);

    metadata.mod_id = json_str(loader, "id");
    metadata.version = json_str(loader, "version");
    metadata.mod_name = json_str(details, "name");
    metadata.description = json_str(details, "description");
    metadata.authors = details
        .get("contributors")
        .and_then(Value::as_object)
        .and_then(|c| join_names(c.keys().cloned().collect()));

    metadata.mc_version = loader
        .get("depends")
        .and_then(Value::as_array)
        .and_then(|deps| {
            deps.iter()
                .find(|d| d.get("id").and_then(Value::as_str) == Some("minecraft"))
        })
        .and_then(|d| d.get("versions"))
        .and_then(first_version);
}

fn toml_str(table: &toml::Table, key: &str) -> Option<String> {
    table
        .get(key)
        .and_then(toml::Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

fn apply_forge(table: &toml::Table, metadata: &mut PackageMetadata) {
    let Some(first_mod) = table
        .get("mods")
        .and_then(toml::Value::as_array)
        .and_then(|mods| mods.first())
        .and_then(toml::Value::as_table)
    else {
        return;
    };

    metadata.mod_id = toml_str(first_mod, "modId");
    metadata.mod_name = toml_str(first_mod, "displayName");
    metadata.version = toml_str(first_mod, "version");
    metadata.description = toml_str(first_mod, "description");
    metadata.authors = toml_str(first_mod, "authors");

    let Some(mod_id) = &metadata.mod_id else {
        return;
    };
    metadata.mc_version = table
        .get("dependencies")
        .and_then(|d| d.get(mod_id.as_str()))
        .and_then(toml::Value::as_array)
        .and_then(|deps| {
            deps.iter()
                .filter_map(toml::Value::as_table)
                .find(|dep| toml_str(dep, "modId").as_deref() == Some("minecraft"))
        })
        .and_then(|dep| toml_str(dep, "versionRange"));
}

/// `Implementation-Version` from a jar manifest
fn implementation_version(contents: &str) -> Option<String> {
    for line in contents.lines() {
        // Skip continuation lines (start with space)
        if line.starts_with(' ') {
            continue;
        }

        if let Some(version) = line.trim().strip_prefix("Implementation-Version:") {
            let version = version.trim();
            if !version.is_empty() {
                return Some(version.to_string());
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;
    use zip::CompressionMethod;
    use zip::write::{FileOptions, ZipWriter};

    fn create_jar(path: &Path, entries: &[(&str, &str)]) {
        let file = fs::File::create(path).unwrap();
        let mut zip = ZipWriter::new(file);
        let options = FileOptions::<()>::default().compression_method(CompressionMethod::Stored);
        for (name, contents) in entries {
            zip.start_file(*name, options).unwrap();
            zip.write_all(contents.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }

    #[test]
    fn test_fabric_descriptor() {
        let temp = TempDir::new().unwrap();
        let jar = temp.path().join("sodium-fabric-0.5.3.jar");
        create_jar(
            &jar,
            &[(
                "fabric.mod.json",
                r#"{
                    "id": "sodium",
                    "name": "Sodium",
                    "version": "mc1.20.1-0.5.3",
                    "description": "Rendering engine",
                    "authors": ["JellySquid", {"name": "IMS"}],
                    "depends": {"minecraft": "1.20.1"}
                }"#,
            )],
        );

        let metadata = extract_metadata(&jar);
        assert_eq!(metadata.mod_id.as_deref(), Some("sodium"));
        assert_eq!(metadata.mod_name.as_deref(), Some("Sodium"));
        assert_eq!(metadata.version.as_deref(), Some("mc1.20.1-0.5.3"));
        assert_eq!(metadata.mc_version.as_deref(), Some("1.20.1"));
        assert_eq!(metadata.mod_loader, Some(ModLoader::Fabric));
        assert_eq!(metadata.authors.as_deref(), Some("JellySquid, IMS"));
        assert_eq!(metadata.file_name, "sodium-fabric-0.5.3.jar");
        assert!(metadata.file_hash.unwrap().starts_with("sha256:"));
        assert!(metadata.file_size > 0);
    }

    #[test]
    fn test_forge_descriptor_with_manifest_version() {
        let temp = TempDir::new().unwrap();
        let jar = temp.path().join("jei.jar");
        create_jar(
            &jar,
            &[
                (
                    "META-INF/mods.toml",
                    r#"
modLoader = "javafml"
loaderVersion = "[47,)"

[[mods]]
modId = "jei"
version = "${file.jarVersion}"
displayName = "Just Enough Items"
authors = "mezz"
description = '''
Item and recipe viewer
'''

[[dependencies.jei]]
modId = "forge"
versionRange = "[47.1.3,)"

[[dependencies.jei]]
modId = "minecraft"
versionRange = "[1.20.1,1.20.2)"
"#,
                ),
                (
                    "META-INF/MANIFEST.MF",
                    "Manifest-Version: 1.0\r\nImplementation-Version: 15.2.0.27\r\n",
                ),
            ],
        );

        let metadata = extract_metadata(&jar);
        assert_eq!(metadata.mod_id.as_deref(), Some("jei"));
        assert_eq!(metadata.mod_name.as_deref(), Some("Just Enough Items"));
        assert_eq!(metadata.version.as_deref(), Some("15.2.0.27"));
        assert_eq!(metadata.mc_version.as_deref(), Some("[1.20.1,1.20.2)"));
        assert_eq!(metadata.mod_loader, Some(ModLoader::Forge));
        assert_eq!(metadata.description.as_deref(), Some("Item and recipe viewer"));
    }

    #[test]
    fn test_quilt_descriptor() {
        let temp = TempDir::new().unwrap();
        let jar = temp.path().join("qsl.jar");
        create_jar(
            &jar,
            &[(
                "quilt.mod.json",
                r#"{
                    "schema_version": 1,
                    "quilt_loader": {
                        "id": "quilted_fabric_api",
                        "version": "7.4.0+0.90.0-1.20.1",
                        "metadata": {
                            "name": "Quilted Fabric API",
                            "contributors": {"The Quilt Project": "Owner"}
                        },
                        "depends": [
                            {"id": "quilt_loader", "versions": ">=0.19.0"},
                            {"id": "minecraft", "versions": ["1.20.1"]}
                        ]
                    }
                }"#,
            )],
        );

        let metadata = extract_metadata(&jar);
        assert_eq!(metadata.mod_id.as_deref(), Some("quilted_fabric_api"));
        assert_eq!(metadata.mod_name.as_deref(), Some("Quilted Fabric API"));
        assert_eq!(metadata.version.as_deref(), Some("7.4.0+0.90.0-1.20.1"));
        assert_eq!(metadata.mc_version.as_deref(), Some("1.20.1"));
        assert_eq!(metadata.authors.as_deref(), Some("The Quilt Project"));
        assert_eq!(metadata.mod_loader, Some(ModLoader::Quilt));
    }

    #[test]
    fn test_descriptor_without_id_uses_file_stem() {
        let temp = TempDir::new().unwrap();
        let jar = temp.path().join("mystery-mod-1.0.jar");
        create_jar(&jar, &[("fabric.mod.json", r#"{"version": "1.0"}"#)]);

        let metadata = extract_metadata(&jar);
        assert_eq!(metadata.mod_id.as_deref(), Some("mystery-mod-1.0"));
        assert_eq!(metadata.mod_name.as_deref(), Some("mystery-mod-1.0"));
        assert_eq!(metadata.version.as_deref(), Some("1.0"));
    }

    #[test]
    fn test_non_mod_and_corrupt_archives_have_no_identity() {
        let temp = TempDir::new().unwrap();

        let plain = temp.path().join("library.jar");
        create_jar(&plain, &[("META-INF/MANIFEST.MF", "Manifest-Version: 1.0\n")]);
        assert!(!is_valid_mod_file(&plain));
        assert_eq!(extract_metadata(&plain).mod_id, None);

        let corrupt = temp.path().join("broken.jar");
        fs::write(&corrupt, b"not a zip file").unwrap();
        assert!(!is_valid_mod_file(&corrupt));
        let metadata = extract_metadata(&corrupt);
        assert_eq!(metadata.mod_id, None);
        assert_eq!(metadata.file_size, 14);

        let bad_json = temp.path().join("bad.jar");
        create_jar(&bad_json, &[("fabric.mod.json", "{ nope")]);
        assert!(is_valid_mod_file(&bad_json));
        assert_eq!(extract_metadata(&bad_json).mod_id, None);
    }

    #[test]
    fn test_find_mod_files_sorted_and_recursive() {
        let temp = TempDir::new().unwrap();
        let nested = temp.path().join("extra");
        fs::create_dir(&nested).unwrap();

        let descriptor = r#"{"id": "x", "version": "1.0"}"#;
        create_jar(&temp.path().join("b.jar"), &[("fabric.mod.json", descriptor)]);
        create_jar(&temp.path().join("a.zip"), &[("fabric.mod.json", descriptor)]);
        create_jar(&nested.join("c.jar"), &[("fabric.mod.json", descriptor)]);
        fs::write(temp.path().join("notes.txt"), "hello").unwrap();

        let flat = find_mod_files(temp.path(), false);
        assert_eq!(flat, vec![temp.path().join("a.zip"), temp.path().join("b.jar")]);

        let all = find_mod_files(temp.path(), true);
        assert_eq!(all.len(), 3);
        assert!(all.contains(&nested.join("c.jar")));
    }

    #[test]
    fn test_implementation_version() {
        let manifest = "Manifest-Version: 1.0\nSpecification-Version: 2\nImplementation-Version: 1.4.2-beta\n";
        assert_eq!(implementation_version(manifest).as_deref(), Some("1.4.2-beta"));
        assert_eq!(implementation_version("Manifest-Version: 1.0\n"), None);
    }
}
