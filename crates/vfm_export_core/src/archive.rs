use std::fs;
use std::io;
use std::path::Path;

use tracing::debug;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::artifact::{ArchiveArtifact, ArtifactKind, ShapefileArtifacts};
use crate::contract::ARCHIVE_MEMBER_BASE_NAME;
use crate::error::ExportError;

pub fn archive_member_name(kind: ArtifactKind) -> String {
    format!("{ARCHIVE_MEMBER_BASE_NAME}.{}", kind.extension())
}

/// Zips the `.shp`, `.shx` and `.dbf` parts into `zip_path`.
///
/// Members are always named `output.<ext>` whatever the source file names
/// are. An existing file at `zip_path` is overwritten.
pub fn archive_shapefile(
    artifacts: &ShapefileArtifacts,
    zip_path: &Path,
) -> Result<ArchiveArtifact, ExportError> {
    for kind in ArtifactKind::ALL {
        let source = artifacts.path(kind);
        if !source.is_file() {
            return Err(ExportError::archive(format!(
                "missing shapefile part '{}'",
                source.display()
            )));
        }
    }

    let file = fs::File::create(zip_path).map_err(|error| {
        ExportError::archive(format!(
            "failed to create archive '{}': {error}",
            zip_path.display()
        ))
    })?;
    let mut zip = ZipWriter::new(file);
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut entries = Vec::with_capacity(ArtifactKind::ALL.len());
    for kind in ArtifactKind::ALL {
        let source = artifacts.path(kind);
        let member = archive_member_name(kind);
        let mut reader = fs::File::open(&source).map_err(|error| {
            ExportError::archive(format!("failed to open '{}': {error}", source.display()))
        })?;

        zip.start_file(member.as_str(), options)
            .map_err(|error| ExportError::archive(format!("failed to start {member}: {error}")))?;
        io::copy(&mut reader, &mut zip)
            .map_err(|error| ExportError::archive(format!("failed to write {member}: {error}")))?;
        entries.push(member);
    }

    zip.finish()
        .map_err(|error| ExportError::archive(format!("failed to finish archive: {error}")))?;

    let size_bytes = fs::metadata(zip_path)
        .map_err(|error| ExportError::archive(format!("failed to stat archive: {error}")))?
        .len();

    debug!(
        zip_path = %zip_path.display(),
        size_bytes,
        "shapefile archive written"
    );
    Ok(ArchiveArtifact {
        path: zip_path.to_path_buf(),
        size_bytes,
        entries,
    })
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use super::*;

    fn write_parts(dir: &Path, base_name: &str) -> ShapefileArtifacts {
        let artifacts = ShapefileArtifacts::new(dir.join(base_name), 0);
        for kind in ArtifactKind::ALL {
            fs::write(artifacts.path(kind), format!("{}-bytes", kind.extension()))
                .expect("write part");
        }
        artifacts
    }

    #[test]
    fn renames_members_to_fixed_base_name() {
        let dir = tempfile::tempdir().expect("tempdir");
        let artifacts = write_parts(dir.path(), "invocation-42");
        let zip_path = dir.path().join("bundle.zip");

        let archive = archive_shapefile(&artifacts, &zip_path).expect("archive");
        assert_eq!(archive.entries, vec!["output.shp", "output.shx", "output.dbf"]);
        assert!(archive.size_bytes > 0);

        let mut zip = zip::ZipArchive::new(fs::File::open(&zip_path).expect("open zip"))
            .expect("read zip");
        assert_eq!(zip.len(), 3);
        let mut contents = String::new();
        zip.by_name("output.dbf")
            .expect("dbf member")
            .read_to_string(&mut contents)
            .expect("read member");
        assert_eq!(contents, "dbf-bytes");
    }

    #[test]
    fn overwrites_existing_archive() {
        let dir = tempfile::tempdir().expect("tempdir");
        let artifacts = write_parts(dir.path(), "output");
        let zip_path = dir.path().join("output.zip");
        fs::write(&zip_path, b"stale data that is not a zip").expect("seed stale file");

        archive_shapefile(&artifacts, &zip_path).expect("archive");

        let zip = zip::ZipArchive::new(fs::File::open(&zip_path).expect("open zip"))
            .expect("stale file should be replaced by a valid zip");
        assert_eq!(zip.len(), 3);
    }

    #[test]
    fn missing_part_is_an_archive_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let artifacts = write_parts(dir.path(), "output");
        fs::remove_file(artifacts.path(ArtifactKind::Shx)).expect("remove shx");

        let error = archive_shapefile(&artifacts, &dir.path().join("output.zip"))
            .expect_err("missing shx should fail");

        assert!(matches!(error, ExportError::ArchiveError(_)));
        assert!(error.to_string().contains("output.shx"));
    }
}
