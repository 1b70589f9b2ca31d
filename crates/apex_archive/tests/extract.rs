use std::fs;
use std::path::Path;

use apex_archive::{
    pack::{build_archive, build_from_manifest, unwrap_archive, MemberSource},
    CompressionMethod, CreateOptions, ExtractOptions, Manifest, SarcFormat, SmallArchive,
};
use miette::{IntoDiagnostic, Result};
use tracing_test::traced_test;
use walkdir::WalkDir;

fn write_tree(root: &Path) -> Result<()> {
    fs::create_dir_all(root.join("gfx/ui")).into_diagnostic()?;
    fs::create_dir_all(root.join("models")).into_diagnostic()?;
    fs::write(root.join("gfx/ui/icon.ddsc"), b"icon data").into_diagnostic()?;
    fs::write(root.join("models/crate.modelc"), vec![3u8; 40]).into_diagnostic()?;
    fs::write(root.join("models/crate.toc"), b"ignored").into_diagnostic()?;
    Ok(())
}

fn members(root: &Path) -> Vec<MemberSource> {
    ["gfx/ui/icon.ddsc", "models/crate.modelc", "models/crate.toc"]
        .into_iter()
        .map(|name| MemberSource {
            name: name.into(),
            path: root.join(name),
            external: false,
        })
        .collect()
}

fn relative_files(root: &Path) -> Vec<String> {
    let mut files = WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| {
            e.path()
                .strip_prefix(root)
                .ok()
                .map(|p| p.to_string_lossy().replace('\\', "/"))
        })
        .collect::<Vec<_>>();
    files.sort();
    files
}

#[test]
#[traced_test]
fn extract_recreates_tree_and_manifest() -> Result<()> {
    let source = tempfile::tempdir().into_diagnostic()?;
    let output = tempfile::tempdir().into_diagnostic()?;
    write_tree(source.path())?;

    let options = CreateOptions::builder()
        .compression(CompressionMethod::Aaf)
        .ignore_extensions(vec![".toc".into()])
        .build();

    let wrapped = build_archive(3, &members(source.path()), &options)?;
    let (data, compression) = unwrap_archive(wrapped)?;
    assert_eq!(compression, CompressionMethod::Aaf);

    let archive = SmallArchive::from_bytes(&data)?;
    assert_eq!(archive.files().len(), 2);

    let manifest_path = output.path().join("archive.sarc.toc");
    let extracted = archive.extract_files(
        &data,
        &ExtractOptions::builder()
            .output_dir(output.path())
            .manifest_path(&manifest_path)
            .compression(compression)
            .build(),
    )?;
    assert_eq!(extracted, 2);

    assert_eq!(
        relative_files(output.path()),
        vec!["archive.sarc.toc", "gfx/ui/icon.ddsc", "models/crate.modelc"]
    );
    assert_eq!(
        fs::read(output.path().join("gfx/ui/icon.ddsc")).into_diagnostic()?,
        b"icon data"
    );
    assert_eq!(
        fs::read_to_string(&manifest_path).into_diagnostic()?,
        "TOCL3A\ngfx/ui/icon.ddsc\nmodels/crate.modelc\n"
    );

    Ok(())
}

#[test]
#[traced_test]
fn manifest_rebuilds_archive() -> Result<()> {
    let dir = tempfile::tempdir().into_diagnostic()?;
    write_tree(dir.path())?;

    let manifest_path = dir.path().join("pack.sarc.toc");
    fs::write(
        &manifest_path,
        "TOCL2C\ngfx/ui/icon.ddsc\nmodels/crate.modelc E\n",
    )
    .into_diagnostic()?;

    let archive_path = build_from_manifest(&manifest_path, &CreateOptions::builder().build())?;
    assert_eq!(archive_path, dir.path().join("pack.sarc"));

    let (data, compression) = unwrap_archive(fs::read(&archive_path).into_diagnostic()?)?;
    assert_eq!(compression, CompressionMethod::Zlib);

    let archive = SmallArchive::from_bytes(&data)?;
    assert_eq!(archive.version(), 2);

    let files = archive.files();
    assert_eq!(files.len(), 2);
    assert_eq!(files[0].name, "gfx/ui/icon.ddsc");
    assert!(!files[0].external);
    assert_eq!(files[1].name, "models/crate.modelc");
    assert!(files[1].external);
    assert_eq!(files[1].length, 40);

    let manifest = Manifest::from_files(archive.version(), compression, files);
    assert_eq!(
        manifest.to_string(),
        fs::read_to_string(&manifest_path).into_diagnostic()?
    );

    Ok(())
}

#[test]
fn missing_members_are_skipped() -> Result<()> {
    let dir = tempfile::tempdir().into_diagnostic()?;
    fs::write(dir.path().join("present.bin"), b"1234").into_diagnostic()?;

    let members = ["present.bin", "absent.bin"]
        .into_iter()
        .map(|name| MemberSource {
            name: name.into(),
            path: dir.path().join(name),
            external: false,
        })
        .collect::<Vec<_>>();

    let data = build_archive(2, &members, &CreateOptions::builder().build())?;
    let archive = SmallArchive::from_bytes(&data)?;

    assert_eq!(archive.files().len(), 1);
    assert_eq!(archive.files()[0].name, "present.bin");

    Ok(())
}
