use std::io::Cursor;

use apex_archive::{
    aaf::{AafContainer, AafWriterOptions},
    error::Error,
    FileEntry, SarcFormat, SmallArchive,
};
use miette::Result;
use tracing::info;
use tracing_test::traced_test;

fn member_data(file: &FileEntry) -> apex_archive::error::Result<Vec<u8>> {
    Ok((0..file.length).map(|i| (i % 251) as u8 ^ file.name.len() as u8).collect())
}

fn sample_archive(version: u32) -> Result<SmallArchive> {
    let mut archive = SmallArchive::new(version)?;
    archive.add_file_entry("gfx/ui/icon.ddsc", 17, false);
    archive.add_file_entry("a", 1, false);
    archive.add_file_entry("shared\\external.bin", 300, true);
    archive.add_file_entry("models/empty.modelc", 0, false);
    archive.add_file_entry("models/exact.bin", 32, false);
    archive.add_file_entry("editor/entities/large.blo", 4099, false);

    Ok(archive)
}

#[test]
#[traced_test]
fn sarc_round_trip() -> Result<()> {
    for version in [2, 3] {
        let archive = sample_archive(version)?;
        let data = archive.to_bytes(member_data)?;

        let loaded = SmallArchive::from_bytes(&data)?;
        assert_eq!(loaded.version(), version);
        assert_eq!(loaded.files().len(), archive.files().len());

        for (expected, actual) in archive.files().iter().zip(loaded.files()) {
            info!("checking {}", actual.name);
            assert_eq!(expected.name, actual.name);
            assert_eq!(expected.length, actual.length);
            assert_eq!(expected.external, actual.external);

            if actual.external {
                continue;
            }

            let start = actual.offset as usize;
            let payload = &data[start..start + actual.length as usize];
            assert_eq!(payload, member_data(actual)?.as_slice());
        }
    }

    Ok(())
}

#[test]
fn sarc_v2_data_is_aligned() -> Result<()> {
    let data = sample_archive(2)?.to_bytes(member_data)?;
    let loaded = SmallArchive::from_bytes(&data)?;

    let offsets = loaded
        .files()
        .iter()
        .filter(|f| !f.external)
        .map(|f| f.offset)
        .collect::<Vec<_>>();

    assert!(offsets.len() > 1);
    for offset in offsets {
        assert_eq!(offset % 16, 0, "offset {offset:#x} is not aligned");
    }

    assert_eq!(data.len() % 16, 0);

    Ok(())
}

#[test]
#[traced_test]
fn aaf_round_trip_sizes() -> Result<()> {
    let ceiling = 1024u32;
    let options = AafWriterOptions::builder().block_size(ceiling).build();
    let c = ceiling as usize;

    for size in [0, 1, c - 1, c, c + 1, 3 * c] {
        let payload = (0..size).map(|i| (i * 7 % 256) as u8).collect::<Vec<_>>();

        let mut output = Cursor::new(Vec::new());
        AafContainer::compress(&payload, &options)?.write(&mut output)?;
        output.set_position(0);

        let container = AafContainer::read(&mut output)?;
        assert_eq!(container.header.block_count as usize, size.div_ceil(c));
        assert_eq!(container.header.uncompressed_size as usize, size);

        for block in &container.blocks[..container.blocks.len().saturating_sub(1)] {
            assert_eq!(block.header.uncompressed_size, ceiling);
        }

        assert_eq!(container.decompress()?, payload, "size {size}");
    }

    Ok(())
}

#[test]
fn aaf_blocks_are_found_by_delta() -> Result<()> {
    let options = AafWriterOptions::builder().block_size(100).build();
    let payload = b"0123456789".repeat(35);

    let mut output = Cursor::new(Vec::new());
    AafContainer::compress(&payload, &options)?.write(&mut output)?;

    let data = output.into_inner();
    let mut position = 48usize;
    for _ in 0..4 {
        assert_eq!(&data[position + 12..position + 16], b"EWAM");
        let delta = u32::from_le_bytes([
            data[position + 8],
            data[position + 9],
            data[position + 10],
            data[position + 11],
        ]);
        assert_eq!(delta % 4, 0);
        position += delta as usize;
    }

    assert_eq!(position, data.len());

    Ok(())
}

#[test]
fn truncated_archive() -> Result<()> {
    let data = sample_archive(3)?.to_bytes(member_data)?;

    let result = SmallArchive::from_bytes(&data[..30]);
    assert!(matches!(result, Err(Error::Truncated)));

    Ok(())
}
