use divan::AllocProfiler;

#[global_allocator]
static ALLOC: AllocProfiler = AllocProfiler::system();

fn main() {
    divan::main();
}

fn get_payload() -> Vec<u8> {
    (0..4 * 1024 * 1024u32)
        .map(|i| (i.wrapping_mul(2654435761) >> 24) as u8 & 0x3F)
        .collect()
}

pub mod sarc {
    use apex_archive::{FileEntry, SarcFormat, SmallArchive};
    use divan::Bencher;

    fn get_archive(version: u32) -> Vec<u8> {
        let mut archive = SmallArchive::new(version).unwrap();
        for i in 0..512 {
            archive.add_file_entry(&format!("models/props/prop_{i:04}.modelc"), 4000 + i, false);
        }

        archive
            .to_bytes(|file: &FileEntry| Ok(vec![0xAB; file.length as usize]))
            .unwrap()
    }

    #[divan::bench(args = [2, 3])]
    fn open(bencher: Bencher, version: u32) {
        bencher
            .with_inputs(|| get_archive(version))
            .bench_refs(|data| {
                divan::black_box(SmallArchive::from_bytes(data).unwrap());
            });
    }

    #[divan::bench(args = [2, 3])]
    fn write(bencher: Bencher, version: u32) {
        let archive = SmallArchive::from_bytes(&get_archive(version)).unwrap();

        bencher.bench_local(move || {
            divan::black_box(
                archive
                    .to_bytes(|file: &FileEntry| Ok(vec![0xAB; file.length as usize]))
                    .unwrap(),
            );
        });
    }
}

pub mod aaf {
    use std::io::Cursor;

    use apex_archive::{AafContainer, AafWriterOptions};
    use divan::Bencher;

    #[divan::bench(sample_count = 5)]
    fn compress(bencher: Bencher) {
        let options = AafWriterOptions::builder().block_size(1024 * 1024).build();

        bencher
            .with_inputs(super::get_payload)
            .bench_refs(|data| {
                divan::black_box(AafContainer::compress(data, &options).unwrap());
            });
    }

    #[divan::bench(sample_count = 5)]
    fn decompress(bencher: Bencher) {
        let options = AafWriterOptions::builder().block_size(1024 * 1024).build();
        let mut output = Cursor::new(Vec::new());
        AafContainer::compress(&super::get_payload(), &options)
            .unwrap()
            .write(&mut output)
            .unwrap();
        let data = output.into_inner();

        bencher.bench_local(move || {
            let container = AafContainer::read(&mut Cursor::new(&data)).unwrap();
            divan::black_box(container.decompress().unwrap());
        });
    }
}
