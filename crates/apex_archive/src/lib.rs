//! This library handles reading from and creating the **SARC**, **AAF** and **GTOC** files used by
//! games built on the *Apex* engine.
//!
//! # SARC Archive Format Documentation
//!
//! A SARC archive is a small, uncompressed container. It starts with a header, followed by a table of
//! contents, followed by the member data. Every member starts on a 16 byte boundary.
//!
//! ## Version 2
//!
//! | Offset (bytes) | Field                  | Description                                                |
//! |----------------|------------------------|------------------------------------------------------------|
//! | 0x0000         | Header length          | 4 bytes: Fixed value 0x00000004                            |
//! | 0x0004         | Magic number           | 4 bytes: "SARC"                                            |
//! | 0x0008         | Version                | 4 bytes: 2 (older revisions read the same)                 |
//! | 0x000C         | TOC size               | 4 bytes: Size of the table of contents, padding included   |
//!
//! Each table entry is:
//!
//! | Offset (bytes) | Field                  | Description                                             |
//! |----------------|------------------------|---------------------------------------------------------|
//! | 0x0000         | Name length            | 4 bytes: Name length plus its alignment to 4 bytes      |
//! | 0x0004         | Name                   | Name bytes, zero padded to 4 bytes                      |
//! | ...            | Data offset            | 4 bytes: Offset from the start of the file, 0 = external|
//! | ...            | Data length            | 4 bytes: Size of the member                             |
//!
//! The table ends at `TOC size` or at the first entry with a zero name length.
//!
//! ## Version 3
//!
//! | Offset (bytes) | Field                  | Description                                                |
//! |----------------|------------------------|------------------------------------------------------------|
//! | 0x0000         | Header length          | 4 bytes: Fixed value 0x00000004                            |
//! | 0x0004         | Magic number           | 4 bytes: "SARC"                                            |
//! | 0x0008         | Version                | 4 bytes: 3                                                 |
//! | 0x000C         | Data offset            | 4 bytes: Offset of the first member, end of the table      |
//! | 0x0010         | Name pool length       | 4 bytes: Size of the name pool, padded to 4 bytes          |
//!
//! The name pool (null terminated names) follows the header. Then come 20 byte records until the data
//! offset is reached:
//!
//! | Offset (bytes) | Field                  | Description                                             |
//! |----------------|------------------------|---------------------------------------------------------|
//! | 0x0000         | Name offset            | 4 bytes: Offset of the name inside the pool             |
//! | 0x0004         | Data offset            | 4 bytes: Offset from the start of the file, 0 = external|
//! | 0x0008         | Data length            | 4 bytes: Size of the member                             |
//! | 0x000C         | Name hash              | 4 bytes: Jenkins lookup3 of the name                    |
//! | 0x0010         | Reserved               | 4 bytes: Always 0                                       |
//!
//! # AAF Container
//!
//! Archives are often shipped inside an AAF container which splits the archive into blocks of at most
//! 32 MiB and compresses each of them with raw deflate.
//!
//! | Offset (bytes) | Field                  | Description                                                |
//! |----------------|------------------------|------------------------------------------------------------|
//! | 0x0000         | Magic number           | 4 bytes: "AAF\0"                                           |
//! | 0x0004         | Version                | 4 bytes: 1                                                 |
//! | 0x0008         | Sub tags               | 28 bytes: "AVALANCHEARCHIVEFORMATISCOOL"                   |
//! | 0x0024         | Uncompressed size      | 4 bytes: Size of the wrapped file                          |
//! | 0x0028         | Block size             | 4 bytes: Uncompressed size of every block but the last     |
//! | 0x002C         | Block count            | 4 bytes: Number of EWAM blocks                             |
//!
//! Every block starts with a 16 byte header: compressed size, uncompressed size, distance to the next
//! block header and the tag "EWAM". The deflate stream follows, padded to 4 bytes.
//!
//! An older scheme wraps the whole archive in a single zlib stream instead.
//!
//! # GTOC
//!
//! A GTOC file maps archives (by their first four bytes) to the members they contain, see [`gtoc`].
//!
//! ## Additional Information
//!
//! - **File Extensions**: `.sarc`, `.ee`, `.bl`, `.nl`, `.fl` (and `z` suffixed compressed variants)
//! - **Endianness**: Little-endian for all multi-byte integers
//!

pub mod aaf;
pub mod compression;
pub mod error;
pub mod gtoc;
pub mod hash;
pub mod manifest;
pub mod pack;
pub mod sarc;
pub mod sniff;
pub mod types;

pub use aaf::{AafContainer, AafWriterOptions};
pub use compression::CompressionMethod;
pub use gtoc::ArchiveToc;
pub use manifest::Manifest;
pub use pack::CreateOptions;
pub use sarc::{ExtractOptions, FileEntry, SarcFormat, SmallArchive};
pub use sniff::FileKind;
