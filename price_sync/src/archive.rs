//! ZIP container handling for uploads and exports
//!
//! Both directions work on in-memory buffers. Uploads are bounded by the
//! multipart body limit and the extracted CSV by [`MAX_CSV_BYTES`].

use std::io::{Cursor, Read, Write};

use zip::write::SimpleFileOptions;
use zip::result::ZipError;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::{PriceError, Result};

/// Entry names accepted as the price list inside an uploaded archive
pub const CSV_ENTRY_NAMES: [&str; 2] = ["data.csv", "sample_data/data.csv"];

/// Name of the single entry written into exported archives
pub const EXPORT_ENTRY_NAME: &str = "data.csv";

/// Largest decompressed CSV accepted from an upload (ten default uploads)
pub const MAX_CSV_BYTES: u64 = 100 << 20;

/// Return the bytes of the first `data.csv` or `sample_data/data.csv` entry.
///
/// Entries are visited in central-directory order and the first exact name
/// match wins.
pub fn extract_csv(archive_bytes: &[u8]) -> Result<Vec<u8>> {
    extract_csv_with_limit(archive_bytes, MAX_CSV_BYTES)
}

/// Like [`extract_csv`], failing with [`PriceError::CsvTooLarge`] once the
/// entry inflates past `max_bytes`. The declared entry size is not trusted.
pub fn extract_csv_with_limit(archive_bytes: &[u8], max_bytes: u64) -> Result<Vec<u8>> {
    let mut archive = ZipArchive::new(Cursor::new(archive_bytes))?;
    log::debug!("Opened archive with {} entries", archive.len());

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        if !CSV_ENTRY_NAMES.contains(&entry.name()) {
            continue;
        }

        log::debug!("Found CSV entry '{}' ({} bytes)", entry.name(), entry.size());
        if entry.size() > max_bytes {
            return Err(PriceError::CsvTooLarge(max_bytes));
        }

        let mut content = Vec::new();
        // a truncated or corrupt deflate stream is an archive problem, not an I/O one
        entry
            .by_ref()
            .take(max_bytes + 1)
            .read_to_end(&mut content)
            .map_err(|e| PriceError::CorruptArchive(ZipError::Io(e)))?;
        if content.len() as u64 > max_bytes {
            return Err(PriceError::CsvTooLarge(max_bytes));
        }
        return Ok(content);
    }

    Err(PriceError::CsvEntryNotFound)
}

/// Wrap `content` as the single entry `entry_name` of a deflated ZIP archive
pub fn build_archive(entry_name: &str, content: &[u8]) -> Result<Vec<u8>> {
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut zip = ZipWriter::new(&mut cursor);
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        zip.start_file(entry_name, options)
            .map_err(PriceError::ArchiveWrite)?;
        zip.write_all(content)?;
        zip.finish().map_err(PriceError::ArchiveWrite)?;
    }
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zip_with(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut zip = ZipWriter::new(&mut cursor);
            for (name, body) in entries {
                zip.start_file(*name, SimpleFileOptions::default()).unwrap();
                zip.write_all(body.as_bytes()).unwrap();
            }
            zip.finish().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn extracts_top_level_data_csv() {
        let bytes = zip_with(&[("readme.txt", "hi"), ("data.csv", "1,a,b,1.00,2024-01-01\n")]);
        let csv = extract_csv(&bytes).unwrap();
        assert_eq!(csv, b"1,a,b,1.00,2024-01-01\n");
    }

    #[test]
    fn extracts_nested_sample_data_csv() {
        let bytes = zip_with(&[("sample_data/data.csv", "x")]);
        assert_eq!(extract_csv(&bytes).unwrap(), b"x");
    }

    #[test]
    fn first_matching_entry_wins() {
        let bytes = zip_with(&[("sample_data/data.csv", "first"), ("data.csv", "second")]);
        assert_eq!(extract_csv(&bytes).unwrap(), b"first");
    }

    #[test]
    fn similar_names_do_not_match() {
        let bytes = zip_with(&[("other/data.csv", "x"), ("data.csv.bak", "y"), ("DATA.CSV", "z")]);
        assert!(matches!(extract_csv(&bytes), Err(PriceError::CsvEntryNotFound)));
    }

    #[test]
    fn non_zip_bytes_are_corrupt_archive() {
        let result = extract_csv(b"definitely not a zip file");
        assert!(matches!(result, Err(PriceError::CorruptArchive(_))));
    }

    #[test]
    fn empty_buffer_is_corrupt_archive() {
        assert!(matches!(extract_csv(&[]), Err(PriceError::CorruptArchive(_))));
    }

    #[test]
    fn entry_at_limit_is_accepted() {
        let bytes = build_archive("data.csv", &[b'0'; 64]).unwrap();
        assert_eq!(extract_csv_with_limit(&bytes, 64).unwrap().len(), 64);
    }

    #[test]
    fn highly_compressed_entry_over_limit_is_rejected() {
        // one MiB of zeros deflates to about a kilobyte
        let bytes = build_archive("data.csv", &vec![b'0'; 1 << 20]).unwrap();
        assert!(bytes.len() < 16 * 1024);

        let result = extract_csv_with_limit(&bytes, 64 * 1024);
        assert!(matches!(result, Err(PriceError::CsvTooLarge(limit)) if limit == 64 * 1024));
    }

    #[test]
    fn built_archive_holds_single_entry() {
        let bytes = build_archive(EXPORT_ENTRY_NAME, b"1,Widget,Tools,9.99,2024-01-15\n").unwrap();

        let mut archive = ZipArchive::new(Cursor::new(bytes.as_slice())).unwrap();
        assert_eq!(archive.len(), 1);
        let mut entry = archive.by_index(0).unwrap();
        assert_eq!(entry.name(), "data.csv");
        assert_eq!(entry.compression(), CompressionMethod::Deflated);

        let mut content = String::new();
        entry.read_to_string(&mut content).unwrap();
        assert_eq!(content, "1,Widget,Tools,9.99,2024-01-15\n");
    }

    #[test]
    fn built_archive_can_be_extracted_again() {
        let bytes = build_archive(EXPORT_ENTRY_NAME, b"").unwrap();
        assert_eq!(extract_csv(&bytes).unwrap(), b"");
    }
}
