//! Reads files through a checked-in generated module
//!
//! `tests/fixtures/assets_vfsdata.rs` is the emitter's output for
//! [`fixture_input`]. Including it here means the generated code has to
//! compile against the current runtime, and the regeneration test keeps
//! the file in step with the emitter.

use ::embedfs::*;
use std::io::{Read, Seek, SeekFrom};

include!("../fixtures/assets_vfsdata.rs");

const FIXTURE: &str = include_str!("../fixtures/assets_vfsdata.rs");

fn sample_text() -> String {
    format!("This file compresses well. Bl{}h.", "a".repeat(141))
}

/// The tree the fixture was generated from
pub fn fixture_input() -> MemoryFs {
    MemoryFs::new()
        .with_modified(Timestamp::new(1_500_000_000, 0))
        .file("/folder/a.txt", "Stuff in /folder/a.txt.")
        .file("/folder/b.txt", "Stuff in /folder/b.txt.")
        .file("/sample-file.txt", sample_text())
        .dir("/empty")
}

/// Whether a line holds gzip bytes, which depend on the deflate backend
fn is_gzip_const(line: &str) -> bool {
    line.trim_start().starts_with("const ") && line.contains("b\"\\x1f\\x8b")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_file_through_generated_module() {
        let mut file = assets::ASSETS.open("/folder/a.txt").unwrap();
        assert!(!file.is_compressed());
        let mut text = String::new();
        file.read_to_string(&mut text).unwrap();
        assert_eq!(text, "Stuff in /folder/a.txt.");

        let meta = assets::ASSETS.metadata("/folder/b.txt").unwrap();
        assert_eq!(meta.name(), "b.txt");
        assert_eq!(meta.len(), 23);
        assert_eq!(meta.modified(), Timestamp::new(1_500_000_000, 0));
    }

    #[test]
    fn test_compressed_file_through_generated_module() {
        let expected = sample_text();
        let mut file = assets::ASSETS.open("/sample-file.txt").unwrap();
        assert!(file.is_compressed());
        assert_eq!(file.metadata().len(), expected.len() as u64);

        let mut whole = String::new();
        file.read_to_string(&mut whole).unwrap();
        assert_eq!(whole, expected);

        file.seek(SeekFrom::Start(27)).unwrap();
        let mut word = [0u8; 4];
        file.read_exact(&mut word).unwrap();
        assert_eq!(&word, b"Blaa");

        file.seek(SeekFrom::End(-2)).unwrap();
        let mut tail = String::new();
        file.read_to_string(&mut tail).unwrap();
        assert_eq!(tail, "h.");
    }

    #[test]
    fn test_directories_through_generated_module() {
        let paths: Vec<&str> = assets::ASSETS.walk().map(|(p, _)| p).collect();
        assert_eq!(
            paths,
            vec!["/", "/empty", "/folder", "/folder/a.txt", "/folder/b.txt", "/sample-file.txt"]
        );

        let empty = assets::ASSETS.metadata("/empty").unwrap();
        assert!(empty.is_dir());
        assert!(assets::ASSETS.read("/folder").unwrap_err().to_string().contains("/folder"));
        assert!(assets::ASSETS.open("/missing.txt").unwrap_err().is_not_found());
        assert!(assets::ASSETS.has_compressed_files());
        assert!(assets::ASSETS.has_raw_files());
    }

    #[test]
    fn test_handles_outlive_the_caller() {
        fn open_static(path: &str) -> Handle<'static> {
            assets::ASSETS.open(path).unwrap()
        }
        let handle = std::thread::spawn(|| {
            let mut content = Vec::new();
            open_static("/folder/b.txt").read_to_end(&mut content).unwrap();
            content
        });
        assert_eq!(handle.join().unwrap(), b"Stuff in /folder/b.txt.");
    }

    #[test]
    fn test_fixture_matches_emitter() {
        let compiler = CompilerBuilder::new().build().unwrap();
        let (artifact, _) = compiler.build_artifact(&fixture_input(), "/").unwrap();
        let source = emit::to_rust_source(&artifact, compiler.emit_options()).unwrap();

        let expected: Vec<&str> = FIXTURE.lines().collect();
        let actual: Vec<&str> = source.lines().collect();
        assert_eq!(actual.len(), expected.len());
        for (actual, expected) in actual.iter().zip(&expected) {
            if is_gzip_const(expected) {
                let (name, _) = expected.split_once("b\"").unwrap();
                assert!(actual.starts_with(name), "{} does not declare {}", actual, name);
                assert!(is_gzip_const(actual));
            } else {
                assert_eq!(actual, expected);
            }
        }

        // The gzip lines are only checked for what they decode to
        let regenerated = artifact.filesystem();
        for (entry_path, meta) in assets::ASSETS.walk() {
            let other = regenerated.metadata(entry_path).unwrap();
            assert_eq!(other.len(), meta.len(), "{}", entry_path);
            assert_eq!(other.modified(), meta.modified(), "{}", entry_path);
            if meta.is_file() {
                assert_eq!(
                    regenerated.read(entry_path).unwrap(),
                    assets::ASSETS.read(entry_path).unwrap(),
                    "{}",
                    entry_path
                );
                assert_eq!(
                    regenerated.open(entry_path).unwrap().is_compressed(),
                    assets::ASSETS.open(entry_path).unwrap().is_compressed()
                );
            }
        }
    }
}
