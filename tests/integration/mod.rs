//! Integration tests for embedfs
//!
//! Compiles real directories on disk and reads the results back through the
//! embedded runtime.

use ::embedfs::*;
use filetime::FileTime;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fs;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use tempfile::TempDir;

mod generated;

/// A source tree on disk plus a directory for outputs
pub struct TestTree {
    pub input: TempDir,
    pub output: TempDir,
}

impl TestTree {
    pub fn new() -> Self {
        Self {
            input: TempDir::new().unwrap(),
            output: TempDir::new().unwrap(),
        }
    }

    /// Write a file, creating parent directories
    pub fn write(&self, relative: &str, content: impl AsRef<[u8]>) {
        let path = self.input.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    /// Compile the tree as a bundle and decode it again
    pub fn compile_bundle(&self, builder: CompilerBuilder) -> (Artifact, CompileReport) {
        let compiler = builder.output_format(OutputFormat::Bundle).build().unwrap();
        let output = self.output.path().join("assets.bin");
        let report = compiler.compile_dir(self.input.path(), &output).unwrap();
        let artifact = Artifact::from_bundle(&fs::read(&output).unwrap()).unwrap();
        (artifact, report)
    }
}

/// Deterministic high-entropy bytes
pub fn random_bytes(len: usize, seed: u64) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut data = vec![0u8; len];
    rng.fill(&mut data[..]);
    data
}

fn pin_mtime(path: &Path, secs: i64) {
    filetime::set_file_mtime(path, FileTime::from_unix_time(secs, 0)).unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_sizes() {
        let tree = TestTree::new();
        let big_text = "All work and no play makes a dull embedded file.\n".repeat(60_000);
        let big_random = random_bytes(3 * 1024 * 1024, 7);
        tree.write("empty.txt", "");
        tree.write("one.bin", [0x2au8]);
        tree.write("big.txt", &big_text);
        tree.write("big-random.bin", &big_random);

        let (artifact, report) = tree.compile_bundle(CompilerBuilder::new());
        assert_eq!(report.files, 4);
        assert_eq!(report.skipped, 0);

        let fs = artifact.filesystem();
        assert_eq!(fs.read("/empty.txt").unwrap(), b"");
        assert_eq!(fs.read("/one.bin").unwrap(), vec![0x2a]);
        assert_eq!(fs.read("/big.txt").unwrap(), big_text.as_bytes());
        assert_eq!(fs.read("/big-random.bin").unwrap(), big_random);

        assert!(fs.open("/big.txt").unwrap().is_compressed());
        assert!(!fs.open("/big-random.bin").unwrap().is_compressed());
        assert!(!fs.open("/empty.txt").unwrap().is_compressed());
    }

    #[test]
    fn test_compressed_payload_is_smaller() {
        let tree = TestTree::new();
        tree.write("text.txt", "abcabcabc".repeat(1000));
        tree.write("noise.bin", random_bytes(4096, 1));
        let (artifact, report) = tree.compile_bundle(CompilerBuilder::new());

        for descriptor in artifact.entries.values() {
            if let Descriptor::CompressedFile {
                compressed_content,
                uncompressed_size,
                ..
            } = descriptor
            {
                assert!((compressed_content.len() as u64) < *uncompressed_size);
            }
        }
        assert_eq!(report.compression.files_compressed, 1);
        assert_eq!(report.compression.files_stored_raw, 1);
        assert!(report.compression.bytes_saved > 0);
    }

    #[test]
    fn test_directory_ordering() {
        let tree = TestTree::new();
        tree.write("folder/b.txt", "Stuff in /folder/b.txt.");
        tree.write("folder/a.txt", "Stuff in /folder/a.txt.");
        tree.write("z.txt", "z");
        tree.write("another-folder/c.txt", "c");
        fs::create_dir(tree.input.path().join("empty-folder")).unwrap();

        let (artifact, _) = tree.compile_bundle(CompilerBuilder::new());
        let fs = artifact.filesystem();

        let names = |path: &str| -> Vec<String> {
            fs.open(path)
                .unwrap()
                .read_dir(None)
                .unwrap()
                .iter()
                .map(|m| m.name().to_string())
                .collect()
        };
        assert_eq!(names("/folder"), vec!["a.txt", "b.txt"]);
        assert_eq!(names("/"), vec!["another-folder", "empty-folder", "folder", "z.txt"]);
        assert!(names("/empty-folder").is_empty());
    }

    #[test]
    fn test_modification_times_preserved() {
        let tree = TestTree::new();
        tree.write("folder/a.txt", "Stuff.");
        pin_mtime(&tree.input.path().join("folder/a.txt"), 1_000_000_000);
        pin_mtime(&tree.input.path().join("folder"), 1_100_000_000);

        let (artifact, _) = tree.compile_bundle(CompilerBuilder::new());
        let fs = artifact.filesystem();
        assert_eq!(fs.metadata("/folder/a.txt").unwrap().modified(), Timestamp::new(1_000_000_000, 0));
        assert_eq!(fs.metadata("/folder").unwrap().modified(), Timestamp::new(1_100_000_000, 0));
        assert_eq!(
            fs.metadata("/folder/a.txt").unwrap().modified_at().unwrap().timestamp(),
            1_000_000_000
        );
    }

    #[test]
    fn test_not_found() {
        let tree = TestTree::new();
        tree.write("a.txt", "a");
        let (artifact, _) = tree.compile_bundle(CompilerBuilder::new());
        let fs = artifact.filesystem();
        assert!(fs.metadata("/does-not-exist.txt").unwrap_err().is_not_found());
        assert!(fs.open("/a.txt/child").unwrap_err().is_not_found());

        let input = OsFs::new(tree.input.path());
        assert_eq!(
            input.metadata("/does-not-exist.txt").unwrap_err().kind(),
            std::io::ErrorKind::NotFound
        );
    }

    #[test]
    fn test_generated_source_is_deterministic() {
        let tree = TestTree::new();
        tree.write("folder/a.txt", "Stuff.");
        tree.write("sample-file.txt", "This file compresses well. ".repeat(20));
        tree.write("noise.bin", random_bytes(256, 3));

        let first = tree.output.path().join("first.rs");
        let second = tree.output.path().join("second.rs");
        CompilerBuilder::new()
            .parallel_workers(1)
            .build()
            .unwrap()
            .compile_dir(tree.input.path(), &first)
            .unwrap();
        CompilerBuilder::new()
            .parallel_workers(4)
            .build()
            .unwrap()
            .compile_dir(tree.input.path(), &second)
            .unwrap();

        let first = fs::read(first).unwrap();
        assert_eq!(first, fs::read(second).unwrap());
        let source = String::from_utf8(first).unwrap();
        assert!(source.starts_with(emit::GENERATED_MARKER));
        assert!(source.contains("use ::embedfs::vfs::{CompressedFile, Directory, EmbeddedFs, Entry, RawFile, Timestamp};"));
    }

    #[test]
    fn test_output_is_replaced_atomically() {
        let tree = TestTree::new();
        tree.write("a.txt", "first");
        let output = tree.output.path().join("assets.bin");
        let compiler = CompilerBuilder::new().output_format(OutputFormat::Bundle).build().unwrap();

        compiler.compile_dir(tree.input.path(), &output).unwrap();
        tree.write("a.txt", "second");
        compiler.compile_dir(tree.input.path(), &output).unwrap();

        let artifact = Artifact::from_bundle(&fs::read(&output).unwrap()).unwrap();
        assert_eq!(artifact.filesystem().read("/a.txt").unwrap(), b"second");
        let leftovers = fs::read_dir(tree.output.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn test_seek_in_large_compressed_file() {
        let tree = TestTree::new();
        let content: Vec<u8> = (0..2_000_000u32).map(|i| (i % 251) as u8).collect();
        tree.write("pattern.bin", &content);
        let (artifact, _) = tree.compile_bundle(CompilerBuilder::new());
        let fs = artifact.filesystem();
        let mut handle = fs.open("/pattern.bin").unwrap();
        assert!(handle.is_compressed());

        let mut buf = [0u8; 16];
        for offset in [1_500_000u64, 10, 1_999_990, 0, 750_123] {
            handle.seek(SeekFrom::Start(offset)).unwrap();
            let n = handle.read(&mut buf).unwrap();
            assert!(n > 0);
            assert_eq!(&buf[..n], &content[offset as usize..offset as usize + n]);
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_policy_on_disk() {
        let tree = TestTree::new();
        tree.write("target.txt", "target");
        tree.write("dir/inner.txt", "inner");
        std::os::unix::fs::symlink(tree.input.path().join("target.txt"), tree.input.path().join("link.txt")).unwrap();
        std::os::unix::fs::symlink(tree.input.path().join("dir"), tree.input.path().join("dir-link")).unwrap();

        let (skipping, report) = tree.compile_bundle(CompilerBuilder::new());
        assert!(!skipping.entries.contains_key("/link.txt"));
        assert!(!skipping.entries.contains_key("/dir-link"));
        assert_eq!(report.skipped, 2);

        let (following, _) = tree.compile_bundle(CompilerBuilder::new().follow_symlinks(true));
        assert_eq!(following.filesystem().read("/link.txt").unwrap(), b"target");
        assert!(!following.entries.contains_key("/dir-link"));
    }
}
