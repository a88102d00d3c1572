//! Main test module for embedfs
//!
//! This module includes all test suites:
//! - Integration tests compiling real directories on disk
//! - Property-based tests for round-trip and seek invariants
//! - Edge cases below

pub mod integration;
pub mod property;

#[cfg(test)]
mod edge_cases {
    use ::embedfs::*;
    use std::io::{Read, Seek, SeekFrom};

    fn compile(input: &MemoryFs) -> Artifact {
        CompilerBuilder::new()
            .parallel_workers(2)
            .build()
            .unwrap()
            .build_artifact(input, "/")
            .unwrap()
            .0
    }

    #[test]
    fn test_empty_tree_has_root() {
        let artifact = compile(&MemoryFs::new());
        assert!(!artifact.has_compressed_files);
        assert!(!artifact.has_raw_files);

        let fs = artifact.filesystem();
        let mut root = fs.open("/").unwrap();
        assert!(root.metadata().is_dir());
        assert!(root.read_dir(None).unwrap().is_empty());
        assert!(root.read_dir(Some(10)).unwrap().is_empty());
    }

    #[test]
    fn test_empty_file_is_raw() {
        let artifact = compile(&MemoryFs::new().file("/empty.txt", ""));
        let fs = artifact.filesystem();
        let mut handle = fs.open("/empty.txt").unwrap();
        assert!(!handle.is_compressed());
        assert_eq!(handle.metadata().len(), 0);
        let mut buf = Vec::new();
        assert_eq!(handle.read_to_end(&mut buf).unwrap(), 0);
    }

    #[test]
    fn test_single_byte_file() {
        let artifact = compile(&MemoryFs::new().file("/one", [0xffu8]));
        assert_eq!(artifact.filesystem().read("/one").unwrap(), vec![0xff]);
    }

    #[test]
    fn test_special_filenames() {
        let names = [
            "/file with spaces.txt",
            "/file-with-dashes.txt",
            "/quote\"and\\slash.txt",
            "/ünïcödé.txt",
            "/.hidden",
        ];
        let mut input = MemoryFs::new();
        for name in names {
            input = input.file(name, name.as_bytes());
        }
        let artifact = compile(&input);
        let fs = artifact.filesystem();
        for name in names {
            assert_eq!(fs.read(name).unwrap(), name.as_bytes());
        }

        let source = emit::to_rust_source(&artifact, &emit::EmitOptions::default()).unwrap();
        assert!(source.contains("\\\"and\\\\slash.txt"));
    }

    #[test]
    fn test_paths_are_normalized_at_open() {
        let artifact = compile(&MemoryFs::new().file("/folder/a.txt", "Stuff."));
        let fs = artifact.filesystem();
        for path in ["folder/a.txt", "/folder/./a.txt", "//folder//a.txt", "/folder/b/../a.txt"] {
            assert_eq!(fs.read(path).unwrap(), b"Stuff.", "path {}", path);
        }
        assert_eq!(fs.open("/folder/").unwrap().path(), "/folder");
    }

    #[test]
    fn test_open_errors() {
        let artifact = compile(&MemoryFs::new().file("/folder/a.txt", "Stuff."));
        let fs = artifact.filesystem();

        assert!(fs.open("/nope").unwrap_err().is_not_found());
        assert!(matches!(
            fs.open("/folder/a.txt").unwrap().read_dir(None),
            Err(EmbedError::NotADirectory(_))
        ));

        let mut dir = fs.open("/folder").unwrap();
        let mut buf = [0u8; 1];
        let err = dir.read(&mut buf).unwrap_err();
        assert!(matches!(EmbedError::from_io(&err), Some(EmbedError::IsADirectory(_))));
        let err = dir.seek(SeekFrom::Start(1)).unwrap_err();
        assert!(matches!(EmbedError::from_io(&err), Some(EmbedError::InvalidSeek { .. })));
    }

    #[test]
    fn test_runtime_is_shareable_across_threads() {
        let content = "shared content ".repeat(500);
        let artifact = compile(&MemoryFs::new().file("/shared.txt", &content));
        let fs = artifact.filesystem();

        std::thread::scope(|scope| {
            for offset in [0u64, 100, 1_000, 5_000] {
                let fs = &fs;
                let content = &content;
                scope.spawn(move || {
                    let mut handle = fs.open("/shared.txt").unwrap();
                    handle.seek(SeekFrom::Start(offset)).unwrap();
                    let mut rest = String::new();
                    handle.read_to_string(&mut rest).unwrap();
                    assert_eq!(rest, content[offset as usize..]);
                });
            }
        });
    }
}
