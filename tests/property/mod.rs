//! Property-based testing for embedfs
//!
//! Uses proptest to check that whatever goes into the compiler comes back
//! out of the runtime unchanged, and that seeking inside a compressed file
//! behaves exactly like seeking inside a plain byte slice.

use ::embedfs::*;
use flate2::write::GzEncoder;
use flate2::Compression;
use proptest::prelude::*;
use std::collections::BTreeMap;
use std::io::{Read, Seek, SeekFrom, Write};

/// One step against an open file handle
#[derive(Debug, Clone)]
pub enum HandleOp {
    Read(usize),
    Seek(SeekFrom),
}

fn handle_op_strategy() -> impl Strategy<Value = HandleOp> {
    prop_oneof![
        (0usize..300).prop_map(HandleOp::Read),
        (0u64..2_500).prop_map(|n| HandleOp::Seek(SeekFrom::Start(n))),
        (-600i64..600).prop_map(|n| HandleOp::Seek(SeekFrom::Current(n))),
        (-2_500i64..100).prop_map(|n| HandleOp::Seek(SeekFrom::End(n))),
    ]
}

/// Content that is sometimes compressible and sometimes not
fn content_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop_oneof![
        prop::collection::vec(any::<u8>(), 0..2_000),
        ("[a-c]{1,8}", 1usize..300).prop_map(|(unit, times)| unit.repeat(times).into_bytes()),
    ]
}

/// Map of relative file paths to content
fn tree_strategy() -> impl Strategy<Value = BTreeMap<String, Vec<u8>>> {
    let path = (prop::collection::vec("[a-z]{1,6}", 0..=3), "[a-z]{1,8}\\.(txt|bin)")
        .prop_map(|(dirs, name)| {
            let mut path = String::new();
            for dir in dirs {
                path.push('/');
                path.push_str(&dir);
                path.push_str(".d");
            }
            path.push('/');
            path.push_str(&name);
            path
        });
    prop::collection::btree_map(path, content_strategy(), 0..12)
}

fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// Apply `ops` to `handle` and to a model cursor over `content`, comparing
/// every observable result.
fn check_against_model(handle: &mut Handle<'_>, content: &[u8], ops: &[HandleOp]) -> std::result::Result<(), TestCaseError> {
    let mut position: u64 = 0;
    for op in ops {
        match op {
            HandleOp::Read(n) => {
                let mut got = Vec::new();
                handle.by_ref().take(*n as u64).read_to_end(&mut got).unwrap();
                let start = (position as usize).min(content.len());
                let end = (start + n).min(content.len());
                prop_assert_eq!(&got[..], &content[start..end]);
                position += got.len() as u64;
            }
            HandleOp::Seek(pos) => {
                let expected = match *pos {
                    SeekFrom::Start(n) => Some(n),
                    SeekFrom::Current(d) => position.checked_add_signed(d),
                    SeekFrom::End(d) => (content.len() as u64).checked_add_signed(d),
                };
                match (handle.seek(*pos), expected) {
                    (Ok(actual), Some(expected)) => {
                        prop_assert_eq!(actual, expected);
                        position = expected;
                    }
                    (Err(_), None) => {}
                    (actual, expected) => {
                        return Err(TestCaseError::fail(format!(
                            "seek {:?} from {} gave {:?}, expected {:?}",
                            pos, position, actual, expected
                        )))
                    }
                }
            }
        }
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_compile_round_trip(tree in tree_strategy(), workers in 1usize..4) {
        let mut input = MemoryFs::new();
        for (path, content) in &tree {
            input = input.file(path, content);
        }
        let compiler = CompilerBuilder::new().parallel_workers(workers).build().unwrap();
        let (artifact, report) = compiler.build_artifact(&input, "/").unwrap();
        prop_assert_eq!(report.files, tree.len());
        prop_assert!(artifact.validate().is_ok());

        // Going through the bundle encoding changes nothing
        let decoded = Artifact::from_bundle(&artifact.to_bundle().unwrap()).unwrap();
        prop_assert_eq!(&decoded, &artifact);

        let fs = decoded.filesystem();
        for (path, content) in &tree {
            prop_assert_eq!(&fs.read(path).unwrap(), content);
            prop_assert_eq!(fs.metadata(path).unwrap().len(), content.len() as u64);
        }
        prop_assert_eq!(fs.walk().filter(|(_, meta)| meta.is_file()).count(), tree.len());
    }

    #[test]
    fn prop_compressed_seek_matches_slice(content in content_strategy(), ops in prop::collection::vec(handle_op_strategy(), 1..40)) {
        let compressed = gzip(&content);
        let entries = vec![
            ("/", Entry::Directory(vfs::Directory::with_children("/", Timestamp::default(), vec!["/data"]))),
            (
                "/data",
                Entry::Compressed(vfs::CompressedFile::new("data", Timestamp::default(), &compressed, content.len() as u64)),
            ),
        ];
        let fs = EmbeddedFs::from_entries(entries);
        let mut handle = fs.open("/data").unwrap();
        check_against_model(&mut handle, &content, &ops)?;
    }

    #[test]
    fn prop_raw_seek_matches_slice(content in content_strategy(), ops in prop::collection::vec(handle_op_strategy(), 1..40)) {
        let entries = vec![
            ("/", Entry::Directory(vfs::Directory::with_children("/", Timestamp::default(), vec!["/data"]))),
            ("/data", Entry::Raw(vfs::RawFile::new("data", Timestamp::default(), &content))),
        ];
        let fs = EmbeddedFs::from_entries(entries);
        let mut handle = fs.open("/data").unwrap();
        check_against_model(&mut handle, &content, &ops)?;
    }

    #[test]
    fn prop_generated_names_are_identifiers(path in "/[ -~]{0,40}") {
        let mut names = naming::NameAllocator::default();
        let first = names.allocate(&path).unwrap();
        let second = names.allocate(&path).unwrap();
        prop_assert!(naming::is_valid_ident(&first));
        prop_assert!(naming::is_valid_ident(&second));
        prop_assert_ne!(first, second);
    }
}
