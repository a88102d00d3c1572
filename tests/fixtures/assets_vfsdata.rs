// Code generated by embedfs. DO NOT EDIT.

pub mod assets {
    use ::embedfs::vfs::{CompressedFile, Directory, EmbeddedFs, Entry, RawFile, Timestamp};

    const FILE_FOLDER_A_TXT: &[u8] = b"Stuff in /folder/a.txt.";
    const FILE_FOLDER_B_TXT: &[u8] = b"Stuff in /folder/b.txt.";
    const FILE_SAMPLE_FILE_TXT: &[u8] = b"\x1f\x8b\x08\x00\x00\x00\x00\x00\x02\xff\x0b\xc9\xc8,VH\xcb\xccIUH\xce\xcf-(J-.N-V(O\xcd\xc9\xd1Sp\xcaI\x1cL C\x0f\x00\x13\xfc\x8aD\xac\x00\x00\x00";

    static ASSETS_ENTRIES: [(&str, Entry<'static>); 6] = [
        ("/", Entry::Directory(Directory::new("/", Timestamp::new(1500000000, 0), &["/empty", "/folder", "/sample-file.txt"]))),
        ("/empty", Entry::Directory(Directory::new("empty", Timestamp::new(1500000000, 0), &[]))),
        ("/folder", Entry::Directory(Directory::new("folder", Timestamp::new(1500000000, 0), &["/folder/a.txt", "/folder/b.txt"]))),
        ("/folder/a.txt", Entry::Raw(RawFile::new("a.txt", Timestamp::new(1500000000, 0), FILE_FOLDER_A_TXT))),
        ("/folder/b.txt", Entry::Raw(RawFile::new("b.txt", Timestamp::new(1500000000, 0), FILE_FOLDER_B_TXT))),
        ("/sample-file.txt", Entry::Compressed(CompressedFile::new("sample-file.txt", Timestamp::new(1500000000, 0), FILE_SAMPLE_FILE_TXT, 172))),
    ];

    pub static ASSETS: EmbeddedFs<'static> = EmbeddedFs::from_static(&ASSETS_ENTRIES);
}
