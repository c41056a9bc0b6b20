// 缓冲区插入与预览释放的性质测试
use bytes::Bytes;
use proptest::prelude::*;

use note_capture::buffer::CaptureBufferManager;
use note_capture::host::SavedImage;
use note_capture::ingest::{ImageRecord, PreviewHandle, PreviewRegistry, SourceKind};

fn path_record(name: &str) -> ImageRecord {
    ImageRecord::new(
        SavedImage {
            markdown: SavedImage::embed_markdown(name, None),
            saved_path: format!("/vault/{}", name),
            filename: name.to_string(),
        },
        PreviewHandle::for_saved_path(&format!("/vault/{}", name)),
        SourceKind::Path,
    )
}

fn bytes_record(registry: &PreviewRegistry, name: &str) -> ImageRecord {
    ImageRecord::new(
        SavedImage {
            markdown: SavedImage::embed_markdown(name, Some("600")),
            saved_path: format!("/vault/{}", name),
            filename: name.to_string(),
        },
        registry.allocate(Bytes::from(vec![0u8; 8]), name),
        SourceKind::Bytes,
    )
}

#[derive(Debug, Clone)]
enum Op {
    Insert(usize),
    Remove(usize),
    Reset,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (1usize..4).prop_map(Op::Insert),
        (0usize..8).prop_map(Op::Remove),
        Just(Op::Reset),
    ]
}

proptest! {
    #[test]
    fn batch_is_contiguous_and_ordered(
        text in "[a-c\n中]{0,24}",
        at in 0usize..40,
        count in 1usize..5,
    ) {
        let mut buffer = CaptureBufferManager::new(PreviewRegistry::new());
        buffer.set_text(text.clone(), None);

        let names: Vec<String> = (0..count).map(|i| format!("img{}.png", i)).collect();
        let records = names.iter().map(|n| path_record(n)).collect();
        let caret = buffer.insert_images(records, at);

        let split = text
            .char_indices()
            .nth(at)
            .map(|(i, _)| i)
            .unwrap_or(text.len());
        let (before, after) = text.split_at(split);
        let prefix = if !before.is_empty() && !before.ends_with('\n') { "\n" } else { "" };
        let joined: String = names.iter().map(|n| format!("![[{}]]\n", n)).collect();

        let expected = format!("{}{}{}{}", before, prefix, joined, after);
        prop_assert_eq!(buffer.text(), expected.as_str());
        prop_assert_eq!(caret, format!("{}{}{}", before, prefix, joined).chars().count());

        let filenames: Vec<&str> = buffer.records().iter().map(|r| r.filename.as_str()).collect();
        prop_assert_eq!(filenames, names.iter().map(String::as_str).collect::<Vec<_>>());
    }

    #[test]
    fn previews_never_leak(ops in prop::collection::vec(op(), 0..24)) {
        let registry = PreviewRegistry::new();
        {
            let mut buffer = CaptureBufferManager::new(registry.clone());
            let mut counter = 0;

            for op in ops {
                match op {
                    Op::Insert(n) => {
                        let records = (0..n)
                            .map(|_| {
                                counter += 1;
                                bytes_record(&registry, &format!("p{}.png", counter))
                            })
                            .collect();
                        let end = buffer.text().chars().count();
                        buffer.insert_images(records, end);
                    }
                    Op::Remove(index) => {
                        let id = buffer.records().get(index).map(|r| r.id.clone());
                        if let Some(id) = id {
                            prop_assert!(buffer.remove_image(&id));
                        }
                    }
                    Op::Reset => buffer.reset(),
                }

                let stats = registry.stats();
                prop_assert_eq!(stats.outstanding as usize, buffer.records().len());
            }
        }

        let stats = registry.stats();
        prop_assert_eq!(stats.outstanding, 0);
        prop_assert_eq!(stats.allocated, stats.released);
        prop_assert_eq!(stats.rejected, 0);
    }
}
