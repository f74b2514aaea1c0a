//! Legacy split-file cut tests.

use std::fs::File;
use std::path::Path;

use volkit_convert::cut_split;
use volkit_core::frame::{write_frame, FrameArrays, Keyframe};
use volkit_core::{FormatTag, FrameStore, VolsHeader};

fn build_v12_pair(dir: &Path, frame_count: u32, key_every: u32) {
    let header = VolsHeader {
        format: FormatTag::Prefixed,
        version: 12,
        mesh_name: "subject".to_string(),
        material: "mat".to_string(),
        shader: "standard".to_string(),
        frame_count,
        normals: true,
        textured: false,
        texture_width: 1024,
        texture_height: 1024,
        texture_format: 1,
        ..VolsHeader::default()
    };
    let mut hf = File::create(dir.join("header.vols")).unwrap();
    header.write(&mut hf).unwrap();

    let mut sf = File::create(dir.join("sequence_0.vols")).unwrap();
    for i in 0..frame_count {
        let keyframe = if i % key_every == 0 {
            Keyframe::Key
        } else {
            Keyframe::Inter
        };
        let vertices = vec![i as u8; 36];
        let normals = vec![0xA0 + i as u8; 36];
        let indices = vec![0x70 + i as u8; 6];
        let uvs = vec![0x80 + i as u8; 16];
        let arrays = FrameArrays {
            vertices: &vertices,
            normals: Some(&normals),
            indices: keyframe.is_key().then_some(&indices[..]),
            uvs: keyframe.is_key().then_some(&uvs[..]),
            texture: None,
        };
        write_frame(&mut sf, 12, i, keyframe, &arrays).unwrap();
    }
}

#[test]
fn cut_writes_renumbered_pair_with_leading_keyframe() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("vologram");
    let output = dir.path().join("out");
    std::fs::create_dir_all(&input).unwrap();
    build_v12_pair(&input, 50, 8);

    // Frames 10..=20: frame 10 is an inter-frame (keyframes at 0, 8, 16...).
    let summary = cut_split(&input, &output, 10, 20).unwrap();
    assert_eq!(summary.frames_written, 11);
    assert_eq!(summary.videos_trimmed, 0);

    let mut store = FrameStore::open_split(
        &output.join("header.vols"),
        &output.join("sequence_0.vols"),
    )
    .unwrap();
    assert_eq!(store.frame_count(), 11);
    assert_eq!(store.header().mesh_name, "subject");

    store.read_frame(0).unwrap();
    let view = store.current_view().unwrap();
    assert_eq!(view.header.frame_number, 0);
    assert_eq!(view.header.keyframe, Keyframe::Key);
    // Vertices from input frame 10, topology spliced from keyframe 8.
    assert_eq!(view.vertices(), &vec![10u8; 36][..]);
    assert_eq!(view.indices().unwrap(), &vec![0x78u8; 6][..]);
    assert_eq!(view.uvs().unwrap(), &vec![0x88u8; 16][..]);
    // Normals travel with the frame itself.
    assert_eq!(view.normals().unwrap(), &vec![0xAAu8; 36][..]);

    // Input keyframe 16 lands at output index 6 with its flag intact.
    store.read_frame(6).unwrap();
    let view = store.current_view().unwrap();
    assert_eq!(view.header.keyframe, Keyframe::Key);
    assert_eq!(view.header.frame_number, 6);

    for j in 0..11u32 {
        store.read_frame(j).unwrap();
        assert_eq!(store.current_view().unwrap().header.frame_number, j);
    }
}

#[test]
fn cut_starting_on_keyframe_is_a_plain_copy() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("vologram");
    let output = dir.path().join("out");
    std::fs::create_dir_all(&input).unwrap();
    build_v12_pair(&input, 20, 4);

    let summary = cut_split(&input, &output, 4, 9).unwrap();
    assert_eq!(summary.frames_written, 6);

    let mut store = FrameStore::open_split(
        &output.join("header.vols"),
        &output.join("sequence_0.vols"),
    )
    .unwrap();
    store.read_frame(0).unwrap();
    let view = store.current_view().unwrap();
    assert_eq!(view.header.keyframe, Keyframe::Key);
    // Indices belong to input frame 4 itself, not an earlier keyframe.
    assert_eq!(view.indices().unwrap(), &vec![0x74u8; 6][..]);
}

#[test]
fn cut_range_is_clamped() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("vologram");
    let output = dir.path().join("out");
    std::fs::create_dir_all(&input).unwrap();
    build_v12_pair(&input, 10, 4);

    let summary = cut_split(&input, &output, 6, 99).unwrap();
    assert_eq!(summary.frames_written, 4);
}
