//! Wavefront OBJ and MTL text writers.
//!
//! Positions and normals are X-flipped so meshes import upright in
//! common viewers, indices become 1-based, and the source's clockwise
//! winding is reversed to the CCW that OBJ consumers expect.

use crate::{Error, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

fn f32_le(bytes: &[u8], i: usize) -> f32 {
    f32::from_le_bytes([bytes[i], bytes[i + 1], bytes[i + 2], bytes[i + 3]])
}

fn u16_le(bytes: &[u8], i: usize) -> u16 {
    u16::from_le_bytes([bytes[i], bytes[i + 1]])
}

/// Writes one frame's mesh as an OBJ file. `normals` may be omitted;
/// `mtl_filename` links the material file when given. Sub-arrays are the
/// raw little-endian bytes from the frame body.
pub fn write_obj_file(
    path: &Path,
    mtl_filename: Option<&str>,
    material_name: &str,
    vertices: &[u8],
    texcoords: &[u8],
    normals: Option<&[u8]>,
    indices: &[u8],
) -> Result<()> {
    let n_vertices = vertices.len() / 12;
    if n_vertices > usize::from(u16::MAX) + 1 {
        return Err(Error::UnsupportedIndexWidth {
            vertex_count: n_vertices,
        });
    }

    let file = File::create(path)?;
    let mut w = BufWriter::new(file);

    writeln!(w, "# Exported by volkit")?;
    // mtllib must go before usemtl or some viewers won't load the texture.
    if let Some(mtl) = mtl_filename {
        writeln!(w, "mtllib {}", mtl)?;
        writeln!(w, "usemtl {}", material_name)?;
    }

    for v in 0..n_vertices {
        let x = f32_le(vertices, v * 12);
        let y = f32_le(vertices, v * 12 + 4);
        let z = f32_le(vertices, v * 12 + 8);
        // Reversed X. Could instead reverse Z, but then imports need
        // "Z forward".
        writeln!(w, "v {:.3} {:.3} {:.3}", -x, y, z)?;
    }

    for t in 0..texcoords.len() / 8 {
        let s = f32_le(texcoords, t * 8);
        let tt = f32_le(texcoords, t * 8 + 4);
        writeln!(w, "vt {:.3} {:.3}", s, tt)?;
    }

    let has_normals = if let Some(normals) = normals {
        for n in 0..normals.len() / 12 {
            let x = f32_le(normals, n * 12);
            let y = f32_le(normals, n * 12 + 4);
            let z = f32_le(normals, n * 12 + 8);
            writeln!(w, "vn {:.3} {:.3} {:.3}", -x, y, z)?;
        }
        true
    } else {
        false
    };

    let n_indices = indices.len() / 2;
    for tri in 0..n_indices / 3 {
        let a = u32::from(u16_le(indices, tri * 6)) + 1;
        let b = u32::from(u16_le(indices, tri * 6 + 2)) + 1;
        let c = u32::from(u16_le(indices, tri * 6 + 4)) + 1;
        // Source winding is CW; emit CCW.
        if has_normals {
            writeln!(w, "f {}/{}/{} {}/{}/{} {}/{}/{}", c, c, c, b, b, b, a, a, a)?;
        } else {
            writeln!(w, "f {}/{} {}/{} {}/{}", c, c, b, b, a, a)?;
        }
    }

    w.flush()?;
    Ok(())
}

/// Writes the Wavefront MTL file linking the OBJ to its texture image.
pub fn write_mtl_file(path: &Path, material_name: &str, image_filename: &str) -> Result<()> {
    let file = File::create(path)?;
    let mut w = BufWriter::new(file);
    writeln!(w, "newmtl {}", material_name)?;
    writeln!(w, "map_Kd {}", image_filename)?;
    writeln!(w, "map_Ka {}", image_filename)?;
    writeln!(w, "Ka 0.1 0.1 0.1")?;
    writeln!(w, "Kd 0.9 0.9 0.9")?;
    writeln!(w, "Ks 0.0 0.0 0.0")?;
    writeln!(w, "d 1.0")?;
    writeln!(w, "Tr 0.0")?;
    writeln!(w, "Ns 0.0")?;
    w.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn floats(values: &[f32]) -> Vec<u8> {
        values.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    fn shorts(values: &[u16]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    #[test]
    fn test_obj_output_shape() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.obj");

        let vertices = floats(&[1.0, 2.0, 3.0, -1.0, 0.0, 0.5, 0.0, 1.0, 0.0]);
        let texcoords = floats(&[0.0, 0.0, 0.5, 0.5, 1.0, 1.0]);
        let normals = floats(&[1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0]);
        let indices = shorts(&[0, 1, 2]);

        write_obj_file(
            &path,
            Some("frame.mtl"),
            "vol_mtl_00001",
            &vertices,
            &texcoords,
            Some(&normals),
            &indices,
        )
        .unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[1], "mtllib frame.mtl");
        assert_eq!(lines[2], "usemtl vol_mtl_00001");
        // X is flipped on positions and normals.
        assert_eq!(lines[3], "v -1.000 2.000 3.000");
        assert_eq!(lines[4], "v 1.000 0.000 0.500");
        assert!(lines.contains(&"vt 0.500 0.500"));
        assert!(lines.contains(&"vn -1.000 0.000 0.000"));
        // 1-based, winding reversed: 0,1,2 -> 3,2,1.
        assert_eq!(*lines.last().unwrap(), "f 3/3/3 2/2/2 1/1/1");
    }

    #[test]
    fn test_obj_without_normals_uses_pair_faces() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.obj");

        let vertices = floats(&[0.0; 9]);
        let texcoords = floats(&[0.0; 6]);
        let indices = shorts(&[0, 1, 2]);

        write_obj_file(&path, None, "m", &vertices, &texcoords, None, &indices).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(!text.contains("mtllib"));
        assert!(!text.contains("vn "));
        assert!(text.lines().last().unwrap().starts_with("f 3/3 2/2 1/1"));
    }

    #[test]
    fn test_oversized_mesh_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.obj");
        let vertices = vec![0u8; (usize::from(u16::MAX) + 2) * 12];
        match write_obj_file(&path, None, "m", &vertices, &[], None, &[]) {
            Err(Error::UnsupportedIndexWidth { .. }) => {}
            other => panic!("expected UnsupportedIndexWidth, got {:?}", other),
        }
    }

    #[test]
    fn test_mtl_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.mtl");
        write_mtl_file(&path, "vol_mtl_00042", "frame_00042.jpg").unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("newmtl vol_mtl_00042\n"));
        assert!(text.contains("map_Kd frame_00042.jpg"));
        assert!(text.contains("map_Ka frame_00042.jpg"));
        assert!(text.contains("Ns 0.0"));
    }
}
