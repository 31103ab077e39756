//! Binary PCD (v0.7) persistence for colored point clouds.
//!
//! Layout written by [`write_pcd_binary`]:
//! ```text
//! # .PCD v0.7 - Point Cloud Data file format
//! VERSION 0.7
//! FIELDS x y z rgba
//! SIZE 4 4 4 4
//! TYPE F F F U
//! COUNT 1 1 1 1
//! WIDTH <n>
//! HEIGHT 1
//! VIEWPOINT 0 0 0 1 0 0 0
//! POINTS <n>
//! DATA binary
//! <n * 16 bytes, little-endian>
//! ```
//! `rgba` is packed as `a << 24 | r << 16 | g << 8 | b` with opaque alpha.

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use image::Rgb;
use nalgebra::Vector3;

use super::point::{ColoredPoint, PointCloud};

const HEADER_LINES: usize = 11;

fn pack_rgba(color: Rgb<u8>) -> u32 {
    let [r, g, b] = color.0;
    (0xff << 24) | ((r as u32) << 16) | ((g as u32) << 8) | b as u32
}

fn unpack_rgba(rgba: u32) -> Rgb<u8> {
    Rgb([(rgba >> 16) as u8, (rgba >> 8) as u8, rgba as u8])
}

/// Serialize `cloud` as binary PCD into `writer`.
pub fn encode_pcd_binary<W: Write>(cloud: &PointCloud, mut writer: W) -> io::Result<()> {
    let n = cloud.len();
    write!(
        writer,
        "# .PCD v0.7 - Point Cloud Data file format\n\
         VERSION 0.7\n\
         FIELDS x y z rgba\n\
         SIZE 4 4 4 4\n\
         TYPE F F F U\n\
         COUNT 1 1 1 1\n\
         WIDTH {n}\n\
         HEIGHT 1\n\
         VIEWPOINT 0 0 0 1 0 0 0\n\
         POINTS {n}\n\
         DATA binary\n"
    )?;

    for p in cloud.iter() {
        writer.write_f32::<LittleEndian>(p.position.x)?;
        writer.write_f32::<LittleEndian>(p.position.y)?;
        writer.write_f32::<LittleEndian>(p.position.z)?;
        writer.write_u32::<LittleEndian>(pack_rgba(p.color))?;
    }
    writer.flush()
}

/// Write `cloud` to `path` as binary PCD, replacing any existing file.
pub fn write_pcd_binary<P: AsRef<Path>>(cloud: &PointCloud, path: P) -> io::Result<()> {
    let file = File::create(path)?;
    encode_pcd_binary(cloud, BufWriter::new(file))
}

/// Parse a binary PCD stream in the layout produced by [`encode_pcd_binary`].
pub fn decode_pcd_binary<R: Read>(reader: R) -> io::Result<PointCloud> {
    let mut reader = BufReader::new(reader);
    let mut points: Option<usize> = None;
    let mut line = String::new();

    for _ in 0..HEADER_LINES {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "truncated PCD header"));
        }
        let mut fields = line.split_whitespace();
        match fields.next() {
            Some("FIELDS") => {
                let names: Vec<&str> = fields.collect();
                if names != ["x", "y", "z", "rgba"] {
                    return Err(invalid(format!("unsupported PCD fields {:?}", names)));
                }
            }
            Some("POINTS") => {
                let count = fields
                    .next()
                    .and_then(|v| v.parse().ok())
                    .ok_or_else(|| invalid("malformed POINTS line".into()))?;
                points = Some(count);
            }
            Some("DATA") => {
                if fields.next() != Some("binary") {
                    return Err(invalid("only binary PCD data is supported".into()));
                }
            }
            _ => {}
        }
    }

    let n = points.ok_or_else(|| invalid("PCD header has no POINTS line".into()))?;
    let mut cloud = PointCloud::with_capacity(n);
    for _ in 0..n {
        let x = reader.read_f32::<LittleEndian>()?;
        let y = reader.read_f32::<LittleEndian>()?;
        let z = reader.read_f32::<LittleEndian>()?;
        let rgba = reader.read_u32::<LittleEndian>()?;
        cloud.push(ColoredPoint::new(Vector3::new(x, y, z), unpack_rgba(rgba)));
    }
    Ok(cloud)
}

pub fn read_pcd_binary<P: AsRef<Path>>(path: P) -> io::Result<PointCloud> {
    decode_pcd_binary(File::open(path)?)
}

fn invalid(msg: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgba_packing() {
        assert_eq!(pack_rgba(Rgb([0x12, 0x34, 0x56])), 0xff12_3456);
        assert_eq!(unpack_rgba(0xff12_3456), Rgb([0x12, 0x34, 0x56]));
    }

    #[test]
    fn test_header_and_payload_size() {
        let cloud: PointCloud = vec![
            ColoredPoint::new(Vector3::new(1.0, 2.0, 3.0), Rgb([1, 2, 3])),
            ColoredPoint::new(Vector3::new(-1.0, 0.5, 9.0), Rgb([200, 100, 0])),
        ]
        .into();

        let mut bytes = Vec::new();
        encode_pcd_binary(&cloud, &mut bytes).unwrap();

        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("FIELDS x y z rgba\n"));
        assert!(text.contains("WIDTH 2\n"));
        assert!(text.contains("POINTS 2\n"));

        let header_len = text.find("DATA binary\n").unwrap() + "DATA binary\n".len();
        assert_eq!(bytes.len() - header_len, 2 * 16);

        let decoded = decode_pcd_binary(bytes.as_slice()).unwrap();
        assert_eq!(decoded.points, cloud.points);
    }

    #[test]
    fn test_empty_cloud_writes_valid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.pcd");

        write_pcd_binary(&PointCloud::new(), &path).unwrap();
        let decoded = read_pcd_binary(&path).unwrap();
        assert!(decoded.is_empty());
    }

    #[test]
    fn test_truncated_payload_is_an_error() {
        let cloud: PointCloud = vec![ColoredPoint::new(Vector3::zeros(), Rgb([0, 0, 0]))].into();
        let mut bytes = Vec::new();
        encode_pcd_binary(&cloud, &mut bytes).unwrap();
        bytes.truncate(bytes.len() - 4);

        assert!(decode_pcd_binary(bytes.as_slice()).is_err());
    }
}
