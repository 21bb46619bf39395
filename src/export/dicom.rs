//! DICOM Secondary Capture writer for rendered pages.
//!
//! Writes a Part 10 file: a 128 byte preamble, the `DICM` prefix, the file
//! meta group and a dataset with 8-bit MONOCHROME2 pixel data, all in
//! explicit VR little endian.

use crate::error::{Error, Result};
use crate::model::Metadata;
use image::GrayImage;
use md5::{Digest, Md5};

const SECONDARY_CAPTURE: &str = "1.2.840.10008.5.1.4.1.1.7";
const EXPLICIT_VR_LITTLE_ENDIAN: &str = "1.2.840.10008.1.2.1";
const IMPLEMENTATION_CLASS: &str = "2.25.190367245180541624871524640137395633214";

/// Element writer for explicit VR little endian.
struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    fn new() -> Self {
        Self { buf: Vec::new() }
    }

    fn header(&mut self, group: u16, element: u16, vr: &[u8; 2], len: usize) -> Result<()> {
        self.buf.extend_from_slice(&group.to_le_bytes());
        self.buf.extend_from_slice(&element.to_le_bytes());
        self.buf.extend_from_slice(vr);
        if matches!(vr, b"OB" | b"OW" | b"UN" | b"UT" | b"SQ") {
            let len = u32::try_from(len)
                .map_err(|_| Error::Export(format!("DICOM element ({:04X},{:04X}) too long", group, element)))?;
            self.buf.extend_from_slice(&[0, 0]);
            self.buf.extend_from_slice(&len.to_le_bytes());
        } else {
            let len = u16::try_from(len)
                .map_err(|_| Error::Export(format!("DICOM element ({:04X},{:04X}) too long", group, element)))?;
            self.buf.extend_from_slice(&len.to_le_bytes());
        }
        Ok(())
    }

    /// String value padded to even length (NUL for UIDs, space otherwise).
    fn string(&mut self, group: u16, element: u16, vr: &[u8; 2], value: &str) -> Result<()> {
        let mut bytes = value.as_bytes().to_vec();
        if bytes.len() % 2 == 1 {
            bytes.push(if vr == b"UI" { 0 } else { b' ' });
        }
        self.header(group, element, vr, bytes.len())?;
        self.buf.extend_from_slice(&bytes);
        Ok(())
    }

    fn u16(&mut self, group: u16, element: u16, value: u16) -> Result<()> {
        self.header(group, element, b"US", 2)?;
        self.buf.extend_from_slice(&value.to_le_bytes());
        Ok(())
    }

    fn u32(&mut self, group: u16, element: u16, value: u32) -> Result<()> {
        self.header(group, element, b"UL", 4)?;
        self.buf.extend_from_slice(&value.to_le_bytes());
        Ok(())
    }

    fn bytes(&mut self, group: u16, element: u16, value: &[u8]) -> Result<()> {
        let padded = value.len() + value.len() % 2;
        self.header(group, element, b"OB", padded)?;
        self.buf.extend_from_slice(value);
        if value.len() % 2 == 1 {
            self.buf.push(0);
        }
        Ok(())
    }
}

/// UID under the `2.25` root derived from a digest of `seed` and `salt`.
fn derived_uid(seed: &[u8], salt: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(seed);
    hasher.update(salt.as_bytes());
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&hasher.finalize());
    format!("2.25.{}", u128::from_be_bytes(bytes))
}

/// Encode a grayscale page image.
pub(crate) fn encode(img: &GrayImage, dpi: u32, meta: &Metadata) -> Result<Vec<u8>> {
    let rows = u16::try_from(img.height())
        .map_err(|_| Error::InvalidArgument(format!("{} rows exceed the DICOM limit", img.height())))?;
    let columns = u16::try_from(img.width())
        .map_err(|_| Error::InvalidArgument(format!("{} columns exceed the DICOM limit", img.width())))?;
    let pixels = img.as_raw();
    let instance_uid = derived_uid(pixels, "instance");

    let mut group = Writer::new();
    group.bytes(0x0002, 0x0001, &[0, 1])?;
    group.string(0x0002, 0x0002, b"UI", SECONDARY_CAPTURE)?;
    group.string(0x0002, 0x0003, b"UI", &instance_uid)?;
    group.string(0x0002, 0x0010, b"UI", EXPLICIT_VR_LITTLE_ENDIAN)?;
    group.string(0x0002, 0x0012, b"UI", IMPLEMENTATION_CLASS)?;

    let mut out = vec![0u8; 128];
    out.extend_from_slice(b"DICM");
    let mut meta_group = Writer::new();
    meta_group.u32(0x0002, 0x0000, group.buf.len() as u32)?;
    out.extend_from_slice(&meta_group.buf);
    out.extend_from_slice(&group.buf);

    let mut ds = Writer::new();
    ds.string(0x0008, 0x0016, b"UI", SECONDARY_CAPTURE)?;
    ds.string(0x0008, 0x0018, b"UI", &instance_uid)?;
    if let Some(created) = meta.created {
        ds.string(0x0008, 0x0020, b"DA", &created.format("%Y%m%d").to_string())?;
    }
    ds.string(0x0008, 0x0060, b"CS", "OT")?;
    ds.string(0x0008, 0x0064, b"CS", "WSD")?;
    if let Some(title) = &meta.title {
        ds.string(0x0008, 0x1030, b"LO", title.chars().take(64).collect::<String>().as_str())?;
    }
    ds.string(0x0010, 0x0010, b"PN", "")?;
    ds.string(0x0020, 0x000D, b"UI", &derived_uid(pixels, "study"))?;
    ds.string(0x0020, 0x000E, b"UI", &derived_uid(pixels, "series"))?;
    ds.u16(0x0028, 0x0002, 1)?;
    ds.string(0x0028, 0x0004, b"CS", "MONOCHROME2")?;
    ds.u16(0x0028, 0x0010, rows)?;
    ds.u16(0x0028, 0x0011, columns)?;
    let spacing = 25.4 / dpi.max(1) as f64;
    ds.string(0x0028, 0x0030, b"DS", &format!("{:.6}\\{:.6}", spacing, spacing))?;
    ds.u16(0x0028, 0x0100, 8)?;
    ds.u16(0x0028, 0x0101, 8)?;
    ds.u16(0x0028, 0x0102, 7)?;
    ds.u16(0x0028, 0x0103, 0)?;
    ds.bytes(0x7FE0, 0x0010, pixels)?;

    out.extend_from_slice(&ds.buf);
    Ok(out)
}
