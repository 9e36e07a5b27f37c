use bitstream_io::{BitRead, BitReader, BitWrite, BitWriter, Endianness};

use super::ParseError;

/// Maximum number of compression-pointer jumps followed while decoding a
/// single domain name, guarding against pointer loops in malformed packets.
const MAX_POINTER_JUMPS: u32 = 100;

pub trait PacketComponent {
    fn write<E: Endianness>(
        &self,
        writer: &mut BitWriter<&mut Vec<u8>, E>,
    ) -> Result<(), ParseError>;

    fn read<E: Endianness>(&mut self, reader: &mut BitReader<&[u8], E>) -> Result<(), ParseError>;

    /// Read with access to the full packet buffer, needed to follow
    /// compression pointers that jump backwards into the message.
    fn read_with_buffer<E: Endianness>(
        &mut self,
        reader: &mut BitReader<&[u8], E>,
        _packet_buf: &[u8],
    ) -> Result<(), ParseError> {
        self.read(reader)
    }

    fn read_labels<E: Endianness>(
        &mut self,
        reader: &mut BitReader<&[u8], E>,
    ) -> Result<Vec<String>, ParseError> {
        self.read_labels_with_buffer(reader, None)
    }

    fn read_labels_with_buffer<E: Endianness>(
        &mut self,
        reader: &mut BitReader<&[u8], E>,
        packet_buf: Option<&[u8]>,
    ) -> Result<Vec<String>, ParseError> {
        let mut labels = Vec::new();
        let mut jumps = 0u32;

        loop {
            let first_byte = reader.read_var::<u8>(8)?;

            if first_byte == 0 {
                break;
            }

            if (first_byte & 0xC0) == 0xC0 {
                let second_byte = reader.read_var::<u8>(8)?;
                let pointer = ((first_byte as u16 & 0x3F) << 8) | second_byte as u16;
                let buf = packet_buf.ok_or(ParseError::InvalidLabel)?;
                let (pointer_labels, _) = decode_labels_at(buf, pointer as usize, jumps)?;
                labels.extend(pointer_labels);
                break;
            }

            if first_byte > 63 {
                return Err(ParseError::InvalidLabel);
            }

            let mut label_buf = vec![0u8; first_byte as usize];
            reader.read_bytes(&mut label_buf)?;
            let label = String::from_utf8(label_buf).map_err(|_| ParseError::InvalidLabel)?;
            labels.push(label);

            jumps += 1;
            if jumps > MAX_POINTER_JUMPS {
                return Err(ParseError::CompressionLoop(MAX_POINTER_JUMPS));
            }
        }

        Ok(labels)
    }

    fn write_labels<E: Endianness>(
        &self,
        writer: &mut BitWriter<&mut Vec<u8>, E>,
        labels: &[String],
    ) -> Result<(), ParseError> {
        if labels.is_empty() || labels.iter().all(|l| l.is_empty()) {
            writer.write_var::<u8>(8, 0)?;
            return Ok(());
        }

        for label in labels {
            if label.is_empty() {
                continue;
            }
            writer.write_var::<u8>(8, label.len() as u8)?;
            writer.write_bytes(label.as_bytes())?;
        }
        writer.write_var::<u8>(8, 0)?;

        Ok(())
    }
}

/// Decode labels starting at a raw byte offset into the packet buffer,
/// following further compression pointers as needed. Used both for
/// compression-pointer resolution and for any component that needs to
/// parse a name outside of a `BitReader` (e.g. TSIG owner name handling).
fn decode_labels_at(
    buf: &[u8],
    mut offset: usize,
    mut jumps: u32,
) -> Result<(Vec<String>, usize), ParseError> {
    let mut labels = Vec::new();

    loop {
        let first_byte = *buf.get(offset).ok_or(ParseError::UnexpectedEof)?;
        offset += 1;

        if first_byte == 0 {
            break;
        }

        if (first_byte & 0xC0) == 0xC0 {
            let second_byte = *buf.get(offset).ok_or(ParseError::UnexpectedEof)?;
            offset += 1;
            let pointer = ((first_byte as u16 & 0x3F) << 8) | second_byte as u16;

            jumps += 1;
            if jumps > MAX_POINTER_JUMPS {
                return Err(ParseError::CompressionLoop(MAX_POINTER_JUMPS));
            }

            let (pointer_labels, _) = decode_labels_at(buf, pointer as usize, jumps)?;
            labels.extend(pointer_labels);
            return Ok((labels, offset));
        }

        if first_byte > 63 {
            return Err(ParseError::InvalidLabel);
        }

        let len = first_byte as usize;
        let end = offset + len;
        let slice = buf.get(offset..end).ok_or(ParseError::UnexpectedEof)?;
        labels.push(String::from_utf8(slice.to_vec()).map_err(|_| ParseError::InvalidLabel)?);
        offset = end;
    }

    Ok((labels, offset))
}

/// Parse a domain name directly out of a packet buffer at `offset`,
/// returning the labels and the offset just past the name.
pub fn decode_domain_name_at(buf: &[u8], offset: usize) -> Result<(Vec<String>, usize), ParseError> {
    decode_labels_at(buf, offset, 0)
}

/// Render labels back into their dotted display form, e.g.
/// `["example", "com"]` -> `"example.com."`.
pub fn labels_to_display(labels: &[String]) -> String {
    if labels.is_empty() {
        return ".".to_string();
    }
    let mut s = labels.join(".");
    s.push('.');
    s
}

/// Split a dotted display-form domain name (trailing dot optional) into
/// wire labels, lowercased.
pub fn display_to_labels(name: &str) -> Vec<String> {
    let trimmed = name.trim_end_matches('.');
    if trimmed.is_empty() {
        return Vec::new();
    }
    trimmed.split('.').map(|s| s.to_lowercase()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_roundtrip() {
        let labels = display_to_labels("api.Example.com.");
        assert_eq!(labels, vec!["api", "example", "com"]);
        assert_eq!(labels_to_display(&labels), "api.example.com.");
    }

    #[test]
    fn root_label_is_single_dot() {
        assert_eq!(labels_to_display(&[]), ".");
        assert!(display_to_labels(".").is_empty());
    }
}
