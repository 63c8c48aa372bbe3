use std::io::{self, BufRead, Cursor, Read};

use flate2::bufread::MultiGzDecoder;

use super::error::LoadError;

pub const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

pub fn is_gzip(bytes: &[u8]) -> bool {
    bytes.starts_with(&GZIP_MAGIC)
}

/// Peeks at the head of `reader` and wraps it in a gzip decoder when the magic
/// number is present. Nothing is lost from the stream either way.
pub fn sniff_gzip<'a, R: BufRead + 'a>(mut reader: R) -> io::Result<Box<dyn Read + 'a>> {
    let (available, gzipped) = {
        let head = reader.fill_buf()?;
        (head.len(), is_gzip(head))
    };

    if available == 0 || available >= GZIP_MAGIC.len() {
        return Ok(if gzipped {
            Box::new(MultiGzDecoder::new(reader))
        } else {
            Box::new(reader)
        });
    }

    // The buffer came back short, so the header has to be consumed and stitched
    // back in front of the remaining stream.
    let mut prefix = Vec::with_capacity(GZIP_MAGIC.len());
    while prefix.len() < GZIP_MAGIC.len() {
        let buf = reader.fill_buf()?;
        if buf.is_empty() {
            break;
        }
        let take = (GZIP_MAGIC.len() - prefix.len()).min(buf.len());
        prefix.extend_from_slice(&buf[..take]);
        reader.consume(take);
    }

    let gzipped = is_gzip(&prefix);
    let stream = Cursor::new(prefix).chain(reader);
    Ok(if gzipped {
        Box::new(MultiGzDecoder::new(stream))
    } else {
        Box::new(stream)
    })
}

/// Decodes a fetched body, decompressing it when it turns out to be gzip.
pub fn decode_bytes(name: &str, bytes: &[u8]) -> Result<Vec<u8>, LoadError> {
    let decompress_err = |source| LoadError::Decompress {
        name: name.to_string(),
        source,
    };

    let mut reader = sniff_gzip(Cursor::new(bytes)).map_err(decompress_err)?;
    let mut out = Vec::with_capacity(bytes.len());
    reader.read_to_end(&mut out).map_err(decompress_err)?;
    Ok(out)
}
