//! Byte-order-mark detection and stripping (supplemental to the donor's
//! line-ending pass — MFC/Windows `.rc`/`.h` sources are commonly saved with
//! a UTF-8 BOM by Visual Studio, which must round-trip through a save).

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bom {
    Utf8,
}

impl Bom {
    pub fn bytes(self) -> &'static [u8] {
        match self {
            Bom::Utf8 => &[0xEF, 0xBB, 0xBF],
        }
    }
}

/// Strips a leading UTF-8 BOM if present, returning the remaining bytes and
/// whether one was found.
pub fn strip_bom(bytes: &[u8]) -> (&[u8], Option<Bom>) {
    if bytes.starts_with(Bom::Utf8.bytes()) {
        (&bytes[3..], Some(Bom::Utf8))
    } else {
        (bytes, None)
    }
}

/// Re-prepends the BOM removed by [`strip_bom`] when serializing for save.
pub fn with_bom(text: &str, bom: Option<Bom>) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len() + 3);
    if let Some(bom) = bom {
        out.extend_from_slice(bom.bytes());
    }
    out.extend_from_slice(text.as_bytes());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_and_restores_utf8_bom() {
        let mut bytes = Bom::Utf8.bytes().to_vec();
        bytes.extend_from_slice(b"hello");
        let (stripped, bom) = strip_bom(&bytes);
        assert_eq!(stripped, b"hello");
        assert_eq!(bom, Some(Bom::Utf8));
        assert_eq!(with_bom("hello", bom), bytes);
    }

    #[test]
    fn no_bom_passes_through() {
        let (stripped, bom) = strip_bom(b"hello");
        assert_eq!(stripped, b"hello");
        assert_eq!(bom, None);
    }
}
