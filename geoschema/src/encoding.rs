//! Décodage du texte source avec repli sur plusieurs encodages

use std::borrow::Cow;

use encoding_rs::{UTF_8, WINDOWS_1252};
use tracing::debug;

use crate::InspectError;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Encodage candidat pour un fichier source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceEncoding {
    Utf8,
    /// ISO-8859-1: chaque octet est le point de code de même valeur.
    /// `encoding_rs` assimile ce label à windows-1252, d'où un cas à part.
    Latin1,
    Windows1252,
}

impl SourceEncoding {
    pub fn label(self) -> &'static str {
        match self {
            Self::Utf8 => "UTF-8",
            Self::Latin1 => "ISO-8859-1",
            Self::Windows1252 => "windows-1252",
        }
    }

    /// Décodage strict; `None` si une séquence est invalide
    pub fn decode(self, bytes: &[u8]) -> Option<Cow<'_, str>> {
        match self {
            Self::Utf8 => {
                let input = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
                UTF_8.decode_without_bom_handling_and_without_replacement(input)
            }
            Self::Latin1 => Some(encoding_rs::mem::decode_latin1(bytes)),
            Self::Windows1252 => {
                WINDOWS_1252.decode_without_bom_handling_and_without_replacement(bytes)
            }
        }
    }
}

/// Encodages essayés dans l'ordre par défaut
///
/// Latin-1 accepte n'importe quel octet: windows-1252 ne sert qu'aux listes
/// explicites qui omettent Latin-1.
pub fn default_encodings() -> [SourceEncoding; 3] {
    [
        SourceEncoding::Utf8,
        SourceEncoding::Latin1,
        SourceEncoding::Windows1252,
    ]
}

/// Décode `bytes` avec le premier encodage de la liste qui réussit.
///
/// Le décodage est strict: une séquence invalide fait passer à l'encodage
/// suivant au lieu d'insérer des caractères de remplacement. Le BOM UTF-8
/// éventuel est retiré.
///
/// # Errors
///
/// `InspectError::Decoding` (avec la liste des encodages tentés) si aucun
/// encodage ne convient.
pub fn decode_text<'a>(
    bytes: &'a [u8],
    encodings: &[SourceEncoding],
) -> Result<(Cow<'a, str>, SourceEncoding), InspectError> {
    for &encoding in encodings {
        match encoding.decode(bytes) {
            Some(text) => {
                debug!(encoding = encoding.label(), "Decoded input");
                return Ok((text, encoding));
            }
            None => debug!(encoding = encoding.label(), "Decoding failed, trying next"),
        }
    }

    Err(InspectError::Decoding {
        encodings: encodings.iter().map(|e| e.label()).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utf8_first() {
        let (text, encoding) = decode_text("café".as_bytes(), &default_encodings()).unwrap();
        assert_eq!(text, "café");
        assert_eq!(encoding, SourceEncoding::Utf8);
    }

    #[test]
    fn test_utf8_bom_is_stripped() {
        let mut bytes = UTF8_BOM.to_vec();
        bytes.extend_from_slice(br#"{"a":1}"#);
        let (text, _) = decode_text(&bytes, &default_encodings()).unwrap();
        assert_eq!(text, r#"{"a":1}"#);
    }

    #[test]
    fn test_latin_fallback() {
        // "café" en Latin-1: 0xE9 seul n'est pas de l'UTF-8 valide
        let bytes = [b'c', b'a', b'f', 0xE9];
        let (text, encoding) = decode_text(&bytes, &default_encodings()).unwrap();
        assert_eq!(text, "café");
        assert_eq!(encoding, SourceEncoding::Latin1);
    }

    #[test]
    fn test_latin1_is_not_latin9() {
        // 0xA4: symbole monétaire en Latin-1, euro en Latin-9 et cp1252
        let (text, _) = decode_text(&[0xA4], &default_encodings()).unwrap();
        assert_eq!(text, "\u{A4}");

        let (text, encoding) = decode_text(&[0xA4], &[SourceEncoding::Windows1252]).unwrap();
        assert_eq!(text, "€");
        assert_eq!(encoding.label(), "windows-1252");
    }

    #[test]
    fn test_all_encodings_fail() {
        let bytes = [0xFF, 0xFE, 0xE9];
        let err = decode_text(&bytes, &[SourceEncoding::Utf8]).unwrap_err();
        match &err {
            InspectError::Decoding { encodings } => assert_eq!(encodings, &vec!["UTF-8"]),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.to_string().contains("UTF-8"));
    }
}
