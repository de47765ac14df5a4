//! OOXML package access: ZIP parts and XML helpers shared by the readers

use crate::error::{ConvertError, Result};
use quick_xml::events::BytesStart;
use quick_xml::Reader;
use std::io::{Cursor, Read};
use zip::ZipArchive;

/// An Office Open XML file opened from memory.
pub struct OfficePackage<'a> {
    archive: ZipArchive<Cursor<&'a [u8]>>,
}

impl<'a> OfficePackage<'a> {
    pub fn open(bytes: &'a [u8]) -> Result<Self> {
        let archive = ZipArchive::new(Cursor::new(bytes))?;
        Ok(Self { archive })
    }

    /// Read a part as UTF-8 text.
    pub fn read_part(&mut self, path: &str) -> Result<String> {
        let mut file = self.archive.by_name(path).map_err(|e| match e {
            zip::result::ZipError::FileNotFound => ConvertError::MissingPart(path.to_string()),
            other => ConvertError::from(other),
        })?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)?;
        Ok(contents)
    }

    pub fn part_names(&self) -> Vec<String> {
        self.archive.file_names().map(str::to_string).collect()
    }
}

/// XML reader that keeps whitespace inside text runs.
pub fn xml_reader(content: &str) -> Reader<&[u8]> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(false);
    reader
}

/// Value of the attribute whose local name is `local`, ignoring its prefix.
pub fn attribute(event: &BytesStart, local: &[u8]) -> Option<String> {
    event
        .attributes()
        .filter_map(|a| a.ok())
        .find(|a| a.key.local_name().as_ref() == local)
        .map(|a| String::from_utf8_lossy(&a.value).into_owned())
}


#[cfg(test)]
mod tests {
    use super::fixtures::build_package;
    use super::*;

    #[test]
    fn test_read_part_and_missing_part() {
        let bytes = build_package(&[("word/document.xml", "<w:document/>")]);
        let mut package = OfficePackage::open(&bytes).unwrap();

        assert_eq!(package.read_part("word/document.xml").unwrap(), "<w:document/>");
        assert!(matches!(
            package.read_part("word/styles.xml"),
            Err(ConvertError::MissingPart(part)) if part == "word/styles.xml"
        ));
    }

    #[test]
    fn test_not_a_zip() {
        assert!(matches!(
            OfficePackage::open(b"%PDF-1.7"),
            Err(ConvertError::Archive(_))
        ));
    }

    #[test]
    fn test_attribute_ignores_prefix() {
        let mut reader = xml_reader(r#"<w:pStyle w:val="Heading2"/>"#);
        match reader.read_event().unwrap() {
            quick_xml::events::Event::Empty(e) => {
                assert_eq!(attribute(&e, b"val").as_deref(), Some("Heading2"));
                assert_eq!(attribute(&e, b"missing"), None);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }
}
