//! Plain text → EPUB 3
//!
//! Produces a single-chapter book:
//!
//! ```text
//! mimetype                   (stored, first entry)
//! META-INF/container.xml
//! OEBPS/content.opf          (metadata, manifest, spine)
//! OEBPS/nav.xhtml            (EPUB 3 navigation document)
//! OEBPS/toc.ncx              (EPUB 2 table of contents)
//! OEBPS/text/chapter.xhtml   (the text)
//! ```

use std::io::{Cursor, Write};
use std::path::Path;

use chrono::{SecondsFormat, Utc};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use tracing::debug;
use uuid::Uuid;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::text::text_to_xhtml;
use super::{commit, read_text, staging_file, title_from_path, GenerationError};

const CONTAINER_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>
"#;

const CHAPTER_HREF: &str = "text/chapter.xhtml";

/// Book-level metadata written into the package document
struct BookMeta {
    title: String,
    identifier: String,
    modified: String,
}

/// Wrap a UTF-8 text file as a single-chapter EPUB
pub fn text_to_epub(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Result<(), GenerationError> {
    let (input, output) = (input.as_ref(), output.as_ref());
    let text = read_text(input)?;
    let meta = BookMeta {
        title: title_from_path(input),
        identifier: format!("urn:uuid:{}", Uuid::new_v4()),
        modified: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
    };

    let opf = package_document(&meta).map_err(|e| GenerationError::Backend(e.to_string()))?;
    let ncx = ncx_document(&meta).map_err(|e| GenerationError::Backend(e.to_string()))?;
    let nav = nav_document(&meta.title);
    let chapter = text_to_xhtml(&meta.title, &text);

    let staged = staging_file(output)?;
    let write_err = |e: std::io::Error| GenerationError::unwritable(output, e);
    {
        let mut zip = ZipWriter::new(staged.as_file());
        let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        let entries: [(&str, &[u8], SimpleFileOptions); 6] = [
            ("mimetype", b"application/epub+zip", stored),
            ("META-INF/container.xml", CONTAINER_XML.as_bytes(), deflated),
            ("OEBPS/content.opf", opf.as_bytes(), deflated),
            ("OEBPS/nav.xhtml", nav.as_bytes(), deflated),
            ("OEBPS/toc.ncx", ncx.as_bytes(), deflated),
            ("OEBPS/text/chapter.xhtml", chapter.as_bytes(), deflated),
        ];
        for (name, data, options) in entries {
            zip.start_file(name, options)
                .map_err(|e| GenerationError::unwritable(output, e))?;
            zip.write_all(data).map_err(write_err)?;
        }
        zip.finish().map_err(|e| GenerationError::unwritable(output, e))?;
    }
    staged.as_file().sync_all().map_err(write_err)?;

    debug!(title = %meta.title, output = %output.display(), "Wrote EPUB");
    commit(staged.into_temp_path(), output)
}

type XmlResult<T> = Result<T, quick_xml::Error>;

fn package_document(meta: &BookMeta) -> XmlResult<String> {
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut package = BytesStart::new("package");
    package.push_attribute(("xmlns", "http://www.idpf.org/2007/opf"));
    package.push_attribute(("version", "3.0"));
    package.push_attribute(("unique-identifier", "bookid"));
    writer.write_event(Event::Start(package))?;

    let mut metadata = BytesStart::new("metadata");
    metadata.push_attribute(("xmlns:dc", "http://purl.org/dc/elements/1.1/"));
    writer.write_event(Event::Start(metadata))?;
    let mut identifier = BytesStart::new("dc:identifier");
    identifier.push_attribute(("id", "bookid"));
    write_text_element(&mut writer, identifier, &meta.identifier)?;
    write_text_element(&mut writer, BytesStart::new("dc:title"), &meta.title)?;
    write_text_element(&mut writer, BytesStart::new("dc:language"), "en")?;
    let mut modified = BytesStart::new("meta");
    modified.push_attribute(("property", "dcterms:modified"));
    write_text_element(&mut writer, modified, &meta.modified)?;
    writer.write_event(Event::End(BytesEnd::new("metadata")))?;

    writer.write_event(Event::Start(BytesStart::new("manifest")))?;
    let items = [
        ("nav", "nav.xhtml", "application/xhtml+xml", Some("nav")),
        ("ncx", "toc.ncx", "application/x-dtbncx+xml", None),
        ("chapter", CHAPTER_HREF, "application/xhtml+xml", None),
    ];
    for (id, href, media_type, properties) in items {
        let mut item = BytesStart::new("item");
        item.push_attribute(("id", id));
        item.push_attribute(("href", href));
        item.push_attribute(("media-type", media_type));
        if let Some(properties) = properties {
            item.push_attribute(("properties", properties));
        }
        writer.write_event(Event::Empty(item))?;
    }
    writer.write_event(Event::End(BytesEnd::new("manifest")))?;

    let mut spine = BytesStart::new("spine");
    spine.push_attribute(("toc", "ncx"));
    writer.write_event(Event::Start(spine))?;
    let mut itemref = BytesStart::new("itemref");
    itemref.push_attribute(("idref", "chapter"));
    writer.write_event(Event::Empty(itemref))?;
    writer.write_event(Event::End(BytesEnd::new("spine")))?;

    writer.write_event(Event::End(BytesEnd::new("package")))?;
    into_string(writer)
}

fn ncx_document(meta: &BookMeta) -> XmlResult<String> {
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut ncx = BytesStart::new("ncx");
    ncx.push_attribute(("xmlns", "http://www.daisy.org/z3986/2005/ncx/"));
    ncx.push_attribute(("version", "2005-1"));
    writer.write_event(Event::Start(ncx))?;

    writer.write_event(Event::Start(BytesStart::new("head")))?;
    let mut uid = BytesStart::new("meta");
    uid.push_attribute(("name", "dtb:uid"));
    uid.push_attribute(("content", meta.identifier.as_str()));
    writer.write_event(Event::Empty(uid))?;
    writer.write_event(Event::End(BytesEnd::new("head")))?;

    writer.write_event(Event::Start(BytesStart::new("docTitle")))?;
    write_text_element(&mut writer, BytesStart::new("text"), &meta.title)?;
    writer.write_event(Event::End(BytesEnd::new("docTitle")))?;

    writer.write_event(Event::Start(BytesStart::new("navMap")))?;
    let mut point = BytesStart::new("navPoint");
    point.push_attribute(("id", "chapter"));
    point.push_attribute(("playOrder", "1"));
    writer.write_event(Event::Start(point))?;
    writer.write_event(Event::Start(BytesStart::new("navLabel")))?;
    write_text_element(&mut writer, BytesStart::new("text"), &meta.title)?;
    writer.write_event(Event::End(BytesEnd::new("navLabel")))?;
    let mut content = BytesStart::new("content");
    content.push_attribute(("src", CHAPTER_HREF));
    writer.write_event(Event::Empty(content))?;
    writer.write_event(Event::End(BytesEnd::new("navPoint")))?;
    writer.write_event(Event::End(BytesEnd::new("navMap")))?;

    writer.write_event(Event::End(BytesEnd::new("ncx")))?;
    into_string(writer)
}

fn nav_document(title: &str) -> String {
    let title = html_escape::encode_text(title);
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <html xmlns=\"http://www.w3.org/1999/xhtml\" xmlns:epub=\"http://www.idpf.org/2007/ops\">\n\
         <head><title>{title}</title></head>\n\
         <body><nav epub:type=\"toc\"><ol><li><a href=\"{CHAPTER_HREF}\">{title}</a></li></ol></nav></body>\n\
         </html>\n"
    )
}

fn write_text_element<W: Write>(writer: &mut Writer<W>, start: BytesStart<'_>, text: &str) -> XmlResult<()> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    writer.write_event(Event::Start(start))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

fn into_string(writer: Writer<Cursor<Vec<u8>>>) -> XmlResult<String> {
    // Every event was built from &str, so the buffer is UTF-8
    Ok(String::from_utf8_lossy(&writer.into_inner().into_inner()).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::epub::EpubPackage;

    fn meta() -> BookMeta {
        BookMeta {
            title: "Notes & Thoughts".to_string(),
            identifier: "urn:uuid:0000".to_string(),
            modified: "2024-01-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn test_package_document_shape() {
        let opf = package_document(&meta()).unwrap();
        assert!(opf.contains(r#"<dc:title>Notes &amp; Thoughts</dc:title>"#));
        assert!(opf.contains(r#"<meta property="dcterms:modified">2024-01-01T00:00:00Z</meta>"#));
        assert!(opf.contains(r#"<itemref idref="chapter"/>"#));
        assert!(opf.contains(r#"properties="nav""#));
    }

    #[test]
    fn test_ncx_references_chapter() {
        let ncx = ncx_document(&meta()).unwrap();
        assert!(ncx.contains(r#"<content src="text/chapter.xhtml"/>"#));
        assert!(ncx.contains(r#"content="urn:uuid:0000""#));
    }

    #[test]
    fn test_generated_epub_is_readable() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("diary.txt");
        std::fs::write(&input, "Dear diary,\n\ntoday was <fine>.").unwrap();
        let output = dir.path().join("diary.epub");

        text_to_epub(&input, &output).unwrap();

        let package = EpubPackage::open(&output).unwrap();
        assert_eq!(package.metadata().title.as_deref(), Some("diary"));
        assert_eq!(package.spine().len(), 1);
        assert_eq!(package.spine()[0].archive_path, "OEBPS/text/chapter.xhtml");
        assert!(package
            .metadata()
            .identifier
            .as_deref()
            .is_some_and(|id| id.starts_with("urn:uuid:")));
    }

    #[test]
    fn test_mimetype_is_first_and_stored() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("a.txt");
        std::fs::write(&input, "hello").unwrap();
        let output = dir.path().join("a.epub");
        text_to_epub(&input, &output).unwrap();

        let mut archive = zip::ZipArchive::new(std::fs::File::open(&output).unwrap()).unwrap();
        let first = archive.by_index(0).unwrap();
        assert_eq!(first.name(), "mimetype");
        assert_eq!(first.compression(), CompressionMethod::Stored);
    }

    #[test]
    fn test_unwritable_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("a.txt");
        std::fs::write(&input, "hello").unwrap();
        let err = text_to_epub(&input, dir.path().join("missing").join("a.epub")).unwrap_err();
        assert!(matches!(err, GenerationError::UnwritableOutput { .. }));
    }
}
