use std::fs;
use std::io::Write;
use std::path::Path;

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Object, Stream};
use ragctx_core::error::ExtractError;
use ragctx_core::traits::TextExtractor;
use ragctx_core::types::Document;
use ragctx_extract::{extract_docx, extract_pdf, DocumentExtractor};
use tempfile::TempDir;
use zip::write::SimpleFileOptions;

fn write_docx(path: &Path, paragraphs: &[&str]) {
    let body: String = paragraphs
        .iter()
        .map(|p| format!("<w:p><w:r><w:t xml:space=\"preserve\">{p}</w:t></w:r></w:p>"))
        .collect();
    write_docx_body(path, &body);
}

fn write_docx_body(path: &Path, body: &str) {
    let xml = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
         <w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\"><w:body>{body}</w:body></w:document>"
    );
    let mut zip = zip::ZipWriter::new(fs::File::create(path).unwrap());
    zip.start_file("[Content_Types].xml", SimpleFileOptions::default()).unwrap();
    zip.write_all(b"<?xml version=\"1.0\"?><Types/>").unwrap();
    zip.start_file("word/document.xml", SimpleFileOptions::default()).unwrap();
    zip.write_all(xml.as_bytes()).unwrap();
    zip.finish().unwrap();
}

#[test]
fn plain_text_drops_undecodable_bytes() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("notes.txt");
    fs::write(&path, b"caf\xc3\xa9 \xff\xferockets").unwrap();

    let text = DocumentExtractor::new().extract(&Document::new(&path));
    assert_eq!(text, "café rockets");
}

#[test]
fn declared_type_overrides_extension() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("upload.bin");
    fs::write(&path, "dogs are mammals").unwrap();

    let doc = Document::with_media_type(&path, "text/plain");
    assert_eq!(DocumentExtractor::new().extract(&doc), "dogs are mammals");
}

#[test]
fn docx_paragraphs_are_joined_by_newlines() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("lecture.docx");
    write_docx(&path, &["Cats are mammals.", "", "Fish &amp; chips"]);

    let doc = Document::with_media_type(
        &path,
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    );
    let text = DocumentExtractor::new().try_extract(&doc).expect("docx");
    assert_eq!(text, "Cats are mammals.\nFish & chips");
}

#[test]
fn docx_page_break_keeps_words_apart() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("chapters.docx");
    write_docx_body(
        &path,
        "<w:p><w:r><w:t>chapter end</w:t></w:r><w:r><w:br w:type=\"page\"/></w:r><w:r><w:t>next start</w:t></w:r></w:p>",
    );

    let text = extract_docx(&path).expect("docx");
    assert_eq!(text.split_whitespace().collect::<Vec<_>>(), vec!["chapter", "end", "next", "start"]);
}

/// One page per entry; `None` is a page with an empty content stream.
fn write_pdf(path: &Path, pages: &[Option<&str>]) {
    let mut doc = lopdf::Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for text in pages {
        let operations = match text {
            Some(t) => vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 24.into()]),
                Operation::new("Td", vec![72.into(), 700.into()]),
                Operation::new("Tj", vec![Object::string_literal(*t)]),
                Operation::new("ET", vec![]),
            ],
            None => vec![],
        };
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.save(path).unwrap();
}

#[test]
fn pdf_pages_come_back_in_order_without_empty_pages() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("lecture.pdf");
    write_pdf(&path, &[Some("cats are mammals"), None, Some("rockets use thrust")]);

    let text = extract_pdf(&path).expect("pdf");
    let lines: Vec<&str> = text.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
    assert_eq!(lines, vec!["cats are mammals", "rockets use thrust"]);

    let via_trait = DocumentExtractor::new().extract(&Document::with_media_type(&path, "application/pdf"));
    assert_eq!(via_trait, text);
}

#[test]
fn docx_that_is_not_a_zip_is_a_parse_error() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("legacy.docx");
    fs::write(&path, "this is not a zip archive").unwrap();

    let doc = Document::new(&path);
    let err = DocumentExtractor::new().try_extract(&doc).unwrap_err();
    assert!(matches!(err, ExtractError::Parse { .. }), "got {err:?}");
    assert_eq!(DocumentExtractor::new().extract(&doc), "");
}

#[test]
fn corrupt_pdf_contributes_no_text() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("broken.pdf");
    fs::write(&path, "%PDF-1.5\nthis file stops here").unwrap();

    let doc = Document::new(&path);
    assert_eq!(DocumentExtractor::new().extract(&doc), "");
}

#[test]
fn unsupported_type_is_reported_and_degrades_to_empty() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("photo.png");
    fs::write(&path, [0x89, b'P', b'N', b'G']).unwrap();

    let doc = Document::with_media_type(&path, "image/png");
    let err = DocumentExtractor::new().try_extract(&doc).unwrap_err();
    assert!(matches!(err, ExtractError::Unsupported { .. }));
    assert_eq!(DocumentExtractor::new().extract(&doc), "");
}

#[test]
fn missing_file_is_an_io_error() {
    let tmp = TempDir::new().unwrap();
    let doc = Document::new(tmp.path().join("gone.txt"));
    let err = DocumentExtractor::new().try_extract(&doc).unwrap_err();
    assert!(matches!(err, ExtractError::Io { .. }));
}
