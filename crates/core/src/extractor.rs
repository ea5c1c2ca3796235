use crate::error::ExtractionError;
use lopdf::Document;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageText {
    pub index: u32,
    pub text: String,
}

impl PageText {
    pub fn new(index: u32, text: impl Into<String>) -> Self {
        Self {
            index,
            text: text.into(),
        }
    }

    pub fn page_number(&self) -> u32 {
        self.index + 1
    }
}

pub trait PdfExtractor {
    fn extract_pages(&self, pdf: &[u8]) -> Result<Vec<PageText>, ExtractionError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LopdfExtractor;

impl PdfExtractor for LopdfExtractor {
    fn extract_pages(&self, pdf: &[u8]) -> Result<Vec<PageText>, ExtractionError> {
        let document =
            Document::load_mem(pdf).map_err(|error| ExtractionError::PdfParse(error.to_string()))?;

        let mut pages = Vec::new();
        for (index, (page_no, _page_id)) in document.get_pages().into_iter().enumerate() {
            // Image-only pages come back empty and still keep their slot.
            let text = document
                .extract_text(&[page_no])
                .map_err(|error| ExtractionError::PdfParse(error.to_string()))?;

            pages.push(PageText {
                index: index as u32,
                text,
            });
        }

        debug!(pages = pages.len(), bytes = pdf.len(), "extracted pdf text");
        Ok(pages)
    }
}

pub fn extract_page_texts(pdf: &[u8]) -> Result<Vec<PageText>, ExtractionError> {
    LopdfExtractor.extract_pages(pdf)
}

pub fn read_pdf(path: &Path) -> Result<Vec<u8>, ExtractionError> {
    Ok(std::fs::read(path)?)
}

#[cfg(test)]
pub(crate) fn sample_pdf(page_texts: &[&str]) -> Vec<u8> {
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Object, Stream};

    let mut document = Document::with_version("1.5");
    let pages_id = document.new_object_id();
    let font_id = document.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = document.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut kids: Vec<Object> = Vec::new();
    for text in page_texts {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let encoded = content.encode().unwrap_or_default();
        let content_id = document.add_object(Stream::new(dictionary! {}, encoded));
        let page_id = document.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    document.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );
    let catalog_id = document.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    document.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    document
        .save_to(&mut bytes)
        .expect("in-memory pdf should serialize");
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pages_are_extracted_in_document_order() {
        let pdf = sample_pdf(&["Deep sea fauna", "Supervised machine learning", "Tidal charts"]);

        let pages = extract_page_texts(&pdf).expect("generated pdf should parse");

        assert_eq!(pages.len(), 3);
        assert_eq!(pages[0].index, 0);
        assert_eq!(pages[2].page_number(), 3);
        assert!(pages[1].text.contains("machine learning"));
    }

    #[test]
    fn zero_page_document_yields_no_pages() {
        let pdf = sample_pdf(&[]);

        let pages = extract_page_texts(&pdf).expect("empty pdf should parse");

        assert!(pages.is_empty());
    }

    #[test]
    fn malformed_bytes_are_a_parse_error() {
        let result = extract_page_texts(b"%PDF-1.4\n%broken");

        assert!(matches!(result, Err(ExtractionError::PdfParse(_))));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let result = read_pdf(Path::new("/nonexistent/definitely-missing.pdf"));

        assert!(matches!(result, Err(ExtractionError::Io(_))));
    }
}
