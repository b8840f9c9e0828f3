//! Minimal PDF writer: one landscape page per slide, each page a single
//! full-bleed JPEG.

use lopdf::{
    content::{Content, Operation},
    dictionary, Dictionary, Document, Object, ObjectId, Stream,
};

use crate::error::ExportError;

/// 254 mm x 142.875 mm.
pub const PAGE_WIDTH_PT: i64 = 720;
pub const PAGE_HEIGHT_PT: i64 = 405;

const IMAGE_NAME: &str = "Im0";

pub struct SlideDocument {
    doc: Document,
    pages_id: ObjectId,
    page_ids: Vec<ObjectId>,
}

impl Default for SlideDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl SlideDocument {
    pub fn new() -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        Self {
            doc,
            pages_id,
            page_ids: Vec::new(),
        }
    }

    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    /// Appends a page showing `jpeg` stretched over the whole media box.
    pub fn push_jpeg_page(
        &mut self,
        jpeg: Vec<u8>,
        width_px: u32,
        height_px: u32,
    ) -> Result<(), ExportError> {
        let image = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => Object::Integer(i64::from(width_px)),
                "Height" => Object::Integer(i64::from(height_px)),
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => Object::Integer(8),
                "Filter" => "DCTDecode",
            },
            jpeg,
        )
        .with_compression(false);
        let image_id = self.doc.add_object(image);

        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        Object::Integer(PAGE_WIDTH_PT),
                        Object::Integer(0),
                        Object::Integer(0),
                        Object::Integer(PAGE_HEIGHT_PT),
                        Object::Integer(0),
                        Object::Integer(0),
                    ],
                ),
                Operation::new("Do", vec![Object::Name(IMAGE_NAME.as_bytes().to_vec())]),
                Operation::new("Q", vec![]),
            ],
        };
        let encoded = content
            .encode()
            .map_err(|err| ExportError::Document(err.to_string()))?;
        let content_id = self
            .doc
            .add_object(Stream::new(Dictionary::new(), encoded));

        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(PAGE_WIDTH_PT),
                Object::Integer(PAGE_HEIGHT_PT),
            ],
            "Contents" => content_id,
            "Resources" => dictionary! {
                "XObject" => dictionary! {
                    IMAGE_NAME => image_id,
                },
            },
        });
        self.page_ids.push(page_id);
        Ok(())
    }

    /// Writes the page tree and catalog and serializes the document.
    pub fn finish(mut self) -> Result<Vec<u8>, ExportError> {
        let kids: Vec<Object> = self.page_ids.iter().copied().map(Object::Reference).collect();
        let count = kids.len() as i64;
        self.doc.objects.insert(
            self.pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => Object::Integer(count),
            }),
        );
        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.doc.trailer.set("Root", catalog_id);

        let mut out = Vec::new();
        self.doc
            .save_to(&mut out)
            .map_err(|err| ExportError::Document(err.to_string()))?;
        Ok(out)
    }
}
