//! PDF page access using lopdf and pdf-extract.

use std::path::Path;
use std::sync::OnceLock;

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageBuffer, Luma, Rgb};
use lopdf::{Document, Object, ObjectId};
use tracing::{debug, trace, warn};

use super::{PageSource, Result};
use crate::error::PdfError;

/// Points per inch in PDF user space.
const POINTS_PER_INCH: f32 = 72.0;

/// A loaded PDF document.
pub struct PdfDocument {
    document: Document,
    /// Page object ids in page order.
    page_ids: Vec<ObjectId>,
    /// Decrypted file bytes, used by pdf-extract.
    raw_data: Vec<u8>,
    /// Per-page text from pdf-extract, computed on first use.
    fallback_text: OnceLock<Option<Vec<String>>>,
}

impl PdfDocument {
    /// Load a PDF from bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let mut document = Document::load_mem(data).map_err(|e| PdfError::Parse(e.to_string()))?;

        // Handle PDFs with empty password encryption
        let raw_data = if document.is_encrypted() {
            if document.decrypt("").is_err() {
                return Err(PdfError::Encrypted);
            }
            debug!("Decrypted PDF with empty password");

            let mut decrypted = Vec::new();
            document
                .save_to(&mut decrypted)
                .map_err(|e| PdfError::Parse(format!("Failed to save decrypted PDF: {}", e)))?;
            decrypted
        } else {
            data.to_vec()
        };

        let page_ids: Vec<ObjectId> = document.get_pages().into_values().collect();
        if page_ids.is_empty() {
            return Err(PdfError::NoPages);
        }

        debug!("Loaded PDF with {} pages", page_ids.len());
        Ok(Self {
            document,
            page_ids,
            raw_data,
            fallback_text: OnceLock::new(),
        })
    }

    /// Load a PDF from a file.
    pub fn open(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)
            .map_err(|e| PdfError::Parse(format!("{}: {}", path.display(), e)))?;
        Self::from_bytes(&data)
    }

    /// The underlying lopdf document.
    pub fn document(&self) -> &Document {
        &self.document
    }

    fn page_id(&self, index: usize) -> Result<ObjectId> {
        self.page_ids
            .get(index)
            .copied()
            .ok_or(PdfError::InvalidPage(index))
    }

    /// Text for one page from pdf-extract, used when lopdf finds nothing.
    fn fallback_page_text(&self, index: usize) -> Option<&str> {
        let pages = self.fallback_text.get_or_init(|| {
            // pdf-extract panics on some malformed fonts.
            let extracted = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                pdf_extract::extract_text_from_mem_by_pages(&self.raw_data)
            }));
            match extracted {
                Ok(Ok(pages)) => Some(pages),
                Ok(Err(e)) => {
                    debug!("pdf-extract failed: {}", e);
                    None
                }
                Err(_) => {
                    warn!("pdf-extract panicked, fallback text unavailable");
                    None
                }
            }
        });
        pages.as_ref()?.get(index).map(String::as_str)
    }

    /// Look up a page attribute, following the page tree for inherited values.
    fn inherited_attribute(&self, node_id: ObjectId, key: &[u8]) -> Option<&Object> {
        let dict = self.document.get_dictionary(node_id).ok()?;
        if let Ok(value) = dict.get(key) {
            return self.document.dereference(value).ok().map(|(_, obj)| obj);
        }
        match dict.get(b"Parent") {
            Ok(Object::Reference(parent_id)) => self.inherited_attribute(*parent_id, key),
            _ => None,
        }
    }

    /// Page size in points from the MediaBox.
    fn page_size_points(&self, page_id: ObjectId) -> Option<(f32, f32)> {
        let media_box = self.inherited_attribute(page_id, b"MediaBox")?.as_array().ok()?;
        if media_box.len() != 4 {
            return None;
        }
        let coords: Vec<f32> = media_box
            .iter()
            .map(|o| o.as_float().ok())
            .collect::<Option<_>>()?;
        let width = (coords[2] - coords[0]).abs();
        let height = (coords[3] - coords[1]).abs();
        (width > 0.0 && height > 0.0).then_some((width, height))
    }

    /// Images drawn directly from the page's XObject resources.
    fn page_images(&self, page_id: ObjectId) -> Vec<DynamicImage> {
        let doc = &self.document;
        let mut images = Vec::new();

        let Some(resources) = self.inherited_attribute(page_id, b"Resources") else {
            return images;
        };
        let Ok(resources) = resources.as_dict() else {
            return images;
        };

        if let Ok(xobjects) = resources.get(b"XObject") {
            if let Ok((_, Object::Dictionary(xobj_dict))) = doc.dereference(xobjects) {
                for (_name, obj_ref) in xobj_dict.iter() {
                    if let Ok((_, obj)) = doc.dereference(obj_ref) {
                        if let Some(img) = self.try_extract_image_from_object(obj) {
                            images.push(img);
                        }
                    }
                }
            }
        }

        images
    }

    fn try_extract_image_from_object(&self, obj: &Object) -> Option<DynamicImage> {
        let Object::Stream(stream) = obj else {
            return None;
        };
        let dict = &stream.dict;

        // Check if it's an image XObject
        if dict.get(b"Subtype").ok()?.as_name().ok()? != b"Image" {
            return None;
        }

        let width = dict.get(b"Width").ok()?.as_i64().ok()? as u32;
        let height = dict.get(b"Height").ok()?.as_i64().ok()? as u32;

        trace!("Found image object: {}x{}", width, height);

        if let Ok(filter) = dict.get(b"Filter") {
            let filter_name = match filter {
                Object::Name(name) => Some(name.as_slice()),
                Object::Array(arr) if !arr.is_empty() => {
                    arr.first().and_then(|o| o.as_name().ok())
                }
                _ => None,
            };

            match filter_name {
                Some(b"DCTDecode") => {
                    trace!("Decoding JPEG image");
                    return image::load_from_memory_with_format(
                        &stream.content,
                        image::ImageFormat::Jpeg,
                    )
                    .ok();
                }
                Some(b"JPXDecode") | Some(b"CCITTFaxDecode") | Some(b"JBIG2Decode") => {
                    trace!("Unsupported image filter {:?}", filter_name.map(String::from_utf8_lossy));
                    return None;
                }
                _ => {}
            }
        }

        let data = stream
            .decompressed_content()
            .unwrap_or_else(|_| stream.content.clone());

        let color_space = dict
            .get(b"ColorSpace")
            .ok()
            .and_then(|o| match o {
                Object::Name(name) => Some(name.as_slice()),
                Object::Array(arr) => arr.first().and_then(|o| o.as_name().ok()),
                Object::Reference(r) => self
                    .document
                    .get_object(*r)
                    .ok()
                    .and_then(|o| o.as_name().ok()),
                _ => None,
            })
            .unwrap_or(b"DeviceRGB");

        let bits = dict
            .get(b"BitsPerComponent")
            .ok()
            .and_then(|o| o.as_i64().ok())
            .unwrap_or(8) as u8;

        create_image_from_raw(&data, width, height, color_space, bits)
    }
}

/// Decode uncompressed 8-bit gray or RGB samples.
fn create_image_from_raw(
    data: &[u8],
    width: u32,
    height: u32,
    color_space: &[u8],
    bits_per_component: u8,
) -> Option<DynamicImage> {
    if bits_per_component != 8 {
        trace!("Unsupported bits per component: {}", bits_per_component);
        return None;
    }

    let pixels = width as usize * height as usize;
    match color_space {
        b"DeviceRGB" | b"RGB" | b"CalRGB" if data.len() >= pixels * 3 => {
            ImageBuffer::<Rgb<u8>, _>::from_raw(width, height, data[..pixels * 3].to_vec())
                .map(DynamicImage::ImageRgb8)
        }
        b"DeviceGray" | b"G" | b"CalGray" if data.len() >= pixels => {
            ImageBuffer::<Luma<u8>, _>::from_raw(width, height, data[..pixels].to_vec())
                .map(DynamicImage::ImageLuma8)
        }
        _ => {
            trace!(
                "Could not decode image: data_len={}, colorspace={}",
                data.len(),
                String::from_utf8_lossy(color_space)
            );
            None
        }
    }
}

/// Target pixel dimensions for a page of `size_pt` points at `dpi`.
fn dimensions_at_dpi(size_pt: (f32, f32), dpi: u32) -> (u32, u32) {
    let scale = dpi as f32 / POINTS_PER_INCH;
    let width = (size_pt.0 * scale).round() as u32;
    let height = (size_pt.1 * scale).round() as u32;
    (width.max(1), height.max(1))
}

impl PageSource for PdfDocument {
    fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    fn page_text(&self, index: usize) -> Result<String> {
        self.page_id(index)?;
        let page_number = index as u32 + 1;

        match self.document.extract_text(&[page_number]) {
            Ok(text) if !text.trim().is_empty() => return Ok(text),
            Ok(_) => trace!("lopdf found no text on page {}", index),
            Err(e) => debug!("lopdf text extraction failed on page {}: {}", index, e),
        }

        Ok(self
            .fallback_page_text(index)
            .map(str::to_string)
            .unwrap_or_default())
    }

    /// Scanned pages are drawn from an embedded image; the largest image on
    /// the page is taken as the page raster and resampled to the page size at
    /// `dpi`.
    fn render_page(&self, index: usize, dpi: u32) -> Result<DynamicImage> {
        let page_id = self.page_id(index)?;

        let image = self
            .page_images(page_id)
            .into_iter()
            .max_by_key(|img| img.width() as u64 * img.height() as u64)
            .ok_or_else(|| {
                PdfError::Render(format!("page {} has no decodable images", index))
            })?;

        let Some(size_pt) = self.page_size_points(page_id) else {
            warn!("Page {} has no usable MediaBox, using native image size", index);
            return Ok(image);
        };

        let (width, height) = dimensions_at_dpi(size_pt, dpi);
        if image.dimensions() == (width, height) {
            return Ok(image);
        }

        debug!(
            "Resampling page {} image {}x{} -> {}x{} ({} DPI)",
            index,
            image.width(),
            image.height(),
            width,
            height,
            dpi
        );
        Ok(image.resize_exact(width, height, FilterType::Triangle))
    }
}

impl std::fmt::Debug for PdfDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfDocument")
            .field("pages", &self.page_ids.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::fixtures::{build_pdf, FixturePage};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_page_count() {
        let data = build_pdf(&[
            FixturePage::Text("first"),
            FixturePage::Blank,
            FixturePage::Text("third"),
        ]);
        let doc = PdfDocument::from_bytes(&data).unwrap();
        assert_eq!(doc.page_count(), 3);
    }

    #[test]
    fn test_page_text() {
        let data = build_pdf(&[FixturePage::Text("Invoice Number 42"), FixturePage::Blank]);
        let doc = PdfDocument::from_bytes(&data).unwrap();
        assert!(doc.page_text(0).unwrap().contains("Invoice Number 42"));
        assert!(doc.page_text(1).unwrap().trim().is_empty());
    }

    #[test]
    fn test_invalid_page() {
        let data = build_pdf(&[FixturePage::Blank]);
        let doc = PdfDocument::from_bytes(&data).unwrap();
        assert!(matches!(doc.page_text(5), Err(PdfError::InvalidPage(5))));
        assert!(matches!(doc.render_page(5, 72), Err(PdfError::InvalidPage(5))));
    }

    #[test]
    fn test_render_scanned_page_at_dpi() {
        let data = build_pdf(&[FixturePage::GrayImage {
            width: 4,
            height: 2,
            pixels: vec![0, 255, 0, 255, 255, 0, 255, 0],
        }]);
        let doc = PdfDocument::from_bytes(&data).unwrap();

        // Fixture pages are 72 x 36 points.
        let image = doc.render_page(0, 144).unwrap();
        assert_eq!(image.dimensions(), (144, 72));

        // At 4 DPI the 72pt width maps onto the image's own 4 pixels.
        let native = doc.render_page(0, 4).unwrap();
        assert_eq!(native.dimensions(), (4, 2));
    }

    #[test]
    fn test_render_page_without_image_fails() {
        let data = build_pdf(&[FixturePage::Blank]);
        let doc = PdfDocument::from_bytes(&data).unwrap();
        assert!(matches!(doc.render_page(0, 400), Err(PdfError::Render(_))));
    }

    #[test]
    fn test_garbage_bytes() {
        assert!(matches!(
            PdfDocument::from_bytes(b"not a pdf"),
            Err(PdfError::Parse(_))
        ));
    }

    #[test]
    fn test_dimensions_at_dpi() {
        assert_eq!(dimensions_at_dpi((612.0, 792.0), 400), (3400, 4400));
        assert_eq!(dimensions_at_dpi((0.1, 0.1), 72), (1, 1));
    }
}
