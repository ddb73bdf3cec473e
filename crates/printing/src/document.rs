use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::error::PrintError;
use crate::job::{mm_to_points, Orientation};
use crate::raster::RasterPage;

/// Suggested file name of a downloaded label sheet.
pub const DOWNLOAD_FILE_NAME: &str = "labels.pdf";
pub const PDF_MIME_TYPE: &str = "application/pdf";

/// One physical page: a raster stretched over the declared millimetre size.
/// 單一實體頁面：點陣影像填滿宣告的公釐尺寸。
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentPage {
    pub raster: RasterPage,
    pub width_mm: f64,
    pub height_mm: f64,
}

/// An assembled multi-page document, every page sharing the same size.
/// 組裝完成的多頁文件，各頁尺寸一致。
#[derive(Debug, Clone, PartialEq)]
pub struct PrintDocument {
    pages: Vec<DocumentPage>,
    orientation: Orientation,
}

/// Bytes offered to the user as a local save.
/// 提供使用者本機儲存的檔案內容。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadArtifact {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Places each raster 1:1 on its own page of `width_mm` x `height_mm`.
/// 將每張點陣影像 1:1 放置於 `width_mm` x `height_mm` 的獨立頁面。
pub fn assemble(
    pages: Vec<RasterPage>,
    width_mm: f64,
    height_mm: f64,
) -> Result<PrintDocument, PrintError> {
    if !width_mm.is_finite() || !height_mm.is_finite() || width_mm <= 0.0 || height_mm <= 0.0 {
        return Err(PrintError::Assembly(format!(
            "page size {width_mm}x{height_mm} mm must be positive"
        )));
    }
    if pages.is_empty() {
        return Err(PrintError::Assembly("no pages to assemble".to_string()));
    }
    if let Some(index) = pages
        .iter()
        .position(|page| !page.jpeg.starts_with(&[0xFF, 0xD8]))
    {
        return Err(PrintError::Assembly(format!(
            "page {} is not a JPEG raster",
            index + 1
        )));
    }

    Ok(PrintDocument {
        orientation: Orientation::from_dimensions(width_mm, height_mm),
        pages: pages
            .into_iter()
            .map(|raster| DocumentPage {
                raster,
                width_mm,
                height_mm,
            })
            .collect(),
    })
}

impl PrintDocument {
    pub fn pages(&self) -> &[DocumentPage] {
        &self.pages
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn width_mm(&self) -> f64 {
        self.pages.first().map(|page| page.width_mm).unwrap_or_default()
    }

    pub fn height_mm(&self) -> f64 {
        self.pages.first().map(|page| page.height_mm).unwrap_or_default()
    }

    /// Serialises the document as PDF 1.4 with one DCT image per page.
    /// 以 PDF 1.4 輸出，每頁一張 DCT 影像。
    pub fn to_pdf(&self) -> Vec<u8> {
        let mut builder = PdfBuilder::new();
        let catalog = builder.reserve();
        let pages_object = builder.reserve();
        let mut kids = Vec::with_capacity(self.pages.len());

        for page in &self.pages {
            let width = fmt_float(mm_to_points(page.width_mm));
            let height = fmt_float(mm_to_points(page.height_mm));
            let image = builder.add_stream(
                &format!(
                    "/Type /XObject /Subtype /Image /Width {} /Height {} \
                     /ColorSpace /DeviceRGB /BitsPerComponent 8 /Filter /DCTDecode",
                    page.raster.width_px, page.raster.height_px
                ),
                &page.raster.jpeg,
            );
            let content = format!("q {width} 0 0 {height} 0 0 cm /Im0 Do Q");
            let content = builder.add_stream("", content.as_bytes());
            let page_object = builder.add_object(format!(
                "<< /Type /Page /Parent {pages_object} 0 R /MediaBox [0 0 {width} {height}] \
                 /Resources << /XObject << /Im0 {image} 0 R >> >> /Contents {content} 0 R >>"
            ));
            kids.push(format!("{page_object} 0 R"));
        }

        builder.set(
            pages_object,
            format!(
                "<< /Type /Pages /Count {} /Kids [{}] >>",
                kids.len(),
                kids.join(" ")
            ),
        );
        builder.set(catalog, format!("<< /Type /Catalog /Pages {pages_object} 0 R >>"));
        builder.finish(catalog)
    }

    /// PDF bytes in standard base64 without line breaks.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.to_pdf())
    }

    pub fn to_download(&self) -> DownloadArtifact {
        DownloadArtifact {
            file_name: DOWNLOAD_FILE_NAME.to_string(),
            mime_type: PDF_MIME_TYPE.to_string(),
            bytes: self.to_pdf(),
        }
    }
}

fn fmt_float(value: f64) -> String {
    format!("{:.3}", value)
}

/// Minimal binary-safe PDF object writer.
struct PdfBuilder {
    objects: Vec<Vec<u8>>,
}

impl PdfBuilder {
    fn new() -> Self {
        Self {
            objects: Vec::new(),
        }
    }

    fn reserve(&mut self) -> usize {
        self.objects.push(b"null".to_vec());
        self.objects.len()
    }

    fn set(&mut self, number: usize, body: impl Into<Vec<u8>>) {
        if let Some(slot) = self.objects.get_mut(number - 1) {
            *slot = body.into();
        }
    }

    fn add_object(&mut self, body: impl Into<Vec<u8>>) -> usize {
        self.objects.push(body.into());
        self.objects.len()
    }

    fn add_stream(&mut self, dictionary: &str, data: &[u8]) -> usize {
        let mut body = if dictionary.is_empty() {
            format!("<< /Length {} >>\nstream\n", data.len()).into_bytes()
        } else {
            format!("<< {dictionary} /Length {} >>\nstream\n", data.len()).into_bytes()
        };
        body.extend_from_slice(data);
        body.extend_from_slice(b"\nendstream");
        self.add_object(body)
    }

    fn finish(self, root: usize) -> Vec<u8> {
        let mut output = Vec::new();
        output.extend_from_slice(b"%PDF-1.4\n%\xFF\xFF\xFF\xFF\n");
        let mut offsets = Vec::with_capacity(self.objects.len());

        for (index, body) in self.objects.iter().enumerate() {
            offsets.push(output.len());
            output.extend_from_slice(format!("{} 0 obj\n", index + 1).as_bytes());
            output.extend_from_slice(body);
            output.extend_from_slice(b"\nendobj\n");
        }

        let xref_start = output.len();
        output.extend_from_slice(
            format!("xref\n0 {}\n0000000000 65535 f \n", self.objects.len() + 1).as_bytes(),
        );
        for offset in offsets {
            output.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes());
        }
        output.extend_from_slice(
            format!(
                "trailer\n<< /Size {} /Root {root} 0 R >>\nstartxref\n{xref_start}\n%%EOF\n",
                self.objects.len() + 1
            )
            .as_bytes(),
        );
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raster(width_px: u32, height_px: u32) -> RasterPage {
        RasterPage {
            width_px,
            height_px,
            jpeg: vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0xFF, 0xD9],
        }
    }

    fn count(haystack: &[u8], needle: &[u8]) -> usize {
        haystack
            .windows(needle.len())
            .filter(|window| *window == needle)
            .count()
    }

    #[test]
    fn orientation_follows_profile_dimensions() {
        let square = assemble(vec![raster(10, 10)], 50.0, 50.0).unwrap();
        assert_eq!(square.orientation(), Orientation::Portrait);
        let wide = assemble(vec![raster(10, 10)], 102.5, 32.5).unwrap();
        assert_eq!(wide.orientation(), Orientation::Landscape);
    }

    #[test]
    fn every_page_declares_the_profile_size() {
        let document = assemble(vec![raster(10, 5), raster(10, 5), raster(10, 5)], 50.0, 30.0)
            .unwrap();
        assert_eq!(document.page_count(), 3);
        assert!(document
            .pages()
            .iter()
            .all(|page| page.width_mm == 50.0 && page.height_mm == 30.0));
    }

    #[test]
    fn rejects_degenerate_input() {
        assert!(matches!(
            assemble(Vec::new(), 50.0, 30.0),
            Err(PrintError::Assembly(_))
        ));
        assert!(matches!(
            assemble(vec![raster(1, 1)], 0.0, 30.0),
            Err(PrintError::Assembly(_))
        ));
        assert!(matches!(
            assemble(vec![raster(1, 1)], 50.0, f64::NAN),
            Err(PrintError::Assembly(_))
        ));
        let png = RasterPage {
            width_px: 1,
            height_px: 1,
            jpeg: b"\x89PNG".to_vec(),
        };
        assert!(matches!(
            assemble(vec![png], 50.0, 30.0),
            Err(PrintError::Assembly(_))
        ));
    }

    #[test]
    fn pdf_has_one_image_and_media_box_per_page() {
        let document = assemble(vec![raster(378, 227), raster(378, 227)], 50.0, 30.0).unwrap();
        let pdf = document.to_pdf();

        assert!(pdf.starts_with(b"%PDF-1.4"));
        assert!(pdf.ends_with(b"%%EOF\n"));
        assert_eq!(count(&pdf, b"/Type /Page "), 2);
        assert_eq!(count(&pdf, b"/DCTDecode"), 2);
        assert_eq!(count(&pdf, b"/MediaBox [0 0 141.732 85.039]"), 2);
        assert_eq!(count(&pdf, b"/Count 2"), 1);
        assert_eq!(count(&pdf, b"/Width 378 /Height 227"), 2);
        assert_eq!(count(&pdf, b"q 141.732 0 0 85.039 0 0 cm /Im0 Do Q"), 2);
    }

    #[test]
    fn xref_offsets_point_at_objects() {
        let document = assemble(vec![raster(4, 4)], 50.0, 30.0).unwrap();
        let pdf = document.to_pdf();
        let text = String::from_utf8_lossy(&pdf);
        let xref = text.find("xref\n").unwrap();
        let entries: Vec<usize> = text[xref..]
            .lines()
            .skip(3)
            .take_while(|line| line.ends_with(" n "))
            .map(|line| line[..10].parse().unwrap())
            .collect();
        assert_eq!(entries.len(), 5);
        for (index, offset) in entries.iter().enumerate() {
            let header = format!("{} 0 obj", index + 1);
            assert!(pdf[*offset..].starts_with(header.as_bytes()));
        }
        assert!(text.contains("/Root 1 0 R"));
    }

    #[test]
    fn download_artifact_is_named_labels_pdf() {
        let document = assemble(vec![raster(4, 4)], 50.0, 30.0).unwrap();
        let artifact = document.to_download();
        assert_eq!(artifact.file_name, "labels.pdf");
        assert_eq!(artifact.mime_type, "application/pdf");
        assert!(artifact.bytes.starts_with(b"%PDF"));
        assert!(!document.to_base64().contains('\n'));
    }
}
