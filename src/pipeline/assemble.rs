use crate::utils::Result;
use lopdf::{
    content::{Content, Operation},
    dictionary, Document, Object, Stream,
};
use std::path::{Path, PathBuf};

/// Name of the image resource drawn on every page.
const PAGE_IMAGE: &str = "Page";

/// Writes `pages` into a new PDF, one page per image at one point per pixel.
pub fn write_page_pdf(pages: &[PathBuf], pdf: &Path) -> Result<()> {
    if pages.is_empty() {
        return Err(format!("No page images to write into {}", pdf.display()));
    }

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids = Vec::with_capacity(pages.len());
    for path in pages {
        let image = image::open(path)
            .map_err(|e| format!("Failed to read page {}: {}", path.display(), e))?
            .into_rgb8();
        let (width, height) = image.dimensions();
        let (width, height) = (i64::from(width), i64::from(height));

        let image_id = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => width,
                "Height" => height,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8i64,
            },
            image.into_raw(),
        ));

        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        width.into(),
                        0i64.into(),
                        0i64.into(),
                        height.into(),
                        0i64.into(),
                        0i64.into(),
                    ],
                ),
                Operation::new("Do", vec![Object::Name(PAGE_IMAGE.as_bytes().to_vec())]),
                Operation::new("Q", vec![]),
            ],
        };
        let content = content
            .encode()
            .map_err(|e| format!("Failed to encode page {}: {}", path.display(), e))?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, content));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0i64.into(), 0i64.into(), width.into(), height.into()],
            "Contents" => content_id,
            "Resources" => dictionary! {
                "XObject" => dictionary! { PAGE_IMAGE => image_id },
            },
        });
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();
    doc.save(pdf)
        .map_err(|e| format!("Failed to write {}: {}", pdf.display(), e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use tempfile::tempdir;

    fn media_box(doc: &Document, page: lopdf::ObjectId) -> Vec<i64> {
        doc.get_dictionary(page)
            .unwrap()
            .get(b"MediaBox")
            .unwrap()
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_i64().unwrap())
            .collect()
    }

    #[test]
    fn one_pdf_page_per_image() {
        let dir = tempdir().unwrap();
        let first = dir.path().join("a_plot-2.png");
        let second = dir.path().join("a_plot-3.png");
        RgbImage::from_pixel(30, 20, Rgb([255, 0, 0]))
            .save(&first)
            .unwrap();
        RgbImage::from_pixel(12, 40, Rgb([255, 255, 255]))
            .save(&second)
            .unwrap();
        let pdf = dir.path().join("a_filtered.pdf");

        write_page_pdf(&[first, second], &pdf).unwrap();

        let doc = Document::load(&pdf).unwrap();
        let pages = doc.get_pages();
        assert_eq!(pages.len(), 2);
        assert_eq!(media_box(&doc, pages[&1]), vec![0, 0, 30, 20]);
        assert_eq!(media_box(&doc, pages[&2]), vec![0, 0, 12, 40]);
    }

    #[test]
    fn empty_page_list_is_an_error() {
        let dir = tempdir().unwrap();
        let pdf = dir.path().join("a_filtered.pdf");
        let err = write_page_pdf(&[], &pdf).unwrap_err();
        assert!(err.starts_with("No page images"), "{err}");
        assert!(!pdf.exists());
    }

    #[test]
    fn unreadable_page_is_an_error() {
        let dir = tempdir().unwrap();
        let page = dir.path().join("a_plot-1.png");
        std::fs::write(&page, b"not a png").unwrap();
        let err = write_page_pdf(&[page], &dir.path().join("a_filtered.pdf")).unwrap_err();
        assert!(err.starts_with("Failed to read page"), "{err}");
    }
}
