//! Image-only PDF output (lopdf).
//!
//! One page per image, the image filling the page at one pixel per point.

use anyhow::{Context, Result};
use image::RgbImage;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use std::path::Path;

const IMAGE_NAME: &str = "Im0";

fn image_stream(image: &RgbImage) -> Stream {
    let dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => image.width() as i64,
        "Height" => image.height() as i64,
        "ColorSpace" => "DeviceRGB",
        "BitsPerComponent" => Object::Integer(8),
    };
    let mut stream = Stream::new(dict, image.as_raw().clone());
    stream.compress().ok();
    stream
}

/// Content stream drawing the page image over the full media box.
fn page_content(width: u32, height: u32) -> Content {
    Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    Object::Integer(width as i64),
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(height as i64),
                    Object::Integer(0),
                    Object::Integer(0),
                ],
            ),
            Operation::new("Do", vec![Object::Name(IMAGE_NAME.as_bytes().to_vec())]),
            Operation::new("Q", vec![]),
        ],
    }
}

/// Writes `pages` to `path` as a multi-page PDF, in order.
pub fn export_images_to_pdf(pages: &[RgbImage], path: &Path) -> Result<()> {
    if pages.is_empty() {
        anyhow::bail!("no pages to export");
    }

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids = Vec::with_capacity(pages.len());

    for image in pages {
        let (width, height) = image.dimensions();
        let image_id = doc.add_object(image_stream(image));

        let content = page_content(width, height)
            .encode()
            .context("failed to encode page content")?;
        let content_id = doc.add_object(Stream::new(lopdf::Dictionary::new(), content));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(width as i64),
                Object::Integer(height as i64),
            ],
            "Resources" => dictionary! {
                "XObject" => dictionary! {
                    IMAGE_NAME => image_id,
                },
            },
            "Contents" => content_id,
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

    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
    }
    doc.save(path)
        .with_context(|| format!("failed to write {}", path.display()))?;

    log::info!("[PDF] {} pages written to {}", count, path.display());
    Ok(())
}
