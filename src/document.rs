//! Writing laid-out pages as a PDF.
//!
//! This does no layout of its own: every page gets the size and orientation its
//! [PageDescriptor] asks for, and the image is drawn at the descriptor's display
//! size, centred horizontally and hanging from the top of the printable area.
//! The printable area is the one [available_area] computes, so margins too large
//! for the page shrink it to its floor around the page centre.

use crate::assemble::PageDescriptor;
use crate::info::Info;
use crate::layout::available_area;
use crate::pagesize::effective_dimensions;
use crate::refs::{ObjectReferences, RefType};
use crate::settings::LayoutSettings;
use image::{GenericImageView, ImageFormat};
use jpeg_decoder::{Decoder as JpegDecoder, PixelFormat};
use miniz_oxide::deflate::{compress_to_vec_zlib, CompressionLevel};
use pdf_writer::{Content, Filter, Finish, Name, Pdf, Rect, Ref};
use std::io::{Cursor, Write};
use thiserror::Error;
use tracing::debug;

const IMAGE_NAME: &[u8] = b"Im0";

#[derive(Error, Debug)]
pub enum PdfError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error("page {0} is missing from the page tree")]
    PageMissing(usize),
}

struct EncodeOutput {
    filter: Filter,
    width: u32,
    height: u32,
    grey: bool,
    bytes: Vec<u8>,
    mask: Option<Vec<u8>>,
}

/// An 8-bit RGB or greyscale JPEG ready to embed without re-encoding. CMYK,
/// YCCK and 16-bit JPEGs give `None`.
fn direct_jpeg(data: &[u8]) -> Option<EncodeOutput> {
    let mut decoder = JpegDecoder::new(Cursor::new(data));
    decoder.read_info().ok()?;
    let info = decoder.info()?;
    let grey = match info.pixel_format {
        PixelFormat::RGB24 => false,
        PixelFormat::L8 => true,
        _ => return None,
    };

    Some(EncodeOutput {
        filter: Filter::DctDecode,
        width: u32::from(info.width),
        height: u32::from(info.height),
        grey,
        bytes: data.to_vec(),
        mask: None,
    })
}

/// JPEGs in RGB or greyscale are embedded as-is; everything else is stored as
/// deflated RGB with a separate alpha mask when needed.
fn encode_image(data: &[u8]) -> Result<EncodeOutput, PdfError> {
    let format = image::guess_format(data)?;
    if format == ImageFormat::Jpeg {
        if let Some(encoded) = direct_jpeg(data) {
            return Ok(encoded);
        }
    }

    let image = image::load_from_memory_with_format(data, format)?;
    let (width, height) = image.dimensions();
    let level = CompressionLevel::DefaultLevel as u8;
    let mask = image.color().has_alpha().then(|| {
        let alphas: Vec<u8> = image.pixels().map(|p| (p.2).0[3]).collect();
        compress_to_vec_zlib(&alphas, level)
    });

    Ok(EncodeOutput {
        filter: Filter::FlateDecode,
        width,
        height,
        grey: false,
        bytes: compress_to_vec_zlib(image.to_rgb8().as_raw(), level),
        mask,
    })
}

/// Where a page's image goes, in PDF user space
struct Placement {
    /// The printable area
    art_box: Rect,
    /// Lower-left corner of the image
    x: f32,
    y: f32,
}

fn placement(page: &PageDescriptor, settings: &LayoutSettings) -> Placement {
    let (page_width, page_height) = effective_dimensions(settings.page_size, page.page_orientation);
    let (page_width, page_height) = (page_width.to_f64(), page_height.to_f64());
    let (area_width, area_height) =
        available_area(settings.page_size, page.page_orientation, settings.margin);

    // centred on the page; this is the margin box unless the area was floored
    let left = (page_width - area_width) / 2.0;
    let bottom = (page_height - area_height) / 2.0;
    let top = bottom + area_height;

    Placement {
        art_box: Rect::new(
            left as f32,
            bottom as f32,
            (left + area_width) as f32,
            top as f32,
        ),
        x: ((page_width - page.display_width.to_f64()) / 2.0) as f32,
        y: (top - page.display_height.to_f64()) as f32,
    }
}

/// Write `pages` as a PDF document, one page per descriptor. `settings` must be
/// the settings the pages were generated with.
pub fn write_pdf<W: Write>(
    pages: &[PageDescriptor],
    settings: &LayoutSettings,
    info: Option<&Info>,
    mut w: W,
) -> Result<(), PdfError> {
    let mut refs = ObjectReferences::new();

    let catalog_id = refs.gen(RefType::Catalog);
    let page_tree_id = refs.gen(RefType::PageTree);

    let mut writer = Pdf::new();
    if let Some(info) = info {
        info.write(&mut refs, &mut writer);
    }

    let page_refs: Vec<Ref> = (0..pages.len())
        .map(|i| refs.gen(RefType::Page(i)))
        .collect();

    writer
        .pages(page_tree_id)
        .count(page_refs.len() as i32)
        .kids(page_refs);

    for (page_index, page) in pages.iter().enumerate() {
        write_page(&mut refs, page_index, page, settings, &mut writer)?;
    }

    writer.catalog(catalog_id).pages(page_tree_id);

    w.write_all(writer.finish().as_slice()).map_err(Into::into)
}

fn write_page(
    refs: &mut ObjectReferences,
    page_index: usize,
    page: &PageDescriptor,
    settings: &LayoutSettings,
    writer: &mut Pdf,
) -> Result<(), PdfError> {
    let page_id = refs
        .get(RefType::Page(page_index))
        .ok_or(PdfError::PageMissing(page_index))?;
    let page_tree_id = refs
        .get(RefType::PageTree)
        .ok_or(PdfError::PageMissing(page_index))?;

    let encoded = encode_image(&page.image_data)?;
    let image_id = refs.gen(RefType::Image(page_index));
    let mask_id = encoded
        .mask
        .as_ref()
        .map(|_| refs.gen(RefType::ImageMask(page_index)));

    let mut image = writer.image_xobject(image_id, encoded.bytes.as_slice());
    image.filter(encoded.filter);
    image.width(encoded.width as i32);
    image.height(encoded.height as i32);
    if encoded.grey {
        image.color_space().device_gray();
    } else {
        image.color_space().device_rgb();
    }
    image.bits_per_component(8);
    if let Some(mask_id) = mask_id {
        image.s_mask(mask_id);
    }
    image.finish();

    if let (Some(mask_id), Some(mask)) = (mask_id, encoded.mask.as_ref()) {
        let mut s_mask = writer.image_xobject(mask_id, mask.as_slice());
        s_mask.filter(Filter::FlateDecode);
        s_mask.width(encoded.width as i32);
        s_mask.height(encoded.height as i32);
        s_mask.color_space().device_gray();
        s_mask.bits_per_component(8);
    }

    let (page_width, page_height) = effective_dimensions(settings.page_size, page.page_orientation);
    let (width, height) = (*page.display_width, *page.display_height);
    let Placement { art_box, x, y } = placement(page, settings);

    let mut content = Content::new();
    content.save_state();
    content.transform([width, 0.0, 0.0, height, x, y]);
    content.x_object(Name(IMAGE_NAME));
    content.restore_state();

    let content_id = refs.gen(RefType::ContentForPage(page_index));
    writer.stream(content_id, &content.finish());

    let mut pdf_page = writer.page(page_id);
    pdf_page.media_box(Rect::new(0.0, 0.0, *page_width, *page_height));
    pdf_page.art_box(art_box);
    pdf_page.parent(page_tree_id);
    pdf_page.contents(content_id);
    pdf_page.resources().x_objects().pair(Name(IMAGE_NAME), image_id);
    pdf_page.finish();

    debug!(
        page = page_index,
        source = %page.source,
        x,
        y,
        width,
        height,
        "page written"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assemble::build_document;
    use crate::image::tests::png_bytes;
    use crate::image::{ImageId, ImageRecord};
    use crate::orientation::OrientationMode;
    use crate::pagesize::PageSizeName;
    use crate::transform::{JpegRotator, Rotator};
    use crate::units::Pt;
    use futures::executor::block_on;
    use image::codecs::jpeg::JpegEncoder;
    use image::ColorType;
    use std::sync::Arc;

    fn count(haystack: &[u8], needle: &[u8]) -> usize {
        haystack
            .windows(needle.len())
            .filter(|window| *window == needle)
            .count()
    }

    #[test]
    fn writes_one_page_per_descriptor() {
        let images = [
            ImageRecord::from_bytes(ImageId(1), "a.png", png_bytes(60, 20)).unwrap(),
            ImageRecord::from_bytes(ImageId(2), "b.png", png_bytes(20, 60)).unwrap(),
            ImageRecord::from_bytes(ImageId(3), "c.png", png_bytes(20, 20)).unwrap(),
        ];
        let settings = LayoutSettings::new(PageSizeName::Letter, OrientationMode::Auto, Pt(36.0));
        let pages =
            block_on(build_document(&images, &settings, Arc::new(JpegRotator::default())))
                .unwrap();

        let mut out = Vec::new();
        write_pdf(
            &pages,
            &settings,
            Some(&Info::new().title("Test")),
            &mut out,
        )
        .unwrap();

        assert!(out.starts_with(b"%PDF"));
        assert_eq!(count(&out, b"/Type /Page\n"), 3);
        assert_eq!(count(&out, b"/Subtype /Image"), 3);
        // landscape letter for the wide image
        assert_eq!(count(&out, b"/MediaBox [0 0 792 612]"), 1);
        assert_eq!(count(&out, b"/MediaBox [0 0 612 792]"), 2);
    }

    #[test]
    fn jpegs_are_embedded_directly() {
        let jpeg = JpegRotator::default().rotate90(&png_bytes(8, 4)).unwrap();
        let encoded = encode_image(&jpeg).unwrap();
        assert_eq!(encoded.bytes, jpeg);
        assert_eq!((encoded.width, encoded.height), (4, 8));
        assert!(encoded.mask.is_none());

        let png = encode_image(&png_bytes(8, 4)).unwrap();
        assert_eq!((png.width, png.height), (8, 4));
        assert!(png.mask.is_none());
    }

    #[test]
    fn only_rgb_and_grey_jpegs_are_embedded_directly() {
        let mut grey = Vec::new();
        JpegEncoder::new(&mut grey)
            .encode(&[128u8; 16], 4, 4, ColorType::L8)
            .unwrap();
        let encoded = direct_jpeg(&grey).unwrap();
        assert!(encoded.grey);
        assert_eq!((encoded.width, encoded.height), (4, 4));

        // four-component frame header, as written for CMYK
        let cmyk: &[u8] = &[
            0xFF, 0xD8, // SOI
            0xFF, 0xC0, 0x00, 0x14, 0x08, 0x00, 0x08, 0x00, 0x08, 0x04, // SOF0, 8x8
            0x01, 0x11, 0x00, 0x02, 0x11, 0x00, 0x03, 0x11, 0x00, 0x04, 0x11, 0x00,
            0xFF, 0xD9, // EOI
        ];
        assert!(direct_jpeg(cmyk).is_none());
        assert!(direct_jpeg(&png_bytes(4, 4)).is_none());
    }

    #[test]
    fn oversized_margins_keep_the_image_on_the_page() {
        let images = [ImageRecord::from_bytes(ImageId(1), "a.png", png_bytes(40, 60)).unwrap()];
        let settings = LayoutSettings::new(PageSizeName::A5, OrientationMode::Portrait, Pt(700.0));
        let pages =
            block_on(build_document(&images, &settings, Arc::new(JpegRotator::default())))
                .unwrap();

        let Placement { art_box, x, y } = placement(&pages[0], &settings);
        assert!(art_box.x1 <= art_box.x2 && art_box.y1 <= art_box.y2);
        assert!(art_box.x1 >= 0.0 && art_box.x2 <= 420.0);
        assert!(art_box.y1 >= 0.0 && art_box.y2 <= 595.0);

        let mut out = Vec::new();
        write_pdf(&pages, &settings, None, &mut out).unwrap();
        let text = String::from_utf8_lossy(&out);
        let cm: Vec<f32> = text
            .lines()
            .find(|line| line.ends_with(" cm"))
            .unwrap()
            .split_whitespace()
            .take(6)
            .map(|n| n.parse().unwrap())
            .collect();
        let (width, height, left, bottom) = (cm[0], cm[3], cm[4], cm[5]);
        assert_eq!((left, bottom), (x, y));
        assert!(left >= 0.0 && left + width <= 420.0);
        assert!(bottom >= 0.0 && bottom + height <= 595.0);
        assert_eq!(count(&out, b"/MediaBox [0 0 420 595]"), 1);
    }

    #[test]
    fn ordinary_margins_hang_the_image_from_the_top() {
        let images = [ImageRecord::from_bytes(ImageId(1), "a.png", png_bytes(40, 60)).unwrap()];
        let settings = LayoutSettings::new(PageSizeName::A5, OrientationMode::Portrait, Pt(20.0));
        let pages =
            block_on(build_document(&images, &settings, Arc::new(JpegRotator::default())))
                .unwrap();

        let Placement { art_box, x, y } = placement(&pages[0], &settings);
        assert_eq!(
            (art_box.x1, art_box.y1, art_box.x2, art_box.y2),
            (20.0, 20.0, 400.0, 575.0)
        );
        assert_eq!(x, 190.0);
        assert_eq!(y, 515.0);
    }
}
