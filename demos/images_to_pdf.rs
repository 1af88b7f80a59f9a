//! Lay out the images named on the command line as `images.pdf`, one per page,
//! with each page following the shape of its image.
//!
//! cargo run --example images-to-pdf -- photo1.jpg photo2.png

use image_pages::{
    write_pdf, Info, JpegRotator, LayoutSettings, Mm, OrientationMode, PageSizeName, Session,
};
use std::sync::Arc;

fn main() -> Result<(), image_pages::Error> {
    let mut session = Session::new(LayoutSettings::new(
        PageSizeName::A4,
        OrientationMode::Auto,
        Mm(10.0).into(),
    ));

    for path in std::env::args().skip(1) {
        match session.add_path(&path) {
            Ok(id) => println!("added {path} as {id}"),
            Err(e) => eprintln!("skipping {path}: {e}"),
        }
    }

    let pages = futures::executor::block_on(session.generate(Arc::new(JpegRotator::default())))?;

    let out = std::fs::File::create("images.pdf").map_err(image_pages::PdfError::from)?;
    write_pdf(
        &pages,
        session.settings(),
        Some(&Info::new().title("Images")),
        out,
    )?;
    println!("wrote {} pages to images.pdf", pages.len());
    Ok(())
}
