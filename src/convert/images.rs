//! Image sequence → PDF

use std::path::{Path, PathBuf};

use mupdf::Document;
use tracing::debug;

use super::{commit, pdf_settings, staging_file, verify_written_pdf, GenerationError};
use crate::mupdf::PdfPageWriter;

/// Validated input image
struct ImageInput {
    path: PathBuf,
    width: u32,
    height: u32,
}

/// Write one PDF page per image, in order, each page sized to its image
///
/// Pages measure one point per image pixel.
pub fn images_to_pdf<P: AsRef<Path>>(
    inputs: &[P],
    output: impl AsRef<Path>,
    password: Option<&str>,
) -> Result<(), GenerationError> {
    let output = output.as_ref();
    if inputs.is_empty() {
        return Err(GenerationError::NoInput);
    }
    let settings = pdf_settings(password)?;

    // Every image must decode its header before the output is created
    let images = inputs
        .iter()
        .map(|p| probe(p.as_ref()))
        .collect::<Result<Vec<_>, _>>()?;

    let staged = staging_file(output)?.into_temp_path();
    {
        let mut writer = PdfPageWriter::create(&staged, &settings)?;
        for image in &images {
            let source = Document::open(&*image.path.to_string_lossy())
                .map_err(|e| GenerationError::unreadable(&image.path, e))?;
            let page = source
                .load_page(0)
                .map_err(|e| GenerationError::unreadable(&image.path, e))?;
            writer.copy_page_sized(&page, image.width, image.height)?;
            debug!(path = %image.path.display(), width = image.width, height = image.height, "Added image page");
        }
    }

    verify_written_pdf(&staged, output, settings.password.as_deref(), images.len())?;
    commit(staged, output)
}

fn probe(path: &Path) -> Result<ImageInput, GenerationError> {
    let (width, height) =
        image::image_dimensions(path).map_err(|e| GenerationError::unreadable(path, e))?;
    if width == 0 || height == 0 {
        return Err(GenerationError::unreadable(path, "image has no pixels"));
    }
    Ok(ImageInput {
        path: path.to_path_buf(),
        width,
        height,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn test_no_inputs() {
        let dir = tempfile::tempdir().unwrap();
        let inputs: Vec<PathBuf> = Vec::new();
        let err = images_to_pdf(&inputs, dir.path().join("out.pdf"), None).unwrap_err();
        assert!(matches!(err, GenerationError::NoInput));
    }

    #[test]
    fn test_bad_image_fails_whole_job() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.png");
        RgbImage::from_pixel(4, 4, Rgb([1, 2, 3])).save(&good).unwrap();
        let bad = dir.path().join("bad.png");
        std::fs::write(&bad, b"not an image").unwrap();
        let output = dir.path().join("out.pdf");

        let err = images_to_pdf(&[good, bad.clone()], &output, None).unwrap_err();
        match err {
            GenerationError::UnreadableInput { path, .. } => assert_eq!(path, bad),
            other => panic!("unexpected error: {other}"),
        }
        assert!(!output.exists());
    }

    #[test]
    fn test_pages_follow_image_sizes() {
        let dir = tempfile::tempdir().unwrap();
        let wide = dir.path().join("wide.png");
        let tall = dir.path().join("tall.png");
        RgbImage::from_pixel(200, 100, Rgb([200, 10, 10])).save(&wide).unwrap();
        RgbImage::from_pixel(60, 180, Rgb([10, 10, 200])).save(&tall).unwrap();
        let output = dir.path().join("album.pdf");

        images_to_pdf(&[&wide, &tall], &output, None).unwrap();

        let doc = Document::open(&*output.to_string_lossy()).unwrap();
        assert_eq!(doc.page_count().unwrap(), 2);
        let first = doc.load_page(0).unwrap().bounds().unwrap();
        assert!(((first.x1 - first.x0) - 200.0).abs() < 0.5);
        assert!(((first.y1 - first.y0) - 100.0).abs() < 0.5);
        let second = doc.load_page(1).unwrap().bounds().unwrap();
        assert!(((second.x1 - second.x0) - 60.0).abs() < 0.5);
        assert!(((second.y1 - second.y0) - 180.0).abs() < 0.5);
    }
}
