// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Preprocessing pipeline: grayscale, blur, Otsu binarization and
// morphological closing, tuned to give symbol detectors a clean
// black-and-white picture of the barcode.

use barcodelens_core::error::{BarcodelensError, Result};
use image::{DynamicImage, GrayImage, Luma};
use imageproc::contrast::otsu_level;
use imageproc::distance_transform::Norm;
use imageproc::filter::gaussian_blur_f32;
use imageproc::morphology;
use tracing::{debug, info, instrument, warn};

/// Side length of the square smoothing kernel.
pub const BLUR_KERNEL_SIZE: u32 = 5;

/// Radius of the closing element. Under the L∞ norm radius 1 is a 3×3 square.
pub const CLOSING_RADIUS: u8 = 1;

/// Value of "ink" pixels after binarization.
pub const BLACK: u8 = 0;

/// Value of "paper" pixels after binarization.
pub const WHITE: u8 = 255;

/// Gaussian sigma implied by a kernel size when no sigma is given
/// (the same rule OpenCV applies for `sigma = 0`).
fn sigma_for_kernel(kernel_size: u32) -> f32 {
    0.3 * ((kernel_size as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

/// Decode uploaded bytes (PNG, JPEG, GIF, ...) into an image.
///
/// Fails with [`BarcodelensError::InvalidImage`] when the bytes are not a
/// recognised image or decode to zero pixels.
#[instrument(skip(data), fields(data_len = data.len()))]
pub fn decode_image(data: &[u8]) -> Result<DynamicImage> {
    let image = image::load_from_memory(data)
        .map_err(|err| BarcodelensError::InvalidImage(format!("failed to decode image: {err}")))?;
    if image.width() == 0 || image.height() == 0 {
        return Err(BarcodelensError::InvalidImage("image has no pixels".into()));
    }
    debug!(
        width = image.width(),
        height = image.height(),
        color = ?image.color(),
        "Image decoded from bytes"
    );
    Ok(image)
}

/// A single-channel image in which every pixel is [`BLACK`] or [`WHITE`].
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedImage {
    pixels: GrayImage,
}

impl ProcessedImage {
    /// Wrap a grayscale buffer, checking that it is strictly binary.
    pub fn from_gray(pixels: GrayImage) -> Result<Self> {
        if let Some(stray) = pixels.pixels().find(|p| p.0[0] != BLACK && p.0[0] != WHITE) {
            return Err(BarcodelensError::ImageError(format!(
                "pixel value {} is not binarized",
                stray.0[0]
            )));
        }
        Ok(Self { pixels })
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    /// Value at `(x, y)`; always [`BLACK`] or [`WHITE`].
    pub fn pixel(&self, x: u32, y: u32) -> u8 {
        self.pixels.get_pixel(x, y).0[0]
    }

    pub fn as_gray(&self) -> &GrayImage {
        &self.pixels
    }

    /// Share of pixels that are ink, in `[0, 1]`.
    pub fn ink_ratio(&self) -> f64 {
        let total = self.pixels.width() as u64 * self.pixels.height() as u64;
        if total == 0 {
            return 0.0;
        }
        let ink = self.pixels.pixels().filter(|p| p.0[0] == BLACK).count() as u64;
        ink as f64 / total as f64
    }
}

/// Turns an arbitrary photo into a [`ProcessedImage`].
///
/// Each step consumes `self` and returns the next stage, so the fixed order
/// reads top to bottom at the call site:
///
/// ```ignore
/// let processed = ImagePreprocessor::from_dynamic(&photo)?
///     .suppress_noise()
///     .binarize_otsu()
///     .close_gaps()
///     .finish()?;
/// ```
pub struct ImagePreprocessor {
    /// The working single-channel image.
    image: GrayImage,
}

impl ImagePreprocessor {
    // -- Construction ---------------------------------------------------------

    /// Decode raw upload bytes and reduce them to grayscale.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let image = decode_image(data)?;
        Self::from_dynamic(&image)
    }

    /// Collapse an image of any channel layout to luminance.
    ///
    /// Colour channels are combined with Rec. 709 weights; alpha is dropped.
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    pub fn from_dynamic(image: &DynamicImage) -> Result<Self> {
        if image.width() == 0 || image.height() == 0 {
            return Err(BarcodelensError::InvalidImage("image has no pixels".into()));
        }
        debug!(color = ?image.color(), "Reducing to single channel");
        Ok(Self {
            image: image.to_luma8(),
        })
    }

    /// Start from an image that is already single-channel.
    pub fn from_gray(image: GrayImage) -> Result<Self> {
        if image.width() == 0 || image.height() == 0 {
            return Err(BarcodelensError::InvalidImage("image has no pixels".into()));
        }
        Ok(Self { image })
    }

    // -- Accessors ------------------------------------------------------------

    /// Borrow the current working image.
    pub fn as_gray(&self) -> &GrayImage {
        &self.image
    }

    // -- Pipeline steps -------------------------------------------------------

    /// Gaussian smoothing with a [`BLUR_KERNEL_SIZE`]-wide kernel.
    #[instrument(skip(self))]
    pub fn suppress_noise(self) -> Self {
        let sigma = sigma_for_kernel(BLUR_KERNEL_SIZE);
        debug!(sigma, "Applying Gaussian blur");
        Self {
            image: gaussian_blur_f32(&self.image, sigma),
        }
    }

    /// Global binarization at the Otsu level of the current histogram.
    ///
    /// Pixels strictly above the level become [`WHITE`]; the rest [`BLACK`].
    #[instrument(skip(self))]
    pub fn binarize_otsu(self) -> Self {
        let level = otsu_level(&self.image);
        debug!(level, "Otsu threshold computed");

        let (width, height) = self.image.dimensions();
        let mut output = GrayImage::new(width, height);
        for (x, y, pixel) in self.image.enumerate_pixels() {
            let value = if pixel.0[0] > level { WHITE } else { BLACK };
            output.put_pixel(x, y, Luma([value]));
        }

        Self { image: output }
    }

    /// Morphological closing (dilate, then erode) with a 3×3 square.
    ///
    /// Fills pinholes and hairline gaps inside white regions.
    #[instrument(skip(self))]
    pub fn close_gaps(self) -> Self {
        debug!(radius = CLOSING_RADIUS, "Applying morphological closing");
        Self {
            image: morphology::close(&self.image, Norm::LInf, CLOSING_RADIUS),
        }
    }

    /// Hand over the result, checking the binary invariant.
    pub fn finish(self) -> Result<ProcessedImage> {
        ProcessedImage::from_gray(self.image)
    }
}

/// Run the full fixed pipeline on a decoded image.
#[instrument(skip_all, fields(width = image.width(), height = image.height()))]
pub fn preprocess(image: &DynamicImage) -> Result<ProcessedImage> {
    info!("Running barcode preprocessing pipeline");
    let processed = ImagePreprocessor::from_dynamic(image)?
        .suppress_noise()
        .binarize_otsu()
        .close_gaps()
        .finish()?;

    let ink_ratio = processed.ink_ratio();
    if ink_ratio == 0.0 || ink_ratio == 1.0 {
        warn!(ink_ratio, "Preprocessed image is a single flat colour");
    } else {
        debug!(ink_ratio, "Preprocessing complete");
    }
    Ok(processed)
}

// -- Tests --------------------------------------------------------------------
