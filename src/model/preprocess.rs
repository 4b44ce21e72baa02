use std::path::Path;

use image::{DynamicImage, ImageReader, imageops::FilterType};
use ndarray::Array4;

use crate::error::ServiceError;

/// Input transform a model was trained with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preprocessing {
    /// 299x299, pixels rescaled to [0, 1].
    Xception,
    /// 224x224, pixels rescaled to [0, 1].
    Cnn,
    /// 224x224, raw 0..=255 pixels. The network normalises internally.
    EfficientNetB4,
}

impl Preprocessing {
    pub fn for_model(model_name: &str) -> Result<Self, ServiceError> {
        match model_name {
            "brain_tumor_xception" => Ok(Preprocessing::Xception),
            "Model2CNN" => Ok(Preprocessing::Cnn),
            "brain_tumor_efficientnetb4" => Ok(Preprocessing::EfficientNetB4),
            other => Err(ServiceError::PreprocessingUndefined(other.to_string())),
        }
    }

    /// `(width, height)` the image is resized to.
    pub fn target_size(self) -> (u32, u32) {
        match self {
            Preprocessing::Xception => (299, 299),
            Preprocessing::Cnn | Preprocessing::EfficientNetB4 => (224, 224),
        }
    }

    pub fn rescales(self) -> bool {
        !matches!(self, Preprocessing::EfficientNetB4)
    }

    /// Resize, convert to `f32` and add the batch axis: `[1, H, W, 3]`.
    pub fn apply(self, image: &DynamicImage) -> Result<Array4<f32>, ServiceError> {
        let (width, height) = self.target_size();
        let rgb = image
            .resize_exact(width, height, FilterType::Nearest)
            .to_rgb8();

        let scale = if self.rescales() { 1.0 / 255.0 } else { 1.0 };
        let data: Vec<f32> = rgb
            .into_raw()
            .into_iter()
            .map(|px| px as f32 * scale)
            .collect();

        Array4::from_shape_vec((1, height as usize, width as usize, 3), data)
            .map_err(|e| ServiceError::ImageDecode(format!("unexpected pixel buffer: {e}")))
    }

    pub fn apply_to_path(self, image_path: &Path) -> Result<Array4<f32>, ServiceError> {
        let image = load_image(image_path)?;
        self.apply(&image)
    }
}

/// Decode an image, sniffing the format from its content rather than the
/// file name.
pub fn load_image(path: &Path) -> Result<DynamicImage, ServiceError> {
    let image = ImageReader::open(path)?.with_guessed_format()?.decode()?;
    Ok(image)
}

pub fn preprocess(model_name: &str, image_path: &Path) -> Result<Array4<f32>, ServiceError> {
    Preprocessing::for_model(model_name)?.apply_to_path(image_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage};

    fn write_image(dir: &Path, name: &str, format: ImageFormat) -> std::path::PathBuf {
        let img = RgbImage::from_pixel(40, 30, Rgb([255, 128, 0]));
        let path = dir.join(name);
        DynamicImage::ImageRgb8(img)
            .save_with_format(&path, format)
            .unwrap();
        path
    }

    #[test]
    fn dispatches_on_exact_model_names() {
        assert_eq!(
            Preprocessing::for_model("brain_tumor_xception").unwrap(),
            Preprocessing::Xception
        );
        assert_eq!(Preprocessing::for_model("Model2CNN").unwrap(), Preprocessing::Cnn);
        assert_eq!(
            Preprocessing::for_model("brain_tumor_efficientnetb4").unwrap(),
            Preprocessing::EfficientNetB4
        );

        let err = Preprocessing::for_model("model2cnn").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Preprocessing for model 'model2cnn' is not defined."
        );
    }

    #[test]
    fn xception_is_299_and_rescaled() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_image(dir.path(), "scan.png", ImageFormat::Png);

        let batch = preprocess("brain_tumor_xception", &path).unwrap();
        assert_eq!(batch.shape(), &[1, 299, 299, 3]);
        assert!((batch[[0, 0, 0, 0]] - 1.0).abs() < 1e-6);
        assert!((batch[[0, 10, 10, 1]] - 128.0 / 255.0).abs() < 1e-6);
        assert!(batch.iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn efficientnet_keeps_raw_pixel_range() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_image(dir.path(), "scan.png", ImageFormat::Png);

        let batch = preprocess("brain_tumor_efficientnetb4", &path).unwrap();
        assert_eq!(batch.shape(), &[1, 224, 224, 3]);
        assert_eq!(batch[[0, 5, 5, 0]], 255.0);
        assert_eq!(batch[[0, 5, 5, 1]], 128.0);
        assert_eq!(batch[[0, 5, 5, 2]], 0.0);
    }

    #[test]
    fn cnn_is_224_and_rescaled() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_image(dir.path(), "scan.png", ImageFormat::Png);

        let batch = preprocess("Model2CNN", &path).unwrap();
        assert_eq!(batch.shape(), &[1, 224, 224, 3]);
        assert!(batch.iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn format_is_detected_from_content() {
        let dir = tempfile::tempdir().unwrap();
        // PNG bytes behind a .jpg name.
        let path = write_image(dir.path(), "upload.png", ImageFormat::Png);
        let renamed = dir.path().join("upload.jpg");
        std::fs::rename(&path, &renamed).unwrap();

        assert!(preprocess("Model2CNN", &renamed).is_ok());
    }

    #[test]
    fn undecodable_files_are_image_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.jpg");
        std::fs::write(&path, b"definitely not an image").unwrap();

        let err = preprocess("brain_tumor_xception", &path).unwrap_err();
        assert!(matches!(err, ServiceError::ImageDecode(_)));
    }

    #[test]
    fn unknown_model_fails_before_touching_the_file() {
        let err = preprocess("ghost_model", Path::new("/nonexistent/image.jpg")).unwrap_err();
        assert!(matches!(err, ServiceError::PreprocessingUndefined(_)));
    }
}
